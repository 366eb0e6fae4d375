//! Cardinal direction enum for light propagation.

use steel_utils::{BlockPos, SectionPos};

/// Six cardinal directions for light propagation.
///
/// The ordinal values (0-5) index the per-face occlusion shapes of a block.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Downward (-Y direction)
    Down = 0,
    /// Upward (+Y direction)
    Up = 1,
    /// North (-Z direction)
    North = 2,
    /// South (+Z direction)
    South = 3,
    /// West (-X direction)
    West = 4,
    /// East (+X direction)
    East = 5,
}

impl Direction {
    /// All six directions in array form for iteration.
    pub const ALL: [Direction; 6] = [
        Direction::Down,
        Direction::Up,
        Direction::North,
        Direction::South,
        Direction::West,
        Direction::East,
    ];

    /// The four directions in the horizontal plane.
    pub const HORIZONTALS: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::West,
        Direction::East,
    ];

    /// Returns the opposite direction.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Down => Self::Up,
            Self::Up => Self::Down,
            Self::North => Self::South,
            Self::South => Self::North,
            Self::West => Self::East,
            Self::East => Self::West,
        }
    }

    /// Gets the offset in the given direction.
    ///
    /// Returns (dx, dy, dz) for this direction.
    #[must_use]
    pub const fn offset(self) -> (i32, i32, i32) {
        match self {
            Self::Down => (0, -1, 0),
            Self::Up => (0, 1, 0),
            Self::North => (0, 0, -1),
            Self::South => (0, 0, 1),
            Self::West => (-1, 0, 0),
            Self::East => (1, 0, 0),
        }
    }

    /// The direction of a unit axis step, or `None` if the step is not axis aligned.
    #[must_use]
    pub const fn from_normal(dx: i32, dy: i32, dz: i32) -> Option<Self> {
        match (dx, dy, dz) {
            (0, -1, 0) => Some(Self::Down),
            (0, 1, 0) => Some(Self::Up),
            (0, 0, -1) => Some(Self::North),
            (0, 0, 1) => Some(Self::South),
            (-1, 0, 0) => Some(Self::West),
            (1, 0, 0) => Some(Self::East),
            _ => None,
        }
    }

    /// The direction pointing from `from` towards `to` along one axis.
    ///
    /// Only the sign of each delta matters, so vertical jumps over skipped
    /// sections still resolve to [`Direction::Down`] or [`Direction::Up`].
    #[must_use]
    pub fn between(from: BlockPos, to: BlockPos) -> Option<Self> {
        let normal = (to.0 - from.0).signum();
        Self::from_normal(normal.x, normal.y, normal.z)
    }

    /// Returns a new `BlockPos` relative to the given position in this direction.
    #[must_use]
    pub const fn relative(self, pos: BlockPos) -> BlockPos {
        let (dx, dy, dz) = self.offset();
        pos.offset(dx, dy, dz)
    }

    /// Returns the neighbouring section in this direction.
    #[must_use]
    pub const fn relative_section(self, section: SectionPos) -> SectionPos {
        let (dx, dy, dz) = self.offset();
        section.offset(dx, dy, dz)
    }

    /// The 256 blocks of `section` lying on its face in this direction.
    pub fn section_face(self, section: SectionPos) -> impl Iterator<Item = BlockPos> {
        (0..16).flat_map(move |a| {
            (0..16).map(move |b| match self {
                Self::Down => section.relative_block(a, 0, b),
                Self::Up => section.relative_block(a, 15, b),
                Self::North => section.relative_block(a, b, 0),
                Self::South => section.relative_block(a, b, 15),
                Self::West => section.relative_block(0, a, b),
                Self::East => section.relative_block(15, a, b),
            })
        })
    }
}
