// Wrapper types making it harder to accidentaly use the wrong underlying type.

use std::fmt::{self, Display};

use crate::math::{vector2::Vector2, vector3::Vector3};

/// Converts a block coordinate to the coordinate of the section containing it.
#[must_use]
#[inline]
pub const fn block_to_section_coord(coord: i32) -> i32 {
    coord >> 4
}

/// Converts a section coordinate to the lowest block coordinate inside it.
#[must_use]
#[inline]
pub const fn section_to_block_coord(coord: i32) -> i32 {
    coord << 4
}

// A chunk position. The vector's `y` holds the z coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkPos(pub Vector2<i32>);

impl ChunkPos {
    /// Creates a chunk position from chunk coordinates.
    #[must_use]
    pub const fn new(x: i32, z: i32) -> Self {
        Self(Vector2::new(x, z))
    }

    /// The chunk x coordinate.
    #[must_use]
    #[inline]
    pub const fn x(self) -> i32 {
        self.0.x
    }

    /// The chunk z coordinate.
    #[must_use]
    #[inline]
    pub const fn z(self) -> i32 {
        self.0.y
    }

    /// The section of this column at section height `y`.
    #[must_use]
    pub const fn section(self, y: i32) -> SectionPos {
        SectionPos::new(self.0.x, y, self.0.y)
    }
}

impl Display for ChunkPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.0.x, self.0.y)
    }
}

// A block position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockPos(pub Vector3<i32>);

impl BlockPos {
    /// Creates a block position.
    #[must_use]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self(Vector3::new(x, y, z))
    }

    /// The x coordinate.
    #[must_use]
    #[inline]
    pub const fn x(self) -> i32 {
        self.0.x
    }

    /// The y coordinate.
    #[must_use]
    #[inline]
    pub const fn y(self) -> i32 {
        self.0.y
    }

    /// The z coordinate.
    #[must_use]
    #[inline]
    pub const fn z(self) -> i32 {
        self.0.z
    }

    /// Returns this position moved by the given deltas.
    #[must_use]
    #[inline]
    pub const fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(self.0.x + dx, self.0.y + dy, self.0.z + dz)
    }

    /// The coordinates of this position inside its section, each in `0..16`.
    #[must_use]
    #[inline]
    pub const fn section_relative(self) -> (usize, usize, usize) {
        (
            (self.0.x & 15) as usize,
            (self.0.y & 15) as usize,
            (self.0.z & 15) as usize,
        )
    }

    /// Returns this position snapped down to the bottom layer of its section.
    #[must_use]
    pub const fn section_floor(self) -> Self {
        Self::new(self.0.x, self.0.y & !15, self.0.z)
    }

    /// The column containing this position.
    #[must_use]
    pub const fn chunk_pos(self) -> ChunkPos {
        ChunkPos::new(
            block_to_section_coord(self.0.x),
            block_to_section_coord(self.0.z),
        )
    }
}

impl Display for BlockPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.0.x, self.0.y, self.0.z)
    }
}

// A 16x16x16 section position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SectionPos(pub Vector3<i32>);

impl SectionPos {
    /// Creates a section position from section coordinates.
    #[must_use]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self(Vector3::new(x, y, z))
    }

    /// The section containing the given block.
    #[must_use]
    #[inline]
    pub const fn of(pos: BlockPos) -> Self {
        Self::new(
            block_to_section_coord(pos.0.x),
            block_to_section_coord(pos.0.y),
            block_to_section_coord(pos.0.z),
        )
    }

    /// The section x coordinate.
    #[must_use]
    #[inline]
    pub const fn x(self) -> i32 {
        self.0.x
    }

    /// The section y coordinate.
    #[must_use]
    #[inline]
    pub const fn y(self) -> i32 {
        self.0.y
    }

    /// The section z coordinate.
    #[must_use]
    #[inline]
    pub const fn z(self) -> i32 {
        self.0.z
    }

    /// Returns this section moved by the given deltas.
    #[must_use]
    #[inline]
    pub const fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(self.0.x + dx, self.0.y + dy, self.0.z + dz)
    }

    /// The column containing this section.
    #[must_use]
    #[inline]
    pub const fn column(self) -> ChunkPos {
        ChunkPos::new(self.0.x, self.0.z)
    }

    /// The lowest-coordinate block of this section.
    #[must_use]
    pub const fn origin(self) -> BlockPos {
        BlockPos::new(
            section_to_block_coord(self.0.x),
            section_to_block_coord(self.0.y),
            section_to_block_coord(self.0.z),
        )
    }

    /// The block at the given section-relative coordinates.
    #[must_use]
    pub const fn relative_block(self, x: i32, y: i32, z: i32) -> BlockPos {
        self.origin().offset(x, y, z)
    }
}

impl Display for SectionPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}, {}]", self.0.x, self.0.y, self.0.z)
    }
}
