//! The world as seen by the light engine.
//!
//! The engine never looks at block states or collision shapes directly. A world
//! exposes chunks through [`LightChunkGetter`] and every block through the
//! handful of light relevant properties in [`BlockLightProperties`].

use std::sync::Arc;

use steel_utils::{BlockPos, ChunkPos, SectionPos};

use crate::light_engine::Direction;

/// The two independent light layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LightLayer {
    /// Light emitted by blocks.
    Block,
    /// Light coming down from the sky.
    Sky,
}

/// The silhouette of a block's solid geometry on one face.
///
/// The face is divided into a 4x4 grid, one bit per cell. Cells are indexed in
/// world axes of the face plane (`y`/`z` for east and west faces, `x`/`z` for up
/// and down, `x`/`y` for north and south), so the shapes of two touching faces
/// line up bit for bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FaceShape(pub u16);

impl FaceShape {
    /// No geometry on the face.
    pub const EMPTY: Self = Self(0);
    /// The face is fully covered.
    pub const FULL: Self = Self(u16::MAX);

    /// A rectangle covering cells `u0..u1` by `v0..v1` of the 4x4 grid.
    #[must_use]
    pub const fn rect(u0: u8, v0: u8, u1: u8, v1: u8) -> Self {
        let mut bits = 0u16;
        let mut v = v0;
        while v < v1 {
            let mut u = u0;
            while u < u1 {
                bits |= 1 << (v * 4 + u);
                u += 1;
            }
            v += 1;
        }
        Self(bits)
    }

    /// Whether there is no geometry on the face.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Whether this face and the touching face of the neighbour together seal
    /// the shared face.
    #[must_use]
    pub const fn occludes_with(self, other: Self) -> bool {
        if self.0 == Self::FULL.0 || other.0 == Self::FULL.0 {
            return true;
        }
        if self.is_empty() && other.is_empty() {
            return false;
        }
        self.0 | other.0 == Self::FULL.0
    }
}

/// The light relevant properties of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockLightProperties {
    /// Light cost of passing through the block, 0-15. 16 marks unloaded space.
    pub opacity: u8,
    /// Emitted block light, 0-15.
    pub emission: u8,
    /// Occlusion shape per face, indexed by [`Direction`].
    ///
    /// Only blocks whose shape takes part in light occlusion (slabs, stairs)
    /// report non-empty faces.
    pub faces: [FaceShape; 6],
}

impl BlockLightProperties {
    /// A transparent, non-emitting block.
    pub const AIR: Self = Self {
        opacity: 0,
        emission: 0,
        faces: [FaceShape::EMPTY; 6],
    };

    /// Space outside of any loaded chunk: opaque on every face.
    pub const UNLOADED: Self = Self {
        opacity: 16,
        emission: 0,
        faces: [FaceShape::FULL; 6],
    };

    /// A full opaque block.
    pub const SOLID: Self = Self {
        opacity: 15,
        emission: 0,
        faces: [FaceShape::FULL; 6],
    };

    /// A transparent block with the given opacity and no occlusion shape.
    #[must_use]
    pub const fn translucent(opacity: u8) -> Self {
        Self {
            opacity,
            emission: 0,
            faces: [FaceShape::EMPTY; 6],
        }
    }

    /// Returns these properties with a different emission.
    #[must_use]
    pub const fn with_emission(mut self, emission: u8) -> Self {
        self.emission = emission;
        self
    }

    /// Returns these properties with a different occlusion shape on one face.
    #[must_use]
    pub const fn with_face(mut self, direction: Direction, shape: FaceShape) -> Self {
        self.faces[direction as usize] = shape;
        self
    }

    /// The occlusion shape on the given face.
    #[must_use]
    #[inline]
    pub const fn face(&self, direction: Direction) -> FaceShape {
        self.faces[direction as usize]
    }

    /// Whether the block is air for lighting purposes.
    #[must_use]
    pub fn is_air(&self) -> bool {
        *self == Self::AIR
    }
}

/// A loaded chunk column.
pub trait LightChunk: Send + Sync {
    /// The column position of this chunk.
    fn pos(&self) -> ChunkPos;

    /// The light properties of a block inside this chunk.
    fn light_properties(&self, pos: BlockPos) -> BlockLightProperties;

    /// The light emitted by a block inside this chunk.
    fn light_emission(&self, pos: BlockPos) -> u8 {
        self.light_properties(pos).emission
    }

    /// Whether the section at height `section_y` holds nothing but air.
    fn is_section_empty(&self, section_y: i32) -> bool;

    /// Every emitting block of the chunk with its emission.
    fn light_sources(&self) -> Vec<(BlockPos, u8)>;
}

/// Access to chunks and a sink for light change notifications.
pub trait LightChunkGetter: Send + Sync {
    /// The chunk type handed to the engine.
    type Chunk: LightChunk;

    /// Returns the chunk at `pos` if it is available for lighting.
    fn chunk_for_lighting(&self, pos: ChunkPos) -> Option<Arc<Self::Chunk>>;

    /// Called when a section's published light changed.
    fn on_light_update(&self, _layer: LightLayer, _section: SectionPos) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_face_always_occludes() {
        assert!(FaceShape::FULL.occludes_with(FaceShape::EMPTY));
        assert!(FaceShape::EMPTY.occludes_with(FaceShape::FULL));
    }

    #[test]
    fn empty_faces_never_occlude() {
        assert!(!FaceShape::EMPTY.occludes_with(FaceShape::EMPTY));
    }

    #[test]
    fn complementary_halves_occlude() {
        let lower = FaceShape::rect(0, 0, 4, 2);
        let upper = FaceShape::rect(0, 2, 4, 4);
        assert!(!lower.occludes_with(lower));
        assert!(lower.occludes_with(upper));
        assert_eq!(FaceShape(lower.0 | upper.0), FaceShape::FULL);
    }

    #[test]
    fn overlapping_halves_leave_gap() {
        let left = FaceShape::rect(0, 0, 2, 4);
        let middle = FaceShape::rect(1, 0, 3, 4);
        assert!(!left.occludes_with(middle));
    }
}
