//! An in-memory world for tests, benchmarks and the demo binary.

use std::{mem, sync::Arc};

use rustc_hash::{FxHashMap, FxHashSet};
use steel_utils::{
    BlockPos, ChunkPos, SectionPos,
    locks::{SyncMutex, SyncRwLock},
    types::block_to_section_coord,
};

use crate::chunk_getter::{BlockLightProperties, LightChunk, LightChunkGetter, LightLayer};

/// A chunk column whose blocks live in a hash map; missing blocks are air.
pub struct RamChunk {
    pos: ChunkPos,
    min_y: i32,
    max_y: i32,
    blocks: SyncRwLock<FxHashMap<BlockPos, BlockLightProperties>>,
}

impl RamChunk {
    /// Creates an all air chunk spanning `min_y..max_y`.
    #[must_use]
    pub fn new(pos: ChunkPos, min_y: i32, max_y: i32) -> Self {
        Self {
            pos,
            min_y,
            max_y,
            blocks: SyncRwLock::new(FxHashMap::default()),
        }
    }

    /// Replaces the block at `pos`. Writes outside the chunk's height are ignored.
    pub fn set_block(&self, pos: BlockPos, properties: BlockLightProperties) {
        if !(self.min_y..self.max_y).contains(&pos.y()) {
            return;
        }
        let mut blocks = self.blocks.write();
        if properties.is_air() {
            blocks.remove(&pos);
        } else {
            blocks.insert(pos, properties);
        }
    }
}

impl LightChunk for RamChunk {
    fn pos(&self) -> ChunkPos {
        self.pos
    }

    fn light_properties(&self, pos: BlockPos) -> BlockLightProperties {
        self.blocks
            .read()
            .get(&pos)
            .copied()
            .unwrap_or(BlockLightProperties::AIR)
    }

    fn is_section_empty(&self, section_y: i32) -> bool {
        !self
            .blocks
            .read()
            .keys()
            .any(|pos| block_to_section_coord(pos.y()) == section_y)
    }

    fn light_sources(&self) -> Vec<(BlockPos, u8)> {
        self.blocks
            .read()
            .iter()
            .filter(|(_, properties)| properties.emission > 0)
            .map(|(pos, properties)| (*pos, properties.emission))
            .collect()
    }
}

/// A level kept entirely in memory.
///
/// Every published light change is recorded and can be drained with
/// [`RamOnlyWorld::take_light_updates`].
pub struct RamOnlyWorld {
    min_y: i32,
    height: i32,
    chunks: SyncRwLock<FxHashMap<ChunkPos, Arc<RamChunk>>>,
    light_updates: SyncMutex<FxHashSet<(LightLayer, SectionPos)>>,
}

impl RamOnlyWorld {
    /// Creates an empty world spanning `min_y..min_y + height`.
    #[must_use]
    pub fn new(min_y: i32, height: i32) -> Self {
        Self {
            min_y,
            height,
            chunks: SyncRwLock::new(FxHashMap::default()),
            light_updates: SyncMutex::new(FxHashSet::default()),
        }
    }

    /// Lowest block y of the world.
    #[must_use]
    pub const fn min_y(&self) -> i32 {
        self.min_y
    }

    /// Height of the world in blocks.
    #[must_use]
    pub const fn height(&self) -> i32 {
        self.height
    }

    /// Loads an all air chunk at `pos`, replacing any chunk already there.
    pub fn add_chunk(&self, pos: ChunkPos) -> Arc<RamChunk> {
        let chunk = Arc::new(RamChunk::new(pos, self.min_y, self.min_y + self.height));
        self.chunks.write().insert(pos, Arc::clone(&chunk));
        chunk
    }

    /// Unloads the chunk at `pos`.
    pub fn remove_chunk(&self, pos: ChunkPos) -> Option<Arc<RamChunk>> {
        self.chunks.write().remove(&pos)
    }

    /// The chunk at `pos`, if loaded.
    #[must_use]
    pub fn chunk(&self, pos: ChunkPos) -> Option<Arc<RamChunk>> {
        self.chunks.read().get(&pos).cloned()
    }

    /// Replaces a block. Returns false if its chunk is not loaded.
    pub fn set_block(&self, pos: BlockPos, properties: BlockLightProperties) -> bool {
        let Some(chunk) = self.chunk(pos.chunk_pos()) else {
            log::debug!("ignoring block change at {pos} in unloaded chunk");
            return false;
        };
        chunk.set_block(pos, properties);
        true
    }

    /// Drains the sections whose published light changed since the last call.
    pub fn take_light_updates(&self) -> FxHashSet<(LightLayer, SectionPos)> {
        mem::take(&mut *self.light_updates.lock())
    }
}

impl LightChunkGetter for RamOnlyWorld {
    type Chunk = RamChunk;

    fn chunk_for_lighting(&self, pos: ChunkPos) -> Option<Arc<RamChunk>> {
        self.chunk(pos)
    }

    fn on_light_update(&self, layer: LightLayer, section: SectionPos) {
        self.light_updates.lock().insert((layer, section));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Tests are allowed to panic
mod tests {
    use super::*;

    #[test]
    fn blocks_default_to_air() {
        let world = RamOnlyWorld::new(0, 64);
        let chunk = world.add_chunk(ChunkPos::new(0, 0));
        assert!(chunk.light_properties(BlockPos::new(3, 3, 3)).is_air());
        assert!(chunk.is_section_empty(0));
    }

    #[test]
    fn set_block_tracks_sections_and_sources() {
        let world = RamOnlyWorld::new(0, 64);
        let chunk = world.add_chunk(ChunkPos::new(0, 0));
        let torch = BlockPos::new(1, 20, 1);
        assert!(world.set_block(torch, BlockLightProperties::AIR.with_emission(14)));
        assert!(!chunk.is_section_empty(1));
        assert_eq!(chunk.light_sources(), vec![(torch, 14)]);

        assert!(world.set_block(torch, BlockLightProperties::AIR));
        assert!(chunk.is_section_empty(1));
    }

    #[test]
    fn unloaded_chunks_reject_writes() {
        let world = RamOnlyWorld::new(0, 64);
        assert!(!world.set_block(BlockPos::new(100, 0, 0), BlockLightProperties::SOLID));
        assert!(world.chunk_for_lighting(ChunkPos::new(6, 0)).is_none());
    }

    #[test]
    fn records_light_updates() {
        let world = RamOnlyWorld::new(0, 64);
        world.on_light_update(LightLayer::Sky, SectionPos::new(0, 1, 0));
        world.on_light_update(LightLayer::Sky, SectionPos::new(0, 1, 0));
        assert_eq!(world.take_light_updates().len(), 1);
        assert!(world.take_light_updates().is_empty());
    }
}
