//! 2-element LRU cache for chunk access during light propagation.

use std::sync::Arc;

use steel_utils::{BlockPos, ChunkPos};

use crate::chunk_getter::{BlockLightProperties, LightChunk, LightChunkGetter};

/// 2-element LRU cache for recently accessed chunks.
///
/// Propagation touches the same one or two chunks over and over, so the last
/// two lookups are kept, including lookups that found no chunk. When both
/// slots are full the least recently used entry is evicted.
pub struct ChunkCache<G: LightChunkGetter> {
    getter: Arc<G>,

    /// Cached chunk positions with their lookup result.
    slots: [Option<(ChunkPos, Option<Arc<G::Chunk>>)>; 2],

    /// Access counters for LRU tracking (higher = more recent).
    access_counter: [u64; 2],

    /// Global access counter.
    global_counter: u64,
}

impl<G: LightChunkGetter> ChunkCache<G> {
    /// Creates a new empty chunk cache over `getter`.
    #[must_use]
    pub const fn new(getter: Arc<G>) -> Self {
        Self {
            getter,
            slots: [None, None],
            access_counter: [0, 0],
            global_counter: 0,
        }
    }

    /// The world behind the cache.
    #[must_use]
    pub const fn getter(&self) -> &Arc<G> {
        &self.getter
    }

    /// Returns the chunk at `pos`, consulting the world on a miss.
    pub fn chunk(&mut self, pos: ChunkPos) -> Option<Arc<G::Chunk>> {
        self.global_counter += 1;

        for (slot, counter) in self.slots.iter().zip(self.access_counter.iter_mut()) {
            if let Some((cached_pos, chunk)) = slot
                && *cached_pos == pos
            {
                *counter = self.global_counter;
                return chunk.clone();
            }
        }

        let chunk = self.getter.chunk_for_lighting(pos);
        let lru_idx = usize::from(self.access_counter[1] < self.access_counter[0]);
        self.slots[lru_idx] = Some((pos, chunk.clone()));
        self.access_counter[lru_idx] = self.global_counter;
        chunk
    }

    /// The light properties of the block at `pos`; unloaded space is opaque.
    pub fn light_properties(&mut self, pos: BlockPos) -> BlockLightProperties {
        self.chunk(pos.chunk_pos())
            .map_or(BlockLightProperties::UNLOADED, |chunk| {
                chunk.light_properties(pos)
            })
    }

    /// The emission of the block at `pos`; unloaded space emits nothing.
    pub fn light_emission(&mut self, pos: BlockPos) -> u8 {
        self.chunk(pos.chunk_pos())
            .map_or(0, |chunk| chunk.light_emission(pos))
    }

    /// Clears the cache.
    pub fn clear(&mut self) {
        self.slots = [None, None];
        self.access_counter = [0, 0];
        self.global_counter = 0;
    }
}
