//! Incremental light propagation.
//!
//! Light changes are relaxed with a bucketed min fixed point graph instead of
//! flood filling from scratch, so the work done is proportional to the region
//! whose light actually changed.

mod block_light_engine;
mod chunk_cache;
pub mod direction;
pub mod dynamic_graph;
mod layer_engine;
pub mod level_light_engine;
pub mod light_queue;
pub mod section_storage;
mod sky_light_engine;
mod sky_section_storage;
pub mod storage_map;
pub mod threaded_level_light_engine;

/// Brightest light value; also the darkest graph level.
pub const MAX_LIGHT_LEVEL: u8 = 15;

/// Number of graph levels used by the block and sky engines.
pub const LEVEL_COUNT: u8 = MAX_LIGHT_LEVEL + 1;

// Re-export main types for convenience
pub use block_light_engine::{BlockLightEngine, BlockPropagation};
pub use chunk_cache::ChunkCache;
pub use direction::Direction;
pub use dynamic_graph::{DynamicGraph, GraphNode, LevelPropagator};
pub use layer_engine::{LayerPropagation, LightLayerEngine};
pub use level_light_engine::LevelLightEngine;
pub use light_queue::LightQueue;
pub use section_storage::LightSectionStorage;
pub use sky_light_engine::{SkyLightEngine, SkyPropagation};
pub use sky_section_storage::SkySourceTracking;
pub use storage_map::{LightSectionMap, LightSnapshotReader, SkyLightRead};
pub use threaded_level_light_engine::{TaskType, ThreadedLevelLightEngine};
