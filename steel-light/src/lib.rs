//! # Steel Light
//!
//! Incremental block and sky light propagation for voxel levels.
//!
//! Light is tracked per 16x16x16 section. Block edits and chunk loads queue
//! work on a [`ThreadedLevelLightEngine`]; propagation only touches the region
//! whose light actually changes, and readers observe a consistent snapshot
//! that is swapped in once a batch has settled.

pub mod chunk_getter;
pub mod config;
pub mod error;
pub mod light_engine;
pub mod light_storage;
pub mod ram_world;
pub mod sky_light_sources;

pub use chunk_getter::{BlockLightProperties, FaceShape, LightChunk, LightChunkGetter, LightLayer};
pub use config::LightConfig;
pub use error::LightError;
pub use light_engine::{LevelLightEngine, LightSnapshotReader, ThreadedLevelLightEngine};
pub use light_storage::LightStorage;
