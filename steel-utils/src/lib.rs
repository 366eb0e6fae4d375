//! # Steel Utils
//!
//! Position types, math helpers, and process bootstrap shared by the lighting crates.

pub mod locks;
pub mod logger;
pub mod math;
pub mod types;

pub use types::{BlockPos, ChunkPos, SectionPos};
