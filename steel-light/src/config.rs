//! Light engine configuration.

use serde::Deserialize;
use std::{fs, path::Path};

use crate::error::LightError;

const DEFAULT_CONFIG: &str = include_str!("../../package-content/steel_light.json5");

/// Settings of a level's light engine, read from `steel_light.json5`.
#[derive(Debug, Clone, Deserialize)]
pub struct LightConfig {
    /// Lowest block y of the level. Must be a multiple of 16.
    pub min_y: i32,
    /// Height of the level in blocks. Must be a positive multiple of 16.
    pub height: u32,
    /// Whether the level propagates block light.
    pub has_block_light: bool,
    /// Whether the level has a sky.
    pub has_sky_light: bool,
    /// Queued light tasks that trigger a batch on their own.
    pub task_per_batch: usize,
    /// Propagation steps spent per tick by the host scheduler.
    pub updates_per_tick: usize,
    /// Default log filter when `RUST_LOG` is not set.
    pub log_level: String,
}

impl LightConfig {
    /// Reads the config at `path`, writing the default config there first if
    /// it does not exist.
    pub fn load_or_create(path: &Path) -> Result<Self, LightError> {
        if !path.exists() {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, DEFAULT_CONFIG)?;
            log::info!("wrote default light config to {}", path.display());
        }
        let config: Self = serde_json5::from_str(&fs::read_to_string(path)?)?;
        config.validate().map_err(LightError::InvalidConfig)?;
        Ok(config)
    }

    /// Parses a config from json5 text.
    pub fn from_json5(text: &str) -> Result<Self, LightError> {
        let config: Self = serde_json5::from_str(text)?;
        config.validate().map_err(LightError::InvalidConfig)?;
        Ok(config)
    }

    /// Rejects values the engine cannot run with.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.height == 0 || self.height % 16 != 0 {
            return Err("Height must be a positive multiple of 16");
        }
        if self.min_y % 16 != 0 {
            return Err("Minimum y must be a multiple of 16");
        }
        if self.task_per_batch == 0 {
            return Err("Tasks per batch must be at least 1");
        }
        if self.updates_per_tick == 0 {
            return Err("Updates per tick must be at least 1");
        }
        Ok(())
    }
}

impl Default for LightConfig {
    fn default() -> Self {
        Self {
            min_y: -64,
            height: 384,
            has_block_light: true,
            has_sky_light: true,
            task_per_batch: 1000,
            updates_per_tick: 10_000,
            log_level: "info".to_string(),
        }
    }
}
