//! The light engine of a whole level.

use std::sync::Arc;

use steel_utils::{BlockPos, ChunkPos, SectionPos};

use super::{BlockLightEngine, LightSnapshotReader, SkyLightEngine};
use crate::{
    chunk_getter::{LightChunkGetter, LightLayer},
    config::LightConfig,
    light_storage::LightStorage,
};

/// Owns the block and sky light engines of one level.
///
/// Either layer may be absent; a level without a sky has no sky engine and
/// reads as dark sky everywhere.
pub struct LevelLightEngine<G: LightChunkGetter> {
    min_section: i32,
    section_count: i32,
    block_engine: Option<BlockLightEngine<G>>,
    sky_engine: Option<SkyLightEngine<G>>,
}

impl<G: LightChunkGetter> LevelLightEngine<G> {
    /// Creates the engines enabled in `config`, reading blocks from `getter`.
    #[must_use]
    pub fn new(getter: Arc<G>, config: &LightConfig) -> Self {
        Self {
            min_section: config.min_y >> 4,
            section_count: (config.height / 16) as i32,
            block_engine: config
                .has_block_light
                .then(|| BlockLightEngine::new(Arc::clone(&getter))),
            sky_engine: config
                .has_sky_light
                .then(|| SkyLightEngine::new(Arc::clone(&getter))),
        }
    }

    /// The block light engine, if the level has block light.
    #[must_use]
    pub const fn block_engine(&self) -> Option<&BlockLightEngine<G>> {
        self.block_engine.as_ref()
    }

    /// The sky light engine, if the level has a sky.
    #[must_use]
    pub const fn sky_engine(&self) -> Option<&SkyLightEngine<G>> {
        self.sky_engine.as_ref()
    }

    /// Re-evaluates light around `pos` after the block there changed.
    pub fn check_block(&mut self, pos: BlockPos) {
        if let Some(engine) = &mut self.block_engine {
            engine.check_block(pos);
        }
        if let Some(engine) = &mut self.sky_engine {
            engine.check_block(pos);
        }
    }

    /// Brightens `pos` after a light source with `emission` appeared there.
    pub fn on_block_emission_increase(&mut self, pos: BlockPos, emission: u8) {
        if let Some(engine) = &mut self.block_engine {
            engine.on_block_emission_increase(pos, emission);
        }
    }

    /// Whether another [`Self::run_updates`] call has anything to do.
    #[must_use]
    pub fn has_light_work(&self) -> bool {
        self.block_engine
            .as_ref()
            .is_some_and(|engine| engine.has_light_work())
            || self
                .sky_engine
                .as_ref()
                .is_some_and(|engine| engine.has_light_work())
    }

    /// Runs at most `budget` propagation steps and returns the unused budget.
    ///
    /// With both layers present the budget is split between them. Block light
    /// gets half and sky light the rest plus whatever block light left over.
    /// If block light used up its half, it runs again on what sky light left.
    pub fn run_updates(&mut self, budget: usize, do_skylight: bool, skip_edge: bool) -> usize {
        match (&mut self.block_engine, &mut self.sky_engine) {
            (Some(block), Some(sky)) => {
                let block_budget = budget / 2;
                let block_left = block.run_updates(block_budget, do_skylight, skip_edge);
                let sky_left = sky.run_updates(budget - block_budget + block_left, do_skylight, skip_edge);
                if block_left == 0 && sky_left > 0 {
                    block.run_updates(sky_left, do_skylight, skip_edge)
                } else {
                    sky_left
                }
            }
            (Some(block), None) => block.run_updates(budget, do_skylight, skip_edge),
            (None, Some(sky)) => sky.run_updates(budget, do_skylight, skip_edge),
            (None, None) => budget,
        }
    }

    /// Runs propagation until it settles.
    pub fn run_light_updates(&mut self) -> usize {
        self.run_updates(usize::MAX, true, true)
    }

    /// Marks a section as holding blocks (`not_ready == false`) or as empty.
    pub fn update_section_status(&mut self, section: SectionPos, not_ready: bool) {
        if let Some(engine) = &mut self.block_engine {
            engine.update_section_status(section, not_ready);
        }
        if let Some(engine) = &mut self.sky_engine {
            engine.update_section_status(section, not_ready);
        }
    }

    /// Turns the sky sources of a column on or off.
    pub fn enable_light_sources(&mut self, column: ChunkPos, enabled: bool) {
        if let Some(engine) = &mut self.block_engine {
            engine.enable_light_sources(column, enabled);
        }
        if let Some(engine) = &mut self.sky_engine {
            engine.enable_light_sources(column, enabled);
        }
    }

    /// Rechecks light across the borders of every section of `column`.
    ///
    /// Light computed while the column was unloaded treated its blocks as
    /// opaque; this lets it flow in once the blocks are known.
    pub fn recheck_column_edges(&mut self, column: ChunkPos) {
        for section_y in self.min_light_section()..self.max_light_section() {
            let section = column.section(section_y);
            if let Some(engine) = &mut self.block_engine {
                engine.recheck_edges(section);
            }
            if let Some(engine) = &mut self.sky_engine {
                engine.recheck_edges(section);
            }
        }
    }

    /// Keeps queued light of `column` while its sections are unloaded.
    pub fn retain_data(&mut self, column: ChunkPos, retain: bool) {
        if let Some(engine) = &mut self.block_engine {
            engine.retain_data(column, retain);
        }
        if let Some(engine) = &mut self.sky_engine {
            engine.retain_data(column, retain);
        }
    }

    /// Queues externally supplied light for one section of one layer.
    pub fn queue_section_data(
        &mut self,
        layer: LightLayer,
        section: SectionPos,
        data: Option<Arc<LightStorage>>,
        non_edge: bool,
    ) {
        match layer {
            LightLayer::Block => {
                if let Some(engine) = &mut self.block_engine {
                    engine.queue_section_data(section, data, non_edge);
                }
            }
            LightLayer::Sky => {
                if let Some(engine) = &mut self.sky_engine {
                    engine.queue_section_data(section, data, non_edge);
                }
            }
        }
    }

    /// The light of a section for persistence or network transfer.
    #[must_use]
    pub fn data_layer_data(&self, layer: LightLayer, section: SectionPos) -> Option<Arc<LightStorage>> {
        match layer {
            LightLayer::Block => self.block_engine.as_ref()?.data_layer_data(section),
            LightLayer::Sky => self.sky_engine.as_ref()?.data_layer_data(section),
        }
    }

    /// The published light value of `layer` at `pos`; 0 if the layer is absent.
    #[must_use]
    pub fn light_value(&self, layer: LightLayer, pos: BlockPos) -> u8 {
        match layer {
            LightLayer::Block => self.block_engine.as_ref().map_or(0, |e| e.light_value(pos)),
            LightLayer::Sky => self.sky_engine.as_ref().map_or(0, |e| e.light_value(pos)),
        }
    }

    /// A thread safe read handle onto one layer.
    #[must_use]
    pub fn light_reader(&self, layer: LightLayer) -> Option<LightSnapshotReader> {
        match layer {
            LightLayer::Block => self.block_engine.as_ref().map(|engine| engine.reader()),
            LightLayer::Sky => self.sky_engine.as_ref().map(|engine| engine.reader()),
        }
    }

    /// The combined brightness at `pos`, with sky light dimmed by `ambient_darkness`.
    #[must_use]
    pub fn get_raw_brightness(&self, pos: BlockPos, ambient_darkness: u8) -> u8 {
        let sky = self
            .light_value(LightLayer::Sky, pos)
            .saturating_sub(ambient_darkness);
        self.light_value(LightLayer::Block, pos).max(sky)
    }

    /// A status line of `section` in `layer` for debug overlays.
    #[must_use]
    pub fn debug_data(&self, layer: LightLayer, section: SectionPos) -> String {
        let data = match layer {
            LightLayer::Block => self.block_engine.as_ref().map(|e| e.debug_data(section)),
            LightLayer::Sky => self.sky_engine.as_ref().map(|e| e.debug_data(section)),
        };
        data.unwrap_or_else(|| "n/a".to_owned())
    }

    /// The lowest section of the level.
    #[must_use]
    pub const fn min_section(&self) -> i32 {
        self.min_section
    }

    /// One past the highest section of the level.
    #[must_use]
    pub const fn max_section(&self) -> i32 {
        self.min_section + self.section_count
    }

    /// Number of sections that can hold light: the level padded by one section
    /// above and below.
    #[must_use]
    pub const fn light_section_count(&self) -> i32 {
        self.section_count + 2
    }

    /// The lowest section that can hold light.
    #[must_use]
    pub const fn min_light_section(&self) -> i32 {
        self.min_section - 1
    }

    /// One past the highest section that can hold light.
    #[must_use]
    pub const fn max_light_section(&self) -> i32 {
        self.min_light_section() + self.light_section_count()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Tests are allowed to panic
mod tests {
    use super::*;
    use crate::{chunk_getter::BlockLightProperties, ram_world::RamOnlyWorld};

    fn config(has_sky_light: bool) -> LightConfig {
        LightConfig {
            min_y: -64,
            height: 384,
            has_sky_light,
            ..LightConfig::default()
        }
    }

    #[test]
    fn light_section_range_pads_the_level() {
        let world = Arc::new(RamOnlyWorld::new(-64, 384));
        let engine = LevelLightEngine::new(world, &config(true));
        assert_eq!(engine.min_section(), -4);
        assert_eq!(engine.max_section(), 20);
        assert_eq!(engine.min_light_section(), -5);
        assert_eq!(engine.light_section_count(), 26);
        assert_eq!(engine.max_light_section(), 21);
    }

    #[test]
    fn missing_sky_reads_dark() {
        let world = Arc::new(RamOnlyWorld::new(-64, 384));
        let engine = LevelLightEngine::new(world, &config(false));
        assert!(engine.sky_engine().is_none());
        assert!(engine.light_reader(LightLayer::Sky).is_none());
        assert_eq!(engine.light_value(LightLayer::Sky, BlockPos::new(0, 400, 0)), 0);
        assert_eq!(engine.debug_data(LightLayer::Sky, SectionPos::new(0, 0, 0)), "n/a");
    }

    #[test]
    fn raw_brightness_takes_the_brighter_layer() {
        let world = Arc::new(RamOnlyWorld::new(-64, 384));
        let column = ChunkPos::new(0, 0);
        world.add_chunk(column);
        let torch = BlockPos::new(4, 10, 4);
        world.set_block(torch, BlockLightProperties::AIR.with_emission(12));

        let mut engine = LevelLightEngine::new(Arc::clone(&world), &config(true));
        engine.update_section_status(column.section(0), false);
        engine.enable_light_sources(column, true);
        engine.on_block_emission_increase(torch, 12);
        while engine.has_light_work() {
            engine.run_light_updates();
        }

        // open sky everywhere in this column
        assert_eq!(engine.get_raw_brightness(torch, 0), 15);
        assert_eq!(engine.get_raw_brightness(torch, 5), 12);
        assert_eq!(engine.get_raw_brightness(torch, 15), 12);
    }

    #[test]
    fn block_only_work_spends_the_whole_budget() {
        let world = Arc::new(RamOnlyWorld::new(-64, 384));
        let column = ChunkPos::new(0, 0);
        world.add_chunk(column);
        let mut engine = LevelLightEngine::new(Arc::clone(&world), &config(true));
        engine.update_section_status(column.section(0), false);
        engine.enable_light_sources(column, true);
        engine.run_light_updates();
        assert!(!engine.has_light_work());

        let torch = BlockPos::new(8, 8, 8);
        world.set_block(torch, BlockLightProperties::AIR.with_emission(15));
        engine.on_block_emission_increase(torch, 15);
        assert_eq!(engine.run_updates(100, true, true), 0);
        assert!(engine.has_light_work());

        while engine.has_light_work() {
            engine.run_updates(100, true, true);
        }
        assert_eq!(engine.light_value(LightLayer::Block, torch.offset(0, 0, 3)), 12);
    }

    #[test]
    fn split_budget_returns_leftover() {
        let world = Arc::new(RamOnlyWorld::new(-64, 384));
        let mut engine = LevelLightEngine::new(world, &config(true));
        assert_eq!(engine.run_updates(100, true, false), 100);
        assert!(!engine.has_light_work());
    }
}
