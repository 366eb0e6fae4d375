//! Sky specific parts of [`LightSectionStorage`].
//!
//! Sky light is only stored below the top section of each column. Which
//! sections seed full sky light is tracked lazily: column height changes
//! queue sections to gain or lose their sources, and the engine reseeds them
//! on its next flush.

use std::{mem, sync::Arc};

use rustc_hash::FxHashSet;
use steel_utils::{ChunkPos, SectionPos};

use super::section_storage::LightSectionStorage;
use crate::light_storage::LightStorage;

/// Deferred sky source bookkeeping.
#[derive(Debug, Default)]
pub struct SkySourceTracking {
    sections_with_sources: FxHashSet<SectionPos>,
    sections_to_add_sources_to: FxHashSet<SectionPos>,
    sections_to_remove_sources_from: FxHashSet<SectionPos>,
    columns_with_sky_sources: FxHashSet<ChunkPos>,
}

impl SkySourceTracking {
    fn queue_add_source(&mut self, section: SectionPos) {
        self.sections_to_add_sources_to.insert(section);
        self.sections_to_remove_sources_from.remove(&section);
    }

    fn queue_remove_source(&mut self, section: SectionPos) {
        self.sections_to_remove_sources_from.insert(section);
        self.sections_to_add_sources_to.remove(&section);
    }

    /// Whether sections wait to gain or lose their sky sources.
    #[must_use]
    pub fn has_source_inconsistencies(&self) -> bool {
        !self.sections_to_add_sources_to.is_empty()
            || !self.sections_to_remove_sources_from.is_empty()
    }

    /// Whether `section` currently seeds sky light.
    #[must_use]
    pub fn has_sources(&self, section: SectionPos) -> bool {
        self.sections_with_sources.contains(&section)
    }

    /// Records that `section` now seeds sky light. Returns false if it already did.
    pub(crate) fn add_sources(&mut self, section: SectionPos) -> bool {
        self.sections_with_sources.insert(section)
    }

    /// Records that `section` no longer seeds sky light. Returns false if it did not.
    pub(crate) fn remove_sources(&mut self, section: SectionPos) -> bool {
        self.sections_with_sources.remove(&section)
    }

    /// Takes the queued additions and removals, in that order.
    pub(crate) fn take_source_changes(&mut self) -> (FxHashSet<SectionPos>, FxHashSet<SectionPos>) {
        (
            mem::take(&mut self.sections_to_add_sources_to),
            mem::take(&mut self.sections_to_remove_sources_from),
        )
    }
}

impl LightSectionStorage {
    pub(crate) fn sky_on_node_added(&mut self, section: SectionPos) {
        let column = section.column();
        let y = section.y();
        let sources = self.updating.sources_mut();
        sources.lower_floor(y);

        let old_top = sources.top_section(column);
        if old_top >= y + 1 {
            return;
        }
        sources.set_top_section(column, y + 1);
        let lowest = sources.current_lowest_y();

        if let Some(sky) = self.sky.as_mut()
            && sky.columns_with_sky_sources.contains(&column)
        {
            sky.queue_add_source(section);
            if old_top > lowest {
                sky.queue_remove_source(SectionPos::new(column.x(), old_top - 1, column.z()));
            }
        }
    }

    pub(crate) fn sky_on_node_removed(&mut self, section: SectionPos) {
        let column = section.column();
        let lit = self
            .sky
            .as_ref()
            .is_some_and(|sky| sky.columns_with_sky_sources.contains(&column));
        if lit && let Some(sky) = self.sky.as_mut() {
            sky.queue_remove_source(section);
        }

        let mut y = section.y();
        if self.updating.sources().top_section(column) != y + 1 {
            return;
        }
        let mut below = section;
        while !self.storing_light_for_section(below) && self.updating.sources().has_sections_below(y) {
            y -= 1;
            below = below.offset(0, -1, 0);
        }

        if self.storing_light_for_section(below) {
            self.updating.sources_mut().set_top_section(column, y + 1);
            if lit && let Some(sky) = self.sky.as_mut() {
                sky.queue_add_source(below);
            }
        } else {
            self.updating.sources_mut().remove_column(column);
        }
    }

    /// A new sky section starts as a copy of the bottom layer of the nearest
    /// stored section above it.
    pub(crate) fn sky_create_data_layer(&self, section: SectionPos) -> Arc<LightStorage> {
        let sources = self.updating.sources();
        let top = sources.top_section(section.column());
        let mut above = section.offset(0, 1, 0);
        if top == sources.current_lowest_y() {
            return Arc::new(LightStorage::new_empty());
        }
        while above.y() < top {
            if let Some(layer) = self.updating.layer(above) {
                return Arc::new(layer.repeat_first_layer());
            }
            above = above.offset(0, 1, 0);
        }
        Arc::new(LightStorage::new_empty())
    }

    /// Turns sky light on or off for a whole column.
    pub fn enable_light_sources(&mut self, column: ChunkPos, enabled: bool) {
        self.run_all_updates();
        let sources = self.updating.sources();
        let top = sources.top_section(column);
        let lowest = sources.current_lowest_y();
        let Some(sky) = self.sky.as_mut() else {
            return;
        };
        if enabled {
            if sky.columns_with_sky_sources.insert(column) && top != lowest {
                sky.queue_add_source(SectionPos::new(column.x(), top - 1, column.z()));
            }
        } else {
            sky.columns_with_sky_sources.remove(&column);
        }
    }

    /// Whether the column of `section` receives sky light.
    #[must_use]
    pub fn light_on_in_section(&self, section: SectionPos) -> bool {
        self.sky
            .as_ref()
            .is_some_and(|sky| sky.columns_with_sky_sources.contains(&section.column()))
    }

    /// Whether `section` lies above every stored section of its column.
    #[must_use]
    pub fn is_above_data(&self, section: SectionPos) -> bool {
        self.updating
            .sources()
            .is_above_data(section.column(), section.y())
    }

    /// Whether any stored section lies at or below height `section_y`.
    #[must_use]
    pub fn has_sections_below(&self, section_y: i32) -> bool {
        self.updating.sources().has_sections_below(section_y)
    }

    /// The top section height of `column`.
    #[must_use]
    pub fn top_section(&self, column: ChunkPos) -> i32 {
        self.updating.sources().top_section(column)
    }
}
