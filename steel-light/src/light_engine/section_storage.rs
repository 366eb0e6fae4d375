//! Per layer section storage.
//!
//! Owns the light sections of one layer in two copies: the updating map that
//! propagation writes to, and the visible map readers see. Which sections get
//! storage is itself decided by a small [`DynamicGraph`] over section
//! positions: sections holding blocks sit at level 0, their 26 neighbours at
//! level 1, and everything else at level 2 (no storage).

use std::sync::Arc;

use arc_swap::ArcSwap;
use rustc_hash::{FxHashMap, FxHashSet};
use steel_utils::{BlockPos, ChunkPos, SectionPos, types::block_to_section_coord};

use super::{
    dynamic_graph::{DynamicGraph, GraphNode, LevelPropagator},
    sky_section_storage::SkySourceTracking,
    storage_map::{LightSectionMap, LightSnapshotReader, SkyLightRead},
};
use crate::{chunk_getter::LightLayer, light_storage::LightStorage};

/// Tracker level of a section holding blocks.
pub const DATA_SECTION: u8 = 0;
/// Tracker level of a section next to a data section; it stores light only.
pub const LIGHT_ONLY_SECTION: u8 = 1;
/// Tracker level of a section without storage.
pub const EMPTY_SECTION: u8 = 2;

/// Offsets of a section's 3x3x3 neighbourhood, itself included.
fn neighbourhood() -> impl Iterator<Item = (i32, i32, i32)> {
    (-1..=1).flat_map(|dx| (-1..=1).flat_map(move |dy| (-1..=1).map(move |dz| (dx, dy, dz))))
}

/// Light sections of one layer plus the bookkeeping for adding and removing them.
pub struct LightSectionStorage {
    layer: LightLayer,
    tracker: LevelPropagator<SectionPos>,

    data_section_set: FxHashSet<SectionPos>,
    to_mark_no_data: FxHashSet<SectionPos>,
    to_mark_data: FxHashSet<SectionPos>,

    pub(crate) updating: LightSectionMap,
    visible: Arc<ArcSwap<LightSectionMap>>,

    pub(crate) changed_sections: FxHashSet<SectionPos>,
    pub(crate) sections_affected_by_light_updates: FxHashSet<SectionPos>,

    queued_sections: FxHashMap<SectionPos, Arc<LightStorage>>,
    untrusted_sections: FxHashSet<SectionPos>,
    columns_to_retain_queued_data_for: FxHashSet<ChunkPos>,
    to_remove: FxHashSet<SectionPos>,
    sections_to_check_edges: FxHashSet<SectionPos>,

    pub(crate) sky: Option<SkySourceTracking>,
}

impl LightSectionStorage {
    /// Creates empty storage for `layer`.
    #[must_use]
    pub fn new(layer: LightLayer) -> Self {
        Self {
            layer,
            tracker: LevelPropagator::new(EMPTY_SECTION + 1),
            data_section_set: FxHashSet::default(),
            to_mark_no_data: FxHashSet::default(),
            to_mark_data: FxHashSet::default(),
            updating: LightSectionMap::default(),
            visible: Arc::new(ArcSwap::from_pointee(LightSectionMap::default())),
            changed_sections: FxHashSet::default(),
            sections_affected_by_light_updates: FxHashSet::default(),
            queued_sections: FxHashMap::default(),
            untrusted_sections: FxHashSet::default(),
            columns_to_retain_queued_data_for: FxHashSet::default(),
            to_remove: FxHashSet::default(),
            sections_to_check_edges: FxHashSet::default(),
            sky: matches!(layer, LightLayer::Sky).then(SkySourceTracking::default),
        }
    }

    /// The layer stored here.
    #[must_use]
    pub const fn layer(&self) -> LightLayer {
        self.layer
    }

    /// A handle onto the published snapshot.
    #[must_use]
    pub fn reader(&self) -> LightSnapshotReader {
        LightSnapshotReader::new(self.layer, Arc::clone(&self.visible))
    }

    /// Whether `section` currently has light storage.
    #[must_use]
    #[inline]
    pub fn storing_light_for_section(&self, section: SectionPos) -> bool {
        self.updating.has_layer(section)
    }

    /// The updating copy of a section.
    #[must_use]
    #[inline]
    pub fn data_layer(&self, section: SectionPos) -> Option<&Arc<LightStorage>> {
        self.updating.layer(section)
    }

    /// The section to persist or send: queued data first, then the published copy.
    #[must_use]
    pub fn data_layer_data(&self, section: SectionPos) -> Option<Arc<LightStorage>> {
        self.queued_sections
            .get(&section)
            .cloned()
            .or_else(|| self.visible.load().layer(section).cloned())
    }

    /// The published light value at `pos`.
    #[must_use]
    pub fn light_value(&self, pos: BlockPos) -> u8 {
        self.reader().light_value(pos)
    }

    /// The light value at `pos` as currently being propagated.
    #[must_use]
    pub fn updating_light_value(&self, pos: BlockPos) -> u8 {
        match self.layer {
            LightLayer::Block => self.updating.block_light_value(pos),
            LightLayer::Sky => match self.updating.sky_light_value(pos) {
                SkyLightRead::Stored(level) => level,
                SkyLightRead::AboveData if self.light_on_in_section(SectionPos::of(pos)) => 15,
                SkyLightRead::AboveData => 0,
            },
        }
    }

    /// The stored light value at `pos`; untracked sections read as 0.
    #[must_use]
    #[inline]
    pub fn stored_level(&self, pos: BlockPos) -> u8 {
        self.updating
            .layer(SectionPos::of(pos))
            .map_or(0, |layer| layer.get_at(pos))
    }

    /// Writes a light value into the updating map.
    pub fn set_stored_level(&mut self, pos: BlockPos, level: u8) {
        let section = SectionPos::of(pos);
        let Some(layer) = self.updating.layer_mut(section) else {
            log::trace!("dropping {:?} light write at {pos} in untracked section", self.layer);
            return;
        };
        layer.set_at(pos, level);
        self.changed_sections.insert(section);
        self.mark_affected_around(pos);
    }

    /// Marks every section `pos` touches, including across section borders.
    fn mark_affected_around(&mut self, pos: BlockPos) {
        let xs = block_to_section_coord(pos.x() - 1)..=block_to_section_coord(pos.x() + 1);
        let ys = block_to_section_coord(pos.y() - 1)..=block_to_section_coord(pos.y() + 1);
        let zs = block_to_section_coord(pos.z() - 1)..=block_to_section_coord(pos.z() + 1);
        for x in xs {
            for y in ys.clone() {
                for z in zs.clone() {
                    self.sections_affected_by_light_updates
                        .insert(SectionPos::new(x, y, z));
                }
            }
        }
    }

    /// The tracker level of `section`.
    #[must_use]
    pub fn section_level(&self, section: SectionPos) -> u8 {
        self.get_level(GraphNode::At(section))
    }

    /// Marks a section as holding blocks (`not_ready == false`) or as empty.
    pub fn update_section_status(&mut self, section: SectionPos, not_ready: bool) {
        let is_data = self.data_section_set.contains(&section);
        if !is_data && !not_ready {
            self.to_mark_data.insert(section);
            self.check_edge(GraphNode::Source, GraphNode::At(section), DATA_SECTION, true);
        }
        if is_data && not_ready {
            self.to_mark_no_data.insert(section);
            self.check_edge(GraphNode::Source, GraphNode::At(section), EMPTY_SECTION, false);
        }
    }

    /// Settles the section tracker.
    pub fn run_all_updates(&mut self) {
        if self.has_work() {
            self.run_updates(usize::MAX);
        }
    }

    /// Keeps (or stops keeping) queued data of `column` when its sections are removed.
    pub fn retain_data(&mut self, column: ChunkPos, retain: bool) {
        if retain {
            self.columns_to_retain_queued_data_for.insert(column);
        } else {
            self.columns_to_retain_queued_data_for.remove(&column);
        }
    }

    /// Queues externally supplied light for `section`, or drops queued light
    /// when `data` is `None`.
    ///
    /// Data queued with `non_edge == false` is untrusted at its borders and
    /// gets its edges rechecked even when edge propagation is skipped.
    pub fn queue_section_data(
        &mut self,
        section: SectionPos,
        data: Option<Arc<LightStorage>>,
        non_edge: bool,
    ) {
        match data {
            Some(layer) => {
                self.queued_sections.insert(section, layer);
                if non_edge {
                    self.untrusted_sections.remove(&section);
                } else {
                    self.untrusted_sections.insert(section);
                }
            }
            None => {
                self.queued_sections.remove(&section);
            }
        }
    }

    /// Whether sections wait to be removed or sky sources to be reseeded.
    #[must_use]
    pub fn has_inconsistencies(&self) -> bool {
        !self.to_remove.is_empty()
            || self
                .sky
                .as_ref()
                .is_some_and(SkySourceTracking::has_source_inconsistencies)
    }

    /// Schedules the borders of `section` to be rechecked on the next flush.
    ///
    /// Light next to a section whose blocks were unknown was computed as if
    /// they were opaque; rechecking the faces corrects that once they load.
    pub fn recheck_edges(&mut self, section: SectionPos) {
        self.sections_to_check_edges.insert(section);
    }

    /// Whether border rechecks are waiting for the next flush.
    #[must_use]
    pub fn has_pending_edge_checks(&self) -> bool {
        !self.sections_to_check_edges.is_empty()
    }

    pub(crate) fn take_sections_to_check_edges(&mut self) -> Vec<SectionPos> {
        self.sections_to_check_edges.drain().collect()
    }

    /// Whether queued external data is waiting to be installed.
    #[must_use]
    pub fn has_queued_sections(&self) -> bool {
        !self.queued_sections.is_empty()
    }

    /// Whether the updating map holds changes readers have not seen.
    #[must_use]
    pub fn has_unpublished_changes(&self) -> bool {
        !self.changed_sections.is_empty() || !self.sections_affected_by_light_updates.is_empty()
    }

    pub(crate) fn take_sections_to_remove(&mut self) -> Vec<SectionPos> {
        self.to_remove.drain().collect()
    }

    /// Drops the storage of a removed section, keeping its data queued if the
    /// column is retained.
    pub(crate) fn drop_section(&mut self, section: SectionPos) {
        let queued = self.queued_sections.remove(&section);
        let stored = self.updating.remove_layer(section);
        if stored.is_some() {
            self.changed_sections.insert(section);
        }
        if self
            .columns_to_retain_queued_data_for
            .contains(&section.column())
            && let Some(layer) = queued.or(stored)
        {
            self.queued_sections.insert(section, layer);
        }
    }

    /// Tracked sections whose queued data differs from what is stored.
    pub(crate) fn queued_sections_to_install(&self) -> Vec<SectionPos> {
        self.queued_sections
            .iter()
            .filter(|(section, queued)| {
                self.updating
                    .layer(**section)
                    .is_some_and(|stored| !Arc::ptr_eq(stored, queued))
            })
            .map(|(section, _)| *section)
            .collect()
    }

    pub(crate) fn install_queued_section(&mut self, section: SectionPos) {
        if let Some(layer) = self.queued_sections.get(&section) {
            self.updating.insert_layer(section, Arc::clone(layer));
            self.changed_sections.insert(section);
        }
    }

    /// Sections whose borders must be rechecked after installing queued data.
    pub(crate) fn sections_needing_edge_checks(&self, skip_edge: bool) -> Vec<SectionPos> {
        if skip_edge {
            self.untrusted_sections.iter().copied().collect()
        } else {
            self.queued_sections.keys().copied().collect()
        }
    }

    /// Whether `section` still has unapplied queued data.
    #[must_use]
    pub(crate) fn is_queued(&self, section: SectionPos) -> bool {
        self.queued_sections.contains_key(&section)
    }

    pub(crate) fn finish_queued_sections(&mut self) {
        self.untrusted_sections.clear();
        let updating = &self.updating;
        self.queued_sections
            .retain(|section, _| !updating.has_layer(*section));
    }

    /// Replaces the whole section with one uniform light value.
    pub(crate) fn fill_section(&mut self, section: SectionPos, level: u8) {
        if self.updating.has_layer(section) {
            self.updating
                .insert_layer(section, Arc::new(LightStorage::new_filled(level)));
            self.changed_sections.insert(section);
            for (dx, dy, dz) in neighbourhood() {
                self.sections_affected_by_light_updates
                    .insert(section.offset(dx, dy, dz));
            }
        }
    }

    /// Publishes the updating map and reports every section whose light changed.
    pub fn swap_section_map(&mut self, mut on_update: impl FnMut(SectionPos)) {
        if !self.changed_sections.is_empty() {
            self.visible.store(Arc::new(self.updating.clone()));
            self.changed_sections.clear();
        }
        for section in self.sections_affected_by_light_updates.drain() {
            on_update(section);
        }
    }

    /// A new section's initial light: queued data, or the layer's default.
    fn create_data_layer(&self, section: SectionPos) -> Arc<LightStorage> {
        if let Some(queued) = self.queued_sections.get(&section) {
            return Arc::clone(queued);
        }
        if self.sky.is_some() {
            return self.sky_create_data_layer(section);
        }
        Arc::new(LightStorage::new_empty())
    }

    fn on_node_added(&mut self, section: SectionPos) {
        if self.sky.is_some() {
            self.sky_on_node_added(section);
        }
    }

    pub(crate) fn on_node_removed(&mut self, section: SectionPos) {
        if self.sky.is_some() {
            self.sky_on_node_removed(section);
        }
    }

    fn level_from_source(&self, section: SectionPos) -> u8 {
        if self.to_mark_no_data.contains(&section) {
            EMPTY_SECTION
        } else if self.data_section_set.contains(&section) || self.to_mark_data.contains(&section) {
            DATA_SECTION
        } else {
            EMPTY_SECTION
        }
    }

    /// A short status line for debug overlays.
    #[must_use]
    pub fn debug_data(&self, section: SectionPos) -> String {
        let status = match self.section_level(section) {
            DATA_SECTION => "data",
            LIGHT_ONLY_SECTION => "light only",
            _ => "empty",
        };
        if self.is_queued(section) {
            format!("{status} (queued)")
        } else {
            status.to_owned()
        }
    }
}

impl DynamicGraph for LightSectionStorage {
    type Pos = SectionPos;

    fn propagator(&self) -> &LevelPropagator<SectionPos> {
        &self.tracker
    }

    fn propagator_mut(&mut self) -> &mut LevelPropagator<SectionPos> {
        &mut self.tracker
    }

    fn get_computed_level(
        &mut self,
        node: GraphNode<SectionPos>,
        excluded: GraphNode<SectionPos>,
        max_level: u8,
    ) -> u8 {
        let GraphNode::At(section) = node else {
            return max_level;
        };
        let mut best = max_level;
        for (dx, dy, dz) in neighbourhood() {
            let neighbour = if (dx, dy, dz) == (0, 0, 0) {
                GraphNode::Source
            } else {
                GraphNode::At(section.offset(dx, dy, dz))
            };
            if neighbour == excluded {
                continue;
            }
            let level = self.get_level(neighbour);
            best = best.min(self.compute_level_from_neighbor(neighbour, node, level));
            if best == 0 {
                return 0;
            }
        }
        best
    }

    fn check_neighbors_after_update(
        &mut self,
        node: GraphNode<SectionPos>,
        level: u8,
        decrease: bool,
    ) {
        let GraphNode::At(section) = node else {
            return;
        };
        for (dx, dy, dz) in neighbourhood() {
            if (dx, dy, dz) != (0, 0, 0) {
                self.check_neighbor(node, GraphNode::At(section.offset(dx, dy, dz)), level, decrease);
            }
        }
    }

    fn get_level(&self, node: GraphNode<SectionPos>) -> u8 {
        let GraphNode::At(section) = node else {
            return EMPTY_SECTION;
        };
        if self.data_section_set.contains(&section) {
            DATA_SECTION
        } else if !self.to_remove.contains(&section) && self.updating.has_layer(section) {
            LIGHT_ONLY_SECTION
        } else {
            EMPTY_SECTION
        }
    }

    fn set_level(&mut self, node: GraphNode<SectionPos>, level: u8) {
        let GraphNode::At(section) = node else {
            return;
        };
        let old = self.get_level(node);
        if old != DATA_SECTION && level == DATA_SECTION {
            self.data_section_set.insert(section);
            self.to_mark_data.remove(&section);
            self.sections_to_check_edges.insert(section);
        }
        if old == DATA_SECTION && level != DATA_SECTION {
            self.data_section_set.remove(&section);
            self.to_mark_no_data.remove(&section);
        }
        if old >= EMPTY_SECTION && level != EMPTY_SECTION && !self.to_remove.remove(&section) {
            let layer = self.create_data_layer(section);
            self.updating.insert_layer(section, layer);
            self.changed_sections.insert(section);
            self.on_node_added(section);
            for (dx, dy, dz) in neighbourhood() {
                self.sections_affected_by_light_updates
                    .insert(section.offset(dx, dy, dz));
            }
        }
        if old != EMPTY_SECTION && level >= EMPTY_SECTION {
            self.to_remove.insert(section);
        }
    }

    fn compute_level_from_neighbor(
        &mut self,
        source: GraphNode<SectionPos>,
        target: GraphNode<SectionPos>,
        level: u8,
    ) -> u8 {
        match (source, target) {
            (GraphNode::Source, GraphNode::At(section)) => self.level_from_source(section),
            (GraphNode::Source, GraphNode::Source) => EMPTY_SECTION,
            (GraphNode::At(_), _) => level.saturating_add(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settle(storage: &mut LightSectionStorage) {
        storage.run_all_updates();
    }

    #[test]
    fn data_section_allocates_its_neighbourhood() {
        let mut storage = LightSectionStorage::new(LightLayer::Block);
        let section = SectionPos::new(0, 4, 0);
        storage.update_section_status(section, false);
        settle(&mut storage);

        assert_eq!(storage.section_level(section), DATA_SECTION);
        for (dx, dy, dz) in neighbourhood() {
            assert!(storage.storing_light_for_section(section.offset(dx, dy, dz)));
        }
        assert_eq!(storage.section_level(section.offset(1, 1, 1)), LIGHT_ONLY_SECTION);
        assert!(!storage.storing_light_for_section(section.offset(2, 0, 0)));
        assert_eq!(storage.updating.len(), 27);
        assert!(storage.has_pending_edge_checks());
        assert_eq!(storage.take_sections_to_check_edges(), vec![section]);
        assert!(!storage.has_pending_edge_checks());
    }

    #[test]
    fn emptied_section_is_queued_for_removal() {
        let mut storage = LightSectionStorage::new(LightLayer::Block);
        let section = SectionPos::new(0, 0, 0);
        storage.update_section_status(section, false);
        settle(&mut storage);
        storage.update_section_status(section, true);
        settle(&mut storage);

        assert!(storage.has_inconsistencies());
        let mut removed = storage.take_sections_to_remove();
        removed.sort_by_key(|s| (s.x(), s.y(), s.z()));
        assert_eq!(removed.len(), 27);
        for section in removed {
            storage.drop_section(section);
        }
        assert!(storage.updating.is_empty());
        assert!(!storage.has_inconsistencies());
    }

    #[test]
    fn re_adding_before_flush_cancels_removal() {
        let mut storage = LightSectionStorage::new(LightLayer::Block);
        let section = SectionPos::new(0, 0, 0);
        storage.update_section_status(section, false);
        settle(&mut storage);
        storage.update_section_status(section, true);
        settle(&mut storage);
        storage.update_section_status(section, false);
        settle(&mut storage);

        assert!(!storage.has_inconsistencies());
        assert_eq!(storage.section_level(section), DATA_SECTION);
    }

    #[test]
    fn writes_publish_only_on_swap() {
        let mut storage = LightSectionStorage::new(LightLayer::Block);
        storage.update_section_status(SectionPos::new(0, 0, 0), false);
        settle(&mut storage);
        storage.swap_section_map(|_| {});

        let pos = BlockPos::new(3, 4, 5);
        storage.set_stored_level(pos, 12);
        assert_eq!(storage.stored_level(pos), 12);
        assert_eq!(storage.light_value(pos), 0);

        let mut notified = Vec::new();
        storage.swap_section_map(|section| notified.push(section));
        assert_eq!(storage.light_value(pos), 12);
        assert!(notified.contains(&SectionPos::new(0, 0, 0)));
        assert!(!storage.has_unpublished_changes());
    }

    #[test]
    fn writes_to_untracked_sections_are_dropped() {
        let mut storage = LightSectionStorage::new(LightLayer::Block);
        let pos = BlockPos::new(100, 100, 100);
        storage.set_stored_level(pos, 7);
        assert_eq!(storage.stored_level(pos), 0);
        assert!(!storage.has_unpublished_changes());
    }

    #[test]
    fn retained_columns_keep_removed_data_queued() {
        let mut storage = LightSectionStorage::new(LightLayer::Block);
        let section = SectionPos::new(0, 0, 0);
        storage.update_section_status(section, false);
        settle(&mut storage);
        storage.set_stored_level(section.origin(), 9);

        storage.retain_data(section.column(), true);
        storage.drop_section(section);
        let kept = storage.data_layer_data(section);
        assert_eq!(kept.map(|layer| layer.get(0, 0, 0)), Some(9));
    }

    #[test]
    fn queued_data_seeds_new_sections() {
        let mut storage = LightSectionStorage::new(LightLayer::Block);
        let section = SectionPos::new(0, 0, 0);
        let layer = Arc::new(LightStorage::new_filled(6));
        storage.queue_section_data(section, Some(Arc::clone(&layer)), true);
        storage.update_section_status(section, false);
        settle(&mut storage);

        assert!(
            storage
                .data_layer(section)
                .is_some_and(|stored| Arc::ptr_eq(stored, &layer))
        );
        assert!(storage.queued_sections_to_install().is_empty());
        assert_eq!(storage.debug_data(section), "data (queued)");
        storage.finish_queued_sections();
        assert_eq!(storage.debug_data(section), "data");
    }
}
