//! The per layer light engine.
//!
//! [`LightLayerEngine`] runs the block level [`DynamicGraph`] of one light
//! layer over its [`LightSectionStorage`]. Levels are inverted light values:
//! level 0 is full brightness and level 15 is darkness. What differs between
//! block and sky light is supplied by a [`LayerPropagation`].

use std::{marker::PhantomData, sync::Arc};

use steel_utils::{BlockPos, ChunkPos, SectionPos};

use super::{
    Direction, LEVEL_COUNT, MAX_LIGHT_LEVEL,
    chunk_cache::ChunkCache,
    dynamic_graph::{DynamicGraph, GraphNode, LevelPropagator},
    section_storage::LightSectionStorage,
    storage_map::LightSnapshotReader,
};
use crate::{
    chunk_getter::{BlockLightProperties, LightChunkGetter, LightLayer},
    light_storage::LightStorage,
};

/// The layer specific half of a light engine.
pub trait LayerPropagation: Sized + 'static {
    /// The layer this propagation computes.
    const LAYER: LightLayer;

    /// The level `target` gets through the edge from `source` at `level`.
    fn compute_level_from_neighbor<G: LightChunkGetter>(
        engine: &mut LightLayerEngine<G, Self>,
        source: GraphNode<BlockPos>,
        target: GraphNode<BlockPos>,
        level: u8,
    ) -> u8;

    /// Recomputes `node` from its neighbours except `excluded`.
    fn get_computed_level<G: LightChunkGetter>(
        engine: &mut LightLayerEngine<G, Self>,
        node: GraphNode<BlockPos>,
        excluded: GraphNode<BlockPos>,
        max_level: u8,
    ) -> u8;

    /// Schedules the neighbours of `node` after its level changed.
    fn check_neighbors_after_update<G: LightChunkGetter>(
        engine: &mut LightLayerEngine<G, Self>,
        node: GraphNode<BlockPos>,
        level: u8,
        decrease: bool,
    );

    /// Re-evaluates the block at `pos`.
    fn check_node<G: LightChunkGetter>(engine: &mut LightLayerEngine<G, Self>, pos: BlockPos) {
        engine.storage.run_all_updates();
        if engine.is_tracked(pos) {
            engine.recheck_node(GraphNode::At(pos));
        }
    }

    /// Seeds or retracts deferred light sources during a flush.
    fn mark_source_inconsistencies<G: LightChunkGetter>(_engine: &mut LightLayerEngine<G, Self>) {}
}

/// The light engine of one layer.
pub struct LightLayerEngine<G: LightChunkGetter, P> {
    pub(crate) storage: LightSectionStorage,
    graph: LevelPropagator<BlockPos>,
    pub(crate) chunks: ChunkCache<G>,
    running_light_updates: bool,
    _propagation: PhantomData<P>,
}

impl<G: LightChunkGetter, P: LayerPropagation> LightLayerEngine<G, P> {
    /// Creates an engine reading blocks from `getter`.
    #[must_use]
    pub fn new(getter: Arc<G>) -> Self {
        Self {
            storage: LightSectionStorage::new(P::LAYER),
            graph: LevelPropagator::new(LEVEL_COUNT),
            chunks: ChunkCache::new(getter),
            running_light_updates: false,
            _propagation: PhantomData,
        }
    }

    /// The section storage of this layer.
    #[must_use]
    pub const fn storage(&self) -> &LightSectionStorage {
        &self.storage
    }

    /// A read handle onto the published light of this layer.
    #[must_use]
    pub fn reader(&self) -> LightSnapshotReader {
        self.storage.reader()
    }

    /// Whether the block at `pos` lies in a section with light storage.
    #[must_use]
    #[inline]
    pub fn is_tracked(&self, pos: BlockPos) -> bool {
        self.storage
            .storing_light_for_section(SectionPos::of(pos))
    }

    #[inline]
    pub(crate) fn properties(&mut self, pos: BlockPos) -> BlockLightProperties {
        self.chunks.light_properties(pos)
    }

    /// Re-evaluates `pos` and its six neighbours after a block change.
    pub fn check_block(&mut self, pos: BlockPos) {
        P::check_node(self, pos);
        for direction in Direction::ALL {
            P::check_node(self, direction.relative(pos));
        }
    }

    /// Marks a section as holding blocks or as empty.
    pub fn update_section_status(&mut self, section: SectionPos, not_ready: bool) {
        self.storage.update_section_status(section, not_ready);
    }

    /// Turns sky sources of a column on or off. No-op for block light.
    pub fn enable_light_sources(&mut self, column: ChunkPos, enabled: bool) {
        self.storage.enable_light_sources(column, enabled);
    }

    /// Keeps queued light of `column` alive while its sections are unloaded.
    pub fn retain_data(&mut self, column: ChunkPos, retain: bool) {
        self.storage.retain_data(column, retain);
    }

    /// Queues externally supplied light for a section.
    pub fn queue_section_data(
        &mut self,
        section: SectionPos,
        data: Option<Arc<LightStorage>>,
        non_edge: bool,
    ) {
        self.storage.queue_section_data(section, data, non_edge);
    }

    /// Rechecks the borders of `section` on the next flush, after the blocks
    /// on either side changed from unknown to loaded.
    pub fn recheck_edges(&mut self, section: SectionPos) {
        self.storage.recheck_edges(section);
    }

    /// The light of a section for persistence or network transfer.
    #[must_use]
    pub fn data_layer_data(&self, section: SectionPos) -> Option<Arc<LightStorage>> {
        self.storage.data_layer_data(section)
    }

    /// The published light value at `pos`.
    #[must_use]
    pub fn light_value(&self, pos: BlockPos) -> u8 {
        self.storage.light_value(pos)
    }

    /// A short status line of `section` for debug overlays.
    #[must_use]
    pub fn debug_data(&self, section: SectionPos) -> String {
        self.storage.debug_data(section)
    }

    /// Whether another [`Self::run_updates`] call has anything to do.
    #[must_use]
    pub fn has_light_work(&self) -> bool {
        DynamicGraph::has_work(self)
            || self.storage.has_work()
            || self.storage.has_inconsistencies()
            || self.storage.has_pending_edge_checks()
            || self.running_light_updates
            || self.storage.has_unpublished_changes()
    }

    /// Runs at most `budget` steps and returns the unused budget.
    ///
    /// The visible snapshot is only replaced once propagation settles, so a
    /// call that runs out of budget leaves readers on the previous snapshot.
    pub fn run_updates(&mut self, mut budget: usize, do_skylight: bool, skip_edge: bool) -> usize {
        if !self.running_light_updates {
            if self.storage.has_work() {
                budget = self.storage.run_updates(budget);
                if budget == 0 {
                    return 0;
                }
            }
            self.mark_new_inconsistencies(do_skylight, skip_edge);
        }

        self.running_light_updates = true;
        if DynamicGraph::has_work(self) {
            budget = DynamicGraph::run_updates(self, budget);
            self.chunks.clear();
            if budget == 0 {
                return 0;
            }
        }
        self.running_light_updates = false;

        let getter = Arc::clone(self.chunks.getter());
        self.storage
            .swap_section_map(|section| getter.on_light_update(P::LAYER, section));
        budget
    }

    /// Applies the section work deferred since the last flush.
    fn mark_new_inconsistencies(&mut self, do_skylight: bool, skip_edge: bool) {
        if self.storage.has_inconsistencies() || self.storage.has_queued_sections() {
            let removed = self.storage.take_sections_to_remove();
            for &section in &removed {
                self.clear_queued_section_blocks(section);
                self.storage.drop_section(section);
            }
            for &section in &removed {
                self.storage.on_node_removed(section);
            }
            if !removed.is_empty() {
                log::debug!("removed {} {:?} light sections", removed.len(), P::LAYER);
            }

            for section in self.storage.queued_sections_to_install() {
                self.clear_queued_section_blocks(section);
                self.storage.install_queued_section(section);
            }
            for section in self.storage.sections_needing_edge_checks(skip_edge) {
                self.check_edges_for_section(section);
            }
            self.storage.finish_queued_sections();
        }

        if self.storage.has_pending_edge_checks() {
            // blocks behind these faces may have been unloaded when last cached
            self.chunks.clear();
            for section in self.storage.take_sections_to_check_edges() {
                self.check_edges_for_section(section);
            }
        }

        if do_skylight {
            P::mark_source_inconsistencies(self);
        }
    }

    /// Drops every queued block of `section`.
    pub(crate) fn clear_queued_section_blocks(&mut self, section: SectionPos) {
        self.graph
            .remove_if(|node| node.pos().is_some_and(|pos| SectionPos::of(*pos) == section));
    }

    /// Rechecks light across the faces of `section` shared with stored neighbours.
    fn check_edges_for_section(&mut self, section: SectionPos) {
        if !self.storage.storing_light_for_section(section) {
            return;
        }
        for direction in Direction::ALL {
            let neighbour = direction.relative_section(section);
            if self.storage.is_queued(neighbour) || !self.storage.storing_light_for_section(neighbour) {
                continue;
            }
            for inside in direction.section_face(section) {
                let outside = direction.relative(inside);
                self.check_edge_between(GraphNode::At(inside), GraphNode::At(outside));
                self.check_edge_between(GraphNode::At(outside), GraphNode::At(inside));
            }
        }
    }

    fn check_edge_between(&mut self, from: GraphNode<BlockPos>, to: GraphNode<BlockPos>) {
        let level = self.get_level(from);
        let through = self.compute_level_from_neighbor(from, to, level);
        self.check_edge(from, to, through, false);
    }
}

impl<G: LightChunkGetter, P: LayerPropagation> DynamicGraph for LightLayerEngine<G, P> {
    type Pos = BlockPos;

    fn propagator(&self) -> &LevelPropagator<BlockPos> {
        &self.graph
    }

    fn propagator_mut(&mut self) -> &mut LevelPropagator<BlockPos> {
        &mut self.graph
    }

    fn get_computed_level(
        &mut self,
        node: GraphNode<BlockPos>,
        excluded: GraphNode<BlockPos>,
        max_level: u8,
    ) -> u8 {
        P::get_computed_level(self, node, excluded, max_level)
    }

    fn check_neighbors_after_update(&mut self, node: GraphNode<BlockPos>, level: u8, decrease: bool) {
        P::check_neighbors_after_update(self, node, level, decrease);
    }

    fn get_level(&self, node: GraphNode<BlockPos>) -> u8 {
        match node {
            GraphNode::Source => 0,
            GraphNode::At(pos) => MAX_LIGHT_LEVEL - self.storage.stored_level(pos),
        }
    }

    fn set_level(&mut self, node: GraphNode<BlockPos>, level: u8) {
        if let GraphNode::At(pos) = node {
            self.storage
                .set_stored_level(pos, MAX_LIGHT_LEVEL - level.min(MAX_LIGHT_LEVEL));
        }
    }

    fn compute_level_from_neighbor(
        &mut self,
        source: GraphNode<BlockPos>,
        target: GraphNode<BlockPos>,
        level: u8,
    ) -> u8 {
        P::compute_level_from_neighbor(self, source, target, level)
    }
}
