//! Sky light propagation.
//!
//! Sky light behaves like block light with two additions: full sunlight falls
//! straight down through transparent blocks without losing strength, and
//! everything above the top section of a lit column is implicitly at full
//! brightness. Propagation skips over untracked sections (gaps) below the
//! top, treating the nearest stored section above as their light.

use rustc_hash::FxHashSet;
use steel_utils::{BlockPos, SectionPos};

use super::{
    Direction, MAX_LIGHT_LEVEL,
    dynamic_graph::{DynamicGraph, GraphNode},
    layer_engine::{LayerPropagation, LightLayerEngine},
    section_storage::LIGHT_ONLY_SECTION,
};
use crate::chunk_getter::{LightChunkGetter, LightLayer};

/// Light coming down from the sky.
pub struct SkyPropagation;

/// The sky light engine.
pub type SkyLightEngine<G> = LightLayerEngine<G, SkyPropagation>;

impl LayerPropagation for SkyPropagation {
    const LAYER: LightLayer = LightLayer::Sky;

    fn compute_level_from_neighbor<G: LightChunkGetter>(
        engine: &mut LightLayerEngine<G, Self>,
        source: GraphNode<BlockPos>,
        target: GraphNode<BlockPos>,
        level: u8,
    ) -> u8 {
        let (GraphNode::At(from), GraphNode::At(to)) = (source, target) else {
            return MAX_LIGHT_LEVEL;
        };
        if level >= MAX_LIGHT_LEVEL {
            return level;
        }
        let to_properties = engine.properties(to);
        if to_properties.opacity >= MAX_LIGHT_LEVEL {
            return MAX_LIGHT_LEVEL;
        }
        let Some(direction) = Direction::between(from, to) else {
            return MAX_LIGHT_LEVEL;
        };

        let from_properties = engine.properties(from);
        if from_properties
            .face(direction)
            .occludes_with(to_properties.face(direction.opposite()))
        {
            return MAX_LIGHT_LEVEL;
        }

        let straight_down = from.x() == to.x() && from.z() == to.z() && from.y() > to.y();
        if straight_down && level == 0 && to_properties.opacity == 0 {
            return 0;
        }
        level + to_properties.opacity.max(1)
    }

    fn get_computed_level<G: LightChunkGetter>(
        engine: &mut LightLayerEngine<G, Self>,
        node: GraphNode<BlockPos>,
        excluded: GraphNode<BlockPos>,
        max_level: u8,
    ) -> u8 {
        let GraphNode::At(pos) = node else {
            return max_level;
        };
        let mut best = max_level;
        for direction in Direction::ALL {
            let neighbour = direction.relative(pos);
            if GraphNode::At(neighbour) == excluded {
                continue;
            }
            let level = if engine.is_tracked(neighbour) {
                engine.get_level(GraphNode::At(neighbour))
            } else if direction == Direction::Down {
                continue;
            } else {
                MAX_LIGHT_LEVEL - engine.storage.updating_light_value(neighbour)
            };
            best = best.min(engine.compute_level_from_neighbor(GraphNode::At(neighbour), node, level));
            if best == 0 {
                return 0;
            }
        }
        best
    }

    fn check_neighbors_after_update<G: LightChunkGetter>(
        engine: &mut LightLayerEngine<G, Self>,
        node: GraphNode<BlockPos>,
        level: u8,
        decrease: bool,
    ) {
        let GraphNode::At(pos) = node else {
            return;
        };
        let section = SectionPos::of(pos);

        // count untracked sections directly below a section's floor
        let mut gap = 0;
        if pos.y() & 15 == 0 {
            while !engine.storage.storing_light_for_section(section.offset(0, -gap - 1, 0))
                && engine.storage.has_sections_below(section.y() - gap - 1)
            {
                gap += 1;
            }
        }

        let below = pos.offset(0, -1 - gap * 16, 0);
        if SectionPos::of(below) == section || engine.is_tracked(below) {
            engine.check_neighbor(node, GraphNode::At(below), level, decrease);
        }
        let above = pos.offset(0, 1, 0);
        if SectionPos::of(above) == section || engine.is_tracked(above) {
            engine.check_neighbor(node, GraphNode::At(above), level, decrease);
        }

        for direction in Direction::HORIZONTALS {
            let (dx, _, dz) = direction.offset();
            for depth in 0..=gap * 16 {
                let neighbour = pos.offset(dx, -depth, dz);
                if SectionPos::of(neighbour) == section {
                    engine.check_neighbor(node, GraphNode::At(neighbour), level, decrease);
                    break;
                }
                if engine.is_tracked(neighbour) {
                    let from = pos.offset(0, -depth, 0);
                    engine.check_neighbor(GraphNode::At(from), GraphNode::At(neighbour), level, decrease);
                }
            }
        }
    }

    fn check_node<G: LightChunkGetter>(engine: &mut LightLayerEngine<G, Self>, pos: BlockPos) {
        engine.storage.run_all_updates();
        let mut section = SectionPos::of(pos);
        if engine.storage.storing_light_for_section(section) {
            engine.recheck_node(GraphNode::At(pos));
            return;
        }

        let mut probe = pos.section_floor();
        while !engine.storage.storing_light_for_section(section) && !engine.storage.is_above_data(section) {
            section = section.offset(0, 1, 0);
            probe = probe.offset(0, 16, 0);
        }
        if engine.storage.storing_light_for_section(section) {
            engine.recheck_node(GraphNode::At(probe));
        }
    }

    fn mark_source_inconsistencies<G: LightChunkGetter>(engine: &mut LightLayerEngine<G, Self>) {
        let Some(sky) = engine.storage.sky.as_mut() else {
            return;
        };
        if !sky.has_source_inconsistencies() {
            return;
        }
        let (to_add, to_remove) = sky.take_source_changes();
        let _span = tracing::trace_span!("sky_sources", added = to_add.len(), removed = to_remove.len()).entered();

        for &section in &to_add {
            let level = engine.storage.section_level(section);
            if level > LIGHT_ONLY_SECTION || to_remove.contains(&section) {
                continue;
            }
            let newly_lit = engine
                .storage
                .sky
                .as_mut()
                .is_some_and(|sky| sky.add_sources(section));
            if !newly_lit {
                continue;
            }

            if level == LIGHT_ONLY_SECTION {
                engine.clear_queued_section_blocks(section);
                engine.storage.fill_section(section, MAX_LIGHT_LEVEL);
                seed_horizontal_neighbours(engine, section, &to_add, &to_remove);
                let below = section.offset(0, -1, 0);
                if engine.storage.storing_light_for_section(below) {
                    seed_face(engine, section, Direction::Down);
                }
            } else {
                for top in Direction::Up.section_face(section) {
                    engine.check_edge(GraphNode::Source, GraphNode::At(top), 0, true);
                }
            }
        }

        for section in to_remove {
            let had_sources = engine
                .storage
                .sky
                .as_mut()
                .is_some_and(|sky| sky.remove_sources(section));
            if had_sources && engine.storage.storing_light_for_section(section) {
                for top in Direction::Up.section_face(section) {
                    engine.check_edge(GraphNode::Source, GraphNode::At(top), MAX_LIGHT_LEVEL, false);
                }
            }
        }
    }
}

/// Spreads the light of a freshly filled section into horizontal neighbours
/// that have no sky sources of their own.
fn seed_horizontal_neighbours<G: LightChunkGetter>(
    engine: &mut SkyLightEngine<G>,
    section: SectionPos,
    to_add: &FxHashSet<SectionPos>,
    to_remove: &FxHashSet<SectionPos>,
) {
    for direction in Direction::HORIZONTALS {
        let neighbour = direction.relative_section(section);
        let lit = engine
            .storage
            .sky
            .as_ref()
            .is_some_and(|sky| sky.has_sources(neighbour));
        let unlit = to_remove.contains(&neighbour) || (!lit && !to_add.contains(&neighbour));
        if unlit && engine.storage.storing_light_for_section(neighbour) {
            seed_face(engine, section, direction);
        }
    }
}

/// Propagates full light from every block on one face of `section` outwards.
fn seed_face<G: LightChunkGetter>(engine: &mut SkyLightEngine<G>, section: SectionPos, direction: Direction) {
    for inside in direction.section_face(section) {
        let outside = direction.relative(inside);
        let through = engine.compute_level_from_neighbor(GraphNode::At(inside), GraphNode::At(outside), 0);
        engine.check_edge(GraphNode::At(inside), GraphNode::At(outside), through, true);
    }
}
