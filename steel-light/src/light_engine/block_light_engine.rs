//! Block light propagation.

use steel_utils::{BlockPos, SectionPos};

use super::{
    Direction, MAX_LIGHT_LEVEL,
    dynamic_graph::{DynamicGraph, GraphNode},
    layer_engine::{LayerPropagation, LightLayerEngine},
};
use crate::chunk_getter::{LightChunkGetter, LightLayer};

/// Light emitted by blocks, spreading with a cost of `max(1, opacity)` per step.
pub struct BlockPropagation;

/// The block light engine.
pub type BlockLightEngine<G> = LightLayerEngine<G, BlockPropagation>;

impl LayerPropagation for BlockPropagation {
    const LAYER: LightLayer = LightLayer::Block;

    fn compute_level_from_neighbor<G: LightChunkGetter>(
        engine: &mut LightLayerEngine<G, Self>,
        source: GraphNode<BlockPos>,
        target: GraphNode<BlockPos>,
        level: u8,
    ) -> u8 {
        let GraphNode::At(to) = target else {
            return MAX_LIGHT_LEVEL;
        };
        let GraphNode::At(from) = source else {
            let emission = engine.chunks.light_emission(to);
            return level.saturating_add(MAX_LIGHT_LEVEL - emission.min(MAX_LIGHT_LEVEL));
        };
        if level >= MAX_LIGHT_LEVEL {
            return level;
        }
        let Some(direction) = Direction::between(from, to) else {
            return MAX_LIGHT_LEVEL;
        };

        let to_properties = engine.properties(to);
        if to_properties.opacity >= MAX_LIGHT_LEVEL {
            return MAX_LIGHT_LEVEL;
        }
        let from_properties = engine.properties(from);
        if from_properties
            .face(direction)
            .occludes_with(to_properties.face(direction.opposite()))
        {
            return MAX_LIGHT_LEVEL;
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
        if excluded != GraphNode::Source {
            best = best.min(engine.compute_level_from_neighbor(GraphNode::Source, node, 0));
            if best == 0 {
                return 0;
            }
        }

        for direction in Direction::ALL {
            let neighbour = direction.relative(pos);
            if GraphNode::At(neighbour) == excluded || !engine.is_tracked(neighbour) {
                continue;
            }
            let level = engine.get_level(GraphNode::At(neighbour));
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
        for direction in Direction::ALL {
            let neighbour = direction.relative(pos);
            if SectionPos::of(neighbour) != section && !engine.is_tracked(neighbour) {
                continue;
            }
            engine.check_neighbor(node, GraphNode::At(neighbour), level, decrease);
        }
    }
}

impl<G: LightChunkGetter> LightLayerEngine<G, BlockPropagation> {
    /// Brightens `pos` to at least `emission` after a light source appeared.
    pub fn on_block_emission_increase(&mut self, pos: BlockPos, emission: u8) {
        self.storage.run_all_updates();
        if self.is_tracked(pos) {
            self.check_edge(
                GraphNode::Source,
                GraphNode::At(pos),
                MAX_LIGHT_LEVEL - emission.min(MAX_LIGHT_LEVEL),
                true,
            );
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Tests are allowed to panic
mod tests {
    use std::sync::Arc;

    use steel_utils::ChunkPos;

    use super::*;
    use crate::{
        chunk_getter::{BlockLightProperties, FaceShape},
        ram_world::RamOnlyWorld,
    };

    fn engine_with_section(world: &Arc<RamOnlyWorld>) -> BlockLightEngine<RamOnlyWorld> {
        let mut engine = BlockLightEngine::new(Arc::clone(world));
        engine.update_section_status(SectionPos::new(0, 0, 0), false);
        engine.run_updates(usize::MAX, true, false);
        engine
    }

    fn settle(engine: &mut BlockLightEngine<RamOnlyWorld>) {
        while engine.has_light_work() {
            engine.run_updates(usize::MAX, true, false);
        }
    }

    #[test]
    fn source_costs_follow_emission() {
        let world = Arc::new(RamOnlyWorld::new(0, 16));
        world.add_chunk(ChunkPos::new(0, 0));
        let torch = BlockPos::new(8, 8, 8);
        world.set_block(torch, BlockLightProperties::AIR.with_emission(14));
        let mut engine = engine_with_section(&world);

        assert_eq!(engine.compute_level_from_neighbor(GraphNode::Source, GraphNode::At(torch), 0), 1);
        assert_eq!(engine.compute_level_from_neighbor(GraphNode::At(torch), GraphNode::Source, 0), 15);
    }

    #[test]
    fn solid_neighbours_block_light() {
        let world = Arc::new(RamOnlyWorld::new(0, 16));
        world.add_chunk(ChunkPos::new(0, 0));
        let wall = BlockPos::new(4, 4, 4);
        world.set_block(wall, BlockLightProperties::SOLID);
        let mut engine = engine_with_section(&world);

        let beside = BlockPos::new(3, 4, 4);
        assert_eq!(engine.compute_level_from_neighbor(GraphNode::At(beside), GraphNode::At(wall), 2), 15);
        let glass = BlockPos::new(5, 5, 5);
        world.set_block(glass, BlockLightProperties::translucent(3));
        assert_eq!(
            engine.compute_level_from_neighbor(GraphNode::At(BlockPos::new(5, 4, 5)), GraphNode::At(glass), 2),
            5
        );
    }

    #[test]
    fn half_faces_seal_only_when_complementary() {
        let world = Arc::new(RamOnlyWorld::new(0, 16));
        world.add_chunk(ChunkPos::new(0, 0));
        let lower = FaceShape::rect(0, 0, 4, 2);
        let upper = FaceShape::rect(0, 2, 4, 4);
        let west = BlockPos::new(4, 4, 4);
        let east = BlockPos::new(5, 4, 4);
        world.set_block(west, BlockLightProperties::AIR.with_face(Direction::East, lower));
        world.set_block(east, BlockLightProperties::AIR.with_face(Direction::West, lower));
        let mut engine = engine_with_section(&world);
        assert_eq!(engine.compute_level_from_neighbor(GraphNode::At(west), GraphNode::At(east), 0), 1);

        world.set_block(east, BlockLightProperties::AIR.with_face(Direction::West, upper));
        assert_eq!(engine.compute_level_from_neighbor(GraphNode::At(west), GraphNode::At(east), 0), 15);
    }

    #[test]
    fn torch_lights_and_unlights() {
        let world = Arc::new(RamOnlyWorld::new(0, 16));
        world.add_chunk(ChunkPos::new(0, 0));
        let torch = BlockPos::new(8, 8, 8);
        world.set_block(torch, BlockLightProperties::AIR.with_emission(15));
        let mut engine = engine_with_section(&world);

        engine.on_block_emission_increase(torch, 15);
        settle(&mut engine);
        assert_eq!(engine.light_value(torch), 15);
        assert_eq!(engine.light_value(torch.offset(0, 0, 3)), 12);

        world.set_block(torch, BlockLightProperties::AIR);
        engine.check_block(torch);
        settle(&mut engine);
        assert_eq!(engine.light_value(torch), 0);
        assert_eq!(engine.light_value(torch.offset(0, 0, 3)), 0);
    }

    #[test]
    fn emission_outside_tracked_sections_is_ignored() {
        let world = Arc::new(RamOnlyWorld::new(0, 16));
        let mut engine = BlockLightEngine::new(Arc::clone(&world));
        engine.on_block_emission_increase(BlockPos::new(0, 200, 0), 15);
        assert!(!DynamicGraph::has_work(&engine));
        assert_eq!(engine.run_updates(10, true, false), 10);
    }
}
