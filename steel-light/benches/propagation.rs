#![allow(missing_docs)]
//! Benchmarks for light propagation.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::{hint::black_box, sync::Arc};

use steel_light::{
    BlockLightProperties, LightConfig, LightLayer, ThreadedLevelLightEngine,
    ram_world::RamOnlyWorld,
};
use steel_utils::{BlockPos, ChunkPos, SectionPos};

const MIN_Y: i32 = -64;
const HEIGHT: i32 = 384;

fn config() -> LightConfig {
    LightConfig {
        min_y: MIN_Y,
        height: HEIGHT as u32,
        ..LightConfig::default()
    }
}

/// Loads the 3x3 chunks around the origin with a stone floor below y = 0.
fn create_world() -> Arc<RamOnlyWorld> {
    let world = Arc::new(RamOnlyWorld::new(MIN_Y, HEIGHT));
    for cx in -1..=1 {
        for cz in -1..=1 {
            world.add_chunk(ChunkPos::new(cx, cz));
        }
    }
    for x in -16..32 {
        for z in -16..32 {
            for y in MIN_Y..0 {
                world.set_block(BlockPos::new(x, y, z), BlockLightProperties::SOLID);
            }
        }
    }
    world
}

fn lit_engine(world: &Arc<RamOnlyWorld>) -> ThreadedLevelLightEngine<RamOnlyWorld> {
    let engine = ThreadedLevelLightEngine::new(Arc::clone(world), &config());
    for cx in -1..=1 {
        for cz in -1..=1 {
            // every chunk here is loaded
            let _ = engine.light_chunk(ChunkPos::new(cx, cz), false, |_| {});
        }
    }
    while engine.has_work() {
        engine.try_schedule_update();
    }
    engine
}

fn bench_torch(c: &mut Criterion) {
    let world = create_world();
    let engine = lit_engine(&world);

    let mut group = c.benchmark_group("torch");

    // Open air and right on the floor, where half the sphere is blocked
    let positions = [(BlockPos::new(8, 40, 8), "open_air"), (BlockPos::new(8, 0, 8), "on_floor")];

    for (torch, name) in positions {
        group.bench_with_input(BenchmarkId::new("place_and_remove", name), &torch, |b, &torch| {
            b.iter(|| {
                world.set_block(torch, BlockLightProperties::AIR.with_emission(15));
                engine.on_block_emission_increase(torch, 15);
                engine.run_update();

                world.set_block(torch, BlockLightProperties::AIR);
                engine.check_block(torch);
                engine.run_update();
                black_box(engine.light_reader(LightLayer::Block));
            });
        });
    }

    group.finish();
}

fn bench_light_chunk(c: &mut Criterion) {
    let world = create_world();

    c.bench_function("light_chunk_column", |b| {
        b.iter(|| {
            let engine = lit_engine(black_box(&world));
            black_box(engine.has_work());
        });
    });
}

fn bench_roof(c: &mut Criterion) {
    let world = create_world();
    let engine = lit_engine(&world);
    let roof = BlockPos::new(8, 100, 8);

    c.bench_function("sky_roof_place_and_remove", |b| {
        b.iter(|| {
            world.set_block(roof, BlockLightProperties::SOLID);
            engine.update_section_status(SectionPos::of(roof), false);
            engine.check_block(roof);
            engine.run_update();

            world.set_block(roof, BlockLightProperties::AIR);
            engine.check_block(roof);
            engine.run_update();
        });
    });
}

criterion_group!(benches, bench_torch, bench_light_chunk, bench_roof);
criterion_main!(benches);
