//! # Steel Light CLI
//!
//! Runs a scripted lighting session on an in-memory world and logs what the
//! engine did. The config path can be given as the first argument and
//! defaults to `config/steel_light.json5`.

use std::{env, path::PathBuf, sync::Arc, time::Instant};

use anyhow::{Context, anyhow};
use steel_light::{
    BlockLightProperties, LevelLightEngine, LightConfig, LightLayer, ThreadedLevelLightEngine,
    ram_world::RamOnlyWorld,
};
use steel_utils::{BlockPos, ChunkPos, SectionPos, logger};

/// Chunks loaded in every direction around the origin.
const RADIUS: i32 = 2;

fn main() -> anyhow::Result<()> {
    let path = env::args_os()
        .nth(1)
        .map_or_else(|| PathBuf::from("config/steel_light.json5"), PathBuf::from);
    let config = LightConfig::load_or_create(&path)
        .with_context(|| format!("failed to load {}", path.display()))?;
    logger::init(&config.log_level).map_err(|err| anyhow!("failed to install logger: {err}"))?;

    log::info!(
        "Starting light session: y {}..{}, block light {}, sky light {}",
        config.min_y,
        config.min_y + config.height as i32,
        config.has_block_light,
        config.has_sky_light
    );

    let world = Arc::new(RamOnlyWorld::new(config.min_y, config.height as i32));
    let engine = ThreadedLevelLightEngine::new(Arc::clone(&world), &config);

    let start = Instant::now();
    load_terrain(&world, &engine, config.min_y)?;
    settle(&engine);
    log::info!(
        "Lit {} chunks in {:?}",
        (RADIUS * 2 + 1).pow(2),
        start.elapsed()
    );

    let torch = BlockPos::new(8, 4, 8);
    world.set_block(torch, BlockLightProperties::AIR.with_emission(14));
    let ticks = pump(&engine, config.updates_per_tick, |light| {
        light.on_block_emission_increase(torch, 14);
    });
    log::info!("Torch settled after {ticks} ticks");
    report(&engine, torch);

    let roof = torch.offset(0, 6, 0);
    world.set_block(roof, BlockLightProperties::SOLID);
    let ticks = pump(&engine, config.updates_per_tick, |light| {
        light.update_section_status(SectionPos::of(roof), false);
        light.check_block(roof);
    });
    log::info!("Roof settled after {ticks} ticks");
    report(&engine, torch);

    world.set_block(torch, BlockLightProperties::AIR);
    let ticks = pump(&engine, config.updates_per_tick, |light| light.check_block(torch));
    log::info!("Torch removal settled after {ticks} ticks");
    report(&engine, torch);

    let light = engine.light_engine().lock();
    for layer in [LightLayer::Block, LightLayer::Sky] {
        log::info!(
            "{layer:?} light of {}: {}",
            SectionPos::of(torch),
            light.debug_data(layer, SectionPos::of(torch))
        );
    }
    log::info!("{} sections changed during the session", world.take_light_updates().len());
    Ok(())
}

/// Loads the chunks around the origin with a stone floor below y = 0 and
/// queues them for lighting.
fn load_terrain(
    world: &RamOnlyWorld,
    engine: &ThreadedLevelLightEngine<RamOnlyWorld>,
    min_y: i32,
) -> anyhow::Result<()> {
    for cx in -RADIUS..=RADIUS {
        for cz in -RADIUS..=RADIUS {
            let column = ChunkPos::new(cx, cz);
            let chunk = world.add_chunk(column);
            for x in 0..16 {
                for z in 0..16 {
                    for y in min_y..0 {
                        let pos = BlockPos::new(cx * 16 + x, y, cz * 16 + z);
                        chunk.set_block(pos, BlockLightProperties::SOLID);
                    }
                }
            }
            engine.light_chunk(column, false, |column| {
                log::debug!("chunk {column} lit");
            })?;
        }
    }
    Ok(())
}

fn settle(engine: &ThreadedLevelLightEngine<RamOnlyWorld>) {
    while engine.has_work() {
        engine.try_schedule_update();
    }
}

/// Applies `change`, then spends at most `budget` steps per tick until the
/// light settles. Returns the number of ticks used.
fn pump<F>(engine: &ThreadedLevelLightEngine<RamOnlyWorld>, budget: usize, change: F) -> usize
where
    F: FnOnce(&mut LevelLightEngine<RamOnlyWorld>),
{
    let mut light = engine.light_engine().lock();
    change(&mut *light);
    let mut ticks = 0;
    while light.has_light_work() {
        let _span = tracing::debug_span!("tick", tick = ticks).entered();
        light.run_updates(budget, true, true);
        ticks += 1;
    }
    ticks
}

fn report(engine: &ThreadedLevelLightEngine<RamOnlyWorld>, torch: BlockPos) {
    let light = engine.light_engine().lock();
    for dy in [0, 1, 5, 6] {
        let pos = torch.offset(0, dy, 0);
        log::info!(
            "  {pos}: block {}, sky {}, brightness {}",
            light.light_value(LightLayer::Block, pos),
            light.light_value(LightLayer::Sky, pos),
            light.get_raw_brightness(pos, 0)
        );
    }
}
