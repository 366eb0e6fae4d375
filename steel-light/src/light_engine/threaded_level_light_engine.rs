//! Threaded light engine with task queue system.
//!
//! Any thread may queue lighting work. Tasks are divided into `PRE_UPDATE`
//! (setup) and `POST_UPDATE` (completion) phases and executed in batches
//! around a full propagation run.

use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

use anyhow::Context;
use parking_lot::Mutex;
use steel_utils::{BlockPos, ChunkPos, SectionPos};

use super::{LevelLightEngine, LightSnapshotReader};
use crate::{
    chunk_getter::{LightChunk, LightChunkGetter, LightLayer},
    config::LightConfig,
    error::LightError,
    light_storage::LightStorage,
};

/// Task execution phase.
///
/// Within a batch:
/// 1. All `PRE_UPDATE` tasks run first (setup, marking sections)
/// 2. Light propagation runs
/// 3. All `POST_UPDATE` tasks run last (completion callbacks)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskType {
    /// Tasks executed before light propagation (setup phase).
    PreUpdate,
    /// Tasks executed after light propagation (completion phase).
    PostUpdate,
}

/// A queued task with its phase.
type LightTask<G> = (TaskType, Box<dyn FnOnce(&mut LevelLightEngine<G>) + Send>);

/// A [`LevelLightEngine`] shared between threads.
///
/// # Architecture
///
/// 1. Public methods (like `light_chunk`) create tasks
/// 2. Tasks are queued and batched
/// 3. When the batch size is reached or an update is scheduled, tasks execute
///    on the calling thread under the engine lock:
///    - `PRE_UPDATE` tasks (mark sections, queue changes)
///    - Light propagation until it settles
///    - `POST_UPDATE` tasks (retention, callbacks)
pub struct ThreadedLevelLightEngine<G: LightChunkGetter + 'static> {
    /// The engine doing the propagation.
    light_engine: Arc<Mutex<LevelLightEngine<G>>>,
    /// Queued tasks waiting to be executed.
    light_tasks: Mutex<Vec<LightTask<G>>>,
    /// World access for chunk scans.
    getter: Arc<G>,
    /// Number of queued tasks that triggers a batch.
    task_per_batch: AtomicUsize,
    /// Set while a scheduled update runs.
    scheduled: AtomicBool,
}

impl<G: LightChunkGetter + 'static> ThreadedLevelLightEngine<G> {
    /// Creates a threaded engine over `getter` configured by `config`.
    #[must_use]
    pub fn new(getter: Arc<G>, config: &LightConfig) -> Self {
        Self {
            light_engine: Arc::new(Mutex::new(LevelLightEngine::new(Arc::clone(&getter), config))),
            light_tasks: Mutex::new(Vec::new()),
            getter,
            task_per_batch: AtomicUsize::new(config.task_per_batch),
            scheduled: AtomicBool::new(false),
        }
    }

    /// The wrapped engine.
    #[must_use]
    pub const fn light_engine(&self) -> &Arc<Mutex<LevelLightEngine<G>>> {
        &self.light_engine
    }

    /// A lock free read handle onto one layer.
    #[must_use]
    pub fn light_reader(&self, layer: LightLayer) -> Option<LightSnapshotReader> {
        self.light_engine.lock().light_reader(layer)
    }

    /// Changes how many queued tasks trigger a batch.
    pub fn set_task_per_batch(&self, task_per_batch: usize) {
        self.task_per_batch
            .store(task_per_batch.max(1), Ordering::Relaxed);
    }

    /// Queues a light check around a changed block.
    pub fn check_block(&self, pos: BlockPos) {
        self.add_task(TaskType::PreUpdate, move |engine| engine.check_block(pos));
    }

    /// Queues the brightening after a light source appeared at `pos`.
    pub fn on_block_emission_increase(&self, pos: BlockPos, emission: u8) {
        self.add_task(TaskType::PreUpdate, move |engine| {
            engine.on_block_emission_increase(pos, emission);
        });
    }

    /// Queues a section status change.
    pub fn update_section_status(&self, section: SectionPos, not_ready: bool) {
        self.add_task(TaskType::PreUpdate, move |engine| {
            engine.update_section_status(section, not_ready);
        });
    }

    /// Queues turning the sky sources of a column on or off.
    pub fn enable_light_sources(&self, column: ChunkPos, enabled: bool) {
        self.add_task(TaskType::PreUpdate, move |engine| {
            engine.enable_light_sources(column, enabled);
        });
    }

    /// Queues a change of whether `column` keeps its queued light while unloaded.
    pub fn retain_data(&self, column: ChunkPos, retain: bool) {
        self.add_task(TaskType::PreUpdate, move |engine| {
            engine.retain_data(column, retain);
        });
    }

    /// Queues externally supplied light for a section.
    pub fn queue_section_data(
        &self,
        layer: LightLayer,
        section: SectionPos,
        data: Option<Arc<LightStorage>>,
        non_edge: bool,
    ) {
        self.add_task(TaskType::PreUpdate, move |engine| {
            engine.queue_section_data(layer, section, data, non_edge);
        });
    }

    /// Validates persisted light bytes and queues them for `section`.
    ///
    /// Data that fails validation is rejected; the caller should drop it and
    /// relight the chunk with [`Self::light_chunk`].
    pub fn queue_persisted_layer(
        &self,
        layer: LightLayer,
        section: SectionPos,
        bytes: &[u8],
        non_edge: bool,
    ) -> Result<(), LightError> {
        let storage = LightStorage::from_bytes(bytes).inspect_err(|err| {
            log::warn!("discarding persisted {layer:?} light of section {section}: {err}");
        })?;
        self.queue_section_data(layer, section, Some(Arc::new(storage)), non_edge);
        Ok(())
    }

    /// Lights a freshly loaded chunk from scratch.
    ///
    /// The `PRE_UPDATE` task marks every non-empty section and enables sky
    /// sources for the column. Light that stopped at the column's borders
    /// while it was unloaded is rechecked, and unless `exclude_blocks` is set
    /// every emitting block is seeded. The `POST_UPDATE` task stops retaining queued data and
    /// reports the chunk through `on_lit`.
    pub fn light_chunk<F>(&self, column: ChunkPos, exclude_blocks: bool, on_lit: F) -> anyhow::Result<()>
    where
        F: FnOnce(ChunkPos) + Send + 'static,
    {
        let chunk = self
            .getter
            .chunk_for_lighting(column)
            .with_context(|| format!("chunk {column} is not loaded"))?;

        self.add_task(TaskType::PreUpdate, move |engine| {
            for section_y in engine.min_section()..engine.max_section() {
                if !chunk.is_section_empty(section_y) {
                    engine.update_section_status(column.section(section_y), false);
                }
            }
            engine.enable_light_sources(column, true);
            engine.recheck_column_edges(column);
            if !exclude_blocks {
                for (pos, emission) in chunk.light_sources() {
                    engine.on_block_emission_increase(pos, emission);
                }
            }
        });

        self.add_task(TaskType::PostUpdate, move |engine| {
            engine.retain_data(column, false);
            on_lit(column);
        });
        Ok(())
    }

    /// Forgets a column that was unloaded.
    pub fn update_chunk_status(&self, column: ChunkPos) {
        self.add_task(TaskType::PreUpdate, move |engine| {
            engine.retain_data(column, false);
            engine.enable_light_sources(column, false);
            for section_y in engine.min_light_section()..engine.max_light_section() {
                let section = column.section(section_y);
                engine.queue_section_data(LightLayer::Block, section, None, true);
                engine.queue_section_data(LightLayer::Sky, section, None, true);
            }
            for section_y in engine.min_section()..engine.max_section() {
                engine.update_section_status(column.section(section_y), true);
            }
        });
    }

    /// Adds a task to the task queue, running a batch once enough are queued.
    fn add_task<F>(&self, task_type: TaskType, task: F)
    where
        F: FnOnce(&mut LevelLightEngine<G>) + Send + 'static,
    {
        let mut tasks = self.light_tasks.lock();
        tasks.push((task_type, Box::new(task)));
        let full = tasks.len() >= self.task_per_batch.load(Ordering::Relaxed);
        drop(tasks);

        if full {
            self.run_update();
        }
    }

    /// Runs a batch if there are queued tasks or unfinished light work.
    pub fn try_schedule_update(&self) {
        if !self.has_work() {
            return;
        }
        if self
            .scheduled
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            self.run_update();
            self.scheduled.store(false, Ordering::Release);
        }
    }

    /// Runs up to one batch of queued tasks around a full propagation run.
    ///
    /// Execution order:
    /// 1. Execute the batch's `PRE_UPDATE` tasks
    /// 2. Run light propagation until it settles
    /// 3. Execute the batch's `POST_UPDATE` tasks
    pub fn run_update(&self) {
        let mut tasks = self.light_tasks.lock();
        let batch = tasks.len().min(self.task_per_batch.load(Ordering::Relaxed));
        let batch_tasks: Vec<_> = tasks.drain(..batch).collect();
        drop(tasks);

        let _span = tracing::trace_span!("light_batch", tasks = batch_tasks.len()).entered();

        let (pre_update_tasks, post_update_tasks): (Vec<_>, Vec<_>) = batch_tasks
            .into_iter()
            .partition(|(task_type, _)| *task_type == TaskType::PreUpdate);

        let mut engine = self.light_engine.lock();
        for (_, task) in pre_update_tasks {
            task(&mut *engine);
        }

        engine.run_light_updates();

        for (_, task) in post_update_tasks {
            task(&mut *engine);
        }
    }

    /// Checks if there are any pending tasks or light updates.
    #[must_use]
    pub fn has_work(&self) -> bool {
        let has_tasks = !self.light_tasks.lock().is_empty();
        has_tasks || self.light_engine.lock().has_light_work()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Tests are allowed to panic
mod tests {
    use super::*;
    use crate::{chunk_getter::BlockLightProperties, ram_world::RamOnlyWorld};

    fn engine(world: &Arc<RamOnlyWorld>) -> ThreadedLevelLightEngine<RamOnlyWorld> {
        let config = LightConfig {
            min_y: 0,
            height: 64,
            ..LightConfig::default()
        };
        ThreadedLevelLightEngine::new(Arc::clone(world), &config)
    }

    #[test]
    fn light_chunk_requires_a_loaded_chunk() {
        let world = Arc::new(RamOnlyWorld::new(0, 64));
        let engine = engine(&world);
        assert!(engine.light_chunk(ChunkPos::new(3, 3), false, |_| {}).is_err());
        assert!(!engine.has_work());
    }

    #[test]
    fn post_tasks_run_after_propagation() {
        let world = Arc::new(RamOnlyWorld::new(0, 64));
        let column = ChunkPos::new(0, 0);
        world.add_chunk(column);
        let torch = BlockPos::new(7, 20, 7);
        world.set_block(torch, BlockLightProperties::AIR.with_emission(15));

        let engine = engine(&world);
        let reader = engine.light_reader(LightLayer::Block).unwrap();
        let seen = Arc::new(AtomicUsize::new(0));
        let seen_in_task = Arc::clone(&seen);
        let reader_in_task = reader.clone();
        engine
            .light_chunk(column, false, move |_| {
                seen_in_task.store(usize::from(reader_in_task.light_value(torch)), Ordering::SeqCst);
            })
            .unwrap();

        assert!(engine.has_work());
        engine.try_schedule_update();
        assert_eq!(seen.load(Ordering::SeqCst), 15);
        assert_eq!(reader.light_value(torch.offset(1, 0, 0)), 14);
        assert!(!engine.has_work());
    }

    #[test]
    fn full_batches_run_on_their_own() {
        let world = Arc::new(RamOnlyWorld::new(0, 64));
        let engine = engine(&world);
        engine.set_task_per_batch(2);
        engine.check_block(BlockPos::new(0, 0, 0));
        assert!(engine.has_work());
        engine.check_block(BlockPos::new(1, 0, 0));
        assert!(!engine.has_work());
    }

    #[test]
    fn bad_persisted_layers_are_rejected() {
        let world = Arc::new(RamOnlyWorld::new(0, 64));
        let engine = engine(&world);
        let section = SectionPos::new(0, 0, 0);
        let err = engine
            .queue_persisted_layer(LightLayer::Block, section, &[0; 100], true)
            .unwrap_err();
        assert!(matches!(err, LightError::InvalidLayerLength { actual: 100, .. }));
        assert!(!engine.has_work());

        engine
            .queue_persisted_layer(LightLayer::Block, section, &[0x77; 2048], true)
            .unwrap();
        assert!(engine.has_work());
    }

    #[test]
    fn unloading_a_column_drops_its_light() {
        let world = Arc::new(RamOnlyWorld::new(0, 64));
        let column = ChunkPos::new(0, 0);
        world.add_chunk(column);
        world.set_block(BlockPos::new(2, 2, 2), BlockLightProperties::AIR.with_emission(10));
        let engine = engine(&world);
        engine.light_chunk(column, false, |_| {}).unwrap();
        engine.try_schedule_update();
        assert!(engine.light_engine().lock().data_layer_data(LightLayer::Block, column.section(0)).is_some());

        engine.update_chunk_status(column);
        engine.try_schedule_update();
        while engine.has_work() {
            engine.try_schedule_update();
        }
        let light = engine.light_engine().lock();
        assert!(light.data_layer_data(LightLayer::Block, column.section(0)).is_none());
        assert_eq!(light.light_value(LightLayer::Block, BlockPos::new(2, 2, 2)), 0);
    }
}
