//! Section maps and the published snapshot readers see.

use std::sync::Arc;

use arc_swap::ArcSwap;
use rustc_hash::FxHashMap;
use steel_utils::{BlockPos, SectionPos};

use crate::{chunk_getter::LightLayer, light_storage::LightStorage, sky_light_sources::SkyLightSources};

/// Result of reading sky light out of a section map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkyLightRead {
    /// A stored light value.
    Stored(u8),
    /// The position is above every tracked section of its column.
    AboveData,
}

/// The light sections of one layer.
///
/// Sections are shared by `Arc`, so cloning the map is shallow; the first
/// write to a shared section copies it.
#[derive(Debug, Clone, Default)]
pub struct LightSectionMap {
    layers: FxHashMap<SectionPos, Arc<LightStorage>>,
    sources: SkyLightSources,
}

impl LightSectionMap {
    /// The stored section at `section`.
    #[must_use]
    #[inline]
    pub fn layer(&self, section: SectionPos) -> Option<&Arc<LightStorage>> {
        self.layers.get(&section)
    }

    /// Whether `section` is stored.
    #[must_use]
    #[inline]
    pub fn has_layer(&self, section: SectionPos) -> bool {
        self.layers.contains_key(&section)
    }

    /// The stored section at `section`, unshared for writing.
    #[inline]
    pub(crate) fn layer_mut(&mut self, section: SectionPos) -> Option<&mut LightStorage> {
        self.layers.get_mut(&section).map(Arc::make_mut)
    }

    pub(crate) fn insert_layer(
        &mut self,
        section: SectionPos,
        layer: Arc<LightStorage>,
    ) -> Option<Arc<LightStorage>> {
        self.layers.insert(section, layer)
    }

    pub(crate) fn remove_layer(&mut self, section: SectionPos) -> Option<Arc<LightStorage>> {
        self.layers.remove(&section)
    }

    /// The number of stored sections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Whether no section is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Per column sky heights. Only maintained for the sky layer.
    #[must_use]
    pub const fn sources(&self) -> &SkyLightSources {
        &self.sources
    }

    pub(crate) const fn sources_mut(&mut self) -> &mut SkyLightSources {
        &mut self.sources
    }

    /// Block light at `pos`; untracked sections are dark.
    #[must_use]
    pub fn block_light_value(&self, pos: BlockPos) -> u8 {
        self.layer(SectionPos::of(pos))
            .map_or(0, |layer| layer.get_at(pos))
    }

    /// Sky light at `pos`.
    ///
    /// A position in an untracked section below the column's sky reads the
    /// bottom layer of the next tracked section above it.
    #[must_use]
    pub fn sky_light_value(&self, pos: BlockPos) -> SkyLightRead {
        let mut section = SectionPos::of(pos);
        if self.sources.is_above_data(section.column(), section.y()) {
            return SkyLightRead::AboveData;
        }

        let top = self.sources.top_section(section.column());
        let mut probe = pos;
        loop {
            if let Some(layer) = self.layer(section) {
                return SkyLightRead::Stored(layer.get_at(probe));
            }
            section = section.offset(0, 1, 0);
            if section.y() >= top {
                return SkyLightRead::Stored(15);
            }
            probe = section.origin().offset(probe.x() & 15, 0, probe.z() & 15);
        }
    }
}

/// A cheap, cloneable handle onto the published light of one layer.
///
/// Reads never block the lighting thread and only ever see fully relaxed
/// snapshots.
#[derive(Clone)]
pub struct LightSnapshotReader {
    layer: LightLayer,
    visible: Arc<ArcSwap<LightSectionMap>>,
}

impl LightSnapshotReader {
    pub(crate) const fn new(layer: LightLayer, visible: Arc<ArcSwap<LightSectionMap>>) -> Self {
        Self { layer, visible }
    }

    /// The layer this reader observes.
    #[must_use]
    pub const fn layer(&self) -> LightLayer {
        self.layer
    }

    /// The published light value at `pos`.
    #[must_use]
    pub fn light_value(&self, pos: BlockPos) -> u8 {
        let map = self.visible.load();
        match self.layer {
            LightLayer::Block => map.block_light_value(pos),
            LightLayer::Sky => match map.sky_light_value(pos) {
                SkyLightRead::Stored(level) => level,
                SkyLightRead::AboveData => 15,
            },
        }
    }

    /// The published section at `section`.
    #[must_use]
    pub fn data_layer(&self, section: SectionPos) -> Option<Arc<LightStorage>> {
        self.visible.load().layer(section).cloned()
    }

    /// The whole published snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<LightSectionMap> {
        self.visible.load_full()
    }
}
