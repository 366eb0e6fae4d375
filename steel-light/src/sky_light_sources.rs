//! Sky light source tracking for chunk columns.

use rustc_hash::FxHashMap;
use steel_utils::ChunkPos;

/// Tracks, per column, the section height above which sky light is unobstructed.
///
/// For every column with tracked sections the entry holds the y of the highest
/// tracked section plus one. Everything at or above that section reads as open
/// sky. Columns without an entry share `current_lowest_y`, the lowest section
/// ever tracked in the level; while nothing has been tracked it is `i32::MAX`.
///
/// # Storage Format
///
/// Heights are section coordinates, not block coordinates.
#[derive(Debug, Clone)]
pub struct SkyLightSources {
    /// Per column top section height (highest tracked section + 1).
    top_sections: FxHashMap<ChunkPos, i32>,

    /// The lowest tracked section y in the level. Default for absent columns.
    current_lowest_y: i32,
}

impl SkyLightSources {
    /// Creates a tracker with no columns.
    #[must_use]
    pub fn new() -> Self {
        Self {
            top_sections: FxHashMap::default(),
            current_lowest_y: i32::MAX,
        }
    }

    /// The top section height of `column`, or the level's lowest section when
    /// the column has no tracked sections.
    #[inline]
    #[must_use]
    pub fn top_section(&self, column: ChunkPos) -> i32 {
        self.top_sections
            .get(&column)
            .copied()
            .unwrap_or(self.current_lowest_y)
    }

    /// Sets the top section height of `column`.
    #[inline]
    pub fn set_top_section(&mut self, column: ChunkPos, y: i32) {
        self.top_sections.insert(column, y);
    }

    /// Forgets `column`; it falls back to the level's lowest section.
    #[inline]
    pub fn remove_column(&mut self, column: ChunkPos) {
        self.top_sections.remove(&column);
    }

    /// The lowest tracked section y in the level.
    #[inline]
    #[must_use]
    pub const fn current_lowest_y(&self) -> i32 {
        self.current_lowest_y
    }

    /// Lowers the level floor to `y` if it is below the current one.
    #[inline]
    pub fn lower_floor(&mut self, y: i32) {
        self.current_lowest_y = self.current_lowest_y.min(y);
    }

    /// Whether `section_y` lies at or above the sky of `column`, so its light
    /// is implied rather than stored.
    #[inline]
    #[must_use]
    pub fn is_above_data(&self, column: ChunkPos, section_y: i32) -> bool {
        let top = self.top_section(column);
        top == self.current_lowest_y || section_y >= top
    }

    /// Whether the level has tracked sections at or below `section_y`.
    #[inline]
    #[must_use]
    pub const fn has_sections_below(&self, section_y: i32) -> bool {
        section_y >= self.current_lowest_y
    }
}

impl Default for SkyLightSources {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_level_is_all_sky() {
        let sources = SkyLightSources::new();
        let column = ChunkPos::new(4, -2);

        assert_eq!(sources.top_section(column), i32::MAX);
        assert!(sources.is_above_data(column, -100));
        assert!(!sources.has_sections_below(1000));
    }

    #[test]
    fn test_absent_columns_follow_the_floor() {
        let mut sources = SkyLightSources::new();
        let column = ChunkPos::new(0, 0);
        sources.lower_floor(2);
        sources.set_top_section(column, 5);

        let other = ChunkPos::new(1, 0);
        assert_eq!(sources.top_section(other), 2);
        assert!(sources.is_above_data(other, -10));

        assert!(!sources.is_above_data(column, 4));
        assert!(sources.is_above_data(column, 5));

        sources.lower_floor(-1);
        assert_eq!(sources.top_section(other), -1);
        assert!(sources.has_sections_below(-1));
        assert!(!sources.has_sections_below(-2));
    }

    #[test]
    fn test_remove_column() {
        let mut sources = SkyLightSources::new();
        let column = ChunkPos::new(0, 0);
        sources.lower_floor(0);
        sources.set_top_section(column, 3);
        sources.remove_column(column);
        assert_eq!(sources.top_section(column), 0);
    }
}
