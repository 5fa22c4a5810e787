//! Zone Map - Vertical positions of lines and view zones
//!
//! Rows come from the [`FoldMap`]; every visible zone adds its reserved
//! height below its anchor line. Zones anchored on hidden lines reserve
//! nothing and have no position.

use super::FoldMap;
use crate::widgets::{ZoneAnchor, ZonePlacement};

#[derive(Clone, Debug)]
struct ZoneSummary {
    line: usize,
    /// Space pushed onto the following lines
    reserved: f32,
    /// Cumulative reserved space of all zones before this one (exclusive)
    reserved_before: f32,
}

/// Line and zone geometry for one layout frame
#[derive(Clone, Debug, Default)]
pub struct ZoneMap {
    line_height: f32,
    /// Visible zones sorted by anchor line
    zones: Vec<ZoneSummary>,
    fold_map: FoldMap,
}

impl ZoneMap {
    /// Build from a fold map and the zones currently reserved
    pub fn new(fold_map: FoldMap, zones: impl IntoIterator<Item = ZonePlacement>, line_height: f32) -> Self {
        let mut visible: Vec<(usize, f32)> = zones
            .into_iter()
            .filter(|zone| !fold_map.is_line_hidden(zone.line))
            .map(|zone| (zone.line, reserved_height(&zone, line_height)))
            .collect();
        visible.sort_by_key(|(line, _)| *line);

        let mut cumulative = 0.0;
        let zones = visible
            .into_iter()
            .map(|(line, reserved)| {
                let summary = ZoneSummary {
                    line,
                    reserved,
                    reserved_before: cumulative,
                };
                cumulative += reserved;
                summary
            })
            .collect();

        Self {
            line_height,
            zones,
            fold_map,
        }
    }

    pub fn fold_map(&self) -> &FoldMap {
        &self.fold_map
    }

    /// Zone space above `line`: everything anchored on earlier lines
    fn reserved_above(&self, line: usize) -> f32 {
        let idx = self.zones.partition_point(|z| z.line < line);
        match idx.checked_sub(1).and_then(|i| self.zones.get(i)) {
            Some(zone) => zone.reserved_before + zone.reserved,
            None => 0.0,
        }
    }

    /// Y offset of a buffer line's top edge from the top of the content
    pub fn line_top(&self, line: usize) -> f32 {
        self.fold_map.buffer_to_fold_row(line) as f32 * self.line_height + self.reserved_above(line)
    }

    /// Y offset of a zone's top edge, `None` when its anchor line is folded away
    pub fn zone_top(&self, zone: &ZonePlacement) -> Option<f32> {
        if self.fold_map.is_line_hidden(zone.line) {
            return None;
        }
        let line_top = self.line_top(zone.line);
        Some(match zone.anchor {
            ZoneAnchor::Overlay => line_top,
            ZoneAnchor::Below => line_top + self.line_height,
        })
    }

    /// Total height of the visible rows plus every visible zone
    pub fn content_height(&self) -> f32 {
        let zones: f32 = self.zones.iter().map(|z| z.reserved).sum();
        self.fold_map.visible_line_count() as f32 * self.line_height + zones
    }
}

/// Space a zone pushes the following lines down by
///
/// An overlay covers its own line, so only the part taller than a line counts.
pub fn reserved_height(zone: &ZonePlacement, line_height: f32) -> f32 {
    match zone.anchor {
        ZoneAnchor::Below => zone.height,
        ZoneAnchor::Overlay => (zone.height - line_height).max(0.0),
    }
}
