//! Fold Map - Maps buffer lines to visible rows by hiding collapsed regions
//!
//! Collapsed regions keep their start line visible; the lines after it up to
//! and including `end_line` are hidden.

use crate::types::FoldingRegion;

/// Cached summary for a collapsed region to enable O(log n) lookups
#[derive(Clone, Debug)]
struct FoldSummary {
    start_line: usize,
    end_line: usize,
    /// Cumulative hidden lines before this fold (exclusive)
    hidden_before: usize,
    /// Cumulative hidden lines including this fold (inclusive)
    hidden_through: usize,
}

/// Tracks which buffer lines map to which visible rows
#[derive(Clone, Debug, Default)]
pub struct FoldMap {
    /// Outermost collapsed regions, sorted, never overlapping
    fold_summaries: Vec<FoldSummary>,
    visible_line_count: usize,
    buffer_line_count: usize,
}

impl FoldMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from the line count and the folding regions
    ///
    /// A collapsed region nested inside another collapsed region is already
    /// hidden and does not count twice.
    pub fn update(&mut self, line_count: usize, regions: &[FoldingRegion]) {
        self.buffer_line_count = line_count;

        let mut collapsed: Vec<&FoldingRegion> = regions.iter().filter(|r| r.collapsed).collect();
        collapsed.sort_by_key(|r| (r.start_line, std::cmp::Reverse(r.end_line)));

        self.fold_summaries.clear();
        let mut cumulative_hidden = 0;
        for region in collapsed {
            if let Some(last) = self.fold_summaries.last() {
                if region.start_line <= last.end_line {
                    continue;
                }
            }
            let hidden = region.hidden_line_count();
            self.fold_summaries.push(FoldSummary {
                start_line: region.start_line,
                end_line: region.end_line,
                hidden_before: cumulative_hidden,
                hidden_through: cumulative_hidden + hidden,
            });
            cumulative_hidden += hidden;
        }

        self.visible_line_count = self.buffer_line_count.saturating_sub(cumulative_hidden);
    }

    /// Check if a buffer line is hidden (inside a fold) - O(log n)
    pub fn is_line_hidden(&self, buffer_line: usize) -> bool {
        let idx = self.fold_summaries.partition_point(|s| s.start_line < buffer_line);
        idx > 0 && buffer_line <= self.fold_summaries[idx - 1].end_line
    }

    /// Convert a buffer line to a visible row - O(log n)
    ///
    /// Hidden lines map to the row of the fold's start line.
    pub fn buffer_to_fold_row(&self, buffer_row: usize) -> usize {
        let idx = self.fold_summaries.partition_point(|s| s.start_line < buffer_row);
        if idx == 0 {
            return buffer_row;
        }
        let prev = &self.fold_summaries[idx - 1];
        if buffer_row <= prev.end_line {
            return prev.start_line - prev.hidden_before;
        }
        buffer_row - prev.hidden_through
    }

    pub fn visible_line_count(&self) -> usize {
        self.visible_line_count
    }
}
