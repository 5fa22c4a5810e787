//! Core types for the notebook editor surface

use bevy::prelude::*;
use ropey::Rope;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ========== Document Text ==========

/// The notebook's text buffer
///
/// The host application owns editing; this crate only reads the rope and
/// watches `content_version` to know when the outline is stale.
#[derive(Resource, Clone, Debug)]
pub struct NotebookBuffer {
    /// Text buffer (efficient rope data structure)
    pub rope: Rope,

    /// Incremented on every edit
    pub content_version: u64,
}

impl Default for NotebookBuffer {
    fn default() -> Self {
        Self::new("")
    }
}

impl NotebookBuffer {
    /// Create a new buffer with initial text
    pub fn new(text: &str) -> Self {
        Self {
            rope: Rope::from_str(text),
            content_version: 0,
        }
    }

    /// Replace the whole text
    pub fn set_text(&mut self, text: &str) {
        self.rope = Rope::from_str(text);
        self.content_version += 1;
    }

    /// Insert text at a char index
    pub fn insert(&mut self, char_idx: usize, text: &str) {
        let char_idx = char_idx.min(self.rope.len_chars());
        self.rope.insert(char_idx, text);
        self.content_version += 1;
    }

    /// Remove a char range
    pub fn remove(&mut self, start: usize, end: usize) {
        let end = end.min(self.rope.len_chars());
        if start >= end {
            return;
        }
        self.rope.remove(start..end);
        self.content_version += 1;
    }

    pub fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    /// Content of a line without its trailing newline
    pub fn line(&self, line_idx: usize) -> Option<String> {
        if line_idx >= self.rope.len_lines() {
            return None;
        }
        let line: String = self.rope.line(line_idx).chars().collect();
        Some(line.trim_end_matches(['\n', '\r']).to_string())
    }
}

// ========== Layout ==========

/// Editor layout information
///
/// The host editor keeps this current. Widgets are sized horizontally from
/// `content_width - scrollbar_width` and positioned vertically from
/// `line_height`, `margin_top` and `scroll_offset`.
#[derive(Resource, Clone, Copy, Debug, PartialEq)]
pub struct EditorLayout {
    /// Width of the text content area in pixels
    pub content_width: f32,

    /// Width of the vertical scrollbar (0 when hidden)
    pub scrollbar_width: f32,

    /// Width of the gutter left of the text (glyphs live here)
    pub gutter_width: f32,

    /// Height of one text line in pixels
    pub line_height: f32,

    /// Top padding before the first line
    pub margin_top: f32,

    /// Vertical scroll offset in pixels (positive = scrolled down)
    pub scroll_offset: f32,
}

impl Default for EditorLayout {
    fn default() -> Self {
        Self {
            content_width: 0.0,
            scrollbar_width: 12.0,
            gutter_width: 48.0,
            line_height: 21.0,
            margin_top: 10.0,
            scroll_offset: 0.0,
        }
    }
}

impl EditorLayout {
    /// Layout is usable once the editor has been measured
    pub fn is_ready(&self) -> bool {
        self.content_width > 0.0 && self.line_height > 0.0
    }

    /// Horizontal space available to an overlay
    pub fn available_width(&self) -> f32 {
        (self.content_width - self.scrollbar_width).max(0.0)
    }
}

// ========== Folding ==========

/// A collapsible range of lines as reported by the folding model
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FoldingRegion {
    /// Position of the region in the folding model's list
    pub index: usize,
    /// Start line (0-indexed, stays visible when collapsed)
    pub start_line: usize,
    /// End line (0-indexed, inclusive)
    pub end_line: usize,
    /// Whether the region is currently collapsed
    pub collapsed: bool,
}

impl FoldingRegion {
    pub fn new(index: usize, start_line: usize, end_line: usize) -> Self {
        Self {
            index,
            start_line,
            end_line,
            collapsed: false,
        }
    }

    /// Check if this region contains a given line
    pub fn contains_line(&self, line: usize) -> bool {
        line >= self.start_line && line <= self.end_line
    }

    /// Check if this fold hides a given line (collapsed and line is inside but not the first)
    pub fn hides_line(&self, line: usize) -> bool {
        self.collapsed && line > self.start_line && line <= self.end_line
    }

    /// Get the number of hidden lines when collapsed
    pub fn hidden_line_count(&self) -> usize {
        if self.collapsed {
            self.end_line.saturating_sub(self.start_line)
        } else {
            0
        }
    }
}

/// Resource to track all folding regions and their state
#[derive(Resource, Clone, Debug)]
pub struct FoldState {
    /// All detected regions, sorted by start line, `index` matching position
    pub regions: Vec<FoldingRegion>,
    /// Version of the content when regions were last computed
    /// Initialized to u64::MAX to force detection on first run
    pub content_version: u64,
    /// False until the first detection ran
    pub ready: bool,
}

impl Default for FoldState {
    fn default() -> Self {
        Self {
            regions: Vec::new(),
            content_version: u64::MAX,
            ready: false,
        }
    }
}

impl FoldState {
    /// Create a new empty fold state
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the regions with freshly detected spans
    ///
    /// Regions whose span is unchanged keep their collapsed flag.
    pub fn rebuild(&mut self, mut spans: Vec<(usize, usize)>) {
        spans.sort_unstable();
        spans.dedup();

        let old_regions = std::mem::take(&mut self.regions);
        for (index, (start_line, end_line)) in spans.into_iter().enumerate() {
            let mut region = FoldingRegion::new(index, start_line, end_line);
            if let Some(old) = old_regions
                .iter()
                .find(|r| r.start_line == start_line && r.end_line == end_line)
            {
                region.collapsed = old.collapsed;
            }
            self.regions.push(region);
        }
        self.ready = true;
    }

    /// Get the region that starts at the given line
    pub fn region_at_line(&self, line: usize) -> Option<&FoldingRegion> {
        self.regions.iter().find(|r| r.start_line == line)
    }

    /// Toggle the collapsed state of the region at the given line
    pub fn toggle_fold_at_line(&mut self, line: usize) -> bool {
        if let Some(region) = self.regions.iter_mut().find(|r| r.start_line == line) {
            region.collapsed = !region.collapsed;
            true
        } else {
            false
        }
    }

    /// Check if a line is hidden by any fold
    pub fn is_line_hidden(&self, line: usize) -> bool {
        self.regions.iter().any(|r| r.hides_line(line))
    }

    /// Get the innermost region containing a line (for nested folds)
    pub fn innermost_region_containing(&self, line: usize) -> Option<&FoldingRegion> {
        self.regions
            .iter()
            .filter(|r| r.contains_line(line))
            .max_by_key(|r| r.start_line)
    }
}

// ========== Block Results ==========

/// Claim check for a block's output
///
/// The payload itself is fetched on demand by the output renderer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputClaim {
    /// Key under which the output can be fetched
    pub key: String,
    /// Media type of the payload (e.g. `application/json`)
    #[serde(default)]
    pub content_type: String,
}

/// Execution state of one block
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BlockResult {
    Pending,
    Running,
    Success {
        output: OutputClaim,
    },
    Error {
        message: String,
        #[serde(default)]
        trace: Option<String>,
    },
}

/// Latest known result for each block id
///
/// Updated asynchronously by the host's transport; the widgets only react
/// to snapshots.
#[derive(Resource, Clone, Debug, Default, PartialEq)]
pub struct BlockResults {
    results: HashMap<String, BlockResult>,
}

impl BlockResults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, block_id: &str) -> Option<&BlockResult> {
        self.results.get(block_id)
    }

    pub fn set(&mut self, block_id: impl Into<String>, result: BlockResult) {
        self.results.insert(block_id.into(), result);
    }

    pub fn remove(&mut self, block_id: &str) -> Option<BlockResult> {
        self.results.remove(block_id)
    }

    pub fn clear(&mut self) {
        self.results.clear();
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &BlockResult)> {
        self.results.iter()
    }

    /// Merge a JSON snapshot of `{ "block id": { "status": ... } }`
    pub fn apply_json(&mut self, json: &str) -> Result<usize, serde_json::Error> {
        let snapshot: HashMap<String, BlockResult> = serde_json::from_str(json)?;
        let count = snapshot.len();
        self.results.extend(snapshot);
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rebuild_preserves_collapsed_spans() {
        let mut state = FoldState::new();
        assert!(!state.ready);

        state.rebuild(vec![(4, 8), (0, 2)]);
        assert!(state.ready);
        assert_eq!(state.regions[0].start_line, 0);
        assert_eq!(state.regions[1].index, 1);

        state.toggle_fold_at_line(4);
        state.rebuild(vec![(0, 2), (4, 8), (10, 12)]);
        assert!(state.region_at_line(4).unwrap().collapsed);
        assert!(!state.region_at_line(10).unwrap().collapsed);

        // Span changed, collapse flag does not carry over
        state.rebuild(vec![(0, 2), (4, 9)]);
        assert!(!state.region_at_line(4).unwrap().collapsed);
    }

    #[test]
    fn test_nested_hidden_lines() {
        let mut state = FoldState::new();
        state.rebuild(vec![(0, 10), (2, 5)]);
        state.regions.iter_mut().for_each(|r| r.collapsed = true);

        assert!(state.is_line_hidden(3));
        assert_eq!(state.innermost_region_containing(3).unwrap().start_line, 2);

        state.toggle_fold_at_line(0);
        assert!(state.is_line_hidden(3));
        assert!(!state.is_line_hidden(2));
    }

    #[test]
    fn test_block_results_from_json() {
        let mut results = BlockResults::new();
        let count = results
            .apply_json(
                r#"{
                    "a": { "status": "running" },
                    "b": { "status": "success", "output": { "key": "claim-1" } },
                    "c": { "status": "error", "message": "boom" }
                }"#,
            )
            .unwrap();

        assert_eq!(count, 3);
        assert_eq!(results.get("a"), Some(&BlockResult::Running));
        assert!(matches!(results.get("b"), Some(BlockResult::Success { output }) if output.key == "claim-1"));
        assert!(matches!(results.get("c"), Some(BlockResult::Error { trace: None, .. })));
        assert!(results.apply_json("{ not json").is_err());
    }

    #[test]
    fn test_buffer_edits_bump_version() {
        let mut buffer = NotebookBuffer::new("one\ntwo\n");
        assert_eq!(buffer.line(1).as_deref(), Some("two"));

        buffer.insert(0, "zero\n");
        buffer.remove(0, 0);
        assert_eq!(buffer.content_version, 1);
        assert_eq!(buffer.line(0).as_deref(), Some("zero"));
        assert_eq!(buffer.line(10), None);
    }

    #[test]
    fn test_layout_available_width() {
        let layout = EditorLayout {
            content_width: 800.0,
            scrollbar_width: 14.0,
            ..default()
        };
        assert!(layout.is_ready());
        assert_eq!(layout.available_width(), 786.0);
        assert!(!EditorLayout::default().is_ready());
    }
}
