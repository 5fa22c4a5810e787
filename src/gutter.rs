//! Run-status glyphs in the gutter
//!
//! The decoration set is rebuilt from scratch from the outline and the
//! current block results, then handed to the host in one replacement.

use bevy::prelude::*;

use crate::document::DocumentOutline;
use crate::types::{BlockResult, BlockResults};

/// Execution status shown next to a block's opening fence
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GutterStatus {
    Runnable,
    InProgress,
    Complete,
    Failed,
}

impl GutterStatus {
    /// Pending and missing results are both runnable
    pub fn from_result(result: Option<&BlockResult>) -> Self {
        match result {
            None | Some(BlockResult::Pending) => GutterStatus::Runnable,
            Some(BlockResult::Running) => GutterStatus::InProgress,
            Some(BlockResult::Success { .. }) => GutterStatus::Complete,
            Some(BlockResult::Error { .. }) => GutterStatus::Failed,
        }
    }
}

/// Which glyph to draw
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GutterGlyphKind {
    RunAll,
    Runnable,
    InProgress,
    Complete,
    Failed,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GutterMarker {
    /// Runs every block, always on the first line
    RunAll,
    Block { id: String, status: GutterStatus },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GutterDecoration {
    pub line: usize,
    pub marker: GutterMarker,
}

impl GutterDecoration {
    pub fn glyph(&self) -> GutterGlyphKind {
        match &self.marker {
            GutterMarker::RunAll => GutterGlyphKind::RunAll,
            GutterMarker::Block { status, .. } => match status {
                GutterStatus::Runnable => GutterGlyphKind::Runnable,
                GutterStatus::InProgress => GutterGlyphKind::InProgress,
                GutterStatus::Complete => GutterGlyphKind::Complete,
                GutterStatus::Failed => GutterGlyphKind::Failed,
            },
        }
    }
}

/// Compute the full decoration set
///
/// One run-all marker on line 0, then one marker per identified fence on its
/// opening line. Anonymous fences get nothing.
pub fn compute(outline: &DocumentOutline, results: &BlockResults) -> Vec<GutterDecoration> {
    let mut decorations = vec![GutterDecoration {
        line: 0,
        marker: GutterMarker::RunAll,
    }];
    decorations.extend(outline.identified_fences().map(|(id, fence)| GutterDecoration {
        line: fence.open_line,
        marker: GutterMarker::Block {
            id: id.to_string(),
            status: GutterStatus::from_result(results.get(id)),
        },
    }));
    decorations
}

/// Editor side of the gutter
pub trait DecorationHost {
    /// Replace the whole decoration set at once
    fn replace_decorations(&mut self, decorations: &[GutterDecoration]);
}

/// Where run requests go; requests are fire-and-forget
pub trait RunRequestSink {
    fn run_block(&mut self, block_id: &str);
    fn run_all_blocks(&mut self);
}

/// Keeps the last decoration set so clicks can be mapped back to markers
#[derive(Debug, Default)]
pub struct GutterDecorationManager {
    current: Vec<GutterDecoration>,
}

impl GutterDecorationManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decorations(&self) -> &[GutterDecoration] {
        &self.current
    }

    /// Rebuild and hand the set to the host; false when nothing changed
    pub fn refresh(
        &mut self,
        outline: &DocumentOutline,
        results: &BlockResults,
        host: &mut dyn DecorationHost,
    ) -> bool {
        let decorations = compute(outline, results);
        if decorations == self.current {
            return false;
        }
        host.replace_decorations(&decorations);
        self.current = decorations;
        true
    }

    pub fn clear(&mut self, host: &mut dyn DecorationHost) {
        if !self.current.is_empty() {
            self.current.clear();
            host.replace_decorations(&[]);
        }
    }

    /// Dispatch a click on a gutter line
    ///
    /// The run-all marker takes line 0 when a fence also opens there.
    pub fn click(&self, line: usize, sink: &mut dyn RunRequestSink) -> bool {
        let Some(decoration) = self.current.iter().find(|d| d.line == line) else {
            return false;
        };
        match &decoration.marker {
            GutterMarker::RunAll => {
                debug!("gutter: run all blocks");
                sink.run_all_blocks();
            }
            GutterMarker::Block { id, .. } => {
                debug!("gutter: run block {id}");
                sink.run_block(id);
            }
        }
        true
    }
}
