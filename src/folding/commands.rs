//! Imperative folding commands

use bevy::log::debug;

use super::FoldingModelPort;
use crate::document::{AnchorTarget, DocumentOutline};

/// Collapses, expands and reveals through a [`FoldingModelPort`]
pub struct FoldingCommandDispatcher;

impl FoldingCommandDispatcher {
    /// Collapse every known region in one batch
    ///
    /// Returns the number of regions touched, 0 when the model is not ready.
    pub fn collapse_all(folding: &mut dyn FoldingModelPort) -> usize {
        let Some(regions) = folding.regions() else {
            debug!("collapse_all: folding model not ready");
            return 0;
        };
        let indices: Vec<usize> = regions.iter().map(|r| r.index).collect();
        if !indices.is_empty() {
            folding.set_collapsed(&indices, true);
        }
        indices.len()
    }

    /// Expand every collapsed region with a single request over their start lines
    pub fn expand_all(folding: &mut dyn FoldingModelPort) -> usize {
        let Some(regions) = folding.regions() else {
            debug!("expand_all: folding model not ready");
            return 0;
        };
        let lines: Vec<usize> = regions
            .iter()
            .filter(|r| r.collapsed)
            .map(|r| r.start_line)
            .collect();
        if !lines.is_empty() {
            folding.expand_at_lines(&lines);
        }
        lines.len()
    }

    /// Make a block's opening line visible
    ///
    /// Expands the block's own region and every collapsed region hiding it,
    /// and returns the line to focus. `None` when the block is not in the text.
    pub fn reveal_block(
        outline: &DocumentOutline,
        block_id: &str,
        folding: &mut dyn FoldingModelPort,
    ) -> Option<usize> {
        let line = outline.start_line(AnchorTarget::Block(block_id))?;

        if let Some(regions) = folding.regions() {
            let lines: Vec<usize> = regions
                .iter()
                .filter(|r| r.collapsed && (r.start_line == line || r.hides_line(line)))
                .map(|r| r.start_line)
                .collect();
            if !lines.is_empty() {
                folding.expand_at_lines(&lines);
            }
        }

        Some(line)
    }
}
