//! Folding model access
//!
//! The reconciler and the folding commands only talk to the editor's folding
//! subsystem through [`FoldingModelPort`]. [`FoldState`] is the in-crate
//! implementation; an embedding with its own folding engine implements the
//! port instead.

mod commands;
mod provider;

pub use commands::*;
pub use provider::*;

use crate::types::{FoldState, FoldingRegion};

/// Narrow view of an editor's folding subsystem
pub trait FoldingModelPort {
    /// Current regions, `None` while the folding model is not ready
    fn regions(&self) -> Option<Vec<FoldingRegion>>;

    /// Set the collapsed flag of the regions with the given indices in one batch
    fn set_collapsed(&mut self, indices: &[usize], collapsed: bool);

    /// Expand the regions anchored at the given lines
    ///
    /// A line that starts no region expands the innermost region containing it.
    fn expand_at_lines(&mut self, lines: &[usize]);
}

impl FoldingModelPort for FoldState {
    fn regions(&self) -> Option<Vec<FoldingRegion>> {
        self.ready.then(|| self.regions.clone())
    }

    fn set_collapsed(&mut self, indices: &[usize], collapsed: bool) {
        for region in self.regions.iter_mut() {
            if indices.contains(&region.index) {
                region.collapsed = collapsed;
            }
        }
    }

    fn expand_at_lines(&mut self, lines: &[usize]) {
        for &line in lines {
            let index = match self.region_at_line(line) {
                Some(region) => Some(region.index),
                None => self.innermost_region_containing(line).map(|r| r.index),
            };
            if let Some(region) = index.and_then(|i| self.regions.get_mut(i)) {
                region.collapsed = false;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_ready_until_detected() {
        let mut state = FoldState::new();
        assert!(state.regions().is_none());

        state.rebuild(vec![(0, 3)]);
        assert_eq!(state.regions().map(|r| r.len()), Some(1));
    }

    #[test]
    fn test_expand_at_lines() {
        let mut state = FoldState::new();
        state.rebuild(vec![(0, 3), (5, 9), (6, 8)]);
        state.set_collapsed(&[0, 1, 2], true);

        state.expand_at_lines(&[0, 7]);
        let regions = state.regions().unwrap();
        assert!(!regions[0].collapsed);
        assert!(regions[1].collapsed);
        // Line 7 starts nothing, innermost container is (6, 8)
        assert!(!regions[2].collapsed);
    }
}
