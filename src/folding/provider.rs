//! Folding range providers
//!
//! Providers are registered explicitly and owned through a
//! [`ProviderRegistration`] token, so several editor instances can each add
//! and remove their own provider without a shared "already registered" flag.

use bevy::prelude::*;
use ropey::Rope;

use crate::document::DocumentOutline;

/// Source of foldable line ranges
pub trait FoldingRangeProvider: Send + Sync + 'static {
    /// Inclusive `(start_line, end_line)` spans
    fn folding_ranges(&self, text: &Rope) -> Vec<(usize, usize)>;
}

/// Folds the preamble and every fenced block
#[derive(Clone, Copy, Debug, Default)]
pub struct NotebookFoldingProvider;

impl FoldingRangeProvider for NotebookFoldingProvider {
    fn folding_ranges(&self, text: &Rope) -> Vec<(usize, usize)> {
        let outline = DocumentOutline::scan(text);
        let mut ranges = Vec::with_capacity(outline.fences.len() + 1);

        if let Some(preamble) = &outline.preamble {
            ranges.push((preamble.open_line, preamble.close_line));
        }

        for fence in &outline.fences {
            let end_line = fence.end_line(outline.line_count);
            // Only regions that span multiple lines
            if end_line > fence.open_line {
                ranges.push((fence.open_line, end_line));
            }
        }

        ranges
    }
}

/// Token proving ownership of one registered provider
///
/// Not `Clone`: only the owner can unregister.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct ProviderRegistration {
    id: u64,
}

impl ProviderRegistration {
    pub fn id(&self) -> u64 {
        self.id
    }
}

/// Registered folding range providers
#[derive(Resource, Default)]
pub struct FoldingProviders {
    next_id: u64,
    providers: Vec<(u64, Box<dyn FoldingRangeProvider>)>,
    /// Incremented on every (un)registration so regions get recomputed
    pub generation: u64,
}

impl FoldingProviders {
    pub fn register(&mut self, provider: impl FoldingRangeProvider) -> ProviderRegistration {
        let id = self.next_id;
        self.next_id += 1;
        self.providers.push((id, Box::new(provider)));
        self.generation += 1;
        ProviderRegistration { id }
    }

    /// Remove a provider; false when it was already gone
    pub fn unregister(&mut self, registration: ProviderRegistration) -> bool {
        let before = self.providers.len();
        self.providers.retain(|(id, _)| *id != registration.id);
        let removed = self.providers.len() != before;
        if removed {
            self.generation += 1;
        }
        removed
    }

    pub fn is_registered(&self, registration: &ProviderRegistration) -> bool {
        self.providers.iter().any(|(id, _)| *id == registration.id)
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Union of all providers' ranges, sorted and deduplicated
    pub fn folding_ranges(&self, text: &Rope) -> Vec<(usize, usize)> {
        let mut ranges: Vec<(usize, usize)> = self
            .providers
            .iter()
            .flat_map(|(_, provider)| provider.folding_ranges(text))
            .filter(|(start, end)| end > start)
            .collect();
        ranges.sort_unstable();
        ranges.dedup();
        ranges
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedRanges(Vec<(usize, usize)>);

    impl FoldingRangeProvider for FixedRanges {
        fn folding_ranges(&self, _text: &Rope) -> Vec<(usize, usize)> {
            self.0.clone()
        }
    }

    #[test]
    fn test_notebook_ranges() {
        let text = Rope::from_str("---\na: 1\n---\n```sql id=x\nselect 1\n```\n```sql id=y\n```\n");
        let ranges = NotebookFoldingProvider.folding_ranges(&text);
        assert_eq!(ranges, vec![(0, 2), (3, 5), (6, 7)]);
    }

    #[test]
    fn test_registrations_are_independent() {
        let mut providers = FoldingProviders::default();
        let first = providers.register(NotebookFoldingProvider);
        let second = providers.register(FixedRanges(vec![(10, 12), (0, 2)]));
        assert_ne!(first.id(), second.id());
        assert_eq!(providers.len(), 2);

        let text = Rope::from_str("---\na: 1\n---\n");
        assert_eq!(providers.folding_ranges(&text), vec![(0, 2), (10, 12)]);

        let generation = providers.generation;
        assert!(providers.unregister(first));
        assert!(providers.is_registered(&second));
        assert_eq!(providers.generation, generation + 1);
        assert_eq!(providers.folding_ranges(&text), vec![(0, 2), (10, 12)]);

        assert!(providers.unregister(second));
        assert!(providers.is_empty());
    }
}
