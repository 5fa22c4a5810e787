//! Anchor resolution: which line an overlay attaches after
//!
//! Resolution is a pure scan of the current text. A missing target is not an
//! error, stale widget specs are expected while the user is typing.

use ropey::Rope;

use super::fence::DocumentOutline;

/// What an overlay is attached to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AnchorTarget<'a> {
    /// The leading metadata block
    Preamble,
    /// A fenced block, by identifier
    Block(&'a str),
}

/// Owned result of a reverse (line to identity) lookup
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum AnchorIdentity {
    Preamble,
    Block(String),
}

/// Resolve a target against the current text
pub fn resolve(text: &Rope, target: AnchorTarget<'_>) -> Option<usize> {
    DocumentOutline::scan(text).resolve(target)
}

impl DocumentOutline {
    /// Line the overlay for `target` attaches after
    ///
    /// The preamble anchors at its closing delimiter; a block anchors at its
    /// closing fence (or the last line when the fence is unterminated).
    /// The first matching fence wins when identifiers repeat.
    pub fn resolve(&self, target: AnchorTarget<'_>) -> Option<usize> {
        match target {
            AnchorTarget::Preamble => self.preamble.as_ref().map(|p| p.close_line),
            AnchorTarget::Block(id) => self
                .identified_fences()
                .find(|(fence_id, _)| *fence_id == id)
                .map(|(_, fence)| fence.end_line(self.line_count)),
        }
    }

    /// Line where `target` starts (preamble opening or opening fence)
    pub fn start_line(&self, target: AnchorTarget<'_>) -> Option<usize> {
        match target {
            AnchorTarget::Preamble => self.preamble.as_ref().map(|p| p.open_line),
            AnchorTarget::Block(id) => self
                .identified_fences()
                .find(|(fence_id, _)| *fence_id == id)
                .map(|(_, fence)| fence.open_line),
        }
    }

    /// Reverse lookup from a region's start line
    pub fn identify(&self, start_line: usize) -> Option<AnchorIdentity> {
        if self
            .preamble
            .as_ref()
            .is_some_and(|p| p.open_line == start_line)
        {
            return Some(AnchorIdentity::Preamble);
        }

        self.identified_fences()
            .find(|(_, fence)| fence.open_line == start_line)
            .map(|(id, _)| AnchorIdentity::Block(id.to_string()))
    }
}
