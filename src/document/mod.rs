//! Notebook document model
//!
//! - **fence**: line scanner producing a [`DocumentOutline`]
//! - **anchor**: maps blocks and the preamble to the lines overlays attach to
//!
//! The structured [`NotebookDocument`] is normally produced by the host's
//! parser. [`NotebookDocument::scan`] builds one from the outline for hosts
//! that have no parser of their own.

mod anchor;
mod fence;

pub use anchor::*;
pub use fence::*;

use bevy::prelude::*;
use ropey::Rope;

/// An executable unit of the notebook
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    pub id: String,
    /// Engine/category tag, e.g. `sql`
    pub engine: String,
    /// Identifier field as written in the fence
    pub anchor_marker: String,
    /// Optional display name
    pub name: Option<String>,
}

impl Block {
    pub fn new(id: impl Into<String>, engine: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            anchor_marker: format!("id={id}"),
            id,
            engine: engine.into(),
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Name shown to the user (falls back to the id)
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

/// A declared input parameter
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub default: Option<String>,
}

/// Structured view of the open notebook
#[derive(Resource, Clone, Debug, Default, PartialEq, Eq)]
pub struct NotebookDocument {
    /// Document name (shown on the collapsed preamble)
    pub name: String,
    pub params: Vec<Param>,
    pub blocks: Vec<Block>,
}

impl NotebookDocument {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Build the model from the text's outline
    ///
    /// Fences without an identifier are not blocks.
    pub fn scan(name: impl Into<String>, text: &Rope) -> Self {
        let outline = DocumentOutline::scan(text);
        Self::from_outline(name, &outline)
    }

    pub fn from_outline(name: impl Into<String>, outline: &DocumentOutline) -> Self {
        let params = outline
            .preamble
            .iter()
            .flat_map(|p| p.params.iter())
            .map(|(name, default)| Param {
                name: name.clone(),
                default: default.clone(),
            })
            .collect();

        let blocks = outline
            .identified_fences()
            .map(|(id, fence)| Block {
                id: id.to_string(),
                engine: fence.engine.clone(),
                anchor_marker: fence.anchor_marker().unwrap_or(id).to_string(),
                name: fence.name().map(str::to_string),
            })
            .collect();

        Self {
            name: name.into(),
            params,
            blocks,
        }
    }

    pub fn has_params(&self) -> bool {
        !self.params.is_empty()
    }

    pub fn block(&self, id: &str) -> Option<&Block> {
        self.blocks.iter().find(|b| b.id == id)
    }
}
