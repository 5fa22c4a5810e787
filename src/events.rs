//! Messages between the widget engine and the host application

use bevy::prelude::*;
use std::collections::BTreeMap;

use crate::widgets::{SummaryAction, WidgetId};

/// Message fired when the notebook text is edited
///
/// Any edit schedules a reconciliation pass; the byte range is kept so other
/// plugins (highlighting, language servers) can share the same message.
#[derive(Message, Clone, Debug)]
pub struct TextEditEvent {
    /// Byte offset where the edit started
    pub start_byte: usize,
    /// Byte offset where the old text ended (before edit)
    pub old_end_byte: usize,
    /// Byte offset where the new text ends (after edit)
    pub new_end_byte: usize,
    /// Content version after this edit
    pub content_version: u64,
}

impl TextEditEvent {
    pub fn new(
        start_byte: usize,
        old_end_byte: usize,
        new_end_byte: usize,
        content_version: u64,
    ) -> Self {
        Self {
            start_byte,
            old_end_byte,
            new_end_byte,
            content_version,
        }
    }
}

// ========== Commands in ==========

/// Collapse every folding region
#[derive(Message, Clone, Debug, Default)]
pub struct CollapseAllRequested;

/// Expand every collapsed region
#[derive(Message, Clone, Debug, Default)]
pub struct ExpandAllRequested;

/// Unfold whatever hides a block and scroll to it
#[derive(Message, Clone, Debug)]
pub struct FocusBlockRequested {
    pub block_id: String,
}

/// The user clicked a gutter line
#[derive(Message, Clone, Debug)]
pub struct GutterClicked {
    pub line: usize,
}

/// The user triggered an action on a folding summary
#[derive(Message, Clone, Debug)]
pub struct SummaryActionRequested {
    pub widget: WidgetId,
    pub action: SummaryAction,
}

/// A notebook was loaded; registers the folding provider and schedules a pass
#[derive(Message, Clone, Debug, Default)]
pub struct NotebookOpened;

/// The notebook was closed; every widget, glyph and timer is released
#[derive(Message, Clone, Debug, Default)]
pub struct NotebookClosed;

// ========== Notifications out ==========

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunTarget {
    Block(String),
    All,
}

/// Execution requested from the gutter; the host runs it and feeds results back
#[derive(Message, Clone, Debug, PartialEq, Eq)]
pub struct RunRequested {
    pub target: RunTarget,
}

/// The host should move the cursor to this line and scroll it into view
#[derive(Message, Clone, Debug, PartialEq, Eq)]
pub struct RevealLineRequested {
    pub line: usize,
}

/// A configuration surface was opened or closed
#[derive(Message, Clone, Debug, PartialEq, Eq)]
pub struct FormSurfaceChanged {
    pub form_id: String,
    pub open: bool,
}

/// The published widget id → render target map changed
#[derive(Message, Clone, Debug, PartialEq)]
pub struct RenderTargetsChanged {
    pub targets: BTreeMap<WidgetId, Entity>,
}
