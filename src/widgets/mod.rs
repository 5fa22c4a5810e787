//! Embedded widgets: desired specs, live handles and the registry
//!
//! A [`WidgetSpec`] is the desired state of one overlay, recomputed on every
//! reconciliation pass. A [`WidgetHandle`] is the live state: it owns the
//! render-target entity and the view zone reserved for it through a
//! [`ViewZoneHost`]. Handles move `Unattached → Attached → Disposed`, and
//! disposal is terminal.

mod debounce;
mod dynamic;
mod fixed;
mod registry;
mod sizing;
mod summary;

pub use debounce::*;
pub use dynamic::*;
pub use fixed::*;
pub use registry::*;
pub use sizing::*;
pub use summary::*;

use bevy::prelude::*;
use std::fmt;

/// Stable identity of a widget across passes
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WidgetId(String);

impl WidgetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The preamble's parameter form
    pub fn parameter_form() -> Self {
        Self::new("params")
    }

    pub fn output(block_id: &str) -> Self {
        Self(format!("output:{block_id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WidgetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How a widget's height is decided
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SizingPolicy {
    /// Height known up front
    Fixed { height: f32 },
    /// Height follows the rendered content, clamped to `[min, max]`
    Dynamic { min: f32, max: f32 },
}

/// What the widget shows
#[derive(Clone, Debug, PartialEq)]
pub enum WidgetKind {
    ParameterForm {
        form_id: String,
        param_names: Vec<String>,
    },
    OutputViewer {
        block_id: String,
    },
    FoldingSummary(SummaryContent),
}

impl WidgetKind {
    pub fn tag(&self) -> WidgetKindTag {
        match self {
            WidgetKind::ParameterForm { .. } => WidgetKindTag::ParameterForm,
            WidgetKind::OutputViewer { .. } => WidgetKindTag::OutputViewer,
            WidgetKind::FoldingSummary(_) => WidgetKindTag::FoldingSummary,
        }
    }
}

/// Payload-free discriminant of [`WidgetKind`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WidgetKindTag {
    ParameterForm,
    OutputViewer,
    FoldingSummary,
}

/// Desired state of one overlay
#[derive(Clone, Debug, PartialEq)]
pub struct WidgetSpec {
    pub id: WidgetId,
    pub anchor_line: usize,
    pub sizing: SizingPolicy,
    pub kind: WidgetKind,
}

// ========== Editor-side view zones ==========

/// Handle to a reserved vertical span in the editor
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ZoneId(pub u64);

/// How a zone relates to its anchor line
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ZoneAnchor {
    /// Below the line, pushing following lines down by the full height
    #[default]
    Below,
    /// On top of the line itself; only the part taller than one line is reserved
    Overlay,
}

/// Geometry of a view zone
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ZonePlacement {
    pub line: usize,
    pub anchor: ZoneAnchor,
    pub height: f32,
    pub width: f32,
}

impl ZonePlacement {
    pub fn below(line: usize, height: f32, width: f32) -> Self {
        Self {
            line,
            anchor: ZoneAnchor::Below,
            height,
            width,
        }
    }

    pub fn overlay(line: usize, height: f32, width: f32) -> Self {
        Self {
            line,
            anchor: ZoneAnchor::Overlay,
            height,
            width,
        }
    }
}

/// The editor services a widget handle needs
///
/// Render targets are plain entities; the UI layer decides what to put in them.
pub trait ViewZoneHost {
    /// Create the node the UI layer will render into
    fn create_render_target(&mut self, widget: &WidgetId, kind: &WidgetKind) -> Entity;

    /// Refresh the data the UI layer reads from a render target
    fn update_render_target(&mut self, target: Entity, kind: &WidgetKind);

    fn destroy_render_target(&mut self, target: Entity);

    fn add_zone(&mut self, target: Entity, placement: ZonePlacement, sizing: SizingPolicy) -> ZoneId;

    fn layout_zone(&mut self, zone: ZoneId, placement: ZonePlacement);

    fn remove_zone(&mut self, zone: ZoneId);
}

/// Lifecycle of a handle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HandleState {
    Unattached,
    Attached(ZoneId),
    Disposed,
}
