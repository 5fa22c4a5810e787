//! # Bevy Notebook Widgets
//!
//! Embedded widgets for notebook-style documents in Bevy editors: a parameter
//! form under the front-matter, an output viewer under every executed block,
//! a summary over every collapsed region and run-status glyphs in the gutter.
//!
//! The engine keeps the set of live widgets equal to what the document, its
//! folding state and the execution results call for, and hands the UI layer
//! one render target per widget to fill.
//!
//! ```rust,no_run
//! use bevy::prelude::*;
//! use bevy_notebook_widgets::prelude::*;
//!
//! fn main() {
//!     App::new()
//!         .add_plugins(DefaultPlugins)
//!         .add_plugins(NotebookWidgetsPlugin::default())
//!         .insert_resource(NotebookBuffer::new("```sql id=q1\nselect 1\n```\n"))
//!         .run();
//! }
//! ```
//!
//! ## Customization
//!
//! ```rust,no_run
//! use bevy::prelude::*;
//! use bevy_notebook_widgets::prelude::*;
//!
//! fn main() {
//!     let settings = NotebookSettingsBuilder::new()
//!         .text_debounce_ms(200)
//!         .output_height(64.0, 600.0)
//!         .build();
//!
//!     App::new()
//!         .add_plugins(DefaultPlugins)
//!         .add_plugins(NotebookWidgetsPlugin::default().with_settings(settings))
//!         .run();
//! }
//! ```

pub mod display_map;
pub mod document;
pub mod engine;
pub mod events;
pub mod folding;
pub mod gutter;
pub mod plugin;
pub mod reconcile;
pub mod settings;
pub mod types;
pub mod widgets;

pub mod prelude {
    //! Convenient re-exports for common usage
    pub use crate::plugin::{
        BevySurface, FoldingSummaryTarget, GutterGlyph, GutterGlyphs, NotebookLayoutMap,
        NotebookWidgetsPlugin, OpenForms, OutputViewerTarget, ParameterFormTarget, RenderTargets,
        ViewZone, ViewZones, WidgetRenderTarget,
    };
    pub use crate::settings::*;
    pub use crate::types::*;
    pub use crate::events::*;

    pub use crate::document::{Block, NotebookDocument, Param};
    pub use crate::engine::{PassOrigin, Trigger, WidgetEngine};
    pub use crate::folding::{FoldingModelPort, FoldingProviders, FoldingRangeProvider};
    pub use crate::gutter::{DecorationHost, GutterDecoration, GutterGlyphKind, RunRequestSink};
    pub use crate::reconcile::{ReconcileInput, ReconcileReport, Reconciler};
    pub use crate::widgets::{
        FormSurface, SizingPolicy, SummaryAction, SummaryContent, ViewZoneHost, WidgetId,
        WidgetKind, WidgetKindTag, ZoneAnchor, ZoneId, ZonePlacement,
    };
}
