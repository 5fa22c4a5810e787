//! Settings for the widget engine
//!
//! Each concern has its own resource so systems only borrow what they read.
//! Use `NotebookSettingsBuilder` for convenient initialization, or load a
//! [`NotebookSettings`] file from JSON.

mod gutter;
mod triggers;
mod widgets;

pub use gutter::*;
pub use triggers::*;
pub use widgets::*;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid settings: {0}")]
    Invalid(String),
}

/// All settings in one serializable document
///
/// Missing sections and fields fall back to their defaults.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotebookSettings {
    pub triggers: TriggerSettings,
    pub widgets: WidgetSizingSettings,
    pub sizing: SizingObserverSettings,
    pub gutter: GutterSettings,
}

impl NotebookSettings {
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn to_json(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject values the engine cannot work with
    pub fn validate(&self) -> Result<(), SettingsError> {
        let widgets = &self.widgets;
        if widgets.output_min_height <= 0.0 {
            return Err(SettingsError::Invalid(format!(
                "output_min_height must be positive, got {}",
                widgets.output_min_height
            )));
        }
        if widgets.output_max_height < widgets.output_min_height {
            return Err(SettingsError::Invalid(format!(
                "output_max_height ({}) is below output_min_height ({})",
                widgets.output_max_height, widgets.output_min_height
            )));
        }
        if widgets.form_base_height < 0.0 || widgets.form_row_height < 0.0 {
            return Err(SettingsError::Invalid("form heights must not be negative".into()));
        }
        if widgets.summary_height <= 0.0 {
            return Err(SettingsError::Invalid("summary_height must be positive".into()));
        }
        if self.sizing.change_threshold_px < 0.0 || self.sizing.epsilon_px < 0.0 {
            return Err(SettingsError::Invalid("sizing thresholds must not be negative".into()));
        }
        Ok(())
    }

    pub fn into_bundle(self) -> SettingsBundle {
        SettingsBundle {
            triggers: self.triggers,
            widgets: self.widgets,
            sizing: self.sizing,
            gutter: self.gutter,
        }
    }
}

/// Builder for configuring all engine settings at once
///
/// # Example
/// ```no_run
/// use bevy_notebook_widgets::settings::NotebookSettingsBuilder;
///
/// let settings = NotebookSettingsBuilder::default()
///     .text_debounce_ms(150)
///     .output_height(64.0, 600.0)
///     .build();
/// ```
#[derive(Default)]
pub struct NotebookSettingsBuilder {
    settings: NotebookSettings,
}

impl NotebookSettingsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text_debounce_ms(mut self, ms: u64) -> Self {
        self.settings.triggers.text_debounce_ms = ms;
        self
    }

    pub fn folding_retry_delay_ms(mut self, ms: u64) -> Self {
        self.settings.triggers.folding_retry_delay_ms = ms;
        self
    }

    pub fn output_height(mut self, min: f32, max: f32) -> Self {
        self.settings.widgets.output_min_height = min;
        self.settings.widgets.output_max_height = max;
        self
    }

    pub fn summary_height(mut self, height: f32) -> Self {
        self.settings.widgets.summary_height = height;
        self
    }

    pub fn gutter_enabled(mut self, enabled: bool) -> Self {
        self.settings.gutter.enabled = enabled;
        self
    }

    pub fn triggers(mut self, triggers: TriggerSettings) -> Self {
        self.settings.triggers = triggers;
        self
    }

    pub fn widgets(mut self, widgets: WidgetSizingSettings) -> Self {
        self.settings.widgets = widgets;
        self
    }

    pub fn sizing(mut self, sizing: SizingObserverSettings) -> Self {
        self.settings.sizing = sizing;
        self
    }

    pub fn gutter(mut self, gutter: GutterSettings) -> Self {
        self.settings.gutter = gutter;
        self
    }

    /// Build the bundle of settings resources
    pub fn build(self) -> SettingsBundle {
        self.settings.into_bundle()
    }
}

/// Bundle of all settings resources
/// Use `insert_into(app)` to add all settings to your Bevy app
#[derive(Clone, Debug, Default)]
pub struct SettingsBundle {
    pub triggers: TriggerSettings,
    pub widgets: WidgetSizingSettings,
    pub sizing: SizingObserverSettings,
    pub gutter: GutterSettings,
}

impl SettingsBundle {
    /// Insert all settings as resources into the app
    pub fn insert_into(self, app: &mut App) {
        app.insert_resource(self.triggers);
        app.insert_resource(self.widgets);
        app.insert_resource(self.sizing);
        app.insert_resource(self.gutter);
    }
}
