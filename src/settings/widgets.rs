//! Widget sizing settings

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// Heights of the embedded widgets
#[derive(Clone, Debug, Resource, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WidgetSizingSettings {
    /// Parameter form height without any rows (pixels)
    pub form_base_height: f32,

    /// Extra height per declared parameter (pixels)
    pub form_row_height: f32,

    /// Output viewer bounds (pixels)
    pub output_min_height: f32,
    pub output_max_height: f32,

    /// Folding summary height (pixels)
    pub summary_height: f32,
}

impl Default for WidgetSizingSettings {
    fn default() -> Self {
        Self {
            form_base_height: 56.0,
            form_row_height: 36.0,
            output_min_height: 48.0,
            output_max_height: 480.0,
            summary_height: 28.0,
        }
    }
}

impl WidgetSizingSettings {
    /// Height of a parameter form with `params` rows
    pub fn form_height(&self, params: usize) -> f32 {
        self.form_base_height + self.form_row_height * params as f32
    }
}

/// Sizing observer tuning for content-sized widgets
#[derive(Clone, Debug, Resource, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SizingObserverSettings {
    /// Delay after attach before measuring, lets content do its first paint (ms)
    pub grace_ms: u64,

    /// Coalescing window for measurements (ms)
    pub debounce_ms: u64,

    /// Height changes at or below this are ignored (pixels)
    pub change_threshold_px: f32,

    /// Measurements below this mean "not rendered yet" (pixels)
    pub epsilon_px: f32,
}

impl Default for SizingObserverSettings {
    fn default() -> Self {
        Self {
            grace_ms: 100,
            debounce_ms: 50,
            change_threshold_px: 2.0,
            epsilon_px: 1.0,
        }
    }
}
