//! Trigger debounce settings

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// Debounce windows for the signals that start a reconciliation pass
#[derive(Clone, Debug, Resource, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerSettings {
    /// Text changes (ms)
    pub text_debounce_ms: u64,

    /// Folding model changes (ms)
    pub folding_debounce_ms: u64,

    /// Layout changes: width, scrollbar (ms)
    pub layout_debounce_ms: u64,

    /// Block result snapshots (ms)
    pub results_debounce_ms: u64,

    /// Delay before the single retry when the folding model is not ready (ms)
    pub folding_retry_delay_ms: u64,
}

impl Default for TriggerSettings {
    fn default() -> Self {
        Self {
            text_debounce_ms: 100,
            folding_debounce_ms: 50,
            layout_debounce_ms: 100,
            results_debounce_ms: 50,
            folding_retry_delay_ms: 300,
        }
    }
}
