//! Gutter glyph settings

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::gutter::GutterGlyphKind;

/// Run-status glyphs in the gutter
#[derive(Clone, Debug, Resource, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GutterSettings {
    /// Show the glyphs at all
    pub enabled: bool,

    /// Glyph font size
    pub font_size: f32,

    /// Horizontal offset inside the gutter (pixels)
    pub offset_x: f32,

    pub run_all_glyph: String,
    pub runnable_glyph: String,
    pub in_progress_glyph: String,
    pub complete_glyph: String,
    pub failed_glyph: String,

    /// Colors as sRGBA components
    pub runnable_color: [f32; 4],
    pub in_progress_color: [f32; 4],
    pub complete_color: [f32; 4],
    pub failed_color: [f32; 4],
}

impl Default for GutterSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            font_size: 12.0,
            offset_x: 6.0,
            run_all_glyph: "⏵⏵".to_string(),
            runnable_glyph: "⏵".to_string(),
            in_progress_glyph: "◌".to_string(),
            complete_glyph: "✓".to_string(),
            failed_glyph: "✗".to_string(),
            runnable_color: [0.6, 0.6, 0.6, 1.0],
            in_progress_color: [0.35, 0.6, 0.95, 1.0],
            complete_color: [0.3, 0.75, 0.4, 1.0],
            failed_color: [0.9, 0.3, 0.3, 1.0],
        }
    }
}

impl GutterSettings {
    pub fn glyph(&self, kind: GutterGlyphKind) -> &str {
        match kind {
            GutterGlyphKind::RunAll => &self.run_all_glyph,
            GutterGlyphKind::Runnable => &self.runnable_glyph,
            GutterGlyphKind::InProgress => &self.in_progress_glyph,
            GutterGlyphKind::Complete => &self.complete_glyph,
            GutterGlyphKind::Failed => &self.failed_glyph,
        }
    }

    pub fn color(&self, kind: GutterGlyphKind) -> Color {
        let [r, g, b, a] = match kind {
            GutterGlyphKind::RunAll | GutterGlyphKind::Runnable => self.runnable_color,
            GutterGlyphKind::InProgress => self.in_progress_color,
            GutterGlyphKind::Complete => self.complete_color,
            GutterGlyphKind::Failed => self.failed_color,
        };
        Color::srgba(r, g, b, a)
    }
}
