// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Engine configuration.

use serde::{Deserialize, Serialize};

use crate::geometry::SizePt;

/// Tunable constants for composition and thumbnailing.
///
/// The defaults reproduce the engine's fixed geometry: one uniform A4-like
/// page for every composed page and a small portrait thumbnail card.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Target page geometry, in points, used for every composed page.
    pub page_size: SizePt,
    /// Thumbnail canvas size, in pixels.
    pub thumbnail_width: u32,
    pub thumbnail_height: u32,
    /// Inset from the page edge for synthesized text pages.
    pub text_inset_pt: f32,
    /// Inset from the page edge for caption (placeholder) pages.
    pub caption_inset_pt: f32,
    /// Font size for synthesized text pages.
    pub body_font_size_pt: f32,
    /// Font size for caption pages.
    pub caption_font_size_pt: f32,
    /// JPEG quality (1-100) for merge thumbnails.
    pub thumbnail_jpeg_quality: u8,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            page_size: SizePt::new(595.2, 842.0),
            thumbnail_width: 120,
            thumbnail_height: 150,
            text_inset_pt: 24.0,
            caption_inset_pt: 20.0,
            body_font_size_pt: 16.0,
            caption_font_size_pt: 20.0,
            thumbnail_jpeg_quality: 80,
        }
    }
}
