// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Aspect-preserving rectangle fitting, shared by the page composer and the
// thumbnail renderer. All units are PDF points.

use serde::{Deserialize, Serialize};

/// A width/height pair in points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SizePt {
    pub width: f32,
    pub height: f32,
}

impl SizePt {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// An axis-aligned rectangle in points, origin at the bottom-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RectPt {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl RectPt {
    pub const ZERO: Self = Self {
        x: 0.0,
        y: 0.0,
        width: 0.0,
        height: 0.0,
    };

    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle spanning a size, anchored at the origin.
    pub const fn of_size(size: SizePt) -> Self {
        Self::new(0.0, 0.0, size.width, size.height)
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    pub fn mid_x(&self) -> f32 {
        self.x + self.width / 2.0
    }

    pub fn mid_y(&self) -> f32 {
        self.y + self.height / 2.0
    }
}

/// Largest rectangle with the source's aspect ratio that fits entirely within
/// `container`, centered in it.
///
/// `scale = min(container.width / w0, container.height / h0)`. A source with
/// either dimension ≤ 0 yields [`RectPt::ZERO`] — the degenerate case is
/// defined, not an error to propagate.
pub fn aspect_fit(source: SizePt, container: RectPt) -> RectPt {
    if source.width <= 0.0 || source.height <= 0.0 {
        return RectPt::ZERO;
    }

    let scale = (container.width / source.width).min(container.height / source.height);
    let width = source.width * scale;
    let height = source.height * scale;

    RectPt {
        x: container.mid_x() - width / 2.0,
        y: container.mid_y() - height / 2.0,
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-4;

    #[test]
    fn preserves_aspect_ratio() {
        let container = RectPt::new(0.0, 0.0, 595.2, 842.0);
        let source = SizePt::new(400.0, 300.0);
        let fitted = aspect_fit(source, container);

        let src_ratio = source.width / source.height;
        let fit_ratio = fitted.width / fitted.height;
        assert!((src_ratio - fit_ratio).abs() < EPS);
    }

    #[test]
    fn centered_and_contained() {
        let container = RectPt::new(10.0, 20.0, 100.0, 200.0);
        let fitted = aspect_fit(SizePt::new(50.0, 50.0), container);

        assert!((fitted.mid_x() - container.mid_x()).abs() < EPS);
        assert!((fitted.mid_y() - container.mid_y()).abs() < EPS);
        assert!(fitted.x >= container.x - EPS);
        assert!(fitted.y >= container.y - EPS);
        assert!(fitted.x + fitted.width <= container.x + container.width + EPS);
        assert!(fitted.y + fitted.height <= container.y + container.height + EPS);
    }

    #[test]
    fn wide_source_fills_width() {
        let container = RectPt::new(0.0, 0.0, 120.0, 150.0);
        let fitted = aspect_fit(SizePt::new(200.0, 100.0), container);

        assert!((fitted.width - 120.0).abs() < EPS);
        assert!((fitted.height - 60.0).abs() < EPS);
        assert!((fitted.y - 45.0).abs() < EPS);
    }

    #[test]
    fn upscales_small_sources() {
        let container = RectPt::new(0.0, 0.0, 100.0, 100.0);
        let fitted = aspect_fit(SizePt::new(10.0, 10.0), container);
        assert!((fitted.width - 100.0).abs() < EPS);
    }

    #[test]
    fn degenerate_source_yields_empty_rect() {
        let container = RectPt::new(0.0, 0.0, 100.0, 100.0);
        assert_eq!(aspect_fit(SizePt::new(0.0, 50.0), container), RectPt::ZERO);
        assert_eq!(aspect_fit(SizePt::new(50.0, 0.0), container), RectPt::ZERO);
        assert_eq!(
            aspect_fit(SizePt::new(-3.0, 50.0), container),
            RectPt::ZERO
        );
    }
}
