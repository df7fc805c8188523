// scene/ - Background surface and final compositing
//
// The background is supplied by the host and swapped between ticks through
// a generation-guarded slot; the compositor turns optical map + background
// into the displayed RGBA frame.

mod background;
mod compositor;

pub use background::{Background, BackgroundError, BackgroundSlot};
pub use compositor::{Compositor, Frame, Optics, visibility_alpha};

use crate::sim::Area;

/// Host viewport in CSS pixels plus device pixel ratio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    pub pixel_ratio: f32,
}

impl Viewport {
    pub fn new(width: u32, height: u32, pixel_ratio: f32) -> Self {
        let pixel_ratio = if pixel_ratio.is_finite() && pixel_ratio > 0.0 { pixel_ratio } else { 1.0 };
        Self { width, height, pixel_ratio }
    }

    pub fn physical_width(&self) -> usize {
        (self.width as f32 * self.pixel_ratio).round() as usize
    }

    pub fn physical_height(&self) -> usize {
        (self.height as f32 * self.pixel_ratio).round() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.physical_width() == 0 || self.physical_height() == 0
    }

    /// Simulation bounds for this viewport.
    pub fn area(&self) -> Area {
        Area::new(
            self.physical_width() as f32,
            self.physical_height() as f32,
            self.pixel_ratio,
        )
    }
}

/// Aspect-preserving scale-to-fill from output pixels to background space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoverFit {
    pub scale: f32,
    view_w: f32,
    view_h: f32,
    bg_w: f32,
    bg_h: f32,
}

impl CoverFit {
    /// `None` when either rectangle is empty; callers treat that as not ready.
    pub fn new(view_w: f32, view_h: f32, bg_w: f32, bg_h: f32) -> Option<Self> {
        if !(view_w > 0.0 && view_h > 0.0 && bg_w > 0.0 && bg_h > 0.0) {
            return None;
        }
        let scale = (view_w / bg_w).max(view_h / bg_h);
        Some(Self { scale, view_w, view_h, bg_w, bg_h })
    }

    /// Output pixel coordinate -> normalized background coordinate.
    /// The background is centered, so overflow is cropped evenly.
    #[inline]
    pub fn to_background(&self, x: f32, y: f32) -> (f32, f32) {
        let bx = (x - self.view_w * 0.5) / self.scale + self.bg_w * 0.5;
        let by = (y - self.view_h * 0.5) / self.scale + self.bg_h * 0.5;
        (bx / self.bg_w, by / self.bg_h)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cover_fit_identity_on_matching_aspect() {
        let fit = CoverFit::new(800.0, 600.0, 1600.0, 1200.0).unwrap();
        for &(x, y) in &[(0.0, 0.0), (400.0, 300.0), (800.0, 600.0), (123.0, 456.0)] {
            let (u, v) = fit.to_background(x, y);
            assert!((u - x / 800.0).abs() < 1e-5);
            assert!((v - y / 600.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_cover_fit_crops_wide_background() {
        // Square viewport, 2:1 background: height fills, sides cropped
        let fit = CoverFit::new(100.0, 100.0, 200.0, 100.0).unwrap();
        assert_eq!(fit.scale, 1.0);
        let (u0, v0) = fit.to_background(0.0, 0.0);
        let (u1, v1) = fit.to_background(100.0, 100.0);
        assert!((u0 - 0.25).abs() < 1e-6 && (u1 - 0.75).abs() < 1e-6);
        assert!(v0.abs() < 1e-6 && (v1 - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cover_fit_rejects_empty() {
        assert!(CoverFit::new(0.0, 100.0, 10.0, 10.0).is_none());
        assert!(CoverFit::new(100.0, 100.0, 10.0, 0.0).is_none());
        assert!(CoverFit::new(100.0, f32::NAN, 10.0, 10.0).is_none());
    }

    #[test]
    fn test_viewport_physical_size() {
        let vp = Viewport::new(640, 360, 1.5);
        assert_eq!(vp.physical_width(), 960);
        assert_eq!(vp.physical_height(), 540);
        assert_eq!(Viewport::new(10, 10, -2.0).pixel_ratio, 1.0);
        assert!(Viewport::new(0, 10, 1.0).is_empty());
    }
}
