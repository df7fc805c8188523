// render/ - Footprint rasterizer
//
// Draws every live droplet and residue mark into the optical map by
// stamping the precomputed footprint kernel, stretched along each droplet's
// velocity.
//
// Two modes, chosen by `fogMode.enabled`:
//   stateless (default) - map cleared and fully redrawn every frame
//   fog-wipe            - map fades back toward neutral a little each frame,
//                         so wiped streaks persist and slowly re-fog

mod kernel;
mod map;

pub use kernel::{FootprintKernel, KERNEL_EXPONENT, KERNEL_SIZE, KERNEL_SKEW};
pub use map::{MASK, NEUTRAL, OpticalMap, RX, RY, SPECULAR, Texel};

use crate::config::FogMode;
use crate::sim::{Droplet, Droplets, Residue, ResidueMark};

// Shape constants
const STRETCH_SPEED: f32 = 1200.0;
const MAX_STRETCH: f32 = 1.8;
const DROP_OPACITY: f32 = 0.9;

/// One kernel placement: center, half extents and heading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Footprint {
    pub cx: f32,
    pub cy: f32,
    /// Half width, across the heading
    pub half_w: f32,
    /// Half height, along the heading
    pub half_h: f32,
    pub angle: f32,
    pub opacity: f32,
}

impl Footprint {
    /// Faster droplets draw longer and narrower.
    pub fn droplet(d: &Droplet) -> Self {
        let stretch = (d.speed() / STRETCH_SPEED).min(MAX_STRETCH);
        let (cx, cy) = d.position();
        Self {
            cx,
            cy,
            half_w: d.radius * (1.2 - stretch * 0.15) * 0.5,
            half_h: d.radius * (2.8 + stretch * 1.2) * 0.5,
            angle: d.heading(),
            opacity: DROP_OPACITY,
        }
    }

    pub fn mark(m: &ResidueMark) -> Self {
        Self {
            cx: m.x,
            cy: m.y,
            half_w: m.radius,
            half_h: m.radius,
            angle: m.angle.unwrap_or(0.0),
            opacity: 1.0,
        }
    }
}

pub struct Rasterizer {
    kernel: FootprintKernel,
    map: OpticalMap,
}

impl Rasterizer {
    pub fn new(width: usize, height: usize) -> Self {
        Self::with_kernel(FootprintKernel::default(), width, height)
    }

    pub fn with_kernel(kernel: FootprintKernel, width: usize, height: usize) -> Self {
        Self { kernel, map: OpticalMap::new(width, height) }
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        self.map.resize(width, height);
    }

    pub fn map(&self) -> &OpticalMap {
        &self.map
    }

    /// Rebuild the optical map for this frame.
    pub fn rasterize(&mut self, drops: &Droplets, residue: &Residue, dt: f32, fog: &FogMode) -> &OpticalMap {
        if fog.enabled {
            self.map.fade(1.0 - (-fog.refog_rate * dt.max(0.0)).exp());
        } else {
            self.map.clear();
        }

        for m in residue.iter() {
            self.stamp(&Footprint::mark(m));
        }
        for d in drops.iter() {
            self.stamp(&Footprint::droplet(d));
        }

        &self.map
    }

    /// Composite one kernel instance into the map.
    pub fn stamp(&mut self, fp: &Footprint) {
        if !(fp.half_w > 0.0 && fp.half_h > 0.0) { return; }
        if !(fp.cx.is_finite() && fp.cy.is_finite()) { return; }

        let (w, h) = (self.map.width() as i32, self.map.height() as i32);
        let reach = fp.half_w.max(fp.half_h);
        let x0 = ((fp.cx - reach).floor() as i32).max(0);
        let y0 = ((fp.cy - reach).floor() as i32).max(0);
        let x1 = ((fp.cx + reach).ceil() as i32).min(w - 1);
        let y1 = ((fp.cy + reach).ceil() as i32).min(h - 1);
        if x0 > x1 || y0 > y1 { return; }

        let (sin, cos) = fp.angle.sin_cos();

        for py in y0..=y1 {
            for px in x0..=x1 {
                let wx = px as f32 + 0.5 - fp.cx;
                let wy = py as f32 + 0.5 - fp.cy;

                // World -> kernel space (kernel +y runs along the heading)
                let u = (wx * cos - wy * sin) / fp.half_w;
                let v = (wx * sin + wy * cos) / fp.half_h;
                if u.abs() > 1.0 || v.abs() > 1.0 { continue; }

                let t = self.kernel.sample(u, v);
                if t.mask <= 0.0 { continue; }

                // Refraction vectors turn with the footprint
                let (lx, ly) = t.offset();
                let src = Texel {
                    rx: lx * cos + ly * sin + 0.5,
                    ry: -lx * sin + ly * cos + 0.5,
                    specular: t.specular,
                    mask: t.mask,
                };
                self.map.blend(px as usize, py as usize, src, t.mask * fp.opacity);
            }
        }
    }
}
