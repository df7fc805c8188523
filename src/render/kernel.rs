// kernel.rs - Footprint kernel
//
// The optical profile of a single droplet, computed once at startup and
// stretched/rotated per instance by the rasterizer.

use super::map::{NEUTRAL, Texel};
use ndarray::Array3;

pub const KERNEL_SIZE: usize = 64;
pub const KERNEL_EXPONENT: f32 = 2.0;
/// Gravity skew: the lower half of the footprint is this much fuller
pub const KERNEL_SKEW: f32 = 0.15;

pub struct FootprintKernel {
    size: usize,
    data: Array3<f32>,
}

impl FootprintKernel {
    /// Build a `size` x `size` kernel with falloff `(1 - dist)^exponent`.
    /// `skew` > 0 shortens the pseudo-distance below the center, giving the
    /// footprint a heavier bottom.
    pub fn new(size: usize, exponent: f32, skew: f32) -> Self {
        let size = size.max(2);
        let half = size as f32 * 0.5;
        let skew = skew.clamp(0.0, 0.9);

        let data = Array3::from_shape_fn((size, size, 4), |(py, px, c)| {
            let dx = (px as f32 + 0.5 - half) / half;
            let dy = (py as f32 + 0.5 - half) / half;
            let sy = if dy > 0.0 { dy * (1.0 - skew) } else { dy * (1.0 + skew) };
            let dist = dx.hypot(sy);
            if dist > 1.0 { return NEUTRAL[c]; }

            let f = (1.0 - dist).powf(exponent);
            match c {
                0 => dx * 0.5 + 0.5,
                1 => dy * 0.5 + 0.5,
                _ => f,
            }
        });

        Self { size, data }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    fn texel(&self, x: usize, y: usize) -> Texel {
        Texel {
            rx: self.data[[y, x, 0]],
            ry: self.data[[y, x, 1]],
            specular: self.data[[y, x, 2]],
            mask: self.data[[y, x, 3]],
        }
    }

    /// Bilinear sample at local coordinates `(u, v)` in [-1, 1]^2.
    pub fn sample(&self, u: f32, v: f32) -> Texel {
        let max = (self.size - 1) as f32;
        let fx = ((u + 1.0) * 0.5 * self.size as f32 - 0.5).clamp(0.0, max);
        let fy = ((v + 1.0) * 0.5 * self.size as f32 - 0.5).clamp(0.0, max);

        let (x0, y0) = (fx as usize, fy as usize);
        let (x1, y1) = ((x0 + 1).min(self.size - 1), (y0 + 1).min(self.size - 1));
        let (tx, ty) = (fx - x0 as f32, fy - y0 as f32);

        let top = Texel::lerp(self.texel(x0, y0), self.texel(x1, y0), tx);
        let bottom = Texel::lerp(self.texel(x0, y1), self.texel(x1, y1), tx);
        Texel::lerp(top, bottom, ty)
    }
}

impl Default for FootprintKernel {
    fn default() -> Self {
        Self::new(KERNEL_SIZE, KERNEL_EXPONENT, KERNEL_SKEW)
    }
}
