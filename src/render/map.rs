// map.rs - Optical map
//
// Per-texel record {refractionX, refractionY, specular, mask}, each in
// [0, 1]. Refraction is biased: 0.5 means no offset. Layout is
// (row, column, channel) so a texel is one contiguous lane.

use ndarray::{Array3, Axis};

pub const RX: usize = 0;
pub const RY: usize = 1;
pub const SPECULAR: usize = 2;
pub const MASK: usize = 3;

/// Texel with no droplet over it.
pub const NEUTRAL: [f32; 4] = [0.5, 0.5, 0.0, 0.0];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Texel {
    pub rx: f32,
    pub ry: f32,
    pub specular: f32,
    pub mask: f32,
}

impl Texel {
    pub const NEUTRAL: Texel = Texel { rx: 0.5, ry: 0.5, specular: 0.0, mask: 0.0 };

    /// Refraction as a signed offset in [-0.5, 0.5].
    #[inline]
    pub fn offset(&self) -> (f32, f32) {
        (self.rx - 0.5, self.ry - 0.5)
    }

    #[inline]
    pub fn lerp(a: Texel, b: Texel, t: f32) -> Texel {
        Texel {
            rx: a.rx + (b.rx - a.rx) * t,
            ry: a.ry + (b.ry - a.ry) * t,
            specular: a.specular + (b.specular - a.specular) * t,
            mask: a.mask + (b.mask - a.mask) * t,
        }
    }
}

pub struct OpticalMap {
    data: Array3<f32>,
}

impl OpticalMap {
    pub fn new(width: usize, height: usize) -> Self {
        Self { data: Array3::from_shape_fn((height, width, 4), |(_, _, c)| NEUTRAL[c]) }
    }

    pub fn width(&self) -> usize {
        self.data.dim().1
    }

    pub fn height(&self) -> usize {
        self.data.dim().0
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        if self.width() == width && self.height() == height { return; }
        *self = Self::new(width, height);
    }

    /// Reset every texel to neutral.
    pub fn clear(&mut self) {
        for mut lane in self.data.lanes_mut(Axis(2)) {
            for c in 0..4 { lane[c] = NEUTRAL[c]; }
        }
    }

    /// Move every texel `fraction` of the way back to neutral.
    pub fn fade(&mut self, fraction: f32) {
        let t = fraction.clamp(0.0, 1.0);
        if t >= 1.0 { return self.clear(); }
        for mut lane in self.data.lanes_mut(Axis(2)) {
            for c in 0..4 { lane[c] += (NEUTRAL[c] - lane[c]) * t; }
        }
    }

    #[inline]
    pub fn texel(&self, x: usize, y: usize) -> Texel {
        Texel {
            rx: self.data[[y, x, RX]],
            ry: self.data[[y, x, RY]],
            specular: self.data[[y, x, SPECULAR]],
            mask: self.data[[y, x, MASK]],
        }
    }

    /// Nearest texel at normalized coordinates; outside is neutral.
    #[inline]
    pub fn sample(&self, u: f32, v: f32) -> Texel {
        let (w, h) = (self.width(), self.height());
        if w == 0 || h == 0 || !(0.0..1.0).contains(&u) || !(0.0..1.0).contains(&v) {
            return Texel::NEUTRAL;
        }
        let x = ((u * w as f32) as usize).min(w - 1);
        let y = ((v * h as f32) as usize).min(h - 1);
        self.texel(x, y)
    }

    /// Source-over: channels lerp toward `src` by `alpha`, mask accumulates.
    #[inline]
    pub fn blend(&mut self, x: usize, y: usize, src: Texel, alpha: f32) {
        if x >= self.width() || y >= self.height() { return; }
        let a = alpha.clamp(0.0, 1.0);
        let dst = self.texel(x, y);
        self.data[[y, x, RX]] = dst.rx + (src.rx - dst.rx) * a;
        self.data[[y, x, RY]] = dst.ry + (src.ry - dst.ry) * a;
        self.data[[y, x, SPECULAR]] = dst.specular + (src.specular - dst.specular) * a;
        self.data[[y, x, MASK]] = a + dst.mask * (1.0 - a);
    }

    /// Integer-backed export, 4 bytes per texel in channel order.
    pub fn to_rgba8(&self) -> Vec<u8> {
        self.data.iter().map(|v| (v.clamp(0.0, 1.0) * 255.0).round() as u8).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_map_is_neutral() {
        let map = OpticalMap::new(4, 3);
        assert_eq!(map.width(), 4);
        assert_eq!(map.height(), 3);
        assert_eq!(map.texel(3, 2), Texel::NEUTRAL);
    }

    #[test]
    fn test_blend_accumulates_mask() {
        let mut map = OpticalMap::new(2, 2);
        let src = Texel { rx: 1.0, ry: 0.0, specular: 1.0, mask: 1.0 };
        map.blend(1, 1, src, 0.5);
        map.blend(1, 1, src, 0.5);
        let t = map.texel(1, 1);
        assert!((t.mask - 0.75).abs() < 1e-6);
        assert!((t.rx - 0.875).abs() < 1e-6);
        assert!(t.mask <= 1.0);
    }

    #[test]
    fn test_fade_moves_toward_neutral() {
        let mut map = OpticalMap::new(1, 1);
        map.blend(0, 0, Texel { rx: 1.0, ry: 1.0, specular: 1.0, mask: 1.0 }, 1.0);
        map.fade(0.25);
        let t = map.texel(0, 0);
        assert!((t.mask - 0.75).abs() < 1e-6);
        assert!((t.rx - 0.875).abs() < 1e-6);
        map.fade(1.0);
        assert_eq!(map.texel(0, 0), Texel::NEUTRAL);
    }

    #[test]
    fn test_sample_outside_is_neutral() {
        let mut map = OpticalMap::new(2, 2);
        map.blend(0, 0, Texel { rx: 0.0, ry: 0.0, specular: 1.0, mask: 1.0 }, 1.0);
        assert_eq!(map.sample(0.1, 0.1).mask, 1.0);
        assert_eq!(map.sample(-0.1, 0.1), Texel::NEUTRAL);
        assert_eq!(map.sample(0.5, 1.0), Texel::NEUTRAL);
    }

    #[test]
    fn test_to_rgba8_layout() {
        let map = OpticalMap::new(2, 1);
        assert_eq!(map.to_rgba8(), vec![128, 128, 0, 0, 128, 128, 0, 0]);
    }
}
