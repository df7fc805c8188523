// compositor.rs - Optical map + background -> displayed frame
//
// Per output pixel:
//   texel      = optical map at the pixel's normalized position
//   bg coord   = cover-fit(pixel) + refraction offset * strength
//   alpha      = clamp((mask - threshold) * multiplier, 0, 1)
//   color      = lerp(bg, bg + specular * gain, alpha)
//   fog-wipe:    color = lerp(color, tint, intensity * (1 - alpha))

use super::{Background, CoverFit};
use crate::config::SimulationConfig;
use crate::render::OpticalMap;

/// Opaque black shown until the first background is ready.
const PLACEHOLDER: [u8; 4] = [0, 0, 0, 255];

/// RGBA8 output buffer.
pub struct Frame {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
}

impl Frame {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height, pixels: PLACEHOLDER.repeat(width * height) }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn ptr(&self) -> *const u8 {
        self.pixels.as_ptr()
    }

    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> [u8; 4] {
        let i = (y * self.width + x) * 4;
        [self.pixels[i], self.pixels[i + 1], self.pixels[i + 2], self.pixels[i + 3]]
    }
}

/// Compositing parameters, lifted out of the config once per tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Optics {
    pub refraction_strength: f32,
    pub alpha_multiplier: f32,
    pub alpha_subtract_threshold: f32,
    pub highlight_gain: f32,
    pub lens_by_specular: bool,
    /// Tint (0..255 per channel) and intensity when fog-wipe is on
    pub fog: Option<([f32; 3], f32)>,
}

impl Optics {
    pub fn from_config(config: &SimulationConfig) -> Self {
        let fog = &config.fog_mode;
        Self {
            refraction_strength: config.refraction_strength,
            alpha_multiplier: config.alpha_multiplier,
            alpha_subtract_threshold: config.alpha_subtract_threshold,
            highlight_gain: config.highlight_gain,
            lens_by_specular: config.lens_by_specular,
            fog: fog.enabled.then(|| {
                let [r, g, b] = fog.tint_color;
                ([r as f32, g as f32, b as f32], fog.intensity)
            }),
        }
    }
}

/// Soft threshold: near-binary "under a droplet" signal with soft edges.
/// The bias is scaled by the gain, `(mask - threshold) * multiplier`, so any
/// mask at or below `threshold` is fully invisible whatever the multiplier.
#[inline]
pub fn visibility_alpha(mask: f32, multiplier: f32, threshold: f32) -> f32 {
    ((mask - threshold) * multiplier).clamp(0.0, 1.0)
}

pub struct Compositor {
    frame: Frame,
}

impl Compositor {
    pub fn new(width: usize, height: usize) -> Self {
        Self { frame: Frame::new(width, height) }
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    /// New buffer size; shows the placeholder until the next composite.
    pub fn resize(&mut self, width: usize, height: usize) {
        if self.frame.width == width && self.frame.height == height { return; }
        self.frame = Frame::new(width, height);
    }

    /// Render into the frame. Without a usable background the previous
    /// frame is left untouched and `false` is returned.
    pub fn composite(&mut self, map: &OpticalMap, background: Option<&Background>, optics: &Optics) -> bool {
        let Some(bg) = background else { return false; };
        let (w, h) = (self.frame.width, self.frame.height);
        let Some(fit) = CoverFit::new(w as f32, h as f32, bg.width() as f32, bg.height() as f32) else {
            return false;
        };

        let gain = optics.highlight_gain * 255.0;

        for (i, out) in self.frame.pixels.chunks_exact_mut(4).enumerate() {
            let (x, y) = ((i % w) as f32 + 0.5, (i / w) as f32 + 0.5);
            let t = map.sample(x / w as f32, y / h as f32);

            let (ox, oy) = t.offset();
            let lens = if optics.lens_by_specular { t.specular } else { 1.0 };
            let k = optics.refraction_strength * lens;
            let (u, v) = fit.to_background(x, y);
            let base = bg.sample(u + ox * k, v + oy * k);

            let alpha = visibility_alpha(t.mask, optics.alpha_multiplier, optics.alpha_subtract_threshold);
            let lift = t.specular * gain * alpha;

            for c in 0..3 {
                let mut value = base[c] + lift;
                if let Some((tint, intensity)) = optics.fog {
                    value += (tint[c] - value) * intensity * (1.0 - alpha);
                }
                out[c] = value.clamp(0.0, 255.0).round() as u8;
            }
            out[3] = 255;
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::Texel;

    fn optics() -> Optics {
        Optics::from_config(&SimulationConfig::default())
    }

    #[test]
    fn test_alpha_soft_threshold() {
        assert_eq!(visibility_alpha(0.05, 20.0, 0.1), 0.0);
        assert_eq!(visibility_alpha(0.5, 20.0, 0.1), 1.0);
        assert!((visibility_alpha(0.125, 20.0, 0.1) - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_placeholder_before_background() {
        let mut c = Compositor::new(4, 4);
        let map = OpticalMap::new(4, 4);
        assert!(!c.composite(&map, None, &optics()));
        assert_eq!(c.frame().pixel(2, 2), PLACEHOLDER);
    }

    #[test]
    fn test_dry_glass_shows_background() {
        let mut c = Compositor::new(8, 8);
        let map = OpticalMap::new(8, 8);
        let bg = Background::solid(16, 16, [40, 80, 120, 255]).unwrap();
        assert!(c.composite(&map, Some(&bg), &optics()));
        assert_eq!(c.frame().pixel(3, 5), [40, 80, 120, 255]);
    }

    #[test]
    fn test_droplet_adds_highlight() {
        let mut c = Compositor::new(4, 4);
        let mut map = OpticalMap::new(4, 4);
        map.blend(1, 1, Texel { rx: 0.5, ry: 0.5, specular: 0.5, mask: 1.0 }, 1.0);
        let bg = Background::solid(4, 4, [100, 100, 100, 255]).unwrap();
        c.composite(&map, Some(&bg), &optics());
        // 100 + 0.5 * 0.4 * 255
        assert_eq!(c.frame().pixel(1, 1), [151, 151, 151, 255]);
        assert_eq!(c.frame().pixel(2, 2), [100, 100, 100, 255]);
    }

    #[test]
    fn test_refraction_shifts_sample() {
        // Left half black, right half white
        let mut pixels = Vec::new();
        for _y in 0..2 {
            pixels.extend_from_slice(&[0, 0, 0, 255, 0, 0, 0, 255]);
            pixels.extend_from_slice(&[255, 255, 255, 255, 255, 255, 255, 255]);
        }
        let bg = Background::from_rgba(4, 2, pixels).unwrap();
        let mut map = OpticalMap::new(4, 2);
        // Pixel (0,0) looks half a background to the right
        map.blend(0, 0, Texel { rx: 1.0, ry: 0.5, specular: 0.0, mask: 1.0 }, 1.0);

        let mut o = optics();
        o.refraction_strength = 1.0;
        let mut c = Compositor::new(4, 2);
        c.composite(&map, Some(&bg), &o);
        assert_eq!(c.frame().pixel(0, 0)[0], 255);
        assert_eq!(c.frame().pixel(0, 1)[0], 0);
    }

    #[test]
    fn test_fog_tints_dry_glass_only() {
        let mut config = SimulationConfig::default();
        config.fog_mode.enabled = true;
        config.fog_mode.intensity = 1.0;
        config.fog_mode.tint_color = [200, 200, 200];
        let o = Optics::from_config(&config);

        let mut map = OpticalMap::new(2, 1);
        map.blend(0, 0, Texel { rx: 0.5, ry: 0.5, specular: 0.0, mask: 1.0 }, 1.0);
        let bg = Background::solid(2, 1, [0, 0, 0, 255]).unwrap();
        let mut c = Compositor::new(2, 1);
        c.composite(&map, Some(&bg), &o);

        assert_eq!(c.frame().pixel(0, 0), [0, 0, 0, 255]);
        assert_eq!(c.frame().pixel(1, 0), [200, 200, 200, 255]);
    }

    #[test]
    fn test_empty_frame_is_not_ready() {
        let mut c = Compositor::new(0, 0);
        let bg = Background::solid(2, 2, [9, 9, 9, 255]).unwrap();
        assert!(!c.composite(&OpticalMap::new(0, 0), Some(&bg), &optics()));
    }
}
