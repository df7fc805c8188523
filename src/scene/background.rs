// background.rs - Background surface and its swap slot
//
// Loads are asynchronous on the host side: request a generation, load,
// then fulfill with that generation. A load that finishes after a newer
// request was made is discarded, so the newest background always wins.

/// Host-supplied RGBA8 bitmap.
#[derive(Debug, Clone, PartialEq)]
pub struct Background {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Background {
    pub fn from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, BackgroundError> {
        if width == 0 || height == 0 {
            return Err(BackgroundError::EmptyDimensions { width, height });
        }
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(BackgroundError::BufferSize { expected, actual: pixels.len() });
        }
        Ok(Self { width, height, pixels })
    }

    /// Single-color background.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Result<Self, BackgroundError> {
        let n = width as usize * height as usize;
        Self::from_rgba(width, height, rgba.repeat(n))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    #[inline]
    fn rgb(&self, x: usize, y: usize) -> [f32; 3] {
        let i = (y * self.width as usize + x) * 4;
        [self.pixels[i] as f32, self.pixels[i + 1] as f32, self.pixels[i + 2] as f32]
    }

    /// Bilinear RGB sample at normalized coordinates, clamped to the edge.
    pub fn sample(&self, u: f32, v: f32) -> [f32; 3] {
        let (w, h) = (self.width as usize, self.height as usize);
        let fx = (u * w as f32 - 0.5).clamp(0.0, (w - 1) as f32);
        let fy = (v * h as f32 - 0.5).clamp(0.0, (h - 1) as f32);
        // NaN survives clamp; pin it to the corner
        let fx = if fx.is_nan() { 0.0 } else { fx };
        let fy = if fy.is_nan() { 0.0 } else { fy };

        let (x0, y0) = (fx as usize, fy as usize);
        let (x1, y1) = ((x0 + 1).min(w - 1), (y0 + 1).min(h - 1));
        let (tx, ty) = (fx - x0 as f32, fy - y0 as f32);

        let (a, b) = (self.rgb(x0, y0), self.rgb(x1, y0));
        let (c, d) = (self.rgb(x0, y1), self.rgb(x1, y1));
        let mut out = [0.0; 3];
        for i in 0..3 {
            let top = a[i] + (b[i] - a[i]) * tx;
            let bottom = c[i] + (d[i] - c[i]) * tx;
            out[i] = top + (bottom - top) * ty;
        }
        out
    }
}

/// Single-writer cell holding the current background.
#[derive(Debug, Default)]
pub struct BackgroundSlot {
    current: Option<Background>,
    requested: u64,
    loaded: u64,
}

impl BackgroundSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a swap. The returned generation must accompany the loaded
    /// bitmap; any older outstanding load becomes stale.
    pub fn request(&mut self) -> u64 {
        self.requested += 1;
        self.requested
    }

    /// Install a loaded background if it belongs to the latest request.
    pub fn fulfill(&mut self, generation: u64, background: Background) -> bool {
        if generation != self.requested || generation == self.loaded {
            log::debug!(
                "discarding stale background load (generation {}, latest {})",
                generation,
                self.requested
            );
            return false;
        }
        log::info!(
            "background {}x{} ready (generation {})",
            background.width(),
            background.height(),
            generation
        );
        self.current = Some(background);
        self.loaded = generation;
        true
    }

    pub fn is_ready(&self) -> bool {
        self.current.is_some()
    }

    /// A swap has been requested and not yet fulfilled.
    pub fn is_pending(&self) -> bool {
        self.requested != self.loaded
    }

    /// Generation of the background currently shown; 0 before the first.
    pub fn generation(&self) -> u64 {
        self.loaded
    }

    pub fn current(&self) -> Option<&Background> {
        self.current.as_ref()
    }
}

/// Error types for background construction.
#[derive(Debug, Clone, PartialEq)]
pub enum BackgroundError {
    /// Width or height is zero
    EmptyDimensions { width: u32, height: u32 },
    /// Pixel buffer does not hold width * height RGBA texels
    BufferSize { expected: usize, actual: usize },
}

impl std::fmt::Display for BackgroundError {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackgroundError::EmptyDimensions { width, height } => {
                write!(formatter, "Background has empty dimensions {}x{}", width, height)
            }
            BackgroundError::BufferSize { expected, actual } => {
                write!(
                    formatter,
                    "Background buffer holds {} bytes, expected {}",
                    actual, expected
                )
            }
        }
    }
}

impl std::error::Error for BackgroundError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn gray(level: u8) -> Background {
        Background::solid(4, 4, [level, level, level, 255]).unwrap()
    }

    #[test]
    fn test_rejects_bad_buffers() {
        assert_eq!(
            Background::from_rgba(0, 4, vec![]),
            Err(BackgroundError::EmptyDimensions { width: 0, height: 4 })
        );
        assert_eq!(
            Background::from_rgba(2, 2, vec![0; 15]),
            Err(BackgroundError::BufferSize { expected: 16, actual: 15 })
        );
    }

    #[test]
    fn test_bilinear_sample_blends_neighbors() {
        let bg = Background::from_rgba(2, 1, vec![0, 0, 0, 255, 200, 100, 50, 255]).unwrap();
        let mid = bg.sample(0.5, 0.5);
        assert_eq!(mid, [100.0, 50.0, 25.0]);
        // Clamp to edge
        assert_eq!(bg.sample(-3.0, 0.5), [0.0, 0.0, 0.0]);
        assert_eq!(bg.sample(7.0, 9.0), [200.0, 100.0, 50.0]);
        assert_eq!(bg.sample(f32::NAN, 0.5), [0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_slot_starts_not_ready() {
        let slot = BackgroundSlot::new();
        assert!(!slot.is_ready());
        assert!(slot.current().is_none());
        assert_eq!(slot.generation(), 0);
    }

    #[test]
    fn test_slot_swaps_on_fulfill() {
        let mut slot = BackgroundSlot::new();
        let generation = slot.request();
        assert!(slot.is_pending());
        assert!(slot.fulfill(generation, gray(10)));
        assert!(slot.is_ready());
        assert!(!slot.is_pending());
        assert_eq!(slot.generation(), generation);
    }

    #[test]
    fn test_stale_load_is_discarded() {
        let mut slot = BackgroundSlot::new();
        let first = slot.request();
        let second = slot.request();

        // Newer load lands first, then the old one straggles in
        assert!(slot.fulfill(second, gray(200)));
        assert!(!slot.fulfill(first, gray(10)));
        assert_eq!(slot.current().unwrap().pixels()[0], 200);
    }

    #[test]
    fn test_previous_background_kept_while_loading() {
        let mut slot = BackgroundSlot::new();
        let g = slot.request();
        slot.fulfill(g, gray(50));
        let _next = slot.request();
        assert!(slot.is_pending());
        assert_eq!(slot.current().unwrap().pixels()[0], 50);
    }

    #[test]
    fn test_duplicate_fulfill_ignored() {
        let mut slot = BackgroundSlot::new();
        let g = slot.request();
        assert!(slot.fulfill(g, gray(1)));
        assert!(!slot.fulfill(g, gray(2)));
        assert_eq!(slot.current().unwrap().pixels()[0], 1);
    }
}
