use wasm_bindgen::prelude::*;

// ============================================================================
// GLASS RAIN - Droplets on a window pane, refracting the scene behind them
// ============================================================================
//
// Per tick: sim (droplets, trail marks) -> residue decay -> rasterize
// optical map -> composite over the background. The browser host owns the
// canvas, timing and image loading; this crate owns everything in between.

pub mod config;
pub mod engine;
pub mod render;
pub mod scene;
pub mod sim;
pub mod world;

pub use config::{ConfigError, SimulationConfig};
pub use engine::{MAX_DT, RainEngine};
pub use scene::{Background, BackgroundError, Viewport};

#[wasm_bindgen]
pub struct RainGlass {
    engine: RainEngine,
}

#[wasm_bindgen]
impl RainGlass {
    #[wasm_bindgen(constructor)]
    pub fn new(width: u32, height: u32, pixel_ratio: f32, seed: u32) -> Self {
        Self {
            engine: RainEngine::new(
                Viewport::new(width, height, pixel_ratio),
                SimulationConfig::default(),
                seed as u64,
            ),
        }
    }

    /// Replace the config from a JSON document; applied on the next tick.
    pub fn set_config(&mut self, json: &str) -> Result<(), JsValue> {
        let config = SimulationConfig::from_json(json).map_err(to_js)?;
        self.engine.set_config(config);
        Ok(())
    }

    pub fn resize(&mut self, width: u32, height: u32, pixel_ratio: f32) {
        self.engine.resize(Viewport::new(width, height, pixel_ratio));
    }

    /// Start loading a new background; returns the generation to hand back.
    pub fn begin_background(&mut self) -> u32 {
        self.engine.request_background() as u32
    }

    /// Install loaded RGBA pixels. Returns false for a stale generation.
    pub fn finish_background(
        &mut self,
        generation: u32,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) -> Result<bool, JsValue> {
        let background = Background::from_rgba(width, height, pixels.to_vec()).map_err(to_js)?;
        Ok(self.engine.fulfill_background(generation as u64, background))
    }

    /// Advance one frame; `now_ms` is the requestAnimationFrame timestamp.
    pub fn tick(&mut self, now_ms: f64) {
        self.engine.tick(now_ms / 1000.0);
    }

    pub fn background_ready(&self) -> bool {
        self.engine.background_ready()
    }

    // Event and population counts for host-side effects
    pub fn trail_count(&self) -> u32 { self.engine.events().trails.len() as u32 }
    pub fn merge_count(&self) -> u32 { self.engine.events().merges.len() as u32 }
    pub fn droplet_count(&self) -> u32 { self.engine.droplets().len() as u32 }
    pub fn mark_count(&self) -> u32 { self.engine.residue().len() as u32 }

    // Accessors for WASM
    pub fn frame_ptr(&self) -> *const u8 { self.engine.frame().ptr() }
    pub fn frame_len(&self) -> usize { self.engine.frame().len() }
    pub fn width(&self) -> u32 { self.engine.frame().width() as u32 }
    pub fn height(&self) -> u32 { self.engine.frame().height() as u32 }

    /// Optical map as RGBA8 (refractionX, refractionY, specular, mask).
    pub fn optical_map(&self) -> Vec<u8> {
        self.engine.optical_map().to_rgba8()
    }
}

fn to_js<E: std::fmt::Display>(e: E) -> JsValue {
    js_sys::Error::new(&e.to_string()).into()
}
