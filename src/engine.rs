// engine.rs - One tick = simulate, decay, rasterize, composite
//
// Single-threaded and run-to-completion: each stage has one writer that
// finishes before the next stage reads. Resize and config changes are
// queued and applied at the start of the next tick, never mid-tick.

use crate::config::SimulationConfig;
use crate::render::{OpticalMap, Rasterizer};
use crate::scene::{Background, BackgroundSlot, Compositor, Frame, Optics, Viewport};
use crate::sim::{Droplet, Droplets, Residue, Simulator, StepEvents};

/// Longest step the physics will take (s). Stalled hosts (background tabs,
/// slow devices) get a short step instead of a blow-up.
pub const MAX_DT: f32 = 0.033;

/// Clamp a raw host delta to `[0, MAX_DT]`; garbage becomes 0.
#[inline]
pub fn clamp_dt(dt: f32) -> f32 {
    if !dt.is_finite() || dt < 0.0 { return 0.0; }
    dt.min(MAX_DT)
}

pub struct RainEngine {
    config: SimulationConfig,
    pending_config: Option<SimulationConfig>,
    viewport: Viewport,
    pending_viewport: Option<Viewport>,

    sim: Simulator,
    drops: Droplets,
    residue: Residue,
    rasterizer: Rasterizer,
    compositor: Compositor,
    background: BackgroundSlot,

    events: StepEvents,
    last_time: Option<f64>,
    ticks: u64,
}

impl RainEngine {
    pub fn new(viewport: Viewport, config: SimulationConfig, seed: u64) -> Self {
        let (w, h) = (viewport.physical_width(), viewport.physical_height());
        log::info!(
            "rain engine {}x{} (ratio {}), seed {}",
            w,
            h,
            viewport.pixel_ratio,
            seed
        );
        Self {
            config: install(config),
            pending_config: None,
            viewport,
            pending_viewport: None,
            sim: Simulator::new(seed),
            drops: Droplets::new(),
            residue: Residue::new(),
            rasterizer: Rasterizer::new(w, h),
            compositor: Compositor::new(w, h),
            background: BackgroundSlot::new(),
            events: StepEvents::default(),
            last_time: None,
            ticks: 0,
        }
    }

    /// Queue a whole-config swap for the next tick.
    pub fn set_config(&mut self, config: SimulationConfig) {
        self.pending_config = Some(config);
    }

    /// Queue a viewport change for the next tick. In-flight droplets keep
    /// their coordinates; only the buffers change size.
    pub fn resize(&mut self, viewport: Viewport) {
        self.pending_viewport = Some(viewport);
    }

    /// Begin a background swap; pass the returned generation to
    /// [`fulfill_background`](Self::fulfill_background) once loaded.
    pub fn request_background(&mut self) -> u64 {
        self.background.request()
    }

    pub fn fulfill_background(&mut self, generation: u64, background: Background) -> bool {
        self.background.fulfill(generation, background)
    }

    /// Seed a droplet directly (host effects, tests). Subject to the same
    /// cap as spawned droplets.
    pub fn insert_droplet(&mut self, drop: Droplet) -> bool {
        self.drops.insert(drop, self.config.max_active_droplets)
    }

    /// Tick driven by a host timestamp in seconds. The first tick has dt 0.
    pub fn tick(&mut self, now: f64) -> &StepEvents {
        let dt = match self.last_time {
            Some(last) => (now - last) as f32,
            None => 0.0,
        };
        self.last_time = Some(now);
        self.advance(dt)
    }

    /// Tick with an explicit delta (seconds), clamped to `MAX_DT`.
    pub fn advance(&mut self, dt: f32) -> &StepEvents {
        let dt = clamp_dt(dt);
        self.apply_pending();

        self.events = self.sim.step(&mut self.drops, dt, self.viewport.area(), &self.config);

        self.residue.update(dt, self.config.residue_fade_rate);
        self.residue.deposit(&self.events.trails, self.config.max_residue_marks);

        self.rasterizer.rasterize(&self.drops, &self.residue, dt, &self.config.fog_mode);

        let optics = Optics::from_config(&self.config);
        self.compositor.composite(self.rasterizer.map(), self.background.current(), &optics);

        self.ticks += 1;
        &self.events
    }

    fn apply_pending(&mut self) {
        if let Some(config) = self.pending_config.take() {
            self.config = install(config);
            log::info!("config applied at tick {}", self.ticks);

            // A lower cap takes effect immediately, not as droplets drain
            let drops = self.drops.shrink_to(self.config.max_active_droplets);
            let marks = self.residue.shrink_to(self.config.max_residue_marks);
            if drops + marks > 0 {
                log::info!("trimmed {} droplets and {} marks to new caps", drops, marks);
            }
        }
        if let Some(viewport) = self.pending_viewport.take() {
            let (w, h) = (viewport.physical_width(), viewport.physical_height());
            self.rasterizer.resize(w, h);
            self.compositor.resize(w, h);
            self.viewport = viewport;
            log::info!("resized to {}x{} (ratio {})", w, h, viewport.pixel_ratio);
        }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn droplets(&self) -> &Droplets {
        &self.drops
    }

    pub fn residue(&self) -> &Residue {
        &self.residue
    }

    pub fn optical_map(&self) -> &OpticalMap {
        self.rasterizer.map()
    }

    pub fn frame(&self) -> &Frame {
        self.compositor.frame()
    }

    pub fn events(&self) -> &StepEvents {
        &self.events
    }

    pub fn background_ready(&self) -> bool {
        self.background.is_ready()
    }

    pub fn background_generation(&self) -> u64 {
        self.background.generation()
    }

    pub fn elapsed(&self) -> f32 {
        self.sim.elapsed()
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}

/// Sanitize a config and report each correction once.
fn install(config: SimulationConfig) -> SimulationConfig {
    let (clean, clamped) = config.sanitized();
    for c in &clamped {
        log::warn!("config {} out of range ({}), using {}", c.field, c.from, c.to);
    }
    clean
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> RainEngine {
        RainEngine::new(Viewport::new(64, 48, 1.0), SimulationConfig::default(), 42)
    }

    #[test]
    fn test_clamp_dt() {
        assert_eq!(clamp_dt(0.016), 0.016);
        assert_eq!(clamp_dt(5.0), MAX_DT);
        assert_eq!(clamp_dt(-1.0), 0.0);
        assert_eq!(clamp_dt(f32::NAN), 0.0);
    }

    #[test]
    fn test_first_tick_has_zero_dt() {
        let mut e = engine();
        e.tick(1000.0);
        assert_eq!(e.elapsed(), 0.0);
        e.tick(1000.010);
        assert!((e.elapsed() - 0.010).abs() < 1e-4);
        // Stalled host
        e.tick(1060.0);
        assert!((e.elapsed() - 0.010 - MAX_DT).abs() < 1e-4);
    }

    #[test]
    fn test_resize_applies_next_tick() {
        let mut e = engine();
        e.resize(Viewport::new(32, 16, 2.0));
        assert_eq!(e.frame().width(), 64);

        e.advance(0.016);
        assert_eq!(e.frame().width(), 64);
        assert_eq!(e.frame().height(), 32);
        assert_eq!(e.optical_map().height(), 32);
    }

    #[test]
    fn test_resize_keeps_droplet_coordinates() {
        let mut e = engine();
        e.insert_droplet(Droplet::new(30.0, 10.0, 4.0));
        e.resize(Viewport::new(640, 480, 1.0));
        e.advance(0.0);
        assert_eq!(e.droplets().as_slice()[0].x, 30.0);
    }

    #[test]
    fn test_config_swap_is_sanitized() {
        let mut e = engine();
        let mut bad = SimulationConfig::default();
        bad.trail_distance_range = [0.0, 0.0];
        bad.base_radius = -1.0;
        e.set_config(bad);
        assert_eq!(e.config().base_radius, 22.0);

        e.advance(0.016);
        assert_eq!(e.config().base_radius, 1.0);
        assert!(e.config().trail_distance_range[0] >= crate::config::MIN_TRAIL_DISTANCE);
    }

    #[test]
    fn test_lower_cap_trims_live_droplets() {
        let mut e = engine();
        for i in 0..8 {
            e.insert_droplet(Droplet::new(i as f32 * 5.0, 10.0, 2.0));
        }
        let mut config = SimulationConfig::default();
        config.max_active_droplets = 3;
        config.spawn_probability_per_tick = 0.0;
        e.set_config(config);
        e.advance(0.0);

        assert_eq!(e.droplets().len(), 3);
        assert_eq!(e.config().max_residue_marks, 3);
    }

    #[test]
    fn test_marks_bounded_by_droplet_cap() {
        let mut config = SimulationConfig::default();
        config.max_active_droplets = 5;
        config.spawn_probability_per_tick = 1.0;
        let mut e = RainEngine::new(Viewport::new(200, 150, 1.0), config, 3);

        for i in 0..600 {
            e.tick(i as f64 / 60.0);
            assert!(e.droplets().len() <= 5);
            assert!(e.residue().len() <= 5, "{} marks at tick {}", e.residue().len(), i);
        }
    }

    #[test]
    fn test_insert_respects_cap() {
        let mut config = SimulationConfig::default();
        config.max_active_droplets = 2;
        let mut e = RainEngine::new(Viewport::new(10, 10, 1.0), config, 1);
        assert!(e.insert_droplet(Droplet::new(1.0, 1.0, 2.0)));
        assert!(e.insert_droplet(Droplet::new(2.0, 1.0, 2.0)));
        assert!(!e.insert_droplet(Droplet::new(3.0, 1.0, 2.0)));
    }
}
