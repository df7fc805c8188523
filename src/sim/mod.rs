// sim/ - Rain-on-glass simulation
//
// Droplets fall under gravity and wind, shed residue marks every few pixels
// of travel, and optionally coalesce. One `Simulator::step` per tick.

mod droplet;
mod merge;
mod residue;

pub use droplet::{Droplet, Droplets, MAX_TRAILS_PER_STEP, drag_factor};
pub use merge::coalesce;
pub use residue::{RESIDUE_EPSILON, Residue, ResidueMark};

use crate::config::SimulationConfig;
use crate::world::wind_force;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Spawn probabilities are quoted per tick of this length (60 Hz).
pub const REFERENCE_TICK: f32 = 1.0 / 60.0;

/// Simulation bounds in physical pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Area {
    pub width: f32,
    pub height: f32,
    /// Pixel ratio; configured lengths are multiplied by this
    pub scale: f32,
}

impl Area {
    pub fn new(width: f32, height: f32, scale: f32) -> Self {
        Self { width, height, scale }
    }
}

/// A droplet traveled far enough (or died) and leaves a mark behind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrailEvent {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    /// Heading of the droplet at deposit time (radians, 0 = straight down)
    pub angle: f32,
}

/// Two droplets coalesced; position and radius of the survivor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MergeEvent {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
}

/// Everything a step produced, for residue deposit and the scene host.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepEvents {
    pub trails: Vec<TrailEvent>,
    pub merges: Vec<MergeEvent>,
}

/// Drives droplet physics. Owns the spawn RNG and the wind clock.
pub struct Simulator {
    rng: SmallRng,
    elapsed: f32,
}

impl Simulator {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
            elapsed: 0.0,
        }
    }

    /// Seconds of simulated time so far.
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Advance every droplet by `dt` seconds.
    ///
    /// Order: spawn, integrate (trail events, exits), merge, purge. Dead
    /// droplets are removed before this returns, so no caller ever sees one.
    pub fn step(
        &mut self,
        drops: &mut Droplets,
        dt: f32,
        area: Area,
        config: &SimulationConfig,
    ) -> StepEvents {
        let mut events = StepEvents::default();
        if !(dt > 0.0) {
            return events;
        }
        self.elapsed += dt;

        if self.rng.gen_range(0.0f32..1.0) < spawn_chance(config.spawn_probability_per_tick, dt) {
            drops.spawn(area, config, &mut self.rng);
        }

        let force = wind_force(&config.wind, self.elapsed);
        drops.integrate(dt, force, area, config, &mut self.rng, &mut events.trails);

        if config.merge.enabled {
            coalesce(drops.as_mut_slice(), config.merge.distance_factor, &mut events.merges);
        }

        drops.purge();
        events
    }
}

/// Probability of a spawn during a tick of `dt` seconds, given the chance
/// per reference tick. Two half-length ticks spawn as often as one full one.
#[inline]
pub fn spawn_chance(per_tick: f32, dt: f32) -> f32 {
    let p = per_tick.clamp(0.0, 1.0);
    1.0 - (1.0 - p).powf(dt.max(0.0) / REFERENCE_TICK)
}

/// Uniform sample in `[lo, hi)`; degenerate ranges return `lo`.
#[inline]
pub(crate) fn uniform(rng: &mut SmallRng, lo: f32, hi: f32) -> f32 {
    if hi > lo { rng.gen_range(lo..hi) } else { lo }
}
