// droplet.rs - Falling droplets on the glass
//
// Semi-implicit Euler: velocity first, then position with the new velocity.
// Dead droplets stay in the list until `purge` compacts it at the end of the
// step, so indices never shift under an iterating loop.

use super::{Area, TrailEvent, uniform};
use crate::config::{MIN_TRAIL_DISTANCE, SimulationConfig, SizeBucket};
use crate::world::{apply_wind, wind_sensitivity};
use rand::Rng;
use rand::rngs::SmallRng;
use std::f32::consts::TAU;

/// Most trail marks one droplet may leave in a single step. Distance owed
/// past this is dropped, not carried.
pub const MAX_TRAILS_PER_STEP: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Droplet {
    // Position (physical px); drawn x also includes wobble
    pub x: f32,
    pub y: f32,
    pub radius: f32,

    pub vx: f32,
    pub vy: f32,

    /// Size scale relative to the base radius
    pub mass: f32,
    /// Size-derived wind sensitivity, proportional to 1/radius
    pub sensitivity: f32,

    // Wobble, fixed at creation
    pub wobble_amp: f32,
    pub wobble_freq: f32,
    pub wobble_phase: f32,

    // Trail bookkeeping
    pub traveled: f32,
    /// Distance until the next mark; 0 means "sample on next step"
    pub next_trail: f32,

    pub alive: bool,
}

impl Droplet {
    /// A droplet at rest with unit mass and no wobble.
    pub fn new(x: f32, y: f32, radius: f32) -> Self {
        Self {
            x,
            y,
            radius,
            vx: 0.0,
            vy: 0.0,
            mass: 1.0,
            sensitivity: wind_sensitivity(radius),
            wobble_amp: 0.0,
            wobble_freq: 0.0,
            wobble_phase: 0.0,
            traveled: 0.0,
            next_trail: 0.0,
            alive: true,
        }
    }

    /// Where the droplet is drawn: physical position plus wobble.
    #[inline]
    pub fn position(&self) -> (f32, f32) {
        let wobble = self.wobble_amp * (self.y * self.wobble_freq + self.wobble_phase).sin();
        (self.x + wobble, self.y)
    }

    /// Heading in radians, 0 = straight down, positive toward +x.
    #[inline]
    pub fn heading(&self) -> f32 {
        if self.vx == 0.0 && self.vy == 0.0 { return 0.0; }
        self.vx.atan2(self.vy)
    }

    #[inline]
    pub fn speed(&self) -> f32 {
        self.vx.hypot(self.vy)
    }

    /// Change radius, keeping mass and wind sensitivity consistent.
    pub fn set_radius(&mut self, radius: f32) {
        if self.radius > 0.0 {
            self.mass *= radius / self.radius;
        }
        self.radius = radius;
        self.sensitivity = wind_sensitivity(radius);
    }
}

/// Gravity multiplier by size: larger droplets fall faster.
#[inline]
pub fn drag_factor(mass: f32) -> f32 {
    mass * 0.8 + 0.2
}

/// Live droplet list.
#[derive(Debug, Clone, Default)]
pub struct Droplets {
    list: Vec<Droplet>,
}

impl Droplets {
    pub fn new() -> Self {
        Self { list: Vec::new() }
    }

    pub fn clear(&mut self) {
        self.list.clear();
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn as_slice(&self) -> &[Droplet] {
        &self.list
    }

    pub fn as_mut_slice(&mut self) -> &mut [Droplet] {
        &mut self.list
    }

    pub fn iter(&self) -> impl Iterator<Item = &Droplet> {
        self.list.iter()
    }

    /// Add a droplet unless `limit` is reached; new work is dropped, not queued.
    pub fn insert(&mut self, drop: Droplet, limit: usize) -> bool {
        if self.list.len() >= limit { return false; }
        self.list.push(drop);
        true
    }

    /// Drop the newest droplets until at most `limit` remain. Returns how
    /// many were removed.
    pub fn shrink_to(&mut self, limit: usize) -> usize {
        let excess = self.list.len().saturating_sub(limit);
        self.list.truncate(limit);
        excess
    }

    /// Spawn one droplet above the visible area.
    pub fn spawn(&mut self, area: Area, config: &SimulationConfig, rng: &mut SmallRng) -> bool {
        if self.list.len() >= config.max_active_droplets { return false; }

        let bucket = pick_bucket(&config.size_buckets, config.total_bucket_weight(), rng);
        let s = area.scale;
        let radius = config.base_radius * bucket.scale * s;

        let jitter = (rng.gen_range(0.0f32..1.0) - 0.5) * 2.0 * config.spawn_jitter * s;
        let x = uniform(rng, 0.0, area.width) + jitter;
        let y = -(radius * 2.0 + uniform(rng, 0.0, config.spawn_band * s));

        let mut drop = Droplet::new(x, y, radius);
        drop.mass = bucket.scale;
        drop.vy = uniform(rng, config.initial_speed[0], config.initial_speed[1]) * bucket.scale;
        drop.wobble_amp = config.wobble_amplitude * s;
        drop.wobble_freq = uniform(rng, config.wobble_frequency[0], config.wobble_frequency[1]) / s;
        drop.wobble_phase = uniform(rng, 0.0, TAU);
        drop.next_trail = sample_trail_distance(config, s, rng);

        self.list.push(drop);
        true
    }

    /// Integrate physics, emit trail events, flag exits and underflows.
    pub fn integrate(
        &mut self,
        dt: f32,
        wind: f32,
        area: Area,
        config: &SimulationConfig,
        rng: &mut SmallRng,
        trails: &mut Vec<TrailEvent>,
    ) {
        let s = area.scale;
        let bottom = area.height + config.exit_margin * s;
        let min_radius = config.min_radius * s;

        for d in self.list.iter_mut().filter(|d| d.alive) {
            let accel = config.gravity * drag_factor(d.mass) - config.drag_coefficient * d.vy * d.vy.abs();
            d.vy += accel * dt;
            d.vx = apply_wind(d.vx, wind, d.sensitivity, config.wind.friction, dt);

            let (px, py) = d.position();
            d.x += d.vx * dt;
            d.y += d.vy * dt;
            if !(d.x.is_finite() && d.y.is_finite() && d.vx.is_finite() && d.vy.is_finite()) {
                d.alive = false;
                continue;
            }
            let (nx, ny) = d.position();

            let step = (nx - px).hypot(ny - py);
            d.traveled += step;
            if d.next_trail <= 0.0 {
                d.next_trail = sample_trail_distance(config, s, rng);
            }

            // Distance-triggered; a long step may owe several marks
            let mut budget = MAX_TRAILS_PER_STEP;
            while d.alive && d.traveled >= d.next_trail {
                if budget == 0 {
                    d.traveled = 0.0;
                    break;
                }
                budget -= 1;
                d.traveled -= d.next_trail;
                let back = if step > 0.0 { (d.traveled / step).min(1.0) } else { 0.0 };
                let fraction = uniform(rng, config.trail_radius_fraction[0], config.trail_radius_fraction[1]);
                trails.push(TrailEvent {
                    x: nx - (nx - px) * back,
                    y: ny - (ny - py) * back,
                    radius: d.radius * fraction,
                    angle: d.heading(),
                });
                d.next_trail = sample_trail_distance(config, s, rng);

                if config.trail_shrink > 0.0 {
                    d.set_radius(d.radius * (1.0 - config.trail_shrink));
                    if d.radius < min_radius {
                        // Last of the water stays on the glass
                        trails.push(TrailEvent { x: nx, y: ny, radius: d.radius, angle: d.heading() });
                        d.alive = false;
                    }
                }
            }

            if d.y > bottom {
                d.alive = false;
            }
        }
    }

    /// Remove dead droplets. Order of survivors is preserved.
    pub fn purge(&mut self) {
        let mut write = 0;

        for read in 0..self.list.len() {
            if !self.list[read].alive { continue; }
            self.list[write] = self.list[read];
            write += 1;
        }

        self.list.truncate(write);
    }
}

fn sample_trail_distance(config: &SimulationConfig, scale: f32, rng: &mut SmallRng) -> f32 {
    let [lo, hi] = config.trail_distance_range;
    (uniform(rng, lo, hi) * scale).max(MIN_TRAIL_DISTANCE)
}

fn pick_bucket(buckets: &[SizeBucket], total: f32, rng: &mut SmallRng) -> SizeBucket {
    let fallback = SizeBucket { weight: 1.0, scale: 1.0 };
    let Some(last) = buckets.last() else { return fallback; };
    if !(total > 0.0) { return *last; }

    let mut roll = uniform(rng, 0.0, total);
    for b in buckets {
        if roll < b.weight { return *b; }
        roll -= b.weight;
    }
    *last
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn still() -> SimulationConfig {
        let mut config = SimulationConfig::default();
        config.gravity = 0.0;
        config.drag_coefficient = 0.0;
        config.wind.base_strength = 0.0;
        config.wobble_amplitude = 0.0;
        config.trail_shrink = 0.0;
        config
    }

    #[test]
    fn test_drag_factor_grows_with_mass() {
        assert!(drag_factor(1.5) > drag_factor(1.0));
        assert!(drag_factor(1.0) > drag_factor(0.5));
        assert_eq!(drag_factor(1.0), 1.0);
    }

    #[test]
    fn test_bucket_distribution_follows_weights() {
        let buckets = SimulationConfig::default().size_buckets;
        let total: f32 = buckets.iter().map(|b| b.weight).sum();
        let mut rng = SmallRng::seed_from_u64(11);
        let mut large = 0;
        for _ in 0..10_000 {
            if pick_bucket(&buckets, total, &mut rng).scale > 1.2 { large += 1; }
        }
        // 15% expected
        assert!(large > 1200 && large < 1800, "large bucket picked {} times", large);
    }

    #[test]
    fn test_trail_marks_never_exceed_droplet_radius() {
        let mut config = still();
        config.trail_radius_fraction = [0.2, 1.0];
        config.trail_shrink = 0.05;
        let mut rng = SmallRng::seed_from_u64(2);
        let mut drops = Droplets::new();
        let mut d = Droplet::new(0.0, 0.0, 12.0);
        d.vy = 900.0;
        drops.insert(d, 1);

        let mut trails = Vec::new();
        for _ in 0..20 {
            let before = drops.as_slice().first().map(|d| d.radius).unwrap_or(0.0);
            trails.clear();
            drops.integrate(0.016, 0.0, Area::new(100.0, 1e6, 1.0), &config, &mut rng, &mut trails);
            for t in &trails {
                assert!(t.radius <= before + 1e-5);
            }
            drops.purge();
        }
    }

    #[test]
    fn test_shrinking_droplet_terminates_with_final_mark() {
        let mut config = still();
        config.trail_distance_range = [1.0, 1.0];
        config.trail_shrink = 0.5;
        config.min_radius = 1.0;
        let mut rng = SmallRng::seed_from_u64(4);
        let mut drops = Droplets::new();
        let mut d = Droplet::new(0.0, 0.0, 4.0);
        d.vy = 100.0;
        drops.insert(d, 1);

        let mut trails = Vec::new();
        drops.integrate(0.1, 0.0, Area::new(100.0, 1e6, 1.0), &config, &mut rng, &mut trails);
        // 4 -> 2 -> 1 -> 0.5 (< 1, dead); three regular marks plus the last one
        assert_eq!(trails.len(), 4);
        assert!((trails[3].radius - 0.5).abs() < 1e-6);
        drops.purge();
        assert!(drops.is_empty());
    }

    #[test]
    fn test_trail_marks_per_step_are_capped() {
        let mut config = still();
        config.gravity = 1e9;
        config.trail_distance_range = [1.0, 1.0];
        let mut rng = SmallRng::seed_from_u64(8);
        let mut drops = Droplets::new();
        drops.insert(Droplet::new(0.0, 0.0, 10.0), 1);

        let mut trails = Vec::new();
        drops.integrate(0.033, 0.0, Area::new(100.0, 1e12, 1.0), &config, &mut rng, &mut trails);
        assert_eq!(trails.len(), MAX_TRAILS_PER_STEP);
        // Nothing owed carries into the next step
        assert_eq!(drops.as_slice()[0].traveled, 0.0);
    }

    #[test]
    fn test_non_finite_droplet_terminates() {
        let config = still();
        let mut rng = SmallRng::seed_from_u64(9);
        let mut drops = Droplets::new();
        let mut d = Droplet::new(0.0, 0.0, 10.0);
        d.vy = f32::INFINITY;
        drops.insert(d, 1);

        let mut trails = Vec::new();
        drops.integrate(0.016, 0.0, Area::new(100.0, 1e6, 1.0), &config, &mut rng, &mut trails);
        assert!(trails.is_empty());
        drops.purge();
        assert!(drops.is_empty());
    }

    #[test]
    fn test_purge_keeps_order() {
        let mut drops = Droplets::new();
        for i in 0..6 {
            let mut d = Droplet::new(i as f32, 0.0, 2.0);
            d.alive = i % 2 == 0;
            drops.insert(d, 16);
        }
        drops.purge();
        let xs: Vec<f32> = drops.iter().map(|d| d.x).collect();
        assert_eq!(xs, vec![0.0, 2.0, 4.0]);
    }

    #[test]
    fn test_wobble_is_per_droplet() {
        let config = SimulationConfig::default();
        let mut rng = SmallRng::seed_from_u64(21);
        let mut drops = Droplets::new();
        for _ in 0..4 {
            drops.spawn(Area::new(500.0, 500.0, 1.0), &config, &mut rng);
        }
        let phases: Vec<f32> = drops.iter().map(|d| d.wobble_phase).collect();
        for i in 0..phases.len() {
            for j in (i + 1)..phases.len() {
                assert_ne!(phases[i], phases[j]);
            }
        }
    }
}
