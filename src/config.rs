//! Simulation parameters for the rain-on-glass engine.
//!
//! A `SimulationConfig` is immutable for the duration of a tick; the engine
//! swaps it as a whole between ticks. Every value that feeds geometry goes
//! through [`SimulationConfig::sanitized`] first so that a bad document can
//! never push NaN or negative radii into the rasterizer.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Smallest distance a droplet must travel between two trail marks (px).
pub const MIN_TRAIL_DISTANCE: f32 = 1.0;

/// Upper bound on `max_active_droplets`; keeps the pairwise merge check sane.
pub const DROPLET_LIMIT: usize = 4096;

/// Upper bound on `gravity` (px/s^2).
pub const MAX_GRAVITY: f32 = 1e5;

/// Upper bound on the magnitude of `wind.base_strength`.
pub const MAX_WIND_STRENGTH: f32 = 1e5;

/// One entry of the weighted droplet size distribution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SizeBucket {
    /// Relative probability of this bucket
    pub weight: f32,
    /// Multiplier applied to the base radius
    pub scale: f32,
}

/// Wind forcing: a sum of sinusoids of elapsed time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WindConfig {
    /// Peak horizontal acceleration before per-droplet sensitivity (px/s^2)
    pub base_strength: f32,
    /// Component frequencies in Hz
    pub frequencies: Vec<f32>,
    /// Exponential decay rate of horizontal velocity (1/s)
    pub friction: f32,
    /// Numerator of the per-droplet sensitivity, which is `sensitivity / radius`
    pub sensitivity: f32,
}

impl Default for WindConfig {
    fn default() -> Self {
        Self {
            base_strength: 40.0,
            frequencies: vec![0.13, 0.31, 0.77],
            friction: 1.5,
            sensitivity: 8.0,
        }
    }
}

/// Droplet coalescence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MergeConfig {
    pub enabled: bool,
    /// Two droplets merge when their centers are closer than
    /// `distance_factor * (r1 + r2)`
    pub distance_factor: f32,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            distance_factor: 0.8,
        }
    }
}

/// Persistent condensation layer that droplets wipe clear.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FogMode {
    pub enabled: bool,
    /// RGB the glass fogs toward
    pub tint_color: [u8; 3],
    /// Strength of the fog blend where no droplet is visible (0..1)
    pub intensity: f32,
    /// Rate at which wiped streaks fog over again (1/s)
    pub refog_rate: f32,
}

impl Default for FogMode {
    fn default() -> Self {
        Self {
            enabled: false,
            tint_color: [196, 204, 214],
            intensity: 0.35,
            refog_rate: 0.4,
        }
    }
}

/// Complete simulation configuration.
///
/// Lengths are in CSS pixels and get multiplied by the viewport pixel ratio
/// by the simulator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SimulationConfig {
    /// Downward acceleration (px/s^2)
    pub gravity: f32,
    /// Quadratic drag `k` in `a = g * f(size) - k * v^2`
    pub drag_coefficient: f32,
    pub wind: WindConfig,

    /// Distance traveled between trail marks, resampled after every mark
    pub trail_distance_range: [f32; 2],
    /// Trail mark radius as a fraction of the droplet radius
    pub trail_radius_fraction: [f32; 2],
    /// Fraction of radius a droplet loses per trail mark
    pub trail_shrink: f32,

    /// Spawn chance per 60 Hz reference tick; normalized by dt
    pub spawn_probability_per_tick: f32,
    pub size_buckets: Vec<SizeBucket>,
    pub base_radius: f32,
    /// Droplets below this radius terminate
    pub min_radius: f32,
    /// Initial fall speed range before the size scale is applied (px/s)
    pub initial_speed: [f32; 2],
    pub spawn_jitter: f32,
    pub spawn_band: f32,
    pub exit_margin: f32,
    pub wobble_amplitude: f32,
    /// Wobble spatial frequency range (radians per px of fall)
    pub wobble_frequency: [f32; 2],

    pub refraction_strength: f32,
    pub alpha_multiplier: f32,
    pub alpha_subtract_threshold: f32,
    pub highlight_gain: f32,
    /// Scale refraction by specular so lensing peaks at droplet centers
    pub lens_by_specular: bool,

    /// Residue radius lost per second (px/s)
    pub residue_fade_rate: f32,
    /// Bound on live droplets and, together with `max_residue_marks`, on
    /// live residue marks
    pub max_active_droplets: usize,
    /// Residue ceiling; never above `max_active_droplets`
    pub max_residue_marks: usize,

    pub merge: MergeConfig,
    pub fog_mode: FogMode,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            gravity: 2800.0,
            drag_coefficient: 1e-4,
            wind: WindConfig::default(),
            trail_distance_range: [10.0, 40.0],
            trail_radius_fraction: [0.35, 0.45],
            trail_shrink: 0.02,
            spawn_probability_per_tick: 0.18,
            size_buckets: default_size_buckets(),
            base_radius: 22.0,
            min_radius: 1.0,
            initial_speed: [150.0, 550.0],
            spawn_jitter: 100.0,
            spawn_band: 800.0,
            exit_margin: 200.0,
            wobble_amplitude: 3.0,
            wobble_frequency: [0.02, 0.04],
            refraction_strength: 0.65,
            alpha_multiplier: 55.0,
            alpha_subtract_threshold: 0.002,
            highlight_gain: 0.4,
            lens_by_specular: false,
            residue_fade_rate: 3.2,
            max_active_droplets: 1024,
            max_residue_marks: 1024,
            merge: MergeConfig::default(),
            fog_mode: FogMode::default(),
        }
    }
}

fn default_size_buckets() -> Vec<SizeBucket> {
    vec![
        SizeBucket { weight: 0.45, scale: 0.5 },
        SizeBucket { weight: 0.40, scale: 1.0 },
        SizeBucket { weight: 0.15, scale: 1.5 },
    ]
}

/// A field that [`SimulationConfig::sanitized`] had to correct.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Clamped {
    pub field: &'static str,
    pub from: f32,
    pub to: f32,
}

impl SimulationConfig {
    /// Parse a (possibly partial) JSON document; missing fields take defaults.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(text).map_err(|error| ConfigError::Parse { error })
    }

    /// Load configuration from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path.as_ref()).map_err(|error| ConfigError::Io {
            path: path.as_ref().to_path_buf(),
            error,
        })?;
        Self::from_json(&contents)
    }

    /// Save configuration to a JSON file.
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let contents =
            serde_json::to_string_pretty(self).map_err(|error| ConfigError::Serialize { error })?;
        fs::write(path.as_ref(), contents).map_err(|error| ConfigError::Io {
            path: path.as_ref().to_path_buf(),
            error,
        })
    }

    /// Copy of this config with every out-of-range value clamped to a safe
    /// minimum, plus the list of fields that changed.
    pub fn sanitized(&self) -> (Self, Vec<Clamped>) {
        let mut c = self.clone();
        let d = Self::default();
        let mut log = Vec::new();

        within("gravity", &mut c.gravity, 0.0, MAX_GRAVITY, d.gravity, &mut log);
        at_least("dragCoefficient", &mut c.drag_coefficient, 0.0, d.drag_coefficient, &mut log);

        within(
            "wind.baseStrength",
            &mut c.wind.base_strength,
            -MAX_WIND_STRENGTH,
            MAX_WIND_STRENGTH,
            0.0,
            &mut log,
        );
        at_least("wind.friction", &mut c.wind.friction, 0.0, d.wind.friction, &mut log);
        at_least("wind.sensitivity", &mut c.wind.sensitivity, 0.0, d.wind.sensitivity, &mut log);
        let before = c.wind.frequencies.len();
        c.wind.frequencies.retain(|f| f.is_finite() && *f >= 0.0);
        if c.wind.frequencies.len() != before {
            log.push(Clamped {
                field: "wind.frequencies",
                from: before as f32,
                to: c.wind.frequencies.len() as f32,
            });
        }

        range(
            "trailDistanceRange",
            &mut c.trail_distance_range,
            MIN_TRAIL_DISTANCE,
            f32::MAX,
            d.trail_distance_range,
            &mut log,
        );
        range(
            "trailRadiusFraction",
            &mut c.trail_radius_fraction,
            0.01,
            1.0,
            d.trail_radius_fraction,
            &mut log,
        );
        within("trailShrink", &mut c.trail_shrink, 0.0, 0.5, d.trail_shrink, &mut log);
        within(
            "spawnProbabilityPerTick",
            &mut c.spawn_probability_per_tick,
            0.0,
            1.0,
            d.spawn_probability_per_tick,
            &mut log,
        );

        let before = c.size_buckets.len();
        c.size_buckets.retain(|b| {
            b.weight.is_finite() && b.weight > 0.0 && b.scale.is_finite() && b.scale > 0.0
        });
        if c.size_buckets.len() != before {
            log.push(Clamped {
                field: "sizeBuckets",
                from: before as f32,
                to: c.size_buckets.len() as f32,
            });
        }
        if c.size_buckets.is_empty() {
            c.size_buckets = d.size_buckets.clone();
        }

        at_least("baseRadius", &mut c.base_radius, 1.0, d.base_radius, &mut log);
        within("minRadius", &mut c.min_radius, 0.1, c.base_radius, d.min_radius, &mut log);
        range("initialSpeed", &mut c.initial_speed, 0.0, f32::MAX, d.initial_speed, &mut log);
        at_least("spawnJitter", &mut c.spawn_jitter, 0.0, d.spawn_jitter, &mut log);
        at_least("spawnBand", &mut c.spawn_band, 0.0, d.spawn_band, &mut log);
        at_least("exitMargin", &mut c.exit_margin, 0.0, d.exit_margin, &mut log);
        at_least("wobbleAmplitude", &mut c.wobble_amplitude, 0.0, d.wobble_amplitude, &mut log);
        range(
            "wobbleFrequency",
            &mut c.wobble_frequency,
            0.0,
            f32::MAX,
            d.wobble_frequency,
            &mut log,
        );

        at_least(
            "refractionStrength",
            &mut c.refraction_strength,
            0.0,
            d.refraction_strength,
            &mut log,
        );
        at_least("alphaMultiplier", &mut c.alpha_multiplier, 0.0, d.alpha_multiplier, &mut log);
        within(
            "alphaSubtractThreshold",
            &mut c.alpha_subtract_threshold,
            0.0,
            1.0,
            d.alpha_subtract_threshold,
            &mut log,
        );
        at_least("highlightGain", &mut c.highlight_gain, 0.0, d.highlight_gain, &mut log);
        at_least("residueFadeRate", &mut c.residue_fade_rate, 0.0, d.residue_fade_rate, &mut log);

        if c.max_active_droplets > DROPLET_LIMIT {
            log.push(Clamped {
                field: "maxActiveDroplets",
                from: c.max_active_droplets as f32,
                to: DROPLET_LIMIT as f32,
            });
            c.max_active_droplets = DROPLET_LIMIT;
        }
        if c.max_residue_marks > c.max_active_droplets {
            log.push(Clamped {
                field: "maxResidueMarks",
                from: c.max_residue_marks as f32,
                to: c.max_active_droplets as f32,
            });
            c.max_residue_marks = c.max_active_droplets;
        }

        within(
            "merge.distanceFactor",
            &mut c.merge.distance_factor,
            0.0,
            1.0,
            d.merge.distance_factor,
            &mut log,
        );
        within("fogMode.intensity", &mut c.fog_mode.intensity, 0.0, 1.0, d.fog_mode.intensity, &mut log);
        at_least("fogMode.refogRate", &mut c.fog_mode.refog_rate, 0.0, d.fog_mode.refog_rate, &mut log);

        (c, log)
    }

    /// Size bucket total weight, used to normalize sampling.
    pub fn total_bucket_weight(&self) -> f32 {
        self.size_buckets.iter().map(|b| b.weight).sum()
    }
}

fn at_least(field: &'static str, v: &mut f32, min: f32, fallback: f32, log: &mut Vec<Clamped>) {
    let to = if !v.is_finite() {
        fallback
    } else if *v < min {
        min
    } else {
        return;
    };
    log.push(Clamped { field, from: *v, to });
    *v = to;
}

fn within(field: &'static str, v: &mut f32, min: f32, max: f32, fallback: f32, log: &mut Vec<Clamped>) {
    let to = if !v.is_finite() {
        fallback.clamp(min, max)
    } else if *v < min || *v > max {
        v.clamp(min, max)
    } else {
        return;
    };
    log.push(Clamped { field, from: *v, to });
    *v = to;
}

fn range(
    field: &'static str,
    r: &mut [f32; 2],
    min: f32,
    max: f32,
    fallback: [f32; 2],
    log: &mut Vec<Clamped>,
) {
    within(field, &mut r[0], min, max, fallback[0], log);
    within(field, &mut r[1], min, max, fallback[1], log);
    if r[1] < r[0] {
        log.push(Clamped { field, from: r[1], to: r[0] });
        r[1] = r[0];
    }
}

/// Error types for configuration operations.
#[derive(Debug)]
pub enum ConfigError {
    /// IO error when reading or writing configuration files
    Io {
        path: std::path::PathBuf,
        error: std::io::Error,
    },
    /// JSON parsing error
    Parse { error: serde_json::Error },
    /// JSON serialization error
    Serialize { error: serde_json::Error },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io { path, error } => {
                write!(
                    formatter,
                    "Failed to read/write config file '{}': {}",
                    path.display(),
                    error
                )
            }
            ConfigError::Parse { error } => write!(formatter, "Failed to parse config: {}", error),
            ConfigError::Serialize { error } => {
                write!(formatter, "Failed to serialize config: {}", error)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { error, .. } => Some(error),
            ConfigError::Parse { error } | ConfigError::Serialize { error } => Some(error),
        }
    }
}
