// wind.rs - Horizontal wind forcing
//
// Wind is a sum of sinusoids of elapsed time. Each component gets a fixed
// phase offset so the components never all peak together.

use crate::config::WindConfig;
use std::f32::consts::TAU;

/// Golden-angle phase step between components
const PHASE_STEP: f32 = 2.399_963;

/// Wind acceleration at time `t` (seconds) for a droplet of unit
/// sensitivity. Returns 0.0 when no frequencies are configured.
#[inline]
pub fn wind_force(wind: &WindConfig, t: f32) -> f32 {
    let n = wind.frequencies.len();
    if n == 0 { return 0.0; }

    let sum: f32 = wind
        .frequencies
        .iter()
        .enumerate()
        .map(|(i, f)| (TAU * f * t + i as f32 * PHASE_STEP).sin())
        .sum();
    wind.base_strength * wind.sensitivity * sum / n as f32
}

/// Size-derived sensitivity; smaller droplets are pushed around more.
/// The configured `wind.sensitivity` gain is folded into `wind_force`.
#[inline]
pub fn wind_sensitivity(radius: f32) -> f32 {
    if radius <= 0.0 { return 0.0; }
    1.0 / radius
}

/// Integrate wind into horizontal velocity with exponential friction.
#[inline]
pub fn apply_wind(vx: f32, force: f32, sensitivity: f32, friction: f32, dt: f32) -> f32 {
    (vx + force * sensitivity * dt) * (-friction * dt).exp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_frequencies_is_calm() {
        let wind = WindConfig { frequencies: vec![], ..Default::default() };
        assert_eq!(wind_force(&wind, 12.5), 0.0);
    }

    #[test]
    fn test_force_bounded_by_base_strength() {
        let wind = WindConfig::default();
        let peak = wind.base_strength * wind.sensitivity;
        for step in 0..1000 {
            let f = wind_force(&wind, step as f32 * 0.05);
            assert!(f.abs() <= peak + 1e-3);
        }
    }

    #[test]
    fn test_sensitivity_inverse_to_radius() {
        let small = wind_sensitivity(5.0);
        let large = wind_sensitivity(20.0);
        assert!((small / large - 4.0).abs() < 1e-5);
        assert_eq!(wind_sensitivity(0.0), 0.0);
    }

    #[test]
    fn test_friction_decays_velocity() {
        let mut vx = 100.0;
        for _ in 0..60 {
            vx = apply_wind(vx, 0.0, 1.0, 1.5, 1.0 / 60.0);
        }
        assert!((vx - 100.0 * (-1.5f32).exp()).abs() < 0.01);
    }
}
