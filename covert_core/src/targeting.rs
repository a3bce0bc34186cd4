//! Targeting probabilities and outcome draws.
//!
//! Every function here is pure apart from the RNG it is handed, so actor
//! behaviour is reproducible under a seeded context.

use crate::config::SimParams;
use crate::store::GroupExposure;
use rand::Rng;
use std::time::Duration;

/// What happens to an actor that has been hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Killed,
    Injured,
    Caught,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Injury {
    /// Recovers after `recovery_light` and resumes
    Light,
    /// Leaves the simulation
    Severe,
}

/// Per-iteration chance that a resistance member is targeted.
///
/// `base + military bonus + spy_time_secs * factor`, clamped to `[0, 1]`.
pub fn resistance_target_probability(params: &SimParams, exposure: GroupExposure) -> f64 {
    let military = if exposure.is_military {
        params.military_target_bonus
    } else {
        0.0
    };
    let spy = exposure.accumulated_spy_time.as_secs_f64() * params.spy_time_target_factor;
    (params.target_probability + military + spy).clamp(0.0, 1.0)
}

/// Per-iteration chance that an agency member is targeted.
///
/// Grows linearly with time in service relative to `agency_time_limit`.
pub fn agency_target_probability(params: &SimParams, time_in_service: Duration) -> f64 {
    if params.agency_time_limit.is_zero() {
        return 0.0;
    }
    let ratio = time_in_service.as_secs_f64() / params.agency_time_limit.as_secs_f64();
    (ratio * params.agency_target_scale).clamp(0.0, 1.0)
}

pub fn draw_hit<R: Rng + ?Sized>(rng: &mut R, probability: f64) -> bool {
    rng.gen::<f64>() < probability
}

/// Uniform three-way draw.
pub fn draw_outcome<R: Rng + ?Sized>(rng: &mut R) -> Outcome {
    match rng.gen_range(0..3) {
        0 => Outcome::Killed,
        1 => Outcome::Injured,
        _ => Outcome::Caught,
    }
}

pub fn draw_injury<R: Rng + ?Sized>(rng: &mut R, light_probability: f64) -> Injury {
    if rng.gen::<f64>() < light_probability {
        Injury::Light
    } else {
        Injury::Severe
    }
}
