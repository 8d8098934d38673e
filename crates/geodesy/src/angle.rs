use std::f64::consts::{PI, TAU};

/// Signed angle that rotates `from` onto `to` the short way round, in `(-π, π]`.
pub fn smallest_angle_from_to(from: f64, to: f64) -> f64 {
    let delta = (to - from).rem_euclid(TAU);
    if delta > PI { delta - TAU } else { delta }
}
