use glam::DVec3;
use serde::{Deserialize, Serialize};

/// Pose of an entity at an instant. Angles in radians, position geocentric metres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub time: f64,
    pub position: DVec3,
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
}

impl Sample {
    /// Affine blend of every channel between `a` (at `f = 0`) and `b` (at `f = 1`).
    /// `f` outside `[0, 1]` extrapolates.
    fn blend(a: &Sample, b: &Sample, f: f64, time: f64) -> Sample {
        let mix = |x: f64, y: f64| x * (1.0 - f) + y * f;
        Sample {
            time,
            position: a.position * (1.0 - f) + b.position * f,
            roll: mix(a.roll, b.roll),
            pitch: mix(a.pitch, b.pitch),
            yaw: mix(a.yaw, b.yaw),
        }
    }
}

/// Sample a trajectory at `time`.
///
/// Between recorded samples each channel is interpolated linearly. Outside the
/// recorded range the nearest segment is extrapolated linearly. A single sample
/// holds its pose for all times. Returns `None` only when `samples` is empty.
///
/// `samples` must be strictly increasing in time. The returned sample's `time`
/// is always the query time.
pub fn sample(samples: &[Sample], time: f64) -> Option<Sample> {
    match samples {
        [] => None,
        [only] => Some(Sample { time, ..*only }),
        _ => {
            let upper = samples.partition_point(|s| s.time <= time);
            let i = upper.clamp(1, samples.len() - 1);
            let (a, b) = (&samples[i - 1], &samples[i]);
            let f = (time - a.time) / (b.time - a.time);
            Some(Sample::blend(a, b, f, time))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn s(time: f64, x: f64, yaw: f64) -> Sample {
        Sample {
            time,
            position: DVec3::new(x, 2.0 * x, -x),
            roll: 0.0,
            pitch: 0.5 * yaw,
            yaw,
        }
    }

    fn track() -> Vec<Sample> {
        vec![s(0.0, 0.0, 0.0), s(10.0, 100.0, 1.0), s(20.0, 150.0, 3.0)]
    }

    #[test]
    fn empty_track_has_no_sample() {
        assert!(sample(&[], 1.0).is_none());
    }

    #[test]
    fn single_sample_held_for_all_times() {
        let only = s(5.0, 7.0, 0.3);
        for t in [-100.0, 5.0, 1e6] {
            let out = sample(&[only], t).unwrap();
            assert_eq!(out.time, t);
            assert_eq!(out.position, only.position);
            assert_eq!(out.yaw, only.yaw);
        }
    }

    #[test]
    fn exact_times_return_recorded_samples() {
        let track = track();
        for rec in &track {
            let out = sample(&track, rec.time).unwrap();
            assert!((out.position - rec.position).length() < EPS);
            assert!((out.yaw - rec.yaw).abs() < EPS);
            assert!((out.pitch - rec.pitch).abs() < EPS);
        }
    }

    #[test]
    fn exact_last_sample_is_bit_exact_at_large_magnitudes() {
        let a = Sample {
            time: 0.0,
            position: DVec3::new(6_371_000.0, 0.0, 0.0),
            roll: 0.0,
            pitch: 0.0,
            yaw: 0.0,
        };
        let b = Sample {
            time: 3.0,
            position: DVec3::new(6_371_123.456, 17.0, 1.0),
            ..a
        };
        let out = sample(&[a, b], 3.0).unwrap();
        assert_eq!(out.position, b.position);
    }

    #[test]
    fn midpoint_interpolates_every_channel() {
        let out = sample(&track(), 15.0).unwrap();
        assert!((out.position.x - 125.0).abs() < EPS);
        assert!((out.position.y - 250.0).abs() < EPS);
        assert!((out.position.z + 125.0).abs() < EPS);
        assert!((out.yaw - 2.0).abs() < EPS);
        assert!((out.pitch - 1.0).abs() < EPS);
    }

    #[test]
    fn extrapolates_before_first_sample() {
        // First segment slope: x +10/s, yaw +0.1/s.
        let out = sample(&track(), -5.0).unwrap();
        assert!((out.position.x + 50.0).abs() < EPS);
        assert!((out.yaw + 0.5).abs() < EPS);
    }

    #[test]
    fn extrapolates_after_last_sample() {
        // Last segment slope: x +5/s, yaw +0.2/s.
        let out = sample(&track(), 30.0).unwrap();
        assert!((out.position.x - 200.0).abs() < EPS);
        assert!((out.yaw - 5.0).abs() < EPS);
        assert_eq!(out.time, 30.0);
    }

    #[test]
    fn extrapolation_is_linear_in_time() {
        let track = track();
        let a = sample(&track, 25.0).unwrap();
        let b = sample(&track, 30.0).unwrap();
        let c = sample(&track, 35.0).unwrap();
        assert!(((b.position.x - a.position.x) - (c.position.x - b.position.x)).abs() < EPS);
        assert!(((b.yaw - a.yaw) - (c.yaw - b.yaw)).abs() < EPS);
    }

    #[test]
    fn two_samples_interpolate_and_extrapolate_on_same_line() {
        let track = [s(0.0, 0.0, 0.0), s(1.0, 1.0, 1.0)];
        for t in [-2.0, -0.5, 0.25, 0.75, 1.5, 4.0] {
            let out = sample(&track, t).unwrap();
            assert!((out.position.x - t).abs() < EPS);
            assert!((out.yaw - t).abs() < EPS);
        }
    }
}
