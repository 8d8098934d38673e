use glam::{DQuat, DVec3};
use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_PI_2;

use crate::{Geodesy, LatLonAlt};

/// Mean earth radius used by the default spherical model.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Spherical earth model.
///
/// Geocentric axes: +X through (lat 0, lon 0), +Y through (lat 0, lon 90°E),
/// +Z through the north pole. The local tangent frame is north-east-down.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SphericalEarth {
    pub radius: f64,
}

impl SphericalEarth {
    pub fn new(radius: f64) -> Self {
        Self { radius }
    }

    /// Orientation of the north-east-down frame at `lat`/`lon` in geocentric axes.
    pub fn ltp_orientation(lat: f64, lon: f64) -> DQuat {
        DQuat::from_rotation_z(lon) * DQuat::from_rotation_y(-lat - FRAC_PI_2)
    }
}

impl Default for SphericalEarth {
    fn default() -> Self {
        Self::new(EARTH_RADIUS_M)
    }
}

impl Geodesy for SphericalEarth {
    fn geodetic_to_geocentric(&self, lla: LatLonAlt) -> DVec3 {
        let r = self.radius + lla.alt;
        let (sin_lat, cos_lat) = lla.lat.sin_cos();
        let (sin_lon, cos_lon) = lla.lon.sin_cos();
        DVec3::new(r * cos_lat * cos_lon, r * cos_lat * sin_lon, r * sin_lat)
    }

    fn geocentric_to_geodetic(&self, position: DVec3) -> LatLonAlt {
        let r = position.length();
        if r == 0.0 {
            return LatLonAlt::new(0.0, 0.0, -self.radius);
        }
        let horizontal = position.x.hypot(position.y);
        LatLonAlt::new(
            position.z.atan2(horizontal),
            position.y.atan2(position.x),
            r - self.radius,
        )
    }

    fn euler_to_orientation_at(
        &self,
        roll: f64,
        pitch: f64,
        yaw: f64,
        lat: f64,
        lon: f64,
    ) -> DQuat {
        let body = DQuat::from_rotation_z(yaw) * DQuat::from_rotation_y(pitch) * DQuat::from_rotation_x(roll);
        Self::ltp_orientation(lat, lon) * body
    }
}
