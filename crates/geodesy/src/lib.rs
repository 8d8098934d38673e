//! Geodesy: the coordinate collaborator used by the replay engine.
//!
//! The engine never assumes a particular earth model. It talks to a [`Geodesy`]
//! implementation that converts between geodetic and geocentric frames and builds
//! geocentric orientations from local roll/pitch/yaw.
//!
//! # Invariants
//! - Angles crossing this boundary are radians; distances are metres.
//! - `geocentric_to_geodetic(geodetic_to_geocentric(lla)) == lla` within float tolerance.

mod angle;
mod spherical;

pub use angle::smallest_angle_from_to;
pub use spherical::{EARTH_RADIUS_M, SphericalEarth};

use glam::{DQuat, DVec3};
use serde::{Deserialize, Serialize};

/// Geodetic coordinate. Latitude and longitude in radians, altitude in metres.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LatLonAlt {
    pub lat: f64,
    pub lon: f64,
    pub alt: f64,
}

impl LatLonAlt {
    pub fn new(lat: f64, lon: f64, alt: f64) -> Self {
        Self { lat, lon, alt }
    }

    /// Build from latitude/longitude in degrees.
    pub fn from_degrees(lat_deg: f64, lon_deg: f64, alt: f64) -> Self {
        Self::new(lat_deg.to_radians(), lon_deg.to_radians(), alt)
    }
}

/// Conversions between geodetic and geocentric frames.
pub trait Geodesy {
    /// Geodetic position to geocentric Cartesian position.
    fn geodetic_to_geocentric(&self, lla: LatLonAlt) -> DVec3;

    /// Geocentric Cartesian position to geodetic position.
    fn geocentric_to_geodetic(&self, position: DVec3) -> LatLonAlt;

    /// Geocentric orientation of a body with the given roll/pitch/yaw relative to
    /// the local north-east-down frame at `lat`/`lon`.
    fn euler_to_orientation_at(&self, roll: f64, pitch: f64, yaw: f64, lat: f64, lon: f64)
    -> DQuat;
}

impl<G: Geodesy + ?Sized> Geodesy for &G {
    fn geodetic_to_geocentric(&self, lla: LatLonAlt) -> DVec3 {
        (**self).geodetic_to_geocentric(lla)
    }

    fn geocentric_to_geodetic(&self, position: DVec3) -> LatLonAlt {
        (**self).geocentric_to_geodetic(position)
    }

    fn euler_to_orientation_at(
        &self,
        roll: f64,
        pitch: f64,
        yaw: f64,
        lat: f64,
        lon: f64,
    ) -> DQuat {
        (**self).euler_to_orientation_at(roll, pitch, yaw, lat, lon)
    }
}
