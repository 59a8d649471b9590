use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::astro_math::{self, Vec3};
use crate::util::*;

/// Conversion between J2000 and equator/equinox of date directions.
/// The application decides how precise this is.
pub trait SkyFrame: Send + Sync {
    fn to_standard_epoch(&self, v: Vec3, time: DateTime<Utc>) -> Vec3;
    fn to_instantaneous_equinox(&self, v: Vec3, time: DateTime<Utc>) -> Vec3;
}

/// Mean equator and equinox of date using IAU 1976 precession only
#[derive(Debug, Default, Copy, Clone)]
pub struct PrecessionFrame;

impl SkyFrame for PrecessionFrame {
    fn to_standard_epoch(&self, v: Vec3, time: DateTime<Utc>) -> Vec3 {
        v.rotate_inverse(&astro_math::precession_matrix_at(time))
    }

    fn to_instantaneous_equinox(&self, v: Vec3, time: DateTime<Utc>) -> Vec3 {
        v.rotate(&astro_math::precession_matrix_at(time))
    }
}

/// Converts between what the driver speaks (hours/degrees in its own frame)
/// and canonical J2000 direction vectors. The only place frames are changed.
#[derive(Clone)]
pub struct CoordinateTransform {
    equinox: EquinoxMode,
    frame: Arc<dyn SkyFrame>,
}

impl CoordinateTransform {
    pub fn new(equinox: EquinoxMode, frame: Arc<dyn SkyFrame>) -> Self {
        Self { equinox, frame }
    }

    pub fn equinox(&self) -> EquinoxMode {
        self.equinox
    }

    /// Inbound: a reported position to a canonical direction
    pub fn reported_to_canonical(&self, ra: Hours, dec: Degrees, time: DateTime<Utc>) -> Vec3 {
        let v = astro_math::equatorial_to_vector(ra, dec);
        if self.equinox.needs_conversion() {
            self.frame.to_standard_epoch(v, time)
        } else {
            v
        }
    }

    /// Outbound: a canonical direction to coordinates the driver accepts
    pub fn canonical_to_driver(&self, v: Vec3, time: DateTime<Utc>) -> (Hours, Degrees) {
        let v = if self.equinox.needs_conversion() {
            self.frame.to_instantaneous_equinox(v, time)
        } else {
            v
        };
        astro_math::vector_to_equatorial(v)
    }
}
