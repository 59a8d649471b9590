use chrono::{Datelike, Timelike};
use std::f64::consts::PI;

pub use precession::*;
pub use vector::*;

mod precession;
mod vector;

pub type Hours = f64;
pub type Degrees = f64;
pub type Radians = f64;

/// Julian date of the J2000.0 epoch
pub const J2000_JD: f64 = 2451545.0;
const DAYS_PER_JULIAN_CENTURY: f64 = 36525.;

pub fn deg_to_rad(degrees: Degrees) -> Radians {
    degrees * (PI / 180.)
}

pub fn rad_to_deg(rad: Radians) -> Degrees {
    rad * (180. / PI)
}

pub fn hours_to_rad(hours: Hours) -> Radians {
    hours * (PI / 12.)
}

pub fn rad_to_hours(rad: Radians) -> Hours {
    rad * (12. / PI)
}

pub fn modulo(val: f64, base: f64) -> f64 {
    ((val % base) + base) % base
}

// Convert hms to hours or dms to degrees
pub fn ms_to_dec(d: u32, minutes: u32, seconds: f64) -> f64 {
    (d as f64) + (minutes as f64) / 60. + seconds / 3600.
}

/// Unit direction for spherical angles, x = cos(dec)cos(ra), y = cos(dec)sin(ra), z = sin(dec)
pub fn sphe_to_rect(ra: Radians, dec: Radians) -> Vec3 {
    let cos_dec = dec.cos();
    Vec3::new(cos_dec * ra.cos(), cos_dec * ra.sin(), dec.sin())
}

/// Inverse of [sphe_to_rect]. The vector does not need to be normalized.
/// ra is in (-pi, pi]
pub fn rect_to_sphe(v: Vec3) -> (Radians, Radians) {
    let ra = v.y.atan2(v.x);
    let dec = v.z.atan2(v.x.hypot(v.y));
    (ra, dec)
}

/// Direction of the equatorial coordinates as reported by a driver
pub fn equatorial_to_vector(ra: Hours, dec: Degrees) -> Vec3 {
    sphe_to_rect(hours_to_rad(ra), deg_to_rad(dec))
}

/// Equatorial coordinates as accepted by a driver, ra in [0, 24)
pub fn vector_to_equatorial(v: Vec3) -> (Hours, Degrees) {
    let (ra, dec) = rect_to_sphe(v);
    let ra_hours = modulo(rad_to_hours(ra), 24.);
    // modulo can land exactly on the base for tiny negative inputs
    let ra_hours = if ra_hours >= 24. { 0. } else { ra_hours };
    (ra_hours, rad_to_deg(dec))
}

/// Calculates the Julian Date of a time
/// see https://scienceworld.wolfram.com/astronomy/JulianDate.html
pub fn calc_jd(time: chrono::DateTime<chrono::Utc>) -> f64 {
    let y = time.year() as f64;
    let m = time.month() as f64;
    let d = time.day() as f64;

    let mut jd = 367. * y;
    jd -= f64::floor(7. * (y + f64::floor((m + 9.) / 12.)) / 4.);
    jd -= f64::floor(3. * (f64::floor((y + (m - 9.) / 7.) / 100.) + 1.) / 4.);
    jd += f64::floor(275. * m / 9.);
    jd += d;
    jd += 1721028.5;
    let seconds = time.second() as f64 + time.nanosecond() as f64 / 1e9;
    jd + ms_to_dec(time.hour(), time.minute(), seconds) / 24.
}

/// Julian centuries elapsed since J2000.0
pub fn julian_centuries_since_j2000(time: chrono::DateTime<chrono::Utc>) -> f64 {
    (calc_jd(time) - J2000_JD) / DAYS_PER_JULIAN_CENTURY
}
