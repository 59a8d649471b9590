use polynomials::poly;

use super::{deg_to_rad, julian_centuries_since_j2000, Matrix3, Radians};

const ARCSEC_PER_DEGREE: f64 = 3600.;

/// IAU 1976 precession angles (zeta, z, theta) from J2000.0 to the given epoch.
/// t in Julian centuries since J2000.0
pub fn precession_angles(t: f64) -> (Radians, Radians, Radians) {
    let zeta = poly![0., 2306.2181, 0.30188, 0.017998];
    let z = poly![0., 2306.2181, 1.09468, 0.018203];
    let theta = poly![0., 2004.3109, -0.42665, -0.041833];

    let to_rad = |arcsec: f64| deg_to_rad(arcsec / ARCSEC_PER_DEGREE);

    (
        to_rad(zeta.eval(t).unwrap_or_default()),
        to_rad(z.eval(t).unwrap_or_default()),
        to_rad(theta.eval(t).unwrap_or_default()),
    )
}

/// Rotation taking J2000 mean equatorial directions to the mean equator and equinox of date
pub fn precession_matrix(t: f64) -> Matrix3 {
    let (zeta, z, theta) = precession_angles(t);
    let (s_zeta, c_zeta) = zeta.sin_cos();
    let (s_z, c_z) = z.sin_cos();
    let (s_theta, c_theta) = theta.sin_cos();

    [
        [
            c_zeta * c_theta * c_z - s_zeta * s_z,
            -s_zeta * c_theta * c_z - c_zeta * s_z,
            -s_theta * c_z,
        ],
        [
            c_zeta * c_theta * s_z + s_zeta * c_z,
            -s_zeta * c_theta * s_z + c_zeta * c_z,
            -s_theta * s_z,
        ],
        [c_zeta * s_theta, -s_zeta * s_theta, c_theta],
    ]
}

pub fn precession_matrix_at(time: chrono::DateTime<chrono::Utc>) -> Matrix3 {
    precession_matrix(julian_centuries_since_j2000(time))
}
