pub mod equatorial_coordinate_type;
pub mod equinox_mode;

pub use equatorial_coordinate_type::*;
pub use equinox_mode::*;

pub use crate::astro_math::{Degrees, Hours, Radians};
