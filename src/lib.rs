#[cfg(test)]
#[macro_use]
extern crate assert_float_eq;

pub mod astro_math;
pub mod config;
pub mod simulator;
pub mod telescope_control;
pub mod util;

pub use astro_math::{Degrees, Hours, Radians, Vec3};
pub use config::Config;
pub use telescope_control::TelescopeClient;
