use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::astro_math::{Degrees, Hours};
use crate::util::EquinoxMode;

/* Config */
#[derive(Default, Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub telescope: TelescopeSettings,
    pub communication: CommunicationSettings,
    pub simulator: SimulatorSettings,
    pub initial_goto: Option<TargetSettings>,
}

/* Telescope Settings */
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelescopeSettings {
    pub name: String,
    pub driver_id: String,
    pub equinox: EquinoxMode,
    /// Release the driver when the startup checks fail instead of retrying later
    pub strict_startup: bool,
    /// Compare the driver's `EquatorialSystem` with `equinox` at startup.
    /// Older drivers raise an exception for it, which ends the session.
    pub verify_equatorial_system: bool,
}

impl Default for TelescopeSettings {
    fn default() -> Self {
        Self {
            name: "Telescope".to_string(),
            driver_id: "ASCOM.Simulator.Telescope".to_string(),
            equinox: EquinoxMode::StandardEpoch,
            strict_startup: false,
            verify_equatorial_system: false,
        }
    }
}

/* Communication Settings */
#[derive(Debug, Copy, Clone, Serialize, Deserialize)]
pub struct CommunicationSettings {
    pub refresh_interval_millis: u64,
    pub tick_millis: u64,
    pub driver_timeout_millis: u64,
    pub slew_timeout_millis: u64,
    pub position_history: usize,
    pub max_sample_age_millis: Option<u64>,
}

impl Default for CommunicationSettings {
    fn default() -> Self {
        Self {
            refresh_interval_millis: 500,
            tick_millis: 50,
            driver_timeout_millis: 5_000,
            slew_timeout_millis: 180_000,
            position_history: 8,
            max_sample_age_millis: Some(10_000),
        }
    }
}

impl CommunicationSettings {
    pub fn refresh_interval(&self) -> chrono::Duration {
        chrono::Duration::milliseconds(self.refresh_interval_millis as i64)
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_millis)
    }

    pub fn max_sample_age(&self) -> Option<chrono::Duration> {
        self.max_sample_age_millis
            .map(|millis| chrono::Duration::milliseconds(millis as i64))
    }
}

/* Simulator Settings */
#[derive(Debug, Copy, Clone, Serialize, Deserialize)]
pub struct SimulatorSettings {
    pub can_slew: bool,
    pub can_slew_async: bool,
    pub can_set_tracking: bool,
    pub can_unpark: bool,
    pub start_parked: bool,
    pub latency_millis: u64,
    pub equatorial_system: i32,
    /// Degrees per second
    pub slew_rate: Degrees,
}

impl Default for SimulatorSettings {
    fn default() -> Self {
        Self {
            can_slew: true,
            can_slew_async: true,
            can_set_tracking: true,
            can_unpark: true,
            start_parked: false,
            latency_millis: 0,
            equatorial_system: 2,
            slew_rate: 4.,
        }
    }
}

/* Target */
#[derive(Debug, Copy, Clone, Serialize, Deserialize)]
pub struct TargetSettings {
    pub right_ascension: Hours,
    pub declination: Degrees,
}
