use std::sync::Arc;

use chrono::{TimeZone, Utc};

use super::frame::PrecessionFrame;
use super::TelescopeClient;
use crate::config::{Config, SimulatorSettings};
use crate::simulator::{SimulatedMount, SimulatorFactory};
use crate::util::*;

pub(in crate::telescope_control) fn instant_mount() -> SimulatedMount {
    SimulatedMount::new(&SimulatorSettings {
        slew_rate: 0.,
        ..Default::default()
    })
}

pub(in crate::telescope_control) fn manual_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2026, 10, 18, 22, 0, 0).unwrap(),
    ))
}

pub(in crate::telescope_control) async fn create_client(
    config: Option<Config>,
    mount: &SimulatedMount,
    clock: Arc<ManualClock>,
) -> TelescopeClient {
    let config = config.unwrap_or_default();
    let factory = SimulatorFactory::new(mount.clone());
    let client = TelescopeClient::new(&config, &factory, Arc::new(PrecessionFrame), clock).await;
    mount.clear_calls();
    client
}
