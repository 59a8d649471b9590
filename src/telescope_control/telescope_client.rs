use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::driver::DriverFactory;
use super::frame::{CoordinateTransform, SkyFrame};
use super::interpolated_position::InterpolatedPosition;
use super::session::{DriverSession, Timeouts};
use crate::config::{Config, TelescopeSettings};
use crate::util::*;

/// Client side of one telescope: keeps a time compensated position
/// and forwards goto requests to the driver.
pub struct TelescopeClient {
    pub(in crate::telescope_control) name: String,
    pub(in crate::telescope_control) session: DriverSession,
    pub(in crate::telescope_control) transform: CoordinateTransform,
    pub(in crate::telescope_control) clock: Arc<dyn Clock>,
    pub(in crate::telescope_control) refresh_interval: chrono::Duration,
    pub(in crate::telescope_control) positions: RwLock<InterpolatedPosition>,
    pub(in crate::telescope_control) next_poll: RwLock<DateTime<Utc>>,
}

impl TelescopeClient {
    /// Creates the driver and runs the startup checks.
    /// A driver that can't be created leaves the client permanently unusable.
    pub async fn new(
        config: &Config,
        factory: &dyn DriverFactory,
        frame: Arc<dyn SkyFrame>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let settings = &config.telescope;
        let communication = &config.communication;

        let timeouts = Timeouts {
            call: std::time::Duration::from_millis(communication.driver_timeout_millis),
            slew: std::time::Duration::from_millis(communication.slew_timeout_millis),
        };
        info!(
            "Creating ASCOM telescope client {} for {}",
            settings.name, settings.driver_id
        );
        let session = DriverSession::create(&settings.name, &settings.driver_id, factory, timeouts);

        let now = clock.now();
        let client = TelescopeClient {
            name: settings.name.clone(),
            session,
            transform: CoordinateTransform::new(settings.equinox, frame),
            clock,
            refresh_interval: communication.refresh_interval(),
            positions: RwLock::new(InterpolatedPosition::new(
                communication.position_history,
                communication.max_sample_age(),
            )),
            next_poll: RwLock::new(now),
        };

        if client.session.is_usable().await {
            if let Err(e) = client.check_driver(settings).await {
                warn!("{}: startup checks failed: {}", client.name, e);
            }
        }

        client
    }

    /// Mirrors what the driver offers before the first tick. Problems are only
    /// warnings unless `strict_startup` is set, in which case the driver is released.
    async fn check_driver(&self, settings: &TelescopeSettings) -> ClientResult<()> {
        let capabilities = self.session.capabilities().await?;
        debug!("{} capabilities: {:?}", self.name, capabilities);
        if !capabilities.can_goto() {
            // Not an error, covers things like digital setting circles
            warn!(
                "{} can't receive \"go to\" commands. Its current position will be displayed only.",
                self.name
            );
        }

        if !self.session.try_connect().await? {
            warn!("Couldn't connect to {}, will keep trying", self.name);
            return self.fail_startup(settings, ClientError::NotConnected).await;
        }

        if self.session.is_parked().await? && !capabilities.can_unpark {
            warn!(
                "The {} telescope is parked and the client can't unpark it",
                self.name
            );
            return self.fail_startup(settings, ClientError::Parked).await;
        }

        if settings.verify_equatorial_system {
            self.check_equatorial_system().await?;
        }

        Ok(())
    }

    async fn fail_startup(&self, settings: &TelescopeSettings, e: ClientError) -> ClientResult<()> {
        if settings.strict_startup {
            self.session.teardown().await;
            Err(e)
        } else {
            Ok(())
        }
    }

    async fn check_equatorial_system(&self) -> ClientResult<()> {
        let reported = self.session.equatorial_system().await?;
        match EquatorialCoordinateType::try_from(reported) {
            Ok(system) => match system.equinox_mode() {
                Some(mode) if mode == self.equinox() => {}
                Some(mode) => warn!(
                    "{} reports {:?} coordinates but is configured for {:?}",
                    self.name,
                    mode,
                    self.equinox()
                ),
                None => warn!(
                    "{} uses {:?} coordinates, which this client doesn't support",
                    self.name, system
                ),
            },
            Err(_) => warn!(
                "{} reports unknown equatorial system {}",
                self.name, reported
            ),
        }
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn equinox(&self) -> EquinoxMode {
        self.transform.equinox()
    }

    pub fn driver_id(&self) -> &str {
        self.session.driver_id()
    }

    pub async fn is_usable(&self) -> bool {
        self.session.is_usable().await
    }

    pub async fn is_connected(&self) -> bool {
        self.session.is_connected().await
    }

    /// Driver faults, one event per session
    pub fn subscribe_errors(&self) -> super::fault::ErrorEvents {
        self.session.subscribe_errors()
    }

    /// Disconnects and releases the driver. The position history goes with it.
    pub async fn shutdown(&self) {
        info!("Shutting down {}", self.name);
        self.session.disconnect().await;
        self.positions.write().await.clear();
    }
}
