use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::{task, time};
use tracing::{debug, info, trace, warn};

pub use capabilities::*;
pub use potential_driver::*;

use super::driver::{exception_channel, Driver, DriverFactory};
use super::fault::{ErrorEvents, FaultReporter};
use crate::util::*;

mod capabilities;
mod potential_driver;

type DriverFuture<'a, T> = Pin<Box<dyn Future<Output = DriverResult<T>> + Send + 'a>>;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Timeouts {
    /// Bound on every ordinary property read or method call
    pub call: Duration,
    /// Bound on a blocking slew, which lasts as long as the mount moves
    pub slew: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            call: Duration::from_secs(5),
            slew: Duration::from_secs(180),
        }
    }
}

/// Owns the handle to one driver. Once released the handle never comes back,
/// a new session has to be created instead.
#[derive(Clone)]
pub struct DriverSession {
    driver_id: String,
    d: Arc<RwLock<PotentialDriver>>,
    timeouts: Timeouts,
    faults: FaultReporter,
}

impl DriverSession {
    /// Must be called from within a tokio runtime
    pub fn create(
        telescope: &str,
        driver_id: &str,
        factory: &dyn DriverFactory,
        timeouts: Timeouts,
    ) -> Self {
        let (sink, exceptions) = exception_channel();
        let created = factory.create(driver_id, sink);

        match &created {
            Ok(_) => info!("Created driver {} for {}", driver_id, telescope),
            Err(e) => warn!("Couldn't create driver for {}: {}", telescope, e),
        }
        let usable = created.is_ok();

        let d = Arc::new(RwLock::new(PotentialDriver::from(created)));
        let faults = FaultReporter::new(telescope, d.clone());

        if usable {
            task::spawn(faults.clone().listen(exceptions));
        }

        DriverSession {
            driver_id: driver_id.to_string(),
            d,
            timeouts,
            faults,
        }
    }

    pub fn driver_id(&self) -> &str {
        &self.driver_id
    }

    pub fn subscribe_errors(&self) -> ErrorEvents {
        self.faults.subscribe()
    }

    pub async fn is_usable(&self) -> bool {
        self.d.read().await.is_usable()
    }

    /// Releases the driver handle. Returns whether there was one to release.
    pub async fn teardown(&self) -> bool {
        let released = self.faults.release().await;
        if released.is_some() {
            info!("Released driver {}", self.driver_id);
        }
        released.is_some()
    }

    /// Runs one driver call with the handle locked for reading.
    /// Exceptions and timeouts are handed to the fault reporter after the lock is dropped.
    async fn call<T, F>(&self, operation: &'static str, limit: Duration, f: F) -> ClientResult<T>
    where
        F: for<'a> FnOnce(&'a dyn Driver) -> DriverFuture<'a, T>,
    {
        let result = {
            let lock = self.d.read().await;
            let driver = lock.get()?;
            trace!("{} -> {}", self.driver_id, operation);
            time::timeout(limit, f(driver)).await
        };

        match result {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(exception)) => Err(self.faults.report(exception).await),
            Err(_elapsed) => {
                let exception =
                    DriverException::timeout(&self.driver_id, operation, limit.as_millis());
                Err(self.faults.report(exception).await)
            }
        }
    }

    /* Connection */

    pub async fn connected(&self) -> ClientResult<bool> {
        self.call("Connected", self.timeouts.call, |d| d.is_connected())
            .await
    }

    /// False whenever the answer can't be had
    pub async fn is_connected(&self) -> bool {
        self.connected().await.unwrap_or(false)
    }

    /// The property is authoritative, setting it can silently fail (e.g. wrong serial port)
    pub async fn try_connect(&self) -> ClientResult<bool> {
        self.call("Connected = true", self.timeouts.call, |d| {
            d.set_connected(true)
        })
        .await?;
        let connected = self.connected().await?;
        if !connected {
            debug!("Connection attempt to {} failed", self.driver_id);
        }
        Ok(connected)
    }

    /// Connected afterwards, or an error saying why not
    pub async fn ensure_connected(&self) -> ClientResult<()> {
        if !self.is_usable().await {
            return Err(ClientError::NotUsable);
        }
        if self.connected().await? || self.try_connect().await? {
            Ok(())
        } else {
            Err(ClientError::NotConnected)
        }
    }

    /// Tells the driver to let go of the device, then releases the handle
    pub async fn disconnect(&self) {
        if self.is_usable().await {
            if let Err(e) = self
                .call("Connected = false", self.timeouts.call, |d| {
                    d.set_connected(false)
                })
                .await
            {
                debug!("Error disconnecting {}: {}", self.driver_id, e);
            }
        }
        self.teardown().await;
    }

    /* Capabilities */

    pub async fn can_slew(&self) -> ClientResult<bool> {
        self.call("CanSlew", self.timeouts.call, |d| d.can_slew())
            .await
    }

    pub async fn can_slew_async(&self) -> ClientResult<bool> {
        self.call("CanSlewAsync", self.timeouts.call, |d| d.can_slew_async())
            .await
    }

    pub async fn can_set_tracking(&self) -> ClientResult<bool> {
        self.call("CanSetTracking", self.timeouts.call, |d| {
            d.can_set_tracking()
        })
        .await
    }

    pub async fn can_unpark(&self) -> ClientResult<bool> {
        self.call("CanUnpark", self.timeouts.call, |d| d.can_unpark())
            .await
    }

    pub async fn capabilities(&self) -> ClientResult<CapabilitySnapshot> {
        Ok(CapabilitySnapshot {
            can_slew: self.can_slew().await?,
            can_slew_async: self.can_slew_async().await?,
            can_set_tracking: self.can_set_tracking().await?,
            can_unpark: self.can_unpark().await?,
        })
    }

    /* State */

    pub async fn is_parked(&self) -> ClientResult<bool> {
        self.call("AtPark", self.timeouts.call, |d| d.is_parked())
            .await
    }

    pub async fn is_tracking(&self) -> ClientResult<bool> {
        self.call("Tracking", self.timeouts.call, |d| d.is_tracking())
            .await
    }

    /// Returns the tracking state read back after setting it
    pub async fn set_tracking(&self, tracking: bool) -> ClientResult<bool> {
        self.call("set Tracking", self.timeouts.call, move |d| {
            d.set_tracking(tracking)
        })
        .await?;
        self.is_tracking().await
    }

    /// Right ascension (hours) and declination (degrees) in the driver's frame
    pub async fn reported_position(&self) -> ClientResult<(Hours, Degrees)> {
        let ra = self
            .call("RightAscension", self.timeouts.call, |d| {
                d.right_ascension()
            })
            .await?;
        let dec = self
            .call("Declination", self.timeouts.call, |d| d.declination())
            .await?;
        Ok((ra, dec))
    }

    pub async fn equatorial_system(&self) -> ClientResult<i32> {
        self.call("EquatorialSystem", self.timeouts.call, |d| {
            d.equatorial_system()
        })
        .await
    }

    /* Actions */

    pub async fn unpark(&self) -> ClientResult<()> {
        self.call("Unpark()", self.timeouts.call, |d| d.unpark())
            .await
    }

    pub async fn slew_async(&self, ra: Hours, dec: Degrees) -> ClientResult<()> {
        self.call("SlewToCoordinatesAsync()", self.timeouts.call, move |d| {
            d.slew_to_coordinates_async(ra, dec)
        })
        .await
    }

    /// Blocks until the mount arrives
    pub async fn slew_sync(&self, ra: Hours, dec: Degrees) -> ClientResult<()> {
        self.call("SlewToCoordinates()", self.timeouts.slew, move |d| {
            d.slew_to_coordinates(ra, dec)
        })
        .await
    }
}
