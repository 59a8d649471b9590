use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::util::*;

/// Channel a driver uses to raise exceptions outside of any call
pub type ExceptionSink = mpsc::UnboundedSender<DriverException>;
pub type ExceptionReceiver = mpsc::UnboundedReceiver<DriverException>;

pub fn exception_channel() -> (ExceptionSink, ExceptionReceiver) {
    mpsc::unbounded_channel()
}

/// The operations a telescope driver has to offer the client.
/// Adapters for a concrete transport implement this.
#[async_trait]
pub trait Driver: Send + Sync {
    /// `Connected`
    async fn is_connected(&self) -> DriverResult<bool>;
    async fn set_connected(&self, connected: bool) -> DriverResult<()>;

    /// `AtPark`
    async fn is_parked(&self) -> DriverResult<bool>;

    /// `Tracking`
    async fn is_tracking(&self) -> DriverResult<bool>;
    async fn set_tracking(&self, tracking: bool) -> DriverResult<()>;

    /// `CanSlew`
    async fn can_slew(&self) -> DriverResult<bool>;
    /// `CanSlewAsync`
    async fn can_slew_async(&self) -> DriverResult<bool>;
    /// `CanSetTracking`
    async fn can_set_tracking(&self) -> DriverResult<bool>;
    /// `CanUnpark`
    async fn can_unpark(&self) -> DriverResult<bool>;

    /// `RightAscension` in hours
    async fn right_ascension(&self) -> DriverResult<Hours>;
    /// `Declination` in degrees
    async fn declination(&self) -> DriverResult<Degrees>;

    /// `EquatorialSystem`, see [EquatorialCoordinateType]
    async fn equatorial_system(&self) -> DriverResult<i32>;

    async fn unpark(&self) -> DriverResult<()>;

    /// Returns when the slew is complete
    async fn slew_to_coordinates(&self, ra: Hours, dec: Degrees) -> DriverResult<()>;

    /// Returns as soon as the slew starts
    async fn slew_to_coordinates_async(&self, ra: Hours, dec: Degrees) -> DriverResult<()>;
}

/// Resolves driver identifiers to driver instances
pub trait DriverFactory: Send + Sync {
    fn create(&self, driver_id: &str, exceptions: ExceptionSink) -> ClientResult<Box<dyn Driver>>;
}
