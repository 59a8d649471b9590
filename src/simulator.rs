//! In-process telescope driver. Used by the demo binary in place of a real
//! transport and by the tests to script driver behaviour.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{self, Instant};
use tracing::debug;

use crate::astro_math::{self, Vec3};
use crate::config::SimulatorSettings;
use crate::telescope_control::{CapabilitySnapshot, Driver, DriverFactory, ExceptionSink};
use crate::util::*;

pub const SIMULATOR_DRIVER_ID: &str = "ASCOM.Simulator.Telescope";

/// Oldest calls are forgotten past this many
pub const CALL_LOG_CAPACITY: usize = 1024;

/// One call the client made against the simulated driver
#[derive(Debug, Clone, PartialEq)]
pub enum DriverCall {
    IsConnected,
    SetConnected(bool),
    IsParked,
    IsTracking,
    SetTracking(bool),
    CanSlew,
    CanSlewAsync,
    CanSetTracking,
    CanUnpark,
    RightAscension,
    Declination,
    EquatorialSystem,
    Unpark,
    SlewToCoordinates(Hours, Degrees),
    SlewToCoordinatesAsync(Hours, Degrees),
}

impl DriverCall {
    /// Property or method name as the driver exposes it
    pub fn name(&self) -> &'static str {
        match self {
            Self::IsConnected | Self::SetConnected(_) => "Connected",
            Self::IsParked => "AtPark",
            Self::IsTracking | Self::SetTracking(_) => "Tracking",
            Self::CanSlew => "CanSlew",
            Self::CanSlewAsync => "CanSlewAsync",
            Self::CanSetTracking => "CanSetTracking",
            Self::CanUnpark => "CanUnpark",
            Self::RightAscension => "RightAscension",
            Self::Declination => "Declination",
            Self::EquatorialSystem => "EquatorialSystem",
            Self::Unpark => "Unpark",
            Self::SlewToCoordinates(..) => "SlewToCoordinates",
            Self::SlewToCoordinatesAsync(..) => "SlewToCoordinatesAsync",
        }
    }

    pub fn is_action(&self) -> bool {
        matches!(
            self,
            Self::SetConnected(_)
                | Self::SetTracking(_)
                | Self::Unpark
                | Self::SlewToCoordinates(..)
                | Self::SlewToCoordinatesAsync(..)
        )
    }
}

struct Motion {
    from: Vec3,
    to: Vec3,
    target: (Hours, Degrees),
    start: Instant,
    duration: Duration,
}

struct SimState {
    capabilities: CapabilitySnapshot,
    connected: bool,
    refuse_connections: bool,
    parked: bool,
    stuck_parked: bool,
    tracking: bool,
    ignore_tracking: bool,
    position: (Hours, Degrees),
    motion: Option<Motion>,
    equatorial_system: i32,
    slew_rate: Degrees,
    latency: Duration,
    hang: bool,
    fail_next: Option<DriverException>,
    fail_on: Option<(&'static str, DriverException)>,
    exceptions: Option<ExceptionSink>,
    calls: VecDeque<DriverCall>,
}

impl SimState {
    fn new(settings: &SimulatorSettings) -> Self {
        Self {
            capabilities: CapabilitySnapshot {
                can_slew: settings.can_slew,
                can_slew_async: settings.can_slew_async,
                can_set_tracking: settings.can_set_tracking,
                can_unpark: settings.can_unpark,
            },
            connected: false,
            refuse_connections: false,
            parked: settings.start_parked,
            stuck_parked: false,
            tracking: false,
            ignore_tracking: false,
            position: (0., 0.),
            motion: None,
            equatorial_system: settings.equatorial_system,
            slew_rate: settings.slew_rate,
            latency: Duration::from_millis(settings.latency_millis),
            hang: false,
            fail_next: None,
            fail_on: None,
            exceptions: None,
            calls: VecDeque::with_capacity(CALL_LOG_CAPACITY),
        }
    }

    fn current_position(&mut self) -> (Hours, Degrees) {
        if let Some(motion) = &self.motion {
            let elapsed = motion.start.elapsed();
            if elapsed >= motion.duration {
                self.position = motion.target;
                self.motion = None;
            } else {
                let fraction = elapsed.as_secs_f64() / motion.duration.as_secs_f64();
                return astro_math::vector_to_equatorial(
                    motion.from.lerp(motion.to, fraction).normalized(),
                );
            }
        }
        self.position
    }

    fn slew_duration(&self, from: Vec3, to: Vec3) -> Duration {
        if self.slew_rate <= 0. {
            return Duration::ZERO;
        }
        let degrees = astro_math::rad_to_deg(from.angle_to(to));
        Duration::from_secs_f64(degrees / self.slew_rate)
    }

    fn require_connected(&self, source: &str) -> DriverResult<()> {
        if self.connected {
            Ok(())
        } else {
            Err(DriverException::new(
                DriverException::NOT_CONNECTED,
                source,
                "Telescope not connected",
            ))
        }
    }

    fn require_unparked(&self, source: &str) -> DriverResult<()> {
        if self.parked {
            Err(DriverException::new(
                DriverException::INVALID_WHILE_PARKED,
                source,
                "Telescope is parked",
            ))
        } else {
            Ok(())
        }
    }
}

fn not_implemented(source: &str, what: &str) -> DriverException {
    DriverException::new(
        DriverException::NOT_IMPLEMENTED,
        source,
        format!("{} is not implemented", what),
    )
}

/// Simulated mount. Clones share the same device.
#[derive(Clone)]
pub struct SimulatedMount {
    source: String,
    s: Arc<Mutex<SimState>>,
}

impl Default for SimulatedMount {
    fn default() -> Self {
        Self::new(&SimulatorSettings::default())
    }
}

impl SimulatedMount {
    pub fn new(settings: &SimulatorSettings) -> Self {
        Self {
            source: SIMULATOR_DRIVER_ID.to_string(),
            s: Arc::new(Mutex::new(SimState::new(settings))),
        }
    }

    fn state(&self) -> MutexGuard<'_, SimState> {
        self.s.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /* Scripting */

    pub fn set_capabilities(&self, capabilities: CapabilitySnapshot) {
        self.state().capabilities = capabilities;
    }

    pub fn set_position(&self, ra: Hours, dec: Degrees) {
        let mut s = self.state();
        s.motion = None;
        s.position = (ra, dec);
    }

    pub fn set_parked(&self, parked: bool) {
        self.state().parked = parked;
    }

    pub fn force_tracking(&self, tracking: bool) {
        self.state().tracking = tracking;
    }

    /// Changes the device's connection without going through the driver
    pub fn force_connected(&self, connected: bool) {
        self.state().connected = connected;
    }

    /// Connect requests are accepted but the device stays disconnected
    pub fn refuse_connections(&self, refuse: bool) {
        self.state().refuse_connections = refuse;
    }

    /// Unpark is accepted but the mount stays parked
    pub fn stick_parked(&self, stuck: bool) {
        self.state().stuck_parked = stuck;
    }

    /// Tracking requests are accepted but have no effect
    pub fn ignore_tracking(&self, ignore: bool) {
        self.state().ignore_tracking = ignore;
    }

    pub fn set_latency(&self, latency: Duration) {
        self.state().latency = latency;
    }

    /// Every following call never returns
    pub fn hang(&self, hang: bool) {
        self.state().hang = hang;
    }

    /// The next call of any kind fails with `exception`
    pub fn fail_next(&self, exception: DriverException) {
        self.state().fail_next = Some(exception);
    }

    /// The next call of the named property or method fails with `exception`
    pub fn fail_on(&self, name: &'static str, exception: DriverException) {
        self.state().fail_on = Some((name, exception));
    }

    /// Raises an exception outside of any call. Returns false before the driver was created.
    pub fn raise(&self, exception: DriverException) -> bool {
        match &self.state().exceptions {
            Some(sink) => sink.send(exception).is_ok(),
            None => false,
        }
    }

    /// The most recent calls, oldest first
    pub fn calls(&self) -> Vec<DriverCall> {
        self.state().calls.iter().cloned().collect()
    }

    pub fn actions(&self) -> Vec<DriverCall> {
        self.calls().into_iter().filter(DriverCall::is_action).collect()
    }

    pub fn count_calls(&self, name: &str) -> usize {
        self.state().calls.iter().filter(|c| c.name() == name).count()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    pub fn is_parked_now(&self) -> bool {
        self.state().parked
    }

    pub fn is_tracking_now(&self) -> bool {
        self.state().tracking
    }

    pub fn position_now(&self) -> (Hours, Degrees) {
        self.state().current_position()
    }

    fn attach(&self, exceptions: ExceptionSink) {
        self.state().exceptions = Some(exceptions);
    }

    /// Records the call, applies latency and injected failures
    async fn begin(&self, call: DriverCall) -> DriverResult<()> {
        let (latency, hang) = {
            let mut s = self.state();
            if s.calls.len() == CALL_LOG_CAPACITY {
                s.calls.pop_front();
            }
            s.calls.push_back(call.clone());
            (s.latency, s.hang)
        };

        if hang {
            std::future::pending::<()>().await;
        }
        if !latency.is_zero() {
            time::sleep(latency).await;
        }

        let mut s = self.state();
        if let Some(exception) = s.fail_next.take() {
            return Err(exception);
        }
        if matches!(&s.fail_on, Some((name, _)) if *name == call.name()) {
            if let Some((_, exception)) = s.fail_on.take() {
                return Err(exception);
            }
        }
        Ok(())
    }

    fn start_motion(&self, ra: Hours, dec: Degrees) -> DriverResult<Duration> {
        check_ra(ra).map_err(|e| {
            DriverException::new(DriverException::INVALID_VALUE, &self.source, e.to_string())
        })?;
        check_dec(dec).map_err(|e| {
            DriverException::new(DriverException::INVALID_VALUE, &self.source, e.to_string())
        })?;

        let mut s = self.state();
        s.require_connected(&self.source)?;
        s.require_unparked(&self.source)?;

        let (from_ra, from_dec) = s.current_position();
        let from = astro_math::equatorial_to_vector(from_ra, from_dec);
        let to = astro_math::equatorial_to_vector(ra, dec);
        let duration = s.slew_duration(from, to);
        debug!("Simulated slew to {}h {}° taking {:?}", ra, dec, duration);

        if duration.is_zero() {
            s.motion = None;
            s.position = (ra, dec);
        } else {
            s.motion = Some(Motion {
                from,
                to,
                target: (ra, dec),
                start: Instant::now(),
                duration,
            });
        }
        Ok(duration)
    }
}

#[async_trait]
impl Driver for SimulatedMount {
    async fn is_connected(&self) -> DriverResult<bool> {
        self.begin(DriverCall::IsConnected).await?;
        Ok(self.state().connected)
    }

    async fn set_connected(&self, connected: bool) -> DriverResult<()> {
        self.begin(DriverCall::SetConnected(connected)).await?;
        let mut s = self.state();
        s.connected = connected && !s.refuse_connections;
        Ok(())
    }

    async fn is_parked(&self) -> DriverResult<bool> {
        self.begin(DriverCall::IsParked).await?;
        Ok(self.state().parked)
    }

    async fn is_tracking(&self) -> DriverResult<bool> {
        self.begin(DriverCall::IsTracking).await?;
        Ok(self.state().tracking)
    }

    async fn set_tracking(&self, tracking: bool) -> DriverResult<()> {
        self.begin(DriverCall::SetTracking(tracking)).await?;
        let mut s = self.state();
        s.require_connected(&self.source)?;
        if !s.capabilities.can_set_tracking {
            return Err(not_implemented(&self.source, "Tracking"));
        }
        s.require_unparked(&self.source)?;
        if !s.ignore_tracking {
            s.tracking = tracking;
        }
        Ok(())
    }

    async fn can_slew(&self) -> DriverResult<bool> {
        self.begin(DriverCall::CanSlew).await?;
        Ok(self.state().capabilities.can_slew)
    }

    async fn can_slew_async(&self) -> DriverResult<bool> {
        self.begin(DriverCall::CanSlewAsync).await?;
        Ok(self.state().capabilities.can_slew_async)
    }

    async fn can_set_tracking(&self) -> DriverResult<bool> {
        self.begin(DriverCall::CanSetTracking).await?;
        Ok(self.state().capabilities.can_set_tracking)
    }

    async fn can_unpark(&self) -> DriverResult<bool> {
        self.begin(DriverCall::CanUnpark).await?;
        Ok(self.state().capabilities.can_unpark)
    }

    async fn right_ascension(&self) -> DriverResult<Hours> {
        self.begin(DriverCall::RightAscension).await?;
        let mut s = self.state();
        s.require_connected(&self.source)?;
        Ok(s.current_position().0)
    }

    async fn declination(&self) -> DriverResult<Degrees> {
        self.begin(DriverCall::Declination).await?;
        let mut s = self.state();
        s.require_connected(&self.source)?;
        Ok(s.current_position().1)
    }

    async fn equatorial_system(&self) -> DriverResult<i32> {
        self.begin(DriverCall::EquatorialSystem).await?;
        Ok(self.state().equatorial_system)
    }

    async fn unpark(&self) -> DriverResult<()> {
        self.begin(DriverCall::Unpark).await?;
        let mut s = self.state();
        s.require_connected(&self.source)?;
        if !s.capabilities.can_unpark {
            return Err(not_implemented(&self.source, "Unpark"));
        }
        if !s.stuck_parked {
            s.parked = false;
        }
        Ok(())
    }

    async fn slew_to_coordinates(&self, ra: Hours, dec: Degrees) -> DriverResult<()> {
        self.begin(DriverCall::SlewToCoordinates(ra, dec)).await?;
        if !self.state().capabilities.can_slew {
            return Err(not_implemented(&self.source, "SlewToCoordinates"));
        }
        let duration = self.start_motion(ra, dec)?;
        if !duration.is_zero() {
            time::sleep(duration).await;
        }
        Ok(())
    }

    async fn slew_to_coordinates_async(&self, ra: Hours, dec: Degrees) -> DriverResult<()> {
        self.begin(DriverCall::SlewToCoordinatesAsync(ra, dec))
            .await?;
        if !self.state().capabilities.can_slew_async {
            return Err(not_implemented(&self.source, "SlewToCoordinatesAsync"));
        }
        self.start_motion(ra, dec)?;
        Ok(())
    }
}

/// Resolves [SIMULATOR_DRIVER_ID] (or another configured id) to a shared [SimulatedMount]
pub struct SimulatorFactory {
    driver_id: String,
    mount: SimulatedMount,
}

impl SimulatorFactory {
    pub fn new(mount: SimulatedMount) -> Self {
        Self::with_id(SIMULATOR_DRIVER_ID, mount)
    }

    pub fn with_id(driver_id: impl Into<String>, mut mount: SimulatedMount) -> Self {
        let driver_id = driver_id.into();
        mount.source = driver_id.clone();
        Self { driver_id, mount }
    }
}

impl DriverFactory for SimulatorFactory {
    fn create(&self, driver_id: &str, exceptions: ExceptionSink) -> ClientResult<Box<dyn Driver>> {
        if driver_id != self.driver_id {
            return Err(ClientError::DriverNotFound(driver_id.to_string()));
        }
        self.mount.attach(exceptions);
        Ok(Box::new(self.mount.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instant_settings() -> SimulatorSettings {
        SimulatorSettings {
            slew_rate: 0.,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_connect_and_read() {
        let mount = SimulatedMount::new(&instant_settings());
        mount.set_position(5., 10.);
        assert!(mount.right_ascension().await.is_err());

        mount.force_connected(true);
        assert_eq!(mount.right_ascension().await.unwrap(), 5.);
        assert_eq!(mount.declination().await.unwrap(), 10.);
    }

    #[tokio::test]
    async fn test_refused_connection() {
        let mount = SimulatedMount::new(&instant_settings());
        mount.refuse_connections(true);
        mount.set_connected(true).await.unwrap();
        assert!(!mount.is_connected().await.unwrap());
    }

    #[tokio::test]
    async fn test_slew_while_parked_fails() {
        let mount = SimulatedMount::new(&instant_settings());
        mount.force_connected(true);
        mount.set_parked(true);
        let e = mount.slew_to_coordinates_async(1., 2.).await.unwrap_err();
        assert_eq!(e.code, DriverException::INVALID_WHILE_PARKED);
    }

    #[tokio::test]
    async fn test_fail_on_is_one_shot() {
        let mount = SimulatedMount::new(&instant_settings());
        mount.fail_on("AtPark", DriverException::new(1, "sim", "boom"));
        assert!(mount.can_slew().await.is_ok());
        assert!(mount.is_parked().await.is_err());
        assert!(mount.is_parked().await.is_ok());
        assert_eq!(mount.count_calls("AtPark"), 2);
    }

    #[tokio::test]
    async fn test_call_log_is_bounded() {
        let mount = SimulatedMount::new(&instant_settings());
        for _ in 0..CALL_LOG_CAPACITY {
            mount.can_slew().await.unwrap();
        }
        mount.is_parked().await.unwrap();

        let calls = mount.calls();
        assert_eq!(calls.len(), CALL_LOG_CAPACITY);
        assert_eq!(calls.last(), Some(&DriverCall::IsParked));
        assert_eq!(mount.count_calls("CanSlew"), CALL_LOG_CAPACITY - 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_async_slew_moves_over_time() {
        let mount = SimulatedMount::new(&SimulatorSettings {
            slew_rate: 1.,
            ..Default::default()
        });
        mount.force_connected(true);
        mount.set_position(0., 0.);
        mount.slew_to_coordinates_async(0., 10.).await.unwrap();

        time::advance(Duration::from_secs(5)).await;
        let (_, dec) = mount.position_now();
        assert!((4.0..6.0).contains(&dec), "dec {}", dec);

        time::advance(Duration::from_secs(6)).await;
        assert_eq!(mount.position_now(), (0., 10.));
    }

    #[test]
    fn test_factory_resolves_only_its_id() {
        let factory = SimulatorFactory::new(SimulatedMount::default());
        let (sink, _rx) = crate::telescope_control::exception_channel();
        assert!(factory.create(SIMULATOR_DRIVER_ID, sink.clone()).is_ok());
        assert!(matches!(
            factory.create("ASCOM.Missing.Telescope", sink),
            Err(ClientError::DriverNotFound(_))
        ));
    }
}
