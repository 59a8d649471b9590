use std::sync::Arc;

use tokio::sync::{broadcast, watch, RwLock};
use tracing::{debug, error};

use super::driver::{Driver, ExceptionReceiver};
use super::session::PotentialDriver;
use crate::util::*;

const ERROR_CHANNEL_CAPACITY: usize = 16;

/// Error published to the application when a driver fault ends a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelescopeErrorEvent {
    pub telescope: String,
    pub message: String,
}

pub type ErrorEvents = broadcast::Receiver<TelescopeErrorEvent>;

/// Turns driver exceptions into a torn down session plus one published error event
#[derive(Clone)]
pub struct FaultReporter {
    telescope: String,
    driver: Arc<RwLock<PotentialDriver>>,
    events: broadcast::Sender<TelescopeErrorEvent>,
    released: Arc<watch::Sender<bool>>,
}

impl FaultReporter {
    pub fn new(telescope: impl Into<String>, driver: Arc<RwLock<PotentialDriver>>) -> Self {
        let (events, _) = broadcast::channel(ERROR_CHANNEL_CAPACITY);
        let (released, _) = watch::channel(false);
        Self {
            telescope: telescope.into(),
            driver,
            events,
            released: Arc::new(released),
        }
    }

    pub fn subscribe(&self) -> ErrorEvents {
        self.events.subscribe()
    }

    pub fn format_message(&self, exception: &DriverException) -> String {
        let mut message = format!(
            "{}: ASCOM driver error:\nCode: {}\nSource: {}\nDescription: {}",
            self.telescope, exception.code, exception.source, exception.description
        );
        if !exception.help.is_empty() {
            message.push_str("\nHelp: ");
            message.push_str(&exception.help);
        }
        message
    }

    /// Takes the handle out of the session. Only the first call gets it back.
    pub async fn release(&self) -> Option<Box<dyn Driver>> {
        let released = self.driver.write().await.take();
        self.released.send_replace(true);
        released
    }

    /// Tears the session down, then publishes the error.
    /// Exceptions arriving for an already released driver are dropped.
    pub async fn report(&self, exception: DriverException) -> ClientError {
        let message = self.format_message(&exception);

        let released = self.release().await;
        if released.is_none() {
            debug!(
                "Ignoring exception from already released driver: {}",
                exception
            );
            return ClientError::DriverFault(exception);
        }
        // Dropped before anyone hears about the fault
        drop(released);

        error!("{}", message);
        let event = TelescopeErrorEvent {
            telescope: self.telescope.clone(),
            message,
        };
        if self.events.send(event).is_err() {
            debug!("No subscribers for telescope errors");
        }

        ClientError::DriverFault(exception)
    }

    /// Handles exceptions the driver raises outside of any call until the driver is released
    pub async fn listen(self, mut exceptions: ExceptionReceiver) {
        let mut released = self.released.subscribe();
        loop {
            if *released.borrow() {
                break;
            }
            tokio::select! {
                exception = exceptions.recv() => match exception {
                    Some(exception) => {
                        self.report(exception).await;
                    }
                    None => break,
                },
                changed = released.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
        debug!("Stopped listening for {} driver exceptions", self.telescope);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time;

    use super::*;
    use crate::simulator::SimulatedMount;
    use crate::telescope_control::exception_channel;

    fn torn_down_reporter() -> FaultReporter {
        FaultReporter::new(
            "Backyard",
            Arc::new(RwLock::new(PotentialDriver::TornDown)),
        )
    }

    #[test]
    fn test_format_message() {
        let reporter = torn_down_reporter();
        let e = DriverException::new(1031, "ASCOM.Simulator.Telescope", "Not connected");
        assert_eq!(
            reporter.format_message(&e),
            "Backyard: ASCOM driver error:\nCode: 1031\nSource: ASCOM.Simulator.Telescope\nDescription: Not connected"
        );

        let e = e.with_help("Check the cable");
        assert!(reporter.format_message(&e).ends_with("\nHelp: Check the cable"));
    }

    fn live_reporter() -> FaultReporter {
        let mount: Box<dyn Driver> = Box::new(SimulatedMount::default());
        FaultReporter::new(
            "Backyard",
            Arc::new(RwLock::new(PotentialDriver::Ready(mount))),
        )
    }

    #[tokio::test]
    async fn test_listener_stops_after_call_fault() {
        let reporter = live_reporter();
        let (sink, exceptions) = exception_channel();
        let listener = tokio::spawn(reporter.clone().listen(exceptions));

        reporter
            .report(DriverException::new(1, "src", "in call"))
            .await;
        assert!(time::timeout(Duration::from_secs(1), listener).await.is_ok());
        // the sink outlives the listener
        assert!(sink.send(DriverException::new(2, "src", "late")).is_err());
    }

    #[tokio::test]
    async fn test_listener_stops_after_out_of_band_fault() {
        let reporter = live_reporter();
        let mut events = reporter.subscribe();
        let (sink, exceptions) = exception_channel();
        let listener = tokio::spawn(reporter.clone().listen(exceptions));

        sink.send(DriverException::new(1, "src", "raised")).unwrap();
        assert!(time::timeout(Duration::from_secs(1), listener).await.is_ok());
        assert!(events.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_listener_stops_on_release() {
        let reporter = live_reporter();
        let (_sink, exceptions) = exception_channel();
        let listener = tokio::spawn(reporter.clone().listen(exceptions));

        assert!(reporter.release().await.is_some());
        assert!(reporter.release().await.is_none());
        assert!(time::timeout(Duration::from_secs(1), listener).await.is_ok());
    }

    #[tokio::test]
    async fn test_report_without_driver_emits_nothing() {
        let reporter = torn_down_reporter();
        let mut events = reporter.subscribe();
        let result = reporter
            .report(DriverException::new(1, "src", "late"))
            .await;
        assert!(result.is_fault());
        assert!(matches!(
            events.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }
}
