use tracing::{debug, trace};

use crate::telescope_control::TelescopeClient;
use crate::util::*;

/// What one communication tick did
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// The driver is gone for good
    Stalled,
    /// Not connected and the reconnect attempt didn't take
    Disconnected,
    Parked,
    /// Too early since the last sample
    NotDue,
    Polled,
    /// A call failed, the reason was already reported
    Faulted(ClientError),
}

impl TelescopeClient {
    /// Whether ticking this client can do anything at all
    pub async fn prepare_communication(&self) -> bool {
        self.is_usable().await
    }

    /// One tick of the polling loop. Never fails, problems are logged.
    pub async fn perform_communication(&self) -> CycleOutcome {
        let outcome = match self.communicate().await {
            Ok(outcome) => outcome,
            Err(ClientError::NotUsable) => CycleOutcome::Stalled,
            Err(ClientError::NotConnected) => CycleOutcome::Disconnected,
            Err(e) => CycleOutcome::Faulted(e),
        };

        match &outcome {
            CycleOutcome::Polled | CycleOutcome::NotDue | CycleOutcome::Stalled => {}
            CycleOutcome::Faulted(e) => debug!("{}: communication failed: {}", self.name, e),
            other => trace!("{}: skipped poll, {:?}", self.name, other),
        }
        outcome
    }

    async fn communicate(&self) -> ClientResult<CycleOutcome> {
        self.session.ensure_connected().await?;

        if self.session.is_parked().await? {
            return Ok(CycleOutcome::Parked);
        }

        // Held until the poll is done so overlapping ticks can't both be due
        let mut next_poll = self.next_poll.write().await;
        let now = self.clock.now();
        if now < *next_poll {
            return Ok(CycleOutcome::NotDue);
        }

        // The position is valid at the time it was asked for
        let server_time = now;
        let (ra, dec) = self.session.reported_position().await?;
        let direction = self.transform.reported_to_canonical(ra, dec, server_time);

        let client_time = self.clock.now();
        self.positions
            .write()
            .await
            .add(direction, client_time, server_time);
        *next_poll = now + self.refresh_interval;

        trace!("{}: position {}h {}°", self.name, ra, dec);
        Ok(CycleOutcome::Polled)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use crate::astro_math;
    use crate::config::Config;
    use crate::telescope_control::frame::{PrecessionFrame, SkyFrame};
    use crate::telescope_control::test_util::*;

    use super::*;

    fn config(refresh_interval_millis: u64) -> Config {
        let mut config = Config::default();
        config.communication.refresh_interval_millis = refresh_interval_millis;
        config
    }

    #[tokio::test]
    async fn test_first_tick_polls() {
        let mount = instant_mount();
        let client = create_client(None, &mount, manual_clock()).await;
        assert!(client.prepare_communication().await);
        assert_eq!(client.perform_communication().await, CycleOutcome::Polled);
        assert_eq!(client.position_sample_count().await, 1);
    }

    #[tokio::test]
    async fn test_rate_limit() {
        let mount = instant_mount();
        let clock = manual_clock();
        let client = create_client(Some(config(1000)), &mount, clock.clone()).await;

        // 10 ms ticks over 5 s
        let mut polls = 0;
        for _ in 0..500 {
            if client.perform_communication().await == CycleOutcome::Polled {
                polls += 1;
            }
            clock.advance(Duration::milliseconds(10));
        }
        assert_eq!(polls, 5);
        assert_eq!(mount.count_calls("RightAscension"), 5);
        assert_eq!(mount.count_calls("Declination"), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlapping_ticks_poll_once() {
        let mount = instant_mount();
        let client = create_client(Some(config(1000)), &mount, manual_clock()).await;
        mount.set_latency(std::time::Duration::from_millis(5));

        let (a, b) = tokio::join!(
            client.perform_communication(),
            client.perform_communication()
        );
        let mut outcomes = vec![a, b];
        outcomes.sort_by_key(|o| o == &CycleOutcome::Polled);
        assert_eq!(outcomes, vec![CycleOutcome::NotDue, CycleOutcome::Polled]);
        assert_eq!(client.position_sample_count().await, 1);
        assert_eq!(mount.count_calls("RightAscension"), 1);
    }

    #[tokio::test]
    async fn test_instantaneous_equinox_samples_are_canonical() {
        let mount = instant_mount();
        mount.set_position(3.25, 41.5);
        let clock = manual_clock();
        let mut config = Config::default();
        config.telescope.equinox = EquinoxMode::InstantaneousEquinox;
        let client = create_client(Some(config), &mount, clock.clone()).await;

        assert_eq!(client.perform_communication().await, CycleOutcome::Polled);

        let expected = PrecessionFrame
            .to_standard_epoch(astro_math::equatorial_to_vector(3.25, 41.5), clock.now());
        let positions = client.positions.read().await;
        let sample = positions.latest().unwrap();
        assert_float_absolute_eq!(sample.direction.x, expected.x, 1E-12);
        assert_float_absolute_eq!(sample.direction.y, expected.y, 1E-12);
        assert_float_absolute_eq!(sample.direction.z, expected.z, 1E-12);
        // precession of date moves the direction away from the reported one
        let reported = astro_math::equatorial_to_vector(3.25, 41.5);
        assert!(sample.direction.angle_to(reported) > 1E-4);
    }

    #[tokio::test]
    async fn test_parked_mount_is_not_read() {
        let mount = instant_mount();
        mount.set_parked(true);
        let client = create_client(None, &mount, manual_clock()).await;

        assert_eq!(client.perform_communication().await, CycleOutcome::Parked);
        assert_eq!(mount.count_calls("RightAscension"), 0);
        assert_eq!(client.position_sample_count().await, 0);
    }

    #[tokio::test]
    async fn test_refused_connection_is_retried() {
        let mount = instant_mount();
        mount.refuse_connections(true);
        let client = create_client(None, &mount, manual_clock()).await;

        assert_eq!(
            client.perform_communication().await,
            CycleOutcome::Disconnected
        );
        assert_eq!(
            client.perform_communication().await,
            CycleOutcome::Disconnected
        );
        assert_eq!(mount.count_calls("Connected"), 6);
        assert!(client.is_usable().await);

        mount.refuse_connections(false);
        assert_eq!(client.perform_communication().await, CycleOutcome::Polled);
    }

    #[tokio::test]
    async fn test_unusable_client_does_nothing() {
        let mount = instant_mount();
        let client = create_client(None, &mount, manual_clock()).await;
        client.session.teardown().await;

        assert!(!client.prepare_communication().await);
        assert_eq!(client.perform_communication().await, CycleOutcome::Stalled);
        assert!(mount.calls().is_empty());
    }

    #[tokio::test]
    async fn test_server_time_is_request_time() {
        let mount = instant_mount();
        let clock = manual_clock();
        let start = clock.now();
        let client = create_client(None, &mount, clock).await;

        client.perform_communication().await;
        let positions = client.positions.read().await;
        let sample = positions.latest().unwrap();
        assert_eq!(sample.server_time, start);
        assert!(sample.client_time >= sample.server_time);
    }

    #[tokio::test]
    async fn test_failed_read_faults_session() {
        let mount = instant_mount();
        let client = create_client(None, &mount, manual_clock()).await;
        let mut errors = client.subscribe_errors();

        mount.fail_on(
            "RightAscension",
            DriverException::new(0x500, "sim", "lost serial port"),
        );
        assert!(matches!(
            client.perform_communication().await,
            CycleOutcome::Faulted(ClientError::DriverFault(_))
        ));
        assert!(!client.is_usable().await);
        assert_eq!(errors.recv().await.unwrap().telescope, "Telescope");
    }
}
