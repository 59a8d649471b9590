use chrono::{DateTime, Utc};

use crate::astro_math::{self, Vec3};
use crate::telescope_control::TelescopeClient;
use crate::util::*;

impl TelescopeClient {
    /// Interpolated canonical (J2000) direction at `at`
    pub async fn get_canonical_position(&self, at: DateTime<Utc>) -> ClientResult<Vec3> {
        self.positions.read().await.get(at)
    }

    /// Where the telescope is now, as far as the last samples tell.
    /// Looks back one refresh interval since that is how stale a fresh sample can be.
    pub async fn get_j2000_position(&self) -> ClientResult<Vec3> {
        self.get_canonical_position(self.clock.now() - self.refresh_interval)
            .await
    }

    pub async fn get_j2000_coordinates(&self) -> ClientResult<(Hours, Degrees)> {
        Ok(astro_math::vector_to_equatorial(
            self.get_j2000_position().await?,
        ))
    }

    pub async fn position_sample_count(&self) -> usize {
        self.positions.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use crate::config::Config;
    use crate::telescope_control::test_util::*;

    use super::*;

    #[tokio::test]
    async fn test_no_data() {
        let mount = instant_mount();
        let client = create_client(None, &mount, manual_clock()).await;
        assert_eq!(
            client.get_j2000_position().await,
            Err(ClientError::NoDataAvailable)
        );
    }

    #[tokio::test]
    async fn test_interpolates_between_polls() {
        let mount = instant_mount();
        let clock = manual_clock();
        let mut config = Config::default();
        config.communication.refresh_interval_millis = 1000;
        let client = create_client(Some(config), &mount, clock.clone()).await;
        let start = clock.now();

        mount.set_position(1., 0.);
        client.perform_communication().await;
        clock.advance(Duration::seconds(1));
        mount.set_position(2., 0.);
        client.perform_communication().await;

        let v = client
            .get_canonical_position(start + Duration::milliseconds(500))
            .await
            .unwrap();
        let (ra, dec) = astro_math::vector_to_equatorial(v);
        assert_float_absolute_eq!(ra, 1.5, 1E-9);
        assert_float_absolute_eq!(dec, 0., 1E-9);

        // one refresh interval behind now is the first sample
        let (ra, _) = client.get_j2000_coordinates().await.unwrap();
        assert_float_absolute_eq!(ra, 1., 1E-9);
    }
}
