use tracing::{debug, info};

use crate::astro_math::Vec3;
use crate::telescope_control::TelescopeClient;
use crate::util::*;

#[derive(Debug, Clone, PartialEq)]
pub enum GotoOutcome {
    SlewStarted { ra: Hours, dec: Degrees },
    SlewCompleted { ra: Hours, dec: Degrees },
    Aborted(ClientError),
}

impl TelescopeClient {
    /// Points the telescope at `target`, a canonical (J2000) direction.
    /// Failures are only logged, faults additionally reach the error channel.
    pub async fn telescope_goto(&self, target: Vec3) {
        self.goto(target).await;
    }

    pub(in crate::telescope_control) async fn goto(&self, target: Vec3) -> GotoOutcome {
        let outcome = match self.try_goto(target).await {
            Ok(outcome) => outcome,
            Err(e) => GotoOutcome::Aborted(e),
        };

        match &outcome {
            GotoOutcome::Aborted(e) => debug!("{}: goto aborted, {}", self.name, e),
            outcome => info!("{}: {:?}", self.name, outcome),
        }
        outcome
    }

    async fn try_goto(&self, target: Vec3) -> ClientResult<GotoOutcome> {
        self.session.ensure_connected().await?;
        self.ensure_unparked().await?;
        self.ensure_tracking().await?;

        let (ra, dec) = self.transform.canonical_to_driver(target, self.clock.now());

        if self.session.can_slew_async().await? {
            self.session.slew_async(ra, dec).await?;
            Ok(GotoOutcome::SlewStarted { ra, dec })
        } else if self.session.can_slew().await? {
            self.session.slew_sync(ra, dec).await?;
            Ok(GotoOutcome::SlewCompleted { ra, dec })
        } else {
            Err(ClientError::CapabilityDenied("slew"))
        }
    }

    async fn ensure_unparked(&self) -> ClientResult<()> {
        if !self.session.is_parked().await? {
            return Ok(());
        }
        if !self.session.can_unpark().await? {
            return Err(ClientError::CapabilityDenied("unpark"));
        }

        self.session.unpark().await?;
        // Some drivers accept Unpark and stay parked
        if self.session.is_parked().await? {
            Err(ClientError::Parked)
        } else {
            Ok(())
        }
    }

    async fn ensure_tracking(&self) -> ClientResult<()> {
        if self.session.is_tracking().await? {
            return Ok(());
        }
        if !self.session.can_set_tracking().await? {
            return Err(ClientError::CapabilityDenied("set tracking"));
        }

        if self.session.set_tracking(true).await? {
            Ok(())
        } else {
            Err(ClientError::CapabilityDenied("tracking"))
        }
    }
}
