use std::sync::Arc;

use ascom_telescope_client::astro_math;
use ascom_telescope_client::config::Config;
use ascom_telescope_client::simulator::{SimulatedMount, SimulatorFactory};
use ascom_telescope_client::telescope_control::{PrecessionFrame, TelescopeClient};
use ascom_telescope_client::util::SystemClock;
use eyre::WrapErr;
use tokio::sync::broadcast::error::RecvError;
use tokio::time;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const REPORT_EVERY_TICKS: u64 = 40;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config: Config =
        confy::load_path("config.toml").wrap_err("Couldn't parse configuration")?;

    let mount = SimulatedMount::new(&config.simulator);
    let factory = SimulatorFactory::new(mount);
    let client = TelescopeClient::new(
        &config,
        &factory,
        Arc::new(PrecessionFrame),
        Arc::new(SystemClock::new()),
    )
    .await;
    if !client.is_usable().await {
        eyre::bail!(
            "{} has no usable driver {}",
            client.name(),
            client.driver_id()
        );
    }

    let mut errors = client.subscribe_errors();
    let mut interval = time::interval(config.communication.tick());
    let mut goto = config.initial_goto;
    let mut ticks: u64 = 0;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                if !client.prepare_communication().await {
                    warn!("{} is no longer usable", client.name());
                    break;
                }
                client.perform_communication().await;

                if let Some(target) = goto.take() {
                    let v = astro_math::equatorial_to_vector(target.right_ascension, target.declination);
                    client.telescope_goto(v).await;
                }

                ticks += 1;
                if ticks % REPORT_EVERY_TICKS == 0 {
                    match client.get_j2000_coordinates().await {
                        Ok((ra, dec)) => info!("{} at RA {:.4}h Dec {:.4}°", client.name(), ra, dec),
                        Err(e) => info!("{}: {}", client.name(), e),
                    }
                }
            }
            event = errors.recv() => match event {
                Ok(event) => error!("{}", event.message),
                Err(RecvError::Lagged(skipped)) => warn!("Missed {} error events", skipped),
                Err(RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        }
    }

    client.shutdown().await;
    Ok(())
}
