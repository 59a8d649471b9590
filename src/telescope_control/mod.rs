pub use driver::*;
pub use fault::{ErrorEvents, FaultReporter, TelescopeErrorEvent};
pub use frame::*;
pub use interpolated_position::*;
pub use session::{CapabilitySnapshot, DriverSession, Timeouts};
pub use telescope_client::TelescopeClient;

pub use commands::communication::CycleOutcome;
pub use commands::goto::GotoOutcome;

mod commands {
    pub mod communication;
    pub mod goto;
    pub mod pointing_pos;
}
mod driver;
mod fault;
mod frame;
mod interpolated_position;
mod session;
mod telescope_client;
#[cfg(test)]
pub(in crate::telescope_control) mod test_util;
