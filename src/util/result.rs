use std::error::Error as StdError;
use std::fmt::{Display, Formatter};
use std::{fmt, result};

use thiserror::Error;

use crate::{Degrees, Hours};

pub type ClientResult<T> = result::Result<T, ClientError>;
pub type DriverResult<T> = result::Result<T, DriverException>;

/// Exception raised by a telescope driver, either as the result of a call or out of band
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverException {
    pub code: i32,
    pub source: String,
    pub description: String,
    pub help: String,
}

impl DriverException {
    pub const NOT_IMPLEMENTED: i32 = 0x400;
    pub const INVALID_VALUE: i32 = 0x401;
    pub const NOT_CONNECTED: i32 = 0x407;
    pub const INVALID_WHILE_PARKED: i32 = 0x408;
    /// Raised by the client itself when a driver call never returns
    pub const TIMEOUT: i32 = 0x500;

    pub fn new(code: i32, source: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            code,
            source: source.into(),
            description: description.into(),
            help: String::new(),
        }
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = help.into();
        self
    }

    pub fn timeout(source: impl Into<String>, operation: &str, millis: u128) -> Self {
        Self::new(
            Self::TIMEOUT,
            source,
            format!("{} did not complete within {}ms", operation, millis),
        )
    }
}

impl Display for DriverException {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "driver exception {:#x} from {}: {}",
            self.code, self.source, self.description
        )
    }
}

impl StdError for DriverException {}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClientError {
    /// The driver identifier did not resolve to a driver
    #[error("Driver \"{0}\" not found")]
    DriverNotFound(String),

    /// The driver handle was released, or never created
    #[error("Telescope driver is not available")]
    NotUsable,

    #[error("Telescope not connected")]
    NotConnected,

    /// The driver lacks a capability the operation requires
    #[error("Telescope can't {0}")]
    CapabilityDenied(&'static str),

    #[error("Telescope is parked")]
    Parked,

    #[error(transparent)]
    DriverFault(#[from] DriverException),

    #[error("No position data available")]
    NoDataAvailable,

    #[error("Invalid value: {0}")]
    InvalidValue(String),
}

impl ClientError {
    pub fn is_fault(&self) -> bool {
        matches!(self, Self::DriverFault(_))
    }
}

pub fn check_dec(dec: Degrees) -> ClientResult<()> {
    if (-90. ..=90.).contains(&dec) {
        Ok(())
    } else {
        Err(ClientError::InvalidValue(format!(
            "Declination of {} is not valid",
            dec
        )))
    }
}

pub fn check_ra(ra: Hours) -> ClientResult<()> {
    if (0. ..24.).contains(&ra) {
        Ok(())
    } else {
        Err(ClientError::InvalidValue(format!(
            "Right Ascension of {} is not valid",
            ra
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exception_display() {
        let e = DriverException::new(0x401, "ASCOM.Simulator.Telescope", "Invalid value");
        assert_eq!(
            e.to_string(),
            "driver exception 0x401 from ASCOM.Simulator.Telescope: Invalid value"
        );
    }

    #[test]
    fn test_fault_from_exception() {
        let e: ClientError = DriverException::new(1, "src", "boom").into();
        assert!(e.is_fault());
        assert!(!ClientError::NotConnected.is_fault());
    }

    #[test]
    fn test_check_coordinates() {
        assert!(check_ra(0.).is_ok());
        assert!(check_ra(24.).is_err());
        assert!(check_dec(-90.).is_ok());
        assert!(check_dec(90.5).is_err());
    }
}
