use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};

use super::EquinoxMode;

/// Value of a driver's integer `EquatorialSystem` property
#[derive(
    Debug, Eq, PartialEq, Copy, Clone, Serialize, Deserialize, IntoPrimitive, TryFromPrimitive,
)]
#[repr(i32)]
pub enum EquatorialCoordinateType {
    Other = 0,
    Topocentric = 1,
    J2000 = 2,
    J2050 = 3,
    B1950 = 4,
}

impl EquatorialCoordinateType {
    /// The equinox mode this coordinate type corresponds to, if the client supports it
    pub fn equinox_mode(&self) -> Option<EquinoxMode> {
        match self {
            Self::Topocentric => Some(EquinoxMode::InstantaneousEquinox),
            Self::J2000 => Some(EquinoxMode::StandardEpoch),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_driver_value() {
        assert_eq!(
            EquatorialCoordinateType::try_from(1).ok(),
            Some(EquatorialCoordinateType::Topocentric)
        );
        assert_eq!(
            EquatorialCoordinateType::try_from(2).ok(),
            Some(EquatorialCoordinateType::J2000)
        );
        assert!(EquatorialCoordinateType::try_from(9).is_err());
        assert_eq!(i32::from(EquatorialCoordinateType::B1950), 4);
    }

    #[test]
    fn test_equinox_mode() {
        assert_eq!(
            EquatorialCoordinateType::J2000.equinox_mode(),
            Some(EquinoxMode::StandardEpoch)
        );
        assert_eq!(EquatorialCoordinateType::J2050.equinox_mode(), None);
    }
}
