use serde::{Deserialize, Serialize};

/// The frame a driver reports and accepts equatorial coordinates in
#[derive(Debug, Default, Eq, PartialEq, Copy, Clone, Serialize, Deserialize)]
pub enum EquinoxMode {
    /// Fixed reference epoch (J2000), the client's canonical frame
    #[default]
    #[serde(alias = "J2000")]
    StandardEpoch,
    /// Equator and equinox of date (JNow)
    #[serde(alias = "JNow")]
    InstantaneousEquinox,
}

impl EquinoxMode {
    pub fn needs_conversion(&self) -> bool {
        matches!(self, Self::InstantaneousEquinox)
    }
}
