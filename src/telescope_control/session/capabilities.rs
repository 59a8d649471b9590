/// Capability flags as reported by the driver at one point in time.
/// Never kept across cycles, the device can change them at any time.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct CapabilitySnapshot {
    pub can_slew: bool,
    pub can_slew_async: bool,
    pub can_set_tracking: bool,
    pub can_unpark: bool,
}

impl CapabilitySnapshot {
    /// Whether the driver accepts goto commands at all
    pub fn can_goto(&self) -> bool {
        self.can_slew || self.can_slew_async
    }
}
