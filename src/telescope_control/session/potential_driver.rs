use crate::telescope_control::driver::Driver;
use crate::util::*;

pub enum PotentialDriver {
    Ready(Box<dyn Driver>),
    TornDown,
}

impl PotentialDriver {
    pub fn is_usable(&self) -> bool {
        match self {
            PotentialDriver::Ready(_) => true,
            PotentialDriver::TornDown => false,
        }
    }

    pub fn get(&self) -> ClientResult<&dyn Driver> {
        match self {
            Self::Ready(d) => Ok(d.as_ref()),
            Self::TornDown => Err(ClientError::NotUsable),
        }
    }

    /// Releases the handle. Only the first call gets it back.
    pub fn take(&mut self) -> Option<Box<dyn Driver>> {
        match std::mem::replace(self, Self::TornDown) {
            Self::Ready(d) => Some(d),
            Self::TornDown => None,
        }
    }
}

impl From<ClientResult<Box<dyn Driver>>> for PotentialDriver {
    fn from(result: ClientResult<Box<dyn Driver>>) -> Self {
        match result {
            Ok(d) => Self::Ready(d),
            Err(_) => Self::TornDown,
        }
    }
}
