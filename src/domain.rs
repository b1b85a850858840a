use serde::{Deserialize, Serialize};

/// latest reading received from the device
///
/// all three fields are kept as text exactly as they arrived on the wire,
/// including the coordinates.
#[derive(Clone, Default, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct LatestReading {
    /// free text status, empty means "no active condition"
    #[serde(default)]
    pub condition: String,

    /// latitude in decimal degrees
    #[serde(default)]
    pub lat: String,

    /// longitude in decimal degrees
    #[serde(default)]
    pub lon: String,
}

impl LatestReading {
    pub fn empty() -> Self {
        Self::default()
    }

    /// both coordinates are present
    pub fn is_complete(&self) -> bool {
        !self.lat.is_empty() && !self.lon.is_empty()
    }
}
