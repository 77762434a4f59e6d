//! Controller tuning knobs.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration shared by every [`Controller`](crate::Controller) built from one provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Page size requested from list endpoints.
    pub page_size: u32,
    /// How many times the read-after-create is attempted while the new object is not
    /// yet visible.
    pub vanished_read_attempts: u32,
    /// Delay between those attempts.
    #[serde(with = "millis")]
    pub vanished_backoff: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            page_size: 20,
            vanished_read_attempts: 3,
            vanished_backoff: Duration::from_millis(500),
        }
    }
}

impl ControllerConfig {
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_vanished_read_attempts(mut self, attempts: u32) -> Self {
        self.vanished_read_attempts = attempts.max(1);
        self
    }

    pub fn with_vanished_backoff(mut self, backoff: Duration) -> Self {
        self.vanished_backoff = backoff;
        self
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
