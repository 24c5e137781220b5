use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Well-known name the car information service claims on the bus.
pub const SERVICE_NAME: &str = "org.team7.IC";
pub const OBJECT_PATH: &str = "/CarInformation";
pub const INTERFACE_NAME: &str = "org.team7.IC.Interface";
/// Broadcast carrying the JSON snapshot.
pub const SIGNAL_NAME: &str = "DataReceived";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BusKind {
    #[default]
    Session,
    System,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusAddress {
    pub kind: BusKind,
    pub service_name: String,
    pub object_path: String,
}

impl Default for BusAddress {
    fn default() -> Self {
        Self {
            kind: BusKind::Session,
            service_name: SERVICE_NAME.to_string(),
            object_path: OBJECT_PATH.to_string(),
        }
    }
}

/// Bounded retry with a fixed delay between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub retry_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_retries: 10, retry_delay_ms: 2000 }
    }
}

impl RetryPolicy {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}
