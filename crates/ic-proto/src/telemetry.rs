use serde::{Deserialize, Serialize};

/// Latest known values held by the service. Reset to zeros at startup.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    #[serde(rename = "battery_capacity")]
    pub battery_percent: f64,
    #[serde(rename = "charging_current")]
    pub charging_current_ma: f64,
    pub left_turn_signal: bool,
    pub right_turn_signal: bool,
}

impl TelemetrySnapshot {
    /// Flat JSON object carried by the `DataReceived` signal.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Decoding side of `DataReceived`. Older emitters only send
/// `battery_capacity`, so every key is optional.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DataPayload {
    pub battery_capacity: Option<f64>,
    pub charging_current: Option<f64>,
    pub left_turn_signal: Option<bool>,
    pub right_turn_signal: Option<bool>,
}

impl DataPayload {
    pub fn from_json(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }
}

impl From<TelemetrySnapshot> for DataPayload {
    fn from(s: TelemetrySnapshot) -> Self {
        Self {
            battery_capacity: Some(s.battery_percent),
            charging_current: Some(s.charging_current_ma),
            left_turn_signal: Some(s.left_turn_signal),
            right_turn_signal: Some(s.right_turn_signal),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_serializes_with_wire_keys() {
        let s = TelemetrySnapshot {
            battery_percent: 73.2,
            charging_current_ma: 1450.0,
            left_turn_signal: false,
            right_turn_signal: true,
        };
        assert_eq!(
            s.to_json().unwrap(),
            r#"{"battery_capacity":73.2,"charging_current":1450.0,"left_turn_signal":false,"right_turn_signal":true}"#
        );
    }

    #[test]
    fn payload_accepts_battery_only_emitters() {
        let p = DataPayload::from_json(r#"{"battery_capacity": 50}"#).unwrap();
        assert_eq!(p.battery_capacity, Some(50.0));
        assert_eq!(p.charging_current, None);
        assert_eq!(p.left_turn_signal, None);
    }

    #[test]
    fn malformed_payload_is_an_error() {
        assert!(DataPayload::from_json("{battery_capacity: ").is_err());
        assert!(DataPayload::from_json(r#"{"battery_capacity":"full"}"#).is_err());
    }

    #[test]
    fn zeroed_snapshot_at_startup() {
        let p = DataPayload::from(TelemetrySnapshot::default());
        assert_eq!(p.battery_capacity, Some(0.0));
        assert_eq!(p.right_turn_signal, Some(false));
    }
}
