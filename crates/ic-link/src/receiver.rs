use anyhow::{Context, Result};
use ic_proto::telemetry::DataPayload;
use time::OffsetDateTime;

/// Current above which the dashboard shows the charging icon.
pub const CHARGING_ICON_MA: f64 = 1000.0;

/// What the dashboard currently displays, rebuilt from `DataReceived`.
#[derive(Debug, Clone, Default)]
pub struct DashboardState {
    pub battery_capacity: f64,
    pub charging_current: f64,
    pub left_turn_signal: bool,
    pub right_turn_signal: bool,
    pub last_update: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Changes {
    pub battery: bool,
    pub current: bool,
    pub turn_signals: bool,
}

impl Changes {
    pub fn any(&self) -> bool {
        self.battery || self.current || self.turn_signals
    }
}

impl DashboardState {
    /// Takes the keys present in `p`; absent keys leave the display alone.
    pub fn apply(&mut self, p: &DataPayload) -> Changes {
        let mut c = Changes::default();
        if let Some(b) = p.battery_capacity {
            c.battery = b != self.battery_capacity;
            self.battery_capacity = b;
        }
        if let Some(ma) = p.charging_current {
            c.current = ma != self.charging_current;
            self.charging_current = ma;
        }
        let left = p.left_turn_signal.unwrap_or(self.left_turn_signal);
        let right = p.right_turn_signal.unwrap_or(self.right_turn_signal);
        c.turn_signals = (left, right) != (self.left_turn_signal, self.right_turn_signal);
        self.left_turn_signal = left;
        self.right_turn_signal = right;
        c
    }

    /// Parses a raw signal body. Bad JSON leaves the state untouched.
    pub fn handle_json(&mut self, json: &str) -> Result<Changes> {
        let payload = DataPayload::from_json(json)
            .with_context(|| format!("parse DataReceived payload {:?}", json))?;
        let changes = self.apply(&payload);
        self.last_update = Some(OffsetDateTime::now_utc());
        Ok(changes)
    }

    pub fn charging_icon_visible(&self) -> bool {
        self.charging_current > CHARGING_ICON_MA
    }
}
