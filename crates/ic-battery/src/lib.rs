pub mod convert;
pub mod doctor;
pub mod monitor;
pub mod sensor;
pub mod sim;
pub mod smoothing;

use anyhow::Result;

/// One sample from a telemetry source. `None` leaves the stored value alone.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Reading {
    pub battery_percent: Option<f64>,
    pub charging_current_ma: Option<f64>,
}

/// Anything the publisher loop can poll: real hardware or a generator.
pub trait TelemetrySource: Send {
    fn poll(&mut self) -> Result<Reading>;

    fn describe(&self) -> String;
}
