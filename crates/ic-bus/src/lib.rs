pub mod doctor;
pub mod publisher;
pub mod server;
pub mod service;
pub mod store;

use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Power monitor on the car (INA219 via hwmon).
    #[default]
    Hwmon,
    /// Bench waveform, no hardware needed.
    Waveform,
    /// Charging-icon test sequence.
    Charging,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PublisherConfig {
    pub source: SourceKind,

    /// Poll period. When unset: 10ms for the raw sensor, `sim_step_ms` for
    /// the synthetic sources so they run in real time.
    pub interval_ms: Option<u64>,

    /// Wait before the first sample so the service is on the bus first.
    pub startup_delay_ms: u64,

    /// Cells in series; pack voltage is divided by this before lookup.
    pub cells: u32,

    /// EMA on raw voltage. Omit to disable.
    pub ema_alpha: Option<f64>,

    /// Max-of-last-N window on the percentage. Omit to disable.
    pub window: Option<usize>,

    /// Fixed hwmon directory. When unset the device is found by `hwmon_chip`.
    pub hwmon_dir: Option<String>,
    pub hwmon_chip: String,

    /// Simulated time advanced per synthetic sample.
    pub sim_step_ms: u64,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            source: SourceKind::Hwmon,
            interval_ms: None,
            startup_delay_ms: 2000,
            cells: ic_battery::convert::DEFAULT_CELLS,
            ema_alpha: Some(0.1),
            window: Some(100),
            hwmon_dir: None,
            hwmon_chip: "ina219".into(),
            sim_step_ms: 1000,
        }
    }
}

/// Raw sensor poll period used when `interval_ms` is unset.
pub const HWMON_INTERVAL_MS: u64 = 10;

impl PublisherConfig {
    pub fn interval(&self) -> std::time::Duration {
        let ms = match (self.interval_ms, self.source) {
            (Some(ms), _) => ms,
            (None, SourceKind::Hwmon) => HWMON_INTERVAL_MS,
            (None, _) => self.sim_step_ms,
        };
        std::time::Duration::from_millis(ms)
    }

    pub fn monitor(&self) -> ic_battery::monitor::MonitorConfig {
        ic_battery::monitor::MonitorConfig {
            cells: self.cells,
            ema_alpha: self.ema_alpha,
            window: self.window,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn interval_follows_source_when_unset() {
        let hw = PublisherConfig::default();
        assert_eq!(hw.interval(), Duration::from_millis(10));

        let wave = PublisherConfig { source: SourceKind::Waveform, ..Default::default() };
        assert_eq!(wave.interval(), Duration::from_secs(1));

        let charging = PublisherConfig { source: SourceKind::Charging, sim_step_ms: 500, ..Default::default() };
        assert_eq!(charging.interval(), Duration::from_millis(500));
    }

    #[test]
    fn explicit_interval_wins() {
        let cfg = PublisherConfig { source: SourceKind::Waveform, interval_ms: Some(250), ..Default::default() };
        assert_eq!(cfg.interval(), Duration::from_millis(250));
    }
}
