use anyhow::{Context, Result};
use tracing::{trace, warn};

use crate::convert::pack_voltage_to_percent;
use crate::sensor::BatterySensor;
use crate::smoothing::{Ema, MaxWindow};
use crate::{Reading, TelemetrySource};

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub cells: u32,
    /// EMA on the raw pack voltage; `None` disables it.
    pub ema_alpha: Option<f64>,
    /// Max-of-last-N on the converted percentage; `None` disables it.
    pub window: Option<usize>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self { cells: crate::convert::DEFAULT_CELLS, ema_alpha: Some(0.1), window: Some(100) }
    }
}

/// Turns raw sensor readings into the battery percentage the dashboard shows.
pub struct BatteryMonitor<S> {
    sensor: S,
    cells: u32,
    ema: Option<Ema>,
    window: Option<MaxWindow>,
}

impl<S: BatterySensor> BatteryMonitor<S> {
    pub fn new(sensor: S, cfg: &MonitorConfig) -> Self {
        Self {
            sensor,
            cells: cfg.cells,
            ema: cfg.ema_alpha.map(Ema::new),
            window: cfg.window.map(MaxWindow::new),
        }
    }

    pub fn battery_percent(&mut self) -> Result<f64> {
        let raw = self.sensor.read_pack_voltage().context("read pack voltage")?;
        let v = match self.ema.as_mut() {
            Some(ema) => ema.update(raw),
            None => raw,
        };
        let pct = pack_voltage_to_percent(v, self.cells);
        let out = match self.window.as_mut() {
            Some(w) => w.push(pct),
            None => pct,
        };
        trace!("battery: raw={:.3}V filtered={:.3}V cell={:.3}V pct={:.1} out={:.1}",
               raw, v, v / self.cells.max(1) as f64, pct, out);
        Ok(out)
    }
}

impl<S: BatterySensor> TelemetrySource for BatteryMonitor<S> {
    fn poll(&mut self) -> Result<Reading> {
        let battery = self.battery_percent()?;
        let current = match self.sensor.read_current_ma() {
            Ok(ma) => Some(ma),
            Err(e) => {
                warn!("battery: current read failed: {:#}", e);
                None
            }
        };
        Ok(Reading { battery_percent: Some(battery), charging_current_ma: current })
    }

    fn describe(&self) -> String {
        format!("battery monitor ({} cells)", self.cells)
    }
}
