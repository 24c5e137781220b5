use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

const HWMON_ROOT: &str = "/sys/class/hwmon";

/// Battery voltage/current sensor consumed by the monitor.
pub trait BatterySensor: Send {
    /// Pack voltage in volts.
    fn read_pack_voltage(&mut self) -> Result<f64>;
    /// Charging current in milliamps.
    fn read_current_ma(&mut self) -> Result<f64>;
}

/// Power monitor exposed through the kernel hwmon interface.
/// The INA219 driver publishes bus voltage as `in1_input` (mV) and
/// current as `curr1_input` (mA).
#[derive(Debug, Clone)]
pub struct HwmonSensor {
    voltage_path: PathBuf,
    current_path: PathBuf,
}

impl HwmonSensor {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            voltage_path: dir.join("in1_input"),
            current_path: dir.join("curr1_input"),
        }
    }

    /// Finds the hwmon device whose `name` file matches `chip`.
    pub fn discover(chip: &str) -> Result<Self> {
        Self::discover_in(HWMON_ROOT, chip)
    }

    pub fn discover_in(root: impl AsRef<Path>, chip: &str) -> Result<Self> {
        let root = root.as_ref();
        let entries = std::fs::read_dir(root)
            .with_context(|| format!("list {}", root.display()))?;
        for ent in entries {
            let dir = ent?.path();
            let Ok(name) = std::fs::read_to_string(dir.join("name")) else { continue };
            if name.trim() == chip {
                return Ok(Self::new(dir));
            }
        }
        anyhow::bail!("no hwmon device named {} under {}", chip, root.display())
    }
}

impl BatterySensor for HwmonSensor {
    fn read_pack_voltage(&mut self) -> Result<f64> {
        Ok(read_milli(&self.voltage_path)? / 1000.0)
    }

    fn read_current_ma(&mut self) -> Result<f64> {
        read_milli(&self.current_path)
    }
}

fn read_milli(path: &Path) -> Result<f64> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("read hwmon sensor {}", path.display()))?;

    let raw: i64 = content.trim()
        .parse()
        .with_context(|| format!("parse hwmon value {:?}", content.trim()))?;

    Ok(raw as f64)
}
