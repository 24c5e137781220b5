use anyhow::{Context, Result};
use ic_proto::bus::BusAddress;
use std::path::Path;
use zbus::names::WellKnownName;
use zbus::zvariant::ObjectPath;

use crate::{PublisherConfig, SourceKind};

pub fn check_address(addr: &BusAddress) -> Result<()> {
    WellKnownName::try_from(addr.service_name.as_str())
        .with_context(|| format!("bus.service_name invalid: {}", addr.service_name))?;
    ObjectPath::try_from(addr.object_path.as_str())
        .with_context(|| format!("bus.object_path invalid: {}", addr.object_path))?;
    Ok(())
}

pub fn check_publisher(cfg: &PublisherConfig) -> Result<()> {
    anyhow::ensure!(cfg.interval_ms != Some(0), "publisher.interval_ms must be >= 1");
    anyhow::ensure!(cfg.startup_delay_ms <= 60_000, "publisher.startup_delay_ms should be <= 60s");
    ic_battery::doctor::check_smoothing(cfg.ema_alpha, cfg.window, cfg.cells)?;
    if cfg.source == SourceKind::Hwmon {
        if let Some(dir) = &cfg.hwmon_dir {
            anyhow::ensure!(Path::new(dir).is_dir(), "publisher.hwmon_dir is not a dir: {}", dir);
        } else {
            anyhow::ensure!(!cfg.hwmon_chip.is_empty(), "publisher.hwmon_chip missing (hwmon_dir unset)");
        }
    } else {
        anyhow::ensure!(cfg.sim_step_ms >= 1, "publisher.sim_step_ms must be >= 1");
        let interval_ms = cfg.interval().as_millis();
        anyhow::ensure!(
            interval_ms >= u128::from(cfg.sim_step_ms),
            "publisher.interval_ms ({}) is shorter than sim_step_ms ({}); {:?} would run faster than real time",
            interval_ms, cfg.sim_step_ms, cfg.source
        );
    }
    Ok(())
}
