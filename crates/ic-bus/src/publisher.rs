use anyhow::{Context, Result};
use ic_battery::monitor::BatteryMonitor;
use ic_battery::sensor::HwmonSensor;
use ic_battery::sim::{ChargingScenarios, Waveform};
use ic_battery::TelemetrySource;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{info, trace, warn};

use crate::service::CarInformationService;
use crate::{PublisherConfig, SourceKind};

/// Periodic sampler feeding the service in-process (not through the bus,
/// which would make the service call itself).
pub struct Publisher<T> {
    source: T,
    service: CarInformationService,
    interval: Duration,
    startup_delay: Duration,
    stop: Arc<AtomicBool>,
}

impl<T: TelemetrySource> Publisher<T> {
    pub fn new(source: T, service: CarInformationService, interval: Duration) -> Self {
        Self { source, service, interval, startup_delay: Duration::ZERO, stop: Arc::default() }
    }

    pub fn with_startup_delay(mut self, d: Duration) -> Self {
        self.startup_delay = d;
        self
    }

    /// One sample. Source errors are logged and the tick is skipped.
    pub fn tick(&mut self) -> bool {
        match self.source.poll() {
            Ok(reading) => {
                trace!("publisher: {:?}", reading);
                self.service.apply_reading(reading);
                true
            }
            Err(e) => {
                warn!("publisher: sample failed: {:#}", e);
                false
            }
        }
    }

    /// Runs until stopped through the handle returned by [`Self::spawn`].
    /// Call from a blocking thread.
    pub fn run_blocking(mut self) {
        std::thread::sleep(self.startup_delay);
        info!("publisher: sampling {} every {:?}", self.source.describe(), self.interval);
        while !self.stop.load(Ordering::Relaxed) {
            let start = Instant::now();
            self.tick();
            std::thread::sleep(self.interval);
            trace!("publisher: cycle {:?}", start.elapsed());
        }
        info!("publisher: stopped");
    }
}

/// Running sampler thread. A blocking task cannot be aborted, so it is
/// asked to stop and finishes its current cycle.
pub struct PublisherHandle {
    stop: Arc<AtomicBool>,
    join: JoinHandle<()>,
}

impl PublisherHandle {
    pub async fn stop(self) -> Result<()> {
        self.stop.store(true, Ordering::Relaxed);
        self.join.await.context("publisher thread")?;
        Ok(())
    }
}

impl<T: TelemetrySource + 'static> Publisher<T> {
    pub fn spawn(self) -> PublisherHandle {
        let stop = self.stop.clone();
        let join = tokio::task::spawn_blocking(move || self.run_blocking());
        PublisherHandle { stop, join }
    }
}

/// Builds the configured source and starts sampling on a dedicated thread.
pub fn spawn_from_config(cfg: &PublisherConfig, service: CarInformationService) -> Result<PublisherHandle> {
    let interval = cfg.interval();
    let delay = Duration::from_millis(cfg.startup_delay_ms);
    let handle = match cfg.source {
        SourceKind::Hwmon => {
            let sensor = match &cfg.hwmon_dir {
                Some(dir) => HwmonSensor::new(dir),
                None => HwmonSensor::discover(&cfg.hwmon_chip)?,
            };
            let monitor = BatteryMonitor::new(sensor, &cfg.monitor());
            Publisher::new(monitor, service, interval).with_startup_delay(delay).spawn()
        }
        SourceKind::Waveform => {
            let src = Waveform::new(Duration::from_millis(cfg.sim_step_ms));
            Publisher::new(src, service, interval).with_startup_delay(delay).spawn()
        }
        SourceKind::Charging => {
            Publisher::new(ChargingScenarios::default(), service, interval).with_startup_delay(delay).spawn()
        }
    };
    Ok(handle)
}
