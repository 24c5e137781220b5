use ic_battery::Reading;
use ic_proto::telemetry::TelemetrySnapshot;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::store::TelemetryStore;

/// Lagging listeners skip old snapshots; only the latest matters.
pub const BROADCAST_CAPACITY: usize = 64;

/// The car information object: setters mutate the store, then broadcast
/// the full snapshot to whoever is listening at that moment.
///
/// Values are stored as given. Out-of-range battery or negative current
/// is not clamped; the dashboard sees exactly what the sender sent.
#[derive(Debug, Clone)]
pub struct CarInformationService {
    store: TelemetryStore,
    tx: broadcast::Sender<TelemetrySnapshot>,
}

impl Default for CarInformationService {
    fn default() -> Self {
        Self::new(TelemetryStore::new())
    }
}

impl CarInformationService {
    pub fn new(store: TelemetryStore) -> Self {
        let (tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self { store, tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TelemetrySnapshot> {
        self.tx.subscribe()
    }

    pub fn set_battery(&self, value: f64) {
        debug!("service: battery <- {:.1}%", value);
        self.commit(|s| s.battery_percent = value);
    }

    pub fn set_current(&self, value: f64) {
        debug!("service: current <- {:.1}mA", value);
        self.commit(|s| s.charging_current_ma = value);
    }

    pub fn set_turn_signals(&self, left: bool, right: bool) {
        info!("service: turn signals <- left={} right={}", left, right);
        self.commit(|s| {
            s.left_turn_signal = left;
            s.right_turn_signal = right;
        });
    }

    /// Battery and current from one sample, stored together and announced once.
    pub fn apply_reading(&self, reading: Reading) {
        if reading.battery_percent.is_none() && reading.charging_current_ma.is_none() {
            return;
        }
        self.commit(|s| {
            if let Some(b) = reading.battery_percent {
                s.battery_percent = b;
            }
            if let Some(c) = reading.charging_current_ma {
                s.charging_current_ma = c;
            }
        });
    }

    pub fn battery(&self) -> f64 {
        self.store.snapshot().battery_percent
    }

    pub fn current(&self) -> f64 {
        self.store.snapshot().charging_current_ma
    }

    pub fn turn_signals(&self) -> (bool, bool) {
        let s = self.store.snapshot();
        (s.left_turn_signal, s.right_turn_signal)
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        self.store.snapshot()
    }

    /// Mutates the store and broadcasts under the same lock, so the last
    /// `DataReceived` always matches what the getters return.
    fn commit<F: FnOnce(&mut TelemetrySnapshot)>(&self, f: F) {
        self.store.update(f, |s| self.emit(s));
    }

    fn emit(&self, s: TelemetrySnapshot) {
        // fire-and-forget: no listeners is not an error
        if self.tx.send(s).is_err() {
            debug!("service: no listeners for snapshot");
        }
    }
}
