use ic_proto::telemetry::TelemetrySnapshot;
use std::sync::{Arc, Mutex, PoisonError};

/// Shared latest-value store. Clones point at the same snapshot, so the
/// publisher thread and the bus dispatch see one consistent copy.
#[derive(Debug, Clone, Default)]
pub struct TelemetryStore {
    inner: Arc<Mutex<TelemetrySnapshot>>,
}

impl TelemetryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies `f` under the lock and hands the resulting snapshot to
    /// `notify` before releasing it, so notifications go out in write order.
    pub fn update<F, N>(&self, f: F, notify: N) -> TelemetrySnapshot
    where
        F: FnOnce(&mut TelemetrySnapshot),
        N: FnOnce(TelemetrySnapshot),
    {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard);
        notify(*guard);
        *guard
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn starts_zeroed() {
        assert_eq!(TelemetryStore::new().snapshot(), TelemetrySnapshot::default());
    }

    #[test]
    fn update_returns_post_mutation_copy() {
        let store = TelemetryStore::new();
        let s = store.update(|s| s.battery_percent = 42.0, |_| {});
        assert_eq!(s.battery_percent, 42.0);
        assert_eq!(store.snapshot().battery_percent, 42.0);
    }

    #[test]
    fn paired_fields_never_tear() {
        let store = TelemetryStore::new();
        let writers: Vec<_> = (0..4)
            .map(|w| {
                let store = store.clone();
                thread::spawn(move || {
                    for i in 0..2000 {
                        let b = (w * 10_000 + i) as f64;
                        store.update(
                            |s| {
                                s.battery_percent = b;
                                s.charging_current_ma = b * 10.0;
                            },
                            |_| {},
                        );
                    }
                })
            })
            .collect();

        let reader = {
            let store = store.clone();
            thread::spawn(move || {
                for _ in 0..5000 {
                    let s = store.snapshot();
                    assert_eq!(s.charging_current_ma, s.battery_percent * 10.0);
                }
            })
        };

        for w in writers {
            w.join().unwrap();
        }
        reader.join().unwrap();
    }

    #[test]
    fn notifications_follow_write_order() {
        let store = TelemetryStore::new();
        let seen = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let writers: Vec<_> = (0..2)
            .map(|w| {
                let (store, seen) = (store.clone(), seen.clone());
                thread::spawn(move || {
                    for i in 0..500 {
                        let b = (w * 1000 + i) as f64;
                        store.update(|s| s.battery_percent = b, |s| seen.lock().unwrap().push(s));
                    }
                })
            })
            .collect();
        for w in writers {
            w.join().unwrap();
        }

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1000);
        assert_eq!(seen.last().copied(), Some(store.snapshot()));
    }
}
