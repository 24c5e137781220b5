use anyhow::Result;
use ic_proto::bus::RetryPolicy;
use std::future::Future;
use tracing::{error, info, warn};

use crate::retry::{Sleeper, TokioSleeper};
use crate::ClientError;

/// Binds to the car information service.
pub trait Connector: Send + Sync {
    type Link: CarLink;

    fn connect(&self) -> impl Future<Output = Result<Self::Link>> + Send;
}

/// Calls a bound link can make. Any error marks the client disconnected.
pub trait CarLink: Send + Sync {
    fn push_turn_signals(&self, left: bool, right: bool) -> impl Future<Output = Result<()>> + Send;
    fn push_battery(&self, percent: f64) -> impl Future<Output = Result<()>> + Send;
    fn push_current(&self, milliamps: f64) -> impl Future<Output = Result<()>> + Send;
    fn query_battery(&self) -> impl Future<Output = Result<f64>> + Send;
    fn query_turn_signals(&self) -> impl Future<Output = Result<(bool, bool)>> + Send;
}

enum LinkState<L> {
    Disconnected,
    Connected(L),
    /// Retry budget spent. Only a new client starts over.
    PermanentlyFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConnectionState {
    pub attempts: u32,
    pub connected: bool,
}

/// Client handle with bounded retry-with-delay connection logic.
///
/// Failed attempts are counted over the life of the client and never
/// reset, so reconnects after a call fault draw from what is left of the
/// budget. Once it is spent every operation fails immediately.
pub struct BusClient<C: Connector, S = TokioSleeper> {
    connector: C,
    sleeper: S,
    policy: RetryPolicy,
    attempts: u32,
    state: LinkState<C::Link>,
}

impl<C: Connector> BusClient<C, TokioSleeper> {
    pub async fn establish(connector: C, policy: RetryPolicy) -> Self {
        Self::establish_with(connector, TokioSleeper, policy).await
    }
}

impl<C: Connector, S: Sleeper> BusClient<C, S> {
    pub fn new(connector: C, sleeper: S, policy: RetryPolicy) -> Self {
        Self { connector, sleeper, policy, attempts: 0, state: LinkState::Disconnected }
    }

    /// Constructs and runs the connect loop. A failed connect is logged,
    /// not returned; check [`Self::is_connected`].
    pub async fn establish_with(connector: C, sleeper: S, policy: RetryPolicy) -> Self {
        let mut client = Self::new(connector, sleeper, policy);
        if let Err(e) = client.connect().await {
            warn!("client: {}", e);
        }
        client
    }

    pub fn state(&self) -> ConnectionState {
        ConnectionState { attempts: self.attempts, connected: self.is_connected() }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.state, LinkState::Connected(_))
    }

    pub fn is_permanently_failed(&self) -> bool {
        matches!(self.state, LinkState::PermanentlyFailed)
    }

    pub async fn connect(&mut self) -> Result<(), ClientError> {
        loop {
            match &self.state {
                LinkState::Connected(_) => return Ok(()),
                LinkState::PermanentlyFailed => {
                    return Err(ClientError::PermanentlyFailed { attempts: self.attempts })
                }
                LinkState::Disconnected => {}
            }

            if self.attempts >= self.policy.max_retries {
                error!("client: failed to connect after {} attempts, giving up", self.attempts);
                self.state = LinkState::PermanentlyFailed;
                continue;
            }

            match self.connector.connect().await {
                Ok(link) => {
                    info!("client: connected (after {} failed attempts)", self.attempts);
                    self.state = LinkState::Connected(link);
                }
                Err(e) => {
                    self.attempts += 1;
                    warn!("client: connection attempt {}/{} failed: {:#}", self.attempts, self.policy.max_retries, e);
                    if self.attempts < self.policy.max_retries {
                        info!("client: retrying in {:?}", self.policy.delay());
                        self.sleeper.sleep(self.policy.delay()).await;
                    }
                }
            }
        }
    }

    pub async fn send_turn_signal(&mut self, left: bool, right: bool) -> Result<(), ClientError> {
        let res = self.link().await?.push_turn_signals(left, right).await;
        self.settle("setTurnSignals", res)?;
        info!("client: turn signals sent left={} right={}", left, right);
        Ok(())
    }

    pub async fn send_battery_data(&mut self, level: f64, charging_current_ma: f64) -> Result<(), ClientError> {
        let res = self.link().await?.push_battery(level).await;
        self.settle("setBattery", res)?;
        let res = self.link().await?.push_current(charging_current_ma).await;
        self.settle("setCurrent", res)?;
        info!("client: battery sent level={:.1}% current={:.1}mA", level, charging_current_ma);
        Ok(())
    }

    pub async fn send_current(&mut self, charging_current_ma: f64) -> Result<(), ClientError> {
        let res = self.link().await?.push_current(charging_current_ma).await;
        self.settle("setCurrent", res)
    }

    pub async fn battery(&mut self) -> Result<f64, ClientError> {
        let res = self.link().await?.query_battery().await;
        self.settle("getBattery", res)
    }

    pub async fn turn_signals(&mut self) -> Result<(bool, bool), ClientError> {
        let res = self.link().await?.query_turn_signals().await;
        self.settle("getTurnSignals", res)
    }

    async fn link(&mut self) -> Result<&C::Link, ClientError> {
        if matches!(self.state, LinkState::Disconnected) {
            warn!("client: not connected, attempting reconnection");
        }
        self.connect().await?;
        match &self.state {
            LinkState::Connected(link) => Ok(link),
            _ => Err(ClientError::PermanentlyFailed { attempts: self.attempts }),
        }
    }

    fn settle<T>(&mut self, call: &'static str, res: Result<T>) -> Result<T, ClientError> {
        res.map_err(|cause| {
            warn!("client: {} failed, marking disconnected: {:#}", call, cause);
            self.state = LinkState::Disconnected;
            ClientError::Call { call, cause }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Clone, Default)]
    struct Bench {
        connects: Arc<AtomicU32>,
        plan: Arc<Mutex<VecDeque<bool>>>,
        calls: Arc<Mutex<Vec<String>>>,
        fail_calls: Arc<AtomicBool>,
        slept: Arc<Mutex<Vec<Duration>>>,
    }

    impl Bench {
        fn with_plan(plan: &[bool]) -> Self {
            let b = Bench::default();
            b.plan.lock().unwrap().extend(plan.iter().copied());
            b
        }

        fn connects(&self) -> u32 {
            self.connects.load(Ordering::SeqCst)
        }

        fn slept(&self) -> Vec<Duration> {
            self.slept.lock().unwrap().clone()
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    struct FakeConnector(Bench);
    struct FakeLink(Bench);
    struct RecordingSleeper(Bench);

    impl Connector for FakeConnector {
        type Link = FakeLink;

        async fn connect(&self) -> Result<FakeLink> {
            self.0.connects.fetch_add(1, Ordering::SeqCst);
            let ok = self.0.plan.lock().unwrap().pop_front().unwrap_or(false);
            if ok {
                Ok(FakeLink(self.0.clone()))
            } else {
                anyhow::bail!("org.freedesktop.DBus.Error.ServiceUnknown")
            }
        }
    }

    impl FakeLink {
        fn record(&self, call: String) -> Result<()> {
            if self.0.fail_calls.load(Ordering::SeqCst) {
                anyhow::bail!("org.freedesktop.DBus.Error.NoReply");
            }
            self.0.calls.lock().unwrap().push(call);
            Ok(())
        }
    }

    impl CarLink for FakeLink {
        async fn push_turn_signals(&self, left: bool, right: bool) -> Result<()> {
            self.record(format!("setTurnSignals({left},{right})"))
        }

        async fn push_battery(&self, percent: f64) -> Result<()> {
            self.record(format!("setBattery({percent})"))
        }

        async fn push_current(&self, milliamps: f64) -> Result<()> {
            self.record(format!("setCurrent({milliamps})"))
        }

        async fn query_battery(&self) -> Result<f64> {
            self.record("getBattery".into())?;
            Ok(64.5)
        }

        async fn query_turn_signals(&self) -> Result<(bool, bool)> {
            self.record("getTurnSignals".into())?;
            Ok((false, true))
        }
    }

    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, d: Duration) {
            self.0.slept.lock().unwrap().push(d);
        }
    }

    fn policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy { max_retries, retry_delay_ms: 2000 }
    }

    async fn client(bench: &Bench, max_retries: u32) -> BusClient<FakeConnector, RecordingSleeper> {
        BusClient::establish_with(FakeConnector(bench.clone()), RecordingSleeper(bench.clone()), policy(max_retries)).await
    }

    #[tokio::test]
    async fn gives_up_after_exactly_max_retries() {
        let bench = Bench::with_plan(&[]);
        let mut c = client(&bench, 10).await;

        assert_eq!(bench.connects(), 10);
        assert_eq!(bench.slept(), vec![Duration::from_secs(2); 9]);
        assert!(c.is_permanently_failed());
        assert_eq!(c.state(), ConnectionState { attempts: 10, connected: false });

        let err = c.send_turn_signal(true, false).await.unwrap_err();
        assert!(matches!(err, ClientError::PermanentlyFailed { attempts: 10 }));
        assert!(c.send_battery_data(50.0, 0.0).await.is_err());
        assert!(c.connect().await.is_err());
        assert_eq!(bench.connects(), 10);
        assert_eq!(bench.slept().len(), 9);
    }

    #[tokio::test]
    async fn connects_after_transient_failures() {
        let bench = Bench::with_plan(&[false, false, true]);
        let mut c = client(&bench, 10).await;

        assert_eq!(c.state(), ConnectionState { attempts: 2, connected: true });
        assert_eq!(bench.slept().len(), 2);

        c.send_turn_signal(true, false).await.unwrap();
        assert_eq!(bench.calls(), vec!["setTurnSignals(true,false)"]);
    }

    #[tokio::test]
    async fn call_fault_disconnects_then_next_call_reconnects() {
        let bench = Bench::with_plan(&[true, true]);
        let mut c = client(&bench, 10).await;

        bench.fail_calls.store(true, Ordering::SeqCst);
        let err = c.send_turn_signal(false, true).await.unwrap_err();
        assert!(matches!(err, ClientError::Call { call: "setTurnSignals", .. }));
        assert!(!c.is_connected());

        bench.fail_calls.store(false, Ordering::SeqCst);
        c.send_turn_signal(false, true).await.unwrap();
        assert!(c.is_connected());
        assert_eq!(bench.connects(), 2);
    }

    #[tokio::test]
    async fn reconnect_draws_from_remaining_budget() {
        let bench = Bench::with_plan(&[true]);
        let mut c = client(&bench, 3).await;
        assert_eq!(c.state().attempts, 0);

        bench.fail_calls.store(true, Ordering::SeqCst);
        assert!(c.send_current(900.0).await.is_err());

        let err = c.send_current(900.0).await.unwrap_err();
        assert!(matches!(err, ClientError::PermanentlyFailed { attempts: 3 }));
        assert_eq!(bench.connects(), 4);
        assert_eq!(bench.slept().len(), 2);
    }

    #[tokio::test]
    async fn zero_budget_never_dials() {
        let bench = Bench::with_plan(&[true]);
        let c = client(&bench, 0).await;
        assert!(c.is_permanently_failed());
        assert_eq!(bench.connects(), 0);
    }

    #[tokio::test]
    async fn battery_data_sends_level_then_current() {
        let bench = Bench::with_plan(&[true]);
        let mut c = client(&bench, 10).await;
        c.send_battery_data(73.2, 1450.0).await.unwrap();
        assert_eq!(bench.calls(), vec!["setBattery(73.2)", "setCurrent(1450)"]);
    }

    #[tokio::test]
    async fn getters_go_through_the_link() {
        let bench = Bench::with_plan(&[true]);
        let mut c = client(&bench, 10).await;
        assert_eq!(c.battery().await.unwrap(), 64.5);
        assert_eq!(c.turn_signals().await.unwrap(), (false, true));
    }
}
