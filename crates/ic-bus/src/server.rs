use anyhow::{Context, Result};
use ic_link::retry::{self, Sleeper, TokioSleeper};
use ic_proto::bus::{BusAddress, BusKind, RetryPolicy};
use ic_proto::telemetry::TelemetrySnapshot;
use std::future::Future;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use zbus::object_server::SignalContext;
use zbus::{connection, interface, Connection};

use crate::service::CarInformationService;

/// D-Bus face of [`CarInformationService`]. Method names keep the
/// camelCase the dashboard already calls.
pub struct CarInformation {
    service: CarInformationService,
}

impl CarInformation {
    pub fn new(service: CarInformationService) -> Self {
        Self { service }
    }
}

#[interface(name = "org.team7.IC.Interface")]
impl CarInformation {
    #[zbus(name = "setBattery")]
    fn set_battery(&self, battery_level: f64) {
        self.service.set_battery(battery_level);
    }

    #[zbus(name = "getBattery")]
    fn get_battery(&self) -> f64 {
        self.service.battery()
    }

    #[zbus(name = "setCurrent")]
    fn set_current(&self, current_ma: f64) {
        self.service.set_current(current_ma);
    }

    #[zbus(name = "setChargingCurrent")]
    fn set_charging_current(&self, current_ma: f64) {
        self.service.set_current(current_ma);
    }

    #[zbus(name = "getCurrent")]
    fn get_current(&self) -> f64 {
        self.service.current()
    }

    #[zbus(name = "getChargingCurrent")]
    fn get_charging_current(&self) -> f64 {
        self.service.current()
    }

    #[zbus(name = "setTurnSignals")]
    fn set_turn_signals(&self, left_active: bool, right_active: bool) {
        self.service.set_turn_signals(left_active, right_active);
    }

    #[zbus(name = "getTurnSignals", out_args("left_active", "right_active"))]
    fn get_turn_signals(&self) -> (bool, bool) {
        self.service.turn_signals()
    }

    #[zbus(signal, name = "DataReceived")]
    async fn data_received(ctxt: &SignalContext<'_>, data_json: &str) -> zbus::Result<()>;
}

pub struct BusServer {
    conn: Connection,
    service_name: String,
    relay: JoinHandle<()>,
}

impl BusServer {
    pub async fn shutdown(self) -> Result<()> {
        self.relay.abort();
        self.conn.release_name(self.service_name.as_str()).await
            .with_context(|| format!("release {}", self.service_name))?;
        info!("server: released {}", self.service_name);
        Ok(())
    }
}

/// Claims the service name, exports the object and starts relaying
/// snapshots as `DataReceived` signals. Gives up after the retry budget.
pub async fn serve(addr: &BusAddress, service: CarInformationService, policy: &RetryPolicy) -> Result<BusServer> {
    let conn = claim(addr, policy, &TokioSleeper, || connect_once(addr, service.clone())).await?;
    info!("server: {} exported at {} on {:?} bus", addr.service_name, addr.object_path, addr.kind);

    let relay = spawn_relay(conn.clone(), addr.object_path.clone(), service.subscribe());
    Ok(BusServer { conn, service_name: addr.service_name.clone(), relay })
}

async fn claim<C, F, Fut, S>(addr: &BusAddress, policy: &RetryPolicy, sleeper: &S, connect: F) -> Result<C>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<C>>,
    S: Sleeper,
{
    let what = format!("server: claim {}", addr.service_name);
    retry::bounded(policy, sleeper, &what, connect).await
}

async fn connect_once(addr: &BusAddress, service: CarInformationService) -> Result<Connection> {
    let builder = match addr.kind {
        BusKind::Session => connection::Builder::session()?,
        BusKind::System => connection::Builder::system()?,
    };
    let conn = builder
        .name(addr.service_name.as_str())?
        .serve_at(addr.object_path.as_str(), CarInformation::new(service))?
        .build()
        .await
        .context("connect to message bus")?;
    Ok(conn)
}

fn spawn_relay(conn: Connection, path: String, mut rx: broadcast::Receiver<TelemetrySnapshot>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let ctxt = match SignalContext::new(&conn, path.as_str()) {
            Ok(c) => c,
            Err(e) => {
                warn!("server: bad object path {}: {:#}", path, e);
                return;
            }
        };
        loop {
            match rx.recv().await {
                Ok(snapshot) => {
                    if let Err(e) = emit(&ctxt, &snapshot).await {
                        warn!("server: DataReceived emit failed: {:#}", e);
                    }
                }
                Err(RecvError::Lagged(n)) => debug!("server: relay skipped {} snapshots", n),
                Err(RecvError::Closed) => break,
            }
        }
    })
}

async fn emit(ctxt: &SignalContext<'_>, snapshot: &TelemetrySnapshot) -> Result<()> {
    let json = snapshot.to_json().context("encode snapshot")?;
    debug!("server: DataReceived {}", json);
    CarInformation::data_received(ctxt, &json).await?;
    Ok(())
}
