use anyhow::{Context, Result};
use futures::StreamExt;
use ic_proto::bus::{BusAddress, BusKind, SIGNAL_NAME};
use tracing::{info, warn};
use zbus::names::BusName;
use zbus::{proxy, Connection};

use crate::client::{CarLink, Connector};
use crate::receiver::DashboardState;

#[proxy(
    interface = "org.team7.IC.Interface",
    default_service = "org.team7.IC",
    default_path = "/CarInformation",
    gen_blocking = false
)]
pub trait CarInformation {
    #[zbus(name = "setBattery")]
    fn set_battery(&self, battery_level: f64) -> zbus::Result<()>;

    #[zbus(name = "getBattery")]
    fn get_battery(&self) -> zbus::Result<f64>;

    #[zbus(name = "setCurrent")]
    fn set_current(&self, current_ma: f64) -> zbus::Result<()>;

    #[zbus(name = "setTurnSignals")]
    fn set_turn_signals(&self, left_active: bool, right_active: bool) -> zbus::Result<()>;

    #[zbus(name = "getTurnSignals")]
    fn get_turn_signals(&self) -> zbus::Result<(bool, bool)>;

    #[zbus(signal, name = "DataReceived")]
    fn data_received(&self, data_json: String) -> zbus::Result<()>;
}

pub async fn open(kind: BusKind) -> Result<Connection> {
    let conn = match kind {
        BusKind::Session => Connection::session().await.context("connect to session bus")?,
        BusKind::System => Connection::system().await.context("connect to system bus")?,
    };
    Ok(conn)
}

async fn build_proxy(conn: &Connection, addr: &BusAddress) -> Result<CarInformationProxy<'static>> {
    let proxy = CarInformationProxy::builder(conn)
        .destination(addr.service_name.clone())?
        .path(addr.object_path.clone())?
        .build()
        .await
        .context("build car information proxy")?;
    Ok(proxy)
}

/// Dials the service over D-Bus. Refuses while nobody owns the service
/// name, so the retry loop keeps waiting for the dashboard to come up.
#[derive(Debug, Clone)]
pub struct DbusConnector {
    addr: BusAddress,
}

impl DbusConnector {
    pub fn new(addr: BusAddress) -> Self {
        Self { addr }
    }
}

impl Connector for DbusConnector {
    type Link = CarInformationProxy<'static>;

    async fn connect(&self) -> Result<Self::Link> {
        let conn = open(self.addr.kind).await?;
        let dbus = zbus::fdo::DBusProxy::new(&conn).await?;
        let name = BusName::try_from(self.addr.service_name.as_str())
            .with_context(|| format!("invalid service name {}", self.addr.service_name))?;
        let owned = dbus.name_has_owner(name).await?;
        anyhow::ensure!(owned, "{} is not on the {:?} bus", self.addr.service_name, self.addr.kind);
        build_proxy(&conn, &self.addr).await
    }
}

impl CarLink for CarInformationProxy<'static> {
    async fn push_turn_signals(&self, left: bool, right: bool) -> Result<()> {
        self.set_turn_signals(left, right).await.context("setTurnSignals")
    }

    async fn push_battery(&self, percent: f64) -> Result<()> {
        self.set_battery(percent).await.context("setBattery")
    }

    async fn push_current(&self, milliamps: f64) -> Result<()> {
        self.set_current(milliamps).await.context("setCurrent")
    }

    async fn query_battery(&self) -> Result<f64> {
        self.get_battery().await.context("getBattery")
    }

    async fn query_turn_signals(&self) -> Result<(bool, bool)> {
        self.get_turn_signals().await.context("getTurnSignals")
    }
}

/// Follows `DataReceived` and feeds each payload to `dashboard`. Only
/// signals sent after the subscription is in place are seen.
pub async fn listen(addr: &BusAddress, dashboard: &mut DashboardState) -> Result<()> {
    let conn = open(addr.kind).await?;
    let proxy = build_proxy(&conn, addr).await?;
    let mut signals = proxy.receive_data_received().await.context("subscribe to DataReceived")?;
    info!("listen: subscribed to {} from {} {}", SIGNAL_NAME, addr.service_name, addr.object_path);

    while let Some(signal) = signals.next().await {
        let args = match signal.args() {
            Ok(args) => args,
            Err(e) => {
                warn!("listen: undecodable DataReceived: {:#}", e);
                continue;
            }
        };
        match dashboard.handle_json(args.data_json()) {
            Ok(changes) if changes.any() => info!(
                "listen: battery={:.1}% current={:.1}mA left={} right={} charging_icon={}",
                dashboard.battery_capacity,
                dashboard.charging_current,
                dashboard.left_turn_signal,
                dashboard.right_turn_signal,
                dashboard.charging_icon_visible(),
            ),
            Ok(_) => {}
            Err(e) => warn!("listen: dropped payload: {:#}", e),
        }
    }
    warn!("listen: signal stream ended");
    Ok(())
}
