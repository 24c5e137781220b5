use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use ic_bus::service::CarInformationService;
use ic_bus::{doctor as bus_doctor, publisher, server, PublisherConfig};
use ic_link::proxy::{self, DbusConnector};
use ic_link::receiver::DashboardState;
use ic_link::signals::{demo_script, TurnSignals};
use ic_link::{doctor as link_doctor, BusClient};
use ic_proto::bus::{BusAddress, RetryPolicy};

use std::time::Duration;

#[derive(Debug, Parser)]
#[command(name = "ic", version, about = "Instrument cluster telemetry bridge")]
struct Cli {
    #[arg(long)]
    config: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    Doctor,
    /// Own the bus name and publish sensor telemetry until Ctrl-C.
    Serve,
    Send { #[command(subcommand)] cmd: SendCmd },
    /// Print the service's battery and turn-signal state.
    Get,
    /// Log every DataReceived broadcast as the dashboard would see it.
    Listen,
    /// Step through the turn-signal sequence against a running service.
    SignalsDemo {
        #[arg(long, default_value_t = 2000)]
        step_ms: u64,
    },
}

#[derive(Debug, Subcommand)]
enum SendCmd {
    TurnSignals {
        #[arg(long)]
        left: bool,
        #[arg(long)]
        right: bool,
    },
    Battery {
        percent: f64,
        #[arg(long, default_value_t = 0.0)]
        current: f64,
    },
    Current { ma: f64 },
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct Config {
    bus: BusAddress,
    publisher: PublisherConfig,
    client: RetryPolicy,
}

fn load_config(path: &str) -> Result<Config> {
    let s = std::fs::read_to_string(path).context("read config")?;
    toml::from_str(&s).context("parse config toml")
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let cfg = load_config(&cli.config)?;

    match cli.cmd {
        Command::Doctor => doctor(&cfg)?,
        Command::Serve => serve(&cfg).await?,
        Command::Send { cmd } => send(&cfg, cmd).await?,
        Command::Get => get(&cfg).await?,
        Command::Listen => listen(&cfg).await?,
        Command::SignalsDemo { step_ms } => signals_demo(&cfg, Duration::from_millis(step_ms)).await?,
    }
    Ok(())
}

fn doctor(cfg: &Config) -> Result<()> {
    info!("doctor: starting");
    bus_doctor::check_address(&cfg.bus)?;
    bus_doctor::check_publisher(&cfg.publisher)?;
    link_doctor::check_retry(&cfg.client)?;
    info!("doctor: OK");
    Ok(())
}

async fn serve(cfg: &Config) -> Result<()> {
    info!("serve: starting ({:?} source)", cfg.publisher.source);
    let service = CarInformationService::default();
    let bus = server::serve(&cfg.bus, service.clone(), &cfg.client)
        .await
        .context("bus service did not come up")?;
    let sampler = publisher::spawn_from_config(&cfg.publisher, service)?;

    tokio::signal::ctrl_c().await.context("wait for ctrl-c")?;
    info!("serve: stopping");
    sampler.stop().await?;
    bus.shutdown().await
}

async fn client(cfg: &Config) -> BusClient<DbusConnector> {
    BusClient::establish(DbusConnector::new(cfg.bus.clone()), cfg.client).await
}

async fn send(cfg: &Config, cmd: SendCmd) -> Result<()> {
    let mut c = client(cfg).await;
    match cmd {
        SendCmd::TurnSignals { left, right } => {
            c.send_turn_signal(left, right).await?;
            info!("send: turn signals left={} right={}", left, right);
        }
        SendCmd::Battery { percent, current } => {
            c.send_battery_data(percent, current).await?;
            info!("send: battery={:.1}% current={:.1}mA", percent, current);
        }
        SendCmd::Current { ma } => {
            c.send_current(ma).await?;
            info!("send: current={:.1}mA", ma);
        }
    }
    Ok(())
}

async fn get(cfg: &Config) -> Result<()> {
    let mut c = client(cfg).await;
    let battery = c.battery().await?;
    let (left, right) = c.turn_signals().await?;
    println!("battery={:.1}", battery);
    println!("left_turn_signal={} right_turn_signal={}", left, right);
    Ok(())
}

async fn listen(cfg: &Config) -> Result<()> {
    let mut dashboard = DashboardState::default();
    tokio::select! {
        res = proxy::listen(&cfg.bus, &mut dashboard) => res,
        _ = tokio::signal::ctrl_c() => {
            info!("listen: stopping");
            Ok(())
        }
    }
}

async fn signals_demo(cfg: &Config, step: Duration) -> Result<()> {
    let mut c = client(cfg).await;
    anyhow::ensure!(c.is_connected(), "{} not reachable after {} attempts", cfg.bus.service_name, c.state().attempts);

    let mut signals = TurnSignals::default();
    let script = async {
        for (input, label) in demo_script() {
            if let Some((left, right)) = signals.apply(input) {
                match c.send_turn_signal(left, right).await {
                    Ok(()) => info!("signals-demo: {} -> left={} right={}", label, left, right),
                    Err(e) => warn!("signals-demo: {} failed: {:#}", label, e),
                }
            }
            tokio::time::sleep(step).await;
        }
    };
    tokio::select! {
        _ = script => info!("signals-demo: done"),
        _ = tokio::signal::ctrl_c() => info!("signals-demo: interrupted"),
    }

    if let Err(e) = c.send_turn_signal(false, false).await {
        warn!("signals-demo: final off failed: {:#}", e);
    }
    Ok(())
}
