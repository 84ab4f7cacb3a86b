use roomba_bridge_rust::accessory::RoombaAccessory;
use roomba_bridge_rust::bridge_client::{self, BridgeClient};
use roomba_bridge_rust::bridge_worker;
use roomba_bridge_rust::domain::settings::{Settings, SettingsService};
use roomba_bridge_rust::infrastructure;
use roomba_bridge_rust::infrastructure::robot::{RobotEndpoint, SimulatedRobot};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let (settings_path, rest) = split_settings_arg(&args)?;

    let settings_service = match settings_path {
        Some(path) => SettingsService::from_path(path),
        None => SettingsService::new()?,
    };
    let settings = settings_service.get().clone();

    let _logging_guard = infrastructure::logging::init_logger(&settings.log_settings)
        .map_err(|e| eprintln!("Failed to initialize logging: {}", e))
        .ok();

    if rest.first().map(String::as_str) == Some("ctl") {
        return run_ctl(&settings, &rest[1..]);
    }

    info!(
        "Starting Roomba bridge with settings from {}",
        settings_service.path().display()
    );
    settings.accessory.validate()?;
    settings.dock_wait.validate()?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run_worker(settings))
}

/// Pull `--settings <path>` out of the arguments
fn split_settings_arg(args: &[String]) -> anyhow::Result<(Option<PathBuf>, Vec<String>)> {
    let mut settings_path = None;
    let mut rest = Vec::new();
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        if arg == "--settings" {
            let path = iter
                .next()
                .ok_or_else(|| anyhow::anyhow!("--settings needs a path"))?;
            settings_path = Some(PathBuf::from(path));
        } else {
            rest.push(arg.clone());
        }
    }
    Ok((settings_path, rest))
}

async fn run_worker(settings: Settings) -> anyhow::Result<()> {
    // TODO: select a network transport here once one implements RobotConnector
    warn!("No network transport available, driving the simulated Roomba");
    let robot = SimulatedRobot::new(
        settings.simulation.initial_phase.clone(),
        settings.simulation.battery_percent,
    );

    let endpoint = RobotEndpoint::new(Arc::new(robot), settings.accessory.credentials());
    let accessory = Arc::new(RoombaAccessory::new(
        &settings.accessory,
        settings.dock_wait.clone(),
        endpoint,
    ));
    info!("Serving accessory [{}]", accessory.name());

    bridge_worker::run_bridge_worker(accessory, &settings.bridge.socket_name, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Unable to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    })
    .await
}

fn run_ctl(settings: &Settings, args: &[String]) -> anyhow::Result<()> {
    let request = bridge_client::parse_request(args)?;
    let mut client = BridgeClient::new(&settings.bridge.socket_name);
    let response = client.send_request(&request)?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
