use crate::accessory::RoombaAccessory;
use crate::domain::models::PowerState;
use anyhow::Result;
use interprocess::local_socket::{tokio::prelude::*, GenericNamespaced, ListenerOptions, ToNsName};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, error, info};

/// Characteristic calls coming from the home bridge, one JSON object per line
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum BridgeRequest {
    Ping,
    GetPowerState,
    SetPowerState(u8), // 0 or 1
    GetIsCharging,
    GetBatteryLevel,
    Identify,
    GetServices,
}

/// Mirrors an error-first callback: a value, plain success, or an error message
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum BridgeResponse {
    Pong,
    Value(serde_json::Value),
    Done,
    Error(String),
}

/// Serve bridge requests on the local socket until `shutdown` resolves
pub async fn run_bridge_worker(
    accessory: Arc<RoombaAccessory>,
    socket_name: &str,
    shutdown: impl Future<Output = ()>,
) -> Result<()> {
    let name = socket_name.to_ns_name::<GenericNamespaced>()?;
    let listener = ListenerOptions::new().name(name).create_tokio()?;

    info!("Bridge worker listening on {}", socket_name);

    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Shutting down bridge worker");
                break;
            }
            conn = listener.accept() => match conn {
                Ok(stream) => {
                    debug!("Bridge client connected");
                    let accessory = accessory.clone();
                    let (reader, writer) = stream.split();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(reader, writer, accessory).await {
                            error!("Connection error: {}", e);
                        }
                    });
                }
                Err(e) => error!("Accept error: {}", e),
            },
        }
    }

    accessory.orchestrator().shutdown().await;
    Ok(())
}

async fn handle_connection<R, W>(
    reader: R,
    mut writer: W,
    accessory: Arc<RoombaAccessory>,
) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<BridgeRequest>(&line) {
            Ok(request) => {
                debug!("Received request: {:?}", request);
                execute_request(&accessory, request).await
            }
            Err(e) => BridgeResponse::Error(format!("Invalid request: {}", e)),
        };

        let json = serde_json::to_string(&response)? + "\n";
        writer.write_all(json.as_bytes()).await?;
        writer.flush().await?;
    }

    debug!("Bridge client disconnected");
    Ok(())
}

async fn execute_request(accessory: &RoombaAccessory, request: BridgeRequest) -> BridgeResponse {
    match request {
        BridgeRequest::Ping => BridgeResponse::Pong,
        BridgeRequest::GetPowerState => match accessory.get_power_state().await {
            Ok(on) => BridgeResponse::Value(u8::from(on).into()),
            Err(e) => BridgeResponse::Error(e.to_string()),
        },
        BridgeRequest::SetPowerState(value) => {
            match accessory
                .set_power_state(PowerState::from_switch_value(value))
                .await
            {
                Ok(()) => BridgeResponse::Done,
                Err(e) => BridgeResponse::Error(e.to_string()),
            }
        }
        BridgeRequest::GetIsCharging => match accessory.get_is_charging().await {
            Ok(state) => BridgeResponse::Value((state as u8).into()),
            Err(e) => BridgeResponse::Error(e.to_string()),
        },
        BridgeRequest::GetBatteryLevel => match accessory.get_battery_level().await {
            Ok(level) => BridgeResponse::Value(level.into()),
            Err(e) => BridgeResponse::Error(e.to_string()),
        },
        BridgeRequest::Identify => {
            accessory.identify();
            BridgeResponse::Done
        }
        BridgeRequest::GetServices => match serde_json::to_value(accessory.services()) {
            Ok(services) => BridgeResponse::Value(services),
            Err(e) => BridgeResponse::Error(e.to_string()),
        },
    }
}
