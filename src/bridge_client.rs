use crate::bridge_worker::{BridgeRequest, BridgeResponse};
use anyhow::Result;
use interprocess::local_socket::{
    traits::Stream, GenericNamespaced, Stream as LocalStream, ToNsName,
};
use std::io::{BufRead, BufReader, Write};
use tracing::info;

pub struct BridgeClient {
    socket_name: String,
    stream: Option<LocalStream>,
}

impl BridgeClient {
    pub fn new(socket_name: &str) -> Self {
        Self {
            socket_name: socket_name.to_string(),
            stream: None,
        }
    }

    /// Try to connect to the running bridge worker.
    /// If not running, returns Ok(false).
    pub fn try_connect(&mut self) -> Result<bool> {
        if self.stream.is_some() {
            return Ok(true);
        }

        let name = self.socket_name.as_str().to_ns_name::<GenericNamespaced>()?;
        match LocalStream::connect(name) {
            Ok(stream) => {
                info!("Connected to bridge worker");
                self.stream = Some(stream);
                Ok(true)
            }
            Err(_) => Ok(false),
        }
    }

    /// Send a request to the worker and wait for its response
    pub fn send_request(&mut self, request: &BridgeRequest) -> Result<BridgeResponse> {
        if !self.try_connect()? {
            anyhow::bail!("Bridge worker is not running on {}", self.socket_name);
        }
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("Not connected to bridge worker"))?;

        let json_request = serde_json::to_string(request)? + "\n";
        stream.write_all(json_request.as_bytes())?;
        stream.flush()?;

        let mut reader = BufReader::new(stream);
        let mut buffer = String::new();
        if reader.read_line(&mut buffer)? == 0 {
            self.stream = None;
            anyhow::bail!("Bridge worker closed the connection");
        }

        let response: BridgeResponse = serde_json::from_str(&buffer)?;
        Ok(response)
    }
}

/// Turn `ctl` arguments into a request, e.g. `power off` or `battery`
pub fn parse_request(args: &[String]) -> Result<BridgeRequest> {
    let words: Vec<&str> = args.iter().map(String::as_str).collect();
    let request = match words.as_slice() {
        ["ping"] => BridgeRequest::Ping,
        ["power"] => BridgeRequest::GetPowerState,
        ["power", "on" | "1"] => BridgeRequest::SetPowerState(1),
        ["power", "off" | "0"] => BridgeRequest::SetPowerState(0),
        ["charging"] => BridgeRequest::GetIsCharging,
        ["battery"] => BridgeRequest::GetBatteryLevel,
        ["identify"] => BridgeRequest::Identify,
        ["services"] => BridgeRequest::GetServices,
        _ => anyhow::bail!(
            "Unknown request '{}'. Expected one of: ping, power [on|off], charging, battery, identify, services",
            words.join(" ")
        ),
    };
    Ok(request)
}
