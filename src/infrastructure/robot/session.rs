//! Connection sessions
//!
//! A session wraps one connection for one logical operation and releases it
//! exactly once. Any failed operation releases the connection before the
//! error is handed back.

use crate::domain::error::{BridgeError, TransportError};
use crate::domain::models::{DeviceCredentials, MissionPhase, RobotCommand, RobotState, StatusField};
use crate::infrastructure::robot::transport::{RobotConnector, RobotLink};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, error, info, warn};

pub struct ConnectionSession {
    link: Box<dyn RobotLink>,
    hostname: String,
    closed: bool,
}

impl ConnectionSession {
    /// Connect and wait for the robot to acknowledge
    pub async fn open(
        connector: &dyn RobotConnector,
        credentials: &DeviceCredentials,
    ) -> Result<Self, BridgeError> {
        info!("Connecting to Roomba at {}", credentials.hostname);

        let link = connector.connect(credentials).await.map_err(|source| {
            error!("Connection to {} failed: {}", credentials.hostname, source);
            BridgeError::Connection {
                hostname: credentials.hostname.clone(),
                source,
            }
        })?;

        info!("Connected to Roomba");
        Ok(Self {
            link,
            hostname: credentials.hostname.clone(),
            closed: false,
        })
    }

    pub async fn read_status(&mut self, fields: &[StatusField]) -> Result<RobotState, BridgeError> {
        if self.closed {
            return Err(self.closed_error());
        }
        match self.link.read_status(fields).await {
            Ok(state) => Ok(state),
            Err(source) => {
                self.close();
                Err(BridgeError::StatusRead(source))
            }
        }
    }

    /// Read the current mission phase
    pub async fn read_phase(&mut self) -> Result<MissionPhase, BridgeError> {
        let state = self.read_status(&[StatusField::CleanMissionStatus]).await?;
        match state.phase {
            Some(phase) => {
                debug!("Status is [{}]", phase);
                Ok(phase)
            }
            None => {
                self.close();
                Err(BridgeError::StatusRead(TransportError::new(
                    "state has no mission phase",
                )))
            }
        }
    }

    /// Send a command and wait for the robot to acknowledge it
    pub async fn send(&mut self, command: RobotCommand) -> Result<(), BridgeError> {
        if self.closed {
            return Err(BridgeError::Command {
                command,
                source: TransportError::new("session already closed"),
            });
        }

        debug!("Sending {} command", command);
        let result = match command {
            RobotCommand::Start => self.link.start().await,
            RobotCommand::Pause => self.link.pause().await,
            RobotCommand::Dock => self.link.dock().await,
        };

        result.map_err(|source| {
            self.close();
            BridgeError::Command { command, source }
        })
    }

    /// Release the connection. Later calls do nothing.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.link.release();
        debug!("Released connection to {}", self.hostname);
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn closed_error(&self) -> BridgeError {
        BridgeError::StatusRead(TransportError::new("session already closed"))
    }
}

impl Drop for ConnectionSession {
    fn drop(&mut self) {
        if !self.closed {
            warn!(
                "Connection to {} dropped while still open, releasing",
                self.hostname
            );
            self.close();
        }
    }
}

/// Everything needed to reach the robot, shared by all operations.
///
/// The gate serialises device access so commands from different requests
/// never interleave on the robot.
#[derive(Clone)]
pub struct RobotEndpoint {
    connector: Arc<dyn RobotConnector>,
    credentials: DeviceCredentials,
    gate: Arc<Mutex<()>>,
}

impl RobotEndpoint {
    pub fn new(connector: Arc<dyn RobotConnector>, credentials: DeviceCredentials) -> Self {
        Self {
            connector,
            credentials,
            gate: Arc::new(Mutex::new(())),
        }
    }

    pub async fn open(&self) -> Result<ConnectionSession, BridgeError> {
        ConnectionSession::open(self.connector.as_ref(), &self.credentials).await
    }

    /// Wait for exclusive use of the robot
    pub async fn exclusive(&self) -> OwnedMutexGuard<()> {
        self.gate.clone().lock_owned().await
    }
}
