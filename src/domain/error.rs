use crate::domain::models::RobotCommand;
use thiserror::Error;

/// Failure reported by the robot transport, always with a readable message
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BridgeError {
    #[error("unable to connect to Roomba at {hostname}: {source}")]
    Connection {
        hostname: String,
        #[source]
        source: TransportError,
    },

    #[error("Roomba is stuck and can't return to dock")]
    DeviceStuck,

    #[error("Roomba rejected {command} command: {source}")]
    Command {
        command: RobotCommand,
        #[source]
        source: TransportError,
    },

    #[error("unable to read Roomba status: {0}")]
    StatusRead(#[source] TransportError),

    #[error("Roomba did not report a battery level")]
    MissingBatteryLevel,
}
