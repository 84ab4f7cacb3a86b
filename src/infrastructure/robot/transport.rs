//! Transport seam
//!
//! The network client that talks to the robot lives behind these traits.
//! Reconnecting after a dropped connection is the transport's business.

use crate::domain::error::TransportError;
use crate::domain::models::{DeviceCredentials, RobotState, StatusField};
use async_trait::async_trait;

/// Opens connections to a robot
#[async_trait]
pub trait RobotConnector: Send + Sync {
    /// Resolves once the robot has acknowledged the connection.
    ///
    /// On failure, anything partially opened must already be released.
    async fn connect(
        &self,
        credentials: &DeviceCredentials,
    ) -> Result<Box<dyn RobotLink>, TransportError>;
}

/// One open connection to a robot
#[async_trait]
pub trait RobotLink: Send {
    async fn read_status(&mut self, fields: &[StatusField]) -> Result<RobotState, TransportError>;

    async fn start(&mut self) -> Result<(), TransportError>;

    async fn pause(&mut self) -> Result<(), TransportError>;

    async fn dock(&mut self) -> Result<(), TransportError>;

    /// Release the connection. Safe to call more than once.
    fn release(&mut self);
}
