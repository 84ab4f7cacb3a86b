//! Robot Module
//!
//! Everything needed to talk to the vacuum over its local connection.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                RobotEndpoint                  │
//! │  (credentials + connector + operation gate)   │
//! └──────────────────────┬───────────────────────┘
//!                        │ open()
//!                        ▼
//!               ┌──────────────────┐
//!               │ ConnectionSession │  one per operation,
//!               └────────┬─────────┘  released exactly once
//!                        │
//!         ┌──────────────┼──────────────┐
//!         ▼              ▼              ▼
//!  ┌────────────┐ ┌────────────┐ ┌────────────┐
//!  │ Transport  │ │  Protocol  │ │ Simulated  │
//!  │ - traits   │ │ - state    │ │ - scripted │
//!  │            │ │ - commands │ │   robot    │
//!  └────────────┘ └────────────┘ └────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`transport`] - Connector and link traits implemented by a transport
//! - [`protocol`] - State document and command payload formats
//! - [`session`] - Per-operation connection lifecycle
//! - [`simulated`] - In-process robot

pub mod protocol;
pub mod session;
pub mod simulated;
pub mod transport;

pub use session::{ConnectionSession, RobotEndpoint};
pub use simulated::SimulatedRobot;
pub use transport::{RobotConnector, RobotLink};
