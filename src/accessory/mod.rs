//! Accessory layer: what the home bridge calls into

pub mod orchestrator;
pub mod roomba;

pub use orchestrator::{DockWaitOutcome, PowerOrchestrator};
pub use roomba::RoombaAccessory;
