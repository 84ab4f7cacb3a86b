//! Home bridge accessory for a Roomba vacuum on the local network.
//!
//! Answers switch and battery characteristic requests by opening a short
//! connection to the robot for each request. Turning a running robot off
//! pauses it and then docks it once it has come to a stop.

pub mod accessory;
pub mod bridge_client;
pub mod bridge_worker;
pub mod domain;
pub mod infrastructure;
