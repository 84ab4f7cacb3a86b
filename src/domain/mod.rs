pub mod error;
pub mod models;
pub mod phase;
pub mod settings;
