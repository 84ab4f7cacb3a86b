pub mod logging;
pub mod robot;
