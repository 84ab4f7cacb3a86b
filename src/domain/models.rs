use serde::{Deserialize, Serialize};
use std::fmt;

/// Credentials used to open every connection to the robot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceCredentials {
    pub blid: String,
    pub password: String,
    pub hostname: String,
}

/// Mission phase reported by the robot in `cleanMissionStatus.phase`.
///
/// Unrecognised phases are kept verbatim so that callers have to decide
/// explicitly what to do with them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MissionPhase {
    Run,
    Charge,
    Pause,
    Stop,
    Stuck,
    Other(String),
}

impl MissionPhase {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Run => "run",
            Self::Charge => "charge",
            Self::Pause => "pause",
            Self::Stop => "stop",
            Self::Stuck => "stuck",
            Self::Other(raw) => raw,
        }
    }
}

impl From<&str> for MissionPhase {
    fn from(raw: &str) -> Self {
        match raw {
            "run" => Self::Run,
            "charge" => Self::Charge,
            "pause" => Self::Pause,
            "stop" => Self::Stop,
            "stuck" => Self::Stuck,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for MissionPhase {
    fn from(raw: String) -> Self {
        Self::from(raw.as_str())
    }
}

impl From<MissionPhase> for String {
    fn from(phase: MissionPhase) -> Self {
        phase.as_str().to_string()
    }
}

impl fmt::Display for MissionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a single status read. Only the requested fields are populated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RobotState {
    pub phase: Option<MissionPhase>,
    pub battery_percent: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerState {
    Off,
    On,
}

impl PowerState {
    /// The switch characteristic sends `0` or `1`; anything non-zero is on.
    pub fn from_switch_value(value: u8) -> Self {
        if value == 0 {
            Self::Off
        } else {
            Self::On
        }
    }

    pub fn as_switch_value(self) -> u8 {
        match self {
            Self::Off => 0,
            Self::On => 1,
        }
    }
}

/// Charging state using the HomeKit characteristic numbering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChargingState {
    NotCharging = 0,
    Charging = 1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RobotCommand {
    Start,
    Pause,
    Dock,
}

impl RobotCommand {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Pause => "pause",
            Self::Dock => "dock",
        }
    }
}

impl fmt::Display for RobotCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Top-level fields that can be requested in a status read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusField {
    CleanMissionStatus,
    BatteryPercent,
}
