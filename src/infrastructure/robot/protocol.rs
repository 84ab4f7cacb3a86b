//! Roomba local protocol
//!
//! Wire names for the state document the robot publishes and the command
//! payloads it accepts.

use crate::domain::error::TransportError;
use crate::domain::models::{MissionPhase, RobotCommand, RobotState, StatusField};
use serde_json::{json, Value};

/// Key of the mission status object in the robot state
pub const CLEAN_MISSION_STATUS: &str = "cleanMissionStatus";

/// Key of the battery percentage in the robot state
pub const BATTERY_PERCENT: &str = "batPct";

/// Who the robot reports as having issued a command
pub const INITIATOR: &str = "localApp";

impl StatusField {
    pub fn key(self) -> &'static str {
        match self {
            Self::CleanMissionStatus => CLEAN_MISSION_STATUS,
            Self::BatteryPercent => BATTERY_PERCENT,
        }
    }
}

/// Extract the requested fields from a robot state document
///
/// ```text
/// {
///   "cleanMissionStatus": { "cycle": "clean", "phase": "run", ... },
///   "batPct": 87
/// }
/// ```
pub fn parse_robot_state(doc: &Value, fields: &[StatusField]) -> Result<RobotState, TransportError> {
    let mut state = RobotState::default();

    for field in fields {
        let value = doc.get(field.key());
        match field {
            StatusField::CleanMissionStatus => {
                let phase = value
                    .and_then(|status| status.get("phase"))
                    .and_then(Value::as_str)
                    .ok_or_else(|| {
                        TransportError::new(format!("state has no {}.phase", CLEAN_MISSION_STATUS))
                    })?;
                state.phase = Some(MissionPhase::from(phase));
            }
            // A missing battery value is left for the caller to report
            StatusField::BatteryPercent => {
                state.battery_percent = value.and_then(Value::as_f64);
            }
        }
    }

    Ok(state)
}

/// Build the payload published on the command topic
pub fn command_payload(command: RobotCommand, time: u64) -> Value {
    json!({
        "command": command.as_str(),
        "time": time,
        "initiator": INITIATOR,
    })
}

/// Recover the command from a payload built by [`command_payload`]
pub fn parse_command(payload: &Value) -> Result<RobotCommand, TransportError> {
    match payload.get("command").and_then(Value::as_str) {
        Some("start") => Ok(RobotCommand::Start),
        Some("pause") => Ok(RobotCommand::Pause),
        Some("dock") => Ok(RobotCommand::Dock),
        Some(other) => Err(TransportError::new(format!("unknown command: {}", other))),
        None => Err(TransportError::new("payload has no command")),
    }
}
