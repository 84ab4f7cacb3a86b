//! Mission phase interpretation
//!
//! Maps what the robot reports to the facts the bridge answers with.

use crate::domain::models::{ChargingState, MissionPhase, RobotState};

/// The robot counts as powered on only while it is running a mission
pub fn is_power_on(phase: &MissionPhase) -> bool {
    match phase {
        MissionPhase::Run => true,
        MissionPhase::Charge
        | MissionPhase::Pause
        | MissionPhase::Stop
        | MissionPhase::Stuck
        | MissionPhase::Other(_) => false,
    }
}

pub fn charging_state(phase: &MissionPhase) -> ChargingState {
    match phase {
        MissionPhase::Charge => ChargingState::Charging,
        MissionPhase::Run
        | MissionPhase::Pause
        | MissionPhase::Stop
        | MissionPhase::Stuck
        | MissionPhase::Other(_) => ChargingState::NotCharging,
    }
}

/// Battery percentage as reported, untouched
pub fn battery_level(state: &RobotState) -> Option<f64> {
    state.battery_percent
}
