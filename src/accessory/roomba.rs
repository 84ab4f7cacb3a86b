use crate::accessory::orchestrator::PowerOrchestrator;
use crate::domain::error::BridgeError;
use crate::domain::models::{ChargingState, MissionPhase, PowerState, StatusField};
use crate::domain::phase;
use crate::domain::settings::{AccessorySettings, DockWaitSettings};
use crate::infrastructure::robot::RobotEndpoint;
use serde::Serialize;
use tracing::{error, info};

pub const MANUFACTURER: &str = "iRobot";
/// The local protocol has no serial number query
pub const SERIAL_NUMBER: &str = "See iRobot App";

/// A service advertised to the home bridge and the characteristics it exposes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceDescription {
    pub service: &'static str,
    pub characteristics: Vec<CharacteristicDescription>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CharacteristicDescription {
    pub name: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
    pub readable: bool,
    pub writable: bool,
}

impl CharacteristicDescription {
    fn fixed(name: &'static str, value: serde_json::Value) -> Self {
        Self {
            name,
            value: Some(value),
            readable: false,
            writable: false,
        }
    }

    fn dynamic(name: &'static str, writable: bool) -> Self {
        Self {
            name,
            value: None,
            readable: true,
            writable,
        }
    }
}

/// The vacuum as the home bridge sees it: a switch plus a battery
pub struct RoombaAccessory {
    name: String,
    model: String,
    endpoint: RobotEndpoint,
    orchestrator: PowerOrchestrator,
}

impl RoombaAccessory {
    pub fn new(
        settings: &AccessorySettings,
        dock_wait: DockWaitSettings,
        endpoint: RobotEndpoint,
    ) -> Self {
        info!(
            "Initialised Roomba with Name: [{}] Hostname: [{}] BLID: [{}] Model: [{}]",
            settings.name, settings.hostname, settings.blid, settings.model
        );
        Self {
            name: settings.name.clone(),
            model: settings.model.clone(),
            orchestrator: PowerOrchestrator::new(endpoint.clone(), dock_wait),
            endpoint,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn orchestrator(&self) -> &PowerOrchestrator {
        &self.orchestrator
    }

    /// On while a cleaning mission is running
    pub async fn get_power_state(&self) -> Result<bool, BridgeError> {
        info!("Power state requested for Roomba");

        let result = self.query_phase().await.map(|p| phase::is_power_on(&p));
        match &result {
            Ok(true) => info!("Roomba is running"),
            Ok(false) => info!("Roomba is not running"),
            Err(e) => error!("Unable to determine power state of Roomba: {}", e),
        }
        result
    }

    pub async fn set_power_state(&self, desired: PowerState) -> Result<(), BridgeError> {
        self.orchestrator.set_power_state(desired).await
    }

    pub async fn get_is_charging(&self) -> Result<ChargingState, BridgeError> {
        info!("Charging status requested for Roomba");

        let result = self.query_phase().await.map(|p| phase::charging_state(&p));
        match &result {
            Ok(ChargingState::Charging) => info!("Roomba is charging"),
            Ok(ChargingState::NotCharging) => info!("Roomba is not charging"),
            Err(e) => error!("Unable to determine charging status for Roomba: {}", e),
        }
        result
    }

    pub async fn get_battery_level(&self) -> Result<f64, BridgeError> {
        info!("Battery level requested for Roomba");

        let result = self.query_battery().await;
        match &result {
            Ok(level) => info!("Roomba battery level [{}]", level),
            Err(e) => error!("Unable to determine battery level: {}", e),
        }
        result
    }

    /// The robot can't play a sound over the local protocol, so this always succeeds
    pub fn identify(&self) {
        info!("Identify requested. Not supported yet.");
    }

    pub fn services(&self) -> Vec<ServiceDescription> {
        info!("Services requested");
        vec![
            ServiceDescription {
                service: "AccessoryInformation",
                characteristics: vec![
                    CharacteristicDescription::fixed("Manufacturer", MANUFACTURER.into()),
                    CharacteristicDescription::fixed("SerialNumber", SERIAL_NUMBER.into()),
                    CharacteristicDescription::fixed("Identify", false.into()),
                    CharacteristicDescription::fixed("Name", self.name.clone().into()),
                    CharacteristicDescription::fixed("Model", self.model.clone().into()),
                ],
            },
            ServiceDescription {
                service: "Switch",
                characteristics: vec![CharacteristicDescription::dynamic("On", true)],
            },
            ServiceDescription {
                service: "BatteryService",
                characteristics: vec![
                    CharacteristicDescription::dynamic("BatteryLevel", false),
                    CharacteristicDescription::dynamic("ChargingState", false),
                ],
            },
        ]
    }

    async fn query_phase(&self) -> Result<MissionPhase, BridgeError> {
        let _exclusive = self.endpoint.exclusive().await;
        let mut session = self.endpoint.open().await?;
        let phase = session.read_phase().await?;
        session.close();
        Ok(phase)
    }

    async fn query_battery(&self) -> Result<f64, BridgeError> {
        let _exclusive = self.endpoint.exclusive().await;
        let mut session = self.endpoint.open().await?;
        let state = session.read_status(&[StatusField::BatteryPercent]).await?;
        session.close();
        phase::battery_level(&state).ok_or(BridgeError::MissingBatteryLevel)
    }
}
