use crate::domain::models::{DeviceCredentials, MissionPhase};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogSettings {
    #[serde(default = "default_level")]
    pub level: String, // "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_false")]
    pub file_logging_enabled: bool,
    #[serde(default = "default_true")]
    pub console_logging_enabled: bool,
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
    #[serde(default = "default_prefix")]
    pub file_name_prefix: String,
    #[serde(default = "default_false")]
    pub show_file_line: bool,
    #[serde(default = "default_false")]
    pub show_thread_ids: bool,
    #[serde(default = "default_true")]
    pub show_target: bool,
    #[serde(default = "default_true")]
    pub ansi_colors: bool,
    #[serde(default = "default_rotation")]
    pub rotation: String, // "daily", "hourly", "minutely", "never"
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: default_level(),
            file_logging_enabled: default_false(),
            console_logging_enabled: default_true(),
            log_dir: default_log_dir(),
            file_name_prefix: default_prefix(),
            show_file_line: default_false(),
            show_thread_ids: default_false(),
            show_target: default_true(),
            ansi_colors: default_true(),
            rotation: default_rotation(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}
fn default_true() -> bool {
    true
}
fn default_false() -> bool {
    false
}
fn default_log_dir() -> String {
    "logs".to_string()
}
fn default_prefix() -> String {
    "roomba_bridge".to_string()
}
fn default_rotation() -> String {
    "daily".to_string()
}

/// Accessory configuration as entered by the user
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccessorySettings {
    /// Name shown in the Home app
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub blid: String,
    #[serde(default)]
    pub password: String,
    /// IP address or hostname of the robot
    #[serde(default)]
    pub hostname: String,
    #[serde(default)]
    pub model: String,
}

impl AccessorySettings {
    /// Every field is required; nothing else is checked.
    pub fn validate(&self) -> anyhow::Result<()> {
        let fields = [
            ("name", &self.name),
            ("blid", &self.blid),
            ("password", &self.password),
            ("hostname", &self.hostname),
            ("model", &self.model),
        ];
        let missing: Vec<&str> = fields
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(key, _)| *key)
            .collect();

        if !missing.is_empty() {
            anyhow::bail!("Missing accessory settings: {}", missing.join(", "));
        }
        Ok(())
    }

    pub fn credentials(&self) -> DeviceCredentials {
        DeviceCredentials {
            blid: self.blid.clone(),
            password: self.password.clone(),
            hostname: self.hostname.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DockWaitSettings {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Re-checks allowed while the robot keeps running before giving up
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl DockWaitSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// A zero interval or attempt count would give up on docking right after the pause
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.poll_interval_ms == 0 {
            anyhow::bail!("dock_wait.poll_interval_ms must be greater than 0");
        }
        if self.max_attempts == 0 {
            anyhow::bail!("dock_wait.max_attempts must be greater than 0");
        }
        Ok(())
    }
}

impl Default for DockWaitSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            max_attempts: default_max_attempts(),
        }
    }
}

fn default_poll_interval_ms() -> u64 {
    3000
}
fn default_max_attempts() -> u32 {
    100
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeSettings {
    #[serde(default = "default_socket_name")]
    pub socket_name: String,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            socket_name: default_socket_name(),
        }
    }
}

fn default_socket_name() -> String {
    "roomba_bridge.sock".to_string()
}

/// Starting state of the in-process robot used when no real transport is wired in
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationSettings {
    #[serde(default = "default_initial_phase")]
    pub initial_phase: MissionPhase,
    #[serde(default = "default_battery_percent")]
    pub battery_percent: f64,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            initial_phase: default_initial_phase(),
            battery_percent: default_battery_percent(),
        }
    }
}

fn default_initial_phase() -> MissionPhase {
    MissionPhase::Charge
}
fn default_battery_percent() -> f64 {
    100.0
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub accessory: AccessorySettings,

    #[serde(default)]
    pub dock_wait: DockWaitSettings,

    #[serde(default)]
    pub bridge: BridgeSettings,

    #[serde(default)]
    pub simulation: SimulationSettings,

    // Logging Settings
    #[serde(default)]
    pub log_settings: LogSettings,
}

pub struct SettingsService {
    settings: Settings,
    settings_path: PathBuf,
}

impl SettingsService {
    /// Load from the default location in the user's config directory
    pub fn new() -> anyhow::Result<Self> {
        let settings_path = Self::get_settings_path()?;
        Ok(Self::from_path(settings_path))
    }

    /// Load from an explicit file, falling back to defaults if it can't be read
    pub fn from_path(settings_path: PathBuf) -> Self {
        let settings = Self::load_from_file(&settings_path).unwrap_or_default();
        Self {
            settings,
            settings_path,
        }
    }

    fn get_settings_path() -> anyhow::Result<PathBuf> {
        let mut path = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        path.push("RoombaBridge");
        fs::create_dir_all(&path)?;
        path.push("settings.json");
        Ok(path)
    }

    fn load_from_file(path: &Path) -> anyhow::Result<Settings> {
        let contents = fs::read_to_string(path)?;
        let settings = serde_json::from_str(&contents)?;
        Ok(settings)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(&self.settings)?;
        fs::write(&self.settings_path, json)?;
        Ok(())
    }

    pub fn get(&self) -> &Settings {
        &self.settings
    }

    pub fn path(&self) -> &Path {
        &self.settings_path
    }
}
