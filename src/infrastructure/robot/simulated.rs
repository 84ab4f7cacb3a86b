//! In-process robot
//!
//! Speaks the same state documents and command payloads as a real robot.
//! Phases can be scripted, failures injected, and every connection, read,
//! command and release is recorded.

use crate::domain::error::TransportError;
use crate::domain::models::{DeviceCredentials, MissionPhase, RobotCommand, RobotState, StatusField};
use crate::infrastructure::robot::protocol::{self, BATTERY_PERCENT, CLEAN_MISSION_STATUS};
use crate::infrastructure::robot::transport::{RobotConnector, RobotLink};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::time::Instant;
use tracing::{debug, trace};

/// Phase the robot reports while driving back to its base
pub const DOCKING_PHASE: &str = "hmUsrDock";

#[derive(Debug, Clone, PartialEq)]
pub enum RobotEvent {
    Connected,
    StatusRead(Option<MissionPhase>),
    Command(RobotCommand),
    Released,
}

#[derive(Debug)]
struct SimState {
    phase: MissionPhase,
    battery_percent: f64,
    scripted_phases: VecDeque<MissionPhase>,
    fail_connect: bool,
    fail_reads: bool,
    failing_commands: Vec<RobotCommand>,
    events: Vec<RobotEvent>,
    read_times: Vec<Instant>,
    connections: usize,
    releases: usize,
}

impl SimState {
    fn state_document(&self) -> Value {
        let cycle = match self.phase {
            MissionPhase::Run | MissionPhase::Pause | MissionPhase::Stop | MissionPhase::Stuck => {
                "clean"
            }
            _ => "none",
        };
        let error_code = u8::from(self.phase == MissionPhase::Stuck);
        json!({
            CLEAN_MISSION_STATUS: {
                "cycle": cycle,
                "phase": self.phase.as_str(),
                "error": error_code,
            },
            BATTERY_PERCENT: self.battery_percent,
        })
    }

    fn apply(&mut self, command: RobotCommand) {
        self.phase = match command {
            RobotCommand::Start => MissionPhase::Run,
            // The robot reports a paused mission as stopped
            RobotCommand::Pause => MissionPhase::Stop,
            // Already on the base, nothing to do
            RobotCommand::Dock if self.phase == MissionPhase::Charge => MissionPhase::Charge,
            RobotCommand::Dock => MissionPhase::from(DOCKING_PHASE),
        };
    }
}

#[derive(Clone)]
pub struct SimulatedRobot {
    state: Arc<Mutex<SimState>>,
}

impl SimulatedRobot {
    pub fn new(phase: MissionPhase, battery_percent: f64) -> Self {
        Self {
            state: Arc::new(Mutex::new(SimState {
                phase,
                battery_percent,
                scripted_phases: VecDeque::new(),
                fail_connect: false,
                fail_reads: false,
                failing_commands: Vec::new(),
                events: Vec::new(),
                read_times: Vec::new(),
                connections: 0,
                releases: 0,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        // A panicking test thread must not hide the recorded history
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Phases reported by the next status reads, in order, before falling
    /// back to the robot's own phase
    pub fn script_phases(&self, phases: impl IntoIterator<Item = MissionPhase>) {
        self.lock().scripted_phases.extend(phases);
    }

    pub fn set_phase(&self, phase: MissionPhase) {
        self.lock().phase = phase;
    }

    pub fn phase(&self) -> MissionPhase {
        self.lock().phase.clone()
    }

    pub fn set_battery(&self, battery_percent: f64) {
        self.lock().battery_percent = battery_percent;
    }

    pub fn fail_connect(&self, fail: bool) {
        self.lock().fail_connect = fail;
    }

    pub fn fail_reads(&self, fail: bool) {
        self.lock().fail_reads = fail;
    }

    pub fn fail_command(&self, command: RobotCommand) {
        self.lock().failing_commands.push(command);
    }

    pub fn events(&self) -> Vec<RobotEvent> {
        self.lock().events.clone()
    }

    /// Commands the robot acknowledged
    pub fn commands(&self) -> Vec<RobotCommand> {
        self.lock()
            .events
            .iter()
            .filter_map(|event| match event {
                RobotEvent::Command(command) => Some(*command),
                _ => None,
            })
            .collect()
    }

    pub fn read_times(&self) -> Vec<Instant> {
        self.lock().read_times.clone()
    }

    pub fn connections(&self) -> usize {
        self.lock().connections
    }

    pub fn releases(&self) -> usize {
        self.lock().releases
    }
}

#[async_trait]
impl RobotConnector for SimulatedRobot {
    async fn connect(
        &self,
        credentials: &DeviceCredentials,
    ) -> Result<Box<dyn RobotLink>, TransportError> {
        let mut state = self.lock();
        if state.fail_connect {
            return Err(TransportError::new(format!(
                "connect ECONNREFUSED {}:8883",
                credentials.hostname
            )));
        }
        state.connections += 1;
        state.events.push(RobotEvent::Connected);
        trace!("Simulated robot accepted connection from {}", credentials.blid);

        Ok(Box::new(SimulatedLink {
            state: self.state.clone(),
            released: false,
        }))
    }
}

struct SimulatedLink {
    state: Arc<Mutex<SimState>>,
    released: bool,
}

impl SimulatedLink {
    fn lock(&self) -> Result<MutexGuard<'_, SimState>, TransportError> {
        if self.released {
            return Err(TransportError::new("connection already released"));
        }
        Ok(self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner()))
    }

    fn command(&mut self, command: RobotCommand) -> Result<(), TransportError> {
        let time = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or_default();
        let payload = protocol::command_payload(command, time);

        let mut state = self.lock()?;
        let command = protocol::parse_command(&payload)?;
        if state.failing_commands.contains(&command) {
            return Err(TransportError::new(format!("{} rejected", command)));
        }
        state.apply(command);
        state.events.push(RobotEvent::Command(command));
        debug!("Simulated robot now in phase {}", state.phase);
        Ok(())
    }
}

#[async_trait]
impl RobotLink for SimulatedLink {
    async fn read_status(&mut self, fields: &[StatusField]) -> Result<RobotState, TransportError> {
        let mut state = self.lock()?;
        if state.fail_reads {
            return Err(TransportError::new("timed out waiting for robot state"));
        }
        if let Some(phase) = state.scripted_phases.pop_front() {
            state.phase = phase;
        }
        state.read_times.push(Instant::now());

        let parsed = protocol::parse_robot_state(&state.state_document(), fields)?;
        state.events.push(RobotEvent::StatusRead(parsed.phase.clone()));
        Ok(parsed)
    }

    async fn start(&mut self) -> Result<(), TransportError> {
        self.command(RobotCommand::Start)
    }

    async fn pause(&mut self) -> Result<(), TransportError> {
        self.command(RobotCommand::Pause)
    }

    async fn dock(&mut self) -> Result<(), TransportError> {
        self.command(RobotCommand::Dock)
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        state.releases += 1;
        state.events.push(RobotEvent::Released);
    }
}
