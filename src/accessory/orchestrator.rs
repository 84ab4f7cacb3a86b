//! Power transitions
//!
//! Decides which command a power request needs given the robot's current
//! phase. Turning a running robot off pauses it, answers the caller, and
//! then waits in the background for the robot to stop before docking it.

use crate::domain::error::BridgeError;
use crate::domain::models::{MissionPhase, PowerState, RobotCommand};
use crate::domain::settings::DockWaitSettings;
use crate::infrastructure::robot::{ConnectionSession, RobotEndpoint};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// What a power request turns into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerPlan {
    Nothing,
    Start,
    PauseThenDock,
    Dock,
    RefuseStuck,
}

pub fn plan_transition(desired: PowerState, phase: &MissionPhase) -> PowerPlan {
    match (desired, phase) {
        (PowerState::On, MissionPhase::Run) => PowerPlan::Nothing,
        (
            PowerState::On,
            MissionPhase::Charge
            | MissionPhase::Pause
            | MissionPhase::Stop
            | MissionPhase::Stuck
            | MissionPhase::Other(_),
        ) => PowerPlan::Start,

        (PowerState::Off, MissionPhase::Run) => PowerPlan::PauseThenDock,
        (PowerState::Off, MissionPhase::Stop | MissionPhase::Pause) => PowerPlan::Dock,
        (PowerState::Off, MissionPhase::Stuck) => PowerPlan::RefuseStuck,
        // Docked, docking, or some phase we don't know: leave it alone
        (PowerState::Off, MissionPhase::Charge | MissionPhase::Other(_)) => PowerPlan::Nothing,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DockWaitOutcome {
    /// Dock command acknowledged after this many re-checks
    Docked { checks: u32 },
    /// The robot settled in a phase that doesn't warrant docking
    Abandoned(MissionPhase),
    /// Still running after every allowed re-check
    TimedOut,
    /// Superseded by a newer request or shut down
    Cancelled,
    Failed(BridgeError),
}

/// State of one pause cycle. Owns the session opened by the pause request.
struct DockWait {
    cycle: u64,
    session: ConnectionSession,
    endpoint: RobotEndpoint,
    interval: Duration,
    max_attempts: u32,
    cancel: oneshot::Receiver<()>,
}

impl DockWait {
    async fn run(mut self) -> DockWaitOutcome {
        let outcome = self.poll().await;
        self.session.close();

        match &outcome {
            DockWaitOutcome::Docked { checks } => {
                info!("Roomba docking (cycle {}, {} checks)", self.cycle, checks)
            }
            DockWaitOutcome::Abandoned(phase) => {
                info!("Roomba is not running ({}), not docking", phase)
            }
            DockWaitOutcome::TimedOut => warn!(
                "Roomba still running after {} checks, giving up on docking",
                self.max_attempts
            ),
            DockWaitOutcome::Cancelled => debug!("Dock wait cycle {} cancelled", self.cycle),
            DockWaitOutcome::Failed(e) => error!("Dock wait cycle {} failed: {}", self.cycle, e),
        }
        outcome
    }

    async fn poll(&mut self) -> DockWaitOutcome {
        for attempt in 1..=self.max_attempts {
            // A dropped sender counts as a cancel too
            tokio::select! {
                _ = &mut self.cancel => return DockWaitOutcome::Cancelled,
                _ = tokio::time::sleep(self.interval) => {}
            }

            // A superseding request may be holding the gate while it cancels us
            let _exclusive = tokio::select! {
                _ = &mut self.cancel => return DockWaitOutcome::Cancelled,
                exclusive = self.endpoint.exclusive() => exclusive,
            };
            info!("Checking Roomba status");
            let phase = match self.session.read_phase().await {
                Ok(phase) => phase,
                Err(e) => return DockWaitOutcome::Failed(e),
            };

            match phase {
                MissionPhase::Stop => {
                    info!("Roomba has stopped, issuing dock request");
                    return match self.session.send(RobotCommand::Dock).await {
                        Ok(()) => DockWaitOutcome::Docked { checks: attempt },
                        Err(e) => DockWaitOutcome::Failed(e),
                    };
                }
                MissionPhase::Run => info!(
                    "Roomba is still running. Will check again in {} ms",
                    self.interval.as_millis()
                ),
                MissionPhase::Charge
                | MissionPhase::Pause
                | MissionPhase::Stuck
                | MissionPhase::Other(_) => return DockWaitOutcome::Abandoned(phase),
            }
        }
        DockWaitOutcome::TimedOut
    }
}

struct DockWaitHandle {
    cycle: u64,
    cancel: Option<oneshot::Sender<()>>,
    task: JoinHandle<DockWaitOutcome>,
}

impl DockWaitHandle {
    /// Ask the cycle to stop. Does nothing if it already finished or was cancelled.
    fn cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(());
        }
    }

    async fn finish(self) -> DockWaitOutcome {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Dock wait cycle {} did not complete: {}", self.cycle, e);
                DockWaitOutcome::Cancelled
            }
        }
    }
}

pub struct PowerOrchestrator {
    endpoint: RobotEndpoint,
    settings: DockWaitSettings,
    active: Mutex<Option<DockWaitHandle>>,
    cycles: AtomicU64,
}

impl PowerOrchestrator {
    pub fn new(endpoint: RobotEndpoint, settings: DockWaitSettings) -> Self {
        Self {
            endpoint,
            settings,
            active: Mutex::new(None),
            cycles: AtomicU64::new(0),
        }
    }

    fn active(&self) -> MutexGuard<'_, Option<DockWaitHandle>> {
        self.active.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Move the robot towards the requested power state.
    ///
    /// Returns once the caller can be answered. For a running robot that is
    /// turned off, that is right after the pause is acknowledged; docking
    /// continues in the background.
    pub async fn set_power_state(&self, desired: PowerState) -> Result<(), BridgeError> {
        info!(
            "Request to set power state to [{}]",
            desired.as_switch_value()
        );

        let result = self.transition(desired).await;
        if let Err(e) = &result {
            error!(
                "Error setting power state to [{}]. Error was [{}]",
                desired.as_switch_value(),
                e
            );
        }
        result
    }

    async fn transition(&self, desired: PowerState) -> Result<(), BridgeError> {
        // Supersede under the gate so a dock wait started by a request
        // queued ahead of this one is seen and cancelled
        let _exclusive = self.endpoint.exclusive().await;
        self.supersede_dock_wait().await;

        let mut session = self.endpoint.open().await?;
        let phase = session.read_phase().await?;
        info!("Roomba phase is {}", phase);

        match plan_transition(desired, &phase) {
            PowerPlan::Nothing => {
                session.close();
                info!(
                    "Roomba is in-state {} for {}, not doing anything",
                    phase,
                    desired.as_switch_value()
                );
                Ok(())
            }
            PowerPlan::Start => {
                info!("Starting Roomba");
                session.send(RobotCommand::Start).await?;
                session.close();
                info!("Roomba started");
                Ok(())
            }
            PowerPlan::Dock => {
                session.send(RobotCommand::Dock).await?;
                session.close();
                info!("Roomba docking");
                Ok(())
            }
            PowerPlan::RefuseStuck => {
                session.close();
                warn!("Roomba is stuck and can't return to dock");
                Err(BridgeError::DeviceStuck)
            }
            PowerPlan::PauseThenDock => {
                info!("Pausing Roomba");
                session.send(RobotCommand::Pause).await?;
                info!("Roomba is paused, requesting that it return to dock");
                self.spawn_dock_wait(session);
                Ok(())
            }
        }
    }

    fn spawn_dock_wait(&self, session: ConnectionSession) {
        let cycle = self.cycles.fetch_add(1, Ordering::Relaxed) + 1;
        let (cancel_tx, cancel_rx) = oneshot::channel();
        let dock_wait = DockWait {
            cycle,
            session,
            endpoint: self.endpoint.clone(),
            interval: self.settings.poll_interval(),
            max_attempts: self.settings.max_attempts,
            cancel: cancel_rx,
        };

        let handle = DockWaitHandle {
            cycle,
            cancel: Some(cancel_tx),
            task: tokio::spawn(dock_wait.run()),
        };

        // Requests supersede while holding the gate, so this slot is normally empty
        if let Some(mut previous) = self.active().replace(handle) {
            previous.cancel();
        }
        debug!("Dock wait cycle {} started", cycle);
    }

    /// Cancel the pending dock wait, if any, and wait for it to let go of
    /// its connection
    async fn supersede_dock_wait(&self) {
        let previous = self.active().take();
        if let Some(mut previous) = previous {
            debug!("Superseding dock wait cycle {}", previous.cycle);
            previous.cancel();
            previous.finish().await;
        }
    }

    pub fn has_pending_dock_wait(&self) -> bool {
        self.active()
            .as_ref()
            .is_some_and(|handle| !handle.task.is_finished())
    }

    /// Wait for the pending dock wait to run to completion
    pub async fn wait_for_dock_wait(&self) -> Option<DockWaitOutcome> {
        let pending = self.active().take();
        match pending {
            Some(handle) => Some(handle.finish().await),
            None => None,
        }
    }

    /// Cancel any pending dock wait and wait for its connection to be released
    pub async fn shutdown(&self) {
        self.supersede_dock_wait().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::TransportError;
    use crate::domain::models::{DeviceCredentials, RobotState, StatusField};
    use crate::infrastructure::robot::simulated::{RobotEvent, SimulatedRobot};
    use crate::infrastructure::robot::{RobotConnector, RobotLink};
    use async_trait::async_trait;
    use std::sync::Arc;
    use tokio::time::Instant;

    const NETWORK_DELAY: Duration = Duration::from_millis(10);

    /// Simulated robot whose connect and status reads take a little while,
    /// so concurrent requests actually interleave
    struct SlowConnector(SimulatedRobot);

    struct SlowLink(Box<dyn RobotLink>);

    #[async_trait]
    impl RobotConnector for SlowConnector {
        async fn connect(
            &self,
            credentials: &DeviceCredentials,
        ) -> Result<Box<dyn RobotLink>, TransportError> {
            tokio::time::sleep(NETWORK_DELAY).await;
            let link = self.0.connect(credentials).await?;
            Ok(Box::new(SlowLink(link)))
        }
    }

    #[async_trait]
    impl RobotLink for SlowLink {
        async fn read_status(
            &mut self,
            fields: &[StatusField],
        ) -> Result<RobotState, TransportError> {
            tokio::time::sleep(NETWORK_DELAY).await;
            self.0.read_status(fields).await
        }

        async fn start(&mut self) -> Result<(), TransportError> {
            self.0.start().await
        }

        async fn pause(&mut self) -> Result<(), TransportError> {
            self.0.pause().await
        }

        async fn dock(&mut self) -> Result<(), TransportError> {
            self.0.dock().await
        }

        fn release(&mut self) {
            self.0.release()
        }
    }

    fn orchestrator(robot: &SimulatedRobot, max_attempts: u32) -> PowerOrchestrator {
        orchestrator_with(Arc::new(robot.clone()), max_attempts)
    }

    fn orchestrator_with(
        connector: Arc<dyn RobotConnector>,
        max_attempts: u32,
    ) -> PowerOrchestrator {
        let credentials = DeviceCredentials {
            blid: "3115850251687850".to_string(),
            password: "secret".to_string(),
            hostname: "192.168.1.104".to_string(),
        };
        let endpoint = RobotEndpoint::new(connector, credentials);
        PowerOrchestrator::new(
            endpoint,
            DockWaitSettings {
                poll_interval_ms: 3000,
                max_attempts,
            },
        )
    }

    fn assert_balanced(robot: &SimulatedRobot) {
        assert_eq!(robot.connections(), robot.releases());
    }

    /// Highest number of connections that were open at the same time
    fn max_open_sessions(robot: &SimulatedRobot) -> usize {
        let mut open = 0usize;
        let mut max = 0;
        for event in robot.events() {
            match event {
                RobotEvent::Connected => {
                    open += 1;
                    max = max.max(open);
                }
                RobotEvent::Released => open -= 1,
                _ => {}
            }
        }
        max
    }

    #[test]
    fn test_plan_table() {
        use crate::domain::models::MissionPhase::*;
        let other = || MissionPhase::from("hmUsrDock");

        assert_eq!(plan_transition(PowerState::On, &Run), PowerPlan::Nothing);
        for phase in [Charge, Pause, Stop, Stuck, other()] {
            assert_eq!(plan_transition(PowerState::On, &phase), PowerPlan::Start);
        }

        assert_eq!(
            plan_transition(PowerState::Off, &Run),
            PowerPlan::PauseThenDock
        );
        assert_eq!(plan_transition(PowerState::Off, &Stop), PowerPlan::Dock);
        assert_eq!(plan_transition(PowerState::Off, &Pause), PowerPlan::Dock);
        assert_eq!(
            plan_transition(PowerState::Off, &Stuck),
            PowerPlan::RefuseStuck
        );
        assert_eq!(plan_transition(PowerState::Off, &Charge), PowerPlan::Nothing);
        assert_eq!(plan_transition(PowerState::Off, &other()), PowerPlan::Nothing);
    }

    #[tokio::test(start_paused = true)]
    async fn test_turn_on_starts_once() {
        let robot = SimulatedRobot::new(MissionPhase::Charge, 80.0);
        let orchestrator = orchestrator(&robot, 10);

        orchestrator.set_power_state(PowerState::On).await.unwrap();

        assert_eq!(
            robot.events(),
            vec![
                RobotEvent::Connected,
                RobotEvent::StatusRead(Some(MissionPhase::Charge)),
                RobotEvent::Command(RobotCommand::Start),
                RobotEvent::Released,
            ]
        );
        assert!(!orchestrator.has_pending_dock_wait());
    }

    #[tokio::test(start_paused = true)]
    async fn test_turn_on_when_running_does_nothing() {
        let robot = SimulatedRobot::new(MissionPhase::Run, 80.0);
        let orchestrator = orchestrator(&robot, 10);

        orchestrator.set_power_state(PowerState::On).await.unwrap();

        assert!(robot.commands().is_empty());
        assert_eq!(robot.releases(), 1);
        assert_balanced(&robot);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_start_releases_once() {
        let robot = SimulatedRobot::new(MissionPhase::Stop, 80.0);
        robot.fail_command(RobotCommand::Start);
        let orchestrator = orchestrator(&robot, 10);

        let err = orchestrator
            .set_power_state(PowerState::On)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            BridgeError::Command {
                command: RobotCommand::Start,
                ..
            }
        ));
        assert_eq!(robot.connections(), 1);
        assert_eq!(robot.releases(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_turn_off_answers_after_pause_then_docks() {
        let robot = SimulatedRobot::new(MissionPhase::Run, 80.0);
        let orchestrator = orchestrator(&robot, 10);
        let requested_at = Instant::now();

        orchestrator.set_power_state(PowerState::Off).await.unwrap();

        // Answered without waiting for any re-check
        assert_eq!(Instant::now(), requested_at);
        assert_eq!(robot.commands(), vec![RobotCommand::Pause]);
        assert_eq!(robot.releases(), 0);
        assert!(orchestrator.has_pending_dock_wait());

        let outcome = orchestrator.wait_for_dock_wait().await;
        assert_eq!(outcome, Some(DockWaitOutcome::Docked { checks: 1 }));
        assert_eq!(
            robot.events(),
            vec![
                RobotEvent::Connected,
                RobotEvent::StatusRead(Some(MissionPhase::Run)),
                RobotEvent::Command(RobotCommand::Pause),
                RobotEvent::StatusRead(Some(MissionPhase::Stop)),
                RobotEvent::Command(RobotCommand::Dock),
                RobotEvent::Released,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_dock_wait_rechecks_until_stopped() {
        let robot = SimulatedRobot::new(MissionPhase::Charge, 80.0);
        robot.script_phases([MissionPhase::Run, MissionPhase::Run, MissionPhase::Stop]);
        let orchestrator = orchestrator(&robot, 10);

        orchestrator.set_power_state(PowerState::Off).await.unwrap();
        let outcome = orchestrator.wait_for_dock_wait().await;

        assert_eq!(outcome, Some(DockWaitOutcome::Docked { checks: 2 }));
        let reads = robot.read_times();
        assert_eq!(reads.len(), 3);
        assert_eq!(reads[1] - reads[0], Duration::from_millis(3000));
        assert_eq!(reads[2] - reads[1], Duration::from_millis(3000));

        assert_eq!(
            robot.commands(),
            vec![RobotCommand::Pause, RobotCommand::Dock]
        );
        let events = robot.events();
        assert_eq!(
            &events[events.len() - 2..],
            &[RobotEvent::Command(RobotCommand::Dock), RobotEvent::Released]
        );
        assert_eq!(robot.releases(), 1);
        assert_balanced(&robot);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dock_wait_abandons_when_not_running() {
        let robot = SimulatedRobot::new(MissionPhase::Charge, 80.0);
        robot.script_phases([MissionPhase::Run, MissionPhase::Pause]);
        let orchestrator = orchestrator(&robot, 10);

        orchestrator.set_power_state(PowerState::Off).await.unwrap();
        let outcome = orchestrator.wait_for_dock_wait().await;

        assert_eq!(
            outcome,
            Some(DockWaitOutcome::Abandoned(MissionPhase::Pause))
        );
        assert_eq!(robot.commands(), vec![RobotCommand::Pause]);
        assert_eq!(robot.read_times().len(), 2);
        assert_balanced(&robot);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dock_wait_gives_up_after_max_attempts() {
        let robot = SimulatedRobot::new(MissionPhase::Charge, 80.0);
        robot.script_phases(std::iter::repeat(MissionPhase::Run).take(10));
        let orchestrator = orchestrator(&robot, 3);
        let requested_at = Instant::now();

        orchestrator.set_power_state(PowerState::Off).await.unwrap();
        let outcome = orchestrator.wait_for_dock_wait().await;

        assert_eq!(outcome, Some(DockWaitOutcome::TimedOut));
        assert_eq!(robot.read_times().len(), 4);
        assert_eq!(requested_at.elapsed(), Duration::from_millis(9000));
        assert_eq!(robot.commands(), vec![RobotCommand::Pause]);
        assert_balanced(&robot);
    }

    #[tokio::test(start_paused = true)]
    async fn test_turn_off_stuck_sends_nothing() {
        let robot = SimulatedRobot::new(MissionPhase::Stuck, 80.0);
        let orchestrator = orchestrator(&robot, 10);

        let err = orchestrator
            .set_power_state(PowerState::Off)
            .await
            .unwrap_err();

        assert_eq!(err, BridgeError::DeviceStuck);
        assert!(robot.commands().is_empty());
        assert_eq!(robot.releases(), 1);
        assert_balanced(&robot);
    }

    #[tokio::test(start_paused = true)]
    async fn test_turn_off_stopped_or_paused_docks_directly() {
        for phase in [MissionPhase::Stop, MissionPhase::Pause] {
            let robot = SimulatedRobot::new(phase, 80.0);
            let orchestrator = orchestrator(&robot, 10);

            orchestrator.set_power_state(PowerState::Off).await.unwrap();

            assert_eq!(robot.commands(), vec![RobotCommand::Dock]);
            assert_eq!(robot.events().last(), Some(&RobotEvent::Released));
            assert!(orchestrator.wait_for_dock_wait().await.is_none());
            assert_balanced(&robot);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_turn_off_docked_or_unknown_does_nothing() {
        for phase in [MissionPhase::Charge, MissionPhase::from("hmUsrDock")] {
            let robot = SimulatedRobot::new(phase, 80.0);
            let orchestrator = orchestrator(&robot, 10);

            orchestrator.set_power_state(PowerState::Off).await.unwrap();

            assert!(robot.commands().is_empty());
            assert_balanced(&robot);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_connection_failure_is_reported() {
        let robot = SimulatedRobot::new(MissionPhase::Run, 80.0);
        robot.fail_connect(true);
        let orchestrator = orchestrator(&robot, 10);

        let err = orchestrator
            .set_power_state(PowerState::Off)
            .await
            .unwrap_err();

        assert!(matches!(err, BridgeError::Connection { .. }));
        assert_eq!(robot.connections(), 0);
        assert_eq!(robot.releases(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_failure_releases_and_reports() {
        let robot = SimulatedRobot::new(MissionPhase::Run, 80.0);
        robot.fail_reads(true);
        let orchestrator = orchestrator(&robot, 10);

        let err = orchestrator
            .set_power_state(PowerState::On)
            .await
            .unwrap_err();

        assert!(matches!(err, BridgeError::StatusRead(_)));
        assert!(robot.commands().is_empty());
        assert_balanced(&robot);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dock_failure_stays_in_background() {
        let robot = SimulatedRobot::new(MissionPhase::Run, 80.0);
        robot.fail_command(RobotCommand::Dock);
        let orchestrator = orchestrator(&robot, 10);

        // The caller already got its answer when the pause went through
        orchestrator.set_power_state(PowerState::Off).await.unwrap();
        let outcome = orchestrator.wait_for_dock_wait().await;

        assert!(matches!(
            outcome,
            Some(DockWaitOutcome::Failed(BridgeError::Command {
                command: RobotCommand::Dock,
                ..
            }))
        ));
        assert_eq!(robot.commands(), vec![RobotCommand::Pause]);
        assert_balanced(&robot);
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_request_supersedes_pending_dock_wait() {
        let robot = SimulatedRobot::new(MissionPhase::Charge, 80.0);
        robot.script_phases(std::iter::repeat(MissionPhase::Run).take(20));
        let orchestrator = orchestrator(&robot, 10);

        orchestrator.set_power_state(PowerState::Off).await.unwrap();
        assert!(orchestrator.has_pending_dock_wait());

        orchestrator.set_power_state(PowerState::Off).await.unwrap();
        assert!(orchestrator.has_pending_dock_wait());

        // The first cycle let go of its connection before the second connected
        let events = robot.events();
        let first_release = events
            .iter()
            .position(|e| *e == RobotEvent::Released)
            .unwrap();
        let second_connect = events
            .iter()
            .enumerate()
            .filter(|(_, e)| **e == RobotEvent::Connected)
            .nth(1)
            .map(|(i, _)| i)
            .unwrap();
        assert!(first_release < second_connect);
        assert_eq!(
            robot.commands(),
            vec![RobotCommand::Pause, RobotCommand::Pause]
        );

        orchestrator.shutdown().await;
        assert!(!orchestrator.has_pending_dock_wait());
        assert_eq!(robot.connections(), 2);
        assert_balanced(&robot);

        // Shutting down twice is harmless
        orchestrator.shutdown().await;
        assert!(orchestrator.wait_for_dock_wait().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_is_idempotent() {
        let robot = SimulatedRobot::new(MissionPhase::Run, 80.0);
        let orchestrator = orchestrator(&robot, 10);
        orchestrator.set_power_state(PowerState::Off).await.unwrap();

        let mut handle = orchestrator.active().take().unwrap();
        handle.cancel();
        handle.cancel();
        assert_eq!(handle.finish().await, DockWaitOutcome::Cancelled);
        assert_balanced(&robot);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlapping_requests_cancel_dock_wait() {
        let robot = SimulatedRobot::new(MissionPhase::Run, 80.0);
        let orchestrator = orchestrator_with(Arc::new(SlowConnector(robot.clone())), 100);

        let (off, on) = tokio::join!(
            orchestrator.set_power_state(PowerState::Off),
            orchestrator.set_power_state(PowerState::On)
        );
        off.unwrap();
        on.unwrap();

        assert_eq!(
            robot.commands(),
            vec![RobotCommand::Pause, RobotCommand::Start]
        );
        assert_eq!(max_open_sessions(&robot), 1);
        assert!(!orchestrator.has_pending_dock_wait());
        assert!(orchestrator.wait_for_dock_wait().await.is_none());
        assert_eq!(robot.phase(), MissionPhase::Run);
        assert_balanced(&robot);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dock_wait_cancelled_while_waiting_for_gate() {
        let robot = SimulatedRobot::new(MissionPhase::Run, 80.0);
        let orchestrator = orchestrator(&robot, 10);
        orchestrator.set_power_state(PowerState::Off).await.unwrap();

        let _exclusive = orchestrator.endpoint.exclusive().await;
        // The dock wait wakes up and queues behind the gate we hold
        tokio::time::sleep(Duration::from_millis(3500)).await;

        let mut handle = orchestrator.active().take().unwrap();
        handle.cancel();
        assert_eq!(handle.finish().await, DockWaitOutcome::Cancelled);
        assert_eq!(robot.read_times().len(), 1);
        assert_eq!(robot.commands(), vec![RobotCommand::Pause]);
        assert_balanced(&robot);
    }
}
