// ─── Process Lifecycle ───
// Launch state machine, the single-launch gate and exit relay.
//
//   NotStarted ──► Launching ──► Running ──► Exited
//        │             │
//        └─────────────┴──► Failed   (setup or engine start failed)

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{oneshot, watch};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::renderer::RendererDescriptor;

use super::crash::{CrashReport, CrashReporter};

// ─── Outcome & State ───

/// How the native process ended. Produced once per launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessOutcome {
    pub code: i32,
    pub is_signal: bool,
}

impl ProcessOutcome {
    pub fn is_success(&self) -> bool {
        self.code == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum LaunchState {
    NotStarted,
    Launching,
    Running,
    Exited { outcome: ProcessOutcome },
    Failed { reason: String },
}

impl LaunchState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, LaunchState::Exited { .. } | LaunchState::Failed { .. })
    }
}

/// Facts retained from setup for crash reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchFacts {
    pub launch_id: Uuid,
    pub version_name: String,
    /// `None` for launches without a renderer.
    pub renderer: Option<RendererDescriptor>,
    pub architecture: String,
    pub runtime_name: String,
    pub runtime_version: u32,
}

// ─── Launch Gate ───

/// Admits at most one active launch.
#[derive(Debug, Clone, Default)]
pub struct LaunchGate {
    active: Arc<AtomicBool>,
}

impl LaunchGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_acquire(&self) -> LauncherResult<ActiveLaunch> {
        self.active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| LauncherError::LaunchInProgress)?;
        Ok(ActiveLaunch {
            active: Arc::clone(&self.active),
            launch_id: Uuid::new_v4(),
        })
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

/// Ownership of the gate for one launch. Dropping it releases the gate.
#[derive(Debug)]
pub struct ActiveLaunch {
    active: Arc<AtomicBool>,
    launch_id: Uuid,
}

impl ActiveLaunch {
    pub fn launch_id(&self) -> Uuid {
        self.launch_id
    }
}

impl Drop for ActiveLaunch {
    fn drop(&mut self) {
        self.active.store(false, Ordering::Release);
    }
}

// ─── Exit Sink ───

/// One-shot exit channel handed to the native engine. Only the first
/// notification is delivered.
#[derive(Debug, Clone)]
pub struct ExitSink {
    sender: Arc<Mutex<Option<oneshot::Sender<ProcessOutcome>>>>,
}

impl ExitSink {
    pub fn channel() -> (Self, oneshot::Receiver<ProcessOutcome>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                sender: Arc::new(Mutex::new(Some(tx))),
            },
            rx,
        )
    }

    /// Returns `true` if this call delivered the outcome.
    pub fn notify(&self, code: i32, is_signal: bool) -> bool {
        let sender = match self.sender.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        let Some(sender) = sender else {
            warn!("Ignoring repeated exit notification (code {})", code);
            return false;
        };
        sender.send(ProcessOutcome { code, is_signal }).is_ok()
    }
}

// ─── Collaborators ───

/// An auxiliary service running alongside the game, such as the touch
/// controller proxy.
#[async_trait]
pub trait PeripheralProxy: Send + Sync {
    fn name(&self) -> &str;

    /// Start serving. Returns the endpoint the game should connect to.
    async fn start(&self, vibrate_duration_ms: Option<u32>) -> LauncherResult<String>;

    async fn stop(&self);
}

pub trait UserNotifier: Send + Sync {
    fn launch_failed(&self, error: &LauncherError);
    fn game_exited(&self, outcome: &ProcessOutcome);
}

/// Notifier that only writes to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl UserNotifier for LogNotifier {
    fn launch_failed(&self, error: &LauncherError) {
        error!("Launch failed: {}", error);
    }

    fn game_exited(&self, outcome: &ProcessOutcome) {
        if outcome.is_success() {
            info!("Game exited normally");
        } else {
            error!(
                "Game exited with code {}{}",
                outcome.code,
                if outcome.is_signal { " (signal)" } else { "" }
            );
        }
    }
}

// ─── Controller ───

/// Drives one launch from setup to exit.
pub struct ProcessLifecycleController {
    state: watch::Sender<LaunchState>,
    active: Option<ActiveLaunch>,
    peripherals: Vec<Arc<dyn PeripheralProxy>>,
    crash_reporter: Arc<dyn CrashReporter>,
    notifier: Arc<dyn UserNotifier>,
    facts: Option<LaunchFacts>,
}

impl ProcessLifecycleController {
    pub fn new(
        active: ActiveLaunch,
        crash_reporter: Arc<dyn CrashReporter>,
        notifier: Arc<dyn UserNotifier>,
    ) -> (Self, watch::Receiver<LaunchState>) {
        let (state, rx) = watch::channel(LaunchState::NotStarted);
        (
            Self {
                state,
                active: Some(active),
                peripherals: Vec::new(),
                crash_reporter,
                notifier,
                facts: None,
            },
            rx,
        )
    }

    pub fn launch_id(&self) -> Option<Uuid> {
        self.active.as_ref().map(ActiveLaunch::launch_id)
    }

    pub fn state(&self) -> LaunchState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<LaunchState> {
        self.state.subscribe()
    }

    pub fn add_peripheral(&mut self, peripheral: Arc<dyn PeripheralProxy>) {
        self.peripherals.push(peripheral);
    }

    /// Setup finished; the engine is about to take over.
    pub fn launching(&mut self, facts: LaunchFacts) {
        self.facts = Some(facts);
        self.transition(LaunchState::Launching);
    }

    /// The engine accepted control.
    pub fn running(&self) {
        self.transition(LaunchState::Running);
    }

    /// Abort before the process started. Notifies the user once.
    pub async fn fail(mut self, error: LauncherError) -> LauncherError {
        self.release().await;
        self.notifier.launch_failed(&error);
        self.transition(LaunchState::Failed {
            reason: error.to_string(),
        });
        error
    }

    /// Wait for the single exit notification and finish the launch.
    pub async fn await_exit(
        self,
        exit: oneshot::Receiver<ProcessOutcome>,
    ) -> LauncherResult<ProcessOutcome> {
        match exit.await {
            Ok(outcome) => Ok(self.on_exit(outcome).await),
            Err(_) => Err(self.fail(LauncherError::OutcomeLost).await),
        }
    }

    async fn on_exit(mut self, outcome: ProcessOutcome) -> ProcessOutcome {
        info!(
            "Native process exited (code {}, signal {})",
            outcome.code, outcome.is_signal
        );
        self.release().await;

        if !outcome.is_success() {
            match &self.facts {
                Some(facts) => {
                    let report = CrashReport::new(facts, outcome);
                    if let Err(err) = self.crash_reporter.report(&report) {
                        error!("Could not write crash report: {}", err);
                    }
                }
                None => warn!("No launch facts retained, skipping crash report"),
            }
        }

        self.notifier.game_exited(&outcome);
        self.transition(LaunchState::Exited { outcome });
        outcome
    }

    async fn release(&mut self) {
        // Gate first so a new launch may begin while peripherals wind down.
        drop(self.active.take());
        for peripheral in std::mem::take(&mut self.peripherals) {
            info!("Stopping {}", peripheral.name());
            peripheral.stop().await;
        }
    }

    fn transition(&self, next: LaunchState) {
        info!("Launch state → {:?}", next);
        self.state.send_replace(next);
    }
}
