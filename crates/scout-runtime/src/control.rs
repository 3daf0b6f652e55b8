//! [`ControlPlane`] – operator-facing state shared with the frame loop.
//!
//! The control plane owns three things the operator can change while the
//! robot is running:
//!
//! - the **mode** ([`ControlMode`]): idle, autonomous or manual.  Autonomous
//!   and manual drive are mutually exclusive; the mode is a single atomic
//!   value so both can never be on at once.
//! - the **classification context**: the detector prompt and which labels are
//!   targets or obstacles.  Updates swap a whole [`ClassificationContext`]
//!   snapshot; the frame loop reads one snapshot per frame.
//! - **manual drive**: operator directions are throttled and forwarded to the
//!   shared [`CommandDispatcher`][scout_hal::CommandDispatcher].
//!
//! # Example
//!
//! ```
//! use scout_hal::sim::SimMotorController;
//! use scout_hal::{CommandDispatcher, DispatcherConfig};
//! use scout_runtime::control::{ControlPlane, ManualOutcome};
//!
//! let motor = SimMotorController::new("drive_base");
//! let log = motor.log();
//! let control = ControlPlane::new(
//!     CommandDispatcher::new(Box::new(motor), DispatcherConfig::default()).shared(),
//! );
//!
//! let status = control.set_manual(true);
//! assert!(status.manual && !status.autonomous);
//! assert!(matches!(control.manual_command("forward"), Ok(ManualOutcome::Forwarded(_))));
//! assert_eq!(log.wire(), "F");
//! ```

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::{Duration, Instant};

use scout_hal::{CommandDispatcher, DispatchOutcome, SharedDispatcher};
use scout_types::{
    ClassificationContext, MovementIntent, ScoutError, DEFAULT_OBSTACLES, DEFAULT_TARGET_DESCRIPTION,
    DEFAULT_TARGET_OBJECTS,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Minimum spacing between two forwarded manual commands in the same
/// direction.
pub const CONTROL_FREQUENCY: Duration = Duration::from_millis(100);

/// Prefix of manual directions that select a target instead of moving.
const TARGET_PREFIX: &str = "target:";

// ────────────────────────────────────────────────────────────────────────────
// Mode
// ────────────────────────────────────────────────────────────────────────────

/// Who is driving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlMode {
    Idle,
    Autonomous,
    Manual,
}

impl ControlMode {
    fn as_u8(self) -> u8 {
        match self {
            ControlMode::Idle => 0,
            ControlMode::Autonomous => 1,
            ControlMode::Manual => 2,
        }
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => ControlMode::Autonomous,
            2 => ControlMode::Manual,
            _ => ControlMode::Idle,
        }
    }
}

/// The two operator-visible flags derived from [`ControlMode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeStatus {
    pub autonomous: bool,
    pub manual: bool,
}

impl From<ControlMode> for ModeStatus {
    fn from(mode: ControlMode) -> Self {
        Self {
            autonomous: mode == ControlMode::Autonomous,
            manual: mode == ControlMode::Manual,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Requests and outcomes
// ────────────────────────────────────────────────────────────────────────────

/// A request to change the detector prompt and role labels.
///
/// Only `prompt` is required; the other fields fall back to the survivor
/// search defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptUpdate {
    pub prompt: Option<String>,
    pub target: Option<String>,
    pub target_objects: Option<Vec<String>>,
    pub obstacles: Option<Vec<String>>,
}

impl PromptUpdate {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: Some(prompt.into()),
            ..Self::default()
        }
    }
}

/// What [`ControlPlane::manual_command`] did with a direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManualOutcome {
    /// Handed to the dispatcher, which reported this outcome.
    Forwarded(DispatchOutcome),
    /// Same direction within [`CONTROL_FREQUENCY`]; dropped.
    Throttled,
    /// A `target:<name>` selection; acknowledged only.
    TargetSelected(String),
}

/// A parsed operator direction.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ManualDirection {
    Move(MovementIntent),
    Target(String),
}

/// Target selections take part in throttling like moves: they become the
/// current direction, so the next move is never treated as a repeat.
#[derive(Debug, Default)]
struct ManualThrottle {
    current: Option<ManualDirection>,
    last_forwarded: Option<Instant>,
}

// ────────────────────────────────────────────────────────────────────────────
// ControlPlane
// ────────────────────────────────────────────────────────────────────────────

/// Thread-safe operator state.  Share it as `Arc<ControlPlane>`.
pub struct ControlPlane {
    mode: AtomicU8,
    context: RwLock<Arc<ClassificationContext>>,
    dispatcher: SharedDispatcher,
    throttle: Mutex<ManualThrottle>,
    control_frequency: Duration,
}

impl ControlPlane {
    /// Idle control plane with the default survivor-search context.
    pub fn new(dispatcher: SharedDispatcher) -> Self {
        Self {
            mode: AtomicU8::new(ControlMode::Idle.as_u8()),
            context: RwLock::new(Arc::new(ClassificationContext::default())),
            dispatcher,
            throttle: Mutex::new(ManualThrottle::default()),
            control_frequency: CONTROL_FREQUENCY,
        }
    }

    pub fn with_control_frequency(mut self, frequency: Duration) -> Self {
        self.control_frequency = frequency;
        self
    }

    // ── Mode ────────────────────────────────────────────────────────────────

    pub fn mode(&self) -> ControlMode {
        ControlMode::from_u8(self.mode.load(Ordering::SeqCst))
    }

    pub fn status(&self) -> ModeStatus {
        self.mode().into()
    }

    /// Turn autonomous drive on (switching manual off) or off.
    pub fn set_autonomous(&self, enabled: bool) -> ModeStatus {
        self.toggle(ControlMode::Autonomous, enabled)
    }

    /// Turn manual drive on (switching autonomous off) or off.
    pub fn set_manual(&self, enabled: bool) -> ModeStatus {
        self.toggle(ControlMode::Manual, enabled)
    }

    fn toggle(&self, mode: ControlMode, enabled: bool) -> ModeStatus {
        if enabled {
            self.mode.store(mode.as_u8(), Ordering::SeqCst);
        } else {
            // Only clear the mode if it is still the one being disabled.
            let _ = self.mode.compare_exchange(
                mode.as_u8(),
                ControlMode::Idle.as_u8(),
                Ordering::SeqCst,
                Ordering::SeqCst,
            );
        }
        let status = self.status();
        info!(autonomous = status.autonomous, manual = status.manual, "control mode changed");
        status
    }

    // ── Classification context ──────────────────────────────────────────────

    /// Current context snapshot.
    pub fn context(&self) -> Arc<ClassificationContext> {
        Arc::clone(&self.context.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Validate `update` and swap in the resulting context.
    ///
    /// # Errors
    ///
    /// Returns [`ScoutError::InvalidRequest`] when the prompt is missing,
    /// blank or names no label.  The current context is kept.
    pub fn update_prompt(&self, update: PromptUpdate) -> Result<Arc<ClassificationContext>, ScoutError> {
        let prompt = update
            .prompt
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| ScoutError::InvalidRequest("prompt is required".to_string()))?;
        let target = update
            .target
            .unwrap_or_else(|| DEFAULT_TARGET_DESCRIPTION.to_string());
        let target_objects = update
            .target_objects
            .unwrap_or_else(|| DEFAULT_TARGET_OBJECTS.iter().map(|s| s.to_string()).collect());
        let obstacles = update
            .obstacles
            .unwrap_or_else(|| DEFAULT_OBSTACLES.iter().map(|s| s.to_string()).collect());

        let context = Arc::new(ClassificationContext::new(prompt, target, target_objects, obstacles)?);
        *self.context.write().unwrap_or_else(PoisonError::into_inner) = Arc::clone(&context);
        info!(
            prompt = %context.prompt,
            description = %context.target,
            labels = context.label_map.len() - 1,
            "detection prompt updated"
        );
        Ok(context)
    }

    // ── Manual drive ────────────────────────────────────────────────────────

    /// Handle an operator direction such as `"left"` or `"target:a face"`.
    ///
    /// # Errors
    ///
    /// - [`ScoutError::ManualControlDisabled`] unless manual mode is on.
    /// - [`ScoutError::InvalidRequest`] for an empty or unknown direction.
    /// - Any dispatcher error; the throttle state is not advanced.
    pub fn manual_command(&self, direction: &str) -> Result<ManualOutcome, ScoutError> {
        if self.mode() != ControlMode::Manual {
            return Err(ScoutError::ManualControlDisabled);
        }
        let direction = direction.trim();
        if direction.is_empty() {
            return Err(ScoutError::InvalidRequest("direction is required".to_string()));
        }
        let requested = match direction.strip_prefix(TARGET_PREFIX) {
            Some(name) => ManualDirection::Target(name.to_string()),
            None => ManualDirection::Move(direction.parse()?),
        };

        let mut throttle = self.throttle.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();
        let due = throttle
            .last_forwarded
            .is_none_or(|t| now.duration_since(t) >= self.control_frequency);
        if !due && throttle.current.as_ref() == Some(&requested) {
            debug!(?requested, "throttling manual command");
            return Ok(ManualOutcome::Throttled);
        }

        let outcome = match &requested {
            ManualDirection::Target(name) => {
                info!(selection = %name, "operator selected target");
                ManualOutcome::TargetSelected(name.clone())
            }
            ManualDirection::Move(intent) => {
                let outcome = self.lock_dispatcher().dispatch(*intent)?;
                debug!(%intent, ?outcome, "manual command forwarded");
                ManualOutcome::Forwarded(outcome)
            }
        };
        throttle.last_forwarded = Some(now);
        throttle.current = match requested {
            ManualDirection::Move(MovementIntent::Stop) => None,
            other => Some(other),
        };
        Ok(outcome)
    }

    // ── Dispatcher access ───────────────────────────────────────────────────

    pub fn dispatcher(&self) -> &SharedDispatcher {
        &self.dispatcher
    }

    pub(crate) fn lock_dispatcher(&self) -> MutexGuard<'_, CommandDispatcher> {
        self.dispatcher.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
