//! [`CommandDispatcher`] – the only path from a [`MovementIntent`] to the
//! motor controller.
//!
//! Three rules are applied, in order, to every intent:
//!
//! 1. **Dedupe** – an intent equal to the last command actually sent is
//!    dropped.
//! 2. **Stop before reversal** – an intent opposing the last command
//!    (left/right, forward/backward) sends [`MovementIntent::Stop`] instead;
//!    the requested intent goes out on a later call.  Reversing a brushed
//!    drive without stopping can stall it.
//! 3. **Rate limit** – consecutive sends are spaced at least
//!    [`DispatcherConfig::command_delay_ms`] apart.  The call blocks for the
//!    remaining time, which back-pressures the frame loop.
//!
//! The dispatcher state only advances after a successful send, so a failed
//! write is retried by the next call with the same intent.
//!
//! | Intent | Wire code |
//! |--------|-----------|
//! | `Forward` | `F` |
//! | `Backward` | `B` |
//! | `Left` | `R` |
//! | `Right` | `L` |
//! | `Stop` | `S` |
//!
//! The turn codes are mirrored; see [`CommandCode`]'s `From<MovementIntent>`.

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use scout_types::{CommandCode, MovementIntent, ScoutError};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::motor::MotorController;

/// Minimum spacing between two commands on the motor link.
pub const COMMAND_DELAY: Duration = Duration::from_millis(100);

/// A dispatcher shared between the autonomous frame loop and manual drive.
pub type SharedDispatcher = Arc<Mutex<CommandDispatcher>>;

/// Dispatcher tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    pub command_delay_ms: u64,
}

impl DispatcherConfig {
    pub fn command_delay(&self) -> Duration {
        Duration::from_millis(self.command_delay_ms)
    }
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            command_delay_ms: COMMAND_DELAY.as_millis() as u64,
        }
    }
}

/// What a call to [`CommandDispatcher::dispatch`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The intent was translated and sent.
    Sent(CommandCode),
    /// The intent repeated the last command; nothing was sent.
    Suppressed,
    /// The intent reversed the last command; a stop was sent instead.
    StoppedBeforeReversal { deferred: MovementIntent },
}

/// Turns movement intents into rate-limited motor commands.
pub struct CommandDispatcher {
    motor: Box<dyn MotorController>,
    min_interval: Duration,
    last_command: Option<MovementIntent>,
    last_command_time: Option<Instant>,
    commands_sent: u64,
}

impl CommandDispatcher {
    pub fn new(motor: Box<dyn MotorController>, config: DispatcherConfig) -> Self {
        Self {
            motor,
            min_interval: config.command_delay(),
            last_command: None,
            last_command_time: None,
            commands_sent: 0,
        }
    }

    /// Wrap `self` for sharing across threads.
    pub fn shared(self) -> SharedDispatcher {
        Arc::new(Mutex::new(self))
    }

    /// Apply the dispatch rules to `intent`.
    ///
    /// # Errors
    ///
    /// Propagates the motor controller's [`ScoutError::HardwareFault`].  The
    /// dispatcher state is left unchanged so the next call retries.
    pub fn dispatch(&mut self, intent: MovementIntent) -> Result<DispatchOutcome, ScoutError> {
        match self.last_command {
            Some(last) if last == intent => {
                debug!(%intent, "suppressing repeated command");
                Ok(DispatchOutcome::Suppressed)
            }
            Some(last) if last.opposes(intent) => {
                info!(from = %last, to = %intent, "stopping before direction reversal");
                self.send(MovementIntent::Stop)?;
                Ok(DispatchOutcome::StoppedBeforeReversal { deferred: intent })
            }
            _ => self.send(intent).map(DispatchOutcome::Sent),
        }
    }

    /// Send a stop regardless of the last command.  Used when the frame loop
    /// shuts down.
    pub fn emergency_stop(&mut self) -> Result<(), ScoutError> {
        warn!(motor = self.motor.id(), "emergency stop");
        self.send(MovementIntent::Stop).map(|_| ())
    }

    /// The last intent that actually reached the motor controller.
    pub fn last_command(&self) -> Option<MovementIntent> {
        self.last_command
    }

    pub fn last_command_time(&self) -> Option<Instant> {
        self.last_command_time
    }

    /// Number of successful sends since construction.
    pub fn commands_sent(&self) -> u64 {
        self.commands_sent
    }

    pub fn motor_id(&self) -> &str {
        self.motor.id()
    }

    fn send(&mut self, intent: MovementIntent) -> Result<CommandCode, ScoutError> {
        if let Some(last) = self.last_command_time {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                thread::sleep(self.min_interval - elapsed);
            }
        }

        let code = CommandCode::from(intent);
        if let Err(e) = self.motor.send(code) {
            warn!(motor = self.motor.id(), %intent, error = %e, "failed to send command");
            return Err(e);
        }

        self.last_command = Some(intent);
        self.last_command_time = Some(Instant::now());
        self.commands_sent += 1;
        info!(%intent, code = %code.as_char(), "sent command");
        Ok(code)
    }
}
