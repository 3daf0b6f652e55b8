//! In-process simulated drivers for tests and replay runs.
//!
//! [`SimMotorController`] records every command byte in a shared log that
//! stays readable after the controller has been moved into a
//! [`CommandDispatcher`][crate::dispatcher::CommandDispatcher].
//! [`SimCamera`] yields a fixed number of blank frames and [`SimDetector`]
//! plays back a scripted list of per-frame detector results.
//!
//! # Example
//!
//! ```rust
//! use scout_hal::sim::SimMotorController;
//! use scout_hal::{CommandDispatcher, DispatcherConfig};
//! use scout_types::{CommandCode, MovementIntent};
//!
//! let motor = SimMotorController::new("drive_base");
//! let log = motor.log();
//! let mut dispatcher = CommandDispatcher::new(Box::new(motor), DispatcherConfig::default());
//!
//! dispatcher.dispatch(MovementIntent::Forward).expect("sim send must succeed");
//! assert_eq!(log.codes(), vec![CommandCode::Forward]);
//! ```

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use scout_types::{ClassificationContext, CommandCode, Detection, ScoutError};

use crate::camera::{Camera, CameraFrame};
use crate::detector::Detector;
use crate::motor::MotorController;

// ────────────────────────────────────────────────────────────────────────────
// Simulated motor controller
// ────────────────────────────────────────────────────────────────────────────

/// Shared, cloneable view of the commands a [`SimMotorController`] accepted.
#[derive(Debug, Clone, Default)]
pub struct CommandLog {
    codes: Arc<Mutex<Vec<CommandCode>>>,
    failures: Arc<AtomicUsize>,
}

impl CommandLog {
    /// Every accepted command, oldest first.
    pub fn codes(&self) -> Vec<CommandCode> {
        self.codes.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Accepted commands rendered as their wire characters, e.g. `"FSB"`.
    pub fn wire(&self) -> String {
        self.codes().into_iter().map(CommandCode::as_char).collect()
    }

    /// Make the next `n` sends fail with a hardware fault.
    pub fn fail_next(&self, n: usize) {
        self.failures.store(n, Ordering::SeqCst);
    }

    fn record(&self, code: CommandCode) {
        self.codes.lock().unwrap_or_else(PoisonError::into_inner).push(code);
    }

    fn take_failure(&self) -> bool {
        self.failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

/// A motor controller that records commands instead of moving anything.
pub struct SimMotorController {
    id: String,
    log: CommandLog,
}

impl SimMotorController {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            log: CommandLog::default(),
        }
    }

    /// Handle to the command log.
    pub fn log(&self) -> CommandLog {
        self.log.clone()
    }
}

impl MotorController for SimMotorController {
    fn id(&self) -> &str {
        &self.id
    }

    fn send(&mut self, code: CommandCode) -> Result<(), ScoutError> {
        if self.log.take_failure() {
            return Err(ScoutError::HardwareFault {
                component: self.id.clone(),
                details: "simulated write failure".to_string(),
            });
        }
        self.log.record(code);
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Simulated camera
// ────────────────────────────────────────────────────────────────────────────

/// A camera that yields `frames` blank frames and then ends the stream.
pub struct SimCamera {
    id: String,
    width: u32,
    height: u32,
    remaining: Option<usize>,
}

impl SimCamera {
    pub fn new(id: impl Into<String>, width: u32, height: u32, frames: usize) -> Self {
        Self {
            id: id.into(),
            width,
            height,
            remaining: Some(frames),
        }
    }

    /// A camera that never runs out of frames.
    pub fn endless(id: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            id: id.into(),
            width,
            height,
            remaining: None,
        }
    }
}

impl Camera for SimCamera {
    fn id(&self) -> &str {
        &self.id
    }

    fn capture(&mut self) -> Result<Option<CameraFrame>, ScoutError> {
        if let Some(n) = self.remaining.as_mut() {
            if *n == 0 {
                return Ok(None);
            }
            *n -= 1;
        }
        Ok(Some(CameraFrame::blank(self.width, self.height)))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Scripted detector
// ────────────────────────────────────────────────────────────────────────────

/// A detector that returns pre-recorded results, one per call.  Once the
/// script is exhausted every frame is empty.
#[derive(Default)]
pub struct SimDetector {
    script: VecDeque<Result<Vec<Detection>, ScoutError>>,
}

impl SimDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a frame with the given detections.
    pub fn then_detect(mut self, detections: Vec<Detection>) -> Self {
        self.script.push_back(Ok(detections));
        self
    }

    /// Append `n` frames with the same detections.
    pub fn repeat(mut self, detections: Vec<Detection>, n: usize) -> Self {
        for _ in 0..n {
            self.script.push_back(Ok(detections.clone()));
        }
        self
    }

    /// Append a frame on which inference fails.
    pub fn then_fail(mut self, reason: impl Into<String>) -> Self {
        self.script.push_back(Err(ScoutError::Detector(reason.into())));
        self
    }

    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl Detector for SimDetector {
    fn detect(
        &mut self,
        _frame: &CameraFrame,
        _context: &ClassificationContext,
    ) -> Result<Vec<Detection>, ScoutError> {
        self.script.pop_front().unwrap_or_else(|| Ok(Vec::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scout_types::BoundingBox;

    #[test]
    fn sim_motor_records_codes() {
        let mut motor = SimMotorController::new("drive_base");
        let log = motor.log();
        motor.send(CommandCode::Forward).unwrap();
        motor.send(CommandCode::Stop).unwrap();
        assert_eq!(log.wire(), "FS");
    }

    #[test]
    fn sim_motor_injected_failures_are_not_recorded() {
        let mut motor = SimMotorController::new("drive_base");
        let log = motor.log();
        log.fail_next(1);
        assert!(matches!(
            motor.send(CommandCode::Forward),
            Err(ScoutError::HardwareFault { .. })
        ));
        motor.send(CommandCode::Forward).unwrap();
        assert_eq!(log.codes(), vec![CommandCode::Forward]);
    }

    #[test]
    fn sim_camera_ends_after_frame_budget() {
        let mut cam = SimCamera::new("front", 640, 480, 2);
        assert_eq!(cam.capture().unwrap().unwrap().width, 640);
        assert!(cam.capture().unwrap().is_some());
        assert!(cam.capture().unwrap().is_none());
        assert!(cam.capture().unwrap().is_none());
    }

    #[test]
    fn endless_camera_keeps_going() {
        let mut cam = SimCamera::endless("front", 4, 4);
        for _ in 0..100 {
            assert!(cam.capture().unwrap().is_some());
        }
    }

    #[test]
    fn sim_detector_plays_script_in_order() {
        let d = Detection::new(BoundingBox::new(0.0, 0.0, 1.0, 1.0), 1, 0.5);
        let mut detector = SimDetector::new()
            .then_detect(vec![d.clone()])
            .then_fail("model crashed")
            .repeat(vec![d.clone(), d.clone()], 2);
        let frame = CameraFrame::blank(1, 1);
        let ctx = ClassificationContext::default();

        assert_eq!(detector.detect(&frame, &ctx).unwrap().len(), 1);
        assert!(matches!(detector.detect(&frame, &ctx), Err(ScoutError::Detector(_))));
        assert_eq!(detector.detect(&frame, &ctx).unwrap().len(), 2);
        assert_eq!(detector.remaining(), 1);
        detector.detect(&frame, &ctx).unwrap();
        assert!(detector.detect(&frame, &ctx).unwrap().is_empty());
    }
}
