//! [`Pipeline`] – the per-frame Capture → Detect → Merge → Track → Decide →
//! Dispatch loop.
//!
//! Each [`Pipeline::tick`] runs one frame to completion before the next one
//! is captured.  Per-frame failures never stop the loop:
//!
//! | Failure | Effect |
//! |---|---|
//! | camera returns `None` or fails | [`TickOutcome::EndOfStream`] |
//! | detector fails | frame skipped, tracker untouched |
//! | unknown label id | frame skipped, tracker untouched |
//! | motor send fails | logged; the dispatcher retries on the next frame |
//!
//! Decisions are only made and dispatched while the [`ControlPlane`] is in
//! autonomous mode; otherwise the tracker keeps running so objects are
//! already confirmed when autonomy is switched on.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::sync::atomic::AtomicBool;
//!
//! use scout_hal::sim::{SimCamera, SimDetector, SimMotorController};
//! use scout_hal::{CommandDispatcher, DispatcherConfig};
//! use scout_runtime::control::ControlPlane;
//! use scout_runtime::pipeline::{Pipeline, PipelineConfig};
//!
//! let motor = SimMotorController::new("drive_base");
//! let log = motor.log();
//! let dispatcher = CommandDispatcher::new(Box::new(motor), DispatcherConfig::default());
//! let control = Arc::new(ControlPlane::new(dispatcher.shared()));
//!
//! let mut pipeline = Pipeline::new(
//!     Box::new(SimCamera::new("front", 640, 480, 3)),
//!     Box::new(SimDetector::new()),
//!     control,
//! )
//! .with_config(PipelineConfig { frame_interval_ms: 0, ..PipelineConfig::default() });
//!
//! let summary = pipeline.run(&AtomicBool::new(false));
//! assert_eq!(summary.processed, 3);
//! assert_eq!(log.wire(), "S"); // emergency stop on exit
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use scout_hal::{Camera, DispatchOutcome, Detector};
use scout_perception::{merge_frame, ObjectTracker, TrackerConfig, DEFAULT_MERGE_IOU_THRESHOLD};
use scout_types::MovementIntent;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::control::{ControlMode, ControlPlane};
use crate::navigation::{NavigationConfig, Navigator};
use crate::telemetry::frame_span;

// ────────────────────────────────────────────────────────────────────────────
// Configuration
// ────────────────────────────────────────────────────────────────────────────

/// Frame loop tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Pause between two frames.
    pub frame_interval_ms: u64,
    /// Overlap above which same-label detections in one frame are merged.
    pub merge_iou_threshold: f32,
}

impl PipelineConfig {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            frame_interval_ms: 30,
            merge_iou_threshold: DEFAULT_MERGE_IOU_THRESHOLD,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Outcomes
// ────────────────────────────────────────────────────────────────────────────

/// Result of a single [`Pipeline::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The frame went through the tracker.  `intent` is set when a decision
    /// was made (autonomous mode).
    Processed {
        confirmed: usize,
        intent: Option<MovementIntent>,
    },
    /// The frame was dropped before reaching the tracker.
    Skipped,
    /// The frame source is exhausted.
    EndOfStream,
}

impl TickOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Processed { .. } => "processed",
            Self::Skipped => "skipped",
            Self::EndOfStream => "end_of_stream",
        }
    }
}

/// Counters reported by [`Pipeline::run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub processed: u64,
    pub skipped: u64,
    /// Commands the pipeline put on the motor link (duplicates excluded).
    pub commands: u64,
}

// ────────────────────────────────────────────────────────────────────────────
// Pipeline
// ────────────────────────────────────────────────────────────────────────────

/// Owns the frame source, the detector and the tracker state.
pub struct Pipeline {
    camera: Box<dyn Camera>,
    detector: Box<dyn Detector>,
    tracker: ObjectTracker,
    navigator: Navigator,
    control: Arc<ControlPlane>,
    config: PipelineConfig,
    summary: RunSummary,
    frames: u64,
}

impl Pipeline {
    pub fn new(camera: Box<dyn Camera>, detector: Box<dyn Detector>, control: Arc<ControlPlane>) -> Self {
        Self {
            camera,
            detector,
            tracker: ObjectTracker::default(),
            navigator: Navigator::default(),
            control,
            config: PipelineConfig::default(),
            summary: RunSummary::default(),
            frames: 0,
        }
    }

    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_tracker(mut self, config: TrackerConfig) -> Self {
        self.tracker = ObjectTracker::new(config);
        self
    }

    pub fn with_navigation(mut self, config: NavigationConfig) -> Self {
        self.navigator = Navigator::new(config);
        self
    }

    pub fn tracker(&self) -> &ObjectTracker {
        &self.tracker
    }

    pub fn summary(&self) -> RunSummary {
        self.summary
    }

    /// Run one frame through the whole chain inside a `scout.frame` span.
    pub fn tick(&mut self) -> TickOutcome {
        self.frames += 1;
        let span = frame_span(self.frames, self.camera.id());
        let outcome = span.in_scope(|| self.process_frame());

        span.record("outcome", outcome.as_str());
        if let TickOutcome::Processed { confirmed, intent } = outcome {
            span.record("confirmed", confirmed as u64);
            if let Some(intent) = intent {
                span.record("intent", intent.as_str());
            }
        }
        outcome
    }

    fn process_frame(&mut self) -> TickOutcome {
        let frame = match self.camera.capture() {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                info!(camera = self.camera.id(), "frame source ended");
                return TickOutcome::EndOfStream;
            }
            Err(e) => {
                warn!(camera = self.camera.id(), error = %e, "frame capture failed, stopping");
                return TickOutcome::EndOfStream;
            }
        };

        // One snapshot per frame; prompt updates apply from the next frame.
        let context = self.control.context();

        let detections = match self.detector.detect(&frame, &context) {
            Ok(detections) => detections,
            Err(e) => {
                warn!(error = %e, "detector failed, skipping frame");
                self.summary.skipped += 1;
                return TickOutcome::Skipped;
            }
        };
        let raw = detections.len();
        let detections = merge_frame(detections, self.config.merge_iou_threshold);

        let confirmed = match self.tracker.update(&detections, &context.label_map) {
            Ok(confirmed) => confirmed,
            Err(e) => {
                warn!(error = %e, "rejecting frame");
                self.summary.skipped += 1;
                return TickOutcome::Skipped;
            }
        };
        self.summary.processed += 1;
        debug!(
            raw,
            merged = detections.len(),
            tracked = self.tracker.len(),
            confirmed = confirmed.len(),
            "frame processed"
        );

        if self.control.mode() != ControlMode::Autonomous {
            return TickOutcome::Processed {
                confirmed: confirmed.len(),
                intent: None,
            };
        }

        let intent = self.navigator.decide(&confirmed, frame.width as f32, &context);
        match self.control.lock_dispatcher().dispatch(intent) {
            Ok(DispatchOutcome::Suppressed) => {}
            Ok(_) => self.summary.commands += 1,
            Err(e) => warn!(%intent, error = %e, "dispatch failed, will retry next frame"),
        }

        TickOutcome::Processed {
            confirmed: confirmed.len(),
            intent: Some(intent),
        }
    }

    /// Tick until the frame source ends or `shutdown` is set, then stop the
    /// motors.
    pub fn run(&mut self, shutdown: &AtomicBool) -> RunSummary {
        info!(camera = self.camera.id(), "frame loop started");
        while !shutdown.load(Ordering::SeqCst) {
            if self.tick() == TickOutcome::EndOfStream {
                break;
            }
            thread::sleep(self.config.frame_interval());
        }

        if let Err(e) = self.control.lock_dispatcher().emergency_stop() {
            warn!(error = %e, "emergency stop failed");
        }
        info!(
            processed = self.summary.processed,
            skipped = self.summary.skipped,
            commands = self.summary.commands,
            "frame loop stopped"
        );
        self.summary
    }
}
