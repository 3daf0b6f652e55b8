//! `scout-runtime` – decision making and the frame loop.
//!
//! # Modules
//!
//! - [`navigation`] – [`Navigator`][navigation::Navigator]: classifies the
//!   confirmed objects of a frame as targets or obstacles and derives a
//!   [`MovementIntent`][scout_types::MovementIntent].
//! - [`control`] – [`ControlPlane`][control::ControlPlane]: mutually
//!   exclusive autonomous/manual modes, prompt updates and throttled manual
//!   drive.
//! - [`pipeline`] – [`Pipeline`][pipeline::Pipeline]: Capture → Detect →
//!   Merge → Track → Decide → Dispatch, one frame at a time.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: global
//!   `tracing` subscriber with optional OTLP export.
//!
//! The pipeline and the operator share a single
//! [`SharedDispatcher`][scout_hal::SharedDispatcher] through the control
//! plane, so every command, autonomous or manual, passes the same dedupe,
//! reversal and rate-limit rules.

pub mod control;
pub mod navigation;
pub mod pipeline;
pub mod telemetry;

pub use control::{ControlMode, ControlPlane, ManualOutcome, ModeStatus, PromptUpdate, CONTROL_FREQUENCY};
pub use navigation::{NavigationConfig, Navigator};
pub use pipeline::{Pipeline, PipelineConfig, RunSummary, TickOutcome};
pub use telemetry::{init_tracing, TracerProviderGuard};
