//! `scout-hal` – hardware seams of the Scout robot.
//!
//! The rest of the stack only ever talks to the traits in this crate, so the
//! real camera, detector service and motor link can be swapped for the
//! simulated drivers in [`sim`] without touching perception or navigation.
//!
//! # Modules
//!
//! - [`motor`] – [`MotorController`][motor::MotorController]: accepts single
//!   byte [`CommandCode`][scout_types::CommandCode]s.
//! - [`camera`] – [`Camera`][camera::Camera]: the frame source.
//! - [`detector`] – [`Detector`][detector::Detector]: turns a frame and the
//!   current prompt into raw detections.
//! - [`dispatcher`] – [`CommandDispatcher`][dispatcher::CommandDispatcher]:
//!   deduplicates intents, stops between reversals and rate-limits the motor
//!   link.
//! - [`serial`] – [`SerialMotorController`][serial::SerialMotorController]:
//!   writes command bytes to the drive board's UART.
//! - [`sim`] – in-process drivers for tests and replay runs.

pub mod camera;
pub mod detector;
pub mod dispatcher;
pub mod motor;
pub mod serial;
pub mod sim;

pub use camera::{Camera, CameraFrame};
pub use detector::Detector;
pub use dispatcher::{CommandDispatcher, DispatchOutcome, DispatcherConfig, SharedDispatcher};
pub use motor::MotorController;
pub use serial::{DEFAULT_BAUD_RATE, SerialMotorController};
