//! `scout-perception` – turns flickering per-frame detections into stable
//! objects.
//!
//! # Modules
//!
//! - [`geometry`] – [`iou`][geometry::iou]: intersection-over-union of two
//!   boxes, the overlap measure every other stage relies on.
//! - [`merge`] – [`merge_detections`][merge::merge_detections]: collapses
//!   duplicate detections of the same label within one frame into a single
//!   score-weighted box.
//! - [`tracker`] – [`ObjectTracker`][tracker::ObjectTracker]: associates each
//!   frame's detections with persistent [`TrackedObject`][tracker::TrackedObject]s
//!   and confirms or drops them with frame-count hysteresis.

pub mod geometry;
pub mod merge;
pub mod tracker;

pub use geometry::iou;
pub use merge::{merge_detections, merge_frame, DEFAULT_MERGE_IOU_THRESHOLD};
pub use tracker::{ObjectTracker, TrackId, TrackedObject, TrackerConfig};
