//! Generic `Detector` trait for the open-vocabulary detection service.

use scout_types::{ClassificationContext, Detection, ScoutError};

use crate::camera::CameraFrame;

/// Turns one frame into labeled boxes for the labels named in the current
/// prompt.
///
/// Label ids in the returned detections index into
/// [`ClassificationContext::label_map`]; id `0` marks image-level results.
pub trait Detector: Send {
    /// # Errors
    ///
    /// Returns [`ScoutError::Detector`] when inference failed for this frame.
    /// The failure only affects this frame.
    fn detect(
        &mut self,
        frame: &CameraFrame,
        context: &ClassificationContext,
    ) -> Result<Vec<Detection>, ScoutError>;
}
