//! Generic `Camera` trait and supporting types for the frame source.

use scout_types::ScoutError;

/// A raw image frame returned by a camera driver.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraFrame {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Raw pixel data (e.g. BGR24).  Empty for replayed frames.
    pub data: Vec<u8>,
}

impl CameraFrame {
    /// A frame of the given size with no pixel payload.
    pub fn blank(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: Vec::new(),
        }
    }
}

/// A camera or any other source of sequential frames.
pub trait Camera: Send {
    /// Stable identifier for this camera, e.g. `"front_rgb"`.
    fn id(&self) -> &str;

    /// Capture the next frame.
    ///
    /// Returns `Ok(None)` once the stream has ended.
    ///
    /// # Errors
    ///
    /// Returns [`ScoutError::HardwareFault`] if the device failed; the frame
    /// loop treats this like the end of the stream.
    fn capture(&mut self) -> Result<Option<CameraFrame>, ScoutError>;
}
