//! Replay of recorded detector output.
//!
//! A recording is a JSON-lines file with one record per frame:
//!
//! ```text
//! {"width":640,"height":480,"detections":[{"box":{"x1":10,"y1":10,"x2":60,"y2":60},"labels":[1],"scores":[0.8]}]}
//! {"error":"inference timeout"}
//! ```
//!
//! `width`/`height` may be omitted; the previous frame's size (or the
//! configured default for the first frame) is used.  A record with `error`
//! makes the detector fail on that frame.  Blank lines are ignored.
//!
//! [`Recording::into_drivers`] splits a recording into a [`ReplayCamera`]
//! and a [`ReplayDetector`] that stay in step because the frame loop calls
//! the detector exactly once per captured frame.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use scout_hal::{Camera, CameraFrame, Detector};
use scout_types::{ClassificationContext, Detection, ScoutError};
use serde::Deserialize;
use thiserror::Error;

/// Errors raised while loading a recording.
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("cannot read recording {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Deserialize)]
struct RecordedFrame {
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>,
    #[serde(default)]
    detections: Vec<Detection>,
    #[serde(default)]
    error: Option<String>,
}

/// A parsed recording.
#[derive(Debug, Clone)]
pub struct Recording {
    frames: Vec<RecordedFrame>,
}

impl Recording {
    pub fn open(path: &Path) -> Result<Self, ReplayError> {
        let file = File::open(path).map_err(|source| ReplayError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(BufReader::new(file), path)
    }

    pub fn from_reader(reader: impl BufRead, path: &Path) -> Result<Self, ReplayError> {
        let mut frames = Vec::new();
        for (index, line) in reader.lines().enumerate() {
            let line = line.map_err(|source| ReplayError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            if line.trim().is_empty() {
                continue;
            }
            let frame = serde_json::from_str(&line).map_err(|source| ReplayError::Parse {
                line: index + 1,
                source,
            })?;
            frames.push(frame);
        }
        Ok(Self { frames })
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Split into frame source and detector.  Frames without a size inherit
    /// the previous one, starting from `width`×`height`.
    pub fn into_drivers(self, width: u32, height: u32) -> (ReplayCamera, ReplayDetector) {
        let mut sizes = VecDeque::with_capacity(self.frames.len());
        let mut results = VecDeque::with_capacity(self.frames.len());
        let (mut w, mut h) = (width, height);

        for frame in self.frames {
            w = frame.width.unwrap_or(w);
            h = frame.height.unwrap_or(h);
            sizes.push_back((w, h));
            results.push_back(match frame.error {
                Some(reason) => Err(ScoutError::Detector(reason)),
                None => Ok(frame.detections),
            });
        }

        (ReplayCamera { sizes }, ReplayDetector { results })
    }
}

/// Yields one blank frame per recorded frame, then ends the stream.
pub struct ReplayCamera {
    sizes: VecDeque<(u32, u32)>,
}

impl Camera for ReplayCamera {
    fn id(&self) -> &str {
        "replay"
    }

    fn capture(&mut self) -> Result<Option<CameraFrame>, ScoutError> {
        Ok(self.sizes.pop_front().map(|(w, h)| CameraFrame::blank(w, h)))
    }
}

/// Returns the recorded detector result for each frame.
pub struct ReplayDetector {
    results: VecDeque<Result<Vec<Detection>, ScoutError>>,
}

impl Detector for ReplayDetector {
    fn detect(
        &mut self,
        _frame: &CameraFrame,
        _context: &ClassificationContext,
    ) -> Result<Vec<Detection>, ScoutError> {
        self.results.pop_front().unwrap_or_else(|| Ok(Vec::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scout_perception::ObjectTracker;
    use std::io::Cursor;

    const RECORDING: &str = r#"{"width":300,"height":200,"detections":[{"box":{"x1":10.0,"y1":10.0,"x2":60.0,"y2":60.0},"labels":[1],"scores":[0.8]}]}

{"error":"inference timeout"}
{"detections":[]}
"#;

    fn parse(text: &str) -> Result<Recording, ReplayError> {
        Recording::from_reader(Cursor::new(text), Path::new("test.jsonl"))
    }

    #[test]
    fn parses_frames_and_skips_blank_lines() {
        let recording = parse(RECORDING).unwrap();
        assert_eq!(recording.len(), 3);
    }

    #[test]
    fn drivers_replay_in_step() {
        let (mut camera, mut detector) = parse(RECORDING).unwrap().into_drivers(640, 480);
        let ctx = ClassificationContext::default();

        let frame = camera.capture().unwrap().unwrap();
        assert_eq!((frame.width, frame.height), (300, 200));
        let detections = detector.detect(&frame, &ctx).unwrap();
        assert_eq!(detections[0].primary_label(), Some(1));

        let frame = camera.capture().unwrap().unwrap();
        assert_eq!((frame.width, frame.height), (300, 200));
        assert_eq!(
            detector.detect(&frame, &ctx),
            Err(ScoutError::Detector("inference timeout".to_string()))
        );

        let frame = camera.capture().unwrap().unwrap();
        assert!(detector.detect(&frame, &ctx).unwrap().is_empty());

        assert!(camera.capture().unwrap().is_none());
    }

    #[test]
    fn first_frame_without_size_uses_default() {
        let (mut camera, _) = parse("{\"detections\":[]}\n").unwrap().into_drivers(640, 480);
        let frame = camera.capture().unwrap().unwrap();
        assert_eq!((frame.width, frame.height), (640, 480));
    }

    #[test]
    fn recorded_root_label_is_not_tracked() {
        let text = concat!(
            r#"{"detections":[{"box":{"x1":0.0,"y1":0.0,"x2":640.0,"y2":480.0},"labels":[0],"scores":[1.0]},"#,
            r#"{"box":{"x1":10.0,"y1":10.0,"x2":60.0,"y2":60.0},"labels":[1],"scores":[0.8]}]}"#,
            "\n"
        );
        let (mut camera, mut detector) = parse(text).unwrap().into_drivers(640, 480);
        let ctx = ClassificationContext::default();
        let frame = camera.capture().unwrap().unwrap();
        let detections = detector.detect(&frame, &ctx).unwrap();
        assert!(detections[0].is_whole_image());

        let mut tracker = ObjectTracker::default();
        tracker.update(&detections, &ctx.label_map).unwrap();
        assert_eq!(tracker.len(), 1);
        assert!(tracker.tracked().all(|o| o.labels != vec!["image".to_string()]));
    }

    #[test]
    fn malformed_line_reports_line_number() {
        let err = parse("{\"detections\":[]}\nnot json\n").unwrap_err();
        assert!(matches!(err, ReplayError::Parse { line: 2, .. }));
        assert!(err.to_string().starts_with("line 2:"));
    }

    #[test]
    fn open_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Recording::open(&dir.path().join("missing.jsonl")).unwrap_err();
        assert!(matches!(err, ReplayError::Io { .. }));
    }

    #[test]
    fn open_reads_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.jsonl");
        std::fs::write(&path, RECORDING).unwrap();
        assert_eq!(Recording::open(&path).unwrap().len(), 3);
    }
}
