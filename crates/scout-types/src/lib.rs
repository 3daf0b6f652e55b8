//! `scout-types` – shared vocabulary of the Scout perception-to-actuation stack.
//!
//! Every crate in the workspace speaks in these types: raw [`Detection`]s from
//! the detector, the [`ClassificationContext`] that tells the navigator which
//! labels are targets and which are obstacles, the [`MovementIntent`] the
//! navigator produces and the [`CommandCode`] byte that finally reaches the
//! motor controller.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Name of the root label every prompt implicitly starts with.  Detections
/// carrying label id `0` describe the whole image rather than a region.
pub const IMAGE_LABEL: &str = "image";

/// Label id of [`IMAGE_LABEL`] in every [`LabelMap`].
pub const IMAGE_LABEL_ID: u32 = 0;

/// Human-readable description used when a prompt update does not name one.
pub const DEFAULT_TARGET_DESCRIPTION: &str = "entrapped survivor";

/// Labels whose presence indicates a survivor.
pub const DEFAULT_TARGET_OBJECTS: [&str; 5] = ["a face", "a hand", "a foot", "an arm", "glasses"];

/// Labels the robot should steer around.
pub const DEFAULT_OBSTACLES: [&str; 3] = ["a bottle", "a can", "a bag"];

// ────────────────────────────────────────────────────────────────────────────
// Geometry
// ────────────────────────────────────────────────────────────────────────────

/// Axis-aligned box in image pixels, stored as corners (`x1 < x2`, `y1 < y2`).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    #[inline]
    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// Horizontal center, the only coordinate the navigator steers by.
    #[inline]
    pub fn center_x(&self) -> f32 {
        (self.x1 + self.x2) / 2.0
    }

    #[inline]
    pub fn center_y(&self) -> f32 {
        (self.y1 + self.y2) / 2.0
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Detections
// ────────────────────────────────────────────────────────────────────────────

/// One perception result for one frame, as produced by the detector or by the
/// merger.
///
/// `labels` and `scores` are parallel: `scores[i]` is the confidence of
/// `labels[i]`.  The first entry is the *primary* label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    #[serde(rename = "box")]
    pub bbox: BoundingBox,
    pub labels: Vec<u32>,
    pub scores: Vec<f32>,
    /// Whole-image result; excluded from merging, tracking and steering.
    /// A primary label of [`IMAGE_LABEL_ID`] implies it, see
    /// [`Detection::is_whole_image`].
    #[serde(default)]
    pub is_image_level: bool,
}

impl Detection {
    /// Single-label geometric detection.
    pub fn new(bbox: BoundingBox, label: u32, score: f32) -> Self {
        Self {
            bbox,
            labels: vec![label],
            scores: vec![score],
            is_image_level: false,
        }
    }

    /// Whole-image detection carrying the root label.
    pub fn image_level(width: f32, height: f32, score: f32) -> Self {
        Self {
            bbox: BoundingBox::new(0.0, 0.0, width, height),
            labels: vec![IMAGE_LABEL_ID],
            scores: vec![score],
            is_image_level: true,
        }
    }

    /// True for image-level results: flagged by the detector, or carrying
    /// the image root as primary label.
    pub fn is_whole_image(&self) -> bool {
        self.is_image_level || self.primary_label() == Some(IMAGE_LABEL_ID)
    }

    pub fn primary_label(&self) -> Option<u32> {
        self.labels.first().copied()
    }

    /// Confidence of the primary label, `0.0` when the detection is empty.
    pub fn primary_score(&self) -> f32 {
        self.scores.first().copied().unwrap_or(0.0)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Labels & classification
// ────────────────────────────────────────────────────────────────────────────

/// Maps detector label ids to label names.
///
/// Id `0` is always [`IMAGE_LABEL`]; ids `1..` follow the order in which the
/// labels appear in the prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelMap {
    names: Vec<String>,
}

impl LabelMap {
    /// Build a map from an ordered list of region labels.
    pub fn from_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut names = vec![IMAGE_LABEL.to_string()];
        names.extend(labels.into_iter().map(Into::into));
        Self { names }
    }

    /// Parse a detector prompt such as `"[a face, a hand (left, right)]"`.
    ///
    /// Brackets and parentheses only group labels for the detector; the map
    /// flattens them in order of appearance.
    ///
    /// # Errors
    ///
    /// Returns [`ScoutError::InvalidRequest`] when the prompt names no label.
    ///
    /// ```
    /// use scout_types::LabelMap;
    ///
    /// let map = LabelMap::from_prompt("[a face, a bottle]").unwrap();
    /// assert_eq!(map.name(0), Some("image"));
    /// assert_eq!(map.name(2), Some("a bottle"));
    /// ```
    pub fn from_prompt(prompt: &str) -> Result<Self, ScoutError> {
        let labels: Vec<&str> = prompt
            .split(['[', ']', '(', ')', ','])
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();
        if labels.is_empty() {
            return Err(ScoutError::InvalidRequest(format!(
                "prompt '{prompt}' does not name any label"
            )));
        }
        Ok(Self::from_labels(labels))
    }

    pub fn name(&self, id: u32) -> Option<&str> {
        self.names.get(id as usize).map(String::as_str)
    }

    /// Resolve every id in `ids` to its name.
    ///
    /// # Errors
    ///
    /// Returns [`ScoutError::UnknownLabel`] for the first id not in the map.
    pub fn resolve(&self, ids: &[u32]) -> Result<Vec<String>, ScoutError> {
        ids.iter()
            .map(|&id| {
                self.name(id)
                    .map(str::to_string)
                    .ok_or(ScoutError::UnknownLabel(id))
            })
            .collect()
    }

    /// Number of entries including the image root.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Region labels, without the image root.
    pub fn region_labels(&self) -> impl Iterator<Item = &str> {
        self.names.iter().skip(1).map(String::as_str)
    }
}

/// Role a tracked object plays in navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Target,
    Obstacle,
}

/// Read-only snapshot of everything the detector and navigator need to know
/// about the current search task.
///
/// The control plane swaps whole snapshots; a frame always sees one
/// consistent context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationContext {
    /// Prompt handed to the detector.
    pub prompt: String,
    /// Human-readable name of what the robot is looking for.
    pub target: String,
    pub label_map: LabelMap,
    pub target_labels: BTreeSet<String>,
    pub obstacle_labels: BTreeSet<String>,
}

impl ClassificationContext {
    /// Build a context from a detector prompt and the role label lists.
    ///
    /// # Errors
    ///
    /// Returns [`ScoutError::InvalidRequest`] when the prompt is blank or
    /// names no label.
    pub fn new<T, O>(
        prompt: impl Into<String>,
        target: impl Into<String>,
        target_labels: T,
        obstacle_labels: O,
    ) -> Result<Self, ScoutError>
    where
        T: IntoIterator,
        T::Item: Into<String>,
        O: IntoIterator,
        O::Item: Into<String>,
    {
        let prompt = prompt.into();
        if prompt.trim().is_empty() {
            return Err(ScoutError::InvalidRequest("prompt is required".to_string()));
        }
        let label_map = LabelMap::from_prompt(&prompt)?;
        Ok(Self {
            prompt,
            target: target.into(),
            label_map,
            target_labels: target_labels.into_iter().map(Into::into).collect(),
            obstacle_labels: obstacle_labels.into_iter().map(Into::into).collect(),
        })
    }

    /// Target labels take precedence: an object carrying both a target and
    /// an obstacle label is a target.
    pub fn classify<S: AsRef<str>>(&self, labels: &[S]) -> Option<Role> {
        if labels.iter().any(|l| self.target_labels.contains(l.as_ref())) {
            Some(Role::Target)
        } else if labels.iter().any(|l| self.obstacle_labels.contains(l.as_ref())) {
            Some(Role::Obstacle)
        } else {
            None
        }
    }
}

impl Default for ClassificationContext {
    /// Survivor search: every default target followed by every default
    /// obstacle in one detection prompt.
    fn default() -> Self {
        let all: Vec<&str> = DEFAULT_TARGET_OBJECTS
            .iter()
            .chain(DEFAULT_OBSTACLES.iter())
            .copied()
            .collect();
        Self {
            prompt: format!("[{}]", all.join(", ")),
            target: DEFAULT_TARGET_DESCRIPTION.to_string(),
            label_map: LabelMap::from_labels(all),
            target_labels: DEFAULT_TARGET_OBJECTS.iter().map(|s| s.to_string()).collect(),
            obstacle_labels: DEFAULT_OBSTACLES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Movement
// ────────────────────────────────────────────────────────────────────────────

/// What the robot should do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementIntent {
    Forward,
    Backward,
    Left,
    Right,
    Stop,
}

impl MovementIntent {
    /// `true` for the pairs that must never follow each other without a stop
    /// in between: left/right and forward/backward.
    pub fn opposes(self, other: MovementIntent) -> bool {
        use MovementIntent::*;
        matches!(
            (self, other),
            (Left, Right) | (Right, Left) | (Forward, Backward) | (Backward, Forward)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MovementIntent::Forward => "forward",
            MovementIntent::Backward => "backward",
            MovementIntent::Left => "left",
            MovementIntent::Right => "right",
            MovementIntent::Stop => "stop",
        }
    }
}

impl fmt::Display for MovementIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MovementIntent {
    type Err = ScoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "forward" => Ok(MovementIntent::Forward),
            "backward" => Ok(MovementIntent::Backward),
            "left" => Ok(MovementIntent::Left),
            "right" => Ok(MovementIntent::Right),
            "stop" => Ok(MovementIntent::Stop),
            other => Err(ScoutError::InvalidRequest(format!(
                "unknown direction '{other}'"
            ))),
        }
    }
}

/// Single-byte command understood by the motor controller firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandCode {
    Forward,
    Backward,
    Left,
    Right,
    Stop,
}

impl CommandCode {
    pub fn as_byte(self) -> u8 {
        match self {
            CommandCode::Forward => b'F',
            CommandCode::Backward => b'B',
            CommandCode::Left => b'L',
            CommandCode::Right => b'R',
            CommandCode::Stop => b'S',
        }
    }

    pub fn as_char(self) -> char {
        self.as_byte() as char
    }
}

impl From<MovementIntent> for CommandCode {
    /// The firmware's turn codes are mirrored relative to the intent: a left
    /// intent goes out as `R` and a right intent as `L`.
    fn from(intent: MovementIntent) -> Self {
        match intent {
            MovementIntent::Forward => CommandCode::Forward,
            MovementIntent::Backward => CommandCode::Backward,
            MovementIntent::Left => CommandCode::Right,
            MovementIntent::Right => CommandCode::Left,
            MovementIntent::Stop => CommandCode::Stop,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Errors
// ────────────────────────────────────────────────────────────────────────────

/// Workspace-wide error type.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScoutError {
    #[error("Hardware Fault on {component}: {details}")]
    HardwareFault { component: String, details: String },

    #[error("Detector Error: {0}")]
    Detector(String),

    #[error("Unknown label id {0}")]
    UnknownLabel(u32),

    #[error("Invalid Request: {0}")]
    InvalidRequest(String),

    #[error("Manual control is disabled")]
    ManualControlDisabled,

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Serialization Error: {0}")]
    Serialization(String),
}
