//! [`ObjectTracker`] – frame-to-frame association with confirmation
//! hysteresis.
//!
//! Every call to [`ObjectTracker::update`] runs the same fixed sequence:
//!
//! 1. Every known object is aged by one missed frame.
//! 2. Each geometric detection, in input order, claims the *unclaimed*
//!    object it overlaps best, provided the overlap is strictly above
//!    [`TrackerConfig::iou_threshold`].  The first detection to claim an
//!    object wins; the matching is greedy and order-dependent, not a global
//!    assignment.
//! 3. A claimed object takes the detection's box, labels and scores, counts
//!    one more sighting and clears its missed-frame counter.
//! 4. Every detection that claimed nothing starts a new object.
//! 5. Objects missed for [`TrackerConfig::missing_threshold`] frames are
//!    dropped.
//! 6. Objects sighted at least [`TrackerConfig::tracking_threshold`] times
//!    are returned as confirmed.
//!
//! The state is rebuilt from per-object values on every call, so a failed
//! update (unknown label) leaves it exactly as it was.
//!
//! # Example
//!
//! ```
//! use scout_perception::tracker::ObjectTracker;
//! use scout_types::{BoundingBox, Detection, LabelMap};
//!
//! let labels = LabelMap::from_labels(["a face"]);
//! let face = Detection::new(BoundingBox::new(10.0, 10.0, 60.0, 60.0), 1, 0.8);
//!
//! let mut tracker = ObjectTracker::default();
//! assert!(tracker.update(&[face.clone()], &labels).unwrap().is_empty());
//! assert!(tracker.update(&[face.clone()], &labels).unwrap().is_empty());
//! let confirmed = tracker.update(&[face], &labels).unwrap();
//! assert_eq!(confirmed.len(), 1);
//! assert_eq!(confirmed[0].labels, vec!["a face".to_string()]);
//! ```

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use scout_types::{BoundingBox, Detection, LabelMap, ScoutError};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::geometry::iou;

// ────────────────────────────────────────────────────────────────────────────
// Configuration
// ────────────────────────────────────────────────────────────────────────────

/// Association and lifecycle thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Minimum overlap (exclusive) for a detection to continue an object.
    pub iou_threshold: f32,
    /// Sightings before an object is confirmed.
    pub tracking_threshold: u32,
    /// Consecutive missed frames after which an object is dropped.
    pub missing_threshold: u32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            iou_threshold: 0.6,
            tracking_threshold: 3,
            missing_threshold: 2,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tracked objects
// ────────────────────────────────────────────────────────────────────────────

/// Identifier of a tracked object.  Ids increase monotonically, so ordering
/// by id is ordering by creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TrackId(pub u64);

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A physical object followed across frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedObject {
    pub id: TrackId,
    #[serde(rename = "box")]
    pub bbox: BoundingBox,
    /// Label names copied from the most recent matching detection.
    pub labels: Vec<String>,
    pub scores: Vec<f32>,
    /// Number of frames this object was matched in, including its first.
    pub frame_count: u32,
    /// Consecutive frames since the last match.
    pub missing_frames: u32,
    pub last_seen: DateTime<Utc>,
}

impl TrackedObject {
    fn spawn(id: TrackId, detection: &Detection, labels: Vec<String>, now: DateTime<Utc>) -> Self {
        Self {
            id,
            bbox: detection.bbox,
            labels,
            scores: detection.scores.clone(),
            frame_count: 1,
            missing_frames: 0,
            last_seen: now,
        }
    }

    /// Copy of `self` with one more missed frame.
    fn aged(&self) -> Self {
        Self {
            missing_frames: self.missing_frames + 1,
            ..self.clone()
        }
    }

    /// Copy of `self` continued by `detection`.
    fn sighted(&self, detection: &Detection, labels: Vec<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: self.id,
            bbox: detection.bbox,
            labels,
            scores: detection.scores.clone(),
            frame_count: self.frame_count + 1,
            missing_frames: 0,
            last_seen: now,
        }
    }

    /// `true` once the object has been seen often enough and recently enough
    /// to act on.
    pub fn is_valid(&self, config: &TrackerConfig) -> bool {
        self.frame_count >= config.tracking_threshold && self.missing_frames < config.missing_threshold
    }
}

// ────────────────────────────────────────────────────────────────────────────
// ObjectTracker
// ────────────────────────────────────────────────────────────────────────────

/// Owns the set of tracked objects for one camera.
#[derive(Debug, Default)]
pub struct ObjectTracker {
    config: TrackerConfig,
    objects: BTreeMap<TrackId, TrackedObject>,
    next_id: u64,
}

impl ObjectTracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            config,
            objects: BTreeMap::new(),
            next_id: 0,
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Advance the tracker by one frame and return the confirmed objects in
    /// creation order.
    ///
    /// Image-level detections are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ScoutError::UnknownLabel`] when a detection carries a label
    /// id missing from `label_map`.  The tracker state is not modified.
    pub fn update(
        &mut self,
        detections: &[Detection],
        label_map: &LabelMap,
    ) -> Result<Vec<TrackedObject>, ScoutError> {
        let geometric = detections
            .iter()
            .filter(|d| !d.is_whole_image())
            .map(|d| label_map.resolve(&d.labels).map(|labels| (d, labels)))
            .collect::<Result<Vec<_>, _>>()?;

        let now = Utc::now();
        let mut candidates: Vec<TrackedObject> = self.objects.values().map(TrackedObject::aged).collect();
        let mut claimed = vec![false; candidates.len()];
        let mut unmatched = Vec::new();

        for (detection, labels) in geometric {
            let mut best: Option<usize> = None;
            let mut best_iou = self.config.iou_threshold;
            for (idx, candidate) in candidates.iter().enumerate() {
                let overlap = iou(&detection.bbox, &candidate.bbox);
                if overlap > best_iou {
                    best_iou = overlap;
                    best = Some(idx);
                }
            }

            // A detection whose best object was already claimed this frame
            // starts a new object rather than taking its second choice.
            match best {
                Some(idx) if !claimed[idx] => {
                    claimed[idx] = true;
                    candidates[idx] = candidates[idx].sighted(detection, labels, now);
                }
                _ => unmatched.push((detection, labels)),
            }
        }

        let before = candidates.len();
        let mut next: BTreeMap<TrackId, TrackedObject> = candidates
            .into_iter()
            .filter(|o| o.missing_frames < self.config.missing_threshold)
            .map(|o| (o.id, o))
            .collect();
        let dropped = before - next.len();

        let created = unmatched.len();
        for (detection, labels) in unmatched {
            let id = TrackId(self.next_id);
            self.next_id += 1;
            next.insert(id, TrackedObject::spawn(id, detection, labels, now));
        }

        self.objects = next;

        let confirmed: Vec<TrackedObject> = self
            .objects
            .values()
            .filter(|o| o.is_valid(&self.config))
            .cloned()
            .collect();

        debug!(
            tracked = self.objects.len(),
            confirmed = confirmed.len(),
            created,
            dropped,
            "tracker updated"
        );
        Ok(confirmed)
    }

    /// Every object currently tracked, confirmed or not, in creation order.
    pub fn tracked(&self) -> impl Iterator<Item = &TrackedObject> {
        self.objects.values()
    }

    pub fn get(&self, id: TrackId) -> Option<&TrackedObject> {
        self.objects.get(&id)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Forget every object.  Ids keep increasing across resets.
    pub fn reset(&mut self) {
        self.objects.clear();
    }
}
