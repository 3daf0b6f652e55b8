//! [`Navigator`] – turns the confirmed objects of one frame into a
//! [`MovementIntent`].
//!
//! The frame is split into thirds.  Obstacles only matter when their centre
//! lies in the middle third; targets are steered towards.
//!
//! | Situation | Intent |
//! |---|---|
//! | nothing classified | `Forward` |
//! | blocking obstacle wider than [`NavigationConfig::obstacle_size_threshold`] of the frame | `Backward` |
//! | smaller blocking obstacle left of centre | `Right` |
//! | smaller blocking obstacle right of centre | `Left` |
//! | target in the left third | `Left` |
//! | target in the right third | `Right` |
//! | target centred, or no target | `Forward` |
//!
//! A target wider than [`NavigationConfig::target_obstacle_size_ratio`] times
//! the blocking obstacle is assumed to be closer and wins.
//!
//! # Example
//!
//! ```
//! use scout_runtime::navigation::Navigator;
//! use scout_types::{ClassificationContext, MovementIntent};
//!
//! let nav = Navigator::default();
//! let ctx = ClassificationContext::default();
//! assert_eq!(nav.decide(&[], 640.0, &ctx), MovementIntent::Forward);
//! ```

use scout_perception::TrackedObject;
use scout_types::{ClassificationContext, MovementIntent, Role};
use serde::{Deserialize, Serialize};
use tracing::debug;

// ────────────────────────────────────────────────────────────────────────────
// Configuration
// ────────────────────────────────────────────────────────────────────────────

/// Steering thresholds, all relative to the frame width.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    /// Width fraction of the left and right thirds.
    pub third_split: f32,
    /// Obstacle width fraction above which the robot backs off instead of
    /// steering around.
    pub obstacle_size_threshold: f32,
    /// How much wider than the obstacle a target must be to override it.
    pub target_obstacle_size_ratio: f32,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            third_split: 0.33,
            obstacle_size_threshold: 0.4,
            target_obstacle_size_ratio: 1.5,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Navigator
// ────────────────────────────────────────────────────────────────────────────

/// Stateless decision engine.
#[derive(Debug, Clone, Default)]
pub struct Navigator {
    config: NavigationConfig,
}

impl Navigator {
    pub fn new(config: NavigationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &NavigationConfig {
        &self.config
    }

    /// Role of `object` under `context`, if any.
    pub fn classify(object: &TrackedObject, context: &ClassificationContext) -> Option<Role> {
        context.classify(&object.labels)
    }

    /// Decide the next movement for a frame `frame_width` pixels wide.
    pub fn decide(
        &self,
        objects: &[TrackedObject],
        frame_width: f32,
        context: &ClassificationContext,
    ) -> MovementIntent {
        let left_bound = frame_width * self.config.third_split;
        let right_bound = frame_width * (1.0 - self.config.third_split);

        let mut targets = Vec::new();
        let mut obstacles = Vec::new();
        for object in objects {
            match Self::classify(object, context) {
                Some(Role::Target) => targets.push(object),
                Some(Role::Obstacle) => obstacles.push(object),
                None => {}
            }
        }

        if targets.is_empty() && obstacles.is_empty() {
            return MovementIntent::Forward;
        }

        let target = widest(&targets);

        let blocking: Vec<&TrackedObject> = obstacles
            .into_iter()
            .filter(|o| {
                let cx = o.bbox.center_x();
                cx >= left_bound && cx <= right_bound
            })
            .collect();

        if let Some(obstacle) = widest(&blocking) {
            let obstacle_width = obstacle.bbox.width();
            let target_dominates = target
                .is_some_and(|t| t.bbox.width() > obstacle_width * self.config.target_obstacle_size_ratio);

            if !target_dominates {
                let intent = if obstacle_width / frame_width > self.config.obstacle_size_threshold {
                    MovementIntent::Backward
                } else if obstacle.bbox.center_x() < frame_width / 2.0 {
                    MovementIntent::Right
                } else {
                    MovementIntent::Left
                };
                debug!(obstacle = %obstacle.id, %intent, "avoiding obstacle");
                return intent;
            }
            debug!(obstacle = %obstacle.id, "target outsizes obstacle, ignoring it");
        }

        match target {
            Some(t) => {
                let cx = t.bbox.center_x();
                let intent = if cx < left_bound {
                    MovementIntent::Left
                } else if cx > right_bound {
                    MovementIntent::Right
                } else {
                    MovementIntent::Forward
                };
                debug!(target = %t.id, %intent, "steering to target");
                intent
            }
            None => MovementIntent::Forward,
        }
    }
}

/// Widest object, earliest on ties.
fn widest<'a>(objects: &[&'a TrackedObject]) -> Option<&'a TrackedObject> {
    let mut best: Option<&'a TrackedObject> = None;
    for &object in objects {
        if best.is_none_or(|b| object.bbox.width() > b.bbox.width()) {
            best = Some(object);
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use scout_perception::TrackId;
    use scout_types::BoundingBox;

    const W: f32 = 300.0;

    fn object(id: u64, label: &str, cx: f32, width: f32) -> TrackedObject {
        TrackedObject {
            id: TrackId(id),
            bbox: BoundingBox::new(cx - width / 2.0, 50.0, cx + width / 2.0, 150.0),
            labels: vec![label.to_string()],
            scores: vec![0.9],
            frame_count: 3,
            missing_frames: 0,
            last_seen: Utc::now(),
        }
    }

    fn decide(objects: &[TrackedObject]) -> MovementIntent {
        Navigator::default().decide(objects, W, &ClassificationContext::default())
    }

    #[test]
    fn empty_frame_moves_forward() {
        assert_eq!(decide(&[]), MovementIntent::Forward);
    }

    #[test]
    fn unclassified_objects_are_ignored() {
        assert_eq!(decide(&[object(0, "a tree", 150.0, 250.0)]), MovementIntent::Forward);
    }

    #[test]
    fn large_centred_obstacle_backs_off() {
        assert_eq!(decide(&[object(0, "a bottle", 150.0, 150.0)]), MovementIntent::Backward);
    }

    #[test]
    fn much_larger_target_overrides_obstacle() {
        let objects = [
            object(0, "a bottle", 150.0, 150.0),
            object(1, "a face", 150.0, 230.0),
        ];
        assert_eq!(decide(&objects), MovementIntent::Forward);

        let objects = [
            object(0, "a bottle", 150.0, 150.0),
            object(1, "a face", 40.0, 230.0),
        ];
        assert_eq!(decide(&objects), MovementIntent::Left);
    }

    #[test]
    fn target_not_large_enough_does_not_override() {
        // 225 is not strictly greater than 150 * 1.5.
        let objects = [
            object(0, "a bottle", 150.0, 150.0),
            object(1, "a face", 150.0, 225.0),
        ];
        assert_eq!(decide(&objects), MovementIntent::Backward);
    }

    #[test]
    fn small_obstacle_is_steered_around() {
        assert_eq!(decide(&[object(0, "a can", 120.0, 60.0)]), MovementIntent::Right);
        assert_eq!(decide(&[object(0, "a can", 180.0, 60.0)]), MovementIntent::Left);
        // Exactly on the centre line counts as right of centre.
        assert_eq!(decide(&[object(0, "a can", 150.0, 60.0)]), MovementIntent::Left);
    }

    #[test]
    fn side_obstacles_do_not_block() {
        assert_eq!(decide(&[object(0, "a bag", 40.0, 60.0)]), MovementIntent::Forward);
        assert_eq!(decide(&[object(0, "a bag", 260.0, 60.0)]), MovementIntent::Forward);
    }

    #[test]
    fn obstacles_near_third_edges() {
        // Middle third spans roughly 99..201.
        assert_eq!(decide(&[object(0, "a bag", 100.0, 20.0)]), MovementIntent::Right);
        assert_eq!(decide(&[object(0, "a bag", 200.0, 20.0)]), MovementIntent::Left);
        assert_eq!(decide(&[object(0, "a bag", 95.0, 20.0)]), MovementIntent::Forward);
        assert_eq!(decide(&[object(0, "a bag", 205.0, 20.0)]), MovementIntent::Forward);
    }

    #[test]
    fn target_steering_by_third() {
        assert_eq!(decide(&[object(0, "a hand", 30.0, 20.0)]), MovementIntent::Left);
        assert_eq!(decide(&[object(0, "a hand", 150.0, 20.0)]), MovementIntent::Forward);
        assert_eq!(decide(&[object(0, "a hand", 270.0, 20.0)]), MovementIntent::Right);
    }

    #[test]
    fn widest_target_is_followed() {
        let objects = [object(0, "a hand", 30.0, 20.0), object(1, "a foot", 270.0, 40.0)];
        assert_eq!(decide(&objects), MovementIntent::Right);
    }

    #[test]
    fn first_target_wins_width_tie() {
        let objects = [object(0, "a hand", 30.0, 40.0), object(1, "a foot", 270.0, 40.0)];
        assert_eq!(decide(&objects), MovementIntent::Left);
    }

    #[test]
    fn widest_middle_obstacle_decides() {
        let objects = [object(0, "a can", 110.0, 20.0), object(1, "a bottle", 190.0, 60.0)];
        assert_eq!(decide(&objects), MovementIntent::Left);
    }

    #[test]
    fn target_label_takes_precedence_over_obstacle() {
        let mut both = object(0, "a bottle", 150.0, 200.0);
        both.labels.insert(0, "glasses".to_string());
        let ctx = ClassificationContext::default();
        assert_eq!(Navigator::classify(&both, &ctx), Some(Role::Target));
        assert_eq!(decide(&[both]), MovementIntent::Forward);
    }

    #[test]
    fn custom_thresholds_apply() {
        let nav = Navigator::new(NavigationConfig {
            obstacle_size_threshold: 0.9,
            ..NavigationConfig::default()
        });
        let objects = [object(0, "a bottle", 140.0, 150.0)];
        let ctx = ClassificationContext::default();
        assert_eq!(nav.decide(&objects, W, &ctx), MovementIntent::Right);
    }
}
