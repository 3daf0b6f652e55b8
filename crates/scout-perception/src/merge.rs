//! Same-frame duplicate suppression.
//!
//! Open-vocabulary detectors regularly report the same object two or three
//! times with slightly shifted boxes.  [`merge_detections`] clusters those
//! duplicates greedily, highest score first, and replaces each cluster with
//! one detection whose box is the score-weighted average of its members.
//!
//! Only detections that share the seed's *primary* label are clustered;
//! a bottle and a hand occupying the same pixels stay two detections.

use scout_types::{BoundingBox, Detection};
use tracing::debug;

use crate::geometry::iou;

/// Overlap above which two same-label detections are considered duplicates.
pub const DEFAULT_MERGE_IOU_THRESHOLD: f32 = 0.6;

/// Collapse overlapping same-label detections.
///
/// Image-level detections are passed through unchanged and emitted first,
/// followed by one detection per cluster in descending seed-score order.
/// The sort is stable, so equal scores keep their input order.
pub fn merge_detections(detections: &[Detection], iou_threshold: f32) -> Vec<Detection> {
    let (image_level, geometric): (Vec<&Detection>, Vec<&Detection>) =
        detections.iter().partition(|d| d.is_whole_image());

    let mut remaining: Vec<Detection> = geometric.into_iter().cloned().collect();
    remaining.sort_by(|a, b| b.primary_score().total_cmp(&a.primary_score()));

    let mut merged: Vec<Detection> = image_level.into_iter().cloned().collect();
    let mut clusters = 0usize;

    while !remaining.is_empty() {
        let mut seed = remaining.remove(0);
        let seed_label = seed.primary_label();

        let mut members = Vec::new();
        let mut i = 0;
        while i < remaining.len() {
            let other = &remaining[i];
            if other.primary_label() == seed_label && iou(&seed.bbox, &other.bbox) > iou_threshold {
                members.push(remaining.remove(i));
            } else {
                i += 1;
            }
        }

        if !members.is_empty() {
            absorb(&mut seed, &members);
            clusters += 1;
        }
        merged.push(seed);
    }

    if clusters > 0 {
        debug!(input = detections.len(), output = merged.len(), clusters, "merged duplicate detections");
    }
    merged
}

/// Run [`merge_detections`] only when the frame holds more than one
/// geometric detection; a singleton frame is returned untouched.
pub fn merge_frame(detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    let geometric = detections.iter().filter(|d| !d.is_whole_image()).count();
    if geometric > 1 {
        merge_detections(&detections, iou_threshold)
    } else {
        detections
    }
}

/// Fold `members` into `seed`: weighted-average box, mean primary score.
/// Secondary scores are left alone so `scores` stays parallel to `labels`.
fn absorb(seed: &mut Detection, members: &[Detection]) {
    let cluster: Vec<&Detection> = std::iter::once(&*seed).chain(members.iter()).collect();
    let total: f32 = cluster.iter().map(|d| d.primary_score()).sum();
    let count = cluster.len() as f32;

    let weight = |d: &Detection| {
        if total > 0.0 {
            d.primary_score() / total
        } else {
            1.0 / count
        }
    };

    let mut bbox = BoundingBox::default();
    for d in &cluster {
        let w = weight(d);
        bbox.x1 += d.bbox.x1 * w;
        bbox.y1 += d.bbox.y1 * w;
        bbox.x2 += d.bbox.x2 * w;
        bbox.y2 += d.bbox.y2 * w;
    }

    seed.bbox = bbox;
    let mean = total / count;
    match seed.scores.first_mut() {
        Some(primary) => *primary = mean,
        None => seed.scores.push(mean),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(x1: f32, x2: f32, label: u32, score: f32) -> Detection {
        Detection::new(BoundingBox::new(x1, 0.0, x2, 100.0), label, score)
    }

    #[test]
    fn overlapping_same_label_collapse_to_weighted_box() {
        // IoU of [0,100] and [10,110] is 90/110 ≈ 0.82.
        let out = merge_detections(&[det(0.0, 100.0, 1, 0.6), det(10.0, 110.0, 1, 0.2)], 0.6);
        assert_eq!(out.len(), 1);

        let d = &out[0];
        // Weights 0.75 / 0.25.
        assert!((d.bbox.x1 - 2.5).abs() < 1e-4);
        assert!((d.bbox.x2 - 102.5).abs() < 1e-4);
        assert!((d.primary_score() - 0.4).abs() < 1e-6);
    }

    #[test]
    fn different_labels_never_combine() {
        let out = merge_detections(&[det(0.0, 100.0, 1, 0.9), det(0.0, 100.0, 2, 0.8)], 0.6);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].primary_label(), Some(1));
        assert_eq!(out[1].primary_label(), Some(2));
    }

    #[test]
    fn overlap_at_threshold_is_not_merged() {
        // IoU of [0,100] and [50,150] is exactly 1/3.
        let out = merge_detections(&[det(0.0, 100.0, 1, 0.9), det(50.0, 150.0, 1, 0.8)], 1.0 / 3.0);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn output_is_ordered_by_score_with_stable_ties() {
        let out = merge_detections(
            &[
                det(0.0, 10.0, 1, 0.5),
                det(100.0, 110.0, 2, 0.9),
                det(200.0, 210.0, 3, 0.5),
            ],
            0.6,
        );
        let labels: Vec<u32> = out.iter().filter_map(|d| d.primary_label()).collect();
        assert_eq!(labels, vec![2, 1, 3]);
    }

    #[test]
    fn image_level_detections_pass_through_first() {
        let image = Detection::image_level(640.0, 480.0, 1.0);
        let out = merge_detections(
            &[det(0.0, 100.0, 1, 0.6), image.clone(), det(5.0, 100.0, 1, 0.5)],
            0.6,
        );
        assert_eq!(out.len(), 2);
        assert_eq!(out[0], image);
        assert!(!out[1].is_image_level);
    }

    #[test]
    fn root_label_detections_are_never_clustered() {
        let root = Detection::new(BoundingBox::new(0.0, 0.0, 640.0, 480.0), 0, 1.0);
        let out = merge_detections(&[root.clone(), root.clone(), det(0.0, 100.0, 1, 0.5)], 0.6);
        assert_eq!(out.len(), 3);
        assert_eq!(out[0], root);
        assert_eq!(out[1], root);
    }

    #[test]
    fn merge_averages_primary_score_and_keeps_secondary_scores() {
        let mut a = det(0.0, 100.0, 1, 0.8);
        a.labels.push(4);
        a.scores.push(0.3);
        let out = merge_detections(&[a, det(2.0, 100.0, 1, 0.4)], 0.6);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].labels, vec![1, 4]);
        assert_eq!(out[0].scores.len(), 2);
        assert!((out[0].scores[0] - 0.6).abs() < 1e-6);
        assert!((out[0].scores[1] - 0.3).abs() < f32::EPSILON);
    }

    #[test]
    fn seed_only_absorbs_boxes_overlapping_itself() {
        // b overlaps a, c overlaps b but not a: c stays separate.
        let out = merge_detections(
            &[det(0.0, 100.0, 1, 0.9), det(20.0, 120.0, 1, 0.8), det(60.0, 160.0, 1, 0.7)],
            0.6,
        );
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn merge_frame_skips_singletons() {
        let single = vec![Detection::image_level(10.0, 10.0, 1.0), det(0.0, 100.0, 1, 0.5)];
        assert_eq!(merge_frame(single.clone(), 0.6), single);
        assert!(merge_frame(Vec::new(), 0.6).is_empty());
    }

    #[test]
    fn zero_scores_fall_back_to_equal_weights() {
        let out = merge_detections(&[det(0.0, 100.0, 1, 0.0), det(10.0, 100.0, 1, 0.0)], 0.6);
        assert_eq!(out.len(), 1);
        assert!((out[0].bbox.x1 - 5.0).abs() < 1e-4);
        assert_eq!(out[0].primary_score(), 0.0);
    }
}
