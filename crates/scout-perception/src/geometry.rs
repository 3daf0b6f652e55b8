//! Box overlap.

use scout_types::BoundingBox;

/// Intersection area over union area of two axis-aligned boxes.
///
/// Returns `0.0` when the boxes do not overlap (intersection width or height
/// `<= 0`) or when the union is empty.  Symmetric in its arguments.
///
/// ```
/// use scout_perception::geometry::iou;
/// use scout_types::BoundingBox;
///
/// let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
/// let b = BoundingBox::new(5.0, 0.0, 15.0, 10.0);
/// assert!((iou(&a, &b) - 1.0 / 3.0).abs() < 1e-6);
/// ```
pub fn iou(a: &BoundingBox, b: &BoundingBox) -> f32 {
    let ix1 = a.x1.max(b.x1);
    let iy1 = a.y1.max(b.y1);
    let ix2 = a.x2.min(b.x2);
    let iy2 = a.y2.min(b.y2);

    let iw = ix2 - ix1;
    let ih = iy2 - iy1;
    if iw <= 0.0 || ih <= 0.0 {
        return 0.0;
    }

    let intersection = iw * ih;
    let union = a.area() + b.area() - intersection;
    if union <= 0.0 {
        return 0.0;
    }
    intersection / union
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bx(x1: f32, y1: f32, x2: f32, y2: f32) -> BoundingBox {
        BoundingBox::new(x1, y1, x2, y2)
    }

    #[test]
    fn identical_boxes_have_unit_iou() {
        let a = bx(3.0, 4.0, 30.0, 40.0);
        assert!((iou(&a, &a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn disjoint_boxes_have_zero_iou() {
        assert_eq!(iou(&bx(0.0, 0.0, 10.0, 10.0), &bx(20.0, 20.0, 30.0, 30.0)), 0.0);
    }

    #[test]
    fn touching_edges_do_not_overlap() {
        assert_eq!(iou(&bx(0.0, 0.0, 10.0, 10.0), &bx(10.0, 0.0, 20.0, 10.0)), 0.0);
    }

    #[test]
    fn iou_is_symmetric() {
        let a = bx(0.0, 0.0, 12.0, 9.0);
        let b = bx(4.0, 2.0, 20.0, 14.0);
        assert_eq!(iou(&a, &b), iou(&b, &a));
        assert!(iou(&a, &b) > 0.0);
    }

    #[test]
    fn contained_box_ratio_is_area_ratio() {
        let outer = bx(0.0, 0.0, 10.0, 10.0);
        let inner = bx(0.0, 0.0, 5.0, 10.0);
        assert!((iou(&outer, &inner) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn degenerate_boxes_yield_zero() {
        let point = bx(5.0, 5.0, 5.0, 5.0);
        assert_eq!(iou(&point, &point), 0.0);
    }
}
