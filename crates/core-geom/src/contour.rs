//! Closed-contour predicates: signed area, winding, point containment.

use crate::Point;

/// Twice the signed area of the closed contour through `pts` (shoelace).
/// Positive means counter-clockwise in the board's y-down frame. Summed in
/// `i128`: each term is a product of two widened coordinates.
pub fn contour_area2(pts: &[Point]) -> i128 {
    if pts.len() < 3 {
        return 0;
    }
    let mut sum: i128 = 0;
    for i in 0..pts.len() {
        let a = pts[i];
        let b = pts[(i + 1) % pts.len()];
        sum += (a.x as i128) * (b.y as i128) - (b.x as i128) * (a.y as i128);
    }
    sum
}

/// Winding sign of the contour: 1 counter-clockwise, -1 clockwise, 0 for a
/// degenerate (collinear or too-short) ring.
pub fn winding_sign(pts: &[Point]) -> i8 {
    contour_area2(pts).signum() as i8
}

/// Even-odd point-in-contour test on the closed ring `pts`. Points exactly
/// on an edge count as inside.
pub fn point_in_contour(p: Point, pts: &[Point]) -> bool {
    if pts.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = pts.len() - 1;
    for i in 0..pts.len() {
        let a = pts[i];
        let b = pts[j];
        // Edge hit is inside by definition.
        if crate::intersect::point_segment_distance(p, a, b) == 0.0 {
            return true;
        }
        if (a.y > p.y) != (b.y > p.y) {
            // Exact crossing test: compare p.x against the edge at p.y
            // without dividing.
            let dy = (b.y as i128) - (a.y as i128);
            let lhs = ((p.x as i128) - (a.x as i128)) * dy;
            let rhs = ((b.x as i128) - (a.x as i128)) * ((p.y as i128) - (a.y as i128));
            if (dy > 0 && lhs < rhs) || (dy < 0 && lhs > rhs) {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Vec<Point> {
        vec![
            Point::new(0, 0),
            Point::new(10, 0),
            Point::new(10, 10),
            Point::new(0, 10),
        ]
    }

    #[test]
    fn square_area_and_winding() {
        let s = square();
        assert_eq!(contour_area2(&s), 200);
        assert_eq!(winding_sign(&s), 1);
        let mut rev = s.clone();
        rev.reverse();
        assert_eq!(winding_sign(&rev), -1);
    }

    #[test]
    fn degenerate_ring_has_zero_winding() {
        let line = vec![Point::new(0, 0), Point::new(5, 5), Point::new(10, 10)];
        assert_eq!(winding_sign(&line), 0);
    }

    #[test]
    fn containment() {
        let s = square();
        assert!(point_in_contour(Point::new(5, 5), &s));
        assert!(!point_in_contour(Point::new(15, 5), &s));
        // On-edge counts as inside.
        assert!(point_in_contour(Point::new(10, 5), &s));
        assert!(point_in_contour(Point::new(0, 0), &s));
    }

    #[test]
    fn concave_containment() {
        // L-shape; the notch is outside.
        let l = vec![
            Point::new(0, 0),
            Point::new(20, 0),
            Point::new(20, 10),
            Point::new(10, 10),
            Point::new(10, 20),
            Point::new(0, 20),
        ];
        assert!(point_in_contour(Point::new(5, 15), &l));
        assert!(!point_in_contour(Point::new(15, 15), &l));
    }
}
