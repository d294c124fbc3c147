//! Distance and intersection predicates on integer segments.
//!
//! Orientation tests are exact: products of coordinate differences are
//! taken in `i128` after widening, so no pair of segments anywhere on the
//! coordinate grid can overflow. Distances come back as `f64` since
//! callers compare them against half-thicknesses that are not generally
//! integral.

use crate::{Coord, Point};

/// Squared euclidean distance, exact.
pub fn distance2(a: Point, b: Point) -> i128 {
    let dx = (a.x as i128) - (b.x as i128);
    let dy = (a.y as i128) - (b.y as i128);
    dx * dx + dy * dy
}

pub fn distance(a: Point, b: Point) -> f64 {
    (distance2(a, b) as f64).sqrt()
}

/// Cross product of (b - a) x (c - a). Sign gives the turn direction,
/// zero means collinear.
fn cross(a: Point, b: Point, c: Point) -> i128 {
    let abx = (b.x as i128) - (a.x as i128);
    let aby = (b.y as i128) - (a.y as i128);
    let acx = (c.x as i128) - (a.x as i128);
    let acy = (c.y as i128) - (a.y as i128);
    abx * acy - aby * acx
}

fn on_segment(a: Point, b: Point, p: Point) -> bool {
    p.x >= a.x.min(b.x) && p.x <= a.x.max(b.x) && p.y >= a.y.min(b.y) && p.y <= a.y.max(b.y)
}

/// Exact segment/segment intersection, endpoints inclusive.
pub fn segments_intersect(p1: Point, p2: Point, q1: Point, q2: Point) -> bool {
    let d1 = cross(q1, q2, p1);
    let d2 = cross(q1, q2, p2);
    let d3 = cross(p1, p2, q1);
    let d4 = cross(p1, p2, q2);

    if ((d1 > 0 && d2 < 0) || (d1 < 0 && d2 > 0)) && ((d3 > 0 && d4 < 0) || (d3 < 0 && d4 > 0)) {
        return true;
    }
    (d1 == 0 && on_segment(q1, q2, p1))
        || (d2 == 0 && on_segment(q1, q2, p2))
        || (d3 == 0 && on_segment(p1, p2, q1))
        || (d4 == 0 && on_segment(p1, p2, q2))
}

/// Distance from `p` to the segment `a..b`. A zero-length segment degrades
/// to point distance.
pub fn point_segment_distance(p: Point, a: Point, b: Point) -> f64 {
    let len2 = distance2(a, b);
    if len2 == 0 {
        return distance(p, a);
    }
    let apx = (p.x as i128) - (a.x as i128);
    let apy = (p.y as i128) - (a.y as i128);
    let abx = (b.x as i128) - (a.x as i128);
    let aby = (b.y as i128) - (a.y as i128);
    let dot = apx * abx + apy * aby;
    if dot <= 0 {
        return distance(p, a);
    }
    if dot >= len2 {
        return distance(p, b);
    }
    // Perpendicular distance: |cross| / |ab|.
    let c = (apx * aby - apy * abx).abs() as f64;
    c / (len2 as f64).sqrt()
}

/// The point on segment `a..b` nearest to `p`, rounded to the grid.
pub fn nearest_point_on_segment(p: Point, a: Point, b: Point) -> Point {
    let len2 = distance2(a, b);
    if len2 == 0 {
        return a;
    }
    let apx = (p.x as i128) - (a.x as i128);
    let apy = (p.y as i128) - (a.y as i128);
    let abx = (b.x as i128) - (a.x as i128);
    let aby = (b.y as i128) - (a.y as i128);
    let dot = apx * abx + apy * aby;
    if dot <= 0 {
        return a;
    }
    if dot >= len2 {
        return b;
    }
    let t = dot as f64 / len2 as f64;
    Point::new(
        crate::round_away(a.x as f64 + t * abx as f64),
        crate::round_away(a.y as f64 + t * aby as f64),
    )
}

/// Intersection point of the infinite lines through the two segments, if
/// the lines are not parallel. Rounded to the grid.
pub fn line_line_intersection(p1: Point, p2: Point, q1: Point, q2: Point) -> Option<Point> {
    let a1 = (p2.y as i128) - (p1.y as i128);
    let b1 = (p1.x as i128) - (p2.x as i128);
    let c1 = a1 * (p1.x as i128) + b1 * (p1.y as i128);
    let a2 = (q2.y as i128) - (q1.y as i128);
    let b2 = (q1.x as i128) - (q2.x as i128);
    let c2 = a2 * (q1.x as i128) + b2 * (q1.y as i128);
    let det = a1 * b2 - a2 * b1;
    if det == 0 {
        return None;
    }
    let x = (c1 * b2 - c2 * b1) as f64 / det as f64;
    let y = (a1 * c2 - a2 * c1) as f64 / det as f64;
    Some(Point::new(crate::round_away(x), crate::round_away(y)))
}

/// True when `p` lies within the stroked segment `a..b` with the given
/// half-thickness (round caps).
pub fn point_near_stroke(p: Point, a: Point, b: Point, half_thickness: Coord) -> bool {
    point_segment_distance(p, a, b) <= half_thickness as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crossing_segments_intersect() {
        assert!(segments_intersect(
            Point::new(0, 0),
            Point::new(10, 10),
            Point::new(0, 10),
            Point::new(10, 0),
        ));
    }

    #[test]
    fn parallel_segments_do_not_intersect() {
        assert!(!segments_intersect(
            Point::new(0, 0),
            Point::new(10, 0),
            Point::new(0, 5),
            Point::new(10, 5),
        ));
    }

    #[test]
    fn touching_endpoint_counts() {
        assert!(segments_intersect(
            Point::new(0, 0),
            Point::new(10, 0),
            Point::new(10, 0),
            Point::new(20, 5),
        ));
    }

    #[test]
    fn collinear_disjoint_do_not_intersect() {
        assert!(!segments_intersect(
            Point::new(0, 0),
            Point::new(5, 0),
            Point::new(6, 0),
            Point::new(10, 0),
        ));
    }

    #[test]
    fn no_overflow_at_grid_extremes() {
        // Widened arithmetic must survive the full coordinate range.
        let m = Coord::MAX;
        assert!(segments_intersect(
            Point::new(-m, -m),
            Point::new(m, m),
            Point::new(-m, m),
            Point::new(m, -m),
        ));
        assert!(distance2(Point::new(-m, -m), Point::new(m, m)) > 0);
    }

    #[test]
    fn point_segment_distance_basics() {
        let a = Point::new(0, 0);
        let b = Point::new(10, 0);
        assert_eq!(point_segment_distance(Point::new(5, 3), a, b), 3.0);
        assert_eq!(point_segment_distance(Point::new(-4, 0), a, b), 4.0);
        assert_eq!(point_segment_distance(Point::new(13, 4), a, b), 5.0);
    }

    #[test]
    fn zero_length_segment_degrades_to_point() {
        let a = Point::new(3, 4);
        assert_eq!(point_segment_distance(Point::new(0, 0), a, a), 5.0);
    }

    #[test]
    fn nearest_point_clamps_to_endpoints() {
        let a = Point::new(0, 0);
        let b = Point::new(10, 0);
        assert_eq!(nearest_point_on_segment(Point::new(-5, 9), a, b), a);
        assert_eq!(nearest_point_on_segment(Point::new(42, 1), a, b), b);
        assert_eq!(
            nearest_point_on_segment(Point::new(4, 7), a, b),
            Point::new(4, 0)
        );
    }

    #[test]
    fn line_intersection_of_diagonals() {
        let p = line_line_intersection(
            Point::new(0, 0),
            Point::new(10, 10),
            Point::new(0, 10),
            Point::new(10, 0),
        );
        assert_eq!(p, Some(Point::new(5, 5)));
        // Parallels have no crossing.
        assert_eq!(
            line_line_intersection(
                Point::new(0, 0),
                Point::new(10, 0),
                Point::new(0, 1),
                Point::new(10, 1)
            ),
            None
        );
    }
}
