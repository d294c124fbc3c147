//! Arc endpoint and sweep math.
//!
//! Arc angles follow the board convention: 0 degrees points in the negative
//! x direction and angles grow counter-clockwise in board coordinates (y
//! grows downward on screen). An endpoint at angle `a` on an arc centered at
//! `(cx, cy)` with radii `(w, h)` sits at
//! `(cx - w*cos(a), cy + h*sin(a))`.

use crate::{Angle, BoxType, Coord, Point, round_away};

const DEG: f64 = std::f64::consts::PI / 180.0;

/// Normalize an angle into `[0, 360)`.
pub fn normalize_angle(a: Angle) -> Angle {
    let mut a = a % 360.0;
    if a < 0.0 {
        a += 360.0;
    }
    a
}

/// The point at `angle` degrees on the ellipse `(cx, cy, w, h)`.
pub fn arc_point(center: Point, width: Coord, height: Coord, angle: Angle) -> Point {
    Point::new(
        round_away(center.x as f64 - width as f64 * (angle * DEG).cos()),
        round_away(center.y as f64 + height as f64 * (angle * DEG).sin()),
    )
}

/// Start and end points of an arc described by `(start_angle, delta)`.
/// `delta` keeps its sign: a negative delta sweeps the other way.
pub fn arc_endpoints(
    center: Point,
    width: Coord,
    height: Coord,
    start_angle: Angle,
    delta: Angle,
) -> (Point, Point) {
    (
        arc_point(center, width, height, start_angle),
        arc_point(center, width, height, start_angle + delta),
    )
}

/// True when `angle` lies on the swept range `[start, start + delta]`,
/// whichever direction delta runs.
pub fn angle_in_sweep(start_angle: Angle, delta: Angle, angle: Angle) -> bool {
    let a = normalize_angle(angle);
    let s = normalize_angle(start_angle);
    let d = delta.abs().min(360.0);
    let from = if delta < 0.0 { normalize_angle(s - d) } else { s };
    let diff = normalize_angle(a - from);
    diff <= d
}

/// Tight bounding box of the swept arc stroke (ignoring thickness). Walks
/// the endpoints plus every axis extreme inside the sweep.
pub fn arc_bounding_box(
    center: Point,
    width: Coord,
    height: Coord,
    start_angle: Angle,
    delta: Angle,
) -> BoxType {
    let (p1, p2) = arc_endpoints(center, width, height, start_angle, delta);
    let mut bx = BoxType::point_box(p1).union(&BoxType::point_box(p2));
    // Axis extremes sit at multiples of 90 degrees.
    for quad in 0..4 {
        let a = quad as f64 * 90.0;
        if angle_in_sweep(start_angle, delta, a) {
            bx = bx.union(&BoxType::point_box(arc_point(center, width, height, a)));
        }
    }
    bx
}

/// Arc length of the sweep, elliptical radii averaged.
pub fn arc_length(width: Coord, height: Coord, delta: Angle) -> f64 {
    let r = (width as f64 + height as f64) / 2.0;
    (delta.abs() * DEG) * r
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_wraps_both_directions() {
        assert_eq!(normalize_angle(370.0), 10.0);
        assert_eq!(normalize_angle(-90.0), 270.0);
        assert_eq!(normalize_angle(0.0), 0.0);
        assert_eq!(normalize_angle(360.0), 0.0);
    }

    #[test]
    fn zero_angle_points_negative_x() {
        let p = arc_point(Point::new(1000, 1000), 100, 100, 0.0);
        assert_eq!(p, Point::new(900, 1000));
    }

    #[test]
    fn quarter_sweep_endpoints() {
        let (s, e) = arc_endpoints(Point::new(0, 0), 100, 100, 0.0, 90.0);
        assert_eq!(s, Point::new(-100, 0));
        assert_eq!(e, Point::new(0, 100));
    }

    #[test]
    fn negative_delta_preserves_sign() {
        let (_, e) = arc_endpoints(Point::new(0, 0), 100, 100, 0.0, -90.0);
        assert_eq!(e, Point::new(0, -100));
    }

    #[test]
    fn sweep_membership() {
        assert!(angle_in_sweep(0.0, 90.0, 45.0));
        assert!(!angle_in_sweep(0.0, 90.0, 180.0));
        assert!(angle_in_sweep(0.0, -90.0, 315.0));
        assert!(angle_in_sweep(350.0, 20.0, 5.0)); // crosses zero
    }

    #[test]
    fn full_circle_box_is_symmetric() {
        let bx = arc_bounding_box(Point::new(0, 0), 100, 100, 0.0, 360.0);
        assert!(bx.x1 <= -100 && bx.x2 >= 100);
        assert!(bx.y1 <= -100 && bx.y2 >= 100);
    }
}
