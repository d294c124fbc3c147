//! Clearance outlines cast by conductors, and thermal spoke geometry.
//!
//! Conductor outlines are closed contours on the grid. Round shapes are
//! approximated by regular polygons with [`CIRCLE_SEGS`] sides; the
//! approximation is inscribed-radius-compensated so the polygon never dips
//! inside the true circle by more than a fraction of a unit at board scales.

use crate::{Contour, Island, PolyArea};
use core_geom::{Angle, Coord, Point, arc::arc_point, round_away};

/// Sides used to approximate a full circle.
pub const CIRCLE_SEGS: usize = 24;

/// Pin and via annulus shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PinShape {
    #[default]
    Round,
    Square,
    Octagon,
}

fn ring_area(points: Vec<Point>) -> PolyArea {
    match Contour::new(points) {
        Ok(c) => PolyArea::from_island(Island::new(c)),
        Err(_) => PolyArea::empty(),
    }
}

/// Regular polygon approximating the circle of `radius` around `center`.
/// Radius compensation keeps the polygon's inscribed circle at `radius`.
pub fn circle_outline(center: Point, radius: Coord) -> PolyArea {
    if radius <= 0 {
        return PolyArea::empty();
    }
    let step = std::f64::consts::TAU / CIRCLE_SEGS as f64;
    let r = radius as f64 / (step / 2.0).cos();
    let mut pts = Vec::with_capacity(CIRCLE_SEGS);
    for i in 0..CIRCLE_SEGS {
        let a = step * i as f64;
        pts.push(Point::new(
            center.x + round_away(r * a.cos()),
            center.y + round_away(r * a.sin()),
        ));
    }
    ring_area(pts)
}

/// Axis-aligned square of half-width `half` around `center`.
pub fn square_outline(center: Point, half: Coord) -> PolyArea {
    if half <= 0 {
        return PolyArea::empty();
    }
    ring_area(vec![
        Point::new(center.x - half, center.y - half),
        Point::new(center.x + half, center.y - half),
        Point::new(center.x + half, center.y + half),
        Point::new(center.x - half, center.y + half),
    ])
}

/// Regular octagon of circumscribed half-width `half` around `center`.
pub fn octagon_outline(center: Point, half: Coord) -> PolyArea {
    if half <= 0 {
        return PolyArea::empty();
    }
    // Flat sides at the axes; the short offset is half*tan(22.5).
    let s = round_away(half as f64 * 0.414_213_562);
    let (cx, cy) = (center.x, center.y);
    ring_area(vec![
        Point::new(cx + half, cy - s),
        Point::new(cx + half, cy + s),
        Point::new(cx + s, cy + half),
        Point::new(cx - s, cy + half),
        Point::new(cx - half, cy + s),
        Point::new(cx - half, cy - s),
        Point::new(cx - s, cy - half),
        Point::new(cx + s, cy - half),
    ])
}

/// The clearance region a pin or via casts into a polygon: its shape grown
/// by the clearance. `thickness` is the copper diameter, `clearance` the
/// stored full-gap value (twice the per-side keepaway).
pub fn pin_clearance_outline(
    center: Point,
    thickness: Coord,
    clearance: Coord,
    shape: PinShape,
) -> PolyArea {
    let half = (thickness + clearance) / 2;
    match shape {
        PinShape::Round => circle_outline(center, half),
        PinShape::Square => square_outline(center, half),
        PinShape::Octagon => octagon_outline(center, half),
    }
}

/// Stroked outline of a line with round caps. `width` is the full stroke
/// width (thickness plus stored clearance for clearance casting).
pub fn line_clearance_outline(p1: Point, p2: Point, width: Coord) -> PolyArea {
    let half = width / 2;
    if half <= 0 {
        return PolyArea::empty();
    }
    if p1 == p2 {
        return circle_outline(p1, half);
    }
    let dx = (p2.x - p1.x) as f64;
    let dy = (p2.y - p1.y) as f64;
    let len = (dx * dx + dy * dy).sqrt();
    let (ux, uy) = (dx / len, dy / len);
    // Normal pointing left of travel.
    let (nx, ny) = (-uy, ux);
    let h = half as f64;
    let cap_segs = CIRCLE_SEGS / 2;
    let mut pts: Vec<Point> = Vec::with_capacity(2 * cap_segs + 2);
    // Left side p1 -> p2, then a cap around p2, right side back, cap at p1.
    let angle0 = ny.atan2(nx);
    pts.push(Point::new(
        p1.x + round_away(nx * h),
        p1.y + round_away(ny * h),
    ));
    pts.push(Point::new(
        p2.x + round_away(nx * h),
        p2.y + round_away(ny * h),
    ));
    for i in 1..cap_segs {
        let a = angle0 - std::f64::consts::PI * i as f64 / cap_segs as f64;
        pts.push(Point::new(
            p2.x + round_away(h * a.cos()),
            p2.y + round_away(h * a.sin()),
        ));
    }
    pts.push(Point::new(
        p2.x - round_away(nx * h),
        p2.y - round_away(ny * h),
    ));
    pts.push(Point::new(
        p1.x - round_away(nx * h),
        p1.y - round_away(ny * h),
    ));
    for i in 1..cap_segs {
        let a = angle0 + std::f64::consts::PI + std::f64::consts::PI * i as f64 / cap_segs as f64;
        pts.push(Point::new(
            p1.x + round_away(h * a.cos()),
            p1.y + round_away(h * a.sin()),
        ));
    }
    pts.dedup();
    if pts.len() > 1 && pts.first() == pts.last() {
        pts.pop();
    }
    ring_area(pts)
}

/// Ring-sector outline of an arc stroke: the sweep walked along the outer
/// radius and back along the inner, flat capped.
pub fn arc_clearance_outline(
    center: Point,
    width: Coord,
    height: Coord,
    start_angle: Angle,
    delta: Angle,
    stroke: Coord,
) -> PolyArea {
    let half = stroke / 2;
    if half <= 0 {
        return PolyArea::empty();
    }
    let delta = delta.clamp(-360.0, 360.0);
    let steps = ((delta.abs() / 360.0) * CIRCLE_SEGS as f64).ceil().max(1.0) as usize;
    let mut pts = Vec::with_capacity(2 * steps + 2);
    for i in 0..=steps {
        let a = start_angle + delta * i as f64 / steps as f64;
        pts.push(arc_point(center, width + half, height + half, a));
    }
    let inner_w = (width - half).max(0);
    let inner_h = (height - half).max(0);
    for i in (0..=steps).rev() {
        let a = start_angle + delta * i as f64 / steps as f64;
        pts.push(arc_point(center, inner_w, inner_h, a));
    }
    pts.dedup();
    if pts.len() > 1 && pts.first() == pts.last() {
        pts.pop();
    }
    ring_area(pts)
}

/// The region a thermally connected pin subtracts from its polygon: the
/// clearance outline minus the spokes that carry the connection. A solid
/// thermal subtracts nothing; style `None` is not a thermal and callers use
/// the plain clearance outline instead.
///
/// Sharp and rounded spoke variants share the same spoke rectangles; the
/// rounding of the fillet where a spoke meets the copper only matters to
/// rendering, not to connectivity, so the clearance geometry treats them
/// alike.
pub fn thermal_clearance(
    center: Point,
    thickness: Coord,
    clearance: Coord,
    shape: PinShape,
    style: crate::shapes::ThermalSpokes,
    scale: f64,
) -> PolyArea {
    let ring = pin_clearance_outline(center, thickness, clearance, shape);
    let spoke_w = round_away((thickness as f64 * scale).max(2.0)) / 2 * 2;
    let reach = (thickness + clearance) / 2 + 1;
    let spokes = match style {
        ThermalSpokes::Solid => return PolyArea::empty(),
        ThermalSpokes::Orthogonal => cross_outline(center, reach, spoke_w / 2, false),
        ThermalSpokes::Diagonal => cross_outline(center, reach, spoke_w / 2, true),
    };
    ring.subtract(&spokes)
}

/// Spoke layout of a thermal style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThermalSpokes {
    Diagonal,
    Orthogonal,
    Solid,
}

/// Two crossing bars through `center`, reaching `reach` out on each arm,
/// `half` wide. Diagonal rotates the cross 45 degrees.
fn cross_outline(center: Point, reach: Coord, half: Coord, diagonal: bool) -> PolyArea {
    let bar_h = ring_area(vec![
        Point::new(center.x - reach, center.y - half),
        Point::new(center.x + reach, center.y - half),
        Point::new(center.x + reach, center.y + half),
        Point::new(center.x - reach, center.y + half),
    ]);
    let bar_v = ring_area(vec![
        Point::new(center.x - half, center.y - reach),
        Point::new(center.x + half, center.y - reach),
        Point::new(center.x + half, center.y + reach),
        Point::new(center.x - half, center.y + reach),
    ]);
    let cross = bar_h.union(&bar_v);
    if !diagonal {
        return cross;
    }
    // Rotate the cross by 45 degrees around the center.
    let rot = |p: Point| {
        let dx = (p.x - center.x) as f64;
        let dy = (p.y - center.y) as f64;
        let c = std::f64::consts::FRAC_1_SQRT_2;
        Point::new(
            center.x + round_away(c * (dx - dy)),
            center.y + round_away(c * (dx + dy)),
        )
    };
    let mut out = PolyArea::empty();
    for island in &cross.islands {
        let pts: Vec<Point> = island.outer.points.iter().copied().map(rot).collect();
        out = out.union(&ring_area(pts));
    }
    out
}
