//! Boolean operations on poly areas.
//!
//! The engine decomposes both operands into horizontal slabs bounded by
//! every vertex y and every cross-operand edge intersection y. Inside one
//! slab no active edge starts, ends or crosses another, so each operand is a
//! plain sequence of x-sorted intervals and the boolean reduces to interval
//! logic per slab. Result trapezoids are then fused back into contours by
//! cancelling coincident opposite horizontal edges along slab boundaries and
//! chaining what survives into cycles.
//!
//! Determinism: the x coordinate of an edge at a slab boundary is computed
//! with exact integer arithmetic and rounded half-away-from-zero. The same
//! (edge, y) pair always rounds identically, which is what makes the
//! cancellation step exact. Output vertices therefore sit within one
//! coordinate unit of the true intersection geometry; a final pass snaps
//! vertices that close to an input edge onto it.

use crate::{Contour, Island, PolyArea};
use core_geom::{BoxType, Coord, Point};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOp {
    Union,
    Intersection,
    Difference,
}

impl BoolOp {
    fn keep(self, in_a: bool, in_b: bool) -> bool {
        match self {
            BoolOp::Union => in_a || in_b,
            BoolOp::Intersection => in_a && in_b,
            BoolOp::Difference => in_a && !in_b,
        }
    }
}

/// One input edge, tagged with its operand.
#[derive(Debug, Clone, Copy)]
struct Edge {
    p: Point,
    q: Point,
    from_b: bool,
}

impl Edge {
    fn y_min(&self) -> Coord {
        self.p.y.min(self.q.y)
    }
    fn y_max(&self) -> Coord {
        self.p.y.max(self.q.y)
    }

    /// Exact x at `y`, rounded half away from zero. `y` must lie within the
    /// edge's closed y-span and the edge must not be horizontal.
    fn x_at(&self, y: Coord) -> Coord {
        let dy = (self.q.y as i128) - (self.p.y as i128);
        debug_assert!(dy != 0);
        let dx = (self.q.x as i128) - (self.p.x as i128);
        let num = dx * ((y as i128) - (self.p.y as i128));
        (self.p.x as i128 + div_round_half_away(num, dy)) as Coord
    }

    /// x at the slab midline, in float, for ordering only.
    fn x_mid(&self, y_lo: Coord, y_hi: Coord) -> f64 {
        let ym = (y_lo as f64 + y_hi as f64) / 2.0;
        let dy = (self.q.y - self.p.y) as f64;
        self.p.x as f64 + (self.q.x - self.p.x) as f64 * (ym - self.p.y as f64) / dy
    }
}

fn div_round_half_away(n: i128, d: i128) -> i128 {
    let (n, d) = if d < 0 { (-n, -d) } else { (n, d) };
    let q = n / d;
    let r = n % d;
    if 2 * r.abs() >= d {
        q + if n < 0 { -1 } else { 1 }
    } else {
        q
    }
}

fn collect_edges(area: &PolyArea, from_b: bool, out: &mut Vec<Edge>) {
    let mut push_ring = |ring: &[Point]| {
        let n = ring.len();
        for i in 0..n {
            let p = ring[i];
            let q = ring[(i + 1) % n];
            if p != q {
                out.push(Edge { p, q, from_b });
            }
        }
    };
    for island in &area.islands {
        push_ring(&island.outer.points);
        for h in &island.holes {
            push_ring(&h.points);
        }
    }
}

/// A directed horizontal segment at `y`, `x1 -> x2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct HSeg {
    y: Coord,
    x1: Coord,
    x2: Coord,
}

pub fn boolean(a: &PolyArea, b: &PolyArea, op: BoolOp) -> PolyArea {
    // Cheap outs that also avoid re-rounding untouched geometry.
    if b.is_empty() {
        return match op {
            BoolOp::Intersection => PolyArea::empty(),
            _ => a.clone(),
        };
    }
    if a.is_empty() {
        return match op {
            BoolOp::Union => b.clone(),
            _ => PolyArea::empty(),
        };
    }
    if !a.bbox().touches(&b.bbox()) {
        return match op {
            BoolOp::Union => {
                let mut r = a.clone();
                r.islands.extend(b.islands.iter().cloned());
                r
            }
            BoolOp::Intersection => PolyArea::empty(),
            BoolOp::Difference => a.clone(),
        };
    }

    let mut edges = Vec::new();
    collect_edges(a, false, &mut edges);
    collect_edges(b, true, &mut edges);

    // Event rows: every endpoint y plus both roundings of every cross-pair
    // intersection y, so no two active edges swap x order inside a slab.
    let mut ys: Vec<Coord> = Vec::new();
    for e in &edges {
        ys.push(e.p.y);
        ys.push(e.q.y);
    }
    for (i, ea) in edges.iter().enumerate() {
        for eb in edges.iter().skip(i + 1) {
            if ea.from_b == eb.from_b {
                continue;
            }
            if ea.y_max() < eb.y_min() || eb.y_max() < ea.y_min() {
                continue;
            }
            if core_geom::segments_intersect(ea.p, ea.q, eb.p, eb.q)
                && let Some(x) = crossing_y(ea, eb)
            {
                ys.push(x.floor() as Coord);
                ys.push(x.ceil() as Coord);
            }
        }
    }
    ys.sort_unstable();
    ys.dedup();

    // Per slab, build the result trapezoids.
    let mut hsegs: Vec<HSeg> = Vec::new();
    let mut sides: Vec<(Point, Point)> = Vec::new(); // directed non-horizontal edges
    for w in ys.windows(2) {
        let (y_lo, y_hi) = (w[0], w[1]);
        if y_lo >= y_hi {
            continue;
        }
        let mut active: Vec<&Edge> = edges
            .iter()
            .filter(|e| e.p.y != e.q.y && e.y_min() <= y_lo && e.y_max() >= y_hi)
            .collect();
        active.sort_by(|l, r| l.x_mid(y_lo, y_hi).total_cmp(&r.x_mid(y_lo, y_hi)));

        let mut in_a = false;
        let mut in_b = false;
        let mut run_start: Option<(Coord, Coord)> = None; // (x at y_lo, x at y_hi)
        for e in &active {
            let was = op.keep(in_a, in_b);
            if e.from_b {
                in_b = !in_b;
            } else {
                in_a = !in_a;
            }
            let now = op.keep(in_a, in_b);
            if !was && now {
                run_start = Some((e.x_at(y_lo), e.x_at(y_hi)));
            } else if was && !now
                && let Some((xl_lo, xl_hi)) = run_start.take()
            {
                let xr_lo = e.x_at(y_lo);
                let xr_hi = e.x_at(y_hi);
                emit_trapezoid(
                    y_lo, y_hi, xl_lo, xl_hi, xr_lo, xr_hi, &mut hsegs, &mut sides,
                );
            }
        }
    }

    // Split horizontal segments at every x breakpoint on their row, then
    // cancel exact opposite pairs (a bottom edge against the top edge of the
    // trapezoid below it).
    let mut row_xs: HashMap<Coord, Vec<Coord>> = HashMap::new();
    for h in &hsegs {
        row_xs.entry(h.y).or_default().extend([h.x1, h.x2]);
    }
    for xs in row_xs.values_mut() {
        xs.sort_unstable();
        xs.dedup();
    }
    let mut pieces: HashMap<(Coord, Coord, Coord), i32> = HashMap::new(); // (y, xa, xb) -> net direction
    for h in &hsegs {
        let (lo, hi, dir) = if h.x1 < h.x2 {
            (h.x1, h.x2, 1)
        } else {
            (h.x2, h.x1, -1)
        };
        if lo == hi {
            continue;
        }
        if let Some(xs) = row_xs.get(&h.y) {
            let mut prev = lo;
            for &x in xs.iter().filter(|&&x| x > lo && x < hi) {
                *pieces.entry((h.y, prev, x)).or_default() += dir;
                prev = x;
            }
            *pieces.entry((h.y, prev, hi)).or_default() += dir;
        }
    }

    // Gather surviving directed edges.
    let mut directed: Vec<(Point, Point)> = sides;
    for ((y, xa, xb), net) in pieces {
        let count = net.unsigned_abs() as usize;
        for _ in 0..count {
            if net > 0 {
                directed.push((Point::new(xa, y), Point::new(xb, y)));
            } else {
                directed.push((Point::new(xb, y), Point::new(xa, y)));
            }
        }
    }

    let cycles = chain_cycles(directed);
    let contours: Vec<Vec<Point>> = cycles
        .into_iter()
        .map(simplify_ring)
        .filter(|r| r.len() >= 3 && core_geom::contour_area2(r) != 0)
        .collect();
    assemble(contours, &edges)
}

/// y of the crossing point of two segments known to intersect, if they are
/// not collinear.
fn crossing_y(a: &Edge, b: &Edge) -> Option<f64> {
    let d1x = (a.q.x - a.p.x) as f64;
    let d1y = (a.q.y - a.p.y) as f64;
    let d2x = (b.q.x - b.p.x) as f64;
    let d2y = (b.q.y - b.p.y) as f64;
    let den = d1x * d2y - d1y * d2x;
    if den == 0.0 {
        return None;
    }
    let t = ((b.p.x - a.p.x) as f64 * d2y - (b.p.y - a.p.y) as f64 * d2x) / den;
    Some(a.p.y as f64 + t * d1y)
}

#[allow(clippy::too_many_arguments)]
fn emit_trapezoid(
    y_lo: Coord,
    y_hi: Coord,
    xl_lo: Coord,
    xl_hi: Coord,
    xr_lo: Coord,
    xr_hi: Coord,
    hsegs: &mut Vec<HSeg>,
    sides: &mut Vec<(Point, Point)>,
) {
    if xl_lo >= xr_lo && xl_hi >= xr_hi {
        return; // rounded away to nothing
    }
    // Counter-clockwise with y up: bottom left-to-right, top right-to-left.
    hsegs.push(HSeg {
        y: y_lo,
        x1: xl_lo,
        x2: xr_lo,
    });
    hsegs.push(HSeg {
        y: y_hi,
        x1: xr_hi,
        x2: xl_hi,
    });
    let bl = Point::new(xl_lo, y_lo);
    let br = Point::new(xr_lo, y_lo);
    let tr = Point::new(xr_hi, y_hi);
    let tl = Point::new(xl_hi, y_hi);
    if br != tr {
        sides.push((br, tr));
    }
    if tl != bl {
        sides.push((tl, bl));
    }
}

/// Link directed edges into closed cycles. Edges are exact; every start
/// point has a matching continuation or the edge belongs to a cancelled
/// sliver and is dropped.
fn chain_cycles(edges: Vec<(Point, Point)>) -> Vec<Vec<Point>> {
    let mut by_start: HashMap<Point, Vec<usize>> = HashMap::new();
    for (i, (s, _)) in edges.iter().enumerate() {
        by_start.entry(*s).or_default().push(i);
    }
    let mut used = vec![false; edges.len()];
    let mut cycles = Vec::new();
    for start in 0..edges.len() {
        if used[start] {
            continue;
        }
        let mut ring = Vec::new();
        let mut cur = start;
        let origin = edges[start].0;
        loop {
            used[cur] = true;
            ring.push(edges[cur].0);
            let next_pt = edges[cur].1;
            if next_pt == origin {
                cycles.push(ring);
                break;
            }
            let Some(candidates) = by_start.get(&next_pt) else {
                break; // dangling: dropped sliver
            };
            match candidates.iter().find(|&&i| !used[i]) {
                Some(&i) => cur = i,
                None => break,
            }
        }
    }
    cycles
}

/// Drop repeated and collinear consecutive points.
fn simplify_ring(mut ring: Vec<Point>) -> Vec<Point> {
    ring.dedup();
    if ring.last() == ring.first() {
        ring.pop();
    }
    let mut out: Vec<Point> = Vec::with_capacity(ring.len());
    for p in ring {
        while out.len() >= 2 {
            let a = out[out.len() - 2];
            let b = out[out.len() - 1];
            if collinear(a, b, p) {
                out.pop();
            } else {
                break;
            }
        }
        out.push(p);
    }
    // Wrap-around collinearity.
    while out.len() >= 3 {
        let n = out.len();
        if collinear(out[n - 2], out[n - 1], out[0]) {
            out.pop();
        } else if collinear(out[n - 1], out[0], out[1]) {
            out.remove(0);
        } else {
            break;
        }
    }
    out
}

fn collinear(a: Point, b: Point, c: Point) -> bool {
    let abx = (b.x as i128) - (a.x as i128);
    let aby = (b.y as i128) - (a.y as i128);
    let acx = (c.x as i128) - (a.x as i128);
    let acy = (c.y as i128) - (a.y as i128);
    abx * acy - aby * acx == 0
}

/// Classify cycles into outers and holes by winding (the trapezoid emission
/// keeps the interior on the left), snap near-edge vertices onto the input
/// edges, and nest holes under the outer that contains them.
fn assemble(contours: Vec<Vec<Point>>, input_edges: &[Edge]) -> PolyArea {
    let mut outers: Vec<Island> = Vec::new();
    let mut holes: Vec<Vec<Point>> = Vec::new();
    for ring in contours {
        let ring = snap_to_edges(ring, input_edges);
        if ring.len() < 3 {
            continue;
        }
        let area2 = core_geom::contour_area2(&ring);
        if area2 == 0 {
            continue;
        }
        if area2 > 0 {
            outers.push(Island {
                outer: Contour { points: ring },
                holes: Vec::new(),
            });
        } else {
            holes.push(ring);
        }
    }
    'next_hole: for h in holes {
        // Smallest containing outer wins so nested structures land right.
        let mut best: Option<(usize, f64)> = None;
        for (i, island) in outers.iter().enumerate() {
            if h.iter().any(|p| island.outer.contains(*p)) {
                let a = island.outer.area();
                if best.is_none_or(|(_, ba)| a < ba) {
                    best = Some((i, a));
                }
            }
        }
        if let Some((i, _)) = best {
            outers[i].holes.push(Contour { points: h });
            continue 'next_hole;
        }
        // A hole with no host is a cancellation artifact; drop it.
        tracing::trace!(target: "poly.bool", "orphan_hole_dropped");
    }
    PolyArea { islands: outers }
}

/// Snap vertices lying within one unit of an input edge onto that edge.
/// Keeps boolean output from carrying slivers along almost-touched inputs.
fn snap_to_edges(ring: Vec<Point>, input_edges: &[Edge]) -> Vec<Point> {
    let mut out: Vec<Point> = Vec::with_capacity(ring.len());
    for p in ring {
        let mut snapped = p;
        for e in input_edges {
            let eb = BoxType::new(
                e.p.x.min(e.q.x) - 2,
                e.p.y.min(e.q.y) - 2,
                e.p.x.max(e.q.x) + 2,
                e.p.y.max(e.q.y) + 2,
            );
            if !eb.contains_point(p) {
                continue;
            }
            let d = core_geom::point_segment_distance(p, e.p, e.q);
            if d > 0.0 && d <= 1.0 {
                snapped = core_geom::intersect::nearest_point_on_segment(p, e.p, e.q);
                break;
            }
        }
        if out.last() != Some(&snapped) {
            out.push(snapped);
        }
    }
    if out.len() > 1 && out.first() == out.last() {
        out.pop();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(x1: i32, y1: i32, x2: i32, y2: i32) -> PolyArea {
        PolyArea::from_contour(vec![
            Point::new(x1, y1),
            Point::new(x2, y1),
            Point::new(x2, y2),
            Point::new(x1, y2),
        ])
        .unwrap()
    }

    #[test]
    fn difference_cuts_a_hole() {
        let big = rect(0, 0, 100, 100);
        let small = rect(40, 40, 60, 60);
        let out = big.subtract(&small);
        assert_eq!(out.islands.len(), 1);
        assert_eq!(out.islands[0].holes.len(), 1);
        assert_eq!(out.area(), 10_000.0 - 400.0);
        assert!(out.contains(Point::new(10, 10)));
        assert!(!out.contains(Point::new(50, 50)));
    }

    #[test]
    fn difference_clips_overlap() {
        let a = rect(0, 0, 100, 100);
        let b = rect(50, -10, 150, 110);
        let out = a.subtract(&b);
        assert_eq!(out.islands.len(), 1);
        assert!(out.islands[0].holes.is_empty());
        assert_eq!(out.area(), 50.0 * 100.0);
        assert!(out.contains(Point::new(25, 50)));
        assert!(!out.contains(Point::new(75, 50)));
    }

    #[test]
    fn difference_disjoint_is_identity() {
        let a = rect(0, 0, 100, 100);
        let b = rect(500, 500, 600, 600);
        assert_eq!(a.subtract(&b), a);
    }

    #[test]
    fn difference_consuming_everything_is_empty() {
        let a = rect(10, 10, 20, 20);
        let b = rect(0, 0, 100, 100);
        assert!(a.subtract(&b).is_empty());
    }

    #[test]
    fn full_width_cut_splits_into_islands() {
        let a = rect(0, 0, 100, 100);
        let cut = rect(45, -10, 55, 110);
        let out = a.subtract(&cut);
        assert_eq!(out.islands.len(), 2);
        assert_eq!(out.area(), 2.0 * 45.0 * 100.0);
        assert!(out.contains(Point::new(20, 50)));
        assert!(out.contains(Point::new(80, 50)));
        assert!(!out.contains(Point::new(50, 50)));
    }

    #[test]
    fn union_merges_overlapping() {
        let a = rect(0, 0, 100, 100);
        let b = rect(50, 0, 150, 100);
        let out = a.union(&b);
        assert_eq!(out.islands.len(), 1);
        assert_eq!(out.area(), 150.0 * 100.0);
    }

    #[test]
    fn union_disjoint_keeps_both() {
        let a = rect(0, 0, 10, 10);
        let b = rect(100, 100, 110, 110);
        let out = a.union(&b);
        assert_eq!(out.islands.len(), 2);
    }

    #[test]
    fn intersection_basic() {
        let a = rect(0, 0, 100, 100);
        let b = rect(50, 50, 150, 150);
        let out = a.intersect(&b);
        assert_eq!(out.islands.len(), 1);
        assert_eq!(out.area(), 50.0 * 50.0);
    }

    #[test]
    fn intersection_disjoint_is_empty() {
        let a = rect(0, 0, 10, 10);
        let b = rect(100, 0, 110, 10);
        assert!(a.intersect(&b).is_empty());
    }

    #[test]
    fn diagonal_subtraction() {
        // A diamond cut out of a square: verifies non-axis-aligned edges.
        let a = rect(0, 0, 100, 100);
        let diamond = PolyArea::from_contour(vec![
            Point::new(50, 20),
            Point::new(80, 50),
            Point::new(50, 80),
            Point::new(20, 50),
        ])
        .unwrap();
        let out = a.subtract(&diamond);
        assert_eq!(out.islands.len(), 1);
        assert_eq!(out.islands[0].holes.len(), 1);
        let expect = 10_000.0 - 1_800.0;
        assert!((out.area() - expect).abs() < 8.0, "area {}", out.area());
        assert!(!out.contains(Point::new(50, 50)));
        assert!(out.contains(Point::new(5, 5)));
    }

    #[test]
    fn two_cuts_two_holes() {
        let a = rect(0, 0, 200, 200);
        let h1 = rect(20, 20, 40, 40);
        let h2 = rect(120, 120, 140, 140);
        let out = a.subtract(&h1).subtract(&h2);
        assert_eq!(out.islands.len(), 1);
        assert_eq!(out.islands[0].holes.len(), 2);
        assert_eq!(out.area(), 40_000.0 - 2.0 * 400.0);
    }

    #[test]
    fn subtract_then_restore_by_union() {
        // Clearance then restore: union with the same shape closes the hole.
        let a = rect(0, 0, 100, 100);
        let c = rect(40, 40, 60, 60);
        let cleared = a.subtract(&c);
        let restored = cleared.union(&c);
        assert_eq!(restored.islands.len(), 1);
        assert!(restored.islands[0].holes.is_empty());
        assert_eq!(restored.area(), 10_000.0);
    }

    #[test]
    fn subtraction_touching_edge_keeps_area_outside() {
        // Cut flush with the left edge: no hole, just a notch.
        let a = rect(0, 0, 100, 100);
        let c = rect(0, 40, 30, 60);
        let out = a.subtract(&c);
        assert_eq!(out.islands.len(), 1);
        assert!(out.islands[0].holes.is_empty());
        assert_eq!(out.area(), 10_000.0 - 600.0);
    }
}
