//! Polygon clearance maintenance.
//!
//! Every polygon's *effective* shape is its declared contour minus the
//! clearance regions of all overlapping conductors that neither join it nor
//! connect through a thermal, with thermal spokes left standing. This
//! module owns that equation.
//!
//! The incremental entry points mirror the classic pair: `clear_from`
//! subtracts one conductor from every polygon its box overlaps, and
//! `restore_to` gives the copper back when the conductor is about to move
//! or die. Restoration recomputes from scratch rather than un-subtracting,
//! the union of the remaining clearances is not generally invertible one
//! region at a time. Mutation helpers in [`crate::ops`] therefore mark
//! affected polygons dirty and the dispatcher flushes the dirt once per
//! action through [`reclip_dirty`], which satisfies the same invariant at
//! the journal boundary.

use crate::entity::{ObjectId, Polygon};
use crate::flags::{ObjectFlags, ThermalStyle};
use crate::{Board, BoardData, BOTTOM_SIDE, TOP_SIDE};
use core_geom::{BoxType, Point};
use core_poly::{PinShape, PolyArea, ThermalSpokes};
use tracing::{debug, trace};

/// A conductor that can cast clearance into polygons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConductorRef {
    Via(ObjectId),
    Pin(ObjectId),
    Pad(ObjectId),
    Line { layer: usize, id: ObjectId },
    Arc { layer: usize, id: ObjectId },
    Text { layer: usize, id: ObjectId },
}

/// Invalidate the clipped shape of every polygon whose box overlaps `bbox`.
/// `layer` limits the sweep to one layer; `None` hits every copper layer
/// (vias and pins pierce the whole stack).
pub fn mark_dirty_overlapping(data: &mut BoardData, bbox: BoxType, layer: Option<usize>) {
    let copper = data.copper_count;
    for li in 0..copper {
        if let Some(only) = layer
            && only != li
        {
            continue;
        }
        let hits: Vec<ObjectId> = {
            let tree = &data.layers[li].polygon_tree;
            tree.query(&bbox).into_iter().map(|(_, id)| id).collect()
        };
        for id in hits {
            if let Some(poly) = data.layers[li].polygon_mut(id) {
                poly.clipped = None;
            }
        }
    }
}

fn pin_shape_of(flags: &crate::flags::Flags) -> PinShape {
    if flags.has(ObjectFlags::SQUARE) {
        PinShape::Square
    } else if flags.has(ObjectFlags::OCTAGON) {
        PinShape::Octagon
    } else {
        PinShape::Round
    }
}

fn spokes_of(style: ThermalStyle) -> Option<ThermalSpokes> {
    match style {
        ThermalStyle::None => None,
        ThermalStyle::DiagonalSharp | ThermalStyle::DiagonalRounded => {
            Some(ThermalSpokes::Diagonal)
        }
        ThermalStyle::OrthogonalSharp | ThermalStyle::OrthogonalRounded => {
            Some(ThermalSpokes::Orthogonal)
        }
        ThermalStyle::Solid => Some(ThermalSpokes::Solid),
    }
}

/// The region one pin-like conductor subtracts from a polygon on `layer`,
/// honoring its per-layer thermal style. `None` means nothing is
/// subtracted (solid thermal).
fn pin_subtraction(
    via: &crate::entity::Via,
    layer: usize,
    thermal_scale: f64,
) -> Option<PolyArea> {
    let style = via.flags.thermals.get(layer);
    match spokes_of(style) {
        None => Some(core_poly::pin_clearance_outline(
            via.pos,
            via.thickness,
            via.clearance,
            pin_shape_of(&via.flags),
        )),
        Some(ThermalSpokes::Solid) => None,
        Some(spokes) => {
            let t = core_poly::thermal_clearance(
                via.pos,
                via.thickness,
                via.clearance,
                pin_shape_of(&via.flags),
                spokes,
                thermal_scale,
            );
            if t.is_empty() { None } else { Some(t) }
        }
    }
}

fn pad_subtraction(pad: &crate::entity::Pad) -> PolyArea {
    if pad.flags.has(ObjectFlags::SQUARE) {
        // Square-cap stroke: the bounding rectangle of the grown pad.
        let half = (pad.thickness + pad.clearance) / 2;
        let b = BoxType::new(
            pad.point1.x.min(pad.point2.x) - half,
            pad.point1.y.min(pad.point2.y) - half,
            pad.point1.x.max(pad.point2.x) + half,
            pad.point1.y.max(pad.point2.y) + half,
        );
        PolyArea::from_contour(vec![
            Point::new(b.x1, b.y1),
            Point::new(b.x2, b.y1),
            Point::new(b.x2, b.y2),
            Point::new(b.x1, b.y2),
        ])
        .unwrap_or_default()
    } else {
        core_poly::line_clearance_outline(
            pad.point1,
            pad.point2,
            pad.thickness + pad.clearance,
        )
    }
}

/// Collect every clearance region cast into `poly` on `layer`.
fn gather_subtractions(board: &Board, layer: usize, poly: &Polygon) -> Vec<PolyArea> {
    let data = &board.data;
    let mut out = Vec::new();
    let clear_pins = poly.flags.has(ObjectFlags::CLEARPOLY);

    if clear_pins {
        for (_, id) in data.via_tree.query(&poly.bbox) {
            if let Some(via) = data.via(id)
                && via.pierces_layer(layer)
                && let Some(region) = pin_subtraction(via, layer, board.thermal_scale)
            {
                out.push(region);
            }
        }
        for (_, id) in data.pin_tree.query(&poly.bbox) {
            if let Some((_, pin)) = data.pin(id)
                && let Some(region) = pin_subtraction(pin, layer, board.thermal_scale)
            {
                out.push(region);
            }
        }
        for side in [BOTTOM_SIDE, TOP_SIDE] {
            if !board.groups.layer_on_side(layer, side) {
                continue;
            }
            for (_, id) in data.pad_tree[side].query(&poly.bbox) {
                if let Some((_, pad)) = data.pad(id) {
                    match spokes_of(pad.flags.thermals.get(layer)) {
                        None => out.push(pad_subtraction(pad)),
                        Some(ThermalSpokes::Solid) => {}
                        // Spoked pad thermals degrade to solid; the spoke
                        // geometry is only defined for pin-like rings.
                        Some(_) => {}
                    }
                }
            }
        }
    }

    let l = &data.layers[layer];
    for (_, id) in l.line_tree.query(&poly.bbox) {
        if let Some(line) = l.line(id)
            && line.flags.has(ObjectFlags::CLEARLINE)
        {
            out.push(core_poly::line_clearance_outline(
                line.point1,
                line.point2,
                line.thickness + line.clearance,
            ));
        }
    }
    for (_, id) in l.arc_tree.query(&poly.bbox) {
        if let Some(arc) = l.arc(id)
            && arc.flags.has(ObjectFlags::CLEARLINE)
        {
            out.push(core_poly::arc_clearance_outline(
                arc.center,
                arc.width,
                arc.height,
                arc.start_angle as f64,
                arc.delta as f64,
                arc.thickness + arc.clearance,
            ));
        }
    }
    for (_, id) in l.text_tree.query(&poly.bbox) {
        if let Some(text) = l.text(id)
            && text.flags.has(ObjectFlags::CLEARLINE)
        {
            let b = text.bbox;
            if let Ok(area) = PolyArea::from_contour(vec![
                Point::new(b.x1, b.y1),
                Point::new(b.x2, b.y1),
                Point::new(b.x2, b.y2),
                Point::new(b.x1, b.y2),
            ]) {
                out.push(area);
            }
        }
    }
    out
}

/// Recompute one polygon's effective shape from scratch.
pub fn init_clip(board: &mut Board, layer: usize, id: ObjectId) -> bool {
    let Some(poly) = board.data.layers.get(layer).and_then(|l| l.polygon(id)) else {
        return false;
    };
    let declared = match poly.declared_shape() {
        Ok(s) => s,
        Err(err) => {
            debug!(target: "model.clip", id, %err, "degenerate_polygon");
            if let Some(p) = board.data.layers[layer].polygon_mut(id) {
                p.clipped = Some(PolyArea::empty());
            }
            return false;
        }
    };
    let full_poly = poly.flags.has(ObjectFlags::FULLPOLY);
    let subtractions = gather_subtractions(board, layer, poly);
    let mut shape = declared;
    for region in &subtractions {
        shape = shape.subtract(region);
    }
    if !full_poly {
        shape = shape.largest_island();
    }
    trace!(
        target: "model.clip",
        id,
        layer,
        regions = subtractions.len(),
        islands = shape.islands.len(),
        holes = shape.hole_count(),
        "polygon_clipped"
    );
    if let Some(p) = board.data.layers[layer].polygon_mut(id) {
        p.clipped = Some(shape);
    }
    true
}

/// Recompute every dirty polygon. Returns how many were reclipped.
pub fn reclip_dirty(board: &mut Board) -> usize {
    let mut work = Vec::new();
    for (li, l) in board.data.layers.iter().enumerate() {
        for p in &l.polygons {
            if p.clipped.is_none() {
                work.push((li, p.id));
            }
        }
    }
    let count = work.len();
    for (li, id) in work {
        init_clip(board, li, id);
    }
    if count > 0 {
        debug!(target: "model.clip", count, "reclip_flush");
    }
    count
}

/// Subtract one conductor's clearance from every polygon it overlaps,
/// incrementally. Polygons still dirty are recomputed in full instead.
pub fn clear_from(board: &mut Board, conductor: ConductorRef) {
    let Some((bbox, layer_scope)) = conductor_extent(&board.data, conductor) else {
        return;
    };
    for layer in 0..board.data.copper_count {
        if let Some(only) = layer_scope
            && only != layer
        {
            continue;
        }
        let ids: Vec<ObjectId> = board.data.layers[layer]
            .polygon_tree
            .query(&bbox)
            .into_iter()
            .map(|(_, id)| id)
            .collect();
        for id in ids {
            let needs_full = board.data.layers[layer]
                .polygon(id)
                .is_none_or(|p| p.clipped.is_none());
            if needs_full {
                init_clip(board, layer, id);
                continue;
            }
            let Some(poly) = board.data.layers[layer].polygon(id) else {
                continue;
            };
            let region = conductor_region(board, conductor, layer, poly);
            let full_poly = poly.flags.has(ObjectFlags::FULLPOLY);
            if let Some(region) = region {
                let Some(poly) = board.data.layers[layer].polygon_mut(id) else {
                    continue;
                };
                if let Some(clipped) = poly.clipped.take() {
                    let mut shape = clipped.subtract(&region);
                    if !full_poly {
                        shape = shape.largest_island();
                    }
                    poly.clipped = Some(shape);
                }
            }
        }
    }
}

/// Restore the copper a conductor had carved out: invalidate and recompute
/// the polygons its box overlaps. Called before the conductor moves or is
/// removed.
pub fn restore_to(board: &mut Board, conductor: ConductorRef) {
    let Some((bbox, layer_scope)) = conductor_extent(&board.data, conductor) else {
        return;
    };
    mark_dirty_overlapping(&mut board.data, bbox, layer_scope);
    reclip_dirty(board);
}

/// Bounding box and layer scope of a conductor, `None` scope meaning the
/// whole copper stack.
fn conductor_extent(data: &BoardData, c: ConductorRef) -> Option<(BoxType, Option<usize>)> {
    match c {
        ConductorRef::Via(id) => data.via(id).map(|v| (v.bbox, None)),
        ConductorRef::Pin(id) => data.pin(id).map(|(_, p)| (p.bbox, None)),
        ConductorRef::Pad(id) => data.pad(id).map(|(_, p)| (p.bbox, None)),
        ConductorRef::Line { layer, id } => data
            .layers
            .get(layer)
            .and_then(|l| l.line(id))
            .map(|x| (x.bbox, Some(layer))),
        ConductorRef::Arc { layer, id } => data
            .layers
            .get(layer)
            .and_then(|l| l.arc(id))
            .map(|x| (x.bbox, Some(layer))),
        ConductorRef::Text { layer, id } => data
            .layers
            .get(layer)
            .and_then(|l| l.text(id))
            .map(|x| (x.bbox, Some(layer))),
    }
}

/// The clearance region `c` casts into `poly` on `layer`, if it casts one.
fn conductor_region(
    board: &Board,
    c: ConductorRef,
    layer: usize,
    poly: &Polygon,
) -> Option<PolyArea> {
    let data = &board.data;
    let clear_pins = poly.flags.has(ObjectFlags::CLEARPOLY);
    match c {
        ConductorRef::Via(id) => {
            let via = data.via(id)?;
            if !clear_pins || !via.pierces_layer(layer) {
                return None;
            }
            pin_subtraction(via, layer, board.thermal_scale)
        }
        ConductorRef::Pin(id) => {
            let (_, pin) = data.pin(id)?;
            if !clear_pins {
                return None;
            }
            pin_subtraction(pin, layer, board.thermal_scale)
        }
        ConductorRef::Pad(id) => {
            let (_, pad) = data.pad(id)?;
            let side = if pad.on_solder_side() { BOTTOM_SIDE } else { TOP_SIDE };
            if !clear_pins || !board.groups.layer_on_side(layer, side) {
                return None;
            }
            match spokes_of(pad.flags.thermals.get(layer)) {
                None => Some(pad_subtraction(pad)),
                Some(_) => None,
            }
        }
        ConductorRef::Line { layer: ll, id } => {
            if ll != layer {
                return None;
            }
            let line = data.layers.get(ll)?.line(id)?;
            line.flags.has(ObjectFlags::CLEARLINE).then(|| {
                core_poly::line_clearance_outline(
                    line.point1,
                    line.point2,
                    line.thickness + line.clearance,
                )
            })
        }
        ConductorRef::Arc { layer: ll, id } => {
            if ll != layer {
                return None;
            }
            let arc = data.layers.get(ll)?.arc(id)?;
            arc.flags.has(ObjectFlags::CLEARLINE).then(|| {
                core_poly::arc_clearance_outline(
                    arc.center,
                    arc.width,
                    arc.height,
                    arc.start_angle as f64,
                    arc.delta as f64,
                    arc.thickness + arc.clearance,
                )
            })
        }
        ConductorRef::Text { layer: ll, id } => {
            if ll != layer {
                return None;
            }
            let text = data.layers.get(ll)?.text(id)?;
            if !text.flags.has(ObjectFlags::CLEARLINE) {
                return None;
            }
            let b = text.bbox;
            PolyArea::from_contour(vec![
                Point::new(b.x1, b.y1),
                Point::new(b.x2, b.y1),
                Point::new(b.x2, b.y2),
                Point::new(b.x1, b.y2),
            ])
            .ok()
        }
    }
}

/// Point test against the effective shape. Falls back to the declared
/// contour while the polygon is dirty.
pub fn is_point_in_polygon(board: &Board, layer: usize, id: ObjectId, p: Point) -> bool {
    let Some(poly) = board.data.layers.get(layer).and_then(|l| l.polygon(id)) else {
        return false;
    };
    match &poly.clipped {
        Some(shape) => shape.contains(p),
        None => poly
            .declared_shape()
            .map(|s| s.contains(p))
            .unwrap_or(false),
    }
}

/// Split a polygon whose effective shape has fallen into disconnected
/// islands: the original keeps the largest island's rings, each further
/// island becomes a fresh polygon with the same flags. Islands below the
/// board's minimum area are discarded. Returns the new polygon ids.
pub fn morph_polygon(board: &mut Board, layer: usize, id: ObjectId) -> Vec<ObjectId> {
    if board
        .data
        .layers
        .get(layer)
        .and_then(|l| l.polygon(id))
        .is_none_or(|p| p.clipped.is_none())
    {
        init_clip(board, layer, id);
    }
    let Some(poly) = board.data.layers.get(layer).and_then(|l| l.polygon(id)) else {
        return Vec::new();
    };
    let Some(shape) = poly.clipped.clone() else {
        return Vec::new();
    };
    let flags = poly.flags;
    let mut pieces = shape.split_islands(board.isle_area);
    if pieces.len() <= 1 {
        return Vec::new();
    }
    // Largest piece replaces the original contour.
    pieces.sort_by(|a, b| b.area().total_cmp(&a.area()));
    let keep = pieces.remove(0);
    if let Some((points, holes)) = area_to_rings(&keep) {
        let old_box = board.data.layers[layer]
            .polygon(id)
            .map(|p| p.bbox)
            .unwrap_or(BoxType::empty());
        let mut new_box = None;
        if let Some(p) = board.data.layers[layer].polygon_mut(id) {
            p.points = points;
            p.hole_indices = holes;
            p.update_bbox();
            p.clipped = None;
            new_box = Some(p.bbox);
        }
        if let Some(nb) = new_box {
            let l = &mut board.data.layers[layer];
            l.polygon_tree.delete(old_box, id);
            l.polygon_tree.insert(nb, id);
        }
    }
    let mut created = Vec::new();
    for piece in pieces {
        if let Some((points, holes)) = area_to_rings(&piece)
            && let Some(nid) = crate::ops::create_polygon(&mut board.data, layer, points, holes, flags)
        {
            created.push(nid);
        }
    }
    debug!(target: "model.clip", id, layer, created = created.len(), "polygon_morphed");
    reclip_dirty(board);
    created
}

/// Flatten a single-island area back into the polygon point representation.
fn area_to_rings(area: &PolyArea) -> Option<(Vec<Point>, Vec<usize>)> {
    let island = area.islands.first()?;
    let mut points = island.outer.points.clone();
    let mut holes = Vec::new();
    for h in &island.holes {
        holes.push(points.len());
        points.extend(h.points.iter().copied());
    }
    Some((points, holes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::Flags;
    use crate::ops;

    fn board() -> Board {
        Board::new(2, 1_000_000, 1_000_000)
    }

    fn big_poly(board: &mut Board, layer: usize) -> ObjectId {
        ops::create_polygon(
            &mut board.data,
            layer,
            vec![
                Point::new(100_000, 100_000),
                Point::new(500_000, 100_000),
                Point::new(500_000, 500_000),
                Point::new(100_000, 500_000),
            ],
            vec![],
            Flags::new(ObjectFlags::CLEARPOLY),
        )
        .expect("polygon created")
    }

    #[test]
    fn via_clears_a_hole_in_the_polygon() {
        let mut b = board();
        let pid = big_poly(&mut b, 0);
        ops::create_via(
            &mut b.data,
            Point::new(300_000, 300_000),
            20_000,
            10_000,
            0,
            10_000,
            None,
            Flags::default(),
        );
        reclip_dirty(&mut b);
        let poly = b.data.layers[0].polygon(pid).expect("poly");
        let shape = poly.clipped.as_ref().expect("clipped");
        assert_eq!(shape.hole_count(), 1);
        assert!(!shape.contains(Point::new(300_000, 300_000)));
        assert!(shape.contains(Point::new(150_000, 150_000)));
    }

    #[test]
    fn clear_line_flag_gates_line_subtraction() {
        let mut b = board();
        let pid = big_poly(&mut b, 0);
        // Joining line: no CLEARLINE, so it keeps the polygon whole.
        ops::create_line(
            &mut b.data,
            0,
            Point::new(100_000, 300_000),
            Point::new(500_000, 300_000),
            5_000,
            4_000,
            Flags::default(),
        );
        reclip_dirty(&mut b);
        let shape = b.data.layers[0].polygon(pid).unwrap().clipped.clone().unwrap();
        assert!(shape.contains(Point::new(300_000, 300_000)));
        assert_eq!(shape.hole_count(), 0);
        // A clearing line cuts the polygon.
        ops::create_line(
            &mut b.data,
            0,
            Point::new(90_000, 200_000),
            Point::new(510_000, 200_000),
            5_000,
            4_000,
            Flags::new(ObjectFlags::CLEARLINE),
        );
        reclip_dirty(&mut b);
        let shape = b.data.layers[0].polygon(pid).unwrap().clipped.clone().unwrap();
        assert!(!shape.contains(Point::new(300_000, 200_000)));
    }

    #[test]
    fn two_clear_lines_two_cuts() {
        let mut b = board();
        let pid = big_poly(&mut b, 0);
        for y in [200_000, 400_000] {
            ops::create_line(
                &mut b.data,
                0,
                Point::new(50_000, y),
                Point::new(550_000, y),
                6_000,
                4_000,
                Flags::new(ObjectFlags::CLEARLINE),
            );
        }
        reclip_dirty(&mut b);
        let shape = b.data.layers[0].polygon(pid).unwrap().clipped.clone().unwrap();
        // Both lines span the polygon, so the biggest island keeps shrinking
        // and the cuts show as missing copper on both tracks.
        assert!(!shape.contains(Point::new(300_000, 200_000)));
        assert!(!shape.contains(Point::new(300_000, 400_000)));
        assert!(shape.contains(Point::new(300_000, 300_000)));
    }

    #[test]
    fn solid_thermal_keeps_connection() {
        let mut b = board();
        let pid = big_poly(&mut b, 0);
        let vid = ops::create_via(
            &mut b.data,
            Point::new(300_000, 300_000),
            20_000,
            10_000,
            0,
            10_000,
            None,
            Flags::default(),
        );
        if let Some(v) = b.data.via_mut(vid) {
            v.flags.thermals.set(0, ThermalStyle::Solid);
        }
        mark_dirty_overlapping(&mut b.data, BoxType::new(0, 0, 1_000_000, 1_000_000), None);
        reclip_dirty(&mut b);
        let shape = b.data.layers[0].polygon(pid).unwrap().clipped.clone().unwrap();
        assert_eq!(shape.hole_count(), 0);
        assert!(shape.contains(Point::new(300_000, 300_000)));
    }

    #[test]
    fn spoked_thermal_bridges_the_ring() {
        let mut b = board();
        let pid = big_poly(&mut b, 0);
        let vid = ops::create_via(
            &mut b.data,
            Point::new(300_000, 300_000),
            20_000,
            10_000,
            0,
            10_000,
            None,
            Flags::default(),
        );
        if let Some(v) = b.data.via_mut(vid) {
            v.flags.thermals.set(0, ThermalStyle::OrthogonalSharp);
        }
        mark_dirty_overlapping(&mut b.data, BoxType::new(0, 0, 1_000_000, 1_000_000), None);
        reclip_dirty(&mut b);
        let shape = b.data.layers[0].polygon(pid).unwrap().clipped.clone().unwrap();
        // Copper survives along the spokes.
        assert!(shape.contains(Point::new(313_000, 300_000)));
    }

    #[test]
    fn restore_heals_after_removal() {
        let mut b = board();
        let pid = big_poly(&mut b, 0);
        let vid = ops::create_via(
            &mut b.data,
            Point::new(300_000, 300_000),
            20_000,
            10_000,
            0,
            10_000,
            None,
            Flags::default(),
        );
        reclip_dirty(&mut b);
        ops::remove_via(&mut b.data, vid);
        reclip_dirty(&mut b);
        let shape = b.data.layers[0].polygon(pid).unwrap().clipped.clone().unwrap();
        assert_eq!(shape.hole_count(), 0);
        assert!(shape.contains(Point::new(300_000, 300_000)));
    }

    #[test]
    fn incremental_clear_matches_full_recompute() {
        let mut b = board();
        let pid = big_poly(&mut b, 0);
        reclip_dirty(&mut b);
        let vid = ops::create_via(
            &mut b.data,
            Point::new(200_000, 200_000),
            20_000,
            10_000,
            0,
            10_000,
            None,
            Flags::default(),
        );
        // The create marked dirty; recompute, then compare against an
        // explicit incremental subtraction on a fresh clip.
        reclip_dirty(&mut b);
        let full = b.data.layers[0].polygon(pid).unwrap().clipped.clone().unwrap();
        if let Some(p) = b.data.layers[0].polygon_mut(pid) {
            p.clipped = None;
        }
        init_clip(&mut b, 0, pid);
        clear_from(&mut b, ConductorRef::Via(vid));
        let incr = b.data.layers[0].polygon(pid).unwrap().clipped.clone().unwrap();
        assert_eq!(full.hole_count(), incr.hole_count());
        assert!((full.area() - incr.area()).abs() < 1.0);
    }

    #[test]
    fn full_width_cut_morphs_into_two_polygons() {
        let mut b = board();
        b.isle_area = 0.0;
        let pid = big_poly(&mut b, 0);
        ops::create_line(
            &mut b.data,
            0,
            Point::new(50_000, 300_000),
            Point::new(550_000, 300_000),
            10_000,
            8_000,
            Flags::new(ObjectFlags::CLEARLINE),
        );
        reclip_dirty(&mut b);
        let created = morph_polygon(&mut b, 0, pid);
        assert_eq!(created.len(), 1);
        assert_eq!(b.data.layers[0].polygons.len(), 2);
        // Both halves carry a valid clipped shape after the morph flush.
        for poly in &b.data.layers[0].polygons {
            assert!(poly.clipped.is_some());
        }
    }

    #[test]
    fn point_in_polygon_uses_effective_shape() {
        let mut b = board();
        let pid = big_poly(&mut b, 0);
        ops::create_via(
            &mut b.data,
            Point::new(300_000, 300_000),
            20_000,
            10_000,
            0,
            10_000,
            None,
            Flags::default(),
        );
        reclip_dirty(&mut b);
        assert!(!is_point_in_polygon(&b, 0, pid, Point::new(300_000, 300_000)));
        assert!(is_point_in_polygon(&b, 0, pid, Point::new(120_000, 120_000)));
    }
}
