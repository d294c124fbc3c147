//! Model mutations: create, attach, detach and move, with bounding box and
//! spatial tree maintenance in one place.
//!
//! Every function here leaves the two container invariants intact: an
//! attached entity appears exactly once in its owning list and exactly once
//! in the matching tree, and its cached box equals the recomputed one.
//! Polygons whose clearance may be stale after a mutation are marked dirty
//! (`clipped = None`); the dispatcher flushes dirt through
//! [`crate::clip::reclip_dirty`] before it closes an action.
//!
//! `create_*` allocate a fresh id; `insert_*` re-attach a detached entity
//! under its original id (the undo path). `remove_*` detach and hand the
//! entity back to the caller; the journal keeps it alive until the list is
//! cleared.

use crate::clip;
use crate::entity::*;
use crate::flags::Flags;
use crate::{BOTTOM_SIDE, BoardData, TOP_SIDE};
use core_geom::{BoxType, Coord, Point};
use tracing::trace;

/// Side a pad indexes under in the pad trees.
fn pad_side(pad: &Pad) -> usize {
    if pad.on_solder_side() {
        BOTTOM_SIDE
    } else {
        TOP_SIDE
    }
}

// ---------------------------------------------------------------------------
// Vias
// ---------------------------------------------------------------------------

#[allow(clippy::too_many_arguments)]
pub fn create_via(
    data: &mut BoardData,
    pos: Point,
    thickness: Coord,
    clearance: Coord,
    mask: Coord,
    drilling_hole: Coord,
    name: Option<String>,
    flags: Flags,
) -> ObjectId {
    let id = data.alloc_id();
    let mut via = Via {
        id,
        pos,
        thickness,
        clearance,
        mask,
        drilling_hole,
        name,
        number: None,
        buried_from: 0,
        buried_to: 0,
        flags,
        bbox: BoxType::empty(),
    };
    via.update_bbox();
    insert_via(data, via);
    id
}

pub fn insert_via(data: &mut BoardData, via: Via) {
    data.reserve_ids_through(via.id);
    data.via_tree.insert(via.bbox, via.id);
    clip::mark_dirty_overlapping(data, via.bbox, None);
    trace!(target: "model.ops", id = via.id, "via_attached");
    data.vias.push(via);
}

pub fn remove_via(data: &mut BoardData, id: ObjectId) -> Option<Via> {
    let pos = data.vias.iter().position(|v| v.id == id)?;
    let via = data.vias.remove(pos);
    data.via_tree.delete(via.bbox, via.id);
    clip::mark_dirty_overlapping(data, via.bbox, None);
    trace!(target: "model.ops", id, "via_detached");
    Some(via)
}

pub fn move_via(data: &mut BoardData, id: ObjectId, dx: Coord, dy: Coord) -> bool {
    let Some(pos) = data.vias.iter().position(|v| v.id == id) else {
        return false;
    };
    let old_box = data.vias[pos].bbox;
    data.via_tree.delete(old_box, id);
    {
        let via = &mut data.vias[pos];
        via.pos.x += dx;
        via.pos.y += dy;
        via.update_bbox();
    }
    let new_box = data.vias[pos].bbox;
    data.via_tree.insert(new_box, id);
    clip::mark_dirty_overlapping(data, old_box.union(&new_box), None);
    true
}

// ---------------------------------------------------------------------------
// Lines
// ---------------------------------------------------------------------------

pub fn create_line(
    data: &mut BoardData,
    layer: usize,
    point1: Point,
    point2: Point,
    thickness: Coord,
    clearance: Coord,
    flags: Flags,
) -> Option<ObjectId> {
    if layer >= data.layers.len() {
        return None;
    }
    let id = data.alloc_id();
    let mut line = Line {
        id,
        point1,
        point2,
        thickness,
        clearance,
        flags,
        bbox: BoxType::empty(),
    };
    line.update_bbox();
    insert_line(data, layer, line);
    Some(id)
}

pub fn insert_line(data: &mut BoardData, layer: usize, line: Line) {
    data.reserve_ids_through(line.id);
    clip::mark_dirty_overlapping(data, line.bbox, Some(layer));
    let l = &mut data.layers[layer];
    l.line_tree.insert(line.bbox, line.id);
    trace!(target: "model.ops", id = line.id, layer, "line_attached");
    l.lines.push(line);
}

pub fn remove_line(data: &mut BoardData, layer: usize, id: ObjectId) -> Option<Line> {
    let l = data.layers.get_mut(layer)?;
    let pos = l.lines.iter().position(|x| x.id == id)?;
    let line = l.lines.remove(pos);
    l.line_tree.delete(line.bbox, id);
    clip::mark_dirty_overlapping(data, line.bbox, Some(layer));
    trace!(target: "model.ops", id, layer, "line_detached");
    Some(line)
}

pub fn move_line(data: &mut BoardData, layer: usize, id: ObjectId, dx: Coord, dy: Coord) -> bool {
    let Some(l) = data.layers.get_mut(layer) else {
        return false;
    };
    let Some(line) = l.lines.iter_mut().find(|x| x.id == id) else {
        return false;
    };
    let old_box = line.bbox;
    line.point1.x += dx;
    line.point1.y += dy;
    line.point2.x += dx;
    line.point2.y += dy;
    line.update_bbox();
    let new_box = line.bbox;
    l.line_tree.delete(old_box, id);
    l.line_tree.insert(new_box, id);
    clip::mark_dirty_overlapping(data, old_box.union(&new_box), Some(layer));
    true
}

/// Move one endpoint of a line (rubber banding, point editing).
pub fn move_line_point(
    data: &mut BoardData,
    layer: usize,
    id: ObjectId,
    second_point: bool,
    dx: Coord,
    dy: Coord,
) -> bool {
    let Some(l) = data.layers.get_mut(layer) else {
        return false;
    };
    let Some(line) = l.lines.iter_mut().find(|x| x.id == id) else {
        return false;
    };
    let old_box = line.bbox;
    let p = if second_point {
        &mut line.point2
    } else {
        &mut line.point1
    };
    p.x += dx;
    p.y += dy;
    line.update_bbox();
    let new_box = line.bbox;
    l.line_tree.delete(old_box, id);
    l.line_tree.insert(new_box, id);
    clip::mark_dirty_overlapping(data, old_box.union(&new_box), Some(layer));
    true
}

// ---------------------------------------------------------------------------
// Arcs
// ---------------------------------------------------------------------------

#[allow(clippy::too_many_arguments)]
pub fn create_arc(
    data: &mut BoardData,
    layer: usize,
    center: Point,
    width: Coord,
    height: Coord,
    start_angle: i32,
    delta: i32,
    thickness: Coord,
    clearance: Coord,
    flags: Flags,
) -> Option<ObjectId> {
    if layer >= data.layers.len() {
        return None;
    }
    let id = data.alloc_id();
    let mut arc = Arc {
        id,
        center,
        width,
        height,
        start_angle,
        delta,
        thickness,
        clearance,
        flags,
        bbox: BoxType::empty(),
    };
    arc.update_bbox();
    insert_arc(data, layer, arc);
    Some(id)
}

pub fn insert_arc(data: &mut BoardData, layer: usize, arc: Arc) {
    data.reserve_ids_through(arc.id);
    clip::mark_dirty_overlapping(data, arc.bbox, Some(layer));
    let l = &mut data.layers[layer];
    l.arc_tree.insert(arc.bbox, arc.id);
    trace!(target: "model.ops", id = arc.id, layer, "arc_attached");
    l.arcs.push(arc);
}

pub fn remove_arc(data: &mut BoardData, layer: usize, id: ObjectId) -> Option<Arc> {
    let l = data.layers.get_mut(layer)?;
    let pos = l.arcs.iter().position(|x| x.id == id)?;
    let arc = l.arcs.remove(pos);
    l.arc_tree.delete(arc.bbox, id);
    clip::mark_dirty_overlapping(data, arc.bbox, Some(layer));
    Some(arc)
}

pub fn move_arc(data: &mut BoardData, layer: usize, id: ObjectId, dx: Coord, dy: Coord) -> bool {
    let Some(l) = data.layers.get_mut(layer) else {
        return false;
    };
    let Some(arc) = l.arcs.iter_mut().find(|x| x.id == id) else {
        return false;
    };
    let old_box = arc.bbox;
    arc.center.x += dx;
    arc.center.y += dy;
    arc.update_bbox();
    let new_box = arc.bbox;
    l.arc_tree.delete(old_box, id);
    l.arc_tree.insert(new_box, id);
    clip::mark_dirty_overlapping(data, old_box.union(&new_box), Some(layer));
    true
}

// ---------------------------------------------------------------------------
// Texts
// ---------------------------------------------------------------------------

#[allow(clippy::too_many_arguments)]
pub fn create_text(
    data: &mut BoardData,
    layer: usize,
    pos: Point,
    direction: u8,
    scale: u16,
    string: String,
    font: u8,
    flags: Flags,
) -> Option<ObjectId> {
    if layer >= data.layers.len() || string.is_empty() {
        return None;
    }
    let id = data.alloc_id();
    let mut text = Text {
        id,
        pos,
        direction: direction % 4,
        scale,
        string,
        font,
        flags,
        bbox: BoxType::empty(),
    };
    text.update_bbox();
    insert_text(data, layer, text);
    Some(id)
}

pub fn insert_text(data: &mut BoardData, layer: usize, text: Text) {
    data.reserve_ids_through(text.id);
    clip::mark_dirty_overlapping(data, text.bbox, Some(layer));
    let l = &mut data.layers[layer];
    l.text_tree.insert(text.bbox, text.id);
    l.texts.push(text);
}

pub fn remove_text(data: &mut BoardData, layer: usize, id: ObjectId) -> Option<Text> {
    let l = data.layers.get_mut(layer)?;
    let pos = l.texts.iter().position(|x| x.id == id)?;
    let text = l.texts.remove(pos);
    l.text_tree.delete(text.bbox, id);
    clip::mark_dirty_overlapping(data, text.bbox, Some(layer));
    Some(text)
}

pub fn move_text(data: &mut BoardData, layer: usize, id: ObjectId, dx: Coord, dy: Coord) -> bool {
    let Some(l) = data.layers.get_mut(layer) else {
        return false;
    };
    let Some(text) = l.texts.iter_mut().find(|x| x.id == id) else {
        return false;
    };
    let old_box = text.bbox;
    text.pos.x += dx;
    text.pos.y += dy;
    text.update_bbox();
    let new_box = text.bbox;
    l.text_tree.delete(old_box, id);
    l.text_tree.insert(new_box, id);
    clip::mark_dirty_overlapping(data, old_box.union(&new_box), Some(layer));
    true
}

// ---------------------------------------------------------------------------
// Polygons
// ---------------------------------------------------------------------------

pub fn create_polygon(
    data: &mut BoardData,
    layer: usize,
    points: Vec<Point>,
    hole_indices: Vec<usize>,
    flags: Flags,
) -> Option<ObjectId> {
    if layer >= data.layers.len() || points.len() < 3 {
        return None;
    }
    let id = data.alloc_id();
    let mut poly = Polygon {
        id,
        points,
        hole_indices,
        flags,
        bbox: BoxType::empty(),
        clipped: None,
    };
    poly.update_bbox();
    insert_polygon(data, layer, poly);
    Some(id)
}

pub fn insert_polygon(data: &mut BoardData, layer: usize, mut poly: Polygon) {
    data.reserve_ids_through(poly.id);
    poly.clipped = None; // recomputed by the clip flush
    let l = &mut data.layers[layer];
    l.polygon_tree.insert(poly.bbox, poly.id);
    trace!(target: "model.ops", id = poly.id, layer, "polygon_attached");
    l.polygons.push(poly);
}

pub fn remove_polygon(data: &mut BoardData, layer: usize, id: ObjectId) -> Option<Polygon> {
    let l = data.layers.get_mut(layer)?;
    let pos = l.polygons.iter().position(|x| x.id == id)?;
    let poly = l.polygons.remove(pos);
    l.polygon_tree.delete(poly.bbox, id);
    trace!(target: "model.ops", id, layer, "polygon_detached");
    Some(poly)
}

pub fn move_polygon(data: &mut BoardData, layer: usize, id: ObjectId, dx: Coord, dy: Coord) -> bool {
    let Some(l) = data.layers.get_mut(layer) else {
        return false;
    };
    let Some(poly) = l.polygons.iter_mut().find(|x| x.id == id) else {
        return false;
    };
    let old_box = poly.bbox;
    for p in &mut poly.points {
        p.x += dx;
        p.y += dy;
    }
    poly.update_bbox();
    poly.clipped = None;
    let new_box = poly.bbox;
    l.polygon_tree.delete(old_box, id);
    l.polygon_tree.insert(new_box, id);
    true
}

/// Insert a point into the polygon's contour before position `idx`. The
/// derived shape is invalidated.
pub fn insert_polygon_point(
    data: &mut BoardData,
    layer: usize,
    id: ObjectId,
    idx: usize,
    point: Point,
) -> bool {
    let Some(l) = data.layers.get_mut(layer) else {
        return false;
    };
    let Some(poly) = l.polygons.iter_mut().find(|x| x.id == id) else {
        return false;
    };
    if idx > poly.points.len() {
        return false;
    }
    let old_box = poly.bbox;
    poly.points.insert(idx, point);
    for h in &mut poly.hole_indices {
        if *h >= idx {
            *h += 1;
        }
    }
    poly.update_bbox();
    poly.clipped = None;
    l.polygon_tree.delete(old_box, id);
    l.polygon_tree.insert(poly.bbox, id);
    true
}

/// Remove a contour point. Refuses when the owning contour would drop under
/// three points. Returns the removed point.
pub fn remove_polygon_point(
    data: &mut BoardData,
    layer: usize,
    id: ObjectId,
    idx: usize,
) -> Option<Point> {
    let l = data.layers.get_mut(layer)?;
    let poly = l.polygons.iter_mut().find(|x| x.id == id)?;
    if idx >= poly.points.len() {
        return None;
    }
    let (start, end) = poly.contour_range(idx);
    if end - start <= 3 {
        return None;
    }
    let old_box = poly.bbox;
    let removed = poly.points.remove(idx);
    for h in &mut poly.hole_indices {
        if *h > idx {
            *h -= 1;
        }
    }
    poly.update_bbox();
    poly.clipped = None;
    l.polygon_tree.delete(old_box, id);
    l.polygon_tree.insert(poly.bbox, id);
    Some(removed)
}

pub fn move_polygon_point(
    data: &mut BoardData,
    layer: usize,
    id: ObjectId,
    idx: usize,
    dx: Coord,
    dy: Coord,
) -> bool {
    let Some(l) = data.layers.get_mut(layer) else {
        return false;
    };
    let Some(poly) = l.polygons.iter_mut().find(|x| x.id == id) else {
        return false;
    };
    if idx >= poly.points.len() {
        return false;
    }
    let old_box = poly.bbox;
    poly.points[idx].x += dx;
    poly.points[idx].y += dy;
    poly.update_bbox();
    poly.clipped = None;
    l.polygon_tree.delete(old_box, id);
    l.polygon_tree.insert(poly.bbox, id);
    true
}

// ---------------------------------------------------------------------------
// Elements
// ---------------------------------------------------------------------------

/// Attach a fully built element. Child ids must already be allocated from
/// the same data (or be re-attached detached ones).
pub fn insert_element(data: &mut BoardData, mut element: Element) -> ObjectId {
    element.update_bbox();
    let id = element.id;
    data.reserve_ids_through(id);
    for p in &element.pins {
        data.reserve_ids_through(p.id);
        data.pin_tree.insert(p.bbox, p.id);
        clip::mark_dirty_overlapping(data, p.bbox, None);
    }
    for p in &element.pads {
        data.reserve_ids_through(p.id);
        data.pad_tree[pad_side(p)].insert(p.bbox, p.id);
        clip::mark_dirty_overlapping(data, p.bbox, None);
    }
    for (slot, t) in element.names.iter().enumerate() {
        data.name_tree[slot].insert(t.bbox, t.id);
    }
    data.element_tree.insert(element.bbox, id);
    trace!(target: "model.ops", id, pins = element.pins.len(), pads = element.pads.len(), "element_attached");
    data.elements.push(element);
    id
}

pub fn remove_element(data: &mut BoardData, id: ObjectId) -> Option<Element> {
    let pos = data.elements.iter().position(|e| e.id == id)?;
    let element = data.elements.remove(pos);
    for p in &element.pins {
        data.pin_tree.delete(p.bbox, p.id);
        clip::mark_dirty_overlapping(data, p.bbox, None);
    }
    for p in &element.pads {
        data.pad_tree[pad_side(p)].delete(p.bbox, p.id);
        clip::mark_dirty_overlapping(data, p.bbox, None);
    }
    for (slot, t) in element.names.iter().enumerate() {
        data.name_tree[slot].delete(t.bbox, t.id);
    }
    data.element_tree.delete(element.bbox, id);
    trace!(target: "model.ops", id, "element_detached");
    Some(element)
}

pub fn move_element(data: &mut BoardData, id: ObjectId, dx: Coord, dy: Coord) -> bool {
    let Some(mut element) = remove_element(data, id) else {
        return false;
    };
    element.mark.x += dx;
    element.mark.y += dy;
    for p in &mut element.pins {
        p.pos.x += dx;
        p.pos.y += dy;
    }
    for p in &mut element.pads {
        p.point1.x += dx;
        p.point1.y += dy;
        p.point2.x += dx;
        p.point2.y += dy;
    }
    for l in &mut element.lines {
        l.point1.x += dx;
        l.point1.y += dy;
        l.point2.x += dx;
        l.point2.y += dy;
    }
    for a in &mut element.arcs {
        a.center.x += dx;
        a.center.y += dy;
    }
    for t in &mut element.names {
        t.pos.x += dx;
        t.pos.y += dy;
    }
    insert_element(data, element);
    true
}

// ---------------------------------------------------------------------------
// Rats
// ---------------------------------------------------------------------------

#[allow(clippy::too_many_arguments)]
pub fn create_rat(
    data: &mut BoardData,
    point1: Point,
    point2: Point,
    group1: u8,
    group2: u8,
    thickness: Coord,
    flags: Flags,
) -> ObjectId {
    let id = data.alloc_id();
    let mut rat = Rat {
        id,
        point1,
        point2,
        group1,
        group2,
        thickness,
        flags,
        bbox: BoxType::empty(),
    };
    rat.update_bbox();
    insert_rat(data, rat);
    id
}

pub fn insert_rat(data: &mut BoardData, rat: Rat) {
    data.reserve_ids_through(rat.id);
    data.rat_tree.insert(rat.bbox, rat.id);
    data.rats.push(rat);
}

pub fn remove_rat(data: &mut BoardData, id: ObjectId) -> Option<Rat> {
    let pos = data.rats.iter().position(|r| r.id == id)?;
    let rat = data.rats.remove(pos);
    data.rat_tree.delete(rat.bbox, id);
    Some(rat)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::{Flags, ObjectFlags};
    use core_index::SearchControl;

    fn data() -> BoardData {
        BoardData::new(2)
    }

    #[test]
    fn create_via_indexes_it() {
        let mut d = data();
        let id = create_via(
            &mut d,
            Point::new(10_000, 10_000),
            4000,
            2000,
            0,
            2000,
            None,
            Flags::default(),
        );
        assert_eq!(d.vias.len(), 1);
        assert_eq!(d.via_tree.len(), 1);
        let v = d.via(id).expect("via exists");
        assert_eq!(v.bbox, v.compute_bbox());
        let mut hits = 0;
        d.via_tree.search(&v.bbox, |_, vid| {
            assert_eq!(vid, id);
            hits += 1;
            SearchControl::Continue
        });
        assert_eq!(hits, 1);
    }

    #[test]
    fn remove_returns_detached_entity() {
        let mut d = data();
        let id = create_via(
            &mut d,
            Point::new(0, 0),
            4000,
            2000,
            0,
            2000,
            Some("V1".into()),
            Flags::default(),
        );
        let via = remove_via(&mut d, id).expect("detached");
        assert_eq!(via.name.as_deref(), Some("V1"));
        assert!(d.vias.is_empty());
        assert_eq!(d.via_tree.len(), 0);
        // Re-attach under the same identity.
        insert_via(&mut d, via);
        assert_eq!(d.via(id).map(|v| v.id), Some(id));
        assert_eq!(d.via_tree.len(), 1);
    }

    #[test]
    fn move_line_keeps_tree_in_sync() {
        let mut d = data();
        let id = create_line(
            &mut d,
            0,
            Point::new(0, 0),
            Point::new(10_000, 0),
            2000,
            1000,
            Flags::default(),
        )
        .expect("layer 0 exists");
        assert!(move_line(&mut d, 0, id, 5000, 5000));
        let line = d.layers[0].line(id).expect("line exists");
        assert_eq!(line.point1, Point::new(5000, 5000));
        assert_eq!(line.bbox, line.compute_bbox());
        assert_eq!(d.layers[0].line_tree.query(&line.bbox).len(), 1);
        // The old location no longer hits.
        assert_eq!(
            d.layers[0]
                .line_tree
                .query(&BoxType::new(-100, -100, 100, 100))
                .len(),
            0
        );
    }

    #[test]
    fn polygon_point_edits_respect_minimum() {
        let mut d = data();
        let id = create_polygon(
            &mut d,
            0,
            vec![
                Point::new(0, 0),
                Point::new(100, 0),
                Point::new(100, 100),
            ],
            vec![],
            Flags::new(ObjectFlags::CLEARPOLY),
        )
        .expect("created");
        // Three points: removal refused.
        assert!(remove_polygon_point(&mut d, 0, id, 0).is_none());
        assert!(insert_polygon_point(&mut d, 0, id, 1, Point::new(50, -20)));
        assert_eq!(remove_polygon_point(&mut d, 0, id, 1), Some(Point::new(50, -20)));
    }

    #[test]
    fn hole_indices_shift_on_point_insert() {
        let mut d = data();
        let id = create_polygon(
            &mut d,
            0,
            vec![
                Point::new(0, 0),
                Point::new(100, 0),
                Point::new(100, 100),
                Point::new(0, 100),
                Point::new(40, 40),
                Point::new(60, 40),
                Point::new(50, 60),
            ],
            vec![4],
            Flags::default(),
        )
        .expect("created");
        assert!(insert_polygon_point(&mut d, 0, id, 2, Point::new(120, 50)));
        let l = &d.layers[0];
        let poly = l.polygon(id).expect("poly");
        assert_eq!(poly.hole_indices, vec![5]);
        assert_eq!(poly.points.len(), 8);
    }

    #[test]
    fn element_children_land_in_board_trees() {
        let mut d = data();
        let eid = d.alloc_id();
        let pid = d.alloc_id();
        let mut pin = Via {
            id: pid,
            pos: Point::new(100, 100),
            thickness: 4000,
            clearance: 2000,
            mask: 0,
            drilling_hole: 2000,
            name: None,
            number: Some("1".into()),
            buried_from: 0,
            buried_to: 0,
            flags: Flags::new(ObjectFlags::PIN),
            bbox: BoxType::empty(),
        };
        pin.update_bbox();
        let names = std::array::from_fn(|_| {
            let tid = d.alloc_id();
            let mut t = Text {
                id: tid,
                pos: Point::new(0, 0),
                direction: 0,
                scale: 100,
                string: "U1".into(),
                font: 0,
                flags: Flags::default(),
                bbox: BoxType::empty(),
            };
            t.update_bbox();
            t
        });
        let element = Element {
            id: eid,
            mark: Point::new(100, 100),
            names,
            pins: vec![pin],
            pads: vec![],
            lines: vec![],
            arcs: vec![],
            attributes: Default::default(),
            flags: Flags::default(),
            bbox: BoxType::empty(),
        };
        insert_element(&mut d, element);
        assert_eq!(d.element_tree.len(), 1);
        assert_eq!(d.pin_tree.len(), 1);
        assert_eq!(d.name_tree[0].len(), 1);
        let removed = remove_element(&mut d, eid).expect("removed");
        assert_eq!(d.pin_tree.len(), 0);
        assert_eq!(d.element_tree.len(), 0);
        assert_eq!(removed.pins.len(), 1);
    }
}
