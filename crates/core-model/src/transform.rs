//! Quarter-turn rotation and mirroring of entities and whole data sets.
//!
//! A rotation step is one screen-counter-clockwise quarter turn:
//! `(dx, dy) -> (dy, -dx)` around the rotation center. Arc start angles
//! advance 90 degrees per step and the radii swap on odd step counts; text
//! direction advances with the step count.

use crate::clip;
use crate::entity::*;
use crate::flags::ObjectFlags;
use crate::BoardData;
use core_geom::{Coord, Point};

/// Rotate a point by `steps` quarter turns around `center`.
pub fn rotate_point_90(p: Point, center: Point, steps: u8) -> Point {
    let mut dx = p.x - center.x;
    let mut dy = p.y - center.y;
    for _ in 0..(steps % 4) {
        let (nx, ny) = (dy, -dx);
        dx = nx;
        dy = ny;
    }
    Point::new(center.x + dx, center.y + dy)
}

/// Mirror a point across the vertical axis at `cx`.
pub fn mirror_point_x(p: Point, cx: Coord) -> Point {
    Point::new(2 * cx - p.x, p.y)
}

pub fn rotate_via_90(via: &mut Via, center: Point, steps: u8) {
    via.pos = rotate_point_90(via.pos, center, steps);
    via.update_bbox();
}

pub fn rotate_line_90(line: &mut Line, center: Point, steps: u8) {
    line.point1 = rotate_point_90(line.point1, center, steps);
    line.point2 = rotate_point_90(line.point2, center, steps);
    line.update_bbox();
}

pub fn rotate_arc_90(arc: &mut Arc, center: Point, steps: u8) {
    let steps = steps % 4;
    arc.center = rotate_point_90(arc.center, center, steps);
    arc.start_angle = (arc.start_angle + 90 * steps as i32).rem_euclid(360);
    if steps % 2 == 1 {
        std::mem::swap(&mut arc.width, &mut arc.height);
    }
    arc.update_bbox();
}

pub fn rotate_text_90(text: &mut Text, center: Point, steps: u8) {
    text.pos = rotate_point_90(text.pos, center, steps);
    text.direction = (text.direction + steps) % 4;
    text.update_bbox();
}

pub fn rotate_polygon_90(poly: &mut Polygon, center: Point, steps: u8) {
    for p in &mut poly.points {
        *p = rotate_point_90(*p, center, steps);
    }
    poly.update_bbox();
    poly.clipped = None;
}

pub fn rotate_pad_90(pad: &mut Pad, center: Point, steps: u8) {
    pad.point1 = rotate_point_90(pad.point1, center, steps);
    pad.point2 = rotate_point_90(pad.point2, center, steps);
    pad.update_bbox();
}

pub fn rotate_rat_90(rat: &mut Rat, center: Point, steps: u8) {
    rat.point1 = rotate_point_90(rat.point1, center, steps);
    rat.point2 = rotate_point_90(rat.point2, center, steps);
    rat.update_bbox();
}

pub fn rotate_element_90(element: &mut Element, center: Point, steps: u8) {
    element.mark = rotate_point_90(element.mark, center, steps);
    for p in &mut element.pins {
        rotate_via_90(p, center, steps);
    }
    for p in &mut element.pads {
        rotate_pad_90(p, center, steps);
    }
    for l in &mut element.lines {
        rotate_line_90(l, center, steps);
    }
    for a in &mut element.arcs {
        rotate_arc_90(a, center, steps);
    }
    for t in &mut element.names {
        rotate_text_90(t, center, steps);
    }
    element.update_bbox();
}

/// Which entity a board-level rotate targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotateTarget {
    Via(ObjectId),
    Line { layer: usize, id: ObjectId },
    Arc { layer: usize, id: ObjectId },
    Text { layer: usize, id: ObjectId },
    Polygon { layer: usize, id: ObjectId },
    Element(ObjectId),
}

/// Rotate one attached entity, keeping trees and polygon dirt in step.
pub fn rotate_object_90(data: &mut BoardData, target: RotateTarget, center: Point, steps: u8) -> bool {
    match target {
        RotateTarget::Via(id) => {
            let Some(pos) = data.vias.iter().position(|v| v.id == id) else {
                return false;
            };
            let old_box = data.vias[pos].bbox;
            data.via_tree.delete(old_box, id);
            rotate_via_90(&mut data.vias[pos], center, steps);
            let new_box = data.vias[pos].bbox;
            data.via_tree.insert(new_box, id);
            clip::mark_dirty_overlapping(data, old_box.union(&new_box), None);
            true
        }
        RotateTarget::Line { layer, id } => {
            let Some(l) = data.layers.get_mut(layer) else {
                return false;
            };
            let Some(line) = l.line_mut(id) else {
                return false;
            };
            let old_box = line.bbox;
            rotate_line_90(line, center, steps);
            let new_box = line.bbox;
            l.line_tree.delete(old_box, id);
            l.line_tree.insert(new_box, id);
            clip::mark_dirty_overlapping(data, old_box.union(&new_box), Some(layer));
            true
        }
        RotateTarget::Arc { layer, id } => {
            let Some(l) = data.layers.get_mut(layer) else {
                return false;
            };
            let Some(arc) = l.arc_mut(id) else {
                return false;
            };
            let old_box = arc.bbox;
            rotate_arc_90(arc, center, steps);
            let new_box = arc.bbox;
            l.arc_tree.delete(old_box, id);
            l.arc_tree.insert(new_box, id);
            clip::mark_dirty_overlapping(data, old_box.union(&new_box), Some(layer));
            true
        }
        RotateTarget::Text { layer, id } => {
            let Some(l) = data.layers.get_mut(layer) else {
                return false;
            };
            let Some(text) = l.text_mut(id) else {
                return false;
            };
            let old_box = text.bbox;
            rotate_text_90(text, center, steps);
            let new_box = text.bbox;
            l.text_tree.delete(old_box, id);
            l.text_tree.insert(new_box, id);
            clip::mark_dirty_overlapping(data, old_box.union(&new_box), Some(layer));
            true
        }
        RotateTarget::Polygon { layer, id } => {
            let Some(l) = data.layers.get_mut(layer) else {
                return false;
            };
            let Some(poly) = l.polygon_mut(id) else {
                return false;
            };
            let old_box = poly.bbox;
            rotate_polygon_90(poly, center, steps);
            let new_box = poly.bbox;
            l.polygon_tree.delete(old_box, id);
            l.polygon_tree.insert(new_box, id);
            true
        }
        RotateTarget::Element(id) => {
            let Some(mut element) = crate::ops::remove_element(data, id) else {
                return false;
            };
            rotate_element_90(&mut element, center, steps);
            crate::ops::insert_element(data, element);
            true
        }
    }
}

/// Rotate an entire data set (a paste buffer) around `center`. Trees are
/// rebuilt wholesale afterwards.
pub fn rotate_data_90(data: &mut BoardData, center: Point, steps: u8) {
    for v in &mut data.vias {
        rotate_via_90(v, center, steps);
    }
    for e in &mut data.elements {
        rotate_element_90(e, center, steps);
    }
    for r in &mut data.rats {
        rotate_rat_90(r, center, steps);
    }
    for l in &mut data.layers {
        for x in &mut l.lines {
            rotate_line_90(x, center, steps);
        }
        for x in &mut l.arcs {
            rotate_arc_90(x, center, steps);
        }
        for x in &mut l.texts {
            rotate_text_90(x, center, steps);
        }
        for x in &mut l.polygons {
            rotate_polygon_90(x, center, steps);
        }
    }
    data.rebuild_trees();
}

/// Rotate a whole data set by an arbitrary angle in degrees around
/// `center`. Arc sweeps keep their deltas; start angles shift. Texts keep
/// their quarter-turn direction (free rotation of text is rendered, not
/// modeled).
pub fn rotate_data_free(data: &mut BoardData, center: Point, angle_deg: f64) {
    let rad = angle_deg.to_radians();
    let (sin, cos) = rad.sin_cos();
    let rot = |p: Point| -> Point {
        let dx = (p.x - center.x) as f64;
        let dy = (p.y - center.y) as f64;
        // Screen-counter-clockwise in the y-down frame.
        Point::new(
            center.x + core_geom::round_away(dx * cos + dy * sin),
            center.y + core_geom::round_away(-dx * sin + dy * cos),
        )
    };
    for v in &mut data.vias {
        v.pos = rot(v.pos);
        v.update_bbox();
    }
    for e in &mut data.elements {
        e.mark = rot(e.mark);
        for p in &mut e.pins {
            p.pos = rot(p.pos);
        }
        for p in &mut e.pads {
            p.point1 = rot(p.point1);
            p.point2 = rot(p.point2);
        }
        for l in &mut e.lines {
            l.point1 = rot(l.point1);
            l.point2 = rot(l.point2);
        }
        for a in &mut e.arcs {
            a.center = rot(a.center);
            a.start_angle =
                (a.start_angle as f64 + angle_deg).rem_euclid(360.0).round() as i32;
        }
        for t in &mut e.names {
            t.pos = rot(t.pos);
        }
        e.update_bbox();
    }
    for r in &mut data.rats {
        r.point1 = rot(r.point1);
        r.point2 = rot(r.point2);
        r.update_bbox();
    }
    for l in &mut data.layers {
        for x in &mut l.lines {
            x.point1 = rot(x.point1);
            x.point2 = rot(x.point2);
            x.update_bbox();
        }
        for x in &mut l.arcs {
            x.center = rot(x.center);
            x.start_angle =
                (x.start_angle as f64 + angle_deg).rem_euclid(360.0).round() as i32;
            x.update_bbox();
        }
        for x in &mut l.texts {
            x.pos = rot(x.pos);
            x.update_bbox();
        }
        for x in &mut l.polygons {
            for p in &mut x.points {
                *p = rot(*p);
            }
            x.update_bbox();
            x.clipped = None;
        }
    }
    data.rebuild_trees();
}

/// Mirror one element across the vertical axis at `cx`, flipping it to the
/// other board side. Self-inverse.
pub fn mirror_element(element: &mut Element, cx: Coord) {
    element.mark = mirror_point_x(element.mark, cx);
    element.flags.toggle(ObjectFlags::ONSOLDER);
    for p in &mut element.pins {
        p.pos = mirror_point_x(p.pos, cx);
        p.update_bbox();
    }
    for p in &mut element.pads {
        p.point1 = mirror_point_x(p.point1, cx);
        p.point2 = mirror_point_x(p.point2, cx);
        p.flags.toggle(ObjectFlags::ONSOLDER);
        p.update_bbox();
    }
    for l in &mut element.lines {
        l.point1 = mirror_point_x(l.point1, cx);
        l.point2 = mirror_point_x(l.point2, cx);
        l.update_bbox();
    }
    for a in &mut element.arcs {
        a.center = mirror_point_x(a.center, cx);
        a.start_angle = (180 - a.start_angle).rem_euclid(360);
        a.delta = -a.delta;
        a.update_bbox();
    }
    for t in &mut element.names {
        t.pos = mirror_point_x(t.pos, cx);
        t.flags.toggle(ObjectFlags::ONSOLDER);
        t.update_bbox();
    }
    element.update_bbox();
}

/// Mirror a data set across the vertical axis at `cx`, flipping every
/// element and pad to the other board side and every copper layer to its
/// mirror position in the stack.
pub fn mirror_data(data: &mut BoardData, cx: Coord) {
    for v in &mut data.vias {
        v.pos = mirror_point_x(v.pos, cx);
        v.update_bbox();
    }
    for e in &mut data.elements {
        e.mark = mirror_point_x(e.mark, cx);
        e.flags.toggle(ObjectFlags::ONSOLDER);
        for p in &mut e.pins {
            p.pos = mirror_point_x(p.pos, cx);
        }
        for p in &mut e.pads {
            p.point1 = mirror_point_x(p.point1, cx);
            p.point2 = mirror_point_x(p.point2, cx);
            p.flags.toggle(ObjectFlags::ONSOLDER);
        }
        for l in &mut e.lines {
            l.point1 = mirror_point_x(l.point1, cx);
            l.point2 = mirror_point_x(l.point2, cx);
        }
        for a in &mut e.arcs {
            a.center = mirror_point_x(a.center, cx);
            a.start_angle = (180 - a.start_angle).rem_euclid(360);
            a.delta = -a.delta;
        }
        for t in &mut e.names {
            t.pos = mirror_point_x(t.pos, cx);
            t.flags.toggle(ObjectFlags::ONSOLDER);
        }
        e.update_bbox();
    }
    for r in &mut data.rats {
        r.point1 = mirror_point_x(r.point1, cx);
        r.point2 = mirror_point_x(r.point2, cx);
        r.update_bbox();
    }
    // Swap layer stacks top-for-bottom so mirrored copper lands on the
    // opposite physical side.
    let copper = data.copper_count;
    for i in 0..copper / 2 {
        data.layers.swap(i, copper - 1 - i);
    }
    let (bs, ts) = (data.bottom_silk(), data.top_silk());
    data.layers.swap(bs, ts);
    for l in &mut data.layers {
        for x in &mut l.lines {
            x.point1 = mirror_point_x(x.point1, cx);
            x.point2 = mirror_point_x(x.point2, cx);
            x.update_bbox();
        }
        for x in &mut l.arcs {
            x.center = mirror_point_x(x.center, cx);
            x.start_angle = (180 - x.start_angle).rem_euclid(360);
            x.delta = -x.delta;
            x.update_bbox();
        }
        for x in &mut l.texts {
            x.pos = mirror_point_x(x.pos, cx);
            x.update_bbox();
        }
        for x in &mut l.polygons {
            for p in &mut x.points {
                *p = mirror_point_x(*p, cx);
            }
            x.update_bbox();
            x.clipped = None;
        }
    }
    data.rebuild_trees();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::Flags;
    use crate::ops;

    #[test]
    fn four_quarter_turns_are_identity() {
        let c = Point::new(1000, 1000);
        let p = Point::new(1500, 1200);
        let mut q = p;
        for _ in 0..4 {
            q = rotate_point_90(q, c, 1);
        }
        assert_eq!(q, p);
        assert_eq!(rotate_point_90(p, c, 4), p);
    }

    #[test]
    fn quarter_turn_direction() {
        let c = Point::new(0, 0);
        // (dx, dy) -> (dy, -dx): east goes north in the y-down frame.
        assert_eq!(rotate_point_90(Point::new(10, 0), c, 1), Point::new(0, -10));
        assert_eq!(rotate_point_90(Point::new(0, -10), c, 1), Point::new(-10, 0));
    }

    #[test]
    fn arc_rotation_swaps_radii_on_odd_steps() {
        let mut arc = Arc {
            id: 1,
            center: Point::new(100, 100),
            width: 50,
            height: 30,
            start_angle: 0,
            delta: 90,
            thickness: 10,
            clearance: 4,
            flags: Flags::default(),
            bbox: core_geom::BoxType::empty(),
        };
        arc.update_bbox();
        rotate_arc_90(&mut arc, Point::new(100, 100), 1);
        assert_eq!((arc.width, arc.height), (30, 50));
        assert_eq!(arc.start_angle, 90);
        rotate_arc_90(&mut arc, Point::new(100, 100), 3);
        assert_eq!((arc.width, arc.height), (50, 30));
        assert_eq!(arc.start_angle, 0);
    }

    #[test]
    fn rotate_object_updates_tree() {
        let mut d = BoardData::new(2);
        let id = ops::create_line(
            &mut d,
            0,
            Point::new(0, 0),
            Point::new(1000, 0),
            100,
            50,
            Flags::default(),
        )
        .expect("line");
        assert!(rotate_object_90(
            &mut d,
            RotateTarget::Line { layer: 0, id },
            Point::new(0, 0),
            1
        ));
        let line = d.layers[0].line(id).expect("line");
        assert_eq!(line.point2, Point::new(0, -1000));
        assert_eq!(d.layers[0].line_tree.query(&line.bbox).len(), 1);
    }

    #[test]
    fn data_rotation_round_trips() {
        let mut d = BoardData::new(2);
        ops::create_via(
            &mut d,
            Point::new(2000, 3000),
            400,
            200,
            0,
            200,
            None,
            Flags::default(),
        );
        let before = d.vias[0].pos;
        for _ in 0..4 {
            rotate_data_90(&mut d, Point::new(0, 0), 1);
        }
        assert_eq!(d.vias[0].pos, before);
    }

    #[test]
    fn mirror_flips_sides() {
        let mut d = BoardData::new(2);
        ops::create_via(
            &mut d,
            Point::new(2000, 3000),
            400,
            200,
            0,
            200,
            None,
            Flags::default(),
        );
        mirror_data(&mut d, 1000);
        assert_eq!(d.vias[0].pos, Point::new(0, 3000));
        mirror_data(&mut d, 1000);
        assert_eq!(d.vias[0].pos, Point::new(2000, 3000));
    }
}
