//! Paste buffers: five process-wide clipboards holding detached board
//! data, with rotate/mirror/convert/smash and paste-to-layout.
//!
//! A buffer owns a [`BoardData`] of its own, so everything that works on a
//! board works on a buffer. Entity ids inside a buffer belong to the
//! buffer; pasting allocates fresh ids on the target board. Copying into a
//! buffer strips selection and connection-tracing flags.

use crate::select::{self, SelRef};
use core_geom::{Coord, Point};
use core_model::entity::*;
use core_model::flags::{Flags, ObjectFlags};
use core_model::{Board, BoardData, ops, transform};
use core_state::{Detached, ObjRef, UndoJournal, UndoKind};
use tracing::{debug, warn};

/// Number of paste buffers.
pub const MAX_BUFFER: usize = 5;

#[derive(Debug, Clone)]
pub struct PasteBuffer {
    pub data: BoardData,
    /// Pick-up origin: paste places this point at the click.
    pub origin: Point,
}

impl PasteBuffer {
    fn new() -> Self {
        Self {
            data: BoardData::new(2),
            origin: Point::new(0, 0),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn clear(&mut self) {
        let copper = self.data.copper_count;
        self.data = BoardData::new(copper);
        self.origin = Point::new(0, 0);
    }
}

/// The buffer bank plus the current selection index.
#[derive(Debug, Clone)]
pub struct BufferSet {
    buffers: Vec<PasteBuffer>,
    pub current: usize,
}

impl Default for BufferSet {
    fn default() -> Self {
        Self::new()
    }
}

impl BufferSet {
    pub fn new() -> Self {
        Self {
            buffers: (0..MAX_BUFFER).map(|_| PasteBuffer::new()).collect(),
            current: 0,
        }
    }

    pub fn current_buffer(&self) -> &PasteBuffer {
        &self.buffers[self.current]
    }

    pub fn current_buffer_mut(&mut self) -> &mut PasteBuffer {
        &mut self.buffers[self.current]
    }

    /// Select buffer `n` (zero based). Out-of-range indexes are refused.
    pub fn select(&mut self, n: usize) -> bool {
        if n < MAX_BUFFER {
            self.current = n;
            true
        } else {
            false
        }
    }
}

fn strip(flags: Flags) -> Flags {
    flags.masked_for_copy(ObjectFlags::SELECTED | ObjectFlags::WARN)
}

// --- copying into a data set (buffer fill and paste share these) -----------

pub(crate) fn copy_via_into(target: &mut BoardData, via: &Via, dx: Coord, dy: Coord) -> ObjectId {
    let id = target.alloc_id();
    let mut copy = Via {
        id,
        pos: Point::new(via.pos.x + dx, via.pos.y + dy),
        name: via.name.clone(),
        number: via.number.clone(),
        flags: strip(via.flags),
        ..*via
    };
    copy.update_bbox();
    ops::insert_via(target, copy);
    id
}

pub(crate) fn copy_line_into(
    target: &mut BoardData,
    layer: usize,
    line: &Line,
    dx: Coord,
    dy: Coord,
) -> ObjectId {
    let id = target.alloc_id();
    let mut copy = Line {
        id,
        point1: Point::new(line.point1.x + dx, line.point1.y + dy),
        point2: Point::new(line.point2.x + dx, line.point2.y + dy),
        flags: strip(line.flags),
        ..*line
    };
    copy.update_bbox();
    ops::insert_line(target, layer, copy);
    id
}

pub(crate) fn copy_arc_into(
    target: &mut BoardData,
    layer: usize,
    arc: &Arc,
    dx: Coord,
    dy: Coord,
) -> ObjectId {
    let id = target.alloc_id();
    let mut copy = Arc {
        id,
        center: Point::new(arc.center.x + dx, arc.center.y + dy),
        flags: strip(arc.flags),
        ..*arc
    };
    copy.update_bbox();
    ops::insert_arc(target, layer, copy);
    id
}

pub(crate) fn copy_text_into(
    target: &mut BoardData,
    layer: usize,
    text: &Text,
    dx: Coord,
    dy: Coord,
) -> ObjectId {
    let id = target.alloc_id();
    let mut copy = Text {
        id,
        pos: Point::new(text.pos.x + dx, text.pos.y + dy),
        string: text.string.clone(),
        flags: strip(text.flags),
        ..*text
    };
    copy.update_bbox();
    ops::insert_text(target, layer, copy);
    id
}

pub(crate) fn copy_polygon_into(
    target: &mut BoardData,
    layer: usize,
    poly: &Polygon,
    dx: Coord,
    dy: Coord,
) -> ObjectId {
    let id = target.alloc_id();
    let mut copy = Polygon {
        id,
        points: poly
            .points
            .iter()
            .map(|p| Point::new(p.x + dx, p.y + dy))
            .collect(),
        hole_indices: poly.hole_indices.clone(),
        flags: strip(poly.flags),
        bbox: poly.bbox,
        clipped: None,
    };
    copy.update_bbox();
    ops::insert_polygon(target, layer, copy);
    id
}

pub(crate) fn copy_element_into(
    target: &mut BoardData,
    element: &Element,
    dx: Coord,
    dy: Coord,
) -> ObjectId {
    let mut copy = element.clone();
    copy.id = target.alloc_id();
    copy.flags = strip(copy.flags);
    copy.mark = Point::new(copy.mark.x + dx, copy.mark.y + dy);
    for p in &mut copy.pins {
        p.id = target.alloc_id();
        p.pos = Point::new(p.pos.x + dx, p.pos.y + dy);
        p.flags = strip(p.flags);
    }
    for p in &mut copy.pads {
        p.id = target.alloc_id();
        p.point1 = Point::new(p.point1.x + dx, p.point1.y + dy);
        p.point2 = Point::new(p.point2.x + dx, p.point2.y + dy);
        p.flags = strip(p.flags);
    }
    for l in &mut copy.lines {
        l.id = target.alloc_id();
        l.point1 = Point::new(l.point1.x + dx, l.point1.y + dy);
        l.point2 = Point::new(l.point2.x + dx, l.point2.y + dy);
    }
    for a in &mut copy.arcs {
        a.id = target.alloc_id();
        a.center = Point::new(a.center.x + dx, a.center.y + dy);
    }
    for t in &mut copy.names {
        t.id = target.alloc_id();
        t.pos = Point::new(t.pos.x + dx, t.pos.y + dy);
    }
    ops::insert_element(target, copy)
}

/// Copy everything selected on the board into the buffer. The origin is
/// the pick-up point the paste will later align to the click.
pub fn add_selected(buffer: &mut PasteBuffer, board: &Board, origin: Point) -> usize {
    buffer.origin = origin;
    // Match the buffer's layer count to the board so copper lands on the
    // same stack position.
    if buffer.data.copper_count != board.data.copper_count {
        buffer.data = BoardData::new(board.data.copper_count);
    }
    let mut copied = 0;
    for r in select::selected_refs(board) {
        copied += 1;
        match r {
            SelRef::Via(id) => {
                if let Some(v) = board.data.via(id) {
                    copy_via_into(&mut buffer.data, v, 0, 0);
                }
            }
            SelRef::Element(id) => {
                if let Some(e) = board.data.element(id) {
                    copy_element_into(&mut buffer.data, e, 0, 0);
                }
            }
            SelRef::Rat(_) => copied -= 1, // rats are not buffered
            SelRef::Line { layer, id } => {
                if let Some(x) = board.data.layers[layer].line(id) {
                    copy_line_into(&mut buffer.data, layer, x, 0, 0);
                }
            }
            SelRef::Arc { layer, id } => {
                if let Some(x) = board.data.layers[layer].arc(id) {
                    copy_arc_into(&mut buffer.data, layer, x, 0, 0);
                }
            }
            SelRef::Text { layer, id } => {
                if let Some(x) = board.data.layers[layer].text(id) {
                    copy_text_into(&mut buffer.data, layer, x, 0, 0);
                }
            }
            SelRef::Polygon { layer, id } => {
                if let Some(x) = board.data.layers[layer].polygon(id) {
                    copy_polygon_into(&mut buffer.data, layer, x, 0, 0);
                }
            }
        }
    }
    debug!(target: "buffer", copied, "buffer_add_selected");
    copied
}

/// Move one element off the board into the buffer (clearing it first).
/// Journals the removal so undo restores the element.
pub fn element_to_buffer(
    buffer: &mut PasteBuffer,
    board: &mut Board,
    journal: &mut UndoJournal,
    element: ObjectId,
) -> bool {
    let Some(e) = ops::remove_element(&mut board.data, element) else {
        return false;
    };
    buffer.clear();
    buffer.origin = e.mark;
    copy_element_into(&mut buffer.data, &e, 0, 0);
    journal.add(UndoKind::MoveToBuffer(Detached::Element(e)));
    true
}

/// Paste the buffer at `at`, journaling one create per pasted entity. The
/// caller owns the serial group.
pub fn to_layout(
    buffer: &PasteBuffer,
    board: &mut Board,
    journal: &mut UndoJournal,
    at: Point,
) -> usize {
    let dx = at.x - buffer.origin.x;
    let dy = at.y - buffer.origin.y;
    let mut pasted = 0;
    for v in &buffer.data.vias {
        let id = copy_via_into(&mut board.data, v, dx, dy);
        journal.add(UndoKind::Create(ObjRef::Via(id)));
        pasted += 1;
    }
    for e in &buffer.data.elements {
        let id = copy_element_into(&mut board.data, e, dx, dy);
        journal.add(UndoKind::Create(ObjRef::Element(id)));
        pasted += 1;
    }
    for (layer, l) in buffer.data.layers.iter().enumerate() {
        let target_layer = layer.min(board.data.layers.len().saturating_sub(1));
        for x in &l.lines {
            let id = copy_line_into(&mut board.data, target_layer, x, dx, dy);
            journal.add(UndoKind::Create(ObjRef::Line {
                layer: target_layer,
                id,
            }));
            pasted += 1;
        }
        for x in &l.arcs {
            let id = copy_arc_into(&mut board.data, target_layer, x, dx, dy);
            journal.add(UndoKind::Create(ObjRef::Arc {
                layer: target_layer,
                id,
            }));
            pasted += 1;
        }
        for x in &l.texts {
            let id = copy_text_into(&mut board.data, target_layer, x, dx, dy);
            journal.add(UndoKind::Create(ObjRef::Text {
                layer: target_layer,
                id,
            }));
            pasted += 1;
        }
        for x in &l.polygons {
            let id = copy_polygon_into(&mut board.data, target_layer, x, dx, dy);
            journal.add(UndoKind::Create(ObjRef::Polygon {
                layer: target_layer,
                id,
            }));
            pasted += 1;
        }
    }
    debug!(target: "buffer", pasted, "buffer_to_layout");
    pasted
}

/// Rotate the buffer by quarter turns around its origin.
pub fn rotate(buffer: &mut PasteBuffer, steps: u8) {
    transform::rotate_data_90(&mut buffer.data, buffer.origin, steps);
}

/// Rotate by an arbitrary angle in degrees around the origin.
pub fn free_rotate(buffer: &mut PasteBuffer, angle_deg: f64) {
    transform::rotate_data_free(&mut buffer.data, buffer.origin, angle_deg);
}

/// Mirror across the vertical axis through the origin, flipping sides.
pub fn mirror(buffer: &mut PasteBuffer) {
    transform::mirror_data(&mut buffer.data, buffer.origin.x);
}

fn rectangle_corners(poly: &Polygon) -> Option<[Point; 4]> {
    if !poly.hole_indices.is_empty() || poly.points.len() != 4 {
        return None;
    }
    let p = &poly.points;
    let xs: Vec<Coord> = p.iter().map(|q| q.x).collect();
    let ys: Vec<Coord> = p.iter().map(|q| q.y).collect();
    let (x1, x2) = (*xs.iter().min()?, *xs.iter().max()?);
    let (y1, y2) = (*ys.iter().min()?, *ys.iter().max()?);
    // All four corners must be present for an axis-aligned rectangle.
    for q in p {
        if (q.x != x1 && q.x != x2) || (q.y != y1 && q.y != y2) {
            return None;
        }
    }
    Some([
        Point::new(x1, y1),
        Point::new(x2, y1),
        Point::new(x2, y2),
        Point::new(x1, y2),
    ])
}

/// Convert the buffer's loose pieces into a single element: vias become
/// pins, copper lines on the outer layers become pads, axis-aligned
/// rectangular polygons become square pads, and silk geometry becomes the
/// element outline. The element replaces the buffer content.
pub fn convert_to_element(buffer: &mut PasteBuffer, keepaway: Coord) -> Result<(), &'static str> {
    let data = &buffer.data;
    if data.is_empty() {
        return Err("buffer is empty");
    }
    if !data.elements.is_empty() {
        return Err("buffer already holds an element");
    }
    let mark = buffer.origin;
    let mut pin_seq = 1u32;
    let mut next_number = || -> String {
        let n = pin_seq.to_string();
        pin_seq += 1;
        n
    };

    let mut out = BoardData::new(data.copper_count);
    let mut pins = Vec::new();
    let mut pads = Vec::new();
    let mut silk_lines = Vec::new();
    let mut silk_arcs = Vec::new();
    let mut crooked = false;

    for via in &data.vias {
        let mut pin = via.clone();
        pin.id = out.alloc_id();
        // A named via keeps its name as the pin number; anonymous ones get
        // the next sequence number.
        pin.number = Some(match &via.name {
            Some(name) => name.clone(),
            None => next_number(),
        });
        pin.flags = strip(pin.flags);
        pin.flags.set(ObjectFlags::PIN);
        pin.flags.clear(ObjectFlags::VIA);
        pins.push(pin);
    }

    let top = 0usize;
    let bottom = data.copper_count.saturating_sub(1);
    for (layer, l) in data.layers.iter().enumerate() {
        let on_copper_face = layer == top || layer == bottom;
        let onsolder = layer == bottom && bottom != top;
        if data.is_silk(layer) {
            silk_lines.extend(l.lines.iter().cloned());
            silk_arcs.extend(l.arcs.iter().cloned());
            continue;
        }
        if !on_copper_face {
            if !(l.lines.is_empty() && l.polygons.is_empty()) {
                crooked = true;
            }
            continue;
        }
        for line in &l.lines {
            let mut pad = Pad {
                id: out.alloc_id(),
                point1: line.point1,
                point2: line.point2,
                thickness: line.thickness,
                clearance: line.clearance,
                mask: line.thickness + line.clearance,
                name: None,
                number: Some(next_number()),
                flags: Flags::new(if onsolder {
                    ObjectFlags::ONSOLDER
                } else {
                    ObjectFlags::empty()
                }),
                bbox: core_geom::BoxType::empty(),
            };
            pad.update_bbox();
            pads.push(pad);
        }
        for poly in &l.polygons {
            let Some([c1, _c2, c3, _c4]) = rectangle_corners(poly) else {
                crooked = true;
                continue;
            };
            let w = c3.x - c1.x;
            let h = c3.y - c1.y;
            let t = w.min(h);
            let x1 = c1.x + t / 2;
            let y1 = c1.y + t / 2;
            let x2 = x1 + (w - t);
            let y2 = y1 + (h - t);
            let mut pad = Pad {
                id: out.alloc_id(),
                point1: Point::new(x1, y1),
                point2: Point::new(x2, y2),
                thickness: t,
                clearance: 2 * keepaway,
                mask: t + keepaway,
                name: None,
                number: Some(next_number()),
                flags: Flags::new(if onsolder {
                    ObjectFlags::SQUARE | ObjectFlags::ONSOLDER
                } else {
                    ObjectFlags::SQUARE
                }),
                bbox: core_geom::BoxType::empty(),
            };
            pad.update_bbox();
            pads.push(pad);
        }
    }

    if pins.is_empty() && pads.is_empty() {
        return Err("buffer has no pieces that convert to pins or pads");
    }
    if crooked {
        warn!(target: "buffer", "convert_skipped_non_rectangular_pieces");
    }

    let names = std::array::from_fn(|_| {
        let id = out.alloc_id();
        let mut t = Text {
            id,
            pos: mark,
            direction: 0,
            scale: 100,
            string: String::new(),
            font: 0,
            flags: Flags::default(),
            bbox: core_geom::BoxType::empty(),
        };
        t.update_bbox();
        t
    });
    let mut element = Element {
        id: out.alloc_id(),
        mark,
        names,
        pins,
        pads,
        lines: silk_lines,
        arcs: silk_arcs,
        attributes: Default::default(),
        flags: Flags::default(),
        bbox: core_geom::BoxType::empty(),
    };
    // Re-id silk children from the fresh data so ids stay unique.
    for l in &mut element.lines {
        l.id = out.alloc_id();
    }
    for a in &mut element.arcs {
        a.id = out.alloc_id();
    }
    ops::insert_element(&mut out, element);
    buffer.data = out;
    debug!(target: "buffer", "buffer_converted_to_element");
    Ok(())
}

/// Break every element in the buffer into loose pieces: silk geometry onto
/// the silk layer, pins back to vias, pads to copper lines.
pub fn smash(buffer: &mut PasteBuffer) -> usize {
    let elements = std::mem::take(&mut buffer.data.elements);
    buffer.data.rebuild_trees();
    let mut smashed = 0;
    let top_silk = buffer.data.top_silk();
    let bottom = buffer.data.copper_count.saturating_sub(1);
    for e in elements {
        smashed += 1;
        for line in e.lines {
            let id = buffer.data.alloc_id();
            let mut l = Line { id, ..line };
            l.update_bbox();
            ops::insert_line(&mut buffer.data, top_silk, l);
        }
        for arc in e.arcs {
            let id = buffer.data.alloc_id();
            let mut a = Arc { id, ..arc };
            a.update_bbox();
            ops::insert_arc(&mut buffer.data, top_silk, a);
        }
        for pin in e.pins {
            let id = buffer.data.alloc_id();
            let mut v = pin;
            v.id = id;
            v.flags.clear(ObjectFlags::PIN);
            v.flags.set(ObjectFlags::VIA);
            v.update_bbox();
            ops::insert_via(&mut buffer.data, v);
        }
        for pad in e.pads {
            let layer = if pad.on_solder_side() { bottom } else { 0 };
            let id = buffer.data.alloc_id();
            let mut l = Line {
                id,
                point1: pad.point1,
                point2: pad.point2,
                thickness: pad.thickness,
                clearance: pad.clearance,
                flags: Flags::default(),
                bbox: core_geom::BoxType::empty(),
            };
            l.update_bbox();
            ops::insert_line(&mut buffer.data, layer, l);
        }
    }
    debug!(target: "buffer", smashed, "buffer_smashed");
    smashed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::select::select_block;
    use core_geom::BoxType;

    fn board() -> Board {
        Board::new(2, 1_000_000, 1_000_000)
    }

    fn select_all(b: &mut Board, j: &mut UndoJournal) {
        select_block(b, j, BoxType::new(-10, -10, 2_000_000, 2_000_000), true);
    }

    #[test]
    fn add_selected_strips_flags_and_copies() {
        let mut b = board();
        let mut j = UndoJournal::new();
        ops::create_via(
            &mut b.data,
            Point::new(100_000, 100_000),
            20_000,
            10_000,
            0,
            10_000,
            Some("V1".into()),
            Flags::new(ObjectFlags::FOUND | ObjectFlags::CONNECTED),
        );
        select_all(&mut b, &mut j);
        let mut buf = PasteBuffer::new();
        let n = add_selected(&mut buf, &b, Point::new(100_000, 100_000));
        assert_eq!(n, 1);
        let copy = &buf.data.vias[0];
        assert!(copy.flags.word.is_empty());
        assert_eq!(copy.name.as_deref(), Some("V1"));
        // Source keeps its flags apart from what the copy stripped.
        assert_eq!(b.data.vias.len(), 1);
    }

    #[test]
    fn paste_translates_relative_to_origin() {
        let mut b = board();
        let mut j = UndoJournal::new();
        ops::create_via(
            &mut b.data,
            Point::new(100_000, 100_000),
            20_000,
            10_000,
            0,
            10_000,
            None,
            Flags::default(),
        );
        select_all(&mut b, &mut j);
        let mut buf = PasteBuffer::new();
        add_selected(&mut buf, &b, Point::new(100_000, 100_000));
        let n = to_layout(&buf, &mut b, &mut j, Point::new(300_000, 250_000));
        j.inc_serial();
        assert_eq!(n, 1);
        assert_eq!(b.data.vias.len(), 2);
        assert!(b
            .data
            .vias
            .iter()
            .any(|v| v.pos == Point::new(300_000, 250_000)));
        // One undo removes the paste as a unit.
        j.undo(&mut b);
        assert_eq!(b.data.vias.len(), 1);
    }

    #[test]
    fn four_quarter_rotations_restore_positions() {
        let mut b = board();
        let mut j = UndoJournal::new();
        ops::create_line(
            &mut b.data,
            0,
            Point::new(100_000, 100_000),
            Point::new(200_000, 120_000),
            10_000,
            4_000,
            Flags::default(),
        )
        .expect("line");
        select_all(&mut b, &mut j);
        let mut buf = PasteBuffer::new();
        add_selected(&mut buf, &b, Point::new(150_000, 110_000));
        let before = (buf.data.layers[0].lines[0].point1, buf.data.layers[0].lines[0].point2);
        for _ in 0..4 {
            rotate(&mut buf, 1);
        }
        let after = (buf.data.layers[0].lines[0].point1, buf.data.layers[0].lines[0].point2);
        assert_eq!(before, after);
    }

    #[test]
    fn mirror_twice_is_identity() {
        let mut b = board();
        let mut j = UndoJournal::new();
        ops::create_via(
            &mut b.data,
            Point::new(120_000, 100_000),
            20_000,
            10_000,
            0,
            10_000,
            None,
            Flags::default(),
        );
        select_all(&mut b, &mut j);
        let mut buf = PasteBuffer::new();
        add_selected(&mut buf, &b, Point::new(100_000, 100_000));
        mirror(&mut buf);
        assert_eq!(buf.data.vias[0].pos, Point::new(80_000, 100_000));
        mirror(&mut buf);
        assert_eq!(buf.data.vias[0].pos, Point::new(120_000, 100_000));
    }

    #[test]
    fn convert_makes_numbered_pins_and_pads() {
        let mut buf = PasteBuffer::new();
        buf.origin = Point::new(0, 0);
        // Two vias (one named) and one copper line on the top layer.
        ops::create_via(
            &mut buf.data,
            Point::new(0, 0),
            20_000,
            10_000,
            0,
            10_000,
            Some("A".into()),
            Flags::default(),
        );
        ops::create_via(
            &mut buf.data,
            Point::new(50_000, 0),
            20_000,
            10_000,
            0,
            10_000,
            None,
            Flags::default(),
        );
        ops::create_line(
            &mut buf.data,
            0,
            Point::new(0, 50_000),
            Point::new(20_000, 50_000),
            10_000,
            4_000,
            Flags::default(),
        )
        .expect("line");
        convert_to_element(&mut buf, 2_540).expect("converts");
        assert_eq!(buf.data.elements.len(), 1);
        let e = &buf.data.elements[0];
        assert_eq!(e.pins.len(), 2);
        assert!(e.pins.iter().any(|p| p.number.as_deref() == Some("A")));
        assert_eq!(e.pads.len(), 1);
        assert!(e.pins.iter().all(|p| p.flags.has(ObjectFlags::PIN)));
        // Board copper is gone from the loose lists.
        assert!(buf.data.vias.is_empty());
        assert!(buf.data.layers[0].lines.is_empty());
    }

    #[test]
    fn convert_square_pad_from_rectangle() {
        let mut buf = PasteBuffer::new();
        ops::create_polygon(
            &mut buf.data,
            0,
            vec![
                Point::new(0, 0),
                Point::new(40_000, 0),
                Point::new(40_000, 10_000),
                Point::new(0, 10_000),
            ],
            vec![],
            Flags::default(),
        )
        .expect("poly");
        convert_to_element(&mut buf, 2_540).expect("converts");
        let e = &buf.data.elements[0];
        assert_eq!(e.pads.len(), 1);
        let pad = &e.pads[0];
        assert!(pad.flags.has(ObjectFlags::SQUARE));
        assert_eq!(pad.thickness, 10_000);
        assert_eq!(pad.point1, Point::new(5_000, 5_000));
        assert_eq!(pad.point2, Point::new(35_000, 5_000));
    }

    #[test]
    fn smash_restores_loose_pieces() {
        let mut buf = PasteBuffer::new();
        ops::create_via(
            &mut buf.data,
            Point::new(0, 0),
            20_000,
            10_000,
            0,
            10_000,
            None,
            Flags::default(),
        );
        convert_to_element(&mut buf, 2_540).expect("converts");
        assert_eq!(smash(&mut buf), 1);
        assert!(buf.data.elements.is_empty());
        assert_eq!(buf.data.vias.len(), 1);
        assert!(buf.data.vias[0].flags.has(ObjectFlags::VIA));
    }

    #[test]
    fn buffer_select_bounds() {
        let mut set = BufferSet::new();
        assert!(set.select(4));
        assert_eq!(set.current, 4);
        assert!(!set.select(5));
        assert_eq!(set.current, 4);
    }
}
