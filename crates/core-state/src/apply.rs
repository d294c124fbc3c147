//! Application of journal entries against the board.
//!
//! `apply` reverses one entry and returns the entry that reverses the
//! reversal, so undo and redo are the same code path walking in opposite
//! directions. Every arm goes through the model's `ops`/`transform` layer
//! (or the local `with_*` helpers, which keep bounding boxes and trees in
//! step), so journal application obeys the same container invariants as live
//! edits.

use crate::entry::{Detached, ObjRef, PointRef, UndoKind};
use core_model::clip;
use core_model::entity::ObjectId;
use core_model::transform;
use core_model::{Board, ops};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApplyError {
    #[error("{0} no longer exists")]
    Missing(&'static str),
    #[error("operation not applicable to {0}")]
    Unsupported(&'static str),
}

type Result<T> = std::result::Result<T, ApplyError>;

pub fn apply(board: &mut Board, kind: UndoKind) -> Result<UndoKind> {
    match kind {
        UndoKind::Create(obj) => Ok(UndoKind::Remove(detach(board, obj)?)),
        UndoKind::Remove(det) => {
            let obj = det.obj_ref();
            attach(board, det);
            Ok(UndoKind::Create(obj))
        }
        UndoKind::MoveToBuffer(det) => {
            let obj = det.obj_ref();
            attach(board, det);
            Ok(UndoKind::Create(obj))
        }
        UndoKind::Move { obj, dx, dy } => {
            apply_move(board, obj, -dx, -dy)?;
            Ok(UndoKind::Move {
                obj,
                dx: -dx,
                dy: -dy,
            })
        }
        UndoKind::MovePoint { point, dx, dy } => {
            let ok = match point {
                PointRef::LinePoint { layer, id, second } => {
                    ops::move_line_point(&mut board.data, layer, id, second, -dx, -dy)
                }
                PointRef::PolygonPoint { layer, id, idx } => {
                    ops::move_polygon_point(&mut board.data, layer, id, idx, -dx, -dy)
                }
            };
            if !ok {
                return Err(ApplyError::Missing("point owner"));
            }
            Ok(UndoKind::MovePoint {
                point,
                dx: -dx,
                dy: -dy,
            })
        }
        UndoKind::Rotate {
            target,
            center,
            steps,
        } => {
            let back = (4 - steps % 4) % 4;
            if !transform::rotate_object_90(&mut board.data, target, center, back) {
                return Err(ApplyError::Missing("rotated object"));
            }
            Ok(UndoKind::Rotate {
                target,
                center,
                steps: back,
            })
        }
        UndoKind::Mirror { element, cx } => {
            let Some(mut e) = ops::remove_element(&mut board.data, element) else {
                return Err(ApplyError::Missing("element"));
            };
            transform::mirror_element(&mut e, cx);
            ops::insert_element(&mut board.data, e);
            Ok(UndoKind::Mirror { element, cx })
        }
        UndoKind::ChangeSize { obj, value } => {
            let old = swap_size(board, obj, value)?;
            Ok(UndoKind::ChangeSize { obj, value: old })
        }
        UndoKind::ChangeClearance { obj, value } => {
            let old = swap_clearance(board, obj, value)?;
            Ok(UndoKind::ChangeClearance { obj, value: old })
        }
        UndoKind::ChangeDrill { obj, value } => {
            let old = swap_drill(board, obj, value)?;
            Ok(UndoKind::ChangeDrill { obj, value: old })
        }
        UndoKind::ChangeMask { obj, value } => {
            let old = swap_mask(board, obj, value)?;
            Ok(UndoKind::ChangeMask { obj, value: old })
        }
        UndoKind::ChangeName { obj, value } => {
            let old = swap_name(board, obj, value)?;
            Ok(UndoKind::ChangeName { obj, value: old })
        }
        UndoKind::ChangeNumber { obj, value } => {
            let old = swap_number(board, obj, value)?;
            Ok(UndoKind::ChangeNumber { obj, value: old })
        }
        UndoKind::ChangeAngles {
            layer,
            id,
            start,
            delta,
        } => {
            let mut old = None;
            with_arc(board, layer, id, |arc| {
                old = Some((arc.start_angle, arc.delta));
                arc.start_angle = start;
                arc.delta = delta;
            })?;
            let (os, od) = old.ok_or(ApplyError::Missing("arc"))?;
            Ok(UndoKind::ChangeAngles {
                layer,
                id,
                start: os,
                delta: od,
            })
        }
        UndoKind::ChangeFlags { obj, word } => {
            let old = swap_flags(board, obj, word)?;
            Ok(UndoKind::ChangeFlags { obj, word: old })
        }
        UndoKind::ChangeThermal { obj, layer, style } => {
            let old = swap_thermal(board, obj, layer, style)?;
            Ok(UndoKind::ChangeThermal {
                obj,
                layer,
                style: old,
            })
        }
        UndoKind::ChangeLayer { obj, to_layer } => {
            let moved = move_between_layers(board, obj, to_layer)?;
            Ok(moved)
        }
        UndoKind::InsertPoint { point } => {
            let PointRef::PolygonPoint { layer, id, idx } = point else {
                return Err(ApplyError::Unsupported("line point insertion"));
            };
            let Some(value) = ops::remove_polygon_point(&mut board.data, layer, id, idx) else {
                return Err(ApplyError::Missing("polygon point"));
            };
            Ok(UndoKind::RemovePoint { point, value })
        }
        UndoKind::RemovePoint { point, value } => {
            let PointRef::PolygonPoint { layer, id, idx } = point else {
                return Err(ApplyError::Unsupported("line point removal"));
            };
            if !ops::insert_polygon_point(&mut board.data, layer, id, idx, value) {
                return Err(ApplyError::Missing("polygon"));
            }
            Ok(UndoKind::InsertPoint { point })
        }
        UndoKind::AddNet { net, conn } => {
            board.netlist.remove_connection(&conn);
            Ok(UndoKind::RemoveNet { net, conn })
        }
        UndoKind::RemoveNet { net, conn } => {
            board.netlist.add_connection(&net, &conn);
            Ok(UndoKind::AddNet { net, conn })
        }
    }
}

fn detach(board: &mut Board, obj: ObjRef) -> Result<Detached> {
    match obj {
        ObjRef::Via(id) => ops::remove_via(&mut board.data, id)
            .map(Detached::Via)
            .ok_or(ApplyError::Missing("via")),
        ObjRef::Element(id) => ops::remove_element(&mut board.data, id)
            .map(Detached::Element)
            .ok_or(ApplyError::Missing("element")),
        ObjRef::Rat(id) => ops::remove_rat(&mut board.data, id)
            .map(Detached::Rat)
            .ok_or(ApplyError::Missing("rat")),
        ObjRef::Line { layer, id } => ops::remove_line(&mut board.data, layer, id)
            .map(|line| Detached::Line { layer, line })
            .ok_or(ApplyError::Missing("line")),
        ObjRef::Arc { layer, id } => ops::remove_arc(&mut board.data, layer, id)
            .map(|arc| Detached::Arc { layer, arc })
            .ok_or(ApplyError::Missing("arc")),
        ObjRef::Text { layer, id } => ops::remove_text(&mut board.data, layer, id)
            .map(|text| Detached::Text { layer, text })
            .ok_or(ApplyError::Missing("text")),
        ObjRef::Polygon { layer, id } => ops::remove_polygon(&mut board.data, layer, id)
            .map(|polygon| Detached::Polygon { layer, polygon })
            .ok_or(ApplyError::Missing("polygon")),
        ObjRef::Pin(_) | ObjRef::Pad(_) | ObjRef::ElementName { .. } => {
            Err(ApplyError::Unsupported("element child"))
        }
    }
}

fn attach(board: &mut Board, det: Detached) {
    match det {
        Detached::Via(v) => ops::insert_via(&mut board.data, v),
        Detached::Element(e) => {
            ops::insert_element(&mut board.data, e);
        }
        Detached::Rat(r) => ops::insert_rat(&mut board.data, r),
        Detached::Line { layer, line } => ops::insert_line(&mut board.data, layer, line),
        Detached::Arc { layer, arc } => ops::insert_arc(&mut board.data, layer, arc),
        Detached::Text { layer, text } => ops::insert_text(&mut board.data, layer, text),
        Detached::Polygon { layer, polygon } => {
            ops::insert_polygon(&mut board.data, layer, polygon);
        }
    }
}

fn apply_move(board: &mut Board, obj: ObjRef, dx: i32, dy: i32) -> Result<()> {
    let ok = match obj {
        ObjRef::Via(id) => ops::move_via(&mut board.data, id, dx, dy),
        ObjRef::Element(id) => ops::move_element(&mut board.data, id, dx, dy),
        ObjRef::Line { layer, id } => ops::move_line(&mut board.data, layer, id, dx, dy),
        ObjRef::Arc { layer, id } => ops::move_arc(&mut board.data, layer, id, dx, dy),
        ObjRef::Text { layer, id } => ops::move_text(&mut board.data, layer, id, dx, dy),
        ObjRef::Polygon { layer, id } => ops::move_polygon(&mut board.data, layer, id, dx, dy),
        ObjRef::Rat(id) => {
            let moved = board.data.rat_mut(id).map(|r| {
                r.point1.x += dx;
                r.point1.y += dy;
                r.point2.x += dx;
                r.point2.y += dy;
                (r.bbox, r.compute_bbox(), r.id)
            });
            match moved {
                Some((old_box, new_box, rid)) => {
                    if let Some(r) = board.data.rat_mut(rid) {
                        r.bbox = new_box;
                    }
                    board.data.rat_tree.delete(old_box, rid);
                    board.data.rat_tree.insert(new_box, rid);
                    true
                }
                None => false,
            }
        }
        ObjRef::ElementName { element, slot } => with_element_name(board, element, slot, |t| {
            t.pos.x += dx;
            t.pos.y += dy;
        })
        .is_ok(),
        ObjRef::Pin(_) | ObjRef::Pad(_) => return Err(ApplyError::Unsupported("element child")),
    };
    if ok {
        Ok(())
    } else {
        Err(ApplyError::Missing("moved object"))
    }
}

// --- attribute swap helpers -------------------------------------------------
//
// Each runs inside a `with_*` wrapper that re-syncs bbox and tree entry, so
// a size change cannot strand a stale box in the index.

fn swap_size(board: &mut Board, obj: ObjRef, value: i32) -> Result<i32> {
    let mut old = 0;
    match obj {
        ObjRef::Via(id) => with_via(board, id, |v| {
            old = v.thickness;
            v.thickness = value;
        })?,
        ObjRef::Pin(id) => with_pin(board, id, |p| {
            old = p.thickness;
            p.thickness = value;
        })?,
        ObjRef::Pad(id) => with_pad(board, id, |p| {
            old = p.thickness;
            p.thickness = value;
        })?,
        ObjRef::Line { layer, id } => with_line(board, layer, id, |l| {
            old = l.thickness;
            l.thickness = value;
        })?,
        ObjRef::Arc { layer, id } => with_arc(board, layer, id, |a| {
            old = a.thickness;
            a.thickness = value;
        })?,
        ObjRef::Text { layer, id } => with_text(board, layer, id, |t| {
            old = t.scale as i32;
            t.scale = value.max(1) as u16;
        })?,
        ObjRef::ElementName { element, slot } => with_element_name(board, element, slot, |t| {
            old = t.scale as i32;
            t.scale = value.max(1) as u16;
        })?,
        ObjRef::Rat(_) | ObjRef::Element(_) | ObjRef::Polygon { .. } => {
            return Err(ApplyError::Unsupported("size change"));
        }
    }
    Ok(old)
}

fn swap_clearance(board: &mut Board, obj: ObjRef, value: i32) -> Result<i32> {
    let mut old = 0;
    match obj {
        ObjRef::Via(id) => with_via(board, id, |v| {
            old = v.clearance;
            v.clearance = value;
        })?,
        ObjRef::Pin(id) => with_pin(board, id, |p| {
            old = p.clearance;
            p.clearance = value;
        })?,
        ObjRef::Pad(id) => with_pad(board, id, |p| {
            old = p.clearance;
            p.clearance = value;
        })?,
        ObjRef::Line { layer, id } => with_line(board, layer, id, |l| {
            old = l.clearance;
            l.clearance = value;
        })?,
        ObjRef::Arc { layer, id } => with_arc(board, layer, id, |a| {
            old = a.clearance;
            a.clearance = value;
        })?,
        _ => return Err(ApplyError::Unsupported("clearance change")),
    }
    Ok(old)
}

fn swap_drill(board: &mut Board, obj: ObjRef, value: i32) -> Result<i32> {
    let mut old = 0;
    match obj {
        ObjRef::Via(id) => with_via(board, id, |v| {
            old = v.drilling_hole;
            v.drilling_hole = value;
        })?,
        ObjRef::Pin(id) => with_pin(board, id, |p| {
            old = p.drilling_hole;
            p.drilling_hole = value;
        })?,
        _ => return Err(ApplyError::Unsupported("drill change")),
    }
    Ok(old)
}

fn swap_mask(board: &mut Board, obj: ObjRef, value: i32) -> Result<i32> {
    let mut old = 0;
    match obj {
        ObjRef::Via(id) => with_via(board, id, |v| {
            old = v.mask;
            v.mask = value;
        })?,
        ObjRef::Pin(id) => with_pin(board, id, |p| {
            old = p.mask;
            p.mask = value;
        })?,
        ObjRef::Pad(id) => with_pad(board, id, |p| {
            old = p.mask;
            p.mask = value;
        })?,
        _ => return Err(ApplyError::Unsupported("mask change")),
    }
    Ok(old)
}

fn swap_name(board: &mut Board, obj: ObjRef, value: Option<String>) -> Result<Option<String>> {
    let mut old = None;
    match obj {
        ObjRef::Via(id) => with_via(board, id, |v| {
            old = std::mem::replace(&mut v.name, value);
        })?,
        ObjRef::Pin(id) => with_pin(board, id, |p| {
            old = std::mem::replace(&mut p.name, value);
        })?,
        ObjRef::Pad(id) => with_pad(board, id, |p| {
            old = std::mem::replace(&mut p.name, value);
        })?,
        ObjRef::Text { layer, id } => with_text(board, layer, id, |t| {
            old = Some(std::mem::replace(
                &mut t.string,
                value.unwrap_or_default(),
            ));
        })?,
        ObjRef::ElementName { element, slot } => with_element_name(board, element, slot, |t| {
            old = Some(std::mem::replace(
                &mut t.string,
                value.unwrap_or_default(),
            ));
        })?,
        _ => return Err(ApplyError::Unsupported("name change")),
    }
    Ok(old)
}

fn swap_number(board: &mut Board, obj: ObjRef, value: Option<String>) -> Result<Option<String>> {
    let mut old = None;
    match obj {
        ObjRef::Pin(id) => with_pin(board, id, |p| {
            old = std::mem::replace(&mut p.number, value);
        })?,
        ObjRef::Pad(id) => with_pad(board, id, |p| {
            old = std::mem::replace(&mut p.number, value);
        })?,
        _ => return Err(ApplyError::Unsupported("number change")),
    }
    Ok(old)
}

fn swap_flags(
    board: &mut Board,
    obj: ObjRef,
    word: core_model::ObjectFlags,
) -> Result<core_model::ObjectFlags> {
    let mut old = core_model::ObjectFlags::empty();
    let mut set = |flags: &mut core_model::Flags| {
        old = flags.word;
        flags.word = word;
    };
    match obj {
        ObjRef::Via(id) => with_via(board, id, |v| set(&mut v.flags))?,
        ObjRef::Pin(id) => with_pin(board, id, |p| set(&mut p.flags))?,
        ObjRef::Pad(id) => with_pad(board, id, |p| set(&mut p.flags))?,
        ObjRef::Line { layer, id } => with_line(board, layer, id, |l| set(&mut l.flags))?,
        ObjRef::Arc { layer, id } => with_arc(board, layer, id, |a| set(&mut a.flags))?,
        ObjRef::Text { layer, id } => with_text(board, layer, id, |t| set(&mut t.flags))?,
        ObjRef::Polygon { layer, id } => {
            let l = board
                .data
                .layers
                .get_mut(layer)
                .ok_or(ApplyError::Missing("layer"))?;
            let p = l.polygon_mut(id).ok_or(ApplyError::Missing("polygon"))?;
            set(&mut p.flags);
            p.clipped = None; // CLEARPOLY / FULLPOLY may have flipped
        }
        ObjRef::Element(id) => {
            let e = board
                .data
                .element_mut(id)
                .ok_or(ApplyError::Missing("element"))?;
            set(&mut e.flags);
        }
        ObjRef::ElementName { element, slot } => {
            with_element_name(board, element, slot, |t| set(&mut t.flags))?;
        }
        ObjRef::Rat(id) => {
            let r = board.data.rat_mut(id).ok_or(ApplyError::Missing("rat"))?;
            set(&mut r.flags);
        }
    }
    Ok(old)
}

fn swap_thermal(
    board: &mut Board,
    obj: ObjRef,
    layer: usize,
    style: core_model::ThermalStyle,
) -> Result<core_model::ThermalStyle> {
    let mut old = core_model::ThermalStyle::None;
    let mut set = |flags: &mut core_model::Flags| {
        old = flags.thermals.get(layer);
        flags.thermals.set(layer, style);
    };
    match obj {
        ObjRef::Via(id) => with_via(board, id, |v| set(&mut v.flags))?,
        ObjRef::Pin(id) => with_pin(board, id, |p| set(&mut p.flags))?,
        ObjRef::Pad(id) => with_pad(board, id, |p| set(&mut p.flags))?,
        _ => return Err(ApplyError::Unsupported("thermal change")),
    }
    Ok(old)
}

fn move_between_layers(board: &mut Board, obj: ObjRef, to_layer: usize) -> Result<UndoKind> {
    if to_layer >= board.data.layers.len() {
        return Err(ApplyError::Missing("target layer"));
    }
    match obj {
        ObjRef::Line { layer, id } => {
            let line =
                ops::remove_line(&mut board.data, layer, id).ok_or(ApplyError::Missing("line"))?;
            ops::insert_line(&mut board.data, to_layer, line);
            Ok(UndoKind::ChangeLayer {
                obj: ObjRef::Line {
                    layer: to_layer,
                    id,
                },
                to_layer: layer,
            })
        }
        ObjRef::Arc { layer, id } => {
            let arc =
                ops::remove_arc(&mut board.data, layer, id).ok_or(ApplyError::Missing("arc"))?;
            ops::insert_arc(&mut board.data, to_layer, arc);
            Ok(UndoKind::ChangeLayer {
                obj: ObjRef::Arc {
                    layer: to_layer,
                    id,
                },
                to_layer: layer,
            })
        }
        ObjRef::Text { layer, id } => {
            let text =
                ops::remove_text(&mut board.data, layer, id).ok_or(ApplyError::Missing("text"))?;
            ops::insert_text(&mut board.data, to_layer, text);
            Ok(UndoKind::ChangeLayer {
                obj: ObjRef::Text {
                    layer: to_layer,
                    id,
                },
                to_layer: layer,
            })
        }
        ObjRef::Polygon { layer, id } => {
            let poly = ops::remove_polygon(&mut board.data, layer, id)
                .ok_or(ApplyError::Missing("polygon"))?;
            ops::insert_polygon(&mut board.data, to_layer, poly);
            Ok(UndoKind::ChangeLayer {
                obj: ObjRef::Polygon {
                    layer: to_layer,
                    id,
                },
                to_layer: layer,
            })
        }
        _ => Err(ApplyError::Unsupported("layer change")),
    }
}

// --- with_* wrappers --------------------------------------------------------

fn with_via(
    board: &mut Board,
    id: ObjectId,
    f: impl FnOnce(&mut core_model::Via),
) -> Result<()> {
    let pos = board
        .data
        .vias
        .iter()
        .position(|v| v.id == id)
        .ok_or(ApplyError::Missing("via"))?;
    let old_box = board.data.vias[pos].bbox;
    f(&mut board.data.vias[pos]);
    board.data.vias[pos].update_bbox();
    let new_box = board.data.vias[pos].bbox;
    board.data.via_tree.delete(old_box, id);
    board.data.via_tree.insert(new_box, id);
    clip::mark_dirty_overlapping(&mut board.data, old_box.union(&new_box), None);
    Ok(())
}

fn with_pin(
    board: &mut Board,
    id: ObjectId,
    f: impl FnOnce(&mut core_model::Via),
) -> Result<()> {
    let eid = board
        .data
        .parent_element(id)
        .map(|e| e.id)
        .ok_or(ApplyError::Missing("pin"))?;
    let mut boxes = None;
    if let Some(e) = board.data.element_mut(eid) {
        let old_elem_box = e.bbox;
        if let Some(p) = e.pins.iter_mut().find(|p| p.id == id) {
            let old_box = p.bbox;
            f(p);
            p.update_bbox();
            let new_box = p.bbox;
            e.bbox = e.compute_bbox();
            boxes = Some((old_box, new_box, old_elem_box, e.bbox));
        }
    }
    let (old_box, new_box, old_elem_box, new_elem_box) =
        boxes.ok_or(ApplyError::Missing("pin"))?;
    board.data.pin_tree.delete(old_box, id);
    board.data.pin_tree.insert(new_box, id);
    board.data.element_tree.delete(old_elem_box, eid);
    board.data.element_tree.insert(new_elem_box, eid);
    clip::mark_dirty_overlapping(&mut board.data, old_box.union(&new_box), None);
    Ok(())
}

fn with_pad(
    board: &mut Board,
    id: ObjectId,
    f: impl FnOnce(&mut core_model::Pad),
) -> Result<()> {
    let eid = board
        .data
        .parent_element(id)
        .map(|e| e.id)
        .ok_or(ApplyError::Missing("pad"))?;
    let mut boxes = None;
    if let Some(e) = board.data.element_mut(eid) {
        let old_elem_box = e.bbox;
        if let Some(p) = e.pads.iter_mut().find(|p| p.id == id) {
            let old_box = p.bbox;
            let old_side = if p.on_solder_side() {
                core_model::BOTTOM_SIDE
            } else {
                core_model::TOP_SIDE
            };
            f(p);
            p.update_bbox();
            let new_side = if p.on_solder_side() {
                core_model::BOTTOM_SIDE
            } else {
                core_model::TOP_SIDE
            };
            let new_box = p.bbox;
            e.bbox = e.compute_bbox();
            boxes = Some((old_box, new_box, old_side, new_side, old_elem_box, e.bbox));
        }
    }
    let (old_box, new_box, old_side, new_side, old_elem_box, new_elem_box) =
        boxes.ok_or(ApplyError::Missing("pad"))?;
    board.data.pad_tree[old_side].delete(old_box, id);
    board.data.pad_tree[new_side].insert(new_box, id);
    board.data.element_tree.delete(old_elem_box, eid);
    board.data.element_tree.insert(new_elem_box, eid);
    clip::mark_dirty_overlapping(&mut board.data, old_box.union(&new_box), None);
    Ok(())
}

fn with_line(
    board: &mut Board,
    layer: usize,
    id: ObjectId,
    f: impl FnOnce(&mut core_model::Line),
) -> Result<()> {
    let l = board
        .data
        .layers
        .get_mut(layer)
        .ok_or(ApplyError::Missing("layer"))?;
    let line = l.line_mut(id).ok_or(ApplyError::Missing("line"))?;
    let old_box = line.bbox;
    f(line);
    line.update_bbox();
    let new_box = line.bbox;
    l.line_tree.delete(old_box, id);
    l.line_tree.insert(new_box, id);
    clip::mark_dirty_overlapping(&mut board.data, old_box.union(&new_box), Some(layer));
    Ok(())
}

fn with_arc(
    board: &mut Board,
    layer: usize,
    id: ObjectId,
    f: impl FnOnce(&mut core_model::Arc),
) -> Result<()> {
    let l = board
        .data
        .layers
        .get_mut(layer)
        .ok_or(ApplyError::Missing("layer"))?;
    let arc = l.arc_mut(id).ok_or(ApplyError::Missing("arc"))?;
    let old_box = arc.bbox;
    f(arc);
    arc.update_bbox();
    let new_box = arc.bbox;
    l.arc_tree.delete(old_box, id);
    l.arc_tree.insert(new_box, id);
    clip::mark_dirty_overlapping(&mut board.data, old_box.union(&new_box), Some(layer));
    Ok(())
}

fn with_text(
    board: &mut Board,
    layer: usize,
    id: ObjectId,
    f: impl FnOnce(&mut core_model::Text),
) -> Result<()> {
    let l = board
        .data
        .layers
        .get_mut(layer)
        .ok_or(ApplyError::Missing("layer"))?;
    let text = l.text_mut(id).ok_or(ApplyError::Missing("text"))?;
    let old_box = text.bbox;
    f(text);
    text.update_bbox();
    let new_box = text.bbox;
    l.text_tree.delete(old_box, id);
    l.text_tree.insert(new_box, id);
    clip::mark_dirty_overlapping(&mut board.data, old_box.union(&new_box), Some(layer));
    Ok(())
}

fn with_element_name(
    board: &mut Board,
    element: ObjectId,
    slot: usize,
    f: impl FnOnce(&mut core_model::Text),
) -> Result<()> {
    if slot >= 3 {
        return Err(ApplyError::Missing("name slot"));
    }
    let mut boxes = None;
    if let Some(e) = board.data.element_mut(element) {
        let t = &mut e.names[slot];
        let old_box = t.bbox;
        let tid = t.id;
        f(t);
        t.update_bbox();
        boxes = Some((old_box, t.bbox, tid));
    }
    let (old_box, new_box, tid) = boxes.ok_or(ApplyError::Missing("element"))?;
    board.data.name_tree[slot].delete(old_box, tid);
    board.data.name_tree[slot].insert(new_box, tid);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_geom::Point;
    use core_model::flags::{Flags, ObjectFlags};

    fn board() -> Board {
        Board::new(2, 1_000_000, 1_000_000)
    }

    #[test]
    fn move_inverts_exactly() {
        let mut b = board();
        let id = ops::create_via(
            &mut b.data,
            Point::new(10_000, 10_000),
            4000,
            2000,
            0,
            2000,
            None,
            Flags::default(),
        );
        ops::move_via(&mut b.data, id, 500, -300);
        let entry = UndoKind::Move {
            obj: ObjRef::Via(id),
            dx: 500,
            dy: -300,
        };
        let inverse = apply(&mut b, entry).expect("applies");
        assert_eq!(
            b.data.via(id).map(|v| v.pos),
            Some(Point::new(10_000, 10_000))
        );
        apply(&mut b, inverse).expect("applies");
        assert_eq!(
            b.data.via(id).map(|v| v.pos),
            Some(Point::new(10_500, 9_700))
        );
    }

    #[test]
    fn size_swap_round_trips_and_tree_follows() {
        let mut b = board();
        let id = ops::create_line(
            &mut b.data,
            0,
            Point::new(0, 0),
            Point::new(10_000, 0),
            2000,
            1000,
            Flags::default(),
        )
        .expect("line");
        // Pretend the action changed thickness 2000 -> 6000, journaling the
        // old value.
        if let Some(l) = b.data.layers[0].line_mut(id) {
            l.thickness = 6000;
            l.update_bbox();
        }
        b.data.rebuild_trees();
        let inverse = apply(
            &mut b,
            UndoKind::ChangeSize {
                obj: ObjRef::Line { layer: 0, id },
                value: 2000,
            },
        )
        .expect("applies");
        let line = b.data.layers[0].line(id).expect("line");
        assert_eq!(line.thickness, 2000);
        assert_eq!(line.bbox, line.compute_bbox());
        assert_eq!(b.data.layers[0].line_tree.query(&line.bbox).len(), 1);
        match inverse {
            UndoKind::ChangeSize { value, .. } => assert_eq!(value, 6000),
            other => panic!("unexpected inverse {other:?}"),
        }
    }

    #[test]
    fn flag_swap_preserves_thermals() {
        let mut b = board();
        let id = ops::create_via(
            &mut b.data,
            Point::new(10_000, 10_000),
            4000,
            2000,
            0,
            2000,
            None,
            Flags::new(ObjectFlags::SELECTED),
        );
        if let Some(v) = b.data.via_mut(id) {
            v.flags.thermals.set(0, core_model::ThermalStyle::Solid);
        }
        apply(
            &mut b,
            UndoKind::ChangeFlags {
                obj: ObjRef::Via(id),
                word: ObjectFlags::empty(),
            },
        )
        .expect("applies");
        let v = b.data.via(id).expect("via");
        assert!(v.flags.word.is_empty());
        assert_eq!(v.flags.thermals.get(0), core_model::ThermalStyle::Solid);
    }

    #[test]
    fn missing_object_is_an_error() {
        let mut b = board();
        let err = apply(
            &mut b,
            UndoKind::Move {
                obj: ObjRef::Via(999),
                dx: 1,
                dy: 1,
            },
        );
        assert!(err.is_err());
    }

    #[test]
    fn layer_change_round_trips() {
        let mut b = board();
        let id = ops::create_line(
            &mut b.data,
            0,
            Point::new(0, 0),
            Point::new(10_000, 0),
            2000,
            1000,
            Flags::default(),
        )
        .expect("line");
        // The live action moved it 0 -> 1; journal reverses.
        let line = ops::remove_line(&mut b.data, 0, id).expect("detach");
        ops::insert_line(&mut b.data, 1, line);
        let inverse = apply(
            &mut b,
            UndoKind::ChangeLayer {
                obj: ObjRef::Line { layer: 1, id },
                to_layer: 0,
            },
        )
        .expect("applies");
        assert!(b.data.layers[0].line(id).is_some());
        assert!(b.data.layers[1].line(id).is_none());
        apply(&mut b, inverse).expect("applies");
        assert!(b.data.layers[1].line(id).is_some());
    }
}
