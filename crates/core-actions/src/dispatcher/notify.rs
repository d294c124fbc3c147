//! The per-mode click state machine.
//!
//! `notify` is what a click means: depending on the active tool it places,
//! advances an in-progress object, picks something up, or commits a move.
//! Every committed mutation is journaled before the serial closes, so one
//! click is one undo group.

use crate::crosshair::{DrawState, InsertScaffolding, Mode};
use crate::search::{self, Hit};
use crate::select;
use crate::{ActionError, Context, buffer, lineclip, rubberband};
use core_geom::{Coord, Point};
use core_model::entity::{ObjectId, ObjectType};
use core_model::flags::{Flags, ObjectFlags, ThermalStyle};
use core_model::transform::RotateTarget;
use core_model::{clip, ops};
use core_state::{Detached, ObjRef, PointRef, UndoKind};
use tracing::debug;

/// Default pick slop around a click.
const SLOP: Coord = 5 * core_geom::MIL;

/// Kinds the remove tool deletes.
const REMOVE_TYPES: ObjectType = ObjectType::VIA
    .union(ObjectType::LINE)
    .union(ObjectType::ARC)
    .union(ObjectType::TEXT)
    .union(ObjectType::POLYGON)
    .union(ObjectType::ELEMENT)
    .union(ObjectType::RATLINE);

/// Kinds the move and copy tools pick up.
const MOVE_TYPES: ObjectType = REMOVE_TYPES
    .union(ObjectType::LINEPOINT)
    .union(ObjectType::POLYGONPOINT)
    .union(ObjectType::ELEMENTNAME);

const COPY_TYPES: ObjectType = ObjectType::VIA
    .union(ObjectType::LINE)
    .union(ObjectType::ARC)
    .union(ObjectType::TEXT)
    .union(ObjectType::POLYGON)
    .union(ObjectType::ELEMENT);

const SELECT_TYPES: ObjectType = REMOVE_TYPES
    .union(ObjectType::PIN)
    .union(ObjectType::PAD)
    .union(ObjectType::ELEMENTNAME);

const INSERT_TYPES: ObjectType = ObjectType::LINE.union(ObjectType::POLYGON);

pub(crate) fn notify(ctx: &mut Context) -> Result<(), ActionError> {
    let pos = ctx.crosshair.pos;
    ctx.crosshair.note.pos = pos;
    debug!(target: "dispatch", mode = ?ctx.crosshair.mode, x = pos.x, y = pos.y, "notify");
    match ctx.crosshair.mode {
        Mode::None => Ok(()),
        Mode::Via => notify_via(ctx, pos),
        Mode::Line => notify_line(ctx, pos),
        Mode::Rectangle => notify_rectangle(ctx, pos),
        Mode::Polygon => notify_polygon(ctx, pos),
        Mode::PolygonHole => notify_polygon_hole(ctx, pos),
        Mode::PasteBuffer => notify_paste(ctx, pos),
        Mode::Text => notify_text(ctx, pos),
        Mode::Rotate => notify_rotate(ctx, pos, 1),
        Mode::Remove => notify_remove(ctx, pos),
        Mode::Move | Mode::RubberbandMove => notify_move_copy(ctx, pos, false),
        Mode::Copy => notify_move_copy(ctx, pos, true),
        Mode::InsertPoint => notify_insert_point(ctx, pos),
        Mode::Thermal => notify_thermal(ctx, pos),
        Mode::Arc => notify_arc(ctx, pos),
        Mode::Arrow => notify_arrow(ctx, pos),
        Mode::Lock => notify_lock(ctx, pos),
    }
}

fn new_line_flags(ctx: &Context) -> Flags {
    let mut word = ObjectFlags::empty();
    if ctx
        .board
        .flags
        .contains(core_model::BoardFlags::CLEARNEW)
    {
        word |= ObjectFlags::CLEARLINE;
    }
    Flags::new(word)
}

fn notify_via(ctx: &mut Context, pos: Point) -> Result<(), ActionError> {
    if !ctx.board.via_on {
        ctx.message("You must turn via visibility on before you can place vias");
        return Ok(());
    }
    let id = ops::create_via(
        &mut ctx.board.data,
        pos,
        ctx.settings.via_thickness,
        2 * ctx.settings.keepaway,
        0,
        ctx.settings.via_drilling_hole,
        None,
        Flags::default(),
    );
    ctx.journal.add(UndoKind::Create(ObjRef::Via(id)));
    ctx.journal.inc_serial();
    clip::reclip_dirty(&mut ctx.board);
    ctx.board.changed = true;
    ctx.hid.invalidate_all();
    Ok(())
}

fn commit_line_segment(ctx: &mut Context, from: Point, to: Point) -> Option<ObjectId> {
    if from == to {
        return None;
    }
    let flags = new_line_flags(ctx);
    let id = ops::create_line(
        &mut ctx.board.data,
        ctx.current_layer,
        from,
        to,
        ctx.settings.line_thickness,
        2 * ctx.settings.keepaway,
        flags,
    )?;
    ctx.journal.add(UndoKind::Create(ObjRef::Line {
        layer: ctx.current_layer,
        id,
    }));
    Some(id)
}

fn notify_line(ctx: &mut Context, pos: Point) -> Result<(), ActionError> {
    match ctx.crosshair.attached_line.state {
        DrawState::First => {
            ctx.crosshair.attached_line.point1 = pos;
            ctx.crosshair.attached_line.point2 = pos;
            ctx.crosshair.attached_line.state = DrawState::Second;
            Ok(())
        }
        DrawState::Second | DrawState::Third => {
            let anchor = ctx.crosshair.attached_line.point1;
            if pos == anchor {
                // Zero-length lines are refused; the anchor stays armed.
                return Err(ctx.fail(ActionError::Geometry("line has identical endpoints")));
            }
            let bend = lineclip::clip_line(anchor, pos, ctx.clipping);
            let first_target = bend.unwrap_or(pos);
            commit_line_segment(ctx, anchor, first_target);
            // A layer-group change since the last segment plants a via at
            // the joint unless a pin-like conductor already sits there.
            if ctx.board.via_on
                && ctx.board.groups.group_of(ctx.current_layer)
                    != ctx.board.groups.group_of(ctx.last_layer)
                && search::search_screen(
                    &ctx.board,
                    ctx.current_layer,
                    anchor,
                    ctx.settings.via_thickness / 2,
                    ObjectType::PIN_TYPES,
                )
                .is_none()
            {
                let vid = ops::create_via(
                    &mut ctx.board.data,
                    anchor,
                    ctx.settings.via_thickness,
                    2 * ctx.settings.keepaway,
                    0,
                    ctx.settings.via_drilling_hole,
                    None,
                    Flags::default(),
                );
                ctx.journal.add(UndoKind::Create(ObjRef::Via(vid)));
            }
            if let Some(bend) = bend {
                commit_line_segment(ctx, bend, pos);
            }
            ctx.last_layer = ctx.current_layer;
            ctx.crosshair.attached_line.point1 = pos;
            ctx.crosshair.attached_line.point2 = pos;
            ctx.crosshair.attached_line.state = DrawState::Third;
            if ctx
                .board
                .flags
                .contains(core_model::BoardFlags::SWAPSTARTDIR)
            {
                ctx.clipping = ctx.clipping.swapped();
            }
            ctx.journal.inc_serial();
            clip::reclip_dirty(&mut ctx.board);
            ctx.board.changed = true;
            ctx.hid.invalidate_all();
            Ok(())
        }
    }
}

fn notify_rectangle(ctx: &mut Context, pos: Point) -> Result<(), ActionError> {
    match ctx.crosshair.attached_box.state {
        DrawState::First => {
            ctx.crosshair.attached_box.point1 = pos;
            ctx.crosshair.attached_box.point2 = pos;
            ctx.crosshair.attached_box.state = DrawState::Second;
            Ok(())
        }
        DrawState::Second | DrawState::Third => {
            let p1 = ctx.crosshair.attached_box.point1;
            if p1.x == pos.x || p1.y == pos.y {
                return Err(ctx.fail(ActionError::Geometry("degenerate rectangle")));
            }
            let mut word = ObjectFlags::CLEARPOLY;
            if ctx
                .board
                .flags
                .contains(core_model::BoardFlags::NEWFULLPOLY)
            {
                word |= ObjectFlags::FULLPOLY;
            }
            let (x1, x2) = (p1.x.min(pos.x), p1.x.max(pos.x));
            let (y1, y2) = (p1.y.min(pos.y), p1.y.max(pos.y));
            let id = ops::create_polygon(
                &mut ctx.board.data,
                ctx.current_layer,
                vec![
                    Point::new(x1, y1),
                    Point::new(x2, y1),
                    Point::new(x2, y2),
                    Point::new(x1, y2),
                ],
                vec![],
                Flags::new(word),
            );
            if let Some(id) = id {
                ctx.journal.add(UndoKind::Create(ObjRef::Polygon {
                    layer: ctx.current_layer,
                    id,
                }));
                ctx.journal.inc_serial();
                clip::reclip_dirty(&mut ctx.board);
                ctx.board.changed = true;
                ctx.hid.invalidate_all();
            }
            ctx.crosshair.attached_box.state = DrawState::First;
            Ok(())
        }
    }
}

fn close_attached_polygon(ctx: &mut Context) -> Option<ObjectId> {
    let points = std::mem::take(&mut ctx.crosshair.attached_polygon);
    let mut word = ObjectFlags::CLEARPOLY;
    if ctx
        .board
        .flags
        .contains(core_model::BoardFlags::NEWFULLPOLY)
    {
        word |= ObjectFlags::FULLPOLY;
    }
    let id = ops::create_polygon(
        &mut ctx.board.data,
        ctx.current_layer,
        points,
        vec![],
        Flags::new(word),
    )?;
    ctx.journal.add(UndoKind::Create(ObjRef::Polygon {
        layer: ctx.current_layer,
        id,
    }));
    ctx.journal.inc_serial();
    clip::reclip_dirty(&mut ctx.board);
    ctx.board.changed = true;
    ctx.hid.invalidate_all();
    Some(id)
}

fn notify_polygon(ctx: &mut Context, pos: Point) -> Result<(), ActionError> {
    let points = &ctx.crosshair.attached_polygon;
    if points.len() >= 3 && points[0] == pos {
        close_attached_polygon(ctx);
        return Ok(());
    }
    if points.last() != Some(&pos) {
        ctx.crosshair.attached_polygon.push(pos);
    }
    Ok(())
}

fn notify_polygon_hole(ctx: &mut Context, pos: Point) -> Result<(), ActionError> {
    if ctx.crosshair.attached_object.state == DrawState::First {
        let Some(hit) = search::search_screen(
            &ctx.board,
            ctx.current_layer,
            pos,
            0,
            ObjectType::POLYGON | ObjectType::LOCKED,
        ) else {
            ctx.message("The first point of a polygon hole must be on a polygon");
            return Ok(());
        };
        if hit.locked(&ctx.board) {
            return Err(ctx.fail(ActionError::Locked));
        }
        ctx.crosshair.attached_object.hit = Some(hit);
        ctx.crosshair.attached_object.state = DrawState::Second;
        // The first click is also the first hole point; fall through.
    }
    let points = &ctx.crosshair.attached_polygon;
    if points.len() >= 3 && points[0] == pos {
        let Some(Hit::Polygon { layer, id }) = ctx.crosshair.attached_object.hit else {
            ctx.crosshair.clear_attached();
            return Ok(());
        };
        let hole_points = std::mem::take(&mut ctx.crosshair.attached_polygon);
        cut_hole(ctx, layer, id, hole_points)?;
        ctx.crosshair.attached_object.reset();
        return Ok(());
    }
    if points.last() != Some(&pos) {
        ctx.crosshair.attached_polygon.push(pos);
    }
    Ok(())
}

/// Subtract a closed contour from a polygon: the result's islands replace
/// the original under a single undo serial.
fn cut_hole(
    ctx: &mut Context,
    layer: usize,
    id: ObjectId,
    hole_points: Vec<Point>,
) -> Result<(), ActionError> {
    let Some(poly) = ctx.board.data.layers[layer].polygon(id) else {
        return Err(ctx.fail(ActionError::NotFound("polygon")));
    };
    let flags = poly.flags;
    let Ok(declared) = poly.declared_shape() else {
        return Err(ctx.fail(ActionError::Geometry("degenerate polygon")));
    };
    let Ok(hole) = core_poly::PolyArea::from_contour(hole_points) else {
        return Err(ctx.fail(ActionError::Geometry("degenerate hole contour")));
    };
    let result = declared.subtract(&hole);
    for island in &result.islands {
        let mut points = island.outer.points.clone();
        let mut holes = Vec::new();
        for h in &island.holes {
            holes.push(points.len());
            points.extend(h.points.iter().copied());
        }
        if let Some(nid) =
            ops::create_polygon(&mut ctx.board.data, layer, points, holes, flags)
        {
            ctx.journal.add(UndoKind::Create(ObjRef::Polygon {
                layer,
                id: nid,
            }));
        }
    }
    if let Some(old) = ops::remove_polygon(&mut ctx.board.data, layer, id) {
        ctx.journal.add(UndoKind::Remove(Detached::Polygon {
            layer,
            polygon: old,
        }));
    }
    ctx.journal.inc_serial();
    clip::reclip_dirty(&mut ctx.board);
    ctx.board.changed = true;
    ctx.hid.invalidate_all();
    Ok(())
}

fn notify_paste(ctx: &mut Context, pos: Point) -> Result<(), ActionError> {
    let buf = ctx.buffers.current_buffer().clone();
    if buf.is_empty() {
        ctx.message("The buffer is empty");
        return Ok(());
    }
    buffer::to_layout(&buf, &mut ctx.board, &mut ctx.journal, pos);
    ctx.journal.inc_serial();
    clip::reclip_dirty(&mut ctx.board);
    ctx.board.changed = true;
    ctx.hid.invalidate_all();
    Ok(())
}

fn notify_text(ctx: &mut Context, pos: Point) -> Result<(), ActionError> {
    let Some(string) = ctx.hid.prompt_for("Enter text:", "") else {
        return Ok(());
    };
    if string.is_empty() {
        return Ok(());
    }
    let mut word = ObjectFlags::CLEARLINE;
    if ctx
        .board
        .groups
        .layer_on_side(ctx.current_layer, core_model::BOTTOM_SIDE)
    {
        word |= ObjectFlags::ONSOLDER;
    }
    let id = ops::create_text(
        &mut ctx.board.data,
        ctx.current_layer,
        pos,
        0,
        ctx.settings.text_scale,
        string,
        0,
        Flags::new(word),
    );
    if let Some(id) = id {
        ctx.journal.add(UndoKind::Create(ObjRef::Text {
            layer: ctx.current_layer,
            id,
        }));
        ctx.journal.inc_serial();
        clip::reclip_dirty(&mut ctx.board);
        ctx.board.changed = true;
        ctx.hid.invalidate_all();
    }
    Ok(())
}

fn rotate_target_of(hit: &Hit) -> Option<RotateTarget> {
    Some(match *hit {
        Hit::Via { id } => RotateTarget::Via(id),
        Hit::Element { id } => RotateTarget::Element(id),
        Hit::Line { layer, id } => RotateTarget::Line { layer, id },
        Hit::Arc { layer, id } => RotateTarget::Arc { layer, id },
        Hit::Text { layer, id } => RotateTarget::Text { layer, id },
        Hit::Polygon { layer, id } => RotateTarget::Polygon { layer, id },
        _ => return None,
    })
}

pub(crate) fn notify_rotate(ctx: &mut Context, pos: Point, steps: u8) -> Result<(), ActionError> {
    let Some(hit) = search::search_screen(
        &ctx.board,
        ctx.current_layer,
        pos,
        SLOP,
        ObjectType::ELEMENT
            | ObjectType::VIA
            | ObjectType::LINE
            | ObjectType::ARC
            | ObjectType::TEXT
            | ObjectType::POLYGON
            | ObjectType::LOCKED,
    ) else {
        return Ok(());
    };
    if hit.locked(&ctx.board) {
        return Err(ctx.fail(ActionError::Locked));
    }
    let Some(target) = rotate_target_of(&hit) else {
        return Ok(());
    };
    if core_model::transform::rotate_object_90(&mut ctx.board.data, target, pos, steps) {
        ctx.journal.add(UndoKind::Rotate {
            target,
            center: pos,
            steps,
        });
        ctx.journal.inc_serial();
        clip::reclip_dirty(&mut ctx.board);
        ctx.board.changed = true;
        ctx.hid.invalidate_all();
    }
    Ok(())
}

/// Detach a whole entity, journaling its removal.
pub(crate) fn remove_hit(ctx: &mut Context, hit: &Hit) -> bool {
    let data = &mut ctx.board.data;
    let entry = match *hit {
        Hit::Via { id } => ops::remove_via(data, id).map(Detached::Via),
        Hit::Element { id } => {
            // Rats hanging off the element's pins and pads go with it.
            let mut rat_ids: Vec<ObjectId> = Vec::new();
            if let Some(e) = data.element(id) {
                let mut anchors: Vec<Point> = e.pins.iter().map(|p| p.pos).collect();
                anchors.extend(e.pads.iter().flat_map(|p| [p.point1, p.point2]));
                for p in anchors {
                    for (rid, _) in rubberband::rats_at_point(&ctx.board, p, SLOP) {
                        if !rat_ids.contains(&rid) {
                            rat_ids.push(rid);
                        }
                    }
                }
            }
            for rid in rat_ids {
                if let Some(rat) = ops::remove_rat(&mut ctx.board.data, rid) {
                    ctx.journal.add(UndoKind::Remove(Detached::Rat(rat)));
                }
            }
            ops::remove_element(&mut ctx.board.data, id).map(Detached::Element)
        }
        Hit::Rat { id } => ops::remove_rat(data, id).map(Detached::Rat),
        Hit::Line { layer, id } | Hit::LinePoint { layer, id, .. } => {
            ops::remove_line(data, layer, id).map(|line| Detached::Line { layer, line })
        }
        Hit::Arc { layer, id } => {
            ops::remove_arc(data, layer, id).map(|arc| Detached::Arc { layer, arc })
        }
        Hit::Text { layer, id } => {
            ops::remove_text(data, layer, id).map(|text| Detached::Text { layer, text })
        }
        Hit::Polygon { layer, id } | Hit::PolygonPoint { layer, id, .. } => {
            ops::remove_polygon(data, layer, id).map(|polygon| Detached::Polygon { layer, polygon })
        }
        Hit::Pin { .. } | Hit::Pad { .. } | Hit::ElementName { .. } => None,
    };
    match entry {
        Some(det) => {
            ctx.journal.add(UndoKind::Remove(det));
            true
        }
        None => false,
    }
}

fn notify_remove(ctx: &mut Context, pos: Point) -> Result<(), ActionError> {
    let Some(hit) = search::search_screen(
        &ctx.board,
        ctx.current_layer,
        pos,
        SLOP,
        REMOVE_TYPES | ObjectType::LOCKED,
    ) else {
        return Ok(());
    };
    if hit.locked(&ctx.board) {
        return Err(ctx.fail(ActionError::Locked));
    }
    if remove_hit(ctx, &hit) {
        ctx.journal.inc_serial();
        clip::reclip_dirty(&mut ctx.board);
        ctx.board.changed = true;
        ctx.hid.invalidate_all();
    }
    Ok(())
}

fn move_whole_object(ctx: &mut Context, hit: &Hit, dx: Coord, dy: Coord) -> bool {
    let Some(obj) = hit.obj_ref() else {
        return false;
    };
    let data = &mut ctx.board.data;
    let moved = match *hit {
        Hit::Via { id } => ops::move_via(data, id, dx, dy),
        Hit::Element { id } => ops::move_element(data, id, dx, dy),
        Hit::Line { layer, id } => ops::move_line(data, layer, id, dx, dy),
        Hit::Arc { layer, id } => ops::move_arc(data, layer, id, dx, dy),
        Hit::Text { layer, id } => ops::move_text(data, layer, id, dx, dy),
        Hit::Polygon { layer, id } => ops::move_polygon(data, layer, id, dx, dy),
        _ => false,
    };
    if moved {
        ctx.journal.add(UndoKind::Move { obj, dx, dy });
    }
    moved
}

fn move_sub_object(ctx: &mut Context, hit: &Hit, dx: Coord, dy: Coord) -> bool {
    match *hit {
        Hit::LinePoint { layer, id, second } => {
            if ops::move_line_point(&mut ctx.board.data, layer, id, second, dx, dy) {
                ctx.journal.add(UndoKind::MovePoint {
                    point: PointRef::LinePoint { layer, id, second },
                    dx,
                    dy,
                });
                true
            } else {
                false
            }
        }
        Hit::PolygonPoint { layer, id, idx } => {
            if ops::move_polygon_point(&mut ctx.board.data, layer, id, idx, dx, dy) {
                ctx.journal.add(UndoKind::MovePoint {
                    point: PointRef::PolygonPoint { layer, id, idx },
                    dx,
                    dy,
                });
                true
            } else {
                false
            }
        }
        Hit::ElementName { element, slot } => {
            let moved = ctx
                .board
                .data
                .element_mut(element)
                .map(|e| {
                    e.names[slot].pos.x += dx;
                    e.names[slot].pos.y += dy;
                    e.names[slot].update_bbox();
                })
                .is_some();
            if moved {
                ctx.board.data.rebuild_trees();
                ctx.journal.add(UndoKind::Move {
                    obj: ObjRef::ElementName { element, slot },
                    dx,
                    dy,
                });
            }
            moved
        }
        _ => false,
    }
}

fn notify_move_copy(ctx: &mut Context, pos: Point, copying: bool) -> Result<(), ActionError> {
    match ctx.crosshair.attached_object.state {
        DrawState::First => {
            let mask = if copying { COPY_TYPES } else { MOVE_TYPES };
            let Some(hit) = search::search_screen(
                &ctx.board,
                ctx.current_layer,
                pos,
                SLOP,
                mask | ObjectType::LOCKED,
            ) else {
                return Ok(());
            };
            if !copying && hit.locked(&ctx.board) {
                return Err(ctx.fail(ActionError::Locked));
            }
            ctx.crosshair.attached_object.hit = Some(hit);
            ctx.crosshair.attached_object.x = pos.x;
            ctx.crosshair.attached_object.y = pos.y;
            let rubber = if !copying
                && (ctx.crosshair.mode == Mode::RubberbandMove
                    || ctx
                        .board
                        .flags
                        .contains(core_model::BoardFlags::RUBBERBAND))
            {
                rubberband::collect(&ctx.board, &hit)
            } else {
                Vec::new()
            };
            ctx.crosshair.attached_object.rubberband = rubber;
            ctx.crosshair.attached_object.state = DrawState::Second;
            Ok(())
        }
        DrawState::Second | DrawState::Third => {
            let Some(hit) = ctx.crosshair.attached_object.hit else {
                ctx.crosshair.attached_object.reset();
                return Ok(());
            };
            let dx = pos.x - ctx.crosshair.attached_object.x;
            let dy = pos.y - ctx.crosshair.attached_object.y;
            if copying {
                copy_object(ctx, &hit, dx, dy);
            } else {
                let rubber = std::mem::take(&mut ctx.crosshair.attached_object.rubberband);
                if !move_whole_object(ctx, &hit, dx, dy) {
                    move_sub_object(ctx, &hit, dx, dy);
                }
                for attach in rubber {
                    if ops::move_line_point(
                        &mut ctx.board.data,
                        attach.layer,
                        attach.line,
                        attach.second_point,
                        dx,
                        dy,
                    ) {
                        ctx.journal.add(UndoKind::MovePoint {
                            point: PointRef::LinePoint {
                                layer: attach.layer,
                                id: attach.line,
                                second: attach.second_point,
                            },
                            dx,
                            dy,
                        });
                    }
                }
            }
            ctx.journal.inc_serial();
            clip::reclip_dirty(&mut ctx.board);
            ctx.board.changed = true;
            ctx.hid.invalidate_all();
            ctx.crosshair.attached_object.reset();
            Ok(())
        }
    }
}

fn copy_object(ctx: &mut Context, hit: &Hit, dx: Coord, dy: Coord) {
    let data = &mut ctx.board.data;
    let entry = match *hit {
        Hit::Via { id } => {
            let via = data.via(id).cloned();
            via.map(|v| {
                let nid = buffer::copy_via_into(data, &v, dx, dy);
                UndoKind::Create(ObjRef::Via(nid))
            })
        }
        Hit::Element { id } => {
            let e = data.element(id).cloned();
            e.map(|e| {
                let nid = buffer::copy_element_into(data, &e, dx, dy);
                UndoKind::Create(ObjRef::Element(nid))
            })
        }
        Hit::Line { layer, id } => {
            let x = data.layers[layer].line(id).cloned();
            x.map(|x| {
                let nid = buffer::copy_line_into(data, layer, &x, dx, dy);
                UndoKind::Create(ObjRef::Line { layer, id: nid })
            })
        }
        Hit::Arc { layer, id } => {
            let x = data.layers[layer].arc(id).cloned();
            x.map(|x| {
                let nid = buffer::copy_arc_into(data, layer, &x, dx, dy);
                UndoKind::Create(ObjRef::Arc { layer, id: nid })
            })
        }
        Hit::Text { layer, id } => {
            let x = data.layers[layer].text(id).cloned();
            x.map(|x| {
                let nid = buffer::copy_text_into(data, layer, &x, dx, dy);
                UndoKind::Create(ObjRef::Text { layer, id: nid })
            })
        }
        Hit::Polygon { layer, id } => {
            let x = data.layers[layer].polygon(id).cloned();
            x.map(|x| {
                let nid = buffer::copy_polygon_into(data, layer, &x, dx, dy);
                UndoKind::Create(ObjRef::Polygon { layer, id: nid })
            })
        }
        _ => None,
    };
    if let Some(entry) = entry {
        ctx.journal.add(entry);
    }
}

fn notify_insert_point(ctx: &mut Context, pos: Point) -> Result<(), ActionError> {
    match ctx.crosshair.attached_object.state {
        DrawState::First => {
            let Some(hit) = search::search_screen(
                &ctx.board,
                ctx.current_layer,
                pos,
                SLOP,
                INSERT_TYPES | ObjectType::LOCKED,
            ) else {
                return Ok(());
            };
            if hit.locked(&ctx.board) {
                return Err(ctx.fail(ActionError::Locked));
            }
            let insert = match hit {
                Hit::Polygon { layer, id } => {
                    let Some(poly) = ctx.board.data.layers[layer].polygon(id) else {
                        return Ok(());
                    };
                    // Nearest contour point decides which segment the new
                    // point slides along.
                    let (idx, _) = poly
                        .points
                        .iter()
                        .enumerate()
                        .map(|(i, p)| (i, core_geom::distance(pos, *p)))
                        .min_by(|a, b| a.1.total_cmp(&b.1))
                        .unwrap_or((0, 0.0));
                    let prev = poly.prev_contour_point(idx);
                    InsertScaffolding {
                        segment: (poly.points[idx], poly.points[prev]),
                        poly_index: idx,
                        inserted: pos,
                    }
                }
                Hit::Line { layer, id } => {
                    let Some(line) = ctx.board.data.layers[layer].line(id) else {
                        return Ok(());
                    };
                    InsertScaffolding {
                        segment: (line.point1, line.point2),
                        poly_index: 0,
                        inserted: pos,
                    }
                }
                _ => return Ok(()),
            };
            ctx.crosshair.attached_object.hit = Some(hit);
            ctx.crosshair.attached_object.insert = Some(insert);
            ctx.crosshair.attached_object.state = DrawState::Second;
            Ok(())
        }
        DrawState::Second | DrawState::Third => {
            let hit = ctx.crosshair.attached_object.hit;
            let insert = ctx.crosshair.attached_object.insert;
            ctx.crosshair.attached_object.reset();
            let (Some(hit), Some(insert)) = (hit, insert) else {
                return Ok(());
            };
            match hit {
                Hit::Polygon { layer, id } => {
                    if ops::insert_polygon_point(
                        &mut ctx.board.data,
                        layer,
                        id,
                        insert.poly_index,
                        pos,
                    ) {
                        ctx.journal.add(UndoKind::InsertPoint {
                            point: PointRef::PolygonPoint {
                                layer,
                                id,
                                idx: insert.poly_index,
                            },
                        });
                    }
                }
                Hit::Line { layer, id } => {
                    // Split: the original keeps its first half, a new line
                    // carries the second.
                    let Some(old_p2) = ctx.board.data.layers[layer].line(id).map(|l| l.point2)
                    else {
                        return Ok(());
                    };
                    let (dx, dy) = (pos.x - old_p2.x, pos.y - old_p2.y);
                    if ops::move_line_point(&mut ctx.board.data, layer, id, true, dx, dy) {
                        ctx.journal.add(UndoKind::MovePoint {
                            point: PointRef::LinePoint {
                                layer,
                                id,
                                second: true,
                            },
                            dx,
                            dy,
                        });
                    }
                    let (thickness, clearance, flags) = match ctx.board.data.layers[layer].line(id)
                    {
                        Some(l) => (l.thickness, l.clearance, l.flags),
                        None => return Ok(()),
                    };
                    if let Some(nid) = ops::create_line(
                        &mut ctx.board.data,
                        layer,
                        pos,
                        old_p2,
                        thickness,
                        clearance,
                        flags,
                    ) {
                        ctx.journal.add(UndoKind::Create(ObjRef::Line {
                            layer,
                            id: nid,
                        }));
                    }
                }
                _ => {}
            }
            ctx.journal.inc_serial();
            clip::reclip_dirty(&mut ctx.board);
            ctx.board.changed = true;
            ctx.hid.invalidate_all();
            Ok(())
        }
    }
}

fn notify_thermal(ctx: &mut Context, pos: Point) -> Result<(), ActionError> {
    let Some(hit) = search::search_screen(
        &ctx.board,
        ctx.current_layer,
        pos,
        SLOP,
        ObjectType::PIN_TYPES,
    ) else {
        return Ok(());
    };
    let layer = ctx.current_layer;
    let (obj, flags) = match hit {
        Hit::Via { id } => (
            ObjRef::Via(id),
            ctx.board.data.via(id).map(|v| v.flags),
        ),
        Hit::Pin { id, .. } => (
            ObjRef::Pin(id),
            ctx.board.data.pin(id).map(|(_, p)| p.flags),
        ),
        _ => return Ok(()),
    };
    let Some(flags) = flags else {
        return Ok(());
    };
    if flags.has(ObjectFlags::HOLE) {
        return Ok(());
    }
    let old = flags.thermals.get(layer);
    let new_style = if old != ThermalStyle::None {
        ThermalStyle::None
    } else {
        ctx.board.therm_style
    };
    // Journal the old value, then apply the new.
    ctx.journal.add(UndoKind::ChangeThermal {
        obj,
        layer,
        style: old,
    });
    let target = match obj {
        ObjRef::Via(id) => ctx.board.data.via_mut(id).map(|v| &mut v.flags),
        ObjRef::Pin(id) => ctx.board.data.pin_mut(id).map(|p| &mut p.flags),
        _ => None,
    };
    if let Some(f) = target {
        f.thermals.set(layer, new_style);
    }
    clip::mark_dirty_overlapping(
        &mut ctx.board.data,
        core_geom::BoxType::new(pos.x - 1, pos.y - 1, pos.x + 1, pos.y + 1).expand(
            ctx.settings.via_thickness + 2 * ctx.settings.keepaway,
        ),
        None,
    );
    ctx.journal.inc_serial();
    clip::reclip_dirty(&mut ctx.board);
    ctx.board.changed = true;
    ctx.hid.invalidate_all();
    Ok(())
}

fn notify_arc(ctx: &mut Context, pos: Point) -> Result<(), ActionError> {
    match ctx.crosshair.attached_box.state {
        DrawState::First => {
            ctx.crosshair.attached_box.point1 = pos;
            ctx.crosshair.attached_box.point2 = pos;
            ctx.crosshair.attached_box.state = DrawState::Second;
            Ok(())
        }
        DrawState::Second | DrawState::Third => {
            let p1 = ctx.crosshair.attached_box.point1;
            let wx = pos.x - p1.x;
            let wy = pos.y - p1.y;
            let otherway = ctx.crosshair.attached_box.otherway;
            // The dominant axis picks the quadrant; the radius is the
            // shorter reach.
            let (center, sa, dir, radius) = if otherway != (wy.abs() > wx.abs()) {
                let r = wy.abs();
                let center = Point::new(p1.x + r * sign(wx), p1.y);
                let sa = if wx >= 0 { 0 } else { 180 };
                let dir = if sign(wx) == sign(wy) { 90 } else { -90 };
                (center, sa, dir, r)
            } else {
                let r = wx.abs();
                let center = Point::new(p1.x, p1.y + r * sign(wy));
                let sa = if wy >= 0 { -90 } else { 90 };
                let dir = if sign(wx) == sign(wy) { -90 } else { 90 };
                (center, sa, dir, r)
            };
            if radius == 0 {
                return Err(ctx.fail(ActionError::Geometry("zero-radius arc")));
            }
            let line_flags = new_line_flags(ctx);
            let id = ops::create_arc(
                &mut ctx.board.data,
                ctx.current_layer,
                center,
                radius,
                radius,
                sa,
                dir,
                ctx.settings.line_thickness,
                2 * ctx.settings.keepaway,
                line_flags,
            );
            if let Some(id) = id {
                ctx.journal.add(UndoKind::Create(ObjRef::Arc {
                    layer: ctx.current_layer,
                    id,
                }));
                ctx.journal.inc_serial();
                // Chain from the arc's end point.
                if let Some(arc) = ctx.board.data.layers[ctx.current_layer].arc(id) {
                    let (_, end) = arc.endpoints();
                    ctx.crosshair.attached_box.point1 = end;
                    ctx.crosshair.attached_box.point2 = end;
                }
                ctx.crosshair.attached_box.state = DrawState::Third;
                clip::reclip_dirty(&mut ctx.board);
                ctx.board.changed = true;
                ctx.hid.invalidate_all();
            }
            Ok(())
        }
    }
}

fn sign(v: Coord) -> Coord {
    if v >= 0 { 1 } else { -1 }
}

fn notify_arrow(ctx: &mut Context, pos: Point) -> Result<(), ActionError> {
    ctx.crosshair.note.click = true;
    let hit = search::search_screen(&ctx.board, ctx.current_layer, pos, SLOP, SELECT_TYPES);
    match hit {
        Some(hit) => {
            select::toggle_object(&mut ctx.board, &mut ctx.journal, &hit);
            ctx.journal.inc_serial();
        }
        None => {
            // A click on nothing drops the whole selection.
            let n = select::select_block(
                &mut ctx.board,
                &mut ctx.journal,
                core_geom::BoxType::new(
                    Coord::MIN / 2,
                    Coord::MIN / 2,
                    Coord::MAX / 2,
                    Coord::MAX / 2,
                ),
                false,
            );
            if n > 0 {
                ctx.journal.inc_serial();
            }
        }
    }
    ctx.hid.invalidate_all();
    Ok(())
}

fn notify_lock(ctx: &mut Context, pos: Point) -> Result<(), ActionError> {
    let Some(hit) = search::search_screen(
        &ctx.board,
        ctx.current_layer,
        pos,
        SLOP,
        ObjectType::LOCK_TYPES,
    ) else {
        return Ok(());
    };
    // Lock changes are deliberately not journaled.
    match hit {
        Hit::Element { id } => {
            if let Some(e) = ctx.board.data.element_mut(id) {
                e.toggle_lock();
                let locked = e.flags.has(ObjectFlags::LOCK);
                ctx.message(if locked { "element locked" } else { "element unlocked" });
            }
        }
        other => {
            if let Some(flags) = select::flags_mut(&mut ctx.board, &other) {
                flags.toggle(ObjectFlags::LOCK);
                if flags.has(ObjectFlags::LOCK) {
                    flags.clear(ObjectFlags::SELECTED);
                }
            }
        }
    }
    ctx.board.changed = true;
    ctx.hid.invalidate_all();
    Ok(())
}
