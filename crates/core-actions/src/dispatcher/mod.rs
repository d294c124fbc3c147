//! Action registry and dispatch.
//!
//! Actions are named, take string arguments plus the current crosshair
//! position, and return success or a logged failure. The registry carries a
//! syntax line and help text per action; `execute_line` parses a
//! `Name(args); Name(args)` line and runs it, returning the exit code the
//! scripted surfaces report.
//!
//! Attribute changes are applied through the journal's own apply engine:
//! applying a change entry performs it and returns the inverse entry, which
//! is exactly what gets journaled. One code path serves live edits, undo
//! and redo.

mod io;
mod notify;
pub mod parse;

use crate::crosshair::{DrawState, Mode};
use crate::search::{self, Hit};
use crate::select;
use crate::{ActionError, Context, buffer};
use core_geom::{BoxType, Point};
use core_model::entity::ObjectType;
use core_model::flags::ObjectFlags;
use core_model::{clip, ops};
use core_state::{ObjRef, UndoKind};
use parse::{ActionCall, parse_action_line, parse_int, parse_value};
use tracing::{debug, info, warn};

type Handler = fn(&mut Context, &[String]) -> Result<(), ActionError>;

pub struct ActionEntry {
    pub name: &'static str,
    pub syntax: &'static str,
    pub help: &'static str,
    handler: Handler,
}

pub struct Registry {
    entries: Vec<ActionEntry>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::builtin()
    }
}

macro_rules! entry {
    ($name:literal, $syntax:literal, $help:literal, $handler:path) => {
        ActionEntry {
            name: $name,
            syntax: $syntax,
            help: $help,
            handler: $handler,
        }
    };
}

impl Registry {
    pub fn builtin() -> Self {
        let entries = vec![
            entry!(
                "Atomic",
                "Atomic(Save|Restore|Close|Block)",
                "Save or restore the undo serial number.",
                action_atomic
            ),
            entry!("Undo", "Undo([ClearList])", "Undo the last group.", action_undo),
            entry!("Redo", "Redo()", "Redo the last undone group.", action_redo),
            entry!(
                "Mode",
                "Mode(ToolName|Save|Restore|Notify|Escape|Cancel)",
                "Switch the editing tool or replay a click.",
                action_mode
            ),
            entry!(
                "Notify",
                "Notify([x, y])",
                "Deliver a click at the crosshair (or at x, y).",
                action_notify
            ),
            entry!(
                "Select",
                "Select(Object|Block,x1,y1,x2,y2|All|Found|Connection|ObjectByName,pattern)",
                "Select objects.",
                action_select
            ),
            entry!(
                "Unselect",
                "Unselect(Object|Block,x1,y1,x2,y2|All|ObjectByName,pattern)",
                "Deselect objects.",
                action_unselect
            ),
            entry!(
                "RemoveSelected",
                "RemoveSelected()",
                "Remove every selected object.",
                action_remove_selected
            ),
            entry!(
                "ChangeSize",
                "ChangeSize(Object, delta[, unit])",
                "Change the size of the object at the crosshair.",
                action_change_size
            ),
            entry!(
                "ChangeClearSize",
                "ChangeClearSize(Object, delta[, unit])",
                "Change the clearance of the object at the crosshair.",
                action_change_clearance
            ),
            entry!(
                "ChangeDrillSize",
                "ChangeDrillSize(Object, delta[, unit])",
                "Change the drill of the pin or via at the crosshair.",
                action_change_drill
            ),
            entry!(
                "ChangeName",
                "ChangeName(Object[, name])",
                "Rename the object at the crosshair.",
                action_change_name
            ),
            entry!(
                "ChangeFlag",
                "ChangeFlag(Object, square|octagon|join, 0|1)",
                "Set or clear a flag on the object at the crosshair.",
                action_change_flag
            ),
            entry!(
                "Connection",
                "Connection(Reset)",
                "Reset connection tracing marks.",
                action_connection
            ),
            entry!(
                "AddRats",
                "AddRats(AllRats)",
                "Create rat lines from the netlist.",
                action_add_rats
            ),
            entry!(
                "DeleteRats",
                "DeleteRats(AllRats)",
                "Remove rat lines.",
                action_delete_rats
            ),
            entry!(
                "PasteBuffer",
                "PasteBuffer(AddSelected|Clear|Convert|Smash|Mirror|Rotate,n|FreeRotate,angle|ToLayout[,x,y]|Save,file|1..5)",
                "Operate on the current paste buffer.",
                action_paste_buffer
            ),
            entry!(
                "ElementToBuffer",
                "ElementToBuffer()",
                "Move the element at the crosshair into the current buffer.",
                action_element_to_buffer
            ),
            entry!(
                "MorphPolygon",
                "MorphPolygon(Object)",
                "Split the polygon at the crosshair into its islands.",
                action_morph_polygon
            ),
            entry!(
                "SwitchDrawingLayer",
                "SwitchDrawingLayer(n)",
                "Make layer n (1-based) current.",
                action_switch_layer
            ),
            entry!(
                "CycleClip",
                "CycleClip()",
                "Cycle the two-segment line clipping policy.",
                action_cycle_clip
            ),
            entry!(
                "RouteStyle",
                "RouteStyle(n)",
                "Adopt route style n (1-based) for new objects.",
                action_route_style
            ),
            entry!(
                "Message",
                "Message(text)",
                "Write a message to the log.",
                action_message
            ),
            entry!(
                "Redraw",
                "Redraw()",
                "Invalidate the whole drawing area.",
                action_redraw
            ),
            entry!(
                "LoadFrom",
                "LoadFrom(Layout|Netlist, filename)",
                "Load a board or netlist file.",
                io::action_load_from
            ),
            entry!(
                "SaveTo",
                "SaveTo(Layout|LayoutAs, filename)",
                "Save the board.",
                io::action_save_to
            ),
            entry!(
                "ExecuteFile",
                "ExecuteFile(filename)",
                "Run an action script.",
                io::action_execute_file
            ),
            entry!("Quit", "Quit()", "Request exit.", action_quit),
        ];
        Self { entries }
    }

    pub fn find(&self, name: &str) -> Option<&ActionEntry> {
        self.entries
            .iter()
            .find(|e| e.name.eq_ignore_ascii_case(name))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActionEntry> {
        self.entries.iter()
    }
}

/// Run one parsed call.
fn run_call(ctx: &mut Context, registry: &Registry, call: &ActionCall) -> Result<(), ActionError> {
    let Some(entry) = registry.find(&call.name) else {
        return Err(ctx.fail(ActionError::UnknownAction(call.name.clone())));
    };
    debug!(target: "dispatch", action = entry.name, args = ?call.args, "action");
    (entry.handler)(ctx, &call.args)
}

/// Execute a full action line. Returns the process-style exit code: zero
/// on success, nonzero when parsing or any action failed.
pub fn execute_line(ctx: &mut Context, registry: &Registry, line: &str) -> i32 {
    let calls = match parse_action_line(line) {
        Ok(calls) => calls,
        Err(err) => {
            ctx.hid
                .log(core_hid::Severity::Error, &format!("parse error: {err}"));
            return 1;
        }
    };
    for call in &calls {
        if run_call(ctx, registry, call).is_err() {
            return 1;
        }
    }
    0
}

/// Execute with a fresh builtin registry; the common entry point.
pub fn execute_actions(ctx: &mut Context, line: &str) -> i32 {
    let registry = Registry::builtin();
    execute_line(ctx, &registry, line)
}

fn arg_err(ctx: &mut Context, action: &'static str, detail: impl Into<String>) -> ActionError {
    ctx.fail(ActionError::Argument {
        action,
        detail: detail.into(),
    })
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

fn action_atomic(ctx: &mut Context, args: &[String]) -> Result<(), ActionError> {
    let op = args
        .first()
        .ok_or_else(|| arg_err(ctx, "Atomic", "expected Save|Restore|Close|Block"))?;
    match op.to_ascii_lowercase().as_str() {
        "save" => ctx.journal.save_serial(),
        "restore" => ctx.journal.restore_serial(),
        "close" => ctx.journal.atomic_close(),
        "block" => ctx.journal.atomic_block(),
        other => return Err(arg_err(ctx, "Atomic", format!("unknown op {other:?}"))),
    }
    Ok(())
}

fn action_undo(ctx: &mut Context, args: &[String]) -> Result<(), ActionError> {
    match args.first().map(String::as_str) {
        Some("ClearList") | Some("clearlist") => {
            ctx.journal.clear_list();
            Ok(())
        }
        None | Some("") => {
            if ctx.journal.undo(&mut ctx.board) == 0 {
                ctx.message("Nothing to undo");
            }
            ctx.hid.invalidate_all();
            Ok(())
        }
        Some(other) => Err(arg_err(ctx, "Undo", format!("unknown argument {other:?}"))),
    }
}

fn action_redo(ctx: &mut Context, _args: &[String]) -> Result<(), ActionError> {
    if ctx.journal.redo(&mut ctx.board) == 0 {
        ctx.message("Nothing to redo");
    }
    ctx.hid.invalidate_all();
    Ok(())
}

fn escape(ctx: &mut Context) {
    // In-progress scaffolding goes first; with nothing pending the tool
    // falls back to the arrow.
    let busy = ctx.crosshair.attached_line.state != DrawState::First
        || ctx.crosshair.attached_box.state != DrawState::First
        || !ctx.crosshair.attached_polygon.is_empty()
        || ctx.crosshair.attached_object.state != DrawState::First;
    if busy {
        ctx.crosshair.clear_attached();
    } else {
        ctx.crosshair.set_mode(Mode::Arrow);
    }
    ctx.hid.invalidate_all();
}

fn action_mode(ctx: &mut Context, args: &[String]) -> Result<(), ActionError> {
    let name = args
        .first()
        .ok_or_else(|| arg_err(ctx, "Mode", "expected a tool name"))?;
    match name.to_ascii_lowercase().as_str() {
        "save" => ctx.crosshair.save_mode(),
        "restore" => ctx.crosshair.restore_mode(),
        "notify" => return notify::notify(ctx),
        "escape" => escape(ctx),
        "cancel" => {
            ctx.crosshair.clear_attached();
            ctx.journal.atomic_block();
        }
        other => match Mode::from_name(other) {
            Some(mode) => ctx.crosshair.set_mode(mode),
            None => return Err(arg_err(ctx, "Mode", format!("unknown tool {name:?}"))),
        },
    }
    Ok(())
}

fn action_notify(ctx: &mut Context, args: &[String]) -> Result<(), ActionError> {
    if args.len() >= 2 {
        let x = parse_value(&args[0]).map_err(|e| arg_err(ctx, "Notify", e))?;
        let y = parse_value(&args[1]).map_err(|e| arg_err(ctx, "Notify", e))?;
        ctx.crosshair.pos = Point::new(
            x.resolve(ctx.crosshair.pos.x),
            y.resolve(ctx.crosshair.pos.y),
        );
    } else if !args.is_empty() {
        return Err(arg_err(ctx, "Notify", "expected no or two coordinates"));
    }
    notify::notify(ctx)
}

fn select_args(
    ctx: &mut Context,
    action: &'static str,
    args: &[String],
    select: bool,
) -> Result<(), ActionError> {
    let what = args
        .first()
        .ok_or_else(|| arg_err(ctx, action, "missing selector"))?;
    let changed = match what.to_ascii_lowercase().as_str() {
        "object" => {
            let hit = search::search_screen(
                &ctx.board,
                ctx.current_layer,
                ctx.crosshair.pos,
                5 * core_geom::MIL,
                ObjectType::VIA
                    | ObjectType::LINE
                    | ObjectType::ARC
                    | ObjectType::TEXT
                    | ObjectType::POLYGON
                    | ObjectType::ELEMENT
                    | ObjectType::RATLINE,
            );
            match hit {
                Some(hit) => {
                    select::toggle_object(&mut ctx.board, &mut ctx.journal, &hit);
                    1
                }
                None => return Err(ctx.fail(ActionError::NotFound("object"))),
            }
        }
        "block" => {
            if args.len() < 5 {
                return Err(arg_err(ctx, action, "Block needs x1,y1,x2,y2"));
            }
            let mut c = [0i32; 4];
            for (i, slot) in c.iter_mut().enumerate() {
                *slot = parse_value(&args[i + 1])
                    .map_err(|e| arg_err(ctx, action, e))?
                    .coord();
            }
            let region = BoxType::new(c[0].min(c[2]), c[1].min(c[3]), c[0].max(c[2]), c[1].max(c[3]));
            select::select_block(&mut ctx.board, &mut ctx.journal, region, select)
        }
        "all" => select::select_block(
            &mut ctx.board,
            &mut ctx.journal,
            BoxType::new(i32::MIN / 2, i32::MIN / 2, i32::MAX / 2, i32::MAX / 2),
            select,
        ),
        "found" => select::select_by_flag(
            &mut ctx.board,
            &mut ctx.journal,
            ObjectFlags::FOUND,
            select,
        ),
        "connection" => select::select_by_flag(
            &mut ctx.board,
            &mut ctx.journal,
            ObjectFlags::CONNECTED,
            select,
        ),
        "objectbyname" | "elementbyname" | "viabyname" | "textbyname" => {
            let pattern = args
                .get(1)
                .ok_or_else(|| arg_err(ctx, action, "missing name pattern"))?;
            let kinds = match what.to_ascii_lowercase().as_str() {
                "elementbyname" => ObjectType::ELEMENT,
                "viabyname" => ObjectType::VIA,
                "textbyname" => ObjectType::TEXT,
                _ => ObjectType::ELEMENT | ObjectType::VIA | ObjectType::TEXT,
            };
            select::select_by_name(&mut ctx.board, &mut ctx.journal, kinds, pattern, select)
        }
        other => return Err(arg_err(ctx, action, format!("unknown selector {other:?}"))),
    };
    if changed > 0 {
        ctx.journal.inc_serial();
        ctx.hid.invalidate_all();
    }
    Ok(())
}

fn action_select(ctx: &mut Context, args: &[String]) -> Result<(), ActionError> {
    select_args(ctx, "Select", args, true)
}

fn action_unselect(ctx: &mut Context, args: &[String]) -> Result<(), ActionError> {
    select_args(ctx, "Unselect", args, false)
}

fn action_remove_selected(ctx: &mut Context, _args: &[String]) -> Result<(), ActionError> {
    let refs = select::selected_refs(&ctx.board);
    let mut removed = 0;
    let mut refused = 0;
    for r in refs {
        let hit = match r {
            select::SelRef::Via(id) => Hit::Via { id },
            select::SelRef::Element(id) => Hit::Element { id },
            select::SelRef::Rat(id) => Hit::Rat { id },
            select::SelRef::Line { layer, id } => Hit::Line { layer, id },
            select::SelRef::Arc { layer, id } => Hit::Arc { layer, id },
            select::SelRef::Text { layer, id } => Hit::Text { layer, id },
            select::SelRef::Polygon { layer, id } => Hit::Polygon { layer, id },
        };
        if hit.locked(&ctx.board) {
            refused += 1;
            continue;
        }
        if notify::remove_hit(ctx, &hit) {
            removed += 1;
        }
    }
    if refused > 0 {
        ctx.message("some selected objects are locked and were kept");
    }
    if removed > 0 {
        ctx.journal.inc_serial();
        clip::reclip_dirty(&mut ctx.board);
        ctx.board.changed = true;
        ctx.hid.invalidate_all();
    }
    info!(target: "dispatch", removed, refused, "remove_selected");
    Ok(())
}

const CHANGE_TYPES: ObjectType = ObjectType::VIA
    .union(ObjectType::PIN)
    .union(ObjectType::PAD)
    .union(ObjectType::LINE)
    .union(ObjectType::ARC)
    .union(ObjectType::TEXT);

/// Apply a journaled attribute change through the apply engine: the engine
/// performs the change and returns the inverse entry to journal.
fn apply_and_journal(ctx: &mut Context, entry: UndoKind) -> Result<(), ActionError> {
    match core_state::apply::apply(&mut ctx.board, entry) {
        Ok(inverse) => {
            ctx.journal.add(inverse);
            ctx.journal.inc_serial();
            clip::reclip_dirty(&mut ctx.board);
            ctx.board.changed = true;
            ctx.hid.invalidate_all();
            Ok(())
        }
        Err(err) => {
            warn!(target: "dispatch", %err, "change_refused");
            Err(ctx.fail(ActionError::NotFound("changeable object")))
        }
    }
}

/// Hit at the crosshair, refusing locked objects. Flag and name edits,
/// which lock permits, search with their own mask instead of this helper.
fn object_at_crosshair(ctx: &mut Context, mask: ObjectType) -> Result<Hit, ActionError> {
    let hit = search::search_screen(
        &ctx.board,
        ctx.current_layer,
        ctx.crosshair.pos,
        5 * core_geom::MIL,
        mask | ObjectType::LOCKED,
    );
    let hit = hit.ok_or_else(|| {
        let e = ActionError::NotFound("object");
        ctx.fail(e)
    })?;
    if hit.locked(&ctx.board) {
        return Err(ctx.fail(ActionError::Locked));
    }
    Ok(hit)
}

fn parse_delta(
    ctx: &mut Context,
    action: &'static str,
    args: &[String],
) -> Result<parse::ParsedValue, ActionError> {
    let raw = args
        .get(1)
        .ok_or_else(|| arg_err(ctx, action, "missing value"))?;
    let joined = match args.get(2) {
        Some(unit) => format!("{raw}{unit}"),
        None => raw.clone(),
    };
    parse_value(&joined).map_err(|e| arg_err(ctx, action, e))
}

fn current_size(ctx: &Context, hit: &Hit) -> Option<i32> {
    let data = &ctx.board.data;
    match *hit {
        Hit::Via { id } => data.via(id).map(|v| v.thickness),
        Hit::Pin { id, .. } => data.pin(id).map(|(_, p)| p.thickness),
        Hit::Pad { id, .. } => data.pad(id).map(|(_, p)| p.thickness),
        Hit::Line { layer, id } | Hit::LinePoint { layer, id, .. } => {
            data.layers.get(layer).and_then(|l| l.line(id)).map(|x| x.thickness)
        }
        Hit::Arc { layer, id } => data.layers.get(layer).and_then(|l| l.arc(id)).map(|x| x.thickness),
        Hit::Text { layer, id } => data
            .layers
            .get(layer)
            .and_then(|l| l.text(id))
            .map(|x| x.scale as i32),
        _ => None,
    }
}

fn action_change_size(ctx: &mut Context, args: &[String]) -> Result<(), ActionError> {
    require_object_selector(ctx, "ChangeSize", args)?;
    let hit = object_at_crosshair(ctx, CHANGE_TYPES)?;
    let delta = parse_delta(ctx, "ChangeSize", args)?;
    let current = current_size(ctx, &hit)
        .ok_or_else(|| ctx.fail(ActionError::NotFound("sizeable object")))?;
    let new = delta.resolve(current);
    if new <= 0 {
        return Err(ctx.fail(ActionError::Geometry("size must stay positive")));
    }
    let obj = hit
        .obj_ref()
        .ok_or_else(|| ctx.fail(ActionError::NotFound("object")))?;
    apply_and_journal(ctx, UndoKind::ChangeSize { obj, value: new })
}

fn current_clearance(ctx: &Context, hit: &Hit) -> Option<i32> {
    let data = &ctx.board.data;
    match *hit {
        Hit::Via { id } => data.via(id).map(|v| v.clearance),
        Hit::Pin { id, .. } => data.pin(id).map(|(_, p)| p.clearance),
        Hit::Pad { id, .. } => data.pad(id).map(|(_, p)| p.clearance),
        Hit::Line { layer, id } | Hit::LinePoint { layer, id, .. } => {
            data.layers.get(layer).and_then(|l| l.line(id)).map(|x| x.clearance)
        }
        Hit::Arc { layer, id } => data.layers.get(layer).and_then(|l| l.arc(id)).map(|x| x.clearance),
        _ => None,
    }
}

fn action_change_clearance(ctx: &mut Context, args: &[String]) -> Result<(), ActionError> {
    require_object_selector(ctx, "ChangeClearSize", args)?;
    let hit = object_at_crosshair(ctx, CHANGE_TYPES)?;
    let delta = parse_delta(ctx, "ChangeClearSize", args)?;
    let current = current_clearance(ctx, &hit)
        .ok_or_else(|| ctx.fail(ActionError::NotFound("clearable object")))?;
    let new = delta.resolve(current).max(0);
    let obj = hit
        .obj_ref()
        .ok_or_else(|| ctx.fail(ActionError::NotFound("object")))?;
    apply_and_journal(ctx, UndoKind::ChangeClearance { obj, value: new })
}

fn action_change_drill(ctx: &mut Context, args: &[String]) -> Result<(), ActionError> {
    require_object_selector(ctx, "ChangeDrillSize", args)?;
    let hit = object_at_crosshair(ctx, ObjectType::PIN_TYPES)?;
    let delta = parse_delta(ctx, "ChangeDrillSize", args)?;
    let current = match hit {
        Hit::Via { id } => ctx.board.data.via(id).map(|v| v.drilling_hole),
        Hit::Pin { id, .. } => ctx.board.data.pin(id).map(|(_, p)| p.drilling_hole),
        _ => None,
    }
    .ok_or_else(|| ctx.fail(ActionError::NotFound("pin or via")))?;
    let new = delta.resolve(current);
    if new <= 0 {
        return Err(ctx.fail(ActionError::Geometry("drill must stay positive")));
    }
    let obj = hit
        .obj_ref()
        .ok_or_else(|| ctx.fail(ActionError::NotFound("object")))?;
    apply_and_journal(ctx, UndoKind::ChangeDrill { obj, value: new })
}

fn require_object_selector(
    ctx: &mut Context,
    action: &'static str,
    args: &[String],
) -> Result<(), ActionError> {
    if matches!(
        args.first().map(|s| s.to_ascii_lowercase()).as_deref(),
        Some("object")
    ) {
        Ok(())
    } else {
        Err(arg_err(ctx, action, "expected Object selector"))
    }
}

fn action_change_name(ctx: &mut Context, args: &[String]) -> Result<(), ActionError> {
    require_object_selector(ctx, "ChangeName", args)?;
    // Naming is allowed on locked objects, so search with the mask only.
    let Some(hit) = search::search_screen(
        &ctx.board,
        ctx.current_layer,
        ctx.crosshair.pos,
        5 * core_geom::MIL,
        ObjectType::VIA
            | ObjectType::PIN
            | ObjectType::PAD
            | ObjectType::TEXT
            | ObjectType::ELEMENT
            | ObjectType::LOCKED,
    ) else {
        return Err(ctx.fail(ActionError::NotFound("nameable object")));
    };
    let name = match args.get(1) {
        Some(n) => Some(n.clone()),
        None => ctx.hid.prompt_for("Enter name:", ""),
    };
    let Some(name) = name else {
        return Ok(());
    };
    let obj = match hit {
        Hit::Element { id } => ObjRef::ElementName {
            element: id,
            slot: core_model::NAME_REFDES,
        },
        other => other
            .obj_ref()
            .ok_or_else(|| ctx.fail(ActionError::NotFound("nameable object")))?,
    };
    apply_and_journal(
        ctx,
        UndoKind::ChangeName {
            obj,
            value: Some(name),
        },
    )
}

fn action_change_flag(ctx: &mut Context, args: &[String]) -> Result<(), ActionError> {
    require_object_selector(ctx, "ChangeFlag", args)?;
    let flag_name = args
        .get(1)
        .ok_or_else(|| arg_err(ctx, "ChangeFlag", "missing flag name"))?;
    let value = args
        .get(2)
        .map(|v| parse_int(v))
        .transpose()
        .map_err(|e| arg_err(ctx, "ChangeFlag", e))?
        .unwrap_or(1)
        != 0;
    let flag = match flag_name.to_ascii_lowercase().as_str() {
        "square" => ObjectFlags::SQUARE,
        "octagon" => ObjectFlags::OCTAGON,
        // "join" means the conductor connects to polygons, which is the
        // clear-line bit inverted.
        "join" => ObjectFlags::CLEARLINE,
        other => {
            return Err(arg_err(ctx, "ChangeFlag", format!("unknown flag {other:?}")));
        }
    };
    let value = if flag == ObjectFlags::CLEARLINE { !value } else { value };
    // Flag edits are legal on locked objects.
    let Some(hit) = search::search_screen(
        &ctx.board,
        ctx.current_layer,
        ctx.crosshair.pos,
        5 * core_geom::MIL,
        CHANGE_TYPES | ObjectType::LOCKED,
    ) else {
        return Err(ctx.fail(ActionError::NotFound("object")));
    };
    let obj = hit
        .obj_ref()
        .ok_or_else(|| ctx.fail(ActionError::NotFound("object")))?;
    let current = select::flags_mut(&mut ctx.board, &hit)
        .map(|f| f.word)
        .ok_or_else(|| ctx.fail(ActionError::NotFound("object")))?;
    let mut word = current;
    word.set(flag, value);
    if word == current {
        return Ok(());
    }
    apply_and_journal(ctx, UndoKind::ChangeFlags { obj, word })
}

fn action_connection(ctx: &mut Context, args: &[String]) -> Result<(), ActionError> {
    match args.first().map(|s| s.to_ascii_lowercase()).as_deref() {
        Some("reset") => {
            let marks = ObjectFlags::FOUND | ObjectFlags::CONNECTED;
            let mut cleared = 0;
            // Walk everything; one serial group for the whole sweep.
            for r in all_refs(&ctx.board) {
                let Some(obj) = flags_word_of(&ctx.board, &r) else {
                    continue;
                };
                if !obj.intersects(marks) {
                    continue;
                }
                let hit = sel_to_hit(&r);
                if let Some(flags) = select::flags_mut(&mut ctx.board, &hit) {
                    let old = flags.word;
                    flags.clear(marks);
                    ctx.journal.add(UndoKind::ChangeFlags {
                        obj: r.obj_ref(),
                        word: old,
                    });
                    cleared += 1;
                }
            }
            if cleared > 0 {
                ctx.journal.inc_serial();
                ctx.hid.invalidate_all();
            }
            info!(target: "dispatch", cleared, "connection_reset");
            Ok(())
        }
        other => Err(arg_err(
            ctx,
            "Connection",
            format!("unknown selector {other:?}"),
        )),
    }
}

fn all_refs(board: &core_model::Board) -> Vec<select::SelRef> {
    let mut out = Vec::new();
    for v in &board.data.vias {
        out.push(select::SelRef::Via(v.id));
    }
    for e in &board.data.elements {
        out.push(select::SelRef::Element(e.id));
    }
    for r in &board.data.rats {
        out.push(select::SelRef::Rat(r.id));
    }
    for (layer, l) in board.data.layers.iter().enumerate() {
        for x in &l.lines {
            out.push(select::SelRef::Line { layer, id: x.id });
        }
        for x in &l.arcs {
            out.push(select::SelRef::Arc { layer, id: x.id });
        }
        for x in &l.texts {
            out.push(select::SelRef::Text { layer, id: x.id });
        }
        for x in &l.polygons {
            out.push(select::SelRef::Polygon { layer, id: x.id });
        }
    }
    out
}

fn flags_word_of(board: &core_model::Board, r: &select::SelRef) -> Option<ObjectFlags> {
    let data = &board.data;
    match *r {
        select::SelRef::Via(id) => data.via(id).map(|v| v.flags.word),
        select::SelRef::Element(id) => data.element(id).map(|e| e.flags.word),
        select::SelRef::Rat(id) => data.rat(id).map(|x| x.flags.word),
        select::SelRef::Line { layer, id } => {
            data.layers.get(layer).and_then(|l| l.line(id)).map(|x| x.flags.word)
        }
        select::SelRef::Arc { layer, id } => {
            data.layers.get(layer).and_then(|l| l.arc(id)).map(|x| x.flags.word)
        }
        select::SelRef::Text { layer, id } => {
            data.layers.get(layer).and_then(|l| l.text(id)).map(|x| x.flags.word)
        }
        select::SelRef::Polygon { layer, id } => {
            data.layers.get(layer).and_then(|l| l.polygon(id)).map(|x| x.flags.word)
        }
    }
}

fn sel_to_hit(r: &select::SelRef) -> Hit {
    match *r {
        select::SelRef::Via(id) => Hit::Via { id },
        select::SelRef::Element(id) => Hit::Element { id },
        select::SelRef::Rat(id) => Hit::Rat { id },
        select::SelRef::Line { layer, id } => Hit::Line { layer, id },
        select::SelRef::Arc { layer, id } => Hit::Arc { layer, id },
        select::SelRef::Text { layer, id } => Hit::Text { layer, id },
        select::SelRef::Polygon { layer, id } => Hit::Polygon { layer, id },
    }
}

/// Resolve a `REF-PIN` connection name to a position and side group.
fn resolve_connection(board: &core_model::Board, conn: &str) -> Option<(Point, u8)> {
    let (refdes, pin_no) = conn.rsplit_once('-')?;
    let element = board
        .data
        .elements
        .iter()
        .find(|e| e.refdes().eq_ignore_ascii_case(refdes))?;
    if let Some(pin) = element
        .pins
        .iter()
        .find(|p| p.number.as_deref().is_some_and(|n| n.eq_ignore_ascii_case(pin_no)))
    {
        let group = board.groups.side_group(core_model::TOP_SIDE) as u8;
        return Some((pin.pos, group));
    }
    let pad = element
        .pads
        .iter()
        .find(|p| p.number.as_deref().is_some_and(|n| n.eq_ignore_ascii_case(pin_no)))?;
    let side = if pad.on_solder_side() {
        core_model::BOTTOM_SIDE
    } else {
        core_model::TOP_SIDE
    };
    let center = Point::new(
        (pad.point1.x + pad.point2.x) / 2,
        (pad.point1.y + pad.point2.y) / 2,
    );
    Some((center, board.groups.side_group(side) as u8))
}

fn action_add_rats(ctx: &mut Context, args: &[String]) -> Result<(), ActionError> {
    if !matches!(
        args.first().map(|s| s.to_ascii_lowercase()).as_deref(),
        Some("allrats") | None
    ) {
        return Err(arg_err(ctx, "AddRats", "expected AllRats"));
    }
    let nets = ctx.board.netlist.nets.clone();
    let mut added = 0;
    for net in &nets {
        let resolved: Vec<(Point, u8)> = net
            .connections
            .iter()
            .filter_map(|c| resolve_connection(&ctx.board, c))
            .collect();
        for pair in resolved.windows(2) {
            let (p1, g1) = pair[0];
            let (p2, g2) = pair[1];
            if p1 == p2 {
                continue;
            }
            let id = ops::create_rat(
                &mut ctx.board.data,
                p1,
                p2,
                g1,
                g2,
                ctx.settings.line_thickness,
                core_model::Flags::new(ObjectFlags::RAT),
            );
            ctx.journal.add(UndoKind::Create(ObjRef::Rat(id)));
            added += 1;
        }
    }
    if added > 0 {
        ctx.journal.inc_serial();
        ctx.hid.invalidate_all();
    }
    info!(target: "dispatch", added, "rats_added");
    Ok(())
}

fn action_delete_rats(ctx: &mut Context, _args: &[String]) -> Result<(), ActionError> {
    let ids: Vec<_> = ctx.board.data.rats.iter().map(|r| r.id).collect();
    let mut removed = 0;
    for id in ids {
        if let Some(rat) = ops::remove_rat(&mut ctx.board.data, id) {
            ctx.journal.add(UndoKind::Remove(core_state::Detached::Rat(rat)));
            removed += 1;
        }
    }
    if removed > 0 {
        ctx.journal.inc_serial();
        ctx.hid.invalidate_all();
    }
    Ok(())
}

fn action_paste_buffer(ctx: &mut Context, args: &[String]) -> Result<(), ActionError> {
    let op = args
        .first()
        .ok_or_else(|| arg_err(ctx, "PasteBuffer", "missing operation"))?;
    // Buffer numbers select the current buffer.
    if let Ok(n) = parse_int(op) {
        if (1..=buffer::MAX_BUFFER as i64).contains(&n) {
            ctx.buffers.select((n - 1) as usize);
            return Ok(());
        }
        return Err(arg_err(ctx, "PasteBuffer", format!("no buffer {n}")));
    }
    match op.to_ascii_lowercase().as_str() {
        "addselected" => {
            let origin = ctx.crosshair.pos;
            let board = &ctx.board;
            let n = buffer::add_selected(ctx.buffers.current_buffer_mut(), board, origin);
            if n == 0 {
                ctx.message("nothing selected to buffer");
            }
            Ok(())
        }
        "clear" => {
            ctx.buffers.current_buffer_mut().clear();
            Ok(())
        }
        "rotate" => {
            let steps = args
                .get(1)
                .map(|s| parse_int(s))
                .transpose()
                .map_err(|e| arg_err(ctx, "PasteBuffer", e))?
                .unwrap_or(1)
                .rem_euclid(4) as u8;
            buffer::rotate(ctx.buffers.current_buffer_mut(), steps);
            Ok(())
        }
        "freerotate" => {
            let angle: f64 = args
                .get(1)
                .ok_or_else(|| arg_err(ctx, "PasteBuffer", "missing angle"))?
                .parse()
                .map_err(|_| arg_err(ctx, "PasteBuffer", "bad angle"))?;
            buffer::free_rotate(ctx.buffers.current_buffer_mut(), angle);
            Ok(())
        }
        "mirror" => {
            buffer::mirror(ctx.buffers.current_buffer_mut());
            Ok(())
        }
        "convert" => {
            let keepaway = ctx.settings.keepaway;
            match buffer::convert_to_element(ctx.buffers.current_buffer_mut(), keepaway) {
                Ok(()) => Ok(()),
                Err(msg) => {
                    let msg = msg.to_string();
                    Err(ctx.fail(ActionError::Argument {
                        action: "PasteBuffer",
                        detail: msg,
                    }))
                }
            }
        }
        "smash" => {
            buffer::smash(ctx.buffers.current_buffer_mut());
            Ok(())
        }
        "save" => {
            let path = args
                .get(1)
                .cloned()
                .or_else(|| ctx.hid.file_select("Save buffer as:", None))
                .ok_or_else(|| arg_err(ctx, "PasteBuffer", "missing filename"))?;
            // The writer takes a board; the buffer content rides in a
            // throwaway frame sized like the current board.
            let mut carrier = core_model::Board::new(
                ctx.board.data.copper_count,
                ctx.board.max_width,
                ctx.board.max_height,
            );
            carrier.data = ctx.buffers.current_buffer().data.clone();
            core_file::save_board(
                &carrier,
                std::path::Path::new(&path),
                ctx.settings.save_metric_only,
            )
            .map_err(|e| ctx.fail(ActionError::Io(e.to_string())))?;
            Ok(())
        }
        "tolayout" => {
            let at = if args.len() >= 3 {
                let x = parse_value(&args[1]).map_err(|e| arg_err(ctx, "PasteBuffer", e))?;
                let y = parse_value(&args[2]).map_err(|e| arg_err(ctx, "PasteBuffer", e))?;
                Point::new(
                    x.resolve(ctx.crosshair.pos.x),
                    y.resolve(ctx.crosshair.pos.y),
                )
            } else {
                ctx.crosshair.pos
            };
            let buf = ctx.buffers.current_buffer().clone();
            if buf.is_empty() {
                ctx.message("The buffer is empty");
                return Ok(());
            }
            buffer::to_layout(&buf, &mut ctx.board, &mut ctx.journal, at);
            ctx.journal.inc_serial();
            clip::reclip_dirty(&mut ctx.board);
            ctx.board.changed = true;
            ctx.hid.invalidate_all();
            Ok(())
        }
        other => Err(arg_err(
            ctx,
            "PasteBuffer",
            format!("unknown operation {other:?}"),
        )),
    }
}

fn action_element_to_buffer(ctx: &mut Context, _args: &[String]) -> Result<(), ActionError> {
    let hit = object_at_crosshair(ctx, ObjectType::ELEMENT)?;
    let Hit::Element { id } = hit else {
        return Err(ctx.fail(ActionError::NotFound("element")));
    };
    // The pick mutates the current buffer; the selection index itself is
    // left where the user had it.
    let moved = buffer::element_to_buffer(
        ctx.buffers.current_buffer_mut(),
        &mut ctx.board,
        &mut ctx.journal,
        id,
    );
    if !moved {
        return Err(ctx.fail(ActionError::NotFound("element")));
    }
    ctx.journal.inc_serial();
    clip::reclip_dirty(&mut ctx.board);
    ctx.board.changed = true;
    ctx.hid.invalidate_all();
    ctx.crosshair.set_mode(Mode::PasteBuffer);
    Ok(())
}

fn action_morph_polygon(ctx: &mut Context, args: &[String]) -> Result<(), ActionError> {
    require_object_selector(ctx, "MorphPolygon", args)?;
    let hit = object_at_crosshair(ctx, ObjectType::POLYGON)?;
    let Hit::Polygon { layer, id } = hit else {
        return Err(ctx.fail(ActionError::NotFound("polygon")));
    };
    // Make sure the effective shape is current, then rebuild the polygon
    // as one polygon per island. Removal plus creations under one serial
    // keeps the morph a single undo step.
    if ctx.board.data.layers[layer]
        .polygon(id)
        .is_none_or(|p| p.clipped.is_none())
    {
        clip::init_clip(&mut ctx.board, layer, id);
    }
    let Some(shape) = ctx.board.data.layers[layer]
        .polygon(id)
        .and_then(|p| p.clipped.clone())
    else {
        return Err(ctx.fail(ActionError::NotFound("polygon")));
    };
    let pieces = shape.split_islands(ctx.board.isle_area);
    if pieces.len() <= 1 {
        return Ok(());
    }
    let Some(old) = ops::remove_polygon(&mut ctx.board.data, layer, id) else {
        return Err(ctx.fail(ActionError::NotFound("polygon")));
    };
    let flags = old.flags;
    ctx.journal.add(UndoKind::Remove(core_state::Detached::Polygon {
        layer,
        polygon: old,
    }));
    for piece in &pieces {
        let Some(island) = piece.islands.first() else {
            continue;
        };
        let mut points = island.outer.points.clone();
        let mut holes = Vec::new();
        for h in &island.holes {
            holes.push(points.len());
            points.extend(h.points.iter().copied());
        }
        if let Some(nid) = ops::create_polygon(&mut ctx.board.data, layer, points, holes, flags) {
            ctx.journal.add(UndoKind::Create(ObjRef::Polygon {
                layer,
                id: nid,
            }));
        }
    }
    ctx.journal.inc_serial();
    clip::reclip_dirty(&mut ctx.board);
    ctx.board.changed = true;
    ctx.hid.invalidate_all();
    Ok(())
}

fn action_switch_layer(ctx: &mut Context, args: &[String]) -> Result<(), ActionError> {
    let n = args
        .first()
        .map(|s| parse_int(s))
        .transpose()
        .map_err(|e| arg_err(ctx, "SwitchDrawingLayer", e))?
        .ok_or_else(|| arg_err(ctx, "SwitchDrawingLayer", "missing layer number"))?;
    let idx = (n - 1).max(0) as usize;
    if idx >= ctx.board.data.layers.len() {
        return Err(arg_err(
            ctx,
            "SwitchDrawingLayer",
            format!("no layer {n}"),
        ));
    }
    ctx.current_layer = idx;
    Ok(())
}

fn action_cycle_clip(ctx: &mut Context, _args: &[String]) -> Result<(), ActionError> {
    ctx.clipping = match ctx.clipping {
        crate::Clipping::Free => crate::Clipping::OrthogonalFirst,
        crate::Clipping::OrthogonalFirst => crate::Clipping::AngledFirst,
        crate::Clipping::AngledFirst => crate::Clipping::Free,
    };
    Ok(())
}

fn action_route_style(ctx: &mut Context, args: &[String]) -> Result<(), ActionError> {
    let n = args
        .first()
        .map(|s| parse_int(s))
        .transpose()
        .map_err(|e| arg_err(ctx, "RouteStyle", e))?
        .ok_or_else(|| arg_err(ctx, "RouteStyle", "missing style number"))?;
    let idx = (n - 1).max(0) as usize;
    let Some(style) = ctx.board.styles.get(idx).cloned() else {
        return Err(arg_err(ctx, "RouteStyle", format!("no style {n}")));
    };
    ctx.settings.line_thickness = style.thick;
    ctx.settings.via_thickness = style.diameter;
    ctx.settings.via_drilling_hole = style.hole;
    ctx.settings.keepaway = style.keepaway;
    Ok(())
}

fn action_message(ctx: &mut Context, args: &[String]) -> Result<(), ActionError> {
    let text = args.join(" ");
    ctx.message(&text);
    Ok(())
}

fn action_redraw(ctx: &mut Context, _args: &[String]) -> Result<(), ActionError> {
    ctx.hid.invalidate_all();
    Ok(())
}

fn action_quit(ctx: &mut Context, _args: &[String]) -> Result<(), ActionError> {
    ctx.quit_requested = true;
    Ok(())
}
