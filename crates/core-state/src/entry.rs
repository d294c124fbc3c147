//! Journal entry types. Each operation kind is a variant carrying exactly
//! the state needed to reverse it; applying an entry yields its inverse.

use core_geom::{Coord, Point};
use core_model::entity::{Arc, Element, Line, ObjectId, Polygon, Rat, Text, Via};
use core_model::flags::{ObjectFlags, ThermalStyle};
use core_model::transform::RotateTarget;

/// Reference to an attached entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjRef {
    Via(ObjectId),
    Pin(ObjectId),
    Pad(ObjectId),
    Element(ObjectId),
    /// One of an element's three name texts.
    ElementName { element: ObjectId, slot: usize },
    Rat(ObjectId),
    Line { layer: usize, id: ObjectId },
    Arc { layer: usize, id: ObjectId },
    Text { layer: usize, id: ObjectId },
    Polygon { layer: usize, id: ObjectId },
}

/// An entity detached from its container, kept alive by the journal.
#[derive(Debug, Clone)]
pub enum Detached {
    Via(Via),
    Element(Element),
    Rat(Rat),
    Line { layer: usize, line: Line },
    Arc { layer: usize, arc: Arc },
    Text { layer: usize, text: Text },
    Polygon { layer: usize, polygon: Polygon },
}

impl Detached {
    /// The reference this entity re-attaches under.
    pub fn obj_ref(&self) -> ObjRef {
        match self {
            Detached::Via(v) => ObjRef::Via(v.id),
            Detached::Element(e) => ObjRef::Element(e.id),
            Detached::Rat(r) => ObjRef::Rat(r.id),
            Detached::Line { layer, line } => ObjRef::Line {
                layer: *layer,
                id: line.id,
            },
            Detached::Arc { layer, arc } => ObjRef::Arc {
                layer: *layer,
                id: arc.id,
            },
            Detached::Text { layer, text } => ObjRef::Text {
                layer: *layer,
                id: text.id,
            },
            Detached::Polygon { layer, polygon } => ObjRef::Polygon {
                layer: *layer,
                id: polygon.id,
            },
        }
    }
}

/// A point owned by a line or polygon, for point-level edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointRef {
    LinePoint {
        layer: usize,
        id: ObjectId,
        second: bool,
    },
    PolygonPoint {
        layer: usize,
        id: ObjectId,
        idx: usize,
    },
}

/// One reversible operation.
#[derive(Debug, Clone)]
pub enum UndoKind {
    /// Object was created; reversing detaches it.
    Create(ObjRef),
    /// Object was removed; the detached value rides along and reversing
    /// re-attaches it under its old identity.
    Remove(Detached),
    /// Object was moved into a paste buffer; reverses like a removal (the
    /// buffer keeps its own copy).
    MoveToBuffer(Detached),
    /// Translation by (dx, dy); reversing translates back.
    Move { obj: ObjRef, dx: Coord, dy: Coord },
    /// One endpoint or contour point moved.
    MovePoint { point: PointRef, dx: Coord, dy: Coord },
    /// Quarter-turn rotation.
    Rotate {
        target: RotateTarget,
        center: Point,
        steps: u8,
    },
    /// Element mirrored across a vertical axis; self-inverse.
    Mirror { element: ObjectId, cx: Coord },
    /// Size change; carries the previous value, swapped on apply.
    ChangeSize { obj: ObjRef, value: Coord },
    ChangeClearance { obj: ObjRef, value: Coord },
    ChangeDrill { obj: ObjRef, value: Coord },
    ChangeMask { obj: ObjRef, value: Coord },
    /// Name change (via/pin/pad name, text string, element name slot).
    ChangeName { obj: ObjRef, value: Option<String> },
    ChangeNumber { obj: ObjRef, value: Option<String> },
    /// Arc geometry change.
    ChangeAngles {
        layer: usize,
        id: ObjectId,
        start: i32,
        delta: i32,
    },
    /// Whole flag word swap (single-flag changes and bulk clears both
    /// journal as word swaps, one entry per object under one serial).
    ChangeFlags { obj: ObjRef, word: ObjectFlags },
    /// Per-layer thermal style swap on a pin or via.
    ChangeThermal {
        obj: ObjRef,
        layer: usize,
        style: ThermalStyle,
    },
    /// Entity moved between layers.
    ChangeLayer {
        obj: ObjRef,
        to_layer: usize,
    },
    /// Contour point inserted at `idx`; reversing removes it.
    InsertPoint { point: PointRef },
    /// Contour point removed; reversing re-inserts `value`.
    RemovePoint { point: PointRef, value: Point },
    /// Netlist connection added.
    AddNet { net: String, conn: String },
    RemoveNet { net: String, conn: String },
}

impl UndoKind {
    /// Stable name for trace events.
    pub fn name(&self) -> &'static str {
        match self {
            UndoKind::Create(_) => "create",
            UndoKind::Remove(_) => "remove",
            UndoKind::MoveToBuffer(_) => "move_to_buffer",
            UndoKind::Move { .. } => "move",
            UndoKind::MovePoint { .. } => "move_point",
            UndoKind::Rotate { .. } => "rotate",
            UndoKind::Mirror { .. } => "mirror",
            UndoKind::ChangeSize { .. } => "change_size",
            UndoKind::ChangeClearance { .. } => "change_clearance",
            UndoKind::ChangeDrill { .. } => "change_drill",
            UndoKind::ChangeMask { .. } => "change_mask",
            UndoKind::ChangeName { .. } => "change_name",
            UndoKind::ChangeNumber { .. } => "change_number",
            UndoKind::ChangeAngles { .. } => "change_angles",
            UndoKind::ChangeFlags { .. } => "change_flags",
            UndoKind::ChangeThermal { .. } => "change_thermal",
            UndoKind::ChangeLayer { .. } => "change_layer",
            UndoKind::InsertPoint { .. } => "insert_point",
            UndoKind::RemovePoint { .. } => "remove_point",
            UndoKind::AddNet { .. } => "add_net",
            UndoKind::RemoveNet { .. } => "remove_net",
        }
    }
}

/// A journal entry: an operation stamped with its serial group.
#[derive(Debug, Clone)]
pub struct Entry {
    pub serial: u64,
    pub kind: UndoKind,
}
