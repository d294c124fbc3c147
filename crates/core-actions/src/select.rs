//! Selection operations: single object, block, by flag, by name pattern.
//!
//! Every selection change is a journaled flag change, so selecting is as
//! undoable as any edit. Locked objects refuse selection silently in block
//! sweeps and with a message on direct clicks (the dispatcher does the
//! messaging).

use crate::search::Hit;
use core_geom::BoxType;
use core_model::entity::{ObjectId, ObjectType};
use core_model::flags::{Flags, ObjectFlags};
use core_model::Board;
use core_state::{ObjRef, UndoJournal, UndoKind};
use regex::RegexBuilder;

/// A selected (or selectable) whole entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelRef {
    Via(ObjectId),
    Element(ObjectId),
    Rat(ObjectId),
    Line { layer: usize, id: ObjectId },
    Arc { layer: usize, id: ObjectId },
    Text { layer: usize, id: ObjectId },
    Polygon { layer: usize, id: ObjectId },
}

impl SelRef {
    pub fn obj_ref(&self) -> ObjRef {
        match *self {
            SelRef::Via(id) => ObjRef::Via(id),
            SelRef::Element(id) => ObjRef::Element(id),
            SelRef::Rat(id) => ObjRef::Rat(id),
            SelRef::Line { layer, id } => ObjRef::Line { layer, id },
            SelRef::Arc { layer, id } => ObjRef::Arc { layer, id },
            SelRef::Text { layer, id } => ObjRef::Text { layer, id },
            SelRef::Polygon { layer, id } => ObjRef::Polygon { layer, id },
        }
    }
}

/// Mutable access to an entity's flag state by hit.
pub(crate) fn flags_mut<'a>(board: &'a mut Board, hit: &Hit) -> Option<&'a mut Flags> {
    let data = &mut board.data;
    match *hit {
        Hit::Via { id } => data.via_mut(id).map(|v| &mut v.flags),
        Hit::Pin { id, .. } => data.pin_mut(id).map(|p| &mut p.flags),
        Hit::Pad { id, .. } => data.pad_mut(id).map(|p| &mut p.flags),
        Hit::Element { id } => data.element_mut(id).map(|e| &mut e.flags),
        Hit::ElementName { element, slot } => {
            data.element_mut(element).map(|e| &mut e.names[slot].flags)
        }
        Hit::Line { layer, id } | Hit::LinePoint { layer, id, .. } => data
            .layers
            .get_mut(layer)
            .and_then(|l| l.line_mut(id))
            .map(|x| &mut x.flags),
        Hit::Arc { layer, id } => data
            .layers
            .get_mut(layer)
            .and_then(|l| l.arc_mut(id))
            .map(|x| &mut x.flags),
        Hit::Text { layer, id } => data
            .layers
            .get_mut(layer)
            .and_then(|l| l.text_mut(id))
            .map(|x| &mut x.flags),
        Hit::Polygon { layer, id } | Hit::PolygonPoint { layer, id, .. } => data
            .layers
            .get_mut(layer)
            .and_then(|l| l.polygon_mut(id))
            .map(|x| &mut x.flags),
        Hit::Rat { id } => data.rat_mut(id).map(|r| &mut r.flags),
    }
}

fn journal_word_change(journal: &mut UndoJournal, obj: ObjRef, old: ObjectFlags) {
    journal.add(UndoKind::ChangeFlags { obj, word: old });
}

/// Toggle the selection of one hit object. Journals; returns the new
/// selection state.
pub fn toggle_object(board: &mut Board, journal: &mut UndoJournal, hit: &Hit) -> Option<bool> {
    let obj = hit.obj_ref()?;
    let flags = flags_mut(board, hit)?;
    let old = flags.word;
    flags.toggle(ObjectFlags::SELECTED);
    let now = flags.has(ObjectFlags::SELECTED);
    journal_word_change(journal, obj, old);
    Some(now)
}

/// Every whole entity on the board, for sweeps.
fn all_entities(board: &Board) -> Vec<SelRef> {
    let mut out = Vec::new();
    let data = &board.data;
    for v in &data.vias {
        out.push(SelRef::Via(v.id));
    }
    for e in &data.elements {
        out.push(SelRef::Element(e.id));
    }
    for r in &data.rats {
        out.push(SelRef::Rat(r.id));
    }
    for (layer, l) in data.layers.iter().enumerate() {
        for x in &l.lines {
            out.push(SelRef::Line { layer, id: x.id });
        }
        for x in &l.arcs {
            out.push(SelRef::Arc { layer, id: x.id });
        }
        for x in &l.texts {
            out.push(SelRef::Text { layer, id: x.id });
        }
        for x in &l.polygons {
            out.push(SelRef::Polygon { layer, id: x.id });
        }
    }
    out
}

fn entity_flags<'a>(board: &'a Board, r: &SelRef) -> Option<&'a Flags> {
    let data = &board.data;
    match *r {
        SelRef::Via(id) => data.via(id).map(|v| &v.flags),
        SelRef::Element(id) => data.element(id).map(|e| &e.flags),
        SelRef::Rat(id) => data.rat(id).map(|x| &x.flags),
        SelRef::Line { layer, id } => data.layers.get(layer).and_then(|l| l.line(id)).map(|x| &x.flags),
        SelRef::Arc { layer, id } => data.layers.get(layer).and_then(|l| l.arc(id)).map(|x| &x.flags),
        SelRef::Text { layer, id } => data.layers.get(layer).and_then(|l| l.text(id)).map(|x| &x.flags),
        SelRef::Polygon { layer, id } => {
            data.layers.get(layer).and_then(|l| l.polygon(id)).map(|x| &x.flags)
        }
    }
}

fn entity_flags_mut<'a>(board: &'a mut Board, r: &SelRef) -> Option<&'a mut Flags> {
    let data = &mut board.data;
    match *r {
        SelRef::Via(id) => data.via_mut(id).map(|v| &mut v.flags),
        SelRef::Element(id) => data.element_mut(id).map(|e| &mut e.flags),
        SelRef::Rat(id) => data.rat_mut(id).map(|x| &mut x.flags),
        SelRef::Line { layer, id } => data
            .layers
            .get_mut(layer)
            .and_then(|l| l.line_mut(id))
            .map(|x| &mut x.flags),
        SelRef::Arc { layer, id } => data
            .layers
            .get_mut(layer)
            .and_then(|l| l.arc_mut(id))
            .map(|x| &mut x.flags),
        SelRef::Text { layer, id } => data
            .layers
            .get_mut(layer)
            .and_then(|l| l.text_mut(id))
            .map(|x| &mut x.flags),
        SelRef::Polygon { layer, id } => data
            .layers
            .get_mut(layer)
            .and_then(|l| l.polygon_mut(id))
            .map(|x| &mut x.flags),
    }
}

fn entity_bbox(board: &Board, r: &SelRef) -> Option<BoxType> {
    let data = &board.data;
    match *r {
        SelRef::Via(id) => data.via(id).map(|v| v.bbox),
        SelRef::Element(id) => data.element(id).map(|e| e.bbox),
        SelRef::Rat(id) => data.rat(id).map(|x| x.bbox),
        SelRef::Line { layer, id } => data.layers.get(layer).and_then(|l| l.line(id)).map(|x| x.bbox),
        SelRef::Arc { layer, id } => data.layers.get(layer).and_then(|l| l.arc(id)).map(|x| x.bbox),
        SelRef::Text { layer, id } => data.layers.get(layer).and_then(|l| l.text(id)).map(|x| x.bbox),
        SelRef::Polygon { layer, id } => {
            data.layers.get(layer).and_then(|l| l.polygon(id)).map(|x| x.bbox)
        }
    }
}

fn apply_selection(
    board: &mut Board,
    journal: &mut UndoJournal,
    targets: &[SelRef],
    select: bool,
) -> usize {
    let mut changed = 0;
    for r in targets {
        let Some(flags) = entity_flags_mut(board, r) else {
            continue;
        };
        if flags.has(ObjectFlags::LOCK) || flags.has(ObjectFlags::SELECTED) == select {
            continue;
        }
        let old = flags.word;
        flags.assign(ObjectFlags::SELECTED, select);
        journal_word_change(journal, r.obj_ref(), old);
        changed += 1;
    }
    changed
}

/// Select (or deselect) everything wholly inside `region`. Returns the
/// number of objects whose state changed; all changes share one serial
/// group (the caller closes it).
pub fn select_block(
    board: &mut Board,
    journal: &mut UndoJournal,
    region: BoxType,
    select: bool,
) -> usize {
    let targets: Vec<SelRef> = all_entities(board)
        .into_iter()
        .filter(|r| entity_bbox(board, r).is_some_and(|b| region.contains_box(&b)))
        .collect();
    apply_selection(board, journal, &targets, select)
}

/// Select every object carrying `flag` (connection tracing results).
pub fn select_by_flag(
    board: &mut Board,
    journal: &mut UndoJournal,
    flag: ObjectFlags,
    select: bool,
) -> usize {
    let targets: Vec<SelRef> = all_entities(board)
        .into_iter()
        .filter(|r| entity_flags(board, r).is_some_and(|f| f.word.contains(flag)))
        .collect();
    apply_selection(board, journal, &targets, select)
}

fn entity_name<'a>(board: &'a Board, r: &SelRef) -> Option<&'a str> {
    let data = &board.data;
    match *r {
        SelRef::Via(id) => data.via(id).and_then(|v| v.name.as_deref()),
        SelRef::Element(id) => data.element(id).map(|e| e.refdes()),
        SelRef::Text { layer, id } => data
            .layers
            .get(layer)
            .and_then(|l| l.text(id))
            .map(|t| t.string.as_str()),
        _ => None,
    }
}

/// Select objects of the masked kinds whose name matches `pattern`
/// (case-insensitive POSIX-style regex; an invalid pattern degrades to a
/// literal substring match). Returns the change count.
pub fn select_by_name(
    board: &mut Board,
    journal: &mut UndoJournal,
    kinds: ObjectType,
    pattern: &str,
    select: bool,
) -> usize {
    let regex = RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .ok();
    let matches = |name: &str| -> bool {
        match &regex {
            Some(re) => re.is_match(name),
            None => name.to_ascii_lowercase().contains(&pattern.to_ascii_lowercase()),
        }
    };
    let wanted = |r: &SelRef| -> bool {
        match r {
            SelRef::Via(_) => kinds.contains(ObjectType::VIA),
            SelRef::Element(_) => kinds.contains(ObjectType::ELEMENT),
            SelRef::Text { .. } => kinds.contains(ObjectType::TEXT),
            _ => false,
        }
    };
    let targets: Vec<SelRef> = all_entities(board)
        .into_iter()
        .filter(|r| wanted(r) && entity_name(board, r).is_some_and(&matches))
        .collect();
    apply_selection(board, journal, &targets, select)
}

/// All currently selected whole entities.
pub fn selected_refs(board: &Board) -> Vec<SelRef> {
    all_entities(board)
        .into_iter()
        .filter(|r| entity_flags(board, r).is_some_and(|f| f.has(ObjectFlags::SELECTED)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_geom::Point;
    use core_model::ops;

    fn board() -> Board {
        Board::new(2, 1_000_000, 1_000_000)
    }

    #[test]
    fn block_selection_requires_full_containment() {
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
        ops::create_via(
            &mut b.data,
            Point::new(500_000, 500_000),
            20_000,
            10_000,
            0,
            10_000,
            None,
            Flags::default(),
        );
        let n = select_block(
            &mut b,
            &mut j,
            BoxType::new(0, 0, 200_000, 200_000),
            true,
        );
        assert_eq!(n, 1);
        assert_eq!(selected_refs(&b).len(), 1);
        // Deselect sweep over everything.
        let n = select_block(
            &mut b,
            &mut j,
            BoxType::new(0, 0, 1_000_000, 1_000_000),
            false,
        );
        assert_eq!(n, 1);
        assert!(selected_refs(&b).is_empty());
    }

    #[test]
    fn locked_objects_resist_block_selection() {
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
            Flags::new(ObjectFlags::LOCK),
        );
        let n = select_block(&mut b, &mut j, BoxType::new(0, 0, 1_000_000, 1_000_000), true);
        assert_eq!(n, 0);
    }

    #[test]
    fn select_by_name_regex_and_fallback() {
        let mut b = board();
        let mut j = UndoJournal::new();
        ops::create_via(
            &mut b.data,
            Point::new(100_000, 100_000),
            20_000,
            10_000,
            0,
            10_000,
            Some("VCC1".into()),
            Flags::default(),
        );
        ops::create_via(
            &mut b.data,
            Point::new(200_000, 200_000),
            20_000,
            10_000,
            0,
            10_000,
            Some("GND".into()),
            Flags::default(),
        );
        let n = select_by_name(&mut b, &mut j, ObjectType::VIA, "^vcc[0-9]$", true);
        assert_eq!(n, 1);
        // Invalid regex degrades to substring.
        let n = select_by_name(&mut b, &mut j, ObjectType::VIA, "gn[", true);
        assert_eq!(n, 0);
        let n = select_by_name(&mut b, &mut j, ObjectType::VIA, "gnd", true);
        assert_eq!(n, 1);
    }

    #[test]
    fn select_by_flag_finds_found_objects() {
        let mut b = board();
        let mut j = UndoJournal::new();
        let id = ops::create_via(
            &mut b.data,
            Point::new(100_000, 100_000),
            20_000,
            10_000,
            0,
            10_000,
            None,
            Flags::new(ObjectFlags::FOUND),
        );
        let n = select_by_flag(&mut b, &mut j, ObjectFlags::FOUND, true);
        assert_eq!(n, 1);
        assert!(b.data.via(id).unwrap().flags.has(ObjectFlags::SELECTED));
    }

    #[test]
    fn selection_changes_are_journaled() {
        let mut b = board();
        let mut j = UndoJournal::new();
        let id = ops::create_via(
            &mut b.data,
            Point::new(100_000, 100_000),
            20_000,
            10_000,
            0,
            10_000,
            None,
            Flags::default(),
        );
        select_block(&mut b, &mut j, BoxType::new(0, 0, 1_000_000, 1_000_000), true);
        j.inc_serial();
        assert!(b.data.via(id).unwrap().flags.has(ObjectFlags::SELECTED));
        j.undo(&mut b);
        assert!(!b.data.via(id).unwrap().flags.has(ObjectFlags::SELECTED));
    }
}
