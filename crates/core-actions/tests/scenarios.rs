//! End-to-end dispatcher scenarios: literal action sequences against a
//! fresh board, checked for both the visible result and the undo history.

mod common;

use common::{ctx, place_element, run, run_expect_fail};
use core_geom::{MIL, Point};
use core_model::flags::{Flags, ObjectFlags};
use core_model::ops;

#[test]
fn via_place_undo_redo() {
    let mut c = ctx();
    let serial_before = c.journal.serial();
    run(&mut c, "Mode(Via); Notify(10000, 10000)");
    assert_eq!(c.board.data.vias.len(), 1);
    assert_eq!(c.board.data.vias[0].pos, Point::new(10_000, 10_000));
    assert_eq!(c.journal.serial(), serial_before + 1);

    run(&mut c, "Undo()");
    assert!(c.board.data.vias.is_empty());
    assert_eq!(c.board.data.via_tree.len(), 0);

    run(&mut c, "Redo()");
    assert_eq!(c.board.data.vias.len(), 1);
    assert_eq!(c.board.data.vias[0].pos, Point::new(10_000, 10_000));
}

#[test]
fn clear_lines_cast_two_holes_into_polygon() {
    let mut c = ctx();
    // Two interior lines first, then the polygon over them.
    let t = 10 * MIL;
    let keep = 2 * 10 * MIL; // stored clearance, twice the gap
    for y in [150, 250] {
        ops::create_line(
            &mut c.board.data,
            0,
            Point::new(100 * MIL, y * MIL),
            Point::new(300 * MIL, y * MIL),
            t,
            keep,
            Flags::new(ObjectFlags::CLEARLINE),
        )
        .expect("line");
    }
    ops::create_polygon(
        &mut c.board.data,
        0,
        vec![
            Point::new(50 * MIL, 50 * MIL),
            Point::new(350 * MIL, 50 * MIL),
            Point::new(350 * MIL, 350 * MIL),
            Point::new(50 * MIL, 350 * MIL),
        ],
        vec![],
        Flags::new(ObjectFlags::CLEARPOLY),
    )
    .expect("poly");
    core_model::clip::reclip_dirty(&mut c.board);
    let poly = &c.board.data.layers[0].polygons[0];
    let shape = poly.clipped.as_ref().expect("clipped");
    assert_eq!(shape.islands.len(), 1);
    assert_eq!(shape.hole_count(), 2, "one hole per clearing line");
    // The subtraction width is thickness plus twice the per-side gap: the
    // stroke top edge sits at y - (t + keep)/2.
    let half = (t + keep) / 2;
    assert!(!shape.contains(Point::new(200 * MIL, 150 * MIL)));
    assert!(!shape.contains(Point::new(200 * MIL, 150 * MIL + half - 2 * MIL)));
    assert!(shape.contains(Point::new(200 * MIL, 150 * MIL + half + 2 * MIL)));
    assert!(shape.contains(Point::new(200 * MIL, 200 * MIL)));
}

#[test]
fn atomic_block_without_edits_changes_nothing() {
    let mut c = ctx();
    run(&mut c, "Mode(Via); Notify(10000, 10000)");
    let serial = c.journal.serial();
    let depth = c.journal.undo_depth();
    run(&mut c, "Atomic(Save); Atomic(Block)");
    assert_eq!(c.journal.serial(), serial);
    assert_eq!(c.journal.undo_depth(), depth);
}

#[test]
fn remove_element_under_atomic_close_restores_on_undo() {
    let mut c = ctx();
    let at = Point::new(500 * MIL, 500 * MIL);
    let (_, pin_id) = place_element(&mut c, at);
    c.board.netlist.add_connection("GND", "U1-1");

    run(&mut c, "Atomic(Save)");
    run(&mut c, "Mode(Remove)");
    run(&mut c, &format!("Notify({}, {})", at.x, at.y));
    run(&mut c, "Atomic(Close)");
    assert!(c.board.data.elements.is_empty());
    assert!(c.board.data.pin(pin_id).is_none());

    run(&mut c, "Undo()");
    assert_eq!(c.board.data.elements.len(), 1);
    let (element, pin) = c.board.data.pin(pin_id).expect("pin restored");
    assert_eq!(pin.pos, at);
    assert_eq!(element.refdes(), "U1");
    // Net linkage is by name and survives untouched.
    assert!(c.board.netlist.net_of_connection("U1-1").is_some());
}

#[test]
fn buffer_rotate_twice_twice_pastes_in_place() {
    let mut c = ctx();
    let p = Point::new(400 * MIL, 300 * MIL);
    ops::create_via(
        &mut c.board.data,
        p,
        60 * MIL,
        20 * MIL,
        0,
        28 * MIL,
        None,
        Flags::default(),
    );
    run(
        &mut c,
        &format!("Select(Block, {}, {}, {}, {})", 0, 0, 1000 * MIL, 1000 * MIL),
    );
    // Pick up at the via position so paste coordinates read directly.
    c.crosshair.pos = p;
    run(&mut c, "PasteBuffer(AddSelected)");
    run(&mut c, "PasteBuffer(Rotate, 2); PasteBuffer(Rotate, 2)");
    run(&mut c, &format!("PasteBuffer(ToLayout, {}, {})", p.x, p.y));
    // The paste landed exactly on the original.
    let at_p = c
        .board
        .data
        .vias
        .iter()
        .filter(|v| v.pos == p)
        .count();
    assert_eq!(at_p, 2);
}

#[test]
fn undo_n_redo_n_restores_state() {
    let mut c = ctx();
    run(&mut c, "Mode(Via); Notify(10000, 10000); Notify(30000, 30000)");
    run(&mut c, "Mode(Line); Notify(100000, 100000); Notify(200000, 100000)");
    let vias: Vec<Point> = c.board.data.vias.iter().map(|v| v.pos).collect();
    let lines: Vec<(Point, Point)> = c.board.data.layers[0]
        .lines
        .iter()
        .map(|l| (l.point1, l.point2))
        .collect();
    let groups = c.journal.undo_groups();
    assert!(groups >= 3);
    for _ in 0..groups {
        run(&mut c, "Undo()");
    }
    assert!(c.board.data.vias.is_empty());
    assert!(c.board.data.layers[0].lines.is_empty());
    for _ in 0..groups {
        run(&mut c, "Redo()");
    }
    let vias_after: Vec<Point> = c.board.data.vias.iter().map(|v| v.pos).collect();
    let lines_after: Vec<(Point, Point)> = c.board.data.layers[0]
        .lines
        .iter()
        .map(|l| (l.point1, l.point2))
        .collect();
    assert_eq!(vias, vias_after);
    assert_eq!(lines, lines_after);
}

#[test]
fn zero_length_line_is_a_geometry_error() {
    let mut c = ctx();
    run(&mut c, "Mode(Line); Notify(100000, 100000)");
    run_expect_fail(&mut c, "Notify(100000, 100000)");
    assert!(c.board.data.layers[0].lines.is_empty());
    // The anchor survives; a different second point still draws.
    run(&mut c, "Notify(150000, 100000)");
    assert_eq!(c.board.data.layers[0].lines.len(), 1);
}

#[test]
fn via_on_pin_center_is_legal() {
    let mut c = ctx();
    let at = Point::new(600 * MIL, 600 * MIL);
    place_element(&mut c, at);
    run(&mut c, &format!("Mode(Via); Notify({}, {})", at.x, at.y));
    assert_eq!(c.board.data.vias.len(), 1);
    assert_eq!(c.board.data.vias[0].pos, at);
}

#[test]
fn lock_refuses_move_rotate_remove_but_not_naming() {
    let mut c = ctx();
    let at = Point::new(500 * MIL, 500 * MIL);
    let id = ops::create_via(
        &mut c.board.data,
        at,
        60 * MIL,
        20 * MIL,
        0,
        28 * MIL,
        None,
        Flags::new(ObjectFlags::LOCK),
    );
    c.crosshair.pos = at;
    run_expect_fail(&mut c, &format!("Mode(Remove); Notify({}, {})", at.x, at.y));
    assert_eq!(c.board.data.vias.len(), 1);
    run_expect_fail(&mut c, &format!("Mode(Rotate); Notify({}, {})", at.x, at.y));
    run_expect_fail(&mut c, &format!("Mode(Move); Notify({}, {})", at.x, at.y));
    // Naming works on locked objects.
    run(&mut c, "ChangeName(Object, V99)");
    assert_eq!(c.board.data.via(id).unwrap().name.as_deref(), Some("V99"));
    // Flag change works too.
    run(&mut c, "ChangeFlag(Object, octagon, 1)");
    assert!(c.board.data.via(id).unwrap().flags.has(ObjectFlags::OCTAGON));
}

#[test]
fn polygon_tool_closes_on_first_point() {
    let mut c = ctx();
    run(&mut c, "Mode(Polygon)");
    run(&mut c, "Notify(100000, 100000)");
    run(&mut c, "Notify(300000, 100000)");
    run(&mut c, "Notify(300000, 300000)");
    assert!(c.board.data.layers[0].polygons.is_empty());
    // Clicking the first point closes.
    run(&mut c, "Notify(100000, 100000)");
    assert_eq!(c.board.data.layers[0].polygons.len(), 1);
    let poly = &c.board.data.layers[0].polygons[0];
    assert_eq!(poly.points.len(), 3);
    assert!(poly.flags.has(ObjectFlags::CLEARPOLY));
    // One undo takes the whole polygon.
    run(&mut c, "Undo()");
    assert!(c.board.data.layers[0].polygons.is_empty());
}

#[test]
fn polygon_hole_needs_a_polygon_and_three_points() {
    let mut c = ctx();
    ops::create_polygon(
        &mut c.board.data,
        0,
        vec![
            Point::new(100 * MIL, 100 * MIL),
            Point::new(500 * MIL, 100 * MIL),
            Point::new(500 * MIL, 500 * MIL),
            Point::new(100 * MIL, 500 * MIL),
        ],
        vec![],
        Flags::new(ObjectFlags::CLEARPOLY),
    )
    .expect("poly");
    run(&mut c, "Mode(PolygonHole)");
    // First click outside any polygon: refused politely, nothing armed.
    run(&mut c, "Notify(900000, 900000)");
    // Hole contour inside the polygon.
    run(&mut c, &format!("Notify({}, {})", 200 * MIL, 200 * MIL));
    run(&mut c, &format!("Notify({}, {})", 300 * MIL, 200 * MIL));
    run(&mut c, &format!("Notify({}, {})", 300 * MIL, 300 * MIL));
    // Closing click on the first hole point.
    run(&mut c, &format!("Notify({}, {})", 200 * MIL, 200 * MIL));
    {
        let polys = &c.board.data.layers[0].polygons;
        assert_eq!(polys.len(), 1);
        assert_eq!(polys[0].hole_indices.len(), 1, "hole ring recorded");
    }
    // The hole interior is no longer copper.
    core_model::clip::reclip_dirty(&mut c.board);
    let polys = &c.board.data.layers[0].polygons;
    let shape = polys[0].clipped.as_ref().expect("clipped");
    assert!(!shape.contains(Point::new(250 * MIL, 220 * MIL)));
    assert!(shape.contains(Point::new(150 * MIL, 150 * MIL)));
    // One undo restores the original, hole-free polygon.
    run(&mut c, "Undo()");
    let polys = &c.board.data.layers[0].polygons;
    assert_eq!(polys.len(), 1);
    assert!(polys[0].hole_indices.is_empty());
}

#[test]
fn selection_survives_undo_boundary() {
    let mut c = ctx();
    run(&mut c, "Mode(Via); Notify(254000, 254000)");
    run(
        &mut c,
        &format!("Select(Block, 0, 0, {}, {})", 1000 * MIL, 1000 * MIL),
    );
    assert!(c.board.data.vias[0].flags.has(ObjectFlags::SELECTED));
    run(&mut c, "Undo()");
    assert!(!c.board.data.vias[0].flags.has(ObjectFlags::SELECTED));
    run(&mut c, "Redo()");
    assert!(c.board.data.vias[0].flags.has(ObjectFlags::SELECTED));
}

#[test]
fn element_to_buffer_smash_convert_cycle() {
    let mut c = ctx();
    let p = Point::new(400 * MIL, 300 * MIL);
    ops::create_via(
        &mut c.board.data,
        p,
        60 * MIL,
        20 * MIL,
        0,
        28 * MIL,
        None,
        Flags::default(),
    );
    run(
        &mut c,
        &format!("Select(Block, 0, 0, {}, {})", 1000 * MIL, 1000 * MIL),
    );
    c.crosshair.pos = p;
    run(&mut c, "PasteBuffer(AddSelected); PasteBuffer(Convert)");
    assert_eq!(c.buffers.current_buffer().data.elements.len(), 1);
    run(&mut c, "PasteBuffer(Smash)");
    assert!(c.buffers.current_buffer().data.elements.is_empty());
    assert_eq!(c.buffers.current_buffer().data.vias.len(), 1);
}

#[test]
fn escape_steps_back_to_arrow() {
    let mut c = ctx();
    run(&mut c, "Mode(Line); Notify(100000, 100000)");
    assert_eq!(c.crosshair.mode, core_actions::Mode::Line);
    // First escape clears the armed anchor, second leaves the tool.
    run(&mut c, "Mode(Escape)");
    assert_eq!(c.crosshair.mode, core_actions::Mode::Line);
    assert_eq!(
        c.crosshair.attached_line.state,
        core_actions::DrawState::First
    );
    run(&mut c, "Mode(Escape)");
    assert_eq!(c.crosshair.mode, core_actions::Mode::Arrow);
}

#[test]
fn unknown_action_fails_with_exit_code() {
    let mut c = ctx();
    run_expect_fail(&mut c, "Zorkmid()");
    run_expect_fail(&mut c, "Mode(NoSuchTool)");
}

#[test]
fn select_by_name_uses_regex_with_literal_fallback() {
    let mut c = ctx();
    ops::create_via(
        &mut c.board.data,
        Point::new(100 * MIL, 100 * MIL),
        60 * MIL,
        20 * MIL,
        0,
        28 * MIL,
        Some("CLK1".into()),
        Flags::default(),
    );
    run(&mut c, "Select(ObjectByName, ^clk[0-9]$)");
    assert!(c.board.data.vias[0].flags.has(ObjectFlags::SELECTED));
    run(&mut c, "Unselect(All)");
    assert!(!c.board.data.vias[0].flags.has(ObjectFlags::SELECTED));
}
