//! Shared helpers for the dispatcher scenario tests.

use core_actions::Context;
use core_geom::{BoxType, Point};
use core_model::entity::{Element, ObjectId, Text, Via};
use core_model::flags::{Flags, ObjectFlags};
use core_model::ops;

/// A fresh headless context with the default board.
pub fn ctx() -> Context {
    Context::headless()
}

/// Run an action line, asserting it succeeds.
pub fn run(ctx: &mut Context, line: &str) {
    let code = core_actions::execute_actions(ctx, line);
    assert_eq!(code, 0, "action line failed: {line}");
}

/// Run an action line expecting a failure exit code.
pub fn run_expect_fail(ctx: &mut Context, line: &str) {
    let code = core_actions::execute_actions(ctx, line);
    assert_ne!(code, 0, "action line unexpectedly succeeded: {line}");
}

/// Place a one-pin element with refdes `U1`, pin number 1, at `at`.
pub fn place_element(ctx: &mut Context, at: Point) -> (ObjectId, ObjectId) {
    let data = &mut ctx.board.data;
    let pin_id = data.alloc_id();
    let mut pin = Via {
        id: pin_id,
        pos: at,
        thickness: 60 * core_geom::MIL,
        clearance: 20 * core_geom::MIL,
        mask: 0,
        drilling_hole: 28 * core_geom::MIL,
        name: Some("1".into()),
        number: Some("1".into()),
        buried_from: 0,
        buried_to: 0,
        flags: Flags::new(ObjectFlags::PIN),
        bbox: BoxType::empty(),
    };
    pin.update_bbox();
    let names = std::array::from_fn(|i| {
        let id = data.alloc_id();
        let mut t = Text {
            id,
            pos: at,
            direction: 0,
            scale: 100,
            string: ["", "U1", ""][i].to_string(),
            font: 0,
            flags: Flags::default(),
            bbox: BoxType::empty(),
        };
        t.update_bbox();
        t
    });
    let element = Element {
        id: data.alloc_id(),
        mark: at,
        names,
        pins: vec![pin],
        pads: vec![],
        lines: vec![],
        arcs: vec![],
        attributes: Default::default(),
        flags: Flags::default(),
        bbox: BoxType::empty(),
    };
    let eid = ops::insert_element(data, element);
    (eid, pin_id)
}
