//! Hit testing against the spatial trees.
//!
//! `search_screen` probes the trees in a fixed kind priority (point-like
//! conductors before area-like ones, upper layers before lower) and
//! returns the first entity whose true geometry covers the probe, not just
//! its bounding box. Among entries whose geometry ties exactly the winner
//! is unspecified; it falls out of tree traversal order, which depends on
//! insertion history.

use core_geom::{BoxType, Coord, Point};
use core_index::SearchControl;
use core_model::entity::{ObjectId, ObjectType};
use core_model::flags::ObjectFlags;
use core_model::{Board, clip};

/// A resolved hit: owner, entity and sub-entity in one tagged value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hit {
    Via { id: ObjectId },
    Pin { element: ObjectId, id: ObjectId },
    Pad { element: ObjectId, id: ObjectId },
    Element { id: ObjectId },
    ElementName { element: ObjectId, slot: usize },
    Line { layer: usize, id: ObjectId },
    LinePoint { layer: usize, id: ObjectId, second: bool },
    Arc { layer: usize, id: ObjectId },
    Text { layer: usize, id: ObjectId },
    Polygon { layer: usize, id: ObjectId },
    PolygonPoint { layer: usize, id: ObjectId, idx: usize },
    Rat { id: ObjectId },
}

impl Hit {
    pub fn object_type(&self) -> ObjectType {
        match self {
            Hit::Via { .. } => ObjectType::VIA,
            Hit::Pin { .. } => ObjectType::PIN,
            Hit::Pad { .. } => ObjectType::PAD,
            Hit::Element { .. } => ObjectType::ELEMENT,
            Hit::ElementName { .. } => ObjectType::ELEMENTNAME,
            Hit::Line { .. } => ObjectType::LINE,
            Hit::LinePoint { .. } => ObjectType::LINEPOINT,
            Hit::Arc { .. } => ObjectType::ARC,
            Hit::Text { .. } => ObjectType::TEXT,
            Hit::Polygon { .. } => ObjectType::POLYGON,
            Hit::PolygonPoint { .. } => ObjectType::POLYGONPOINT,
            Hit::Rat { .. } => ObjectType::RATLINE,
        }
    }

    /// Whether the hit entity carries the LOCK flag.
    pub fn locked(&self, board: &Board) -> bool {
        let data = &board.data;
        match *self {
            Hit::Via { id } => data.via(id).is_some_and(|v| v.flags.has(ObjectFlags::LOCK)),
            Hit::Pin { id, .. } => data
                .pin(id)
                .is_some_and(|(_, p)| p.flags.has(ObjectFlags::LOCK)),
            Hit::Pad { id, .. } => data
                .pad(id)
                .is_some_and(|(_, p)| p.flags.has(ObjectFlags::LOCK)),
            Hit::Element { id } => data
                .element(id)
                .is_some_and(|e| e.flags.has(ObjectFlags::LOCK)),
            Hit::ElementName { element, slot } => data
                .element(element)
                .is_some_and(|e| e.names[slot].flags.has(ObjectFlags::LOCK)),
            Hit::Line { layer, id } | Hit::LinePoint { layer, id, .. } => data
                .layers
                .get(layer)
                .and_then(|l| l.line(id))
                .is_some_and(|x| x.flags.has(ObjectFlags::LOCK)),
            Hit::Arc { layer, id } => data
                .layers
                .get(layer)
                .and_then(|l| l.arc(id))
                .is_some_and(|x| x.flags.has(ObjectFlags::LOCK)),
            Hit::Text { layer, id } => data
                .layers
                .get(layer)
                .and_then(|l| l.text(id))
                .is_some_and(|x| x.flags.has(ObjectFlags::LOCK)),
            Hit::Polygon { layer, id } | Hit::PolygonPoint { layer, id, .. } => data
                .layers
                .get(layer)
                .and_then(|l| l.polygon(id))
                .is_some_and(|x| x.flags.has(ObjectFlags::LOCK)),
            Hit::Rat { id } => data.rat(id).is_some_and(|r| r.flags.has(ObjectFlags::LOCK)),
        }
    }

    /// The journal reference for whole-object operations, when one exists.
    pub fn obj_ref(&self) -> Option<core_state::ObjRef> {
        Some(match *self {
            Hit::Via { id } => core_state::ObjRef::Via(id),
            Hit::Pin { id, .. } => core_state::ObjRef::Pin(id),
            Hit::Pad { id, .. } => core_state::ObjRef::Pad(id),
            Hit::Element { id } => core_state::ObjRef::Element(id),
            Hit::ElementName { element, slot } => {
                core_state::ObjRef::ElementName { element, slot }
            }
            Hit::Line { layer, id } | Hit::LinePoint { layer, id, .. } => {
                core_state::ObjRef::Line { layer, id }
            }
            Hit::Arc { layer, id } => core_state::ObjRef::Arc { layer, id },
            Hit::Text { layer, id } => core_state::ObjRef::Text { layer, id },
            Hit::Polygon { layer, id } | Hit::PolygonPoint { layer, id, .. } => {
                core_state::ObjRef::Polygon { layer, id }
            }
            Hit::Rat { id } => core_state::ObjRef::Rat(id),
        })
    }
}

fn probe_box(p: Point, radius: Coord) -> BoxType {
    BoxType::new(p.x - radius, p.y - radius, p.x + radius + 1, p.y + radius + 1)
}

/// Probe the board at `pos`. `mask` limits the kinds searched; include
/// `ObjectType::LOCKED` to see locked objects too. `radius` is the slop
/// around the probe point for point-grabs.
pub fn search_screen(
    board: &Board,
    current_layer: usize,
    pos: Point,
    radius: Coord,
    mask: ObjectType,
) -> Option<Hit> {
    let include_locked = mask.contains(ObjectType::LOCKED);
    let consider = |hit: Hit| -> Option<Hit> {
        if !include_locked && hit.locked(board) {
            None
        } else {
            Some(hit)
        }
    };
    let region = probe_box(pos, radius);
    let data = &board.data;

    // Point-like conductors take priority over everything under them.
    if mask.contains(ObjectType::PIN) {
        let mut found = None;
        data.pin_tree.search(&region, |_, id| {
            if let Some((e, pin)) = data.pin(id)
                && core_geom::distance(pos, pin.pos) <= (pin.thickness / 2 + radius) as f64
            {
                found = Some(Hit::Pin {
                    element: e.id,
                    id,
                });
                return SearchControl::Stop;
            }
            SearchControl::Continue
        });
        if let Some(hit) = found.and_then(consider) {
            return Some(hit);
        }
    }
    if mask.contains(ObjectType::VIA) {
        let mut found = None;
        data.via_tree.search(&region, |_, id| {
            if let Some(via) = data.via(id)
                && core_geom::distance(pos, via.pos) <= (via.thickness / 2 + radius) as f64
            {
                found = Some(Hit::Via { id });
                return SearchControl::Stop;
            }
            SearchControl::Continue
        });
        if let Some(hit) = found.and_then(consider) {
            return Some(hit);
        }
    }
    if mask.contains(ObjectType::PAD) {
        for side in [core_model::TOP_SIDE, core_model::BOTTOM_SIDE] {
            let mut found = None;
            data.pad_tree[side].search(&region, |_, id| {
                if let Some((e, pad)) = data.pad(id)
                    && core_geom::point_segment_distance(pos, pad.point1, pad.point2)
                        <= (pad.thickness / 2 + radius) as f64
                {
                    found = Some(Hit::Pad {
                        element: e.id,
                        id,
                    });
                    return SearchControl::Stop;
                }
                SearchControl::Continue
            });
            if let Some(hit) = found.and_then(consider) {
                return Some(hit);
            }
        }
    }
    if mask.contains(ObjectType::ELEMENTNAME) {
        for slot in 0..3 {
            let mut found = None;
            data.name_tree[slot].search(&region, |bb, id| {
                if bb.contains_point(pos) {
                    // Resolve the owning element by the text id.
                    if let Some(e) = data
                        .elements
                        .iter()
                        .find(|e| e.names[slot].id == id)
                    {
                        found = Some(Hit::ElementName {
                            element: e.id,
                            slot,
                        });
                        return SearchControl::Stop;
                    }
                }
                SearchControl::Continue
            });
            if let Some(hit) = found.and_then(consider) {
                return Some(hit);
            }
        }
    }

    // Layer objects, current layer first, then down the stack.
    let nlayers = data.layers.len();
    let layer_order =
        std::iter::once(current_layer).chain((0..nlayers).filter(move |&l| l != current_layer));
    for layer in layer_order {
        let l = &data.layers[layer];
        if !l.visible {
            continue;
        }
        if mask.contains(ObjectType::LINEPOINT) {
            let mut found = None;
            l.line_tree.search(&region, |_, id| {
                if let Some(line) = l.line(id) {
                    for (pt, second) in [(line.point1, false), (line.point2, true)] {
                        if core_geom::distance(pos, pt) <= radius.max(line.thickness / 2) as f64 {
                            found = Some(Hit::LinePoint { layer, id, second });
                            return SearchControl::Stop;
                        }
                    }
                }
                SearchControl::Continue
            });
            if let Some(hit) = found.and_then(consider) {
                return Some(hit);
            }
        }
        if mask.contains(ObjectType::LINE) {
            let mut found = None;
            l.line_tree.search(&region, |_, id| {
                if let Some(line) = l.line(id)
                    && core_geom::point_segment_distance(pos, line.point1, line.point2)
                        <= (line.thickness / 2 + radius) as f64
                {
                    found = Some(Hit::Line { layer, id });
                    return SearchControl::Stop;
                }
                SearchControl::Continue
            });
            if let Some(hit) = found.and_then(consider) {
                return Some(hit);
            }
        }
        if mask.contains(ObjectType::ARC) {
            let mut found = None;
            l.arc_tree.search(&region, |bb, id| {
                if bb.contains_point(pos) && l.arc(id).is_some() {
                    found = Some(Hit::Arc { layer, id });
                    return SearchControl::Stop;
                }
                SearchControl::Continue
            });
            if let Some(hit) = found.and_then(consider) {
                return Some(hit);
            }
        }
        if mask.contains(ObjectType::TEXT) {
            let mut found = None;
            l.text_tree.search(&region, |bb, id| {
                if bb.contains_point(pos) && l.text(id).is_some() {
                    found = Some(Hit::Text { layer, id });
                    return SearchControl::Stop;
                }
                SearchControl::Continue
            });
            if let Some(hit) = found.and_then(consider) {
                return Some(hit);
            }
        }
        if mask.contains(ObjectType::POLYGONPOINT) {
            let mut found = None;
            l.polygon_tree.search(&region, |_, id| {
                if let Some(poly) = l.polygon(id) {
                    for (idx, pt) in poly.points.iter().enumerate() {
                        if core_geom::distance(pos, *pt) <= radius as f64 {
                            found = Some(Hit::PolygonPoint { layer, id, idx });
                            return SearchControl::Stop;
                        }
                    }
                }
                SearchControl::Continue
            });
            if let Some(hit) = found.and_then(consider) {
                return Some(hit);
            }
        }
        if mask.contains(ObjectType::POLYGON) {
            let mut found = None;
            l.polygon_tree.search(&region, |_, id| {
                if clip::is_point_in_polygon(board, layer, id, pos) {
                    found = Some(Hit::Polygon { layer, id });
                    return SearchControl::Stop;
                }
                SearchControl::Continue
            });
            if let Some(hit) = found.and_then(consider) {
                return Some(hit);
            }
        }
    }

    if mask.contains(ObjectType::ELEMENT) {
        let mut found = None;
        data.element_tree.search(&region, |bb, id| {
            if bb.contains_point(pos) && data.element(id).is_some() {
                found = Some(Hit::Element { id });
                return SearchControl::Stop;
            }
            SearchControl::Continue
        });
        if let Some(hit) = found.and_then(consider) {
            return Some(hit);
        }
    }
    if mask.contains(ObjectType::RATLINE) {
        let mut found = None;
        data.rat_tree.search(&region, |_, id| {
            if let Some(rat) = data.rat(id)
                && core_geom::point_segment_distance(pos, rat.point1, rat.point2)
                    <= (rat.thickness / 2 + radius) as f64
            {
                found = Some(Hit::Rat { id });
                return SearchControl::Stop;
            }
            SearchControl::Continue
        });
        if let Some(hit) = found.and_then(consider) {
            return Some(hit);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_model::flags::Flags;
    use core_model::ops;

    fn board() -> Board {
        Board::new(2, 1_000_000, 1_000_000)
    }

    #[test]
    fn finds_via_at_point() {
        let mut b = board();
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
        let hit = search_screen(
            &b,
            0,
            Point::new(100_000, 100_000),
            100,
            ObjectType::VIA | ObjectType::LINE,
        );
        assert_eq!(hit, Some(Hit::Via { id }));
        // Outside the annulus: no hit.
        assert_eq!(
            search_screen(&b, 0, Point::new(130_000, 100_000), 100, ObjectType::VIA),
            None
        );
    }

    #[test]
    fn mask_excludes_kinds() {
        let mut b = board();
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
        assert_eq!(
            search_screen(&b, 0, Point::new(100_000, 100_000), 100, ObjectType::LINE),
            None
        );
    }

    #[test]
    fn line_point_beats_line_body() {
        let mut b = board();
        let id = ops::create_line(
            &mut b.data,
            0,
            Point::new(0, 0),
            Point::new(100_000, 0),
            10_000,
            4_000,
            Flags::default(),
        )
        .expect("line");
        let hit = search_screen(
            &b,
            0,
            Point::new(100_000, 0),
            200,
            ObjectType::LINE | ObjectType::LINEPOINT,
        );
        assert_eq!(
            hit,
            Some(Hit::LinePoint {
                layer: 0,
                id,
                second: true
            })
        );
        let mid = search_screen(
            &b,
            0,
            Point::new(50_000, 0),
            200,
            ObjectType::LINE | ObjectType::LINEPOINT,
        );
        assert_eq!(mid, Some(Hit::Line { layer: 0, id }));
    }

    #[test]
    fn locked_objects_need_the_locked_mask() {
        let mut b = board();
        let id = ops::create_via(
            &mut b.data,
            Point::new(100_000, 100_000),
            20_000,
            10_000,
            0,
            10_000,
            None,
            Flags::new(ObjectFlags::LOCK),
        );
        assert_eq!(
            search_screen(&b, 0, Point::new(100_000, 100_000), 100, ObjectType::VIA),
            None
        );
        assert_eq!(
            search_screen(
                &b,
                0,
                Point::new(100_000, 100_000),
                100,
                ObjectType::VIA | ObjectType::LOCKED
            ),
            Some(Hit::Via { id })
        );
    }

    #[test]
    fn polygon_hit_uses_effective_shape() {
        let mut b = board();
        let pid = ops::create_polygon(
            &mut b.data,
            0,
            vec![
                Point::new(0, 0),
                Point::new(200_000, 0),
                Point::new(200_000, 200_000),
                Point::new(0, 200_000),
            ],
            vec![],
            Flags::new(ObjectFlags::CLEARPOLY),
        )
        .expect("poly");
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
        core_model::clip::reclip_dirty(&mut b);
        // Probe inside the clearance hole: the polygon does not answer.
        assert_eq!(
            search_screen(&b, 0, Point::new(100_000, 100_000), 0, ObjectType::POLYGON),
            None
        );
        assert_eq!(
            search_screen(&b, 0, Point::new(10_000, 10_000), 0, ObjectType::POLYGON),
            Some(Hit::Polygon { layer: 0, id: pid })
        );
    }
}
