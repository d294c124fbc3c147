//! Rubberband collection: lines whose endpoint coincides with a point on a
//! moved entity follow that point rigidly.

use crate::search::Hit;
use core_geom::{BoxType, Coord, Point};
use core_index::SearchControl;
use core_model::Board;
use core_model::entity::ObjectId;

/// One attached line endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RubberAttach {
    pub layer: usize,
    pub line: ObjectId,
    pub second_point: bool,
}

/// Lines whose endpoint lies within half their own thickness of `p`,
/// across every copper layer. `exclude` drops the moved line itself.
pub fn lines_at_point(board: &Board, p: Point, exclude: Option<(usize, ObjectId)>) -> Vec<RubberAttach> {
    let mut out = Vec::new();
    for (layer, l) in board.data.layers.iter().enumerate() {
        if layer >= board.data.copper_count {
            break;
        }
        // Probe with a generous pad; the per-line radius check is exact.
        let region = BoxType::new(p.x - 1, p.y - 1, p.x + 2, p.y + 2).expand(0);
        let mut grow = 0;
        for line in &l.lines {
            grow = grow.max(line.thickness / 2);
        }
        let region = region.expand(grow);
        l.line_tree.search(&region, |_, id| {
            if exclude == Some((layer, id)) {
                return SearchControl::Continue;
            }
            if let Some(line) = l.line(id) {
                let radius = (line.thickness / 2) as f64;
                for (pt, second) in [(line.point1, false), (line.point2, true)] {
                    if core_geom::distance(p, pt) <= radius {
                        out.push(RubberAttach {
                            layer,
                            line: id,
                            second_point: second,
                        });
                    }
                }
            }
            SearchControl::Continue
        });
    }
    out
}

/// The anchor points a moved entity drags rubberband lines by.
pub fn anchor_points(board: &Board, hit: &Hit) -> Vec<Point> {
    let data = &board.data;
    match *hit {
        Hit::Via { id } => data.via(id).map(|v| vec![v.pos]).unwrap_or_default(),
        Hit::Pin { id, .. } => data.pin(id).map(|(_, p)| vec![p.pos]).unwrap_or_default(),
        Hit::Pad { id, .. } => data
            .pad(id)
            .map(|(_, p)| vec![p.point1, p.point2])
            .unwrap_or_default(),
        Hit::Line { layer, id } => data
            .layers
            .get(layer)
            .and_then(|l| l.line(id))
            .map(|l| vec![l.point1, l.point2])
            .unwrap_or_default(),
        Hit::LinePoint {
            layer, id, second, ..
        } => data
            .layers
            .get(layer)
            .and_then(|l| l.line(id))
            .map(|l| vec![if second { l.point2 } else { l.point1 }])
            .unwrap_or_default(),
        Hit::Element { id } => data
            .element(id)
            .map(|e| {
                let mut pts: Vec<Point> = e.pins.iter().map(|p| p.pos).collect();
                for pad in &e.pads {
                    pts.push(pad.point1);
                    pts.push(pad.point2);
                }
                pts
            })
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

/// Collect the full rubberband set for a moved entity.
pub fn collect(board: &Board, hit: &Hit) -> Vec<RubberAttach> {
    let exclude = match *hit {
        Hit::Line { layer, id } | Hit::LinePoint { layer, id, .. } => Some((layer, id)),
        _ => None,
    };
    let mut out: Vec<RubberAttach> = Vec::new();
    for p in anchor_points(board, hit) {
        for attach in lines_at_point(board, p, exclude) {
            if !out.contains(&attach) {
                out.push(attach);
            }
        }
    }
    out
}

/// Rat lines with an endpoint within `radius` of `p`.
pub fn rats_at_point(board: &Board, p: Point, radius: Coord) -> Vec<(ObjectId, bool)> {
    let mut out = Vec::new();
    let region = BoxType::new(p.x - radius, p.y - radius, p.x + radius + 1, p.y + radius + 1);
    board.data.rat_tree.search(&region, |_, id| {
        if let Some(rat) = board.data.rat(id) {
            if core_geom::distance(p, rat.point1) <= radius as f64 {
                out.push((id, false));
            }
            if core_geom::distance(p, rat.point2) <= radius as f64 {
                out.push((id, true));
            }
        }
        SearchControl::Continue
    });
    out
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
    fn collects_lines_touching_a_via() {
        let mut b = board();
        let vid = ops::create_via(
            &mut b.data,
            Point::new(100_000, 100_000),
            20_000,
            10_000,
            0,
            10_000,
            None,
            Flags::default(),
        );
        let l1 = ops::create_line(
            &mut b.data,
            0,
            Point::new(100_000, 100_000),
            Point::new(200_000, 100_000),
            10_000,
            4_000,
            Flags::default(),
        )
        .expect("line");
        // Far line: not attached.
        ops::create_line(
            &mut b.data,
            0,
            Point::new(300_000, 300_000),
            Point::new(400_000, 300_000),
            10_000,
            4_000,
            Flags::default(),
        )
        .expect("line");
        let set = collect(&b, &Hit::Via { id: vid });
        assert_eq!(
            set,
            vec![RubberAttach {
                layer: 0,
                line: l1,
                second_point: false
            }]
        );
    }

    #[test]
    fn endpoint_must_be_within_half_thickness() {
        let mut b = board();
        let vid = ops::create_via(
            &mut b.data,
            Point::new(100_000, 100_000),
            20_000,
            10_000,
            0,
            10_000,
            None,
            Flags::default(),
        );
        // Endpoint 6000 away, thickness 10000 -> radius 5000: not attached.
        ops::create_line(
            &mut b.data,
            0,
            Point::new(106_000, 100_000),
            Point::new(200_000, 100_000),
            10_000,
            4_000,
            Flags::default(),
        )
        .expect("line");
        assert!(collect(&b, &Hit::Via { id: vid }).is_empty());
        // Endpoint 4000 away: attached.
        let near = ops::create_line(
            &mut b.data,
            0,
            Point::new(104_000, 100_000),
            Point::new(200_000, 200_000),
            10_000,
            4_000,
            Flags::default(),
        )
        .expect("line");
        let set = collect(&b, &Hit::Via { id: vid });
        assert_eq!(set.len(), 1);
        assert_eq!(set[0].line, near);
    }

    #[test]
    fn moved_line_excludes_itself() {
        let mut b = board();
        let l1 = ops::create_line(
            &mut b.data,
            0,
            Point::new(0, 0),
            Point::new(100_000, 0),
            10_000,
            4_000,
            Flags::default(),
        )
        .expect("line");
        let l2 = ops::create_line(
            &mut b.data,
            0,
            Point::new(100_000, 0),
            Point::new(200_000, 0),
            10_000,
            4_000,
            Flags::default(),
        )
        .expect("line");
        let set = collect(&b, &Hit::Line { layer: 0, id: l1 });
        assert_eq!(set.len(), 1);
        assert_eq!(set[0].line, l2);
        assert!(!set[0].second_point);
    }
}
