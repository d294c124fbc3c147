//! Typed board entities and their cached bounding boxes.
//!
//! Every entity carries a stable `ObjectId`, its flag state and a cached
//! bounding box. The box is recomputed from the primary attributes by
//! `update_bbox` whenever those change; the invariant that cache and
//! computation agree is what the spatial index relies on.

use crate::flags::{Flags, ObjectFlags};
use core_geom::{Angle, BoxType, Coord, MIL, Point, arc::arc_bounding_box};

/// Stable identity of an entity, unique within one board or buffer.
pub type ObjectId = u64;

bitflags::bitflags! {
    /// Entity kind masks used by hit testing and per-kind operations.
    /// Values are shared with the file format's numeric flag fields.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ObjectType: u32 {
        const VIA           = 0x0000_0001;
        const ELEMENT       = 0x0000_0002;
        const LINE          = 0x0000_0004;
        const POLYGON       = 0x0000_0008;
        const TEXT          = 0x0000_0010;
        const RATLINE       = 0x0000_0020;
        const PIN           = 0x0000_0100;
        const PAD           = 0x0000_0200;
        const ELEMENTNAME   = 0x0000_0400;
        const POLYGONPOINT  = 0x0000_0800;
        const LINEPOINT     = 0x0000_1000;
        const ELEMENTLINE   = 0x0000_2000;
        const ARC           = 0x0000_4000;
        const ELEMENTARC    = 0x0000_8000;
        /// Ask search to include locked objects.
        const LOCKED        = 0x0001_0000;
        const ARCPOINT      = 0x0004_0000;
    }
}

impl ObjectType {
    pub const PIN_TYPES: ObjectType = ObjectType::VIA.union(ObjectType::PIN);
    /// Kinds the lock tool operates on.
    pub const LOCK_TYPES: ObjectType = ObjectType::VIA
        .union(ObjectType::LINE)
        .union(ObjectType::ARC)
        .union(ObjectType::POLYGON)
        .union(ObjectType::ELEMENT)
        .union(ObjectType::TEXT)
        .union(ObjectType::ELEMENTNAME)
        .union(ObjectType::LOCKED);
}

/// A via, or (owned by an element) a pin. The two share every field except
/// the element-relative naming, so the model keeps one struct and the PIN /
/// VIA flag bit tells them apart where it matters.
#[derive(Debug, Clone, PartialEq)]
pub struct Via {
    pub id: ObjectId,
    pub pos: Point,
    /// Copper annulus diameter.
    pub thickness: Coord,
    /// Full clearance gap (twice the per-side keepaway).
    pub clearance: Coord,
    /// Solder mask aperture diameter.
    pub mask: Coord,
    pub drilling_hole: Coord,
    pub name: Option<String>,
    /// Pin number within the element; empty for plain vias.
    pub number: Option<String>,
    /// Buried span: copper exists on layers `from..=to`; (0, 0) means
    /// through-hole.
    pub buried_from: u8,
    pub buried_to: u8,
    pub flags: Flags,
    pub bbox: BoxType,
}

impl Via {
    pub fn compute_bbox(&self) -> BoxType {
        let half = ((self.thickness + self.clearance + 1) / 2).max((self.mask + 1) / 2);
        BoxType::new(
            self.pos.x - half,
            self.pos.y - half,
            self.pos.x + half + 1,
            self.pos.y + half + 1,
        )
    }

    pub fn update_bbox(&mut self) {
        self.bbox = self.compute_bbox();
    }

    pub fn is_through_hole(&self) -> bool {
        self.buried_from == 0 && self.buried_to == 0
    }

    /// Whether the via's copper reaches `layer` of a stack with
    /// `copper_layers` layers.
    pub fn pierces_layer(&self, layer: usize) -> bool {
        if self.is_through_hole() {
            return true;
        }
        (self.buried_from as usize) <= layer && layer <= (self.buried_to as usize)
    }
}

/// A surface-mount pad: a stadium (or, with SQUARE, a rectangle) between two
/// points. Equal points degrade to a round/square dot.
#[derive(Debug, Clone, PartialEq)]
pub struct Pad {
    pub id: ObjectId,
    pub point1: Point,
    pub point2: Point,
    pub thickness: Coord,
    pub clearance: Coord,
    pub mask: Coord,
    pub name: Option<String>,
    pub number: Option<String>,
    pub flags: Flags,
    pub bbox: BoxType,
}

impl Pad {
    pub fn compute_bbox(&self) -> BoxType {
        let half = ((self.thickness + self.clearance + 1) / 2).max((self.mask + 1) / 2);
        BoxType::new(
            self.point1.x.min(self.point2.x) - half,
            self.point1.y.min(self.point2.y) - half,
            self.point1.x.max(self.point2.x) + half + 1,
            self.point1.y.max(self.point2.y) + half + 1,
        )
    }

    pub fn update_bbox(&mut self) {
        self.bbox = self.compute_bbox();
    }

    pub fn on_solder_side(&self) -> bool {
        self.flags.has(ObjectFlags::ONSOLDER)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub id: ObjectId,
    pub point1: Point,
    pub point2: Point,
    pub thickness: Coord,
    pub clearance: Coord,
    pub flags: Flags,
    pub bbox: BoxType,
}

impl Line {
    pub fn compute_bbox(&self) -> BoxType {
        let half = (self.thickness + self.clearance + 1) / 2;
        BoxType::new(
            self.point1.x.min(self.point2.x) - half,
            self.point1.y.min(self.point2.y) - half,
            self.point1.x.max(self.point2.x) + half + 1,
            self.point1.y.max(self.point2.y) + half + 1,
        )
    }

    pub fn update_bbox(&mut self) {
        self.bbox = self.compute_bbox();
    }

    pub fn length(&self) -> f64 {
        core_geom::distance(self.point1, self.point2)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Arc {
    pub id: ObjectId,
    pub center: Point,
    /// Horizontal radius.
    pub width: Coord,
    /// Vertical radius.
    pub height: Coord,
    pub start_angle: i32,
    pub delta: i32,
    pub thickness: Coord,
    pub clearance: Coord,
    pub flags: Flags,
    pub bbox: BoxType,
}

impl Arc {
    pub fn compute_bbox(&self) -> BoxType {
        let half = (self.thickness + self.clearance + 1) / 2;
        arc_bounding_box(
            self.center,
            self.width,
            self.height,
            self.start_angle as Angle,
            self.delta as Angle,
        )
        .expand(half)
    }

    pub fn update_bbox(&mut self) {
        self.bbox = self.compute_bbox();
    }

    pub fn endpoints(&self) -> (Point, Point) {
        core_geom::arc_endpoints(
            self.center,
            self.width,
            self.height,
            self.start_angle as Angle,
            self.delta as Angle,
        )
    }
}

/// Default-font glyph cell at scale 100, used for text extents. The real
/// font lives with the rendering collaborator; the core only needs a stable
/// footprint for indexing and hit tests.
pub const GLYPH_ADVANCE: Coord = 60 * MIL;
pub const GLYPH_HEIGHT: Coord = 80 * MIL;

#[derive(Debug, Clone, PartialEq)]
pub struct Text {
    pub id: ObjectId,
    pub pos: Point,
    /// Quarter turns counter-clockwise, 0..=3.
    pub direction: u8,
    /// Percent of the default font size.
    pub scale: u16,
    pub string: String,
    /// Font slot; resolved by the rendering collaborator.
    pub font: u8,
    pub flags: Flags,
    pub bbox: BoxType,
}

impl Text {
    pub fn compute_bbox(&self) -> BoxType {
        let chars = self.string.chars().count().max(1) as i64;
        let w = (GLYPH_ADVANCE as i64 * chars * self.scale as i64 / 100) as Coord;
        let h = (GLYPH_HEIGHT as i64 * self.scale as i64 / 100) as Coord;
        let (x, y) = (self.pos.x, self.pos.y);
        match self.direction % 4 {
            0 => BoxType::new(x, y, x + w, y + h),
            1 => BoxType::new(x - h, y, x, y + w),
            2 => BoxType::new(x - w, y - h, x, y),
            _ => BoxType::new(x, y - w, x + h, y),
        }
    }

    pub fn update_bbox(&mut self) {
        self.bbox = self.compute_bbox();
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    pub id: ObjectId,
    /// All contour points; `hole_indices` marks where each hole ring
    /// starts. Points before the first index form the outer ring.
    pub points: Vec<Point>,
    pub hole_indices: Vec<usize>,
    pub flags: Flags,
    pub bbox: BoxType,
    /// Effective shape after clearance subtraction. `None` means not yet
    /// clipped (dirty); recomputed by the clip layer.
    pub clipped: Option<core_poly::PolyArea>,
}

impl Polygon {
    pub fn compute_bbox(&self) -> BoxType {
        let mut b = BoxType::empty();
        for p in &self.points {
            b = b.union(&BoxType::point_box(*p));
        }
        b
    }

    pub fn update_bbox(&mut self) {
        self.bbox = self.compute_bbox();
    }

    /// Points of the outer ring only.
    pub fn outer_points(&self) -> &[Point] {
        let end = self.hole_indices.first().copied().unwrap_or(self.points.len());
        &self.points[..end]
    }

    /// Index range of the contour (outer or hole) that contains point
    /// index `idx`.
    pub fn contour_range(&self, idx: usize) -> (usize, usize) {
        let mut start = 0;
        let mut end = self.hole_indices.first().copied().unwrap_or(self.points.len());
        for (h, &hs) in self.hole_indices.iter().enumerate() {
            if idx < end {
                break;
            }
            start = hs;
            end = self
                .hole_indices
                .get(h + 1)
                .copied()
                .unwrap_or(self.points.len());
        }
        (start, end)
    }

    /// Previous point index within the same contour.
    pub fn prev_contour_point(&self, idx: usize) -> usize {
        let (start, end) = self.contour_range(idx);
        if idx == start { end - 1 } else { idx - 1 }
    }

    /// The declared (unclipped) area of the polygon.
    pub fn declared_shape(&self) -> Result<core_poly::PolyArea, core_poly::PolyError> {
        core_poly::PolyArea::from_contours(&self.points, &self.hole_indices)
    }
}

/// An unrouted connection hint between two layer groups.
#[derive(Debug, Clone, PartialEq)]
pub struct Rat {
    pub id: ObjectId,
    pub point1: Point,
    pub point2: Point,
    pub group1: u8,
    pub group2: u8,
    pub thickness: Coord,
    pub flags: Flags,
    pub bbox: BoxType,
}

impl Rat {
    pub fn compute_bbox(&self) -> BoxType {
        let half = (self.thickness + 1) / 2;
        BoxType::new(
            self.point1.x.min(self.point2.x) - half,
            self.point1.y.min(self.point2.y) - half,
            self.point1.x.max(self.point2.x) + half + 1,
            self.point1.y.max(self.point2.y) + half + 1,
        )
    }

    pub fn update_bbox(&mut self) {
        self.bbox = self.compute_bbox();
    }
}

/// Slots of an element's three name texts.
pub const NAME_DESCRIPTION: usize = 0;
pub const NAME_REFDES: usize = 1;
pub const NAME_VALUE: usize = 2;

/// A footprint: pins, pads and silk geometry grouped around a mark point.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub id: ObjectId,
    pub mark: Point,
    /// Description, reference designator, value.
    pub names: [Text; 3],
    pub pins: Vec<Via>,
    pub pads: Vec<Pad>,
    /// Silk outline geometry.
    pub lines: Vec<Line>,
    pub arcs: Vec<Arc>,
    pub attributes: crate::attribute::AttributeList,
    pub flags: Flags,
    pub bbox: BoxType,
}

impl Element {
    /// Element box: union of pins, pads and silk, mark included.
    pub fn compute_bbox(&self) -> BoxType {
        let mut b = BoxType::point_box(self.mark);
        for p in &self.pins {
            b = b.union(&p.compute_bbox());
        }
        for p in &self.pads {
            b = b.union(&p.compute_bbox());
        }
        for l in &self.lines {
            b = b.union(&l.compute_bbox());
        }
        for a in &self.arcs {
            b = b.union(&a.compute_bbox());
        }
        b
    }

    pub fn update_bbox(&mut self) {
        for p in &mut self.pins {
            p.update_bbox();
        }
        for p in &mut self.pads {
            p.update_bbox();
        }
        for l in &mut self.lines {
            l.update_bbox();
        }
        for a in &mut self.arcs {
            a.update_bbox();
        }
        for t in &mut self.names {
            t.update_bbox();
        }
        self.bbox = self.compute_bbox();
    }

    pub fn refdes(&self) -> &str {
        &self.names[NAME_REFDES].string
    }

    pub fn on_solder_side(&self) -> bool {
        self.flags.has(ObjectFlags::ONSOLDER)
    }

    /// Propagate a lock toggle to the children, clearing their selection.
    /// Lock state is deliberately not journaled.
    pub fn toggle_lock(&mut self) {
        self.flags.toggle(ObjectFlags::LOCK);
        for pin in &mut self.pins {
            pin.flags.toggle(ObjectFlags::LOCK);
            pin.flags.clear(ObjectFlags::SELECTED);
        }
        for pad in &mut self.pads {
            pad.flags.toggle(ObjectFlags::LOCK);
            pad.flags.clear(ObjectFlags::SELECTED);
        }
        self.flags.clear(ObjectFlags::SELECTED);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::Flags;

    fn via_at(x: Coord, y: Coord) -> Via {
        let mut v = Via {
            id: 1,
            pos: Point::new(x, y),
            thickness: 4000,
            clearance: 2000,
            mask: 0,
            drilling_hole: 2000,
            name: None,
            number: None,
            buried_from: 0,
            buried_to: 0,
            flags: Flags::default(),
            bbox: BoxType::empty(),
        };
        v.update_bbox();
        v
    }

    #[test]
    fn via_bbox_tracks_attributes() {
        let mut v = via_at(0, 0);
        assert_eq!(v.bbox, v.compute_bbox());
        v.pos = Point::new(500, 500);
        assert_ne!(v.bbox, v.compute_bbox());
        v.update_bbox();
        assert_eq!(v.bbox, v.compute_bbox());
    }

    #[test]
    fn buried_span_membership() {
        let mut v = via_at(0, 0);
        assert!(v.pierces_layer(0));
        assert!(v.pierces_layer(7));
        v.buried_from = 2;
        v.buried_to = 4;
        assert!(!v.pierces_layer(1));
        assert!(v.pierces_layer(3));
        assert!(!v.pierces_layer(5));
    }

    #[test]
    fn text_bbox_rotates_with_direction() {
        let mut t = Text {
            id: 1,
            pos: Point::new(0, 0),
            direction: 0,
            scale: 100,
            string: "ab".into(),
            font: 0,
            flags: Flags::default(),
            bbox: BoxType::empty(),
        };
        t.update_bbox();
        let w = t.bbox.width();
        let h = t.bbox.height();
        t.direction = 1;
        t.update_bbox();
        assert_eq!(t.bbox.width(), h);
        assert_eq!(t.bbox.height(), w);
    }

    #[test]
    fn polygon_contour_navigation() {
        let poly = Polygon {
            id: 1,
            points: vec![
                Point::new(0, 0),
                Point::new(100, 0),
                Point::new(100, 100),
                Point::new(0, 100),
                // hole
                Point::new(40, 40),
                Point::new(60, 40),
                Point::new(60, 60),
            ],
            hole_indices: vec![4],
            flags: Flags::default(),
            bbox: BoxType::empty(),
            clipped: None,
        };
        assert_eq!(poly.outer_points().len(), 4);
        assert_eq!(poly.contour_range(2), (0, 4));
        assert_eq!(poly.contour_range(5), (4, 7));
        assert_eq!(poly.prev_contour_point(0), 3);
        assert_eq!(poly.prev_contour_point(4), 6);
    }

    #[test]
    fn element_lock_propagates() {
        let mut e = Element {
            id: 1,
            mark: Point::new(0, 0),
            names: std::array::from_fn(|_| Text {
                id: 0,
                pos: Point::new(0, 0),
                direction: 0,
                scale: 100,
                string: String::new(),
                font: 0,
                flags: Flags::default(),
                bbox: BoxType::empty(),
            }),
            pins: vec![via_at(0, 0)],
            pads: vec![],
            lines: vec![],
            arcs: vec![],
            attributes: Default::default(),
            flags: Flags::new(ObjectFlags::SELECTED),
            bbox: BoxType::empty(),
        };
        e.pins[0].flags.set(ObjectFlags::SELECTED);
        e.toggle_lock();
        assert!(e.flags.has(ObjectFlags::LOCK));
        assert!(e.pins[0].flags.has(ObjectFlags::LOCK));
        assert!(!e.pins[0].flags.has(ObjectFlags::SELECTED));
        assert!(!e.flags.has(ObjectFlags::SELECTED));
        e.toggle_lock();
        assert!(!e.pins[0].flags.has(ObjectFlags::LOCK));
    }
}
