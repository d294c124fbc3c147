//! In-memory board model: entities, layers, containers and spatial trees.
//!
//! Ownership is strict: the board owns everything, elements own their pins,
//! pads and silk, layers own lines, arcs, texts and polygons. The spatial
//! trees hold `ObjectId` references only. Mutations go through [`ops`] so
//! that cached bounding boxes and tree membership stay in step; polygon
//! clearance maintenance lives in [`clip`].
//!
//! Nothing in this crate journals. The dispatcher records undo entries
//! around the `ops` calls it makes; the model stays mechanism, not policy.

pub mod attribute;
pub mod clip;
pub mod entity;
pub mod flags;
pub mod netlist;
pub mod ops;
pub mod transform;

pub use attribute::AttributeList;
pub use entity::{
    Arc, Element, Line, NAME_DESCRIPTION, NAME_REFDES, NAME_VALUE, ObjectId, ObjectType, Pad,
    Polygon, Rat, Text, Via,
};
pub use flags::{
    BoardFlags, Flags, MAX_LAYER, NOCOPY_FLAGS, ObjectFlags, ThermalStyle, Thermals,
    board_flags_from_string, board_flags_to_string, object_flags_from_string,
    object_flags_to_string,
};
pub use netlist::{Net, Netlist};

use core_geom::{BoxType, Coord, MIL, Point};
use core_index::Rtree;

/// Board sides.
pub const BOTTOM_SIDE: usize = 0;
pub const TOP_SIDE: usize = 1;

/// What a layer carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LayerType {
    #[default]
    Copper,
    Silk,
    Outline,
    Notes,
}

/// One board layer with its entity lists and one spatial tree per kind.
#[derive(Debug, Clone, Default)]
pub struct Layer {
    pub name: String,
    pub layer_type: LayerType,
    pub visible: bool,
    pub lines: Vec<Line>,
    pub arcs: Vec<Arc>,
    pub texts: Vec<Text>,
    pub polygons: Vec<Polygon>,
    pub line_tree: Rtree<ObjectId>,
    pub arc_tree: Rtree<ObjectId>,
    pub text_tree: Rtree<ObjectId>,
    pub polygon_tree: Rtree<ObjectId>,
}

impl Layer {
    pub fn new(name: impl Into<String>, layer_type: LayerType) -> Self {
        Self {
            name: name.into(),
            layer_type,
            visible: true,
            ..Default::default()
        }
    }

    pub fn line(&self, id: ObjectId) -> Option<&Line> {
        self.lines.iter().find(|l| l.id == id)
    }
    pub fn line_mut(&mut self, id: ObjectId) -> Option<&mut Line> {
        self.lines.iter_mut().find(|l| l.id == id)
    }
    pub fn arc(&self, id: ObjectId) -> Option<&Arc> {
        self.arcs.iter().find(|a| a.id == id)
    }
    pub fn arc_mut(&mut self, id: ObjectId) -> Option<&mut Arc> {
        self.arcs.iter_mut().find(|a| a.id == id)
    }
    pub fn text(&self, id: ObjectId) -> Option<&Text> {
        self.texts.iter().find(|t| t.id == id)
    }
    pub fn text_mut(&mut self, id: ObjectId) -> Option<&mut Text> {
        self.texts.iter_mut().find(|t| t.id == id)
    }
    pub fn polygon(&self, id: ObjectId) -> Option<&Polygon> {
        self.polygons.iter().find(|p| p.id == id)
    }
    pub fn polygon_mut(&mut self, id: ObjectId) -> Option<&mut Polygon> {
        self.polygons.iter_mut().find(|p| p.id == id)
    }
}

/// Copper layer grouping: layers in one group print and route as a single
/// physical layer. The component- and solder-side groups are distinguished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerGroups {
    /// Copper layer indices per group.
    pub groups: Vec<Vec<usize>>,
    /// Group printed on the component (top) side.
    pub component_group: usize,
    /// Group printed on the solder (bottom) side.
    pub solder_group: usize,
}

impl LayerGroups {
    /// Default grouping: each copper layer alone, first group on the
    /// component side, last on the solder side.
    pub fn default_for(copper_layers: usize) -> Self {
        let groups: Vec<Vec<usize>> = (0..copper_layers.max(1)).map(|i| vec![i]).collect();
        let solder_group = groups.len() - 1;
        Self {
            groups,
            component_group: 0,
            solder_group,
        }
    }

    pub fn group_of(&self, layer: usize) -> Option<usize> {
        self.groups.iter().position(|g| g.contains(&layer))
    }

    pub fn side_group(&self, side: usize) -> usize {
        if side == TOP_SIDE {
            self.component_group
        } else {
            self.solder_group
        }
    }

    /// Whether `layer` prints on the given board side.
    pub fn layer_on_side(&self, layer: usize, side: usize) -> bool {
        self.group_of(layer) == Some(self.side_group(side))
    }
}

/// A routing style preset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteStyle {
    pub name: String,
    pub thick: Coord,
    pub diameter: Coord,
    pub hole: Coord,
    pub keepaway: Coord,
}

impl RouteStyle {
    fn preset(name: &str, thick_mil: i32, dia_mil: i32, hole_mil: i32, keep_mil: i32) -> Self {
        Self {
            name: name.into(),
            thick: thick_mil * MIL,
            diameter: dia_mil * MIL,
            hole: hole_mil * MIL,
            keepaway: keep_mil * MIL,
        }
    }

    pub fn default_styles() -> Vec<RouteStyle> {
        vec![
            Self::preset("Signal", 10, 36, 20, 10),
            Self::preset("Power", 25, 60, 35, 10),
            Self::preset("Fat", 40, 60, 35, 10),
            Self::preset("Skinny", 6, 24, 12, 7),
        ]
    }
}

/// Design rule parameters stored with the board (checked by the external
/// DRC collaborator).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrcParams {
    pub bloat: Coord,
    pub shrink: Coord,
    pub min_width: Coord,
    pub min_silk: Coord,
    pub min_drill: Coord,
    pub min_ring: Coord,
}

impl Default for DrcParams {
    fn default() -> Self {
        Self {
            bloat: 10 * MIL,
            shrink: 10 * MIL,
            min_width: 10 * MIL,
            min_silk: 10 * MIL,
            min_drill: 15 * MIL,
            min_ring: 10 * MIL,
        }
    }
}

/// The entity containers shared by a board and by paste buffers. Pins and
/// pads live inside their elements; the board-level trees reference them by
/// id for cross-element search.
#[derive(Debug, Clone, Default)]
pub struct BoardData {
    pub vias: Vec<Via>,
    pub elements: Vec<Element>,
    pub rats: Vec<Rat>,
    pub layers: Vec<Layer>,
    /// Copper layer count; silk layers sit at `copper_count` (bottom) and
    /// `copper_count + 1` (top).
    pub copper_count: usize,
    pub via_tree: Rtree<ObjectId>,
    pub element_tree: Rtree<ObjectId>,
    pub pin_tree: Rtree<ObjectId>,
    /// One pad tree per board side, indexed by `BOTTOM_SIDE` / `TOP_SIDE`.
    pub pad_tree: [Rtree<ObjectId>; 2],
    /// One tree per element name slot.
    pub name_tree: [Rtree<ObjectId>; 3],
    pub rat_tree: Rtree<ObjectId>,
    next_id: ObjectId,
}

impl BoardData {
    pub fn new(copper_layers: usize) -> Self {
        let copper_count = copper_layers.clamp(1, MAX_LAYER);
        let mut layers = Vec::with_capacity(copper_count + 2);
        for i in 0..copper_count {
            layers.push(Layer::new(format!("copper{}", i + 1), LayerType::Copper));
        }
        layers.push(Layer::new("silk", LayerType::Silk)); // bottom
        layers.push(Layer::new("silk", LayerType::Silk)); // top
        Self {
            layers,
            copper_count,
            next_id: 1,
            ..Default::default()
        }
    }

    pub fn alloc_id(&mut self) -> ObjectId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Bump the id counter past ids loaded from a file.
    pub fn reserve_ids_through(&mut self, id: ObjectId) {
        if id >= self.next_id {
            self.next_id = id + 1;
        }
    }

    pub fn bottom_silk(&self) -> usize {
        self.copper_count
    }

    pub fn top_silk(&self) -> usize {
        self.copper_count + 1
    }

    pub fn is_silk(&self, layer: usize) -> bool {
        layer >= self.copper_count
    }

    pub fn via(&self, id: ObjectId) -> Option<&Via> {
        self.vias.iter().find(|v| v.id == id)
    }
    pub fn via_mut(&mut self, id: ObjectId) -> Option<&mut Via> {
        self.vias.iter_mut().find(|v| v.id == id)
    }
    pub fn element(&self, id: ObjectId) -> Option<&Element> {
        self.elements.iter().find(|e| e.id == id)
    }
    pub fn element_mut(&mut self, id: ObjectId) -> Option<&mut Element> {
        self.elements.iter_mut().find(|e| e.id == id)
    }
    pub fn rat(&self, id: ObjectId) -> Option<&Rat> {
        self.rats.iter().find(|r| r.id == id)
    }
    pub fn rat_mut(&mut self, id: ObjectId) -> Option<&mut Rat> {
        self.rats.iter_mut().find(|r| r.id == id)
    }

    /// Resolve a pin id to its element and pin.
    pub fn pin(&self, id: ObjectId) -> Option<(&Element, &Via)> {
        for e in &self.elements {
            if let Some(p) = e.pins.iter().find(|p| p.id == id) {
                return Some((e, p));
            }
        }
        None
    }

    pub fn pin_mut(&mut self, id: ObjectId) -> Option<&mut Via> {
        self.elements
            .iter_mut()
            .flat_map(|e| e.pins.iter_mut())
            .find(|p| p.id == id)
    }

    pub fn pad(&self, id: ObjectId) -> Option<(&Element, &Pad)> {
        for e in &self.elements {
            if let Some(p) = e.pads.iter().find(|p| p.id == id) {
                return Some((e, p));
            }
        }
        None
    }

    pub fn pad_mut(&mut self, id: ObjectId) -> Option<&mut Pad> {
        self.elements
            .iter_mut()
            .flat_map(|e| e.pads.iter_mut())
            .find(|p| p.id == id)
    }

    /// The element owning pin or pad `id`.
    pub fn parent_element(&self, id: ObjectId) -> Option<&Element> {
        self.elements
            .iter()
            .find(|e| e.pins.iter().any(|p| p.id == id) || e.pads.iter().any(|p| p.id == id))
    }

    /// True when the data holds no entities at all.
    pub fn is_empty(&self) -> bool {
        self.vias.is_empty()
            && self.elements.is_empty()
            && self.rats.is_empty()
            && self.layers.iter().all(|l| {
                l.lines.is_empty()
                    && l.arcs.is_empty()
                    && l.texts.is_empty()
                    && l.polygons.is_empty()
            })
    }

    /// Union box of everything present, or `None` for empty data.
    pub fn bounding_box(&self) -> Option<BoxType> {
        let mut b = BoxType::empty();
        for v in &self.vias {
            b = b.union(&v.bbox);
        }
        for e in &self.elements {
            b = b.union(&e.bbox);
        }
        for r in &self.rats {
            b = b.union(&r.bbox);
        }
        for l in &self.layers {
            for x in &l.lines {
                b = b.union(&x.bbox);
            }
            for x in &l.arcs {
                b = b.union(&x.bbox);
            }
            for x in &l.texts {
                b = b.union(&x.bbox);
            }
            for x in &l.polygons {
                b = b.union(&x.bbox);
            }
        }
        if b.is_empty() { None } else { Some(b) }
    }

    /// Rebuild every spatial tree from the entity lists. Used after bulk
    /// load; incremental edits maintain the trees directly.
    pub fn rebuild_trees(&mut self) {
        self.via_tree = Rtree::from_entries(self.vias.iter().map(|v| (v.bbox, v.id)).collect());
        self.element_tree =
            Rtree::from_entries(self.elements.iter().map(|e| (e.bbox, e.id)).collect());
        self.rat_tree = Rtree::from_entries(self.rats.iter().map(|r| (r.bbox, r.id)).collect());
        let mut pins = Vec::new();
        let mut pads: [Vec<(BoxType, ObjectId)>; 2] = [Vec::new(), Vec::new()];
        let mut names: [Vec<(BoxType, ObjectId)>; 3] = Default::default();
        for e in &self.elements {
            for p in &e.pins {
                pins.push((p.bbox, p.id));
            }
            for p in &e.pads {
                let side = if p.on_solder_side() {
                    BOTTOM_SIDE
                } else {
                    TOP_SIDE
                };
                pads[side].push((p.bbox, p.id));
            }
            for (slot, t) in e.names.iter().enumerate() {
                names[slot].push((t.bbox, t.id));
            }
        }
        self.pin_tree = Rtree::from_entries(pins);
        self.pad_tree = pads.map(Rtree::from_entries);
        self.name_tree = names.map(Rtree::from_entries);
        for l in &mut self.layers {
            l.line_tree = Rtree::from_entries(l.lines.iter().map(|x| (x.bbox, x.id)).collect());
            l.arc_tree = Rtree::from_entries(l.arcs.iter().map(|x| (x.bbox, x.id)).collect());
            l.text_tree = Rtree::from_entries(l.texts.iter().map(|x| (x.bbox, x.id)).collect());
            l.polygon_tree =
                Rtree::from_entries(l.polygons.iter().map(|x| (x.bbox, x.id)).collect());
        }
        tracing::debug!(target: "model", layers = self.layers.len(), "trees_rebuilt");
    }
}

/// A complete board: settings header plus the entity containers.
#[derive(Debug, Clone)]
pub struct Board {
    pub name: String,
    pub max_width: Coord,
    pub max_height: Coord,
    pub grid: Coord,
    pub flags: BoardFlags,
    /// Scale factor for thermal spoke width.
    pub thermal_scale: f64,
    /// Minimum island area kept by polygon morphing.
    pub isle_area: f64,
    pub drc: DrcParams,
    pub groups: LayerGroups,
    pub styles: Vec<RouteStyle>,
    pub attributes: AttributeList,
    pub netlist: Netlist,
    pub data: BoardData,
    /// Unsaved-changes marker.
    pub changed: bool,
    /// Via visibility; placement refuses while hidden.
    pub via_on: bool,
    pub rat_on: bool,
    /// Default thermal style applied by the thermal tool.
    pub therm_style: ThermalStyle,
}

impl Board {
    pub fn new(copper_layers: usize, max_width: Coord, max_height: Coord) -> Self {
        Self {
            name: String::new(),
            max_width,
            max_height,
            grid: 10 * MIL,
            flags: BoardFlags::CLEARNEW,
            thermal_scale: 0.5,
            isle_area: (200.0 * MIL as f64) * (200.0 * MIL as f64),
            drc: DrcParams::default(),
            groups: LayerGroups::default_for(copper_layers),
            styles: RouteStyle::default_styles(),
            attributes: AttributeList::new(),
            netlist: Netlist::new(),
            data: BoardData::new(copper_layers),
            changed: false,
            via_on: true,
            rat_on: true,
            therm_style: ThermalStyle::Solid,
        }
    }

    /// Whether a point sits inside the board frame.
    pub fn contains(&self, p: Point) -> bool {
        p.x >= 0 && p.x < self.max_width && p.y >= 0 && p.y < self.max_height
    }
}

impl Default for Board {
    fn default() -> Self {
        // 6000 x 5000 mil starter board, two copper layers.
        Self::new(2, 6000 * MIL, 5000 * MIL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn board_data_layer_layout() {
        let d = BoardData::new(4);
        assert_eq!(d.layers.len(), 6);
        assert_eq!(d.copper_count, 4);
        assert!(!d.is_silk(3));
        assert!(d.is_silk(4));
        assert_eq!(d.bottom_silk(), 4);
        assert_eq!(d.top_silk(), 5);
    }

    #[test]
    fn ids_are_unique_and_monotonic() {
        let mut d = BoardData::new(2);
        let a = d.alloc_id();
        let b = d.alloc_id();
        assert!(b > a);
        d.reserve_ids_through(100);
        assert!(d.alloc_id() > 100);
    }

    #[test]
    fn default_groups_map_sides() {
        let g = LayerGroups::default_for(4);
        assert_eq!(g.groups.len(), 4);
        assert!(g.layer_on_side(0, TOP_SIDE));
        assert!(g.layer_on_side(3, BOTTOM_SIDE));
        assert!(!g.layer_on_side(1, TOP_SIDE));
        assert_eq!(g.group_of(2), Some(2));
        assert_eq!(g.group_of(9), None);
    }

    #[test]
    fn empty_board_has_no_bounding_box() {
        let d = BoardData::new(2);
        assert!(d.is_empty());
        assert!(d.bounding_box().is_none());
    }
}
