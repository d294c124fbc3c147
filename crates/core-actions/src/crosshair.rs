//! Crosshair state: tool mode, position, and the attached in-progress
//! objects each mode builds up between clicks.

use crate::search::Hit;
use core_geom::{Coord, Point};

/// Tool modes. `Arrow` is the selection tool and the fallback mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    None,
    Via,
    Line,
    Rectangle,
    Polygon,
    PolygonHole,
    PasteBuffer,
    Text,
    Rotate,
    Remove,
    Move,
    Copy,
    InsertPoint,
    RubberbandMove,
    Thermal,
    Arc,
    Arrow,
    Lock,
}

impl Mode {
    /// Parse the mode names the `Mode()` action accepts.
    pub fn from_name(name: &str) -> Option<Mode> {
        Some(match name.to_ascii_lowercase().as_str() {
            "none" | "cancel" => Mode::None,
            "via" => Mode::Via,
            "line" => Mode::Line,
            "rectangle" => Mode::Rectangle,
            "polygon" => Mode::Polygon,
            "polygonhole" => Mode::PolygonHole,
            "pastebuffer" => Mode::PasteBuffer,
            "text" => Mode::Text,
            "rotate" => Mode::Rotate,
            "remove" => Mode::Remove,
            "move" => Mode::Move,
            "copy" => Mode::Copy,
            "insertpoint" => Mode::InsertPoint,
            "rubberbandmove" => Mode::RubberbandMove,
            "thermal" => Mode::Thermal,
            "arc" => Mode::Arc,
            "arrow" => Mode::Arrow,
            "lock" => Mode::Lock,
            _ => return None,
        })
    }
}

/// Click progression for multi-click tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrawState {
    #[default]
    First,
    Second,
    Third,
}

/// In-progress line: anchor and floating end.
#[derive(Debug, Clone, Copy, Default)]
pub struct AttachedLine {
    pub state: DrawState,
    pub point1: Point,
    pub point2: Point,
}

/// In-progress rectangle or arc.
#[derive(Debug, Clone, Copy, Default)]
pub struct AttachedBox {
    pub state: DrawState,
    pub point1: Point,
    pub point2: Point,
    /// Alternate diagonal for arc direction.
    pub otherway: bool,
}

/// Scratch state carried between the two clicks of the insert-point tool:
/// the synthetic segment the new point slides along, and the insertion
/// index inside the polygon contour.
#[derive(Debug, Clone, Copy)]
pub struct InsertScaffolding {
    pub segment: (Point, Point),
    /// Contour index the new point inserts at (polygons only).
    pub poly_index: usize,
    pub inserted: Point,
}

/// Object picked up by move/copy/insert-point, with its rubberband set.
#[derive(Debug, Clone, Default)]
pub struct AttachedObject {
    pub state: DrawState,
    pub hit: Option<Hit>,
    /// Pick-up offset from the object's reference point.
    pub x: Coord,
    pub y: Coord,
    pub rubberband: Vec<crate::rubberband::RubberAttach>,
    pub insert: Option<InsertScaffolding>,
}

impl AttachedObject {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Click scratch shared by arrow-mode click handling.
#[derive(Debug, Clone, Copy, Default)]
pub struct Note {
    pub pos: Point,
    pub click: bool,
    pub hit: bool,
    pub moving: bool,
}

/// The crosshair: position, mode (with a one-deep saved slot), and every
/// attached scaffold.
#[derive(Debug, Default)]
pub struct Crosshair {
    pub pos: Point,
    pub mode: Mode,
    saved_mode: Option<Mode>,
    pub attached_line: AttachedLine,
    pub attached_box: AttachedBox,
    pub attached_polygon: Vec<Point>,
    pub attached_object: AttachedObject,
    pub note: Note,
}

impl Crosshair {
    /// Switch tools, clearing any in-progress scaffolding.
    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
        self.clear_attached();
    }

    pub fn clear_attached(&mut self) {
        self.attached_line = AttachedLine::default();
        self.attached_box = AttachedBox::default();
        self.attached_polygon.clear();
        self.attached_object.reset();
    }

    /// One-deep mode stack for transient tool switches.
    pub fn save_mode(&mut self) {
        self.saved_mode = Some(self.mode);
    }

    pub fn restore_mode(&mut self) {
        if let Some(m) = self.saved_mode.take() {
            self.set_mode(m);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_names_parse_case_insensitively() {
        assert_eq!(Mode::from_name("Via"), Some(Mode::Via));
        assert_eq!(Mode::from_name("POLYGONHOLE"), Some(Mode::PolygonHole));
        assert_eq!(Mode::from_name("what"), None);
    }

    #[test]
    fn set_mode_clears_scaffolding() {
        let mut c = Crosshair::default();
        c.attached_polygon.push(Point::new(1, 1));
        c.attached_line.state = DrawState::Second;
        c.set_mode(Mode::Line);
        assert!(c.attached_polygon.is_empty());
        assert_eq!(c.attached_line.state, DrawState::First);
    }

    #[test]
    fn mode_stack_is_one_deep() {
        let mut c = Crosshair::default();
        c.set_mode(Mode::Line);
        c.save_mode();
        c.set_mode(Mode::Arrow);
        c.restore_mode();
        assert_eq!(c.mode, Mode::Line);
        // A second restore without a save is a no-op.
        c.set_mode(Mode::Via);
        c.restore_mode();
        assert_eq!(c.mode, Mode::Via);
    }
}
