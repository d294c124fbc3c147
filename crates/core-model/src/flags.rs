//! Object and board flag words, plus per-layer thermal styles.
//!
//! The flag word is a packed 32-bit set whose bit values are fixed by the
//! board file format; several bits are reused across entity kinds (a pad's
//! `NOPASTE` shares the bit of a pin's `HOLE`). Thermal styles ride beside
//! the word as one nibble per layer.

use bitflags::bitflags;

/// Number of copper layers a board can carry.
pub const MAX_LAYER: usize = 16;

bitflags! {
    /// Per-object flag word. Bit values are part of the file format.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ObjectFlags: u32 {
        /// Object is a pin (internal bookkeeping).
        const PIN = 0x0001;
        /// Object is a via (internal bookkeeping).
        const VIA = 0x0002;
        /// Reached by connection tracing.
        const FOUND = 0x0004;
        /// Pin or via is a bare hole without a copper annulus; on pads the
        /// same bit means "no solderpaste opening".
        const HOLE = 0x0008;
        /// Line is a rat line. On polygons the same bit is CLEARPOLY, on
        /// elements HIDENAME.
        const RAT = 0x0010;
        /// Pins and vias clear this polygon unless thermally joined.
        const CLEARPOLY = 0x0010;
        /// Element name is hidden.
        const HIDENAME = 0x0010;
        /// Line or arc clears polygons instead of joining them.
        const CLEARLINE = 0x0020;
        /// Polygon keeps all islands after clipping.
        const FULLPOLY = 0x0020;
        /// Pin/pad names of an element are displayed.
        const DISPLAYNAME = 0x0020;
        /// Object is selected.
        const SELECTED = 0x0040;
        /// Element or pad sits on the solder side.
        const ONSOLDER = 0x0080;
        /// Line or via was produced by the autorouter.
        const AUTO = 0x0080;
        /// Pin or pad is square instead of round.
        const SQUARE = 0x0100;
        /// One endpoint already collected by a rubberband move.
        const RUBBEREND = 0x0200;
        /// Warning marker on pins, vias and pads.
        const WARN = 0x0200;
        /// Draw the pin or via with thermal fingers (legacy files).
        const USETHERMAL = 0x0400;
        /// Pin or via is drawn as an octagon.
        const OCTAGON = 0x0800;
        /// Object failed the design rule check.
        const DRC = 0x1000;
        /// Object refuses move, rotate and remove.
        const LOCK = 0x2000;
        /// Pad's second point is nearer the board edge.
        const EDGE2 = 0x4000;
        /// Traversal marker to avoid revisiting.
        const VISIT = 0x8000;
        /// Physically connected, as found by connection tracing.
        const CONNECTED = 0x1_0000;
    }
}

bitflags! {
    /// Board-wide behavior flags, written as the `Flags(...)` file line.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct BoardFlags: u32 {
        const SHOWNUMBER    = 0x0000_0001;
        const LOCALREF      = 0x0000_0002;
        const CHECKPLANES   = 0x0000_0004;
        const SHOWDRC       = 0x0000_0008;
        /// Moves drag attached lines along.
        const RUBBERBAND    = 0x0000_0010;
        const DESCRIPTION   = 0x0000_0020;
        const NAMEONPCB     = 0x0000_0040;
        const AUTODRC       = 0x0000_0080;
        /// Lines may run at any angle.
        const ALLDIRECTION  = 0x0000_0100;
        /// Two-segment lines alternate which bend comes first.
        const SWAPSTARTDIR  = 0x0000_0200;
        const UNIQUENAME    = 0x0000_0400;
        /// Freshly drawn lines and arcs clear polygons.
        const CLEARNEW      = 0x0000_0800;
        const SNAPPIN       = 0x0000_1000;
        const SHOWMASK      = 0x0000_2000;
        const THINDRAW      = 0x0000_4000;
        const ORTHOMOVE     = 0x0000_8000;
        const LIVEROUTE     = 0x0001_0000;
        const THINDRAWPOLY  = 0x0002_0000;
        const LOCKNAMES     = 0x0004_0000;
        const ONLYNAMES     = 0x0008_0000;
        /// Freshly drawn polygons keep all their islands.
        const NEWFULLPOLY   = 0x0010_0000;
        const HIDENAMES     = 0x0020_0000;
    }
}

/// Flags stripped from an object when it is copied between containers.
pub const NOCOPY_FLAGS: ObjectFlags = ObjectFlags::FOUND.union(ObjectFlags::CONNECTED);

/// Thermal connection style between a pin/via and a polygon layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum ThermalStyle {
    #[default]
    None = 0,
    DiagonalSharp = 1,
    OrthogonalSharp = 2,
    Solid = 3,
    DiagonalRounded = 4,
    OrthogonalRounded = 5,
}

impl ThermalStyle {
    pub fn from_nibble(n: u8) -> Self {
        match n & 0xf {
            1 => Self::DiagonalSharp,
            2 => Self::OrthogonalSharp,
            3 => Self::Solid,
            4 => Self::DiagonalRounded,
            5 => Self::OrthogonalRounded,
            _ => Self::None,
        }
    }

    pub fn as_nibble(self) -> u8 {
        self as u8
    }
}

/// Per-layer thermal nibbles, two layers per byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Thermals {
    t: [u8; (MAX_LAYER + 1) / 2],
}

impl Thermals {
    pub fn get(&self, layer: usize) -> ThermalStyle {
        debug_assert!(layer < MAX_LAYER);
        ThermalStyle::from_nibble(self.t[layer / 2] >> (4 * (layer % 2)))
    }

    pub fn set(&mut self, layer: usize, style: ThermalStyle) {
        debug_assert!(layer < MAX_LAYER);
        let shift = 4 * (layer % 2);
        let cell = &mut self.t[layer / 2];
        *cell = (*cell & !(0xf << shift)) | (style.as_nibble() << shift);
    }

    pub fn any_set(&self) -> bool {
        self.t.iter().any(|&b| b != 0)
    }

    pub fn clear(&mut self) {
        self.t = Default::default();
    }
}

/// The complete flag state an entity carries: generic word plus thermals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Flags {
    pub word: ObjectFlags,
    pub thermals: Thermals,
}

impl Flags {
    pub fn new(word: ObjectFlags) -> Self {
        Self {
            word,
            thermals: Thermals::default(),
        }
    }

    pub fn has(&self, f: ObjectFlags) -> bool {
        self.word.contains(f)
    }

    pub fn set(&mut self, f: ObjectFlags) {
        self.word.insert(f);
    }

    pub fn clear(&mut self, f: ObjectFlags) {
        self.word.remove(f);
    }

    pub fn toggle(&mut self, f: ObjectFlags) {
        self.word.toggle(f);
    }

    pub fn assign(&mut self, f: ObjectFlags, on: bool) {
        self.word.set(f, on);
    }

    /// Copy-constructor for cross-container copies: drops connectivity
    /// markers and any extra mask the caller names.
    pub fn masked_for_copy(mut self, extra: ObjectFlags) -> Self {
        self.word.remove(NOCOPY_FLAGS | extra);
        self
    }
}

/// Symbolic names for the object flag word, as used inside `Flags(...)`
/// strings and object flag fields of the board file.
const OBJECT_FLAG_NAMES: &[(ObjectFlags, &str)] = &[
    (ObjectFlags::PIN, "pin"),
    (ObjectFlags::VIA, "via"),
    (ObjectFlags::FOUND, "found"),
    (ObjectFlags::HOLE, "hole"),
    (ObjectFlags::RAT, "rat"),
    (ObjectFlags::CLEARLINE, "clearline"),
    (ObjectFlags::SELECTED, "selected"),
    (ObjectFlags::ONSOLDER, "onsolder"),
    (ObjectFlags::SQUARE, "square"),
    (ObjectFlags::RUBBEREND, "rubberend"),
    (ObjectFlags::USETHERMAL, "usetherm"),
    (ObjectFlags::OCTAGON, "octagon"),
    (ObjectFlags::DRC, "drc"),
    (ObjectFlags::LOCK, "lock"),
    (ObjectFlags::EDGE2, "edge2"),
    (ObjectFlags::VISIT, "visit"),
    (ObjectFlags::CONNECTED, "connected"),
];

/// Render the flag word as its symbolic comma-joined form (`"selected,lock"`).
/// Bits with kind-dependent aliases print under their primary name; the
/// file writer uses [`object_flags_to_string_typed`] to pick the name the
/// owning entity kind reads naturally.
pub fn object_flags_to_string(word: ObjectFlags) -> String {
    let mut parts = Vec::new();
    for (bit, name) in OBJECT_FLAG_NAMES {
        if word.contains(*bit) {
            parts.push(*name);
        }
    }
    parts.join(",")
}

/// Entity kind, for resolving the flag bits whose name depends on the
/// owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Via,
    Pin,
    Pad,
    Line,
    Arc,
    Text,
    Polygon,
    Element,
    Rat,
}

/// Kind-aware symbolic rendering: the shared bits print under the alias
/// their owner means (`clearpoly` on polygons, `rat` on rat lines, ...).
pub fn object_flags_to_string_typed(word: ObjectFlags, kind: ObjectKind) -> String {
    use ObjectKind as K;
    let mut parts: Vec<&str> = Vec::new();
    for (bit, default_name) in OBJECT_FLAG_NAMES {
        if !word.contains(*bit) {
            continue;
        }
        let bit = *bit;
        let name = if bit == ObjectFlags::HOLE && kind == K::Pad {
            "nopaste"
        } else if bit == ObjectFlags::RAT && kind == K::Polygon {
            "clearpoly"
        } else if bit == ObjectFlags::RAT && kind == K::Element {
            "hidename"
        } else if bit == ObjectFlags::CLEARLINE && kind == K::Polygon {
            "fullpoly"
        } else if bit == ObjectFlags::CLEARLINE
            && matches!(kind, K::Pin | K::Via | K::Pad | K::Element)
        {
            "showname"
        } else if bit == ObjectFlags::ONSOLDER && matches!(kind, K::Line | K::Via | K::Rat) {
            "auto"
        } else if bit == ObjectFlags::RUBBEREND && matches!(kind, K::Pin | K::Via | K::Pad) {
            "warn"
        } else {
            default_name
        };
        parts.push(name);
    }
    parts.join(",")
}

/// Parse a symbolic flag-set string. Unknown names are ignored rather than
/// rejected so newer files still load.
pub fn object_flags_from_string(s: &str) -> ObjectFlags {
    let mut word = ObjectFlags::empty();
    for part in s.split(',') {
        let part = part.trim();
        // Aliases sharing a bit with the primary name.
        let bit = match part {
            "" => continue,
            "clearpoly" => Some(ObjectFlags::CLEARPOLY),
            "fullpoly" => Some(ObjectFlags::FULLPOLY),
            "nopaste" => Some(ObjectFlags::HOLE),
            "hidename" => Some(ObjectFlags::HIDENAME),
            "showname" => Some(ObjectFlags::DISPLAYNAME),
            "auto" => Some(ObjectFlags::AUTO),
            "warn" => Some(ObjectFlags::WARN),
            _ => OBJECT_FLAG_NAMES
                .iter()
                .find(|(_, n)| *n == part)
                .map(|(b, _)| *b),
        };
        if let Some(bit) = bit {
            word.insert(bit);
        }
    }
    word
}

const BOARD_FLAG_NAMES: &[(BoardFlags, &str)] = &[
    (BoardFlags::SHOWNUMBER, "shownumber"),
    (BoardFlags::LOCALREF, "localref"),
    (BoardFlags::CHECKPLANES, "checkplanes"),
    (BoardFlags::SHOWDRC, "showdrc"),
    (BoardFlags::RUBBERBAND, "rubberband"),
    (BoardFlags::DESCRIPTION, "description"),
    (BoardFlags::NAMEONPCB, "nameonpcb"),
    (BoardFlags::AUTODRC, "autodrc"),
    (BoardFlags::ALLDIRECTION, "alldirection"),
    (BoardFlags::SWAPSTARTDIR, "swapstartdirection"),
    (BoardFlags::UNIQUENAME, "uniquename"),
    (BoardFlags::CLEARNEW, "clearnew"),
    (BoardFlags::SNAPPIN, "snappin"),
    (BoardFlags::SHOWMASK, "showmask"),
    (BoardFlags::THINDRAW, "thindraw"),
    (BoardFlags::ORTHOMOVE, "orthogonalmoves"),
    (BoardFlags::LIVEROUTE, "liveroute"),
    (BoardFlags::THINDRAWPOLY, "thindrawpoly"),
    (BoardFlags::LOCKNAMES, "locknames"),
    (BoardFlags::ONLYNAMES, "onlynames"),
    (BoardFlags::NEWFULLPOLY, "newfullpoly"),
    (BoardFlags::HIDENAMES, "hidenames"),
];

pub fn board_flags_to_string(word: BoardFlags) -> String {
    let mut parts = Vec::new();
    for (bit, name) in BOARD_FLAG_NAMES {
        if word.contains(*bit) {
            parts.push(*name);
        }
    }
    parts.join(",")
}

pub fn board_flags_from_string(s: &str) -> BoardFlags {
    let mut word = BoardFlags::empty();
    for part in s.split(',') {
        let part = part.trim();
        if let Some((bit, _)) = BOARD_FLAG_NAMES.iter().find(|(_, n)| *n == part) {
            word.insert(*bit);
        }
    }
    word
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thermal_nibbles_pack_two_layers_per_byte() {
        let mut t = Thermals::default();
        t.set(0, ThermalStyle::Solid);
        t.set(1, ThermalStyle::DiagonalRounded);
        t.set(15, ThermalStyle::OrthogonalSharp);
        assert_eq!(t.get(0), ThermalStyle::Solid);
        assert_eq!(t.get(1), ThermalStyle::DiagonalRounded);
        assert_eq!(t.get(2), ThermalStyle::None);
        assert_eq!(t.get(15), ThermalStyle::OrthogonalSharp);
        assert!(t.any_set());
        // Overwrite does not disturb the neighboring nibble.
        t.set(0, ThermalStyle::None);
        assert_eq!(t.get(1), ThermalStyle::DiagonalRounded);
    }

    #[test]
    fn copy_mask_strips_connectivity() {
        let mut f = Flags::new(ObjectFlags::SELECTED | ObjectFlags::FOUND | ObjectFlags::CONNECTED);
        f = f.masked_for_copy(ObjectFlags::SELECTED);
        assert!(f.word.is_empty());
    }

    #[test]
    fn flag_string_round_trip() {
        let word = ObjectFlags::SELECTED | ObjectFlags::LOCK | ObjectFlags::OCTAGON;
        let s = object_flags_to_string(word);
        assert_eq!(s, "selected,octagon,lock");
        assert_eq!(object_flags_from_string(&s), word);
    }

    #[test]
    fn flag_string_aliases_resolve() {
        assert_eq!(
            object_flags_from_string("clearpoly"),
            ObjectFlags::CLEARPOLY
        );
        assert_eq!(object_flags_from_string("fullpoly"), ObjectFlags::FULLPOLY);
        // Unknown names are ignored.
        assert_eq!(object_flags_from_string("zork,lock"), ObjectFlags::LOCK);
    }

    #[test]
    fn typed_flag_names_follow_the_owner() {
        assert_eq!(
            object_flags_to_string_typed(ObjectFlags::CLEARPOLY, ObjectKind::Polygon),
            "clearpoly"
        );
        assert_eq!(
            object_flags_to_string_typed(ObjectFlags::FULLPOLY, ObjectKind::Polygon),
            "fullpoly"
        );
        assert_eq!(
            object_flags_to_string_typed(ObjectFlags::CLEARLINE, ObjectKind::Line),
            "clearline"
        );
        assert_eq!(
            object_flags_to_string_typed(ObjectFlags::RAT, ObjectKind::Rat),
            "rat"
        );
        assert_eq!(
            object_flags_to_string_typed(ObjectFlags::WARN, ObjectKind::Pin),
            "warn"
        );
        // Every typed spelling parses back to the same bit.
        for (word, kind) in [
            (ObjectFlags::CLEARPOLY, ObjectKind::Polygon),
            (ObjectFlags::FULLPOLY, ObjectKind::Polygon),
            (ObjectFlags::CLEARLINE, ObjectKind::Arc),
            (ObjectFlags::ONSOLDER, ObjectKind::Pad),
            (ObjectFlags::AUTO, ObjectKind::Line),
        ] {
            let s = object_flags_to_string_typed(word, kind);
            assert_eq!(object_flags_from_string(&s), word, "{s}");
        }
    }

    #[test]
    fn board_flag_round_trip() {
        let word = BoardFlags::RUBBERBAND | BoardFlags::CLEARNEW | BoardFlags::SWAPSTARTDIR;
        assert_eq!(board_flags_from_string(&board_flags_to_string(word)), word);
    }
}
