//! Board file parsing.
//!
//! A small hand lexer feeds a recursive parser keyed on the leading word of
//! each item. Parse failures abort the load with a positioned error and the
//! caller keeps whatever board it had; nothing here mutates shared state.

use crate::{FILE_VERSION_BASELINE, FILE_VERSION_CURRENT};
use core_geom::{Coord, MIL, Point, round_away};
use core_model::entity::*;
use core_model::flags::{Flags, ThermalStyle, object_flags_from_string};
use core_model::{Board, LayerGroups, LayerType, Net, RouteStyle, board_flags_from_string};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },
    #[error("file version {found} is newer than the supported {supported}")]
    VersionTooNew { found: u32, supported: u32 },
    #[error("file version {found} predates the supported baseline {baseline}")]
    VersionTooOld { found: u32, baseline: u32 },
    #[error("io: {0}")]
    Io(String),
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Word(String),
    Str(String),
    Num(f64),
    Open(char),  // [ or (
    Close(char), // ] or )
}

struct Lexer<'a> {
    src: &'a str,
    pos: usize,
    line: usize,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0, line: 1 }
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::Syntax {
            line: self.line,
            message: message.into(),
        }
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.src[self.pos..].chars().next()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn next_token(&mut self) -> Result<Option<Token>, ParseError> {
        loop {
            match self.peek() {
                None => return Ok(None),
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('#') => {
                    while let Some(c) = self.bump() {
                        if c == '\n' {
                            break;
                        }
                    }
                }
                Some(_) => break,
            }
        }
        let c = match self.peek() {
            Some(c) => c,
            None => return Ok(None),
        };
        match c {
            '[' | '(' => {
                self.bump();
                Ok(Some(Token::Open(c)))
            }
            ']' | ')' => {
                self.bump();
                Ok(Some(Token::Close(c)))
            }
            '"' => {
                self.bump();
                let mut s = String::new();
                loop {
                    match self.bump() {
                        None => return Err(self.error("unterminated string")),
                        Some('"') => break,
                        Some('\\') => match self.bump() {
                            Some('n') => s.push('\n'),
                            Some('t') => s.push('\t'),
                            Some(other) => s.push(other),
                            None => return Err(self.error("unterminated escape")),
                        },
                        Some(other) => s.push(other),
                    }
                }
                Ok(Some(Token::Str(s)))
            }
            c if c.is_ascii_digit() || c == '-' || c == '+' || c == '.' => {
                let start = self.pos;
                self.bump();
                while let Some(c) = self.peek() {
                    if c.is_ascii_digit() || c == '.' || c == 'e' || c == 'E' {
                        self.bump();
                    } else {
                        break;
                    }
                }
                let number: f64 = self.src[start..self.pos]
                    .parse()
                    .map_err(|_| self.error("bad number"))?;
                // Unit suffix sticks to the number.
                let unit_start = self.pos;
                while let Some(c) = self.peek() {
                    if c.is_ascii_alphabetic() {
                        self.bump();
                    } else {
                        break;
                    }
                }
                let unit = &self.src[unit_start..self.pos];
                let scaled = match unit {
                    "" => number,
                    "mm" => number * 1_000_000.0,
                    "mil" => number * MIL as f64,
                    "cmil" => number * MIL as f64 / 100.0,
                    "in" => number * MIL as f64 * 1000.0,
                    "um" => number * 1000.0,
                    other => return Err(self.error(format!("unknown unit {other:?}"))),
                };
                Ok(Some(Token::Num(scaled)))
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = self.pos;
                while let Some(c) = self.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' {
                        self.bump();
                    } else {
                        break;
                    }
                }
                Ok(Some(Token::Word(self.src[start..self.pos].to_string())))
            }
            other => Err(self.error(format!("unexpected character {other:?}"))),
        }
    }
}

struct Parser<'a> {
    lexer: Lexer<'a>,
    peeked: Option<Option<Token>>,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            lexer: Lexer::new(src),
            peeked: None,
        }
    }

    fn error(&self, m: impl Into<String>) -> ParseError {
        self.lexer.error(m)
    }

    fn next(&mut self) -> Result<Option<Token>, ParseError> {
        match self.peeked.take() {
            Some(t) => Ok(t),
            None => self.lexer.next_token(),
        }
    }

    fn peek(&mut self) -> Result<Option<&Token>, ParseError> {
        if self.peeked.is_none() {
            self.peeked = Some(self.lexer.next_token()?);
        }
        Ok(self.peeked.as_ref().and_then(|t| t.as_ref()))
    }

    fn expect_open(&mut self) -> Result<(), ParseError> {
        match self.next()? {
            Some(Token::Open(_)) => Ok(()),
            other => Err(self.error(format!("expected '[' or '(', got {other:?}"))),
        }
    }

    fn expect_close(&mut self) -> Result<(), ParseError> {
        match self.next()? {
            Some(Token::Close(_)) => Ok(()),
            other => Err(self.error(format!("expected ']' or ')', got {other:?}"))),
        }
    }

    fn num(&mut self) -> Result<f64, ParseError> {
        match self.next()? {
            Some(Token::Num(n)) => Ok(n),
            other => Err(self.error(format!("expected number, got {other:?}"))),
        }
    }

    fn coord(&mut self) -> Result<Coord, ParseError> {
        Ok(round_away(self.num()?))
    }

    fn int(&mut self) -> Result<i64, ParseError> {
        Ok(self.num()? as i64)
    }

    fn string(&mut self) -> Result<String, ParseError> {
        match self.next()? {
            Some(Token::Str(s)) => Ok(s),
            other => Err(self.error(format!("expected string, got {other:?}"))),
        }
    }

    /// Optional string: vias/pins/pads end in name/flag strings, but a
    /// number may appear first (buried span).
    fn peek_is_num(&mut self) -> Result<bool, ParseError> {
        Ok(matches!(self.peek()?, Some(Token::Num(_))))
    }

    fn peek_is_close(&mut self) -> Result<bool, ParseError> {
        Ok(matches!(self.peek()?, Some(Token::Close(_))))
    }
}

/// Parse the comma list of an object flag string, including
/// `thermal(layer,style)` entries.
pub(crate) fn parse_object_flags(s: &str) -> Flags {
    let mut flags = Flags::default();
    let mut depth = 0usize;
    let mut item = String::new();
    let mut items = Vec::new();
    for c in s.chars() {
        match c {
            '(' => {
                depth += 1;
                item.push(c);
            }
            ')' => {
                depth = depth.saturating_sub(1);
                item.push(c);
            }
            ',' if depth == 0 => {
                items.push(std::mem::take(&mut item));
            }
            _ => item.push(c),
        }
    }
    if !item.is_empty() {
        items.push(item);
    }
    for item in items {
        let item = item.trim();
        if let Some(body) = item
            .strip_prefix("thermal(")
            .and_then(|b| b.strip_suffix(')'))
        {
            if let Some((l, st)) = body.split_once(',')
                && let (Ok(l), Ok(st)) = (l.trim().parse::<usize>(), st.trim().parse::<u8>())
                && l < core_model::MAX_LAYER
            {
                flags.thermals.set(l, ThermalStyle::from_nibble(st));
            }
            continue;
        }
        flags.word |= object_flags_from_string(item);
    }
    flags
}

fn parse_groups(s: &str, copper_count: usize) -> LayerGroups {
    let mut groups = Vec::new();
    let mut component_group = 0;
    let mut solder_group = 0;
    for (gi, part) in s.split(':').enumerate() {
        let mut members = Vec::new();
        for item in part.split(',') {
            match item.trim() {
                "c" | "C" => component_group = gi,
                "s" | "S" => solder_group = gi,
                n => {
                    if let Ok(idx) = n.parse::<usize>()
                        && idx >= 1
                    {
                        members.push(idx - 1);
                    }
                }
            }
        }
        groups.push(members);
    }
    if groups.is_empty() {
        return LayerGroups::default_for(copper_count);
    }
    if solder_group == 0 && component_group == 0 && groups.len() > 1 {
        solder_group = groups.len() - 1;
    }
    LayerGroups {
        groups,
        component_group,
        solder_group,
    }
}

fn parse_styles(s: &str) -> Vec<RouteStyle> {
    let mut out = Vec::new();
    for part in s.split(':') {
        let fields: Vec<&str> = part.split(',').collect();
        if fields.len() != 5 {
            continue;
        }
        let coordv = |f: &str| -> Coord {
            let f = f.trim();
            // Style values may carry unit suffixes like any coordinate.
            let split = f
                .char_indices()
                .find(|(_, c)| c.is_ascii_alphabetic())
                .map(|(i, _)| i)
                .unwrap_or(f.len());
            let num: f64 = f[..split].parse().unwrap_or(0.0);
            let scale = match &f[split..] {
                "mm" => 1_000_000.0,
                "mil" => MIL as f64,
                _ => 1.0,
            };
            round_away(num * scale)
        };
        out.push(RouteStyle {
            name: fields[0].trim().to_string(),
            thick: coordv(fields[1]),
            diameter: coordv(fields[2]),
            hole: coordv(fields[3]),
            keepaway: coordv(fields[4]),
        });
    }
    out
}

/// A layer block parsed before the board's stack is assembled.
struct RawLayer {
    index: usize,
    name: String,
    layer_type: LayerType,
    lines: Vec<(Point, Point, Coord, Coord, Flags)>,
    arcs: Vec<(Point, Coord, Coord, Coord, Coord, i32, i32, Flags)>,
    texts: Vec<(Point, u8, u16, String, Flags)>,
    polygons: Vec<(Vec<Point>, Vec<usize>, Flags)>,
}

/// Parse a board from text.
pub fn parse_board(src: &str) -> Result<Board, ParseError> {
    let mut p = Parser::new(src);
    let mut name = String::new();
    let mut max_width: Coord = 6000 * MIL;
    let mut max_height: Coord = 5000 * MIL;
    let mut grid: Coord = 10 * MIL;
    let mut isle_area = (200.0 * MIL as f64) * (200.0 * MIL as f64);
    let mut thermal_scale = 0.5;
    let mut drc = core_model::DrcParams::default();
    let mut board_flags = core_model::BoardFlags::empty();
    let mut groups_str = String::new();
    let mut styles = Vec::new();
    let mut attributes: Vec<(String, String)> = Vec::new();
    let mut vias = Vec::new();
    let mut elements = Vec::new();
    let mut rats = Vec::new();
    let mut raw_layers: Vec<RawLayer> = Vec::new();
    let mut netlist = core_model::Netlist::new();
    let mut version: Option<u32> = None;

    while let Some(token) = p.next()? {
        let Token::Word(word) = token else {
            return Err(p.error(format!("expected item name, got {token:?}")));
        };
        match word.as_str() {
            "FileVersion" => {
                p.expect_open()?;
                let v = p.int()? as u32;
                p.expect_close()?;
                if v > FILE_VERSION_CURRENT {
                    return Err(ParseError::VersionTooNew {
                        found: v,
                        supported: FILE_VERSION_CURRENT,
                    });
                }
                if v < FILE_VERSION_BASELINE {
                    return Err(ParseError::VersionTooOld {
                        found: v,
                        baseline: FILE_VERSION_BASELINE,
                    });
                }
                version = Some(v);
            }
            "PCB" => {
                p.expect_open()?;
                name = p.string()?;
                max_width = p.coord()?;
                max_height = p.coord()?;
                p.expect_close()?;
            }
            "Grid" => {
                p.expect_open()?;
                grid = p.coord()?;
                let _ox = p.num()?;
                let _oy = p.num()?;
                if p.peek_is_num()? {
                    let _visible = p.num()?;
                }
                p.expect_close()?;
            }
            "PolyArea" => {
                p.expect_open()?;
                isle_area = p.num()? * (MIL as f64 * MIL as f64);
                p.expect_close()?;
            }
            "Thermal" => {
                p.expect_open()?;
                thermal_scale = p.num()?;
                p.expect_close()?;
            }
            "DRC" => {
                p.expect_open()?;
                drc.bloat = p.coord()?;
                drc.shrink = p.coord()?;
                drc.min_width = p.coord()?;
                drc.min_silk = p.coord()?;
                drc.min_drill = p.coord()?;
                drc.min_ring = p.coord()?;
                p.expect_close()?;
            }
            "Flags" => {
                p.expect_open()?;
                board_flags = board_flags_from_string(&p.string()?);
                p.expect_close()?;
            }
            "Groups" => {
                p.expect_open()?;
                groups_str = p.string()?;
                p.expect_close()?;
            }
            "Styles" => {
                p.expect_open()?;
                styles = parse_styles(&p.string()?);
                p.expect_close()?;
            }
            "Attribute" => {
                p.expect_open()?;
                let k = p.string()?;
                let v = p.string()?;
                p.expect_close()?;
                attributes.push((k, v));
            }
            "Via" => {
                p.expect_open()?;
                let x = p.coord()?;
                let y = p.coord()?;
                let thickness = p.coord()?;
                let clearance = p.coord()?;
                let mask = p.coord()?;
                let drill = p.coord()?;
                // Buried vias carry two extra layer numbers before the
                // strings.
                let (bf, bt) = if p.peek_is_num()? {
                    let bf = p.int()? as u8;
                    let bt = p.int()? as u8;
                    (bf, bt)
                } else {
                    (0, 0)
                };
                let vname = p.string()?;
                let flags = parse_object_flags(&p.string()?);
                p.expect_close()?;
                vias.push((
                    Point::new(x, y),
                    thickness,
                    clearance,
                    mask,
                    drill,
                    bf,
                    bt,
                    vname,
                    flags,
                ));
            }
            "Element" => {
                elements.push(parse_element(&mut p)?);
            }
            "Rat" => {
                p.expect_open()?;
                let x1 = p.coord()?;
                let y1 = p.coord()?;
                let g1 = p.int()? as u8;
                let x2 = p.coord()?;
                let y2 = p.coord()?;
                let g2 = p.int()? as u8;
                let flags = parse_object_flags(&p.string()?);
                p.expect_close()?;
                rats.push((Point::new(x1, y1), g1, Point::new(x2, y2), g2, flags));
            }
            "Layer" => {
                raw_layers.push(parse_layer(&mut p)?);
            }
            "NetList" => {
                p.expect_open()?;
                p.expect_close()?;
                p.expect_open()?;
                while !p.peek_is_close()? {
                    match p.next()? {
                        Some(Token::Word(w)) if w == "Net" => {}
                        other => return Err(p.error(format!("expected Net, got {other:?}"))),
                    }
                    p.expect_open()?;
                    let net_name = p.string()?;
                    let style = p.string()?;
                    p.expect_close()?;
                    let mut net = Net {
                        name: net_name,
                        style: if style.is_empty() { None } else { Some(style) },
                        connections: Vec::new(),
                    };
                    p.expect_open()?;
                    while !p.peek_is_close()? {
                        match p.next()? {
                            Some(Token::Word(w)) if w == "Connect" => {}
                            other => {
                                return Err(p.error(format!("expected Connect, got {other:?}")));
                            }
                        }
                        p.expect_open()?;
                        net.connections.push(p.string()?);
                        p.expect_close()?;
                    }
                    p.expect_close()?;
                    netlist.nets.push(net);
                }
                p.expect_close()?;
            }
            other => return Err(p.error(format!("unknown item {other:?}"))),
        }
    }

    // Assemble the board. The stack size comes from the layer blocks: the
    // last two indexes are the silk pair.
    let total_layers = raw_layers.iter().map(|l| l.index + 1).max().unwrap_or(4);
    let copper_count = total_layers.saturating_sub(2).max(1);
    let mut board = Board::new(copper_count, max_width, max_height);
    board.name = name;
    board.grid = grid;
    board.isle_area = isle_area;
    board.thermal_scale = thermal_scale;
    board.drc = drc;
    board.flags = board_flags;
    if !groups_str.is_empty() {
        board.groups = parse_groups(&groups_str, copper_count);
    }
    if !styles.is_empty() {
        board.styles = styles;
    }
    for (k, v) in attributes {
        board.attributes.push(&k, &v);
    }
    board.netlist = netlist;
    if let Some(v) = version {
        tracing::debug!(target: "file", version = v, "board_file_version");
    }

    for (pos, thickness, clearance, mask, drill, bf, bt, vname, flags) in vias {
        let id = core_model::ops::create_via(
            &mut board.data,
            pos,
            thickness,
            clearance,
            mask,
            drill,
            if vname.is_empty() { None } else { Some(vname) },
            flags,
        );
        if let Some(v) = board.data.via_mut(id) {
            v.buried_from = bf;
            v.buried_to = bt;
        }
    }
    for raw in elements {
        attach_element(&mut board, raw);
    }
    for (p1, g1, p2, g2, flags) in rats {
        core_model::ops::create_rat(&mut board.data, p1, p2, g1, g2, 10 * MIL, flags);
    }
    for raw in raw_layers {
        if raw.index >= board.data.layers.len() {
            continue;
        }
        attach_layer(&mut board, raw);
    }
    board.data.rebuild_trees();
    board.changed = false;
    tracing::info!(target: "file", layers = board.data.layers.len(), "board_parsed");
    Ok(board)
}

/// Raw element fields straight from the file.
struct RawElement {
    flags: Flags,
    desc: String,
    refdes: String,
    value: String,
    mark: Point,
    text_rel: Point,
    text_dir: u8,
    text_scale: u16,
    text_flags: Flags,
    attributes: Vec<(String, String)>,
    pins: Vec<(Point, Coord, Coord, Coord, Coord, String, String, Flags)>,
    pads: Vec<(Point, Point, Coord, Coord, Coord, String, String, Flags)>,
    lines: Vec<(Point, Point, Coord)>,
    arcs: Vec<(Point, Coord, Coord, i32, i32, Coord)>,
}

fn parse_element(p: &mut Parser<'_>) -> Result<RawElement, ParseError> {
    p.expect_open()?;
    let flags = parse_object_flags(&p.string()?);
    let desc = p.string()?;
    let refdes = p.string()?;
    let value = p.string()?;
    let mx = p.coord()?;
    let my = p.coord()?;
    let tx = p.coord()?;
    let ty = p.coord()?;
    let tdir = p.int()? as u8;
    let tscale = p.int()? as u16;
    let text_flags = parse_object_flags(&p.string()?);
    p.expect_close()?;
    let mut raw = RawElement {
        flags,
        desc,
        refdes,
        value,
        mark: Point::new(mx, my),
        text_rel: Point::new(tx, ty),
        text_dir: tdir,
        text_scale: tscale,
        text_flags,
        attributes: Vec::new(),
        pins: Vec::new(),
        pads: Vec::new(),
        lines: Vec::new(),
        arcs: Vec::new(),
    };
    p.expect_open()?;
    while !p.peek_is_close()? {
        let Some(Token::Word(word)) = p.next()? else {
            return Err(p.error("expected element item"));
        };
        match word.as_str() {
            "Attribute" => {
                p.expect_open()?;
                let k = p.string()?;
                let v = p.string()?;
                p.expect_close()?;
                raw.attributes.push((k, v));
            }
            "Pin" => {
                p.expect_open()?;
                let x = p.coord()?;
                let y = p.coord()?;
                let thickness = p.coord()?;
                let clearance = p.coord()?;
                let mask = p.coord()?;
                let drill = p.coord()?;
                let name = p.string()?;
                let number = p.string()?;
                let flags = parse_object_flags(&p.string()?);
                p.expect_close()?;
                raw.pins.push((
                    Point::new(x, y),
                    thickness,
                    clearance,
                    mask,
                    drill,
                    name,
                    number,
                    flags,
                ));
            }
            "Pad" => {
                p.expect_open()?;
                let x1 = p.coord()?;
                let y1 = p.coord()?;
                let x2 = p.coord()?;
                let y2 = p.coord()?;
                let thickness = p.coord()?;
                let clearance = p.coord()?;
                let mask = p.coord()?;
                let name = p.string()?;
                let number = p.string()?;
                let flags = parse_object_flags(&p.string()?);
                p.expect_close()?;
                raw.pads.push((
                    Point::new(x1, y1),
                    Point::new(x2, y2),
                    thickness,
                    clearance,
                    mask,
                    name,
                    number,
                    flags,
                ));
            }
            "ElementLine" => {
                p.expect_open()?;
                let x1 = p.coord()?;
                let y1 = p.coord()?;
                let x2 = p.coord()?;
                let y2 = p.coord()?;
                let t = p.coord()?;
                p.expect_close()?;
                raw.lines.push((Point::new(x1, y1), Point::new(x2, y2), t));
            }
            "ElementArc" => {
                p.expect_open()?;
                let x = p.coord()?;
                let y = p.coord()?;
                let w = p.coord()?;
                let h = p.coord()?;
                let sa = p.int()? as i32;
                let da = p.int()? as i32;
                let t = p.coord()?;
                p.expect_close()?;
                raw.arcs.push((Point::new(x, y), w, h, sa, da, t));
            }
            other => return Err(p.error(format!("unknown element item {other:?}"))),
        }
    }
    p.expect_close()?;
    Ok(raw)
}

fn attach_element(board: &mut Board, raw: RawElement) {
    let data = &mut board.data;
    let mark = raw.mark;
    let abs = |p: Point| Point::new(mark.x + p.x, mark.y + p.y);
    let mut make_text = |data: &mut core_model::BoardData, s: String| {
        let id = data.alloc_id();
        let mut t = Text {
            id,
            pos: abs(raw.text_rel),
            direction: raw.text_dir % 4,
            scale: raw.text_scale.max(1),
            string: s,
            font: 0,
            flags: raw.text_flags,
            bbox: core_geom::BoxType::empty(),
        };
        t.update_bbox();
        t
    };
    let names = [
        make_text(data, raw.desc.clone()),
        make_text(data, raw.refdes.clone()),
        make_text(data, raw.value.clone()),
    ];
    let mut element = Element {
        id: data.alloc_id(),
        mark,
        names,
        pins: Vec::new(),
        pads: Vec::new(),
        lines: Vec::new(),
        arcs: Vec::new(),
        attributes: Default::default(),
        flags: raw.flags,
        bbox: core_geom::BoxType::empty(),
    };
    for (k, v) in raw.attributes {
        element.attributes.push(&k, &v);
    }
    for (pos, thickness, clearance, mask, drill, name, number, flags) in raw.pins {
        let id = data.alloc_id();
        let mut pin = Via {
            id,
            pos: abs(pos),
            thickness,
            clearance,
            mask,
            drilling_hole: drill,
            name: if name.is_empty() { None } else { Some(name) },
            number: if number.is_empty() { None } else { Some(number) },
            buried_from: 0,
            buried_to: 0,
            flags,
            bbox: core_geom::BoxType::empty(),
        };
        pin.flags.set(core_model::ObjectFlags::PIN);
        pin.update_bbox();
        element.pins.push(pin);
    }
    for (p1, p2, thickness, clearance, mask, name, number, flags) in raw.pads {
        let id = data.alloc_id();
        let mut pad = Pad {
            id,
            point1: abs(p1),
            point2: abs(p2),
            thickness,
            clearance,
            mask,
            name: if name.is_empty() { None } else { Some(name) },
            number: if number.is_empty() { None } else { Some(number) },
            flags,
            bbox: core_geom::BoxType::empty(),
        };
        pad.update_bbox();
        element.pads.push(pad);
    }
    for (p1, p2, t) in raw.lines {
        let id = data.alloc_id();
        let mut line = Line {
            id,
            point1: abs(p1),
            point2: abs(p2),
            thickness: t,
            clearance: 0,
            flags: Flags::default(),
            bbox: core_geom::BoxType::empty(),
        };
        line.update_bbox();
        element.lines.push(line);
    }
    for (center, w, h, sa, da, t) in raw.arcs {
        let id = data.alloc_id();
        let mut arc = Arc {
            id,
            center: abs(center),
            width: w,
            height: h,
            start_angle: sa,
            delta: da,
            thickness: t,
            clearance: 0,
            flags: Flags::default(),
            bbox: core_geom::BoxType::empty(),
        };
        arc.update_bbox();
        element.arcs.push(arc);
    }
    core_model::ops::insert_element(data, element);
}

fn parse_layer(p: &mut Parser<'_>) -> Result<RawLayer, ParseError> {
    p.expect_open()?;
    let index = p.int()? as usize;
    let name = p.string()?;
    let type_name = if p.peek_is_close()? {
        String::from("copper")
    } else {
        p.string()?
    };
    p.expect_close()?;
    let layer_type = match type_name.as_str() {
        "silk" => LayerType::Silk,
        "outline" => LayerType::Outline,
        "notes" => LayerType::Notes,
        _ => LayerType::Copper,
    };
    let mut raw = RawLayer {
        index: index.saturating_sub(1),
        name,
        layer_type,
        lines: Vec::new(),
        arcs: Vec::new(),
        texts: Vec::new(),
        polygons: Vec::new(),
    };
    p.expect_open()?;
    while !p.peek_is_close()? {
        let Some(Token::Word(word)) = p.next()? else {
            return Err(p.error("expected layer item"));
        };
        match word.as_str() {
            "Line" => {
                p.expect_open()?;
                let x1 = p.coord()?;
                let y1 = p.coord()?;
                let x2 = p.coord()?;
                let y2 = p.coord()?;
                let t = p.coord()?;
                let cl = p.coord()?;
                let flags = parse_object_flags(&p.string()?);
                p.expect_close()?;
                raw.lines
                    .push((Point::new(x1, y1), Point::new(x2, y2), t, cl, flags));
            }
            "Arc" => {
                p.expect_open()?;
                let x = p.coord()?;
                let y = p.coord()?;
                let w = p.coord()?;
                let h = p.coord()?;
                let t = p.coord()?;
                let cl = p.coord()?;
                let sa = p.int()? as i32;
                let da = p.int()? as i32;
                let flags = parse_object_flags(&p.string()?);
                p.expect_close()?;
                raw.arcs.push((Point::new(x, y), w, h, t, cl, sa, da, flags));
            }
            "Text" => {
                p.expect_open()?;
                let x = p.coord()?;
                let y = p.coord()?;
                let dir = p.int()? as u8;
                let scale = p.int()? as u16;
                let s = p.string()?;
                let flags = parse_object_flags(&p.string()?);
                p.expect_close()?;
                raw.texts.push((Point::new(x, y), dir, scale, s, flags));
            }
            "Polygon" => {
                p.expect_open()?;
                let flags = parse_object_flags(&p.string()?);
                p.expect_close()?;
                p.expect_open()?;
                let mut points = Vec::new();
                let mut holes = Vec::new();
                loop {
                    // Classify the lookahead first; acting on it below
                    // needs the parser back.
                    enum PolyItem {
                        Point,
                        Hole,
                        End,
                    }
                    let item = match p.peek()? {
                        Some(Token::Open('[')) => PolyItem::Point,
                        Some(Token::Word(w)) if w == "Hole" => PolyItem::Hole,
                        Some(Token::Close(_)) => PolyItem::End,
                        other => {
                            let msg = format!("unexpected polygon item {other:?}");
                            return Err(p.error(msg));
                        }
                    };
                    match item {
                        PolyItem::Point => {
                            p.expect_open()?;
                            let x = p.coord()?;
                            let y = p.coord()?;
                            p.expect_close()?;
                            points.push(Point::new(x, y));
                        }
                        PolyItem::Hole => {
                            p.next()?;
                            holes.push(points.len());
                            p.expect_open()?;
                            while !p.peek_is_close()? {
                                p.expect_open()?;
                                let x = p.coord()?;
                                let y = p.coord()?;
                                p.expect_close()?;
                                points.push(Point::new(x, y));
                            }
                            p.expect_close()?;
                        }
                        PolyItem::End => break,
                    }
                }
                p.expect_close()?;
                raw.polygons.push((points, holes, flags));
            }
            other => return Err(p.error(format!("unknown layer item {other:?}"))),
        }
    }
    p.expect_close()?;
    Ok(raw)
}

fn attach_layer(board: &mut Board, raw: RawLayer) {
    let idx = raw.index;
    {
        let layer = &mut board.data.layers[idx];
        layer.name = raw.name;
        layer.layer_type = raw.layer_type;
    }
    for (p1, p2, t, cl, flags) in raw.lines {
        core_model::ops::create_line(&mut board.data, idx, p1, p2, t, cl, flags);
    }
    for (center, w, h, t, cl, sa, da, flags) in raw.arcs {
        core_model::ops::create_arc(&mut board.data, idx, center, w, h, sa, da, t, cl, flags);
    }
    for (pos, dir, scale, s, flags) in raw.texts {
        core_model::ops::create_text(&mut board.data, idx, pos, dir, scale, s, 0, flags);
    }
    for (points, holes, flags) in raw.polygons {
        core_model::ops::create_polygon(&mut board.data, idx, points, holes, flags);
    }
}

/// Load a board file from disk.
pub fn load_board(path: &Path) -> Result<Board, ParseError> {
    let text = std::fs::read_to_string(path).map_err(|e| ParseError::Io(e.to_string()))?;
    parse_board(&text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::write::board_to_string;
    use core_model::flags::ObjectFlags;
    use core_model::ops;

    fn sample_board() -> Board {
        let mut b = Board::new(2, 6000 * MIL, 5000 * MIL);
        b.name = "test board".into();
        b.attributes.push("designer", "someone");
        let vid = ops::create_via(
            &mut b.data,
            Point::new(100 * MIL, 100 * MIL),
            60 * MIL,
            20 * MIL,
            0,
            28 * MIL,
            Some("V1".into()),
            Flags::new(ObjectFlags::SELECTED),
        );
        if let Some(v) = b.data.via_mut(vid) {
            v.flags.thermals.set(0, ThermalStyle::Solid);
        }
        ops::create_line(
            &mut b.data,
            0,
            Point::new(0, 0),
            Point::new(200 * MIL, 0),
            10 * MIL,
            20 * MIL,
            Flags::new(ObjectFlags::CLEARLINE),
        );
        ops::create_arc(
            &mut b.data,
            1,
            Point::new(300 * MIL, 300 * MIL),
            50 * MIL,
            50 * MIL,
            0,
            90,
            10 * MIL,
            20 * MIL,
            Flags::default(),
        );
        ops::create_text(
            &mut b.data,
            0,
            Point::new(50 * MIL, 50 * MIL),
            1,
            120,
            "hello \"board\"".into(),
            0,
            Flags::new(ObjectFlags::CLEARLINE),
        );
        ops::create_polygon(
            &mut b.data,
            1,
            vec![
                Point::new(0, 0),
                Point::new(1000 * MIL, 0),
                Point::new(1000 * MIL, 1000 * MIL),
                Point::new(0, 1000 * MIL),
                Point::new(400 * MIL, 400 * MIL),
                Point::new(600 * MIL, 400 * MIL),
                Point::new(500 * MIL, 600 * MIL),
            ],
            vec![4],
            Flags::new(ObjectFlags::CLEARPOLY),
        );
        b.netlist.add_connection("GND", "U1-1");
        b.netlist.add_connection("GND", "U1-2");
        b
    }

    #[test]
    fn round_trip_preserves_structure() {
        let b = sample_board();
        let text = board_to_string(&b, false);
        let parsed = parse_board(&text).expect("parses");
        assert_eq!(parsed.name, b.name);
        assert_eq!(parsed.data.vias.len(), 1);
        let via = &parsed.data.vias[0];
        assert_eq!(via.pos, Point::new(100 * MIL, 100 * MIL));
        assert_eq!(via.name.as_deref(), Some("V1"));
        assert!(via.flags.has(ObjectFlags::SELECTED));
        assert_eq!(via.flags.thermals.get(0), ThermalStyle::Solid);
        assert_eq!(parsed.data.layers[0].lines.len(), 1);
        assert_eq!(parsed.data.layers[0].texts[0].string, "hello \"board\"");
        assert_eq!(parsed.data.layers[1].arcs.len(), 1);
        let poly = &parsed.data.layers[1].polygons[0];
        assert_eq!(poly.hole_indices, vec![4]);
        assert_eq!(poly.points.len(), 7);
        assert_eq!(parsed.netlist.nets.len(), 1);
        assert_eq!(parsed.netlist.nets[0].connections.len(), 2);
        assert_eq!(parsed.attributes.get("designer"), Some("someone"));
        // A second trip is byte-stable.
        let text2 = board_to_string(&parsed, false);
        assert_eq!(text, text2);
    }

    #[test]
    fn element_round_trip() {
        let mut b = Board::new(2, 6000 * MIL, 5000 * MIL);
        let eid = b.data.alloc_id();
        let pin_id = b.data.alloc_id();
        let mut pin = Via {
            id: pin_id,
            pos: Point::new(110 * MIL, 110 * MIL),
            thickness: 60 * MIL,
            clearance: 20 * MIL,
            mask: 66 * MIL,
            drilling_hole: 28 * MIL,
            name: Some("clk".into()),
            number: Some("1".into()),
            buried_from: 0,
            buried_to: 0,
            flags: Flags::new(ObjectFlags::PIN | ObjectFlags::SQUARE),
            bbox: core_geom::BoxType::empty(),
        };
        pin.update_bbox();
        let names = std::array::from_fn(|i| {
            let id = b.data.alloc_id();
            let mut t = Text {
                id,
                pos: Point::new(100 * MIL, 90 * MIL),
                direction: 0,
                scale: 100,
                string: ["DIP8", "U1", "74HC00"][i].to_string(),
                font: 0,
                flags: Flags::default(),
                bbox: core_geom::BoxType::empty(),
            };
            t.update_bbox();
            t
        });
        let element = Element {
            id: eid,
            mark: Point::new(100 * MIL, 100 * MIL),
            names,
            pins: vec![pin],
            pads: vec![],
            lines: vec![],
            arcs: vec![],
            attributes: Default::default(),
            flags: Flags::default(),
            bbox: core_geom::BoxType::empty(),
        };
        ops::insert_element(&mut b.data, element);
        let text = board_to_string(&b, false);
        let parsed = parse_board(&text).expect("parses");
        assert_eq!(parsed.data.elements.len(), 1);
        let e = &parsed.data.elements[0];
        assert_eq!(e.refdes(), "U1");
        assert_eq!(e.pins.len(), 1);
        assert_eq!(e.pins[0].pos, Point::new(110 * MIL, 110 * MIL));
        assert_eq!(e.pins[0].number.as_deref(), Some("1"));
        assert!(e.pins[0].flags.has(ObjectFlags::SQUARE));
    }

    #[test]
    fn newer_file_version_is_refused() {
        let text = "FileVersion[99999999]\nPCB[\"x\" 1000 1000]\n";
        match parse_board(text) {
            Err(ParseError::VersionTooNew { .. }) => {}
            other => panic!("expected version error, got {other:?}"),
        }
    }

    #[test]
    fn garbage_is_a_syntax_error() {
        assert!(matches!(
            parse_board("Nonsense[1 2 3]"),
            Err(ParseError::Syntax { .. })
        ));
        assert!(matches!(
            parse_board("PCB[\"unterminated"),
            Err(ParseError::Syntax { .. })
        ));
    }

    #[test]
    fn buried_via_fields_parse() {
        let text = "PCB[\"b\" 1000000 1000000]\nVia[1000 1000 100 40 0 40 2 3 \"\" \"\"]\n";
        let b = parse_board(text).expect("parses");
        assert_eq!(b.data.vias.len(), 1);
        assert_eq!(b.data.vias[0].buried_from, 2);
        assert_eq!(b.data.vias[0].buried_to, 3);
    }
}
