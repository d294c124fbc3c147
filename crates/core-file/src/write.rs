//! Board file emission.
//!
//! Coordinates are written in mil when they land exactly on a centimil,
//! otherwise in millimeters; with `metric_only` everything is metric. Pins,
//! pads and element silk are written element-relative, offset from the
//! element's mark, the way the format defines them.

use crate::file_version_needed;
use core_geom::{Coord, MIL, Point};
use core_model::entity::{Element, Polygon};
use core_model::flags::{Flags, ObjectKind, board_flags_to_string, object_flags_to_string_typed};
use core_model::{Board, Layer, LayerType};
use std::fmt::Write as _;
use std::path::Path;

/// Format a coordinate with a unit suffix.
pub(crate) fn fmt_coord(c: Coord, metric_only: bool) -> String {
    let cmil = MIL / 100;
    if !metric_only && c % cmil == 0 {
        let mils = c / cmil;
        if mils % 100 == 0 {
            format!("{}mil", mils / 100)
        } else {
            format!("{}.{:02}mil", mils / 100, (mils % 100).abs())
        }
    } else {
        let mm = c as f64 / 1_000_000.0;
        let s = format!("{mm:.6}");
        let s = s.trim_end_matches('0').trim_end_matches('.');
        format!("{s}mm")
    }
}

/// Quote with C-style escapes.
pub(crate) fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}

fn flags_str(flags: &Flags, kind: ObjectKind) -> String {
    let mut s = object_flags_to_string_typed(flags.word, kind);
    // Thermal nibbles print as thermal(layer,style) entries beside the
    // symbolic names.
    for layer in 0..core_model::MAX_LAYER {
        let style = flags.thermals.get(layer);
        if style != core_model::ThermalStyle::None {
            if !s.is_empty() {
                s.push(',');
            }
            let _ = write!(s, "thermal({layer},{})", style.as_nibble());
        }
    }
    quote(&s)
}

/// Render a whole board to its file representation.
pub fn board_to_string(board: &Board, metric_only: bool) -> String {
    let mut out = String::new();
    let c = |v: Coord| fmt_coord(v, metric_only);
    let _ = writeln!(out, "# release: pcb-core");
    let _ = writeln!(
        out,
        "# To read pcb files, the pcb version (or the git source date) must be >= the file version"
    );
    let _ = writeln!(out, "FileVersion[{}]", file_version_needed(board));
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "PCB[{} {} {}]",
        quote(&board.name),
        c(board.max_width),
        c(board.max_height)
    );
    let _ = writeln!(out);
    let _ = writeln!(out, "Grid[{} 0mil 0mil 1]", c(board.grid));
    let _ = writeln!(out, "PolyArea[{:.4}]", board.isle_area / (MIL as f64 * MIL as f64));
    let _ = writeln!(out, "Thermal[{:.6}]", board.thermal_scale);
    let _ = writeln!(
        out,
        "DRC[{} {} {} {} {} {}]",
        c(board.drc.bloat),
        c(board.drc.shrink),
        c(board.drc.min_width),
        c(board.drc.min_silk),
        c(board.drc.min_drill),
        c(board.drc.min_ring)
    );
    let _ = writeln!(out, "Flags({})", quote(&board_flags_to_string(board.flags)));
    let _ = writeln!(out, "Groups({})", quote(&groups_to_string(board)));
    let _ = writeln!(out, "Styles[{}]", quote(&styles_to_string(board, metric_only)));
    let _ = writeln!(out);
    for (k, v) in board.attributes.iter() {
        let _ = writeln!(out, "Attribute({} {})", quote(k), quote(v));
    }

    for via in &board.data.vias {
        if via.is_through_hole() {
            let _ = writeln!(
                out,
                "Via[{} {} {} {} {} {} {} {}]",
                c(via.pos.x),
                c(via.pos.y),
                c(via.thickness),
                c(via.clearance),
                c(via.mask),
                c(via.drilling_hole),
                quote(via.name.as_deref().unwrap_or("")),
                flags_str(&via.flags, ObjectKind::Via)
            );
        } else {
            let _ = writeln!(
                out,
                "Via[{} {} {} {} {} {} {} {} {} {}]",
                c(via.pos.x),
                c(via.pos.y),
                c(via.thickness),
                c(via.clearance),
                c(via.mask),
                c(via.drilling_hole),
                via.buried_from,
                via.buried_to,
                quote(via.name.as_deref().unwrap_or("")),
                flags_str(&via.flags, ObjectKind::Via)
            );
        }
    }

    for element in &board.data.elements {
        write_element(&mut out, element, metric_only);
    }

    for rat in &board.data.rats {
        let _ = writeln!(
            out,
            "Rat[{} {} {} {} {} {} {}]",
            c(rat.point1.x),
            c(rat.point1.y),
            rat.group1,
            c(rat.point2.x),
            c(rat.point2.y),
            rat.group2,
            flags_str(&rat.flags, ObjectKind::Rat)
        );
    }

    for (idx, layer) in board.data.layers.iter().enumerate() {
        write_layer(&mut out, idx, layer, metric_only);
    }

    if !board.netlist.is_empty() {
        let _ = writeln!(out, "NetList()\n(");
        for net in &board.netlist.nets {
            let _ = writeln!(
                out,
                "\tNet({} {})",
                quote(&net.name),
                quote(net.style.as_deref().unwrap_or(""))
            );
            let _ = writeln!(out, "\t(");
            for conn in &net.connections {
                let _ = writeln!(out, "\t\tConnect({})", quote(conn));
            }
            let _ = writeln!(out, "\t)");
        }
        let _ = writeln!(out, ")");
    }
    out
}

fn groups_to_string(board: &Board) -> String {
    let mut parts = Vec::new();
    for (gi, group) in board.groups.groups.iter().enumerate() {
        let mut members: Vec<String> = group.iter().map(|l| (l + 1).to_string()).collect();
        if gi == board.groups.component_group {
            members.push("c".into());
        }
        if gi == board.groups.solder_group {
            members.push("s".into());
        }
        parts.push(members.join(","));
    }
    parts.join(":")
}

fn styles_to_string(board: &Board, metric_only: bool) -> String {
    board
        .styles
        .iter()
        .map(|s| {
            format!(
                "{},{},{},{},{}",
                s.name,
                fmt_coord(s.thick, metric_only),
                fmt_coord(s.diameter, metric_only),
                fmt_coord(s.hole, metric_only),
                fmt_coord(s.keepaway, metric_only)
            )
        })
        .collect::<Vec<_>>()
        .join(":")
}

fn write_element(out: &mut String, e: &Element, metric_only: bool) {
    let c = |v: Coord| fmt_coord(v, metric_only);
    let mark = e.mark;
    let rel = |p: Point| (p.x - mark.x, p.y - mark.y);
    let desc = &e.names[core_model::NAME_DESCRIPTION];
    let refdes = &e.names[core_model::NAME_REFDES];
    let value = &e.names[core_model::NAME_VALUE];
    let (tx, ty) = rel(refdes.pos);
    let _ = writeln!(
        out,
        "\nElement[{} {} {} {} {} {} {} {} {} {} {}]\n(",
        flags_str(&e.flags, ObjectKind::Element),
        quote(&desc.string),
        quote(&refdes.string),
        quote(&value.string),
        c(mark.x),
        c(mark.y),
        c(tx),
        c(ty),
        refdes.direction,
        refdes.scale,
        flags_str(&refdes.flags, ObjectKind::Text)
    );
    for (k, v) in e.attributes.iter() {
        let _ = writeln!(out, "\tAttribute({} {})", quote(k), quote(v));
    }
    for pin in &e.pins {
        let (x, y) = rel(pin.pos);
        let _ = writeln!(
            out,
            "\tPin[{} {} {} {} {} {} {} {} {}]",
            c(x),
            c(y),
            c(pin.thickness),
            c(pin.clearance),
            c(pin.mask),
            c(pin.drilling_hole),
            quote(pin.name.as_deref().unwrap_or("")),
            quote(pin.number.as_deref().unwrap_or("")),
            flags_str(&pin.flags, ObjectKind::Pin)
        );
    }
    for pad in &e.pads {
        let (x1, y1) = rel(pad.point1);
        let (x2, y2) = rel(pad.point2);
        let _ = writeln!(
            out,
            "\tPad[{} {} {} {} {} {} {} {} {} {}]",
            c(x1),
            c(y1),
            c(x2),
            c(y2),
            c(pad.thickness),
            c(pad.clearance),
            c(pad.mask),
            quote(pad.name.as_deref().unwrap_or("")),
            quote(pad.number.as_deref().unwrap_or("")),
            flags_str(&pad.flags, ObjectKind::Pad)
        );
    }
    for line in &e.lines {
        let (x1, y1) = rel(line.point1);
        let (x2, y2) = rel(line.point2);
        let _ = writeln!(
            out,
            "\tElementLine [{} {} {} {} {}]",
            c(x1),
            c(y1),
            c(x2),
            c(y2),
            c(line.thickness)
        );
    }
    for arc in &e.arcs {
        let (x, y) = rel(arc.center);
        let _ = writeln!(
            out,
            "\tElementArc [{} {} {} {} {} {} {}]",
            c(x),
            c(y),
            c(arc.width),
            c(arc.height),
            arc.start_angle,
            arc.delta,
            c(arc.thickness)
        );
    }
    let _ = writeln!(out, ")");
}

fn layer_type_name(t: LayerType) -> &'static str {
    match t {
        LayerType::Copper => "copper",
        LayerType::Silk => "silk",
        LayerType::Outline => "outline",
        LayerType::Notes => "notes",
    }
}

// Empty layers still appear so the stack shape survives the trip.
fn write_layer(out: &mut String, idx: usize, layer: &Layer, metric_only: bool) {
    let c = |v: Coord| fmt_coord(v, metric_only);
    let _ = writeln!(
        out,
        "Layer({} {} {})\n(",
        idx + 1,
        quote(&layer.name),
        quote(layer_type_name(layer.layer_type))
    );
    for line in &layer.lines {
        let _ = writeln!(
            out,
            "\tLine[{} {} {} {} {} {} {}]",
            c(line.point1.x),
            c(line.point1.y),
            c(line.point2.x),
            c(line.point2.y),
            c(line.thickness),
            c(line.clearance),
            flags_str(&line.flags, ObjectKind::Line)
        );
    }
    for arc in &layer.arcs {
        let _ = writeln!(
            out,
            "\tArc[{} {} {} {} {} {} {} {} {}]",
            c(arc.center.x),
            c(arc.center.y),
            c(arc.width),
            c(arc.height),
            c(arc.thickness),
            c(arc.clearance),
            arc.start_angle,
            arc.delta,
            flags_str(&arc.flags, ObjectKind::Arc)
        );
    }
    for text in &layer.texts {
        let _ = writeln!(
            out,
            "\tText[{} {} {} {} {} {}]",
            c(text.pos.x),
            c(text.pos.y),
            text.direction,
            text.scale,
            quote(&text.string),
            flags_str(&text.flags, ObjectKind::Text)
        );
    }
    for poly in &layer.polygons {
        write_polygon(out, poly, metric_only);
    }
    let _ = writeln!(out, ")");
}

fn write_polygon(out: &mut String, poly: &Polygon, metric_only: bool) {
    let c = |v: Coord| fmt_coord(v, metric_only);
    let _ = writeln!(out, "\tPolygon({})", flags_str(&poly.flags, ObjectKind::Polygon));
    let _ = writeln!(out, "\t(");
    let outer_end = poly
        .hole_indices
        .first()
        .copied()
        .unwrap_or(poly.points.len());
    let mut line = String::from("\t\t");
    for p in &poly.points[..outer_end] {
        let _ = write!(line, "[{} {}] ", c(p.x), c(p.y));
    }
    let _ = writeln!(out, "{}", line.trim_end());
    for (hi, &start) in poly.hole_indices.iter().enumerate() {
        let end = poly
            .hole_indices
            .get(hi + 1)
            .copied()
            .unwrap_or(poly.points.len());
        let _ = writeln!(out, "\t\tHole (");
        let mut line = String::from("\t\t\t");
        for p in &poly.points[start..end] {
            let _ = write!(line, "[{} {}] ", c(p.x), c(p.y));
        }
        let _ = writeln!(out, "{}", line.trim_end());
        let _ = writeln!(out, "\t\t)");
    }
    let _ = writeln!(out, "\t)");
}

/// Write the board to a file.
pub fn save_board(board: &Board, path: &Path, metric_only: bool) -> anyhow::Result<()> {
    let text = board_to_string(board, metric_only);
    std::fs::write(path, text)?;
    tracing::info!(target: "file", path = %path.display(), "board_saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coord_formatting_prefers_exact_mil() {
        assert_eq!(fmt_coord(254_000, false), "10mil");
        assert_eq!(fmt_coord(25_400, false), "1mil");
        assert_eq!(fmt_coord(12_700, false), "0.50mil");
        assert_eq!(fmt_coord(1_000_000, true), "1mm");
        // Off-grid values go metric.
        assert_eq!(fmt_coord(1_000_001, false), "1.000001mm");
    }

    #[test]
    fn quoting_escapes() {
        assert_eq!(quote("plain"), "\"plain\"");
        assert_eq!(quote("a\"b\\c"), "\"a\\\"b\\\\c\"");
        assert_eq!(quote("x\ny"), "\"x\\ny\"");
    }

    #[test]
    fn header_contains_version_and_frame() {
        let board = Board::new(2, 254_000, 254_000);
        let text = board_to_string(&board, false);
        assert!(text.contains("FileVersion[20070407]"));
        assert!(text.contains("PCB[\"\" 10mil 10mil]"));
        assert!(text.contains("Groups(\"1,c:2,s\")"));
    }
}
