//! Board, netlist and action-script file formats.
//!
//! The board format is a line-oriented text representation: a version
//! header, the board frame (`PCB[...]`, `Grid[...]`, `DRC[...]`, flag and
//! group strings), then vias, elements with nested pins/pads/silk, layer
//! blocks with lines/arcs/texts/polygons, and an optional netlist block.
//! Quoted strings use C-style escapes. The writer emits the lowest
//! `FileVersion` able to represent the board; the reader refuses files
//! newer than what this implementation understands and leaves the caller's
//! previous board untouched.

pub mod emergency;
pub mod netlist;
pub mod parse;
pub mod script;
pub mod write;

pub use emergency::emergency_save;
pub use netlist::parse_netlist;
pub use parse::{ParseError, load_board, parse_board};
pub use script::read_action_script;
pub use write::{board_to_string, save_board};

/// Oldest file version this implementation reads.
pub const FILE_VERSION_BASELINE: u32 = 20070407;
/// Version needed by polygons with holes.
pub const FILE_VERSION_HOLES: u32 = 20100606;
/// Version needed by buried vias; also the newest this implementation
/// understands.
pub const FILE_VERSION_CURRENT: u32 = 20170218;

/// The lowest file version able to represent `board`.
pub fn file_version_needed(board: &core_model::Board) -> u32 {
    let mut needed = FILE_VERSION_BASELINE;
    for l in &board.data.layers {
        if l.polygons.iter().any(|p| !p.hole_indices.is_empty()) {
            needed = needed.max(FILE_VERSION_HOLES);
        }
    }
    if board.data.vias.iter().any(|v| !v.is_through_hole()) {
        needed = needed.max(FILE_VERSION_CURRENT);
    }
    needed
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_geom::Point;
    use core_model::flags::Flags;
    use core_model::{Board, ops};

    #[test]
    fn version_scales_with_features() {
        let mut b = Board::new(2, 100_000, 100_000);
        assert_eq!(file_version_needed(&b), FILE_VERSION_BASELINE);
        ops::create_polygon(
            &mut b.data,
            0,
            vec![
                Point::new(0, 0),
                Point::new(1000, 0),
                Point::new(1000, 1000),
                Point::new(0, 1000),
                Point::new(400, 400),
                Point::new(600, 400),
                Point::new(500, 600),
            ],
            vec![4],
            Flags::default(),
        )
        .expect("poly");
        assert_eq!(file_version_needed(&b), FILE_VERSION_HOLES);
        let vid = ops::create_via(
            &mut b.data,
            Point::new(0, 0),
            100,
            40,
            0,
            40,
            None,
            Flags::default(),
        );
        if let Some(v) = b.data.via_mut(vid) {
            v.buried_from = 1;
            v.buried_to = 2;
        }
        assert_eq!(file_version_needed(&b), FILE_VERSION_CURRENT);
    }
}
