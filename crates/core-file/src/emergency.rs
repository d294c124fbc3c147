//! Emergency save: the last-ditch write on a fatal error.
//!
//! A process-wide guard keeps the path single-shot: if the save itself
//! faults and the handler re-enters, the second attempt bails immediately
//! instead of recursing. The board text is rendered before the file is
//! touched so a failing disk cannot leave a half-formatted file behind a
//! second fault.

use core_model::Board;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::error;

static IN_EMERGENCY: AtomicBool = AtomicBool::new(false);

/// Write the board to a temporary rescue file. Returns the path on
/// success; `None` when re-entered or when the write failed.
pub fn emergency_save(board: &Board) -> Option<PathBuf> {
    if IN_EMERGENCY.swap(true, Ordering::SeqCst) {
        return None;
    }
    let result = attempt(board);
    IN_EMERGENCY.store(false, Ordering::SeqCst);
    result
}

fn attempt(board: &Board) -> Option<PathBuf> {
    let text = crate::write::board_to_string(board, false);
    let path = std::env::temp_dir().join(format!("PCB.{}.save", std::process::id()));
    match std::fs::write(&path, text) {
        Ok(()) => {
            error!(target: "file", path = %path.display(), "emergency_save_written");
            Some(path)
        }
        Err(err) => {
            error!(target: "file", %err, "emergency_save_failed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_a_rescue_file() {
        let board = Board::new(2, 1_000_000, 1_000_000);
        let path = emergency_save(&board).expect("rescue file written");
        let text = std::fs::read_to_string(&path).expect("readable");
        assert!(text.contains("PCB["));
        let _ = std::fs::remove_file(path);
    }
}
