//! File-backed actions: load, save, script execution.
//!
//! Loads keep the previous board on any parse failure; saves route through
//! the file crate and mark the board clean only on success.

use super::Registry;
use crate::{ActionError, Context};
use std::path::PathBuf;
use tracing::{info, warn};

fn arg_err(ctx: &mut Context, action: &'static str, detail: impl Into<String>) -> ActionError {
    ctx.fail(ActionError::Argument {
        action,
        detail: detail.into(),
    })
}

pub(super) fn action_load_from(ctx: &mut Context, args: &[String]) -> Result<(), ActionError> {
    let what = args
        .first()
        .ok_or_else(|| arg_err(ctx, "LoadFrom", "expected Layout|Netlist, filename"))?;
    let path = args
        .get(1)
        .cloned()
        .or_else(|| ctx.hid.file_select("Load file:", None))
        .ok_or_else(|| arg_err(ctx, "LoadFrom", "missing filename"))?;
    let path = PathBuf::from(path);
    match what.to_ascii_lowercase().as_str() {
        "layout" => match core_file::load_board(&path) {
            Ok(board) => {
                ctx.replace_board(board);
                info!(target: "dispatch", path = %path.display(), "layout_loaded");
                Ok(())
            }
            Err(err) => {
                // The previous board stays.
                warn!(target: "dispatch", %err, "layout_load_failed");
                Err(ctx.fail(ActionError::Io(err.to_string())))
            }
        },
        "netlist" => {
            let text = std::fs::read_to_string(&path)
                .map_err(|e| ctx.fail(ActionError::Io(e.to_string())))?;
            ctx.board.netlist = core_file::parse_netlist(&text);
            info!(target: "dispatch", nets = ctx.board.netlist.nets.len(), "netlist_loaded");
            Ok(())
        }
        other => Err(arg_err(ctx, "LoadFrom", format!("unknown source {other:?}"))),
    }
}

pub(super) fn action_save_to(ctx: &mut Context, args: &[String]) -> Result<(), ActionError> {
    let what = args
        .first()
        .ok_or_else(|| arg_err(ctx, "SaveTo", "expected Layout|LayoutAs, filename"))?;
    match what.to_ascii_lowercase().as_str() {
        "layout" | "layoutas" => {
            let path = args
                .get(1)
                .cloned()
                .or_else(|| ctx.hid.file_select("Save layout as:", Some(&ctx.board.name)))
                .ok_or_else(|| arg_err(ctx, "SaveTo", "missing filename"))?;
            let metric = ctx.settings.save_metric_only;
            match core_file::save_board(&ctx.board, &PathBuf::from(&path), metric) {
                Ok(()) => {
                    ctx.board.changed = false;
                    Ok(())
                }
                Err(err) => {
                    // Saving is where data loss happens; fall back to the
                    // rescue path before reporting.
                    core_file::emergency_save(&ctx.board);
                    Err(ctx.fail(ActionError::Io(err.to_string())))
                }
            }
        }
        other => Err(arg_err(ctx, "SaveTo", format!("unknown target {other:?}"))),
    }
}

pub(super) fn action_execute_file(ctx: &mut Context, args: &[String]) -> Result<(), ActionError> {
    let path = args
        .first()
        .ok_or_else(|| arg_err(ctx, "ExecuteFile", "missing filename"))?;
    let lines = core_file::read_action_script(&PathBuf::from(path))
        .map_err(|e| ctx.fail(ActionError::Io(e.to_string())))?;
    let registry = Registry::builtin();
    let mut failures = 0;
    for line in &lines {
        if super::execute_line(ctx, &registry, line) != 0 {
            failures += 1;
        }
    }
    info!(target: "dispatch", lines = lines.len(), failures, "script_executed");
    if failures > 0 {
        Err(ctx.fail(ActionError::Io(format!(
            "{failures} script line(s) failed"
        ))))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::Context;
    use crate::dispatcher::execute_actions;

    #[test]
    fn save_then_load_round_trips_through_actions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.pcb");
        let mut ctx = Context::headless();
        execute_actions(&mut ctx, "Mode(Via); Notify(254000, 254000)");
        assert_eq!(ctx.board.data.vias.len(), 1);
        let line = format!("SaveTo(Layout, \"{}\")", path.display());
        assert_eq!(execute_actions(&mut ctx, &line), 0);
        assert!(!ctx.board.changed);

        let mut fresh = Context::headless();
        let line = format!("LoadFrom(Layout, \"{}\")", path.display());
        assert_eq!(execute_actions(&mut fresh, &line), 0);
        assert_eq!(fresh.board.data.vias.len(), 1);
    }

    #[test]
    fn failed_load_keeps_previous_board() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("bad.pcb");
        std::fs::write(&bad, "FileVersion[99999999]\n").unwrap();
        let mut ctx = Context::headless();
        execute_actions(&mut ctx, "Mode(Via); Notify(254000, 254000)");
        let line = format!("LoadFrom(Layout, \"{}\")", bad.display());
        assert_eq!(execute_actions(&mut ctx, &line), 1);
        // The via placed before the failed load is still there.
        assert_eq!(ctx.board.data.vias.len(), 1);
    }

    #[test]
    fn execute_file_runs_scripts() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("place.act");
        std::fs::write(
            &script,
            "# place two vias\nMode(Via)\nNotify(254000, 254000)\nNotify(508000, 508000)\n",
        )
        .unwrap();
        let mut ctx = Context::headless();
        let line = format!("ExecuteFile(\"{}\")", script.display());
        assert_eq!(execute_actions(&mut ctx, &line), 0);
        assert_eq!(ctx.board.data.vias.len(), 2);
    }
}
