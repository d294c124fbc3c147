//! pcb entrypoint: board loading, print/export modes, and the stdin action
//! listener.
//!
//! Exit codes: 0 success, 1 for command-line or load errors; export and
//! script failures propagate their own nonzero statuses.

use anyhow::Result;
use clap::Parser;
use core_actions::{Context, execute_actions};
use core_config::Settings;
use core_model::Board;
use std::io::{BufRead, Write as _};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// CLI arguments.
#[derive(Parser, Debug)]
#[command(name = "pcb", version, about = "printed circuit board editing core")]
struct Args {
    /// Board file to load.
    pub board: Option<PathBuf>,
    /// Print the parsed board back to stdout and exit.
    #[arg(short = 'p', long = "print")]
    pub print: bool,
    /// Export through the named back end and exit ("file" re-emits the
    /// board file; the graphical exporters live in their own front ends).
    #[arg(short = 'x', value_name = "HID")]
    pub export: Option<String>,
    /// Export output path (with -x).
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output: Option<PathBuf>,
    /// Read one action line per stdin line until EOF.
    #[arg(long = "listen")]
    pub listen: bool,
    /// Preferences file override.
    #[arg(long = "preferences", value_name = "FILE")]
    pub preferences: Option<PathBuf>,
    /// Log file; without it diagnostics go to stderr.
    #[arg(long = "log-file", value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

fn configure_logging(args: &Args) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match &args.log_file {
        Some(path) => {
            let dir = path.parent().unwrap_or_else(|| std::path::Path::new("."));
            let file = path.file_name().map(PathBuf::from).unwrap_or_else(|| "pcb.log".into());
            let appender = tracing_appender::rolling::never(dir, file);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
            None
        }
    }
}

fn load_board_arg(args: &Args, settings: &Settings) -> Result<Board, i32> {
    match &args.board {
        Some(path) => match core_file::load_board(path) {
            Ok(board) => Ok(board),
            Err(err) => {
                error!(target: "main", %err, path = %path.display(), "board_load_failed");
                eprintln!("pcb: cannot load {}: {err}", path.display());
                Err(1)
            }
        },
        None => Ok(Board::new(
            settings.copper_layers as usize,
            settings.max_width,
            settings.max_height,
        )),
    }
}

fn export(board: &Board, hid: &str, output: Option<&PathBuf>, metric: bool) -> i32 {
    match hid {
        "file" => {
            let text = core_file::board_to_string(board, metric);
            match output {
                Some(path) => match std::fs::write(path, text) {
                    Ok(()) => 0,
                    Err(err) => {
                        eprintln!("pcb: cannot write {}: {err}", path.display());
                        1
                    }
                },
                None => {
                    print!("{text}");
                    0
                }
            }
        }
        other => {
            eprintln!("pcb: unknown export back end {other:?} (available: file)");
            1
        }
    }
}

/// The stdin listener: one action line per input line, errors logged and
/// non-fatal, EOF ends the session.
fn listen_loop(ctx: &mut Context) -> i32 {
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(err) => {
                error!(target: "main", %err, "stdin_read_failed");
                break;
            }
        };
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let code = execute_actions(ctx, trimmed);
        if code != 0 {
            info!(target: "main", line = trimmed, code, "action_line_failed");
        }
        if ctx.quit_requested {
            break;
        }
        let _ = std::io::stdout().flush();
    }
    0
}

fn run() -> i32 {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            // Help and version print through clap and exit clean; real
            // parse errors exit 1.
            use clap::error::ErrorKind;
            let code = match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => 1,
            };
            let _ = err.print();
            return code;
        }
    };
    let _log_guard = configure_logging(&args);
    info!(target: "main", "startup");

    let settings = match core_config::load_from(args.preferences.clone()) {
        Ok(s) => s,
        Err(err) => {
            error!(target: "main", %err, "preferences_load_failed");
            Settings::default()
        }
    };

    let board = match load_board_arg(&args, &settings) {
        Ok(b) => b,
        Err(code) => return code,
    };

    if args.print {
        print!(
            "{}",
            core_file::board_to_string(&board, settings.save_metric_only)
        );
        return 0;
    }
    if let Some(hid) = &args.export {
        return export(&board, hid, args.output.as_ref(), settings.save_metric_only);
    }

    let mut ctx = Context::new(board, settings, Box::new(core_hid::Headless));
    core_model::clip::reclip_dirty(&mut ctx.board);
    if args.listen {
        return listen_loop(&mut ctx);
    }

    // Without a front end there is nothing interactive to run; report what
    // was loaded so a bare invocation still does something useful.
    let d = &ctx.board.data;
    let (mut lines, mut arcs, mut texts, mut polygons) = (0, 0, 0, 0);
    for l in &d.layers {
        lines += l.lines.len();
        arcs += l.arcs.len();
        texts += l.texts.len();
        polygons += l.polygons.len();
    }
    println!(
        "{}: {} layers, {} vias, {} elements, {} lines, {} arcs, {} texts, {} polygons, {} rats",
        if ctx.board.name.is_empty() {
            "(unnamed board)"
        } else {
            &ctx.board.name
        },
        d.layers.len(),
        d.vias.len(),
        d.elements.len(),
        lines,
        arcs,
        texts,
        polygons,
        d.rats.len()
    );
    0
}

fn main() -> ExitCode {
    ExitCode::from(run() as u8)
}
