//! Interactive editing dispatcher: tool modes, attached scaffolding, the
//! action registry, selection, hit testing, paste buffers and rubber
//! banding.
//!
//! All interactive state lives in a [`Context`] threaded through every
//! action: the board, the undo journal, the settings snapshot, the five
//! paste buffers, the crosshair with its attached in-progress objects, and
//! the user-surface channel. Test harnesses build as many independent
//! contexts as they like.

pub mod buffer;
pub mod crosshair;
pub mod dispatcher;
pub mod lineclip;
pub mod rubberband;
pub mod search;
pub mod select;

pub use crosshair::{
    AttachedBox, AttachedLine, AttachedObject, Crosshair, DrawState, Mode, Note,
};
pub use dispatcher::{execute_actions, execute_line, Registry};
pub use lineclip::Clipping;
pub use search::Hit;

use core_config::Settings;
use core_hid::Hid;
use core_model::Board;
use core_state::UndoJournal;
use thiserror::Error;

/// Errors an action can report. Each maps to a nonzero exit status for the
/// scripted surfaces; the message has already been logged when the error is
/// returned.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("unknown action {0}")]
    UnknownAction(String),
    #[error("{action}: bad or missing argument: {detail}")]
    Argument {
        action: &'static str,
        detail: String,
    },
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("the object is locked")]
    Locked,
    #[error("geometry error: {0}")]
    Geometry(&'static str),
    #[error("io error: {0}")]
    Io(String),
}

/// Everything one editing session owns.
pub struct Context {
    pub board: Board,
    pub journal: UndoJournal,
    pub settings: Settings,
    pub buffers: buffer::BufferSet,
    pub crosshair: Crosshair,
    pub hid: Box<dyn Hid>,
    /// Layer new lines, arcs, texts and polygons land on.
    pub current_layer: usize,
    /// Layer of the previously committed line segment; a layer-group change
    /// between segments plants a via at the joint.
    pub last_layer: usize,
    /// Two-segment line split policy.
    pub clipping: Clipping,
    /// Set by `Quit()`; the embedding loop reads and exits.
    pub quit_requested: bool,
}

impl Context {
    pub fn new(board: Board, settings: Settings, hid: Box<dyn Hid>) -> Self {
        Self {
            board,
            journal: UndoJournal::new(),
            settings,
            buffers: buffer::BufferSet::new(),
            crosshair: Crosshair::default(),
            hid,
            current_layer: 0,
            last_layer: 0,
            clipping: Clipping::OrthogonalFirst,
            quit_requested: false,
        }
    }

    /// A fresh context with a default board and headless surface; the
    /// shape every test starts from.
    pub fn headless() -> Self {
        let settings = Settings::default();
        let board = Board::new(
            settings.copper_layers as usize,
            settings.max_width,
            settings.max_height,
        );
        let mut ctx = Self::new(board, settings, Box::new(core_hid::Headless));
        ctx.clipping = Clipping::from_all_directions(ctx.settings.all_directions);
        ctx
    }

    /// Log an error message and hand back the matching action error.
    pub(crate) fn fail(&mut self, err: ActionError) -> ActionError {
        self.hid.log(core_hid::Severity::Error, &err.to_string());
        err
    }

    pub(crate) fn message(&mut self, text: &str) {
        self.hid.log(core_hid::Severity::Info, text);
    }

    /// Replace the board wholesale (load, revert). Clears the journal and
    /// all interactive state, then reclips.
    pub fn replace_board(&mut self, mut board: Board) {
        board.data.rebuild_trees();
        self.board = board;
        self.journal.clear_list();
        self.crosshair = Crosshair::default();
        self.current_layer = 0;
        self.last_layer = 0;
        core_model::clip::reclip_dirty(&mut self.board);
        self.hid.invalidate_all();
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("board", &self.board.name)
            .field("mode", &self.crosshair.mode)
            .field("serial", &self.journal.serial())
            .finish_non_exhaustive()
    }
}
