//! Board editing state: the undo journal and its entry/application types.
//!
//! The journal is the single write path for reversible history: the
//! dispatcher records one [`UndoKind`] per model mutation, groups entries by
//! serial number, and the [`UndoJournal`] replays them in either direction.
//! Detached entities removed from the board live inside their journal
//! entries until the list is cleared, which is what makes undo of a removal
//! restore the exact object identity.

pub mod apply;
pub mod entry;
pub mod undo;

pub use apply::ApplyError;
pub use entry::{Detached, Entry, ObjRef, PointRef, UndoKind};
pub use undo::{UndoError, UndoJournal};
