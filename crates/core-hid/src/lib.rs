//! User-surface channels the editing core talks through.
//!
//! The core never draws and never blocks on a dialog itself; it reports
//! through these traits and the embedding front end decides how to surface
//! them. Three channels exist: a log line, a modal confirmation, and a file
//! chooser, plus a redraw sink fed with invalidated regions.
//!
//! Implementations must not call back into the core; they observe. The
//! [`Headless`] implementation is what scripted and export runs use: it
//! answers yes to everything, routes log lines to tracing, and drops
//! invalidations.

use core_geom::BoxType;

/// Severity of a log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// Answers a confirmation dialog can produce. `SequenceYes` means "yes to
/// this and every following question of this run" (file overwrite sweeps).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirm {
    Yes,
    No,
    SequenceYes,
}

/// The front-end surface. One instance lives in the core context.
pub trait Hid {
    /// Append a formatted message to the user-visible log.
    fn log(&mut self, severity: Severity, message: &str);

    /// Ask a yes/no question. Non-interactive implementations answer yes.
    fn confirm(&mut self, prompt: &str) -> Confirm;

    /// Ask for a file path; `None` is cancel.
    fn file_select(&mut self, prompt: &str, default: Option<&str>) -> Option<String>;

    /// Prompt for a free-form string (text tool). `None` is cancel.
    fn prompt_for(&mut self, prompt: &str, default: &str) -> Option<String>;

    /// A board region whose rendering is stale.
    fn invalidate(&mut self, region: BoxType);

    /// Everything is stale (mode change, load, undo sweeps).
    fn invalidate_all(&mut self);
}

/// Non-interactive surface: logs through tracing, confirms everything,
/// selects nothing, discards invalidations.
#[derive(Debug, Default)]
pub struct Headless;

impl Hid for Headless {
    fn log(&mut self, severity: Severity, message: &str) {
        match severity {
            Severity::Info => tracing::info!(target: "hid", "{message}"),
            Severity::Warning => tracing::warn!(target: "hid", "{message}"),
            Severity::Error => tracing::error!(target: "hid", "{message}"),
        }
    }

    fn confirm(&mut self, _prompt: &str) -> Confirm {
        Confirm::Yes
    }

    fn file_select(&mut self, _prompt: &str, _default: Option<&str>) -> Option<String> {
        None
    }

    fn prompt_for(&mut self, _prompt: &str, default: &str) -> Option<String> {
        Some(default.to_string())
    }

    fn invalidate(&mut self, _region: BoxType) {}

    fn invalidate_all(&mut self) {}
}

/// Test surface capturing everything it is told.
#[derive(Debug, Default)]
pub struct Recording {
    pub messages: Vec<(Severity, String)>,
    pub invalidated: Vec<BoxType>,
    pub full_invalidations: usize,
    /// Scripted confirm answers, consumed front to back; `Yes` when empty.
    pub confirm_script: Vec<Confirm>,
    /// Scripted prompt answers.
    pub prompt_script: Vec<String>,
}

impl Hid for Recording {
    fn log(&mut self, severity: Severity, message: &str) {
        self.messages.push((severity, message.to_string()));
    }

    fn confirm(&mut self, _prompt: &str) -> Confirm {
        if self.confirm_script.is_empty() {
            Confirm::Yes
        } else {
            self.confirm_script.remove(0)
        }
    }

    fn file_select(&mut self, _prompt: &str, default: Option<&str>) -> Option<String> {
        default.map(str::to_string)
    }

    fn prompt_for(&mut self, _prompt: &str, default: &str) -> Option<String> {
        if self.prompt_script.is_empty() {
            Some(default.to_string())
        } else {
            Some(self.prompt_script.remove(0))
        }
    }

    fn invalidate(&mut self, region: BoxType) {
        self.invalidated.push(region);
    }

    fn invalidate_all(&mut self) {
        self.full_invalidations += 1;
    }
}

impl Recording {
    pub fn errors(&self) -> impl Iterator<Item = &str> {
        self.messages
            .iter()
            .filter(|(s, _)| *s == Severity::Error)
            .map(|(_, m)| m.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headless_confirms_everything() {
        let mut h = Headless;
        assert_eq!(h.confirm("overwrite?"), Confirm::Yes);
        assert_eq!(h.file_select("save as", None), None);
        assert_eq!(h.prompt_for("text", "dflt").as_deref(), Some("dflt"));
    }

    #[test]
    fn recording_captures_and_scripts() {
        let mut r = Recording {
            confirm_script: vec![Confirm::No, Confirm::SequenceYes],
            prompt_script: vec!["NET1".into()],
            ..Default::default()
        };
        r.log(Severity::Error, "bad");
        assert_eq!(r.errors().collect::<Vec<_>>(), vec!["bad"]);
        assert_eq!(r.confirm("a"), Confirm::No);
        assert_eq!(r.confirm("b"), Confirm::SequenceYes);
        assert_eq!(r.confirm("c"), Confirm::Yes);
        assert_eq!(r.prompt_for("t", "x").as_deref(), Some("NET1"));
        r.invalidate(BoxType::new(0, 0, 10, 10));
        r.invalidate_all();
        assert_eq!(r.invalidated.len(), 1);
        assert_eq!(r.full_invalidations, 1);
    }
}
