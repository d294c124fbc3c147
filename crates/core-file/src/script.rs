//! Action script files: `#` comments, blank lines skipped, one action line
//! per line. Used by `ExecuteFile` and by import commands whose output is
//! replayed through the dispatcher.

use std::path::Path;

/// Read a script, returning the action lines in order.
pub fn read_action_script(path: &Path) -> anyhow::Result<Vec<String>> {
    let text = std::fs::read_to_string(path)?;
    Ok(script_lines(&text))
}

pub fn script_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim_start)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(|l| l.trim_end().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_comments_and_blank_lines() {
        let lines = script_lines("# setup\n\n  Mode(Via)\nNotify(100, 100)   \n#done\n");
        assert_eq!(lines, vec!["Mode(Via)", "Notify(100, 100)"]);
    }

    #[test]
    fn reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("script.act");
        std::fs::write(&path, "Mode(Line)\n# comment\nUndo()\n").unwrap();
        let lines = read_action_script(&path).unwrap();
        assert_eq!(lines, vec!["Mode(Line)", "Undo()"]);
        assert!(read_action_script(&dir.path().join("missing")).is_err());
    }
}
