//! Preferences loading and parsing.
//!
//! The preferences file is a block-structured file of five sections,
//! `[values]`, `[reals]`, `[strings]`, `[colors]`, `[lists]`, each holding
//! one `name = value` per line. Integers in `[values]` are coordinate
//! units; `[lists]` values are colon separated. Unknown names are ignored
//! so newer files still load. Parse failures fall back to defaults rather
//! than refusing to start.
//!
//! Named color schemes live as single-section files under `colors/` next to
//! the preferences file.

use anyhow::{Context, Result};
use core_geom::{Coord, MIL};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Editor settings threaded through the core context. Field names match
/// the keys written to the preferences file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    // [values]
    pub via_thickness: Coord,
    pub via_drilling_hole: Coord,
    pub line_thickness: Coord,
    pub keepaway: Coord,
    pub text_scale: u16,
    pub grid: Coord,
    pub max_width: Coord,
    pub max_height: Coord,
    pub copper_layers: u16,
    pub backup_interval: u32,
    /// Stored for the command-history surface of the front end; the core
    /// only carries it through.
    pub history_size: u32,
    // [reals]
    pub thermal_scale: f64,
    pub isle_area_mil2: f64,
    // [strings]
    pub font_file: String,
    pub default_layer_name: String,
    // flags
    pub save_metric_only: bool,
    pub all_directions: bool,
    pub rubber_band_mode: bool,
    pub swap_start_direction: bool,
    pub unique_names: bool,
    pub snap_pin: bool,
    // [colors]
    pub colors: BTreeMap<String, String>,
    // [lists]
    pub library_search_paths: Vec<String>,
    pub element_paths: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            via_thickness: 60 * MIL,
            via_drilling_hole: 28 * MIL,
            line_thickness: 10 * MIL,
            keepaway: 10 * MIL,
            text_scale: 100,
            grid: 10 * MIL,
            max_width: 6000 * MIL,
            max_height: 5000 * MIL,
            copper_layers: 2,
            backup_interval: 60,
            history_size: 30,
            thermal_scale: 0.5,
            isle_area_mil2: 200.0 * 200.0,
            font_file: "default_font".into(),
            default_layer_name: "copper".into(),
            save_metric_only: false,
            all_directions: false,
            rubber_band_mode: false,
            swap_start_direction: false,
            unique_names: true,
            snap_pin: true,
            colors: BTreeMap::new(),
            library_search_paths: Vec::new(),
            element_paths: Vec::new(),
        }
    }
}

/// Preferences directory (`~/.pcb`), or a local fallback when no home
/// directory is discoverable.
pub fn config_dir() -> PathBuf {
    match dirs::home_dir() {
        Some(home) => home.join(".pcb"),
        None => PathBuf::from(".pcb"),
    }
}

pub fn preferences_path() -> PathBuf {
    config_dir().join("preferences")
}

/// Load settings, falling back to defaults when the file is missing or
/// unreadable. A malformed line is skipped with a warning, not fatal.
pub fn load_from(path: Option<PathBuf>) -> Result<Settings> {
    let path = path.unwrap_or_else(preferences_path);
    let Ok(content) = fs::read_to_string(&path) else {
        debug!(target: "config", path = %path.display(), "preferences_missing_using_defaults");
        return Ok(Settings::default());
    };
    let settings = parse(&content);
    info!(target: "config", path = %path.display(), "preferences_loaded");
    Ok(settings)
}

/// Persist settings, creating the directory as needed.
pub fn save_to(settings: &Settings, path: Option<PathBuf>) -> Result<()> {
    let path = path.unwrap_or_else(preferences_path);
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    fs::write(&path, render(settings)).with_context(|| format!("writing {}", path.display()))?;
    info!(target: "config", path = %path.display(), "preferences_saved");
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    Values,
    Reals,
    Strings,
    Colors,
    Lists,
}

fn parse(content: &str) -> Settings {
    let mut s = Settings::default();
    let mut section = Section::None;
    for (lineno, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match line {
            "[values]" => {
                section = Section::Values;
                continue;
            }
            "[reals]" => {
                section = Section::Reals;
                continue;
            }
            "[strings]" => {
                section = Section::Strings;
                continue;
            }
            "[colors]" => {
                section = Section::Colors;
                continue;
            }
            "[lists]" => {
                section = Section::Lists;
                continue;
            }
            _ => {}
        }
        let Some((name, value)) = line.split_once('=') else {
            warn!(target: "config", line = lineno + 1, "preferences_line_skipped");
            continue;
        };
        let name = name.trim();
        let value = value.trim();
        match section {
            Section::Values => apply_value(&mut s, name, value),
            Section::Reals => apply_real(&mut s, name, value),
            Section::Strings => apply_string(&mut s, name, value),
            Section::Colors => {
                s.colors.insert(name.to_string(), value.to_string());
            }
            Section::Lists => apply_list(&mut s, name, value),
            Section::None => {
                warn!(target: "config", line = lineno + 1, "preferences_entry_outside_section");
            }
        }
    }
    s
}

fn apply_value(s: &mut Settings, name: &str, value: &str) {
    let Ok(v) = value.parse::<i64>() else {
        warn!(target: "config", name, value, "preferences_bad_integer");
        return;
    };
    match name {
        "via-thickness" => s.via_thickness = v as Coord,
        "via-drilling-hole" => s.via_drilling_hole = v as Coord,
        "line-thickness" => s.line_thickness = v as Coord,
        "keepaway" => s.keepaway = v as Coord,
        "text-scale" => s.text_scale = v.clamp(1, u16::MAX as i64) as u16,
        "grid" => s.grid = v as Coord,
        "max-width" => s.max_width = v as Coord,
        "max-height" => s.max_height = v as Coord,
        "copper-layers" => s.copper_layers = v.clamp(1, 16) as u16,
        "backup-interval" => s.backup_interval = v.max(0) as u32,
        "history-size" => s.history_size = v.max(0) as u32,
        "save-metric-only" => s.save_metric_only = v != 0,
        "all-directions" => s.all_directions = v != 0,
        "rubber-band-mode" => s.rubber_band_mode = v != 0,
        "swap-start-direction" => s.swap_start_direction = v != 0,
        "unique-names" => s.unique_names = v != 0,
        "snap-pin" => s.snap_pin = v != 0,
        _ => {}
    }
}

fn apply_real(s: &mut Settings, name: &str, value: &str) {
    let Ok(v) = value.parse::<f64>() else {
        warn!(target: "config", name, value, "preferences_bad_real");
        return;
    };
    match name {
        "thermal-scale" => s.thermal_scale = v,
        "isle-area" => s.isle_area_mil2 = v,
        _ => {}
    }
}

fn apply_string(s: &mut Settings, name: &str, value: &str) {
    match name {
        "font-file" => s.font_file = value.to_string(),
        "default-layer-name" => s.default_layer_name = value.to_string(),
        _ => {}
    }
}

fn apply_list(s: &mut Settings, name: &str, value: &str) {
    let items: Vec<String> = value
        .split(':')
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect();
    match name {
        "library-search-paths" => s.library_search_paths = items,
        "element-paths" => s.element_paths = items,
        _ => {}
    }
}

fn render(s: &Settings) -> String {
    use std::fmt::Write;
    let mut out = String::new();
    let _ = writeln!(out, "[values]");
    let _ = writeln!(out, "via-thickness = {}", s.via_thickness);
    let _ = writeln!(out, "via-drilling-hole = {}", s.via_drilling_hole);
    let _ = writeln!(out, "line-thickness = {}", s.line_thickness);
    let _ = writeln!(out, "keepaway = {}", s.keepaway);
    let _ = writeln!(out, "text-scale = {}", s.text_scale);
    let _ = writeln!(out, "grid = {}", s.grid);
    let _ = writeln!(out, "max-width = {}", s.max_width);
    let _ = writeln!(out, "max-height = {}", s.max_height);
    let _ = writeln!(out, "copper-layers = {}", s.copper_layers);
    let _ = writeln!(out, "backup-interval = {}", s.backup_interval);
    let _ = writeln!(out, "history-size = {}", s.history_size);
    let _ = writeln!(out, "save-metric-only = {}", s.save_metric_only as i32);
    let _ = writeln!(out, "all-directions = {}", s.all_directions as i32);
    let _ = writeln!(out, "rubber-band-mode = {}", s.rubber_band_mode as i32);
    let _ = writeln!(
        out,
        "swap-start-direction = {}",
        s.swap_start_direction as i32
    );
    let _ = writeln!(out, "unique-names = {}", s.unique_names as i32);
    let _ = writeln!(out, "snap-pin = {}", s.snap_pin as i32);
    let _ = writeln!(out, "\n[reals]");
    let _ = writeln!(out, "thermal-scale = {}", s.thermal_scale);
    let _ = writeln!(out, "isle-area = {}", s.isle_area_mil2);
    let _ = writeln!(out, "\n[strings]");
    let _ = writeln!(out, "font-file = {}", s.font_file);
    let _ = writeln!(out, "default-layer-name = {}", s.default_layer_name);
    let _ = writeln!(out, "\n[colors]");
    for (k, v) in &s.colors {
        let _ = writeln!(out, "{k} = {v}");
    }
    let _ = writeln!(out, "\n[lists]");
    let _ = writeln!(
        out,
        "library-search-paths = {}",
        s.library_search_paths.join(":")
    );
    let _ = writeln!(out, "element-paths = {}", s.element_paths.join(":"));
    out
}

/// Load a named color scheme from `colors/NAME` under the preferences
/// directory: plain `name = value` lines, no sections.
pub fn load_color_file(dir: &Path, name: &str) -> Result<BTreeMap<String, String>> {
    let path = dir.join("colors").join(name);
    let content =
        fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
    let mut map = BTreeMap::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((k, v)) = line.split_once('=') {
            map.insert(k.trim().to_string(), v.trim().to_string());
        }
    }
    Ok(map)
}
