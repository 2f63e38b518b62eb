//! Resolution pipeline: reads level files, resolves palette names, builds
//! core level data and board settings.
//!
//! Provides format detection (RON/JSON/TOML), file discovery, and
//! deserialization helpers used by [`load_level`] and [`parse_level`].

use crate::schema::{LevelFile, SettingsData};
use colorgate_core::board::{Board, BoardError};
use colorgate_core::config::{BoardConfig, ConfigError};
use colorgate_core::fixed::f64_to_fixed64;
use colorgate_core::geometry::GridPosition;
use colorgate_core::id::Color;
use colorgate_core::level::{LevelData, LevelError, TriggerPlacement};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur during level loading.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    /// A required level file was not found in the given directory.
    #[error("required file '{file}' not found in {dir}")]
    MissingRequired { file: String, dir: PathBuf },

    /// The file has an extension we don't support.
    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// Two files with the same base name but different formats exist.
    #[error("conflicting formats: {a} and {b}")]
    ConflictingFormats { a: PathBuf, b: PathBuf },

    /// A deserialization error occurred.
    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// A name reference could not be resolved.
    #[error("unresolved {expected_kind} reference '{name}' in {file}")]
    UnresolvedRef {
        file: PathBuf,
        name: String,
        expected_kind: &'static str,
    },

    /// A duplicate name was found.
    #[error("duplicate name '{name}' in {file}")]
    DuplicateName { file: PathBuf, name: String },

    /// The palette has more colors than a `Color` can index.
    #[error("palette in {file} has {len} colors")]
    PaletteTooLarge { file: PathBuf, len: usize },

    /// The resolved level is not valid.
    #[error(transparent)]
    Level(#[from] LevelError),

    /// The resolved settings are not valid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Format detection
// ===========================================================================

/// Supported data file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

/// Detect the format of a file based on its extension.
pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

// ===========================================================================
// File discovery
// ===========================================================================

/// Scan a directory for a data file with the given base name (without extension).
///
/// Looks for `{base_name}.ron`, `{base_name}.toml`, and `{base_name}.json`.
/// Returns `Ok(None)` if no file is found, or `Err(ConflictingFormats)` if
/// multiple formats exist for the same base name.
pub fn find_data_file(dir: &Path, base_name: &str) -> Result<Option<PathBuf>, DataLoadError> {
    let extensions = ["ron", "toml", "json"];
    let mut found: Option<PathBuf> = None;

    for ext in &extensions {
        let candidate = dir.join(format!("{base_name}.{ext}"));
        if candidate.exists() {
            if let Some(ref existing) = found {
                return Err(DataLoadError::ConflictingFormats {
                    a: existing.clone(),
                    b: candidate,
                });
            }
            found = Some(candidate);
        }
    }

    Ok(found)
}

/// Like [`find_data_file`], but returns an error if no file is found.
pub fn require_data_file(dir: &Path, base_name: &str) -> Result<PathBuf, DataLoadError> {
    find_data_file(dir, base_name)?.ok_or_else(|| DataLoadError::MissingRequired {
        file: base_name.to_string(),
        dir: dir.to_path_buf(),
    })
}

// ===========================================================================
// Deserialization
// ===========================================================================

/// Deserialize `content` in the given format. `origin` names the source in
/// error messages.
pub fn deserialize_str<T: DeserializeOwned>(
    content: &str,
    format: Format,
    origin: &Path,
) -> Result<T, DataLoadError> {
    let parse_err = |detail: String| DataLoadError::Parse {
        file: origin.to_path_buf(),
        detail,
    };
    match format {
        Format::Ron => ron::from_str(content).map_err(|e| parse_err(e.to_string())),
        Format::Json => serde_json::from_str(content).map_err(|e| parse_err(e.to_string())),
        Format::Toml => toml::from_str(content).map_err(|e| parse_err(e.to_string())),
    }
}

/// Read a file and deserialize it according to its format (detected from extension).
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;
    deserialize_str(&content, format, path)
}

// ===========================================================================
// Name resolution helpers
// ===========================================================================

/// Look up a name in a map, returning an `UnresolvedRef` error if not found.
pub fn resolve_name<'a, V>(
    map: &'a HashMap<String, V>,
    name: &str,
    file: &Path,
    expected_kind: &'static str,
) -> Result<&'a V, DataLoadError> {
    map.get(name).ok_or_else(|| DataLoadError::UnresolvedRef {
        file: file.to_path_buf(),
        name: name.to_string(),
        expected_kind,
    })
}

/// Check whether a name already exists in a map, returning a `DuplicateName`
/// error if so.
pub fn check_duplicate<V>(
    map: &HashMap<String, V>,
    name: &str,
    file: &Path,
) -> Result<(), DataLoadError> {
    if map.contains_key(name) {
        Err(DataLoadError::DuplicateName {
            file: file.to_path_buf(),
            name: name.to_string(),
        })
    } else {
        Ok(())
    }
}

// ===========================================================================
// Resolution
// ===========================================================================

/// A level file resolved into core types.
#[derive(Debug, Clone)]
pub struct LoadedLevel {
    pub level: LevelData,
    pub config: BoardConfig,
    /// Color names, indexed by `Color`.
    pub palette: Vec<String>,
}

impl LoadedLevel {
    /// The palette name of `color`.
    pub fn color_name(&self, color: Color) -> Option<&str> {
        self.palette.get(color.0 as usize).map(String::as_str)
    }

    /// The color with palette name `name`.
    pub fn color(&self, name: &str) -> Option<Color> {
        self.palette
            .iter()
            .position(|n| n == name)
            .and_then(|i| u16::try_from(i).ok())
            .map(Color)
    }

    /// Build a board from the resolved level and settings.
    pub fn board(&self) -> Result<Board, BoardError> {
        Board::load(&self.level, self.config)
    }
}

/// Apply optional settings overrides on top of the board defaults.
pub fn resolve_settings(settings: Option<&SettingsData>) -> Result<BoardConfig, ConfigError> {
    let mut config = BoardConfig::default();
    if let Some(s) = settings {
        let lengths = [
            (s.spacing, &mut config.spacing),
            (s.item_height, &mut config.item_height),
            (s.move_speed, &mut config.move_speed),
            (s.axis_epsilon, &mut config.axis_epsilon),
            (s.probe_length, &mut config.probe_length),
            (s.probe_offset, &mut config.probe_offset),
            (s.part_half_extent, &mut config.part_half_extent),
        ];
        for (value, field) in lengths {
            if let Some(v) = value {
                *field = f64_to_fixed64(v);
            }
        }
        if let Some(push_back) = s.push_back {
            config.push_back = push_back;
        }
        if let Some(capacity) = s.event_capacity {
            config.event_capacity = capacity;
        }
    }
    config.validate()?;
    Ok(config)
}

/// Resolve a deserialized level file. `origin` names the source in error
/// messages.
pub fn resolve_level(file: LevelFile, origin: &Path) -> Result<LoadedLevel, DataLoadError> {
    if file.palette.len() > usize::from(u16::MAX) + 1 {
        return Err(DataLoadError::PaletteTooLarge {
            file: origin.to_path_buf(),
            len: file.palette.len(),
        });
    }

    let mut colors: HashMap<String, Color> = HashMap::new();
    for (i, name) in file.palette.iter().enumerate() {
        check_duplicate(&colors, name, origin)?;
        colors.insert(name.clone(), Color(i as u16));
    }

    let mut level = LevelData::new(file.width, file.height)?;

    for trigger in &file.triggers {
        let color = *resolve_name(&colors, &trigger.color, origin, "color")?;
        let mut placement =
            TriggerPlacement::new(GridPosition::new(trigger.x, trigger.y), trigger.kind, color);
        if let Some(size) = trigger.max_size {
            placement = placement.with_max_size(size);
        }
        if let Some(exit) = trigger.exit {
            placement = placement.with_exit(exit);
        }
        level.place_trigger(placement)?;
    }

    for item in &file.items {
        let color = *resolve_name(&colors, &item.color, origin, "color")?;
        level.paint_item(GridPosition::new(item.x, item.y), item.size, color)?;
    }
    level.validate()?;

    let config = resolve_settings(file.settings.as_ref())?;
    debug!(
        file = %origin.display(),
        colors = file.palette.len(),
        "level file resolved"
    );

    Ok(LoadedLevel {
        level,
        config,
        palette: file.palette,
    })
}

// ===========================================================================
// Entry points
// ===========================================================================

/// Load and resolve a level file. The format is detected from the extension.
pub fn load_level(path: &Path) -> Result<LoadedLevel, DataLoadError> {
    let file: LevelFile = deserialize_file(path)?;
    let loaded = resolve_level(file, path)?;
    info!(
        file = %path.display(),
        width = loaded.level.width,
        height = loaded.level.height,
        triggers = loaded.level.triggers.len(),
        "level file loaded"
    );
    Ok(loaded)
}

/// Parse and resolve level `content` in the given format.
pub fn parse_level(content: &str, format: Format) -> Result<LoadedLevel, DataLoadError> {
    let origin = Path::new("<inline>");
    let file: LevelFile = deserialize_str(content, format, origin)?;
    resolve_level(file, origin)
}

/// Load the level named `base_name` from `dir`, in whichever single format
/// is present.
pub fn find_level(dir: &Path, base_name: &str) -> Result<LoadedLevel, DataLoadError> {
    let path = require_data_file(dir, base_name)?;
    load_level(&path)
}

// ===========================================================================
// Tests
// ===========================================================================
