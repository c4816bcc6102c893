//! Blueprint configuration.
//!
//! `BlueprintConfig` is a resource with sensible defaults that can be
//! overridden from a JSON file. A missing or malformed file never stops the
//! host: it is logged and the defaults are used instead.

use std::path::{Path, PathBuf};

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// File extension used for every new blueprint write.
pub const CANONICAL_EXTENSION: &str = "blueprint";

/// Extension of the space-separated legacy text format.
pub const VBUILD_EXTENSION: &str = "vbuild";

/// Default number of placement effects played per blueprint placement.
pub const DEFAULT_MAX_PLACE_EFFECTS: u32 = 10;

#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlueprintConfig {
    /// Gates the whole client/authority sync protocol.
    pub allow_remote_blueprints: bool,
    /// Directories scanned (recursively) for blueprint files.
    pub search_directories: Vec<PathBuf>,
    /// Directory new blueprint files are written to.
    pub save_directory: PathBuf,
    /// Accepted file extensions, without the dot. The first one is used for
    /// writes.
    pub extensions: Vec<String>,
    /// Horizontal capture radius in world units.
    pub selection_radius: f32,
    pub min_selection_radius: f32,
    /// How far below the capture origin an object may sit and still be
    /// captured. Nothing limits how far above it may sit.
    pub height_tolerance: f32,
    /// Padding added around the captured footprint for terrain shaping.
    pub extent_margin: f32,
    /// Cap on spawn effects per placement (the spawns themselves are uncapped).
    pub max_place_effects: u32,
}

impl Default for BlueprintConfig {
    fn default() -> Self {
        Self {
            allow_remote_blueprints: true,
            search_directories: vec![PathBuf::from("blueprints")],
            save_directory: PathBuf::from("blueprints"),
            extensions: vec![
                CANONICAL_EXTENSION.to_string(),
                VBUILD_EXTENSION.to_string(),
            ],
            selection_radius: 10.0,
            min_selection_radius: 2.0,
            height_tolerance: 1.0,
            extent_margin: 1.0,
            max_place_effects: DEFAULT_MAX_PLACE_EFFECTS,
        }
    }
}

impl BlueprintConfig {
    /// Read the config from a JSON file, falling back to defaults (with a
    /// warning) if the file cannot be read or parsed.
    pub fn load_or_default(path: &Path) -> Self {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                warn!(
                    "Blueprint config {} not readable, using defaults: {}",
                    path.display(),
                    e
                );
                return Self::default();
            }
        };
        match serde_json::from_str(&text) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Blueprint config {} is malformed, using defaults: {}",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Extension used when writing a blueprint file.
    pub fn write_extension(&self) -> &str {
        self.extensions
            .first()
            .map(String::as_str)
            .unwrap_or(CANONICAL_EXTENSION)
    }
}

/// Grow or shrink the selection radius, never going below `min`.
pub fn adjust_selection_radius(current: f32, delta: f32, min: f32) -> f32 {
    (current + delta).max(min)
}
