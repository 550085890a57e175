//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/mindboard/mindboard.toml`
//! 3. Explicit config file passed with `--config`
//! 4. Environment variables: `MINDBOARD__<SECTION>__<KEY>`

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::services::DragTuning;
use crate::application::ApplicationError;
use crate::domain::LayoutMetrics;

/// Where boards and images are stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StorageConfig {
    /// Data directory (default: XDG data dir, or ~/.mindboard)
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let data_dir = ProjectDirs::from("", "", "mindboard")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("~/.mindboard"));
        Self { data_dir }
    }
}

/// Unified configuration for mindboard.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Grid and box geometry
    pub layout: LayoutMetrics,
    /// Drag damping and proximity timing
    pub drag: DragTuning,
    pub storage: StorageConfig,
}

/// Get the XDG config directory for mindboard.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "mindboard").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("mindboard.toml"))
}

/// Expand `~`, `$VAR` and `${VAR}`; unresolvable input is returned unchanged.
pub fn expand_env_vars(path: &str) -> String {
    shellexpand::full(path)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| path.to_string())
}

impl Settings {
    /// Directory holding one sub-directory of node records per board.
    pub fn boards_dir(&self) -> PathBuf {
        self.storage.data_dir.join("boards")
    }

    fn expand_paths(&mut self) {
        let expanded = expand_env_vars(self.storage.data_dir.to_string_lossy().as_ref());
        self.storage.data_dir = PathBuf::from(expanded);
    }

    /// Load settings with layered precedence.
    ///
    /// Missing keys fall through to the layer below; an explicit file must exist.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ApplicationError> {
        let mut builder = Config::builder();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                builder = builder.add_source(File::from(global_path).required(false));
            }
        }
        if let Some(path) = explicit {
            builder = builder.add_source(File::from(path).required(true));
        }
        builder = builder.add_source(
            Environment::with_prefix("MINDBOARD")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().map_err(config_err)?;
        let mut settings: Self = config.try_deserialize().map_err(config_err)?;
        settings.expand_paths();
        settings.validate()?;
        Ok(settings)
    }

    /// Parse a single TOML document on top of the defaults.
    pub fn from_toml(content: &str) -> Result<Self, ApplicationError> {
        let mut settings: Self = toml::from_str(content).map_err(|e| ApplicationError::Config {
            message: format!("parse config: {e}"),
        })?;
        settings.expand_paths();
        settings.validate()?;
        Ok(settings)
    }

    /// Reject geometry the layout engine cannot work with.
    pub fn validate(&self) -> Result<(), ApplicationError> {
        let layout = &self.layout;
        let invalid = |message: &str| {
            Err(ApplicationError::Config {
                message: message.to_string(),
            })
        };
        if layout.node_width <= 0.0 || layout.spacing < 0.0 {
            return invalid("layout.node_width must be positive and layout.spacing non-negative");
        }
        if layout.min_node_height <= 0.0 || layout.max_node_height < layout.min_node_height {
            return invalid("layout node heights must satisfy 0 < min_node_height <= max_node_height");
        }
        if layout.chars_per_line == 0 {
            return invalid("layout.chars_per_line must be at least 1");
        }
        if self.drag.settle_release > self.drag.detach_threshold {
            return invalid("drag.settle_release must not exceed drag.detach_threshold");
        }
        Ok(())
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# mindboard configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/mindboard/mindboard.toml
#   File:   mindboard --config <file>
#   Env:    MINDBOARD__<SECTION>__<KEY>, e.g. MINDBOARD__DRAG__DETACH_THRESHOLD=200

[layout]
# Width of a node box; children are offset by width + spacing
# node_width = 150.0
# min_node_height = 30.0
# max_node_height = 180.0
# Gap between stacked boxes
# spacing = 7.5
# Collapsed summary wrapping
# chars_per_line = 20
# line_height = 15.0
# line_spacing = 3.0
# Canvas extent in grid cells
# canvas_columns = 100
# canvas_rows = 400

[drag]
# Damping: sign(dx) * sqrt(k1 * k2 * |dx|)
# damping_k1 = 4.0
# damping_k2 = 8.0
# Sideways pull that detaches a child
# detach_threshold = 135.0
# Pull below which a re-parented node is damped again
# settle_release = 85.0
# Hover time before re-parenting onto a nearby node
# proximity_delay_ms = 2000

[storage]
# data_dir = "~/.local/share/mindboard"
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}
