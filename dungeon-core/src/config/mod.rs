//! Dungeon configuration loaded from `config/dungeon.json`.
//!
//! Every field has a default, so a partial file (or none at all) is valid.

use std::path::{Path, PathBuf};

use bevy::prelude::Resource;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::collision::CollisionConfig;
use crate::generation::layout::LayoutConfig;
use crate::logging::TracingConfig;

pub const DEFAULT_CONFIG_PATH: &str = "config/dungeon.json";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DungeonConfig {
    pub layout: LayoutConfig,
    pub collision: CollisionConfig,
    pub logging: TracingConfig,
    /// Base seed for fallback floors, mixed with each floor's id
    pub fallback_seed: u64,
    /// Build perimeter walls from the floor outline instead of waiting for
    /// renderer geometry
    pub derive_perimeter_walls: bool,
}

impl Default for DungeonConfig {
    fn default() -> Self {
        Self {
            layout: LayoutConfig::default(),
            collision: CollisionConfig::default(),
            logging: TracingConfig::default(),
            fallback_seed: 42,
            derive_perimeter_walls: true,
        }
    }
}

impl DungeonConfig {
    pub fn default_path() -> PathBuf {
        PathBuf::from(DEFAULT_CONFIG_PATH)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_json(&text)?;
        info!(path = %path.display(), "dungeon config loaded");
        Ok(config)
    }

    /// Load `path` if it exists, defaults otherwise
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let c = &self.collision;
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if !(c.cell_size.is_finite() && c.cell_size > 0.0) {
            return invalid(format!("cell_size must be positive, got {}", c.cell_size));
        }
        if !(c.agent_width_fraction > 0.0 && c.agent_width_fraction <= 1.0) {
            return invalid(format!(
                "agent_width_fraction must be in (0, 1], got {}",
                c.agent_width_fraction
            ));
        }
        if !(c.agent_height.is_finite() && c.agent_height > 0.0) {
            return invalid(format!("agent_height must be positive, got {}", c.agent_height));
        }
        for (name, value) in [
            ("contact_epsilon", c.contact_epsilon),
            ("push_buffer", c.push_buffer),
            ("ground_epsilon", c.ground_epsilon),
            ("ceiling_thickness", c.ceiling_thickness),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return invalid(format!("{name} must be non-negative, got {value}"));
            }
        }
        if c.max_sweep_samples == 0 {
            return invalid("max_sweep_samples must be at least 1".to_string());
        }
        Ok(())
    }
}
