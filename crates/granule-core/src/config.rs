//! Simulation configuration with TOML persistence
//!
//! The default location is `~/.config/granule/sim.toml`. Every field has a
//! default, so a config file only needs the values it overrides.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Errors that can occur while loading or saving a configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to access config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("could not determine config directory")]
    NoConfigDir,

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// All simulation settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub world: WorldConfig,
    pub population: PopulationConfig,
    /// Seed for movement tie-breaking and population; `None` draws from entropy
    pub seed: Option<u64>,
}

/// Grid and spatial index dimensions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Grid width in cells
    pub width: u32,
    /// Grid height in cells
    pub height: u32,
    /// Edge length of one spatial-hash bucket
    pub hash_cell_size: f32,
    /// Half-width of a spatial-hash query when the caller gives none
    pub query_range: f32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            hash_cell_size: 4.0,
            query_range: 3.0,
        }
    }
}

/// How the headless driver seeds the world
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulationConfig {
    /// Number of particles to spawn
    pub entity_count: usize,
    /// Fraction of particles that are sand (the rest are water)
    pub sand_ratio: f32,
    /// Left edge of the spawn column
    pub column_x: f32,
    /// Width of the spawn column
    pub column_width: f32,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            entity_count: 5000,
            sand_ratio: 0.0,
            column_x: 200.0,
            column_width: 50.0,
        }
    }
}

impl SimConfig {
    /// Get the config directory path
    fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("granule"))
    }

    /// Get the default config file path
    pub fn default_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("sim.toml"))
    }

    /// Parse a config from TOML text and validate it
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: SimConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate the config at `path`
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config = Self::from_toml(&content)?;
        info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Load the config from the default location, or return defaults
    pub fn load_or_default() -> Self {
        let Some(path) = Self::default_path() else {
            warn!("Could not determine config directory");
            return Self::default();
        };

        if !path.exists() {
            info!("No config file found, using defaults");
            return Self::default();
        }

        match Self::load(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!("Failed to load config: {}, using defaults", e);
                Self::default()
            }
        }
    }

    /// Save the config to the default location
    pub fn save(&self) -> Result<PathBuf, ConfigError> {
        let dir = Self::config_dir().ok_or(ConfigError::NoConfigDir)?;
        if !dir.exists() {
            fs::create_dir_all(&dir)?;
        }

        let path = dir.join("sim.toml");
        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)?;
        info!("Saved config to {:?}", path);
        Ok(path)
    }

    /// Reject values the grid and spatial hash cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let world = &self.world;
        if world.width == 0 || world.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "world must be at least 1x1, got {}x{}",
                world.width, world.height
            )));
        }
        if world.width > i32::MAX as u32 || world.height > i32::MAX as u32 {
            return Err(ConfigError::Invalid("world dimensions exceed i32 range".into()));
        }
        if !(world.hash_cell_size > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "hash_cell_size must be positive, got {}",
                world.hash_cell_size
            )));
        }
        if !(world.query_range >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "query_range must not be negative, got {}",
                world.query_range
            )));
        }
        if !(0.0..=1.0).contains(&self.population.sand_ratio) {
            return Err(ConfigError::Invalid(format!(
                "sand_ratio must be within 0..=1, got {}",
                self.population.sand_ratio
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_world() {
        let config = SimConfig::default();
        assert_eq!(config.world.width, 800);
        assert_eq!(config.world.height, 600);
        assert_eq!(config.world.hash_cell_size, 4.0);
        assert_eq!(config.population.entity_count, 5000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = SimConfig::from_toml("seed = 7\n[world]\nwidth = 64\n").unwrap();
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.world.width, 64);
        assert_eq!(config.world.height, 600);
        assert_eq!(config.population, PopulationConfig::default());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = SimConfig::from_toml("[world]\nwidth = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = SimConfig::from_toml("[world]\nhash_cell_size = 0.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        let err = SimConfig::from_toml("[world\nwidth = 3").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
