//! Engine configuration.
//!
//! A single JSON file declares the farm worlds and the runtime knobs. A
//! missing file is written back with usable defaults so a fresh install has
//! something to edit.

use std::path::Path;

use serde::{Deserialize, Serialize};

use farmwrld_domain::{Border, FarmWorldDefinition};

use crate::use_cases::countdown::CountdownSettings;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read or write the configuration file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Configuration is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Configuration rejected: {0}")]
    Invalid(#[from] farmwrld_domain::DomainError),
}

/// Pre-teleport countdown knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountdownConfig {
    #[serde(default = "default_countdown_time")]
    pub time: u32,
    #[serde(default = "default_permitted_distance")]
    pub permitted_distance: f64,
    #[serde(default)]
    pub movement_allowed: bool,
}

impl Default for CountdownConfig {
    fn default() -> Self {
        Self {
            time: default_countdown_time(),
            permitted_distance: default_permitted_distance(),
            movement_allowed: false,
        }
    }
}

impl CountdownConfig {
    pub fn settings(&self) -> CountdownSettings {
        CountdownSettings {
            seconds: self.time,
            permitted_distance: self.permitted_distance,
            movement_allowed: self.movement_allowed,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    /// SQLite database path; None keeps everything in memory.
    #[serde(default = "default_store_path")]
    pub store_path: Option<String>,
    /// Target size of each per-world location pool.
    #[serde(default = "default_watermark")]
    pub pool_watermark: usize,
    /// Seconds between coarse scheduler sweeps.
    #[serde(default = "default_sweep_every_secs")]
    pub sweep_every_secs: u64,
    #[serde(default)]
    pub countdown: CountdownConfig,
    #[serde(default)]
    pub farm_worlds: Vec<FarmWorldDefinition>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
            pool_watermark: default_watermark(),
            sweep_every_secs: default_sweep_every_secs(),
            countdown: CountdownConfig::default(),
            farm_worlds: vec![sample_farm_world()],
        }
    }
}

impl EngineConfig {
    /// Read the configuration, writing defaults first when the file does not
    /// exist yet. Definitions that fail validation reject the whole file.
    pub fn load_or_init(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let raw = std::fs::read_to_string(path)?;
            let config: Self = serde_json::from_str(&raw)?;
            config.validate()?;
            return Ok(config);
        }

        let config = Self::default();
        std::fs::write(path, serde_json::to_string_pretty(&config)?)?;
        tracing::info!(path = %path.display(), "Wrote default configuration");
        Ok(config)
    }

    fn validate(&self) -> Result<(), farmwrld_domain::DomainError> {
        let mut seen = std::collections::HashSet::new();
        for definition in &self.farm_worlds {
            definition.validate()?;
            if !seen.insert(definition.name.to_ascii_lowercase()) {
                return Err(farmwrld_domain::DomainError::validation(format!(
                    "duplicate farm world name: {}",
                    definition.name
                )));
            }
        }
        Ok(())
    }
}

fn default_store_path() -> Option<String> {
    Some("farmwrld.db".to_string())
}

fn default_watermark() -> usize {
    5
}

fn default_sweep_every_secs() -> u64 {
    60
}

fn default_countdown_time() -> u32 {
    5
}

fn default_permitted_distance() -> f64 {
    0.7
}

fn sample_farm_world() -> FarmWorldDefinition {
    FarmWorldDefinition::new("farm", 60)
        .with_aliases(vec!["farmworld".to_string()])
        .with_cooldown(300)
        .with_border(Border::new(1000.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_round_trip_through_json() {
        let config = EngineConfig::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let parsed: EngineConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.pool_watermark, 5);
        assert_eq!(parsed.sweep_every_secs, 60);
        assert_eq!(parsed.countdown.time, 5);
        assert_eq!(parsed.farm_worlds.len(), 1);
        assert_eq!(parsed.farm_worlds[0].name, "farm");
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let parsed: EngineConfig = serde_json::from_str(
            r#"{"farmWorlds": [{"name": "wheat", "timer": 30}]}"#,
        )
        .unwrap();

        assert_eq!(parsed.store_path.as_deref(), Some("farmwrld.db"));
        assert_eq!(parsed.pool_watermark, 5);
        assert!(!parsed.countdown.movement_allowed);
        assert!((parsed.countdown.permitted_distance - 0.7).abs() < f64::EPSILON);
        assert_eq!(parsed.farm_worlds[0].name, "wheat");
        assert_eq!(parsed.farm_worlds[0].timer, 30);
        assert_eq!(parsed.farm_worlds[0].cooldown, 0);
    }

    #[test]
    fn load_or_init_writes_then_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("farmwrld.json");

        let written = EngineConfig::load_or_init(&path).unwrap();
        assert!(path.exists());
        assert_eq!(written.farm_worlds.len(), 1);

        let reread = EngineConfig::load_or_init(&path).unwrap();
        assert_eq!(reread.farm_worlds[0].name, written.farm_worlds[0].name);
    }

    #[test]
    fn invalid_definitions_reject_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("farmwrld.json");
        std::fs::write(&path, r#"{"farmWorlds": [{"name": "wheat", "timer": 0}]}"#).unwrap();

        let err = EngineConfig::load_or_init(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn duplicate_names_reject_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("farmwrld.json");
        std::fs::write(
            &path,
            r#"{"farmWorlds": [{"name": "wheat", "timer": 30}, {"name": "Wheat", "timer": 10}]}"#,
        )
        .unwrap();

        let err = EngineConfig::load_or_init(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn countdown_settings_mirror_the_config() {
        let config = CountdownConfig {
            time: 3,
            permitted_distance: 1.5,
            movement_allowed: true,
        };
        let settings = config.settings();
        assert_eq!(settings.seconds, 3);
        assert!((settings.permitted_distance - 1.5).abs() < f64::EPSILON);
        assert!(settings.movement_allowed);
    }
}
