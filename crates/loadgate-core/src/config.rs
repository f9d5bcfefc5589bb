//! Configuration loading and typed config structures for the controller.
//!
//! The canonical configuration lives in `loadgate-config.yaml` at the
//! project root. Every field has a default so a partial (or empty) file is
//! valid. The quota table is not part of this file; it is supplied by the
//! integration that owns per-material settings.

use std::path::Path;

use loadgate_types::{DEFAULT_MAX_FILL_PERCENT, MaterialType};
use rust_decimal::Decimal;
use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level controller configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ControllerConfig {
    /// Loading behaviour.
    #[serde(default)]
    pub loading: LoadingConfig,

    /// Unloading behaviour.
    #[serde(default)]
    pub unloading: UnloadingConfig,

    /// Manual override behaviour.
    #[serde(default)]
    pub manual_override: OverrideConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ControllerConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// `LOADGATE_LOG` overrides `logging.level` when set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        // serde_yml rejects an empty document; treat it as all-defaults.
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.logging.apply_env_overrides();
        Ok(config)
    }
}

/// Loading behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoadingConfig {
    /// Whether the agent loads automatically at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Enforce the alternation rule when a depot offers several materials.
    #[serde(default)]
    pub require_alternation: bool,

    /// History length below which a material switch is blocked while
    /// alternation is required.
    #[serde(default = "default_alternation_limit")]
    pub alternation_limit: usize,

    /// How many recent selections are remembered.
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,

    /// Materials treated as fuel: always admissible, outside the quota table.
    #[serde(default = "default_fuel_materials")]
    pub fuel_materials: Vec<MaterialType>,

    /// Ceiling applied to fuel transfers.
    #[serde(default = "default_fuel_max_fill_percent")]
    pub fuel_max_fill_percent: Decimal,
}

impl LoadingConfig {
    /// Whether a material is handled as fuel.
    pub fn is_fuel(&self, material: &MaterialType) -> bool {
        self.fuel_materials.iter().any(|m| m == material)
    }
}

impl Default for LoadingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            require_alternation: false,
            alternation_limit: default_alternation_limit(),
            history_capacity: default_history_capacity(),
            fuel_materials: default_fuel_materials(),
            fuel_max_fill_percent: default_fuel_max_fill_percent(),
        }
    }
}

/// Unloading behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UnloadingConfig {
    /// Whether the agent reacts to discharge notifications.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Fill percentage below which a compartment counts as empty.
    #[serde(default = "default_empty_threshold_percent")]
    pub empty_threshold_percent: Decimal,
}

impl Default for UnloadingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            empty_threshold_percent: default_empty_threshold_percent(),
        }
    }
}

/// Manual override behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OverrideConfig {
    /// How many waypoints before the hold waypoint count as "near" it.
    #[serde(default = "default_hold_waypoint_offset")]
    pub hold_waypoint_offset: usize,
}

impl Default for OverrideConfig {
    fn default() -> Self {
        Self {
            hold_waypoint_offset: default_hold_waypoint_offset(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON log lines instead of the human-readable format.
    #[serde(default)]
    pub json: bool,
}

impl LoggingConfig {
    /// Override the level with `LOADGATE_LOG` when set.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("LOADGATE_LOG") {
            self.level = val;
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

const fn default_true() -> bool {
    true
}

const fn default_alternation_limit() -> usize {
    2
}

const fn default_history_capacity() -> usize {
    8
}

fn default_fuel_materials() -> Vec<MaterialType> {
    vec![MaterialType::from("DIESEL")]
}

const fn default_fuel_max_fill_percent() -> Decimal {
    DEFAULT_MAX_FILL_PERCENT
}

const fn default_empty_threshold_percent() -> Decimal {
    // 0.5 %
    Decimal::from_parts(5, 0, 0, false, 1)
}

const fn default_hold_waypoint_offset() -> usize {
    5
}

fn default_log_level() -> String {
    "info".to_owned()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn defaults() {
        let config = ControllerConfig::default();
        assert!(config.loading.enabled);
        assert!(!config.loading.require_alternation);
        assert_eq!(config.loading.alternation_limit, 2);
        assert_eq!(config.unloading.empty_threshold_percent, dec!(0.5));
        assert_eq!(config.manual_override.hold_waypoint_offset, 5);
        assert!(config.loading.is_fuel(&MaterialType::from("DIESEL")));
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r#"
loading:
  enabled: true
  require_alternation: true
  alternation_limit: 3
  history_capacity: 4
  fuel_materials: ["DIESEL", "DEF"]
  fuel_max_fill_percent: 95

unloading:
  enabled: false
  empty_threshold_percent: 1.5

manual_override:
  hold_waypoint_offset: 7

logging:
  level: "debug"
  json: true
"#;
        let config = ControllerConfig::parse(yaml).unwrap();
        assert!(config.loading.require_alternation);
        assert_eq!(config.loading.alternation_limit, 3);
        assert_eq!(config.loading.history_capacity, 4);
        assert!(config.loading.is_fuel(&MaterialType::from("DEF")));
        assert_eq!(config.loading.fuel_max_fill_percent, dec!(95));
        assert!(!config.unloading.enabled);
        assert_eq!(config.unloading.empty_threshold_percent, dec!(1.5));
        assert_eq!(config.manual_override.hold_waypoint_offset, 7);
        assert!(config.logging.json);
    }

    #[test]
    fn parse_minimal_yaml() {
        let config = ControllerConfig::parse("manual_override:\n  hold_waypoint_offset: 2\n").unwrap();
        assert_eq!(config.manual_override.hold_waypoint_offset, 2);
        // Everything else uses defaults
        assert!(config.loading.enabled);
        assert_eq!(config.loading.history_capacity, 8);
    }

    #[test]
    fn parse_empty_yaml() {
        assert_eq!(ControllerConfig::parse("").unwrap(), ControllerConfig::default());
    }

    #[test]
    fn invalid_yaml_is_an_error() {
        let result = ControllerConfig::parse("loading: [unclosed");
        assert!(matches!(result, Err(ConfigError::Yaml { .. })));
    }

    #[test]
    fn load_project_config_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("loadgate-config.yaml");
        if path.exists() {
            let config = ControllerConfig::from_file(&path);
            assert!(config.is_ok(), "Failed to load project config: {config:?}");
        }
    }
}
