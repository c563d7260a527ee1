use std::path::Path;

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::config::Config;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid max_rounds: {0}. Must be at least 1")]
    InvalidMaxRounds(u32),

    #[error("Invalid acceptable_conflict_ceiling: {0}. Must be at least 1")]
    InvalidConflictCeiling(usize),

    #[error("Invalid producer_timeout_secs: {0}. Must be positive when set")]
    InvalidProducerTimeout(u64),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Environment variable prefix; `__` separates nested keys.
const ENV_PREFIX: &str = "SPECWEAVE_";

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .specweave/config.yaml (project config)
    /// 3. .specweave/local.yaml (project local overrides, optional)
    /// 4. Environment variables (SPECWEAVE_* prefix, highest priority)
    pub fn load() -> Result<Config> {
        Self::load_from(Path::new("."))
    }

    /// Same as [`load`](Self::load) with the project root at `root`.
    pub fn load_from(root: &Path) -> Result<Config> {
        let dir = root.join(".specweave");
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(dir.join("config.yaml")))
            .merge(Yaml::file(dir.join("local.yaml")))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file. Environment variables still
    /// override the file.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        if !path.exists() {
            anyhow::bail!("Config file not found: {}", path.display());
        }
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        let convergence = &config.convergence;
        if convergence.max_rounds == 0 {
            return Err(ConfigError::InvalidMaxRounds(convergence.max_rounds));
        }
        if convergence.acceptable_conflict_ceiling == 0 {
            return Err(ConfigError::InvalidConflictCeiling(
                convergence.acceptable_conflict_ceiling,
            ));
        }
        if convergence.producer_timeout_secs == Some(0) {
            return Err(ConfigError::InvalidProducerTimeout(0));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        if config
            .analysis
            .accessor_receivers
            .iter()
            .any(|r| r.trim().is_empty())
        {
            return Err(ConfigError::ValidationFailed(
                "analysis.accessor_receivers cannot contain empty names".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn project(config: Option<&str>, local: Option<&str>) -> TempDir {
        let dir = TempDir::new().unwrap();
        let conf_dir = dir.path().join(".specweave");
        fs::create_dir_all(&conf_dir).unwrap();
        if let Some(body) = config {
            fs::write(conf_dir.join("config.yaml"), body).unwrap();
        }
        if let Some(body) = local {
            fs::write(conf_dir.join("local.yaml"), body).unwrap();
        }
        dir
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.convergence.max_rounds, 5);
        assert_eq!(config.convergence.acceptable_conflict_ceiling, 3);
        assert!(config.convergence.producer_timeout_secs.is_none());
        assert!(config.analysis.parallel);
        assert_eq!(config.logging.level, "info");
        ConfigLoader::validate(&config).expect("Default config should be valid");
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml = r"
convergence:
  max_rounds: 8
  producer_timeout_secs: 30
analysis:
  parallel: false
  envelope_fields: [id]
logging:
  level: debug
  format: json
";
        let config: Config = serde_yaml::from_str(yaml).expect("YAML should parse");
        assert_eq!(config.convergence.max_rounds, 8);
        assert_eq!(config.convergence.acceptable_conflict_ceiling, 3);
        assert_eq!(config.convergence.producer_timeout_secs, Some(30));
        assert!(!config.analysis.parallel);
        assert_eq!(config.analysis.envelope_fields, vec!["id".to_string()]);
        assert!(!config.analysis.builtin_identifiers.is_empty());
        assert_eq!(config.logging.format, "json");
        ConfigLoader::validate(&config).expect("Parsed config should be valid");
    }

    #[test]
    fn test_validate_zero_rounds() {
        let mut config = Config::default();
        config.convergence.max_rounds = 0;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidMaxRounds(0))
        ));
    }

    #[test]
    fn test_validate_zero_ceiling() {
        let mut config = Config::default();
        config.convergence.acceptable_conflict_ceiling = 0;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidConflictCeiling(0))
        ));
    }

    #[test]
    fn test_validate_zero_timeout() {
        let mut config = Config::default();
        config.convergence.producer_timeout_secs = Some(0);
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidProducerTimeout(0))
        ));
    }

    #[test]
    fn test_validate_invalid_log_level() {
        let mut config = Config::default();
        config.logging.level = "verbose".to_string();
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidLogLevel(level)) if level == "verbose"
        ));
    }

    #[test]
    fn test_validate_invalid_log_format() {
        let mut config = Config::default();
        config.logging.format = "xml".to_string();
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidLogFormat(_))
        ));
    }

    #[test]
    fn test_hierarchical_merging() {
        let dir = project(
            Some("convergence:\n  max_rounds: 4\nlogging:\n  level: info\n  format: json\n"),
            Some("convergence:\n  max_rounds: 9\nlogging:\n  level: debug\n"),
        );

        temp_env::with_vars_unset(["SPECWEAVE_CONVERGENCE__MAX_ROUNDS"], || {
            let config = ConfigLoader::load_from(dir.path()).unwrap();
            assert_eq!(config.convergence.max_rounds, 9, "local.yaml should win");
            assert_eq!(config.logging.level, "debug");
            assert_eq!(config.logging.format, "json", "base value should persist");
        });
    }

    #[test]
    fn test_env_override() {
        let dir = project(Some("convergence:\n  max_rounds: 4\n"), None);

        temp_env::with_vars(
            [
                ("SPECWEAVE_CONVERGENCE__MAX_ROUNDS", Some("12")),
                ("SPECWEAVE_ANALYSIS__PARALLEL", Some("false")),
            ],
            || {
                let config = ConfigLoader::load_from(dir.path()).unwrap();
                assert_eq!(config.convergence.max_rounds, 12);
                assert!(!config.analysis.parallel);
            },
        );
    }

    #[test]
    fn test_invalid_file_is_rejected() {
        let dir = project(Some("convergence:\n  max_rounds: 0\n"), None);
        temp_env::with_vars_unset(["SPECWEAVE_CONVERGENCE__MAX_ROUNDS"], || {
            assert!(ConfigLoader::load_from(dir.path()).is_err());
        });
    }

    #[test]
    fn test_load_from_missing_file() {
        assert!(ConfigLoader::load_from_file("/nonexistent/specweave.yaml").is_err());
    }
}
