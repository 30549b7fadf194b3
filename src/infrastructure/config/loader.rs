//! Layered configuration loading with figment.

use std::path::Path;

use anyhow::{Context, Result};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};

use crate::domain::errors::ConfigError;
use crate::domain::models::{IntervalClass, Level, LoggerConfig};

/// Directory holding the project config files, relative to the project root.
pub const CONFIG_DIR: &str = ".logweave";

/// Prefix for environment overrides; nested keys use `__`.
pub const ENV_PREFIX: &str = "LOGWEAVE_";

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from the current directory
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .logweave/config.yaml
    /// 3. .logweave/local.yaml (optional local overrides)
    /// 4. Environment variables (LOGWEAVE_* prefix)
    pub fn load() -> Result<LoggerConfig> {
        Self::load_from_dir(".")
    }

    /// Same as [`ConfigLoader::load`] with the config directory under `root`.
    pub fn load_from_dir(root: impl AsRef<Path>) -> Result<LoggerConfig> {
        let config_dir = root.as_ref().join(CONFIG_DIR);

        let config: LoggerConfig = Figment::new()
            .merge(Serialized::defaults(LoggerConfig::default()))
            .merge(Yaml::file(config_dir.join("config.yaml")))
            .merge(Yaml::file(config_dir.join("local.yaml")))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<LoggerConfig> {
        let config: LoggerConfig = Figment::new()
            .merge(Serialized::defaults(LoggerConfig::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    ///
    /// Only checks what can be checked without touching the filesystem;
    /// directory creation is left to the rotation policy.
    pub fn validate(config: &LoggerConfig) -> Result<(), ConfigError> {
        if config.base_path.trim().is_empty() || config.file_name.trim().is_empty() {
            return Err(ConfigError::EmptyPath);
        }

        config.interval.parse::<IntervalClass>()?;
        config.level.parse::<Level>()?;

        Ok(())
    }

    /// Default configuration rendered as YAML, for seeding a config file.
    pub fn default_yaml() -> Result<String> {
        serde_yaml::to_string(&LoggerConfig::default()).context("Failed to serialize default config")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{DurationFormat, Encoding, TimeZoneMode};
    use std::fs;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    fn write_project_file(root: &TempDir, name: &str, contents: &str) {
        let dir = root.path().join(CONFIG_DIR);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(name), contents).unwrap();
    }

    #[test]
    fn test_default_config_is_valid() {
        ConfigLoader::validate(&LoggerConfig::default()).expect("Default config should be valid");
    }

    #[test]
    fn test_validate_empty_path() {
        let config = LoggerConfig {
            base_path: "  ".to_string(),
            ..LoggerConfig::default()
        };
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::EmptyPath)
        ));

        let config = LoggerConfig {
            file_name: String::new(),
            ..LoggerConfig::default()
        };
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::EmptyPath)
        ));
    }

    #[test]
    fn test_validate_invalid_interval() {
        let config = LoggerConfig {
            interval: "fortnight".to_string(),
            ..LoggerConfig::default()
        };
        match ConfigLoader::validate(&config) {
            Err(ConfigError::InvalidInterval(value)) => assert_eq!(value, "fortnight"),
            other => panic!("Expected InvalidInterval error, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_invalid_level() {
        let config = LoggerConfig {
            level: "verbose".to_string(),
            ..LoggerConfig::default()
        };
        match ConfigLoader::validate(&config) {
            Err(ConfigError::InvalidLevel(value)) => assert_eq!(value, "verbose"),
            other => panic!("Expected InvalidLevel error, got {other:?}"),
        }
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "base_path: /var/log/app\ninterval: hour\nmax_age_secs: 86400\nencoder:\n  duration_format: seconds"
        )
        .unwrap();
        file.flush().unwrap();

        let config = ConfigLoader::load_from_file(file.path()).unwrap();
        assert_eq!(config.base_path, "/var/log/app");
        assert_eq!(config.interval, "hour");
        assert_eq!(config.max_age_secs, 86_400);
        assert_eq!(config.encoder.duration_format, DurationFormat::Seconds);
        assert_eq!(config.file_name, "app.log", "Default should persist");
    }

    #[test]
    fn test_load_from_file_rejects_invalid() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "interval: weekly").unwrap();
        file.flush().unwrap();

        assert!(ConfigLoader::load_from_file(file.path()).is_err());
    }

    #[test]
    fn test_hierarchical_merging() {
        let root = TempDir::new().unwrap();
        write_project_file(&root, "config.yaml", "level: info\nfile_name: svc.log\ninterval: day\n");
        write_project_file(&root, "local.yaml", "level: debug\n");

        let config = temp_env::with_vars_unset(["LOGWEAVE_LEVEL", "LOGWEAVE_INTERVAL"], || {
            ConfigLoader::load_from_dir(root.path()).unwrap()
        });

        assert_eq!(config.level, "debug", "Local override should win");
        assert_eq!(
            config.file_name, "svc.log",
            "Base value should persist when not overridden"
        );
        assert_eq!(config.interval, "day");
    }

    #[test]
    fn test_env_override() {
        let root = TempDir::new().unwrap();
        write_project_file(&root, "config.yaml", "level: info\ninterval: day\n");

        let config = temp_env::with_vars(
            [
                ("LOGWEAVE_LEVEL", Some("warn")),
                ("LOGWEAVE_TIME_ZONE", Some("local")),
                ("LOGWEAVE_ENCODER__ENCODING", Some("console")),
            ],
            || ConfigLoader::load_from_dir(root.path()).unwrap(),
        );

        assert_eq!(config.level, "warn");
        assert_eq!(config.time_zone, TimeZoneMode::Local);
        assert_eq!(config.encoder.encoding, Encoding::Console);
        assert_eq!(config.interval, "day");
    }

    #[test]
    fn test_env_override_is_validated() {
        let root = TempDir::new().unwrap();

        let result = temp_env::with_var("LOGWEAVE_LEVEL", Some("shouting"), || {
            ConfigLoader::load_from_dir(root.path())
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_default_yaml_round_trips() {
        let yaml = ConfigLoader::default_yaml().unwrap();
        let config: LoggerConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(config.base_path, LoggerConfig::default().base_path);
        ConfigLoader::validate(&config).unwrap();
    }
}
