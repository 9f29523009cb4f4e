//! Configuration loading and validation.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::UipilotConfig;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Load the full UiPilot configuration from a YAML file.
pub fn load_config(path: &Path) -> Result<UipilotConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: UipilotConfig = serde_yaml::from_str(&content)?;
    validate_config(&config)?;
    Ok(config)
}

/// Validate cross-field constraints the schema cannot express.
pub fn validate_config(config: &UipilotConfig) -> Result<(), ConfigError> {
    if config.version == 0 {
        return Err(ConfigError::Invalid(
            "version must be greater than 0".to_string(),
        ));
    }
    if config.server.url.trim().is_empty() {
        return Err(ConfigError::Invalid(
            "server.url must not be empty".to_string(),
        ));
    }
    if config.server.request_timeout_secs == 0 {
        return Err(ConfigError::Invalid(
            "server.request_timeout_secs must be greater than 0".to_string(),
        ));
    }
    if config.device.platform_name.trim().is_empty() {
        return Err(ConfigError::Invalid(
            "device.platform_name must not be empty".to_string(),
        ));
    }
    if config.device.device_name.trim().is_empty() {
        return Err(ConfigError::Invalid(
            "device.device_name must not be empty".to_string(),
        ));
    }
    if config.device.automation_name.trim().is_empty() {
        return Err(ConfigError::Invalid(
            "device.automation_name must not be empty".to_string(),
        ));
    }
    if config.planner.model.trim().is_empty() {
        return Err(ConfigError::Invalid(
            "planner.model must not be empty".to_string(),
        ));
    }
    if config.planner.endpoint.trim().is_empty() {
        return Err(ConfigError::Invalid(
            "planner.endpoint must not be empty".to_string(),
        ));
    }
    if config.planner.api_key_env.trim().is_empty() {
        return Err(ConfigError::Invalid(
            "planner.api_key_env must not be empty".to_string(),
        ));
    }
    if !(0.0..=2.0).contains(&config.planner.temperature) {
        return Err(ConfigError::Invalid(
            "planner.temperature must be between 0.0 and 2.0".to_string(),
        ));
    }
    if config.planner.request_timeout_secs == 0 {
        return Err(ConfigError::Invalid(
            "planner.request_timeout_secs must be greater than 0".to_string(),
        ));
    }
    if config.planner.plan_timeout_secs == 0 {
        return Err(ConfigError::Invalid(
            "planner.plan_timeout_secs must be greater than 0".to_string(),
        ));
    }
    if config.runtime.max_turns == 0 {
        return Err(ConfigError::Invalid(
            "runtime.max_turns must be greater than 0".to_string(),
        ));
    }
    if config.runtime.element_wait_secs == 0 {
        return Err(ConfigError::Invalid(
            "runtime.element_wait_secs must be greater than 0".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PlannerConfig;

    #[test]
    fn test_validate_config_accepts_defaults() {
        let config = UipilotConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_config_rejects_zero_version() {
        let mut config = UipilotConfig::default();
        config.version = 0;
        let result = validate_config(&config);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_config_rejects_zero_max_turns() {
        let mut config = UipilotConfig::default();
        config.runtime.max_turns = 0;
        let result = validate_config(&config);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_config_rejects_out_of_range_temperature() {
        let mut config = UipilotConfig::default();
        config.planner.temperature = 3.5;
        match validate_config(&config) {
            Err(ConfigError::Invalid(message)) => {
                assert!(message.contains("planner.temperature"));
            }
            other => panic!("expected invalid config, got {:?}", other),
        }
    }

    #[test]
    fn test_load_config_merges_partial_file_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("uipilot.yaml");
        std::fs::write(
            &path,
            r#"
device:
  device_name: "Pixel_7_API_34"
planner:
  model: "gemini-2.5-pro"
runtime:
  max_turns: 8
"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.device.device_name, "Pixel_7_API_34");
        assert_eq!(config.device.platform_name, "Android");
        assert_eq!(config.planner.model, "gemini-2.5-pro");
        assert_eq!(
            config.planner.endpoint,
            "https://generativelanguage.googleapis.com/v1beta"
        );
        assert_eq!(config.runtime.max_turns, 8);
        assert_eq!(config.runtime.element_wait_secs, 30);
    }

    #[test]
    fn test_load_config_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("does-not-exist.yaml");
        let result = load_config(&path);
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_load_config_malformed_yaml_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("uipilot.yaml");
        std::fs::write(&path, "server: [").unwrap();
        let result = load_config(&path);
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_resolve_api_key_reads_configured_variable() {
        std::env::set_var("UIPILOT_TEST_API_KEY", "test-key-123");
        let planner = PlannerConfig {
            api_key_env: "UIPILOT_TEST_API_KEY".to_string(),
            ..PlannerConfig::default()
        };
        assert_eq!(planner.resolve_api_key().unwrap(), "test-key-123");
    }

    #[test]
    fn test_resolve_api_key_rejects_unset_variable() {
        let planner = PlannerConfig {
            api_key_env: "UIPILOT_TEST_API_KEY_UNSET".to_string(),
            ..PlannerConfig::default()
        };
        assert!(planner.resolve_api_key().is_err());
    }
}
