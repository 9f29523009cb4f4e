//! Configuration schema for UiPilot.
//!
//! One YAML file covers the Appium server, the device capabilities, the
//! vision planner and the runtime loop. Every field carries a default,
//! so a partial file (or none at all) still yields a runnable config.

mod loader;

pub use loader::{load_config, ConfigError};

use std::path::PathBuf;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct UipilotConfig {
    /// Config schema version.
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub planner: PlannerConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

fn default_version() -> u32 {
    1
}

impl Default for UipilotConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            server: ServerConfig::default(),
            device: DeviceConfig::default(),
            planner: PlannerConfig::default(),
            runtime: RuntimeConfig::default(),
        }
    }
}

/// Appium server connection.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_url")]
    pub url: String,
    /// Timeout for a single wire command.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: default_server_url(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

fn default_server_url() -> String {
    "http://localhost:4723".to_string()
}

fn default_request_timeout() -> u64 {
    120
}

/// Device session capabilities.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceConfig {
    #[serde(default = "default_platform_name")]
    pub platform_name: String,
    #[serde(default = "default_platform_version")]
    pub platform_version: Option<String>,
    #[serde(default = "default_device_name")]
    pub device_name: String,
    #[serde(default = "default_app_package")]
    pub app_package: Option<String>,
    #[serde(default = "default_app_activity")]
    pub app_activity: Option<String>,
    #[serde(default = "default_automation_name")]
    pub automation_name: String,
    #[serde(default = "default_new_command_timeout")]
    pub new_command_timeout_secs: u64,
    /// Keep app data between sessions.
    #[serde(default = "default_true")]
    pub no_reset: bool,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            platform_name: default_platform_name(),
            platform_version: default_platform_version(),
            device_name: default_device_name(),
            app_package: default_app_package(),
            app_activity: default_app_activity(),
            automation_name: default_automation_name(),
            new_command_timeout_secs: default_new_command_timeout(),
            no_reset: true,
        }
    }
}

fn default_platform_name() -> String {
    "Android".to_string()
}

fn default_platform_version() -> Option<String> {
    Some("15".to_string())
}

fn default_device_name() -> String {
    "emulator-5554".to_string()
}

fn default_app_package() -> Option<String> {
    Some("io.appium.android.apis".to_string())
}

fn default_app_activity() -> Option<String> {
    Some("io.appium.android.apis.ApiDemos".to_string())
}

fn default_automation_name() -> String {
    "UiAutomator2".to_string()
}

fn default_new_command_timeout() -> u64 {
    300
}

fn default_true() -> bool {
    true
}

/// Vision planner backend.
#[derive(Debug, Clone, Deserialize)]
pub struct PlannerConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Environment variable name containing the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Timeout for one HTTP request to the model.
    #[serde(default = "default_planner_request_timeout")]
    pub request_timeout_secs: u64,
    /// Upper bound on one planning call as seen by the loop.
    #[serde(default = "default_plan_timeout")]
    pub plan_timeout_secs: u64,
}

impl PlannerConfig {
    /// Resolve the API key from the configured environment variable.
    /// A set-but-empty variable counts as missing.
    pub fn resolve_api_key(&self) -> Result<String, ApiKeyError> {
        match std::env::var(&self.api_key_env) {
            Ok(value) if !value.trim().is_empty() => Ok(value),
            _ => Err(ApiKeyError::EnvNotFound(self.api_key_env.clone())),
        }
    }
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            endpoint: default_endpoint(),
            api_key_env: default_api_key_env(),
            temperature: default_temperature(),
            request_timeout_secs: default_planner_request_timeout(),
            plan_timeout_secs: default_plan_timeout(),
        }
    }
}

fn default_model() -> String {
    "gemini-3-flash-preview".to_string()
}

fn default_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_api_key_env() -> String {
    "GOOGLE_API_KEY".to_string()
}

fn default_temperature() -> f32 {
    0.2
}

fn default_planner_request_timeout() -> u64 {
    30
}

fn default_plan_timeout() -> u64 {
    60
}

/// Turn loop settings.
#[derive(Debug, Clone, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,
    /// Bounded wait for locator resolution.
    #[serde(default = "default_element_wait")]
    pub element_wait_secs: u64,
    /// Pause after every executed action so UI transitions complete.
    #[serde(default = "default_settle_delay")]
    pub settle_delay_secs: u64,
    /// Directory diagnostic screenshots are written to on failure.
    #[serde(default = "default_diagnostics_dir")]
    pub diagnostics_dir: PathBuf,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
            element_wait_secs: default_element_wait(),
            settle_delay_secs: default_settle_delay(),
            diagnostics_dir: default_diagnostics_dir(),
        }
    }
}

fn default_max_turns() -> usize {
    20
}

fn default_element_wait() -> u64 {
    30
}

fn default_settle_delay() -> u64 {
    2
}

fn default_diagnostics_dir() -> PathBuf {
    PathBuf::from(".")
}

/// Errors related to API key resolution.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ApiKeyError {
    #[error("Environment variable '{0}' not found or empty")]
    EnvNotFound(String),
}
