//! Session capabilities for the UiAutomator2 backend.

use serde_json::{json, Map, Value};

/// Capabilities sent when opening a device session.
///
/// Defaults target a local emulator running the ApiDemos app; override
/// them per device through configuration.
#[derive(Debug, Clone)]
pub struct Capabilities {
    pub platform_name: String,
    pub platform_version: Option<String>,
    pub device_name: String,
    pub app_package: Option<String>,
    pub app_activity: Option<String>,
    pub automation_name: String,
    pub new_command_timeout_secs: u64,
    /// Keep app data between sessions.
    pub no_reset: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            platform_name: "Android".to_string(),
            platform_version: Some("15".to_string()),
            device_name: "emulator-5554".to_string(),
            app_package: Some("io.appium.android.apis".to_string()),
            app_activity: Some("io.appium.android.apis.ApiDemos".to_string()),
            automation_name: "UiAutomator2".to_string(),
            new_command_timeout_secs: 300,
            no_reset: true,
        }
    }
}

impl Capabilities {
    /// W3C `alwaysMatch` object with the vendor-prefixed Appium keys.
    pub fn to_always_match(&self) -> Value {
        let mut caps = Map::new();
        caps.insert("platformName".to_string(), json!(self.platform_name));
        if let Some(version) = &self.platform_version {
            caps.insert("appium:platformVersion".to_string(), json!(version));
        }
        caps.insert("appium:deviceName".to_string(), json!(self.device_name));
        if let Some(package) = &self.app_package {
            caps.insert("appium:appPackage".to_string(), json!(package));
        }
        if let Some(activity) = &self.app_activity {
            caps.insert("appium:appActivity".to_string(), json!(activity));
        }
        caps.insert(
            "appium:automationName".to_string(),
            json!(self.automation_name),
        );
        caps.insert(
            "appium:newCommandTimeout".to_string(),
            json!(self.new_command_timeout_secs),
        );
        caps.insert("appium:noReset".to_string(), json!(self.no_reset));
        Value::Object(caps)
    }
}
