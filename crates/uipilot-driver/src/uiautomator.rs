//! WebDriver client for Appium's UiAutomator2 backend.
//!
//! One driver instance owns one device session. Element lookup polls
//! the server until the deadline passes, matching how a human-tuned
//! explicit wait behaves; everything else is a single wire command.

use std::path::Path;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

use uipilot_core::action::{LocatorStrategy, ScrollDirection};
use uipilot_core::driver::{DeviceDriver, DriverError, ElementId, ScrollRegion, WindowSize};

use crate::capabilities::Capabilities;

const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Connection settings for the UiAutomator2 driver.
#[derive(Debug, Clone)]
pub struct UiAutomator2Config {
    /// Appium server base URL.
    pub server_url: String,
    /// Timeout for a single wire command.
    pub request_timeout_secs: u64,
    pub capabilities: Capabilities,
}

impl Default for UiAutomator2Config {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:4723".to_string(),
            request_timeout_secs: 120,
            capabilities: Capabilities::default(),
        }
    }
}

/// Device driver speaking the WebDriver wire protocol to an Appium
/// UiAutomator2 server.
pub struct UiAutomator2Driver {
    client: reqwest::Client,
    base_url: String,
    session_id: String,
}

impl UiAutomator2Driver {
    /// Open a new device session.
    pub async fn open(config: UiAutomator2Config) -> Result<Self, DriverError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| DriverError::Http(e.to_string()))?;
        let base_url = config.server_url.trim_end_matches('/').to_string();

        let body = NewSessionRequest {
            capabilities: SessionCapabilities {
                always_match: config.capabilities.to_always_match(),
            },
        };
        info!(server_url = %base_url, "opening device session");
        let response = client
            .post(format!("{}/session", base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| DriverError::Http(e.to_string()))?;
        let text = read_success(response).await?;
        let parsed: NewSessionResponse =
            serde_json::from_str(&text).map_err(|e| DriverError::Protocol(e.to_string()))?;
        info!(session_id = %parsed.value.session_id, "device session started");

        Ok(Self {
            client,
            base_url,
            session_id: parsed.value.session_id,
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    fn url(&self, suffix: &str) -> String {
        format!("{}/session/{}{}", self.base_url, self.session_id, suffix)
    }

    async fn post_json<B: Serialize + ?Sized>(
        &self,
        suffix: &str,
        body: &B,
    ) -> Result<String, DriverError> {
        let response = self
            .client
            .post(self.url(suffix))
            .json(body)
            .send()
            .await
            .map_err(|e| DriverError::Http(e.to_string()))?;
        read_success(response).await
    }

    async fn get_value<T: DeserializeOwned>(&self, suffix: &str) -> Result<T, DriverError> {
        let response = self
            .client
            .get(self.url(suffix))
            .send()
            .await
            .map_err(|e| DriverError::Http(e.to_string()))?;
        let text = read_success(response).await?;
        let parsed: ValueResponse<T> =
            serde_json::from_str(&text).map_err(|e| DriverError::Protocol(e.to_string()))?;
        Ok(parsed.value)
    }

    async fn find_element(&self, using: &str, value: &str) -> Result<ElementId, DriverError> {
        let body = FindElementRequest {
            using: using.to_string(),
            value: value.to_string(),
        };
        let text = self.post_json("/element", &body).await?;
        let parsed: ElementResponse =
            serde_json::from_str(&text).map_err(|e| DriverError::Protocol(e.to_string()))?;
        Ok(ElementId::new(parsed.value.element_id))
    }

    async fn execute_script(&self, script: &str, args: Vec<Value>) -> Result<(), DriverError> {
        let body = ExecuteRequest {
            script: script.to_string(),
            args,
        };
        self.post_json("/execute/sync", &body).await?;
        Ok(())
    }
}

#[async_trait]
impl DeviceDriver for UiAutomator2Driver {
    async fn screenshot(&self) -> Result<Bytes, DriverError> {
        let encoded: String = self.get_value("/screenshot").await?;
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| DriverError::Protocol(format!("screenshot decode: {}", e)))?;
        Ok(Bytes::from(bytes))
    }

    async fn page_source(&self) -> Result<String, DriverError> {
        self.get_value("/source").await
    }

    async fn await_element(
        &self,
        strategy: LocatorStrategy,
        value: &str,
        timeout: Duration,
    ) -> Result<ElementId, DriverError> {
        let Some(using) = strategy.webdriver_using() else {
            return Err(DriverError::Protocol(format!(
                "strategy {} has no element lookup",
                strategy
            )));
        };
        let deadline = Instant::now() + timeout;
        loop {
            match self.find_element(using, value).await {
                Ok(element) => return Ok(element),
                Err(DriverError::ElementNotFound(_)) if Instant::now() < deadline => {
                    debug!(using, value, "element not present yet, polling");
                    tokio::time::sleep(POLL_INTERVAL).await;
                }
                Err(DriverError::ElementNotFound(_)) => {
                    return Err(DriverError::ElementNotFound(format!(
                        "{}='{}' within {:?}",
                        using, value, timeout
                    )))
                }
                Err(other) => return Err(other),
            }
        }
    }

    async fn tap_point(&self, x: i64, y: i64) -> Result<(), DriverError> {
        self.execute_script("mobile: clickGesture", vec![json!({ "x": x, "y": y })])
            .await
    }

    async fn click_element(&self, element: &ElementId) -> Result<(), DriverError> {
        self.post_json(&format!("/element/{}/click", element), &json!({}))
            .await?;
        Ok(())
    }

    async fn send_keys(&self, element: &ElementId, text: &str) -> Result<(), DriverError> {
        let body = SendKeysRequest {
            text: text.to_string(),
        };
        self.post_json(&format!("/element/{}/value", element), &body)
            .await?;
        Ok(())
    }

    async fn press_keycode(&self, key_code: i64) -> Result<(), DriverError> {
        let body = PressKeycodeRequest { keycode: key_code };
        self.post_json("/appium/device/press_keycode", &body).await?;
        Ok(())
    }

    async fn activate_app(&self, package: &str, activity: Option<&str>) -> Result<(), DriverError> {
        if let Some(activity) = activity {
            debug!(package, activity, "activation ignores the activity hint");
        }
        let body = AppIdRequest {
            app_id: package.to_string(),
        };
        self.post_json("/appium/device/activate_app", &body).await?;
        Ok(())
    }

    async fn terminate_app(&self, package: &str) -> Result<(), DriverError> {
        let body = AppIdRequest {
            app_id: package.to_string(),
        };
        self.post_json("/appium/device/terminate_app", &body).await?;
        Ok(())
    }

    async fn window_size(&self) -> Result<WindowSize, DriverError> {
        let rect: WindowRect = self.get_value("/window/rect").await?;
        Ok(WindowSize {
            width: rect.width,
            height: rect.height,
        })
    }

    async fn scroll(
        &self,
        region: ScrollRegion,
        direction: ScrollDirection,
        fraction: f64,
    ) -> Result<(), DriverError> {
        self.execute_script(
            "mobile: scrollGesture",
            vec![scroll_args(region, direction, fraction)],
        )
        .await
    }

    async fn save_screenshot(&self, path: &Path) -> Result<(), DriverError> {
        let bytes = self.screenshot().await?;
        tokio::fs::write(path, &bytes).await?;
        Ok(())
    }

    async fn quit(&self) -> Result<(), DriverError> {
        let response = self
            .client
            .delete(self.url(""))
            .send()
            .await
            .map_err(|e| DriverError::Http(e.to_string()))?;
        read_success(response).await?;
        info!(session_id = %self.session_id, "device session closed");
        Ok(())
    }
}

fn scroll_args(region: ScrollRegion, direction: ScrollDirection, fraction: f64) -> Value {
    json!({
        "left": region.left,
        "top": region.top,
        "width": region.width,
        "height": region.height,
        "direction": direction.as_wire(),
        "percent": fraction,
    })
}

async fn read_success(response: reqwest::Response) -> Result<String, DriverError> {
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| DriverError::Http(e.to_string()))?;
    if status.is_success() {
        Ok(text)
    } else {
        Err(map_error_body(status, &text))
    }
}

fn map_error_body(status: reqwest::StatusCode, body: &str) -> DriverError {
    if let Ok(parsed) = serde_json::from_str::<ErrorResponse>(body) {
        if parsed.value.error == "no such element" {
            return DriverError::ElementNotFound(parsed.value.message);
        }
        return DriverError::Protocol(format!(
            "{}: {}",
            parsed.value.error, parsed.value.message
        ));
    }
    DriverError::Protocol(format!("HTTP {}: {}", status, body))
}

// WebDriver wire structures

#[derive(Debug, Serialize)]
struct NewSessionRequest {
    capabilities: SessionCapabilities,
}

#[derive(Debug, Serialize)]
struct SessionCapabilities {
    #[serde(rename = "alwaysMatch")]
    always_match: Value,
}

#[derive(Debug, Deserialize)]
struct NewSessionResponse {
    value: NewSessionValue,
}

#[derive(Debug, Deserialize)]
struct NewSessionValue {
    #[serde(rename = "sessionId")]
    session_id: String,
}

#[derive(Debug, Deserialize)]
struct ValueResponse<T> {
    value: T,
}

#[derive(Debug, Serialize)]
struct FindElementRequest {
    using: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct ElementResponse {
    value: ElementValue,
}

#[derive(Debug, Deserialize)]
struct ElementValue {
    #[serde(rename = "element-6066-11e4-a52e-4f735466cecf")]
    element_id: String,
}

#[derive(Debug, Serialize)]
struct SendKeysRequest {
    text: String,
}

#[derive(Debug, Serialize)]
struct PressKeycodeRequest {
    keycode: i64,
}

#[derive(Debug, Serialize)]
struct AppIdRequest {
    #[serde(rename = "appId")]
    app_id: String,
}

#[derive(Debug, Serialize)]
struct ExecuteRequest {
    script: String,
    args: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct WindowRect {
    width: i64,
    height: i64,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    value: ErrorValue,
}

#[derive(Debug, Deserialize)]
struct ErrorValue {
    error: String,
    message: String,
}
