//! Gemini vision client implementation.
//!
//! This module provides a multimodal client for Google's Gemini API.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::llm::{GenerateRequest, LlmError, ModelPart, ModelTurn, VisionClient};

/// Gemini client configuration.
#[derive(Debug, Clone)]
pub struct GeminiVisionClientConfig {
    /// API key for authentication.
    pub api_key: String,
    /// Model name (e.g., "gemini-3-flash-preview").
    pub model: String,
    /// Base endpoint URL.
    pub endpoint: String,
    /// Temperature for generation (0.0 - 2.0).
    pub temperature: f32,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for GeminiVisionClientConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: "gemini-3-flash-preview".to_string(),
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            temperature: 0.2,
            timeout_secs: 30,
        }
    }
}

/// Gemini vision client.
pub struct GeminiVisionClient {
    client: reqwest::Client,
    config: GeminiVisionClientConfig,
}

impl GeminiVisionClient {
    /// Create a new Gemini client.
    pub fn new(config: GeminiVisionClientConfig) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::Http(e.to_string()))?;
        Ok(Self { client, config })
    }

    fn build_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            self.config.endpoint, self.config.model, self.config.api_key
        )
    }
}

// Gemini API request/response structures

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(rename = "systemInstruction", skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiSystemInstruction>,
    #[serde(rename = "generationConfig")]
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    role: String,
    parts: Vec<GeminiPart>,
}

impl GeminiContent {
    fn from_turn(turn: ModelTurn) -> Self {
        let parts = turn
            .parts
            .into_iter()
            .map(|part| match part {
                ModelPart::Text(text) => GeminiPart::text(text),
                ModelPart::InlinePng(bytes) => GeminiPart::inline_png(&bytes),
            })
            .collect();
        Self {
            role: turn.role,
            parts,
        }
    }
}

#[derive(Debug, Serialize)]
struct GeminiSystemInstruction {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
struct GeminiPart {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(rename = "inlineData", skip_serializing_if = "Option::is_none")]
    inline_data: Option<GeminiInlineData>,
}

impl GeminiPart {
    fn text(text: String) -> Self {
        Self {
            text: Some(text),
            inline_data: None,
        }
    }

    fn inline_png(bytes: &Bytes) -> Self {
        Self {
            text: None,
            inline_data: Some(GeminiInlineData {
                mime_type: "image/png".to_string(),
                data: STANDARD.encode(bytes),
            }),
        }
    }
}

#[derive(Debug, Serialize)]
struct GeminiInlineData {
    #[serde(rename = "mimeType")]
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
struct GeminiGenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
    error: Option<GeminiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: GeminiContentResponse,
}

#[derive(Debug, Deserialize)]
struct GeminiContentResponse {
    parts: Vec<GeminiPartResponse>,
}

#[derive(Debug, Deserialize)]
struct GeminiPartResponse {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    message: String,
    #[allow(dead_code)]
    code: Option<i32>,
}

#[async_trait]
impl VisionClient for GeminiVisionClient {
    async fn generate(&self, request: GenerateRequest) -> Result<String, LlmError> {
        let url = self.build_url();

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        // Build Gemini request
        let body = GeminiRequest {
            contents: request
                .turns
                .into_iter()
                .map(GeminiContent::from_turn)
                .collect(),
            system_instruction: if request.system.is_empty() {
                None
            } else {
                Some(GeminiSystemInstruction {
                    parts: vec![GeminiPart::text(request.system)],
                })
            },
            generation_config: GeminiGenerationConfig {
                temperature: self.config.temperature,
            },
        };

        debug!(
            model = %self.config.model,
            content_count = body.contents.len(),
            "sending gemini request"
        );

        let response = self
            .client
            .post(&url)
            .headers(headers)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(LlmError::Response(format!("HTTP {}: {}", status, text)));
        }

        let text = response
            .text()
            .await
            .map_err(|e| LlmError::Http(e.to_string()))?;

        let parsed: GeminiResponse =
            serde_json::from_str(&text).map_err(|e| LlmError::Serialization(e.to_string()))?;

        // Check for API error
        if let Some(error) = parsed.error {
            return Err(LlmError::Response(format!(
                "Gemini API error: {}",
                error.message
            )));
        }

        // Extract content from response
        let content = parsed
            .candidates
            .and_then(|c| c.into_iter().next())
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or_else(|| LlmError::Response("No content in response".to_string()))?;

        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GeminiVisionClientConfig::default();
        assert_eq!(config.model, "gemini-3-flash-preview");
        assert!(config
            .endpoint
            .contains("generativelanguage.googleapis.com"));
    }

    #[test]
    fn test_build_url() {
        let config = GeminiVisionClientConfig {
            api_key: "test-key".to_string(),
            model: "gemini-1.5-pro".to_string(),
            ..Default::default()
        };
        let client = GeminiVisionClient::new(config).unwrap();
        let url = client.build_url();
        assert!(url.contains("gemini-1.5-pro:generateContent"));
        assert!(url.contains("key=test-key"));
    }

    #[test]
    fn test_request_serializes_multimodal_parts() {
        let turn = ModelTurn::user(vec![
            ModelPart::Text("User Goal: enable wifi".to_string()),
            ModelPart::InlinePng(Bytes::from_static(b"fakepng")),
        ]);
        let body = GeminiRequest {
            contents: vec![GeminiContent::from_turn(turn)],
            system_instruction: Some(GeminiSystemInstruction {
                parts: vec![GeminiPart::text("policy".to_string())],
            }),
            generation_config: GeminiGenerationConfig { temperature: 0.2 },
        };

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(
            json["contents"][0]["parts"][0]["text"],
            "User Goal: enable wifi"
        );
        assert!(json["contents"][0]["parts"][0].get("inlineData").is_none());
        let inline = &json["contents"][0]["parts"][1]["inlineData"];
        assert_eq!(inline["mimeType"], "image/png");
        assert_eq!(inline["data"], STANDARD.encode(b"fakepng"));
        assert!(json["contents"][0]["parts"][1].get("text").is_none());
        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "policy");
        let temperature = json["generationConfig"]["temperature"].as_f64().unwrap();
        assert!((temperature - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_error_response_deserializes() {
        let parsed: GeminiResponse =
            serde_json::from_str(r#"{"error":{"message":"API key not valid","code":400}}"#)
                .unwrap();
        let error = parsed.error.expect("error should be present");
        assert_eq!(error.message, "API key not valid");
        assert!(parsed.candidates.is_none());
    }

    #[tokio::test]
    #[ignore = "requires live GOOGLE_API_KEY and network"]
    async fn test_live_gemini_generation_when_env_set() {
        let api_key = match std::env::var("GOOGLE_API_KEY") {
            Ok(v) if !v.trim().is_empty() => v,
            _ => {
                eprintln!("skipped: GOOGLE_API_KEY is not set");
                return;
            }
        };

        let config = GeminiVisionClientConfig {
            api_key,
            ..Default::default()
        };
        let client = GeminiVisionClient::new(config).expect("client should initialize");
        let request = GenerateRequest {
            system: "You are a concise assistant.".to_string(),
            turns: vec![ModelTurn::user(vec![ModelPart::Text(
                "Reply with exactly: OK".to_string(),
            )])],
        };

        let response = client
            .generate(request)
            .await
            .expect("live Gemini generation should succeed");
        assert!(!response.trim().is_empty());
    }
}
