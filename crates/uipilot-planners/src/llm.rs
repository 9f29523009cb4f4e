use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// One piece of multimodal model input.
#[derive(Debug, Clone)]
pub enum ModelPart {
    Text(String),
    /// Raw PNG bytes, sent inline with the request.
    InlinePng(Bytes),
}

/// One conversation turn, in request order.
#[derive(Debug, Clone)]
pub struct ModelTurn {
    pub role: String,
    pub parts: Vec<ModelPart>,
    /// Timestamp
    pub timestamp: DateTime<Utc>,
}

impl ModelTurn {
    pub fn user(parts: Vec<ModelPart>) -> Self {
        Self {
            role: "user".to_string(),
            parts,
            timestamp: Utc::now(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: "model".to_string(),
            parts: vec![ModelPart::Text(text.into())],
            timestamp: Utc::now(),
        }
    }

    /// Text parts joined with newlines; image parts are skipped.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for part in &self.parts {
            if let ModelPart::Text(text) = part {
                if !out.is_empty() {
                    out.push('\n');
                }
                out.push_str(text);
            }
        }
        out
    }
}

/// Vision model request payload
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub system: String,
    pub turns: Vec<ModelTurn>,
}

/// Vision model client trait
#[async_trait]
pub trait VisionClient: Send + Sync {
    async fn generate(&self, request: GenerateRequest) -> Result<String, LlmError>;
}

#[async_trait]
impl VisionClient for Arc<dyn VisionClient> {
    async fn generate(&self, request: GenerateRequest) -> Result<String, LlmError> {
        (**self).generate(request).await
    }
}

/// Vision model errors
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("http error: {0}")]
    Http(String),
    #[error("response error: {0}")]
    Response(String),
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Mock vision client for tests/examples
pub struct MockVisionClient {
    pub response: String,
}

#[async_trait]
impl VisionClient for MockVisionClient {
    async fn generate(&self, _request: GenerateRequest) -> Result<String, LlmError> {
        Ok(self.response.clone())
    }
}
