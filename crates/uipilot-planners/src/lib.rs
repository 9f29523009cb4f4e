//! Planner implementations for UiPilot.
//!
//! This crate provides the vision LLM planning stack:
//! - A multimodal client for Google Gemini
//! - The turn prompt, chat history and action extraction logic
//!
//! `VisionLlmPlanner` implements `uipilot_core::planner::Planner` and is
//! the piece the engine talks to.

mod gemini;
mod llm;
mod planner;

pub use gemini::{GeminiVisionClient, GeminiVisionClientConfig};
pub use llm::{GenerateRequest, LlmError, MockVisionClient, ModelPart, ModelTurn, VisionClient};
pub use planner::{VisionLlmPlanner, VisionPlannerConfig};
