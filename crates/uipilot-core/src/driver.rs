//! Device driver abstraction
//!
//! This module defines the primitive operations the engine needs from a
//! device automation backend:
//! - Perception capture: screenshot and element-tree dump
//! - Element resolution with a bounded wait
//! - Input: tap, click, send keys, keycode, directional scroll gesture
//! - App lifecycle: activate and terminate by package
//! - Session teardown
//!
//! Note: the concrete WebDriver-backed implementation lives in the
//! uipilot-driver crate.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use crate::action::{LocatorStrategy, ScrollDirection};

/// Driver error types
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("element not found: {0}")]
    ElementNotFound(String),

    #[error("http error: {0}")]
    Http(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl DriverError {
    /// Whether the failure is an element-resolution miss rather than a
    /// transport or protocol fault. The executor reports the two
    /// differently to the planner.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ElementNotFound(_))
    }
}

/// Opaque handle to a resolved on-screen element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementId(pub String);

impl ElementId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ElementId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Device window dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSize {
    pub width: i64,
    pub height: i64,
}

/// Rectangle a scroll gesture is performed over, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollRegion {
    pub left: i64,
    pub top: i64,
    pub width: i64,
    pub height: i64,
}

/// Primitive device operations, implemented by an automation backend.
///
/// Methods return `DriverError` on any device-communication fault; the
/// executor is responsible for converting those into outcomes.
#[async_trait]
pub trait DeviceDriver: Send + Sync {
    /// Capture a PNG screenshot of the current screen.
    async fn screenshot(&self) -> Result<Bytes, DriverError>;

    /// Capture the element-tree dump (XML page source) of the current screen.
    async fn page_source(&self) -> Result<String, DriverError>;

    /// Resolve an element by locator, waiting up to `timeout` for it to
    /// appear. Returns `DriverError::ElementNotFound` when the wait runs out.
    async fn await_element(
        &self,
        strategy: LocatorStrategy,
        value: &str,
        timeout: Duration,
    ) -> Result<ElementId, DriverError>;

    /// Tap at absolute screen coordinates.
    async fn tap_point(&self, x: i64, y: i64) -> Result<(), DriverError>;

    /// Click a previously resolved element.
    async fn click_element(&self, element: &ElementId) -> Result<(), DriverError>;

    /// Send text input to a previously resolved element.
    async fn send_keys(&self, element: &ElementId, text: &str) -> Result<(), DriverError>;

    /// Press a hardware or soft keycode.
    async fn press_keycode(&self, key_code: i64) -> Result<(), DriverError>;

    /// Bring an app to the foreground by package. `activity` is advisory;
    /// backends that activate by package alone may ignore it.
    async fn activate_app(&self, package: &str, activity: Option<&str>)
        -> Result<(), DriverError>;

    /// Stop an app by package.
    async fn terminate_app(&self, package: &str) -> Result<(), DriverError>;

    /// Current window dimensions.
    async fn window_size(&self) -> Result<WindowSize, DriverError>;

    /// Perform a directional scroll gesture over `region`, moving by
    /// `fraction` of the region's visible span.
    async fn scroll(
        &self,
        region: ScrollRegion,
        direction: ScrollDirection,
        fraction: f64,
    ) -> Result<(), DriverError>;

    /// Write a screenshot of the current screen to `path`.
    async fn save_screenshot(&self, path: &Path) -> Result<(), DriverError>;

    /// End the automation session. Called exactly once per established
    /// session, after the run result is decided.
    async fn quit(&self) -> Result<(), DriverError>;
}
