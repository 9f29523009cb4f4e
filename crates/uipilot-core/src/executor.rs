//! Executor module
//!
//! The Executor is responsible for:
//! - Resolving locators against the device within a bounded wait
//! - Dispatching exactly one action per call to the device driver
//! - Converting every device fault into an `ExecutionOutcome`
//! - Applying the fixed settling delay after every attempt
//!
//! Device faults never escape this module as errors; the engine only
//! ever sees outcomes.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;

use crate::action::{LocatorStrategy, LocatorValue, ScrollDirection, UiAction};
use crate::driver::{DeviceDriver, DriverError, ElementId, ScrollRegion};
use crate::outcome::{ExecutionOutcome, FailureReason};

/// Keycode sent after text entry to commit the input (Android ENTER).
const COMMIT_KEYCODE: i64 = 66;
/// Inset of the scroll region from each screen edge, as a fraction of
/// the window dimension.
const SCROLL_REGION_INSET: f64 = 0.1;
/// Span of the scroll region, as a fraction of the window dimension.
const SCROLL_REGION_SPAN: f64 = 0.8;
/// Fraction of the region's span a single gesture moves by.
const SCROLL_FRACTION: f64 = 0.8;

const DEFAULT_ELEMENT_WAIT: Duration = Duration::from_secs(30);
const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(2);

/// Executor tuning knobs.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Bounded wait for locator resolution.
    pub element_wait: Duration,
    /// Delay applied after every execution attempt, success or not, so
    /// UI transitions complete before the next perception.
    pub settle_delay: Duration,
    /// Directory diagnostic screenshots are written to on failure.
    pub diagnostics_dir: PathBuf,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            element_wait: DEFAULT_ELEMENT_WAIT,
            settle_delay: DEFAULT_SETTLE_DELAY,
            diagnostics_dir: PathBuf::from("."),
        }
    }
}

/// Executes single actions against a device driver.
pub struct ActionExecutor {
    driver: Arc<dyn DeviceDriver>,
    config: ExecutorConfig,
}

impl ActionExecutor {
    /// Create an executor with default timing.
    pub fn new(driver: Arc<dyn DeviceDriver>) -> Self {
        Self::with_config(driver, ExecutorConfig::default())
    }

    /// Create an executor with explicit timing and diagnostics settings.
    pub fn with_config(driver: Arc<dyn DeviceDriver>, config: ExecutorConfig) -> Self {
        Self { driver, config }
    }

    /// Execute one action and normalize the result into an outcome.
    ///
    /// The settling delay runs after the attempt regardless of how it
    /// went, including terminal and malformed actions.
    pub async fn execute(&self, action: &UiAction) -> ExecutionOutcome {
        tracing::info!(
            action = %action.kind(),
            target = ?action.target(),
            "action execution started"
        );

        let outcome = self.dispatch(action).await;

        if !self.config.settle_delay.is_zero() {
            sleep(self.config.settle_delay).await;
        }

        match &outcome {
            ExecutionOutcome::Failed { reason, details } => {
                tracing::warn!(
                    action = %action.kind(),
                    reason = %reason,
                    details = %details,
                    "action execution failed"
                );
            }
            ExecutionOutcome::UnknownAction { raw } => {
                tracing::error!(
                    action = %action.kind(),
                    raw = %raw,
                    "unrecognized instruction, refusing to execute"
                );
            }
            other => {
                tracing::info!(
                    action = %action.kind(),
                    outcome = %other.label(),
                    "action execution completed"
                );
            }
        }

        outcome
    }

    async fn dispatch(&self, action: &UiAction) -> ExecutionOutcome {
        match action {
            UiAction::Click { by, value, .. } => self.run_click(*by, value).await,
            UiAction::Type {
                by, value, text, ..
            } => self.run_type(*by, value, text).await,
            UiAction::Scroll { direction, .. } => self.run_scroll(*direction).await,
            UiAction::PressKeycode { key_code, .. } => {
                self.run_device_op("press_keycode", self.driver.press_keycode(*key_code))
                    .await
            }
            UiAction::LaunchApp {
                package, activity, ..
            } => {
                self.run_device_op(
                    "launch_app",
                    self.driver.activate_app(package, activity.as_deref()),
                )
                .await
            }
            UiAction::TerminateApp { package, .. } => {
                self.run_device_op("terminate_app", self.driver.terminate_app(package))
                    .await
            }
            UiAction::GoalAchieved { .. } => ExecutionOutcome::GoalAchieved,
            UiAction::GoalImpossible { .. } => ExecutionOutcome::GoalImpossible,
            UiAction::PlannerError { message, .. } => {
                ExecutionOutcome::failed(FailureReason::Planner, message.clone())
            }
            UiAction::Malformed { action, detail } => ExecutionOutcome::failed(
                FailureReason::MalformedAction,
                format!("{}: {}", action, detail),
            ),
            UiAction::Unknown { raw, .. } => ExecutionOutcome::UnknownAction { raw: raw.clone() },
        }
    }

    async fn run_click(&self, by: LocatorStrategy, value: &LocatorValue) -> ExecutionOutcome {
        // COORDINATES bypasses element lookup and taps directly.
        if let LocatorValue::Point { x, y } = value {
            return self
                .run_device_op("click", self.driver.tap_point(*x, *y))
                .await;
        }

        let element = match self.resolve("click", by, value).await {
            Ok(element) => element,
            Err(outcome) => return outcome,
        };
        self.run_device_op("click", self.driver.click_element(&element))
            .await
    }

    async fn run_type(
        &self,
        by: LocatorStrategy,
        value: &LocatorValue,
        text: &str,
    ) -> ExecutionOutcome {
        let element = match self.resolve("type", by, value).await {
            Ok(element) => element,
            Err(outcome) => return outcome,
        };
        if let Err(err) = self.driver.send_keys(&element, text).await {
            return self.device_failure("type", err).await;
        }
        // Commit the input so the field change takes effect.
        self.run_device_op("type", self.driver.press_keycode(COMMIT_KEYCODE))
            .await
    }

    async fn run_scroll(&self, direction: ScrollDirection) -> ExecutionOutcome {
        let size = match self.driver.window_size().await {
            Ok(size) => size,
            Err(err) => return self.device_failure("scroll", err).await,
        };
        let region = ScrollRegion {
            left: (size.width as f64 * SCROLL_REGION_INSET) as i64,
            top: (size.height as f64 * SCROLL_REGION_INSET) as i64,
            width: (size.width as f64 * SCROLL_REGION_SPAN) as i64,
            height: (size.height as f64 * SCROLL_REGION_SPAN) as i64,
        };
        // The gesture is not verified here; whether content actually
        // moved is judged from the next perception.
        self.run_device_op(
            "scroll",
            self.driver.scroll(region, direction, SCROLL_FRACTION),
        )
        .await
    }

    async fn resolve(
        &self,
        action_kind: &str,
        by: LocatorStrategy,
        value: &LocatorValue,
    ) -> Result<ElementId, ExecutionOutcome> {
        let LocatorValue::Text(text) = value else {
            return Err(ExecutionOutcome::failed(
                FailureReason::MalformedAction,
                format!(
                    "{}: coordinate value where a locator is required",
                    action_kind
                ),
            ));
        };
        match self
            .driver
            .await_element(by, text, self.config.element_wait)
            .await
        {
            Ok(element) => Ok(element),
            Err(err) => Err(self.device_failure(action_kind, err).await),
        }
    }

    async fn run_device_op(
        &self,
        action_kind: &str,
        op: impl std::future::Future<Output = Result<(), DriverError>>,
    ) -> ExecutionOutcome {
        match op.await {
            Ok(()) => ExecutionOutcome::Success,
            Err(err) => self.device_failure(action_kind, err).await,
        }
    }

    async fn device_failure(&self, action_kind: &str, err: DriverError) -> ExecutionOutcome {
        let reason = if err.is_not_found() {
            FailureReason::ElementNotFound
        } else {
            FailureReason::Driver
        };
        self.capture_diagnostic(reason).await;
        tracing::warn!(
            action = %action_kind,
            reason = %reason,
            error = %err,
            "device operation failed"
        );
        ExecutionOutcome::failed(reason, err.to_string())
    }

    /// Best effort: a diagnostics failure must not mask the original error.
    async fn capture_diagnostic(&self, reason: FailureReason) {
        let path = self
            .config
            .diagnostics_dir
            .join(format!("execution_error_{}.png", reason));
        match self.driver.save_screenshot(&path).await {
            Ok(()) => {
                tracing::info!(path = %path.display(), "diagnostic screenshot saved");
            }
            Err(err) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to save diagnostic screenshot"
                );
            }
        }
    }
}
