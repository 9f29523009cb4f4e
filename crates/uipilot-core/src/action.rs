//! Action vocabulary and wire schema
//!
//! The model replies with one JSON object tagged by an `action` key. That
//! output is an untrusted protocol: everything is validated here, at the
//! boundary, before anything reaches the device. Decoding is total; a
//! reply that survives JSON parsing always maps to some [`UiAction`]
//! variant, with malformed fields and unrecognized tags represented as
//! first-class variants instead of errors.

use std::fmt;

use serde_json::Value;

/// How a target element is identified on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocatorStrategy {
    /// Android resource id.
    Id,
    /// Accessibility label (content description).
    AccessibilityId,
    /// XPath query over the element tree.
    Xpath,
    /// Widget class name.
    ClassName,
    /// Raw screen coordinates; bypasses element lookup entirely.
    Coordinates,
}

impl LocatorStrategy {
    /// Parse the wire spelling (`"ID"`, `"ACCESSIBILITY_ID"`, ...),
    /// case-insensitively.
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_uppercase().as_str() {
            "ID" => Some(Self::Id),
            "ACCESSIBILITY_ID" => Some(Self::AccessibilityId),
            "XPATH" => Some(Self::Xpath),
            "CLASS_NAME" => Some(Self::ClassName),
            "COORDINATES" => Some(Self::Coordinates),
            _ => None,
        }
    }

    /// Canonical wire spelling.
    pub fn as_wire(&self) -> &'static str {
        match self {
            Self::Id => "ID",
            Self::AccessibilityId => "ACCESSIBILITY_ID",
            Self::Xpath => "XPATH",
            Self::ClassName => "CLASS_NAME",
            Self::Coordinates => "COORDINATES",
        }
    }

    /// WebDriver `using` value for element resolution.
    /// `None` for [`LocatorStrategy::Coordinates`], which never resolves an element.
    pub fn webdriver_using(&self) -> Option<&'static str> {
        match self {
            Self::Id => Some("id"),
            Self::AccessibilityId => Some("accessibility id"),
            Self::Xpath => Some("xpath"),
            Self::ClassName => Some("class name"),
            Self::Coordinates => None,
        }
    }
}

impl fmt::Display for LocatorStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

/// The value paired with a locator strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocatorValue {
    /// Selector text for the element strategies.
    Text(String),
    /// Screen point for [`LocatorStrategy::Coordinates`].
    Point { x: i64, y: i64 },
}

impl LocatorValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn point(x: i64, y: i64) -> Self {
        Self::Point { x, y }
    }
}

impl fmt::Display for LocatorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Point { x, y } => write!(f, "[{}, {}]", x, y),
        }
    }
}

/// Direction for a scroll gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollDirection {
    Up,
    Down,
    Left,
    Right,
}

impl ScrollDirection {
    /// Parse the wire spelling, case-insensitively.
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "up" => Some(Self::Up),
            "down" => Some(Self::Down),
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            _ => None,
        }
    }

    /// Canonical wire spelling.
    pub fn as_wire(&self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

impl fmt::Display for ScrollDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

/// One atomic UI action proposed by the planner.
///
/// The first eight variants mirror the wire tags the model is instructed to
/// use. `PlannerError` doubles as the wire `ERROR` tag and the planner's own
/// normalization of parse/backend failures. `Unknown` and `Malformed` are
/// produced only by [`UiAction::decode`] and never by a conforming model:
/// `Unknown` is an unrecognized tag (executed as a fail-closed hard stop),
/// `Malformed` is a known tag whose fields failed validation (executed as
/// `Failed{malformed_action}` without touching the device).
#[derive(Debug, Clone, PartialEq)]
pub enum UiAction {
    /// Tap a located element, or a raw point for `COORDINATES`.
    Click {
        by: LocatorStrategy,
        value: LocatorValue,
        thought: Option<String>,
    },
    /// Enter text into a located element, then press the commit keycode.
    Type {
        by: LocatorStrategy,
        value: LocatorValue,
        text: String,
        thought: Option<String>,
    },
    /// Directional gesture over the central screen region.
    Scroll {
        direction: ScrollDirection,
        thought: Option<String>,
    },
    /// Press a hardware/soft keycode.
    PressKeycode {
        key_code: i64,
        thought: Option<String>,
    },
    /// Bring an app to the foreground by package id.
    LaunchApp {
        package: String,
        activity: Option<String>,
        thought: Option<String>,
    },
    /// Stop an app by package id.
    TerminateApp {
        package: String,
        thought: Option<String>,
    },
    /// Terminal: the goal is confirmed achieved on the current perception.
    GoalAchieved { thought: Option<String> },
    /// Terminal: the goal cannot be reached.
    GoalImpossible { thought: Option<String> },
    /// Terminal: the planner could not produce a usable action.
    PlannerError {
        message: String,
        raw_response: String,
    },
    /// Unrecognized wire tag; the run fails closed on this.
    Unknown { action: String, raw: String },
    /// Known tag with invalid fields; reported back to the planner, never executed.
    Malformed { action: String, detail: String },
}

impl UiAction {
    /// Decode one parsed JSON value into an action. Total: never panics,
    /// never errors.
    pub fn decode(value: &Value) -> UiAction {
        let raw = value.to_string();
        let Some(object) = value.as_object() else {
            return UiAction::Unknown {
                action: "unknown".to_string(),
                raw,
            };
        };
        let Some(tag) = object.get("action").and_then(Value::as_str) else {
            return UiAction::Unknown {
                action: "unknown".to_string(),
                raw,
            };
        };
        let thought = non_empty_str(object.get("thought"));

        match tag {
            "click" => match decode_locator(object) {
                Ok((by, value)) => UiAction::Click { by, value, thought },
                Err(detail) => malformed(tag, detail),
            },
            "type" => match decode_locator(object) {
                Ok((by, value)) => match non_empty_str(object.get("text")) {
                    Some(text) => UiAction::Type {
                        by,
                        value,
                        text,
                        thought,
                    },
                    None => malformed(tag, "'text' must be a non-empty string"),
                },
                Err(detail) => malformed(tag, detail),
            },
            "scroll" => match object.get("direction").and_then(Value::as_str) {
                Some(dir) => match ScrollDirection::parse(dir) {
                    Some(direction) => UiAction::Scroll { direction, thought },
                    None => malformed(
                        tag,
                        format!("'direction' must be one of up/down/left/right, got '{}'", dir),
                    ),
                },
                None => malformed(tag, "missing 'direction'"),
            },
            "press_keycode" => match object.get("key_code").and_then(Value::as_i64) {
                Some(key_code) => UiAction::PressKeycode { key_code, thought },
                None => malformed(tag, "'key_code' must be an integer"),
            },
            "launch_app" => match non_empty_str(object.get("package")) {
                Some(package) => UiAction::LaunchApp {
                    package,
                    activity: non_empty_str(object.get("activity")),
                    thought,
                },
                None => malformed(tag, "'package' must be a non-empty string"),
            },
            "terminate_app" => match non_empty_str(object.get("package")) {
                Some(package) => UiAction::TerminateApp { package, thought },
                None => malformed(tag, "'package' must be a non-empty string"),
            },
            "GOAL_ACHIEVED" => UiAction::GoalAchieved { thought },
            "GOAL_IMPOSSIBLE" => UiAction::GoalImpossible { thought },
            "ERROR" => UiAction::PlannerError {
                message: non_empty_str(object.get("message"))
                    .unwrap_or_else(|| "unspecified planner error".to_string()),
                raw_response: object
                    .get("raw_response")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or(raw),
            },
            other => UiAction::Unknown {
                action: other.to_string(),
                raw,
            },
        }
    }

    /// Wire tag for logging and feedback notes. For `Unknown`/`Malformed`
    /// this is the tag the model actually sent.
    pub fn kind(&self) -> &str {
        match self {
            Self::Click { .. } => "click",
            Self::Type { .. } => "type",
            Self::Scroll { .. } => "scroll",
            Self::PressKeycode { .. } => "press_keycode",
            Self::LaunchApp { .. } => "launch_app",
            Self::TerminateApp { .. } => "terminate_app",
            Self::GoalAchieved { .. } => "GOAL_ACHIEVED",
            Self::GoalImpossible { .. } => "GOAL_IMPOSSIBLE",
            Self::PlannerError { .. } => "ERROR",
            Self::Unknown { action, .. } => action,
            Self::Malformed { action, .. } => action,
        }
    }

    /// What the action is aimed at, for feedback notes. `None` when the
    /// variant has no meaningful target.
    pub fn target(&self) -> Option<String> {
        match self {
            Self::Click { value, .. } | Self::Type { value, .. } => Some(value.to_string()),
            Self::Scroll { direction, .. } => Some(direction.to_string()),
            Self::PressKeycode { key_code, .. } => Some(key_code.to_string()),
            Self::LaunchApp { package, .. } | Self::TerminateApp { package, .. } => {
                Some(package.clone())
            }
            _ => None,
        }
    }

    /// Observability-only rationale supplied by the model. Never consulted
    /// for control flow.
    pub fn rationale(&self) -> Option<&str> {
        match self {
            Self::Click { thought, .. }
            | Self::Type { thought, .. }
            | Self::Scroll { thought, .. }
            | Self::PressKeycode { thought, .. }
            | Self::LaunchApp { thought, .. }
            | Self::TerminateApp { thought, .. }
            | Self::GoalAchieved { thought }
            | Self::GoalImpossible { thought } => thought.as_deref(),
            _ => None,
        }
    }

    /// Terminal signals end the run before the executor is consulted.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::GoalAchieved { .. } | Self::GoalImpossible { .. } | Self::PlannerError { .. }
        )
    }
}

fn malformed(tag: &str, detail: impl Into<String>) -> UiAction {
    UiAction::Malformed {
        action: tag.to_string(),
        detail: detail.into(),
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn decode_locator(
    object: &serde_json::Map<String, Value>,
) -> Result<(LocatorStrategy, LocatorValue), String> {
    let by_raw = object
        .get("by")
        .and_then(Value::as_str)
        .ok_or_else(|| "missing 'by'".to_string())?;
    let by = LocatorStrategy::parse(by_raw)
        .ok_or_else(|| format!("unsupported locator strategy '{}'", by_raw))?;

    let value = object.get("value");
    match by {
        LocatorStrategy::Coordinates => {
            let point = value
                .and_then(Value::as_array)
                .filter(|items| items.len() == 2)
                .and_then(|items| {
                    let x = items[0].as_i64()?;
                    let y = items[1].as_i64()?;
                    Some(LocatorValue::Point { x, y })
                })
                .ok_or_else(|| {
                    "'value' must be a two-integer array for COORDINATES".to_string()
                })?;
            Ok((by, point))
        }
        _ => {
            let text = non_empty_str(value)
                .ok_or_else(|| "'value' must be a non-empty string".to_string())?;
            Ok((by, LocatorValue::Text(text)))
        }
    }
}
