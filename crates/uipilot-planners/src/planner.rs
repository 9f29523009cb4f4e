//! Vision LLM planner.
//!
//! Builds the multimodal turn prompt (goal, screenshot, UI tree and
//! optional failure feedback), sends it to a `VisionClient` and decodes
//! the reply into exactly one `UiAction`. Planning never fails out of
//! band: timeouts, transport errors and unparseable replies all come
//! back as a `PlannerError` action.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use uipilot_core::action::UiAction;
use uipilot_core::perception::PerceivedState;
use uipilot_core::planner::Planner;

use crate::llm::{GenerateRequest, ModelPart, ModelTurn, VisionClient};

const MAX_PROMPT_LOG_CHARS: usize = 4_000;
const MAX_REPLY_LOG_CHARS: usize = 8_000;

const DEFAULT_SYSTEM_POLICY: &str = r#"You are an automation agent operating a real Android device through its UI.
Each turn you receive:
1. The persistent User Goal.
2. A Screenshot of the current screen.
3. The UI Tree (XML) with precise element attributes such as resource-id, content-desc, text and checked, including elements that are currently off screen. Use it to pick accurate locators.
4. Optionally, a Previous Action Outcome describing how your last action went.

Decide the single best next action. Think step by step in the "thought" field, then output exactly one JSON object and nothing else. When the goal is demonstrably complete, answer GOAL_ACHIEVED; when it cannot be reached, answer GOAL_IMPOSSIBLE.

State verification rules:
When the goal requires elements to be in a given state (for example checked or ON), read the checked attribute of each target element in the UI Tree before acting. If an element is already in the desired state, do not click it; note that in your thought and move on to the next unfulfilled part of the goal. If it is not, click that specific element. Declare GOAL_ACHIEVED only after a fresh UI Tree confirms every element named by the goal is in the required state. If the tree still shows the old state after your click, click again or reconsider; if repeated attempts leave the state wrong, declare GOAL_IMPOSSIBLE.

Navigation:
When the goal names an item in the current app's menu, locate it by its visible text or content-desc inside the active window. Do not detour into system apps such as Settings unless the goal says so.

Scrolling:
If the element you need is absent from the UI Tree, scroll toward it. If it is still absent after a scroll, or a click right after a scroll failed according to the Previous Action Outcome, scroll again in the same direction. Keep going until the element appears or scrolling stops changing the screen. Click only elements whose presence the UI Tree confirms.

Allowed JSON action formats:
1. Click: {"action": "click", "by": "<strategy>", "value": "<locator>", "thought": "<reasoning>"}
   (strategy is one of ID, ACCESSIBILITY_ID, XPATH, CLASS_NAME. Prefer ID or ACCESSIBILITY_ID from the tree; XPATH by visible text works well for list items. As a last resort use COORDINATES with value [x, y].)
2. Type: {"action": "type", "text": "<text>", "by": "<strategy>", "value": "<locator>", "thought": "<reasoning>"}
   (Target an editable field. ENTER (keycode 66) is sent automatically after the text.)
3. Scroll: {"action": "scroll", "direction": "<up|down|left|right>", "thought": "<reasoning>"}
   (Scroll only to reveal an element you need next; if a previous scroll did not reveal it, say why you are not at the end yet.)
4. Press keycode: {"action": "press_keycode", "key_code": <int>, "thought": "<reasoning>"}
   (For example 4 for BACK, 66 for ENTER. Use only for navigation or dismissing the keyboard.)
5. Launch app: {"action": "launch_app", "package": "<package>", "activity": "<activity>", "thought": "<reasoning>"}
6. Terminate app: {"action": "terminate_app", "package": "<package>", "thought": "<reasoning>"}
7. Goal achieved: {"action": "GOAL_ACHIEVED", "thought": "<what confirms completion on the current screen>"}
8. Goal impossible: {"action": "GOAL_IMPOSSIBLE", "thought": "<why the goal cannot be reached from here>"}

Always reply with exactly one valid JSON object and take by and value from the UI Tree.
Example: for typing into a title field whose tree shows
<node class="android.widget.EditText" resource-id="android:id/edit" text="" />
the correct action is
{"action": "type", "text": "My New Title", "by": "ID", "value": "android:id/edit", "thought": "The edit field is uniquely identified by its resource-id."}"#;

/// Vision planner configuration.
#[derive(Debug, Clone)]
pub struct VisionPlannerConfig {
    /// System policy sent with every request.
    pub policy: String,
    /// Upper bound on one planning call, network time included.
    pub timeout_secs: u64,
}

impl Default for VisionPlannerConfig {
    fn default() -> Self {
        Self {
            policy: DEFAULT_SYSTEM_POLICY.to_string(),
            timeout_secs: 60,
        }
    }
}

/// LLM-backed planner
pub struct VisionLlmPlanner<C: VisionClient> {
    pub client: C,
    pub config: VisionPlannerConfig,
    history: Vec<ModelTurn>,
}

impl<C: VisionClient> VisionLlmPlanner<C> {
    pub fn new(client: C, config: VisionPlannerConfig) -> Self {
        Self {
            client,
            config,
            history: Vec::new(),
        }
    }
}

fn build_user_turn(
    goal: &str,
    state: &PerceivedState,
    previous_outcome: Option<&str>,
) -> ModelTurn {
    let mut parts = vec![
        ModelPart::Text(format!("User Goal: {}", goal)),
        ModelPart::Text("Current Mobile Screen (Screenshot):".to_string()),
        ModelPart::InlinePng(state.screenshot.clone()),
        ModelPart::Text(format!(
            "UI Tree (XML Structure - for precise element attributes):\n```xml\n{}\n```",
            state.ui_tree
        )),
    ];
    if let Some(note) = previous_outcome {
        parts.push(ModelPart::Text(format!("Previous Action Outcome: {}", note)));
    }
    parts.push(ModelPart::Text(
        "What is the next action (JSON format)? Provide a precise action with reasoning."
            .to_string(),
    ));
    ModelTurn::user(parts)
}

#[async_trait]
impl<C: VisionClient> Planner for VisionLlmPlanner<C> {
    async fn plan(
        &mut self,
        goal: &str,
        state: &PerceivedState,
        previous_outcome: Option<&str>,
    ) -> UiAction {
        let turn = build_user_turn(goal, state, previous_outcome);
        let mut turns = self.history.clone();
        turns.push(turn.clone());

        info!(
            goal_chars = goal.len(),
            tree_chars = state.ui_tree.len(),
            screenshot_bytes = state.screenshot.len(),
            history_turns = self.history.len(),
            has_feedback = previous_outcome.is_some(),
            "planner request prepared"
        );
        if tracing::enabled!(tracing::Level::DEBUG) {
            debug!(
                user_prompt = %truncate_for_log(&turn.text(), MAX_PROMPT_LOG_CHARS),
                "planner prompt"
            );
        }

        let request = GenerateRequest {
            system: self.config.policy.clone(),
            turns,
        };

        let reply = match tokio::time::timeout(
            Duration::from_secs(self.config.timeout_secs),
            self.client.generate(request),
        )
        .await
        {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => {
                return UiAction::PlannerError {
                    message: e.to_string(),
                    raw_response: String::new(),
                }
            }
            Err(_) => {
                return UiAction::PlannerError {
                    message: format!("planner timeout after {}s", self.config.timeout_secs),
                    raw_response: String::new(),
                }
            }
        };

        if tracing::enabled!(tracing::Level::DEBUG) {
            debug!(
                reply = %truncate_for_log(&reply, MAX_REPLY_LOG_CHARS),
                "planner raw reply"
            );
        }

        // The exchange is recorded before decoding so later turns still
        // see what the model said even when the reply was unusable.
        self.history.push(turn);
        self.history.push(ModelTurn::model(reply.clone()));

        let Some(value) = extract_action_json(&reply) else {
            return UiAction::PlannerError {
                message: "parse_error".to_string(),
                raw_response: reply,
            };
        };
        let action = UiAction::decode(&value);
        info!(action = %action.kind(), "planner action decoded");
        action
    }
}

/// Pull the action object out of a model reply. Tries a fenced code
/// block first, then the whole reply, then the widest brace span.
fn extract_action_json(reply: &str) -> Option<serde_json::Value> {
    if let Some(fenced) = extract_json_fence(reply) {
        if let Some(value) = parse_object(&fenced) {
            return Some(value);
        }
    }
    if let Some(value) = parse_object(reply.trim()) {
        return Some(value);
    }
    let span = extract_json(reply)?;
    parse_object(&span)
}

fn parse_object(text: &str) -> Option<serde_json::Value> {
    let value: serde_json::Value = serde_json::from_str(text).ok()?;
    value.is_object().then_some(value)
}

fn extract_json_fence(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let start = trimmed.find("```")?;
    let after_start = &trimmed[start + 3..];
    let after_lang = if let Some(pos) = after_start.find('\n') {
        &after_start[pos + 1..]
    } else {
        return None;
    };
    let end = after_lang.rfind("```")?;
    let candidate = after_lang[..end].trim();
    if candidate.starts_with('{') || candidate.starts_with('[') {
        Some(candidate.to_string())
    } else {
        None
    }
}

fn extract_json(text: &str) -> Option<String> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(text[start..=end].to_string())
}

fn truncate_for_log(input: &str, max_chars: usize) -> String {
    let char_count = input.chars().count();
    if char_count <= max_chars {
        return input.to_string();
    }
    let mut preview: String = input.chars().take(max_chars).collect();
    preview.push_str(&format!("... [truncated, total_chars={}]", char_count));
    preview
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::path::Path;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use bytes::Bytes;

    use uipilot_core::action::{LocatorStrategy, LocatorValue, ScrollDirection};
    use uipilot_core::driver::{DeviceDriver, DriverError, ElementId, ScrollRegion, WindowSize};
    use uipilot_core::engine::{Engine, EngineConfig};
    use uipilot_core::executor::ExecutorConfig;
    use uipilot_core::outcome::RunResult;

    use crate::llm::{LlmError, MockVisionClient};

    fn state() -> PerceivedState {
        PerceivedState::new(Bytes::from_static(b"\x89PNG-bytes"), "<hierarchy/>")
    }

    fn planner_with_reply(reply: &str) -> VisionLlmPlanner<MockVisionClient> {
        VisionLlmPlanner::new(
            MockVisionClient {
                response: reply.to_string(),
            },
            VisionPlannerConfig::default(),
        )
    }

    #[test]
    fn test_fenced_reply_decodes_to_action() {
        tokio_test::block_on(async {
            let mut planner = planner_with_reply(
                "```json\n{\"action\": \"click\", \"by\": \"ACCESSIBILITY_ID\", \
                 \"value\": \"Wi-Fi\", \"thought\": \"open the toggle\"}\n```",
            );

            let action = planner.plan("enable wifi", &state(), None).await;

            match action {
                UiAction::Click { by, value, thought } => {
                    assert_eq!(by, LocatorStrategy::AccessibilityId);
                    assert_eq!(value, LocatorValue::Text("Wi-Fi".to_string()));
                    assert_eq!(thought.as_deref(), Some("open the toggle"));
                }
                other => panic!("expected click action, got {:?}", other),
            }
        });
    }

    #[test]
    fn test_bare_json_reply_decodes() {
        tokio_test::block_on(async {
            let mut planner = planner_with_reply(
                "{\"action\": \"scroll\", \"direction\": \"down\", \"thought\": \"look lower\"}",
            );

            let action = planner.plan("find the pay button", &state(), None).await;

            match action {
                UiAction::Scroll { direction, .. } => {
                    assert_eq!(direction, ScrollDirection::Down);
                }
                other => panic!("expected scroll action, got {:?}", other),
            }
        });
    }

    #[test]
    fn test_prose_wrapped_object_is_extracted() {
        tokio_test::block_on(async {
            let mut planner = planner_with_reply(
                "The keyboard is covering the list, so I will dismiss it. \
                 {\"action\": \"press_keycode\", \"key_code\": 4, \"thought\": \"go back\"} \
                 Let me know how it goes.",
            );

            let action = planner.plan("open the list", &state(), None).await;

            match action {
                UiAction::PressKeycode { key_code, .. } => assert_eq!(key_code, 4),
                other => panic!("expected press_keycode action, got {:?}", other),
            }
        });
    }

    #[test]
    fn test_unparseable_reply_becomes_parse_error() {
        tokio_test::block_on(async {
            let reply = "I could not determine a single next step.";
            let mut planner = planner_with_reply(reply);

            let action = planner.plan("enable wifi", &state(), None).await;

            match action {
                UiAction::PlannerError {
                    message,
                    raw_response,
                } => {
                    assert_eq!(message, "parse_error");
                    assert_eq!(raw_response, reply);
                }
                other => panic!("expected planner error, got {:?}", other),
            }
        });
    }

    struct FailingVisionClient;

    #[async_trait]
    impl VisionClient for FailingVisionClient {
        async fn generate(&self, _request: GenerateRequest) -> Result<String, LlmError> {
            Err(LlmError::Http("connection refused".to_string()))
        }
    }

    #[test]
    fn test_backend_error_becomes_planner_error() {
        tokio_test::block_on(async {
            let mut planner =
                VisionLlmPlanner::new(FailingVisionClient, VisionPlannerConfig::default());

            let action = planner.plan("enable wifi", &state(), None).await;

            match action {
                UiAction::PlannerError {
                    message,
                    raw_response,
                } => {
                    assert_eq!(message, "http error: connection refused");
                    assert!(raw_response.is_empty());
                }
                other => panic!("expected planner error, got {:?}", other),
            }
        });
    }

    struct SlowVisionClient;

    #[async_trait]
    impl VisionClient for SlowVisionClient {
        async fn generate(&self, _request: GenerateRequest) -> Result<String, LlmError> {
            tokio::time::sleep(Duration::from_millis(1300)).await;
            Ok("{\"action\": \"GOAL_ACHIEVED\"}".to_string())
        }
    }

    #[test]
    fn test_timeout_becomes_planner_error() {
        tokio_test::block_on(async {
            let mut planner = VisionLlmPlanner::new(
                SlowVisionClient,
                VisionPlannerConfig {
                    timeout_secs: 1,
                    ..VisionPlannerConfig::default()
                },
            );

            let action = planner.plan("enable wifi", &state(), None).await;

            match action {
                UiAction::PlannerError { message, .. } => {
                    assert_eq!(message, "planner timeout after 1s");
                }
                other => panic!("expected planner error, got {:?}", other),
            }
        });
    }

    struct RecordingVisionClient {
        requests: Arc<Mutex<Vec<GenerateRequest>>>,
        response: String,
    }

    #[async_trait]
    impl VisionClient for RecordingVisionClient {
        async fn generate(&self, request: GenerateRequest) -> Result<String, LlmError> {
            self.requests.lock().unwrap().push(request);
            Ok(self.response.clone())
        }
    }

    #[test]
    fn test_history_is_replayed_on_later_turns() {
        tokio_test::block_on(async {
            let requests = Arc::new(Mutex::new(Vec::new()));
            let mut planner = VisionLlmPlanner::new(
                RecordingVisionClient {
                    requests: requests.clone(),
                    response: "{\"action\": \"scroll\", \"direction\": \"down\"}".to_string(),
                },
                VisionPlannerConfig::default(),
            );

            planner.plan("find the pay button", &state(), None).await;
            planner.plan("find the pay button", &state(), None).await;

            let requests = requests.lock().unwrap();
            assert_eq!(requests[0].turns.len(), 1);
            assert_eq!(requests[1].turns.len(), 3);
            assert_eq!(requests[1].turns[0].role, "user");
            assert_eq!(requests[1].turns[1].role, "model");
            assert_eq!(requests[1].turns[2].role, "user");
        });
    }

    #[test]
    fn test_parse_failure_is_still_recorded_in_history() {
        tokio_test::block_on(async {
            let requests = Arc::new(Mutex::new(Vec::new()));
            let mut planner = VisionLlmPlanner::new(
                RecordingVisionClient {
                    requests: requests.clone(),
                    response: "no json here".to_string(),
                },
                VisionPlannerConfig::default(),
            );

            let first = planner.plan("enable wifi", &state(), None).await;
            planner.plan("enable wifi", &state(), None).await;

            assert!(matches!(first, UiAction::PlannerError { .. }));
            let requests = requests.lock().unwrap();
            assert_eq!(requests[1].turns.len(), 3);
            assert_eq!(requests[1].turns[1].text(), "no json here");
        });
    }

    #[test]
    fn test_feedback_note_lands_between_tree_and_question() {
        tokio_test::block_on(async {
            let requests = Arc::new(Mutex::new(Vec::new()));
            let mut planner = VisionLlmPlanner::new(
                RecordingVisionClient {
                    requests: requests.clone(),
                    response: "{\"action\": \"scroll\", \"direction\": \"down\"}".to_string(),
                },
                VisionPlannerConfig::default(),
            );

            let note = "Last action 'click' targeting 'Pay' failed because: element_not_found.";
            planner.plan("pay the invoice", &state(), Some(note)).await;

            let requests = requests.lock().unwrap();
            let prompt = requests[0].turns[0].text();
            assert!(prompt.contains("User Goal: pay the invoice"));
            let tree_at = prompt.find("```xml").unwrap();
            let note_at = prompt.find("Previous Action Outcome:").unwrap();
            let question_at = prompt.find("What is the next action (JSON format)?").unwrap();
            assert!(tree_at < note_at);
            assert!(note_at < question_at);
            assert!(prompt.contains(note));
        });
    }

    #[test]
    fn test_default_policy_covers_decoder_contract() {
        for token in [
            "\"click\"",
            "\"type\"",
            "\"scroll\"",
            "\"press_keycode\"",
            "\"launch_app\"",
            "\"terminate_app\"",
            "GOAL_ACHIEVED",
            "GOAL_IMPOSSIBLE",
            "\"by\"",
            "\"value\"",
            "\"text\"",
            "\"direction\"",
            "\"key_code\"",
            "\"package\"",
            "\"activity\"",
            "\"thought\"",
            "ACCESSIBILITY_ID",
            "XPATH",
            "CLASS_NAME",
            "COORDINATES",
        ] {
            assert!(
                DEFAULT_SYSTEM_POLICY.contains(token),
                "policy must mention {}",
                token
            );
        }
    }

    struct ToggleDriver {
        toggles: Mutex<Vec<bool>>,
        clicks: Mutex<Vec<String>>,
        /// Index whose switch ignores clicks, for non-convergence tests.
        stuck: Option<usize>,
    }

    impl ToggleDriver {
        fn new(count: usize) -> Self {
            Self::with_states(vec![false; count])
        }

        fn with_states(states: Vec<bool>) -> Self {
            Self {
                toggles: Mutex::new(states),
                clicks: Mutex::new(Vec::new()),
                stuck: None,
            }
        }

        fn with_stuck(states: Vec<bool>, stuck: usize) -> Self {
            Self {
                stuck: Some(stuck),
                ..Self::with_states(states)
            }
        }

        fn tree(&self) -> String {
            let toggles = self.toggles.lock().unwrap();
            let mut tree = String::from("<hierarchy>");
            for (i, on) in toggles.iter().enumerate() {
                tree.push_str(&format!(
                    "<Switch text=\"Toggle {}\" checked=\"{}\"/>",
                    i + 1,
                    on
                ));
            }
            tree.push_str("</hierarchy>");
            tree
        }
    }

    #[async_trait]
    impl DeviceDriver for ToggleDriver {
        async fn screenshot(&self) -> Result<Bytes, DriverError> {
            Ok(Bytes::from_static(b"\x89PNG-toggles"))
        }

        async fn page_source(&self) -> Result<String, DriverError> {
            Ok(self.tree())
        }

        async fn await_element(
            &self,
            _strategy: LocatorStrategy,
            value: &str,
            _timeout: Duration,
        ) -> Result<ElementId, DriverError> {
            let toggles = self.toggles.lock().unwrap();
            let index = (1..=toggles.len())
                .find(|i| value == format!("Toggle {}", i))
                .ok_or_else(|| DriverError::ElementNotFound(value.to_string()))?;
            Ok(ElementId::new(format!("toggle-{}", index - 1)))
        }

        async fn tap_point(&self, _x: i64, _y: i64) -> Result<(), DriverError> {
            Ok(())
        }

        async fn click_element(&self, element: &ElementId) -> Result<(), DriverError> {
            self.clicks.lock().unwrap().push(element.to_string());
            let index: usize = element
                .as_str()
                .trim_start_matches("toggle-")
                .parse()
                .map_err(|_| DriverError::Protocol("bad element id".to_string()))?;
            if self.stuck != Some(index) {
                self.toggles.lock().unwrap()[index] = true;
            }
            Ok(())
        }

        async fn send_keys(&self, _element: &ElementId, _text: &str) -> Result<(), DriverError> {
            Ok(())
        }

        async fn press_keycode(&self, _key_code: i64) -> Result<(), DriverError> {
            Ok(())
        }

        async fn activate_app(
            &self,
            _package: &str,
            _activity: Option<&str>,
        ) -> Result<(), DriverError> {
            Ok(())
        }

        async fn terminate_app(&self, _package: &str) -> Result<(), DriverError> {
            Ok(())
        }

        async fn window_size(&self) -> Result<WindowSize, DriverError> {
            Ok(WindowSize {
                width: 1080,
                height: 2400,
            })
        }

        async fn scroll(
            &self,
            _region: ScrollRegion,
            _direction: ScrollDirection,
            _fraction: f64,
        ) -> Result<(), DriverError> {
            Ok(())
        }

        async fn save_screenshot(&self, _path: &Path) -> Result<(), DriverError> {
            Ok(())
        }

        async fn quit(&self) -> Result<(), DriverError> {
            Ok(())
        }
    }

    /// Plays the model side of the loop honestly: clicks the first
    /// toggle the tree still shows as off, claims success only when a
    /// fresh tree shows none.
    struct ToggleOracleClient;

    #[async_trait]
    impl VisionClient for ToggleOracleClient {
        async fn generate(&self, request: GenerateRequest) -> Result<String, LlmError> {
            let prompt = request
                .turns
                .last()
                .map(|turn| turn.text())
                .unwrap_or_default();
            let next_off = (1..=3).find(|i| {
                prompt.contains(&format!("text=\"Toggle {}\" checked=\"false\"", i))
            });
            let reply = match next_off {
                Some(i) => format!(
                    "```json\n{{\"action\": \"click\", \"by\": \"ACCESSIBILITY_ID\", \
                     \"value\": \"Toggle {}\", \"thought\": \"toggle {} is still off\"}}\n```",
                    i, i
                ),
                None => "{\"action\": \"GOAL_ACHIEVED\", \
                         \"thought\": \"all three toggles are on\"}"
                    .to_string(),
            };
            Ok(reply)
        }
    }

    fn toggle_engine(driver: Arc<ToggleDriver>, max_turns: usize) -> Engine {
        let planner = VisionLlmPlanner::new(ToggleOracleClient, VisionPlannerConfig::default());
        Engine::with_config(
            Box::new(planner),
            driver,
            EngineConfig { max_turns },
            ExecutorConfig {
                element_wait: Duration::from_millis(10),
                settle_delay: Duration::ZERO,
                diagnostics_dir: std::env::temp_dir(),
            },
        )
    }

    #[test]
    fn test_three_toggle_goal_completes_through_engine() {
        tokio_test::block_on(async {
            let driver = Arc::new(ToggleDriver::new(3));
            let engine = toggle_engine(driver.clone(), 10);

            let report = engine.run("turn on the first three toggles").await;

            assert!(matches!(report.result, RunResult::GoalAchieved));
            assert_eq!(report.turns, 4);
            let clicks = driver.clicks.lock().unwrap();
            assert_eq!(
                clicks.as_slice(),
                ["toggle-0", "toggle-1", "toggle-2"]
            );
        });
    }

    #[test]
    fn test_already_on_toggle_is_not_clicked() {
        tokio_test::block_on(async {
            let driver = Arc::new(ToggleDriver::with_states(vec![false, false, true]));
            let engine = toggle_engine(driver.clone(), 10);

            let report = engine.run("turn on the first three toggles").await;

            // Two clicks, then success is confirmed on a fresh tree.
            assert!(matches!(report.result, RunResult::GoalAchieved));
            assert_eq!(report.turns, 3);
            let clicks = driver.clicks.lock().unwrap();
            assert_eq!(clicks.as_slice(), ["toggle-0", "toggle-1"]);
        });
    }

    #[test]
    fn test_stuck_toggle_never_claims_success() {
        tokio_test::block_on(async {
            let driver = Arc::new(ToggleDriver::with_stuck(vec![false, false, false], 1));
            let engine = toggle_engine(driver.clone(), 6);

            let report = engine.run("turn on the first three toggles").await;

            assert_eq!(report.result, RunResult::MaxTurnsReached);
            assert_eq!(report.turns, 6);
            // Every turn after the first keeps retrying the stuck switch.
            let clicks = driver.clicks.lock().unwrap();
            assert_eq!(clicks[0], "toggle-0");
            assert!(clicks[1..].iter().all(|c| c == "toggle-1"));
        });
    }
}
