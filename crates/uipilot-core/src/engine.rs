//! Engine module
//!
//! The engine drives the perceive → plan → execute turn loop:
//! - Captures a fresh perception each turn; capture failure is fatal
//! - Short-circuits terminal planner signals before execution
//! - Feeds execution failures back to the planner as a note and re-plans
//! - Enforces the turn budget
//! - Tears the session down exactly once on every exit path
//!
//! Re-planning with a failure note is the only retry mechanism; the
//! engine never replays an action on its own.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::action::UiAction;
use crate::driver::{DeviceDriver, DriverError};
use crate::executor::{ActionExecutor, ExecutorConfig};
use crate::outcome::{ExecutionOutcome, FailureReason, RunResult};
use crate::perception::PerceivedState;
use crate::planner::Planner;

const MAX_LOG_TEXT_CHARS: usize = 2_000;
const DEFAULT_MAX_TURNS: usize = 20;

fn truncate_for_log(input: &str, max_chars: usize) -> String {
    let char_count = input.chars().count();
    if char_count <= max_chars {
        return input.to_string();
    }
    let mut preview: String = input.chars().take(max_chars).collect();
    preview.push_str(&format!("... [truncated, total_chars={}]", char_count));
    preview
}

/// Engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Hard cap on perceive → plan → execute cycles per run.
    pub max_turns: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_turns: DEFAULT_MAX_TURNS,
        }
    }
}

/// Final report for one run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub result: RunResult,
    /// Turns actually started, including the one that terminated the run.
    pub turns: usize,
    /// Correlation id attached to every log line of the run.
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Feedback text handed to the planner after a failed execution.
pub fn failure_note(action: &UiAction, reason: FailureReason, details: &str) -> String {
    let target = action.target().unwrap_or_else(|| "unknown".to_string());
    format!(
        "Last action '{}' targeting '{}' failed because: {}. Details: {}. \
         Re-evaluate the current screen and plan the next step.",
        action.kind(),
        target,
        reason,
        details
    )
}

/// The engine - wires planner + executor into the turn loop
pub struct Engine {
    planner: Box<dyn Planner>,
    driver: Arc<dyn DeviceDriver>,
    executor: ActionExecutor,
    config: EngineConfig,
}

impl Engine {
    /// Create an engine with default turn budget and executor timing.
    pub fn new(planner: Box<dyn Planner>, driver: Arc<dyn DeviceDriver>) -> Self {
        Self::with_config(
            planner,
            driver,
            EngineConfig::default(),
            ExecutorConfig::default(),
        )
    }

    /// Create an engine with explicit configuration.
    pub fn with_config(
        planner: Box<dyn Planner>,
        driver: Arc<dyn DeviceDriver>,
        config: EngineConfig,
        executor_config: ExecutorConfig,
    ) -> Self {
        let executor = ActionExecutor::with_config(driver.clone(), executor_config);
        Self {
            planner,
            driver,
            executor,
            config,
        }
    }

    /// Run the turn loop to completion for one goal.
    ///
    /// Consumes the engine: one engine, one session, one run. The device
    /// session is closed exactly once before this returns, whatever the
    /// exit path was.
    pub async fn run(mut self, goal: &str) -> RunReport {
        let run_id = uuid::Uuid::new_v4().to_string();
        let started_at = Utc::now();
        tracing::info!(
            run_id = %run_id,
            goal = %goal,
            max_turns = self.config.max_turns,
            "run started"
        );

        let mut turns = 0;
        let result = self.drive(goal, &mut turns).await;

        if let Err(err) = self.driver.quit().await {
            tracing::warn!(run_id = %run_id, error = %err, "session teardown failed");
        }

        tracing::info!(
            run_id = %run_id,
            result = %result,
            turns = turns,
            "run finished"
        );
        RunReport {
            result,
            turns,
            run_id,
            started_at,
            finished_at: Utc::now(),
        }
    }

    async fn drive(&mut self, goal: &str, turns: &mut usize) -> RunResult {
        let mut previous_note: Option<String> = None;

        for turn in 1..=self.config.max_turns {
            *turns = turn;
            tracing::info!(turn, max_turns = self.config.max_turns, "turn started");

            let state = match self.perceive().await {
                Ok(state) => state,
                Err(err) => {
                    // No grounded decision is possible without a perception.
                    tracing::error!(turn, error = %err, "perception failed");
                    return RunResult::PerceptionFailure;
                }
            };

            let action = self
                .planner
                .plan(goal, &state, previous_note.as_deref())
                .await;
            previous_note = None;
            tracing::info!(
                turn,
                action = %action.kind(),
                target = ?action.target(),
                rationale = ?action.rationale(),
                "action planned"
            );

            match &action {
                UiAction::GoalAchieved { .. } => return RunResult::GoalAchieved,
                UiAction::GoalImpossible { .. } => return RunResult::GoalImpossible,
                UiAction::PlannerError {
                    message,
                    raw_response,
                } => {
                    tracing::error!(
                        turn,
                        message = %message,
                        raw_response = %truncate_for_log(raw_response, MAX_LOG_TEXT_CHARS),
                        "planner failed"
                    );
                    return RunResult::PlannerFailure(message.clone());
                }
                _ => {}
            }

            match self.executor.execute(&action).await {
                ExecutionOutcome::Success => {}
                ExecutionOutcome::GoalAchieved => return RunResult::GoalAchieved,
                ExecutionOutcome::GoalImpossible => return RunResult::GoalImpossible,
                ExecutionOutcome::Failed { reason, details } => {
                    previous_note = Some(failure_note(&action, reason, &details));
                }
                ExecutionOutcome::UnknownAction { raw } => {
                    tracing::error!(
                        turn,
                        raw = %truncate_for_log(&raw, MAX_LOG_TEXT_CHARS),
                        "unrecognized instruction, failing closed"
                    );
                    return RunResult::PlannerFailure(format!(
                        "unknown_action: {}",
                        action.kind()
                    ));
                }
            }
        }

        RunResult::MaxTurnsReached
    }

    async fn perceive(&self) -> Result<PerceivedState, DriverError> {
        let screenshot = self.driver.screenshot().await?;
        let ui_tree = self.driver.page_source().await?;
        Ok(PerceivedState::new(screenshot, ui_tree))
    }
}
