//! Execution outcomes and terminal run results
//!
//! `ExecutionOutcome` is what the executor hands back for one action;
//! `RunResult` is the single terminal status of a whole run. The engine is
//! the only consumer of outcomes and the only producer of run results.

use std::fmt;

/// Why an action execution failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// The locator did not resolve within the bounded wait.
    ElementNotFound,
    /// Any other device-communication fault.
    Driver,
    /// Known action tag with invalid fields; never attempted.
    MalformedAction,
    /// A planner error action reached the executor.
    Planner,
}

impl FailureReason {
    /// Stable string used in feedback notes, logs and diagnostic file names.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ElementNotFound => "element_not_found",
            Self::Driver => "driver_error",
            Self::MalformedAction => "malformed_action",
            Self::Planner => "planner_error",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized result of executing one action.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    /// The device operation completed.
    Success,
    /// Terminal signal passed through from a `GOAL_ACHIEVED` action.
    GoalAchieved,
    /// Terminal signal passed through from a `GOAL_IMPOSSIBLE` action.
    GoalImpossible,
    /// The action failed; the run continues with this fed back to the planner.
    Failed {
        reason: FailureReason,
        details: String,
    },
    /// Unrecognized instruction; the run fails closed.
    UnknownAction { raw: String },
}

impl ExecutionOutcome {
    pub fn failed(reason: FailureReason, details: impl Into<String>) -> Self {
        Self::Failed {
            reason,
            details: details.into(),
        }
    }

    /// Short label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::GoalAchieved => "goal_achieved",
            Self::GoalImpossible => "goal_impossible",
            Self::Failed { .. } => "failed",
            Self::UnknownAction { .. } => "unknown_action",
        }
    }
}

/// Terminal status of a run, produced exactly once at loop exit.
#[derive(Debug, Clone, PartialEq)]
pub enum RunResult {
    /// Every named condition was confirmed on a fresh perception.
    GoalAchieved,
    /// The planner concluded the goal cannot be reached.
    GoalImpossible,
    /// The planner failed (parse error, backend fault, or an
    /// unrecognized instruction failing closed).
    PlannerFailure(String),
    /// Screenshot or element-tree capture failed; no grounded decision is
    /// possible, so this is fatal and not retried.
    PerceptionFailure,
    /// The turn budget ran out without a terminal signal.
    MaxTurnsReached,
    /// Setup/teardown fault outside the loop proper.
    SystemError(String),
}

impl RunResult {
    /// Stable status label for the final status line.
    pub fn status_label(&self) -> &'static str {
        match self {
            Self::GoalAchieved => "goal_achieved",
            Self::GoalImpossible => "goal_impossible",
            Self::PlannerFailure(_) => "planner_failure",
            Self::PerceptionFailure => "perception_failure",
            Self::MaxTurnsReached => "max_turns_reached",
            Self::SystemError(_) => "system_error",
        }
    }

    pub fn is_goal_achieved(&self) -> bool {
        matches!(self, Self::GoalAchieved)
    }
}

impl fmt::Display for RunResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PlannerFailure(reason) => write!(f, "planner_failure: {}", reason),
            Self::SystemError(reason) => write!(f, "system_error: {}", reason),
            other => f.write_str(other.status_label()),
        }
    }
}
