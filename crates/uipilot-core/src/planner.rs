//! Planner trait
//!
//! The planner proposes exactly one action per turn from the goal, the
//! current perceived state and optional feedback about the previous
//! turn. It is infallible by contract: anything that goes wrong on the
//! planning side is reported in-band as a `PlannerError` action so the
//! engine keeps a single decision path.

use async_trait::async_trait;

use crate::action::UiAction;
use crate::perception::PerceivedState;

#[async_trait]
pub trait Planner: Send {
    /// Propose the next action for `goal` given the current screen.
    ///
    /// `previous_outcome` carries a feedback note when the last action
    /// failed, and is `None` on the first turn and after successes.
    async fn plan(
        &mut self,
        goal: &str,
        state: &PerceivedState,
        previous_outcome: Option<&str>,
    ) -> UiAction;
}
