//! # uipilot Core
//!
//! Turn-loop protocol and deterministic logic for driving a mobile device UI
//! from a vision-language model.
//!
//! This crate contains:
//! - UiAction vocabulary, locator types and strict wire decoding
//! - ExecutionOutcome / RunResult contracts
//! - Planner / DeviceDriver abstractions
//! - ActionExecutor (action -> device operation) and the turn-loop Engine
//!
//! This crate does NOT care about:
//! - Which model backend proposes actions
//! - Which automation wire protocol the device speaks
//! - How a goal reaches the process (CLI, config, environment)

pub mod action;
pub mod driver;
pub mod engine;
pub mod executor;
pub mod outcome;
pub mod perception;
pub mod planner;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::action::{LocatorStrategy, LocatorValue, ScrollDirection, UiAction};
    pub use crate::driver::{DeviceDriver, DriverError, ElementId, ScrollRegion, WindowSize};
    pub use crate::engine::{failure_note, Engine, EngineConfig, RunReport};
    pub use crate::executor::{ActionExecutor, ExecutorConfig};
    pub use crate::outcome::{ExecutionOutcome, FailureReason, RunResult};
    pub use crate::perception::PerceivedState;
    pub use crate::planner::Planner;
}

// Re-export key types at crate root
pub use action::{LocatorStrategy, LocatorValue, ScrollDirection, UiAction};
pub use driver::{DeviceDriver, DriverError, ElementId, ScrollRegion, WindowSize};
pub use engine::{Engine, EngineConfig, RunReport};
pub use executor::{ActionExecutor, ExecutorConfig};
pub use outcome::{ExecutionOutcome, FailureReason, RunResult};
pub use perception::PerceivedState;
pub use planner::Planner;
