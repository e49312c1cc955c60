// src/lib.rs

//! Flowbot: a supervised, pattern-routed step pipeline for driving a
//! browser-like actuator from a declarative playbook.
//!
//! A playbook is an ordered list of steps (navigate, click, type, wait for a
//! pattern, extract data, evaluate a condition, send a protocol command).
//! Flowbot runs them one at a time, with:
//!  - Per-step bounded retry and an optional per-step deadline.
//!  - A multicast stream of lifecycle transitions (`Running`, `Failed`,
//!    `Retrying`, `Success`) any number of observers can subscribe to.
//!  - Dynamic routing: after a step succeeds, its result is structurally matched
//!    against the step's `next_step_patterns` and execution may jump to any
//!    step index, forward or backward.
//!  - A run-level deadline and a configurable ceiling on routing jumps.
//!
//! The actuator itself is external; implement [`Actuator`] and
//! [`ActuatorProvider`] for your driving surface.

pub mod actuator;
pub mod broadcast;
pub mod config;
pub mod core;
pub mod error;
pub mod matcher;
pub mod pipeline;
pub mod playbook;
pub mod runner;

// --- Re-exports for the Public API ---

pub use crate::actuator::{Actuator, ActuatorProvider, WaitOutcome};
pub use crate::broadcast::{StateBroadcaster, Subscription};
pub use crate::config::RunnerConfig;
pub use crate::core::context::ExecutionContext;
pub use crate::core::state::{StateTransition, TaskState};
pub use crate::core::step::{
  Condition, ExtractDescriptor, ExtractField, RoutingRule, StepDefinition, StepKind, StepSpec, TimeoutPolicy,
  WaitKind, WaitPattern,
};
pub use crate::error::{FlowError, FlowResult};
pub use crate::matcher::matches;
pub use crate::pipeline::{Pipeline, Route, RunReport, StepSupervisor};
pub use crate::playbook::Playbook;
pub use crate::runner::FlowRunner;

/*
    Core Workflow:
    1. Implement `Actuator` for your page-like surface and `ActuatorProvider`
       to open/close one session per run.
    2. Load a `Playbook` (`Playbook::load("flow.yml")`) or build one from
       `StepDefinition::of(StepKind::...)`.
    3. Create a `FlowRunner::new(Arc::new(provider))`, optionally
       `.with_config(RunnerConfig::from_env()?)`.
    4. `runner.subscribe()` for every observer that wants the state stream.
    5. `runner.run(&playbook).await` yields a `RunReport` or a terminal
       `FlowError::StepFailed { step_index, .. }` (or a run-level error).
    6. Release observers with `runner.unsubscribe(sub)`.
*/
