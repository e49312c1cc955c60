pub mod context;
pub mod state;
pub mod step;

// Re-export key types for easier access from other flowbot modules (and lib.rs)
pub use context::ExecutionContext;
pub use state::{StateTransition, TaskState};
pub use step::{
  Condition, ExtractDescriptor, ExtractField, RoutingRule, StepDefinition, StepKind, StepSpec, TimeoutPolicy,
  WaitKind, WaitPattern,
};
