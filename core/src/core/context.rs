// flowbot/src/core/context.rs

//! Mutable per-run state.

use crate::actuator::Actuator;
use serde_json::{Map, Value};

/// State of one pipeline run.
///
/// Created per run and owned by whoever drives the run; it is never shared
/// between concurrent runs. The actuator session inside is exclusively owned
/// by this context until [`ExecutionContext::into_actuator`] hands it back.
pub struct ExecutionContext {
  actuator: Box<dyn Actuator>,
  /// Seeded from the playbook's `initial_data`, extended by `extract_data` steps.
  pub data: Map<String, Value>,
  pub current_step_index: usize,
  /// Re-attempts made for the step currently executing. Reset per step.
  pub retry_count: u32,
  pub last_result: Option<Value>,
}

impl ExecutionContext {
  pub fn new(actuator: Box<dyn Actuator>, initial_data: Map<String, Value>) -> Self {
    Self {
      actuator,
      data: initial_data,
      current_step_index: 0,
      retry_count: 0,
      last_result: None,
    }
  }

  pub fn actuator(&self) -> &dyn Actuator {
    self.actuator.as_ref()
  }

  /// Merges extracted fields into the data bag, overwriting existing keys.
  pub fn merge_data(&mut self, fields: &Map<String, Value>) {
    for (key, value) in fields {
      self.data.insert(key.clone(), value.clone());
    }
  }

  /// Ends the context, returning the actuator for release.
  pub fn into_actuator(self) -> Box<dyn Actuator> {
    self.actuator
  }
}

impl std::fmt::Debug for ExecutionContext {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ExecutionContext")
      .field("data", &self.data)
      .field("current_step_index", &self.current_step_index)
      .field("retry_count", &self.retry_count)
      .field("last_result", &self.last_result)
      .finish_non_exhaustive()
  }
}
