// flowbot/src/core/state.rs

//! Lifecycle states of a step and the transition events published for them.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{SystemTime, UNIX_EPOCH};

/// Lifecycle state of a single step.
///
/// `Pending → Running → {Success | Failed → Retrying → Running}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
  /// Not yet attempted in this run. Never re-entered once left.
  Pending,
  Running,
  Success,
  Failed,
  Retrying,
}

impl TaskState {
  pub fn as_str(&self) -> &'static str {
    match self {
      TaskState::Pending => "pending",
      TaskState::Running => "running",
      TaskState::Success => "success",
      TaskState::Failed => "failed",
      TaskState::Retrying => "retrying",
    }
  }
}

impl std::fmt::Display for TaskState {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

/// One published lifecycle transition. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateTransition {
  pub step_index: usize,
  pub state: TaskState,
  /// Step result payload, present on `Success`.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub result: Option<Value>,
  /// Rendered error, present on `Failed`.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
  /// Seconds since the Unix epoch.
  pub timestamp: f64,
}

impl StateTransition {
  pub fn new(step_index: usize, state: TaskState) -> Self {
    Self {
      step_index,
      state,
      result: None,
      error: None,
      timestamp: now_secs(),
    }
  }

  pub fn with_result(mut self, result: Value) -> Self {
    self.result = Some(result);
    self
  }

  pub fn with_error(mut self, error: impl Into<String>) -> Self {
    self.error = Some(error.into());
    self
  }
}

fn now_secs() -> f64 {
  SystemTime::now()
    .duration_since(UNIX_EPOCH)
    .map(|d| d.as_secs_f64())
    .unwrap_or_default()
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn transition_serializes_with_snake_case_state() {
    let t = StateTransition::new(3, TaskState::Success).with_result(json!({"type": "click"}));
    let v = serde_json::to_value(&t).unwrap();
    assert_eq!(v["step_index"], 3);
    assert_eq!(v["state"], "success");
    assert_eq!(v["result"]["type"], "click");
    assert!(v.get("error").is_none());
    assert!(t.timestamp > 0.0);
  }
}
