// flowbot/src/error.rs
use anyhow::Error as AnyhowError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FlowError {
  /// The actuator call for a step attempt raised an error.
  #[error("Actuator call failed: {source}")]
  Actuator {
    #[source]
    source: AnyhowError,
  },

  #[error("Step attempt exceeded its deadline of {timeout_ms}ms")]
  StepTimeout { timeout_ms: u64 },

  #[error("Unknown step kind '{kind}' at step {step_index}")]
  UnknownStepKind { step_index: usize, kind: String },

  #[error("Invalid definition for step {step_index}: {message}")]
  InvalidStep { step_index: usize, message: String },

  #[error("Step {step_index} routes to index {target}, but the playbook only has {len} steps")]
  InvalidRoute { step_index: usize, target: usize, len: usize },

  #[error("Step {step_index} requires field '{field}', which is not present")]
  MissingField { step_index: usize, field: String },

  /// Terminal failure of a step. Ends the whole run.
  #[error("Step {step_index} failed after {attempts} attempt(s): {source}")]
  StepFailed {
    step_index: usize,
    attempts: u32,
    #[source]
    source: Box<FlowError>,
  },

  #[error("Routing from step {step_index} exceeded the limit of {limit} jumps")]
  JumpLimitExceeded { step_index: usize, limit: usize },

  #[error("Run did not finish within {timeout_secs}s")]
  RunTimeout { timeout_secs: u64 },

  #[error("Could not acquire an actuator: {source}")]
  ActuatorUnavailable {
    #[source]
    source: AnyhowError,
  },

  #[error("Playbook error: {message}")]
  Playbook { message: String },

  #[error("I/O error: {0}")]
  Io(#[from] std::io::Error),

  #[error("Configuration error: {message}")]
  Config { message: String },

  #[error("Internal flowbot error: {0}")]
  Internal(String),
}

impl FlowError {
  /// Whether the step supervisor may re-attempt after this error.
  ///
  /// Only actuator failures and per-step deadlines are transient. Configuration
  /// problems fail the step on first occurrence.
  pub fn is_retryable(&self) -> bool {
    matches!(self, FlowError::Actuator { .. } | FlowError::StepTimeout { .. })
  }

  /// The step index a terminal failure originated from, if any.
  pub fn step_index(&self) -> Option<usize> {
    match self {
      FlowError::UnknownStepKind { step_index, .. }
      | FlowError::InvalidStep { step_index, .. }
      | FlowError::InvalidRoute { step_index, .. }
      | FlowError::MissingField { step_index, .. }
      | FlowError::StepFailed { step_index, .. }
      | FlowError::JumpLimitExceeded { step_index, .. } => Some(*step_index),
      _ => None,
    }
  }
}

impl From<AnyhowError> for FlowError {
  fn from(err: AnyhowError) -> Self {
    // Actuators may hand back a FlowError they got from us (e.g. a nested call);
    // unwrap it so it keeps its own retry classification.
    match err.downcast::<FlowError>() {
      Ok(flow_err) => flow_err,
      Err(source) => FlowError::Actuator { source },
    }
  }
}

pub type FlowResult<T, E = FlowError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn only_actuator_and_timeout_errors_are_retryable() {
    assert!(FlowError::from(anyhow::anyhow!("boom")).is_retryable());
    assert!(FlowError::StepTimeout { timeout_ms: 10 }.is_retryable());
    assert!(!FlowError::MissingField {
      step_index: 1,
      field: "x".into()
    }
    .is_retryable());
    assert!(!FlowError::UnknownStepKind {
      step_index: 0,
      kind: "hover".into()
    }
    .is_retryable());
  }

  #[test]
  fn anyhow_wrapping_preserves_flow_errors() {
    let wrapped = anyhow::Error::new(FlowError::MissingField {
      step_index: 2,
      field: "price".into(),
    });
    match FlowError::from(wrapped) {
      FlowError::MissingField { step_index, field } => {
        assert_eq!(step_index, 2);
        assert_eq!(field, "price");
      }
      other => panic!("expected MissingField, got {other:?}"),
    }
  }

  #[test]
  fn step_failed_reports_its_index() {
    let err = FlowError::StepFailed {
      step_index: 4,
      attempts: 1,
      source: Box::new(FlowError::StepTimeout { timeout_ms: 5 }),
    };
    assert_eq!(err.step_index(), Some(4));
    assert!(err.to_string().contains("Step 4 failed after 1 attempt(s)"));
  }
}
