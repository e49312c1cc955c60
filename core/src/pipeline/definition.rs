// flowbot/src/pipeline/definition.rs

//! Contains the `Pipeline` struct: the validated step list with its sequential
//! and pattern-triggered edges, and the routing decision taken after a step
//! succeeds.

use crate::core::step::{StepDefinition, StepSpec};
use crate::error::{FlowError, FlowResult};
use crate::matcher::matches;
use serde_json::Value;
use tracing::{event, Level};

/// Where execution continues after a successful step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
  /// No rule matched. Continue at `index + 1`, which may be past the end.
  Sequential(usize),
  /// Rule `rule` matched; continue at `target`.
  Jump { rule: usize, target: usize },
}

/// An executable step graph.
///
/// Every step has a default edge to the following index. Steps with
/// `next_step_patterns` additionally carry jump edges, checked in declaration
/// order; the first matching pattern wins. Jump targets are validated when the
/// pipeline is built, so routing never leaves `[0, len)`.
#[derive(Debug, Clone)]
pub struct Pipeline {
  pub(crate) steps: Vec<StepSpec>,
}

impl Pipeline {
  /// Builds a pipeline from playbook step records.
  ///
  /// Fails on the first unknown kind, malformed parameter set, or out-of-range
  /// jump target, naming the offending step.
  pub fn build(definitions: &[StepDefinition]) -> FlowResult<Self> {
    let steps = definitions
      .iter()
      .enumerate()
      .map(|(index, def)| StepSpec::from_definition(index, def))
      .collect::<FlowResult<Vec<_>>>()?;
    Self::from_specs(steps)
  }

  /// Builds a pipeline from already-typed steps. Each spec's `index` must equal
  /// its position.
  pub fn from_specs(steps: Vec<StepSpec>) -> FlowResult<Self> {
    let len = steps.len();
    for (position, spec) in steps.iter().enumerate() {
      if spec.index != position {
        return Err(FlowError::InvalidStep {
          step_index: position,
          message: format!("step declares index {} but sits at position {}", spec.index, position),
        });
      }
      if let Some(rule) = spec.next_step_patterns.iter().find(|r| r.goto_step >= len) {
        return Err(FlowError::InvalidRoute {
          step_index: position,
          target: rule.goto_step,
          len,
        });
      }
    }
    event!(Level::DEBUG, num_steps = len, "Pipeline built.");
    Ok(Self { steps })
  }

  pub fn len(&self) -> usize {
    self.steps.len()
  }

  pub fn is_empty(&self) -> bool {
    self.steps.is_empty()
  }

  pub fn steps(&self) -> &[StepSpec] {
    &self.steps
  }

  pub fn step(&self, index: usize) -> Option<&StepSpec> {
    self.steps.get(index)
  }

  /// Decides the next index after step `index` succeeded with `result`.
  pub fn route(&self, index: usize, result: &Value) -> Route {
    let Some(spec) = self.steps.get(index) else {
      return Route::Sequential(index + 1);
    };
    for (rule_idx, rule) in spec.next_step_patterns.iter().enumerate() {
      if matches(result, &rule.pattern) {
        event!(
          Level::DEBUG,
          step_index = index,
          rule = rule_idx,
          target = rule.goto_step,
          "Routing rule matched."
        );
        return Route::Jump {
          rule: rule_idx,
          target: rule.goto_step,
        };
      }
    }
    Route::Sequential(index + 1)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::core::step::StepKind;
  use serde_json::json;

  fn click(sel: &str) -> StepDefinition {
    StepDefinition::of(StepKind::Click { selector: sel.into() })
  }

  #[test]
  fn first_matching_rule_wins() {
    let pipeline = Pipeline::build(&[
      click("#a")
        .route(json!({"type": "navigation"}), 2)
        .route(json!({"type": "click"}), 1)
        .route(json!({"selector": "#a"}), 2),
      click("#b"),
      click("#c"),
    ])
    .unwrap();
    let result = json!({"type": "click", "selector": "#a", "status": "success"});
    assert_eq!(pipeline.route(0, &result), Route::Jump { rule: 1, target: 1 });
  }

  #[test]
  fn no_match_falls_through() {
    let pipeline = Pipeline::build(&[click("#a").route(json!({"type": "extraction"}), 0), click("#b")]).unwrap();
    assert_eq!(pipeline.route(0, &json!({"type": "click"})), Route::Sequential(1));
    assert_eq!(pipeline.route(1, &json!({"type": "click"})), Route::Sequential(2));
  }

  #[test]
  fn out_of_range_jump_is_rejected_at_build_time() {
    let err = Pipeline::build(&[click("#a"), click("#b").route(json!({}), 2)]).unwrap_err();
    match err {
      FlowError::InvalidRoute { step_index, target, len } => {
        assert_eq!((step_index, target, len), (1, 2, 2));
      }
      other => panic!("expected InvalidRoute, got {other:?}"),
    }
  }

  #[test]
  fn specs_must_sit_at_their_declared_index() {
    let spec = StepSpec::from_definition(3, &click("#a")).unwrap();
    assert!(matches!(
      Pipeline::from_specs(vec![spec]),
      Err(FlowError::InvalidStep { step_index: 0, .. })
    ));
  }
}
