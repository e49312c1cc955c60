// flowbot/src/pipeline/execution.rs

//! Contains `Pipeline::run()`, the routing state machine that drives steps one
//! at a time, following jump edges when a step's result matches one of its
//! routing patterns.

use crate::broadcast::StateBroadcaster;
use crate::config::RunnerConfig;
use crate::core::context::ExecutionContext;
use crate::core::state::TaskState;
use crate::error::{FlowError, FlowResult};
use crate::pipeline::definition::{Pipeline, Route};
use crate::pipeline::supervisor::StepSupervisor;
use serde_json::{Map, Value};
use tracing::{event, instrument, span, Instrument, Level};

/// Outcome of a run that reached `Success`.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
  /// Result of the last step executed.
  pub last_result: Option<Value>,
  /// The data bag at the end of the run.
  pub data: Map<String, Value>,
  /// Step indices in execution order, repeats included.
  pub executed: Vec<usize>,
  /// Final state per step index. Steps never reached stay `Pending`.
  pub step_states: Vec<TaskState>,
  /// Jump edges taken.
  pub jumps: usize,
}

impl RunReport {
  fn new(num_steps: usize) -> Self {
    Self {
      last_result: None,
      data: Map::new(),
      executed: Vec::new(),
      step_states: vec![TaskState::Pending; num_steps],
      jumps: 0,
    }
  }
}

impl Pipeline {
  /// Executes the pipeline from step 0.
  pub async fn run(
    &self,
    ctx: &mut ExecutionContext,
    events: &StateBroadcaster,
    config: &RunnerConfig,
  ) -> FlowResult<RunReport> {
    self.run_from(0, ctx, events, config).await
  }

  /// Executes the pipeline starting at `start`.
  ///
  /// Fails fast: the first terminal step failure ends the run with that
  /// failure. Completes once the cursor passes the last step.
  #[instrument(
    name = "Pipeline::run",
    skip_all,
    fields(num_steps = self.len(), start = start, max_jumps = ?config.max_jumps),
    err(Display)
  )]
  pub async fn run_from(
    &self,
    start: usize,
    ctx: &mut ExecutionContext,
    events: &StateBroadcaster,
    config: &RunnerConfig,
  ) -> FlowResult<RunReport> {
    if start > 0 && start >= self.len() {
      return Err(FlowError::Config {
        message: format!("start index {} is outside a pipeline of {} steps", start, self.len()),
      });
    }

    event!(Level::DEBUG, "Pipeline execution starting.");
    let supervisor = StepSupervisor::new(events, config.retry_backoff);
    let mut report = RunReport::new(self.len());
    let mut cursor = start;

    while let Some(spec) = self.steps.get(cursor) {
      ctx.current_step_index = cursor;
      report.executed.push(cursor);

      let step_span = span!(Level::INFO, "pipeline_step_execution", step_name = %spec.name, step_index = cursor);
      let result = match supervisor.run_step(spec, ctx).instrument(step_span).await {
        Ok(result) => result,
        Err(err) => {
          report.step_states[cursor] = TaskState::Failed;
          return Err(err);
        }
      };
      report.step_states[cursor] = TaskState::Success;

      cursor = match self.route(cursor, &result) {
        Route::Sequential(next) => next,
        Route::Jump { target, .. } => {
          report.jumps += 1;
          if let Some(limit) = config.max_jumps {
            if report.jumps > limit {
              event!(Level::ERROR, step_index = cursor, limit, "Jump limit exceeded.");
              return Err(FlowError::JumpLimitExceeded {
                step_index: cursor,
                limit,
              });
            }
          }
          event!(Level::DEBUG, from = cursor, to = target, "Jumping.");
          target
        }
      };
    }

    ctx.current_step_index = cursor;
    report.last_result = ctx.last_result.clone();
    report.data = ctx.data.clone();
    event!(
      Level::DEBUG,
      executed = report.executed.len(),
      jumps = report.jumps,
      "Pipeline execution completed successfully."
    );
    Ok(report)
  }
}
