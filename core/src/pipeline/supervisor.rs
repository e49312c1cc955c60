// flowbot/src/pipeline/supervisor.rs

//! Bounded retry and optional deadline around a single step.

use crate::broadcast::StateBroadcaster;
use crate::core::context::ExecutionContext;
use crate::core::state::{StateTransition, TaskState};
use crate::core::step::StepSpec;
use crate::error::{FlowError, FlowResult};
use crate::pipeline::dispatch;
use serde_json::Value;
use std::time::Duration;
use tracing::{event, instrument, Level};

/// Runs one step to a terminal outcome, publishing every attempt.
///
/// Per attempt: `Running`, then `Success` or `Failed`. A retryable failure with
/// budget left is followed by `Retrying` and a fresh attempt. `retry_count` on
/// the context is reset when the step starts and never exceeds `max_retries`.
pub struct StepSupervisor<'a> {
  events: &'a StateBroadcaster,
  retry_backoff: Duration,
}

impl<'a> StepSupervisor<'a> {
  pub fn new(events: &'a StateBroadcaster, retry_backoff: Duration) -> Self {
    Self { events, retry_backoff }
  }

  #[instrument(
    name = "StepSupervisor::run_step",
    skip_all,
    fields(
      step_index = spec.index,
      step_name = %spec.name,
      kind = spec.kind.name(),
      max_retries = spec.max_retries,
      timeout_ms = spec.timeout.as_millis(),
    )
  )]
  pub async fn run_step(&self, spec: &StepSpec, ctx: &mut ExecutionContext) -> FlowResult<Value> {
    ctx.retry_count = 0;

    loop {
      self.events.publish(StateTransition::new(spec.index, TaskState::Running));

      match self.attempt(spec, ctx).await {
        Ok(result) => {
          ctx.last_result = Some(result.clone());
          ctx.current_step_index = spec.index;
          self
            .events
            .publish(StateTransition::new(spec.index, TaskState::Success).with_result(result.clone()));
          event!(Level::DEBUG, retries = ctx.retry_count, "Step succeeded.");
          return Ok(result);
        }
        Err(err) => {
          self
            .events
            .publish(StateTransition::new(spec.index, TaskState::Failed).with_error(err.to_string()));

          if err.is_retryable() && ctx.retry_count < spec.max_retries {
            ctx.retry_count += 1;
            event!(
              Level::WARN,
              error = %err,
              retry = ctx.retry_count,
              "Step attempt failed, retrying."
            );
            self.events.publish(StateTransition::new(spec.index, TaskState::Retrying));
            if !self.retry_backoff.is_zero() {
              tokio::time::sleep(self.retry_backoff).await;
            }
            continue;
          }

          event!(Level::ERROR, error = %err, retries = ctx.retry_count, "Step failed terminally.");
          return Err(FlowError::StepFailed {
            step_index: spec.index,
            attempts: ctx.retry_count + 1,
            source: Box::new(err),
          });
        }
      }
    }
  }

  async fn attempt(&self, spec: &StepSpec, ctx: &mut ExecutionContext) -> FlowResult<Value> {
    match spec.timeout.as_duration() {
      None => dispatch::execute(spec, ctx).await,
      Some(limit) => match tokio::time::timeout(limit, dispatch::execute(spec, ctx)).await {
        Ok(outcome) => outcome,
        // Dropping the attempt future cancels the in-flight actuator call.
        Err(_elapsed) => Err(FlowError::StepTimeout {
          timeout_ms: spec.timeout.as_millis(),
        }),
      },
    }
  }
}
