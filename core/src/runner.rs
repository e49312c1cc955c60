// flowbot/src/runner.rs

//! Defines `FlowRunner`, which owns an actuator provider and a state stream and
//! executes playbooks end to end: one fresh actuator session and one
//! `ExecutionContext` per run, under the playbook's run-level deadline.

use crate::actuator::ActuatorProvider;
use crate::broadcast::{StateBroadcaster, Subscription};
use crate::config::RunnerConfig;
use crate::core::context::ExecutionContext;
use crate::core::state::StateTransition;
use crate::error::{FlowError, FlowResult};
use crate::pipeline::{Pipeline, RunReport};
use crate::playbook::Playbook;
use std::sync::Arc;
use tracing::{event, instrument, Level};

pub struct FlowRunner {
  provider: Arc<dyn ActuatorProvider>,
  events: StateBroadcaster,
  config: RunnerConfig,
}

impl FlowRunner {
  pub fn new(provider: Arc<dyn ActuatorProvider>) -> Self {
    Self {
      provider,
      events: StateBroadcaster::new(),
      config: RunnerConfig::default(),
    }
  }

  pub fn with_config(mut self, config: RunnerConfig) -> Self {
    self.config = config;
    self
  }

  pub fn config(&self) -> &RunnerConfig {
    &self.config
  }

  /// The stream every run of this runner publishes to.
  pub fn broadcaster(&self) -> &StateBroadcaster {
    &self.events
  }

  pub fn subscribe(&self) -> Subscription {
    self.events.subscribe()
  }

  pub fn unsubscribe(&self, subscription: Subscription) -> Vec<StateTransition> {
    self.events.unsubscribe(subscription)
  }

  /// Runs `playbook` to `Success` or to its first terminal failure.
  ///
  /// Configuration errors in the steps are reported before an actuator is
  /// acquired. The acquired actuator is always released; a release failure is
  /// logged and never replaces the run's own outcome.
  #[instrument(
    name = "FlowRunner::run",
    skip_all,
    fields(playbook = %playbook.name, num_steps = playbook.steps.len(), timeout_secs = playbook.timeout),
    err(Display)
  )]
  pub async fn run(&self, playbook: &Playbook) -> FlowResult<RunReport> {
    let pipeline = Pipeline::build(&playbook.steps)?;

    let actuator = self
      .provider
      .acquire()
      .await
      .map_err(|source| FlowError::ActuatorUnavailable { source })?;
    event!(Level::DEBUG, "Actuator acquired.");

    let mut ctx = ExecutionContext::new(actuator, playbook.initial_data.clone());
    let outcome = match playbook.run_deadline() {
      None => pipeline.run(&mut ctx, &self.events, &self.config).await,
      Some(deadline) => {
        let timed = tokio::time::timeout(deadline, pipeline.run(&mut ctx, &self.events, &self.config)).await;
        match timed {
          Ok(outcome) => outcome,
          Err(_elapsed) => {
            event!(Level::ERROR, step_index = ctx.current_step_index, "Run deadline elapsed.");
            Err(FlowError::RunTimeout {
              timeout_secs: playbook.timeout,
            })
          }
        }
      }
    };

    if let Err(e) = self.provider.release(ctx.into_actuator()).await {
      event!(Level::WARN, error = %e, "Failed to release actuator.");
    } else {
      event!(Level::DEBUG, "Actuator released.");
    }

    outcome
  }
}

impl std::fmt::Debug for FlowRunner {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("FlowRunner")
      .field("events", &self.events)
      .field("config", &self.config)
      .finish_non_exhaustive()
  }
}
