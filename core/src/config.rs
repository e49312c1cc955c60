// flowbot/src/config.rs

use crate::error::{FlowError, FlowResult};
use dotenvy::dotenv;
use std::env;
use std::time::Duration;

pub const DEFAULT_MAX_JUMPS: usize = 1_000;

pub const ENV_RETRY_BACKOFF_MS: &str = "FLOWBOT_RETRY_BACKOFF_MS";
pub const ENV_MAX_JUMPS: &str = "FLOWBOT_MAX_JUMPS";

/// Runner-wide knobs that are not part of any playbook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerConfig {
  /// Fixed delay between a `Retrying` transition and the next attempt.
  pub retry_backoff: Duration,
  /// Maximum routing jumps taken in one run. `None` lets a run oscillate
  /// until the run-level deadline stops it.
  pub max_jumps: Option<usize>,
}

impl Default for RunnerConfig {
  fn default() -> Self {
    Self {
      retry_backoff: Duration::ZERO,
      max_jumps: Some(DEFAULT_MAX_JUMPS),
    }
  }
}

impl RunnerConfig {
  pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
    self.retry_backoff = backoff;
    self
  }

  pub fn with_max_jumps(mut self, max_jumps: Option<usize>) -> Self {
    self.max_jumps = max_jumps;
    self
  }

  /// Reads overrides from the environment (and a `.env` file if present).
  /// Unset variables keep their defaults.
  pub fn from_env() -> FlowResult<Self> {
    dotenv().ok();
    let mut config = Self::default();

    if let Ok(raw) = env::var(ENV_RETRY_BACKOFF_MS) {
      let ms = raw.trim().parse::<u64>().map_err(|e| FlowError::Config {
        message: format!("Invalid {}='{}': {}", ENV_RETRY_BACKOFF_MS, raw, e),
      })?;
      config.retry_backoff = Duration::from_millis(ms);
    }

    if let Ok(raw) = env::var(ENV_MAX_JUMPS) {
      config.max_jumps = parse_max_jumps(&raw)?;
    }

    tracing::debug!(?config, "Runner configuration loaded.");
    Ok(config)
  }
}

fn parse_max_jumps(raw: &str) -> FlowResult<Option<usize>> {
  let trimmed = raw.trim();
  if trimmed.eq_ignore_ascii_case("unlimited") || trimmed.eq_ignore_ascii_case("none") {
    return Ok(None);
  }
  trimmed.parse::<usize>().map(Some).map_err(|e| FlowError::Config {
    message: format!("Invalid {}='{}': {}", ENV_MAX_JUMPS, raw, e),
  })
}
