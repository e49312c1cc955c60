// flowbot/src/playbook.rs

//! Playbook schema and loading from YAML or JSON.

use crate::core::step::StepDefinition;
use crate::error::{FlowError, FlowResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_RUN_TIMEOUT_SECS: u64 = 300;

fn default_run_timeout() -> u64 {
  DEFAULT_RUN_TIMEOUT_SECS
}

/// An ordered list of steps plus the data and deadline of the run around them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Playbook {
  #[serde(default)]
  pub name: String,
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub initial_data: Map<String, Value>,
  /// Overall run deadline in seconds. `0` disables it.
  #[serde(default = "default_run_timeout")]
  pub timeout: u64,
  pub steps: Vec<StepDefinition>,
}

impl Playbook {
  pub fn new(steps: Vec<StepDefinition>) -> Self {
    Self {
      name: String::new(),
      description: String::new(),
      initial_data: Map::new(),
      timeout: DEFAULT_RUN_TIMEOUT_SECS,
      steps,
    }
  }

  pub fn with_initial_data(mut self, data: Map<String, Value>) -> Self {
    self.initial_data = data;
    self
  }

  pub fn with_timeout_secs(mut self, secs: u64) -> Self {
    self.timeout = secs;
    self
  }

  pub fn run_deadline(&self) -> Option<Duration> {
    (self.timeout > 0).then(|| Duration::from_secs(self.timeout))
  }

  pub fn from_yaml_str(source: &str) -> FlowResult<Self> {
    serde_yaml_ng::from_str(source).map_err(|e| FlowError::Playbook {
      message: format!("invalid YAML playbook: {}", e),
    })
  }

  pub fn from_json_str(source: &str) -> FlowResult<Self> {
    serde_json::from_str(source).map_err(|e| FlowError::Playbook {
      message: format!("invalid JSON playbook: {}", e),
    })
  }

  /// Loads a playbook file; `.json` is parsed as JSON, anything else as YAML.
  pub fn load(path: impl AsRef<Path>) -> FlowResult<Self> {
    let path = path.as_ref();
    tracing::debug!(path = %path.display(), "Loading playbook.");
    let source = std::fs::read_to_string(path)?;
    let is_json = path
      .extension()
      .and_then(|ext| ext.to_str())
      .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
      Self::from_json_str(&source)
    } else {
      Self::from_yaml_str(&source)
    }
  }
}
