// flowbot/src/actuator.rs

//! The capability surface steps drive, and the session acquire/release pair.
//!
//! Implementations live outside this crate (a CDP-backed browser page, a
//! scripted fake in tests). Errors are plain `anyhow::Error`; the step
//! supervisor decides whether they are retried.

use crate::core::step::{ExtractDescriptor, WaitKind};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Result of `wait_for_condition`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaitOutcome {
  pub matched: bool,
  /// Kind-specific detail (current url, selector, ...).
  #[serde(default)]
  pub detail: Map<String, Value>,
}

impl WaitOutcome {
  pub fn matched() -> Self {
    Self {
      matched: true,
      detail: Map::new(),
    }
  }

  pub fn unmatched() -> Self {
    Self {
      matched: false,
      detail: Map::new(),
    }
  }

  pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
    self.detail.insert(key.into(), value.into());
    self
  }
}

/// A controllable page-like surface.
#[async_trait]
pub trait Actuator: Send + Sync {
  async fn navigate(&self, url: &str) -> anyhow::Result<Value>;

  async fn click(&self, selector: &str) -> anyhow::Result<Value>;

  async fn fill(&self, selector: &str, text: &str) -> anyhow::Result<Value>;

  /// Waits up to `timeout_ms` for the condition.
  ///
  /// Must not fail merely because the condition was not met in time; report
  /// `matched: false` instead. The step-level deadline wraps this whole call.
  async fn wait_for_condition(&self, kind: WaitKind, value: &str, timeout_ms: u64) -> anyhow::Result<WaitOutcome>;

  /// Reads every field of `descriptor`, returning field name → value.
  /// A selector that matches nothing yields `null` for its field.
  async fn extract(&self, descriptor: &ExtractDescriptor) -> anyhow::Result<Map<String, Value>>;

  async fn send_protocol_command(&self, name: &str, params: &Value) -> anyhow::Result<Value>;
}

/// Opens and closes actuator sessions. One session is acquired per run.
#[async_trait]
pub trait ActuatorProvider: Send + Sync {
  async fn acquire(&self) -> anyhow::Result<Box<dyn Actuator>>;

  async fn release(&self, actuator: Box<dyn Actuator>) -> anyhow::Result<()>;
}
