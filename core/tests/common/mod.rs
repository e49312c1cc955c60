// tests/common/mod.rs
#![allow(dead_code)] // Allow unused code in this common test module

use async_trait::async_trait;
use flowbot::{
  Actuator, ActuatorProvider, ExecutionContext, ExtractDescriptor, StateTransition, TaskState, WaitKind, WaitOutcome,
};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::Level;

// --- Scripted replies ---

/// What the scripted actuator does for one call.
#[derive(Clone, Debug)]
pub enum Reply {
  Ok(Value),
  Fail(String),
  /// Sleeps (tokio time) and then succeeds.
  Delay(Duration, Value),
  /// Never completes.
  Hang,
}

pub fn fail(msg: &str) -> Reply {
  Reply::Fail(msg.to_string())
}

#[derive(Default)]
struct ScriptState {
  replies: HashMap<String, VecDeque<Reply>>,
  calls: Vec<String>,
}

/// Shared script: replies queued per call key, plus a log of every call.
///
/// Keys: `navigate:<url>`, `click:<selector>`, `fill:<selector>`,
/// `wait:<kind>:<value>`, `extract`, `cdp:<command>`. A key with no queued
/// reply succeeds with a default payload.
#[derive(Clone, Default)]
pub struct Script {
  state: Arc<Mutex<ScriptState>>,
}

impl Script {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn on(&self, key: &str, replies: impl IntoIterator<Item = Reply>) -> &Self {
    self
      .state
      .lock()
      .replies
      .entry(key.to_string())
      .or_default()
      .extend(replies);
    self
  }

  pub fn calls(&self) -> Vec<String> {
    self.state.lock().calls.clone()
  }

  pub fn count(&self, key: &str) -> usize {
    self.state.lock().calls.iter().filter(|c| c.as_str() == key).count()
  }

  fn next(&self, key: String) -> Option<Reply> {
    let mut state = self.state.lock();
    let reply = state.replies.get_mut(&key).and_then(|q| q.pop_front());
    state.calls.push(key);
    reply
  }

  async fn play(&self, key: String, default: Value) -> anyhow::Result<Value> {
    match self.next(key) {
      None => Ok(default),
      Some(Reply::Ok(v)) => Ok(v),
      Some(Reply::Fail(msg)) => Err(anyhow::anyhow!(msg)),
      Some(Reply::Delay(d, v)) => {
        tokio::time::sleep(d).await;
        Ok(v)
      }
      Some(Reply::Hang) => std::future::pending().await,
    }
  }
}

pub struct ScriptedActuator {
  script: Script,
}

impl ScriptedActuator {
  pub fn new(script: Script) -> Self {
    Self { script }
  }
}

#[async_trait]
impl Actuator for ScriptedActuator {
  async fn navigate(&self, url: &str) -> anyhow::Result<Value> {
    self.script.play(format!("navigate:{}", url), Value::Null).await
  }

  async fn click(&self, selector: &str) -> anyhow::Result<Value> {
    self.script.play(format!("click:{}", selector), Value::Null).await
  }

  async fn fill(&self, selector: &str, _text: &str) -> anyhow::Result<Value> {
    self.script.play(format!("fill:{}", selector), Value::Null).await
  }

  async fn wait_for_condition(&self, kind: WaitKind, value: &str, _timeout_ms: u64) -> anyhow::Result<WaitOutcome> {
    let raw = self
      .script
      .play(format!("wait:{}:{}", kind.as_str(), value), json!({"matched": true}))
      .await?;
    Ok(serde_json::from_value(raw)?)
  }

  async fn extract(&self, descriptor: &ExtractDescriptor) -> anyhow::Result<Map<String, Value>> {
    let default: Map<String, Value> = descriptor
      .keys()
      .map(|field| (field.clone(), json!(format!("{}-value", field))))
      .collect();
    match self.script.play("extract".to_string(), Value::Object(default)).await? {
      Value::Object(map) => Ok(map),
      other => Err(anyhow::anyhow!("scripted extract reply is not an object: {}", other)),
    }
  }

  async fn send_protocol_command(&self, name: &str, _params: &Value) -> anyhow::Result<Value> {
    self.script.play(format!("cdp:{}", name), json!({})).await
  }
}

// --- Provider ---

pub struct ScriptedProvider {
  pub script: Script,
  pub fail_acquire: bool,
  pub acquired: AtomicUsize,
  pub released: AtomicUsize,
}

impl ScriptedProvider {
  pub fn new(script: Script) -> Arc<Self> {
    Arc::new(Self {
      script,
      fail_acquire: false,
      acquired: AtomicUsize::new(0),
      released: AtomicUsize::new(0),
    })
  }

  pub fn unavailable() -> Arc<Self> {
    Arc::new(Self {
      script: Script::new(),
      fail_acquire: true,
      acquired: AtomicUsize::new(0),
      released: AtomicUsize::new(0),
    })
  }

  pub fn acquired(&self) -> usize {
    self.acquired.load(Ordering::SeqCst)
  }

  pub fn released(&self) -> usize {
    self.released.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl ActuatorProvider for ScriptedProvider {
  async fn acquire(&self) -> anyhow::Result<Box<dyn Actuator>> {
    if self.fail_acquire {
      anyhow::bail!("no browser available");
    }
    self.acquired.fetch_add(1, Ordering::SeqCst);
    Ok(Box::new(ScriptedActuator::new(self.script.clone())))
  }

  async fn release(&self, _actuator: Box<dyn Actuator>) -> anyhow::Result<()> {
    self.released.fetch_add(1, Ordering::SeqCst);
    Ok(())
  }
}

pub fn context(script: &Script) -> ExecutionContext {
  ExecutionContext::new(Box::new(ScriptedActuator::new(script.clone())), Map::new())
}

// --- Event helpers ---

pub fn states(events: &[StateTransition]) -> Vec<(usize, TaskState)> {
  events.iter().map(|t| (t.step_index, t.state)).collect()
}

pub fn states_for(events: &[StateTransition], step_index: usize) -> Vec<TaskState> {
  events
    .iter()
    .filter(|t| t.step_index == step_index)
    .map(|t| t.state)
    .collect()
}

pub fn count_state(events: &[StateTransition], step_index: usize, state: TaskState) -> usize {
  states_for(events, step_index).into_iter().filter(|s| *s == state).count()
}

/// Step indices in the order their executions began (a retry is not a new execution).
pub fn execution_order(events: &[StateTransition]) -> Vec<usize> {
  let mut order = Vec::new();
  let mut retrying = false;
  for t in events {
    match t.state {
      TaskState::Retrying => retrying = true,
      TaskState::Running if retrying => retrying = false,
      TaskState::Running => order.push(t.step_index),
      _ => {}
    }
  }
  order
}

// --- Helper for Tracing Setup (call once per test run if needed) ---
static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer() // Important for tests to capture output
    .try_init()
    .ok(); // Allow multiple initializations in tests (ok if fails)
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}
