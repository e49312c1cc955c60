// flowbot/examples/scripted_checkout.rs

use async_trait::async_trait;
use flowbot::{
  Actuator, ActuatorProvider, ExtractDescriptor, FlowError, FlowRunner, Playbook, RunnerConfig, WaitKind, WaitOutcome,
};
use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::info;

const PLAYBOOK: &str = r##"
name: scripted_checkout
timeout: 30
steps:
  - type: navigate
    url: https://shop.test/cart
  - type: click
    selector: "#checkout"
  - type: wait_for_pattern
    pattern: {type: url, value: /confirm, timeout: 1000}
    next_step_patterns:
      - pattern: {match: {matched: false}}
        goto_step: 1
  - type: extract_data
    extract:
      order_id: {method: selector_text, selector: "#order"}
"##;

// 1. A pretend page. Clicking checkout takes two tries before the url changes.
#[derive(Default)]
struct FakePage {
  url: Mutex<String>,
  clicks: Mutex<u32>,
}

#[async_trait]
impl Actuator for FakePage {
  async fn navigate(&self, url: &str) -> anyhow::Result<Value> {
    *self.url.lock() = url.to_string();
    Ok(Value::Null)
  }

  async fn click(&self, selector: &str) -> anyhow::Result<Value> {
    let mut clicks = self.clicks.lock();
    *clicks += 1;
    if selector == "#checkout" && *clicks >= 2 {
      *self.url.lock() = "https://shop.test/confirm".to_string();
    }
    Ok(json!({"clicks": *clicks}))
  }

  async fn fill(&self, _selector: &str, _text: &str) -> anyhow::Result<Value> {
    Ok(Value::Null)
  }

  async fn wait_for_condition(&self, kind: WaitKind, value: &str, _timeout_ms: u64) -> anyhow::Result<WaitOutcome> {
    let url = self.url.lock().clone();
    let outcome = match kind {
      WaitKind::Url if url.contains(value) => WaitOutcome::matched(),
      _ => WaitOutcome::unmatched(),
    };
    Ok(outcome.with_detail("url", url))
  }

  async fn extract(&self, descriptor: &ExtractDescriptor) -> anyhow::Result<Map<String, Value>> {
    Ok(descriptor.keys().map(|k| (k.clone(), json!("A-1001"))).collect())
  }

  async fn send_protocol_command(&self, name: &str, _params: &Value) -> anyhow::Result<Value> {
    anyhow::bail!("protocol command {} is not supported by the fake page", name)
  }
}

// 2. One fresh page per run.
struct FakeBrowser;

#[async_trait]
impl ActuatorProvider for FakeBrowser {
  async fn acquire(&self) -> anyhow::Result<Box<dyn Actuator>> {
    Ok(Box::new(FakePage::default()))
  }

  async fn release(&self, _actuator: Box<dyn Actuator>) -> anyhow::Result<()> {
    Ok(())
  }
}

#[tokio::main]
async fn main() -> Result<(), FlowError> {
  tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();

  info!("--- Scripted Checkout Example ---");

  let runner = FlowRunner::new(Arc::new(FakeBrowser)).with_config(RunnerConfig::from_env()?);

  // 3. Observe the state stream from a separate task.
  let mut sub = runner.subscribe();
  let observer = tokio::spawn(async move {
    let mut seen = 0usize;
    while let Some(t) = sub.recv().await {
      info!(step = t.step_index, state = %t.state, "transition");
      seen += 1;
    }
    seen
  });

  let playbook = Playbook::from_yaml_str(PLAYBOOK)?;
  let report = runner.run(&playbook).await?;
  info!(executed = ?report.executed, jumps = report.jumps, data = ?report.data, "Run finished.");

  // Dropping the runner closes the stream, which ends the observer loop.
  drop(runner);
  let seen = observer.await.map_err(|e| FlowError::Internal(e.to_string()))?;
  info!(transitions = seen, "Observer done.");
  Ok(())
}
