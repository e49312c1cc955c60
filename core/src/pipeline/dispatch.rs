// flowbot/src/pipeline/dispatch.rs

//! Maps each step kind onto actuator calls and shapes the step result that
//! routing patterns are matched against.

use crate::actuator::{Actuator, WaitOutcome};
use crate::core::context::ExecutionContext;
use crate::core::step::{Condition, StepKind, StepSpec, WaitPattern};
use crate::error::{FlowError, FlowResult};
use crate::matcher::matches;
use serde_json::{json, Value};
use tracing::{event, Level};

/// Runs one attempt of `spec` against the context's actuator.
pub(crate) async fn execute(spec: &StepSpec, ctx: &mut ExecutionContext) -> FlowResult<Value> {
  match &spec.kind {
    StepKind::Navigate { url } => {
      event!(Level::TRACE, %url, "Navigating.");
      let outcome = ctx.actuator().navigate(url).await?;
      Ok(with_outcome(json!({"type": "navigation", "url": url, "status": "success"}), outcome))
    }
    StepKind::Click { selector } => {
      event!(Level::TRACE, %selector, "Clicking.");
      let outcome = ctx.actuator().click(selector).await?;
      Ok(with_outcome(json!({"type": "click", "selector": selector, "status": "success"}), outcome))
    }
    StepKind::Type { selector, text } => {
      event!(Level::TRACE, %selector, text_len = text.len(), "Filling.");
      let outcome = ctx.actuator().fill(selector, text).await?;
      Ok(with_outcome(
        json!({"type": "type", "selector": selector, "text": text, "status": "success"}),
        outcome,
      ))
    }
    StepKind::WaitForPattern { pattern } => {
      let outcome = wait_for(ctx.actuator(), pattern).await?;
      Ok(json!({"type": "pattern_match", "pattern": pattern, "match": match_payload(pattern, outcome)}))
    }
    StepKind::ExtractData { extract } => {
      let extracted = ctx.actuator().extract(extract).await?;
      if let Some(field) = extract.keys().find(|field| !extracted.contains_key(*field)) {
        return Err(FlowError::MissingField {
          step_index: spec.index,
          field: field.clone(),
        });
      }
      event!(Level::TRACE, fields = extracted.len(), "Extracted data.");
      ctx.merge_data(&extracted);
      Ok(json!({"type": "extraction", "data": Value::Object(extracted)}))
    }
    StepKind::Conditional { condition } => {
      let result = evaluate_condition(spec.index, condition, ctx).await?;
      Ok(json!({"type": "conditional", "condition": condition, "result": result}))
    }
    StepKind::CdpCommand { command, params } => {
      event!(Level::TRACE, %command, "Sending protocol command.");
      let response = ctx.actuator().send_protocol_command(command, params).await?;
      Ok(json!({"type": "cdp", "command": command, "result": response}))
    }
  }
}

async fn wait_for(actuator: &dyn Actuator, pattern: &WaitPattern) -> FlowResult<WaitOutcome> {
  event!(Level::TRACE, kind = pattern.kind.as_str(), value = %pattern.value, "Waiting for pattern.");
  let outcome = actuator
    .wait_for_condition(pattern.kind, &pattern.value, pattern.timeout)
    .await?;
  Ok(outcome)
}

fn match_payload(pattern: &WaitPattern, outcome: WaitOutcome) -> Value {
  let mut payload = outcome.detail;
  payload.insert("type".to_string(), json!(pattern.kind.as_str()));
  payload.insert("matched".to_string(), json!(outcome.matched));
  Value::Object(payload)
}

async fn evaluate_condition(step_index: usize, condition: &Condition, ctx: &ExecutionContext) -> FlowResult<bool> {
  match condition {
    Condition::PatternMatch { pattern } => Ok(wait_for(ctx.actuator(), pattern).await?.matched),
    Condition::DataCheck { data_path, expected } => {
      let actual = ctx.data.get(data_path).ok_or_else(|| FlowError::MissingField {
        step_index,
        field: data_path.clone(),
      })?;
      Ok(matches(actual, expected))
    }
  }
}

fn with_outcome(mut result: Value, outcome: Value) -> Value {
  if !outcome.is_null() {
    if let Value::Object(map) = &mut result {
      map.insert("outcome".to_string(), outcome);
    }
  }
  result
}
