// flowbot/src/core/step.rs

//! Step specifications: the raw playbook record, the closed set of step kinds,
//! and the per-step retry, timeout and routing policies.

use crate::error::{FlowError, FlowResult};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::time::Duration;

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_STEP_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 5_000;

/// Per-step deadline policy.
///
/// `Disabled` is a distinct policy, not an instant timeout: the attempt may
/// block indefinitely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutPolicy {
  Disabled,
  After(Duration),
}

impl TimeoutPolicy {
  /// `0` disables the deadline.
  pub fn from_millis(ms: u64) -> Self {
    if ms == 0 {
      TimeoutPolicy::Disabled
    } else {
      TimeoutPolicy::After(Duration::from_millis(ms))
    }
  }

  pub fn as_duration(&self) -> Option<Duration> {
    match self {
      TimeoutPolicy::Disabled => None,
      TimeoutPolicy::After(d) => Some(*d),
    }
  }

  /// Milliseconds, with `0` standing for `Disabled`.
  pub fn as_millis(&self) -> u64 {
    self.as_duration().map_or(0, |d| d.as_millis() as u64)
  }
}

impl Default for TimeoutPolicy {
  fn default() -> Self {
    TimeoutPolicy::from_millis(DEFAULT_STEP_TIMEOUT_MS)
  }
}

impl Serialize for TimeoutPolicy {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(self.as_millis())
  }
}

impl<'de> Deserialize<'de> for TimeoutPolicy {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
      Millis(u64),
      Word(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
      None => Ok(TimeoutPolicy::Disabled),
      Some(Raw::Millis(ms)) => Ok(TimeoutPolicy::from_millis(ms)),
      Some(Raw::Word(w)) if w.eq_ignore_ascii_case("none") => Ok(TimeoutPolicy::Disabled),
      Some(Raw::Word(w)) => Err(de::Error::custom(format!(
        "invalid timeout '{}': expected milliseconds, 0, null or \"none\"",
        w
      ))),
    }
  }
}

/// A `(pattern, goto_index)` rule, evaluated after the step succeeds.
///
/// The pattern is matched against the whole step result. The field form
/// `{field: type|data, value: v}` is also accepted and is rewritten to the
/// structural pattern `{type: v}` or `{data: v}` when the step is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingRule {
  pub pattern: Value,
  #[serde(alias = "goto_index")]
  pub goto_step: usize,
}

impl RoutingRule {
  fn normalized(&self, step_index: usize) -> FlowResult<Self> {
    let Value::Object(map) = &self.pattern else {
      return Ok(self.clone());
    };
    let (Some(field), Some(value), 2) = (map.get("field"), map.get("value"), map.len()) else {
      return Ok(self.clone());
    };
    match field.as_str() {
      Some(key @ ("type" | "data")) => {
        let mut pattern = Map::new();
        pattern.insert(key.to_string(), value.clone());
        Ok(Self {
          pattern: Value::Object(pattern),
          goto_step: self.goto_step,
        })
      }
      _ => Err(FlowError::InvalidStep {
        step_index,
        message: format!("routing rule field must be 'type' or 'data', got {}", field),
      }),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitKind {
  Url,
  Content,
  Element,
  Custom,
}

impl WaitKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      WaitKind::Url => "url",
      WaitKind::Content => "content",
      WaitKind::Element => "element",
      WaitKind::Custom => "custom",
    }
  }
}

/// Condition waited on through the actuator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaitPattern {
  #[serde(rename = "type")]
  pub kind: WaitKind,
  pub value: String,
  /// The actuator's own internal wait, in milliseconds.
  #[serde(default = "default_wait_timeout")]
  pub timeout: u64,
}

fn default_wait_timeout() -> u64 {
  DEFAULT_WAIT_TIMEOUT_MS
}

fn empty_object() -> Value {
  Value::Object(Map::new())
}

/// How a single field of an `extract_data` step is read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum ExtractField {
  SelectorText { selector: String },
  PageContent,
  EvaluateJs { expression: String },
  Cdp {
    command: String,
    #[serde(default = "empty_object")]
    params: Value,
  },
}

/// Field name → extraction method.
pub type ExtractDescriptor = BTreeMap<String, ExtractField>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Condition {
  PatternMatch { pattern: WaitPattern },
  /// Compares `data[data_path]` against `expected` with the pattern matcher.
  DataCheck {
    data_path: String,
    #[serde(default)]
    expected: Value,
  },
}

/// The closed set of step kinds, with their kind-specific parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepKind {
  Navigate { url: String },
  Click { selector: String },
  Type { selector: String, text: String },
  WaitForPattern { pattern: WaitPattern },
  ExtractData { extract: ExtractDescriptor },
  Conditional { condition: Condition },
  CdpCommand {
    command: String,
    #[serde(default = "empty_object")]
    params: Value,
  },
}

impl StepKind {
  pub const NAMES: [&'static str; 7] = [
    "navigate",
    "click",
    "type",
    "wait_for_pattern",
    "extract_data",
    "conditional",
    "cdp_command",
  ];

  pub fn name(&self) -> &'static str {
    match self {
      StepKind::Navigate { .. } => "navigate",
      StepKind::Click { .. } => "click",
      StepKind::Type { .. } => "type",
      StepKind::WaitForPattern { .. } => "wait_for_pattern",
      StepKind::ExtractData { .. } => "extract_data",
      StepKind::Conditional { .. } => "conditional",
      StepKind::CdpCommand { .. } => "cdp_command",
    }
  }
}

fn default_max_retries() -> u32 {
  DEFAULT_MAX_RETRIES
}

/// A step record as written in a playbook.
///
/// The kind is kept as a plain string here so that an unknown kind can be
/// reported against its step index when the pipeline is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepDefinition {
  #[serde(rename = "type")]
  pub kind: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(default = "default_max_retries")]
  pub max_retries: u32,
  #[serde(default)]
  pub timeout: TimeoutPolicy,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub next_step_patterns: Vec<RoutingRule>,
  /// Kind-specific parameters.
  #[serde(flatten)]
  pub params: Map<String, Value>,
}

impl StepDefinition {
  /// Builds a definition from an already-typed kind, with default policies.
  pub fn of(kind: StepKind) -> Self {
    let mut params = match serde_json::to_value(&kind) {
      Ok(Value::Object(map)) => map,
      _ => Map::new(),
    };
    params.remove("type");
    Self {
      kind: kind.name().to_string(),
      name: None,
      max_retries: DEFAULT_MAX_RETRIES,
      timeout: TimeoutPolicy::default(),
      next_step_patterns: Vec::new(),
      params,
    }
  }

  pub fn named(mut self, name: impl Into<String>) -> Self {
    self.name = Some(name.into());
    self
  }

  pub fn max_retries(mut self, max_retries: u32) -> Self {
    self.max_retries = max_retries;
    self
  }

  pub fn timeout_ms(mut self, ms: u64) -> Self {
    self.timeout = TimeoutPolicy::from_millis(ms);
    self
  }

  pub fn route(mut self, pattern: Value, goto_step: usize) -> Self {
    self.next_step_patterns.push(RoutingRule { pattern, goto_step });
    self
  }
}

/// A validated, immutable step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepSpec {
  /// Position in the playbook; the identity routing targets refer to.
  pub index: usize,
  pub name: String,
  pub kind: StepKind,
  pub max_retries: u32,
  pub timeout: TimeoutPolicy,
  pub next_step_patterns: Vec<RoutingRule>,
}

impl StepSpec {
  pub fn from_definition(index: usize, def: &StepDefinition) -> FlowResult<Self> {
    if !StepKind::NAMES.contains(&def.kind.as_str()) {
      return Err(FlowError::UnknownStepKind {
        step_index: index,
        kind: def.kind.clone(),
      });
    }

    let mut tagged = def.params.clone();
    tagged.insert("type".to_string(), Value::String(def.kind.clone()));
    let kind: StepKind = serde_json::from_value(Value::Object(tagged)).map_err(|e| FlowError::InvalidStep {
      step_index: index,
      message: format!("{} step: {}", def.kind, e),
    })?;

    let next_step_patterns = def
      .next_step_patterns
      .iter()
      .map(|rule| rule.normalized(index))
      .collect::<FlowResult<Vec<_>>>()?;

    Ok(Self {
      index,
      name: def.name.clone().unwrap_or_else(|| format!("step_{}", index)),
      kind,
      max_retries: def.max_retries,
      timeout: def.timeout,
      next_step_patterns,
    })
  }
}
