//! Action requests, action sets and parameter extraction shared by all facades.

use proto::ToolError;
use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};

/// Closed set of actions one facade understands.
pub trait ActionSet: Sized + Copy + 'static {
    /// Every action, in the order they are advertised.
    const ALL: &'static [Self];

    /// Wire name of the action.
    fn as_str(self) -> &'static str;

    /// Looks up an action by its (already lower-cased) name.
    fn parse(tool: &str, name: &str) -> Result<Self, ToolError> {
        Self::ALL
            .iter()
            .copied()
            .find(|action| action.as_str() == name)
            .ok_or_else(|| ToolError::UnknownAction {
                tool: tool.to_string(),
                action: name.to_string(),
                valid: Self::names().into_iter().map(str::to_string).collect(),
            })
    }

    /// Wire names of every action.
    fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(|action| action.as_str()).collect()
    }
}

/// One facade invocation: a normalized action name plus named parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionRequest {
    action: String,
    params: Map<String, Value>,
}

impl ActionRequest {
    /// Creates a request for `action` with no parameters.
    pub fn new(action: impl AsRef<str>) -> Self {
        Self {
            action: normalize_action(action.as_ref()),
            params: Map::new(),
        }
    }

    /// Adds a parameter.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }

    /// Parses tool-call arguments of the form `{"action": "...", ...params}`.
    ///
    /// When `default_action` is given it is used if `action` is absent.
    pub fn from_args(args: Value, default_action: Option<&str>) -> Result<Self, ToolError> {
        let mut params = match args {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(ToolError::InvalidParameter {
                    action: String::new(),
                    field: "arguments".to_string(),
                    reason: format!("expected a JSON object, got {}", json_type(&other)),
                });
            }
        };

        let action = match params.remove("action") {
            Some(Value::String(name)) => name,
            Some(Value::Null) | None => match default_action {
                Some(name) => name.to_string(),
                None => {
                    return Err(ToolError::MissingParameter {
                        action: String::new(),
                        field: "action".to_string(),
                    });
                }
            },
            Some(other) => {
                return Err(ToolError::InvalidParameter {
                    action: String::new(),
                    field: "action".to_string(),
                    reason: format!("expected a string, got {}", json_type(&other)),
                });
            }
        };

        Ok(Self {
            action: normalize_action(&action),
            params,
        })
    }

    /// Normalized action name.
    pub fn action(&self) -> &str {
        &self.action
    }

    /// Raw parameter map.
    pub fn params(&self) -> &Map<String, Value> {
        &self.params
    }

    fn present(&self, field: &str) -> Option<&Value> {
        self.params.get(field).filter(|value| !value.is_null())
    }

    fn missing(&self, field: &str) -> ToolError {
        ToolError::MissingParameter {
            action: self.action.clone(),
            field: field.to_string(),
        }
    }

    /// Builds an invalid-parameter error for `field`.
    pub fn invalid(&self, field: &str, reason: impl Into<String>) -> ToolError {
        ToolError::InvalidParameter {
            action: self.action.clone(),
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    /// Required string parameter.
    pub fn require_str(&self, field: &str) -> Result<&str, ToolError> {
        match self.present(field) {
            Some(Value::String(text)) => Ok(text),
            Some(other) => Err(self.invalid(
                field,
                format!("expected a string, got {}", json_type(other)),
            )),
            None => Err(self.missing(field)),
        }
    }

    /// Optional string parameter.
    pub fn optional_str(&self, field: &str) -> Result<Option<&str>, ToolError> {
        match self.present(field) {
            Some(Value::String(text)) => Ok(Some(text)),
            Some(other) => Err(self.invalid(
                field,
                format!("expected a string, got {}", json_type(other)),
            )),
            None => Ok(None),
        }
    }

    /// Optional boolean parameter.
    pub fn optional_bool(&self, field: &str) -> Result<Option<bool>, ToolError> {
        match self.present(field) {
            Some(Value::Bool(flag)) => Ok(Some(*flag)),
            Some(other) => Err(self.invalid(
                field,
                format!("expected a boolean, got {}", json_type(other)),
            )),
            None => Ok(None),
        }
    }

    /// Optional non-negative integer parameter.
    pub fn optional_u64(&self, field: &str) -> Result<Option<u64>, ToolError> {
        match self.present(field) {
            Some(value) => value
                .as_u64()
                .map(Some)
                .ok_or_else(|| self.invalid(field, "expected a non-negative integer")),
            None => Ok(None),
        }
    }

    /// Required non-negative integer parameter.
    pub fn require_u64(&self, field: &str) -> Result<u64, ToolError> {
        self.optional_u64(field)?.ok_or_else(|| self.missing(field))
    }

    /// Optional non-negative number of seconds (integers or decimals).
    pub fn optional_seconds(&self, field: &str) -> Result<Option<f64>, ToolError> {
        match self.present(field) {
            Some(value) => match value.as_f64() {
                Some(secs) if secs.is_finite() && secs >= 0.0 => Ok(Some(secs)),
                _ => Err(self.invalid(field, "expected a non-negative number of seconds")),
            },
            None => Ok(None),
        }
    }

    /// Required non-negative number of seconds.
    pub fn require_seconds(&self, field: &str) -> Result<f64, ToolError> {
        self.optional_seconds(field)?.ok_or_else(|| self.missing(field))
    }

    /// Required list of strings.
    pub fn require_str_list(&self, field: &str) -> Result<Vec<String>, ToolError> {
        match self.present(field) {
            Some(Value::Array(items)) => items
                .iter()
                .enumerate()
                .map(|(idx, item)| {
                    item.as_str().map(str::to_string).ok_or_else(|| {
                        self.invalid(field, format!("item {idx} is not a string"))
                    })
                })
                .collect(),
            Some(other) => Err(self.invalid(
                field,
                format!("expected an array of strings, got {}", json_type(other)),
            )),
            None => Err(self.missing(field)),
        }
    }

    /// Required `{ "x": int, "y": int }` screen coordinate.
    pub fn require_coordinate(&self, field: &str) -> Result<(i64, i64), ToolError> {
        let value = self.present(field).ok_or_else(|| self.missing(field))?;
        let x = value.get("x").and_then(Value::as_i64);
        let y = value.get("y").and_then(Value::as_i64);
        match (x, y) {
            (Some(x), Some(y)) => Ok((x, y)),
            _ => Err(self.invalid(field, "expected an object with integer 'x' and 'y'")),
        }
    }

    /// Emits the pre-execution log line for this request.
    pub(crate) fn log_start(&self, tool: &str) {
        let params = Value::Object(self.params.clone());
        info!(tool, action = %self.action, params = %params, "Executing action");
    }

    /// Emits the post-execution log line for `outcome`.
    pub(crate) fn log_outcome(&self, tool: &str, outcome: &Result<Value, ToolError>) {
        match outcome {
            Ok(value) => debug!(tool, action = %self.action, result = %value, "Action completed"),
            Err(err) if err.is_validation() => {
                warn!(tool, action = %self.action, error = %err, "Action rejected")
            }
            Err(err) => error!(tool, action = %self.action, error = %err, "Action failed"),
        }
    }
}

fn normalize_action(raw: &str) -> String {
    raw.trim().to_lowercase()
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
