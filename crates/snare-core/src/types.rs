//! Protocol data types shared between the command channel and the capture flow

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Source text evaluated inside the remote execution context.
///
/// Expressions are always rendered from script templates, so they never
/// reference anything from the local process.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RemoteExpression(String);

impl RemoteExpression {
    pub fn new(source: impl Into<String>) -> Self {
        Self(source.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RemoteExpression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Options for a single `Runtime.evaluate` submission
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateOptions {
    /// Suspend until a returned promise settles
    pub await_promise: bool,
    /// Serialize object results into plain values
    pub return_by_value: bool,
}

impl EvaluateOptions {
    /// Fire the expression and take whatever comes back
    pub fn plain() -> Self {
        Self::default()
    }

    /// Await a promise result and return it by value
    pub fn awaited_by_value() -> Self {
        Self {
            await_promise: true,
            return_by_value: true,
        }
    }
}

/// Mirror of the CDP `Runtime.RemoteObject` fields snare reads
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteObject {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,

    /// Present for primitives and for by-value results. A JSON `null` value
    /// deserializes to `None`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Mirror of the CDP `Runtime.ExceptionDetails` fields snare reads
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionDetails {
    #[serde(default)]
    pub text: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_number: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_number: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exception: Option<RemoteObject>,
}

impl ExceptionDetails {
    /// Best human-readable description of the thrown value
    pub fn message(&self) -> String {
        if let Some(exception) = &self.exception {
            if let Some(description) = &exception.description {
                return description.clone();
            }
            if let Some(Value::String(s)) = &exception.value {
                return s.clone();
            }
        }
        self.text.clone()
    }
}

/// Result of submitting a remote expression
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<RemoteObject>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exception_details: Option<ExceptionDetails>,
}

impl EvaluationResponse {
    /// A clean response carrying a by-value result
    pub fn with_value(value: Value) -> Self {
        Self {
            result: Some(RemoteObject {
                kind: Some(json_type_name(&value).to_string()),
                value: Some(value),
                ..Default::default()
            }),
            exception_details: None,
        }
    }

    /// A clean response whose expression evaluated to `undefined`
    pub fn undefined() -> Self {
        Self {
            result: Some(RemoteObject {
                kind: Some("undefined".to_string()),
                ..Default::default()
            }),
            exception_details: None,
        }
    }

    /// A response for an expression that threw
    pub fn exception(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            result: None,
            exception_details: Some(ExceptionDetails {
                text: "Uncaught".to_string(),
                exception: Some(RemoteObject {
                    kind: Some("object".to_string()),
                    subtype: Some("error".to_string()),
                    description: Some(message),
                    ..Default::default()
                }),
                ..Default::default()
            }),
        }
    }

    pub fn is_exception(&self) -> bool {
        self.exception_details.is_some()
    }

    /// The by-value result, if the evaluation produced one
    pub fn value(&self) -> Option<&Value> {
        self.result.as_ref().and_then(|r| r.value.as_ref())
    }

    pub fn exception_message(&self) -> Option<String> {
        self.exception_details.as_ref().map(ExceptionDetails::message)
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "object",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) | Value::Object(_) => "object",
    }
}
