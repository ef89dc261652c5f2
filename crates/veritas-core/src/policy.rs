use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::PolicyError;

/// Identifies a policy to run and the arguments to run it with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyRequest {
    /// Registered policy name (e.g. `credential-status`).
    #[serde(rename = "policy")]
    pub name: String,
    /// Policy specific arguments, echoed verbatim in the result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Value>,
}

impl PolicyRequest {
    /// Create a request without arguments.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: None,
        }
    }

    /// Create a request with arguments.
    pub fn with_args(name: impl Into<String>, args: Value) -> Self {
        Self {
            name: name.into(),
            args: Some(args),
        }
    }
}

/// Parse a JSON array of policy requests.
///
/// Items are either a bare policy name (`"expired"`) or an object
/// `{"policy": "maximum-credentials", "args": 2}`.
pub fn parse_policy_requests(value: &Value) -> Result<Vec<PolicyRequest>, PolicyError> {
    let items = value.as_array().ok_or_else(|| {
        PolicyError::Other(format!("policy requests must be a JSON array, got: {}", value))
    })?;

    items
        .iter()
        .map(|item| match item {
            Value::String(name) => Ok(PolicyRequest::new(name.clone())),
            Value::Object(_) => serde_json::from_value::<PolicyRequest>(item.clone())
                .map_err(|e| PolicyError::Other(format!("invalid policy request {}: {}", item, e))),
            other => Err(PolicyError::Other(format!(
                "policy request must be a string or object, got: {}",
                other
            ))),
        })
        .collect()
}
