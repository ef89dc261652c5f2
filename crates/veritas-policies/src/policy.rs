use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use serde_json::Value;
use veritas_core::{PolicyError, PolicyValue};

/// Shape of the data a policy is handed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// The raw credential string, as a JSON string value.
    Raw,
    /// The credential payload, unwrapped from `vc` when present.
    CredentialData,
    /// The full decoded payload (credential or presentation wrapper).
    Wrapper,
}

impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Raw => write!(f, "raw credential"),
            Self::CredentialData => write!(f, "credential data"),
            Self::Wrapper => write!(f, "credential wrapper"),
        }
    }
}

/// Side information available to every policy of one verification call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PolicyContext {
    values: HashMap<String, Value>,
}

impl PolicyContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        self.values.insert(key.into(), value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.values.insert(key.into(), value)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }
}

/// A named verification rule.
///
/// Policies are read-only over the data they receive and may run
/// concurrently with their siblings. A policy that does not apply to the
/// data returns `Ok(PolicyValue::NotApplicable)`, never an error.
#[async_trait]
pub trait Policy: Send + Sync {
    /// Registry name, e.g. `credential-status`.
    fn name(&self) -> &str;

    /// Human readable description, echoed in every result.
    fn description(&self) -> &str;

    fn input_kind(&self) -> InputKind;

    /// Apply the policy to `data`.
    async fn verify(
        &self,
        data: &Value,
        args: Option<&Value>,
        context: &PolicyContext,
    ) -> Result<PolicyValue, PolicyError>;
}

/// Argument helper: a non-negative integer, given as a number or numeric string.
pub(crate) fn integer_arg(policy: &str, args: Option<&Value>) -> Result<usize, PolicyError> {
    let invalid = |reason: String| PolicyError::InvalidArguments {
        policy: policy.to_string(),
        reason,
    };
    match args {
        Some(Value::Number(n)) => n
            .as_u64()
            .and_then(|n| usize::try_from(n).ok())
            .ok_or_else(|| invalid(format!("expected a non-negative integer, got {}", n))),
        Some(Value::String(s)) => s
            .trim()
            .parse::<usize>()
            .map_err(|e| invalid(format!("expected a non-negative integer, got {:?}: {}", s, e))),
        Some(other) => Err(invalid(format!("expected a non-negative integer, got {}", other))),
        None => Err(invalid("missing integer argument".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_integer_arg() {
        assert_eq!(integer_arg("p", Some(&json!(5))).unwrap(), 5);
        assert_eq!(integer_arg("p", Some(&json!("7"))).unwrap(), 7);
        assert!(matches!(
            integer_arg("p", Some(&json!(-1))),
            Err(PolicyError::InvalidArguments { .. })
        ));
        assert!(integer_arg("p", Some(&json!(2.5))).is_err());
        assert!(integer_arg("p", None).is_err());
    }

    #[test]
    fn test_context() {
        let mut context = PolicyContext::new().with("format", json!("jwt"));
        assert_eq!(context.get("format"), Some(&json!("jwt")));
        assert_eq!(context.insert("format", json!("cwt")), Some(json!("jwt")));
        assert_eq!(context.get("missing"), None);
    }
}
