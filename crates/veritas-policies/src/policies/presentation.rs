//! Presentation level policies: limits on the number of embedded credentials.

use async_trait::async_trait;
use serde_json::{json, Value};
use veritas_core::{PolicyError, PolicyValue};

use crate::policy::{integer_arg, InputKind, Policy, PolicyContext};

pub const MAXIMUM_CREDENTIALS: &str = "maximum-credentials";
pub const MINIMUM_CREDENTIALS: &str = "minimum-credentials";

/// Credentials embedded in a presentation payload, under `vp` when present.
pub fn embedded_credentials(data: &Value) -> Option<Vec<&Value>> {
    let presentation = data.get("vp").unwrap_or(data);
    match presentation.get("verifiableCredential")? {
        Value::Array(items) => Some(items.iter().collect()),
        Value::Null => None,
        single => Some(vec![single]),
    }
}

/// Fails when a presentation carries more than `n` credentials.
pub struct MaximumCredentialsPolicy;

#[async_trait]
impl Policy for MaximumCredentialsPolicy {
    fn name(&self) -> &str {
        MAXIMUM_CREDENTIALS
    }

    fn description(&self) -> &str {
        "Verifies that a presentation holds no more than the given number of credentials"
    }

    fn input_kind(&self) -> InputKind {
        InputKind::Wrapper
    }

    async fn verify(
        &self,
        data: &Value,
        args: Option<&Value>,
        _context: &PolicyContext,
    ) -> Result<PolicyValue, PolicyError> {
        let limit = integer_arg(MAXIMUM_CREDENTIALS, args)?;
        let total = match embedded_credentials(data) {
            Some(credentials) => credentials.len(),
            None => return Ok(PolicyValue::NotApplicable),
        };

        if total <= limit {
            Ok(PolicyValue::CredentialCount {
                total,
                remaining: limit - total,
            })
        } else {
            Err(PolicyError::MaximumCredentialsExceeded {
                total,
                exceeded: total - limit,
            })
        }
    }
}

/// Fails when a presentation carries fewer than `n` credentials.
pub struct MinimumCredentialsPolicy;

#[async_trait]
impl Policy for MinimumCredentialsPolicy {
    fn name(&self) -> &str {
        MINIMUM_CREDENTIALS
    }

    fn description(&self) -> &str {
        "Verifies that a presentation holds at least the given number of credentials"
    }

    fn input_kind(&self) -> InputKind {
        InputKind::Wrapper
    }

    async fn verify(
        &self,
        data: &Value,
        args: Option<&Value>,
        _context: &PolicyContext,
    ) -> Result<PolicyValue, PolicyError> {
        let minimum = integer_arg(MINIMUM_CREDENTIALS, args)?;
        let total = match embedded_credentials(data) {
            Some(credentials) => credentials.len(),
            None => return Ok(PolicyValue::NotApplicable),
        };

        if total >= minimum {
            Ok(PolicyValue::Json(json!({ "total": total, "extra": total - minimum })))
        } else {
            Err(PolicyError::MinimumCredentialsNotMet {
                total,
                missing: minimum - total,
            })
        }
    }
}
