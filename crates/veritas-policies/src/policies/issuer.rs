//! `allowed-issuer`: the issuer must appear in the given allow list.

use async_trait::async_trait;
use serde_json::{json, Value};
use veritas_core::{PolicyError, PolicyValue};

use crate::policy::{InputKind, Policy, PolicyContext};

pub const NAME: &str = "allowed-issuer";

/// Issuer of a credential: `issuer` (string or `{id}`), then the JWT `iss`.
pub fn issuer_of(data: &Value) -> Option<&str> {
    match data.get("issuer") {
        Some(Value::String(issuer)) => Some(issuer.as_str()),
        Some(Value::Object(issuer)) => issuer.get("id").and_then(Value::as_str),
        _ => data.get("iss").and_then(Value::as_str),
    }
}

fn allowed_issuers(args: Option<&Value>) -> Result<Vec<String>, PolicyError> {
    let invalid = |reason: &str| PolicyError::InvalidArguments {
        policy: NAME.into(),
        reason: reason.into(),
    };
    match args {
        Some(Value::String(issuer)) => Ok(vec![issuer.clone()]),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| invalid("allowed issuers must be strings"))
            })
            .collect(),
        Some(_) => Err(invalid("expected an issuer or a list of issuers")),
        None => Err(invalid("missing allowed issuer list")),
    }
}

pub struct AllowedIssuerPolicy;

#[async_trait]
impl Policy for AllowedIssuerPolicy {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Verifies that the credential was issued by one of the allowed issuers"
    }

    fn input_kind(&self) -> InputKind {
        InputKind::CredentialData
    }

    async fn verify(
        &self,
        data: &Value,
        args: Option<&Value>,
        _context: &PolicyContext,
    ) -> Result<PolicyValue, PolicyError> {
        let allowed = allowed_issuers(args)?;
        let issuer = issuer_of(data).ok_or_else(|| PolicyError::UnsupportedInput {
            policy: NAME.into(),
            found: "credential without issuer".into(),
        })?;

        if allowed.iter().any(|a| a == issuer) {
            Ok(PolicyValue::Json(json!({ "issuer": issuer })))
        } else {
            Err(PolicyError::UntrustedIssuer {
                issuer: issuer.to_string(),
                allowed,
            })
        }
    }
}
