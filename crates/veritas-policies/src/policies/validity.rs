//! Validity period policies: `expired` and `not-before`.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Value};
use veritas_core::{PolicyError, PolicyValue};

use crate::policy::{InputKind, Policy, PolicyContext};

pub const EXPIRED: &str = "expired";
pub const NOT_BEFORE: &str = "not-before";

/// JWT claim first, then the W3C data model names.
const EXPIRATION_CLAIMS: [&str; 3] = ["exp", "validUntil", "expirationDate"];
const NOT_BEFORE_CLAIMS: [&str; 3] = ["nbf", "validFrom", "issuanceDate"];

/// Find the first of `claims` at the top level or under `vc`, as a UTC time.
///
/// Numeric claims are seconds since the epoch; strings are RFC 3339.
fn find_date(data: &Value, claims: &[&str]) -> Result<Option<(String, DateTime<Utc>)>, PolicyError> {
    let scopes = [Some(data), data.get("vc")];
    for scope in scopes.into_iter().flatten() {
        for claim in claims {
            let Some(value) = scope.get(*claim) else {
                continue;
            };
            let date = match value {
                Value::Number(n) => n
                    .as_i64()
                    .and_then(|secs| DateTime::from_timestamp(secs, 0)),
                Value::String(s) => DateTime::parse_from_rfc3339(s)
                    .ok()
                    .map(|d| d.with_timezone(&Utc)),
                _ => None,
            }
            .ok_or_else(|| PolicyError::Other(format!("invalid {} date: {}", claim, value)))?;
            return Ok(Some((claim.to_string(), date)));
        }
    }
    Ok(None)
}

fn format_date(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Fails once the expiration date has passed.
pub struct ExpirationPolicy;

#[async_trait]
impl Policy for ExpirationPolicy {
    fn name(&self) -> &str {
        EXPIRED
    }

    fn description(&self) -> &str {
        "Verifies that the credential's expiration date has not passed"
    }

    fn input_kind(&self) -> InputKind {
        InputKind::Wrapper
    }

    async fn verify(
        &self,
        data: &Value,
        _args: Option<&Value>,
        _context: &PolicyContext,
    ) -> Result<PolicyValue, PolicyError> {
        let Some((claim, expires)) = find_date(data, &EXPIRATION_CLAIMS)? else {
            return Ok(PolicyValue::NotApplicable);
        };

        let now = Utc::now();
        let remaining = (expires - now).num_seconds();
        if expires <= now {
            return Err(PolicyError::Expired {
                date: format_date(&expires),
                expired_since_secs: -remaining,
            });
        }
        Ok(PolicyValue::Json(json!({
            "claim": claim,
            "date": format_date(&expires),
            "expires_in_seconds": remaining,
        })))
    }
}

/// Fails while the validity period has not started.
pub struct NotBeforePolicy;

#[async_trait]
impl Policy for NotBeforePolicy {
    fn name(&self) -> &str {
        NOT_BEFORE
    }

    fn description(&self) -> &str {
        "Verifies that the credential's validity period has started"
    }

    fn input_kind(&self) -> InputKind {
        InputKind::Wrapper
    }

    async fn verify(
        &self,
        data: &Value,
        _args: Option<&Value>,
        _context: &PolicyContext,
    ) -> Result<PolicyValue, PolicyError> {
        let Some((claim, valid_from)) = find_date(data, &NOT_BEFORE_CLAIMS)? else {
            return Ok(PolicyValue::NotApplicable);
        };

        let now = Utc::now();
        if valid_from > now {
            return Err(PolicyError::NotYetValid {
                date: format_date(&valid_from),
                available_in_secs: (valid_from - now).num_seconds(),
            });
        }
        Ok(PolicyValue::Json(json!({
            "claim": claim,
            "date": format_date(&valid_from),
            "available_since_seconds": (now - valid_from).num_seconds(),
        })))
    }
}
