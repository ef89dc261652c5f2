//! `credential-status`: revocation and suspension through status lists.
//!
//! A credential without any status claim is not an error: the policy
//! reports "not applicable". A revoked credential is not an error either:
//! the policy succeeds with a value saying so, unless the caller asked for
//! a specific value through the arguments.
//!
//! `revoked-status-list` is the acceptance check: it fails as soon as any
//! status list asserts the credential's bit.

use async_trait::async_trait;
use futures::future::try_join_all;
use serde::Deserialize;
use serde_json::Value;
use veritas_core::{PolicyError, PolicyValue, StatusCheck};
use veritas_status::{extract_status_entries, StatusListEntry, StatusListType, StatusValidator};

use crate::policy::{InputKind, Policy, PolicyContext};

pub const NAME: &str = "credential-status";

/// Expected status of a W3C entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct W3cStatusArgs {
    pub purpose: String,
    /// Status list type the entry must follow, e.g. `BitstringStatusList`.
    #[serde(rename = "type", default)]
    pub list_type: Option<String>,
    /// Required status value; omitted means report only.
    #[serde(default)]
    pub value: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IetfStatusArgs {
    #[serde(default)]
    pub value: Option<u64>,
}

/// Arguments of the status policy, discriminated by `discriminator`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "discriminator", rename_all = "kebab-case")]
pub enum StatusPolicyArgs {
    W3c(W3cStatusArgs),
    W3cList { list: Vec<W3cStatusArgs> },
    Ietf(IetfStatusArgs),
}

pub struct CredentialStatusPolicy {
    validator: StatusValidator,
}

impl CredentialStatusPolicy {
    pub fn new(validator: StatusValidator) -> Self {
        Self { validator }
    }

    async fn check_w3c(
        &self,
        entries: &[StatusListEntry],
        args: &W3cStatusArgs,
    ) -> Result<StatusCheck, PolicyError> {
        let wanted_type = match &args.list_type {
            Some(name) => Some(StatusListType::from_type_name(name).ok_or_else(|| {
                PolicyError::InvalidArguments {
                    policy: NAME.into(),
                    reason: format!("unknown status list type {}", name),
                }
            })?),
            None => None,
        };

        let entry = entries
            .iter()
            .filter(|e| e.list_type.is_w3c())
            .filter(|e| wanted_type.map_or(true, |t| e.list_type == t))
            .find(|e| e.status_purpose.as_deref() == Some(args.purpose.as_str()))
            .ok_or_else(|| PolicyError::PurposeMismatch(args.purpose.clone()))?;

        let check = self.validator.check(entry).await?;
        expect_value(args.value, &check)?;
        Ok(check)
    }

    async fn check_ietf(
        &self,
        entries: &[StatusListEntry],
        args: &IetfStatusArgs,
    ) -> Result<StatusCheck, PolicyError> {
        let entry = entries
            .iter()
            .find(|e| e.list_type == StatusListType::TokenStatusList)
            .ok_or_else(|| PolicyError::PurposeMismatch("token status list".into()))?;

        let check = self.validator.check(entry).await?;
        expect_value(args.value, &check)?;
        Ok(check)
    }
}

fn expect_value(expected: Option<u64>, check: &StatusCheck) -> Result<(), PolicyError> {
    match expected {
        Some(expected) if expected != check.value => Err(PolicyError::StatusMismatch {
            expected,
            actual: check.value,
        }),
        _ => Ok(()),
    }
}

fn parse_args(args: Option<&Value>) -> Result<Option<StatusPolicyArgs>, PolicyError> {
    match args {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_json::from_value(value.clone())
            .map(Some)
            .map_err(|e| PolicyError::InvalidArguments {
                policy: NAME.into(),
                reason: e.to_string(),
            }),
    }
}

#[async_trait]
impl Policy for CredentialStatusPolicy {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Verifies the credential status (revocation, suspension) against its status list"
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
        let args = parse_args(args)?;
        let entries = match extract_status_entries(data)? {
            Some(entries) => entries,
            None => return Ok(PolicyValue::NotApplicable),
        };

        match args {
            None => {
                let mut checks =
                    try_join_all(entries.iter().map(|entry| self.validator.check(entry))).await?;
                if checks.len() == 1 {
                    Ok(PolicyValue::Status(checks.remove(0)))
                } else {
                    Ok(PolicyValue::StatusList(checks))
                }
            }
            Some(StatusPolicyArgs::W3c(w3c)) => {
                Ok(PolicyValue::Status(self.check_w3c(&entries, &w3c).await?))
            }
            Some(StatusPolicyArgs::W3cList { list }) => {
                let checks =
                    try_join_all(list.iter().map(|w3c| self.check_w3c(&entries, w3c))).await?;
                Ok(PolicyValue::StatusList(checks))
            }
            Some(StatusPolicyArgs::Ietf(ietf)) => {
                Ok(PolicyValue::Status(self.check_ietf(&entries, &ietf).await?))
            }
        }
    }
}

pub const REVOKED_NAME: &str = "revoked-status-list";

/// `revoked-status-list`: rejects a credential whose status is asserted in
/// any of its status lists. A credential without status passes as
/// "not applicable".
pub struct RevokedStatusListPolicy {
    validator: StatusValidator,
}

impl RevokedStatusListPolicy {
    pub fn new(validator: StatusValidator) -> Self {
        Self { validator }
    }
}

#[async_trait]
impl Policy for RevokedStatusListPolicy {
    fn name(&self) -> &str {
        REVOKED_NAME
    }

    fn description(&self) -> &str {
        "Fails when the credential is revoked or suspended in its status list"
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
        let entries = match extract_status_entries(data)? {
            Some(entries) => entries,
            None => return Ok(PolicyValue::NotApplicable),
        };

        let mut checks =
            try_join_all(entries.iter().map(|entry| self.validator.check(entry))).await?;
        if let Some(asserted) = checks.iter().find(|check| check.is_asserted()) {
            return Err(PolicyError::StatusAsserted {
                purpose: asserted.purpose.clone().unwrap_or_else(|| "status".into()),
                value: asserted.value,
            });
        }

        if checks.len() == 1 {
            Ok(PolicyValue::Status(checks.remove(0)))
        } else {
            Ok(PolicyValue::StatusList(checks))
        }
    }
}
