use serde::{Serialize, Serializer};
use serde_json::{json, Map, Value};

use crate::error::PolicyError;
use crate::policy::PolicyRequest;

/// Outcome of a single status list lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusCheck {
    /// Status list specification the entry follows (e.g. `StatusList2021`).
    pub status_type: String,
    /// Status purpose, when the list declares one.
    pub purpose: Option<String>,
    /// Index of the credential in the list.
    pub index: u64,
    /// Bits per entry.
    pub status_size: u8,
    /// Raw status value read from the list.
    pub value: u64,
    /// URL of the credential hosting the list.
    pub status_list_credential: String,
}

impl StatusCheck {
    /// A non-zero value means the status purpose is asserted.
    pub fn is_asserted(&self) -> bool {
        self.value != 0
    }

    pub fn to_json(&self) -> Value {
        let mut object = json!({
            "type": self.status_type,
            "index": self.index,
            "status_size": self.status_size,
            "value": self.value,
            "asserted": self.is_asserted(),
            "status_list_credential": self.status_list_credential,
        });
        if let Value::Object(map) = &mut object {
            if let Some(purpose) = &self.purpose {
                map.insert("purpose".into(), Value::String(purpose.clone()));
                match purpose.as_str() {
                    "revocation" => {
                        map.insert("revoked".into(), Value::Bool(self.is_asserted()));
                    }
                    "suspension" => {
                        map.insert("suspended".into(), Value::Bool(self.is_asserted()));
                    }
                    _ => {}
                }
            }
        }
        object
    }
}

/// Structured success value of a policy.
#[derive(Debug, Clone, PartialEq)]
pub enum PolicyValue {
    /// Nothing worth reporting; no `result` key is emitted.
    Empty,
    /// The policy does not apply to the data it was given.
    NotApplicable,
    /// A single status lookup.
    Status(StatusCheck),
    /// Several status lookups (one per requested purpose).
    StatusList(Vec<StatusCheck>),
    /// Credential count of a presentation against a limit.
    CredentialCount { total: usize, remaining: usize },
    /// Free-form policy output.
    Json(Value),
}

impl PolicyValue {
    /// JSON form of the value, or `None` when nothing should be emitted.
    pub fn to_json(&self) -> Option<Value> {
        match self {
            Self::Empty => None,
            Self::NotApplicable => Some(json!({ "policy_available": false })),
            Self::Status(check) => Some(check.to_json()),
            Self::StatusList(checks) => {
                Some(Value::Array(checks.iter().map(StatusCheck::to_json).collect()))
            }
            Self::CredentialCount { total, remaining } => {
                Some(json!({ "total": total, "remaining": remaining }))
            }
            Self::Json(Value::Null) => None,
            Self::Json(Value::Object(map)) if map.is_empty() => None,
            Self::Json(value) => Some(value.clone()),
        }
    }

    pub fn is_not_applicable(&self) -> bool {
        matches!(self, Self::NotApplicable)
    }
}

/// Success or failure of one policy execution.
#[derive(Debug, Clone, PartialEq)]
pub enum PolicyOutcome {
    Success(PolicyValue),
    Failure(PolicyError),
}

impl From<Result<PolicyValue, PolicyError>> for PolicyOutcome {
    fn from(result: Result<PolicyValue, PolicyError>) -> Self {
        match result {
            Ok(value) => Self::Success(value),
            Err(error) => Self::Failure(error),
        }
    }
}

/// Result of one policy applied to one payload.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyResult {
    pub request: PolicyRequest,
    pub description: String,
    pub outcome: PolicyOutcome,
}

impl PolicyResult {
    pub fn new(request: PolicyRequest, description: impl Into<String>, outcome: PolicyOutcome) -> Self {
        Self {
            request,
            description: description.into(),
            outcome,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, PolicyOutcome::Success(_))
    }

    pub fn value(&self) -> Option<&PolicyValue> {
        match &self.outcome {
            PolicyOutcome::Success(value) => Some(value),
            PolicyOutcome::Failure(_) => None,
        }
    }

    pub fn error(&self) -> Option<&PolicyError> {
        match &self.outcome {
            PolicyOutcome::Success(_) => None,
            PolicyOutcome::Failure(error) => Some(error),
        }
    }

    /// Wire form of the result.
    ///
    /// Always carries `policy`, `description` and `is_success`; `args` only
    /// when the request had arguments; `result` only for a non-empty success
    /// value; `error` only on failure.
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        map.insert("policy".into(), Value::String(self.request.name.clone()));
        map.insert("description".into(), Value::String(self.description.clone()));
        if let Some(args) = &self.request.args {
            map.insert("args".into(), args.clone());
        }
        map.insert("is_success".into(), Value::Bool(self.is_success()));
        match &self.outcome {
            PolicyOutcome::Success(value) => {
                if let Some(result) = value.to_json() {
                    map.insert("result".into(), result);
                }
            }
            PolicyOutcome::Failure(error) => {
                map.insert("error".into(), error.to_json());
            }
        }
        Value::Object(map)
    }
}

impl Serialize for PolicyResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

/// Policy results for one credential (or the presentation itself).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PresentationResultEntry {
    /// Type of the verified credential or presentation.
    pub credential: String,
    pub policy_results: Vec<PolicyResult>,
}

impl PresentationResultEntry {
    pub fn new(credential: impl Into<String>) -> Self {
        Self {
            credential: credential.into(),
            policy_results: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.policy_results.iter().all(PolicyResult::is_success)
    }
}

/// Aggregated result of verifying a presentation and its credentials.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PresentationVerificationResponse {
    pub results: Vec<PresentationResultEntry>,
    pub time_ms: u128,
    pub policies_run: usize,
}

impl PresentationVerificationResponse {
    /// Whether every policy in every entry succeeded.
    pub fn overall_success(&self) -> bool {
        self.results.iter().all(PresentationResultEntry::is_success)
    }

    /// Number of failed policies across all entries.
    pub fn policies_failed(&self) -> usize {
        self.results
            .iter()
            .flat_map(|entry| entry.policy_results.iter())
            .filter(|result| !result.is_success())
            .count()
    }
}
