//! Policy Runner.
//!
//! Runs every requested policy against one payload as its own tokio task
//! and reports exactly one [`PolicyResult`] per request, in request order.
//! Unknown policies, policy errors, panics and cancellation all become
//! failure results; nothing is dropped.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use serde_json::Value;
use tokio::task::JoinSet;
use veritas_core::{
    CancellationHandle, EngineConfig, PolicyError, PolicyOutcome, PolicyRequest, PolicyResult,
};
use veritas_envelope::{decode, FormatDetector};

use crate::policy::{InputKind, Policy, PolicyContext};
use crate::registry::PolicyRegistry;

/// Context key holding the detected envelope format (`jwt`, `cwt`, `json`).
pub const FORMAT_CONTEXT_KEY: &str = "format";

/// A credential or presentation as handed to the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum VerificationInput {
    /// Encoded JWT or hex CWT.
    Raw(String),
    /// Already decoded JSON document.
    Parsed(Value),
}

impl VerificationInput {
    /// Classify text: a JSON object is parsed, anything else is raw.
    pub fn from_text(text: &str) -> Self {
        let trimmed = text.trim();
        if trimmed.starts_with('{') {
            if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
                return Self::Parsed(value);
            }
        }
        Self::Raw(trimmed.to_string())
    }
}

impl From<Value> for VerificationInput {
    fn from(value: Value) -> Self {
        match value {
            Value::String(raw) => Self::Raw(raw),
            other => Self::Parsed(other),
        }
    }
}

impl From<&str> for VerificationInput {
    fn from(raw: &str) -> Self {
        Self::Raw(raw.to_string())
    }
}

impl From<String> for VerificationInput {
    fn from(raw: String) -> Self {
        Self::Raw(raw)
    }
}

/// A decoded input ready to be handed to policies.
#[derive(Debug, Clone)]
pub(crate) struct PreparedInput {
    pub raw: Option<String>,
    pub payload: Value,
    pub context: PolicyContext,
}

impl PreparedInput {
    /// The view of the input a policy of the given kind expects.
    fn data_for(&self, policy: &dyn Policy) -> Result<Value, PolicyError> {
        match policy.input_kind() {
            InputKind::Raw => {
                self.raw
                    .clone()
                    .map(Value::String)
                    .ok_or_else(|| PolicyError::UnsupportedInput {
                        policy: policy.name().to_string(),
                        found: "parsed JSON document".into(),
                    })
            }
            InputKind::CredentialData => Ok(match self.payload.get("vc") {
                Some(vc) if vc.is_object() => vc.clone(),
                _ => self.payload.clone(),
            }),
            InputKind::Wrapper => Ok(self.payload.clone()),
        }
    }
}

/// Executes policy requests against payloads.
#[derive(Clone)]
pub struct PolicyRunner {
    registry: Arc<PolicyRegistry>,
    detector: FormatDetector,
    timeout: Option<Duration>,
}

impl PolicyRunner {
    pub fn new(registry: Arc<PolicyRegistry>, config: &EngineConfig) -> Self {
        Self {
            registry,
            detector: FormatDetector::new(&config.envelope),
            timeout: config.runner.policy_timeout(),
        }
    }

    pub fn registry(&self) -> &Arc<PolicyRegistry> {
        &self.registry
    }

    /// Verify `input` against `requests`.
    pub async fn verify(
        &self,
        input: impl Into<VerificationInput>,
        requests: &[PolicyRequest],
    ) -> Vec<PolicyResult> {
        self.verify_with_cancel(input, requests, &CancellationHandle::new())
            .await
    }

    /// Verify `input` against `requests`, stopping early when `cancel`
    /// fires or the configured deadline passes. Requests that did not
    /// finish by then fail with [`PolicyError::Cancelled`].
    pub async fn verify_with_cancel(
        &self,
        input: impl Into<VerificationInput>,
        requests: &[PolicyRequest],
        cancel: &CancellationHandle,
    ) -> Vec<PolicyResult> {
        match self.prepare(input.into()) {
            Ok(prepared) => self.run(Arc::new(prepared), requests, cancel).await,
            Err(e) => {
                tracing::debug!(error = %e, "could not decode input");
                requests
                    .iter()
                    .map(|request| self.failure(request, e.clone()))
                    .collect()
            }
        }
    }

    pub(crate) fn prepare(&self, input: VerificationInput) -> Result<PreparedInput, PolicyError> {
        match input {
            VerificationInput::Raw(raw) => {
                let decoded = decode(&raw, &self.detector)?;
                let payload = decoded.payload.to_json()?;
                let context = PolicyContext::new()
                    .with(FORMAT_CONTEXT_KEY, Value::String(decoded.format.to_string()));
                Ok(PreparedInput {
                    raw: Some(raw),
                    payload,
                    context,
                })
            }
            VerificationInput::Parsed(payload) => Ok(PreparedInput {
                raw: None,
                payload,
                context: PolicyContext::new().with(FORMAT_CONTEXT_KEY, Value::String("json".into())),
            }),
        }
    }

    pub(crate) async fn run(
        &self,
        input: Arc<PreparedInput>,
        requests: &[PolicyRequest],
        cancel: &CancellationHandle,
    ) -> Vec<PolicyResult> {
        let mut slots: Vec<Option<PolicyResult>> = vec![None; requests.len()];
        let mut tasks = JoinSet::new();

        for (slot, request) in requests.iter().enumerate() {
            match self.registry.get(&request.name) {
                Some(policy) => {
                    let input = Arc::clone(&input);
                    let request = request.clone();
                    tasks.spawn(async move { (slot, run_policy(policy, input, request).await) });
                }
                None => {
                    tracing::debug!(policy = %request.name, "unknown policy requested");
                    slots[slot] = Some(PolicyResult::new(
                        request.clone(),
                        "Unknown policy",
                        PolicyOutcome::Failure(PolicyError::UnknownPolicy(request.name.clone())),
                    ));
                }
            }
        }

        let deadline = async {
            match self.timeout {
                Some(timeout) => tokio::time::sleep(timeout).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                joined = tasks.join_next() => match joined {
                    Some(Ok((slot, result))) => slots[slot] = Some(result),
                    Some(Err(e)) => tracing::warn!(error = %e, "policy task ended abnormally"),
                    None => break,
                },
                _ = cancel.cancelled() => {
                    tracing::warn!(pending = tasks.len(), "verification cancelled");
                    tasks.abort_all();
                    break;
                }
                _ = &mut deadline => {
                    tracing::warn!(pending = tasks.len(), "verification deadline passed");
                    tasks.abort_all();
                    break;
                }
            }
        }

        // Keep whatever completed before the abort took effect.
        while let Some(joined) = tasks.join_next().await {
            if let Ok((slot, result)) = joined {
                slots[slot] = Some(result);
            }
        }

        slots
            .into_iter()
            .zip(requests)
            .map(|(slot, request)| {
                slot.unwrap_or_else(|| self.failure(request, PolicyError::Cancelled))
            })
            .collect()
    }

    pub(crate) fn failure(&self, request: &PolicyRequest, error: PolicyError) -> PolicyResult {
        let description = self
            .registry
            .get(&request.name)
            .map(|policy| policy.description().to_string())
            .unwrap_or_else(|| "Unknown policy".to_string());
        PolicyResult::new(request.clone(), description, PolicyOutcome::Failure(error))
    }
}

async fn run_policy(
    policy: Arc<dyn Policy>,
    input: Arc<PreparedInput>,
    request: PolicyRequest,
) -> PolicyResult {
    let outcome = match input.data_for(policy.as_ref()) {
        Ok(data) => {
            AssertUnwindSafe(policy.verify(&data, request.args.as_ref(), &input.context))
                .catch_unwind()
                .await
                .unwrap_or_else(|_| {
                    tracing::warn!(policy = %policy.name(), "policy panicked");
                    Err(PolicyError::Other(format!("policy {} panicked", policy.name())))
                })
        }
        Err(e) => Err(e),
    };

    if let Err(e) = &outcome {
        tracing::debug!(policy = %policy.name(), error = %e, "policy failed");
    }
    PolicyResult::new(request, policy.description(), outcome.into())
}
