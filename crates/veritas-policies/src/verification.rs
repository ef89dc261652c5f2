//! Presentation verification: policies for the presentation itself, for
//! every embedded credential, and for credentials of specific types.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use serde::Deserialize;
use serde_json::Value;
use veritas_core::{
    parse_policy_requests, CancellationHandle, PolicyRequest, PresentationResultEntry,
    PresentationVerificationResponse,
};

use crate::policies::presentation::embedded_credentials;
use crate::runner::{PolicyRunner, VerificationInput};

/// Which policies to run on a presentation and its credentials.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PresentationRequest {
    /// Run on the presentation payload.
    #[serde(default, deserialize_with = "deserialize_requests")]
    pub vp_policies: Vec<PolicyRequest>,
    /// Run on every embedded credential.
    #[serde(default, deserialize_with = "deserialize_requests")]
    pub vc_policies: Vec<PolicyRequest>,
    /// Run on embedded credentials of the given type only.
    #[serde(default, deserialize_with = "deserialize_specific")]
    pub specific_policies: HashMap<String, Vec<PolicyRequest>>,
}

fn deserialize_requests<'de, D: serde::Deserializer<'de>>(
    deserializer: D,
) -> Result<Vec<PolicyRequest>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    parse_policy_requests(&value).map_err(serde::de::Error::custom)
}

fn deserialize_specific<'de, D: serde::Deserializer<'de>>(
    deserializer: D,
) -> Result<HashMap<String, Vec<PolicyRequest>>, D::Error> {
    let raw = HashMap::<String, Value>::deserialize(deserializer)?;
    raw.into_iter()
        .map(|(credential_type, value)| {
            parse_policy_requests(&value)
                .map(|requests| (credential_type, requests))
                .map_err(serde::de::Error::custom)
        })
        .collect()
}

/// Type of a credential or presentation: the last entry of `type`, looked
/// up on the payload, then under `vc`, then under `vp`. SD-JWT VCs use `vct`.
pub fn credential_type(payload: &Value) -> Option<String> {
    let scopes = [Some(payload), payload.get("vc"), payload.get("vp")];
    scopes
        .into_iter()
        .flatten()
        .find_map(|scope| match scope.get("type") {
            Some(Value::Array(types)) => types.last().and_then(Value::as_str),
            Some(Value::String(single)) => Some(single.as_str()),
            _ => None,
        })
        .or_else(|| payload.get("vct").and_then(Value::as_str))
        .map(str::to_string)
}

const UNKNOWN_TYPE: &str = "unknown";

impl PolicyRunner {
    /// Verify a presentation and each credential it embeds.
    ///
    /// The first entry of the response holds the presentation's own results;
    /// one entry per embedded credential follows, in embedding order.
    pub async fn verify_presentation(
        &self,
        presentation: impl Into<VerificationInput>,
        request: &PresentationRequest,
        cancel: &CancellationHandle,
    ) -> PresentationVerificationResponse {
        let started = Instant::now();

        let prepared = match self.prepare(presentation.into()) {
            Ok(prepared) => Arc::new(prepared),
            Err(e) => {
                tracing::debug!(error = %e, "could not decode presentation");
                let mut entry = PresentationResultEntry::new(UNKNOWN_TYPE);
                entry.policy_results = request
                    .vp_policies
                    .iter()
                    .map(|r| self.failure(r, e.clone()))
                    .collect();
                return response(vec![entry], started);
            }
        };

        let vp_type = credential_type(&prepared.payload).unwrap_or_else(|| UNKNOWN_TYPE.into());
        let credentials: Vec<VerificationInput> = embedded_credentials(&prepared.payload)
            .unwrap_or_default()
            .into_iter()
            .cloned()
            .map(VerificationInput::from)
            .collect();

        let vp_results = async {
            let mut entry = PresentationResultEntry::new(vp_type);
            entry.policy_results = self
                .run(Arc::clone(&prepared), &request.vp_policies, cancel)
                .await;
            entry
        };
        let vc_results = join_all(
            credentials
                .into_iter()
                .map(|credential| self.verify_embedded(credential, request, cancel)),
        );
        let (vp_entry, vc_entries) = tokio::join!(vp_results, vc_results);

        let mut results = Vec::with_capacity(vc_entries.len() + 1);
        results.push(vp_entry);
        results.extend(vc_entries);
        response(results, started)
    }

    async fn verify_embedded(
        &self,
        credential: VerificationInput,
        request: &PresentationRequest,
        cancel: &CancellationHandle,
    ) -> PresentationResultEntry {
        match self.prepare(credential) {
            Ok(prepared) => {
                let credential_type =
                    credential_type(&prepared.payload).unwrap_or_else(|| UNKNOWN_TYPE.into());
                let mut requests = request.vc_policies.clone();
                if let Some(specific) = request.specific_policies.get(&credential_type) {
                    requests.extend(specific.iter().cloned());
                }

                let mut entry = PresentationResultEntry::new(credential_type);
                entry.policy_results = self.run(Arc::new(prepared), &requests, cancel).await;
                entry
            }
            Err(e) => {
                tracing::debug!(error = %e, "could not decode embedded credential");
                let mut entry = PresentationResultEntry::new(UNKNOWN_TYPE);
                entry.policy_results = request
                    .vc_policies
                    .iter()
                    .map(|r| self.failure(r, e.clone()))
                    .collect();
                entry
            }
        }
    }
}

fn response(results: Vec<PresentationResultEntry>, started: Instant) -> PresentationVerificationResponse {
    let policies_run = results.iter().map(|entry| entry.policy_results.len()).sum();
    PresentationVerificationResponse {
        results,
        time_ms: started.elapsed().as_millis(),
        policies_run,
    }
}
