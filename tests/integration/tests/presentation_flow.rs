//! Integration test: holder presentation → verifier, with presentation wide,
//! per-credential and type-specific policies.

use std::sync::Arc;

use serde_json::{json, Value};
use veritas_core::{CancellationHandle, EngineConfig, PolicyError};
use veritas_integration_tests::{
    credential_payload, runner_with, status_2021_entry, status_list_2021_credential,
    unsigned_jwt, CountingFetcher,
};
use veritas_policies::{PolicyRunner, PresentationRequest};
use veritas_status::StaticFetcher;

const REVOCATION_URL: &str = "https://university.example/status/1";

fn runner(revoked: &[usize]) -> (PolicyRunner, Arc<CountingFetcher>) {
    let fetcher = Arc::new(CountingFetcher::new(StaticFetcher::new().with_document(
        REVOCATION_URL,
        status_list_2021_credential(REVOCATION_URL, "revocation", revoked).to_string(),
    )));
    (runner_with(Arc::clone(&fetcher), &EngineConfig::default()), fetcher)
}

fn degree(issuer: &str, index: usize) -> String {
    unsigned_jwt(&credential_payload(
        issuer,
        "UniversityDegree",
        Some(status_2021_entry(REVOCATION_URL, "revocation", index)),
    ))
}

fn presentation(credentials: Vec<String>) -> String {
    unsigned_jwt(&json!({
        "iss": "did:example:holder",
        "nonce": "n-0S6_WzA2Mj",
        "vp": {
            "@context": ["https://www.w3.org/2018/credentials/v1"],
            "type": ["VerifiablePresentation"],
            "holder": "did:example:holder",
            "verifiableCredential": credentials,
        }
    }))
}

fn request(value: Value) -> PresentationRequest {
    serde_json::from_value(value).expect("valid presentation request")
}

#[tokio::test]
async fn test_presentation_all_policies_pass() {
    let (runner, fetcher) = runner(&[]);
    let vp = presentation(vec![
        degree("did:example:uni", 1),
        degree("did:example:uni", 2),
    ]);
    let request = request(json!({
        "vp_policies": [{"policy": "minimum-credentials", "args": 2}],
        "vc_policies": ["expired", "not-before", {"policy": "credential-status", "args": {
            "discriminator": "w3c", "purpose": "revocation", "value": 0
        }}],
        "specific_policies": {
            "UniversityDegree": [{"policy": "allowed-issuer", "args": ["did:example:uni"]}]
        }
    }));

    let response = runner
        .verify_presentation(vp, &request, &CancellationHandle::new())
        .await;

    assert!(response.overall_success(), "{:#?}", response);
    assert_eq!(response.results.len(), 3);
    assert_eq!(response.results[0].credential, "VerifiablePresentation");
    assert_eq!(response.results[1].credential, "UniversityDegree");
    assert_eq!(response.results[1].policy_results.len(), 4);
    assert_eq!(response.policies_run, 1 + 4 + 4);
    assert_eq!(fetcher.calls(), 1);
}

#[tokio::test]
async fn test_presentation_reports_each_failure() {
    let (runner, _fetcher) = runner(&[2]);
    let vp = presentation(vec![
        degree("did:example:uni", 1),
        degree("did:example:diploma-mill", 2),
    ]);
    let request = request(json!({
        "vp_policies": [{"policy": "maximum-credentials", "args": 1}],
        "vc_policies": [{"policy": "credential-status", "args": {
            "discriminator": "w3c", "purpose": "revocation", "value": 0
        }}],
        "specific_policies": {
            "UniversityDegree": [{"policy": "allowed-issuer", "args": "did:example:uni"}]
        }
    }));

    let response = runner
        .verify_presentation(vp, &request, &CancellationHandle::new())
        .await;

    assert!(!response.overall_success());
    assert_eq!(
        response.results[0].policy_results[0].error(),
        Some(&PolicyError::MaximumCredentialsExceeded {
            total: 2,
            exceeded: 1
        })
    );
    assert!(response.results[1].is_success());

    let failed = &response.results[2].policy_results;
    assert_eq!(
        failed[0].error(),
        Some(&PolicyError::StatusMismatch {
            expected: 0,
            actual: 1
        })
    );
    assert!(matches!(
        failed[1].error(),
        Some(PolicyError::UntrustedIssuer { issuer, .. }) if issuer == "did:example:diploma-mill"
    ));
    assert_eq!(response.policies_failed(), 3);

    let serialized = serde_json::to_value(&response).unwrap();
    assert_eq!(
        serialized["results"][2]["policy_results"][0]["error"]["error"],
        json!("StatusMismatch")
    );
}

#[tokio::test]
async fn test_unknown_policy_in_presentation() {
    let (runner, _fetcher) = runner(&[]);
    let vp = presentation(vec![degree("did:example:uni", 1)]);
    let request = request(json!({"vc_policies": ["does-not-exist", "expired"]}));

    let response = runner
        .verify_presentation(vp, &request, &CancellationHandle::new())
        .await;

    let results = &response.results[1].policy_results;
    assert_eq!(
        results[0].error(),
        Some(&PolicyError::UnknownPolicy("does-not-exist".into()))
    );
    assert_eq!(results[0].description, "Unknown policy");
    assert!(results[1].is_success());
}
