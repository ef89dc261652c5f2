//! Integration test: signature verification through the injected
//! Ed25519 verifier, combined with the other built-in policies.

use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;
use serde_json::json;
use veritas_core::{EngineConfig, PolicyError, PolicyRequest};
use veritas_integration_tests::{
    credential_payload, runner_with_verifier, signed_jwt, CountingFetcher,
};
use veritas_policies::policies::Ed25519KeyVerifier;
use veritas_policies::PolicyRunner;
use veritas_status::StaticFetcher;

const ISSUER: &str = "did:example:issuer";

fn runner(trusted: &[(&str, &SigningKey)]) -> PolicyRunner {
    let verifier = Ed25519KeyVerifier::new();
    for (id, key) in trusted {
        verifier.add_trusted_key(*id, key.verifying_key());
    }
    runner_with_verifier(
        Arc::new(CountingFetcher::new(StaticFetcher::new())),
        Arc::new(verifier),
        &EngineConfig::default(),
    )
}

#[tokio::test]
async fn test_signed_credential_by_issuer_key() {
    let key = SigningKey::generate(&mut OsRng);
    let runner = runner(&[(ISSUER, &key)]);
    let jwt = signed_jwt(&key, None, &credential_payload(ISSUER, "UniversityDegree", None));

    let results = runner
        .verify(
            jwt,
            &[
                PolicyRequest::new("signature"),
                PolicyRequest::new("expired"),
                PolicyRequest::with_args("allowed-issuer", json!([ISSUER])),
            ],
        )
        .await;

    assert!(results.iter().all(|r| r.is_success()), "{:#?}", results);
    assert_eq!(
        results[0].to_json()["result"],
        json!({"alg": "EdDSA", "key": ISSUER})
    );
}

#[tokio::test]
async fn test_key_selected_by_kid() {
    let key = SigningKey::generate(&mut OsRng);
    let runner = runner(&[("did:example:issuer#key-1", &key)]);
    let jwt = signed_jwt(
        &key,
        Some("did:example:issuer#key-1"),
        &credential_payload(ISSUER, "UniversityDegree", None),
    );

    let results = runner.verify(jwt, &[PolicyRequest::new("signature")]).await;
    assert_eq!(
        results[0].to_json()["result"]["key"],
        json!("did:example:issuer#key-1")
    );
}

#[tokio::test]
async fn test_forged_and_untrusted_signatures() {
    let key = SigningKey::generate(&mut OsRng);
    let impostor = SigningKey::generate(&mut OsRng);
    let runner = runner(&[(ISSUER, &key)]);
    let requests = [PolicyRequest::new("signature")];

    // Signed by a key the verifier does not trust for this issuer.
    let forged = signed_jwt(&impostor, None, &credential_payload(ISSUER, "UniversityDegree", None));
    let results = runner.verify(forged, &requests).await;
    assert!(matches!(results[0].error(), Some(PolicyError::InvalidSignature(_))));

    // Payload swapped after signing.
    let genuine = signed_jwt(&key, None, &credential_payload(ISSUER, "UniversityDegree", None));
    let segments: Vec<&str> = genuine.split('.').collect();
    let swapped = URL_SAFE_NO_PAD.encode(credential_payload(ISSUER, "AdminBadge", None).to_string());
    let tampered = format!("{}.{}.{}", segments[0], swapped, segments[2]);
    let results = runner.verify(tampered, &requests).await;
    assert!(matches!(results[0].error(), Some(PolicyError::InvalidSignature(_))));
}

#[tokio::test]
async fn test_signature_needs_the_raw_envelope() {
    let key = SigningKey::generate(&mut OsRng);
    let runner = runner(&[(ISSUER, &key)]);

    let results = runner
        .verify(
            credential_payload(ISSUER, "UniversityDegree", None),
            &[PolicyRequest::new("signature"), PolicyRequest::new("expired")],
        )
        .await;

    assert!(matches!(
        results[0].error(),
        Some(PolicyError::UnsupportedInput { policy, .. }) if policy == "signature"
    ));
    assert!(results[1].is_success());
}
