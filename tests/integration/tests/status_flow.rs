//! Integration test: credential status checking across crates.
//!
//! Credentials are decoded by veritas-envelope, their status entries are
//! resolved by veritas-status and the outcome is reported through the
//! veritas-policies runner.

use std::sync::Arc;
use std::time::Duration;

use ciborium::Value as Cbor;
use serde_json::json;
use veritas_core::{CancellationHandle, EngineConfig, PolicyError, PolicyRequest, PolicyValue};
use veritas_integration_tests::{
    credential_payload, cwt_hex, runner_with, status_2021_entry, status_list_2021_credential,
    token_status_list, unsigned_jwt, CountingFetcher,
};
use veritas_status::StaticFetcher;

const REVOCATION_URL: &str = "https://example.com/credentials/status/3";
const TOKEN_LIST_URL: &str = "https://example.com/statuslists/1";

fn revocation_fetcher(revoked: &[usize]) -> StaticFetcher {
    StaticFetcher::new().with_document(
        REVOCATION_URL,
        status_list_2021_credential(REVOCATION_URL, "revocation", revoked).to_string(),
    )
}

fn credential(index: usize) -> String {
    unsigned_jwt(&credential_payload(
        "did:example:issuer",
        "UniversityDegree",
        Some(status_2021_entry(REVOCATION_URL, "revocation", index)),
    ))
}

// =========================================================================
// W3C status lists
// =========================================================================

#[tokio::test]
async fn test_revoked_and_clear_credentials() {
    let fetcher = Arc::new(CountingFetcher::new(revocation_fetcher(&[94567])));
    let runner = runner_with(Arc::clone(&fetcher), &EngineConfig::default());
    let requests = [PolicyRequest::new("credential-status")];

    let revoked = runner.verify(credential(94567), &requests).await;
    assert!(revoked[0].is_success());
    let value = revoked[0].to_json();
    assert_eq!(value["result"]["revoked"], json!(true));
    assert_eq!(value["result"]["index"], json!(94567));

    let clear = runner.verify(credential(94568), &requests).await;
    assert_eq!(clear[0].to_json()["result"]["revoked"], json!(false));

    // Both lookups hit the same cached list.
    assert_eq!(fetcher.calls(), 1);
}

#[tokio::test]
async fn test_expected_value_turns_revocation_into_failure() {
    let fetcher = Arc::new(CountingFetcher::new(revocation_fetcher(&[7])));
    let runner = runner_with(fetcher, &EngineConfig::default());
    let requests = [PolicyRequest::with_args(
        "credential-status",
        json!({"discriminator": "w3c", "purpose": "revocation", "type": "StatusList2021", "value": 0}),
    )];

    let results = runner.verify(credential(7), &requests).await;
    assert_eq!(
        results[0].error(),
        Some(&PolicyError::StatusMismatch {
            expected: 0,
            actual: 1
        })
    );
    assert_eq!(results[0].to_json()["args"]["purpose"], json!("revocation"));

    let results = runner.verify(credential(8), &requests).await;
    assert!(results[0].is_success());
}

#[tokio::test]
async fn test_credential_without_status() {
    let fetcher = Arc::new(CountingFetcher::new(StaticFetcher::new()));
    let runner = runner_with(Arc::clone(&fetcher), &EngineConfig::default());

    let payload = credential_payload("did:example:issuer", "UniversityDegree", None);
    let results = runner
        .verify(payload, &[PolicyRequest::new("credential-status")])
        .await;

    assert_eq!(results[0].value(), Some(&PolicyValue::NotApplicable));
    assert_eq!(results[0].to_json()["result"], json!({"policy_available": false}));
    assert_eq!(fetcher.calls(), 0);
}

#[tokio::test]
async fn test_unreachable_list_is_a_failure() {
    let fetcher = Arc::new(CountingFetcher::new(StaticFetcher::new()));
    let runner = runner_with(fetcher, &EngineConfig::default());

    let results = runner
        .verify(
            credential(1),
            &[PolicyRequest::new("credential-status"), PolicyRequest::new("expired")],
        )
        .await;

    let error = results[0].error().expect("fetch should fail");
    assert!(matches!(error, PolicyError::FetchFailed { url, .. } if url == REVOCATION_URL));
    assert!(error.is_transient());
    assert_eq!(results[0].to_json()["error"]["error"], json!("FetchFailed"));
    assert!(results[1].is_success());
}

#[tokio::test]
async fn test_concurrent_verifications_share_one_fetch() {
    let fetcher = Arc::new(CountingFetcher::with_delay(
        revocation_fetcher(&[3]),
        Duration::from_millis(50),
    ));
    let runner = runner_with(Arc::clone(&fetcher), &EngineConfig::default());

    let mut handles = Vec::new();
    for index in 0..10 {
        let runner = runner.clone();
        handles.push(tokio::spawn(async move {
            runner
                .verify(credential(index), &[PolicyRequest::new("credential-status")])
                .await
        }));
    }

    for (index, handle) in handles.into_iter().enumerate() {
        let results = handle.await.unwrap();
        assert!(results[0].is_success());
        assert_eq!(
            results[0].to_json()["result"]["revoked"],
            json!(index == 3),
            "index {}",
            index
        );
    }
    assert_eq!(fetcher.calls(), 1);
}

#[tokio::test]
async fn test_cache_disabled_fetches_every_time() {
    let fetcher = Arc::new(CountingFetcher::new(revocation_fetcher(&[])));
    let mut config = EngineConfig::default();
    config.status.cache_ttl_secs = 0;
    let runner = runner_with(Arc::clone(&fetcher), &config);

    for index in 0..3 {
        runner
            .verify(credential(index), &[PolicyRequest::new("credential-status")])
            .await;
    }
    assert_eq!(fetcher.calls(), 3);
}

#[tokio::test]
async fn test_cancellation_keeps_finished_results() {
    let fetcher = Arc::new(CountingFetcher::with_delay(
        revocation_fetcher(&[]),
        Duration::from_secs(30),
    ));
    let runner = runner_with(fetcher, &EngineConfig::default());
    let cancel = CancellationHandle::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let results = runner
        .verify_with_cancel(
            credential(1),
            &[PolicyRequest::new("expired"), PolicyRequest::new("credential-status")],
            &cancel,
        )
        .await;

    assert_eq!(results.len(), 2);
    assert!(results[0].is_success());
    assert_eq!(results[1].error(), Some(&PolicyError::Cancelled));
}

// =========================================================================
// IETF token status lists
// =========================================================================

fn token_credential(index: u64) -> serde_json::Value {
    json!({
        "iss": "https://issuer.example",
        "vct": "https://credentials.example.com/identity_credential",
        "status": {"status_list": {"idx": index, "uri": TOKEN_LIST_URL}}
    })
}

#[tokio::test]
async fn test_token_status_list_served_as_jwt() {
    // 2-bit entries: 0 valid, 1 invalid, 2 suspended.
    let list = unsigned_jwt(&token_status_list(2, &[0, 1, 2, 0, 1]));
    let fetcher = Arc::new(CountingFetcher::new(
        StaticFetcher::new().with_document(TOKEN_LIST_URL, list),
    ));
    let runner = runner_with(fetcher, &EngineConfig::default());
    let requests = [PolicyRequest::with_args(
        "credential-status",
        json!({"discriminator": "ietf", "value": 0}),
    )];

    let results = runner.verify(unsigned_jwt(&token_credential(0)), &requests).await;
    assert!(results[0].is_success());

    let results = runner.verify(unsigned_jwt(&token_credential(2)), &requests).await;
    assert_eq!(
        results[0].error(),
        Some(&PolicyError::StatusMismatch {
            expected: 0,
            actual: 2
        })
    );

    let results = runner.verify(unsigned_jwt(&token_credential(400)), &requests).await;
    assert!(matches!(
        results[0].error(),
        Some(PolicyError::IndexOutOfRange { index: 400, .. })
    ));
}

#[tokio::test]
async fn test_cwt_credential_with_cwt_status_list() {
    let list_claims = Cbor::Map(vec![
        (Cbor::Integer(2.into()), Cbor::Text(TOKEN_LIST_URL.into())),
        (
            Cbor::Integer(65533.into()),
            Cbor::Map(vec![
                (Cbor::Text("bits".into()), Cbor::Integer(1.into())),
                (
                    Cbor::Text("lst".into()),
                    Cbor::Text(
                        token_status_list(1, &[0, 0, 0, 1])["status_list"]["lst"]
                            .as_str()
                            .unwrap()
                            .to_string(),
                    ),
                ),
            ]),
        ),
    ]);
    let credential_claims = |index: i64| {
        Cbor::Map(vec![
            (Cbor::Integer(1.into()), Cbor::Text("https://issuer.example".into())),
            (
                Cbor::Integer(65535.into()),
                Cbor::Map(vec![(
                    Cbor::Text("status_list".into()),
                    Cbor::Map(vec![
                        (Cbor::Text("idx".into()), Cbor::Integer(index.into())),
                        (Cbor::Text("uri".into()), Cbor::Text(TOKEN_LIST_URL.into())),
                    ]),
                )]),
            ),
        ])
    };

    let fetcher = Arc::new(CountingFetcher::new(
        StaticFetcher::new().with_document(TOKEN_LIST_URL, cwt_hex(&list_claims)),
    ));
    let runner = runner_with(fetcher, &EngineConfig::default());
    let requests = [PolicyRequest::new("credential-status")];

    let results = runner.verify(cwt_hex(&credential_claims(3)), &requests).await;
    let check = match results[0].value() {
        Some(PolicyValue::Status(check)) => check.clone(),
        other => panic!("expected a status value, got {:?}", other),
    };
    assert_eq!(check.status_type, "TokenStatusList");
    assert_eq!(check.value, 1);

    let results = runner.verify(cwt_hex(&credential_claims(2)), &requests).await;
    assert_eq!(results[0].to_json()["result"]["value"], json!(0));
}
