//! # Integration Tests for tas-api
//!
//! Router-level tests: health probes, error body shape and status mapping,
//! a revoke run over the wire with a real DID-Auth proof, offers, and the
//! metrics endpoint.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use tas_api::AppState;
use tas_client::{DidRegistry, LoggingNotifier, MemoryDidRegistry, MemoryIssuer, PlanProfile};
use tas_core::{Did, DidKeyUrl, Nonce, Timestamp};
use tas_crypto::{EccCurve, SigningKeyPair};
use tas_engine::{EngineConfig, TaIdentity, TasEngine, VcPlan};
use tas_state::{EntityRecord, EntityRole, EntityStatus, EntityStore, MemoryStore};
use tas_vc::proof::sign;
use tas_vc::{DidAuth, DidDocument, Proof, ProofPurpose, ProofType, VcMeta, VcStatus};

const VC_ID: &str = "urn:uuid:3f1c2a6e-0000-4000-8000-000000000001";

struct TestApp {
    router: axum::Router,
    registry: Arc<MemoryDidRegistry>,
    issuer: Arc<MemoryIssuer>,
    holder_did: Did,
    holder_key: SigningKeyPair,
}

fn test_app() -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let registry = Arc::new(MemoryDidRegistry::new());
    let issuer = Arc::new(MemoryIssuer::new());

    let issuer_did = Did::new("did:omn:issuer").unwrap();
    issuer.add_issuer(
        issuer_did.clone(),
        "Acme Issuer",
        SigningKeyPair::generate(EccCurve::Secp256k1),
        "assert-1",
    );
    issuer.add_plan(
        "plan-1",
        PlanProfile {
            title: "Identity".into(),
            credential_schema: "https://schema.example/identity".into(),
            validity_secs: 3600,
        },
    );
    store
        .upsert_entity(EntityRecord {
            did: issuer_did.clone(),
            name: "Acme Issuer".into(),
            role: EntityRole::Issuer,
            server_url: None,
            status: EntityStatus::Enrolled,
            certificate_vc_id: None,
        })
        .unwrap();

    let holder_did = Did::new("did:omn:holder").unwrap();
    let holder_key = SigningKeyPair::generate(EccCurve::Secp256r1);
    registry.seed_document(DidDocument::new(holder_did.clone()).with_key(
        "auth",
        &holder_key.public_key(),
        &[ProofPurpose::Authentication],
    ));
    let now = Timestamp::now();
    registry
        .register_vc_meta(&VcMeta {
            id: VC_ID.into(),
            issuer: issuer_did.clone(),
            subject: holder_did.clone(),
            vc_plan_id: "plan-1".into(),
            credential_schema: "https://schema.example/identity".into(),
            status: VcStatus::Active,
            issuance_date: now,
            valid_from: now,
            valid_until: now.plus_hours(24),
        })
        .unwrap();

    let config = EngineConfig {
        vc_plans: vec![VcPlan {
            vc_plan_id: "plan-1".into(),
            name: "Identity".into(),
            issuer: issuer_did,
            types: vec!["IdentityCredential".into()],
            schema_id: "https://schema.example/identity".into(),
            validity_hours: 24,
        }],
        ..EngineConfig::default()
    };
    let engine = TasEngine::new(
        config,
        TaIdentity::generate(Did::new("did:omn:ta").unwrap(), EccCurve::Secp256r1),
        store,
        registry.clone(),
        issuer.clone(),
        Arc::new(LoggingNotifier::new()),
    );
    engine.publish_identity().unwrap();

    TestApp {
        router: tas_api::app(AppState::new(engine)),
        registry,
        issuer,
        holder_did,
        holder_key,
    }
}

impl TestApp {
    async fn get(&self, uri: &str) -> (StatusCode, String) {
        let response = self
            .router
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        (status, body_string(response).await)
    }

    async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        self.post_raw(path, body.to_string()).await
    }

    async fn post_raw(&self, path: &str, body: String) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/tas/api/v1{path}"))
                    .header("content-type", "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let text = body_string(response).await;
        let value = if text.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap()
        };
        (status, value)
    }

    fn did_auth(&self, nonce: &Nonce) -> Value {
        let vm = DidKeyUrl::from_parts(&self.holder_did, "auth").unwrap();
        let mut auth = DidAuth {
            did: self.holder_did.clone(),
            auth_nonce: nonce.clone(),
            proof: Proof::unsigned(ProofType::for_curve(EccCurve::Secp256r1), vm.clone(), ProofPurpose::Authentication),
        };
        sign(&mut auth, &self.holder_key, vm, ProofPurpose::Authentication).unwrap();
        serde_json::to_value(auth).unwrap()
    }
}

async fn body_string(response: axum::http::Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn assert_error(body: &Value, code: &str) {
    assert_eq!(body["code"], code, "body: {body}");
    assert!(body["description"].as_str().is_some_and(|d| !d.is_empty()));
    assert_eq!(body.as_object().unwrap().len(), 2);
}

// -- Health Probes ------------------------------------------------------------

#[tokio::test]
async fn test_liveness_probe() {
    let app = test_app();
    let (status, body) = app.get("/health/liveness").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ok");
}

#[tokio::test]
async fn test_readiness_probe() {
    let app = test_app();
    let (status, body) = app.get("/health/readiness").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ready");
}

// -- Error Mapping ------------------------------------------------------------

#[tokio::test]
async fn test_malformed_body_is_invalid_request() {
    let app = test_app();
    let (status, body) = app.post_raw("/propose-issue-vc", "{not json".into()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_error(&body, "INVALID_REQUEST");
}

#[tokio::test]
async fn test_invalid_did_is_rejected() {
    let app = test_app();
    let (status, body) = app
        .post("/propose-issue-vc", json!({"vcPlanId": "plan-1", "issuer": "not-a-did"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_error(&body, "INVALID_REQUEST");
}

#[tokio::test]
async fn test_unknown_plan_is_not_found() {
    let app = test_app();
    let (status, body) = app
        .post("/propose-issue-vc", json!({"vcPlanId": "missing", "issuer": "did:omn:issuer"}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_error(&body, "VC_PLAN_NOT_FOUND");
}

#[tokio::test]
async fn test_issuer_mismatch_is_conflict() {
    let app = test_app();
    let (status, body) = app
        .post("/propose-issue-vc", json!({"vcPlanId": "plan-1", "issuer": "did:omn:other"}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_error(&body, "ISSUER_MISMATCH");
}

#[tokio::test]
async fn test_unknown_transaction() {
    let app = test_app();
    let (status, body) = app
        .post(
            "/confirm-revoke-vc",
            json!({"txId": "7d3c9a52-1b2e-4f6a-9c0d-2e8b1f4a5c6d"}),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_error(&body, "TRANSACTION_NOT_FOUND");

    let (status, _) = app.get("/tas/api/v1/transactions/not-a-uuid").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// -- Workflows ----------------------------------------------------------------

#[tokio::test]
async fn test_propose_issue_vc_opens_a_transaction() {
    let app = test_app();
    let (status, body) = app
        .post("/propose-issue-vc", json!({"vcPlanId": "plan-1", "issuer": "did:omn:issuer"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    let tx_id = body["txId"].as_str().unwrap().to_string();

    let (status, text) = app.get(&format!("/tas/api/v1/transactions/{tx_id}")).await;
    assert_eq!(status, StatusCode::OK);
    let view: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(view["type"], "ISSUE_VC");
    assert_eq!(view["status"], "IN_PROGRESS");
    assert_eq!(view["subTransactions"].as_array().unwrap().len(), 1);
    assert!(view.get("authNonce").is_none());
}

#[tokio::test]
async fn test_revoke_over_http() {
    let app = test_app();
    let (status, proposed) = app.post("/propose-revoke-vc", json!({"vcId": VC_ID})).await;
    assert_eq!(status, StatusCode::OK);
    let tx_id = proposed["txId"].clone();
    let nonce = Nonce::decode(proposed["authNonce"].as_str().unwrap()).unwrap();

    let (status, body) = app
        .post("/request-revoke-vc", json!({"txId": tx_id, "didAuth": app.did_auth(&nonce)}))
        .await;
    assert_eq!(status, StatusCode::OK, "body: {body}");
    let (status, _) = app.post("/confirm-revoke-vc", json!({"txId": tx_id})).await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(app.registry.get_vc_meta(VC_ID).unwrap().unwrap().status, VcStatus::Revoked);
    assert_eq!(app.issuer.revoked(), vec![VC_ID.to_string()]);

    let (status, body) = app.post("/propose-revoke-vc", json!({"vcId": VC_ID})).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_error(&body, "VC_ALREADY_REVOKED");
}

#[tokio::test]
async fn test_wrong_nonce_is_unauthorized() {
    let app = test_app();
    let (_, proposed) = app.post("/propose-revoke-vc", json!({"vcId": VC_ID})).await;
    let (status, body) = app
        .post(
            "/request-revoke-vc",
            json!({"txId": proposed["txId"], "didAuth": app.did_auth(&Nonce::from_bytes(vec![9u8; 16]))}),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_error(&body, "AUTH_NONCE_MISMATCH");
}

#[tokio::test]
async fn test_issue_offer_by_email() {
    let app = test_app();
    let (status, body) = app
        .post(
            "/request-issue-offer",
            json!({
                "vcPlanId": "plan-1",
                "target": {"channel": "EMAIL", "address": "holder@example.com"}
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["notified"], true);
    assert_eq!(body["offerData"]["payloadType"], "ISSUE_VC");
    assert!(body["offerId"].as_str().is_some());
}

#[tokio::test]
async fn test_register_push_token() {
    let app = test_app();
    let (status, body) = app
        .post("/register-push-token", json!({"did": "did:omn:holder", "token": "device-1"}))
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);

    let (status, body) = app
        .post("/register-push-token", json!({"did": "did:omn:holder", "token": " "}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_error(&body, "INVALID_REQUEST");
}

// -- Metrics ------------------------------------------------------------------

#[tokio::test]
async fn test_metrics_count_requests() {
    let app = test_app();
    app.post("/propose-issue-vc", json!({"vcPlanId": "missing", "issuer": "did:omn:issuer"}))
        .await;
    let (status, body) = app.get("/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("tas_http_requests_total 1"), "{body}");
    assert!(body.contains("tas_http_errors_total 1"), "{body}");
}
