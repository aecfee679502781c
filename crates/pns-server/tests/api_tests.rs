//! Integration tests for the registry API.

use alloy::signers::{local::PrivateKeySigner, SignerSync};
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use pns_core::{
    hash_phone_number, otp_message_hash, Address, AdminList, DeferredEventSink, ManualClock,
    MemoryEventSink, PhoneHash, Registry,
};
use pns_server::{
    api::{create_router_with_rate_limit, AppState, RateLimitState, CALLER_HEADER},
    config::StorageConfig,
    persistence::Store,
};
use serde_json::{json, Value};
use tower::ServiceExt;

// hardhat account #0
const SIGNER_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
const START: u64 = 1_700_000_000;
const YEAR: u64 = 31_536_000;

struct TestApp {
    app: Router,
    clock: ManualClock,
    signer: PrivateKeySigner,
    phone: PhoneHash,
}

impl TestApp {
    fn new() -> Self {
        Self::with(Store::memory(), RateLimitState::permissive())
    }

    fn with(store: Store, rate_limit: RateLimitState) -> Self {
        let signer: PrivateKeySigner = SIGNER_KEY.parse().unwrap();
        let clock = ManualClock::new(START);
        let events = MemoryEventSink::default();
        let pending = DeferredEventSink::new(events.clone());

        let registry = Registry::builder()
            .clock(clock.clone())
            .access_control(AdminList::new([Address::from(signer.address())]))
            .event_sink(pending.clone())
            .build();

        let state = AppState::new(registry, store, events, pending);

        Self {
            app: create_router_with_rate_limit(state, rate_limit),
            clock,
            signer,
            phone: hash_phone_number("07084462591"),
        }
    }

    fn signer_address(&self) -> String {
        Address::from(self.signer.address()).to_string()
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
        (status, json)
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }

    async fn call(
        &self,
        method: &str,
        uri: &str,
        caller: Option<&str>,
        body: Value,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(caller) = caller {
            builder = builder.header(CALLER_HEADER, caller);
        }

        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    async fn verify(&self, caller: &str) -> (StatusCode, Value) {
        let message = otp_message_hash(&self.phone, 123456);
        let signature = self.signer.sign_message_sync(&message).unwrap();

        self.call(
            "POST",
            &format!("/v1/verifications/{}", self.phone),
            Some(caller),
            json!({
                "message_hash": format!("0x{}", hex::encode(message)),
                "signature": format!("0x{}", hex::encode(signature.as_bytes())),
            }),
        )
        .await
    }

    async fn create(&self) -> (StatusCode, Value) {
        self.create_as(&self.signer_address()).await
    }

    async fn create_as(&self, caller: &str) -> (StatusCode, Value) {
        self.call(
            "POST",
            &format!("/v1/records/{}", self.phone),
            Some(caller),
            json!({ "label": "ETH" }),
        )
        .await
    }
}

#[tokio::test]
async fn test_health_endpoint() {
    let t = TestApp::new();

    let (status, json) = t.get("/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["record_count"], 0);
    assert_eq!(json["now"], START);
}

#[tokio::test]
async fn test_record_not_found() {
    let t = TestApp::new();

    let (status, json) = t.get(&format!("/v1/records/{}", t.phone)).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_malformed_phone_hash() {
    let t = TestApp::new();

    let (status, json) = t.get("/v1/records/0x1234").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_create_without_verification() {
    let t = TestApp::new();

    let (status, json) = t.create().await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["code"], "NOT_VERIFIED");
    assert_eq!(json["error"], "phone number has not been verified");
}

#[tokio::test]
async fn test_verify_create_and_read() {
    let t = TestApp::new();
    let caller = t.signer_address();

    let (status, json) = t.verify(&caller).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "verified");

    let (status, _) = t.create().await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = t.get(&format!("/v1/records/{}", t.phone)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["owner"], caller);
    assert_eq!(json["label"], "ETH");
    assert_eq!(json["status"], "active");
    assert_eq!(json["in_grace"], false);
    assert_eq!(json["expires_at"], START + YEAR);

    let (status, json) = t
        .get(&format!("/v1/records/{}/resolvers", t.phone))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total"], 1);
    assert_eq!(json["resolvers"][0]["address"], caller);

    let (_, json) = t.get("/v1/events").await;
    assert_eq!(json["total"], 2);
    assert_eq!(json["events"][0]["event"], "PhoneVerified");
    assert_eq!(json["events"][1]["event"], "PhoneRecordCreated");

    let (status, json) = t.create().await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "ALREADY_ACTIVE");
}

#[tokio::test]
async fn test_create_with_someone_elses_proof() {
    let t = TestApp::new();
    let caller = t.signer_address();
    t.verify(&caller).await;

    let (status, json) = t
        .create_as("0x0000000000000000000000000000000000000003")
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["code"], "NOT_VERIFIED");

    let (status, json) = t
        .call(
            "POST",
            &format!("/v1/records/{}", t.phone),
            None,
            json!({ "label": "ETH" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["code"], "MISSING_CALLER");

    let (status, _) = t.create().await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_verification_requires_caller() {
    let t = TestApp::new();

    let (status, json) = t
        .call(
            "POST",
            &format!("/v1/verifications/{}", t.phone),
            None,
            json!({ "message_hash": "0x00", "signature": "0x00" }),
        )
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["code"], "MISSING_CALLER");
}

#[tokio::test]
async fn test_verification_signed_by_someone_else() {
    let t = TestApp::new();

    let (status, json) = t
        .verify("0x0000000000000000000000000000000000000001")
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["code"], "INVALID_SIGNATURE");

    let (status, _) = t.create().await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_renew_in_grace_period() {
    let t = TestApp::new();
    let caller = t.signer_address();
    t.verify(&caller).await;
    t.create().await;

    let renew_uri = format!("/v1/records/{}/renew", t.phone);

    let (status, json) = t.call("POST", &renew_uri, Some(&caller), json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "NOT_IN_GRACE_PERIOD");

    t.clock.advance(YEAR + 1);

    let (status, json) = t
        .call(
            "POST",
            &renew_uri,
            Some("0x0000000000000000000000000000000000000002"),
            json!({}),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["code"], "NOT_OWNER");

    let (status, _) = t.call("POST", &renew_uri, Some(&caller), json!({})).await;
    assert_eq!(status, StatusCode::OK);

    let (_, json) = t.get(&format!("/v1/records/{}", t.phone)).await;
    assert_eq!(json["status"], "active");
    assert_eq!(json["created_at"], START + YEAR + 1);
}

#[tokio::test]
async fn test_claim_after_grace() {
    let t = TestApp::new();
    let caller = t.signer_address();
    t.verify(&caller).await;
    t.create().await;

    let claim_uri = format!("/v1/records/{}/claim", t.phone);
    let new_owner = "0x00000000000000000000000000000000000000aa";
    let body = json!({ "new_owner": new_owner, "resolver": new_owner, "label": "BTC" });

    let (status, json) = t.call("POST", &claim_uri, None, body.clone()).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "NOT_EXPIRED");

    t.clock.advance(2 * YEAR);

    let (status, _) = t.call("POST", &claim_uri, None, body).await;
    assert_eq!(status, StatusCode::OK);

    let (_, json) = t.get(&format!("/v1/records/{}", t.phone)).await;
    assert_eq!(json["owner"], new_owner);
    assert_eq!(json["label"], "BTC");

    let (_, json) = t
        .get(&format!("/v1/records/{}/resolvers", t.phone))
        .await;
    assert_eq!(json["total"], 1);
    assert_eq!(json["resolvers"][0]["label"], "BTC");
}

#[tokio::test]
async fn test_link_resolver() {
    let t = TestApp::new();
    let caller = t.signer_address();
    t.verify(&caller).await;
    t.create().await;

    let uri = format!("/v1/records/{}/resolvers", t.phone);
    let body = json!({
        "address": "0x00000000000000000000000000000000000000bb",
        "label": "SOL",
    });

    let (status, json) = t.call("POST", &uri, Some(&caller), body.clone()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "linked");

    let (status, json) = t.call("POST", &uri, Some(&caller), body).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "DUPLICATE_LABEL");

    let (_, json) = t.get(&uri).await;
    assert_eq!(json["total"], 2);
    assert_eq!(json["resolvers"][1]["slot"], 1);
}

#[tokio::test]
async fn test_link_rejects_empty_label() {
    let t = TestApp::new();
    let caller = t.signer_address();

    let (status, json) = t
        .call(
            "POST",
            &format!("/v1/records/{}/resolvers", t.phone),
            Some(&caller),
            json!({ "address": caller, "label": "  " }),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_admin_updates_durations() {
    let t = TestApp::new();
    let admin = t.signer_address();

    let (status, json) = t
        .call(
            "PUT",
            "/v1/admin/expiry-time",
            Some("0x0000000000000000000000000000000000000003"),
            json!({ "duration_secs": 2 * YEAR }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["code"], "UNAUTHORIZED");

    let (status, json) = t
        .call(
            "PUT",
            "/v1/admin/expiry-time",
            Some(&admin),
            json!({ "duration_secs": 2 * YEAR }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["expiry_duration_secs"], 2 * YEAR);

    let (status, _) = t
        .call(
            "PUT",
            "/v1/admin/grace-period",
            Some(&admin),
            json!({ "duration_secs": 86_400 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, json) = t.get("/v1/config").await;
    assert_eq!(json["expiry_duration_secs"], 2 * YEAR);
    assert_eq!(json["grace_duration_secs"], 86_400);
    assert_eq!(json["duration_binding"], "snapshot");
    assert_eq!(json["claim_requires_verification"], false);

    let (_, json) = t.get("/v1/events").await;
    assert_eq!(json["events"][0]["event"], "ExpiryTimeUpdated");
    assert_eq!(json["events"][1]["event"], "GracePeriodUpdated");
}

#[tokio::test]
async fn test_rate_limiting() {
    let t = TestApp::with(Store::memory(), RateLimitState::new(1));

    let (status, _) = t.get("/health").await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = t.get("/health").await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(json["code"], "RATE_LIMIT_EXCEEDED");
}

#[tokio::test]
async fn test_mutations_are_persisted() {
    let dir = tempfile::tempdir().unwrap();
    let config = StorageConfig {
        path: dir.path().join("registry.enc"),
        persist: true,
        encryption_secret: Some("test-secret".into()),
    };

    let t = TestApp::with(Store::from_config(&config), RateLimitState::permissive());
    let caller = t.signer_address();
    t.verify(&caller).await;
    t.create().await;

    let state = Store::from_config(&config).load().await.unwrap().unwrap();
    assert!(state.store.contains(&t.phone));
    assert!(!state.verifications.is_verified(&t.phone));
}

#[tokio::test]
async fn test_failed_save_rolls_back_state_and_events() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("registry.json");
    std::fs::create_dir(&path).unwrap();
    let config = StorageConfig {
        path,
        persist: true,
        encryption_secret: None,
    };

    let t = TestApp::with(Store::from_config(&config), RateLimitState::permissive());
    let caller = t.signer_address();

    let (status, json) = t.verify(&caller).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["code"], "STORAGE_ERROR");

    let (_, json) = t.get("/v1/events").await;
    assert_eq!(json["total"], 0);

    let (status, json) = t.create().await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["code"], "NOT_VERIFIED");

    let (_, json) = t.get("/health").await;
    assert_eq!(json["record_count"], 0);
}
