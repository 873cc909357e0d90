//! Checkout state machine integration tests.

mod common;

use axum::http::StatusCode;
use common::TestHarness;
use kazi_store::Store;
use serde_json::json;

const ETH_ADDRESS: &str = "0x52908400098527886E0F7030069857D2E4169EE7";
const BTC_ADDRESS: &str = "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa";

async fn open_draft(harness: &TestHarness, plan: &str) -> String {
    let response = harness
        .server
        .post("/v1/checkout")
        .add_header("authorization", harness.auth_header())
        .json(&json!({ "plan": plan }))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["state"], "selecting_method");
    body["id"].as_str().unwrap().to_string()
}

async fn select_method(harness: &TestHarness, id: &str, method: &str) {
    let response = harness
        .server
        .post(&format!("/v1/checkout/{id}/method"))
        .add_header("authorization", harness.auth_header())
        .json(&json!({ "method": method }))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["state"], "filling_details");
}

fn billing_block() -> serde_json::Value {
    json!({
        "full_name": "Jane Fixit",
        "address": "12 Biashara Street",
        "city": "Nairobi",
        "country": "Kenya",
        "postal_code": "00100",
        "email": "jane@x.com"
    })
}

// ============================================================================
// Happy path (mobile money)
// ============================================================================

#[tokio::test]
async fn mpesa_checkout_end_to_end() {
    let harness = TestHarness::new();
    let id = open_draft(&harness, "client-pro").await;
    select_method(&harness, &id, "mpesa").await;

    // Validate the phone number -> Reviewing.
    let response = harness
        .server
        .put(&format!("/v1/checkout/{id}/details"))
        .add_header("authorization", harness.auth_header())
        .json(&json!({ "phone": "0712345678" }))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["state"], "reviewing");

    // Explicit confirmation settles and activates.
    let response = harness
        .server
        .post(&format!("/v1/checkout/{id}/confirm"))
        .add_header("authorization", harness.auth_header())
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "succeeded");
    assert_eq!(body["plan"], "client-pro");
    assert!(body["reference"].as_str().unwrap().starts_with("sim_"));
    assert!(body["redirect"].as_str().unwrap().ends_with("/dashboard"));

    // The entitlement is live and not a trial.
    let response = harness
        .server
        .get("/v1/access")
        .add_header("authorization", harness.auth_header())
        .await;
    let body: serde_json::Value = response.json();
    assert_eq!(body["access"], "granted");
    assert_eq!(body["subscription"]["is_trial"], false);
    assert_eq!(body["subscription"]["method"], "mpesa");

    // The draft was destroyed on success.
    harness
        .server
        .get(&format!("/v1/checkout/{id}"))
        .add_header("authorization", harness.auth_header())
        .await
        .assert_status_not_found();
}

#[tokio::test]
async fn subscribing_replaces_an_existing_trial() {
    let harness = TestHarness::new();
    harness.seed_backdated_trial(kazi_core::PlanId::HandymanBasic, 0);

    let id = open_draft(&harness, "client-pro").await;
    select_method(&harness, &id, "mpesa").await;
    harness
        .server
        .put(&format!("/v1/checkout/{id}/details"))
        .add_header("authorization", harness.auth_header())
        .json(&json!({ "phone": "0712345678" }))
        .await
        .assert_status_ok();
    harness
        .server
        .post(&format!("/v1/checkout/{id}/confirm"))
        .add_header("authorization", harness.auth_header())
        .await
        .assert_status_ok();

    let records = harness.store.list_entitlements(&harness.test_email).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records.iter().filter(|r| r.active).count(), 1);
    let active = harness
        .store
        .get_active_entitlement(&harness.test_email)
        .unwrap()
        .unwrap();
    assert!(!active.is_trial);
    assert_eq!(active.plan_id, kazi_core::PlanId::ClientPro);
}

// ============================================================================
// Validation
// ============================================================================

#[tokio::test]
async fn short_phone_number_is_a_field_error() {
    let harness = TestHarness::new();
    let id = open_draft(&harness, "client-pro").await;
    select_method(&harness, &id, "mpesa").await;

    let response = harness
        .server
        .put(&format!("/v1/checkout/{id}/details"))
        .add_header("authorization", harness.auth_header())
        .json(&json!({ "phone": "12345" }))
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "validation_failed");
    assert_eq!(body["error"]["details"]["fields"][0]["field"], "phone");

    // No transition happened.
    let response = harness
        .server
        .get(&format!("/v1/checkout/{id}"))
        .add_header("authorization", harness.auth_header())
        .await;
    let body: serde_json::Value = response.json();
    assert_eq!(body["state"], "filling_details");
    assert_eq!(body["errors"][0]["field"], "phone");
}

#[tokio::test]
async fn card_validation_rules() {
    let harness = TestHarness::new();
    let id = open_draft(&harness, "business-plus").await;
    select_method(&harness, &id, "card").await;

    // 12-digit number and a 13th month: rejected field by field.
    let response = harness
        .server
        .put(&format!("/v1/checkout/{id}/details"))
        .add_header("authorization", harness.auth_header())
        .json(&json!({
            "card": {
                "holder_name": "Jane Fixit",
                "number": "4242 4242 4242",
                "expiry": "13/25",
                "cvv": "123"
            },
            "billing": billing_block()
        }))
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: serde_json::Value = response.json();
    let fields: Vec<&str> = body["error"]["details"]["fields"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["field"].as_str().unwrap())
        .collect();
    assert!(fields.contains(&"number"));
    assert!(fields.contains(&"expiry"));

    // 16 digits with spaces and a real month: accepted.
    let response = harness
        .server
        .put(&format!("/v1/checkout/{id}/details"))
        .add_header("authorization", harness.auth_header())
        .json(&json!({
            "card": {
                "holder_name": "Jane Fixit",
                "number": "4242 4242 4242 4242",
                "expiry": "07/26",
                "cvv": "123"
            },
            "billing": billing_block()
        }))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["state"], "reviewing");
}

#[tokio::test]
async fn card_method_requires_the_billing_block() {
    let harness = TestHarness::new();
    let id = open_draft(&harness, "business-plus").await;
    select_method(&harness, &id, "card").await;

    let response = harness
        .server
        .put(&format!("/v1/checkout/{id}/details"))
        .add_header("authorization", harness.auth_header())
        .json(&json!({
            "card": {
                "holder_name": "Jane Fixit",
                "number": "4242424242424242",
                "expiry": "07/26",
                "cvv": "123"
            }
        }))
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: serde_json::Value = response.json();
    let fields: Vec<&str> = body["error"]["details"]["fields"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["field"].as_str().unwrap())
        .collect();
    assert!(fields.contains(&"full_name"));
    assert!(fields.contains(&"city"));
}

#[tokio::test]
async fn wallet_email_is_pattern_checked() {
    let harness = TestHarness::new();
    let id = open_draft(&harness, "client-pro").await;
    select_method(&harness, &id, "paypal").await;

    let response = harness
        .server
        .put(&format!("/v1/checkout/{id}/details"))
        .add_header("authorization", harness.auth_header())
        .json(&json!({ "email": "not-an-email", "billing": billing_block() }))
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);

    let response = harness
        .server
        .put(&format!("/v1/checkout/{id}/details"))
        .add_header("authorization", harness.auth_header())
        .json(&json!({ "email": "payer@wallet.example", "billing": billing_block() }))
        .await;
    response.assert_status_ok();
}

// ============================================================================
// Crypto intake
// ============================================================================

#[tokio::test]
async fn ethereum_address_shape_is_enforced() {
    let harness = TestHarness::new();
    let id = open_draft(&harness, "client-pro").await;
    select_method(&harness, &id, "crypto-ethereum").await;

    // Too short / wrong prefix.
    for bad in ["0x1234", BTC_ADDRESS] {
        let response = harness
            .server
            .put(&format!("/v1/checkout/{id}/details"))
            .add_header("authorization", harness.auth_header())
            .json(&json!({ "address": bad }))
            .await;
        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        let body: serde_json::Value = response.json();
        assert_eq!(body["error"]["details"]["fields"][0]["field"], "address");
    }

    let response = harness
        .server
        .put(&format!("/v1/checkout/{id}/details"))
        .add_header("authorization", harness.auth_header())
        .json(&json!({ "address": ETH_ADDRESS }))
        .await;
    response.assert_status_ok();
}

#[tokio::test]
async fn scanned_bip21_payload_is_accepted_into_the_draft() {
    let harness = TestHarness::new();
    let id = open_draft(&harness, "client-pro").await;
    select_method(&harness, &id, "crypto-bitcoin").await;

    let response = harness
        .server
        .post(&format!("/v1/checkout/{id}/scan"))
        .add_header("authorization", harness.auth_header())
        .json(&json!({ "payload": format!("bitcoin:{BTC_ADDRESS}?amount=0.01") }))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["address"], BTC_ADDRESS);
    assert_eq!(body["draft"]["state"], "reviewing");
}

#[tokio::test]
async fn scanned_payload_failing_the_shape_check_does_not_transition() {
    let harness = TestHarness::new();
    let id = open_draft(&harness, "client-pro").await;
    select_method(&harness, &id, "crypto-bitcoin").await;

    // An Ethereum address scanned into a Bitcoin draft.
    let response = harness
        .server
        .post(&format!("/v1/checkout/{id}/scan"))
        .add_header("authorization", harness.auth_header())
        .json(&json!({ "payload": format!("ethereum:{ETH_ADDRESS}") }))
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);

    let response = harness
        .server
        .get(&format!("/v1/checkout/{id}"))
        .add_header("authorization", harness.auth_header())
        .await;
    let body: serde_json::Value = response.json();
    assert_eq!(body["state"], "filling_details");
}

#[tokio::test]
async fn scan_on_a_non_crypto_draft_is_a_conflict() {
    let harness = TestHarness::new();
    let id = open_draft(&harness, "client-pro").await;
    select_method(&harness, &id, "mpesa").await;

    harness
        .server
        .post(&format!("/v1/checkout/{id}/scan"))
        .add_header("authorization", harness.auth_header())
        .json(&json!({ "payload": BTC_ADDRESS }))
        .await
        .assert_status(StatusCode::CONFLICT);
}

// ============================================================================
// Machine discipline & failure handling
// ============================================================================

#[tokio::test]
async fn confirm_before_review_is_rejected() {
    let harness = TestHarness::new();
    let id = open_draft(&harness, "client-pro").await;
    select_method(&harness, &id, "mpesa").await;

    harness
        .server
        .post(&format!("/v1/checkout/{id}/confirm"))
        .add_header("authorization", harness.auth_header())
        .await
        .assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn declined_settlement_preserves_the_draft_for_retry() {
    let harness = TestHarness::new();
    let id = open_draft(&harness, "client-pro").await;
    select_method(&harness, &id, "mpesa").await;

    // The designated always-decline number.
    harness
        .server
        .put(&format!("/v1/checkout/{id}/details"))
        .add_header("authorization", harness.auth_header())
        .json(&json!({ "phone": "0712340000" }))
        .await
        .assert_status_ok();

    let response = harness
        .server
        .post(&format!("/v1/checkout/{id}/confirm"))
        .add_header("authorization", harness.auth_header())
        .await;
    response.assert_status(StatusCode::BAD_GATEWAY);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "settlement_failed");

    // Draft survives in Failed with its details and a top-level error.
    let response = harness
        .server
        .get(&format!("/v1/checkout/{id}"))
        .add_header("authorization", harness.auth_header())
        .await;
    let body: serde_json::Value = response.json();
    assert_eq!(body["state"], "failed");
    assert_eq!(body["details_complete"], true);
    assert!(body["last_error"].as_str().unwrap().contains("rejected"));

    // No entitlement was written.
    assert!(harness
        .store
        .get_active_entitlement(&harness.test_email)
        .unwrap()
        .is_none());

    // Correct the number and retry to success.
    harness
        .server
        .put(&format!("/v1/checkout/{id}/details"))
        .add_header("authorization", harness.auth_header())
        .json(&json!({ "phone": "0712345678" }))
        .await
        .assert_status_ok();
    harness
        .server
        .post(&format!("/v1/checkout/{id}/confirm"))
        .add_header("authorization", harness.auth_header())
        .await
        .assert_status_ok();

    assert!(harness
        .store
        .get_active_entitlement(&harness.test_email)
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn drafts_are_invisible_to_other_accounts() {
    let harness = TestHarness::new();
    let id = open_draft(&harness, "client-pro").await;

    harness
        .server
        .get(&format!("/v1/checkout/{id}"))
        .add_header("authorization", TestHarness::auth_header_for("b@x.com"))
        .await
        .assert_status_not_found();
}

#[tokio::test]
async fn cancelled_draft_is_gone() {
    let harness = TestHarness::new();
    let id = open_draft(&harness, "client-pro").await;

    harness
        .server
        .delete(&format!("/v1/checkout/{id}"))
        .add_header("authorization", harness.auth_header())
        .await
        .assert_status_ok();

    harness
        .server
        .get(&format!("/v1/checkout/{id}"))
        .add_header("authorization", harness.auth_header())
        .await
        .assert_status_not_found();
}

#[tokio::test]
async fn checkout_publishes_the_activation() {
    let harness = TestHarness::new();
    let id = open_draft(&harness, "client-pro").await;
    select_method(&harness, &id, "mpesa").await;
    harness
        .server
        .put(&format!("/v1/checkout/{id}/details"))
        .add_header("authorization", harness.auth_header())
        .json(&json!({ "phone": "0712345678" }))
        .await
        .assert_status_ok();

    let mut rx = harness.state.events.subscribe();

    harness
        .server
        .post(&format!("/v1/checkout/{id}/confirm"))
        .add_header("authorization", harness.auth_header())
        .await
        .assert_status_ok();

    let event = rx.try_recv().expect("settlement must publish");
    assert!(event.active);
    assert_eq!(event.plan, Some(kazi_core::PlanId::ClientPro));
}
