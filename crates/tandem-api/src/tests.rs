use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use tandem_db::Database;
use tandem_notify::PushClient;

use crate::auth::{AppState, AppStateInner};

fn test_app() -> Router {
    let state: AppState = Arc::new(AppStateInner {
        db: Database::open_in_memory().unwrap(),
        // Must match the middleware's fallback secret so tokens validate.
        jwt_secret: "dev-secret-change-me".into(),
        push: PushClient::disabled(),
    });
    crate::router(state)
}

async fn call(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

struct TestUser {
    token: String,
    invitation_token: String,
}

async fn register(app: &Router, username: &str) -> TestUser {
    let (status, body) = call(
        app,
        "POST",
        "/auth/register",
        None,
        Some(json!({ "username": username, "password": "correct-horse" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    TestUser {
        token: body["token"].as_str().unwrap().to_string(),
        invitation_token: body["invitation_token"].as_str().unwrap().to_string(),
    }
}

/// Register alice and bob and pair them into a confirmed duo.
async fn paired_duo(app: &Router) -> (TestUser, TestUser) {
    let alice = register(app, "alice").await;
    let bob = register(app, "bob").await;
    let (status, _) = call(
        app,
        "POST",
        "/duos/join",
        Some(&bob.token),
        Some(json!({ "invitation_token": alice.invitation_token })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    (alice, bob)
}

fn rule_payload(app_id: &str, daily_max: u32) -> Value {
    json!({
        "app": app_id,
        "isActive": true,
        "interventionType": "FULL",
        "dailyReset": "00:00:00",
        "dailyMaxSeconds": daily_max,
        "hourlyMaxSeconds": 600,
        "sessionMaxSeconds": 300,
        "isDailyMaxSecondsEnforced": true,
        "isHourlyMaxSecondsEnforced": true,
        "isSessionMaxSecondsEnforced": true,
        "isStartupDelayEnabled": true,
    })
}

const APP: &str = "com.example.social";

#[tokio::test]
async fn register_and_login() {
    let app = test_app();
    register(&app, "alice").await;

    let (status, body) = call(
        &app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "username": "alice", "password": "correct-horse" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "alice");
    assert!(body["token"].as_str().is_some());
}

#[tokio::test]
async fn login_rejects_a_wrong_password() {
    let app = test_app();
    register(&app, "alice").await;

    let (status, _) = call(
        &app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "username": "alice", "password": "wrong-password" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn protected_routes_reject_a_missing_token() {
    let app = test_app();
    let (status, _) = call(&app, "GET", "/rules", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn rule_listing_requires_a_confirmed_duo() {
    let app = test_app();
    let alice = register(&app, "alice").await;

    let (status, body) = call(&app, "GET", "/rules", Some(&alice.token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "User is not part of a confirmed duo");
}

#[tokio::test]
async fn create_then_list_annotates_ownership() {
    let app = test_app();
    let (alice, bob) = paired_duo(&app).await;

    let (status, body) = call(
        &app,
        "POST",
        "/rules",
        Some(&alice.token),
        Some(rule_payload(APP, 3600)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["app"], APP);
    assert_eq!(body["isMyRule"], true);
    assert_eq!(body["dailyMaxSeconds"], 3600);
    assert_eq!(body["modificationData"], Value::Null);

    let (status, body) = call(&app, "GET", "/rules", Some(&alice.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["isMyRule"], true);
    assert_eq!(body[0]["modificationData"], Value::Null);

    let (_, body) = call(&app, "GET", "/rules", Some(&bob.token), None).await;
    assert_eq!(body[0]["isMyRule"], false);
}

#[tokio::test]
async fn duplicate_rule_creation_is_a_conflict() {
    let app = test_app();
    let (alice, _) = paired_duo(&app).await;

    call(&app, "POST", "/rules", Some(&alice.token), Some(rule_payload(APP, 3600))).await;
    let (status, _) = call(
        &app,
        "POST",
        "/rules",
        Some(&alice.token),
        Some(rule_payload(APP, 1800)),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn tightening_update_applies_in_place() {
    let app = test_app();
    let (alice, _) = paired_duo(&app).await;
    call(&app, "POST", "/rules", Some(&alice.token), Some(rule_payload(APP, 3600))).await;

    let (status, body) = call(
        &app,
        "PUT",
        "/rules",
        Some(&alice.token),
        Some(rule_payload(APP, 1800)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["dailyMaxSeconds"], 1800);
    assert_eq!(body["modificationData"], Value::Null);

    let (_, body) = call(&app, "GET", "/rules", Some(&alice.token), None).await;
    assert_eq!(body[0]["dailyMaxSeconds"], 1800);
    assert_eq!(body[0]["modificationData"], Value::Null);
}

#[tokio::test]
async fn loosening_update_creates_a_pending_request() {
    let app = test_app();
    let (alice, bob) = paired_duo(&app).await;
    call(&app, "POST", "/rules", Some(&alice.token), Some(rule_payload(APP, 3600))).await;

    let (status, body) = call(
        &app,
        "PUT",
        "/rules",
        Some(&alice.token),
        Some(rule_payload(APP, 7200)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    // The rule itself is untouched until the partner approves.
    assert_eq!(body["dailyMaxSeconds"], 3600);
    assert_eq!(body["modificationData"]["dailyMaxSeconds"], 7200);

    let (_, body) = call(&app, "GET", "/rules", Some(&bob.token), None).await;
    assert_eq!(body[0]["dailyMaxSeconds"], 3600);
    assert_eq!(body[0]["modificationData"]["dailyMaxSeconds"], 7200);
}

#[tokio::test]
async fn a_second_proposal_replaces_the_first() {
    let app = test_app();
    let (alice, _) = paired_duo(&app).await;
    call(&app, "POST", "/rules", Some(&alice.token), Some(rule_payload(APP, 3600))).await;

    call(&app, "PUT", "/rules", Some(&alice.token), Some(rule_payload(APP, 7200))).await;
    call(&app, "PUT", "/rules", Some(&alice.token), Some(rule_payload(APP, 5400))).await;

    let (_, body) = call(&app, "GET", "/rules", Some(&alice.token), None).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["modificationData"]["dailyMaxSeconds"], 5400);
}

#[tokio::test]
async fn cannot_update_a_rule_you_do_not_own() {
    let app = test_app();
    let (alice, bob) = paired_duo(&app).await;
    call(&app, "POST", "/rules", Some(&alice.token), Some(rule_payload(APP, 3600))).await;

    let (status, body) = call(
        &app,
        "PUT",
        "/rules",
        Some(&bob.token),
        Some(rule_payload(APP, 1800)),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Rule not found or not owned by user");
}

#[tokio::test]
async fn approval_overwrites_the_rule_and_consumes_the_request() {
    let app = test_app();
    let (alice, bob) = paired_duo(&app).await;
    call(&app, "POST", "/rules", Some(&alice.token), Some(rule_payload(APP, 3600))).await;
    call(&app, "PUT", "/rules", Some(&alice.token), Some(rule_payload(APP, 7200))).await;

    let (status, body) = call(
        &app,
        "POST",
        "/rules/approve",
        Some(&bob.token),
        Some(json!({ "app": APP })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["dailyMaxSeconds"], 7200);
    // The approver is looking at the partner's rule.
    assert_eq!(body["isMyRule"], false);

    let (_, body) = call(&app, "GET", "/rules", Some(&alice.token), None).await;
    assert_eq!(body[0]["dailyMaxSeconds"], 7200);
    assert_eq!(body[0]["modificationData"], Value::Null);

    // The request is gone — approving again finds nothing.
    let (status, _) = call(
        &app,
        "POST",
        "/rules/approve",
        Some(&bob.token),
        Some(json!({ "app": APP })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn the_proposer_cannot_approve_their_own_request() {
    let app = test_app();
    let (alice, _) = paired_duo(&app).await;
    call(&app, "POST", "/rules", Some(&alice.token), Some(rule_payload(APP, 3600))).await;
    call(&app, "PUT", "/rules", Some(&alice.token), Some(rule_payload(APP, 7200))).await;

    // Approval looks up the request under the partner's key, so the proposer
    // finds nothing to approve.
    let (status, _) = call(
        &app,
        "POST",
        "/rules/approve",
        Some(&alice.token),
        Some(json!({ "app": APP })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn withdraw_removes_the_request_without_touching_the_rule() {
    let app = test_app();
    let (alice, _) = paired_duo(&app).await;
    call(&app, "POST", "/rules", Some(&alice.token), Some(rule_payload(APP, 3600))).await;
    call(&app, "PUT", "/rules", Some(&alice.token), Some(rule_payload(APP, 7200))).await;

    let (status, body) = call(
        &app,
        "DELETE",
        "/rules/modification-request",
        Some(&alice.token),
        Some(json!({ "app": APP })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["dailyMaxSeconds"], 3600);

    let (_, body) = call(&app, "GET", "/rules", Some(&alice.token), None).await;
    assert_eq!(body[0]["modificationData"], Value::Null);
}

#[tokio::test]
async fn the_partner_cannot_withdraw_the_proposers_request() {
    let app = test_app();
    let (alice, bob) = paired_duo(&app).await;
    call(&app, "POST", "/rules", Some(&alice.token), Some(rule_payload(APP, 3600))).await;
    call(&app, "PUT", "/rules", Some(&alice.token), Some(rule_payload(APP, 7200))).await;

    let (status, _) = call(
        &app,
        "DELETE",
        "/rules/modification-request",
        Some(&bob.token),
        Some(json!({ "app": APP })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn deleting_a_rule_removes_its_pending_request() {
    let app = test_app();
    let (alice, bob) = paired_duo(&app).await;
    call(&app, "POST", "/rules", Some(&alice.token), Some(rule_payload(APP, 3600))).await;
    call(&app, "PUT", "/rules", Some(&alice.token), Some(rule_payload(APP, 7200))).await;

    let (status, _) = call(
        &app,
        "DELETE",
        "/rules",
        Some(&alice.token),
        Some(json!({ "app": APP })),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    // The orphaned request must not resurrect the rule on a later approval.
    let (status, _) = call(
        &app,
        "POST",
        "/rules/approve",
        Some(&bob.token),
        Some(json!({ "app": APP })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = call(&app, "GET", "/rules", Some(&alice.token), None).await;
    assert_eq!(body.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn invalid_rule_payloads_report_field_errors() {
    let app = test_app();
    let (alice, _) = paired_duo(&app).await;

    let (status, body) = call(
        &app,
        "POST",
        "/rules",
        Some(&alice.token),
        Some(rule_payload(APP, 0)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["fields"][0]["field"], "dailyMaxSeconds");

    call(&app, "POST", "/rules", Some(&alice.token), Some(rule_payload(APP, 3600))).await;
    let (status, body) = call(
        &app,
        "PUT",
        "/rules",
        Some(&alice.token),
        Some(rule_payload(APP, 0)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["fields"][0]["field"], "dailyMaxSeconds");
}

#[tokio::test]
async fn score_posting_requires_a_confirmed_duo() {
    let app = test_app();
    let alice = register(&app, "alice").await;

    let (status, _) = call(
        &app,
        "POST",
        "/scores",
        Some(&alice.token),
        Some(json!({ "scores": [{ "date": "2025-03-01", "value": 80, "uninterrupted_tracking": true }] })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn score_upsert_is_idempotent_over_http() {
    let app = test_app();
    let (alice, _) = paired_duo(&app).await;

    let entry = |value: i64| json!({ "scores": [{ "date": "2025-03-01", "value": value, "uninterrupted_tracking": true }] });
    let (status, _) = call(&app, "POST", "/scores", Some(&alice.token), Some(entry(80))).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = call(&app, "POST", "/scores", Some(&alice.token), Some(entry(65))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["value"], 65);

    let (status, body) = call(
        &app,
        "GET",
        "/scores?start_date=2025-03-01&end_date=2025-03-01",
        Some(&alice.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["value"], 65);
}

#[tokio::test]
async fn score_range_query_requires_both_dates() {
    let app = test_app();
    let (alice, _) = paired_duo(&app).await;

    let (status, body) = call(
        &app,
        "GET",
        "/scores?start_date=2025-03-01",
        Some(&alice.token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "start_date and end_date parameters are required");
}

#[tokio::test]
async fn duo_join_rejects_bad_tokens_and_double_pairing() {
    let app = test_app();
    let alice = register(&app, "alice").await;
    let bob = register(&app, "bob").await;
    let carol = register(&app, "carol").await;

    // Self-pairing
    let (status, _) = call(
        &app,
        "POST",
        "/duos/join",
        Some(&alice.token),
        Some(json!({ "invitation_token": alice.invitation_token })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Unknown token
    let (status, _) = call(
        &app,
        "POST",
        "/duos/join",
        Some(&alice.token),
        Some(json!({ "invitation_token": Uuid::new_v4() })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Pair alice and bob, then carol tries to join bob.
    let (status, _) = call(
        &app,
        "POST",
        "/duos/join",
        Some(&bob.token),
        Some(json!({ "invitation_token": alice.invitation_token })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = call(
        &app,
        "POST",
        "/duos/join",
        Some(&carol.token),
        Some(json!({ "invitation_token": bob.invitation_token })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn duo_lookup_reflects_pairing_state() {
    let app = test_app();
    let alice = register(&app, "alice").await;

    let (status, _) = call(&app, "GET", "/duos", Some(&alice.token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let bob = register(&app, "bob").await;
    call(
        &app,
        "POST",
        "/duos/join",
        Some(&bob.token),
        Some(json!({ "invitation_token": alice.invitation_token })),
    )
    .await;

    let (status, body) = call(&app, "GET", "/duos", Some(&alice.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["user1"].as_str().is_some());
    assert!(body["user2"].as_str().is_some());
}

#[tokio::test]
async fn push_token_can_be_stored() {
    let app = test_app();
    let alice = register(&app, "alice").await;

    let (status, _) = call(
        &app,
        "PUT",
        "/users/push-token",
        Some(&alice.token),
        Some(json!({ "token": "device-token-123" })),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}
