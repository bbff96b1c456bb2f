mod common;

use anyhow::Result;
use axum::http::StatusCode;
use chrono::Duration;
use serde_json::json;
use uuid::Uuid;

use campus_api::types::{AccountStatus, Role};
use common::{identity, send, send_with_headers, test_app, test_state, FakeIdentityStore};

#[tokio::test]
async fn health_endpoint_responds() -> Result<()> {
    let state = test_state(FakeIdentityStore::new());
    let (status, body) = send(test_app(state), "GET", "/health", None, None).await;

    // OK or SERVICE_UNAVAILABLE both count as liveness - the test pool has no
    // backing database.
    assert!(
        status == StatusCode::OK || status == StatusCode::SERVICE_UNAVAILABLE,
        "unexpected status: {}",
        status
    );
    assert!(body.get("success").is_some());
    Ok(())
}

#[tokio::test]
async fn banner_reports_anonymous_without_token() -> Result<()> {
    let state = test_state(FakeIdentityStore::new());
    let (status, body) = send(test_app(state), "GET", "/", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["authenticated"], false);
    Ok(())
}

#[tokio::test]
async fn banner_reflects_identity_with_token() -> Result<()> {
    let store = FakeIdentityStore::new();
    let stu = identity("stu1", "pw123", Role::Student, AccountStatus::Active);
    let stu_id = stu.id;
    store.add(stu);
    let state = test_state(store);
    let token = state.tokens.issue(stu_id, Role::Student)?;

    let (status, body) = send(test_app(state), "GET", "/", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["authenticated"], true);
    assert_eq!(body["data"]["identity"]["role"], "student");
    Ok(())
}

#[tokio::test]
async fn banner_degrades_on_bad_token() -> Result<()> {
    let state = test_state(FakeIdentityStore::new());
    let (status, body) = send(test_app(state), "GET", "/", Some("garbage"), None).await;

    // Optional auth: an unusable token leaves the caller anonymous.
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["authenticated"], false);
    Ok(())
}

#[tokio::test]
async fn missing_token_is_rejected() -> Result<()> {
    let state = test_state(FakeIdentityStore::new());
    let (status, body) = send(test_app(state), "GET", "/api/auth/whoami", None, None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "no authentication token provided");
    Ok(())
}

#[tokio::test]
async fn garbage_token_is_rejected() -> Result<()> {
    let state = test_state(FakeIdentityStore::new());
    let (status, body) = send(
        test_app(state),
        "GET",
        "/api/auth/whoami",
        Some("not.a.token"),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "invalid token");
    Ok(())
}

#[tokio::test]
async fn expired_token_is_rejected() -> Result<()> {
    let store = FakeIdentityStore::new();
    let stu = identity("stu1", "pw123", Role::Student, AccountStatus::Active);
    let stu_id = stu.id;
    store.add(stu);
    let state = test_state(store);
    let token = state
        .tokens
        .issue_with_ttl(stu_id, Role::Student, Duration::hours(-1))?;

    let (status, body) = send(test_app(state), "GET", "/api/auth/whoami", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "token expired");
    Ok(())
}

#[tokio::test]
async fn valid_token_resolves_identity() -> Result<()> {
    let store = FakeIdentityStore::new();
    let teacher = identity("tch1", "pw123", Role::Teacher, AccountStatus::Active);
    let teacher_id = teacher.id;
    store.add(teacher);
    let state = test_state(store);
    let token = state.tokens.issue(teacher_id, Role::Teacher)?;

    let (status, body) = send(test_app(state), "GET", "/api/auth/whoami", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["username"], "tch1");
    assert_eq!(body["data"]["role"], "teacher");
    assert!(
        body["data"].get("credential_hash").is_none(),
        "credential hash must never serialize"
    );
    Ok(())
}

#[tokio::test]
async fn cookie_token_is_accepted() -> Result<()> {
    let store = FakeIdentityStore::new();
    let stu = identity("stu1", "pw123", Role::Student, AccountStatus::Active);
    let stu_id = stu.id;
    store.add(stu);
    let state = test_state(store);
    let token = state.tokens.issue(stu_id, Role::Student)?;

    let headers = vec![("cookie".to_string(), format!("theme=dark; token={}", token))];
    let (status, body) =
        send_with_headers(test_app(state), "GET", "/api/auth/whoami", &headers, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["username"], "stu1");
    Ok(())
}

#[tokio::test]
async fn header_takes_precedence_over_cookie() -> Result<()> {
    let store = FakeIdentityStore::new();
    let stu = identity("stu1", "pw123", Role::Student, AccountStatus::Active);
    let stu_id = stu.id;
    store.add(stu);
    let state = test_state(store);
    let good = state.tokens.issue(stu_id, Role::Student)?;

    // A malformed Authorization header loses, even with a valid cookie.
    let headers = vec![
        ("authorization".to_string(), "Bearer bad-token".to_string()),
        ("cookie".to_string(), format!("token={}", good)),
    ];
    let (status, _) =
        send_with_headers(test_app(state), "GET", "/api/auth/whoami", &headers, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn suspended_account_is_rejected_despite_valid_token() -> Result<()> {
    let store = FakeIdentityStore::new();
    let stu = identity("stu1", "pw123", Role::Student, AccountStatus::Active);
    let stu_id = stu.id;
    store.add(stu);
    let state = test_state(store.clone());
    let token = state.tokens.issue(stu_id, Role::Student)?;

    store.set_status(stu_id, AccountStatus::Suspended);

    let (status, body) = send(test_app(state), "GET", "/api/auth/whoami", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "account is not active");
    Ok(())
}

#[tokio::test]
async fn unprovisioned_subject_is_rejected() -> Result<()> {
    let state = test_state(FakeIdentityStore::new());
    let token = state.tokens.issue(Uuid::new_v4(), Role::Student)?;

    let (status, _) = send(test_app(state), "GET", "/api/auth/whoami", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn role_is_rederived_from_storage_not_the_claim() -> Result<()> {
    let store = FakeIdentityStore::new();
    let stu = identity("stu1", "pw123", Role::Student, AccountStatus::Active);
    let stu_id = stu.id;
    store.add(stu);
    let state = test_state(store.clone());
    let token = state.tokens.issue(stu_id, Role::Student)?;

    // Promote after issuance; the old token must observe the new role.
    store.set_role(stu_id, Role::Teacher);

    let (status, body) = send(
        test_app(state.clone()),
        "GET",
        "/api/auth/whoami",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["role"], "teacher");

    // And a refresh issues claims for the current role.
    let (status, body) = send(
        test_app(state.clone()),
        "POST",
        "/api/auth/refresh",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let refreshed = body["data"]["token"].as_str().unwrap();
    let claims = state.tokens.verify(refreshed)?;
    assert_eq!(claims.role, Role::Teacher);
    Ok(())
}

#[tokio::test]
async fn student_cannot_write_records() -> Result<()> {
    let store = FakeIdentityStore::new();
    let stu = identity("stu1", "pw123", Role::Student, AccountStatus::Active);
    let stu_id = stu.id;
    store.add(stu);
    let state = test_state(store);
    let token = state.tokens.issue(stu_id, Role::Student)?;

    let (status, body) = send(
        test_app(state),
        "POST",
        "/api/data/notes",
        Some(&token),
        Some(json!({"title": "hi"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "insufficient permissions");
    Ok(())
}

#[tokio::test]
async fn teacher_cannot_hard_delete() -> Result<()> {
    let store = FakeIdentityStore::new();
    let teacher = identity("tch1", "pw123", Role::Teacher, AccountStatus::Active);
    let teacher_id = teacher.id;
    store.add(teacher);
    let state = test_state(store);
    let token = state.tokens.issue(teacher_id, Role::Teacher)?;

    let uri = format!("/api/data/notes/{}", Uuid::new_v4());
    let (status, body) = send(test_app(state), "DELETE", &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "insufficient permissions");
    Ok(())
}
