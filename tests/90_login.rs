mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::json;

use campus_api::types::{AccountStatus, Role};
use common::{identity, send, test_app, test_state, FakeIdentityStore};

#[tokio::test]
async fn login_returns_a_verifiable_token() -> Result<()> {
    let store = FakeIdentityStore::new();
    let stu = identity("stu1", "pw123", Role::Student, AccountStatus::Active);
    let stu_id = stu.id;
    store.add(stu);
    let state = test_state(store);

    let (status, body) = send(
        test_app(state.clone()),
        "POST",
        "/auth/login",
        None,
        Some(json!({"username": "stu1", "password": "pw123"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "login successful");
    assert!(body["data"]["expires_in"].as_i64().unwrap() > 0);
    assert_eq!(body["data"]["identity"]["username"], "stu1");

    let token = body["data"]["token"].as_str().unwrap();
    let claims = state.tokens.verify(token)?;
    assert_eq!(claims.sub, stu_id);
    assert_eq!(claims.role, Role::Student);
    Ok(())
}

#[tokio::test]
async fn wrong_password_is_invalid_credentials() -> Result<()> {
    let store = FakeIdentityStore::new();
    store.add(identity("stu1", "pw123", Role::Student, AccountStatus::Active));
    let state = test_state(store);

    let (status, body) = send(
        test_app(state),
        "POST",
        "/auth/login",
        None,
        Some(json!({"username": "stu1", "password": "wrong"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "invalid credentials");
    Ok(())
}

#[tokio::test]
async fn unknown_user_reads_the_same_as_wrong_password() -> Result<()> {
    let state = test_state(FakeIdentityStore::new());

    let (status, body) = send(
        test_app(state),
        "POST",
        "/auth/login",
        None,
        Some(json!({"username": "ghost", "password": "pw123"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "invalid credentials");
    Ok(())
}

#[tokio::test]
async fn role_assertion_must_match_stored_role() -> Result<()> {
    let store = FakeIdentityStore::new();
    store.add(identity("stu1", "pw123", Role::Student, AccountStatus::Active));
    let state = test_state(store);

    let (status, body) = send(
        test_app(state.clone()),
        "POST",
        "/auth/login",
        None,
        Some(json!({"username": "stu1", "password": "pw123", "role": "teacher"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "role does not match this account");

    let (status, _) = send(
        test_app(state),
        "POST",
        "/auth/login",
        None,
        Some(json!({"username": "stu1", "password": "pw123", "role": "student"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn suspended_account_cannot_login() -> Result<()> {
    let store = FakeIdentityStore::new();
    store.add(identity("stu1", "pw123", Role::Student, AccountStatus::Suspended));
    let state = test_state(store);

    let (status, body) = send(
        test_app(state),
        "POST",
        "/auth/login",
        None,
        Some(json!({"username": "stu1", "password": "pw123"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "account is not active");
    Ok(())
}

#[tokio::test]
async fn missing_credentials_are_a_validation_error() -> Result<()> {
    let state = test_state(FakeIdentityStore::new());

    let (status, _) = send(
        test_app(state),
        "POST",
        "/auth/login",
        None,
        Some(json!({"username": "", "password": ""})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn register_then_login() -> Result<()> {
    let state = test_state(FakeIdentityStore::new());

    let (status, body) = send(
        test_app(state.clone()),
        "POST",
        "/auth/register",
        None,
        Some(json!({
            "username": "newstu",
            "password": "longenough",
            "email": "newstu@school.test"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["role"], "student");
    assert_eq!(body["data"]["status"], "active");

    let (status, _) = send(
        test_app(state),
        "POST",
        "/auth/login",
        None,
        Some(json!({"username": "newstu", "password": "longenough"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn duplicate_username_surfaces_constraint_hint() -> Result<()> {
    let state = test_state(FakeIdentityStore::new());

    let payload = json!({"username": "dupuser", "password": "longenough"});
    let (status, _) = send(
        test_app(state.clone()),
        "POST",
        "/auth/register",
        None,
        Some(payload.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(test_app(state), "POST", "/auth/register", None, Some(payload)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("already exists"));
    Ok(())
}

#[tokio::test]
async fn register_validation_aggregates_all_failures() -> Result<()> {
    let state = test_state(FakeIdentityStore::new());

    let (status, body) = send(
        test_app(state),
        "POST",
        "/auth/register",
        None,
        Some(json!({"username": "ab", "password": "short", "email": "not-an-email"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "validation failed: email, password, username");
    assert!(body["field_errors"].get("username").is_some());
    assert!(body["field_errors"].get("password").is_some());
    assert!(body["field_errors"].get("email").is_some());
    Ok(())
}

#[tokio::test]
async fn self_registration_is_students_only() -> Result<()> {
    let state = test_state(FakeIdentityStore::new());

    let (status, body) = send(
        test_app(state),
        "POST",
        "/auth/register",
        None,
        Some(json!({"username": "wannabe", "password": "longenough", "role": "admin"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "only student accounts can self-register");
    Ok(())
}
