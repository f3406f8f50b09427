use axum::{
    extract::FromRequestParts,
    http::{Method, Request, StatusCode, Uri, header, request::Parts},
    response::IntoResponse,
};
mod common;

use blogicum::{
    AppError, AppState,
    auth::{AuthUser, Claims, Viewer, decode_token},
    config::{AppConfig, Env},
    models::NewUser,
    repository::Repository,
    storage::MockStorageService,
};
use common::MemoryRepository;
use jsonwebtoken::{EncodingKey, Header, encode};
use std::{sync::Arc, time::SystemTime};
use uuid::Uuid;

// --- Helper Functions ---

const TEST_JWT_SECRET: &str = "test-secret-value-1234567890";
const TEST_USER_ID: Uuid = Uuid::from_u128(1);

fn claims_for(user_id: Uuid, exp_offset: i64) -> Claims {
    let now = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64;

    Claims {
        sub: user_id,
        iat: now as usize,
        exp: (now + exp_offset) as usize,
        ..Claims::default()
    }
}

fn sign(claims: &Claims, secret: &str) -> String {
    let key = EncodingKey::from_secret(secret.as_bytes());
    encode(&Header::default(), claims, &key).unwrap()
}

fn create_token(user_id: Uuid, secret: &str, exp_offset: i64) -> String {
    sign(&claims_for(user_id, exp_offset), secret)
}

async fn create_app_state(env: Env, with_user: bool) -> AppState {
    create_app_state_with_repo(env, with_user).await.0
}

async fn create_app_state_with_repo(env: Env, with_user: bool) -> (AppState, Arc<MemoryRepository>) {
    let repo = Arc::new(MemoryRepository::new());
    if with_user {
        repo.create_user(NewUser {
            id: TEST_USER_ID,
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
        })
        .await
        .unwrap();
    }

    let config = AppConfig {
        env,
        jwt_secret: TEST_JWT_SECRET.to_string(),
        ..AppConfig::default()
    };

    let state = AppState {
        repo: repo.clone(),
        storage: Arc::new(MockStorageService::new()),
        config,
    };
    (state, repo)
}

fn get_request_parts(method: Method, uri: Uri) -> Parts {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap();
    let (parts, _) = request.into_parts();
    parts
}

fn with_bearer(parts: &mut Parts, token: &str) {
    parts.headers.insert(
        header::AUTHORIZATION,
        header::HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
    );
}

fn assert_login_redirect(err: AppError, expected_location: &str) {
    let response = err.into_response();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response.headers()[header::LOCATION].to_str().unwrap(),
        expected_location
    );
}

// --- Tests ---

#[tokio::test]
async fn test_auth_success_with_valid_jwt() {
    let app_state = create_app_state(Env::Production, true).await;
    let mut parts = get_request_parts(Method::GET, "/posts/create/".parse().unwrap());
    with_bearer(&mut parts, &create_token(TEST_USER_ID, TEST_JWT_SECRET, 3600));

    let user = AuthUser::from_request_parts(&mut parts, &app_state)
        .await
        .unwrap();

    assert_eq!(user.id, TEST_USER_ID);
    assert_eq!(user.username, "alice");
}

#[tokio::test]
async fn test_missing_token_redirects_to_login_with_next() {
    let app_state = create_app_state(Env::Production, true).await;
    let mut parts = get_request_parts(Method::POST, "/posts/7/comment/".parse().unwrap());

    let err = AuthUser::from_request_parts(&mut parts, &app_state)
        .await
        .unwrap_err();

    assert_login_redirect(err, "/auth/login/?next=%2Fposts%2F7%2Fcomment%2F");
}

#[tokio::test]
async fn test_next_keeps_query_string() {
    let app_state = create_app_state(Env::Production, true).await;
    let mut parts = get_request_parts(Method::GET, "/profile/edit/?tab=name".parse().unwrap());

    let err = AuthUser::from_request_parts(&mut parts, &app_state)
        .await
        .unwrap_err();

    assert_login_redirect(err, "/auth/login/?next=%2Fprofile%2Fedit%2F%3Ftab%3Dname");
}

#[tokio::test]
async fn test_expired_token_is_rejected() {
    let app_state = create_app_state(Env::Production, true).await;
    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    // Well past the default 60s leeway.
    with_bearer(&mut parts, &create_token(TEST_USER_ID, TEST_JWT_SECRET, -3600));

    let result = AuthUser::from_request_parts(&mut parts, &app_state).await;

    assert!(matches!(result, Err(AppError::LoginRequired(_))));
}

#[tokio::test]
async fn test_token_signed_with_other_secret_is_rejected() {
    let subject = |token: &str| decode_token(token, TEST_JWT_SECRET).map(|claims| claims.sub);

    assert_eq!(
        subject(&create_token(TEST_USER_ID, TEST_JWT_SECRET, 600)),
        Some(TEST_USER_ID)
    );
    assert_eq!(subject(&create_token(TEST_USER_ID, "another-secret", 600)), None);
    assert_eq!(subject("not.a.jwt"), None);
}

#[tokio::test]
async fn test_first_token_of_new_subject_creates_account() {
    let (app_state, repo) = create_app_state_with_repo(Env::Production, false).await;
    let mut parts = get_request_parts(Method::GET, "/posts/create/".parse().unwrap());
    let claims = Claims {
        preferred_username: Some("newcomer".to_string()),
        email: Some("newcomer@example.com".to_string()),
        ..claims_for(TEST_USER_ID, 3600)
    };
    with_bearer(&mut parts, &sign(&claims, TEST_JWT_SECRET));

    let user = AuthUser::from_request_parts(&mut parts, &app_state)
        .await
        .unwrap();

    assert_eq!(user.id, TEST_USER_ID);
    assert_eq!(user.username, "newcomer");
    let stored = repo.get_user(TEST_USER_ID).await.unwrap().unwrap();
    assert_eq!(stored.email, "newcomer@example.com");
}

#[tokio::test]
async fn test_taken_or_unusable_username_falls_back_to_subject() {
    let (app_state, repo) = create_app_state_with_repo(Env::Production, true).await;
    let newcomer = Uuid::from_u128(2);

    for preferred in [Some("alice"), Some("../admin"), None] {
        let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
        let claims = Claims {
            preferred_username: preferred.map(str::to_string),
            ..claims_for(newcomer, 3600)
        };
        with_bearer(&mut parts, &sign(&claims, TEST_JWT_SECRET));

        let user = AuthUser::from_request_parts(&mut parts, &app_state)
            .await
            .unwrap();
        assert_eq!(user.username, format!("user_{}", newcomer.simple()));
    }

    let alice = repo.get_user(TEST_USER_ID).await.unwrap().unwrap();
    assert_eq!(alice.username, "alice");
}

#[tokio::test]
async fn test_known_account_keeps_its_username() {
    let app_state = create_app_state(Env::Production, true).await;
    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    let claims = Claims {
        preferred_username: Some("renamed".to_string()),
        ..claims_for(TEST_USER_ID, 3600)
    };
    with_bearer(&mut parts, &sign(&claims, TEST_JWT_SECRET));

    let user = AuthUser::from_request_parts(&mut parts, &app_state)
        .await
        .unwrap();

    assert_eq!(user.username, "alice");
}

#[tokio::test]
async fn test_local_bypass_for_unknown_account_requires_login() {
    let app_state = create_app_state(Env::Local, false).await;
    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    parts.headers.insert(
        header::HeaderName::from_static("x-user-id"),
        header::HeaderValue::from_str(&TEST_USER_ID.to_string()).unwrap(),
    );

    let result = AuthUser::from_request_parts(&mut parts, &app_state).await;

    assert!(matches!(result, Err(AppError::LoginRequired(_))));
}

#[tokio::test]
async fn test_local_bypass_success() {
    let app_state = create_app_state(Env::Local, true).await;
    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    parts.headers.insert(
        header::HeaderName::from_static("x-user-id"),
        header::HeaderValue::from_str(&TEST_USER_ID.to_string()).unwrap(),
    );

    let user = AuthUser::from_request_parts(&mut parts, &app_state)
        .await
        .unwrap();

    assert_eq!(user.id, TEST_USER_ID);
}

#[tokio::test]
async fn test_local_bypass_disabled_in_prod() {
    let app_state = create_app_state(Env::Production, true).await;
    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    parts.headers.insert(
        header::HeaderName::from_static("x-user-id"),
        header::HeaderValue::from_str(&TEST_USER_ID.to_string()).unwrap(),
    );

    let result = AuthUser::from_request_parts(&mut parts, &app_state).await;

    assert!(matches!(result, Err(AppError::LoginRequired(_))));
}

#[tokio::test]
async fn test_viewer_is_anonymous_without_credentials() {
    let app_state = create_app_state(Env::Production, true).await;

    let mut anonymous = get_request_parts(Method::GET, "/".parse().unwrap());
    let viewer = Viewer::from_request_parts(&mut anonymous, &app_state)
        .await
        .unwrap();
    assert_eq!(viewer.id(), None);

    let mut signed_in = get_request_parts(Method::GET, "/".parse().unwrap());
    with_bearer(&mut signed_in, &create_token(TEST_USER_ID, TEST_JWT_SECRET, 3600));
    let viewer = Viewer::from_request_parts(&mut signed_in, &app_state)
        .await
        .unwrap();
    assert_eq!(viewer.id(), Some(TEST_USER_ID));
}

#[tokio::test]
async fn test_viewer_surfaces_account_lookup_failure() {
    let (app_state, repo) = create_app_state_with_repo(Env::Production, true).await;
    repo.break_user_lookups();

    let mut anonymous = get_request_parts(Method::GET, "/".parse().unwrap());
    let viewer = Viewer::from_request_parts(&mut anonymous, &app_state)
        .await
        .unwrap();
    assert_eq!(viewer.id(), None);

    let mut signed_in = get_request_parts(Method::GET, "/".parse().unwrap());
    with_bearer(&mut signed_in, &create_token(TEST_USER_ID, TEST_JWT_SECRET, 3600));
    let result = Viewer::from_request_parts(&mut signed_in, &app_state).await;
    assert!(matches!(result, Err(AppError::Database(_))));
}
