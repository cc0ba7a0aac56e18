use axum::{
    extract::FromRequestParts,
    http::{Method, Request, StatusCode, Uri, header, request::Parts},
};
use jsonwebtoken::{EncodingKey, Header, encode};
use qna_portal::{
    AppState, MemoryRepository,
    auth::{self, AuthUser, Claims, CurrentActor},
    config::{AppConfig, Env},
    models::{NewUser, User},
    policy::{Actor, Role},
    repository::Repository,
};
use std::{sync::Arc, time::SystemTime};
use uuid::Uuid;

// --- Helper Functions ---

const TEST_JWT_SECRET: &str = "test-secret-value-1234567890";

fn create_token(user_id: Uuid, exp_offset: i64, secret: &str) -> String {
    let now = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64;

    let claims = Claims {
        sub: user_id,
        iat: now as usize,
        exp: (now + exp_offset) as usize,
    };

    let key = EncodingKey::from_secret(secret.as_bytes());
    encode(&Header::default(), &claims, &key).unwrap()
}

async fn seed_user(repo: &MemoryRepository, email: &str, roles: &[&str]) -> User {
    repo.create_user(NewUser {
        email: email.to_string(),
        nickname: "tester".to_string(),
        password_hash: "unused".to_string(),
        roles: roles.iter().map(|r| r.to_string()).collect(),
    })
    .await
    .unwrap()
}

fn create_app_state(env: Env, repo: Arc<MemoryRepository>) -> AppState {
    let config = AppConfig {
        env,
        jwt_secret: TEST_JWT_SECRET.to_string(),
        ..AppConfig::default()
    };
    AppState::new(repo, config)
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

// --- Tests ---

#[tokio::test]
async fn test_auth_success_with_valid_jwt() {
    let repo = Arc::new(MemoryRepository::new());
    let user = seed_user(&repo, "test@example.com", &["ROLE_USER"]).await;
    let app_state = create_app_state(Env::Production, repo);

    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    with_bearer(&mut parts, &create_token(user.id, 3600, TEST_JWT_SECRET));

    let auth_user = AuthUser::from_request_parts(&mut parts, &app_state).await;

    let auth_user = auth_user.unwrap();
    assert_eq!(auth_user.id, user.id);
    assert!(auth_user.roles.contains(Role::User));
    assert!(!auth_user.roles.contains(Role::Admin));
}

#[tokio::test]
async fn test_roles_are_reloaded_from_the_store() {
    let repo = Arc::new(MemoryRepository::new());
    let user = seed_user(&repo, "admin@example.com", &["ROLE_USER"]).await;
    let token = create_token(user.id, 3600, TEST_JWT_SECRET);
    repo.set_user_roles(user.id, vec!["ROLE_USER".into(), "ROLE_ADMIN".into()])
        .await
        .unwrap();
    let app_state = create_app_state(Env::Production, repo);

    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    with_bearer(&mut parts, &token);

    let auth_user = AuthUser::from_request_parts(&mut parts, &app_state)
        .await
        .unwrap();
    assert!(auth_user.roles.contains(Role::Admin));
}

#[tokio::test]
async fn test_auth_failure_with_missing_header() {
    let app_state = create_app_state(Env::Production, Arc::new(MemoryRepository::new()));

    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());

    let auth_user = AuthUser::from_request_parts(&mut parts, &app_state).await;

    assert_eq!(auth_user.unwrap_err().status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_failure_with_expired_jwt() {
    let repo = Arc::new(MemoryRepository::new());
    let user = seed_user(&repo, "late@example.com", &["ROLE_USER"]).await;
    let app_state = create_app_state(Env::Production, repo);

    // Well past the default leeway of 60 seconds.
    let token = create_token(user.id, -600, TEST_JWT_SECRET);
    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    with_bearer(&mut parts, &token);

    let auth_user = AuthUser::from_request_parts(&mut parts, &app_state).await;

    assert_eq!(auth_user.unwrap_err().status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_failure_with_foreign_signature() {
    let repo = Arc::new(MemoryRepository::new());
    let user = seed_user(&repo, "forged@example.com", &["ROLE_USER"]).await;
    let app_state = create_app_state(Env::Production, repo);

    let token = create_token(user.id, 3600, "some-other-secret-entirely");
    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    with_bearer(&mut parts, &token);

    let auth_user = AuthUser::from_request_parts(&mut parts, &app_state).await;

    assert_eq!(auth_user.unwrap_err().status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_for_deleted_user_is_rejected() {
    let repo = Arc::new(MemoryRepository::new());
    let user = seed_user(&repo, "gone@example.com", &["ROLE_USER"]).await;
    let token = create_token(user.id, 3600, TEST_JWT_SECRET);
    repo.delete_user(user.id).await.unwrap();
    let app_state = create_app_state(Env::Production, repo);

    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    with_bearer(&mut parts, &token);

    let auth_user = AuthUser::from_request_parts(&mut parts, &app_state).await;

    assert_eq!(auth_user.unwrap_err().status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_issued_token_is_accepted() {
    let repo = Arc::new(MemoryRepository::new());
    let user = seed_user(&repo, "issued@example.com", &["ROLE_USER"]).await;
    let app_state = create_app_state(Env::Production, repo);

    let issued = auth::issue_token(user.id, &app_state.config).unwrap();
    assert_eq!(issued.token_type, "Bearer");
    assert_eq!(issued.expires_in, app_state.config.jwt_ttl_secs);

    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    with_bearer(&mut parts, &issued.access_token);

    let auth_user = AuthUser::from_request_parts(&mut parts, &app_state)
        .await
        .unwrap();
    assert_eq!(auth_user.id, user.id);
}

#[tokio::test]
async fn test_local_bypass_success() {
    let repo = Arc::new(MemoryRepository::new());
    let user = seed_user(&repo, "local@dev.com", &["ROLE_USER", "ROLE_ADMIN"]).await;
    let app_state = create_app_state(Env::Local, repo);

    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    parts.headers.insert(
        header::HeaderName::from_static("x-user-id"),
        header::HeaderValue::from_str(&user.id.to_string()).unwrap(),
    );

    let auth_user = AuthUser::from_request_parts(&mut parts, &app_state)
        .await
        .unwrap();

    assert_eq!(auth_user.id, user.id);
    assert!(auth_user.roles.contains(Role::Admin));
}

#[tokio::test]
async fn test_local_bypass_disabled_in_prod() {
    let repo = Arc::new(MemoryRepository::new());
    let user = seed_user(&repo, "prod@dev.com", &["ROLE_USER"]).await;
    let app_state = create_app_state(Env::Production, repo);

    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    parts.headers.insert(
        header::HeaderName::from_static("x-user-id"),
        header::HeaderValue::from_str(&user.id.to_string()).unwrap(),
    );

    let auth_user = AuthUser::from_request_parts(&mut parts, &app_state).await;

    assert_eq!(auth_user.unwrap_err().status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_current_actor_is_anonymous_without_credentials() {
    let app_state = create_app_state(Env::Production, Arc::new(MemoryRepository::new()));

    let mut parts = get_request_parts(Method::POST, "/questions".parse().unwrap());

    let CurrentActor(actor) = CurrentActor::from_request_parts(&mut parts, &app_state)
        .await
        .unwrap();
    assert_eq!(actor, Actor::Anonymous);
}

#[tokio::test]
async fn test_current_actor_rejects_malformed_authorization() {
    let app_state = create_app_state(Env::Production, Arc::new(MemoryRepository::new()));

    let mut parts = get_request_parts(Method::POST, "/questions".parse().unwrap());
    parts.headers.insert(
        header::AUTHORIZATION,
        header::HeaderValue::from_static("Basic dXNlcjpwYXNz"),
    );

    let actor = CurrentActor::from_request_parts(&mut parts, &app_state).await;

    assert_eq!(actor.unwrap_err().status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_password_hash_round_trip() {
    let hash = auth::hash_password("correct horse".to_string(), 4)
        .await
        .unwrap();

    assert_ne!(hash, "correct horse");
    assert!(auth::verify_password("correct horse".to_string(), hash.clone()).await.unwrap());
    assert!(!auth::verify_password("wrong horse".to_string(), hash).await.unwrap());
}
