use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::{AppConfig, Env},
    error::{AppError, AppResult},
    models::TokenResponse,
    policy::{Actor, RoleSet},
    repository::RepositoryState,
};

/// Claims
///
/// Payload of the access tokens issued by POST /login.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user's UUID.
    pub sub: Uuid,
    /// Expiration time (seconds since the epoch).
    pub exp: usize,
    /// Issued at (seconds since the epoch).
    pub iat: usize,
}

/// AuthUser
///
/// The resolved identity of an authenticated request. Roles are reloaded from
/// the store on every request, so a demotion takes effect immediately.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub roles: RoleSet,
}

impl AuthUser {
    pub fn actor(&self) -> Actor {
        Actor::user(self.id, self.roles.clone())
    }
}

/// CurrentActor
///
/// Like `AuthUser`, but a request without credentials resolves to
/// `Actor::Anonymous` instead of being rejected. Credentials that are present
/// but invalid still yield 401.
#[derive(Debug, Clone)]
pub struct CurrentActor(pub Actor);

/// issue_token
///
/// Signs an HS256 access token for `user_id` valid for `config.jwt_ttl_secs`.
pub fn issue_token(user_id: Uuid, config: &AppConfig) -> AppResult<TokenResponse> {
    let now = Utc::now().timestamp().max(0) as usize;
    let claims = Claims {
        sub: user_id,
        iat: now,
        exp: now + config.jwt_ttl_secs as usize,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("token signing failed: {e}")))?;

    Ok(TokenResponse {
        access_token: token,
        token_type: "Bearer".to_string(),
        expires_in: config.jwt_ttl_secs,
    })
}

/// hash_password
///
/// bcrypt is deliberately slow, so hashing runs on the blocking pool.
pub async fn hash_password(password: String, cost: u32) -> AppResult<String> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
        .map_err(|e| AppError::Internal(format!("password hashing failed: {e}")))
}

pub async fn verify_password(password: String, hash: String) -> AppResult<bool> {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
        .map_err(|e| AppError::Internal(format!("password verification failed: {e}")))
}

/// resolve_identity
///
/// Shared by both extractors:
/// 1. Local bypass: in `Env::Local` an `x-user-id` header naming an existing
///    user is accepted as-is.
/// 2. No `Authorization` header at all: `Ok(None)`.
/// 3. Bearer token: decoded, expiry enforced, subject reloaded from the store.
///    Any failure here is `Unauthorized`.
async fn resolve_identity(
    parts: &Parts,
    repo: &RepositoryState,
    config: &AppConfig,
) -> AppResult<Option<AuthUser>> {
    if config.env == Env::Local {
        let bypass = parts
            .headers
            .get("x-user-id")
            .and_then(|value| value.to_str().ok())
            .and_then(|raw| Uuid::parse_str(raw).ok());
        if let Some(user_id) = bypass {
            if let Some(user) = repo.get_user(user_id).await? {
                return Ok(Some(AuthUser {
                    id: user.id,
                    roles: user.role_set(),
                }));
            }
        }
    }

    let Some(auth_header) = parts.headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };

    let token = auth_header
        .to_str()
        .ok()
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or(AppError::Unauthorized)?;

    let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
    let mut validation = Validation::default();
    validation.validate_exp = true;

    let token_data = decode::<Claims>(token, &decoding_key, &validation).map_err(|e| {
        match e.kind() {
            ErrorKind::ExpiredSignature => tracing::debug!("rejected expired token"),
            other => tracing::debug!("rejected token: {:?}", other),
        }
        AppError::Unauthorized
    })?;

    // A valid token for a deleted user is no longer an identity.
    let user = repo
        .get_user(token_data.claims.sub)
        .await?
        .ok_or(AppError::Unauthorized)?;

    Ok(Some(AuthUser {
        id: user.id,
        roles: user.role_set(),
    }))
}

/// AuthUser Extractor Implementation
///
/// Rejects with 401 when no identity can be resolved.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        resolve_identity(parts, &repo, &config)
            .await?
            .ok_or(AppError::Unauthorized)
    }
}

impl<S> FromRequestParts<S> for CurrentActor
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        let actor = match resolve_identity(parts, &repo, &config).await? {
            Some(user) => user.actor(),
            None => Actor::Anonymous,
        };
        Ok(CurrentActor(actor))
    }
}
