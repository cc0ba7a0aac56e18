use axum::{Json, extract::State, http::StatusCode};

use crate::{
    AppState,
    auth::{self, AuthUser},
    error::{AppError, AppResult},
    models::{LoginRequest, RegisterUserRequest, TokenResponse, UserProfile},
};

/// register_user
///
/// [Public Route] Creates an account holding `ROLE_USER`. The password is
/// hashed with bcrypt before it reaches the repository.
#[utoipa::path(
    post,
    path = "/register",
    request_body = RegisterUserRequest,
    responses(
        (status = 201, description = "Registered", body = UserProfile),
        (status = 409, description = "Email already registered"),
        (status = 422, description = "Invalid payload")
    )
)]
pub async fn register_user(
    State(state): State<AppState>,
    Json(payload): Json<RegisterUserRequest>,
) -> AppResult<(StatusCode, Json<UserProfile>)> {
    payload.validate()?;
    let password_hash = auth::hash_password(payload.password, state.config.bcrypt_cost).await?;
    let user = state
        .users()
        .register(&payload.email, &payload.nickname, password_hash)
        .await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

/// login
///
/// [Public Route] Exchanges email and password for a bearer token. Unknown
/// email and wrong password are indistinguishable to the caller.
#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued", body = TokenResponse),
        (status = 401, description = "Bad credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<TokenResponse>> {
    let Some(user) = state.users().find_by_email(&payload.email).await? else {
        return Err(AppError::Unauthorized);
    };
    if !auth::verify_password(payload.password, user.password_hash.clone()).await? {
        tracing::info!(user_id = %user.id, "login failed");
        return Err(AppError::Unauthorized);
    }
    Ok(Json(auth::issue_token(user.id, &state.config)?))
}

/// get_me
///
/// [Authenticated Route] The caller's own profile.
#[utoipa::path(
    get,
    path = "/me",
    responses((status = 200, description = "Profile", body = UserProfile))
)]
pub async fn get_me(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<UserProfile>> {
    let user = state.users().find(id).await?;
    Ok(Json(user.into()))
}
