use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{
    AppState,
    auth::AuthUser,
    error::{AppError, AppResult},
    handlers::require_capability,
    models::{UpdateRolesRequest, UserProfile},
    pagination::{Page, Pagination},
    policy::Capability,
};

/// list_users
///
/// [Admin Route] Registered users, eight per page.
#[utoipa::path(
    get,
    path = "/admin/users",
    params(Pagination),
    responses(
        (status = 200, description = "User page", body = Page<UserProfile>),
        (status = 403, description = "Not an admin")
    )
)]
pub async fn list_users(
    user: AuthUser,
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<Page<UserProfile>>> {
    require_capability(&user, Capability::ManageUsers)?;
    let page = state.users().paginated_list(pagination.page()).await?;
    Ok(Json(page.map(UserProfile::from)))
}

/// update_user_roles
///
/// [Admin Route] Replaces the user's roles. `ROLE_USER` is always kept. An
/// admin cannot demote themselves, so the last admin cannot lock everyone out
/// by accident.
#[utoipa::path(
    put,
    path = "/admin/users/{id}/roles",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdateRolesRequest,
    responses(
        (status = 200, description = "Roles updated", body = UserProfile),
        (status = 404, description = "Not Found"),
        (status = 422, description = "Self-demotion")
    )
)]
pub async fn update_user_roles(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateRolesRequest>,
) -> AppResult<Json<UserProfile>> {
    require_capability(&user, Capability::ManageUsers)?;
    if id == user.id && !payload.roles.iter().any(|role| role.grants(Capability::ManageUsers)) {
        return Err(AppError::validation("admins cannot revoke their own admin role"));
    }
    let updated = state.users().set_roles(id, payload.roles).await?;
    Ok(Json(updated.into()))
}

/// delete_user
///
/// [Admin Route] Removes the account together with its questions and answers.
#[utoipa::path(
    delete,
    path = "/admin/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found"),
        (status = 422, description = "Self-deletion")
    )
)]
pub async fn delete_user(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    require_capability(&user, Capability::ManageUsers)?;
    if id == user.id {
        return Err(AppError::validation("admins cannot delete their own account"));
    }
    state.users().delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
