use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Admin Router Module
///
/// Catalog maintenance and user management. The router is nested under
/// `/admin` behind the authentication layer; each handler additionally requires
/// the matching capability (`ManageCatalog` or `ManageUsers`), which only
/// `ROLE_ADMIN` grants.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // --- Categories ---
        .route("/categories", post(handlers::catalog::create_category))
        .route(
            "/categories/{id}",
            put(handlers::catalog::update_category).delete(handlers::catalog::delete_category),
        )
        // --- Tags ---
        .route("/tags", post(handlers::catalog::create_tag))
        .route(
            "/tags/{id}",
            put(handlers::catalog::update_tag).delete(handlers::catalog::delete_tag),
        )
        // --- Users ---
        // GET /admin/users?page=
        .route("/users", get(handlers::users::list_users))
        .route("/users/{id}/roles", put(handlers::users::update_user_roles))
        // DELETE /admin/users/{id}
        // Cascades to the user's questions and answers.
        .route("/users/{id}", axum::routing::delete(handlers::users::delete_user))
}
