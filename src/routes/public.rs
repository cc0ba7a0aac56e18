use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Browsing, account creation and login. `GET` routes never need credentials;
/// the `POST` routes for questions and answers attach the caller as author when
/// credentials are present and leave the author empty otherwise.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for load balancers.
        .route("/health", get(|| async { "ok" }))
        .route("/register", post(handlers::account::register_user))
        .route("/login", post(handlers::account::login))
        // GET/POST /questions
        .route(
            "/questions",
            get(handlers::questions::list_questions).post(handlers::questions::create_question),
        )
        .route("/questions/{id}", get(handlers::questions::get_question))
        // GET/POST /questions/{id}/answers
        .route(
            "/questions/{id}/answers",
            get(handlers::questions::list_answers).post(handlers::questions::create_answer),
        )
        // --- Catalog ---
        .route("/categories", get(handlers::catalog::list_categories))
        .route("/categories/{id}", get(handlers::catalog::get_category))
        .route(
            "/categories/{id}/questions",
            get(handlers::catalog::list_category_questions),
        )
        .route("/tags", get(handlers::catalog::list_tags))
        .route("/tags/{id}", get(handlers::catalog::get_tag))
        .route("/tags/{id}/questions", get(handlers::catalog::list_tag_questions))
}
