use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, put},
};

/// Authenticated Router Module
///
/// Every route here sits behind `auth_middleware`, so a request without a
/// valid identity is answered with 401 before the handler runs. Handlers then
/// consult the voters: editing and deleting need ownership, awarding needs
/// authorship of the parent question.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /me
        .route("/me", get(handlers::account::get_me))
        // PUT/DELETE /questions/{id}
        // Author only.
        .route(
            "/questions/{id}",
            put(handlers::questions::update_question).delete(handlers::questions::delete_question),
        )
        // GET/PUT/DELETE /answers/{id}
        // Author only; moderators may also delete.
        .route(
            "/answers/{id}",
            get(handlers::answers::get_answer)
                .put(handlers::answers::update_answer)
                .delete(handlers::answers::delete_answer),
        )
        // PUT/DELETE /answers/{id}/award
        // Sets or clears the best-answer flag. Question author only.
        .route(
            "/answers/{id}/award",
            put(handlers::answers::award_answer).delete(handlers::answers::deaward_answer),
        )
}
