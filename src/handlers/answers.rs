use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    AppState,
    auth::AuthUser,
    error::AppResult,
    handlers::authorize,
    models::{Answer, Question, UpdateAnswerRequest},
    policy::{Permission, vote_on_answer},
};

/// Loads an answer with its parent question and runs the answer voter.
async fn authorized_answer(
    state: &AppState,
    user: &AuthUser,
    id: i64,
    permission: Permission,
) -> AppResult<(Answer, Question)> {
    let answer = state.answers().find(id).await?;
    let question = state.questions().find(answer.question_id).await?;
    let actor = user.actor();
    authorize(
        vote_on_answer(permission, &answer, &question, &actor),
        &actor,
        match permission {
            Permission::Edit => "edit answer",
            Permission::View => "view answer",
            Permission::Delete => "delete answer",
            Permission::Award => "award answer",
        },
    )?;
    Ok((answer, question))
}

/// get_answer
///
/// [Authenticated Route] VIEW: only the answer's author.
#[utoipa::path(
    get,
    path = "/answers/{id}",
    params(("id" = i64, Path, description = "Answer ID")),
    responses(
        (status = 200, description = "Found", body = Answer),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_answer(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Answer>> {
    let (answer, _) = authorized_answer(&state, &user, id, Permission::View).await?;
    Ok(Json(answer))
}

/// update_answer
///
/// [Authenticated Route] EDIT: only the answer's author.
#[utoipa::path(
    put,
    path = "/answers/{id}",
    params(("id" = i64, Path, description = "Answer ID")),
    request_body = UpdateAnswerRequest,
    responses(
        (status = 200, description = "Updated", body = Answer),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_answer(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateAnswerRequest>,
) -> AppResult<Json<Answer>> {
    authorized_answer(&state, &user, id, Permission::Edit).await?;
    Ok(Json(state.answers().update(id, payload).await?))
}

/// delete_answer
///
/// [Authenticated Route] DELETE: the answer's author, or a moderator
/// (`DeleteAnyAnswer`).
#[utoipa::path(
    delete,
    path = "/answers/{id}",
    params(("id" = i64, Path, description = "Answer ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Neither author nor moderator"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_answer(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    authorized_answer(&state, &user, id, Permission::Delete).await?;
    state.answers().delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// award_answer
///
/// [Authenticated Route] AWARD: only the author of the parent question may
/// mark an answer as best.
#[utoipa::path(
    put,
    path = "/answers/{id}/award",
    params(("id" = i64, Path, description = "Answer ID")),
    responses(
        (status = 200, description = "Awarded", body = Answer),
        (status = 403, description = "Not the question's author"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn award_answer(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Answer>> {
    authorized_answer(&state, &user, id, Permission::Award).await?;
    Ok(Json(state.answers().award(id).await?))
}

/// deaward_answer
///
/// [Authenticated Route] AWARD: clears the best-answer flag.
#[utoipa::path(
    delete,
    path = "/answers/{id}/award",
    params(("id" = i64, Path, description = "Answer ID")),
    responses(
        (status = 200, description = "Award removed", body = Answer),
        (status = 403, description = "Not the question's author"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn deaward_answer(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Answer>> {
    authorized_answer(&state, &user, id, Permission::Award).await?;
    Ok(Json(state.answers().deaward(id).await?))
}
