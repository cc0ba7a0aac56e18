use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use crate::{
    AppState,
    auth::{AuthUser, CurrentActor},
    error::AppResult,
    handlers::authorize,
    models::{
        Answer, CreateAnswerRequest, CreateQuestionRequest, QuestionDetails,
        UpdateQuestionRequest,
    },
    pagination::{Page, Pagination},
    policy::{Permission, vote_on_question},
};

/// list_questions
///
/// [Public Route] All questions, newest first.
#[utoipa::path(
    get,
    path = "/questions",
    params(Pagination),
    responses((status = 200, description = "Question page", body = Page<QuestionDetails>))
)]
pub async fn list_questions(
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<Page<QuestionDetails>>> {
    let page = state.questions().paginated_list(pagination.page()).await?;
    Ok(Json(page))
}

/// get_question
///
/// [Public Route] One question with its category and tags.
#[utoipa::path(
    get,
    path = "/questions/{id}",
    params(("id" = i64, Path, description = "Question ID")),
    responses(
        (status = 200, description = "Found", body = QuestionDetails),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_question(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<QuestionDetails>> {
    let questions = state.questions();
    let question = questions.find(id).await?;
    Ok(Json(questions.details(question).await?))
}

/// create_question
///
/// [Public Route] Anonymous callers may ask; the author is then left empty and
/// nobody can later edit or delete the question through ownership.
#[utoipa::path(
    post,
    path = "/questions",
    request_body = CreateQuestionRequest,
    responses(
        (status = 201, description = "Created", body = QuestionDetails),
        (status = 422, description = "Invalid payload")
    )
)]
pub async fn create_question(
    CurrentActor(actor): CurrentActor,
    State(state): State<AppState>,
    Json(payload): Json<CreateQuestionRequest>,
) -> AppResult<(StatusCode, Json<QuestionDetails>)> {
    let question = state.questions().create(payload, actor.id()).await?;
    Ok((StatusCode::CREATED, Json(question)))
}

/// update_question
///
/// [Authenticated Route] EDIT: only the question's author.
#[utoipa::path(
    put,
    path = "/questions/{id}",
    params(("id" = i64, Path, description = "Question ID")),
    request_body = UpdateQuestionRequest,
    responses(
        (status = 200, description = "Updated", body = QuestionDetails),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_question(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateQuestionRequest>,
) -> AppResult<Json<QuestionDetails>> {
    let questions = state.questions();
    let question = questions.find(id).await?;
    let actor = user.actor();
    authorize(
        vote_on_question(Permission::Edit, &question, &actor),
        &actor,
        "edit question",
    )?;
    Ok(Json(questions.update(id, payload).await?))
}

/// delete_question
///
/// [Authenticated Route] DELETE: only the question's author. Answers are
/// removed with the question.
#[utoipa::path(
    delete,
    path = "/questions/{id}",
    params(("id" = i64, Path, description = "Question ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_question(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    let questions = state.questions();
    let question = questions.find(id).await?;
    let actor = user.actor();
    authorize(
        vote_on_question(Permission::Delete, &question, &actor),
        &actor,
        "delete question",
    )?;
    questions.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// list_answers
///
/// [Public Route] Answers of a question, oldest first, ten per page.
#[utoipa::path(
    get,
    path = "/questions/{id}/answers",
    params(("id" = i64, Path, description = "Question ID"), Pagination),
    responses(
        (status = 200, description = "Answer page", body = Page<Answer>),
        (status = 404, description = "Question Not Found")
    )
)]
pub async fn list_answers(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<Page<Answer>>> {
    let question = state.questions().find(id).await?;
    let page = state
        .answers()
        .paginated_list(&question, pagination.page())
        .await?;
    Ok(Json(page))
}

/// create_answer
///
/// [Public Route] Posts an answer; the caller becomes its author when
/// authenticated.
#[utoipa::path(
    post,
    path = "/questions/{id}/answers",
    params(("id" = i64, Path, description = "Question ID")),
    request_body = CreateAnswerRequest,
    responses(
        (status = 201, description = "Created", body = Answer),
        (status = 404, description = "Question Not Found"),
        (status = 422, description = "Invalid payload")
    )
)]
pub async fn create_answer(
    CurrentActor(actor): CurrentActor,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<CreateAnswerRequest>,
) -> AppResult<(StatusCode, Json<Answer>)> {
    let question = state.questions().find(id).await?;
    let answer = state
        .answers()
        .create(&question, payload, actor.id())
        .await?;
    Ok((StatusCode::CREATED, Json(answer)))
}
