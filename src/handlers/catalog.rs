//! Categories and tags: public browsing plus the admin catalog surface.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use crate::{
    AppState,
    auth::AuthUser,
    error::AppResult,
    handlers::require_capability,
    models::{Category, CategoryRequest, QuestionDetails, Tag, TagRequest},
    pagination::{Page, Pagination},
    policy::Capability,
};

/// list_categories
///
/// [Public Route] Categories ordered by title.
#[utoipa::path(
    get,
    path = "/categories",
    params(Pagination),
    responses((status = 200, description = "Category page", body = Page<Category>))
)]
pub async fn list_categories(
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<Page<Category>>> {
    Ok(Json(
        state.categories().paginated_list(pagination.page()).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/categories/{id}",
    params(("id" = i64, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Found", body = Category),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Category>> {
    Ok(Json(state.categories().find(id).await?))
}

/// list_category_questions
///
/// [Public Route] Questions filed under one category, newest first.
#[utoipa::path(
    get,
    path = "/categories/{id}/questions",
    params(("id" = i64, Path, description = "Category ID"), Pagination),
    responses(
        (status = 200, description = "Question page", body = Page<QuestionDetails>),
        (status = 404, description = "Category Not Found")
    )
)]
pub async fn list_category_questions(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<Page<QuestionDetails>>> {
    let category = state.categories().find(id).await?;
    let page = state
        .questions()
        .paginated_by_category(&category, pagination.page())
        .await?;
    Ok(Json(page))
}

/// create_category
///
/// [Admin Route] The slug is derived from the title.
#[utoipa::path(
    post,
    path = "/admin/categories",
    request_body = CategoryRequest,
    responses(
        (status = 201, description = "Created", body = Category),
        (status = 409, description = "Slug already taken"),
        (status = 422, description = "Invalid payload")
    )
)]
pub async fn create_category(
    user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CategoryRequest>,
) -> AppResult<(StatusCode, Json<Category>)> {
    require_capability(&user, Capability::ManageCatalog)?;
    let category = state.categories().create(payload).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

#[utoipa::path(
    put,
    path = "/admin/categories/{id}",
    params(("id" = i64, Path, description = "Category ID")),
    request_body = CategoryRequest,
    responses(
        (status = 200, description = "Updated", body = Category),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Slug already taken")
    )
)]
pub async fn update_category(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<CategoryRequest>,
) -> AppResult<Json<Category>> {
    require_capability(&user, Capability::ManageCatalog)?;
    Ok(Json(state.categories().update(id, payload).await?))
}

/// delete_category
///
/// [Admin Route] Refused with 409 while any question still uses the category.
#[utoipa::path(
    delete,
    path = "/admin/categories/{id}",
    params(("id" = i64, Path, description = "Category ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Category in use")
    )
)]
pub async fn delete_category(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    require_capability(&user, Capability::ManageCatalog)?;
    state.categories().delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// list_tags
///
/// [Public Route] Tags ordered by title.
#[utoipa::path(
    get,
    path = "/tags",
    params(Pagination),
    responses((status = 200, description = "Tag page", body = Page<Tag>))
)]
pub async fn list_tags(
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<Page<Tag>>> {
    Ok(Json(state.tags().paginated_list(pagination.page()).await?))
}

#[utoipa::path(
    get,
    path = "/tags/{id}",
    params(("id" = i64, Path, description = "Tag ID")),
    responses(
        (status = 200, description = "Found", body = Tag),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_tag(State(state): State<AppState>, Path(id): Path<i64>) -> AppResult<Json<Tag>> {
    Ok(Json(state.tags().find(id).await?))
}

#[utoipa::path(
    get,
    path = "/tags/{id}/questions",
    params(("id" = i64, Path, description = "Tag ID"), Pagination),
    responses(
        (status = 200, description = "Question page", body = Page<QuestionDetails>),
        (status = 404, description = "Tag Not Found")
    )
)]
pub async fn list_tag_questions(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<Page<QuestionDetails>>> {
    let tag = state.tags().find(id).await?;
    let page = state
        .questions()
        .paginated_by_tag(&tag, pagination.page())
        .await?;
    Ok(Json(page))
}

#[utoipa::path(
    post,
    path = "/admin/tags",
    request_body = TagRequest,
    responses(
        (status = 201, description = "Created", body = Tag),
        (status = 409, description = "Slug already taken"),
        (status = 422, description = "Invalid payload")
    )
)]
pub async fn create_tag(
    user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<TagRequest>,
) -> AppResult<(StatusCode, Json<Tag>)> {
    require_capability(&user, Capability::ManageCatalog)?;
    let tag = state.tags().create(payload).await?;
    Ok((StatusCode::CREATED, Json(tag)))
}

#[utoipa::path(
    put,
    path = "/admin/tags/{id}",
    params(("id" = i64, Path, description = "Tag ID")),
    request_body = TagRequest,
    responses(
        (status = 200, description = "Updated", body = Tag),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Slug already taken")
    )
)]
pub async fn update_tag(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<TagRequest>,
) -> AppResult<Json<Tag>> {
    require_capability(&user, Capability::ManageCatalog)?;
    Ok(Json(state.tags().update(id, payload).await?))
}

/// delete_tag
///
/// [Admin Route] Questions keep existing; only their links to the tag go.
#[utoipa::path(
    delete,
    path = "/admin/tags/{id}",
    params(("id" = i64, Path, description = "Tag ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_tag(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    require_capability(&user, Capability::ManageCatalog)?;
    state.tags().delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
