use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Domain: records, the access policy and paging.
pub mod models;
pub mod pagination;
pub mod policy;
pub mod slug;

// Persistence and the services built on it.
pub mod memory;
pub mod repository;
pub mod services;

// HTTP surface.
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;

// Module for routing segregation (Public, Authenticated, Admin).
pub mod routes;
use routes::{admin, authenticated, public};
use auth::AuthUser;

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use memory::MemoryRepository;
pub use repository::{PostgresRepository, Repository, RepositoryState};

use services::{AnswerService, CategoryService, QuestionService, TagService, UserService};

/// ApiDoc
///
/// OpenAPI document for every route, served at `/api-docs/openapi.json` and
/// rendered by Swagger UI.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::account::register_user, handlers::account::login, handlers::account::get_me,
        handlers::questions::list_questions, handlers::questions::get_question,
        handlers::questions::create_question, handlers::questions::update_question,
        handlers::questions::delete_question, handlers::questions::list_answers,
        handlers::questions::create_answer,
        handlers::answers::get_answer, handlers::answers::update_answer,
        handlers::answers::delete_answer, handlers::answers::award_answer,
        handlers::answers::deaward_answer,
        handlers::catalog::list_categories, handlers::catalog::get_category,
        handlers::catalog::list_category_questions, handlers::catalog::create_category,
        handlers::catalog::update_category, handlers::catalog::delete_category,
        handlers::catalog::list_tags, handlers::catalog::get_tag,
        handlers::catalog::list_tag_questions, handlers::catalog::create_tag,
        handlers::catalog::update_tag, handlers::catalog::delete_tag,
        handlers::users::list_users, handlers::users::update_user_roles,
        handlers::users::delete_user,
    ),
    components(
        schemas(
            models::Question, models::Answer, models::Category, models::Tag,
            models::QuestionDetails, models::UserProfile, models::TokenResponse,
            models::RegisterUserRequest, models::LoginRequest,
            models::CreateQuestionRequest, models::UpdateQuestionRequest,
            models::CreateAnswerRequest, models::UpdateAnswerRequest,
            models::CategoryRequest, models::TagRequest, models::UpdateRolesRequest,
            policy::Role,
        )
    ),
    tags(
        (name = "qna-portal", description = "Questions & Answers API")
    )
)]
struct ApiDoc;

/// AppState
///
/// Shared by every request: the repository behind its trait object and the
/// immutable configuration. Services are cheap views over the repository and
/// are built on demand.
#[derive(Clone)]
pub struct AppState {
    pub repo: RepositoryState,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(repo: RepositoryState, config: AppConfig) -> Self {
        Self { repo, config }
    }

    pub fn questions(&self) -> QuestionService {
        QuestionService::new(self.repo.clone())
    }

    pub fn answers(&self) -> AnswerService {
        AnswerService::new(self.repo.clone())
    }

    pub fn categories(&self) -> CategoryService {
        CategoryService::new(self.repo.clone())
    }

    pub fn tags(&self) -> TagService {
        TagService::new(self.repo.clone())
    }

    pub fn users(&self) -> UserService {
        UserService::new(self.repo.clone())
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Runs the `AuthUser` extractor ahead of the handler. A request that carries
/// no identity, or an invalid one, is rejected with 401 here.
async fn auth_middleware(
    _auth_user: AuthUser,
    request: Request,
    next: Next,
) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles the routing tree, applies the scoped authentication layer and the
/// global observability layers, and registers the application state.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(
            authenticated::authenticated_routes()
                .route_layer(middleware::from_fn_with_state(
                    state.clone(),
                    auth_middleware,
                )),
        )
        // Capability checks happen inside the admin handlers.
        .nest(
            "/admin",
            admin::admin_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Span for one request, tagged with the `x-request-id` so every log line it
/// produces can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
