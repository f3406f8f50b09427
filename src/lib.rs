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

pub mod auth;
pub mod config;
pub mod error;
pub mod forms;
pub mod handlers;
pub mod models;
pub mod pagination;
pub mod permissions;
pub mod repository;
pub mod storage;
pub mod visibility;

pub mod routes;
use auth::AuthUser;
use routes::{authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::AppError;
pub use repository::{PostgresRepository, RepositoryState};
pub use storage::{MockStorageService, S3StorageClient, StorageState};

/// ApiDoc
///
/// OpenAPI document for every page and form endpoint, served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::listings::index, handlers::listings::category_posts,
        handlers::listings::profile,
        handlers::posts::post_detail, handlers::posts::create_post_form,
        handlers::posts::create_post, handlers::posts::edit_post_form,
        handlers::posts::edit_post, handlers::posts::delete_post_confirm,
        handlers::posts::delete_post,
        handlers::comments::add_comment, handlers::comments::edit_comment_form,
        handlers::comments::edit_comment, handlers::comments::delete_comment_confirm,
        handlers::comments::delete_comment,
        handlers::profile::edit_profile_form, handlers::profile::edit_profile,
        handlers::uploads::get_presigned_url
    ),
    components(
        schemas(
            models::User, models::Category, models::Location, models::Post,
            models::PostRecord, models::Comment, models::PresignedUrlRequest,
            models::PresignedUrlResponse,
            forms::PostForm, forms::CommentForm, forms::ProfileForm,
            handlers::CategoryPage, handlers::ProfilePage, handlers::PostDetailPage,
            handlers::PostFormPage, handlers::CommentFormPage,
            error::ErrorBody, error::RejectedForm,
        )
    ),
    tags(
        (name = "blogicum", description = "Blogicum blog API")
    )
)]
pub struct ApiDoc;

/// AppState
///
/// Shared, immutable services handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// Postgres in production, an in-memory double in tests.
    pub repo: RepositoryState,
    /// S3/MinIO presigning for post images.
    pub storage: StorageState,
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for StorageState {
    fn from_ref(app_state: &AppState) -> StorageState {
        app_state.storage.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Gate for `authenticated_routes`. Extracting `AuthUser` is the whole check: when it
/// fails, its rejection (a redirect to the login page carrying `next`) is returned and
/// the handler never runs.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles the routers, the Swagger UI and the observability layers.
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
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
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
/// Request span carrying method, URI and the `x-request-id` set by the layer above, so
/// every log line of one request can be correlated.
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
