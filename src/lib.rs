use axum::{
    Router,
    extract::FromRef,
    http::HeaderName,
    routing::get,
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

pub mod access;
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod repository;
pub mod routing;

// One route table per feature area (auth, menu, report).
pub mod routes;

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::{AccessError, ApiError, RouteConfigError};
pub use repository::{PostgresRepository, RepositoryState};
pub use routing::{DispatchTable, compose};

/// ApiDoc
///
/// Generates the OpenAPI document for every feature handler. Served at
/// `/api-docs/openapi.json` and browsable under `/swagger-ui`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::register, handlers::login,
        handlers::create_menu_item, handlers::get_all_menu_items, handlers::update_menu_item,
        handlers::delete_menu_item, handlers::approve_menu_item,
        handlers::submit_report
    ),
    components(
        schemas(
            models::Role, models::UserProfile, models::RegisterRequest, models::LoginRequest,
            models::LoginResponse, models::MenuItem, models::CreateMenuItemRequest,
            models::UpdateMenuItemRequest, models::Report, models::SubmitReportRequest,
        )
    ),
    tags(
        (name = "restaurant-api", description = "Restaurant staff API: auth, menu and reports")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single, immutable container of shared services, cloned into every request.
#[derive(Clone)]
pub struct AppState {
    /// Persistence layer.
    pub repo: RepositoryState,
    /// The loaded configuration.
    pub config: AppConfig,
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

/// create_router
///
/// Composes the feature route tables into the dispatch table, mounts it next to
/// the health check and API docs, and wraps everything in the observability layers.
///
/// Fails with `RouteConfigError` if the route tables are inconsistent; the caller
/// must not serve traffic in that case.
pub fn create_router(state: AppState) -> Result<Router, RouteConfigError> {
    let dispatch = routing::compose(routes::feature_tables())?;
    Ok(build_router(dispatch, state))
}

/// build_router
///
/// Mounts an already composed dispatch table. Split from `create_router` so a
/// custom table can be served with the same layers.
pub fn build_router(dispatch: DispatchTable, state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for Request Correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Base Router Assembly
    let base_router = Router::new()
        // Documentation: Serve the auto-generated Swagger UI.
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Liveness probe, outside the feature tables.
        .route("/health", get(|| async { "ok" }))
        // Feature routes, each carrying its own middleware chain.
        .merge(dispatch.into_router(&state))
        .with_state(state);

    // 3. Observability and Correlation Layers
    base_router
        .layer(
            ServiceBuilder::new()
                // 3a. Request ID Generation: a UUID for every incoming request.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // 3b. Request Tracing: one span per request, tagged with the request ID.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // 3c. Request ID Propagation: echo x-request-id back to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 4. CORS Layer
        .layer(cors)
}

/// trace_span_logger
///
/// Span factory for `TraceLayer`: method, URI and the `x-request-id` header so
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
