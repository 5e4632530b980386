//! Router assembly. Routes are grouped into a public set and a
//! protected set with the auth middleware layered onto the latter.

use axum::{
    http::HeaderValue,
    middleware,
    routing::{get, patch, post, put},
    Router,
};
use sqlx::SqlitePool;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::{AppConfig, Environment};
use crate::error::ApiError;
use crate::handlers;
use crate::middleware::require_auth;

/// Everything a handler needs, threaded through axum's `State`.
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub config: AppConfig,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(public_routes())
        .merge(protected_routes(state.clone()))
        .fallback(not_found)
        .layer(cors_layer(&state.config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::system::root))
        .route("/health", get(handlers::system::health))
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/login", post(handlers::auth::login))
        .route("/users/roles", get(handlers::users::roles))
}

fn protected_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/auth/me", get(handlers::auth::me))
        .merge(user_routes())
        .merge(risk_routes())
        .merge(action_item_routes())
        .merge(rbs_routes())
        .merge(snapshot_routes())
        .merge(audit_routes())
        .route("/system/status", get(handlers::system::status))
        .layer(middleware::from_fn_with_state(state, require_auth))
}

fn user_routes() -> Router<AppState> {
    use handlers::users;
    Router::new()
        .route("/users", get(users::list).post(users::create))
        .route(
            "/users/:id",
            get(users::get).put(users::update).delete(users::delete),
        )
        .route("/users/:id/permissions", get(users::permissions))
}

fn risk_routes() -> Router<AppState> {
    use handlers::risks;
    Router::new()
        .route("/risks", get(risks::list).post(risks::create))
        .route("/risks/owners", get(risks::owners))
        .route(
            "/risks/:id",
            get(risks::get).put(risks::update).delete(risks::delete),
        )
}

fn action_item_routes() -> Router<AppState> {
    use handlers::action_items;
    Router::new()
        .route(
            "/action-items",
            get(action_items::list).post(action_items::create),
        )
        .route(
            "/action-items/:id",
            get(action_items::get)
                .put(action_items::update)
                .delete(action_items::delete),
        )
        .route("/action-items/:id/status", patch(action_items::set_status))
}

fn rbs_routes() -> Router<AppState> {
    use handlers::rbs;
    Router::new()
        .route("/rbs", get(rbs::list).post(rbs::create))
        .route("/rbs/tree", get(rbs::tree))
        .route("/rbs/:id", put(rbs::update).delete(rbs::delete))
}

fn snapshot_routes() -> Router<AppState> {
    use handlers::snapshots;
    Router::new()
        .route(
            "/snapshots",
            get(snapshots::list).post(snapshots::create),
        )
        .route("/snapshots/import", post(snapshots::import))
        .route(
            "/snapshots/:id",
            get(snapshots::get)
                .put(snapshots::update)
                .delete(snapshots::delete),
        )
        .route("/snapshots/:id/restore", post(snapshots::restore))
        .route("/snapshots/:id/export", get(snapshots::export))
}

fn audit_routes() -> Router<AppState> {
    use handlers::audit;
    Router::new()
        .route("/audit/logs", get(audit::logs))
        .route("/audit/risks/:id/trail", get(audit::risk_trail))
        .route("/audit/risks/:id/trend", get(audit::risk_trend))
        .route(
            "/audit/action-items/:id/trail",
            get(audit::action_item_trail),
        )
}

/// Local development accepts any origin; cloud deployments are pinned
/// to the configured frontend.
fn cors_layer(config: &AppConfig) -> CorsLayer {
    match config.environment {
        Environment::Local => CorsLayer::permissive(),
        Environment::Cloud => {
            let origin = config
                .api
                .frontend_origin
                .parse::<HeaderValue>()
                .unwrap_or_else(|_| HeaderValue::from_static("https://riskworks.app"));
            CorsLayer::new()
                .allow_origin(origin)
                .allow_methods(Any)
                .allow_headers(Any)
        }
    }
}

async fn not_found() -> ApiError {
    ApiError::not_found("Route not found")
}
