use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, OriginalUri},
    http::StatusCode,
    middleware,
    response::IntoResponse,
};
use serde_json::json;

use crate::config::Config;
use crate::db::sqlite::UserStorage;
use crate::handlers;
use crate::middleware::json_body::{JsonBodyLimit, parse_json_body};
use crate::service::startup::SchemaStatus;

/// Path prefix the auth route group is mounted under.
pub const AUTH_PREFIX: &str = "/api/auth";

#[derive(Clone)]
pub struct AuthState {
    pub storage: UserStorage,
    pub schema: SchemaStatus,
}

impl AuthState {
    pub fn new(storage: UserStorage, schema: SchemaStatus) -> Self {
        Self { storage, schema }
    }
}

/// Assemble the application: JSON body stage on every request, then `routes`
/// mounted under [`AUTH_PREFIX`]. Never binds a socket.
pub fn build_app(state: AuthState, routes: Router<AuthState>, body_limit: usize) -> Router {
    Router::new()
        .nest(AUTH_PREFIX, routes)
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(
            JsonBodyLimit(body_limit),
            parse_json_body,
        ))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

/// The service's application with its default auth route group.
pub fn auth_router(state: AuthState, cfg: &Config) -> Router {
    build_app(state, handlers::auth::routes(), cfg.body_limit)
}

async fn not_found(OriginalUri(uri): OriginalUri) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": {
                "code": "NOT_FOUND",
                "message": format!("no route for {}", uri.path()),
            }
        })),
    )
}
