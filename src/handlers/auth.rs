use axum::{
    Json, Router,
    extract::{OriginalUri, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde::Serialize;
use serde_json::json;
use tracing::warn;

use crate::router::AuthState;
use crate::service::startup::SchemaStatus;

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub schema: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub users: Option<i64>,
}

/// Default route group mounted under `/api/auth`.
pub fn routes() -> Router<AuthState> {
    Router::new()
        .route("/status", get(status))
        .fallback(unknown_auth_route)
}

/// GET /api/auth/status -> schema readiness and user count.
pub async fn status(State(state): State<AuthState>) -> Json<StatusResponse> {
    let users = match state.storage.count().await {
        Ok(n) => Some(n),
        Err(e) => {
            warn!(error = %e, "failed to count users");
            None
        }
    };
    let (schema, reason) = match &state.schema {
        SchemaStatus::Ready => ("ready", None),
        SchemaStatus::Degraded(reason) => ("degraded", Some(reason.clone())),
    };
    Json(StatusResponse {
        schema,
        reason,
        users,
    })
}

async fn unknown_auth_route(OriginalUri(uri): OriginalUri) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": {
                "code": "UNKNOWN_AUTH_ROUTE",
                "message": format!("no auth handler for {}", uri.path()),
            }
        })),
    )
}
