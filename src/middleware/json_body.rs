use axum::{
    body::{Body, to_bytes},
    extract::{FromRequestParts, OptionalFromRequestParts, Request, State},
    http::{HeaderMap, header::CONTENT_TYPE, request::Parts},
    middleware::Next,
    response::Response,
};
use serde_json::Value;
use std::convert::Infallible;
use tracing::debug;

use crate::error::AuthError;

/// Parsed JSON request body, placed in request extensions by
/// [`parse_json_body`] before any handler runs.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedJson(pub Value);

impl<S> FromRequestParts<S> for ParsedJson
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<ParsedJson>()
            .cloned()
            .ok_or(AuthError::MissingJsonBody)
    }
}

impl<S> OptionalFromRequestParts<S> for ParsedJson
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(parts.extensions.get::<ParsedJson>().cloned())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct JsonBodyLimit(pub usize);

/// `application/json` and `application/*+json`, parameters ignored.
pub fn is_json_content_type(headers: &HeaderMap) -> bool {
    let Some(ct) = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()) else {
        return false;
    };
    let mime = ct.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
    mime == "application/json" || (mime.starts_with("application/") && mime.ends_with("+json"))
}

/// Middleware stage: parse JSON bodies up front.
///
/// Non-JSON requests and empty bodies pass through untouched. The raw bytes
/// are put back so downstream `Json<T>` extractors still work.
pub async fn parse_json_body(
    State(JsonBodyLimit(limit)): State<JsonBodyLimit>,
    req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    if !is_json_content_type(req.headers()) {
        return Ok(next.run(req).await);
    }

    let (mut parts, body) = req.into_parts();
    let declared_len = parts
        .headers
        .get(axum::http::header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());
    if declared_len.is_some_and(|len| len > limit) {
        debug!(limit, "rejecting oversized JSON body");
        return Err(AuthError::PayloadTooLarge);
    }

    let bytes = to_bytes(body, limit).await.map_err(|e| {
        debug!(error = %e, limit, "failed to buffer JSON body");
        AuthError::PayloadTooLarge
    })?;

    if !bytes.is_empty() {
        let value: Value = serde_json::from_slice(&bytes).map_err(|e| {
            debug!(error = %e, "rejecting malformed JSON body");
            AuthError::InvalidJson(e.to_string())
        })?;
        parts.extensions.insert(ParsedJson(value));
    }

    let req = Request::from_parts(parts, Body::from(bytes));
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(ct: &'static str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(CONTENT_TYPE, HeaderValue::from_static(ct));
        h
    }

    #[test]
    fn recognizes_json_content_types() {
        assert!(is_json_content_type(&headers("application/json")));
        assert!(is_json_content_type(&headers("Application/JSON; charset=utf-8")));
        assert!(is_json_content_type(&headers("application/merge-patch+json")));
        assert!(!is_json_content_type(&headers("text/plain")));
        assert!(!is_json_content_type(&headers("text/x+json")));
        assert!(!is_json_content_type(&HeaderMap::new()));
    }
}
