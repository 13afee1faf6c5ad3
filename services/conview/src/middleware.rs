//! Request guards applied before handlers and static files

use std::net::SocketAddr;

use axum::{
    Json,
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderValue, Request, StatusCode, header::RETRY_AFTER},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::warn;

use crate::{
    error::ApiError,
    rate_limiter::{Decision, RateLimiter},
};

/// Extensions a static file may carry
pub const ALLOWED_EXTENSIONS: [&str; 9] =
    ["html", "css", "js", "pdf", "png", "jpg", "jpeg", "gif", "svg"];

const AUTH_ROUTES: [&str; 3] = ["/register", "/login", "/logout"];

/// Peer IP address of the request, or `"unknown"` without connection info
pub fn client_address<B>(req: &Request<B>) -> String {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Count the request against `limiter` and reject it once over budget
pub async fn rate_limit(
    State(limiter): State<RateLimiter>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let client = client_address(&req);

    match limiter.check(&client).await {
        Decision::Allowed { remaining } => {
            let mut response = next.run(req).await;
            let headers = response.headers_mut();
            headers.insert(
                "x-ratelimit-limit",
                HeaderValue::from(limiter.config().max_requests),
            );
            headers.insert("x-ratelimit-remaining", HeaderValue::from(remaining));
            response
        }
        Decision::Limited { retry_after } => {
            warn!(
                "Rate limit {} rejected {} {} from {}",
                limiter.config().name,
                req.method(),
                req.uri().path(),
                client
            );

            let retry_secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
            let body = Json(json!({
                "success": false,
                "message": limiter.config().message,
            }));

            (
                StatusCode::TOO_MANY_REQUESTS,
                [(RETRY_AFTER, HeaderValue::from(retry_secs.max(1)))],
                body,
            )
                .into_response()
        }
    }
}

/// Whether `path` names an API or auth route
pub fn is_api_route(path: &str) -> bool {
    path.starts_with("/api/") || AUTH_ROUTES.contains(&path)
}

/// Whether a request for `raw_path` must be refused before reaching any file
///
/// Dot-prefixed segments are always refused. Outside the API, a path with a
/// dot must end in an allowed extension.
pub fn is_forbidden_path(raw_path: &str) -> bool {
    let Ok(path) = urlencoding::decode(raw_path) else {
        return true;
    };

    if path.split('/').any(|segment| segment.starts_with('.')) {
        return true;
    }

    if is_api_route(raw_path) {
        return false;
    }

    let has_allowed_extension = ALLOWED_EXTENSIONS.iter().any(|ext| {
        path.strip_suffix(ext)
            .is_some_and(|rest| rest.ends_with('.'))
    });

    path.contains('.') && !has_allowed_extension
}

/// Refuse dotfiles and files outside the extension allowlist with 403
pub async fn static_file_guard(req: Request<Body>, next: Next) -> Response {
    if is_forbidden_path(req.uri().path()) {
        warn!(
            "Refused access to {} from {}",
            req.uri().path(),
            client_address(&req)
        );
        return ApiError::Forbidden("Access denied".to_string()).into_response();
    }

    next.run(req).await
}
