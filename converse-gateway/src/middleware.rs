//! Request middleware.

use axum::{
    extract::Request,
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

/// Header set by TLS-terminating proxies with the original scheme.
const FORWARDED_PROTO: &str = "x-forwarded-proto";

/// Redirect plain-HTTP requests arriving through a proxy to HTTPS.
///
/// Only requests whose `X-Forwarded-Proto` is `http` are redirected (301);
/// direct requests without the header pass through.
pub async fn https_redirect(request: Request, next: Next) -> Response {
    let forwarded_http = request
        .headers()
        .get(FORWARDED_PROTO)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|proto| proto.trim().eq_ignore_ascii_case("http"));

    if !forwarded_http {
        return next.run(request).await;
    }

    let Some(host) = request
        .headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
    else {
        return next.run(request).await;
    };

    let path = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let location = format!("https://{host}{path}");

    match HeaderValue::from_str(&location) {
        Ok(location) => {
            tracing::debug!(location = ?location, "Redirecting to HTTPS");
            (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, location)]).into_response()
        }
        Err(_) => next.run(request).await,
    }
}
