//! Response cache middleware
//!
//! Sits in front of the demo routes. Cacheable reads are answered from the
//! store when possible and written back on a miss; successful mutating
//! requests drop the cached reads they affect.

use axum::{
    body::Body,
    extract::{Request, State},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::debug;

use super::handlers::AppState;
use crate::controller::CachePolicy;
use crate::error::CacheError;
use crate::models::{Headers, RequestSnapshot, ResponseSnapshot};

/// Reports whether a response came from the cache.
pub const CACHE_STATUS_HEADER: &str = "x-cache";

const CACHED_ROUTE_PREFIX: &str = "/items";

/// Middleware for `axum::middleware::from_fn_with_state`.
pub async fn cache_layer(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let snapshot = request_snapshot(&request);
    let policy = resolve_policy(&state, &snapshot.path);

    if state.controller.is_cachable_request(&snapshot, policy) {
        if let Some(policy) = policy {
            return serve_cached(&state, policy, snapshot, request, next).await;
        }
    }

    if state.invalidation.triggers(&snapshot.method)
        && state
            .invalidation
            .paths
            .iter()
            .any(|pattern| pattern.matches(&snapshot.path))
    {
        let response = next.run(request).await;
        if response.status().is_success() {
            state
                .controller
                .invalidate(&state.invalidation, state.store.as_ref())
                .await;
        }
        return response;
    }

    next.run(request).await
}

async fn serve_cached(
    state: &AppState,
    policy: &CachePolicy,
    snapshot: RequestSnapshot,
    request: Request,
    next: Next,
) -> Response {
    let store = state.store.as_ref();
    let key = state.controller.generate_cache_key(&snapshot, policy);

    if let Some(cached) = state
        .controller
        .get_cached_response_conditional(&key, &snapshot, store)
        .await
    {
        debug!("Cache hit for {}", snapshot.path_and_query());
        let mut response = restore_response(cached);
        mark(&mut response, "HIT");
        return response;
    }

    let response = next.run(request).await;
    let (parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            return CacheError::Internal(format!("failed to buffer response: {e}"))
                .into_response()
        }
    };

    let captured = ResponseSnapshot {
        status: parts.status.as_u16(),
        headers: headers_from(&parts.headers),
        body: bytes.to_vec(),
    };
    state
        .controller
        .cache_response(&key, &snapshot, &captured, store, Some(policy.max_age))
        .await;

    let mut response = Response::from_parts(parts, Body::from(bytes));
    mark(&mut response, "MISS");
    response
}

fn resolve_policy<'a>(state: &'a AppState, path: &str) -> Option<&'a CachePolicy> {
    let rest = path.strip_prefix(CACHED_ROUTE_PREFIX)?;
    (rest.is_empty() || rest.starts_with('/')).then_some(&state.cache_policy)
}

fn request_snapshot(request: &Request) -> RequestSnapshot {
    let uri = request.uri();
    RequestSnapshot {
        method: request.method().as_str().to_ascii_uppercase(),
        path: uri.path().to_string(),
        query: uri.query().unwrap_or_default().to_string(),
        headers: headers_from(request.headers()),
    }
}

/// Non-UTF-8 header values are dropped.
fn headers_from(map: &HeaderMap) -> Headers {
    map.iter()
        .filter_map(|(name, value)| Some((name.as_str(), value.to_str().ok()?)))
        .collect()
}

fn restore_response(snapshot: ResponseSnapshot) -> Response {
    let status = StatusCode::from_u16(snapshot.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut response = Response::new(Body::from(snapshot.body));
    *response.status_mut() = status;

    let headers = response.headers_mut();
    for (name, value) in snapshot.headers.iter() {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            headers.append(name, value);
        }
    }
    response
}

fn mark(response: &mut Response, status: &'static str) {
    response
        .headers_mut()
        .insert(CACHE_STATUS_HEADER, HeaderValue::from_static(status));
}
