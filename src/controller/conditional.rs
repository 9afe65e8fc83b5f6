//! Conditional request evaluation
//!
//! Optional layer over a bare cache read: decides whether a client's
//! validators (`If-None-Match`, `If-Modified-Since`) still match a cached
//! record, in which case a 304 can be sent instead of the body.

use chrono::DateTime;

use crate::models::{Headers, Metadata, RequestSnapshot, ResponseSnapshot};

/// Response headers a 304 must repeat from the full response.
const NOT_MODIFIED_HEADERS: [&str; 7] = [
    "cache-control",
    "content-location",
    "date",
    "etag",
    "expires",
    "last-modified",
    "vary",
];

/// Returns `true` if the request's validators match the cached metadata.
///
/// `If-None-Match` takes precedence; `If-Modified-Since` is only consulted
/// when it is absent.
pub fn is_not_modified(request: &RequestSnapshot, metadata: &Metadata) -> bool {
    if let Some(if_none_match) = request.headers.get("if-none-match") {
        return metadata
            .etag
            .as_deref()
            .is_some_and(|etag| etag_matches(if_none_match, etag));
    }

    match (
        request.headers.get("if-modified-since"),
        metadata.last_modified.as_deref(),
    ) {
        (Some(since), Some(last_modified)) => not_modified_since(since, last_modified),
        _ => false,
    }
}

/// Builds the 304 answer for a cached response.
pub fn not_modified(response: &ResponseSnapshot) -> ResponseSnapshot {
    let headers: Headers = response
        .headers
        .iter()
        .filter(|(name, _)| {
            NOT_MODIFIED_HEADERS
                .iter()
                .any(|kept| name.eq_ignore_ascii_case(kept))
        })
        .collect();

    ResponseSnapshot {
        status: 304,
        headers,
        body: Vec::new(),
    }
}

/// Weak comparison of an `If-None-Match` list against one entity tag.
fn etag_matches(if_none_match: &str, etag: &str) -> bool {
    let etag = strip_weak(etag.trim());
    if_none_match
        .split(',')
        .map(str::trim)
        .any(|candidate| candidate == "*" || strip_weak(candidate) == etag)
}

fn strip_weak(tag: &str) -> &str {
    tag.strip_prefix("W/").unwrap_or(tag)
}

fn not_modified_since(since: &str, last_modified: &str) -> bool {
    match (
        DateTime::parse_from_rfc2822(since.trim()),
        DateTime::parse_from_rfc2822(last_modified.trim()),
    ) {
        (Ok(since), Ok(last_modified)) => last_modified <= since,
        _ => since.trim() == last_modified.trim(),
    }
}
