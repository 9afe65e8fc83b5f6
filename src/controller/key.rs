//! Default cache key generation

use crate::models::RequestSnapshot;

/// Hex characters kept from the digest (8 bytes).
pub const KEY_HEX_LEN: usize = 16;

/// Fixed hashing key; cache keys only need to be stable, not secret.
const KEY_SEED: [u8; 32] = *b"response-cache:default-key:v1..!";

/// Derives a short, deterministic key from method, path and query string.
///
/// Scheme and host are ignored: a cache instance serves one origin.
pub fn generate_key(request: &RequestSnapshot) -> String {
    let mut hasher = blake3::Hasher::new_keyed(&KEY_SEED);
    hasher.update(request.method.as_bytes());
    hasher.update(b" ");
    hasher.update(request.path_and_query().as_bytes());
    let digest = hasher.finalize().to_hex();
    digest.as_str()[..KEY_HEX_LEN].to_string()
}

/// Readable key that starts with the request path: `{path}?{query}#{METHOD}`.
///
/// Remote stores select keys for invalidation by path prefix, so routes
/// cached in one need keys of this shape. `#` never occurs in a request
/// target, which keeps the method suffix unambiguous.
pub fn path_key(request: &RequestSnapshot) -> String {
    format!("{}#{}", request.path_and_query(), request.method)
}
