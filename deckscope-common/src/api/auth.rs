//! Bearer-token helpers
//!
//! Tokens are never stored in clear text. The identity provider keeps the
//! SHA-256 digest of each issued token and resolves a presented token by
//! digest lookup.
//!
//! # Pure Functions
//!
//! This module contains ONLY pure functions.
//! No HTTP framework dependencies (Axum, etc.) - those are in service-specific code.

use sha2::{Digest, Sha256};

/// Minimum accepted token length (characters, after trimming)
pub const MIN_TOKEN_LEN: usize = 16;

/// Calculate the storage digest of a bearer token
///
/// Returns 64 lowercase hex characters.
///
/// # Examples
///
/// ```
/// use deckscope_common::api::auth::hash_token;
///
/// let digest = hash_token("tok_0123456789abcdef");
/// assert_eq!(digest.len(), 64);
/// assert_eq!(digest, hash_token("tok_0123456789abcdef"));
/// ```
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.trim().as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Extract the token from an `Authorization` header value
///
/// Accepts `Bearer <token>` with a case-insensitive scheme. Returns `None`
/// for any other scheme or an empty token.
///
/// # Examples
///
/// ```
/// use deckscope_common::api::auth::parse_bearer;
///
/// assert_eq!(parse_bearer("Bearer abc"), Some("abc"));
/// assert_eq!(parse_bearer("bearer   abc  "), Some("abc"));
/// assert_eq!(parse_bearer("Basic abc"), None);
/// ```
pub fn parse_bearer(header_value: &str) -> Option<&str> {
    let (scheme, rest) = header_value.trim().split_once(char::is_whitespace)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = rest.trim();
    (!token.is_empty()).then_some(token)
}

/// Structural check applied before any lookup
pub fn is_well_formed(token: &str) -> bool {
    let token = token.trim();
    token.len() >= MIN_TOKEN_LEN && token.chars().all(|c| c.is_ascii_graphic())
}
