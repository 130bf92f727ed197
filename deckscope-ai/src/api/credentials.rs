//! Bearer credentials extractor
//!
//! Accepts `Authorization: Bearer <token>`, or an `access_token` query
//! parameter for EventSource clients that cannot set headers. The header
//! wins when both are present. Absent credentials are not a rejection here;
//! the access guard turns them into `Unauthenticated` so every transport
//! reports it the same way.

use axum::{
    async_trait,
    extract::{FromRequestParts, Query},
    http::{header, request::Parts},
};
use deckscope_common::api::auth::parse_bearer;
use serde::Deserialize;
use std::convert::Infallible;

/// Bearer token presented by the caller, if any
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials(pub Option<String>);

impl Credentials {
    pub fn token(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

#[derive(Debug, Deserialize)]
struct AccessTokenQuery {
    access_token: Option<String>,
}

#[async_trait]
impl<S> FromRequestParts<S> for Credentials
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let from_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_bearer)
            .map(str::to_string);

        if from_header.is_some() {
            return Ok(Credentials(from_header));
        }

        let from_query = Query::<AccessTokenQuery>::try_from_uri(&parts.uri)
            .ok()
            .and_then(|Query(q)| q.access_token)
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());

        Ok(Credentials(from_query))
    }
}
