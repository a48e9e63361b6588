//! Request extractors.

use crate::{
    api::AppState,
    core::{policy::Principal, token},
    errors::Error,
};
use axum::{
    extract::{FromRequest, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};

/// Caller identified by a valid bearer token
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub Principal);

fn bearer_token(parts: &Parts) -> Result<&str, Error> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .ok_or_else(|| Error::Unauthenticated {
            message: "missing authorization header".to_string(),
        })?;
    let value = header.to_str().map_err(|_| Error::Unauthenticated {
        message: "malformed authorization header".to_string(),
    })?;
    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| Error::Unauthenticated {
            message: "expected a bearer token".to_string(),
        })
}

impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = Error;

    fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> impl Future<Output = Result<Self, Self::Rejection>> + Send {
        let principal = bearer_token(parts)
            .and_then(|t| token::verify_token(t, &state.config.auth.jwt_secret));
        async move { principal.map(Self) }
    }
}

/// JSON body whose rejections go through the error envelope
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(Error))]
pub struct ApiJson<T>(pub T);

/// Query string whose rejections go through the error envelope
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(Error))]
pub struct ApiQuery<T>(pub T);
