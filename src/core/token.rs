//! Bearer tokens: HS256-signed JWTs carrying the `{id, email, role}` snapshot.

use crate::core::policy::Principal;
use crate::entities::{Role, UserModel};
use crate::errors::{Error, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    email: String,
    role: Role,
    iat: i64,
    exp: i64,
}

/// Mints a token for `user` valid for `ttl_hours`.
pub fn issue_token(user: &UserModel, secret: &str, ttl_hours: i64) -> Result<String> {
    let now = Utc::now();
    let claims = Claims {
        sub: user.id.to_string(),
        email: user.email.clone(),
        role: user.role,
        iat: now.timestamp(),
        exp: (now + Duration::hours(ttl_hours)).timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(Into::into)
}

/// Checks signature and expiry, returning the principal the token was minted for.
pub fn verify_token(token: &str, secret: &str) -> Result<Principal> {
    let mut validation = Validation::default();
    validation.validate_exp = true;

    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| Error::Unauthenticated {
        message: format!("invalid token: {e}"),
    })?;

    let id = Uuid::parse_str(&data.claims.sub).map_err(|_| Error::Unauthenticated {
        message: "invalid token subject".to_string(),
    })?;

    Ok(Principal {
        id,
        email: data.claims.email,
        role: data.claims.role,
    })
}
