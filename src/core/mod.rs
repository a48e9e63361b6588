//! Core business logic, independent of the HTTP layer.
//!
//! Every operation takes a `SeaORM` connection (or a transaction through
//! [`sea_orm::ConnectionTrait`]) and returns [`crate::errors::Result`].

/// Association store and admin membership
pub mod association;
/// Campaign store, update entries and derived progress figures
pub mod campaign;
/// Document store with visibility rules
pub mod document;
/// Donation creation, scoped reads, refunds and per-user statistics
pub mod donation;
/// Registration, authentication and profile management
pub mod identity;
/// Payment event state machine and timeout sweeping
pub mod payment;
/// Centralized authorization predicate
pub mod policy;
/// Tax receipt issuance
pub mod receipt;
/// Association dashboard aggregates
pub mod report;
/// Bearer token minting and verification
pub mod token;

use crate::errors::{Error, Result};
use sea_orm::{DbErr, SqlErr, sea_query::LikeExpr};
use uuid::Uuid;

/// Parses an identifier received from a client.
pub fn parse_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw.trim()).map_err(|_| Error::InvalidId {
        id: raw.to_string(),
    })
}

/// Turns a unique-constraint violation into [`Error::Conflict`]; other errors pass through.
pub(crate) fn conflict_on_unique(err: DbErr, message: &str) -> Error {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => Error::Conflict {
            message: message.to_string(),
        },
        _ => Error::Database(err),
    }
}

/// Rejects empty or whitespace-only required text, returning it trimmed.
pub(crate) fn required(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::validation(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

/// Normalizes an email address and checks its basic shape.
pub(crate) fn normalize_email(value: &str) -> Result<String> {
    let email = value.trim().to_lowercase();
    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if !valid {
        return Err(Error::validation(format!("invalid email address: {value}")));
    }
    Ok(email)
}

/// Lowercased search text with `LIKE` wildcards escaped by `\`.
fn escape_like(search: &str) -> String {
    let mut escaped = String::with_capacity(search.len());
    for c in search.trim().to_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// `LIKE` expression for a case-insensitive substring search. Wildcards in
/// `search` match literally.
pub(crate) fn like_pattern(search: &str) -> LikeExpr {
    LikeExpr::new(format!("%{}%", escape_like(search))).escape('\\')
}
