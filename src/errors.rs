//! Unified error type for the platform.
//!
//! Every core operation returns [`Result`]. The API layer maps each variant to an
//! HTTP status and response envelope in one place (`api::response`).

use thiserror::Error;

/// All errors produced by the platform.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be loaded or is incomplete
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// Malformed or missing input
    #[error("Validation error: {message}")]
    Validation {
        /// Human-readable reason
        message: String,
    },

    /// An identifier that does not parse
    #[error("Invalid identifier: {id}")]
    InvalidId {
        /// The raw identifier as received
        id: String,
    },

    /// Donation amount below the minimum or not a finite number
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// The rejected amount
        amount: f64,
    },

    /// Email/password pair did not match a user
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Missing, malformed or expired bearer token
    #[error("Unauthenticated: {message}")]
    Unauthenticated {
        /// Why the credential was rejected
        message: String,
    },

    /// Authenticated but not permitted
    #[error("Forbidden: {message}")]
    Forbidden {
        /// What the actor attempted
        message: String,
    },

    /// Entity absent
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity kind, e.g. `"campaign"`
        entity: &'static str,
        /// Identifier that was looked up
        id: String,
    },

    /// Uniqueness violation or duplicate membership
    #[error("Conflict: {message}")]
    Conflict {
        /// Which constraint was violated
        message: String,
    },

    /// Operation not allowed in the entity's current state
    #[error("Invalid state: {message}")]
    InvalidState {
        /// Why the transition was refused
        message: String,
    },

    /// A tax receipt already exists for this donation
    #[error("Tax receipt already issued for donation {donation_id}")]
    AlreadyIssued {
        /// Donation carrying the receipt
        donation_id: String,
    },

    /// Password hashing failure
    #[error("Password hashing error: {message}")]
    PasswordHash {
        /// Underlying hasher error
        message: String,
    },

    /// Storage failure
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Token encoding failure
    #[error("Token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    /// I/O failure (config file, listener)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// `config.toml` did not parse
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    /// Shorthand for a [`Error::Validation`] with the given message.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Shorthand for a [`Error::Forbidden`] with the given message.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    /// Shorthand for a [`Error::NotFound`].
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
