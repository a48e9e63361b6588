//! Response envelope and the single error-to-HTTP mapping.

use crate::errors::Error;
use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;

/// `{success, data?, message?, count?}` body shared by every endpoint
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    /// Whether the request succeeded
    pub success: bool,
    /// Payload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Human-readable outcome
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Number of items in a list payload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
}

/// What a handler returns
pub type ApiResult<T> = crate::errors::Result<(StatusCode, Json<ApiResponse<T>>)>;

/// 200 with `data`.
pub fn ok<T: Serialize>(data: T) -> ApiResult<T> {
    Ok((
        StatusCode::OK,
        Json(ApiResponse {
            success: true,
            data: Some(data),
            message: None,
            count: None,
        }),
    ))
}

/// 200 with `data` and a message.
pub fn ok_with_message<T: Serialize>(data: T, message: &str) -> ApiResult<T> {
    Ok((
        StatusCode::OK,
        Json(ApiResponse {
            success: true,
            data: Some(data),
            message: Some(message.to_string()),
            count: None,
        }),
    ))
}

/// 201 with the created `data` and a message.
pub fn created<T: Serialize>(data: T, message: &str) -> ApiResult<T> {
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            success: true,
            data: Some(data),
            message: Some(message.to_string()),
            count: None,
        }),
    ))
}

/// 200 with a list payload and its `count`.
pub fn listed<T: Serialize>(items: Vec<T>) -> ApiResult<Vec<T>> {
    let count = items.len();
    Ok((
        StatusCode::OK,
        Json(ApiResponse {
            success: true,
            data: Some(items),
            message: None,
            count: Some(count),
        }),
    ))
}

/// 200 with only a message.
pub fn done(message: &str) -> ApiResult<()> {
    Ok((
        StatusCode::OK,
        Json(ApiResponse {
            success: true,
            data: None,
            message: Some(message.to_string()),
            count: None,
        }),
    ))
}

impl Error {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Validation { .. }
            | Self::InvalidId { .. }
            | Self::InvalidAmount { .. }
            | Self::InvalidState { .. } => StatusCode::BAD_REQUEST,
            Self::InvalidCredentials | Self::Unauthenticated { .. } => StatusCode::UNAUTHORIZED,
            Self::Forbidden { .. } => StatusCode::FORBIDDEN,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Conflict { .. } | Self::AlreadyIssued { .. } => StatusCode::CONFLICT,
            Self::Config { .. }
            | Self::PasswordHash { .. }
            | Self::Database(_)
            | Self::Token(_)
            | Self::Io(_)
            | Self::Toml(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            error!("Request failed: {}", self);
            "internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = ApiResponse::<()> {
            success: false,
            data: None,
            message: Some(message),
            count: None,
        };
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Self::validation(rejection.body_text())
    }
}

impl From<QueryRejection> for Error {
    fn from(rejection: QueryRejection) -> Self {
        Self::validation(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(Error::validation("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            Error::InvalidId { id: "x".into() }.status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(Error::InvalidCredentials.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            Error::Unauthenticated { message: "x".into() }.status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(Error::forbidden("x").status(), StatusCode::FORBIDDEN);
        assert_eq!(Error::not_found("campaign", 1).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            Error::AlreadyIssued {
                donation_id: "x".into()
            }
            .status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            Error::InvalidState { message: "x".into() }.status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            Error::Database(sea_orm::DbErr::Custom("boom".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_internal_errors_are_masked() {
        let response = Error::Database(sea_orm::DbErr::Custom("secret detail".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
