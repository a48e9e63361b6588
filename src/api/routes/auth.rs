//! Registration, login and token verification.

use crate::{
    api::{
        AppState,
        extract::ApiJson,
        response::{ApiResult, created, ok, ok_with_message},
    },
    core::{
        identity::{self, NewUser},
        token,
    },
    entities::UserModel,
};
use axum::{Router, extract::State, routing::post};
use serde::{Deserialize, Serialize};

/// Authenticated session returned by register and login
#[derive(Debug, Serialize)]
pub struct Session {
    /// The signed-in user
    pub user: UserModel,
    /// Bearer token for subsequent requests
    pub token: String,
}

/// Login form
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Login email
    pub email: String,
    /// Plain-text password
    pub password: String,
}

/// Token to check
#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    /// Bearer token
    pub token: String,
}

/// Fresh profile behind a valid token
#[derive(Debug, Serialize)]
pub struct Verified {
    /// The user as currently stored
    pub user: UserModel,
}

fn session(state: &AppState, user: UserModel) -> crate::errors::Result<Session> {
    let auth = &state.config.auth;
    let token = token::issue_token(&user, &auth.jwt_secret, auth.token_ttl_hours)?;
    Ok(Session { user, token })
}

async fn register(State(state): State<AppState>, ApiJson(input): ApiJson<NewUser>) -> ApiResult<Session> {
    let user = identity::register(&state.db, input).await?;
    created(session(&state, user)?, "User registered")
}

async fn login(State(state): State<AppState>, ApiJson(input): ApiJson<LoginRequest>) -> ApiResult<Session> {
    let user = identity::authenticate(&state.db, &input.email, &input.password).await?;
    ok_with_message(session(&state, user)?, "Logged in")
}

async fn verify(State(state): State<AppState>, ApiJson(input): ApiJson<VerifyRequest>) -> ApiResult<Verified> {
    let principal = token::verify_token(&input.token, &state.config.auth.jwt_secret)?;
    let user = identity::get_user(&state.db, principal.id).await?;
    ok(Verified { user })
}

/// `/api/auth` routes
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/verify-token", post(verify))
}
