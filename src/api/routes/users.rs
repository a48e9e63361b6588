//! Self-service profile routes and platform user administration.

use crate::{
    api::{
        AppState,
        extract::{ApiJson, ApiQuery, AuthenticatedUser},
        response::{ApiResult, done, listed, ok, ok_with_message},
    },
    core::{
        donation::{self, DonationFilter},
        identity::{self, ProfileUpdate},
        parse_id,
        policy::{self, Action, Principal, Target},
    },
    entities::{DonationModel, Role, UserModel},
    errors::{Error, Result},
};
use axum::{
    Router,
    extract::{Path, State},
    routing::{get, patch, post},
};
use serde::Deserialize;

/// Body of `POST /api/users/change-password`
#[derive(Debug, Deserialize)]
pub struct PasswordChange {
    /// Password in use
    pub current_password: String,
    /// Replacement, at least eight characters
    pub new_password: String,
}

/// Query string of `GET /api/users`
#[derive(Debug, Default, Deserialize)]
pub struct UserQuery {
    /// `donor` or `admin`
    pub role: Option<String>,
    /// Case-insensitive match on names and email
    pub search: Option<String>,
}

/// Body of `PATCH /api/users/{id}/role`
#[derive(Debug, Deserialize)]
pub struct RoleRequest {
    /// New role
    pub role: Role,
}

fn require_platform_admin(actor: &Principal) -> Result<()> {
    policy::require(actor, Action::ManageUsers, Target::Platform)
}

async fn profile(State(state): State<AppState>, AuthenticatedUser(actor): AuthenticatedUser) -> ApiResult<UserModel> {
    ok(identity::get_user(&state.db, actor.id).await?)
}

async fn update_profile(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    ApiJson(changes): ApiJson<ProfileUpdate>,
) -> ApiResult<UserModel> {
    let user = identity::update_profile(&state.db, actor.id, changes).await?;
    ok_with_message(user, "Profile updated")
}

async fn change_password(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    ApiJson(input): ApiJson<PasswordChange>,
) -> ApiResult<()> {
    identity::change_password(&state.db, actor.id, &input.current_password, &input.new_password).await?;
    done("Password changed")
}

async fn own_donations(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
) -> ApiResult<Vec<DonationModel>> {
    let filter = DonationFilter {
        donor_id: Some(actor.id),
        ..Default::default()
    };
    listed(donation::list_donations(&state.db, &actor, &filter).await?)
}

async fn list(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    ApiQuery(query): ApiQuery<UserQuery>,
) -> ApiResult<Vec<UserModel>> {
    require_platform_admin(&actor)?;
    let role = query
        .role
        .as_deref()
        .map(|r| Role::parse(r).ok_or_else(|| Error::validation(format!("unknown role: {r}"))))
        .transpose()?;
    listed(identity::list_users(&state.db, role, query.search.as_deref()).await?)
}

async fn show(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Path(id): Path<String>,
) -> ApiResult<UserModel> {
    require_platform_admin(&actor)?;
    ok(identity::get_user(&state.db, parse_id(&id)?).await?)
}

async fn set_role(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<RoleRequest>,
) -> ApiResult<UserModel> {
    require_platform_admin(&actor)?;
    let user = identity::update_role(&state.db, parse_id(&id)?, input.role).await?;
    ok_with_message(user, "Role updated")
}

/// `/api/users` routes
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list))
        .route("/profile", get(profile).put(update_profile))
        .route("/change-password", post(change_password))
        .route("/donations", get(own_donations))
        .route("/{id}", get(show))
        .route("/{id}/role", patch(set_role))
}
