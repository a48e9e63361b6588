//! Association directory, management and dashboard.

use crate::{
    api::{
        AppState,
        extract::{ApiJson, ApiQuery, AuthenticatedUser},
        response::{ApiResult, created, done, listed, ok, ok_with_message},
    },
    core::{
        association::{self, AssociationDetails, AssociationSummary, AssociationUpdate, NewAssociation},
        parse_id,
        report::{self, AssociationDashboard},
    },
};
use axum::{
    Router,
    extract::{Path, State},
    routing::{get, post},
};
use serde::Deserialize;
use uuid::Uuid;

/// `?search=` on the directory
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    /// Case-insensitive match on name and description
    pub search: Option<String>,
}

/// New admin of an association
#[derive(Debug, Deserialize)]
pub struct AdminRequest {
    /// User to promote
    pub user_id: Uuid,
}

async fn list(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<SearchQuery>,
) -> ApiResult<Vec<AssociationSummary>> {
    listed(association::list_associations(&state.db, query.search.as_deref()).await?)
}

async fn show(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<AssociationDetails> {
    ok(association::get_association(&state.db, parse_id(&id)?).await?)
}

async fn create(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    ApiJson(input): ApiJson<NewAssociation>,
) -> ApiResult<AssociationDetails> {
    let details = association::create_association(&state.db, &actor, input).await?;
    created(details, "Association created")
}

async fn update(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Path(id): Path<String>,
    ApiJson(changes): ApiJson<AssociationUpdate>,
) -> ApiResult<AssociationDetails> {
    let details = association::update_association(&state.db, &actor, parse_id(&id)?, changes).await?;
    ok_with_message(details, "Association updated")
}

async fn remove(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Path(id): Path<String>,
) -> ApiResult<()> {
    association::delete_association(&state.db, &actor, parse_id(&id)?).await?;
    done("Association deleted")
}

async fn dashboard(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Path(id): Path<String>,
) -> ApiResult<AssociationDashboard> {
    ok(report::association_dashboard(&state.db, &actor, parse_id(&id)?).await?)
}

async fn add_admin(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<AdminRequest>,
) -> ApiResult<AssociationDetails> {
    let details = association::add_admin(&state.db, &actor, parse_id(&id)?, input.user_id).await?;
    ok_with_message(details, "Admin added")
}

/// `/api/associations` routes
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(show).put(update).delete(remove))
        .route("/{id}/dashboard", get(dashboard))
        .route("/{id}/admins", post(add_admin))
}
