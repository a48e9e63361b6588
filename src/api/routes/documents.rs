//! Association documents. Every route requires authentication.

use crate::{
    api::{
        AppState,
        extract::{ApiJson, ApiQuery, AuthenticatedUser},
        response::{ApiResult, created, done, listed, ok, ok_with_message},
    },
    core::{
        document::{self, DocumentChanges, DocumentFilter, NewDocument},
        parse_id,
    },
    entities::{DocumentModel, DocumentStatus},
};
use axum::{
    Router,
    extract::{Path, State},
    routing::{get, patch},
};
use serde::Deserialize;

/// Body of `PATCH /api/documents/{id}/status`
#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    /// Target status
    pub status: DocumentStatus,
}

async fn list(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    ApiQuery(filter): ApiQuery<DocumentFilter>,
) -> ApiResult<Vec<DocumentModel>> {
    listed(document::list_documents(&state.db, &actor, &filter).await?)
}

async fn show(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Path(id): Path<String>,
) -> ApiResult<DocumentModel> {
    ok(document::get_document(&state.db, &actor, parse_id(&id)?).await?)
}

async fn create(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    ApiJson(input): ApiJson<NewDocument>,
) -> ApiResult<DocumentModel> {
    created(document::create_document(&state.db, &actor, input).await?, "Document created")
}

async fn update(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Path(id): Path<String>,
    ApiJson(changes): ApiJson<DocumentChanges>,
) -> ApiResult<DocumentModel> {
    let model = document::update_document(&state.db, &actor, parse_id(&id)?, changes).await?;
    ok_with_message(model, "Document updated")
}

async fn set_status(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<StatusRequest>,
) -> ApiResult<DocumentModel> {
    let model = document::update_document_status(&state.db, &actor, parse_id(&id)?, input.status).await?;
    ok_with_message(model, "Document status updated")
}

async fn remove(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Path(id): Path<String>,
) -> ApiResult<()> {
    document::delete_document(&state.db, &actor, parse_id(&id)?).await?;
    done("Document deleted")
}

/// `/api/documents` routes
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(show).put(update).delete(remove))
        .route("/{id}/status", patch(set_status))
}
