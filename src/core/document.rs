//! Document business logic - Files published by associations.
//!
//! Creating a document requires association admin rights. Reads and writes on
//! an existing document go through [`policy::can_act`] with the document's
//! uploader, public flag and the association's admin list.

use crate::{
    core::{
        association,
        policy::{self, Action, Principal, Target},
        required,
    },
    entities::{
        AssociationAdmin, AssociationAdminColumn, Document, DocumentCategory, DocumentColumn,
        DocumentModel, DocumentStatus, document,
    },
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{Condition, QueryOrder, QuerySelect, Set, prelude::*};
use serde::Deserialize;
use tracing::{debug, info, instrument};

/// Upload form
#[derive(Debug, Clone, Deserialize)]
pub struct NewDocument {
    /// Title
    pub title: String,
    /// Optional summary
    #[serde(default)]
    pub description: Option<String>,
    /// Storage location
    pub file_url: String,
    /// MIME type
    pub file_type: String,
    /// Size in bytes
    pub file_size: i64,
    /// Owning association
    pub association_id: Uuid,
    /// Kind of document
    pub category: DocumentCategory,
    /// Visible to every authenticated user
    #[serde(default)]
    pub is_public: bool,
}

/// Partial update; status has its own operation
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocumentChanges {
    /// New title
    pub title: Option<String>,
    /// New summary
    pub description: Option<String>,
    /// New storage location
    pub file_url: Option<String>,
    /// New MIME type
    pub file_type: Option<String>,
    /// New size
    pub file_size: Option<i64>,
    /// New kind
    pub category: Option<DocumentCategory>,
    /// New visibility
    pub is_public: Option<bool>,
}

/// Listing filters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocumentFilter {
    /// Exact association
    pub association_id: Option<Uuid>,
    /// Exact category
    pub category: Option<DocumentCategory>,
    /// Exact status
    pub status: Option<DocumentStatus>,
    /// Exact visibility
    pub is_public: Option<bool>,
}

fn check_size(size: i64) -> Result<i64> {
    if size < 0 {
        return Err(Error::validation("file_size must not be negative"));
    }
    Ok(size)
}

async fn find_document(db: &DatabaseConnection, document_id: Uuid) -> Result<DocumentModel> {
    Document::find_by_id(document_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("document", document_id))
}

async fn authorize_document(
    db: &DatabaseConnection,
    actor: &Principal,
    document_id: Uuid,
    action: Action,
) -> Result<DocumentModel> {
    let document = find_document(db, document_id).await?;
    let admins = association::admins_of(db, document.association_id).await?;
    policy::require(
        actor,
        action,
        Target::Document {
            admins: &admins,
            uploaded_by: document.uploaded_by,
            is_public: document.is_public,
        },
    )?;
    Ok(document)
}

/// Uploads a draft document for an association the actor administers.
#[instrument(skip(db, actor, input), fields(actor = %actor.id))]
pub async fn create_document(
    db: &DatabaseConnection,
    actor: &Principal,
    input: NewDocument,
) -> Result<DocumentModel> {
    let title = required("title", &input.title)?;
    let file_url = required("file_url", &input.file_url)?;
    let file_type = required("file_type", &input.file_type)?;
    let file_size = check_size(input.file_size)?;

    association::authorize(db, actor, input.association_id, Action::ManageAssociation).await?;

    let now = Utc::now();
    let document = document::ActiveModel {
        id: Set(Uuid::new_v4()),
        title: Set(title),
        description: Set(input.description),
        file_url: Set(file_url),
        file_type: Set(file_type),
        file_size: Set(file_size),
        association_id: Set(input.association_id),
        category: Set(input.category),
        status: Set(DocumentStatus::default()),
        is_public: Set(input.is_public),
        uploaded_by: Set(actor.id),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;

    info!("Uploaded document {} for association {}", document.id, document.association_id);
    Ok(document)
}

/// Lists the documents `actor` may read, newest first.
///
/// Non-admins see public documents, their own uploads and every document of
/// associations they administer.
pub async fn list_documents(
    db: &DatabaseConnection,
    actor: &Principal,
    filter: &DocumentFilter,
) -> Result<Vec<DocumentModel>> {
    let mut query = Document::find().order_by_desc(DocumentColumn::CreatedAt);

    if let Some(association_id) = filter.association_id {
        query = query.filter(DocumentColumn::AssociationId.eq(association_id));
    }
    if let Some(category) = filter.category {
        query = query.filter(DocumentColumn::Category.eq(category));
    }
    if let Some(status) = filter.status {
        query = query.filter(DocumentColumn::Status.eq(status));
    }
    if let Some(is_public) = filter.is_public {
        query = query.filter(DocumentColumn::IsPublic.eq(is_public));
    }

    if !actor.is_admin() {
        let administered: Vec<Uuid> = AssociationAdmin::find()
            .select_only()
            .column(AssociationAdminColumn::AssociationId)
            .filter(AssociationAdminColumn::UserId.eq(actor.id))
            .into_tuple()
            .all(db)
            .await?;

        let mut visible = Condition::any()
            .add(DocumentColumn::IsPublic.eq(true))
            .add(DocumentColumn::UploadedBy.eq(actor.id));
        if !administered.is_empty() {
            visible = visible.add(DocumentColumn::AssociationId.is_in(administered));
        }
        query = query.filter(visible);
    }

    let documents = query.all(db).await?;
    debug!("Listed {} documents for {}", documents.len(), actor.id);
    Ok(documents)
}

/// Reads a document visible to `actor`.
pub async fn get_document(
    db: &DatabaseConnection,
    actor: &Principal,
    document_id: Uuid,
) -> Result<DocumentModel> {
    authorize_document(db, actor, document_id, Action::ReadDocument).await
}

/// Applies a partial update; uploader or association admin only.
#[instrument(skip(db, actor, changes), fields(actor = %actor.id))]
pub async fn update_document(
    db: &DatabaseConnection,
    actor: &Principal,
    document_id: Uuid,
    changes: DocumentChanges,
) -> Result<DocumentModel> {
    let document = authorize_document(db, actor, document_id, Action::ModifyDocument).await?;
    let mut active: document::ActiveModel = document.into();

    if let Some(title) = changes.title {
        active.title = Set(required("title", &title)?);
    }
    if changes.description.is_some() {
        active.description = Set(changes.description);
    }
    if let Some(file_url) = changes.file_url {
        active.file_url = Set(required("file_url", &file_url)?);
    }
    if let Some(file_type) = changes.file_type {
        active.file_type = Set(required("file_type", &file_type)?);
    }
    if let Some(file_size) = changes.file_size {
        active.file_size = Set(check_size(file_size)?);
    }
    if let Some(category) = changes.category {
        active.category = Set(category);
    }
    if let Some(is_public) = changes.is_public {
        active.is_public = Set(is_public);
    }
    active.updated_at = Set(Utc::now());

    active.update(db).await.map_err(Into::into)
}

/// Moves a document to `status`; uploader or association admin only.
#[instrument(skip(db, actor), fields(actor = %actor.id))]
pub async fn update_document_status(
    db: &DatabaseConnection,
    actor: &Principal,
    document_id: Uuid,
    status: DocumentStatus,
) -> Result<DocumentModel> {
    let document = authorize_document(db, actor, document_id, Action::ModifyDocument).await?;
    let mut active: document::ActiveModel = document.into();
    active.status = Set(status);
    active.updated_at = Set(Utc::now());

    let document = active.update(db).await?;
    info!("Document {} is now {:?}", document.id, document.status);
    Ok(document)
}

/// Deletes a document; uploader or association admin only.
#[instrument(skip(db, actor), fields(actor = %actor.id))]
pub async fn delete_document(db: &DatabaseConnection, actor: &Principal, document_id: Uuid) -> Result<()> {
    authorize_document(db, actor, document_id, Action::ModifyDocument).await?;
    Document::delete_by_id(document_id).exec(db).await?;
    info!("Deleted document {}", document_id);
    Ok(())
}
