//! Document entity - Files published by an association (reports, statutes, accounts).
//!
//! Private documents are only visible to their uploader, the association's
//! admins and platform admins.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Kind of document
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum DocumentCategory {
    /// Activity report
    #[sea_orm(string_value = "report")]
    Report,
    /// Accounts and budgets
    #[sea_orm(string_value = "financial")]
    Financial,
    /// Administrative paperwork
    #[sea_orm(string_value = "administrative")]
    Administrative,
    /// Statutes and legal filings
    #[sea_orm(string_value = "legal")]
    Legal,
    /// Project descriptions
    #[sea_orm(string_value = "project")]
    Project,
    /// Anything else
    #[sea_orm(string_value = "other")]
    Other,
}

/// Review status of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, Default)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    /// Being written
    #[default]
    #[sea_orm(string_value = "draft")]
    Draft,
    /// Submitted for review
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Accepted
    #[sea_orm(string_value = "approved")]
    Approved,
    /// Refused
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

/// Document database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "documents")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Document title
    pub title: String,
    /// Optional summary
    pub description: Option<String>,
    /// Where the file is stored
    pub file_url: String,
    /// MIME type of the file
    pub file_type: String,
    /// File size in bytes
    pub file_size: i64,
    /// Owning association
    #[sea_orm(indexed)]
    pub association_id: Uuid,
    /// Document kind
    pub category: DocumentCategory,
    /// Review status
    pub status: DocumentStatus,
    /// Visible to every authenticated user
    pub is_public: bool,
    /// User who uploaded the file
    pub uploaded_by: Uuid,
    /// When the document was created
    pub created_at: DateTimeUtc,
    /// When the document was last modified
    pub updated_at: DateTimeUtc,
}

/// Documents are looked up through explicit association filters
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
