//! Campaign entity - A fundraising goal run by an association.
//!
//! `current_amount` and `donor_count` are aggregate fields: they only move when a
//! donation settles, through an atomic increment.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Cause a campaign raises money for
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum CampaignCategory {
    /// Schools, scholarships, training
    #[sea_orm(string_value = "education")]
    Education,
    /// Medical care and research
    #[sea_orm(string_value = "health")]
    Health,
    /// Ecology and climate
    #[sea_orm(string_value = "environment")]
    Environment,
    /// Emergency relief
    #[sea_orm(string_value = "humanitarian")]
    Humanitarian,
    /// Arts and heritage
    #[sea_orm(string_value = "culture")]
    Culture,
    /// Social action
    #[sea_orm(string_value = "social")]
    Social,
    /// Anything else
    #[sea_orm(string_value = "other")]
    Other,
}

/// Campaign database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "campaigns")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Campaign headline
    pub title: String,
    /// Full description
    pub description: String,
    /// Association running the campaign
    #[sea_orm(indexed)]
    pub association_id: Uuid,
    /// Fundraising target, never negative
    pub goal: f64,
    /// Sum of settled donations
    pub current_amount: f64,
    /// Number of settled donations
    pub donor_count: i64,
    /// When fundraising opens
    pub start_date: DateTimeUtc,
    /// Optional closing date
    pub end_date: Option<DateTimeUtc>,
    /// Whether the campaign is currently open
    pub is_active: bool,
    /// Cause category
    pub category: CampaignCategory,
    /// Optional cover image URL
    pub image: Option<String>,
    /// When the campaign was created
    pub created_at: DateTimeUtc,
    /// When the campaign was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Campaign and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each campaign belongs to one association
    #[sea_orm(
        belongs_to = "super::association::Entity",
        from = "Column::AssociationId",
        to = "super::association::Column::Id",
        on_delete = "Cascade"
    )]
    Association,
    /// One campaign has many news updates
    #[sea_orm(has_many = "super::campaign_update::Entity")]
    Updates,
}

impl Related<super::association::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Association.def()
    }
}

impl Related<super::campaign_update::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Updates.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
