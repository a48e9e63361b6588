//! Campaign update entity - Dated news entries posted on a campaign.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Campaign update database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "campaign_updates")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Campaign the entry is posted on
    #[sea_orm(indexed)]
    pub campaign_id: Uuid,
    /// Posting date; entries are listed in ascending date order
    pub date: DateTimeUtc,
    /// Entry headline
    pub title: String,
    /// Entry body
    pub content: String,
}

/// Each update belongs to one campaign
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Parent campaign
    #[sea_orm(
        belongs_to = "super::campaign::Entity",
        from = "Column::CampaignId",
        to = "super::campaign::Column::Id",
        on_delete = "Cascade"
    )]
    Campaign,
}

impl Related<super::campaign::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Campaign.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
