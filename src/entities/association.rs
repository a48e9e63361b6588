//! Association entity - A registered non-profit that runs campaigns.
//!
//! Name, email and registration number are each unique. Administrators are
//! stored in the `association_admins` join table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Association database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "associations")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Public name (unique)
    #[sea_orm(unique)]
    pub name: String,
    /// Short presentation
    pub description: String,
    /// Mission statement
    pub mission: String,
    /// Optional long-term vision
    pub vision: Option<String>,
    /// Contact email, stored lowercased (unique)
    #[sea_orm(unique)]
    pub email: String,
    /// Contact phone number
    pub phone_number: String,
    /// Optional website URL
    pub website: Option<String>,
    /// Optional logo URL
    pub logo: Option<String>,
    /// Address, street line
    pub street: String,
    /// Address, city
    pub city: String,
    /// Address, postal code
    pub postal_code: String,
    /// Address, country
    pub country: String,
    /// Legal form, e.g. "association loi 1901"
    pub legal_status: String,
    /// Official registration number (unique)
    #[sea_orm(unique)]
    pub registration_number: String,
    /// Whether gifts are tax deductible
    pub tax_exempt: bool,
    /// When the association was created
    pub created_at: DateTimeUtc,
    /// When the association was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Association and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One association has many admin memberships
    #[sea_orm(has_many = "super::association_admin::Entity")]
    Admins,
    /// One association runs many campaigns
    #[sea_orm(has_many = "super::campaign::Entity")]
    Campaigns,
}

impl Related<super::association_admin::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Admins.def()
    }
}

impl Related<super::campaign::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Campaigns.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
