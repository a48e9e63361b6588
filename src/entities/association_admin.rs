//! Association admin entity - Membership of a user in an association's admin list.
//!
//! This list is the ownership anchor for everything scoped to the association.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Admin membership row, keyed by (association, user)
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "association_admins")]
pub struct Model {
    /// Association being administered
    #[sea_orm(primary_key, auto_increment = false)]
    pub association_id: Uuid,
    /// User holding the admin seat
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: Uuid,
    /// When the seat was granted
    pub added_at: DateTimeUtc,
}

/// Each membership belongs to one association
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Owning association
    #[sea_orm(
        belongs_to = "super::association::Entity",
        from = "Column::AssociationId",
        to = "super::association::Column::Id",
        on_delete = "Cascade"
    )]
    Association,
}

impl Related<super::association::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Association.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
