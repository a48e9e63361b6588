//! User entity - Registered donors and platform administrators.
//!
//! The password hash is stored alongside the profile but never serialized.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Global role of a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Regular user who gives to campaigns
    #[sea_orm(string_value = "donor")]
    Donor,
    /// Platform administrator, permitted every action
    #[sea_orm(string_value = "admin")]
    Admin,
}

impl Role {
    /// Parses the wire representation (`"donor"` / `"admin"`).
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "donor" => Some(Self::Donor),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }

    /// Wire representation of the role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Donor => "donor",
            Self::Admin => "admin",
        }
    }
}

/// User database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Given name
    pub first_name: String,
    /// Family name
    pub last_name: String,
    /// Login email, stored lowercased
    #[sea_orm(unique)]
    pub email: String,
    /// Argon2 PHC string
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Global role
    pub role: Role,
    /// Optional contact number
    pub phone_number: Option<String>,
    /// Postal address, street line
    pub street: Option<String>,
    /// Postal address, city
    pub city: Option<String>,
    /// Postal address, postal code
    pub postal_code: Option<String>,
    /// Postal address, country
    pub country: Option<String>,
    /// When the account was created
    pub created_at: DateTimeUtc,
    /// When the profile was last modified
    pub updated_at: DateTimeUtc,
}

/// Users are referenced by id only; no foreign keys point here
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
