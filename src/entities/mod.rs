//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod association;
pub mod association_admin;
pub mod campaign;
pub mod campaign_update;
pub mod document;
pub mod donation;
pub mod user;

// Re-export specific types to avoid conflicts
pub use association::{
    Column as AssociationColumn, Entity as Association, Model as AssociationModel,
};
pub use association_admin::{
    Column as AssociationAdminColumn, Entity as AssociationAdmin, Model as AssociationAdminModel,
};
pub use campaign::{
    CampaignCategory, Column as CampaignColumn, Entity as Campaign, Model as CampaignModel,
};
pub use campaign_update::{
    Column as CampaignUpdateColumn, Entity as CampaignUpdate, Model as CampaignUpdateModel,
};
pub use document::{
    Column as DocumentColumn, DocumentCategory, DocumentStatus, Entity as Document,
    Model as DocumentModel,
};
pub use donation::{
    Column as DonationColumn, Currency, DonationStatus, Entity as Donation,
    Model as DonationModel, PaymentMethod, TaxReceipt,
};
pub use user::{Column as UserColumn, Entity as User, Model as UserModel, Role};
