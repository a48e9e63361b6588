//! Database configuration module for `GivPlus`.
//!
//! This module handles the database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with
//! `Schema::create_table_from_entity`, so the schema always matches the Rust
//! structs. The backend (`SQLite` or `PostgreSQL`) is chosen by the URL scheme;
//! nothing above this module knows which one is in use.

use crate::entities::{
    Association, AssociationAdmin, Campaign, CampaignUpdate, Document, Donation, User,
};
use crate::errors::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Schema};
use std::path::Path;
use tracing::{debug, info, instrument};

/// Default location of the local `SQLite` database.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://data/givplus.sqlite?mode=rwc";

/// Directory that must exist before `SQLite` can create the file at `database_url`.
fn sqlite_parent_dir(database_url: &str) -> Option<&Path> {
    let path = database_url.strip_prefix("sqlite://")?;
    let path = path.split('?').next().unwrap_or_default();
    if path.is_empty() || path.contains(":memory:") {
        return None;
    }
    Path::new(path).parent().filter(|p| !p.as_os_str().is_empty())
}

/// Establishes a connection to the database at `database_url`.
#[instrument]
pub async fn create_connection(database_url: &str) -> Result<DatabaseConnection> {
    if let Some(dir) = sqlite_parent_dir(database_url) {
        std::fs::create_dir_all(dir)?;
        debug!("Ensured database directory {:?} exists", dir);
    }

    let mut options = ConnectOptions::new(database_url.to_string());
    options.sqlx_logging(false);

    let db = Database::connect(options).await?;
    info!("Connected to {:?} database", db.get_database_backend());
    Ok(db)
}

/// Creates all tables that do not exist yet.
///
/// Tables are created parents first so that foreign keys resolve on backends
/// that check them at creation time.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let mut statements = vec![
        schema.create_table_from_entity(User),
        schema.create_table_from_entity(Association),
        schema.create_table_from_entity(AssociationAdmin),
        schema.create_table_from_entity(Campaign),
        schema.create_table_from_entity(CampaignUpdate),
        schema.create_table_from_entity(Document),
        schema.create_table_from_entity(Donation),
    ];

    for statement in &mut statements {
        statement.if_not_exists();
        db.execute(builder.build(&*statement)).await?;
    }
    debug!("Ensured {} tables", statements.len());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{
        association::Model as AssociationModel, campaign::Model as CampaignModel,
        document::Model as DocumentModel, donation::Model as DonationModel,
        user::Model as UserModel,
    };
    use sea_orm::{EntityTrait, QuerySelect};

    #[tokio::test]
    async fn test_create_tables() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;

        // Test that tables exist by querying them
        let _: Vec<UserModel> = User::find().limit(1).all(&db).await?;
        let _: Vec<AssociationModel> = Association::find().limit(1).all(&db).await?;
        let _: Vec<CampaignModel> = Campaign::find().limit(1).all(&db).await?;
        let _: Vec<DocumentModel> = Document::find().limit(1).all(&db).await?;
        let _: Vec<DonationModel> = Donation::find().limit(1).all(&db).await?;

        Ok(())
    }

    #[tokio::test]
    async fn test_create_tables_is_repeatable() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;
        create_tables(&db).await?;
        Ok(())
    }

    #[test]
    fn test_sqlite_parent_dir() {
        assert_eq!(
            sqlite_parent_dir(DEFAULT_DATABASE_URL),
            Some(Path::new("data"))
        );
        assert_eq!(sqlite_parent_dir("sqlite://givplus.sqlite?mode=rwc"), None);
        assert_eq!(sqlite_parent_dir("sqlite::memory:"), None);
        assert_eq!(sqlite_parent_dir("postgres://localhost/givplus"), None);
    }
}
