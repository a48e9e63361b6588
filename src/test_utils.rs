//! Shared test utilities for `GivPlus`.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.

use crate::{
    core::{
        association::{AssociationAddress, NewAssociation, create_association},
        campaign::{CampaignView, NewCampaign, create_campaign},
        document::NewDocument,
        donation::{NewDonation, create_donation},
        payment::{EventReceipt, PaymentEvent, apply_payment_event},
        policy::Principal,
    },
    entities::{
        AssociationModel, CampaignCategory, DocumentCategory, DonationModel, PaymentMethod, Role,
        UserModel, user,
    },
    errors::Result,
};
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use uuid::Uuid;

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Routes `tracing` output to the test harness. Safe to call from every test.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("givplus=debug")
        .with_test_writer()
        .try_init();
}

async fn insert_user(db: &DatabaseConnection, email: &str, role: Role) -> Result<UserModel> {
    let now = chrono::Utc::now();
    user::ActiveModel {
        id: Set(Uuid::new_v4()),
        first_name: Set("Test".to_string()),
        last_name: Set("User".to_string()),
        email: Set(email.to_lowercase()),
        // Not a PHC string: these users cannot log in, which keeps Argon2 out of most tests
        password_hash: Set("!".to_string()),
        role: Set(role),
        phone_number: Set(None),
        street: Set(None),
        city: Set(None),
        postal_code: Set(None),
        country: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Inserts a donor named "Test User" with the given email.
pub async fn create_test_user(db: &DatabaseConnection, email: &str) -> Result<UserModel> {
    insert_user(db, email, Role::Donor).await
}

/// Inserts a platform admin with the given email.
pub async fn create_admin_user(db: &DatabaseConnection, email: &str) -> Result<UserModel> {
    insert_user(db, email, Role::Admin).await
}

/// Principal for a stored user.
pub fn principal_for(user: &UserModel) -> Principal {
    Principal {
        id: user.id,
        email: user.email.clone(),
        role: user.role,
    }
}

/// Donor principal for an arbitrary id.
pub fn principal_for_id(id: Uuid) -> Principal {
    Principal {
        id,
        email: format!("{id}@example.org"),
        role: Role::Donor,
    }
}

/// Donor principal with a fresh id and no stored user.
pub fn donor_principal() -> Principal {
    principal_for_id(Uuid::new_v4())
}

/// Admin principal with a fresh id and no stored user.
pub fn admin_principal() -> Principal {
    Principal {
        role: Role::Admin,
        ..donor_principal()
    }
}

/// Association form whose unique fields are all derived from `name`.
pub fn association_form(name: &str) -> NewAssociation {
    let slug = name.to_lowercase().replace(' ', "-");
    NewAssociation {
        name: name.to_string(),
        description: format!("{name} helps people"),
        mission: "Help".to_string(),
        vision: None,
        email: format!("{slug}@example.org"),
        phone_number: "+33 1 23 45 67 89".to_string(),
        website: None,
        logo: None,
        address: AssociationAddress {
            street: "1 rue de la Paix".to_string(),
            city: "Paris".to_string(),
            postal_code: "75002".to_string(),
            country: "France".to_string(),
        },
        legal_status: "association loi 1901".to_string(),
        registration_number: format!("W{slug}"),
        tax_exempt: false,
    }
}

/// Sets up an association owned by a fresh donor principal.
/// Returns (owner, association) for campaign, document and dashboard tests.
pub async fn setup_with_association(db: &DatabaseConnection) -> Result<(Principal, AssociationModel)> {
    let owner = donor_principal();
    let details = create_association(db, &owner, association_form("Test Association")).await?;
    Ok((owner, details.association))
}

/// Campaign form with a one-month end date.
///
/// # Defaults
/// * `category`: social
/// * `start_date`: now
pub fn campaign_form(association_id: Uuid, goal: f64) -> NewCampaign {
    NewCampaign {
        title: "Test Campaign".to_string(),
        description: "Raising funds for testing".to_string(),
        association_id,
        goal,
        start_date: None,
        end_date: Some(chrono::Utc::now() + chrono::Duration::days(30)),
        category: CampaignCategory::Social,
        image: None,
    }
}

/// Creates a campaign with [`campaign_form`] defaults.
pub async fn create_test_campaign(
    db: &DatabaseConnection,
    actor: &Principal,
    association_id: Uuid,
    goal: f64,
) -> Result<CampaignView> {
    create_campaign(db, actor, campaign_form(association_id, goal)).await
}

/// Card donation form, not anonymous.
pub fn donation_form(campaign_id: Uuid, amount: f64) -> NewDonation {
    NewDonation {
        campaign_id,
        amount,
        currency: None,
        payment_method: PaymentMethod::Card,
        is_anonymous: false,
        message: None,
    }
}

/// Sets up an association, a campaign and one pending donation from a fresh donor.
/// Returns (`campaign_id`, donation).
pub async fn setup_with_pending_donation(
    db: &DatabaseConnection,
    amount: f64,
) -> Result<(Uuid, DonationModel)> {
    let (owner, association) = setup_with_association(db).await?;
    let campaign = create_test_campaign(db, &owner, association.id, 1000.0).await?;
    let donation = create_donation(db, &donor_principal(), donation_form(campaign.campaign.id, amount)).await?;
    Ok((campaign.campaign.id, donation))
}

/// Confirms a pending donation as the payment provider would.
pub async fn settle(db: &DatabaseConnection, donation_id: Uuid) -> Result<EventReceipt> {
    apply_payment_event(db, PaymentEvent::succeeded(donation_id)).await
}

/// PDF document form for an association.
pub fn document_form(association_id: Uuid, is_public: bool) -> NewDocument {
    NewDocument {
        title: "Annual report".to_string(),
        description: None,
        file_url: "https://files.example.org/report.pdf".to_string(),
        file_type: "application/pdf".to_string(),
        file_size: 1024,
        association_id,
        category: DocumentCategory::Report,
        is_public,
    }
}
