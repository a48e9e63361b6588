//! Association dashboard generation.
//!
//! This module gathers everything an association admin sees on their
//! dashboard: campaign progress, the latest completed donations, documents
//! waiting for review and the headline statistics. All figures count completed
//! donations only.

use crate::{
    core::{
        association,
        campaign::percent_complete,
        policy::{Action, Principal},
    },
    entities::{
        Campaign, CampaignColumn, Currency, Document, DocumentColumn, DocumentModel,
        DocumentStatus, Donation, DonationColumn, DonationStatus, User, UserColumn,
    },
    errors::Result,
};
use chrono::{DateTime, Utc};
use sea_orm::{QueryOrder, QuerySelect, prelude::*};
use serde::Serialize;
use std::collections::HashMap;

/// How many recent donations and pending documents the dashboard shows
pub const DASHBOARD_LIMIT: u64 = 5;

/// Association header of the dashboard
#[derive(Debug, Clone, Serialize)]
pub struct DashboardAssociation {
    /// Association id
    pub id: Uuid,
    /// Public name
    pub name: String,
    /// Logo URL
    pub logo: Option<String>,
}

/// Headline figures
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardStats {
    /// Sum of completed donations
    pub total_donations: f64,
    /// Distinct donors with a completed donation
    pub total_donors: u64,
    /// Campaigns currently open
    pub active_campaigns: u64,
    /// All campaigns
    pub campaigns: u64,
}

/// Campaign line of the dashboard
#[derive(Debug, Clone, Serialize)]
pub struct DashboardCampaign {
    /// Campaign id
    pub id: Uuid,
    /// Headline
    pub title: String,
    /// Target
    pub goal: f64,
    /// Amount raised
    pub current_amount: f64,
    /// Whole percent of the goal reached
    pub percent_complete: u32,
    /// Opening date
    pub start_date: DateTime<Utc>,
    /// Closing date
    pub end_date: Option<DateTime<Utc>>,
    /// Whether the campaign is open
    pub is_active: bool,
}

/// Recent completed donation; donor fields are empty for anonymous gifts
#[derive(Debug, Clone, Serialize)]
pub struct RecentDonation {
    /// Donation id
    pub id: Uuid,
    /// Amount
    pub amount: f64,
    /// Currency
    pub currency: Currency,
    /// Campaign that received the gift
    pub campaign_id: Uuid,
    /// Title of that campaign, if it still exists
    pub campaign_title: Option<String>,
    /// Donor id, hidden for anonymous gifts
    pub donor_id: Option<Uuid>,
    /// Donor display name, hidden for anonymous gifts
    pub donor_name: Option<String>,
    /// Whether the donor asked to stay anonymous
    pub is_anonymous: bool,
    /// When the donation was made
    pub created_at: DateTime<Utc>,
}

/// Full dashboard of one association
#[derive(Debug, Clone, Serialize)]
pub struct AssociationDashboard {
    /// Association header
    pub association: DashboardAssociation,
    /// Headline figures
    pub stats: DashboardStats,
    /// Every campaign of the association
    pub campaigns: Vec<DashboardCampaign>,
    /// Latest completed donations
    pub recent_donations: Vec<RecentDonation>,
    /// Documents awaiting review
    pub pending_documents: Vec<DocumentModel>,
}

/// Builds the dashboard of an association the actor administers.
pub async fn association_dashboard(
    db: &DatabaseConnection,
    actor: &Principal,
    association_id: Uuid,
) -> Result<AssociationDashboard> {
    let association =
        association::authorize(db, actor, association_id, Action::ManageAssociation).await?;

    let campaigns = Campaign::find()
        .filter(CampaignColumn::AssociationId.eq(association_id))
        .order_by_desc(CampaignColumn::CreatedAt)
        .all(db)
        .await?;

    let completed = Donation::find()
        .filter(DonationColumn::AssociationId.eq(association_id))
        .filter(DonationColumn::Status.eq(DonationStatus::Completed));

    let total_donations: Option<f64> = completed
        .clone()
        .select_only()
        .column_as(DonationColumn::Amount.sum(), "total")
        .into_tuple::<Option<f64>>()
        .one(db)
        .await?
        .flatten();

    let donors: Vec<Uuid> = completed
        .clone()
        .select_only()
        .column(DonationColumn::DonorId)
        .distinct()
        .into_tuple()
        .all(db)
        .await?;

    let recent = completed
        .order_by_desc(DonationColumn::CreatedAt)
        .limit(DASHBOARD_LIMIT)
        .all(db)
        .await?;

    let named_donors: Vec<Uuid> = recent
        .iter()
        .filter(|d| !d.is_anonymous)
        .map(|d| d.donor_id)
        .collect();
    let names: HashMap<Uuid, String> = if named_donors.is_empty() {
        HashMap::new()
    } else {
        User::find()
            .filter(UserColumn::Id.is_in(named_donors))
            .all(db)
            .await?
            .into_iter()
            .map(|u| (u.id, format!("{} {}", u.first_name, u.last_name)))
            .collect()
    };
    let titles: HashMap<Uuid, &str> = campaigns.iter().map(|c| (c.id, c.title.as_str())).collect();

    let recent_donations = recent
        .iter()
        .map(|d| RecentDonation {
            id: d.id,
            amount: d.amount,
            currency: d.currency,
            campaign_id: d.campaign_id,
            campaign_title: titles.get(&d.campaign_id).map(ToString::to_string),
            donor_id: (!d.is_anonymous).then_some(d.donor_id),
            donor_name: if d.is_anonymous {
                None
            } else {
                names.get(&d.donor_id).cloned()
            },
            is_anonymous: d.is_anonymous,
            created_at: d.created_at,
        })
        .collect();

    let pending_documents = Document::find()
        .filter(DocumentColumn::AssociationId.eq(association_id))
        .filter(DocumentColumn::Status.eq(DocumentStatus::Pending))
        .order_by_desc(DocumentColumn::CreatedAt)
        .limit(DASHBOARD_LIMIT)
        .all(db)
        .await?;

    let stats = DashboardStats {
        total_donations: total_donations.unwrap_or(0.0),
        total_donors: donors.len() as u64,
        active_campaigns: campaigns.iter().filter(|c| c.is_active).count() as u64,
        campaigns: campaigns.len() as u64,
    };

    let campaigns = campaigns
        .into_iter()
        .map(|c| DashboardCampaign {
            percent_complete: percent_complete(c.goal, c.current_amount),
            id: c.id,
            title: c.title,
            goal: c.goal,
            current_amount: c.current_amount,
            start_date: c.start_date,
            end_date: c.end_date,
            is_active: c.is_active,
        })
        .collect();

    Ok(AssociationDashboard {
        association: DashboardAssociation {
            id: association.id,
            name: association.name,
            logo: association.logo,
        },
        stats,
        campaigns,
        recent_donations,
        pending_documents,
    })
}
