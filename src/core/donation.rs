//! Donation business logic - Creation, scoped reads, refunds and donor statistics.
//!
//! Donations are created `pending`. Settlement happens later through
//! [`crate::core::payment`]; nothing in this module touches campaign aggregates.

use crate::{
    core::{
        campaign,
        policy::{self, Action, Principal, Target},
    },
    entities::{
        Currency, Donation, DonationColumn, DonationModel, DonationStatus, PaymentMethod, donation,
    },
    errors::{Error, Result},
};
use chrono::{Datelike, Duration, Utc};
use sea_orm::{QueryOrder, Set, prelude::*, sea_query::Expr};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info, instrument};

/// Smallest accepted gift
pub const MIN_DONATION_AMOUNT: f64 = 1.0;

/// Donation form
#[derive(Debug, Clone, Deserialize)]
pub struct NewDonation {
    /// Campaign receiving the gift
    pub campaign_id: Uuid,
    /// Gift amount
    pub amount: f64,
    /// Gift currency, EUR when omitted
    #[serde(default)]
    pub currency: Option<Currency>,
    /// Payment method
    pub payment_method: PaymentMethod,
    /// Hide the donor from association-facing views
    #[serde(default)]
    pub is_anonymous: bool,
    /// Optional note
    #[serde(default)]
    pub message: Option<String>,
}

/// Listing filters; `donor_id` is ignored for non-admins
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DonationFilter {
    /// Exact campaign
    pub campaign_id: Option<Uuid>,
    /// Exact association
    pub association_id: Option<Uuid>,
    /// Exact status
    pub status: Option<DonationStatus>,
    /// Exact donor
    pub donor_id: Option<Uuid>,
}

/// Completed giving of one month
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyTotal {
    /// Calendar year
    pub year: i32,
    /// Calendar month, 1 to 12
    pub month: u32,
    /// Sum of completed amounts
    pub total: f64,
    /// Number of completed donations
    pub count: u64,
}

/// Giving statistics of a donor, counting completed donations only
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DonorStats {
    /// Sum of completed amounts
    pub total_amount: f64,
    /// Number of completed donations
    pub donation_count: u64,
    /// Distinct associations supported
    pub supported_associations: u64,
    /// Monthly totals over the trailing year, oldest first
    pub donations_by_month: Vec<MonthlyTotal>,
}

fn check_amount(amount: f64) -> Result<f64> {
    if !amount.is_finite() || amount < MIN_DONATION_AMOUNT {
        return Err(Error::InvalidAmount { amount });
    }
    Ok(amount)
}

/// Records a pending donation from `actor`.
///
/// The association is copied from the campaign here and never re-derived.
#[instrument(skip(db, actor, input), fields(actor = %actor.id, campaign = %input.campaign_id))]
pub async fn create_donation(
    db: &DatabaseConnection,
    actor: &Principal,
    input: NewDonation,
) -> Result<DonationModel> {
    let amount = check_amount(input.amount)?;
    let campaign = campaign::find_campaign(db, input.campaign_id).await?;

    let now = Utc::now();
    let donation = donation::ActiveModel {
        id: Set(Uuid::new_v4()),
        donor_id: Set(actor.id),
        campaign_id: Set(campaign.id),
        association_id: Set(campaign.association_id),
        amount: Set(amount),
        currency: Set(input.currency.unwrap_or_default()),
        payment_method: Set(input.payment_method),
        status: Set(DonationStatus::Pending),
        transaction_id: Set(None),
        is_anonymous: Set(input.is_anonymous),
        message: Set(input.message.filter(|m| !m.trim().is_empty())),
        failure_reason: Set(None),
        receipt_issued: Set(false),
        receipt_date: Set(None),
        receipt_number: Set(None),
        receipt_document: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;

    info!("Donation {} of {} pending", donation.id, donation.amount);
    Ok(donation)
}

/// Loads a donation row or fails with [`Error::NotFound`].
pub async fn find_donation<C>(db: &C, donation_id: Uuid) -> Result<DonationModel>
where
    C: ConnectionTrait,
{
    Donation::find_by_id(donation_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("donation", donation_id))
}

/// Reads a donation visible to `actor`.
pub async fn get_donation(
    db: &DatabaseConnection,
    actor: &Principal,
    donation_id: Uuid,
) -> Result<DonationModel> {
    let donation = find_donation(db, donation_id).await?;
    policy::require(
        actor,
        Action::ReadDonation,
        Target::Donation {
            donor_id: donation.donor_id,
        },
    )?;
    Ok(donation)
}

/// Lists donations, newest first. Non-admins only ever see their own.
pub async fn list_donations(
    db: &DatabaseConnection,
    actor: &Principal,
    filter: &DonationFilter,
) -> Result<Vec<DonationModel>> {
    let donor_id = if actor.is_admin() {
        filter.donor_id
    } else {
        Some(actor.id)
    };

    let mut query = Donation::find().order_by_desc(DonationColumn::CreatedAt);
    if let Some(donor_id) = donor_id {
        query = query.filter(DonationColumn::DonorId.eq(donor_id));
    }
    if let Some(campaign_id) = filter.campaign_id {
        query = query.filter(DonationColumn::CampaignId.eq(campaign_id));
    }
    if let Some(association_id) = filter.association_id {
        query = query.filter(DonationColumn::AssociationId.eq(association_id));
    }
    if let Some(status) = filter.status {
        query = query.filter(DonationColumn::Status.eq(status));
    }

    let donations = query.all(db).await?;
    debug!("Listed {} donations for {}", donations.len(), actor.id);
    Ok(donations)
}

/// Marks a completed donation refunded. Campaign aggregates are left as they are.
#[instrument(skip(db, actor), fields(actor = %actor.id))]
pub async fn refund_donation(
    db: &DatabaseConnection,
    actor: &Principal,
    donation_id: Uuid,
) -> Result<DonationModel> {
    policy::require(actor, Action::RefundDonation, Target::Platform)?;
    let donation = find_donation(db, donation_id).await?;

    if !donation.status.can_transition_to(DonationStatus::Refunded) {
        return Err(Error::InvalidState {
            message: format!("cannot refund a {} donation", donation.status.as_str()),
        });
    }

    let result = Donation::update_many()
        .col_expr(DonationColumn::Status, Expr::value(DonationStatus::Refunded))
        .col_expr(DonationColumn::UpdatedAt, Expr::value(Utc::now()))
        .filter(DonationColumn::Id.eq(donation_id))
        .filter(DonationColumn::Status.eq(DonationStatus::Completed))
        .exec(db)
        .await?;
    if result.rows_affected == 0 {
        return Err(Error::InvalidState {
            message: "donation changed state concurrently".to_string(),
        });
    }

    info!("Refunded donation {}", donation_id);
    find_donation(db, donation_id).await
}

/// Aggregates the completed donations of `donor_id`.
pub async fn donor_stats(db: &DatabaseConnection, donor_id: Uuid) -> Result<DonorStats> {
    let completed = Donation::find()
        .filter(DonationColumn::DonorId.eq(donor_id))
        .filter(DonationColumn::Status.eq(DonationStatus::Completed))
        .all(db)
        .await?;

    let one_year_ago = Utc::now() - Duration::days(365);
    let mut associations = HashSet::new();
    let mut by_month: BTreeMap<(i32, u32), MonthlyTotal> = BTreeMap::new();
    let mut total_amount = 0.0;

    for donation in &completed {
        total_amount += donation.amount;
        associations.insert(donation.association_id);

        if donation.created_at >= one_year_ago {
            let key = (donation.created_at.year(), donation.created_at.month());
            let entry = by_month.entry(key).or_insert(MonthlyTotal {
                year: key.0,
                month: key.1,
                total: 0.0,
                count: 0,
            });
            entry.total += donation.amount;
            entry.count += 1;
        }
    }

    Ok(DonorStats {
        total_amount,
        donation_count: completed.len() as u64,
        supported_associations: associations.len() as u64,
        donations_by_month: by_month.into_values().collect(),
    })
}
