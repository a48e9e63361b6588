//! Payment settlement - Drives pending donations to `completed` or `failed`.
//!
//! Settlement is triggered by a [`PaymentEvent`], whether it arrives through the
//! webhook, the development simulator or a test. Each transition is a
//! conditional update (`... WHERE status = 'pending'`) executed in the same
//! transaction as the campaign increment, so a donation is applied at most once
//! no matter how many confirmations arrive.

use crate::{
    core::{campaign, donation::find_donation},
    entities::{Donation, DonationColumn, DonationModel, DonationStatus},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{DatabaseConnection, TransactionTrait, prelude::*, sea_query::Expr};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info, instrument, warn};

/// Reason recorded on donations failed by the sweeper
pub const TIMEOUT_REASON: &str = "payment confirmation timed out";

/// Result reported by the payment provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentOutcome {
    /// Funds captured
    Succeeded,
    /// Payment declined or abandoned
    Failed,
}

/// Inbound payment notification
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentEvent {
    /// Donation the payment belongs to
    pub donation_id: Uuid,
    /// What happened
    pub outcome: PaymentOutcome,
    /// Provider reference; generated when absent
    #[serde(default)]
    pub transaction_id: Option<String>,
    /// Failure detail
    #[serde(default)]
    pub reason: Option<String>,
}

impl PaymentEvent {
    /// A success event with a fresh transaction id.
    #[must_use]
    pub fn succeeded(donation_id: Uuid) -> Self {
        Self {
            donation_id,
            outcome: PaymentOutcome::Succeeded,
            transaction_id: None,
            reason: None,
        }
    }

    /// A failure event with the given reason.
    #[must_use]
    pub fn failed(donation_id: Uuid, reason: impl Into<String>) -> Self {
        Self {
            donation_id,
            outcome: PaymentOutcome::Failed,
            transaction_id: None,
            reason: Some(reason.into()),
        }
    }
}

/// What applying an event did
#[derive(Debug, Clone, Serialize)]
pub struct EventReceipt {
    /// Donation after the event
    pub donation: DonationModel,
    /// `false` when the event repeated a transition already applied
    pub changed: bool,
}

/// New transaction reference, `TXN-<uuid>`.
#[must_use]
pub fn new_transaction_id() -> String {
    format!("TXN-{}", Uuid::new_v4().simple())
}

fn refuse(donation: &DonationModel, target: DonationStatus) -> Error {
    Error::InvalidState {
        message: format!(
            "cannot move a {} donation to {}",
            donation.status.as_str(),
            target.as_str()
        ),
    }
}

/// Applies a payment event to its donation.
///
/// A repeated event for a transition that already happened is acknowledged
/// with `changed: false`. Any other event for a non-pending donation fails with
/// [`Error::InvalidState`].
#[instrument(skip(db, event), fields(donation = %event.donation_id, outcome = ?event.outcome))]
pub async fn apply_payment_event(db: &DatabaseConnection, event: PaymentEvent) -> Result<EventReceipt> {
    let target = match event.outcome {
        PaymentOutcome::Succeeded => DonationStatus::Completed,
        PaymentOutcome::Failed => DonationStatus::Failed,
    };

    let txn = db.begin().await?;
    let donation = find_donation(&txn, event.donation_id).await?;

    if donation.status == target {
        info!("Duplicate {:?} event for donation {}", event.outcome, donation.id);
        return Ok(EventReceipt {
            donation,
            changed: false,
        });
    }
    if !donation.status.can_transition_to(target) {
        warn!(
            "Rejected {:?} event for {} donation {}",
            event.outcome,
            donation.status.as_str(),
            donation.id
        );
        return Err(refuse(&donation, target));
    }

    let mut update = Donation::update_many()
        .col_expr(DonationColumn::Status, Expr::value(target))
        .col_expr(DonationColumn::UpdatedAt, Expr::value(Utc::now()));
    update = match event.outcome {
        PaymentOutcome::Succeeded => update.col_expr(
            DonationColumn::TransactionId,
            Expr::value(event.transaction_id.unwrap_or_else(new_transaction_id)),
        ),
        PaymentOutcome::Failed => update.col_expr(
            DonationColumn::FailureReason,
            Expr::value(event.reason.unwrap_or_else(|| "payment failed".to_string())),
        ),
    };

    let result = update
        .filter(DonationColumn::Id.eq(donation.id))
        .filter(DonationColumn::Status.eq(DonationStatus::Pending))
        .exec(&txn)
        .await?;

    if result.rows_affected == 0 {
        // Another event won the race; report what it left behind.
        let current = find_donation(&txn, donation.id).await?;
        if current.status == target {
            return Ok(EventReceipt {
                donation: current,
                changed: false,
            });
        }
        return Err(refuse(&current, target));
    }

    if target == DonationStatus::Completed {
        campaign::apply_settlement(&txn, donation.campaign_id, donation.amount).await?;
    }

    let donation = find_donation(&txn, donation.id).await?;
    txn.commit().await?;

    match donation.status {
        DonationStatus::Completed => info!(
            "Donation {} settled: {} added to campaign {}",
            donation.id, donation.amount, donation.campaign_id
        ),
        _ => info!(
            "Donation {} failed: {}",
            donation.id,
            donation.failure_reason.as_deref().unwrap_or_default()
        ),
    }

    Ok(EventReceipt {
        donation,
        changed: true,
    })
}

/// Fails every donation still pending after `timeout`. Returns how many were failed.
pub async fn expire_stale_pending(db: &DatabaseConnection, timeout: Duration) -> Result<u64> {
    let timeout = chrono::Duration::from_std(timeout).map_err(|e| Error::Config {
        message: format!("payment timeout out of range: {e}"),
    })?;
    let now = Utc::now();

    let result = Donation::update_many()
        .col_expr(DonationColumn::Status, Expr::value(DonationStatus::Failed))
        .col_expr(DonationColumn::FailureReason, Expr::value(TIMEOUT_REASON))
        .col_expr(DonationColumn::UpdatedAt, Expr::value(now))
        .filter(DonationColumn::Status.eq(DonationStatus::Pending))
        .filter(DonationColumn::CreatedAt.lt(now - timeout))
        .exec(db)
        .await?;

    if result.rows_affected > 0 {
        info!("Timed out {} pending donations", result.rows_affected);
    }
    Ok(result.rows_affected)
}

/// Runs [`expire_stale_pending`] every `every` until the task is dropped.
pub async fn run_timeout_sweeper(db: DatabaseConnection, timeout: Duration, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    info!(
        "Payment timeout sweeper started (timeout {:?}, every {:?})",
        timeout, every
    );
    loop {
        ticker.tick().await;
        if let Err(e) = expire_stale_pending(&db, timeout).await {
            error!("Payment timeout sweep failed: {}", e);
        }
    }
}

/// Development only: confirms `donation_id` after `delay` through [`apply_payment_event`].
pub fn simulate_confirmation(db: DatabaseConnection, donation_id: Uuid, delay: Duration) {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        if let Err(e) = apply_payment_event(&db, PaymentEvent::succeeded(donation_id)).await {
            warn!("Simulated confirmation of {} failed: {}", donation_id, e);
        }
    });
}
