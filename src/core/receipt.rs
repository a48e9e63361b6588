//! Tax receipt issuance.
//!
//! A receipt can be issued once, for a completed donation, by its donor or a
//! platform admin. Checks run in a fixed order: the donation must exist, the
//! actor must be allowed, the donation must be completed, and no receipt may
//! exist yet.

use crate::{
    core::{
        donation::find_donation,
        policy::{self, Action, Principal, Target},
    },
    entities::{Donation, DonationColumn, DonationModel, DonationStatus, TaxReceipt},
    errors::{Error, Result},
};
use chrono::{Datelike, Utc};
use sea_orm::{prelude::*, sea_query::Expr};
use tracing::{info, instrument};

/// New receipt number, `RCPT-<year>-<uuid>`.
#[must_use]
pub fn new_receipt_number(year: i32) -> String {
    format!("RCPT-{year}-{}", Uuid::new_v4().simple())
}

/// Location of the generated receipt document.
#[must_use]
pub fn receipt_document_path(number: &str) -> String {
    format!("/receipts/{number}.pdf")
}

fn incomplete() -> Error {
    Error::InvalidState {
        message: "cannot issue receipt for incomplete donation".to_string(),
    }
}

fn already_issued(donation: &DonationModel) -> Error {
    Error::AlreadyIssued {
        donation_id: donation.id.to_string(),
    }
}

/// Issues the tax receipt of a completed donation.
///
/// The write is conditional on `receipt_issued = false`, so two concurrent
/// calls cannot both succeed; the loser gets [`Error::AlreadyIssued`].
#[instrument(skip(db, actor), fields(actor = %actor.id))]
pub async fn issue_receipt(
    db: &DatabaseConnection,
    actor: &Principal,
    donation_id: Uuid,
) -> Result<TaxReceipt> {
    let donation = find_donation(db, donation_id).await?;
    policy::require(
        actor,
        Action::IssueReceipt,
        Target::Donation {
            donor_id: donation.donor_id,
        },
    )?;
    if donation.status != DonationStatus::Completed {
        return Err(incomplete());
    }
    if donation.receipt_issued {
        return Err(already_issued(&donation));
    }

    let now = Utc::now();
    let number = new_receipt_number(now.year());
    let document = receipt_document_path(&number);

    let result = Donation::update_many()
        .col_expr(DonationColumn::ReceiptIssued, Expr::value(true))
        .col_expr(DonationColumn::ReceiptDate, Expr::value(now))
        .col_expr(DonationColumn::ReceiptNumber, Expr::value(number.as_str()))
        .col_expr(DonationColumn::ReceiptDocument, Expr::value(document.as_str()))
        .col_expr(DonationColumn::UpdatedAt, Expr::value(now))
        .filter(DonationColumn::Id.eq(donation_id))
        .filter(DonationColumn::Status.eq(DonationStatus::Completed))
        .filter(DonationColumn::ReceiptIssued.eq(false))
        .exec(db)
        .await?;

    let donation = find_donation(db, donation_id).await?;
    if result.rows_affected == 0 {
        return Err(if donation.receipt_issued {
            already_issued(&donation)
        } else {
            incomplete()
        });
    }

    info!("Issued receipt {} for donation {}", number, donation_id);
    Ok(donation.tax_receipt())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::payment::{PaymentEvent, apply_payment_event};
    use crate::test_utils::*;

    #[test]
    fn test_receipt_numbers_are_unique() {
        let a = new_receipt_number(2026);
        let b = new_receipt_number(2026);
        assert!(a.starts_with("RCPT-2026-"));
        assert_ne!(a, b);
        assert_eq!(receipt_document_path("RCPT-1"), "/receipts/RCPT-1.pdf");
    }

    #[tokio::test]
    async fn test_receipt_requires_completed_donation() -> Result<()> {
        let db = setup_test_db().await?;
        let (_, donation) = setup_with_pending_donation(&db, 30.0).await?;
        let donor = principal_for_id(donation.donor_id);

        assert!(matches!(
            issue_receipt(&db, &donor, donation.id).await,
            Err(Error::InvalidState { .. })
        ));

        apply_payment_event(&db, PaymentEvent::failed(donation.id, "declined")).await?;
        assert!(matches!(
            issue_receipt(&db, &donor, donation.id).await,
            Err(Error::InvalidState { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_receipt_is_issued_once() -> Result<()> {
        init_test_tracing();
        let db = setup_test_db().await?;
        let (_, donation) = setup_with_pending_donation(&db, 30.0).await?;
        let donor = principal_for_id(donation.donor_id);
        settle(&db, donation.id).await?;

        let receipt = issue_receipt(&db, &donor, donation.id).await?;
        assert!(receipt.issued);
        assert!(receipt.date.is_some());
        let number = receipt.number.clone().unwrap();
        assert_eq!(receipt.document, Some(receipt_document_path(&number)));

        assert!(matches!(
            issue_receipt(&db, &donor, donation.id).await,
            Err(Error::AlreadyIssued { .. })
        ));
        // The stored receipt is unchanged by the failed retry
        let stored = find_donation(&db, donation.id).await?;
        assert_eq!(stored.receipt_number, Some(number));
        Ok(())
    }

    #[tokio::test]
    async fn test_receipt_error_order() -> Result<()> {
        let db = setup_test_db().await?;
        let (_, donation) = setup_with_pending_donation(&db, 30.0).await?;
        let stranger = donor_principal();

        assert!(matches!(
            issue_receipt(&db, &stranger, Uuid::new_v4()).await,
            Err(Error::NotFound { .. })
        ));
        // Forbidden wins over the pending state
        assert!(matches!(
            issue_receipt(&db, &stranger, donation.id).await,
            Err(Error::Forbidden { .. })
        ));

        settle(&db, donation.id).await?;
        let receipt = issue_receipt(&db, &admin_principal(), donation.id).await?;
        assert!(receipt.issued);
        Ok(())
    }
}
