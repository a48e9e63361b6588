//! Donation entity - A gift from a donor to a campaign.
//!
//! The `association_id` is copied from the campaign when the donation is
//! created and never re-synced. The tax receipt is stored as flat `receipt_*`
//! columns and exposed as a [`TaxReceipt`] view.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle state of a donation
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum DonationStatus {
    /// Created, waiting for payment confirmation
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Payment confirmed and applied to the campaign
    #[sea_orm(string_value = "completed")]
    Completed,
    /// Payment rejected or timed out
    #[sea_orm(string_value = "failed")]
    Failed,
    /// Completed donation paid back to the donor
    #[sea_orm(string_value = "refunded")]
    Refunded,
}

impl DonationStatus {
    /// Whether `self -> next` is an edge of the lifecycle.
    ///
    /// The only edges are `pending -> completed`, `pending -> failed` and
    /// `completed -> refunded`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Completed | Self::Failed) | (Self::Completed, Self::Refunded)
        )
    }

    /// Wire representation of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Refunded => "refunded",
        }
    }
}

/// Accepted donation currencies
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, Default)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(3))")]
pub enum Currency {
    /// Euro
    #[default]
    #[sea_orm(string_value = "EUR")]
    EUR,
    /// US dollar
    #[sea_orm(string_value = "USD")]
    USD,
    /// Pound sterling
    #[sea_orm(string_value = "GBP")]
    GBP,
    /// Canadian dollar
    #[sea_orm(string_value = "CAD")]
    CAD,
}

/// How the donor pays
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Card payment through the external provider
    #[sea_orm(string_value = "card")]
    Card,
    /// `PayPal`
    #[sea_orm(string_value = "paypal")]
    Paypal,
    /// Bank wire
    #[sea_orm(string_value = "bank_transfer")]
    BankTransfer,
    /// Anything else
    #[sea_orm(string_value = "other")]
    Other,
}

/// Donation database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "donations")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// User who gives
    #[sea_orm(indexed)]
    pub donor_id: Uuid,
    /// Campaign receiving the gift
    #[sea_orm(indexed)]
    pub campaign_id: Uuid,
    /// Association of the campaign at creation time
    #[sea_orm(indexed)]
    pub association_id: Uuid,
    /// Gift amount, at least 1
    pub amount: f64,
    /// Gift currency
    pub currency: Currency,
    /// Payment method chosen by the donor
    pub payment_method: PaymentMethod,
    /// Lifecycle state
    pub status: DonationStatus,
    /// Payment provider reference, set on settlement
    pub transaction_id: Option<String>,
    /// Hide the donor from association-facing views
    pub is_anonymous: bool,
    /// Optional note from the donor
    pub message: Option<String>,
    /// Why the payment failed, set on the `failed` transition
    pub failure_reason: Option<String>,
    /// Whether a tax receipt has been issued
    pub receipt_issued: bool,
    /// When the receipt was issued
    pub receipt_date: Option<DateTimeUtc>,
    /// Receipt number, unique per issuance
    #[sea_orm(unique)]
    pub receipt_number: Option<String>,
    /// Location of the generated receipt document
    pub receipt_document: Option<String>,
    /// When the donation was created
    pub created_at: DateTimeUtc,
    /// When the donation last changed state
    pub updated_at: DateTimeUtc,
}

/// Tax receipt attached to a donation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxReceipt {
    /// Whether the receipt exists
    pub issued: bool,
    /// Issuance date
    pub date: Option<DateTimeUtc>,
    /// Receipt number
    pub number: Option<String>,
    /// Generated document reference
    pub document: Option<String>,
}

impl Model {
    /// Receipt sub-record of this donation.
    #[must_use]
    pub fn tax_receipt(&self) -> TaxReceipt {
        TaxReceipt {
            issued: self.receipt_issued,
            date: self.receipt_date,
            number: self.receipt_number.clone(),
            document: self.receipt_document.clone(),
        }
    }
}

/// Donations keep no foreign keys so they survive campaign deletion
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
