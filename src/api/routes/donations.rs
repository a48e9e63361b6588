//! Donations, donor statistics, tax receipts and refunds.

use crate::{
    api::{
        AppState,
        extract::{ApiJson, ApiQuery, AuthenticatedUser},
        response::{ApiResult, created, listed, ok, ok_with_message},
    },
    core::{
        donation::{self, DonationFilter, DonorStats, NewDonation},
        parse_id, payment, receipt,
    },
    entities::{DonationModel, TaxReceipt},
};
use axum::{
    Router,
    extract::{Path, State},
    routing::{get, post},
};
use std::time::Duration;

async fn create(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    ApiJson(input): ApiJson<NewDonation>,
) -> ApiResult<DonationModel> {
    let model = donation::create_donation(&state.db, &actor, input).await?;
    if let Some(delay) = state.config.payments.simulate_confirmation_after_ms {
        payment::simulate_confirmation(state.db.clone(), model.id, Duration::from_millis(delay));
    }
    created(model, "Donation recorded, awaiting payment confirmation")
}

async fn list(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    ApiQuery(filter): ApiQuery<DonationFilter>,
) -> ApiResult<Vec<DonationModel>> {
    listed(donation::list_donations(&state.db, &actor, &filter).await?)
}

async fn stats(State(state): State<AppState>, AuthenticatedUser(actor): AuthenticatedUser) -> ApiResult<DonorStats> {
    ok(donation::donor_stats(&state.db, actor.id).await?)
}

async fn show(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Path(id): Path<String>,
) -> ApiResult<DonationModel> {
    ok(donation::get_donation(&state.db, &actor, parse_id(&id)?).await?)
}

async fn tax_receipt(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Path(id): Path<String>,
) -> ApiResult<TaxReceipt> {
    let receipt = receipt::issue_receipt(&state.db, &actor, parse_id(&id)?).await?;
    created(receipt, "Tax receipt issued")
}

async fn refund(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Path(id): Path<String>,
) -> ApiResult<DonationModel> {
    let model = donation::refund_donation(&state.db, &actor, parse_id(&id)?).await?;
    ok_with_message(model, "Donation refunded")
}

/// `/api/donations` routes
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/stats", get(stats))
        .route("/{id}", get(show))
        .route("/{id}/tax-receipt", post(tax_receipt))
        .route("/{id}/refund", post(refund))
}
