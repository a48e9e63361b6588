//! Campaign listing and management.

use crate::{
    api::{
        AppState,
        extract::{ApiJson, ApiQuery, AuthenticatedUser},
        response::{ApiResult, created, done, listed, ok, ok_with_message},
    },
    core::{
        campaign::{self, CampaignChanges, CampaignFilter, CampaignSort, CampaignView, NewCampaign, NewCampaignUpdate},
        parse_id,
    },
    entities::CampaignCategory,
    errors::{Error, Result},
};
use axum::{
    Router,
    extract::{Path, State},
    routing::{get, post},
};
use serde::Deserialize;
use uuid::Uuid;

/// Query string of `GET /api/campaigns`
#[derive(Debug, Default, Deserialize)]
pub struct CampaignQuery {
    /// Exact category
    pub category: Option<CampaignCategory>,
    /// Exact association
    pub association_id: Option<Uuid>,
    /// `true` for open campaigns, `false` for closed ones
    pub active: Option<bool>,
    /// Case-insensitive search
    pub search: Option<String>,
    /// Sort key name
    pub sort: Option<String>,
    /// `asc` or `desc`
    pub order: Option<String>,
}

impl TryFrom<CampaignQuery> for CampaignFilter {
    type Error = Error;

    fn try_from(query: CampaignQuery) -> Result<Self> {
        let sort = query
            .sort
            .as_deref()
            .map_or(Ok(CampaignSort::default()), CampaignSort::parse)?;
        let ascending = match query.order.as_deref() {
            None | Some("desc") => false,
            Some("asc") => true,
            Some(other) => return Err(Error::validation(format!("unknown sort order: {other}"))),
        };

        Ok(Self {
            category: query.category,
            association_id: query.association_id,
            active: query.active,
            search: query.search,
            sort,
            ascending,
        })
    }
}

async fn list(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<CampaignQuery>,
) -> ApiResult<Vec<CampaignView>> {
    let filter = CampaignFilter::try_from(query)?;
    listed(campaign::list_campaigns(&state.db, &filter).await?)
}

async fn show(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<CampaignView> {
    ok(campaign::get_campaign(&state.db, parse_id(&id)?).await?)
}

async fn create(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    ApiJson(input): ApiJson<NewCampaign>,
) -> ApiResult<CampaignView> {
    created(campaign::create_campaign(&state.db, &actor, input).await?, "Campaign created")
}

async fn update(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Path(id): Path<String>,
    ApiJson(changes): ApiJson<CampaignChanges>,
) -> ApiResult<CampaignView> {
    let view = campaign::update_campaign(&state.db, &actor, parse_id(&id)?, changes).await?;
    ok_with_message(view, "Campaign updated")
}

async fn remove(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Path(id): Path<String>,
) -> ApiResult<()> {
    campaign::delete_campaign(&state.db, &actor, parse_id(&id)?).await?;
    done("Campaign deleted")
}

async fn post_update(
    State(state): State<AppState>,
    AuthenticatedUser(actor): AuthenticatedUser,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<NewCampaignUpdate>,
) -> ApiResult<CampaignView> {
    let view = campaign::add_campaign_update(&state.db, &actor, parse_id(&id)?, input).await?;
    created(view, "Update posted")
}

/// `/api/campaigns` routes
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(show).put(update).delete(remove))
        .route("/{id}/updates", post(post_update))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_query_defaults_to_newest_first() {
        let filter = CampaignFilter::try_from(CampaignQuery::default()).unwrap();
        assert_eq!(filter.sort, CampaignSort::CreatedAt);
        assert!(!filter.ascending);
    }

    #[test]
    fn test_query_sort_and_order() {
        let query = CampaignQuery {
            sort: Some("goal".to_string()),
            order: Some("asc".to_string()),
            ..Default::default()
        };
        let filter = CampaignFilter::try_from(query).unwrap();
        assert_eq!(filter.sort, CampaignSort::Goal);
        assert!(filter.ascending);
    }

    #[test]
    fn test_query_rejects_unknown_order() {
        let query = CampaignQuery {
            order: Some("sideways".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            CampaignFilter::try_from(query),
            Err(Error::Validation { .. })
        ));
    }
}
