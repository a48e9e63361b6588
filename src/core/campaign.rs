//! Campaign business logic - Handles campaign creation, listing, updates and progress.
//!
//! Campaign mutations are gated on the owning association's admin list. The
//! `current_amount` and `donor_count` aggregates are never written here except
//! through [`apply_settlement`], which performs a single atomic increment.

use crate::{
    core::{
        association, like_pattern,
        policy::{Action, Principal},
        required,
    },
    entities::{
        Campaign, CampaignCategory, CampaignColumn, CampaignModel, CampaignUpdate,
        CampaignUpdateColumn, CampaignUpdateModel, campaign, campaign_update,
    },
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{
    Condition, QueryOrder, Set, TransactionTrait,
    prelude::*,
    sea_query::{Expr, Func},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, instrument, warn};

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Share of the goal reached, in whole percent, capped at 100.
///
/// Rounds down, so 65 320 of 90 000 reports 72 and a campaign only shows 100
/// once the goal is actually met. A zero goal reports 0.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn percent_complete(goal: f64, current_amount: f64) -> u32 {
    if goal <= 0.0 {
        return 0;
    }
    (current_amount / goal * 100.0).clamp(0.0, 100.0).floor() as u32
}

/// Whether the goal has been reached.
#[must_use]
pub fn is_completed(goal: f64, current_amount: f64) -> bool {
    current_amount >= goal
}

/// Whole days until `end_date`, rounded up; negative once the campaign has ended.
#[must_use]
pub fn days_left(end_date: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Option<i64> {
    end_date.map(|end| {
        let millis = (end - now).num_milliseconds();
        let days = millis / MILLIS_PER_DAY;
        if millis % MILLIS_PER_DAY > 0 {
            days + 1
        } else {
            days
        }
    })
}

/// Campaign with its update entries and derived progress figures
#[derive(Debug, Clone, Serialize)]
pub struct CampaignView {
    /// Stored campaign fields
    #[serde(flatten)]
    pub campaign: CampaignModel,
    /// Update entries in ascending date order
    pub updates: Vec<CampaignUpdateModel>,
    /// Whole percent of the goal reached
    pub percent_complete: u32,
    /// Whether the goal has been reached
    pub is_completed: bool,
    /// Days until the end date
    pub days_left: Option<i64>,
}

impl CampaignView {
    fn new(campaign: CampaignModel, updates: Vec<CampaignUpdateModel>) -> Self {
        Self {
            percent_complete: percent_complete(campaign.goal, campaign.current_amount),
            is_completed: is_completed(campaign.goal, campaign.current_amount),
            days_left: days_left(campaign.end_date, Utc::now()),
            campaign,
            updates,
        }
    }
}

/// Creation form
#[derive(Debug, Clone, Deserialize)]
pub struct NewCampaign {
    /// Headline
    pub title: String,
    /// Full description
    pub description: String,
    /// Association running the campaign
    pub association_id: Uuid,
    /// Fundraising target
    pub goal: f64,
    /// Opening date, defaults to now
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    /// Optional closing date
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    /// Cause category
    pub category: CampaignCategory,
    /// Optional cover image
    #[serde(default)]
    pub image: Option<String>,
}

/// Partial update; aggregates and the owning association cannot be changed
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CampaignChanges {
    /// New headline
    pub title: Option<String>,
    /// New description
    pub description: Option<String>,
    /// New target
    pub goal: Option<f64>,
    /// New opening date
    pub start_date: Option<DateTime<Utc>>,
    /// New closing date
    pub end_date: Option<DateTime<Utc>>,
    /// Open or close the campaign
    pub is_active: Option<bool>,
    /// New category
    pub category: Option<CampaignCategory>,
    /// New cover image
    pub image: Option<String>,
}

/// News entry form
#[derive(Debug, Clone, Deserialize)]
pub struct NewCampaignUpdate {
    /// Headline
    pub title: String,
    /// Body
    pub content: String,
    /// Posting date, defaults to now
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
}

/// Sort key for campaign listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CampaignSort {
    /// Creation time
    #[default]
    CreatedAt,
    /// Fundraising target
    Goal,
    /// Amount raised
    CurrentAmount,
    /// Closing date
    EndDate,
    /// Headline
    Title,
}

impl CampaignSort {
    /// Parses the query-string name of a sort key.
    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "created_at" => Ok(Self::CreatedAt),
            "goal" => Ok(Self::Goal),
            "current_amount" => Ok(Self::CurrentAmount),
            "end_date" => Ok(Self::EndDate),
            "title" => Ok(Self::Title),
            other => Err(Error::validation(format!("unknown sort key: {other}"))),
        }
    }

    const fn column(self) -> CampaignColumn {
        match self {
            Self::CreatedAt => CampaignColumn::CreatedAt,
            Self::Goal => CampaignColumn::Goal,
            Self::CurrentAmount => CampaignColumn::CurrentAmount,
            Self::EndDate => CampaignColumn::EndDate,
            Self::Title => CampaignColumn::Title,
        }
    }
}

/// Listing filters
#[derive(Debug, Clone, Default)]
pub struct CampaignFilter {
    /// Exact category
    pub category: Option<CampaignCategory>,
    /// Exact association
    pub association_id: Option<Uuid>,
    /// Only open (or only closed) campaigns
    pub active: Option<bool>,
    /// Case-insensitive search over title and description
    pub search: Option<String>,
    /// Sort key
    pub sort: CampaignSort,
    /// Ascending instead of the default descending order
    pub ascending: bool,
}

fn check_goal(goal: f64) -> Result<f64> {
    if !goal.is_finite() || goal < 0.0 {
        return Err(Error::validation(format!(
            "goal must be a non-negative number, got {goal}"
        )));
    }
    Ok(goal)
}

fn check_dates(start: DateTime<Utc>, end: Option<DateTime<Utc>>) -> Result<()> {
    if end.is_some_and(|end| end < start) {
        return Err(Error::validation("end_date must not be before start_date"));
    }
    Ok(())
}

/// Loads a campaign row or fails with [`Error::NotFound`].
pub async fn find_campaign<C>(db: &C, campaign_id: Uuid) -> Result<CampaignModel>
where
    C: ConnectionTrait,
{
    Campaign::find_by_id(campaign_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("campaign", campaign_id))
}

async fn updates_for(db: &DatabaseConnection, campaign_id: Uuid) -> Result<Vec<CampaignUpdateModel>> {
    CampaignUpdate::find()
        .filter(CampaignUpdateColumn::CampaignId.eq(campaign_id))
        .order_by_asc(CampaignUpdateColumn::Date)
        .all(db)
        .await
        .map_err(Into::into)
}

async fn authorize_campaign(
    db: &DatabaseConnection,
    actor: &Principal,
    campaign_id: Uuid,
) -> Result<CampaignModel> {
    let campaign = find_campaign(db, campaign_id).await?;
    association::authorize(db, actor, campaign.association_id, Action::ManageAssociation).await?;
    Ok(campaign)
}

/// Creates an open campaign for an association the actor administers.
#[instrument(skip(db, actor, input), fields(actor = %actor.id))]
pub async fn create_campaign(
    db: &DatabaseConnection,
    actor: &Principal,
    input: NewCampaign,
) -> Result<CampaignView> {
    let title = required("title", &input.title)?;
    let description = required("description", &input.description)?;
    let goal = check_goal(input.goal)?;
    let now = Utc::now();
    let start_date = input.start_date.unwrap_or(now);
    check_dates(start_date, input.end_date)?;

    association::authorize(db, actor, input.association_id, Action::ManageAssociation).await?;

    let campaign = campaign::ActiveModel {
        id: Set(Uuid::new_v4()),
        title: Set(title),
        description: Set(description),
        association_id: Set(input.association_id),
        goal: Set(goal),
        current_amount: Set(0.0),
        donor_count: Set(0),
        start_date: Set(start_date),
        end_date: Set(input.end_date),
        is_active: Set(true),
        category: Set(input.category),
        image: Set(input.image),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;

    info!("Created campaign {} ({})", campaign.title, campaign.id);
    Ok(CampaignView::new(campaign, Vec::new()))
}

/// Reads a campaign with its updates.
pub async fn get_campaign(db: &DatabaseConnection, campaign_id: Uuid) -> Result<CampaignView> {
    let campaign = find_campaign(db, campaign_id).await?;
    let updates = updates_for(db, campaign_id).await?;
    Ok(CampaignView::new(campaign, updates))
}

/// Lists campaigns matching `filter`.
pub async fn list_campaigns(db: &DatabaseConnection, filter: &CampaignFilter) -> Result<Vec<CampaignView>> {
    let mut query = Campaign::find();

    if let Some(category) = filter.category {
        query = query.filter(CampaignColumn::Category.eq(category));
    }
    if let Some(association_id) = filter.association_id {
        query = query.filter(CampaignColumn::AssociationId.eq(association_id));
    }
    if let Some(active) = filter.active {
        query = query.filter(CampaignColumn::IsActive.eq(active));
    }
    if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
        let pattern = like_pattern(search);
        query = query.filter(
            Condition::any()
                .add(Expr::expr(Func::lower(Expr::col(CampaignColumn::Title))).like(pattern.clone()))
                .add(Expr::expr(Func::lower(Expr::col(CampaignColumn::Description))).like(pattern.clone())),
        );
    }

    let column = filter.sort.column();
    query = if filter.ascending {
        query.order_by_asc(column)
    } else {
        query.order_by_desc(column)
    };

    let campaigns = query.all(db).await?;
    let ids: Vec<Uuid> = campaigns.iter().map(|c| c.id).collect();

    let mut updates: HashMap<Uuid, Vec<CampaignUpdateModel>> = HashMap::new();
    if !ids.is_empty() {
        for entry in CampaignUpdate::find()
            .filter(CampaignUpdateColumn::CampaignId.is_in(ids))
            .order_by_asc(CampaignUpdateColumn::Date)
            .all(db)
            .await?
        {
            updates.entry(entry.campaign_id).or_default().push(entry);
        }
    }

    debug!("Listed {} campaigns", campaigns.len());
    Ok(campaigns
        .into_iter()
        .map(|campaign| {
            let entries = updates.remove(&campaign.id).unwrap_or_default();
            CampaignView::new(campaign, entries)
        })
        .collect())
}

/// Applies a partial update after checking the actor administers the association.
#[instrument(skip(db, actor, changes), fields(actor = %actor.id))]
pub async fn update_campaign(
    db: &DatabaseConnection,
    actor: &Principal,
    campaign_id: Uuid,
    changes: CampaignChanges,
) -> Result<CampaignView> {
    let campaign = authorize_campaign(db, actor, campaign_id).await?;

    let start_date = changes.start_date.unwrap_or(campaign.start_date);
    let end_date = changes.end_date.or(campaign.end_date);
    check_dates(start_date, end_date)?;

    let mut active: campaign::ActiveModel = campaign.into();
    if let Some(title) = changes.title {
        active.title = Set(required("title", &title)?);
    }
    if let Some(description) = changes.description {
        active.description = Set(required("description", &description)?);
    }
    if let Some(goal) = changes.goal {
        active.goal = Set(check_goal(goal)?);
    }
    if changes.start_date.is_some() {
        active.start_date = Set(start_date);
    }
    if changes.end_date.is_some() {
        active.end_date = Set(end_date);
    }
    if let Some(is_active) = changes.is_active {
        active.is_active = Set(is_active);
    }
    if let Some(category) = changes.category {
        active.category = Set(category);
    }
    if changes.image.is_some() {
        active.image = Set(changes.image);
    }
    active.updated_at = Set(Utc::now());

    let campaign = active.update(db).await?;
    let updates = updates_for(db, campaign_id).await?;
    Ok(CampaignView::new(campaign, updates))
}

/// Deletes a campaign and its update entries. Donations are kept.
#[instrument(skip(db, actor), fields(actor = %actor.id))]
pub async fn delete_campaign(db: &DatabaseConnection, actor: &Principal, campaign_id: Uuid) -> Result<()> {
    authorize_campaign(db, actor, campaign_id).await?;

    let txn = db.begin().await?;
    CampaignUpdate::delete_many()
        .filter(CampaignUpdateColumn::CampaignId.eq(campaign_id))
        .exec(&txn)
        .await?;
    Campaign::delete_by_id(campaign_id).exec(&txn).await?;
    txn.commit().await?;

    info!("Deleted campaign {}", campaign_id);
    Ok(())
}

/// Posts a dated news entry on a campaign.
#[instrument(skip(db, actor, input), fields(actor = %actor.id))]
pub async fn add_campaign_update(
    db: &DatabaseConnection,
    actor: &Principal,
    campaign_id: Uuid,
    input: NewCampaignUpdate,
) -> Result<CampaignView> {
    let title = required("title", &input.title)?;
    let content = required("content", &input.content)?;
    let campaign = authorize_campaign(db, actor, campaign_id).await?;

    campaign_update::ActiveModel {
        id: Set(Uuid::new_v4()),
        campaign_id: Set(campaign_id),
        date: Set(input.date.unwrap_or_else(Utc::now)),
        title: Set(title),
        content: Set(content),
    }
    .insert(db)
    .await?;

    let updates = updates_for(db, campaign_id).await?;
    Ok(CampaignView::new(campaign, updates))
}

/// Adds a settled donation to the campaign aggregates in one atomic statement:
/// `UPDATE campaigns SET current_amount = current_amount + ?, donor_count = donor_count + 1 WHERE id = ?`
///
/// Returns `false` when the campaign no longer exists.
pub async fn apply_settlement<C>(db: &C, campaign_id: Uuid, amount: f64) -> Result<bool>
where
    C: ConnectionTrait,
{
    let result = Campaign::update_many()
        .col_expr(
            CampaignColumn::CurrentAmount,
            Expr::col(CampaignColumn::CurrentAmount).add(amount),
        )
        .col_expr(
            CampaignColumn::DonorCount,
            Expr::col(CampaignColumn::DonorCount).add(1),
        )
        .filter(CampaignColumn::Id.eq(campaign_id))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        warn!("Settled donation for missing campaign {}", campaign_id);
        return Ok(false);
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::*;
    use chrono::Duration;

    #[test]
    fn test_percent_complete() {
        assert_eq!(percent_complete(90000.0, 65320.0), 72);
        assert_eq!(percent_complete(0.0, 500.0), 0);
        assert_eq!(percent_complete(100.0, 250.0), 100);
        assert_eq!(percent_complete(100.0, 99.9), 99);
        assert_eq!(percent_complete(100.0, 0.0), 0);
    }

    #[test]
    fn test_is_completed() {
        assert!(is_completed(100.0, 100.0));
        assert!(!is_completed(100.0, 99.0));
        assert!(is_completed(0.0, 0.0));
    }

    #[test]
    fn test_days_left_rounds_up() {
        let now = Utc::now();
        assert_eq!(days_left(None, now), None);
        assert_eq!(days_left(Some(now + Duration::hours(1)), now), Some(1));
        assert_eq!(days_left(Some(now + Duration::days(3)), now), Some(3));
        assert_eq!(
            days_left(Some(now + Duration::days(3) + Duration::minutes(1)), now),
            Some(4)
        );
        assert_eq!(days_left(Some(now - Duration::hours(36)), now), Some(-1));
    }

    #[test]
    fn test_sort_parse() {
        assert_eq!(CampaignSort::parse("goal").unwrap(), CampaignSort::Goal);
        assert!(matches!(
            CampaignSort::parse("donor_count"),
            Err(Error::Validation { .. })
        ));
    }

    #[tokio::test]
    async fn test_create_campaign_validation() -> Result<()> {
        let db = setup_test_db().await?;
        let actor = donor_principal();

        let mut input = campaign_form(Uuid::new_v4(), 100.0);
        input.goal = -1.0;
        assert!(matches!(
            create_campaign(&db, &actor, input).await,
            Err(Error::Validation { .. })
        ));

        let mut input = campaign_form(Uuid::new_v4(), 100.0);
        input.end_date = Some(Utc::now() - Duration::days(10));
        assert!(matches!(
            create_campaign(&db, &actor, input).await,
            Err(Error::Validation { .. })
        ));

        let mut input = campaign_form(Uuid::new_v4(), 100.0);
        input.title = String::new();
        assert!(matches!(
            create_campaign(&db, &actor, input).await,
            Err(Error::Validation { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_create_requires_association_admin() -> Result<()> {
        let db = setup_test_db().await?;
        let (owner, association) = setup_with_association(&db).await?;
        let outsider = donor_principal();

        assert!(matches!(
            create_campaign(&db, &outsider, campaign_form(association.id, 500.0)).await,
            Err(Error::Forbidden { .. })
        ));
        assert!(matches!(
            create_campaign(&db, &owner, campaign_form(Uuid::new_v4(), 500.0)).await,
            Err(Error::NotFound { entity: "association", .. })
        ));

        let view = create_campaign(&db, &owner, campaign_form(association.id, 500.0)).await?;
        assert_eq!(view.campaign.current_amount, 0.0);
        assert_eq!(view.campaign.donor_count, 0);
        assert!(view.campaign.is_active);
        assert_eq!(view.percent_complete, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_list_filters_and_sorting() -> Result<()> {
        let db = setup_test_db().await?;
        let (owner, association) = setup_with_association(&db).await?;

        let mut small = campaign_form(association.id, 100.0);
        small.title = "Clean water wells".to_string();
        small.category = CampaignCategory::Humanitarian;
        create_campaign(&db, &owner, small).await?;

        let mut large = campaign_form(association.id, 5000.0);
        large.title = "School library".to_string();
        large.category = CampaignCategory::Education;
        let large = create_campaign(&db, &owner, large).await?;

        update_campaign(
            &db,
            &owner,
            large.campaign.id,
            CampaignChanges {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await?;

        let by_goal = list_campaigns(
            &db,
            &CampaignFilter {
                sort: CampaignSort::Goal,
                ascending: true,
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(by_goal.len(), 2);
        assert_eq!(by_goal[0].campaign.goal, 100.0);

        let education = list_campaigns(
            &db,
            &CampaignFilter {
                category: Some(CampaignCategory::Education),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(education.len(), 1);

        let active = list_campaigns(
            &db,
            &CampaignFilter {
                active: Some(true),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].campaign.title, "Clean water wells");

        let searched = list_campaigns(
            &db,
            &CampaignFilter {
                search: Some("LIBRARY".to_string()),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(searched.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_does_not_touch_aggregates() -> Result<()> {
        let db = setup_test_db().await?;
        let (owner, association) = setup_with_association(&db).await?;
        let view = create_campaign(&db, &owner, campaign_form(association.id, 1000.0)).await?;
        apply_settlement(&db, view.campaign.id, 250.0).await?;

        let updated = update_campaign(
            &db,
            &owner,
            view.campaign.id,
            CampaignChanges {
                goal: Some(500.0),
                title: Some("Renamed".to_string()),
                ..Default::default()
            },
        )
        .await?;

        assert_eq!(updated.campaign.title, "Renamed");
        assert_eq!(updated.campaign.current_amount, 250.0);
        assert_eq!(updated.campaign.donor_count, 1);
        assert_eq!(updated.percent_complete, 50);

        let outsider = donor_principal();
        assert!(matches!(
            update_campaign(&db, &outsider, view.campaign.id, CampaignChanges::default()).await,
            Err(Error::Forbidden { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_updates_are_ordered_by_date() -> Result<()> {
        let db = setup_test_db().await?;
        let (owner, association) = setup_with_association(&db).await?;
        let view = create_campaign(&db, &owner, campaign_form(association.id, 1000.0)).await?;
        let id = view.campaign.id;
        let now = Utc::now();

        add_campaign_update(
            &db,
            &owner,
            id,
            NewCampaignUpdate {
                title: "Second".to_string(),
                content: "Half way".to_string(),
                date: Some(now),
            },
        )
        .await?;
        let view = add_campaign_update(
            &db,
            &owner,
            id,
            NewCampaignUpdate {
                title: "First".to_string(),
                content: "Launched".to_string(),
                date: Some(now - Duration::days(7)),
            },
        )
        .await?;

        let titles: Vec<&str> = view.updates.iter().map(|u| u.title.as_str()).collect();
        assert_eq!(titles, vec!["First", "Second"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_campaign() -> Result<()> {
        let db = setup_test_db().await?;
        let (owner, association) = setup_with_association(&db).await?;
        let view = create_campaign(&db, &owner, campaign_form(association.id, 1000.0)).await?;

        assert!(matches!(
            delete_campaign(&db, &donor_principal(), view.campaign.id).await,
            Err(Error::Forbidden { .. })
        ));
        delete_campaign(&db, &owner, view.campaign.id).await?;
        assert!(matches!(
            get_campaign(&db, view.campaign.id).await,
            Err(Error::NotFound { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_apply_settlement_on_missing_campaign() -> Result<()> {
        let db = setup_test_db().await?;
        assert!(!apply_settlement(&db, Uuid::new_v4(), 10.0).await?);
        Ok(())
    }
}
