//! Association business logic - Creation, lookup, updates, deletion and admin membership.
//!
//! The admin list lives in `association_admins`. It is the ownership anchor for
//! campaigns, documents and the dashboard, so other modules resolve it through
//! [`authorize`] before mutating anything that belongs to an association.

use crate::{
    core::{
        conflict_on_unique,
        identity::{self, PostalAddress},
        like_pattern, normalize_email,
        policy::{self, Action, Principal, Target},
        required,
    },
    entities::{
        Association, AssociationAdmin, AssociationAdminColumn, AssociationColumn,
        AssociationModel, Campaign, CampaignColumn, CampaignUpdate, CampaignUpdateColumn,
        association, association_admin,
    },
    errors::{Error, Result},
};
use sea_orm::{
    Condition, QueryOrder, QuerySelect, Set, TransactionTrait,
    prelude::*,
    sea_query::{Expr, Func},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

/// Postal address of an association; every line is required
#[derive(Debug, Clone, Deserialize)]
pub struct AssociationAddress {
    /// Street line
    pub street: String,
    /// City
    pub city: String,
    /// Postal code
    pub postal_code: String,
    /// Country
    pub country: String,
}

/// Creation form
#[derive(Debug, Clone, Deserialize)]
pub struct NewAssociation {
    /// Public name
    pub name: String,
    /// Short presentation
    pub description: String,
    /// Mission statement
    pub mission: String,
    /// Optional vision statement
    #[serde(default)]
    pub vision: Option<String>,
    /// Contact email
    pub email: String,
    /// Contact phone number
    pub phone_number: String,
    /// Optional website
    #[serde(default)]
    pub website: Option<String>,
    /// Optional logo URL
    #[serde(default)]
    pub logo: Option<String>,
    /// Postal address
    pub address: AssociationAddress,
    /// Legal form
    pub legal_status: String,
    /// Official registration number
    pub registration_number: String,
    /// Whether gifts are tax deductible
    #[serde(default)]
    pub tax_exempt: bool,
}

/// Partial update; absent fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssociationUpdate {
    /// New name
    pub name: Option<String>,
    /// New presentation
    pub description: Option<String>,
    /// New mission statement
    pub mission: Option<String>,
    /// New vision statement
    pub vision: Option<String>,
    /// New contact email
    pub email: Option<String>,
    /// New phone number
    pub phone_number: Option<String>,
    /// New website
    pub website: Option<String>,
    /// New logo URL
    pub logo: Option<String>,
    /// Address lines to replace
    pub address: Option<PostalAddress>,
    /// New legal form
    pub legal_status: Option<String>,
    /// New registration number
    pub registration_number: Option<String>,
    /// New tax-exempt flag
    pub tax_exempt: Option<bool>,
}

/// Association together with its admin list
#[derive(Debug, Clone, Serialize)]
pub struct AssociationDetails {
    /// Stored association fields
    #[serde(flatten)]
    pub association: AssociationModel,
    /// Ids of the association's admins
    pub admins: Vec<Uuid>,
}

/// Listing projection
#[derive(Debug, Clone, Serialize)]
pub struct AssociationSummary {
    /// Association id
    pub id: Uuid,
    /// Public name
    pub name: String,
    /// Short presentation
    pub description: String,
    /// Logo URL
    pub logo: Option<String>,
}

impl From<AssociationModel> for AssociationSummary {
    fn from(model: AssociationModel) -> Self {
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
            logo: model.logo,
        }
    }
}

/// Ids of the admins of `association_id`.
pub async fn admins_of<C>(db: &C, association_id: Uuid) -> Result<Vec<Uuid>>
where
    C: ConnectionTrait,
{
    AssociationAdmin::find()
        .select_only()
        .column(AssociationAdminColumn::UserId)
        .filter(AssociationAdminColumn::AssociationId.eq(association_id))
        .order_by_asc(AssociationAdminColumn::AddedAt)
        .into_tuple::<Uuid>()
        .all(db)
        .await
        .map_err(Into::into)
}

/// Loads an association or fails with [`Error::NotFound`].
pub async fn find_association<C>(db: &C, association_id: Uuid) -> Result<AssociationModel>
where
    C: ConnectionTrait,
{
    Association::find_by_id(association_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("association", association_id))
}

/// Loads an association and checks that `actor` may perform `action` on it.
pub async fn authorize<C>(
    db: &C,
    actor: &Principal,
    association_id: Uuid,
    action: Action,
) -> Result<AssociationModel>
where
    C: ConnectionTrait,
{
    let association = find_association(db, association_id).await?;
    let admins = admins_of(db, association_id).await?;
    policy::require(actor, action, Target::Association { admins: &admins })?;
    Ok(association)
}

async fn ensure_unique<C>(
    db: &C,
    column: AssociationColumn,
    value: &str,
    except: Option<Uuid>,
    field: &str,
) -> Result<()>
where
    C: ConnectionTrait,
{
    let mut query = Association::find().filter(column.eq(value));
    if let Some(id) = except {
        query = query.filter(AssociationColumn::Id.ne(id));
    }
    if query.one(db).await?.is_some() {
        return Err(Error::Conflict {
            message: format!("an association with this {field} already exists"),
        });
    }
    Ok(())
}

/// Creates an association with `actor` as its first admin.
///
/// The association row and the admin membership are written in one transaction,
/// so a uniqueness failure leaves nothing behind.
#[instrument(skip(db, actor, input), fields(actor = %actor.id))]
pub async fn create_association(
    db: &DatabaseConnection,
    actor: &Principal,
    input: NewAssociation,
) -> Result<AssociationDetails> {
    let name = required("name", &input.name)?;
    let description = required("description", &input.description)?;
    let mission = required("mission", &input.mission)?;
    let email = normalize_email(&input.email)?;
    let phone_number = required("phone_number", &input.phone_number)?;
    let street = required("address.street", &input.address.street)?;
    let city = required("address.city", &input.address.city)?;
    let postal_code = required("address.postal_code", &input.address.postal_code)?;
    let country = required("address.country", &input.address.country)?;
    let legal_status = required("legal_status", &input.legal_status)?;
    let registration_number = required("registration_number", &input.registration_number)?;

    let txn = db.begin().await?;

    ensure_unique(&txn, AssociationColumn::Name, &name, None, "name").await?;
    ensure_unique(&txn, AssociationColumn::Email, &email, None, "email").await?;
    ensure_unique(
        &txn,
        AssociationColumn::RegistrationNumber,
        &registration_number,
        None,
        "registration number",
    )
    .await?;

    let now = chrono::Utc::now();
    let association = association::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name),
        description: Set(description),
        mission: Set(mission),
        vision: Set(input.vision),
        email: Set(email),
        phone_number: Set(phone_number),
        website: Set(input.website),
        logo: Set(input.logo),
        street: Set(street),
        city: Set(city),
        postal_code: Set(postal_code),
        country: Set(country),
        legal_status: Set(legal_status),
        registration_number: Set(registration_number),
        tax_exempt: Set(input.tax_exempt),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&txn)
    .await
    .map_err(|e| conflict_on_unique(e, "association already exists"))?;

    association_admin::ActiveModel {
        association_id: Set(association.id),
        user_id: Set(actor.id),
        added_at: Set(now),
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    info!("Created association {} ({})", association.name, association.id);
    Ok(AssociationDetails {
        association,
        admins: vec![actor.id],
    })
}

/// Reads an association with its admin list.
pub async fn get_association(db: &DatabaseConnection, association_id: Uuid) -> Result<AssociationDetails> {
    let association = find_association(db, association_id).await?;
    let admins = admins_of(db, association_id).await?;
    Ok(AssociationDetails { association, admins })
}

/// Lists associations, optionally filtered by a search over name and description.
pub async fn list_associations(
    db: &DatabaseConnection,
    search: Option<&str>,
) -> Result<Vec<AssociationSummary>> {
    let mut query = Association::find().order_by_asc(AssociationColumn::Name);

    if let Some(search) = search.filter(|s| !s.trim().is_empty()) {
        let pattern = like_pattern(search);
        query = query.filter(
            Condition::any()
                .add(Expr::expr(Func::lower(Expr::col(AssociationColumn::Name))).like(pattern.clone()))
                .add(
                    Expr::expr(Func::lower(Expr::col(AssociationColumn::Description)))
                        .like(pattern.clone()),
                ),
        );
    }

    let associations = query.all(db).await?;
    debug!("Listed {} associations", associations.len());
    Ok(associations.into_iter().map(Into::into).collect())
}

/// Applies a partial update after checking ownership.
#[instrument(skip(db, actor, changes), fields(actor = %actor.id))]
pub async fn update_association(
    db: &DatabaseConnection,
    actor: &Principal,
    association_id: Uuid,
    changes: AssociationUpdate,
) -> Result<AssociationDetails> {
    let association = authorize(db, actor, association_id, Action::UpdateAssociation).await?;
    let mut active: association::ActiveModel = association.into();

    if let Some(name) = changes.name {
        let name = required("name", &name)?;
        ensure_unique(db, AssociationColumn::Name, &name, Some(association_id), "name").await?;
        active.name = Set(name);
    }
    if let Some(email) = changes.email {
        let email = normalize_email(&email)?;
        ensure_unique(db, AssociationColumn::Email, &email, Some(association_id), "email").await?;
        active.email = Set(email);
    }
    if let Some(number) = changes.registration_number {
        let number = required("registration_number", &number)?;
        ensure_unique(
            db,
            AssociationColumn::RegistrationNumber,
            &number,
            Some(association_id),
            "registration number",
        )
        .await?;
        active.registration_number = Set(number);
    }
    if let Some(description) = changes.description {
        active.description = Set(required("description", &description)?);
    }
    if let Some(mission) = changes.mission {
        active.mission = Set(required("mission", &mission)?);
    }
    if let Some(phone) = changes.phone_number {
        active.phone_number = Set(required("phone_number", &phone)?);
    }
    if let Some(legal_status) = changes.legal_status {
        active.legal_status = Set(required("legal_status", &legal_status)?);
    }
    if let Some(address) = changes.address {
        if let Some(street) = address.street {
            active.street = Set(required("address.street", &street)?);
        }
        if let Some(city) = address.city {
            active.city = Set(required("address.city", &city)?);
        }
        if let Some(postal_code) = address.postal_code {
            active.postal_code = Set(required("address.postal_code", &postal_code)?);
        }
        if let Some(country) = address.country {
            active.country = Set(required("address.country", &country)?);
        }
    }
    if changes.vision.is_some() {
        active.vision = Set(changes.vision);
    }
    if changes.website.is_some() {
        active.website = Set(changes.website);
    }
    if changes.logo.is_some() {
        active.logo = Set(changes.logo);
    }
    if let Some(tax_exempt) = changes.tax_exempt {
        active.tax_exempt = Set(tax_exempt);
    }
    active.updated_at = Set(chrono::Utc::now());

    let association = active
        .update(db)
        .await
        .map_err(|e| conflict_on_unique(e, "association already exists"))?;
    let admins = admins_of(db, association_id).await?;
    Ok(AssociationDetails { association, admins })
}

/// Deletes an association along with its campaigns, their updates and its admin list.
#[instrument(skip(db, actor), fields(actor = %actor.id))]
pub async fn delete_association(
    db: &DatabaseConnection,
    actor: &Principal,
    association_id: Uuid,
) -> Result<()> {
    let txn = db.begin().await?;
    authorize(&txn, actor, association_id, Action::DeleteAssociation).await?;

    let campaign_ids: Vec<Uuid> = Campaign::find()
        .select_only()
        .column(CampaignColumn::Id)
        .filter(CampaignColumn::AssociationId.eq(association_id))
        .into_tuple()
        .all(&txn)
        .await?;

    if !campaign_ids.is_empty() {
        CampaignUpdate::delete_many()
            .filter(CampaignUpdateColumn::CampaignId.is_in(campaign_ids))
            .exec(&txn)
            .await?;
    }
    let campaigns = Campaign::delete_many()
        .filter(CampaignColumn::AssociationId.eq(association_id))
        .exec(&txn)
        .await?;
    AssociationAdmin::delete_many()
        .filter(AssociationAdminColumn::AssociationId.eq(association_id))
        .exec(&txn)
        .await?;
    Association::delete_by_id(association_id).exec(&txn).await?;

    txn.commit().await?;

    info!(
        "Deleted association {} and {} campaigns",
        association_id, campaigns.rows_affected
    );
    Ok(())
}

/// Adds `user_id` to the admin list of an association.
#[instrument(skip(db, actor), fields(actor = %actor.id))]
pub async fn add_admin(
    db: &DatabaseConnection,
    actor: &Principal,
    association_id: Uuid,
    user_id: Uuid,
) -> Result<AssociationDetails> {
    let association = authorize(db, actor, association_id, Action::ManageAssociation).await?;
    identity::get_user(db, user_id).await?;

    let mut admins = admins_of(db, association_id).await?;
    if admins.contains(&user_id) {
        return Err(Error::Conflict {
            message: "user is already an admin of this association".to_string(),
        });
    }

    association_admin::ActiveModel {
        association_id: Set(association_id),
        user_id: Set(user_id),
        added_at: Set(chrono::Utc::now()),
    }
    .insert(db)
    .await
    .map_err(|e| conflict_on_unique(e, "user is already an admin of this association"))?;

    info!("Added admin {} to association {}", user_id, association_id);
    admins.push(user_id);
    Ok(AssociationDetails { association, admins })
}
