//! Identity store - Registration, authentication and profile management.
//!
//! Passwords are hashed with Argon2id and a random salt. Emails are stored
//! lowercased, so lookups are case-insensitive.

use crate::{
    core::{conflict_on_unique, like_pattern, normalize_email, required},
    entities::{Role, User, UserColumn, UserModel, user},
    errors::{Error, Result},
};
use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use sea_orm::{
    Condition, QueryOrder, Set,
    prelude::*,
    sea_query::{Expr, Func},
};
use serde::Deserialize;
use tracing::{info, instrument};

/// Shortest accepted password
pub const MIN_PASSWORD_LEN: usize = 8;

/// Registration form
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    /// Given name
    pub first_name: String,
    /// Family name
    pub last_name: String,
    /// Login email
    pub email: String,
    /// Plain-text password
    pub password: String,
    /// Optional contact number
    #[serde(default)]
    pub phone_number: Option<String>,
    /// Optional postal address
    #[serde(default)]
    pub address: Option<PostalAddress>,
}

/// Postal address as sent by clients
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostalAddress {
    /// Street line
    pub street: Option<String>,
    /// City
    pub city: Option<String>,
    /// Postal code
    pub postal_code: Option<String>,
    /// Country
    pub country: Option<String>,
}

/// Partial profile update; email and role are not editable here
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    /// New given name
    pub first_name: Option<String>,
    /// New family name
    pub last_name: Option<String>,
    /// New contact number
    pub phone_number: Option<String>,
    /// Address fields to replace
    pub address: Option<PostalAddress>,
}

/// Hashes `password` into a PHC string.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| Error::PasswordHash {
            message: e.to_string(),
        })
}

/// Checks `password` against a stored PHC string.
#[must_use]
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    PasswordHash::new(stored_hash).is_ok_and(|parsed| {
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    })
}

fn check_password_rules(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(Error::validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// Registers a donor account.
#[instrument(skip(db, input), fields(email = %input.email))]
pub async fn register(db: &DatabaseConnection, input: NewUser) -> Result<UserModel> {
    let first_name = required("first_name", &input.first_name)?;
    let last_name = required("last_name", &input.last_name)?;
    let email = normalize_email(&input.email)?;
    check_password_rules(&input.password)?;

    if find_by_email(db, &email).await?.is_some() {
        return Err(Error::Conflict {
            message: "email already registered".to_string(),
        });
    }

    let address = input.address.unwrap_or_default();
    let now = chrono::Utc::now();
    let user = user::ActiveModel {
        id: Set(Uuid::new_v4()),
        first_name: Set(first_name),
        last_name: Set(last_name),
        email: Set(email),
        password_hash: Set(hash_password(&input.password)?),
        role: Set(Role::Donor),
        phone_number: Set(input.phone_number),
        street: Set(address.street),
        city: Set(address.city),
        postal_code: Set(address.postal_code),
        country: Set(address.country),
        created_at: Set(now),
        updated_at: Set(now),
    };

    let user = user
        .insert(db)
        .await
        .map_err(|e| conflict_on_unique(e, "email already registered"))?;
    info!("Registered user {}", user.id);
    Ok(user)
}

/// Resolves an email/password pair to exactly one user.
pub async fn authenticate(db: &DatabaseConnection, email: &str, password: &str) -> Result<UserModel> {
    let email = email.trim().to_lowercase();
    let user = find_by_email(db, &email)
        .await?
        .ok_or(Error::InvalidCredentials)?;

    if verify_password(password, &user.password_hash) {
        Ok(user)
    } else {
        Err(Error::InvalidCredentials)
    }
}

/// Finds a user by (already normalized) email.
pub async fn find_by_email(db: &DatabaseConnection, email: &str) -> Result<Option<UserModel>> {
    User::find()
        .filter(UserColumn::Email.eq(email))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Loads a user by id.
pub async fn get_user<C>(db: &C, user_id: Uuid) -> Result<UserModel>
where
    C: ConnectionTrait,
{
    User::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("user", user_id))
}

/// Applies a partial profile update.
pub async fn update_profile(
    db: &DatabaseConnection,
    user_id: Uuid,
    changes: ProfileUpdate,
) -> Result<UserModel> {
    let user = get_user(db, user_id).await?;
    let mut active: user::ActiveModel = user.into();

    if let Some(first_name) = changes.first_name {
        active.first_name = Set(required("first_name", &first_name)?);
    }
    if let Some(last_name) = changes.last_name {
        active.last_name = Set(required("last_name", &last_name)?);
    }
    if let Some(phone) = changes.phone_number {
        active.phone_number = Set(Some(phone));
    }
    if let Some(address) = changes.address {
        if let Some(street) = address.street {
            active.street = Set(Some(street));
        }
        if let Some(city) = address.city {
            active.city = Set(Some(city));
        }
        if let Some(postal_code) = address.postal_code {
            active.postal_code = Set(Some(postal_code));
        }
        if let Some(country) = address.country {
            active.country = Set(Some(country));
        }
    }
    active.updated_at = Set(chrono::Utc::now());

    active.update(db).await.map_err(Into::into)
}

/// Replaces the password after checking the current one.
#[instrument(skip(db, current, new))]
pub async fn change_password(
    db: &DatabaseConnection,
    user_id: Uuid,
    current: &str,
    new: &str,
) -> Result<()> {
    let user = get_user(db, user_id).await?;
    if !verify_password(current, &user.password_hash) {
        return Err(Error::InvalidCredentials);
    }
    check_password_rules(new)?;

    let mut active: user::ActiveModel = user.into();
    active.password_hash = Set(hash_password(new)?);
    active.updated_at = Set(chrono::Utc::now());
    active.update(db).await?;

    info!("Password changed for user {}", user_id);
    Ok(())
}

/// Lists users, optionally filtered by role and a name/email search.
pub async fn list_users(
    db: &DatabaseConnection,
    role: Option<Role>,
    search: Option<&str>,
) -> Result<Vec<UserModel>> {
    let mut query = User::find().order_by_asc(UserColumn::LastName);

    if let Some(role) = role {
        query = query.filter(UserColumn::Role.eq(role));
    }
    if let Some(search) = search.filter(|s| !s.trim().is_empty()) {
        let pattern = like_pattern(search);
        query = query.filter(
            Condition::any()
                .add(Expr::expr(Func::lower(Expr::col(UserColumn::FirstName))).like(pattern.clone()))
                .add(Expr::expr(Func::lower(Expr::col(UserColumn::LastName))).like(pattern.clone()))
                .add(Expr::expr(Func::lower(Expr::col(UserColumn::Email))).like(pattern.clone())),
        );
    }

    query.all(db).await.map_err(Into::into)
}

/// Changes a user's global role.
#[instrument(skip(db))]
pub async fn update_role(db: &DatabaseConnection, user_id: Uuid, role: Role) -> Result<UserModel> {
    let user = get_user(db, user_id).await?;
    let mut active: user::ActiveModel = user.into();
    active.role = Set(role);
    active.updated_at = Set(chrono::Utc::now());

    let user = active.update(db).await?;
    info!("User {} is now {}", user.id, role.as_str());
    Ok(user)
}
