//! Operator accounts - registration, login and role lookup.
//!
//! Passwords are stored as Argon2 PHC strings. Issuing sessions and enforcing
//! role-based access is left to whatever sits in front of this service; this
//! module only answers "who is this and what role do they hold".

use crate::{
    config::settings::{EMPLOYEE_ROLE, RoleSeed},
    entities::{Order, Role, User, order, role, user},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Public view of an operator. Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserAccount {
    /// Operator id
    pub id: i64,
    /// Login name
    pub name: String,
    /// Role id
    pub role_id: i64,
    /// Role name, e.g. "Administrator"
    pub role: String,
}

impl UserAccount {
    fn from_parts(user: user::Model, role: Option<role::Model>) -> Self {
        Self {
            id: user.id,
            name: user.name,
            role_id: user.role_id,
            role: role.map(|r| r.name).unwrap_or_default(),
        }
    }
}

/// Registration request.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    /// Unique login name
    pub name: String,
    /// Plain-text password, hashed before storage
    pub password: String,
    /// Role name; defaults to the employee role
    #[serde(default)]
    pub role: Option<String>,
}

/// Hashes a password into an Argon2 PHC string with a random salt.
pub fn hash_password(password: &str) -> Result<String> {
    use argon2::password_hash::SaltString;
    use argon2::password_hash::rand_core::OsRng;
    use argon2::{Argon2, PasswordHasher};
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| Error::PasswordHash {
            message: e.to_string(),
        })?;
    Ok(hash.to_string())
}

/// Checks a password against a stored PHC string. Malformed hashes never verify.
#[must_use]
pub fn verify_password(password: &str, hash: &str) -> bool {
    use argon2::{Argon2, PasswordHash, PasswordVerifier};
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Inserts every configured role that does not exist yet.
pub async fn seed_roles(db: &DatabaseConnection, seeds: &[RoleSeed]) -> Result<()> {
    for seed in seeds {
        let name = seed.name.trim();
        if name.is_empty() {
            return Err(Error::Config {
                message: "Role names cannot be empty".to_string(),
            });
        }
        if find_role_by_name(db, name).await?.is_none() {
            role::ActiveModel {
                name: Set(name.to_string()),
                ..Default::default()
            }
            .insert(db)
            .await?;
            info!("Seeded role '{name}'");
        }
    }
    Ok(())
}

/// Finds a role by exact name.
pub async fn find_role_by_name<C>(db: &C, name: &str) -> Result<Option<role::Model>>
where
    C: ConnectionTrait,
{
    Role::find()
        .filter(role::Column::Name.eq(name))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Registers a new operator.
///
/// # Errors
/// - `Validation` for a blank name or empty password
/// - `Duplicate` when the name is taken
/// - `Validation` when the requested role does not exist
pub async fn register_user(db: &DatabaseConnection, new_user: NewUser) -> Result<UserAccount> {
    let name = new_user.name.trim().to_string();
    if name.is_empty() {
        return Err(Error::validation("User name cannot be empty"));
    }
    if new_user.password.is_empty() {
        return Err(Error::validation("Password cannot be empty"));
    }

    let taken = User::find()
        .filter(user::Column::Name.eq(name.as_str()))
        .one(db)
        .await?
        .is_some();
    if taken {
        return Err(Error::Duplicate {
            message: format!("user name '{name}' already exists"),
        });
    }

    let role_name = new_user
        .role
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .unwrap_or(EMPLOYEE_ROLE);
    let role = find_role_by_name(db, role_name)
        .await?
        .ok_or_else(|| Error::validation(format!("Role '{role_name}' does not exist")))?;

    let user = user::ActiveModel {
        name: Set(name),
        password_hash: Set(hash_password(&new_user.password)?),
        role_id: Set(role.id),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(user_id = user.id, role = %role.name, "Registered user");
    Ok(UserAccount::from_parts(user, Some(role)))
}

/// Verifies a name/password pair.
///
/// Unknown names and wrong passwords produce the same `InvalidCredentials` error.
pub async fn login(db: &DatabaseConnection, name: &str, password: &str) -> Result<UserAccount> {
    let found = User::find()
        .filter(user::Column::Name.eq(name.trim()))
        .find_also_related(Role)
        .one(db)
        .await?;

    match found {
        Some((user, role)) if verify_password(password, &user.password_hash) => {
            debug!(user_id = user.id, "Login succeeded");
            Ok(UserAccount::from_parts(user, role))
        }
        _ => {
            debug!("Login rejected");
            Err(Error::InvalidCredentials)
        }
    }
}

/// Retrieves one operator account.
pub async fn get_user_account<C>(db: &C, user_id: i64) -> Result<Option<UserAccount>>
where
    C: ConnectionTrait,
{
    let found = User::find_by_id(user_id)
        .find_also_related(Role)
        .one(db)
        .await?;
    Ok(found.map(|(user, role)| UserAccount::from_parts(user, role)))
}

/// Lists all operators by name.
pub async fn list_users(db: &DatabaseConnection) -> Result<Vec<UserAccount>> {
    let rows = User::find()
        .find_also_related(Role)
        .order_by_asc(user::Column::Name)
        .all(db)
        .await?;
    Ok(rows
        .into_iter()
        .map(|(user, role)| UserAccount::from_parts(user, role))
        .collect())
}

/// Deletes an operator that never took an order.
pub async fn delete_user(db: &DatabaseConnection, user_id: i64) -> Result<()> {
    if User::find_by_id(user_id).one(db).await?.is_none() {
        return Err(Error::not_found("User", user_id));
    }

    let orders = Order::find()
        .filter(order::Column::UserId.eq(user_id))
        .count(db)
        .await?;
    if orders > 0 {
        return Err(Error::InUse {
            entity: "User",
            id: user_id,
        });
    }

    User::delete_by_id(user_id).exec(db).await?;
    info!(user_id, "Deleted user");
    Ok(())
}
