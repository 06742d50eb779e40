//! Credential checks and first-user seeding.

use actix_web::web;
use log::{info, warn};

use crate::config::AdminSeed;
use crate::db::UserRepository;
use crate::errors::{AppError, AppResult};
use crate::types::{NewUser, User};

pub async fn hash_password(password: &str, cost: u32) -> AppResult<String> {
    let password = password.to_string();
    web::block(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
        .map_err(|e| AppError::Internal(format!("Hachage impossible: {}", e)))
}

/// The user matching `username` and `password`, if any.
pub async fn authenticate(
    users: &dyn UserRepository,
    username: &str,
    password: &str,
) -> AppResult<Option<User>> {
    let user = match users.find_by_username(username).await? {
        Some(user) => user,
        None => return Ok(None),
    };

    let password = password.to_string();
    let hash = user.password_hash.clone();
    let matches = web::block(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
        .map_err(|e| {
            warn!("Stored password hash of {} is unusable: {}", user.username, e);
            AppError::Internal("Vérification du mot de passe impossible".to_string())
        })?;

    Ok(matches.then_some(user))
}

pub async fn create_user(
    users: &dyn UserRepository,
    username: &str,
    password: &str,
    email: &str,
    cost: u32,
) -> AppResult<User> {
    let password_hash = hash_password(password, cost).await?;
    Ok(users
        .insert(NewUser {
            username: username.to_string(),
            password_hash,
            email: email.to_string(),
        })
        .await?)
}

/// Creates the first user when the user collection is empty.
pub async fn initialize_admin(
    users: &dyn UserRepository,
    seed: &AdminSeed,
    cost: u32,
) -> AppResult<Option<User>> {
    if users.count().await? > 0 {
        return Ok(None);
    }

    let user = create_user(users, &seed.username, &seed.password, &seed.email, cost).await?;
    info!("Created initial user {}", user.username);
    Ok(Some(user))
}
