use tracing::{info, instrument, warn};

use crate::{
    auth::{
        password::hash_secret,
        services::{normalize_email, require_non_empty},
    },
    books::{repo::BookRepository, repo_types::Book},
    error::{AppError, AppResult},
    users::{
        dto::UpdateProfileRequest,
        repo::UserRepository,
        repo_types::{User, UserChanges},
    },
};

pub async fn get_user(users: &dyn UserRepository, id: i64) -> AppResult<User> {
    users
        .find_by_id(id)
        .await?
        .ok_or(AppError::NotFound("User"))
}

/// Applies a profile merge-patch for `current`, re-running the registration
/// uniqueness checks (email first) on the fields that change.
#[instrument(skip(users, current, req), fields(user_id = current.id))]
pub async fn update_profile(
    users: &dyn UserRepository,
    current: &User,
    req: UpdateProfileRequest,
) -> AppResult<User> {
    let mut changes = UserChanges::default();

    if let Some(raw) = req.email {
        let email = normalize_email(&raw)?;
        if email != current.email {
            if let Some(other) = users.find_by_email(&email).await? {
                if other.id != current.id {
                    warn!(email = %email, "email already registered");
                    return Err(AppError::DuplicateEmail);
                }
            }
            changes.email = Some(email);
        }
    }
    if let Some(raw) = req.username {
        let username = raw.trim().to_owned();
        require_non_empty("username", &username)?;
        if username != current.username {
            if let Some(other) = users.find_by_username(&username).await? {
                if other.id != current.id {
                    warn!(username = %username, "username already registered");
                    return Err(AppError::DuplicateUsername);
                }
            }
            changes.username = Some(username);
        }
    }
    if let Some(password) = req.password {
        require_non_empty("password", &password)?;
        changes.password_hash = Some(hash_secret(&password)?);
    }

    let user = users
        .update(current.id, changes)
        .await?
        .ok_or(AppError::NotFound("User"))?;
    info!("profile updated");
    Ok(user)
}

pub async fn borrowed_books(books: &dyn BookRepository, user_id: i64) -> AppResult<Vec<Book>> {
    books.list_borrowed_by(user_id).await
}

/// Accounts are closed by their owner only.
#[instrument(skip(users, caller), fields(caller_id = caller.id))]
pub async fn delete_user(users: &dyn UserRepository, caller: &User, id: i64) -> AppResult<()> {
    if caller.id != id {
        warn!(target_id = id, "delete of another account refused");
        return Err(AppError::Forbidden);
    }
    users.delete(id).await?;
    info!(user_id = id, "user deleted");
    Ok(())
}
