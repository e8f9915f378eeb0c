use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::RegisterRequest,
        jwt::JwtKeys,
        password::{hash_secret, verify_secret},
    },
    error::{AppError, AppResult},
    users::{
        repo::UserRepository,
        repo_types::{NewUser, User},
    },
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex =
            Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email regex compiles");
    }
    EMAIL_RE.is_match(email)
}

lazy_static! {
    // Verified against on unknown emails so both login failures cost one argon2 run.
    static ref DUMMY_HASH: String = hash_secret("bookshelf-unknown-account").unwrap_or_default();
}

/// Trims and lower-cases, then checks the address shape.
pub(crate) fn normalize_email(raw: &str) -> AppResult<String> {
    let email = raw.trim().to_lowercase();
    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(AppError::Validation("Invalid email".into()));
    }
    Ok(email)
}

pub(crate) fn require_non_empty(field: &str, value: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{field} must not be empty")));
    }
    Ok(())
}

/// Creates a user. Email collisions are reported before username collisions.
#[instrument(skip(users, req), fields(username = %req.username))]
pub async fn register(users: &dyn UserRepository, req: RegisterRequest) -> AppResult<User> {
    let email = normalize_email(&req.email)?;
    let username = req.username.trim().to_owned();
    require_non_empty("username", &username)?;
    require_non_empty("password", &req.password)?;

    if users.find_by_email(&email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(AppError::DuplicateEmail);
    }
    if users.find_by_username(&username).await?.is_some() {
        warn!(username = %username, "username already registered");
        return Err(AppError::DuplicateUsername);
    }

    let password_hash = hash_secret(&req.password)?;
    let user = users
        .create(NewUser {
            username,
            email,
            password_hash,
        })
        .await?;

    info!(user_id = user.id, email = %user.email, "user registered");
    Ok(user)
}

/// Exchanges email and secret for a token. Every failure reads the same.
#[instrument(skip(users, keys, password))]
pub async fn authenticate(
    users: &dyn UserRepository,
    keys: &JwtKeys,
    email: &str,
    password: &str,
) -> AppResult<String> {
    let email = email.trim().to_lowercase();
    let Some(user) = users.find_by_email(&email).await? else {
        let _ = verify_secret(password, &DUMMY_HASH);
        warn!(email = %email, "login unknown email");
        return Err(AppError::InvalidCredentials);
    };
    if !verify_secret(password, &user.password_hash)? {
        warn!(user_id = user.id, "login invalid password");
        return Err(AppError::InvalidCredentials);
    }

    let token = keys.issue(&user.email, None)?;
    info!(user_id = user.id, "user logged in");
    Ok(token)
}

/// Maps a bearer token back to its user.
pub async fn resolve(users: &dyn UserRepository, keys: &JwtKeys, token: &str) -> AppResult<User> {
    let claims = keys.verify(token)?;
    match users.find_by_email(&claims.sub).await? {
        Some(user) => Ok(user),
        None => {
            warn!(email = %claims.sub, "token for unknown identity");
            Err(AppError::InvalidCredentials)
        }
    }
}

/// Issues a fresh token for the holder of `token`. The old token stays valid until it expires.
#[instrument(skip_all)]
pub async fn refresh(users: &dyn UserRepository, keys: &JwtKeys, token: &str) -> AppResult<String> {
    let user = resolve(users, keys, token).await?;
    let fresh = keys.issue(&user.email, None)?;
    info!(user_id = user.id, "token refreshed");
    Ok(fresh)
}
