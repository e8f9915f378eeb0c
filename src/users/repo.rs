use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};

use crate::{
    db::PgStore,
    error::{AppError, AppResult},
    users::repo_types::{NewUser, User, UserChanges},
};

const USER_COLUMNS: &str = "id, username, email, password_hash, is_active, created_at";

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> AppResult<Option<User>>;
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;
    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>>;
    /// Inserts a user; unique collisions surface as `DuplicateEmail`/`DuplicateUsername`.
    async fn create(&self, new: NewUser) -> AppResult<User>;
    /// Applies only the populated columns. `Ok(None)` when the user does not exist.
    async fn update(&self, id: i64, changes: UserChanges) -> AppResult<Option<User>>;
    /// Fails with `UserHasLoans` while any book still references the user.
    async fn delete(&self, id: i64) -> AppResult<()>;
}

#[async_trait]
impl UserRepository for PgStore {
    async fn find_by_id(&self, id: i64) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn create(&self, new: NewUser) -> AppResult<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (username, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(new.username)
        .bind(new.email)
        .bind(new.password_hash)
        .fetch_one(&self.db)
        .await?;
        Ok(user)
    }

    async fn update(&self, id: i64, changes: UserChanges) -> AppResult<Option<User>> {
        if changes.is_empty() {
            return UserRepository::find_by_id(self, id).await;
        }

        let mut qb = QueryBuilder::<Postgres>::new("UPDATE users SET ");
        let mut set = qb.separated(", ");
        if let Some(username) = changes.username {
            set.push("username = ").push_bind_unseparated(username);
        }
        if let Some(email) = changes.email {
            set.push("email = ").push_bind_unseparated(email);
        }
        if let Some(hash) = changes.password_hash {
            set.push("password_hash = ").push_bind_unseparated(hash);
        }
        qb.push(" WHERE id = ").push_bind(id);
        qb.push(format!(" RETURNING {USER_COLUMNS}"));

        let user = qb
            .build_query_as::<User>()
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    async fn delete(&self, id: i64) -> AppResult<()> {
        let res = sqlx::query(
            r#"
            DELETE FROM users
             WHERE id = $1
               AND NOT EXISTS (SELECT 1 FROM books WHERE borrower_id = $1)
            "#,
        )
        .bind(id)
        .execute(&self.db)
        .await?;
        if res.rows_affected() == 1 {
            return Ok(());
        }

        match UserRepository::find_by_id(self, id).await? {
            Some(_) => Err(AppError::UserHasLoans),
            None => Err(AppError::NotFound("User")),
        }
    }
}
