use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Every failure a handler can surface to the client.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Email already registered")]
    DuplicateEmail,
    #[error("Username already registered")]
    DuplicateUsername,
    #[error("Book with this ISBN already exists")]
    DuplicateIsbn,
    #[error("Not allowed to act on another user")]
    Forbidden,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("Book is not available")]
    NotAvailable,
    #[error("Book is not borrowed")]
    NotBorrowed,
    #[error("Book is currently borrowed")]
    BookOnLoan,
    #[error("User still has borrowed books")]
    UserHasLoans,
    #[error("{0}")]
    Validation(String),
    #[error("database error")]
    Database(#[source] sqlx::Error),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::DuplicateEmail
            | AppError::DuplicateUsername
            | AppError::DuplicateIsbn
            | AppError::NotAvailable
            | AppError::NotBorrowed
            | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BookOnLoan | AppError::UserHasLoans => StatusCode::CONFLICT,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        // Unique-constraint names follow Postgres' `<table>_<column>_key` default.
        if let sqlx::Error::Database(db) = &e {
            if db.is_unique_violation() {
                match db.constraint() {
                    Some("users_email_key") => return AppError::DuplicateEmail,
                    Some("users_username_key") => return AppError::DuplicateUsername,
                    Some("books_isbn_key") => return AppError::DuplicateIsbn,
                    _ => {}
                }
            }
        }
        AppError::Database(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = match &self {
            AppError::Database(_) | AppError::Internal(_) => {
                error!(
                    error.cause_chain = ?self,
                    error.message = %self,
                    "unexpected error"
                );
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        let body = Json(json!({ "detail": detail }));
        if status == StatusCode::UNAUTHORIZED {
            (status, [(header::WWW_AUTHENTICATE, "Bearer")], body).into_response()
        } else {
            (status, body).into_response()
        }
    }
}
