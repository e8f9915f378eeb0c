use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

/// Catalog entry as stored in the `books` table.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub publication_year: i32,
    pub description: Option<String>,
    pub genre: Option<String>,
    pub language: Option<String>,
    pub cover_image_url: Option<String>,
    pub available: bool,
    pub borrower_id: Option<i64>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub publication_year: i32,
    pub description: Option<String>,
    pub genre: Option<String>,
    pub language: Option<String>,
    pub cover_image_url: Option<String>,
}

/// Column changes for a catalog update.
///
/// Outer `None` leaves a column untouched; `Some(None)` on a nullable column clears it.
#[derive(Debug, Clone, Default)]
pub struct BookChanges {
    pub title: Option<String>,
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub publication_year: Option<i32>,
    pub description: Option<Option<String>>,
    pub genre: Option<Option<String>>,
    pub language: Option<Option<String>>,
    pub cover_image_url: Option<Option<String>>,
}

impl BookChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.author.is_none()
            && self.isbn.is_none()
            && self.publication_year.is_none()
            && self.description.is_none()
            && self.genre.is_none()
            && self.language.is_none()
            && self.cover_image_url.is_none()
    }
}

/// Listing constraints; `None` imposes nothing on that column.
#[derive(Debug, Clone)]
pub struct BookFilter {
    pub title: Option<String>,
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub available_only: bool,
    pub skip: i64,
    pub limit: i64,
}

impl Default for BookFilter {
    fn default() -> Self {
        Self {
            title: None,
            author: None,
            isbn: None,
            available_only: false,
            skip: 0,
            limit: 100,
        }
    }
}
