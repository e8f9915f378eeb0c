use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};

use crate::{
    books::{
        lending::LendingState,
        repo_types::{Book, BookChanges, BookFilter, NewBook},
    },
    db::PgStore,
    error::{AppError, AppResult},
};

const BOOK_COLUMNS: &str = "id, title, author, isbn, publication_year, description, genre, \
                            language, cover_image_url, available, borrower_id, created_at";

#[async_trait]
pub trait BookRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> AppResult<Option<Book>>;
    async fn find_by_isbn(&self, isbn: &str) -> AppResult<Option<Book>>;
    /// Inserts an available book; an ISBN collision surfaces as `DuplicateIsbn`.
    async fn create(&self, new: NewBook) -> AppResult<Book>;
    /// Applies only the populated columns. `Ok(None)` when the book does not exist.
    async fn update(&self, id: i64, changes: BookChanges) -> AppResult<Option<Book>>;
    /// Fails with `BookOnLoan` while the book is borrowed.
    async fn delete(&self, id: i64) -> AppResult<()>;
    /// Ordered by id.
    async fn list(&self, filter: &BookFilter) -> AppResult<Vec<Book>>;
    async fn list_borrowed_by(&self, user_id: i64) -> AppResult<Vec<Book>>;
    /// Atomic `Available -> Borrowed`.
    async fn borrow(&self, id: i64, user_id: i64) -> AppResult<Book>;
    /// Atomic `Borrowed -> Available`.
    async fn return_book(&self, id: i64) -> AppResult<Book>;
}

impl PgStore {
    async fn book_exists(&self, id: i64) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM books WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.db)
            .await?;
        Ok(exists)
    }
}

#[async_trait]
impl BookRepository for PgStore {
    async fn find_by_id(&self, id: i64) -> AppResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>(&format!(
            "SELECT {BOOK_COLUMNS} FROM books WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(book)
    }

    async fn find_by_isbn(&self, isbn: &str) -> AppResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>(&format!(
            "SELECT {BOOK_COLUMNS} FROM books WHERE isbn = $1"
        ))
        .bind(isbn)
        .fetch_optional(&self.db)
        .await?;
        Ok(book)
    }

    async fn create(&self, new: NewBook) -> AppResult<Book> {
        let book = sqlx::query_as::<_, Book>(&format!(
            r#"
            INSERT INTO books (title, author, isbn, publication_year,
                               description, genre, language, cover_image_url)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {BOOK_COLUMNS}
            "#
        ))
        .bind(new.title)
        .bind(new.author)
        .bind(new.isbn)
        .bind(new.publication_year)
        .bind(new.description)
        .bind(new.genre)
        .bind(new.language)
        .bind(new.cover_image_url)
        .fetch_one(&self.db)
        .await?;
        Ok(book)
    }

    async fn update(&self, id: i64, changes: BookChanges) -> AppResult<Option<Book>> {
        if changes.is_empty() {
            return BookRepository::find_by_id(self, id).await;
        }

        let mut qb = QueryBuilder::<Postgres>::new("UPDATE books SET ");
        let mut set = qb.separated(", ");
        if let Some(v) = changes.title {
            set.push("title = ").push_bind_unseparated(v);
        }
        if let Some(v) = changes.author {
            set.push("author = ").push_bind_unseparated(v);
        }
        if let Some(v) = changes.isbn {
            set.push("isbn = ").push_bind_unseparated(v);
        }
        if let Some(v) = changes.publication_year {
            set.push("publication_year = ").push_bind_unseparated(v);
        }
        if let Some(v) = changes.description {
            set.push("description = ").push_bind_unseparated(v);
        }
        if let Some(v) = changes.genre {
            set.push("genre = ").push_bind_unseparated(v);
        }
        if let Some(v) = changes.language {
            set.push("language = ").push_bind_unseparated(v);
        }
        if let Some(v) = changes.cover_image_url {
            set.push("cover_image_url = ").push_bind_unseparated(v);
        }
        qb.push(" WHERE id = ").push_bind(id);
        qb.push(format!(" RETURNING {BOOK_COLUMNS}"));

        let book = qb
            .build_query_as::<Book>()
            .fetch_optional(&self.db)
            .await?;
        Ok(book)
    }

    async fn delete(&self, id: i64) -> AppResult<()> {
        let res = sqlx::query("DELETE FROM books WHERE id = $1 AND available")
            .bind(id)
            .execute(&self.db)
            .await?;
        if res.rows_affected() == 1 {
            return Ok(());
        }

        if self.book_exists(id).await? {
            Err(AppError::BookOnLoan)
        } else {
            Err(AppError::NotFound("Book"))
        }
    }

    async fn list(&self, filter: &BookFilter) -> AppResult<Vec<Book>> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {BOOK_COLUMNS} FROM books WHERE TRUE"
        ));
        // strpos keeps `%` and `_` in user input literal, unlike ILIKE.
        if let Some(title) = &filter.title {
            qb.push(" AND strpos(lower(title), lower(")
                .push_bind(title.clone())
                .push(")) > 0");
        }
        if let Some(author) = &filter.author {
            qb.push(" AND strpos(lower(author), lower(")
                .push_bind(author.clone())
                .push(")) > 0");
        }
        if let Some(isbn) = &filter.isbn {
            qb.push(" AND isbn = ").push_bind(isbn.clone());
        }
        if filter.available_only {
            qb.push(" AND available");
        }
        qb.push(" ORDER BY id LIMIT ")
            .push_bind(filter.limit)
            .push(" OFFSET ")
            .push_bind(filter.skip);

        let books = qb.build_query_as::<Book>().fetch_all(&self.db).await?;
        Ok(books)
    }

    async fn list_borrowed_by(&self, user_id: i64) -> AppResult<Vec<Book>> {
        let books = sqlx::query_as::<_, Book>(&format!(
            "SELECT {BOOK_COLUMNS} FROM books WHERE borrower_id = $1 ORDER BY id"
        ))
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;
        Ok(books)
    }

    async fn borrow(&self, id: i64, user_id: i64) -> AppResult<Book> {
        let target = LendingState::Available.borrow(user_id)?;
        let book = sqlx::query_as::<_, Book>(&format!(
            r#"
            UPDATE books
               SET available = $2, borrower_id = $3
             WHERE id = $1 AND available
            RETURNING {BOOK_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(target.is_available())
        .bind(target.borrower_id())
        .fetch_optional(&self.db)
        .await?;
        if let Some(book) = book {
            return Ok(book);
        }

        let current = BookRepository::find_by_id(self, id)
            .await?
            .ok_or(AppError::NotFound("Book"))?;
        current.lending().borrow(user_id)?;
        // Returned again between the update and the probe; still a lost race.
        Err(AppError::NotAvailable)
    }

    async fn return_book(&self, id: i64) -> AppResult<Book> {
        let book = sqlx::query_as::<_, Book>(&format!(
            r#"
            UPDATE books
               SET available = TRUE, borrower_id = NULL
             WHERE id = $1 AND NOT available
            RETURNING {BOOK_COLUMNS}
            "#
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        if let Some(book) = book {
            return Ok(book);
        }

        let current = BookRepository::find_by_id(self, id)
            .await?
            .ok_or(AppError::NotFound("Book"))?;
        current.lending().give_back()?;
        Err(AppError::NotBorrowed)
    }
}
