//! In-process store used by unit tests in place of PostgreSQL.
//!
//! Mirrors the unique keys (email, username, isbn) and the delete guards of
//! the SQL schema, and holds one lock across every check-and-set so
//! borrow/return stay atomic under concurrent callers. Borrower ids are not
//! checked against the users table.

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::Mutex;

use crate::{
    books::{
        lending::LendingState,
        repo::BookRepository,
        repo_types::{Book, BookChanges, BookFilter, NewBook},
    },
    error::{AppError, AppResult},
    users::{
        repo::UserRepository,
        repo_types::{NewUser, User, UserChanges},
    },
};

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Tables>,
}

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    books: Vec<Book>,
    next_user_id: i64,
    next_book_id: i64,
}

// Flag and reference are written from one state so they cannot drift apart.
fn apply(book: &mut Book, state: LendingState) {
    book.available = state.is_available();
    book.borrower_id = state.borrower_id();
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn find_by_id(&self, id: i64) -> AppResult<Option<User>> {
        let t = self.inner.lock().await;
        Ok(t.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let t = self.inner.lock().await;
        Ok(t.users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let t = self.inner.lock().await;
        Ok(t.users.iter().find(|u| u.username == username).cloned())
    }

    async fn create(&self, new: NewUser) -> AppResult<User> {
        let mut t = self.inner.lock().await;
        if t.users.iter().any(|u| u.email == new.email) {
            return Err(AppError::DuplicateEmail);
        }
        if t.users.iter().any(|u| u.username == new.username) {
            return Err(AppError::DuplicateUsername);
        }
        t.next_user_id += 1;
        let user = User {
            id: t.next_user_id,
            username: new.username,
            email: new.email,
            password_hash: new.password_hash,
            is_active: true,
            created_at: OffsetDateTime::now_utc(),
        };
        t.users.push(user.clone());
        Ok(user)
    }

    async fn update(&self, id: i64, changes: UserChanges) -> AppResult<Option<User>> {
        let mut t = self.inner.lock().await;
        if let Some(email) = &changes.email {
            if t.users.iter().any(|u| u.id != id && &u.email == email) {
                return Err(AppError::DuplicateEmail);
            }
        }
        if let Some(username) = &changes.username {
            if t.users.iter().any(|u| u.id != id && &u.username == username) {
                return Err(AppError::DuplicateUsername);
            }
        }
        let Some(user) = t.users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        if let Some(v) = changes.username {
            user.username = v;
        }
        if let Some(v) = changes.email {
            user.email = v;
        }
        if let Some(v) = changes.password_hash {
            user.password_hash = v;
        }
        Ok(Some(user.clone()))
    }

    async fn delete(&self, id: i64) -> AppResult<()> {
        let mut t = self.inner.lock().await;
        let Some(pos) = t.users.iter().position(|u| u.id == id) else {
            return Err(AppError::NotFound("User"));
        };
        if t.books.iter().any(|b| b.borrower_id == Some(id)) {
            return Err(AppError::UserHasLoans);
        }
        t.users.remove(pos);
        Ok(())
    }
}

#[async_trait]
impl BookRepository for MemoryStore {
    async fn find_by_id(&self, id: i64) -> AppResult<Option<Book>> {
        let t = self.inner.lock().await;
        Ok(t.books.iter().find(|b| b.id == id).cloned())
    }

    async fn find_by_isbn(&self, isbn: &str) -> AppResult<Option<Book>> {
        let t = self.inner.lock().await;
        Ok(t.books.iter().find(|b| b.isbn == isbn).cloned())
    }

    async fn create(&self, new: NewBook) -> AppResult<Book> {
        let mut t = self.inner.lock().await;
        if t.books.iter().any(|b| b.isbn == new.isbn) {
            return Err(AppError::DuplicateIsbn);
        }
        t.next_book_id += 1;
        let book = Book {
            id: t.next_book_id,
            title: new.title,
            author: new.author,
            isbn: new.isbn,
            publication_year: new.publication_year,
            description: new.description,
            genre: new.genre,
            language: new.language,
            cover_image_url: new.cover_image_url,
            available: true,
            borrower_id: None,
            created_at: OffsetDateTime::now_utc(),
        };
        t.books.push(book.clone());
        Ok(book)
    }

    async fn update(&self, id: i64, changes: BookChanges) -> AppResult<Option<Book>> {
        let mut t = self.inner.lock().await;
        if let Some(isbn) = &changes.isbn {
            if t.books.iter().any(|b| b.id != id && &b.isbn == isbn) {
                return Err(AppError::DuplicateIsbn);
            }
        }
        let Some(book) = t.books.iter_mut().find(|b| b.id == id) else {
            return Ok(None);
        };
        if let Some(v) = changes.title {
            book.title = v;
        }
        if let Some(v) = changes.author {
            book.author = v;
        }
        if let Some(v) = changes.isbn {
            book.isbn = v;
        }
        if let Some(v) = changes.publication_year {
            book.publication_year = v;
        }
        if let Some(v) = changes.description {
            book.description = v;
        }
        if let Some(v) = changes.genre {
            book.genre = v;
        }
        if let Some(v) = changes.language {
            book.language = v;
        }
        if let Some(v) = changes.cover_image_url {
            book.cover_image_url = v;
        }
        Ok(Some(book.clone()))
    }

    async fn delete(&self, id: i64) -> AppResult<()> {
        let mut t = self.inner.lock().await;
        let Some(pos) = t.books.iter().position(|b| b.id == id) else {
            return Err(AppError::NotFound("Book"));
        };
        if !t.books[pos].available {
            return Err(AppError::BookOnLoan);
        }
        t.books.remove(pos);
        Ok(())
    }

    async fn list(&self, filter: &BookFilter) -> AppResult<Vec<Book>> {
        let t = self.inner.lock().await;
        let skip = usize::try_from(filter.skip).unwrap_or(0);
        let limit = usize::try_from(filter.limit).unwrap_or(0);
        Ok(t.books
            .iter()
            .filter(|b| filter.title.as_deref().map_or(true, |q| contains_ci(&b.title, q)))
            .filter(|b| filter.author.as_deref().map_or(true, |q| contains_ci(&b.author, q)))
            .filter(|b| filter.isbn.as_deref().map_or(true, |q| b.isbn == q))
            .filter(|b| !filter.available_only || b.available)
            .skip(skip)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn list_borrowed_by(&self, user_id: i64) -> AppResult<Vec<Book>> {
        let t = self.inner.lock().await;
        Ok(t.books
            .iter()
            .filter(|b| b.borrower_id == Some(user_id))
            .cloned()
            .collect())
    }

    async fn borrow(&self, id: i64, user_id: i64) -> AppResult<Book> {
        let mut t = self.inner.lock().await;
        let Some(book) = t.books.iter_mut().find(|b| b.id == id) else {
            return Err(AppError::NotFound("Book"));
        };
        let next = book.lending().borrow(user_id)?;
        apply(book, next);
        Ok(book.clone())
    }

    async fn return_book(&self, id: i64) -> AppResult<Book> {
        let mut t = self.inner.lock().await;
        let Some(book) = t.books.iter_mut().find(|b| b.id == id) else {
            return Err(AppError::NotFound("Book"));
        };
        let next = book.lending().give_back()?;
        apply(book, next);
        Ok(book.clone())
    }
}
