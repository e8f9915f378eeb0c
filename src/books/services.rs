use tracing::{info, instrument, warn};

use crate::{
    auth::services::require_non_empty,
    books::{
        dto::{CreateBookRequest, ListBooksQuery, Pagination, UpdateBookRequest},
        repo::BookRepository,
        repo_types::{Book, BookChanges, BookFilter, NewBook},
    },
    error::{AppError, AppResult},
};

fn non_blank(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_owned()).filter(|s| !s.is_empty())
}

#[instrument(skip(books, req), fields(isbn = %req.isbn))]
pub async fn create_book(books: &dyn BookRepository, req: CreateBookRequest) -> AppResult<Book> {
    let isbn = req.isbn.trim().to_owned();
    require_non_empty("title", &req.title)?;
    require_non_empty("author", &req.author)?;
    require_non_empty("isbn", &isbn)?;

    if books.find_by_isbn(&isbn).await?.is_some() {
        warn!("isbn already in catalog");
        return Err(AppError::DuplicateIsbn);
    }

    let book = books
        .create(NewBook {
            title: req.title,
            author: req.author,
            isbn,
            publication_year: req.publication_year,
            description: req.description,
            genre: req.genre,
            language: req.language,
            cover_image_url: req.cover_image_url,
        })
        .await?;
    info!(book_id = book.id, "book created");
    Ok(book)
}

pub async fn get_book(books: &dyn BookRepository, id: i64) -> AppResult<Book> {
    books
        .find_by_id(id)
        .await?
        .ok_or(AppError::NotFound("Book"))
}

/// Merge-patch over the catalog fields. Lending state is never touched here.
#[instrument(skip(books, req))]
pub async fn update_book(
    books: &dyn BookRepository,
    id: i64,
    req: UpdateBookRequest,
) -> AppResult<Book> {
    for (field, value) in [("title", &req.title), ("author", &req.author), ("isbn", &req.isbn)] {
        if let Some(v) = value {
            require_non_empty(field, v)?;
        }
    }
    let isbn = req.isbn.map(|s| s.trim().to_owned());
    if let Some(isbn) = &isbn {
        if let Some(other) = books.find_by_isbn(isbn).await? {
            if other.id != id {
                warn!(isbn = %isbn, "isbn already in catalog");
                return Err(AppError::DuplicateIsbn);
            }
        }
    }

    let changes = BookChanges {
        title: req.title,
        author: req.author,
        isbn,
        publication_year: req.publication_year,
        description: req.description,
        genre: req.genre,
        language: req.language,
        cover_image_url: req.cover_image_url,
    };
    let book = books
        .update(id, changes)
        .await?
        .ok_or(AppError::NotFound("Book"))?;
    info!(book_id = book.id, "book updated");
    Ok(book)
}

/// Borrowed books cannot be deleted; they must be returned first.
#[instrument(skip(books))]
pub async fn delete_book(books: &dyn BookRepository, id: i64) -> AppResult<()> {
    books.delete(id).await?;
    info!(book_id = id, "book deleted");
    Ok(())
}

pub async fn list_books(books: &dyn BookRepository, q: ListBooksQuery) -> AppResult<Vec<Book>> {
    let filter = BookFilter {
        title: non_blank(q.title),
        author: non_blank(q.author),
        isbn: non_blank(q.isbn),
        available_only: false,
        skip: i64::from(q.skip),
        limit: i64::from(q.limit),
    };
    books.list(&filter).await
}

pub async fn list_available(books: &dyn BookRepository, p: Pagination) -> AppResult<Vec<Book>> {
    let filter = BookFilter {
        available_only: true,
        skip: i64::from(p.skip),
        limit: i64::from(p.limit),
        ..Default::default()
    };
    books.list(&filter).await
}

#[instrument(skip(books))]
pub async fn borrow_book(books: &dyn BookRepository, book_id: i64, user_id: i64) -> AppResult<Book> {
    match books.borrow(book_id, user_id).await {
        Ok(book) => {
            debug_assert!(book.is_consistent());
            info!("book borrowed");
            Ok(book)
        }
        Err(e) => {
            warn!(error = %e, "borrow refused");
            Err(e)
        }
    }
}

#[instrument(skip(books))]
pub async fn return_book(books: &dyn BookRepository, book_id: i64) -> AppResult<Book> {
    match books.return_book(book_id).await {
        Ok(book) => {
            debug_assert!(book.is_consistent());
            info!("book returned");
            Ok(book)
        }
        Err(e) => {
            warn!(error = %e, "return refused");
            Err(e)
        }
    }
}
