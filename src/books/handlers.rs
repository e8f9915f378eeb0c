use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::extractors::AuthUser,
    books::{
        dto::{CreateBookRequest, ListBooksQuery, Pagination, UpdateBookRequest},
        repo_types::Book,
        services,
    },
    error::AppResult,
    extract::{AppJson, AppPath, AppQuery},
    state::AppState,
};

// Every catalog route requires a resolved caller.
pub fn book_routes() -> Router<AppState> {
    Router::new()
        .route("/books", get(list_books).post(create_book))
        .route("/books/available", get(list_available))
        .route(
            "/books/:id",
            get(get_book)
                .put(update_book)
                .patch(update_book)
                .delete(delete_book),
        )
        .route("/books/:id/borrow", post(borrow_book))
        .route("/books/:id/return", post(return_book))
}

#[instrument(skip(state, _caller))]
pub async fn list_books(
    State(state): State<AppState>,
    _caller: AuthUser,
    AppQuery(q): AppQuery<ListBooksQuery>,
) -> AppResult<Json<Vec<Book>>> {
    let books = services::list_books(state.books.as_ref(), q).await?;
    Ok(Json(books))
}

#[instrument(skip(state, _caller))]
pub async fn list_available(
    State(state): State<AppState>,
    _caller: AuthUser,
    AppQuery(p): AppQuery<Pagination>,
) -> AppResult<Json<Vec<Book>>> {
    let books = services::list_available(state.books.as_ref(), p).await?;
    Ok(Json(books))
}

#[instrument(skip(state, _caller))]
pub async fn get_book(
    State(state): State<AppState>,
    _caller: AuthUser,
    AppPath(id): AppPath<i64>,
) -> AppResult<Json<Book>> {
    let book = services::get_book(state.books.as_ref(), id).await?;
    Ok(Json(book))
}

#[instrument(skip(state, _caller, payload))]
pub async fn create_book(
    State(state): State<AppState>,
    _caller: AuthUser,
    AppJson(payload): AppJson<CreateBookRequest>,
) -> AppResult<(StatusCode, Json<Book>)> {
    let book = services::create_book(state.books.as_ref(), payload).await?;
    Ok((StatusCode::CREATED, Json(book)))
}

#[instrument(skip(state, _caller, payload))]
pub async fn update_book(
    State(state): State<AppState>,
    _caller: AuthUser,
    AppPath(id): AppPath<i64>,
    AppJson(payload): AppJson<UpdateBookRequest>,
) -> AppResult<Json<Book>> {
    let book = services::update_book(state.books.as_ref(), id, payload).await?;
    Ok(Json(book))
}

#[instrument(skip(state, _caller))]
pub async fn delete_book(
    State(state): State<AppState>,
    _caller: AuthUser,
    AppPath(id): AppPath<i64>,
) -> AppResult<StatusCode> {
    services::delete_book(state.books.as_ref(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, user), fields(user_id = user.id))]
pub async fn borrow_book(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppPath(id): AppPath<i64>,
) -> AppResult<Json<Book>> {
    let book = services::borrow_book(state.books.as_ref(), id, user.id).await?;
    Ok(Json(book))
}

#[instrument(skip(state, user), fields(user_id = user.id))]
pub async fn return_book(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppPath(id): AppPath<i64>,
) -> AppResult<Json<Book>> {
    let book = services::return_book(state.books.as_ref(), id).await?;
    Ok(Json(book))
}
