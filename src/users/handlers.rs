use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::extractors::AuthUser,
    books::repo_types::Book,
    error::AppResult,
    extract::{AppJson, AppPath},
    state::AppState,
    users::{
        dto::{UpdateProfileRequest, UserResponse},
        services,
    },
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/users/me",
            get(get_me).put(update_me).patch(update_me),
        )
        .route("/users/me/books", get(my_books))
        .route("/users/:id", get(get_user).delete(delete_user))
}

#[instrument(skip_all)]
pub async fn get_me(AuthUser(user): AuthUser) -> Json<UserResponse> {
    Json(user.into())
}

#[instrument(skip(state, user, payload))]
pub async fn update_me(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppJson(payload): AppJson<UpdateProfileRequest>,
) -> AppResult<Json<UserResponse>> {
    let updated = services::update_profile(state.users.as_ref(), &user, payload).await?;
    Ok(Json(updated.into()))
}

#[instrument(skip(state, user))]
pub async fn my_books(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<Vec<Book>>> {
    let books = services::borrowed_books(state.books.as_ref(), user.id).await?;
    Ok(Json(books))
}

#[instrument(skip(state, _caller))]
pub async fn get_user(
    State(state): State<AppState>,
    _caller: AuthUser,
    AppPath(id): AppPath<i64>,
) -> AppResult<Json<UserResponse>> {
    let user = services::get_user(state.users.as_ref(), id).await?;
    Ok(Json(user.into()))
}

#[instrument(skip(state, caller))]
pub async fn delete_user(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    AppPath(id): AppPath<i64>,
) -> AppResult<StatusCode> {
    services::delete_user(state.users.as_ref(), &caller, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
