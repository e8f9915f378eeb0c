//! Body, query and path extractors that reject with `AppError`, so malformed
//! input gets the same `400 {"detail": ...}` body as every other failure.

use axum::{
    async_trait,
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        FromRequest, FromRequestParts, Path, Query, Request,
    },
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::AppError;

pub struct AppJson<T>(pub T);

pub struct AppQuery<T>(pub T);

pub struct AppPath<T>(pub T);

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        debug!(reason = %rejection.body_text(), "json body rejected");
        AppError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        debug!(reason = %rejection.body_text(), "query rejected");
        AppError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        debug!(reason = %rejection.body_text(), "path rejected");
        AppError::Validation(rejection.body_text())
    }
}

#[async_trait]
impl<T, S> FromRequest<S> for AppJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(AppJson(value))
    }
}

#[async_trait]
impl<T, S> FromRequestParts<S> for AppQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(AppQuery(value))
    }
}

#[async_trait]
impl<T, S> FromRequestParts<S> for AppPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state).await?;
        Ok(AppPath(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::books::dto::{CreateBookRequest, Pagination};
    use axum::{
        body::Body,
        http::{header::CONTENT_TYPE, StatusCode},
        response::IntoResponse,
    };

    #[tokio::test]
    async fn missing_body_field_is_a_validation_error() {
        let req = axum::http::Request::builder()
            .method("POST")
            .uri("/books")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"author": "Frank Herbert", "isbn": "111"}"#))
            .unwrap();

        let err = match AppJson::<CreateBookRequest>::from_request(req, &()).await {
            Ok(_) => panic!("body without title must be rejected"),
            Err(e) => e,
        };
        assert!(matches!(err, AppError::Validation(_)));

        let res = err.into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(body["detail"].as_str().unwrap().contains("title"));
    }

    #[tokio::test]
    async fn non_json_content_type_is_a_validation_error() {
        let req = axum::http::Request::builder()
            .method("POST")
            .uri("/books")
            .body(Body::from("title=Dune"))
            .unwrap();
        assert!(matches!(
            AppJson::<CreateBookRequest>::from_request(req, &()).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn malformed_query_is_a_validation_error() {
        let (mut parts, _) = axum::http::Request::builder()
            .uri("/books/available?limit=lots")
            .body(())
            .unwrap()
            .into_parts();
        assert!(matches!(
            AppQuery::<Pagination>::from_request_parts(&mut parts, &()).await,
            Err(AppError::Validation(_))
        ));
    }
}
