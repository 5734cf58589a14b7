//! HTTP handlers for the catalog, mounted under `/api/books`.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use bookbay_http::error::AppError;
use serde::Deserialize;

use super::models::{Book, BookInput};
use super::service::{CatalogError, CatalogService};

type Catalog = State<Arc<CatalogService>>;

pub fn router(catalog: Arc<CatalogService>) -> Router {
    Router::new()
        .route("/", get(list_books).post(add_book))
        .route("/search", get(search_books))
        .route("/categories", get(list_categories))
        .route("/category/{category}", get(books_by_category))
        .route(
            "/{id}",
            get(get_book).put(update_book).delete(delete_book),
        )
        .with_state(catalog)
}

/// Map a catalog failure to its HTTP form. `operation` is the only message
/// a client sees for store and conflict failures.
fn catalog_error(err: CatalogError, operation: &str) -> AppError {
    match err {
        CatalogError::NotFound => AppError::not_found("Book not found"),
        CatalogError::Validation(violations) => {
            tracing::warn!(operation, ?violations, "rejected book input");
            AppError::validation(to_details(&violations), operation)
        }
        CatalogError::Duplicate { field } => {
            tracing::warn!(operation, field, "duplicate book");
            AppError::conflict(
                vec![serde_json::json!({ "field": field, "message": "already exists" })],
                operation,
            )
        }
        CatalogError::Unavailable(reason) => {
            tracing::error!(operation, %reason, "catalog store unavailable");
            AppError::unavailable(operation)
        }
    }
}

fn to_details<T: serde::Serialize>(violations: &[T]) -> Vec<serde_json::Value> {
    violations
        .iter()
        .filter_map(|v| serde_json::to_value(v).ok())
        .collect()
}

fn body(
    payload: Result<Json<BookInput>, JsonRejection>,
    operation: &str,
) -> Result<BookInput, AppError> {
    payload.map(|Json(input)| input).map_err(|rejection| {
        tracing::warn!(operation, error = %rejection, "malformed book payload");
        AppError::bad_request(operation)
    })
}

async fn list_books(State(catalog): Catalog) -> Result<Json<Vec<Book>>, AppError> {
    catalog
        .books()
        .await
        .map(Json)
        .map_err(|e| catalog_error(e, "Failed to fetch books"))
}

async fn get_book(
    State(catalog): Catalog,
    Path(id): Path<String>,
) -> Result<Json<Book>, AppError> {
    catalog
        .book(&id)
        .await
        .map_err(|e| catalog_error(e, "Failed to fetch book"))?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Book not found"))
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    #[serde(default)]
    query: String,
}

async fn search_books(
    State(catalog): Catalog,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<Book>>, AppError> {
    catalog
        .search(&params.query)
        .await
        .map(Json)
        .map_err(|e| catalog_error(e, "Failed to search books"))
}

async fn books_by_category(
    State(catalog): Catalog,
    Path(category): Path<String>,
) -> Result<Json<Vec<Book>>, AppError> {
    catalog
        .by_category(&category)
        .await
        .map(Json)
        .map_err(|e| catalog_error(e, "Failed to fetch books by category"))
}

async fn list_categories(State(catalog): Catalog) -> Result<Json<Vec<String>>, AppError> {
    catalog
        .categories()
        .await
        .map(Json)
        .map_err(|e| catalog_error(e, "Failed to fetch categories"))
}

async fn add_book(
    State(catalog): Catalog,
    payload: Result<Json<BookInput>, JsonRejection>,
) -> Result<(StatusCode, Json<Book>), AppError> {
    const OPERATION: &str = "Failed to add book";
    let input = body(payload, OPERATION)?;
    let book = catalog
        .create(input)
        .await
        .map_err(|e| catalog_error(e, OPERATION))?;
    Ok((StatusCode::CREATED, Json(book)))
}

async fn update_book(
    State(catalog): Catalog,
    Path(id): Path<String>,
    payload: Result<Json<BookInput>, JsonRejection>,
) -> Result<Json<Book>, AppError> {
    const OPERATION: &str = "Failed to update book";
    let input = body(payload, OPERATION)?;
    catalog
        .update(&id, input)
        .await
        .map(Json)
        .map_err(|e| catalog_error(e, OPERATION))
}

async fn delete_book(
    State(catalog): Catalog,
    Path(id): Path<String>,
) -> Result<Json<bool>, AppError> {
    catalog
        .delete(&id)
        .await
        .map(Json)
        .map_err(|e| catalog_error(e, "Failed to delete book"))
}
