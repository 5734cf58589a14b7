//! Store adapter for the book collection.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use bookbay_db::{Collection, DbError, FieldViolation, Query};
use thiserror::Error;
use time::OffsetDateTime;

use super::models::{Book, NewBook};

/// Most results a search returns.
pub const SEARCH_LIMIT: usize = 50;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("book failed validation")]
    Validation(Vec<FieldViolation>),

    #[error("a book with this {field} already exists")]
    Duplicate { field: &'static str },

    #[error("book store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Validation { violations, .. } => StoreError::Validation(violations),
            DbError::Duplicate { field, .. } => StoreError::Duplicate { field },
            other => StoreError::Unavailable(other.to_string()),
        }
    }
}

/// Field queries against the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookFilter {
    /// Case-insensitive substring of title, author, description or category.
    Search(String),
    /// Case-insensitive substring of category.
    Category(String),
}

#[async_trait]
pub trait BookStore: Send + Sync {
    /// Every book, newest first.
    async fn find_all(&self) -> StoreResult<Vec<Book>>;

    async fn find_by_id(&self, id: &str) -> StoreResult<Option<Book>>;

    /// Search results keep natural order and stop at [`SEARCH_LIMIT`];
    /// category results are newest first and uncapped.
    async fn find_by_filter(&self, filter: &BookFilter) -> StoreResult<Vec<Book>>;

    async fn insert(&self, book: NewBook) -> StoreResult<Book>;

    /// Insert every book or none of them.
    async fn insert_many(&self, books: Vec<NewBook>) -> StoreResult<Vec<Book>>;

    /// Replace the mutable fields of `id`, keeping its id and `createdAt`.
    async fn update_by_id(&self, id: &str, book: NewBook) -> StoreResult<Option<Book>>;

    async fn delete_by_id(&self, id: &str) -> StoreResult<Option<Book>>;

    async fn count(&self) -> StoreResult<usize>;

    async fn distinct_categories(&self) -> StoreResult<BTreeSet<String>>;
}

/// [`BookStore`] over a `bookbay-db` collection.
#[derive(Clone)]
pub struct DocumentBookStore {
    books: Arc<Collection<Book>>,
}

impl DocumentBookStore {
    pub fn new(books: Arc<Collection<Book>>) -> Self {
        Self { books }
    }
}

fn newest_first(a: &Book, b: &Book) -> std::cmp::Ordering {
    b.created_at.cmp(&a.created_at)
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

#[async_trait]
impl BookStore for DocumentBookStore {
    async fn find_all(&self) -> StoreResult<Vec<Book>> {
        Ok(self.books.find(Query::all().sort_by(newest_first)).await?)
    }

    async fn find_by_id(&self, id: &str) -> StoreResult<Option<Book>> {
        Ok(self.books.find_by_id(id).await?)
    }

    async fn find_by_filter(&self, filter: &BookFilter) -> StoreResult<Vec<Book>> {
        let query = match filter {
            BookFilter::Search(text) => {
                let needle = text.to_lowercase();
                Query::all()
                    .filter(move |book: &Book| {
                        contains_ci(&book.title, &needle)
                            || contains_ci(&book.author, &needle)
                            || contains_ci(&book.description, &needle)
                            || contains_ci(&book.category, &needle)
                    })
                    .limit(SEARCH_LIMIT)
            }
            BookFilter::Category(category) => {
                let needle = category.to_lowercase();
                Query::all()
                    .filter(move |book: &Book| contains_ci(&book.category, &needle))
                    .sort_by(newest_first)
            }
        };
        Ok(self.books.find(query).await?)
    }

    async fn insert(&self, book: NewBook) -> StoreResult<Book> {
        let book = Book::from_new(book, OffsetDateTime::now_utc());
        Ok(self.books.insert(book).await?)
    }

    async fn insert_many(&self, books: Vec<NewBook>) -> StoreResult<Vec<Book>> {
        let now = OffsetDateTime::now_utc();
        let books = books
            .into_iter()
            .map(|book| Book::from_new(book, now))
            .collect();
        Ok(self.books.insert_many(books).await?)
    }

    async fn update_by_id(&self, id: &str, book: NewBook) -> StoreResult<Option<Book>> {
        let Some(existing) = self.books.find_by_id(id).await? else {
            return Ok(None);
        };
        let replacement = Book::from_new(book, existing.created_at);
        Ok(self.books.replace_by_id(id, replacement).await?)
    }

    async fn delete_by_id(&self, id: &str) -> StoreResult<Option<Book>> {
        Ok(self.books.delete_by_id(id).await?)
    }

    async fn count(&self) -> StoreResult<usize> {
        Ok(self.books.count().await?)
    }

    async fn distinct_categories(&self) -> StoreResult<BTreeSet<String>> {
        let books = self.books.find(Query::all()).await?;
        Ok(books.into_iter().map(|book| book.category).collect())
    }
}
