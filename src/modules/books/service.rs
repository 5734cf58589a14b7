//! Catalog read and write paths.
//!
//! Reads are cache-aside: check the cache, fall back to the store on a miss
//! or cache failure, then populate the cache best-effort. Writes go to the
//! store only and never invalidate cached entries, so a read may return the
//! pre-write snapshot until the entry's TTL elapses.

use std::sync::Arc;
use std::time::Duration;

use bookbay_cache::CacheAdapter;
use bookbay_db::FieldViolation;
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

use super::models::{Book, BookInput};
use super::seed;
use super::store::{BookFilter, BookStore, StoreError};

/// Lifetime of every cached catalog entry.
pub const CACHE_TTL: Duration = Duration::from_secs(300);

/// Cache key layout.
pub mod keys {
    pub const ALL_BOOKS: &str = "books:all";

    pub fn book(id: &str) -> String {
        format!("book:{id}")
    }

    pub fn search(query: &str) -> String {
        format!("search:{}", query.to_lowercase())
    }

    pub fn category(category: &str) -> String {
        format!("category:{}", category.to_lowercase())
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("book not found")]
    NotFound,

    #[error("invalid book")]
    Validation(Vec<FieldViolation>),

    #[error("a book with this {field} already exists")]
    Duplicate { field: &'static str },

    #[error("catalog store unavailable: {0}")]
    Unavailable(String),
}

impl From<StoreError> for CatalogError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Validation(violations) => CatalogError::Validation(violations),
            StoreError::Duplicate { field } => CatalogError::Duplicate { field },
            StoreError::Unavailable(reason) => CatalogError::Unavailable(reason),
        }
    }
}

pub type CatalogResult<T> = Result<T, CatalogError>;

pub struct CatalogService {
    store: Arc<dyn BookStore>,
    cache: CacheAdapter,
}

impl CatalogService {
    pub fn new(store: Arc<dyn BookStore>, cache: CacheAdapter) -> Self {
        Self { store, cache }
    }

    pub fn cache(&self) -> &CacheAdapter {
        &self.cache
    }

    /// Decode a cached value. Undecodable entries count as a miss.
    async fn cached<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.cache.get(key).await?;
        match serde_json::from_str(&raw) {
            Ok(value) => {
                tracing::debug!(key, "catalog cache hit");
                Some(value)
            }
            Err(e) => {
                tracing::warn!(key, error = %e, "discarding undecodable cache entry");
                None
            }
        }
    }

    async fn populate<T: Serialize>(&self, key: &str, value: &T) {
        match serde_json::to_string(value) {
            Ok(raw) => self.cache.set_with_ttl(key, &raw, CACHE_TTL).await,
            Err(e) => tracing::warn!(key, error = %e, "failed to encode cache entry"),
        }
    }

    async fn read_list(&self, key: &str, filter: Option<BookFilter>) -> CatalogResult<Vec<Book>> {
        if let Some(books) = self.cached::<Vec<Book>>(key).await {
            return Ok(books);
        }

        let books = match &filter {
            Some(filter) => self.store.find_by_filter(filter).await?,
            None => self.store.find_all().await?,
        };
        tracing::debug!(key, count = books.len(), "catalog read from store");

        self.populate(key, &books).await;
        Ok(books)
    }

    /// All books, newest first.
    pub async fn books(&self) -> CatalogResult<Vec<Book>> {
        self.read_list(keys::ALL_BOOKS, None).await
    }

    /// One book. An absent book is not cached.
    pub async fn book(&self, id: &str) -> CatalogResult<Option<Book>> {
        let key = keys::book(id);
        if let Some(book) = self.cached::<Book>(&key).await {
            return Ok(Some(book));
        }

        let Some(book) = self.store.find_by_id(id).await? else {
            return Ok(None);
        };
        self.populate(&key, &book).await;
        Ok(Some(book))
    }

    /// Free-text search. A blank query matches nothing and touches neither
    /// cache nor store.
    pub async fn search(&self, query: &str) -> CatalogResult<Vec<Book>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }
        self.read_list(
            &keys::search(query),
            Some(BookFilter::Search(query.to_string())),
        )
        .await
    }

    pub async fn by_category(&self, category: &str) -> CatalogResult<Vec<Book>> {
        self.read_list(
            &keys::category(category),
            Some(BookFilter::Category(category.to_string())),
        )
        .await
    }

    /// Distinct categories, ascending. Always read from the store.
    pub async fn categories(&self) -> CatalogResult<Vec<String>> {
        Ok(self.store.distinct_categories().await?.into_iter().collect())
    }

    pub async fn create(&self, input: BookInput) -> CatalogResult<Book> {
        let book = input.into_new_book().map_err(CatalogError::Validation)?;
        let book = self.store.insert(book).await?;
        tracing::info!(id = %book.id, isbn = %book.isbn, "book added");
        Ok(book)
    }

    pub async fn update(&self, id: &str, input: BookInput) -> CatalogResult<Book> {
        let book = input.into_new_book().map_err(CatalogError::Validation)?;
        let book = self
            .store
            .update_by_id(id, book)
            .await?
            .ok_or(CatalogError::NotFound)?;
        tracing::info!(id = %book.id, "book updated");
        Ok(book)
    }

    pub async fn delete(&self, id: &str) -> CatalogResult<bool> {
        self.store
            .delete_by_id(id)
            .await?
            .ok_or(CatalogError::NotFound)?;
        tracing::info!(id, "book deleted");
        Ok(true)
    }

    /// Load the sample catalog into an empty store. Returns how many books
    /// were inserted.
    pub async fn seed(&self) -> CatalogResult<usize> {
        let existing = self.store.count().await?;
        if existing > 0 {
            tracing::info!(existing, "catalog already populated, skipping seed");
            return Ok(0);
        }

        let inserted = self.store.insert_many(seed::sample_books()).await?;
        tracing::info!(count = inserted.len(), "seeded sample books");
        Ok(inserted.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::books::models::NewBook;
    use crate::modules::books::store::{DocumentBookStore, StoreResult};
    use async_trait::async_trait;
    use bookbay_cache::{CacheError, CacheResult, CacheStore, LocalCache};
    use bookbay_db::Collection;
    use std::collections::BTreeSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Store wrapper counting read queries.
    struct CountingStore {
        inner: DocumentBookStore,
        reads: AtomicUsize,
    }

    impl CountingStore {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                inner: DocumentBookStore::new(Arc::new(Collection::detached())),
                reads: AtomicUsize::new(0),
            })
        }

        fn reads(&self) -> usize {
            self.reads.load(Ordering::SeqCst)
        }

        fn read(&self) {
            self.reads.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl BookStore for CountingStore {
        async fn find_all(&self) -> StoreResult<Vec<Book>> {
            self.read();
            self.inner.find_all().await
        }

        async fn find_by_id(&self, id: &str) -> StoreResult<Option<Book>> {
            self.read();
            self.inner.find_by_id(id).await
        }

        async fn find_by_filter(&self, filter: &BookFilter) -> StoreResult<Vec<Book>> {
            self.read();
            self.inner.find_by_filter(filter).await
        }

        async fn insert(&self, book: NewBook) -> StoreResult<Book> {
            self.inner.insert(book).await
        }

        async fn insert_many(&self, books: Vec<NewBook>) -> StoreResult<Vec<Book>> {
            self.inner.insert_many(books).await
        }

        async fn update_by_id(&self, id: &str, book: NewBook) -> StoreResult<Option<Book>> {
            self.inner.update_by_id(id, book).await
        }

        async fn delete_by_id(&self, id: &str) -> StoreResult<Option<Book>> {
            self.inner.delete_by_id(id).await
        }

        async fn count(&self) -> StoreResult<usize> {
            self.inner.count().await
        }

        async fn distinct_categories(&self) -> StoreResult<BTreeSet<String>> {
            self.read();
            self.inner.distinct_categories().await
        }
    }

    /// Cache backend that fails every call and counts them.
    #[derive(Default)]
    struct FailingCache {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CacheStore for FailingCache {
        fn backend(&self) -> &'static str {
            "failing"
        }

        async fn get(&self, _key: &str) -> CacheResult<Option<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(CacheError::Connection("down".to_string()))
        }

        async fn set_ex(&self, _key: &str, _value: &str, _ttl: Duration) -> CacheResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(CacheError::Connection("down".to_string()))
        }
    }

    fn input(isbn: &str, title: &str, category: &str) -> BookInput {
        BookInput {
            title: title.to_string(),
            author: "Author".to_string(),
            price: Some(12.5),
            description: "Description".to_string(),
            stock: Some(4),
            isbn: isbn.to_string(),
            category: category.to_string(),
            published_date: Some("1999-09-09".to_string()),
        }
    }

    fn service_with(store: Arc<CountingStore>) -> (CatalogService, Arc<LocalCache>) {
        let local = Arc::new(LocalCache::new());
        let service = CatalogService::new(store, CacheAdapter::new(local.clone()));
        (service, local)
    }

    #[tokio::test]
    async fn created_book_reads_back() {
        let store = CountingStore::new();
        let (service, _) = service_with(store);

        let created = service.create(input("1", "Dune", "Science Fiction")).await.unwrap();
        let fetched = service.book(&created.id).await.unwrap().unwrap();

        assert_eq!(fetched, created);
        assert_eq!(fetched.title, "Dune");
        assert_eq!(fetched.price, 12.5);
    }

    #[tokio::test]
    async fn repeated_get_hits_cache() {
        let store = CountingStore::new();
        let (service, _) = service_with(store.clone());
        let created = service.create(input("1", "Dune", "Science Fiction")).await.unwrap();

        let first = service.book(&created.id).await.unwrap();
        let second = service.book(&created.id).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(store.reads(), 1);
    }

    #[tokio::test]
    async fn cached_prices_keep_every_bit() {
        let store = CountingStore::new();
        let (service, _) = service_with(store.clone());
        let mut book = input("1", "Dune", "Science Fiction");
        book.price = Some(2.6512621234376206);
        let created = service.create(book).await.unwrap();

        let miss = service.book(&created.id).await.unwrap().unwrap();
        let hit = service.book(&created.id).await.unwrap().unwrap();

        assert_eq!(store.reads(), 1);
        assert_eq!(hit, miss);
        assert_eq!(hit.price.to_bits(), created.price.to_bits());
    }

    #[tokio::test]
    async fn missing_book_is_not_cached() {
        let store = CountingStore::new();
        let (service, local) = service_with(store.clone());

        assert!(service.book("nope").await.unwrap().is_none());
        assert!(service.book("nope").await.unwrap().is_none());

        assert_eq!(store.reads(), 2);
        assert!(local.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn list_is_stale_until_ttl_elapses() {
        let store = CountingStore::new();
        let (service, _) = service_with(store);
        service.create(input("1", "Dune", "Science Fiction")).await.unwrap();

        assert_eq!(service.books().await.unwrap().len(), 1);

        tokio::time::advance(Duration::from_secs(1)).await;
        service.create(input("2", "Emma", "Romance")).await.unwrap();
        assert_eq!(service.books().await.unwrap().len(), 1);

        tokio::time::advance(CACHE_TTL).await;
        assert_eq!(service.books().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn get_by_id_serves_pre_update_snapshot() {
        let store = CountingStore::new();
        let (service, _) = service_with(store);
        let created = service.create(input("1", "Dune", "Science Fiction")).await.unwrap();
        service.book(&created.id).await.unwrap();

        service
            .update(&created.id, input("1", "Dune Messiah", "Science Fiction"))
            .await
            .unwrap();
        let cached = service.book(&created.id).await.unwrap().unwrap();
        assert_eq!(cached.title, "Dune");

        service.delete(&created.id).await.unwrap();
        assert!(service.book(&created.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn search_and_category_results_are_stale_after_write() {
        let store = CountingStore::new();
        let (service, _) = service_with(store);
        service.create(input("1", "Dune", "Science Fiction")).await.unwrap();

        assert_eq!(service.search("dune").await.unwrap().len(), 1);
        assert_eq!(service.by_category("Science").await.unwrap().len(), 1);

        service.create(input("2", "Dune Messiah", "Science Fiction")).await.unwrap();
        assert_eq!(service.search("DUNE").await.unwrap().len(), 1);
        assert_eq!(service.by_category("science").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn blank_search_touches_nothing() {
        let store = CountingStore::new();
        let failing = Arc::new(FailingCache::default());
        let service = CatalogService::new(store.clone(), CacheAdapter::new(failing.clone()));

        assert!(service.search("").await.unwrap().is_empty());
        assert!(service.search("   ").await.unwrap().is_empty());

        assert_eq!(store.reads(), 0);
        assert_eq!(failing.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn undecodable_cache_entry_is_a_miss() {
        let store = CountingStore::new();
        let (service, local) = service_with(store.clone());
        service.create(input("1", "Dune", "Science Fiction")).await.unwrap();

        local
            .set_ex(keys::ALL_BOOKS, "{not json", CACHE_TTL)
            .await
            .unwrap();
        assert_eq!(service.books().await.unwrap().len(), 1);
        assert_eq!(store.reads(), 1);
    }

    #[tokio::test]
    async fn failing_cache_still_serves_every_read() {
        let store = CountingStore::new();
        let service = CatalogService::new(
            store.clone(),
            CacheAdapter::new(Arc::new(FailingCache::default())),
        );
        let created = service.create(input("1", "Dune", "Science Fiction")).await.unwrap();

        assert_eq!(service.books().await.unwrap().len(), 1);
        assert_eq!(service.book(&created.id).await.unwrap(), Some(created));
        assert_eq!(service.search("dune").await.unwrap().len(), 1);
        assert_eq!(service.by_category("fiction").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn disconnected_cache_reads_from_store_every_time() {
        let store = CountingStore::new();
        let service = CatalogService::new(store.clone(), CacheAdapter::disconnected());
        service.create(input("1", "Dune", "Science Fiction")).await.unwrap();

        service.books().await.unwrap();
        service.books().await.unwrap();
        assert_eq!(store.reads(), 2);
    }

    #[tokio::test]
    async fn duplicate_isbn_is_reported() {
        let store = CountingStore::new();
        let (service, _) = service_with(store);
        service.create(input("1", "Dune", "Science Fiction")).await.unwrap();

        let err = service
            .create(input("1", "Impostor", "Fiction"))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::Duplicate { field: "isbn" }));
        assert_eq!(service.categories().await.unwrap(), vec!["Science Fiction"]);
    }

    #[tokio::test]
    async fn invalid_input_never_reaches_store() {
        let store = CountingStore::new();
        let (service, _) = service_with(store);

        let err = service
            .create(BookInput {
                price: Some(-3.0),
                ..input("1", "Dune", "Science Fiction")
            })
            .await
            .unwrap_err();
        let CatalogError::Validation(violations) = err else {
            panic!("expected validation error");
        };
        assert_eq!(violations[0].field, "price");
        assert!(service.categories().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_and_delete_of_missing_book_are_not_found() {
        let store = CountingStore::new();
        let (service, _) = service_with(store);

        assert!(matches!(
            service.update("missing", input("1", "Dune", "Fiction")).await,
            Err(CatalogError::NotFound)
        ));
        assert!(matches!(
            service.delete("missing").await,
            Err(CatalogError::NotFound)
        ));
    }

    #[tokio::test]
    async fn seeding_an_empty_store() {
        let store = CountingStore::new();
        let (service, _) = service_with(store);

        assert_eq!(service.seed().await.unwrap(), 5);
        assert_eq!(
            service.categories().await.unwrap(),
            vec!["Fiction", "Romance", "Science Fiction"]
        );

        assert_eq!(service.seed().await.unwrap(), 0);
        assert_eq!(service.books().await.unwrap().len(), 5);
    }

    #[test]
    fn cache_keys_are_lowercased() {
        assert_eq!(keys::search("Gatsby"), "search:gatsby");
        assert_eq!(keys::category("Science Fiction"), "category:science fiction");
        assert_eq!(keys::book("abc"), "book:abc");
    }
}
