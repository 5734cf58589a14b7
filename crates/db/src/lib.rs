//! Document store for the BookBay services.
//!
//! A [`Database`] hands out typed [`Collection`]s keyed by
//! [`Document::COLLECTION`]. Collections enforce unique indexes and run each
//! document's validators before any write.

use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

pub mod collection;
pub mod error;

pub use collection::{Collection, Document, Query};
pub use error::{DbError, DbResult, FieldViolation};

const MEMORY_SCHEME: &str = "memory://";

/// Handle to a named document database. Cheap to clone.
#[derive(Clone)]
pub struct Database {
    name: Arc<str>,
    collections: Arc<DashMap<&'static str, Arc<dyn Any + Send + Sync>>>,
    open: Arc<AtomicBool>,
}

impl Database {
    /// Connect to the database addressed by `url`.
    ///
    /// Only `memory://<name>` is supported: the database lives in this process.
    pub fn connect(url: &str) -> DbResult<Self> {
        let name = url
            .strip_prefix(MEMORY_SCHEME)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| DbError::UnsupportedUrl(url.to_string()))?;

        tracing::info!(target: "bookbay-db", database = name, "document store connected");
        Ok(Self::in_memory(name))
    }

    pub fn in_memory(name: &str) -> Self {
        Self {
            name: Arc::from(name),
            collections: Arc::new(DashMap::new()),
            open: Arc::new(AtomicBool::new(true)),
        }
    }

    /// The collection for `D`, created on first use.
    pub fn collection<D: Document>(&self) -> DbResult<Arc<Collection<D>>> {
        let entry = self
            .collections
            .entry(D::COLLECTION)
            .or_insert_with(|| {
                Arc::new(Collection::<D>::new(self.open.clone())) as Arc<dyn Any + Send + Sync>
            })
            .clone();

        entry
            .downcast::<Collection<D>>()
            .map_err(|_| DbError::CollectionType(D::COLLECTION))
    }

    /// Refuse every further operation on every collection.
    pub fn close(&self) {
        self.open.store(false, Ordering::Release);
        tracing::info!(target: "bookbay-db", database = %self.name, "document store closed");
    }
}
