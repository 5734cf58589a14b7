//! Typed document collections.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{DbError, DbResult, FieldViolation};

/// An entity that can be persisted in a [`Collection`].
pub trait Document: Clone + Send + Sync + 'static {
    /// Name of the collection holding documents of this type.
    const COLLECTION: &'static str;

    fn id(&self) -> &str;

    /// Replace the identifier. Called by the store on insert.
    fn assign_id(&mut self, id: String);

    /// Fields carrying a unique index, with their current values.
    fn unique_fields(&self) -> Vec<(&'static str, String)> {
        Vec::new()
    }

    /// Schema constraints, run before every insert and replace.
    fn validate(&self) -> Result<(), Vec<FieldViolation>> {
        Ok(())
    }
}

type Predicate<D> = Box<dyn Fn(&D) -> bool + Send + Sync>;
type Comparator<D> = Box<dyn Fn(&D, &D) -> Ordering + Send + Sync>;

/// Filter, order and limit for [`Collection::find`].
///
/// Without a sort the result is in natural (insertion) order. Sorting is
/// stable, so equal keys keep insertion order.
pub struct Query<D> {
    filter: Option<Predicate<D>>,
    sort: Option<Comparator<D>>,
    limit: Option<usize>,
}

impl<D> Query<D> {
    pub fn all() -> Self {
        Self {
            filter: None,
            sort: None,
            limit: None,
        }
    }

    pub fn filter(mut self, predicate: impl Fn(&D) -> bool + Send + Sync + 'static) -> Self {
        self.filter = Some(Box::new(predicate));
        self
    }

    pub fn sort_by(mut self, compare: impl Fn(&D, &D) -> Ordering + Send + Sync + 'static) -> Self {
        self.sort = Some(Box::new(compare));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    fn matches(&self, doc: &D) -> bool {
        self.filter.as_ref().map_or(true, |f| f(doc))
    }
}

impl<D> Default for Query<D> {
    fn default() -> Self {
        Self::all()
    }
}

struct Inner<D> {
    docs: BTreeMap<u64, D>,
    ids: HashMap<String, u64>,
    unique: HashMap<(&'static str, String), String>,
    next_seq: u64,
}

impl<D: Document> Inner<D> {
    fn new() -> Self {
        Self {
            docs: BTreeMap::new(),
            ids: HashMap::new(),
            unique: HashMap::new(),
            next_seq: 0,
        }
    }

    /// First unique field of `doc` already owned by a document other than `owner`.
    fn conflicting_field(&self, doc: &D, owner: Option<&str>) -> Option<&'static str> {
        doc.unique_fields().into_iter().find_map(|(field, value)| {
            match self.unique.get(&(field, value)) {
                Some(holder) if Some(holder.as_str()) != owner => Some(field),
                _ => None,
            }
        })
    }

    fn index(&mut self, doc: &D) {
        for key in doc.unique_fields() {
            self.unique.insert(key, doc.id().to_string());
        }
    }

    fn unindex(&mut self, doc: &D) {
        for key in doc.unique_fields() {
            self.unique.remove(&key);
        }
    }

    fn push(&mut self, doc: D) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.index(&doc);
        self.ids.insert(doc.id().to_string(), seq);
        self.docs.insert(seq, doc);
    }
}

/// In-process collection of one document type.
///
/// Every write validates the document and checks unique indexes before
/// touching state, so a rejected write leaves the collection unchanged.
pub struct Collection<D: Document> {
    inner: RwLock<Inner<D>>,
    open: Arc<AtomicBool>,
}

impl<D: Document> Collection<D> {
    pub(crate) fn new(open: Arc<AtomicBool>) -> Self {
        Self {
            inner: RwLock::new(Inner::new()),
            open,
        }
    }

    /// Standalone collection, not attached to a [`crate::Database`].
    pub fn detached() -> Self {
        Self::new(Arc::new(AtomicBool::new(true)))
    }

    fn ensure_open(&self) -> DbResult<()> {
        if self.open.load(AtomicOrdering::Acquire) {
            Ok(())
        } else {
            Err(DbError::Unavailable(format!(
                "collection '{}' is closed",
                D::COLLECTION
            )))
        }
    }

    fn check(doc: &D) -> DbResult<()> {
        doc.validate().map_err(|violations| DbError::Validation {
            collection: D::COLLECTION,
            violations,
        })
    }

    pub async fn find(&self, query: Query<D>) -> DbResult<Vec<D>> {
        self.ensure_open()?;
        let inner = self.inner.read().await;

        let mut docs: Vec<D> = inner
            .docs
            .values()
            .filter(|doc| query.matches(*doc))
            .cloned()
            .collect();
        drop(inner);

        if let Some(compare) = &query.sort {
            docs.sort_by(|a, b| compare(a, b));
        }
        if let Some(limit) = query.limit {
            docs.truncate(limit);
        }
        Ok(docs)
    }

    pub async fn find_one(
        &self,
        predicate: impl Fn(&D) -> bool + Send + Sync,
    ) -> DbResult<Option<D>> {
        self.ensure_open()?;
        let inner = self.inner.read().await;
        Ok(inner.docs.values().find(|doc| predicate(*doc)).cloned())
    }

    pub async fn find_by_id(&self, id: &str) -> DbResult<Option<D>> {
        self.ensure_open()?;
        let inner = self.inner.read().await;
        Ok(inner
            .ids
            .get(id)
            .and_then(|seq| inner.docs.get(seq))
            .cloned())
    }

    /// Insert a document under a freshly generated id.
    pub async fn insert(&self, mut doc: D) -> DbResult<D> {
        self.ensure_open()?;
        doc.assign_id(Uuid::now_v7().to_string());
        Self::check(&doc)?;

        let mut inner = self.inner.write().await;
        if let Some(field) = inner.conflicting_field(&doc, None) {
            return Err(DbError::Duplicate {
                collection: D::COLLECTION,
                field,
            });
        }
        inner.push(doc.clone());

        tracing::debug!(collection = D::COLLECTION, id = doc.id(), "document inserted");
        Ok(doc)
    }

    /// Insert a batch. Either every document is stored or none is.
    pub async fn insert_many(&self, docs: Vec<D>) -> DbResult<Vec<D>> {
        self.ensure_open()?;
        let mut prepared = Vec::with_capacity(docs.len());
        for mut doc in docs {
            doc.assign_id(Uuid::now_v7().to_string());
            Self::check(&doc)?;
            prepared.push(doc);
        }

        let mut inner = self.inner.write().await;
        let mut batch_keys = HashSet::new();
        for doc in &prepared {
            if let Some(field) = inner.conflicting_field(doc, None) {
                return Err(DbError::Duplicate {
                    collection: D::COLLECTION,
                    field,
                });
            }
            for (field, value) in doc.unique_fields() {
                if !batch_keys.insert((field, value)) {
                    return Err(DbError::Duplicate {
                        collection: D::COLLECTION,
                        field,
                    });
                }
            }
        }
        for doc in &prepared {
            inner.push(doc.clone());
        }

        tracing::debug!(
            collection = D::COLLECTION,
            count = prepared.len(),
            "documents inserted"
        );
        Ok(prepared)
    }

    /// Replace the document stored under `id`, keeping its position.
    ///
    /// The replacement's id is forced to `id`. Returns `None` if nothing is
    /// stored under `id`.
    pub async fn replace_by_id(&self, id: &str, mut doc: D) -> DbResult<Option<D>> {
        self.ensure_open()?;
        doc.assign_id(id.to_string());
        Self::check(&doc)?;

        let mut inner = self.inner.write().await;
        let Some(seq) = inner.ids.get(id).copied() else {
            return Ok(None);
        };
        if let Some(field) = inner.conflicting_field(&doc, Some(id)) {
            return Err(DbError::Duplicate {
                collection: D::COLLECTION,
                field,
            });
        }

        if let Some(previous) = inner.docs.get(&seq).cloned() {
            inner.unindex(&previous);
        }
        inner.index(&doc);
        inner.docs.insert(seq, doc.clone());

        tracing::debug!(collection = D::COLLECTION, id, "document replaced");
        Ok(Some(doc))
    }

    pub async fn delete_by_id(&self, id: &str) -> DbResult<Option<D>> {
        self.ensure_open()?;
        let mut inner = self.inner.write().await;
        let Some(seq) = inner.ids.remove(id) else {
            return Ok(None);
        };
        let removed = inner.docs.remove(&seq);
        if let Some(doc) = &removed {
            inner.unindex(doc);
        }

        tracing::debug!(collection = D::COLLECTION, id, "document deleted");
        Ok(removed)
    }

    pub async fn count(&self) -> DbResult<usize> {
        self.ensure_open()?;
        Ok(self.inner.read().await.docs.len())
    }
}
