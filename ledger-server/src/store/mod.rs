//! Document store abstraction
//!
//! The ledger persists to a remote document store that offers single-document
//! get/set/update/delete, a change feed, and grouped all-or-nothing writes
//! ("atomic batches") with no cross-batch transactional guarantee. This
//! module pins that contract behind [`DocumentStore`] so the business logic
//! never sees a concrete client.
//!
//! Every document carries a monotonically increasing version. Batch writes
//! may carry an expected version and fail with [`StoreError::VersionConflict`]
//! on mismatch; the ledger uses this for fetch-compute-write cycles on
//! orders and products (optimistic concurrency instead of last-write-wins).
//!
//! Two implementations ship here:
//! - [`MemoryStore`] — in-process map, used by tests and as embedded default
//! - [`RedbStore`] — redb-backed persistent store, one write transaction per
//!   atomic batch

pub mod memory;
pub mod redb;

pub use memory::MemoryStore;
pub use redb::RedbStore;

use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use thiserror::Error;
use tokio::sync::broadcast;

/// Store errors
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The store rejected the operation (remote security rules). Surfaced
    /// verbatim to the caller; local backends never produce it.
    #[error("Store permission denied: {0}")]
    PermissionDenied(String),

    /// The store could not perform the operation (I/O, network, backend).
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// `update` targeted a document that does not exist.
    #[error("Document not found: {0}")]
    NotFound(String),

    /// An `expect_version` check failed. `found` is 0 when the document
    /// does not exist.
    #[error("Version conflict on {path}: expected {expected}, found {found}")]
    VersionConflict {
        path: String,
        expected: u64,
        found: u64,
    },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Document address: `collection/id`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocPath {
    pub collection: String,
    pub id: String,
}

impl DocPath {
    pub fn new(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            id: id.into(),
        }
    }

    /// Parse a `collection/id` key back into a path.
    pub fn parse(key: &str) -> Option<Self> {
        let (collection, id) = key.split_once('/')?;
        if collection.is_empty() || id.is_empty() {
            return None;
        }
        Some(Self::new(collection, id))
    }
}

impl fmt::Display for DocPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

/// A stored document snapshot
#[derive(Debug, Clone)]
pub struct Document {
    pub path: DocPath,
    /// 1 on first write, +1 per successful write
    pub version: u64,
    pub data: Value,
}

/// One write inside an atomic batch
///
/// `expect_version = Some(0)` means "the document must not exist yet".
#[derive(Debug, Clone)]
pub enum WriteOp {
    Set {
        path: DocPath,
        data: Value,
        expect_version: Option<u64>,
    },
    Update {
        path: DocPath,
        fields: serde_json::Map<String, Value>,
        expect_version: Option<u64>,
    },
    Delete {
        path: DocPath,
        expect_version: Option<u64>,
    },
}

impl WriteOp {
    pub fn set(path: DocPath, data: Value) -> Self {
        WriteOp::Set {
            path,
            data,
            expect_version: None,
        }
    }

    pub fn set_cas(path: DocPath, data: Value, expect_version: u64) -> Self {
        WriteOp::Set {
            path,
            data,
            expect_version: Some(expect_version),
        }
    }

    pub fn update(path: DocPath, fields: serde_json::Map<String, Value>) -> Self {
        WriteOp::Update {
            path,
            fields,
            expect_version: None,
        }
    }

    pub fn update_cas(
        path: DocPath,
        fields: serde_json::Map<String, Value>,
        expect_version: u64,
    ) -> Self {
        WriteOp::Update {
            path,
            fields,
            expect_version: Some(expect_version),
        }
    }

    pub fn delete(path: DocPath) -> Self {
        WriteOp::Delete {
            path,
            expect_version: None,
        }
    }

    pub fn delete_cas(path: DocPath, expect_version: u64) -> Self {
        WriteOp::Delete {
            path,
            expect_version: Some(expect_version),
        }
    }

    pub fn path(&self) -> &DocPath {
        match self {
            WriteOp::Set { path, .. } => path,
            WriteOp::Update { path, .. } => path,
            WriteOp::Delete { path, .. } => path,
        }
    }
}

/// Change feed event pushed to subscribers after a committed write
#[derive(Debug, Clone)]
pub enum StoreEvent {
    /// Document created or updated; carries the full post-write snapshot
    Changed(Document),
    Removed(DocPath),
}

impl StoreEvent {
    pub fn path(&self) -> &DocPath {
        match self {
            StoreEvent::Changed(doc) => &doc.path,
            StoreEvent::Removed(path) => path,
        }
    }
}

/// The document store contract
///
/// `atomic_batch` is the only mutation primitive: all writes in one call are
/// observed together by readers or not at all. The single-document
/// `set`/`update`/`delete` helpers are one-element batches.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, path: &DocPath) -> StoreResult<Option<Document>>;

    async fn list(&self, collection: &str) -> StoreResult<Vec<Document>>;

    async fn atomic_batch(&self, writes: Vec<WriteOp>) -> StoreResult<()>;

    /// Subscribe to the change feed. Events are emitted after commit, in
    /// commit order; a lagging subscriber loses events (broadcast
    /// semantics), it must re-list to recover.
    fn subscribe(&self) -> broadcast::Receiver<StoreEvent>;

    async fn set(&self, path: &DocPath, data: Value) -> StoreResult<()> {
        self.atomic_batch(vec![WriteOp::set(path.clone(), data)])
            .await
    }

    async fn update(
        &self,
        path: &DocPath,
        fields: serde_json::Map<String, Value>,
    ) -> StoreResult<()> {
        self.atomic_batch(vec![WriteOp::update(path.clone(), fields)])
            .await
    }

    async fn delete(&self, path: &DocPath) -> StoreResult<()> {
        self.atomic_batch(vec![WriteOp::delete(path.clone())])
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doc_path_round_trip() {
        let path = DocPath::new("orders", "123");
        assert_eq!(path.to_string(), "orders/123");
        assert_eq!(DocPath::parse("orders/123"), Some(path));
        assert_eq!(DocPath::parse("orders"), None);
        assert_eq!(DocPath::parse("/123"), None);
    }
}
