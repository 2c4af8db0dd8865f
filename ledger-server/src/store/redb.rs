//! redb-backed document store
//!
//! Documents live in a single table keyed by `collection/id`, each value a
//! JSON-serialized `{version, data}` record. One redb write transaction per
//! atomic batch gives the all-or-nothing guarantee: any version-check or
//! serialization failure drops the transaction before commit.
//!
//! # Durability
//!
//! redb commits with `Durability::Immediate` by default: copy-on-write with
//! an atomic pointer swap, so the file stays consistent across power loss.

use super::{DocPath, Document, DocumentStore, StoreError, StoreEvent, StoreResult, WriteOp};
use async_trait::async_trait;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::broadcast;

/// All documents: key = `collection/id`, value = JSON-serialized [`StoredRecord`]
const DOCS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("documents");

const EVENT_BUFFER: usize = 256;

#[derive(Debug, Serialize, Deserialize)]
struct StoredRecord {
    version: u64,
    data: Value,
}

pub struct RedbStore {
    db: Arc<Database>,
    events: broadcast::Sender<StoreEvent>,
}

fn db_err(err: impl std::fmt::Display) -> StoreError {
    StoreError::Unavailable(err.to_string())
}

/// End bound for a prefix scan over `collection/`: '0' is the first ASCII
/// byte after '/'.
fn scan_bounds(collection: &str) -> (String, String) {
    (format!("{}/", collection), format!("{}0", collection))
}

impl RedbStore {
    /// Open or create the database at the given path.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let db = Database::create(path).map_err(db_err)?;
        Self::with_database(db)
    }

    /// Open an in-memory database (for testing).
    #[cfg(test)]
    pub fn open_in_memory() -> StoreResult<Self> {
        let db = Database::builder()
            .create_with_backend(redb::backends::InMemoryBackend::new())
            .map_err(db_err)?;
        Self::with_database(db)
    }

    fn with_database(db: Database) -> StoreResult<Self> {
        // Create the table up front so reads never hit TableDoesNotExist
        let write_txn = db.begin_write().map_err(db_err)?;
        {
            let _ = write_txn.open_table(DOCS_TABLE).map_err(db_err)?;
        }
        write_txn.commit().map_err(db_err)?;

        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Ok(Self {
            db: Arc::new(db),
            events,
        })
    }

    fn decode(key: &str, raw: &[u8]) -> StoreResult<Document> {
        let record: StoredRecord = serde_json::from_slice(raw)?;
        let path = DocPath::parse(key)
            .ok_or_else(|| StoreError::Serialization(format!("malformed key: {}", key)))?;
        Ok(Document {
            path,
            version: record.version,
            data: record.data,
        })
    }
}

fn check_version(path: &DocPath, expect: Option<u64>, found: u64) -> StoreResult<()> {
    if let Some(expected) = expect
        && expected != found
    {
        return Err(StoreError::VersionConflict {
            path: path.to_string(),
            expected,
            found,
        });
    }
    Ok(())
}

#[async_trait]
impl DocumentStore for RedbStore {
    async fn get(&self, path: &DocPath) -> StoreResult<Option<Document>> {
        let key = path.to_string();
        let read_txn = self.db.begin_read().map_err(db_err)?;
        let table = read_txn.open_table(DOCS_TABLE).map_err(db_err)?;
        match table.get(key.as_str()).map_err(db_err)? {
            Some(guard) => Ok(Some(Self::decode(&key, guard.value())?)),
            None => Ok(None),
        }
    }

    async fn list(&self, collection: &str) -> StoreResult<Vec<Document>> {
        let (start, end) = scan_bounds(collection);
        let read_txn = self.db.begin_read().map_err(db_err)?;
        let table = read_txn.open_table(DOCS_TABLE).map_err(db_err)?;

        let mut result = Vec::new();
        for entry in table
            .range(start.as_str()..end.as_str())
            .map_err(db_err)?
        {
            let (key, value) = entry.map_err(db_err)?;
            result.push(Self::decode(key.value(), value.value())?);
        }
        Ok(result)
    }

    async fn atomic_batch(&self, writes: Vec<WriteOp>) -> StoreResult<()> {
        let write_txn = self.db.begin_write().map_err(db_err)?;
        let mut emitted = Vec::with_capacity(writes.len());
        {
            let mut table = write_txn.open_table(DOCS_TABLE).map_err(db_err)?;
            // Any error drops the transaction without commit, so earlier
            // writes in the batch are rolled back.
            for op in writes {
                let key = op.path().to_string();
                let current: Option<StoredRecord> = match table.get(key.as_str()).map_err(db_err)?
                {
                    Some(guard) => Some(serde_json::from_slice(guard.value())?),
                    None => None,
                };
                let found = current.as_ref().map(|r| r.version).unwrap_or(0);

                match op {
                    WriteOp::Set {
                        path,
                        data,
                        expect_version,
                    } => {
                        check_version(&path, expect_version, found)?;
                        let record = StoredRecord {
                            version: found + 1,
                            data,
                        };
                        let raw = serde_json::to_vec(&record)?;
                        table.insert(key.as_str(), raw.as_slice()).map_err(db_err)?;
                        emitted.push(StoreEvent::Changed(Document {
                            path,
                            version: record.version,
                            data: record.data,
                        }));
                    }
                    WriteOp::Update {
                        path,
                        fields,
                        expect_version,
                    } => {
                        let mut record = current.ok_or_else(|| StoreError::NotFound(key.clone()))?;
                        check_version(&path, expect_version, found)?;
                        let obj = record.data.as_object_mut().ok_or_else(|| {
                            StoreError::Serialization(
                                "update target is not a JSON object".to_string(),
                            )
                        })?;
                        for (field, value) in fields {
                            obj.insert(field, value);
                        }
                        record.version += 1;
                        let raw = serde_json::to_vec(&record)?;
                        table.insert(key.as_str(), raw.as_slice()).map_err(db_err)?;
                        emitted.push(StoreEvent::Changed(Document {
                            path,
                            version: record.version,
                            data: record.data,
                        }));
                    }
                    WriteOp::Delete {
                        path,
                        expect_version,
                    } => {
                        check_version(&path, expect_version, found)?;
                        if table.remove(key.as_str()).map_err(db_err)?.is_some() {
                            emitted.push(StoreEvent::Removed(path));
                        }
                    }
                }
            }
        }
        write_txn.commit().map_err(db_err)?;

        for event in emitted {
            let _ = self.events.send(event);
        }
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn path(id: &str) -> DocPath {
        DocPath::new("orders", id)
    }

    #[tokio::test]
    async fn set_get_delete_round_trip() {
        let store = RedbStore::open_in_memory().unwrap();
        store.set(&path("1"), json!({"total": 300.0})).await.unwrap();

        let doc = store.get(&path("1")).await.unwrap().unwrap();
        assert_eq!(doc.version, 1);
        assert_eq!(doc.data["total"], 300.0);

        store.delete(&path("1")).await.unwrap();
        assert!(store.get(&path("1")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn failed_batch_rolls_back_transaction() {
        let store = RedbStore::open_in_memory().unwrap();
        store.set(&path("1"), json!({"a": 1})).await.unwrap();

        let err = store
            .atomic_batch(vec![
                WriteOp::set(path("1"), json!({"a": 2})),
                WriteOp::set_cas(path("2"), json!({}), 9),
            ])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::VersionConflict { .. }));

        let doc = store.get(&path("1")).await.unwrap().unwrap();
        assert_eq!(doc.data["a"], 1, "first write must be rolled back");
    }

    #[tokio::test]
    async fn list_scans_only_the_collection() {
        let store = RedbStore::open_in_memory().unwrap();
        store.set(&path("2"), json!({})).await.unwrap();
        store.set(&path("10"), json!({})).await.unwrap();
        store
            .set(&DocPath::new("products", "1"), json!({}))
            .await
            .unwrap();

        let orders = store.list("orders").await.unwrap();
        assert_eq!(orders.len(), 2);
        assert!(orders.iter().all(|d| d.path.collection == "orders"));
    }

    #[tokio::test]
    async fn persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("ledger.redb");
        {
            let store = RedbStore::open(&db_path).unwrap();
            store.set(&path("1"), json!({"a": 1})).await.unwrap();
        }
        let store = RedbStore::open(&db_path).unwrap();
        let doc = store.get(&path("1")).await.unwrap().unwrap();
        assert_eq!(doc.version, 1);
    }
}
