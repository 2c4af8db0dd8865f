//! In-memory document store
//!
//! Backs the test suite and the `memory` store backend. A single RwLock
//! around the map makes every batch trivially all-or-nothing: validation
//! happens under the write guard before any mutation is applied.

use super::{DocPath, Document, DocumentStore, StoreError, StoreEvent, StoreResult, WriteOp};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::broadcast;

const EVENT_BUFFER: usize = 256;

#[derive(Debug, Clone)]
struct StoredDoc {
    version: u64,
    data: Value,
}

pub struct MemoryStore {
    docs: RwLock<HashMap<String, StoredDoc>>,
    events: broadcast::Sender<StoreEvent>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            docs: RwLock::new(HashMap::new()),
            events,
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Check an `expect_version` against the current document version.
fn check_version(
    path: &DocPath,
    expect: Option<u64>,
    found: Option<u64>,
) -> StoreResult<()> {
    if let Some(expected) = expect {
        let found = found.unwrap_or(0);
        if expected != found {
            return Err(StoreError::VersionConflict {
                path: path.to_string(),
                expected,
                found,
            });
        }
    }
    Ok(())
}

/// Shallow-merge update fields into a document body.
fn merge_fields(data: &mut Value, fields: &serde_json::Map<String, Value>) -> StoreResult<()> {
    let obj = data.as_object_mut().ok_or_else(|| {
        StoreError::Serialization("update target is not a JSON object".to_string())
    })?;
    for (key, value) in fields {
        obj.insert(key.clone(), value.clone());
    }
    Ok(())
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, path: &DocPath) -> StoreResult<Option<Document>> {
        let docs = self.docs.read();
        Ok(docs.get(&path.to_string()).map(|stored| Document {
            path: path.clone(),
            version: stored.version,
            data: stored.data.clone(),
        }))
    }

    async fn list(&self, collection: &str) -> StoreResult<Vec<Document>> {
        let prefix = format!("{}/", collection);
        let docs = self.docs.read();
        let mut result: Vec<Document> = docs
            .iter()
            .filter(|(key, _)| key.starts_with(&prefix))
            .filter_map(|(key, stored)| {
                DocPath::parse(key).map(|path| Document {
                    path,
                    version: stored.version,
                    data: stored.data.clone(),
                })
            })
            .collect();
        result.sort_by(|a, b| a.path.id.cmp(&b.path.id));
        Ok(result)
    }

    async fn atomic_batch(&self, writes: Vec<WriteOp>) -> StoreResult<()> {
        let mut docs = self.docs.write();

        // Validate everything before touching anything, so a failed batch
        // leaves no partial state.
        for op in &writes {
            let key = op.path().to_string();
            let current = docs.get(&key).map(|d| d.version);
            match op {
                WriteOp::Set {
                    path,
                    expect_version,
                    ..
                } => check_version(path, *expect_version, current)?,
                WriteOp::Update {
                    path,
                    expect_version,
                    ..
                } => {
                    if current.is_none() {
                        return Err(StoreError::NotFound(key));
                    }
                    check_version(path, *expect_version, current)?;
                }
                WriteOp::Delete {
                    path,
                    expect_version,
                } => check_version(path, *expect_version, current)?,
            }
        }

        let mut emitted = Vec::with_capacity(writes.len());
        for op in writes {
            let key = op.path().to_string();
            match op {
                WriteOp::Set { path, data, .. } => {
                    let version = docs.get(&key).map(|d| d.version).unwrap_or(0) + 1;
                    docs.insert(
                        key,
                        StoredDoc {
                            version,
                            data: data.clone(),
                        },
                    );
                    emitted.push(StoreEvent::Changed(Document {
                        path,
                        version,
                        data,
                    }));
                }
                WriteOp::Update { path, fields, .. } => {
                    // Presence validated above
                    if let Some(stored) = docs.get_mut(&key) {
                        merge_fields(&mut stored.data, &fields)?;
                        stored.version += 1;
                        emitted.push(StoreEvent::Changed(Document {
                            path,
                            version: stored.version,
                            data: stored.data.clone(),
                        }));
                    }
                }
                WriteOp::Delete { path, .. } => {
                    if docs.remove(&key).is_some() {
                        emitted.push(StoreEvent::Removed(path));
                    }
                }
            }
        }
        drop(docs);

        for event in emitted {
            // No subscribers is fine
            let _ = self.events.send(event);
        }
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }
}
