//! In-memory data store.

use parking_lot::RwLock;
use tracing::trace;

use super::{duplicate, missing, DataStore, SelectQuery, StoreOp, StoredRecord};
use crate::error::Error;
use crate::id::ObjectId;

/// Data store holding records in memory, in insertion order.
///
/// Suited to tests and short-lived sessions. `apply` works on a copy and
/// swaps it in only when every operation succeeded.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<Vec<StoredRecord>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with records.
    pub fn with_records(records: impl IntoIterator<Item = StoredRecord>) -> Self {
        Self {
            records: RwLock::new(records.into_iter().collect()),
        }
    }

    /// Number of records held.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

fn position(records: &[StoredRecord], class: &str, id: ObjectId) -> Option<usize> {
    records.iter().position(|r| r.id == id && r.class == class)
}

fn apply_one(records: &mut Vec<StoredRecord>, op: &StoreOp) -> Result<(), Error> {
    match op {
        StoreOp::Insert(record) => {
            if position(records, &record.class, record.id).is_some() {
                return Err(duplicate(op));
            }
            records.push(record.clone());
        }
        StoreOp::Update(record) => {
            let i = position(records, &record.class, record.id).ok_or_else(|| missing(op))?;
            records[i] = record.clone();
        }
        StoreOp::UpdateFields { class, id, fields } => {
            let i = position(records, class, *id).ok_or_else(|| missing(op))?;
            for field in fields {
                records[i].set(field.name.clone(), field.value.clone());
            }
        }
        StoreOp::Delete { class, id } => {
            let i = position(records, class, *id).ok_or_else(|| missing(op))?;
            records.remove(i);
        }
    }
    Ok(())
}

impl DataStore for MemoryStore {
    fn get(&self, class: &str, id: ObjectId) -> Result<Option<StoredRecord>, Error> {
        let records = self.records.read();
        Ok(position(&records, class, id).map(|i| records[i].clone()))
    }

    fn find(&self, query: &SelectQuery) -> Result<Vec<StoredRecord>, Error> {
        let mut found: Vec<StoredRecord> = self
            .records
            .read()
            .iter()
            .filter(|r| query.matches(r))
            .cloned()
            .collect();
        query.sort(&mut found);
        Ok(found)
    }

    fn apply(&self, ops: &[StoreOp]) -> Result<(), Error> {
        let mut guard = self.records.write();
        let mut working = guard.clone();
        for op in ops {
            trace!(op = op.kind(), class = op.class(), id = %op.id(), "applying");
            apply_one(&mut working, op)?;
        }
        *guard = working;
        Ok(())
    }
}
