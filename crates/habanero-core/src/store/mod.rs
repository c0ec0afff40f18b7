//! Data stores.
//!
//! A session reads objects through [`DataStore::get`] and
//! [`DataStore::find`], and writes a whole unit of work through one
//! [`DataStore::apply`] call, which must be all-or-nothing.

mod memory;
mod query;
mod record;
mod sled_store;

pub use memory::MemoryStore;
pub use query::{values_equal, Criteria, SelectQuery};
pub use record::{StoredField, StoredRecord};
pub use sled_store::SledStore;

use crate::error::Error;
use crate::id::ObjectId;

/// One write in a unit of work.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreOp {
    /// Insert a new record. Fails if the id exists.
    Insert(StoredRecord),
    /// Replace an existing record. Fails if the id does not exist.
    Update(StoredRecord),
    /// Overwrite some fields of an existing record.
    UpdateFields {
        /// Class name.
        class: String,
        /// Object id.
        id: ObjectId,
        /// Fields to overwrite.
        fields: Vec<StoredField>,
    },
    /// Delete a record. Fails if the id does not exist.
    Delete {
        /// Class name.
        class: String,
        /// Object id.
        id: ObjectId,
    },
}

impl StoreOp {
    /// Id of the record written.
    pub fn id(&self) -> ObjectId {
        match self {
            StoreOp::Insert(r) | StoreOp::Update(r) => r.id,
            StoreOp::UpdateFields { id, .. } | StoreOp::Delete { id, .. } => *id,
        }
    }

    /// Class of the record written.
    pub fn class(&self) -> &str {
        match self {
            StoreOp::Insert(r) | StoreOp::Update(r) => &r.class,
            StoreOp::UpdateFields { class, .. } | StoreOp::Delete { class, .. } => class,
        }
    }

    /// Short name of the operation, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            StoreOp::Insert(_) => "insert",
            StoreOp::Update(_) => "update",
            StoreOp::UpdateFields { .. } => "update_fields",
            StoreOp::Delete { .. } => "delete",
        }
    }
}

/// Persistence backend used by sessions.
pub trait DataStore: Send + Sync {
    /// Get one record.
    fn get(&self, class: &str, id: ObjectId) -> Result<Option<StoredRecord>, Error>;

    /// Find records of a class matching the query, in query order.
    fn find(&self, query: &SelectQuery) -> Result<Vec<StoredRecord>, Error>;

    /// Apply every operation or none.
    fn apply(&self, ops: &[StoreOp]) -> Result<(), Error>;
}

fn missing(op: &StoreOp) -> Error {
    Error::Persistence(format!(
        "cannot {} {} {}: no such record",
        op.kind(),
        op.class(),
        op.id()
    ))
}

fn duplicate(op: &StoreOp) -> Error {
    Error::Persistence(format!(
        "cannot insert {} {}: a record with this id exists",
        op.class(),
        op.id()
    ))
}
