//! Persistent data store backed by sled.

use sled::transaction::{ConflictableTransactionError, TransactionError, TransactionalTree};
use sled::{Db, Transactional, Tree};
use tracing::{debug, info};

use super::{duplicate, missing, DataStore, SelectQuery, StoreOp, StoredRecord};
use crate::config::StoreConfig;
use crate::error::Error;
use crate::id::ObjectId;

/// Tree name for records keyed by id.
const RECORDS_TREE: &str = "records";

/// Tree name for the class index (class + id -> empty).
const CLASS_INDEX_TREE: &str = "index:class";

/// Data store persisting records in a sled database.
///
/// Each unit of work is applied in one sled transaction spanning the record
/// tree and the class index.
pub struct SledStore {
    db: Db,
    records: Tree,
    class_index: Tree,
}

impl SledStore {
    /// Open or create a store with the given configuration.
    pub fn open(config: StoreConfig) -> Result<Self, Error> {
        let db = config.to_sled_config().open()?;
        let records = db.open_tree(RECORDS_TREE)?;
        let class_index = db.open_tree(CLASS_INDEX_TREE)?;
        info!(
            path = %config.path.display(),
            recovered = db.was_recovered(),
            "opened data store"
        );
        Ok(Self {
            db,
            records,
            class_index,
        })
    }

    /// Flush all pending writes to disk.
    pub fn flush(&self) -> Result<(), Error> {
        self.db.flush()?;
        Ok(())
    }

    /// Number of records held.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn read(&self, id: ObjectId) -> Result<Option<StoredRecord>, Error> {
        match self.records.get(id.as_bytes())? {
            Some(bytes) => Ok(Some(StoredRecord::from_bytes(&bytes)?)),
            None => Ok(None),
        }
    }

    fn apply_op(
        records: &TransactionalTree,
        class_index: &TransactionalTree,
        op: &StoreOp,
    ) -> Result<(), ConflictableTransactionError<Error>> {
        let key = op.id().as_bytes().to_vec();
        match op {
            StoreOp::Insert(record) => {
                if records.get(key.as_slice())?.is_some() {
                    return Err(ConflictableTransactionError::Abort(duplicate(op)));
                }
                Self::write(records, &key, record)?;
                class_index.insert(class_index_key(&record.class, record.id), Vec::<u8>::new())?;
            }
            StoreOp::Update(record) => {
                Self::read_tx(records, &key, op)?;
                Self::write(records, &key, record)?;
            }
            StoreOp::UpdateFields { fields, .. } => {
                let mut record = Self::read_tx(records, &key, op)?;
                for field in fields {
                    record.set(field.name.clone(), field.value.clone());
                }
                Self::write(records, &key, &record)?;
            }
            StoreOp::Delete { class, id } => {
                Self::read_tx(records, &key, op)?;
                records.remove(key.as_slice())?;
                class_index.remove(class_index_key(class, *id))?;
            }
        }
        Ok(())
    }

    fn read_tx(
        records: &TransactionalTree,
        key: &[u8],
        op: &StoreOp,
    ) -> Result<StoredRecord, ConflictableTransactionError<Error>> {
        let bytes = records
            .get(key)?
            .ok_or_else(|| ConflictableTransactionError::Abort(missing(op)))?;
        let record = StoredRecord::from_bytes(&bytes).map_err(ConflictableTransactionError::Abort)?;
        if record.class != op.class() {
            return Err(ConflictableTransactionError::Abort(missing(op)));
        }
        Ok(record)
    }

    fn write(
        records: &TransactionalTree,
        key: &[u8],
        record: &StoredRecord,
    ) -> Result<(), ConflictableTransactionError<Error>> {
        let bytes = record.to_bytes().map_err(ConflictableTransactionError::Abort)?;
        records.insert(key, bytes)?;
        Ok(())
    }
}

/// Index key for a class + id.
fn class_index_key(class: &str, id: ObjectId) -> Vec<u8> {
    let mut key = class_index_prefix(class);
    key.extend_from_slice(id.as_bytes());
    key
}

/// Prefix for scanning all ids of a class.
fn class_index_prefix(class: &str) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(class.len() + 1 + 16);
    prefix.extend_from_slice(class.as_bytes());
    prefix.push(0); // Null separator
    prefix
}

impl DataStore for SledStore {
    fn get(&self, class: &str, id: ObjectId) -> Result<Option<StoredRecord>, Error> {
        Ok(self.read(id)?.filter(|r| r.class == class))
    }

    fn find(&self, query: &SelectQuery) -> Result<Vec<StoredRecord>, Error> {
        let prefix = class_index_prefix(&query.class);
        let prefix_len = prefix.len();

        let mut found = Vec::new();
        for entry in self.class_index.scan_prefix(&prefix) {
            let (key, _) = entry?;
            if key.len() != prefix_len + 16 {
                return Err(Error::Deserialization(format!(
                    "malformed class index key for '{}'",
                    query.class
                )));
            }
            let mut id = [0u8; 16];
            id.copy_from_slice(&key[prefix_len..]);
            if let Some(record) = self.read(ObjectId::from_bytes(id))? {
                if query.matches(&record) {
                    found.push(record);
                }
            }
        }
        query.sort(&mut found);
        debug!(class = %query.class, found = found.len(), "find");
        Ok(found)
    }

    fn apply(&self, ops: &[StoreOp]) -> Result<(), Error> {
        let result: Result<(), TransactionError<Error>> = (&self.records, &self.class_index)
            .transaction(|(records_tx, index_tx)| {
                for op in ops {
                    Self::apply_op(records_tx, index_tx, op)?;
                }
                Ok(())
            });

        match result {
            Ok(()) => Ok(()),
            Err(TransactionError::Abort(e)) => Err(e),
            Err(TransactionError::Storage(e)) => Err(Error::Storage(e)),
        }
    }
}
