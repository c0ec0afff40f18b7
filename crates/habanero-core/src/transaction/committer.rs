//! Collects units of change and commits them as one store transaction.

use std::collections::HashSet;

use tracing::{debug, info, warn};

use super::unit::{Phase, PlannedOp, TransactionalUnit};
use crate::error::Error;
use crate::object::IdentityMap;
use crate::store::{DataStore, StoreOp};

/// Outcome of a successful commit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitSummary {
    /// Records inserted.
    pub inserted: usize,
    /// Records updated, including foreign-key-only updates.
    pub updated: usize,
    /// Records deleted.
    pub deleted: usize,
}

impl CommitSummary {
    /// Total store operations applied.
    pub fn total(&self) -> usize {
        self.inserted + self.updated + self.deleted
    }
}

/// Gathers transactional units for one save.
///
/// Units are deduplicated by transaction id. Commit orders inserts, then
/// updates, then deletes; deletes run in reverse of the order they were
/// added so children go before their parents.
#[derive(Debug, Default)]
pub struct TransactionCommitter {
    units: Vec<TransactionalUnit>,
    ids: HashSet<String>,
}

impl TransactionCommitter {
    /// Create an empty committer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a unit. Returns false if a unit with the same transaction id is
    /// already present.
    pub fn add_transaction(&mut self, unit: TransactionalUnit) -> bool {
        let id = unit.transaction_id();
        if !self.ids.insert(id) {
            return false;
        }
        debug!(unit = %unit, "transaction added");
        self.units.push(unit);
        true
    }

    /// Whether a unit with this transaction id was added.
    pub fn contains(&self, transaction_id: &str) -> bool {
        self.ids.contains(transaction_id)
    }

    /// Units in the order they were added.
    pub fn units(&self) -> &[TransactionalUnit] {
        &self.units
    }

    /// Number of units.
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Whether no unit was added.
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Store operations in commit order.
    pub fn plan(&self, map: &IdentityMap, validate: bool) -> Result<Vec<StoreOp>, Error> {
        let mut missing = Vec::new();
        let mut planned: Vec<PlannedOp> = Vec::new();
        for unit in &self.units {
            if let Some(op) = unit.plan(map, &mut missing)? {
                planned.push(op);
            }
        }
        if validate && !missing.is_empty() {
            return Err(Error::Validation(missing.join("; ")));
        }

        let mut ops = Vec::with_capacity(planned.len());
        ops.extend(
            planned
                .iter()
                .filter(|p| p.phase == Phase::Insert)
                .map(|p| p.op.clone()),
        );
        ops.extend(
            planned
                .iter()
                .filter(|p| p.phase == Phase::Update)
                .map(|p| p.op.clone()),
        );
        ops.extend(
            planned
                .iter()
                .rev()
                .filter(|p| p.phase == Phase::Delete)
                .map(|p| p.op.clone()),
        );
        Ok(ops)
    }

    /// Apply every unit through the store, then update in-memory state.
    ///
    /// Nothing in `map` changes unless the store accepted the whole unit of
    /// work.
    pub fn commit(
        self,
        store: &dyn DataStore,
        map: &mut IdentityMap,
        validate: bool,
    ) -> Result<CommitSummary, Error> {
        let ops = self.plan(map, validate)?;

        let mut summary = CommitSummary::default();
        for op in &ops {
            match op {
                StoreOp::Insert(_) => summary.inserted += 1,
                StoreOp::Update(_) | StoreOp::UpdateFields { .. } => summary.updated += 1,
                StoreOp::Delete { .. } => summary.deleted += 1,
            }
        }

        if !ops.is_empty() {
            if let Err(e) = store.apply(&ops) {
                warn!(error = %e, units = self.units.len(), "commit failed");
                return Err(e);
            }
        }

        for unit in &self.units {
            unit.update_state_as_committed(map)?;
        }

        info!(
            units = self.units.len(),
            inserted = summary.inserted,
            updated = summary.updated,
            deleted = summary.deleted,
            "committed"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::catalog::{ClassDef, ClassDefRegistry, PropDef, PropType};
    use crate::id::ObjectId;
    use crate::object::BusinessObject;
    use crate::store::MemoryStore;
    use crate::value::Value;

    fn map() -> IdentityMap {
        let registry = ClassDefRegistry::builder()
            .register(
                ClassDef::new("Car", "CarID")
                    .with_prop(PropDef::new("Make", PropType::String).compulsory()),
            )
            .build()
            .unwrap();
        IdentityMap::new(Arc::new(registry))
    }

    fn car(map: &mut IdentityMap, make: Option<&str>) -> ObjectId {
        let class_def = Arc::clone(map.registry().get("Car").unwrap());
        let id = map.insert(BusinessObject::new(class_def));
        if let Some(make) = make {
            map.require_mut(id).unwrap().set_value("Make", Value::from(make)).unwrap();
        }
        id
    }

    #[test]
    fn test_add_transaction_deduplicates() {
        let mut map = map();
        let id = car(&mut map, Some("Saab"));
        let mut committer = TransactionCommitter::new();
        assert!(committer.add_transaction(TransactionalUnit::BusinessObject { id }));
        assert!(!committer.add_transaction(TransactionalUnit::BusinessObject { id }));
        assert_eq!(committer.len(), 1);
        assert!(committer.contains(&format!("BusinessObject:{}", id)));
    }

    #[test]
    fn test_plan_orders_inserts_updates_deletes() {
        let mut map = map();
        let store = MemoryStore::new();
        let first = car(&mut map, Some("Saab"));
        let second = car(&mut map, Some("Volvo"));
        let mut committer = TransactionCommitter::new();
        committer.add_transaction(TransactionalUnit::BusinessObject { id: first });
        committer.add_transaction(TransactionalUnit::BusinessObject { id: second });
        committer.commit(&store, &mut map, true).unwrap();

        let added = car(&mut map, Some("Fiat"));
        map.require_mut(first).unwrap().mark_deleted();
        map.require_mut(second).unwrap().mark_deleted();
        let mut committer = TransactionCommitter::new();
        for id in [first, second, added] {
            committer.add_transaction(TransactionalUnit::BusinessObject { id });
        }

        let ops = committer.plan(&map, true).unwrap();
        let order: Vec<(&str, ObjectId)> = ops.iter().map(|op| (op.kind(), op.id())).collect();
        assert_eq!(
            order,
            vec![("insert", added), ("delete", second), ("delete", first)]
        );

        let summary = committer.commit(&store, &mut map, true).unwrap();
        assert_eq!(summary.total(), 3);
        assert_eq!(store.len(), 1);
        assert!(map.require(first).unwrap().is_gone());
        assert!(!map.require(added).unwrap().is_new());
    }

    #[test]
    fn test_validation_blocks_commit() {
        let mut map = map();
        let store = MemoryStore::new();
        let id = car(&mut map, None);
        let mut committer = TransactionCommitter::new();
        committer.add_transaction(TransactionalUnit::BusinessObject { id });

        let err = committer.plan(&map, true).unwrap_err();
        assert!(matches!(err, Error::Validation(ref msg) if msg.contains("'Make'")));
        assert_eq!(committer.plan(&map, false).unwrap().len(), 1);

        assert!(committer.commit(&store, &mut map, true).is_err());
        assert!(store.is_empty());
        assert!(map.require(id).unwrap().is_new());
    }
}
