//! Loading objects and resolving relationships from the data store.

use std::sync::Arc;

use tracing::{debug, trace};

use super::Session;
use crate::catalog::{ClassDef, ForeignKeySide, RelationshipDef};
use crate::error::Error;
use crate::id::ObjectId;
use crate::object::BusinessObject;
use crate::store::{Criteria, SelectQuery, StoredRecord};
use crate::value::Value;

impl Session {
    /// Get an object by id, loading it from the store on first use.
    pub fn load(&mut self, class: &str, id: ObjectId) -> Result<ObjectId, Error> {
        if let Some(bo) = self.objects.get(id) {
            if bo.is_gone() || bo.class_name() != class {
                return Err(Error::ObjectNotFound {
                    class: class.to_string(),
                    id,
                });
            }
            return Ok(id);
        }

        let class_def = Arc::clone(self.registry().get(class)?);
        match self.store.get(class, id)? {
            Some(record) => Ok(self.adopt_record(&class_def, &record)),
            None => Err(Error::ObjectNotFound {
                class: class.to_string(),
                id,
            }),
        }
    }

    /// Load every object of a class matching the criteria.
    ///
    /// Objects already held keep their in-memory state; they are returned
    /// only if their current values still match.
    pub fn find(&mut self, class: &str, criteria: Criteria) -> Result<Vec<ObjectId>, Error> {
        let class_def = Arc::clone(self.registry().get(class)?);
        let query = SelectQuery::new(class, &class_def.primary_key).with_criteria(criteria);
        let records = self.store.find(&query)?;

        let mut ids = Vec::with_capacity(records.len());
        for record in &records {
            let id = self.adopt_record(&class_def, record);
            let keep = self.objects.get(id).is_some_and(|bo| {
                !bo.is_deleted() && query.matches(&bo.to_record())
            });
            if keep {
                ids.push(id);
            }
        }
        Ok(ids)
    }

    /// Put a stored record into the identity map unless the id is already
    /// held, in which case the held instance wins.
    fn adopt_record(&mut self, class_def: &Arc<ClassDef>, record: &StoredRecord) -> ObjectId {
        if self.objects.contains(record.id) {
            return record.id;
        }
        trace!(class = %class_def.name, id = %record.id, "object loaded");
        self.objects
            .insert(BusinessObject::from_record(Arc::clone(class_def), record))
    }

    /// Load a multiple relationship if it was never loaded, or if it is
    /// clean and older than its timeout.
    pub(super) fn ensure_loaded(&mut self, owner: ObjectId, def: &RelationshipDef) -> Result<(), Error> {
        let timeout = def.timeout().or(self.config.relationship_timeout);
        if !self.collection_ref(owner, &def.name)?.needs_load(timeout) {
            return Ok(());
        }

        let owner_props = def.key.owner_props();
        let related_props = def.key.related_props();
        let key = self.objects.key_values(owner, &owner_props)?;

        let mut ids = Vec::new();
        if let Some(key) = key {
            let related_class = Arc::clone(self.registry().get(&def.related_class)?);
            let query = SelectQuery::new(&def.related_class, &related_class.primary_key)
                .with_criteria(Criteria::from_pairs(related_props.iter().copied(), &key))
                .with_order_by(def.order_by.clone());
            for record in self.store.find(&query)? {
                let id = self.adopt_record(&related_class, &record);
                let live = self.objects.get(id).is_some_and(|bo| !bo.is_deleted());
                if live && self.matches_key(id, &related_props, &key) {
                    ids.push(id);
                }
            }
        }

        debug!(
            owner = %owner,
            relationship = %def.name,
            count = ids.len(),
            "relationship loaded"
        );
        self.collection_mut(owner, &def.name)?.load(ids);
        Ok(())
    }

    /// Resolve a single relationship, using the cache while the key it was
    /// resolved for is unchanged.
    pub(super) fn resolve_single(
        &mut self,
        owner: ObjectId,
        def: &RelationshipDef,
    ) -> Result<Option<ObjectId>, Error> {
        let side = match def.foreign_key_side() {
            ForeignKeySide::Conflict(message) => return Err(Error::Developer(message)),
            side => side,
        };

        let owner_props = def.key.owner_props();
        let related_props = def.key.related_props();
        let key = self.objects.key_values(owner, &owner_props)?;

        let single = self.single_ref(owner, &def.name)?;
        if single.is_resolved_for(key.as_deref()) {
            let cached = single.related_id();
            let still_valid = match (cached, &key) {
                (None, _) => true,
                (Some(id), Some(key)) => self.objects.get(id).is_some_and(|bo| !bo.is_gone())
                    && (side == ForeignKeySide::Owner || self.matches_key(id, &related_props, key)),
                (Some(_), None) => false,
            };
            if still_valid {
                return Ok(cached);
            }
        }

        let related = match &key {
            Some(key) => self.find_related(def, &related_props, key)?,
            None => None,
        };
        trace!(owner = %owner, relationship = %def.name, related = ?related, "single relationship resolved");
        self.single_mut(owner, &def.name)?.cache(related, key);
        Ok(related)
    }

    /// First object of the related class whose `props` equal `key`, looking
    /// in the session before the store.
    fn find_related(
        &mut self,
        def: &RelationshipDef,
        props: &[&str],
        key: &[Value],
    ) -> Result<Option<ObjectId>, Error> {
        let mut held: Vec<ObjectId> = self
            .objects
            .iter()
            .filter(|bo| bo.class_name() == def.related_class && !bo.is_gone())
            .map(|bo| bo.id())
            .filter(|id| self.matches_key(*id, props, key))
            .collect();
        held.sort();
        if let Some(id) = held.first() {
            return Ok(Some(*id));
        }

        let related_class = Arc::clone(self.registry().get(&def.related_class)?);
        let query = SelectQuery::new(&def.related_class, &related_class.primary_key)
            .with_criteria(Criteria::from_pairs(props.iter().copied(), key));
        for record in self.store.find(&query)? {
            let id = self.adopt_record(&related_class, &record);
            if !self.objects.get(id).is_some_and(BusinessObject::is_gone)
                && self.matches_key(id, props, key)
            {
                return Ok(Some(id));
            }
        }
        Ok(None)
    }
}
