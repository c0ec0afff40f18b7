//! Identity map: one in-memory instance per business object id.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::catalog::ClassDefRegistry;
use crate::error::Error;
use crate::id::ObjectId;
use crate::value::Value;

use super::BusinessObject;

/// Owns every business object loaded or created in a session.
///
/// Relationships refer to related objects by id into this map, so cancel and
/// delete bookkeeping is a matter of updating id sets.
#[derive(Debug)]
pub struct IdentityMap {
    registry: Arc<ClassDefRegistry>,
    objects: HashMap<ObjectId, BusinessObject>,
}

impl IdentityMap {
    /// Create an empty map over a class registry.
    pub fn new(registry: Arc<ClassDefRegistry>) -> Self {
        Self {
            registry,
            objects: HashMap::new(),
        }
    }

    /// Class registry.
    pub fn registry(&self) -> &Arc<ClassDefRegistry> {
        &self.registry
    }

    /// Get an object if present.
    pub fn get(&self, id: ObjectId) -> Option<&BusinessObject> {
        self.objects.get(&id)
    }

    /// Get an object or fail with `UnknownObject`.
    pub fn require(&self, id: ObjectId) -> Result<&BusinessObject, Error> {
        self.objects.get(&id).ok_or(Error::UnknownObject(id))
    }

    pub(crate) fn require_mut(&mut self, id: ObjectId) -> Result<&mut BusinessObject, Error> {
        self.objects.get_mut(&id).ok_or(Error::UnknownObject(id))
    }

    pub(crate) fn get_mut(&mut self, id: ObjectId) -> Option<&mut BusinessObject> {
        self.objects.get_mut(&id)
    }

    pub(crate) fn insert(&mut self, bo: BusinessObject) -> ObjectId {
        let id = bo.id();
        self.objects.insert(id, bo);
        id
    }

    /// Whether the map holds the id.
    pub fn contains(&self, id: ObjectId) -> bool {
        self.objects.contains_key(&id)
    }

    /// Number of objects held.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether the map is empty.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Iterate over all objects.
    pub fn iter(&self) -> impl Iterator<Item = &BusinessObject> {
        self.objects.values()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut BusinessObject> {
        self.objects.values_mut()
    }

    /// Drop every object.
    pub fn clear(&mut self) {
        self.objects.clear();
    }

    /// Whether the object is dirty, including its relationships.
    ///
    /// `visited` guards against cycles in the object graph; an object already
    /// being evaluated counts as clean here.
    pub fn is_dirty(&self, id: ObjectId, visited: &mut HashSet<ObjectId>) -> bool {
        if !visited.insert(id) {
            return false;
        }
        match self.objects.get(&id) {
            Some(bo) => bo.is_self_dirty() || bo.relationships().is_dirty(self, visited),
            None => false,
        }
    }

    /// Current values of the named properties, or None if any is null.
    pub(crate) fn key_values(&self, id: ObjectId, props: &[&str]) -> Result<Option<Vec<Value>>, Error> {
        let values = self.require(id)?.values_of(props)?;
        if values.iter().any(Value::is_null) {
            Ok(None)
        } else {
            Ok(Some(values))
        }
    }

    /// Set the named properties on an object.
    pub(crate) fn set_values(
        &mut self,
        id: ObjectId,
        props: &[&str],
        values: &[Value],
    ) -> Result<(), Error> {
        let bo = self.require_mut(id)?;
        for (prop, value) in props.iter().zip(values) {
            bo.set_value(prop, value.clone())?;
        }
        Ok(())
    }

    /// Set the named properties on an object to null.
    pub(crate) fn clear_values(&mut self, id: ObjectId, props: &[&str]) -> Result<(), Error> {
        let bo = self.require_mut(id)?;
        for prop in props {
            bo.set_value(prop, Value::Null)?;
        }
        Ok(())
    }
}
