//! The session: a unit of work owning the identity map.
//!
//! Every business object and relationship mutation goes through a
//! [`Session`], which keeps one in-memory instance per object id and reaches
//! both sides of a relationship when propagating keys, cancels, deletes and
//! saves.

mod delete;
mod load;
mod relationships;
mod save;
mod state;

use std::sync::Arc;

use tracing::debug;

use crate::catalog::{Cardinality, ClassDefRegistry, RelationshipDef};
use crate::config::SessionConfig;
use crate::error::Error;
use crate::id::ObjectId;
use crate::object::{BoStatus, BusinessObject, IdentityMap};
use crate::relationship::{BusinessObjectCollection, SingleRelationship};
use crate::store::DataStore;
use crate::value::Value;

pub use delete::Deletability;

/// Raised whenever a single relationship's related object changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipUpdated {
    /// Owner of the relationship.
    pub owner: ObjectId,
    /// Relationship name.
    pub relationship: String,
    /// Related object before the change.
    pub previous: Option<ObjectId>,
    /// Related object after the change.
    pub current: Option<ObjectId>,
}

type Listener = Box<dyn FnMut(&RelationshipUpdated)>;

/// Unit of work over a data store.
pub struct Session {
    config: SessionConfig,
    store: Arc<dyn DataStore>,
    objects: IdentityMap,
    listeners: Vec<Listener>,
}

impl Session {
    /// Open a session with default configuration.
    pub fn new(registry: Arc<ClassDefRegistry>, store: Arc<dyn DataStore>) -> Self {
        Self::with_config(registry, store, SessionConfig::default())
    }

    /// Open a session with the given configuration.
    pub fn with_config(
        registry: Arc<ClassDefRegistry>,
        store: Arc<dyn DataStore>,
        config: SessionConfig,
    ) -> Self {
        Self {
            config,
            store,
            objects: IdentityMap::new(registry),
            listeners: Vec::new(),
        }
    }

    /// Session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Class registry.
    pub fn registry(&self) -> &Arc<ClassDefRegistry> {
        self.objects.registry()
    }

    /// Objects held by the session.
    pub fn objects(&self) -> &IdentityMap {
        &self.objects
    }

    /// Drop every cached object. Unsaved changes are discarded.
    pub fn clear(&mut self) {
        debug!(objects = self.objects.len(), "session cleared");
        self.objects.clear();
    }

    /// Register a listener for single relationship changes.
    pub fn on_relationship_updated(&mut self, listener: impl FnMut(&RelationshipUpdated) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Create a new, unsaved object of a class.
    pub fn create(&mut self, class: &str) -> Result<ObjectId, Error> {
        let class_def = Arc::clone(self.registry().get(class)?);
        let id = self.objects.insert(BusinessObject::new(class_def));
        debug!(class, id = %id, "object created");
        Ok(id)
    }

    /// Get an object held by the session.
    pub fn get(&self, id: ObjectId) -> Result<&BusinessObject, Error> {
        self.objects.require(id)
    }

    /// Get a property value.
    pub fn value(&self, id: ObjectId, prop: &str) -> Result<&Value, Error> {
        self.objects.require(id)?.value(prop)
    }

    /// Set a property value.
    pub fn set_value(&mut self, id: ObjectId, prop: &str, value: impl Into<Value>) -> Result<(), Error> {
        self.objects.require_mut(id)?.set_value(prop, value.into())?;
        Ok(())
    }

    /// Status including relationships: an object with a dirty relationship
    /// is dirty.
    pub fn status(&self, id: ObjectId) -> Result<BoStatus, Error> {
        let mut status = self.objects.require(id)?.own_status();
        status.is_dirty = self.is_dirty(id)?;
        Ok(status)
    }

    /// Whether the object or any of its relationships is dirty.
    pub fn is_dirty(&self, id: ObjectId) -> Result<bool, Error> {
        self.objects.require(id)?;
        Ok(self.objects.is_dirty(id, &mut Default::default()))
    }

    fn emit(&mut self, event: RelationshipUpdated) {
        debug!(
            owner = %event.owner,
            relationship = %event.relationship,
            "relationship updated"
        );
        for listener in &mut self.listeners {
            listener(&event);
        }
    }

    fn relationship_def(&self, owner: ObjectId, name: &str) -> Result<Arc<RelationshipDef>, Error> {
        let bo = self.objects.require(owner)?;
        bo.class_def()
            .relationship(name)
            .cloned()
            .ok_or_else(|| Error::RelationshipNotFound {
                class: bo.class_name().to_string(),
                relationship: name.to_string(),
            })
    }

    fn def_with_arity(
        &self,
        owner: ObjectId,
        name: &str,
        expected: Cardinality,
    ) -> Result<Arc<RelationshipDef>, Error> {
        let def = self.relationship_def(owner, name)?;
        if def.cardinality != expected {
            return Err(Error::WrongRelationshipArity {
                class: self.objects.require(owner)?.class_name().to_string(),
                relationship: name.to_string(),
                expected,
                actual: def.cardinality,
            });
        }
        Ok(def)
    }

    fn multiple_def(&self, owner: ObjectId, name: &str) -> Result<Arc<RelationshipDef>, Error> {
        self.def_with_arity(owner, name, Cardinality::Multiple)
    }

    fn single_def(&self, owner: ObjectId, name: &str) -> Result<Arc<RelationshipDef>, Error> {
        self.def_with_arity(owner, name, Cardinality::Single)
    }

    fn collection_ref(&self, owner: ObjectId, name: &str) -> Result<&BusinessObjectCollection, Error> {
        self.objects
            .require(owner)?
            .relationships()
            .get(name)
            .and_then(|r| r.as_multiple())
            .map(|m| m.collection())
            .ok_or_else(|| self.missing_relationship(owner, name))
    }

    fn collection_mut(
        &mut self,
        owner: ObjectId,
        name: &str,
    ) -> Result<&mut BusinessObjectCollection, Error> {
        let missing = self.missing_relationship(owner, name);
        self.objects
            .require_mut(owner)?
            .relationships_mut()
            .get_mut(name)
            .and_then(|r| r.as_multiple_mut())
            .map(|m| m.collection_mut())
            .ok_or(missing)
    }

    fn single_ref(&self, owner: ObjectId, name: &str) -> Result<&SingleRelationship, Error> {
        self.objects
            .require(owner)?
            .relationships()
            .get(name)
            .and_then(|r| r.as_single())
            .ok_or_else(|| self.missing_relationship(owner, name))
    }

    fn single_mut(&mut self, owner: ObjectId, name: &str) -> Result<&mut SingleRelationship, Error> {
        let missing = self.missing_relationship(owner, name);
        self.objects
            .require_mut(owner)?
            .relationships_mut()
            .get_mut(name)
            .and_then(|r| r.as_single_mut())
            .ok_or(missing)
    }

    fn missing_relationship(&self, owner: ObjectId, name: &str) -> Error {
        match self.objects.get(owner) {
            Some(bo) => Error::RelationshipNotFound {
                class: bo.class_name().to_string(),
                relationship: name.to_string(),
            },
            None => Error::UnknownObject(owner),
        }
    }

    /// Whether the object's current values of `props` equal `key`.
    fn matches_key(&self, id: ObjectId, props: &[&str], key: &[Value]) -> bool {
        match self.objects.get(id).map(|bo| bo.values_of(props)) {
            Some(Ok(values)) => values
                .iter()
                .zip(key)
                .all(|(a, b)| crate::store::values_equal(a, b)),
            _ => false,
        }
    }

    fn require_class(&self, id: ObjectId, class: &str, def: &RelationshipDef) -> Result<(), Error> {
        let bo = self.objects.require(id)?;
        if bo.class_name() != class {
            return Err(Error::Developer(format!(
                "relationship '{}' relates to class '{}', but {} is a '{}'",
                def.name,
                class,
                id,
                bo.class_name()
            )));
        }
        if bo.is_gone() {
            return Err(Error::ObjectNotFound {
                class: class.to_string(),
                id,
            });
        }
        Ok(())
    }
}
