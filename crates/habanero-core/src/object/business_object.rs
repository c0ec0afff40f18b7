//! The business object: property bag, status and relationships.

use std::sync::Arc;

use crate::catalog::ClassDef;
use crate::error::Error;
use crate::id::ObjectId;
use crate::relationship::RelationshipCol;
use crate::store::{StoredField, StoredRecord};
use crate::value::Value;

use super::props::{BoProp, BoPropCol};

/// Status flags of a business object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BoStatus {
    /// Never saved, or deleted and saved.
    pub is_new: bool,
    /// Has unsaved changes: edited properties, a pending delete, or dirty
    /// relationships.
    pub is_dirty: bool,
    /// Marked for delete.
    pub is_deleted: bool,
    /// Being edited since the last save or cancel.
    pub is_editing: bool,
}

/// A business object instance.
#[derive(Debug)]
pub struct BusinessObject {
    id: ObjectId,
    class_def: Arc<ClassDef>,
    props: BoPropCol,
    relationships: RelationshipCol,
    is_new: bool,
    is_deleted: bool,
    is_editing: bool,
    /// Set by mark-for-delete until the delete is saved or cancelled.
    delete_pending: bool,
}

impl BusinessObject {
    /// Create a new, unsaved object with initial property values.
    pub(crate) fn new(class_def: Arc<ClassDef>) -> Self {
        let id = ObjectId::generate();
        let mut props = BoPropCol::initial(&class_def);
        props.load(&class_def.primary_key, Value::from(id));
        let relationships = RelationshipCol::for_class(&class_def);
        Self {
            id,
            class_def,
            props,
            relationships,
            is_new: true,
            is_deleted: false,
            is_editing: false,
            delete_pending: false,
        }
    }

    /// Materialize a persisted object from a stored record.
    pub(crate) fn from_record(class_def: Arc<ClassDef>, record: &StoredRecord) -> Self {
        let mut props = BoPropCol::initial(&class_def);
        props.load(&class_def.primary_key, Value::from(record.id));
        for field in &record.fields {
            props.load(&field.name, field.value.clone());
        }
        let relationships = RelationshipCol::for_class(&class_def);
        Self {
            id: record.id,
            class_def,
            props,
            relationships,
            is_new: false,
            is_deleted: false,
            is_editing: false,
            delete_pending: false,
        }
    }

    /// Object id (primary key value).
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Class name.
    pub fn class_name(&self) -> &str {
        &self.class_def.name
    }

    /// Class definition.
    pub fn class_def(&self) -> &Arc<ClassDef> {
        &self.class_def
    }

    /// Whether the object has never been saved.
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    /// Whether the object is marked for delete (or deleted).
    pub fn is_deleted(&self) -> bool {
        self.is_deleted
    }

    /// Whether the object no longer exists: deleted and either saved or
    /// never persisted.
    pub fn is_gone(&self) -> bool {
        self.is_deleted && self.is_new
    }

    /// Whether a mark-for-delete awaits save.
    pub fn is_delete_pending(&self) -> bool {
        self.delete_pending
    }

    /// Whether the object's own state (properties, pending delete) is dirty,
    /// ignoring relationships.
    pub fn is_self_dirty(&self) -> bool {
        self.delete_pending || self.props.is_dirty()
    }

    /// Status ignoring relationships. The session's `status` includes them.
    pub fn own_status(&self) -> BoStatus {
        BoStatus {
            is_new: self.is_new,
            is_dirty: self.is_self_dirty(),
            is_deleted: self.is_deleted,
            is_editing: self.is_editing,
        }
    }

    /// Get a property value.
    pub fn value(&self, name: &str) -> Result<&Value, Error> {
        self.prop(name).map(BoProp::value)
    }

    /// Get a property.
    pub fn prop(&self, name: &str) -> Result<&BoProp, Error> {
        self.props.get(name).ok_or_else(|| Error::PropertyNotFound {
            class: self.class_def.name.clone(),
            property: name.to_string(),
        })
    }

    /// Properties in class definition order.
    pub fn props(&self) -> impl Iterator<Item = &BoProp> {
        self.props.iter()
    }

    /// Names of edited properties.
    pub fn dirty_props(&self) -> Vec<&str> {
        self.props.dirty_names()
    }

    /// Current values of the named properties.
    pub fn values_of(&self, names: &[&str]) -> Result<Vec<Value>, Error> {
        names.iter().map(|n| self.value(n).cloned()).collect()
    }

    /// Relationships of this object.
    pub fn relationships(&self) -> &RelationshipCol {
        &self.relationships
    }

    pub(crate) fn relationships_mut(&mut self) -> &mut RelationshipCol {
        &mut self.relationships
    }

    /// Set a property value. Returns whether it changed.
    pub(crate) fn set_value(&mut self, name: &str, value: Value) -> Result<bool, Error> {
        let def = self
            .class_def
            .prop(name)
            .ok_or_else(|| Error::PropertyNotFound {
                class: self.class_def.name.clone(),
                property: name.to_string(),
            })?;

        if name == self.class_def.primary_key {
            return Err(Error::Developer(format!(
                "the primary key '{}' of class '{}' cannot be changed",
                name, self.class_def.name
            )));
        }
        if !def.prop_type.accepts(&value) {
            return Err(Error::InvalidValue {
                class: self.class_def.name.clone(),
                property: name.to_string(),
                expected: def.prop_type,
                actual: value.type_name().to_string(),
            });
        }

        let changed = self.props.set(name, value);
        if changed {
            self.is_editing = true;
        }
        Ok(changed)
    }

    /// Revert the named properties to their persisted values.
    pub(crate) fn revert_props(&mut self, names: &[&str]) {
        self.props.revert(names);
        self.refresh_editing();
    }

    /// Revert all edits and clear a pending delete.
    pub(crate) fn cancel_own_edits(&mut self) {
        self.props.revert_all();
        if self.delete_pending {
            self.is_deleted = false;
            self.delete_pending = false;
        }
        self.is_editing = false;
    }

    /// Clear a pending delete, keeping property edits.
    pub(crate) fn unmark_for_delete(&mut self) {
        if self.delete_pending {
            self.is_deleted = false;
            self.delete_pending = false;
        }
        self.refresh_editing();
    }

    /// Drop a never-saved object. It stays in the map as gone.
    pub(crate) fn discard(&mut self) {
        self.props.revert_all();
        self.is_deleted = true;
        self.delete_pending = false;
        self.is_editing = false;
    }

    pub(crate) fn mark_deleted(&mut self) {
        self.is_deleted = true;
        self.delete_pending = true;
        self.is_editing = true;
    }

    /// Record a completed insert or update.
    pub(crate) fn mark_saved(&mut self) {
        self.props.mark_all_persisted();
        self.relationships.clear_moves();
        self.is_new = false;
        self.is_editing = false;
    }

    /// Record a completed delete. The object stays deleted and becomes new.
    pub(crate) fn mark_delete_saved(&mut self) {
        self.props.mark_all_persisted();
        self.relationships.clear_moves();
        self.is_new = true;
        self.delete_pending = false;
        self.is_editing = false;
    }

    /// Accept the named properties as persisted. The object stays dirty
    /// while any other property is still edited.
    pub(crate) fn mark_props_persisted(&mut self, names: &[&str]) {
        self.props.mark_persisted(names);
        self.refresh_editing();
    }

    /// Overwrite a property with a value that is already persisted.
    pub(crate) fn load_value(&mut self, name: &str, value: Value) {
        self.props.load(name, value);
        self.refresh_editing();
    }

    fn refresh_editing(&mut self) {
        self.is_editing = self.is_self_dirty();
    }

    /// Names of compulsory properties that are null.
    pub(crate) fn missing_compulsory(&self) -> Vec<&str> {
        self.class_def
            .props
            .iter()
            .filter(|def| def.compulsory)
            .filter(|def| self.props.get(&def.name).map_or(true, |p| p.value().is_null()))
            .map(|def| def.name.as_str())
            .collect()
    }

    /// Full stored form.
    pub(crate) fn to_record(&self) -> StoredRecord {
        StoredRecord {
            id: self.id,
            class: self.class_def.name.clone(),
            fields: self
                .props
                .iter()
                .filter(|p| p.name() != self.class_def.primary_key)
                .map(|p| StoredField {
                    name: p.name().to_string(),
                    value: p.value().clone(),
                })
                .collect(),
        }
    }

    /// Stored form of a subset of properties.
    pub(crate) fn fields_of(&self, names: &[&str]) -> Vec<StoredField> {
        self.props
            .iter()
            .filter(|p| names.contains(&p.name()))
            .map(|p| StoredField {
                name: p.name().to_string(),
                value: p.value().clone(),
            })
            .collect()
    }
}
