//! Relationship navigation and mutation.

use std::sync::Arc;

use tracing::debug;

use super::{RelationshipUpdated, Session};
use crate::catalog::{ForeignKeySide, RelationshipDef, RelationshipKind};
use crate::error::Error;
use crate::id::ObjectId;
use crate::object::BusinessObject;
use crate::relationship::{BusinessObjectCollection, MemberState};
use crate::value::Value;

impl Session {
    // ========== Multiple relationships ==========

    /// Current members of a multiple relationship, loading it if needed.
    pub fn children(&mut self, owner: ObjectId, relationship: &str) -> Result<Vec<ObjectId>, Error> {
        Ok(self.collection(owner, relationship)?.ids().to_vec())
    }

    /// The collection behind a multiple relationship, loading it if needed.
    pub fn collection(
        &mut self,
        owner: ObjectId,
        relationship: &str,
    ) -> Result<&BusinessObjectCollection, Error> {
        let def = self.multiple_def(owner, relationship)?;
        self.ensure_loaded(owner, &def)?;
        self.collection_ref(owner, relationship)
    }

    /// Create a new object in a multiple relationship. Its foreign key is
    /// set from the owner.
    pub fn create_child(&mut self, owner: ObjectId, relationship: &str) -> Result<ObjectId, Error> {
        let def = self.multiple_def(owner, relationship)?;
        self.ensure_loaded(owner, &def)?;

        let class_def = Arc::clone(self.registry().get(&def.related_class)?);
        let child = self.objects.insert(BusinessObject::new(class_def));
        self.link_child(owner, &def, child)?;
        self.collection_mut(owner, relationship)?.push_created(child);
        debug!(owner = %owner, relationship, child = %child, "child created");
        Ok(child)
    }

    /// Add an existing object to a multiple relationship.
    ///
    /// A previously removed object is restored. A new object counts as
    /// created. Composition relationships refuse.
    pub fn add_child(&mut self, owner: ObjectId, relationship: &str, child: ObjectId) -> Result<(), Error> {
        let def = self.multiple_def(owner, relationship)?;
        self.check_add_remove(owner, &def, "add")?;
        self.require_class(child, &def.related_class, &def)?;
        self.ensure_loaded(owner, &def)?;

        match self.collection_ref(owner, relationship)?.state_of(child) {
            Some(MemberState::Removed) => {
                self.collection_mut(owner, relationship)?.restore_removed(child);
                self.objects
                    .require_mut(child)?
                    .revert_props(&def.key.related_props());
            }
            Some(MemberState::MarkedForDelete) => {
                return Err(Error::Developer(format!(
                    "{} is marked for delete and cannot be added to relationship '{}'",
                    child, def.name
                )));
            }
            Some(_) => {}
            None => {
                self.link_child(owner, &def, child)?;
                let is_new = self.objects.require(child)?.is_new();
                let collection = self.collection_mut(owner, relationship)?;
                if is_new {
                    collection.push_created(child);
                } else {
                    collection.push_added(child);
                }
                debug!(owner = %owner, relationship, child = %child, "child added");
            }
        }
        Ok(())
    }

    /// Remove an object from a multiple relationship.
    ///
    /// A persisted member has its foreign key cleared and is tracked as
    /// removed until saved; a created or added member is dropped and its
    /// foreign key reverted. Composition relationships refuse.
    pub fn remove_child(
        &mut self,
        owner: ObjectId,
        relationship: &str,
        child: ObjectId,
    ) -> Result<(), Error> {
        let def = self.multiple_def(owner, relationship)?;
        self.check_add_remove(owner, &def, "remove")?;
        self.ensure_loaded(owner, &def)?;

        let related_props = def.key.related_props();
        match self.collection_mut(owner, relationship)?.take_out(child) {
            Some(MemberState::Persisted) => {
                self.objects.clear_values(child, &related_props)?;
            }
            Some(_) => {
                self.objects.require_mut(child)?.revert_props(&related_props);
            }
            None => {
                return Err(Error::NotInRelationship {
                    relationship: def.name.clone(),
                    child,
                })
            }
        }
        debug!(owner = %owner, relationship, child = %child, "child removed");
        Ok(())
    }

    /// Mark a member of a multiple relationship for delete.
    pub fn mark_child_for_delete(
        &mut self,
        owner: ObjectId,
        relationship: &str,
        child: ObjectId,
    ) -> Result<(), Error> {
        if !self.collection(owner, relationship)?.contains(child) {
            return Err(Error::NotInRelationship {
                relationship: relationship.to_string(),
                child,
            });
        }
        self.mark_for_delete(child)
    }

    fn check_add_remove(&self, owner: ObjectId, def: &RelationshipDef, action: &str) -> Result<(), Error> {
        if def.kind.policy().allows_add_remove {
            return Ok(());
        }
        Err(Error::Developer(format!(
            "cannot {} objects through the {} relationship '{}' on class '{}'; \
             {} children can only be created through or deleted from their owner",
            action,
            def.kind,
            def.name,
            self.objects.require(owner)?.class_name(),
            def.kind
        )))
    }

    /// Copy the owner's key values onto the child's foreign key.
    fn link_child(&mut self, owner: ObjectId, def: &RelationshipDef, child: ObjectId) -> Result<(), Error> {
        let values = self.objects.require(owner)?.values_of(&def.key.owner_props())?;
        self.objects
            .set_values(child, &def.key.related_props(), &values)
    }

    // ========== Single relationships ==========

    /// The related object of a single relationship, if any.
    pub fn related(&mut self, owner: ObjectId, relationship: &str) -> Result<Option<ObjectId>, Error> {
        let def = self.single_def(owner, relationship)?;
        self.resolve_single(owner, &def)
    }

    /// The relationship on the related class pointing back to this one.
    pub fn reverse_relationship(
        &self,
        owner: ObjectId,
        relationship: &str,
    ) -> Result<Option<Arc<RelationshipDef>>, Error> {
        let def = self.relationship_def(owner, relationship)?;
        let class = self.objects.require(owner)?.class_name();
        self.registry().reverse_relationship(class, &def)
    }

    /// Point a single relationship at `related`, or clear it with `None`.
    ///
    /// Writes the foreign key on whichever side owns it. When the related
    /// side owns it, a displaced object has its key cleared and is tracked as
    /// removed until saved. When the owner holds it, the owner leaves the
    /// previous object's reverse collection and joins the new one's.
    pub fn set_related(
        &mut self,
        owner: ObjectId,
        relationship: &str,
        related: Option<ObjectId>,
    ) -> Result<(), Error> {
        let def = self.single_def(owner, relationship)?;
        let side = match def.foreign_key_side() {
            ForeignKeySide::Conflict(message) => return Err(Error::Developer(message)),
            side => side,
        };
        if let Some(id) = related {
            self.require_class(id, &def.related_class, &def)?;
        }

        let previous = self.resolve_single(owner, &def)?;
        if previous == related {
            return Ok(());
        }
        self.check_reassign(owner, &def, previous, related)?;

        let owner_props = def.key.owner_props();
        let related_props = def.key.related_props();
        match side {
            ForeignKeySide::Owner => {
                let reverse = self.reverse_collection_def(owner, &def)?;
                if let (Some(reverse), Some(old)) = (&reverse, previous) {
                    self.leave_reverse(old, reverse, owner)?;
                }
                let values = match related {
                    Some(id) => self.objects.require(id)?.values_of(&related_props)?,
                    None => vec![Value::Null; owner_props.len()],
                };
                self.objects.set_values(owner, &owner_props, &values)?;
                if let (Some(reverse), Some(new)) = (&reverse, related) {
                    self.join_reverse(new, reverse, owner)?;
                }
                if reverse.is_some() {
                    self.single_mut(owner, relationship)?.record_move(previous, related);
                }
            }
            _ => {
                let key = self.objects.require(owner)?.values_of(&owner_props)?;
                if let Some(old) = previous {
                    self.detach_related(owner, &def, old)?;
                }
                if let Some(new) = related {
                    self.attach_related(owner, &def, new, &key)?;
                }
            }
        }

        let key = self.objects.key_values(owner, &owner_props)?;
        self.single_mut(owner, relationship)?.cache(related, key);
        self.emit(RelationshipUpdated {
            owner,
            relationship: def.name.clone(),
            previous,
            current: related,
        });
        Ok(())
    }

    fn check_reassign(
        &self,
        owner: ObjectId,
        def: &RelationshipDef,
        previous: Option<ObjectId>,
        related: Option<ObjectId>,
    ) -> Result<(), Error> {
        let owner_bo = self.objects.require(owner)?;
        if !def.kind.policy().allows_reassign {
            if previous.is_some() {
                return Err(Error::Developer(format!(
                    "the related object of the composition relationship '{}' on class '{}' cannot be replaced or removed",
                    def.name,
                    owner_bo.class_name()
                )));
            }
            if let Some(id) = related {
                if !self.objects.require(id)?.is_new() {
                    return Err(Error::Developer(format!(
                        "the persisted object {} cannot be assigned to the composition relationship '{}' on class '{}'; only new objects can",
                        id,
                        def.name,
                        owner_bo.class_name()
                    )));
                }
            }
        }

        if previous.is_some() && !owner_bo.is_new() {
            let reverse = self.registry().reverse_relationship(owner_bo.class_name(), def)?;
            if let Some(reverse) = reverse.filter(|r| r.kind == RelationshipKind::Composition) {
                return Err(Error::Developer(format!(
                    "{} {} is owned through the composition relationship '{}' on class '{}' and cannot be moved to another parent",
                    owner_bo.class_name(),
                    owner,
                    reverse.name,
                    def.related_class
                )));
            }
        }
        Ok(())
    }

    /// The multiple relationship on the related class that lists owners of
    /// this single relationship, when the owner holds the foreign key.
    pub(super) fn reverse_collection_def(
        &self,
        owner: ObjectId,
        def: &RelationshipDef,
    ) -> Result<Option<Arc<RelationshipDef>>, Error> {
        let class = self.objects.require(owner)?.class_name();
        Ok(self
            .registry()
            .reverse_relationship(class, def)?
            .filter(|reverse| reverse.is_multiple()))
    }

    /// `child` stops pointing at `parent`. Loads the parent's collection
    /// while the child's key still matches it.
    fn leave_reverse(&mut self, parent: ObjectId, reverse: &RelationshipDef, child: ObjectId) -> Result<(), Error> {
        self.ensure_loaded(parent, reverse)?;
        if self.collection_mut(parent, &reverse.name)?.take_out(child).is_some() {
            debug!(parent = %parent, relationship = %reverse.name, child = %child, "child left parent");
        }
        Ok(())
    }

    /// `child` now points at `parent`.
    fn join_reverse(&mut self, parent: ObjectId, reverse: &RelationshipDef, child: ObjectId) -> Result<(), Error> {
        self.ensure_loaded(parent, reverse)?;
        let is_new = self.objects.require(child)?.is_new();
        let collection = self.collection_mut(parent, &reverse.name)?;
        match collection.state_of(child) {
            Some(MemberState::Removed) => {
                collection.restore_removed(child);
            }
            Some(_) => {}
            None if is_new => collection.push_created(child),
            None => collection.push_added(child),
        }
        debug!(parent = %parent, relationship = %reverse.name, child = %child, "child joined parent");
        Ok(())
    }

    /// The related side owns the key: take `old` out of the relationship.
    fn detach_related(&mut self, owner: ObjectId, def: &RelationshipDef, old: ObjectId) -> Result<(), Error> {
        let related_props = def.key.related_props();
        let single = self.single_mut(owner, &def.name)?;
        if single.added_object() == Some(old) {
            single.set_added(None);
            self.objects.require_mut(old)?.revert_props(&related_props);
            return Ok(());
        }
        let old_is_new = self.objects.require(old)?.is_new();
        self.objects.clear_values(old, &related_props)?;
        if !old_is_new {
            self.single_mut(owner, &def.name)?.set_removed(Some(old));
        }
        Ok(())
    }

    /// The related side owns the key: point `new` at the owner.
    fn attach_related(
        &mut self,
        owner: ObjectId,
        def: &RelationshipDef,
        new: ObjectId,
        key: &[Value],
    ) -> Result<(), Error> {
        let related_props = def.key.related_props();
        let single = self.single_mut(owner, &def.name)?;
        if single.removed_object() == Some(new) {
            single.set_removed(None);
            self.objects.require_mut(new)?.revert_props(&related_props);
            return Ok(());
        }
        self.objects.set_values(new, &related_props, key)?;
        self.single_mut(owner, &def.name)?.set_added(Some(new));
        Ok(())
    }
}
