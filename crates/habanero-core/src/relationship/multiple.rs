//! Relationship to zero or more related objects.

use std::collections::HashSet;
use std::sync::Arc;

use crate::catalog::{InsertParentAction, RelationshipDef};
use crate::id::ObjectId;
use crate::object::IdentityMap;

use super::collection::BusinessObjectCollection;

/// Runtime state of a multiple relationship.
#[derive(Debug, Clone)]
pub struct MultipleRelationship {
    def: Arc<RelationshipDef>,
    collection: BusinessObjectCollection,
}

impl MultipleRelationship {
    pub(crate) fn new(def: Arc<RelationshipDef>) -> Self {
        Self {
            def,
            collection: BusinessObjectCollection::default(),
        }
    }

    /// Relationship definition.
    pub fn def(&self) -> &Arc<RelationshipDef> {
        &self.def
    }

    /// Related objects.
    pub fn collection(&self) -> &BusinessObjectCollection {
        &self.collection
    }

    pub(crate) fn collection_mut(&mut self) -> &mut BusinessObjectCollection {
        &mut self.collection
    }

    /// Whether the relationship has unsaved changes.
    ///
    /// Membership changes always count. For aggregation and composition a
    /// dirty member counts too.
    pub fn is_dirty(&self, map: &IdentityMap, visited: &mut HashSet<ObjectId>) -> bool {
        if self.collection.has_pending_changes() {
            return true;
        }
        self.def.kind.policy().member_edits_dirty_owner
            && self.collection.ids().iter().any(|id| map.is_dirty(*id, visited))
    }

    /// Persisted members that are dirty themselves.
    pub fn edited_members(&self, owner: ObjectId, map: &IdentityMap) -> Vec<ObjectId> {
        self.collection
            .ids()
            .iter()
            .copied()
            .filter(|id| {
                !self.collection.created().contains(id) && !self.collection.added().contains(id)
            })
            .filter(|id| {
                let mut visited = HashSet::from([owner]);
                map.is_dirty(*id, &mut visited)
            })
            .collect()
    }

    /// Related objects this relationship would save.
    ///
    /// Created objects are left out when the insert-parent action is
    /// `DoNothing`. Edited members are included for aggregation and
    /// composition only.
    pub fn dirty_children(&self, owner: ObjectId, map: &IdentityMap) -> Vec<ObjectId> {
        let mut out: Vec<ObjectId> = Vec::new();
        if self.def.insert_parent_action == InsertParentAction::InsertRelationship {
            out.extend(self.collection.created());
        }
        out.extend(self.collection.added());
        out.extend(self.collection.removed());
        out.extend(self.collection.marked_for_delete());
        if self.def.kind.policy().saves_members {
            for id in self.edited_members(owner, map) {
                if !out.contains(&id) {
                    out.push(id);
                }
            }
        }
        out
    }
}
