//! Relationship to at most one related object.

use std::collections::HashSet;
use std::sync::Arc;

use crate::catalog::RelationshipDef;
use crate::id::ObjectId;
use crate::object::IdentityMap;
use crate::value::Value;

/// Runtime state of a single relationship.
///
/// `related` caches the resolved object together with the key values it
/// was resolved for; the session re-resolves when the key moves. `added`
/// and `removed` track related objects whose foreign key this relationship
/// rewrote and which still need their key saved. `moved` tracks an unsaved
/// reassignment of the owner's own foreign key.
#[derive(Debug, Clone)]
pub struct SingleRelationship {
    def: Arc<RelationshipDef>,
    related: Option<ObjectId>,
    resolved_key: Option<Vec<Value>>,
    loaded: bool,
    added: Option<ObjectId>,
    removed: Option<ObjectId>,
    moved: Option<PendingMove>,
}

/// Related objects before and after an unsaved owner-side reassignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingMove {
    /// Related object as last saved.
    pub from: Option<ObjectId>,
    /// Related object now.
    pub to: Option<ObjectId>,
}

impl SingleRelationship {
    pub(crate) fn new(def: Arc<RelationshipDef>) -> Self {
        Self {
            def,
            related: None,
            resolved_key: None,
            loaded: false,
            added: None,
            removed: None,
            moved: None,
        }
    }

    /// Relationship definition.
    pub fn def(&self) -> &Arc<RelationshipDef> {
        &self.def
    }

    /// Cached related object, if resolved.
    pub fn related_id(&self) -> Option<ObjectId> {
        self.related
    }

    /// Whether the relationship has been resolved at least once.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Whether a previously related object was detached and not yet saved.
    pub fn is_removed(&self) -> bool {
        self.removed.is_some()
    }

    /// The detached object awaiting save.
    pub fn removed_object(&self) -> Option<ObjectId> {
        self.removed
    }

    /// The newly attached object awaiting save.
    pub fn added_object(&self) -> Option<ObjectId> {
        self.added
    }

    /// Pending reassignment of the owner's foreign key.
    pub fn moved(&self) -> Option<PendingMove> {
        self.moved
    }

    /// Record that the owner's foreign key now points at `to`. Moving back
    /// to the saved object clears the record.
    pub(crate) fn record_move(&mut self, from: Option<ObjectId>, to: Option<ObjectId>) {
        let from = self.moved.map_or(from, |m| m.from);
        self.moved = (from != to).then_some(PendingMove { from, to });
    }

    pub(crate) fn clear_move(&mut self) {
        self.moved = None;
    }

    /// Whether the cache is valid for the given key values.
    pub(crate) fn is_resolved_for(&self, key: Option<&[Value]>) -> bool {
        self.loaded && self.resolved_key.as_deref() == key
    }

    pub(crate) fn cache(&mut self, related: Option<ObjectId>, key: Option<Vec<Value>>) {
        self.related = related;
        self.resolved_key = key;
        self.loaded = true;
    }

    pub(crate) fn invalidate(&mut self) {
        self.related = None;
        self.resolved_key = None;
        self.loaded = false;
    }

    pub(crate) fn set_added(&mut self, id: Option<ObjectId>) {
        self.added = id;
    }

    pub(crate) fn set_removed(&mut self, id: Option<ObjectId>) {
        self.removed = id;
    }

    /// Drop the cache if it points at `id`, and any pending tracking of it.
    pub(crate) fn forget(&mut self, id: ObjectId) {
        if self.related == Some(id) {
            self.invalidate();
        }
        if self.added == Some(id) {
            self.added = None;
        }
        if self.removed == Some(id) {
            self.removed = None;
        }
    }

    /// Whether the relationship has unsaved changes.
    ///
    /// Attaching or detaching an object counts. So does a related object
    /// awaiting insert or delete, and, for aggregation and composition, any
    /// edit of the related object.
    pub fn is_dirty(&self, map: &IdentityMap, visited: &mut HashSet<ObjectId>) -> bool {
        if self.added.is_some() || self.removed.is_some() {
            return true;
        }
        let Some(related) = self.related else {
            return false;
        };
        let Some(bo) = map.get(related) else {
            return false;
        };
        if bo.is_gone() {
            return false;
        }
        if bo.is_new() || bo.is_deleted() {
            return true;
        }
        self.def.kind.policy().member_edits_dirty_owner && map.is_dirty(related, visited)
    }

    /// Related objects this relationship would save.
    pub fn dirty_children(&self, owner: ObjectId, map: &IdentityMap) -> Vec<ObjectId> {
        let mut out = Vec::new();
        out.extend(self.added);
        out.extend(self.removed);

        if let Some(related) = self.related.filter(|r| !out.contains(r)) {
            if let Some(bo) = map.get(related).filter(|bo| !bo.is_gone()) {
                let edited = self.def.kind.policy().saves_members && {
                    let mut visited = HashSet::from([owner]);
                    map.is_dirty(related, &mut visited)
                };
                if bo.is_new() || bo.is_deleted() || edited {
                    out.push(related);
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::RelKeyDef;

    fn owner_relationship() -> SingleRelationship {
        SingleRelationship::new(Arc::new(RelationshipDef::single(
            "Owner",
            "Person",
            RelKeyDef::new("OwnerID", "PersonID"),
        )))
    }

    #[test]
    fn test_record_move_keeps_first_origin() {
        let (a, b, c) = (ObjectId::generate(), ObjectId::generate(), ObjectId::generate());
        let mut rel = owner_relationship();

        rel.record_move(Some(a), Some(b));
        rel.record_move(Some(b), Some(c));
        assert_eq!(rel.moved(), Some(PendingMove { from: Some(a), to: Some(c) }));

        rel.record_move(Some(c), Some(a));
        assert_eq!(rel.moved(), None);
    }

    #[test]
    fn test_move_to_nothing() {
        let a = ObjectId::generate();
        let mut rel = owner_relationship();
        rel.record_move(Some(a), None);
        assert_eq!(rel.moved(), Some(PendingMove { from: Some(a), to: None }));
        rel.clear_move();
        assert_eq!(rel.moved(), None);
    }
}
