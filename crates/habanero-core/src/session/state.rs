//! Dirty-state queries and cancelling edits.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use super::Session;
use crate::catalog::RelationshipDef;
use crate::error::Error;
use crate::id::ObjectId;
use crate::relationship::{MemberState, Relationship};

/// A pending owner-side move to settle once the owner's key is reverted.
struct PendingReverse {
    name: String,
    reverse: Arc<RelationshipDef>,
    parents: Vec<ObjectId>,
}

/// What cancelling one relationship has to undo.
struct RelationshipUndo {
    name: String,
    multiple: bool,
    related_props: Vec<String>,
    created: Vec<ObjectId>,
    relinked: Vec<ObjectId>,
    marked: Vec<ObjectId>,
    edited: Vec<ObjectId>,
}

impl Session {
    /// Whether a relationship has unsaved changes.
    pub fn relationship_is_dirty(&self, owner: ObjectId, relationship: &str) -> Result<bool, Error> {
        let bo = self.objects.require(owner)?;
        let rel = bo
            .relationships()
            .require(bo.class_name(), relationship)?;
        Ok(rel.is_dirty(&self.objects, &mut HashSet::from([owner])))
    }

    /// Related objects a relationship would save with its owner.
    pub fn dirty_children(&self, owner: ObjectId, relationship: &str) -> Result<Vec<ObjectId>, Error> {
        let bo = self.objects.require(owner)?;
        let rel = bo
            .relationships()
            .require(bo.class_name(), relationship)?;
        Ok(rel.dirty_children(owner, &self.objects))
    }

    /// Union of the dirty children of every relationship of an object.
    pub fn all_dirty_children(&self, owner: ObjectId) -> Result<Vec<ObjectId>, Error> {
        let bo = self.objects.require(owner)?;
        Ok(bo.relationships().dirty_children(owner, &self.objects))
    }

    /// Discard every unsaved change of an object and, transitively, of the
    /// related objects its relationships would save.
    ///
    /// Created members leave their collections and are discarded; added
    /// and removed members get their foreign keys back; members marked for
    /// delete return. Edited members are reverted for aggregation and
    /// composition only. Cancelling a child alone leaves its parents'
    /// collections untouched, except where the child moved itself to
    /// another parent through `set_related`: that move is undone in both
    /// parents' loaded collections.
    pub fn cancel_edits(&mut self, id: ObjectId) -> Result<(), Error> {
        self.objects.require(id)?;
        let mut visited = HashSet::new();
        self.cancel_object(id, &mut visited)?;
        debug!(id = %id, objects = visited.len(), "edits cancelled");
        Ok(())
    }

    fn cancel_object(&mut self, id: ObjectId, visited: &mut HashSet<ObjectId>) -> Result<(), Error> {
        if !visited.insert(id) {
            return Ok(());
        }
        let moves = self.pending_moves(id)?;

        for undo in self.relationship_undos(id)? {
            let props: Vec<&str> = undo.related_props.iter().map(String::as_str).collect();
            for child in &undo.created {
                self.cancel_object(*child, visited)?;
                self.objects.require_mut(*child)?.discard();
            }
            for child in &undo.relinked {
                let child_moves = self.pending_moves(*child)?;
                self.objects.require_mut(*child)?.revert_props(&props);
                self.settle_moves(*child, child_moves)?;
            }
            for child in &undo.marked {
                self.undo_delete(*child)?;
                if self.objects.require(*child)?.is_new() {
                    self.cancel_object(*child, visited)?;
                    if undo.multiple {
                        self.objects.require_mut(*child)?.discard();
                    }
                } else {
                    self.objects.require_mut(*child)?.revert_props(&props);
                }
            }
            for child in &undo.edited {
                self.cancel_object(*child, visited)?;
            }

            let bo = self.objects.require_mut(id)?;
            if let Some(rel) = bo.relationships_mut().get_mut(&undo.name) {
                match rel {
                    Relationship::Multiple(m) => m.collection_mut().restore_persisted(),
                    Relationship::Single(s) => {
                        s.set_added(None);
                        s.set_removed(None);
                        s.invalidate();
                        s.clear_move();
                    }
                }
            }
        }

        self.objects.require_mut(id)?.cancel_own_edits();
        self.settle_moves(id, moves)
    }

    /// Owner-side reassignments of `id` awaiting save: the relationship,
    /// the reverse multiple relationship and the objects moved between.
    fn pending_moves(&self, id: ObjectId) -> Result<Vec<PendingReverse>, Error> {
        let bo = self.objects.require(id)?;
        let moved: Vec<_> = bo
            .relationships()
            .iter()
            .filter_map(|r| r.as_single())
            .filter_map(|s| s.moved().map(|m| (s.def().name.clone(), Arc::clone(s.def()), m)))
            .collect();

        let mut pending = Vec::new();
        for (name, def, m) in moved {
            if let Some(reverse) = self.reverse_collection_def(id, &def)? {
                pending.push(PendingReverse {
                    name,
                    reverse,
                    parents: m.from.into_iter().chain(m.to).collect(),
                });
            }
        }
        Ok(pending)
    }

    /// Line loaded reverse collections up with the current key of `child`
    /// after its key was reverted, then forget the moves.
    fn settle_moves(&mut self, child: ObjectId, moves: Vec<PendingReverse>) -> Result<(), Error> {
        for PendingReverse { name, reverse, parents } in moves {
            let owner_props = reverse.key.owner_props();
            let related_props = reverse.key.related_props();
            for parent in parents {
                let loaded = self
                    .collection_ref(parent, &reverse.name)
                    .is_ok_and(|c| c.is_loaded());
                if !loaded {
                    continue;
                }
                let key = self.objects.require(parent)?.values_of(&owner_props)?;
                let matches = self.matches_key(child, &related_props, &key);
                let collection = self.collection_mut(parent, &reverse.name)?;
                match (collection.state_of(child), matches) {
                    (Some(MemberState::Created | MemberState::Added), false) => {
                        collection.take_out(child);
                    }
                    (Some(MemberState::Removed), true) => {
                        collection.restore_removed(child);
                    }
                    _ => {}
                }
            }
            self.single_mut(child, &name)?.clear_move();
        }
        Ok(())
    }

    /// Clear a pending delete and any delete it cascaded into loaded
    /// relationships.
    fn undo_delete(&mut self, id: ObjectId) -> Result<(), Error> {
        let bo = self.objects.require(id)?;
        if !bo.is_delete_pending() {
            return Ok(());
        }
        let cascaded: Vec<(String, Vec<ObjectId>)> = bo
            .relationships()
            .iter()
            .filter(|r| r.def().delete_parent_action.policy().cascades_delete)
            .filter_map(|r| r.as_multiple())
            .map(|m| (m.def().name.clone(), m.collection().marked_for_delete().to_vec()))
            .collect();
        let cascaded_single: Vec<ObjectId> = bo
            .relationships()
            .iter()
            .filter(|r| r.def().delete_parent_action.policy().cascades_delete)
            .filter_map(|r| r.as_single())
            .filter_map(|s| s.related_id())
            .collect();

        self.objects.require_mut(id)?.unmark_for_delete();
        for related in cascaded_single {
            self.undo_delete(related)?;
        }
        for (name, marked) in cascaded {
            for child in marked {
                self.undo_delete(child)?;
                let is_new = self.objects.require(child)?.is_new();
                self.collection_mut(id, &name)?.restore_marked(child, is_new);
            }
        }
        Ok(())
    }

    /// Snapshot what each relationship of `id` needs undone.
    fn relationship_undos(&self, id: ObjectId) -> Result<Vec<RelationshipUndo>, Error> {
        let bo = self.objects.require(id)?;
        let mut undos = Vec::new();
        for rel in bo.relationships().iter() {
            let def = rel.def();
            let policy = def.kind.policy();
            let related_props = def
                .key
                .related_props()
                .into_iter()
                .map(str::to_string)
                .collect();
            let undo = match rel {
                Relationship::Multiple(m) => {
                    let col = m.collection();
                    RelationshipUndo {
                        name: def.name.clone(),
                        multiple: true,
                        related_props,
                        created: col.created().to_vec(),
                        relinked: col.added().iter().chain(col.removed()).copied().collect(),
                        marked: col.marked_for_delete().to_vec(),
                        edited: if policy.cancel_member_edits {
                            m.edited_members(id, &self.objects)
                        } else {
                            Vec::new()
                        },
                    }
                }
                Relationship::Single(s) => {
                    let pending_delete = s
                        .related_id()
                        .filter(|r| self.objects.get(*r).is_some_and(|bo| bo.is_delete_pending()))
                        .filter(|_| def.delete_parent_action.policy().cascades_delete);
                    let edited = s
                        .related_id()
                        .filter(|_| policy.cancel_member_edits)
                        .filter(|r| self.objects.is_dirty(*r, &mut HashSet::from([id])));
                    RelationshipUndo {
                        name: def.name.clone(),
                        multiple: false,
                        related_props,
                        created: Vec::new(),
                        relinked: s.added_object().into_iter().chain(s.removed_object()).collect(),
                        marked: pending_delete.into_iter().collect(),
                        edited: edited.into_iter().collect(),
                    }
                }
            };
            undos.push(undo);
        }
        Ok(undos)
    }
}
