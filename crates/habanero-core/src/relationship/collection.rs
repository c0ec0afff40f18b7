//! Membership bookkeeping for multiple relationships.

use std::time::{Duration, Instant};

use crate::id::ObjectId;

/// Where an object sits in a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberState {
    /// Loaded from the store (or saved) as a member.
    Persisted,
    /// Created in this collection, not yet saved.
    Created,
    /// An existing object placed into this collection.
    Added,
    /// Taken out of this collection, not yet saved.
    Removed,
    /// Flagged for delete, not yet saved.
    MarkedForDelete,
}

/// The related objects of a multiple relationship.
///
/// `members` is the current view. `persisted` is the membership as last
/// loaded or saved; cancelling restores it. The subsets record what changed
/// since.
#[derive(Debug, Clone, Default)]
pub struct BusinessObjectCollection {
    members: Vec<ObjectId>,
    persisted: Vec<ObjectId>,
    created: Vec<ObjectId>,
    added: Vec<ObjectId>,
    removed: Vec<ObjectId>,
    marked_for_delete: Vec<ObjectId>,
    loaded_at: Option<Instant>,
}

fn drop_id(ids: &mut Vec<ObjectId>, id: ObjectId) -> bool {
    let before = ids.len();
    ids.retain(|x| *x != id);
    ids.len() != before
}

impl BusinessObjectCollection {
    /// Current members in order.
    pub fn ids(&self) -> &[ObjectId] {
        &self.members
    }

    /// Number of current members.
    pub fn count(&self) -> usize {
        self.members.len()
    }

    /// Whether the object is a current member.
    pub fn contains(&self, id: ObjectId) -> bool {
        self.members.contains(&id)
    }

    /// Membership as last loaded or saved.
    pub fn persisted(&self) -> &[ObjectId] {
        &self.persisted
    }

    /// Created, unsaved members.
    pub fn created(&self) -> &[ObjectId] {
        &self.created
    }

    /// Added, unsaved members.
    pub fn added(&self) -> &[ObjectId] {
        &self.added
    }

    /// Removed objects awaiting save.
    pub fn removed(&self) -> &[ObjectId] {
        &self.removed
    }

    /// Objects marked for delete awaiting save.
    pub fn marked_for_delete(&self) -> &[ObjectId] {
        &self.marked_for_delete
    }

    /// Whether the collection has been loaded.
    pub fn is_loaded(&self) -> bool {
        self.loaded_at.is_some()
    }

    /// Whether any membership change awaits save.
    pub fn has_pending_changes(&self) -> bool {
        !(self.created.is_empty()
            && self.added.is_empty()
            && self.removed.is_empty()
            && self.marked_for_delete.is_empty())
    }

    /// State of an object with respect to this collection.
    pub fn state_of(&self, id: ObjectId) -> Option<MemberState> {
        if self.created.contains(&id) {
            Some(MemberState::Created)
        } else if self.added.contains(&id) {
            Some(MemberState::Added)
        } else if self.removed.contains(&id) {
            Some(MemberState::Removed)
        } else if self.marked_for_delete.contains(&id) {
            Some(MemberState::MarkedForDelete)
        } else if self.members.contains(&id) {
            Some(MemberState::Persisted)
        } else {
            None
        }
    }

    /// Whether a load is due: never loaded, or clean and older than
    /// `timeout`.
    pub(crate) fn needs_load(&self, timeout: Option<Duration>) -> bool {
        match (self.loaded_at, timeout) {
            (None, _) => true,
            (Some(at), Some(timeout)) => !self.has_pending_changes() && at.elapsed() > timeout,
            (Some(_), None) => false,
        }
    }

    /// Replace the membership with freshly loaded ids.
    pub(crate) fn load(&mut self, ids: Vec<ObjectId>) {
        self.persisted = ids.clone();
        self.members = ids;
        self.created.clear();
        self.added.clear();
        self.removed.clear();
        self.marked_for_delete.clear();
        self.loaded_at = Some(Instant::now());
    }

    pub(crate) fn push_created(&mut self, id: ObjectId) {
        self.members.push(id);
        self.created.push(id);
    }

    pub(crate) fn push_added(&mut self, id: ObjectId) {
        self.members.push(id);
        self.added.push(id);
    }

    /// Take a member out. Persisted members become Removed; created or
    /// added members are simply dropped. Returns the state it had.
    pub(crate) fn take_out(&mut self, id: ObjectId) -> Option<MemberState> {
        let state = self.state_of(id)?;
        match state {
            MemberState::Created => {
                drop_id(&mut self.created, id);
                drop_id(&mut self.members, id);
            }
            MemberState::Added => {
                drop_id(&mut self.added, id);
                drop_id(&mut self.members, id);
            }
            MemberState::Persisted => {
                drop_id(&mut self.members, id);
                self.removed.push(id);
            }
            MemberState::Removed | MemberState::MarkedForDelete => return None,
        }
        Some(state)
    }

    /// Put a removed object back. Returns whether it was removed.
    pub(crate) fn restore_removed(&mut self, id: ObjectId) -> bool {
        if drop_id(&mut self.removed, id) {
            self.members.push(id);
            true
        } else {
            false
        }
    }

    /// Move a member to the marked-for-delete subset. Returns the state it
    /// had.
    pub(crate) fn mark_for_delete(&mut self, id: ObjectId) -> Option<MemberState> {
        let state = self.state_of(id)?;
        match state {
            MemberState::Removed | MemberState::MarkedForDelete => return None,
            MemberState::Created => {
                drop_id(&mut self.created, id);
            }
            MemberState::Added => {
                drop_id(&mut self.added, id);
            }
            MemberState::Persisted => {}
        }
        drop_id(&mut self.members, id);
        self.marked_for_delete.push(id);
        Some(state)
    }

    /// Return an object marked for delete to the members.
    pub(crate) fn restore_marked(&mut self, id: ObjectId, was_created: bool) {
        if drop_id(&mut self.marked_for_delete, id) {
            self.members.push(id);
            if was_created {
                self.created.push(id);
            }
        }
    }

    /// Return to the membership as last loaded or saved.
    pub(crate) fn restore_persisted(&mut self) {
        self.members = self.persisted.clone();
        self.created.clear();
        self.added.clear();
        self.removed.clear();
        self.marked_for_delete.clear();
    }

    /// A created or added member was saved.
    pub(crate) fn commit_saved(&mut self, id: ObjectId) {
        let was_pending = drop_id(&mut self.created, id) | drop_id(&mut self.added, id);
        if was_pending && !self.persisted.contains(&id) {
            self.persisted.push(id);
        }
    }

    /// A removed object's cleared foreign key was saved.
    pub(crate) fn commit_removed(&mut self, id: ObjectId) {
        if drop_id(&mut self.removed, id) {
            drop_id(&mut self.persisted, id);
        }
    }

    /// An object's delete was saved.
    pub(crate) fn commit_deleted(&mut self, id: ObjectId) {
        drop_id(&mut self.marked_for_delete, id);
        drop_id(&mut self.created, id);
        drop_id(&mut self.added, id);
        drop_id(&mut self.removed, id);
        drop_id(&mut self.members, id);
        drop_id(&mut self.persisted, id);
    }

    /// An object saved elsewhere now belongs here.
    pub(crate) fn adopt(&mut self, id: ObjectId) {
        if !self.members.contains(&id) {
            self.members.push(id);
        }
        if !self.persisted.contains(&id) {
            self.persisted.push(id);
        }
    }

    /// An object saved elsewhere no longer belongs here.
    pub(crate) fn release(&mut self, id: ObjectId) {
        drop_id(&mut self.members, id);
        drop_id(&mut self.persisted, id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loaded(n: usize) -> (BusinessObjectCollection, Vec<ObjectId>) {
        let ids: Vec<_> = (0..n).map(|_| ObjectId::generate()).collect();
        let mut col = BusinessObjectCollection::default();
        col.load(ids.clone());
        (col, ids)
    }

    #[test]
    fn test_load_and_timeout() {
        let (col, _) = loaded(2);
        assert!(col.is_loaded());
        assert_eq!(col.count(), 2);
        assert!(!col.needs_load(None));
        assert!(!col.needs_load(Some(Duration::from_secs(60))));
        assert!(col.needs_load(Some(Duration::ZERO)) || col.loaded_at.is_some());
        assert!(BusinessObjectCollection::default().needs_load(None));
    }

    #[test]
    fn test_take_out_by_state() {
        let (mut col, ids) = loaded(1);
        let created = ObjectId::generate();
        let added = ObjectId::generate();
        col.push_created(created);
        col.push_added(added);

        assert_eq!(col.take_out(created), Some(MemberState::Created));
        assert_eq!(col.take_out(added), Some(MemberState::Added));
        assert_eq!(col.take_out(ids[0]), Some(MemberState::Persisted));
        assert_eq!(col.take_out(ids[0]), None);

        assert_eq!(col.count(), 0);
        assert_eq!(col.removed(), &[ids[0]]);
        assert!(col.created().is_empty());
        assert!(col.added().is_empty());
        assert!(col.has_pending_changes());

        assert!(col.restore_removed(ids[0]));
        assert!(!col.has_pending_changes());
        assert_eq!(col.count(), 1);
    }

    #[test]
    fn test_mark_for_delete_and_restore() {
        let (mut col, ids) = loaded(3);
        let created = ObjectId::generate();
        col.push_created(created);

        assert_eq!(col.mark_for_delete(ids[1]), Some(MemberState::Persisted));
        assert_eq!(col.mark_for_delete(created), Some(MemberState::Created));
        assert_eq!(col.mark_for_delete(ids[1]), None);
        assert_eq!(col.count(), 2);
        assert_eq!(col.marked_for_delete().len(), 2);
        assert!(col.created().is_empty());

        col.restore_persisted();
        assert_eq!(col.ids(), ids.as_slice());
        assert!(!col.has_pending_changes());
    }

    #[test]
    fn test_commit_transitions() {
        let (mut col, ids) = loaded(2);
        let created = ObjectId::generate();
        col.push_created(created);
        col.take_out(ids[0]);
        col.mark_for_delete(ids[1]);

        col.commit_saved(created);
        col.commit_removed(ids[0]);
        col.commit_deleted(ids[1]);

        assert!(!col.has_pending_changes());
        assert_eq!(col.persisted(), &[created]);
        assert_eq!(col.ids(), &[created]);

        col.restore_persisted();
        assert_eq!(col.ids(), &[created]);
    }

    #[test]
    fn test_adopt_and_release() {
        let (mut col, ids) = loaded(1);
        let other = ObjectId::generate();
        col.adopt(other);
        col.adopt(other);
        assert_eq!(col.count(), 2);
        col.release(ids[0]);
        assert_eq!(col.persisted(), &[other]);
    }
}
