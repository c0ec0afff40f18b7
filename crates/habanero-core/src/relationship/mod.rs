//! Runtime relationships between business objects.
//!
//! Every business object carries one [`Relationship`] per relationship
//! definition of its class. Relationships hold related objects by id into
//! the session's identity map; the session performs every mutation so
//! cascades can reach both sides.

mod col;
mod collection;
mod multiple;
mod policy;
mod single;

use std::collections::HashSet;
use std::sync::Arc;

pub use col::RelationshipCol;
pub use collection::{BusinessObjectCollection, MemberState};
pub use multiple::MultipleRelationship;
pub use policy::{DeletePolicy, KindPolicy};
pub use single::{PendingMove, SingleRelationship};

use crate::catalog::RelationshipDef;
use crate::id::ObjectId;
use crate::object::IdentityMap;

/// A relationship of one owning object.
#[derive(Debug, Clone)]
pub enum Relationship {
    /// At most one related object.
    Single(SingleRelationship),
    /// Any number of related objects.
    Multiple(MultipleRelationship),
}

impl Relationship {
    /// Relationship definition.
    pub fn def(&self) -> &Arc<RelationshipDef> {
        match self {
            Relationship::Single(r) => r.def(),
            Relationship::Multiple(r) => r.def(),
        }
    }

    /// Relationship name.
    pub fn name(&self) -> &str {
        &self.def().name
    }

    /// The single relationship, or None for a multiple one.
    pub fn as_single(&self) -> Option<&SingleRelationship> {
        match self {
            Relationship::Single(r) => Some(r),
            Relationship::Multiple(_) => None,
        }
    }

    /// The multiple relationship, or None for a single one.
    pub fn as_multiple(&self) -> Option<&MultipleRelationship> {
        match self {
            Relationship::Multiple(r) => Some(r),
            Relationship::Single(_) => None,
        }
    }

    pub(crate) fn as_single_mut(&mut self) -> Option<&mut SingleRelationship> {
        match self {
            Relationship::Single(r) => Some(r),
            Relationship::Multiple(_) => None,
        }
    }

    pub(crate) fn as_multiple_mut(&mut self) -> Option<&mut MultipleRelationship> {
        match self {
            Relationship::Multiple(r) => Some(r),
            Relationship::Single(_) => None,
        }
    }

    /// Whether the relationship has unsaved changes.
    pub fn is_dirty(&self, map: &IdentityMap, visited: &mut HashSet<ObjectId>) -> bool {
        match self {
            Relationship::Single(r) => r.is_dirty(map, visited),
            Relationship::Multiple(r) => r.is_dirty(map, visited),
        }
    }

    /// Related objects that would be saved with the owner.
    pub fn dirty_children(&self, owner: ObjectId, map: &IdentityMap) -> Vec<ObjectId> {
        match self {
            Relationship::Single(r) => r.dirty_children(owner, map),
            Relationship::Multiple(r) => r.dirty_children(owner, map),
        }
    }

    /// Drop every reference this relationship holds to `id`.
    pub(crate) fn forget(&mut self, id: ObjectId) {
        match self {
            Relationship::Single(r) => r.forget(id),
            Relationship::Multiple(r) => r.collection_mut().commit_deleted(id),
        }
    }
}
