//! Policy tables for relationship kinds and delete-parent actions.
//!
//! Relationship code looks behaviour up here instead of branching on the
//! kind inline, so every rule is listed once per kind.

use crate::catalog::{DeleteParentAction, RelationshipKind};

/// Behaviour of one relationship kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindPolicy {
    /// A dirty related object makes the relationship dirty.
    pub member_edits_dirty_owner: bool,
    /// Cancelling the owner reverts edits of related objects.
    pub cancel_member_edits: bool,
    /// Saving the owner saves edited related objects in full.
    pub saves_members: bool,
    /// Existing objects may be added to or removed from the relationship.
    pub allows_add_remove: bool,
    /// An existing related object may be replaced or cleared, and a
    /// persisted object may be assigned.
    pub allows_reassign: bool,
}

const ASSOCIATION: KindPolicy = KindPolicy {
    member_edits_dirty_owner: false,
    cancel_member_edits: false,
    saves_members: false,
    allows_add_remove: true,
    allows_reassign: true,
};

const AGGREGATION: KindPolicy = KindPolicy {
    member_edits_dirty_owner: true,
    cancel_member_edits: true,
    saves_members: true,
    allows_add_remove: true,
    allows_reassign: true,
};

const COMPOSITION: KindPolicy = KindPolicy {
    member_edits_dirty_owner: true,
    cancel_member_edits: true,
    saves_members: true,
    allows_add_remove: false,
    allows_reassign: false,
};

impl RelationshipKind {
    /// Policy for this kind.
    pub fn policy(self) -> &'static KindPolicy {
        match self {
            RelationshipKind::Association => &ASSOCIATION,
            RelationshipKind::Aggregation => &AGGREGATION,
            RelationshipKind::Composition => &COMPOSITION,
        }
    }
}

/// Behaviour of one delete-parent action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeletePolicy {
    /// Related objects make the owner undeletable.
    pub prevents_delete: bool,
    /// Marking the owner for delete marks related objects too.
    pub cascades_delete: bool,
    /// Saving the owner's delete clears related objects' foreign keys.
    pub dereferences_on_save: bool,
}

impl DeleteParentAction {
    /// Policy for this action.
    pub fn policy(self) -> DeletePolicy {
        DeletePolicy {
            prevents_delete: self == DeleteParentAction::Prevent,
            cascades_delete: self == DeleteParentAction::DeleteRelated,
            dereferences_on_save: self == DeleteParentAction::DereferenceRelated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_owning_kinds_cascade_edits() {
        assert!(!RelationshipKind::Association.policy().member_edits_dirty_owner);
        assert!(RelationshipKind::Aggregation.policy().member_edits_dirty_owner);
        assert!(RelationshipKind::Composition.policy().cancel_member_edits);
    }

    #[test]
    fn test_composition_restrictions() {
        let policy = RelationshipKind::Composition.policy();
        assert!(!policy.allows_add_remove);
        assert!(!policy.allows_reassign);
        assert!(RelationshipKind::Aggregation.policy().allows_add_remove);
    }

    #[test]
    fn test_delete_policies() {
        assert!(DeleteParentAction::Prevent.policy().prevents_delete);
        assert!(DeleteParentAction::DeleteRelated.policy().cascades_delete);
        assert!(!DeleteParentAction::DereferenceRelated.policy().cascades_delete);
        assert_eq!(
            DeleteParentAction::DoNothing.policy(),
            DeletePolicy {
                prevents_delete: false,
                cascades_delete: false,
                dereferences_on_save: false,
            }
        );
    }
}
