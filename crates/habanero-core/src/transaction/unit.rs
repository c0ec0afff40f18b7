//! Committable units of change.

use std::fmt;
use std::sync::Arc;

use crate::catalog::RelationshipDef;
use crate::error::Error;
use crate::id::ObjectId;
use crate::object::IdentityMap;
use crate::relationship::MemberState;
use crate::store::{values_equal, StoreOp, StoredField};
use crate::value::Value;

/// Commit phase of a store operation. Phases run in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    /// New records.
    Insert,
    /// Changed records and foreign keys.
    Update,
    /// Removed records.
    Delete,
}

/// A store operation planned for a unit.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedOp {
    /// When the operation runs.
    pub phase: Phase,
    /// The operation.
    pub op: StoreOp,
}

/// One change submitted to the transaction committer.
///
/// Relationship units write only the foreign key of `related`: the key
/// properties `relationship` maps onto the related class.
#[derive(Debug, Clone)]
pub enum TransactionalUnit {
    /// Insert, update or delete one object, decided by its status.
    BusinessObject {
        /// Object to save.
        id: ObjectId,
    },
    /// `related` was attached to `owner` through `relationship`.
    SingleRelationshipAdded {
        /// Owner of the relationship.
        owner: ObjectId,
        /// Relationship definition on the owner's class.
        relationship: Arc<RelationshipDef>,
        /// Object whose foreign key now points at the owner.
        related: ObjectId,
    },
    /// `related` was detached from `owner` through `relationship`.
    SingleRelationshipRemoved {
        /// Owner of the relationship.
        owner: ObjectId,
        /// Relationship definition on the owner's class.
        relationship: Arc<RelationshipDef>,
        /// Object whose foreign key was cleared.
        related: ObjectId,
    },
    /// `owner` is being deleted and `related` must stop referring to it.
    DereferenceRelated {
        /// Object being deleted.
        owner: ObjectId,
        /// Relationship definition on the owner's class.
        relationship: Arc<RelationshipDef>,
        /// Object whose foreign key is cleared.
        related: ObjectId,
    },
}

impl TransactionalUnit {
    /// Stable id used to deduplicate units.
    pub fn transaction_id(&self) -> String {
        match self {
            TransactionalUnit::BusinessObject { id } => format!("BusinessObject:{}", id),
            TransactionalUnit::SingleRelationshipAdded {
                owner,
                relationship,
                related,
            } => format!(
                "SingleRelationship_Added:{}:{}:{}",
                relationship.name, owner, related
            ),
            TransactionalUnit::SingleRelationshipRemoved {
                owner,
                relationship,
                related,
            } => format!(
                "SingleRelationship_Removed:{}:{}:{}",
                relationship.name, owner, related
            ),
            TransactionalUnit::DereferenceRelated {
                owner,
                relationship,
                related,
            } => format!(
                "DereferenceRelated:{}:{}:{}",
                relationship.name, owner, related
            ),
        }
    }

    /// Object whose record the unit writes.
    pub fn target(&self) -> ObjectId {
        match self {
            TransactionalUnit::BusinessObject { id } => *id,
            TransactionalUnit::SingleRelationshipAdded { related, .. }
            | TransactionalUnit::SingleRelationshipRemoved { related, .. }
            | TransactionalUnit::DereferenceRelated { related, .. } => *related,
        }
    }

    /// Plan the store operation, if any. Compulsory properties left null
    /// are reported into `missing`.
    pub(crate) fn plan(
        &self,
        map: &IdentityMap,
        missing: &mut Vec<String>,
    ) -> Result<Option<PlannedOp>, Error> {
        match self {
            TransactionalUnit::BusinessObject { id } => {
                let bo = map.require(*id)?;
                if bo.is_gone() {
                    return Ok(None);
                }
                if bo.is_deleted() {
                    return Ok(Some(PlannedOp {
                        phase: Phase::Delete,
                        op: StoreOp::Delete {
                            class: bo.class_name().to_string(),
                            id: *id,
                        },
                    }));
                }
                if !bo.is_new() && !bo.is_self_dirty() {
                    return Ok(None);
                }
                missing.extend(
                    bo.missing_compulsory()
                        .into_iter()
                        .map(|prop| format!("{} {}: '{}' is compulsory", bo.class_name(), id, prop)),
                );
                let (phase, op) = if bo.is_new() {
                    (Phase::Insert, StoreOp::Insert(bo.to_record()))
                } else {
                    (Phase::Update, StoreOp::Update(bo.to_record()))
                };
                Ok(Some(PlannedOp { phase, op }))
            }
            TransactionalUnit::SingleRelationshipAdded {
                relationship,
                related,
                ..
            }
            | TransactionalUnit::SingleRelationshipRemoved {
                relationship,
                related,
                ..
            } => {
                let child = map.require(*related)?;
                // a new child carries its key in its own insert
                if child.is_new() {
                    return Ok(None);
                }
                let props = relationship.key.related_props();
                Ok(Some(PlannedOp {
                    phase: Phase::Update,
                    op: StoreOp::UpdateFields {
                        class: child.class_name().to_string(),
                        id: *related,
                        fields: child.fields_of(&props),
                    },
                }))
            }
            TransactionalUnit::DereferenceRelated {
                relationship,
                related,
                ..
            } => {
                let child = map.require(*related)?;
                if child.is_new() || child.is_deleted() {
                    return Ok(None);
                }
                Ok(Some(PlannedOp {
                    phase: Phase::Update,
                    op: StoreOp::UpdateFields {
                        class: child.class_name().to_string(),
                        id: *related,
                        fields: relationship
                            .key
                            .related_props()
                            .into_iter()
                            .map(|name| StoredField {
                                name: name.to_string(),
                                value: Value::Null,
                            })
                            .collect(),
                    },
                }))
            }
        }
    }

    /// Bring in-memory state in line with a successful commit.
    pub(crate) fn update_state_as_committed(&self, map: &mut IdentityMap) -> Result<(), Error> {
        match self {
            TransactionalUnit::BusinessObject { id } => {
                let bo = map.require(*id)?;
                if bo.is_deleted() {
                    map.require_mut(*id)?.mark_delete_saved();
                    forget_everywhere(map, *id);
                } else {
                    if bo.is_new() || bo.is_self_dirty() {
                        map.require_mut(*id)?.mark_saved();
                    }
                    resync_memberships(map, *id)?;
                }
                Ok(())
            }
            TransactionalUnit::SingleRelationshipAdded {
                owner,
                relationship,
                related,
            } => {
                let props = relationship.key.related_props();
                map.require_mut(*related)?.mark_props_persisted(&props);
                if let Some(rel) = map
                    .get_mut(*owner)
                    .and_then(|bo| bo.relationships_mut().get_mut(&relationship.name))
                {
                    if let Some(multiple) = rel.as_multiple_mut() {
                        multiple.collection_mut().commit_saved(*related);
                    } else if let Some(single) = rel.as_single_mut() {
                        if single.added_object() == Some(*related) {
                            single.set_added(None);
                        }
                    }
                }
                resync_memberships(map, *related)
            }
            TransactionalUnit::SingleRelationshipRemoved {
                owner,
                relationship,
                related,
            } => {
                let props = relationship.key.related_props();
                map.require_mut(*related)?.mark_props_persisted(&props);
                if let Some(rel) = map
                    .get_mut(*owner)
                    .and_then(|bo| bo.relationships_mut().get_mut(&relationship.name))
                {
                    if let Some(multiple) = rel.as_multiple_mut() {
                        multiple.collection_mut().commit_removed(*related);
                    } else if let Some(single) = rel.as_single_mut() {
                        if single.removed_object() == Some(*related) {
                            single.set_removed(None);
                        }
                    }
                }
                resync_memberships(map, *related)
            }
            TransactionalUnit::DereferenceRelated {
                owner,
                relationship,
                related,
            } => {
                let child = map.require_mut(*related)?;
                if child.is_new() || child.is_deleted() {
                    return Ok(());
                }
                for prop in relationship.key.related_props() {
                    child.load_value(prop, Value::Null);
                }
                if let Some(bo) = map.get_mut(*owner) {
                    if let Some(rel) = bo.relationships_mut().get_mut(&relationship.name) {
                        rel.forget(*related);
                    }
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for TransactionalUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.transaction_id())
    }
}

/// Drop every reference to a deleted object held by other objects'
/// relationships.
fn forget_everywhere(map: &mut IdentityMap, id: ObjectId) {
    for bo in map.iter_mut() {
        for rel in bo.relationships_mut().iter_mut() {
            rel.forget(id);
        }
    }
}

/// Align loaded collections with a live object's saved key values.
///
/// Pending members move to the persisted baseline. A collection whose key
/// now matches the object adopts it; one whose key no longer matches
/// releases it. Pending removals and deletes the object no longer reflects
/// are settled the same way.
fn resync_memberships(map: &mut IdentityMap, id: ObjectId) -> Result<(), Error> {
    let child = map.require(id)?;
    if child.is_deleted() {
        return Ok(());
    }
    let child_class = child.class_name().to_string();

    let mut changes = Vec::new();
    for owner in map.iter() {
        for rel in owner.relationships().iter() {
            let Some(multiple) = rel.as_multiple() else {
                continue;
            };
            let def = multiple.def();
            if def.related_class != child_class || !multiple.collection().is_loaded() {
                continue;
            }
            let owner_values = owner.values_of(&def.key.owner_props())?;
            let child_values = child.values_of(&def.key.related_props())?;
            let matches = owner_values
                .iter()
                .zip(&child_values)
                .all(|(a, b)| values_equal(a, b));
            changes.push((owner.id(), def.name.clone(), matches));
        }
    }

    for (owner, name, matches) in changes {
        let Some(collection) = map
            .get_mut(owner)
            .and_then(|bo| bo.relationships_mut().get_mut(&name))
            .and_then(|rel| rel.as_multiple_mut())
            .map(|m| m.collection_mut())
        else {
            continue;
        };
        match (collection.state_of(id), matches) {
            (Some(MemberState::Created | MemberState::Added), true) => collection.commit_saved(id),
            (Some(MemberState::Created | MemberState::Added), false) => {
                collection.commit_saved(id);
                collection.release(id);
            }
            (Some(MemberState::Persisted), false) => collection.release(id),
            (Some(MemberState::Removed), true) => {
                collection.restore_removed(id);
            }
            (Some(MemberState::Removed), false) => collection.commit_removed(id),
            (Some(MemberState::MarkedForDelete), true) => collection.restore_marked(id, false),
            (Some(MemberState::MarkedForDelete), false) => collection.commit_deleted(id),
            (None, true) => collection.adopt(id),
            (Some(MemberState::Persisted), true) | (None, false) => {}
        }
    }
    Ok(())
}
