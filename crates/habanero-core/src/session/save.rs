//! Saving: collecting transactional units and committing them.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use super::Session;
use crate::catalog::{ForeignKeySide, InsertParentAction, RelationshipDef};
use crate::error::Error;
use crate::id::ObjectId;
use crate::relationship::Relationship;
use crate::transaction::{CommitSummary, TransactionCommitter, TransactionalUnit};

/// One thing saving an object implies for a related object.
enum Step {
    /// Save the related object and whatever it implies.
    Save(ObjectId),
    /// Write only the related object's foreign key.
    Unit(TransactionalUnit),
}

impl Session {
    /// Save an object together with everything its relationships would
    /// save: created and edited members, foreign keys of added and removed
    /// objects, and cascaded deletes. One store transaction; nothing in
    /// memory changes if it fails.
    pub fn save(&mut self, id: ObjectId) -> Result<CommitSummary, Error> {
        self.objects.require(id)?;
        let mut committer = TransactionCommitter::new();
        self.add_to_committer(id, &mut committer, &mut HashSet::new())?;
        self.commit(committer)
    }

    /// Save every dirty or new object held by the session in one
    /// transaction.
    pub fn save_all(&mut self) -> Result<CommitSummary, Error> {
        let mut pending: Vec<ObjectId> = self
            .objects
            .iter()
            .filter(|bo| !bo.is_gone())
            .map(|bo| bo.id())
            .filter(|id| {
                self.objects.get(*id).is_some_and(|bo| bo.is_new())
                    || self.objects.is_dirty(*id, &mut HashSet::new())
            })
            .collect();
        pending.sort();

        let mut committer = TransactionCommitter::new();
        let mut visited = HashSet::new();
        for id in pending {
            self.add_to_committer(id, &mut committer, &mut visited)?;
        }
        self.commit(committer)
    }

    fn commit(&mut self, committer: TransactionCommitter) -> Result<CommitSummary, Error> {
        if committer.is_empty() {
            return Ok(CommitSummary::default());
        }
        debug!(units = committer.len(), "committing");
        committer.commit(
            self.store.as_ref(),
            &mut self.objects,
            self.config.validate_on_save,
        )
    }

    fn add_to_committer(
        &mut self,
        id: ObjectId,
        committer: &mut TransactionCommitter,
        visited: &mut HashSet<ObjectId>,
    ) -> Result<(), Error> {
        if !visited.insert(id) {
            return Ok(());
        }
        committer.add_transaction(TransactionalUnit::BusinessObject { id });

        let bo = self.objects.require(id)?;
        if bo.is_gone() {
            return Ok(());
        }
        let deleting = bo.is_delete_pending() && !bo.is_new();
        if deleting {
            self.load_dereferenced(id)?;
        }

        for step in self.steps(id, deleting)? {
            match step {
                Step::Save(child) => self.add_to_committer(child, committer, visited)?,
                Step::Unit(unit) => {
                    committer.add_transaction(unit);
                }
            }
        }
        Ok(())
    }

    /// Load the relationships whose objects must stop referring to `id`
    /// once its delete is saved.
    fn load_dereferenced(&mut self, id: ObjectId) -> Result<(), Error> {
        let defs: Vec<Arc<RelationshipDef>> = self
            .objects
            .require(id)?
            .class_def()
            .relationships
            .iter()
            .filter(|def| def.delete_parent_action.policy().dereferences_on_save)
            .cloned()
            .collect();
        for def in defs {
            if def.is_multiple() {
                self.ensure_loaded(id, &def)?;
            } else {
                self.resolve_single(id, &def)?;
            }
        }
        Ok(())
    }

    fn steps(&self, id: ObjectId, deleting: bool) -> Result<Vec<Step>, Error> {
        let bo = self.objects.require(id)?;
        let mut steps = Vec::new();
        for rel in bo.relationships().iter() {
            let def = rel.def();
            let policy = def.kind.policy();
            let dereference = deleting && def.delete_parent_action.policy().dereferences_on_save;
            let added = |related| {
                Step::Unit(TransactionalUnit::SingleRelationshipAdded {
                    owner: id,
                    relationship: Arc::clone(def),
                    related,
                })
            };
            let removed = |related| {
                Step::Unit(TransactionalUnit::SingleRelationshipRemoved {
                    owner: id,
                    relationship: Arc::clone(def),
                    related,
                })
            };
            let dereferenced = |related| {
                Step::Unit(TransactionalUnit::DereferenceRelated {
                    owner: id,
                    relationship: Arc::clone(def),
                    related,
                })
            };

            match rel {
                Relationship::Multiple(m) => {
                    let col = m.collection();
                    if def.insert_parent_action == InsertParentAction::InsertRelationship {
                        steps.extend(col.created().iter().map(|c| Step::Save(*c)));
                    }
                    for child in col.added() {
                        steps.push(added(*child));
                        if policy.saves_members {
                            steps.push(Step::Save(*child));
                        }
                    }
                    steps.extend(col.removed().iter().map(|c| removed(*c)));
                    steps.extend(col.marked_for_delete().iter().map(|c| Step::Save(*c)));
                    if policy.saves_members {
                        steps.extend(m.edited_members(id, &self.objects).into_iter().map(Step::Save));
                    }
                    if dereference {
                        steps.extend(col.ids().iter().map(|c| dereferenced(*c)));
                    }
                }
                Relationship::Single(s) => {
                    if let Some(child) = s.added_object() {
                        steps.push(added(child));
                        if self.objects.require(child)?.is_new() {
                            steps.push(Step::Save(child));
                        }
                    }
                    if let Some(child) = s.removed_object() {
                        steps.push(removed(child));
                    }
                    if let Some(child) = s.related_id() {
                        let related = self.objects.require(child)?;
                        let edited = policy.saves_members
                            && self.objects.is_dirty(child, &mut HashSet::from([id]));
                        if !related.is_gone()
                            && (related.is_new() || related.is_delete_pending() || edited)
                        {
                            steps.push(Step::Save(child));
                        }
                        if dereference && def.foreign_key_side() != ForeignKeySide::Owner {
                            steps.push(dereferenced(child));
                        }
                    }
                }
            }
        }
        Ok(steps)
    }
}
