//! Delete checks and mark-for-delete cascades.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, warn};

use super::Session;
use crate::catalog::RelationshipDef;
use crate::error::Error;
use crate::id::ObjectId;

/// Whether an object may be deleted, and why not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deletability {
    /// True when no `Prevent` relationship holds related objects.
    pub deletable: bool,
    /// Reason the delete is refused.
    pub message: Option<String>,
}

impl Deletability {
    fn allowed() -> Self {
        Self {
            deletable: true,
            message: None,
        }
    }

    fn refused(message: String) -> Self {
        Self {
            deletable: false,
            message: Some(message),
        }
    }
}

impl Session {
    /// Check the `Prevent` relationships of an object.
    ///
    /// Loads the relationships it checks. The first relationship holding
    /// related objects refuses the delete.
    pub fn is_deletable(&mut self, id: ObjectId) -> Result<Deletability, Error> {
        let bo = self.objects.require(id)?;
        let class = bo.class_name().to_string();
        let preventing: Vec<Arc<RelationshipDef>> = bo
            .class_def()
            .relationships
            .iter()
            .filter(|def| def.delete_parent_action.policy().prevents_delete)
            .cloned()
            .collect();

        for def in preventing {
            let count = if def.is_multiple() {
                self.ensure_loaded(id, &def)?;
                self.collection_ref(id, &def.name)?.count()
            } else {
                usize::from(self.resolve_single(id, &def)?.is_some())
            };
            if count > 0 {
                return Ok(Deletability::refused(format!(
                    "You cannot delete {} identified by {} as there are {} {} objects related through the relationship '{}'",
                    class, id, count, def.related_class, def.name
                )));
            }
        }
        Ok(Deletability::allowed())
    }

    /// Mark an object for delete, cascading through `DeleteRelated`
    /// relationships.
    ///
    /// The object leaves the members of every loaded collection holding it
    /// and waits there as marked for delete until saved or cancelled.
    pub fn mark_for_delete(&mut self, id: ObjectId) -> Result<(), Error> {
        let bo = self.objects.require(id)?;
        if bo.is_gone() {
            return Err(Error::ObjectNotFound {
                class: bo.class_name().to_string(),
                id,
            });
        }
        if bo.is_delete_pending() {
            return Ok(());
        }

        let check = self.is_deletable(id)?;
        if !check.deletable {
            warn!(id = %id, "delete refused");
            return Err(Error::NotDeletable(check.message.unwrap_or_default()));
        }

        let mut visited = HashSet::new();
        self.mark_subtree(id, &mut visited)?;
        debug!(id = %id, objects = visited.len(), "marked for delete");
        Ok(())
    }

    fn mark_subtree(&mut self, id: ObjectId, visited: &mut HashSet<ObjectId>) -> Result<(), Error> {
        if !visited.insert(id) {
            return Ok(());
        }
        let bo = self.objects.require(id)?;
        if bo.is_gone() || bo.is_delete_pending() {
            return Ok(());
        }
        let cascading: Vec<Arc<RelationshipDef>> = bo
            .class_def()
            .relationships
            .iter()
            .filter(|def| def.delete_parent_action.policy().cascades_delete)
            .cloned()
            .collect();

        self.objects.require_mut(id)?.mark_deleted();
        self.move_to_marked(id);

        for def in cascading {
            let related = if def.is_multiple() {
                self.ensure_loaded(id, &def)?;
                self.collection_ref(id, &def.name)?.ids().to_vec()
            } else {
                self.resolve_single(id, &def)?.into_iter().collect()
            };
            for child in related {
                self.mark_subtree(child, visited)?;
            }
        }
        Ok(())
    }

    /// Move `id` to the marked-for-delete subset of every loaded collection
    /// listing it as a member.
    fn move_to_marked(&mut self, id: ObjectId) {
        let holders: Vec<(ObjectId, String)> = self
            .objects
            .iter()
            .flat_map(move |owner| {
                owner
                    .relationships()
                    .iter()
                    .filter_map(|r| r.as_multiple())
                    .filter(move |m| m.collection().contains(id))
                    .map(move |m| (owner.id(), m.def().name.clone()))
            })
            .collect();

        for (owner, name) in holders {
            if let Ok(collection) = self.collection_mut(owner, &name) {
                collection.mark_for_delete(id);
            }
        }
    }
}
