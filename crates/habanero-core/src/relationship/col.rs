//! The relationships of one business object.

use std::collections::HashSet;

use crate::catalog::ClassDef;
use crate::error::Error;
use crate::id::ObjectId;
use crate::object::IdentityMap;

use super::Relationship;

/// Relationships of an object, in class definition order.
#[derive(Debug, Clone, Default)]
pub struct RelationshipCol {
    relationships: Vec<Relationship>,
}

impl RelationshipCol {
    /// One runtime relationship per definition on the class.
    pub(crate) fn for_class(class_def: &ClassDef) -> Self {
        Self {
            relationships: class_def
                .relationships
                .iter()
                .map(|def| def.create_relationship())
                .collect(),
        }
    }

    /// Get a relationship by name.
    pub fn get(&self, name: &str) -> Option<&Relationship> {
        self.relationships.iter().find(|r| r.name() == name)
    }

    pub(crate) fn get_mut(&mut self, name: &str) -> Option<&mut Relationship> {
        self.relationships.iter_mut().find(|r| r.name() == name)
    }

    /// Get a relationship by name or fail with `RelationshipNotFound`.
    pub fn require(&self, class: &str, name: &str) -> Result<&Relationship, Error> {
        self.get(name).ok_or_else(|| Error::RelationshipNotFound {
            class: class.to_string(),
            relationship: name.to_string(),
        })
    }

    /// Iterate in definition order.
    pub fn iter(&self) -> std::slice::Iter<'_, Relationship> {
        self.relationships.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> std::slice::IterMut<'_, Relationship> {
        self.relationships.iter_mut()
    }

    /// Number of relationships.
    pub fn len(&self) -> usize {
        self.relationships.len()
    }

    /// Whether the class defines no relationships.
    pub fn is_empty(&self) -> bool {
        self.relationships.is_empty()
    }

    /// Forget pending owner-side reassignments once the owner is saved.
    pub(crate) fn clear_moves(&mut self) {
        for rel in &mut self.relationships {
            if let Relationship::Single(single) = rel {
                single.clear_move();
            }
        }
    }

    /// Whether any relationship is dirty.
    pub fn is_dirty(&self, map: &IdentityMap, visited: &mut HashSet<ObjectId>) -> bool {
        self.relationships.iter().any(|r| r.is_dirty(map, visited))
    }

    /// Union of every relationship's dirty children, first occurrence wins.
    pub fn dirty_children(&self, owner: ObjectId, map: &IdentityMap) -> Vec<ObjectId> {
        let mut out = Vec::new();
        for rel in &self.relationships {
            for id in rel.dirty_children(owner, map) {
                if !out.contains(&id) {
                    out.push(id);
                }
            }
        }
        out
    }
}
