//! Relationship definitions between business-object classes.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::class::OrderBy;
use crate::relationship::{MultipleRelationship, Relationship, SingleRelationship};

/// Number of related objects a relationship navigates to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cardinality {
    /// Zero or one related object.
    Single,
    /// Zero or more related objects.
    Multiple,
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cardinality::Single => f.write_str("single"),
            Cardinality::Multiple => f.write_str("multiple"),
        }
    }
}

/// Level of ownership the owning object has over its related objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RelationshipKind {
    /// Loose reference. Edits to related objects are their own concern.
    #[default]
    Association,
    /// The owner persists and cancels edits of its related objects.
    Aggregation,
    /// Exclusive ownership: related objects are only created under, or
    /// deleted from, their owner.
    Composition,
}

impl fmt::Display for RelationshipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelationshipKind::Association => f.write_str("Association"),
            RelationshipKind::Aggregation => f.write_str("Aggregation"),
            RelationshipKind::Composition => f.write_str("Composition"),
        }
    }
}

/// What deleting the owning object does to its related objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeleteParentAction {
    /// No effect.
    DoNothing,
    /// The owner cannot be deleted while related objects exist.
    Prevent,
    /// Related objects keep existing; their foreign keys are cleared when
    /// the owner's delete is saved.
    DereferenceRelated,
    /// Related objects are marked for delete with the owner.
    DeleteRelated,
}

/// Whether objects created in a relationship are inserted with the owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InsertParentAction {
    /// Created objects are saved with the owner.
    #[default]
    InsertRelationship,
    /// Created objects are left for the caller to save.
    DoNothing,
}

/// One owner property ↔ related property pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelPropDef {
    /// Property on the owning class.
    pub owner_prop: String,
    /// Property on the related class.
    pub related_prop: String,
}

/// Ordered key mapping of a relationship.
///
/// Used both as the filter when loading related objects and as the path
/// along which key values are copied when objects are linked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelKeyDef {
    props: Vec<RelPropDef>,
}

impl RelKeyDef {
    /// Create a key with one property pair.
    pub fn new(owner_prop: impl Into<String>, related_prop: impl Into<String>) -> Self {
        Self {
            props: vec![RelPropDef {
                owner_prop: owner_prop.into(),
                related_prop: related_prop.into(),
            }],
        }
    }

    /// Add another property pair.
    pub fn and(mut self, owner_prop: impl Into<String>, related_prop: impl Into<String>) -> Self {
        self.props.push(RelPropDef {
            owner_prop: owner_prop.into(),
            related_prop: related_prop.into(),
        });
        self
    }

    /// Property pairs in order.
    pub fn iter(&self) -> std::slice::Iter<'_, RelPropDef> {
        self.props.iter()
    }

    /// Number of property pairs.
    pub fn len(&self) -> usize {
        self.props.len()
    }

    /// Whether the key has no property pairs.
    pub fn is_empty(&self) -> bool {
        self.props.is_empty()
    }

    /// Owner-side property names.
    pub fn owner_props(&self) -> Vec<&str> {
        self.props.iter().map(|p| p.owner_prop.as_str()).collect()
    }

    /// Related-side property names.
    pub fn related_props(&self) -> Vec<&str> {
        self.props.iter().map(|p| p.related_prop.as_str()).collect()
    }

    /// Whether `other` maps the same properties in the opposite direction.
    pub fn is_reverse_of(&self, other: &RelKeyDef) -> bool {
        self.props.len() == other.props.len()
            && self.props.iter().all(|p| {
                other
                    .props
                    .iter()
                    .any(|o| o.owner_prop == p.related_prop && o.related_prop == p.owner_prop)
            })
    }
}

/// Which side of a single relationship writes the foreign key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForeignKeySide {
    /// The owning object holds the foreign key.
    Owner,
    /// The related object holds the foreign key.
    Related,
    /// The two sides disagree; carries the message reported on use.
    Conflict(String),
}

/// Immutable definition of one relationship.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationshipDef {
    /// Relationship name (unique within the owning class).
    pub name: String,
    /// Related class name.
    pub related_class: String,
    /// Key mapping.
    pub key: RelKeyDef,
    /// Single or multiple.
    pub cardinality: Cardinality,
    /// Association, aggregation or composition.
    #[serde(default)]
    pub kind: RelationshipKind,
    /// Effect of deleting the owner.
    pub delete_parent_action: DeleteParentAction,
    /// Whether created related objects are inserted with the owner.
    #[serde(default)]
    pub insert_parent_action: InsertParentAction,
    /// Whether the owning object holds the foreign key.
    pub owning_bo_has_foreign_key: bool,
    /// Name of the relationship on the related class pointing back.
    #[serde(default)]
    pub reverse_relationship_name: Option<String>,
    /// Load order for multiple relationships.
    #[serde(default)]
    pub order_by: Vec<OrderBy>,
    /// Cache window for multiple relationships, in milliseconds.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    /// Foreign key side resolved against the reverse relationship by the
    /// registry.
    #[serde(skip)]
    resolved_foreign_key: Option<ForeignKeySide>,
}

impl RelationshipDef {
    /// Create a single relationship where the owner holds the foreign key.
    pub fn single(
        name: impl Into<String>,
        related_class: impl Into<String>,
        key: RelKeyDef,
    ) -> Self {
        Self {
            name: name.into(),
            related_class: related_class.into(),
            key,
            cardinality: Cardinality::Single,
            kind: RelationshipKind::Association,
            delete_parent_action: DeleteParentAction::DoNothing,
            insert_parent_action: InsertParentAction::InsertRelationship,
            owning_bo_has_foreign_key: true,
            reverse_relationship_name: None,
            order_by: Vec::new(),
            timeout_ms: None,
            resolved_foreign_key: None,
        }
    }

    /// Create a multiple relationship. Related objects hold the foreign key.
    pub fn multiple(
        name: impl Into<String>,
        related_class: impl Into<String>,
        key: RelKeyDef,
    ) -> Self {
        Self {
            name: name.into(),
            related_class: related_class.into(),
            key,
            cardinality: Cardinality::Multiple,
            kind: RelationshipKind::Association,
            delete_parent_action: DeleteParentAction::Prevent,
            insert_parent_action: InsertParentAction::InsertRelationship,
            owning_bo_has_foreign_key: false,
            reverse_relationship_name: None,
            order_by: Vec::new(),
            timeout_ms: None,
            resolved_foreign_key: None,
        }
    }

    /// Set the relationship kind.
    pub fn with_kind(mut self, kind: RelationshipKind) -> Self {
        self.kind = kind;
        self
    }

    /// Set the delete-parent action.
    pub fn with_delete_parent_action(mut self, action: DeleteParentAction) -> Self {
        self.delete_parent_action = action;
        self
    }

    /// Set the insert-parent action.
    pub fn with_insert_parent_action(mut self, action: InsertParentAction) -> Self {
        self.insert_parent_action = action;
        self
    }

    /// Set whether the owning object holds the foreign key.
    pub fn with_owning_foreign_key(mut self, owns: bool) -> Self {
        self.owning_bo_has_foreign_key = owns;
        self
    }

    /// Name the relationship on the related class that points back.
    pub fn with_reverse(mut self, name: impl Into<String>) -> Self {
        self.reverse_relationship_name = Some(name.into());
        self
    }

    /// Add an order-by clause.
    pub fn with_order_by(mut self, order: OrderBy) -> Self {
        self.order_by.push(order);
        self
    }

    /// Set the cache window.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// Cache window as a duration.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Whether this is a single relationship.
    pub fn is_single(&self) -> bool {
        self.cardinality == Cardinality::Single
    }

    /// Whether this is a multiple relationship.
    pub fn is_multiple(&self) -> bool {
        self.cardinality == Cardinality::Multiple
    }

    /// Which side writes the foreign key.
    ///
    /// Multiple relationships always keep it on the related side. Single
    /// relationships use the registry's resolution when available and the
    /// configured flag otherwise.
    pub fn foreign_key_side(&self) -> ForeignKeySide {
        if self.is_multiple() {
            return ForeignKeySide::Related;
        }
        match &self.resolved_foreign_key {
            Some(side) => side.clone(),
            None if self.owning_bo_has_foreign_key => ForeignKeySide::Owner,
            None => ForeignKeySide::Related,
        }
    }

    pub(crate) fn set_resolved_foreign_key(&mut self, side: ForeignKeySide) {
        self.resolved_foreign_key = Some(side);
    }

    /// Create the runtime relationship for an owning object.
    pub fn create_relationship(self: &Arc<Self>) -> Relationship {
        match self.cardinality {
            Cardinality::Single => Relationship::Single(SingleRelationship::new(Arc::clone(self))),
            Cardinality::Multiple => {
                Relationship::Multiple(MultipleRelationship::new(Arc::clone(self)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_defaults() {
        let rel = RelationshipDef::single(
            "Organisation",
            "Organisation",
            RelKeyDef::new("OrganisationID", "OrganisationID"),
        );
        assert!(rel.is_single());
        assert!(rel.owning_bo_has_foreign_key);
        assert_eq!(rel.foreign_key_side(), ForeignKeySide::Owner);
        assert_eq!(rel.delete_parent_action, DeleteParentAction::DoNothing);
    }

    #[test]
    fn test_multiple_defaults() {
        let rel = RelationshipDef::multiple(
            "ContactPeople",
            "ContactPerson",
            RelKeyDef::new("OrganisationID", "OrganisationID"),
        )
        .with_kind(RelationshipKind::Aggregation)
        .with_order_by(OrderBy::asc("Surname"))
        .with_timeout(Duration::from_millis(500));

        assert!(rel.is_multiple());
        assert_eq!(rel.kind, RelationshipKind::Aggregation);
        assert_eq!(rel.delete_parent_action, DeleteParentAction::Prevent);
        assert_eq!(rel.foreign_key_side(), ForeignKeySide::Related);
        assert_eq!(rel.timeout(), Some(Duration::from_millis(500)));
    }

    #[test]
    fn test_timeout_saturates() {
        let rel = RelationshipDef::multiple("Cars", "Car", RelKeyDef::new("PersonID", "OwnerID"))
            .with_timeout(Duration::MAX);
        assert_eq!(rel.timeout_ms, Some(u64::MAX));
    }

    #[test]
    fn test_key_reverse() {
        let key = RelKeyDef::new("OrganisationID", "OrgID").and("Region", "RegionCode");
        let reverse = RelKeyDef::new("RegionCode", "Region").and("OrgID", "OrganisationID");
        assert!(key.is_reverse_of(&reverse));
        assert!(!key.is_reverse_of(&key));
        assert_eq!(key.owner_props(), vec!["OrganisationID", "Region"]);
    }

    #[test]
    fn test_factory_matches_cardinality() {
        let single = Arc::new(RelationshipDef::single(
            "Owner",
            "Person",
            RelKeyDef::new("OwnerID", "PersonID"),
        ));
        let multiple = Arc::new(RelationshipDef::multiple(
            "Cars",
            "Car",
            RelKeyDef::new("PersonID", "OwnerID"),
        ));
        assert!(single.create_relationship().as_single().is_some());
        assert!(multiple.create_relationship().as_multiple().is_some());
    }
}
