//! Registry of business-object class definitions.
//!
//! Populated once at startup, validated, and then shared read-only by
//! sessions. Relationship definitions are resolved against each other here:
//! reverse relationships and the foreign key side of one-to-one
//! relationships.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use super::class::ClassDef;
use super::relationship::{ForeignKeySide, RelationshipDef};
use crate::error::Error;

/// A statically known business-object class.
///
/// Registering through this trait ties relationship definitions to Rust
/// types, so a relationship to something that is not a business object
/// does not compile.
pub trait BusinessObjectClass {
    /// Registered class name.
    const CLASS_NAME: &'static str;

    /// Definition of the class.
    fn class_def() -> ClassDef;
}

/// Validated set of class definitions.
#[derive(Debug, Default)]
pub struct ClassDefRegistry {
    classes: HashMap<String, Arc<ClassDef>>,
}

/// Builder collecting class definitions before validation.
#[derive(Debug, Default)]
pub struct ClassDefRegistryBuilder {
    classes: Vec<ClassDef>,
}

#[derive(Deserialize)]
struct ClassDefDocument {
    classes: Vec<ClassDef>,
}

impl ClassDefRegistryBuilder {
    /// Add a class definition.
    pub fn register(mut self, class: ClassDef) -> Self {
        self.classes.push(class);
        self
    }

    /// Add a typed class definition.
    pub fn register_class<T: BusinessObjectClass>(self) -> Self {
        let mut class = T::class_def();
        class.name = T::CLASS_NAME.to_string();
        self.register(class)
    }

    /// Validate and build the registry.
    pub fn build(self) -> Result<ClassDefRegistry, Error> {
        let mut classes: HashMap<String, ClassDef> = HashMap::new();
        for mut class in self.classes {
            class.ensure_primary_key_prop();
            if classes.contains_key(&class.name) {
                return Err(Error::Developer(format!(
                    "class '{}' is registered more than once",
                    class.name
                )));
            }
            classes.insert(class.name.clone(), class);
        }

        for class in classes.values() {
            validate_class(class, &classes)?;
        }

        let mut registry = ClassDefRegistry {
            classes: classes
                .into_iter()
                .map(|(name, class)| (name, Arc::new(class)))
                .collect(),
        };
        registry.resolve_foreign_keys();

        debug!(classes = registry.classes.len(), "class definitions registered");
        Ok(registry)
    }
}

fn validate_class(class: &ClassDef, classes: &HashMap<String, ClassDef>) -> Result<(), Error> {
    for (i, rel) in class.relationships.iter().enumerate() {
        if class.relationships[..i].iter().any(|r| r.name == rel.name) {
            return Err(Error::Developer(format!(
                "relationship '{}' is defined more than once on class '{}'",
                rel.name, class.name
            )));
        }

        let related = classes.get(&rel.related_class).ok_or_else(|| {
            Error::Developer(format!(
                "relationship '{}' on class '{}' refers to '{}', which is not a registered business object class",
                rel.name, class.name, rel.related_class
            ))
        })?;

        if rel.key.is_empty() {
            return Err(Error::Developer(format!(
                "relationship '{}' on class '{}' has no key properties",
                rel.name, class.name
            )));
        }

        for pair in rel.key.iter() {
            if class.prop(&pair.owner_prop).is_none() {
                return Err(Error::Developer(format!(
                    "relationship '{}' on class '{}' uses property '{}', which is not defined on '{}'",
                    rel.name, class.name, pair.owner_prop, class.name
                )));
            }
            if related.prop(&pair.related_prop).is_none() {
                return Err(Error::Developer(format!(
                    "relationship '{}' on class '{}' uses property '{}', which is not defined on '{}'",
                    rel.name, class.name, pair.related_prop, related.name
                )));
            }
        }
    }
    Ok(())
}

impl ClassDefRegistry {
    /// Start building a registry.
    pub fn builder() -> ClassDefRegistryBuilder {
        ClassDefRegistryBuilder::default()
    }

    /// Build a registry from a JSON document of the form
    /// `{"classes": [ ... ]}`.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let document: ClassDefDocument =
            serde_json::from_str(json).map_err(|e| Error::Deserialization(e.to_string()))?;
        document
            .classes
            .into_iter()
            .fold(Self::builder(), |builder, class| builder.register(class))
            .build()
    }

    /// Get a class definition.
    pub fn get(&self, class: &str) -> Result<&Arc<ClassDef>, Error> {
        self.classes
            .get(class)
            .ok_or_else(|| Error::ClassNotFound(class.to_string()))
    }

    /// Whether a class is registered.
    pub fn contains(&self, class: &str) -> bool {
        self.classes.contains_key(class)
    }

    /// Registered class names.
    pub fn class_names(&self) -> Vec<&str> {
        self.classes.keys().map(String::as_str).collect()
    }

    /// Get a relationship definition.
    pub fn relationship(&self, class: &str, name: &str) -> Result<&Arc<RelationshipDef>, Error> {
        self.get(class)?
            .relationship(name)
            .ok_or_else(|| Error::RelationshipNotFound {
                class: class.to_string(),
                relationship: name.to_string(),
            })
    }

    /// Resolve the relationship on the related class that points back to
    /// `def` on `owner_class`.
    ///
    /// A configured reverse name must exist; otherwise the candidate is the
    /// relationship to `owner_class` whose key mirrors `def`'s key. More
    /// than one candidate is ambiguous.
    pub fn reverse_relationship(
        &self,
        owner_class: &str,
        def: &RelationshipDef,
    ) -> Result<Option<Arc<RelationshipDef>>, Error> {
        let related = self.get(&def.related_class)?;

        if let Some(name) = &def.reverse_relationship_name {
            return related.relationship(name).cloned().map(Some).ok_or_else(|| {
                Error::Developer(format!(
                    "the reverse relationship '{}' configured for relationship '{}' on class '{}' is not defined on class '{}'",
                    name, def.name, owner_class, related.name
                ))
            });
        }

        let candidates: Vec<&Arc<RelationshipDef>> = related
            .relationships
            .iter()
            .filter(|r| r.related_class == owner_class && r.key.is_reverse_of(&def.key))
            .filter(|r| !(related.name == owner_class && r.name == def.name))
            .collect();

        match candidates.as_slice() {
            [] => Ok(None),
            [only] => Ok(Some(Arc::clone(only))),
            many => Err(Error::Developer(format!(
                "the reverse of relationship '{}' on class '{}' is ambiguous: class '{}' has {} candidates ({}); configure a reverse relationship name",
                def.name,
                owner_class,
                related.name,
                many.len(),
                many.iter().map(|r| r.name.as_str()).collect::<Vec<_>>().join(", ")
            ))),
        }
    }

    /// Resolve which side of a single relationship owns the foreign key.
    pub fn foreign_key_side(&self, owner_class: &str, def: &RelationshipDef) -> ForeignKeySide {
        if def.is_multiple() {
            return ForeignKeySide::Related;
        }

        let reverse = match self.reverse_relationship(owner_class, def) {
            Ok(reverse) => reverse,
            Err(e) => return ForeignKeySide::Conflict(e.to_string()),
        };
        let reverse = match reverse {
            Some(reverse) if reverse.is_single() => reverse,
            _ if def.owning_bo_has_foreign_key => return ForeignKeySide::Owner,
            _ => return ForeignKeySide::Related,
        };

        match (def.owning_bo_has_foreign_key, reverse.owning_bo_has_foreign_key) {
            (true, false) => ForeignKeySide::Owner,
            (false, true) => ForeignKeySide::Related,
            (true, true) => ForeignKeySide::Conflict(format!(
                "the relationship '{}' on class '{}' and its reverse relationship '{}' on class '{}' are both set up as owning the foreign key; only one side of a one-to-one relationship can own it",
                def.name, owner_class, reverse.name, def.related_class
            )),
            (false, false) => {
                let owner_on_pk = self
                    .get(owner_class)
                    .map(|c| c.is_primary_key(&def.key.owner_props()))
                    .unwrap_or(false);
                let related_on_pk = self
                    .get(&def.related_class)
                    .map(|c| c.is_primary_key(&def.key.related_props()))
                    .unwrap_or(false);
                match (owner_on_pk, related_on_pk) {
                    (false, true) => ForeignKeySide::Owner,
                    (true, false) => ForeignKeySide::Related,
                    _ => ForeignKeySide::Conflict(format!(
                        "neither the relationship '{}' on class '{}' nor its reverse relationship '{}' on class '{}' owns the foreign key, and it cannot be inferred from the primary keys",
                        def.name, owner_class, reverse.name, def.related_class
                    )),
                }
            }
        }
    }

    fn resolve_foreign_keys(&mut self) {
        let mut resolved = Vec::new();
        for class in self.classes.values() {
            for def in class.relationships.iter().filter(|r| r.is_single()) {
                let side = self.foreign_key_side(&class.name, def);
                resolved.push((class.name.clone(), def.name.clone(), side));
            }
        }

        for (class_name, rel_name, side) in resolved {
            if let Some(class) = self.classes.get_mut(&class_name) {
                let class = Arc::make_mut(class);
                if let Some(def) = class.relationships.iter_mut().find(|r| r.name == rel_name) {
                    Arc::make_mut(def).set_resolved_foreign_key(side);
                }
            }
        }
    }
}
