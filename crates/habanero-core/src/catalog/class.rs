//! Class and property definitions.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::relationship::RelationshipDef;
use super::types::PropType;
use crate::value::Value;

/// A property definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropDef {
    /// Property name (unique within the class).
    pub name: String,
    /// Declared type.
    pub prop_type: PropType,
    /// Must be non-null before the object can be saved.
    #[serde(default)]
    pub compulsory: bool,
    /// Value given to new objects.
    #[serde(default)]
    pub default: Option<Value>,
}

impl PropDef {
    /// Create an optional property.
    pub fn new(name: impl Into<String>, prop_type: PropType) -> Self {
        Self {
            name: name.into(),
            prop_type,
            compulsory: false,
            default: None,
        }
    }

    /// Mark the property as compulsory.
    pub fn compulsory(mut self) -> Self {
        self.compulsory = true;
        self
    }

    /// Set the default value for new objects.
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Value a new object starts with.
    pub fn initial_value(&self) -> Value {
        self.default.clone().unwrap_or(Value::Null)
    }
}

/// Ordering applied when a relationship loads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBy {
    /// Property name to order by.
    pub field: String,
    /// Sort direction.
    #[serde(default)]
    pub direction: OrderDirection,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OrderDirection {
    /// Ascending order.
    #[default]
    Asc,
    /// Descending order.
    Desc,
}

impl OrderBy {
    /// Create ascending order.
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: OrderDirection::Asc,
        }
    }

    /// Create descending order.
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: OrderDirection::Desc,
        }
    }
}

/// A business-object class definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassDef {
    /// Class name (unique within the registry).
    pub name: String,
    /// Name of the primary key property. Its values are object ids.
    pub primary_key: String,
    /// Property definitions.
    #[serde(default)]
    pub props: Vec<PropDef>,
    /// Relationship definitions.
    #[serde(default)]
    pub relationships: Vec<Arc<RelationshipDef>>,
}

impl ClassDef {
    /// Create a class definition with a `Uuid` primary key property.
    pub fn new(name: impl Into<String>, primary_key: impl Into<String>) -> Self {
        let primary_key = primary_key.into();
        Self {
            name: name.into(),
            props: vec![PropDef::new(primary_key.clone(), PropType::Uuid)],
            primary_key,
            relationships: Vec::new(),
        }
    }

    /// Add a property.
    pub fn with_prop(mut self, prop: PropDef) -> Self {
        self.props.push(prop);
        self
    }

    /// Add a relationship.
    pub fn with_relationship(mut self, relationship: RelationshipDef) -> Self {
        self.relationships.push(Arc::new(relationship));
        self
    }

    /// Get a property definition by name.
    pub fn prop(&self, name: &str) -> Option<&PropDef> {
        self.props.iter().find(|p| p.name == name)
    }

    /// Get a relationship definition by name.
    pub fn relationship(&self, name: &str) -> Option<&Arc<RelationshipDef>> {
        self.relationships.iter().find(|r| r.name == name)
    }

    /// Whether `props` is exactly the primary key.
    pub fn is_primary_key(&self, props: &[&str]) -> bool {
        props.len() == 1 && props[0] == self.primary_key
    }

    /// Add the primary key property if a deserialized definition omitted it.
    pub(crate) fn ensure_primary_key_prop(&mut self) {
        if self.prop(&self.primary_key).is_none() {
            self.props
                .insert(0, PropDef::new(self.primary_key.clone(), PropType::Uuid));
        }
    }
}
