//! Core error types.

use thiserror::Error;

use crate::catalog::{Cardinality, PropType};
use crate::id::ObjectId;

/// Errors raised by the business-object core.
#[derive(Debug, Error)]
pub enum Error {
    /// Storage layer error.
    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization error.
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// Misconfiguration or misuse of the framework by the developer.
    ///
    /// Never corrected silently; the message names the relationship(s)
    /// and class(es) involved.
    #[error("developer error: {0}")]
    Developer(String),

    /// Class name not present in the registry.
    #[error("class '{0}' is not registered")]
    ClassNotFound(String),

    /// Property name not defined on the class.
    #[error("property '{property}' is not defined on class '{class}'")]
    PropertyNotFound {
        /// Class name.
        class: String,
        /// Requested property.
        property: String,
    },

    /// Relationship name not defined on the class.
    #[error("relationship '{relationship}' is not defined on class '{class}'")]
    RelationshipNotFound {
        /// Class name.
        class: String,
        /// Requested relationship.
        relationship: String,
    },

    /// A single accessor was used on a multiple relationship or vice versa.
    #[error(
        "relationship '{relationship}' on class '{class}' is a {actual} relationship, not a {expected} one"
    )]
    WrongRelationshipArity {
        /// Class name.
        class: String,
        /// Relationship name.
        relationship: String,
        /// Arity the accessor expects.
        expected: Cardinality,
        /// Arity of the definition.
        actual: Cardinality,
    },

    /// Object not found in the data store.
    #[error("{class} identified by {id} was not found")]
    ObjectNotFound {
        /// Class name.
        class: String,
        /// Object id.
        id: ObjectId,
    },

    /// Object id not held by this session.
    #[error("business object {0} is not part of this session")]
    UnknownObject(ObjectId),

    /// Object is not a member of the given multiple relationship.
    #[error("business object {child} is not a member of relationship '{relationship}'")]
    NotInRelationship {
        /// Relationship name.
        relationship: String,
        /// Object id.
        child: ObjectId,
    },

    /// Value does not match the declared property type.
    #[error("invalid value for {class}.{property}: expected {expected}, got {actual}")]
    InvalidValue {
        /// Class name.
        class: String,
        /// Property name.
        property: String,
        /// Declared type.
        expected: PropType,
        /// Type name of the rejected value.
        actual: String,
    },

    /// Delete refused by a `Prevent` delete-parent action.
    #[error("{0}")]
    NotDeletable(String),

    /// Object failed validation on save.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Data store rejected a commit.
    #[error("persistence error: {0}")]
    Persistence(String),
}

impl Error {
    /// Whether this is a developer/configuration error.
    pub fn is_developer_error(&self) -> bool {
        matches!(self, Error::Developer(_))
    }

    /// Whether this error comes from a failed lookup.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::ClassNotFound(_)
                | Error::PropertyNotFound { .. }
                | Error::RelationshipNotFound { .. }
                | Error::WrongRelationshipArity { .. }
                | Error::ObjectNotFound { .. }
                | Error::UnknownObject(_)
        )
    }
}
