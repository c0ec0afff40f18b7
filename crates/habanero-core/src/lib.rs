//! Habanero Core - Business objects, relationships and transactional saves.
//!
//! This crate provides the relationship and dirty-state layer of Habanero:
//! class metadata, business objects held in a session's identity map,
//! single and multiple relationships with Association, Aggregation and
//! Composition semantics, and a committer that writes a whole object graph
//! to a data store in one transaction.

pub mod catalog;
pub mod config;
pub mod error;
pub mod id;
pub mod object;
pub mod relationship;
pub mod session;
pub mod store;
pub mod transaction;
pub mod value;

pub use catalog::{
    BusinessObjectClass, Cardinality, ClassDef, ClassDefRegistry, ClassDefRegistryBuilder,
    DeleteParentAction, ForeignKeySide, InsertParentAction, OrderBy, OrderDirection, PropDef,
    PropType, RelKeyDef, RelPropDef, RelationshipDef, RelationshipKind,
};
pub use config::{SessionConfig, StoreConfig};
pub use error::Error;
pub use id::ObjectId;
pub use object::{BoProp, BoStatus, BusinessObject, IdentityMap};
pub use relationship::{
    BusinessObjectCollection, MemberState, MultipleRelationship, PendingMove, Relationship,
    RelationshipCol, SingleRelationship,
};
pub use session::{Deletability, RelationshipUpdated, Session};
pub use store::{Criteria, DataStore, MemoryStore, SelectQuery, SledStore, StoreOp, StoredRecord};
pub use transaction::{CommitSummary, TransactionCommitter, TransactionalUnit};
pub use value::Value;
