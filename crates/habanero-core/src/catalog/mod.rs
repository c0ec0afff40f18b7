//! Class metadata for business objects.
//!
//! The catalog describes classes, their properties, and the relationships
//! between them. Definitions are immutable once registered.

mod class;
mod registry;
mod relationship;
mod types;

pub use class::{ClassDef, OrderBy, OrderDirection, PropDef};
pub use registry::{BusinessObjectClass, ClassDefRegistry, ClassDefRegistryBuilder};
pub use relationship::{
    Cardinality, DeleteParentAction, ForeignKeySide, InsertParentAction, RelKeyDef, RelPropDef,
    RelationshipDef, RelationshipKind,
};
pub use types::PropType;
