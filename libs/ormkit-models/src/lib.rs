//! The schema model registry (spec §4.A): entity descriptors, column
//! metadata, and relationship descriptors, with deferred forward-reference
//! resolution.

mod column;
mod entity;
mod error;
mod record;
mod registry;
mod relationship;

pub use column::{ColumnDefault, ColumnDescriptor, ColumnType, ForeignKeyRef, RefAction};
pub use entity::{EntityBuilder, EntityDescriptor, ResolvedEntity};
pub use error::SchemaError;
pub use record::{Record, RelationshipValue};
pub use registry::Registry;
pub use relationship::{LazyPolicy, RelationshipDescriptor, RelationshipKind, RelationshipShape, RelationshipSpec};
