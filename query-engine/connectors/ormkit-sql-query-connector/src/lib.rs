//! Translates the entity/filter model into SQL text and parameter lists,
//! and prefetches relationships against a [`ormkit_connector::ConnectionPool`]
//! (spec §4.B, §4.C). Every builder function here is pure; the loader is
//! the only module in this crate that performs I/O.

mod builder;
mod describe;
mod error;
mod filter;
mod loader;

pub use builder::{build_delete, build_insert, build_select, build_update, Sql};
pub use describe::{Columns, Delete, Insert, JoinInfo, OrderBy, Select, SoftDeleteMode, Update, Upsert};
pub use error::{LoadError, QueryError};
pub use filter::{ColumnPath, Filter, Leaf, Operator};
pub use loader::{access_relationship, load_relationships};
