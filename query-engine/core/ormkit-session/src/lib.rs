//! Session / Unit of Work (spec §4.D): identity map, pending insert/delete
//! queues, upsert, soft-delete lifecycle, transactions, and the query
//! facade, layered over an [`ormkit_connector::ConnectionPool`].

mod error;
mod identity_map;
mod m2m;
mod query;
mod session;

pub use error::SessionError;
pub use m2m::M2MCollection;
pub use query::{joined, noload, selectin, LoadOption, Query};
pub use session::Session;
