//! Builds a [`SqlSchema`] snapshot from a live `ConnectionPool`'s
//! introspection capability (spec §6 "`get_tables`/`get_columns`/
//! `get_indexes`/`get_constraints` — schema introspection for autogen").

use ormkit_connector::{ConnectionPool, DbError};
use ormkit_schema_describer::{SqlSchema, Table};

pub async fn introspect(pool: &dyn ConnectionPool) -> Result<SqlSchema, DbError> {
    let mut tables = Vec::new();
    for name in pool.get_tables().await? {
        let columns = pool.get_columns(&name).await?;
        let indexes = pool.get_indexes(&name).await?;
        let (primary_key, foreign_keys) = pool.get_constraints(&name).await?;
        tables.push(Table { name, columns, indexes, primary_key, foreign_keys });
    }
    Ok(SqlSchema { tables })
}
