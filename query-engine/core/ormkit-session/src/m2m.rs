//! Live, session-bound many-to-many collection (spec §3 "Entity instance"
//! / §4.D): `add`/`remove` write straight through to the junction table
//! instead of staging anything in the identity map, so two collections
//! for the same owner never disagree about membership.

use std::fmt;

use ormkit_models::RelationshipKind;
use ormkit_sql_query_connector::{build_delete, build_insert, build_select, Delete, Filter, Insert, Select, Upsert};
use ormkit_value::Value;

use crate::error::SessionError;
use crate::session::Session;

/// Bound to one owner row and one many-to-many relationship. Constructed
/// via [`Session::m2m`].
pub struct M2MCollection<'s> {
    session: &'s Session,
    secondary: String,
    target_table: String,
    owner_pk: Value,
    junction_local_column: String,
    junction_remote_column: String,
    remote_pk_column: String,
}

impl fmt::Debug for M2MCollection<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("M2MCollection")
            .field("secondary", &self.secondary)
            .field("target_table", &self.target_table)
            .field("owner_pk", &self.owner_pk)
            .field("junction_local_column", &self.junction_local_column)
            .field("junction_remote_column", &self.junction_remote_column)
            .field("remote_pk_column", &self.remote_pk_column)
            .finish()
    }
}

impl<'s> M2MCollection<'s> {
    pub(crate) fn new(session: &'s Session, kind: &RelationshipKind, owner_pk: Value, target_table: String) -> Option<Self> {
        match kind {
            RelationshipKind::ManyToMany { secondary, remote_pk_column, junction_local_column, junction_remote_column, .. } => {
                Some(Self {
                    session,
                    secondary: secondary.clone(),
                    target_table,
                    owner_pk,
                    junction_local_column: junction_local_column.clone(),
                    junction_remote_column: junction_remote_column.clone(),
                    remote_pk_column: remote_pk_column.clone(),
                })
            }
            _ => None,
        }
    }

    /// Idempotent: associating the same `target_pk` twice leaves exactly
    /// one junction row (spec §8 "M2M idempotence").
    pub async fn add(&self, target_pk: Value) -> Result<(), SessionError> {
        let row = vec![
            (self.junction_local_column.clone(), self.owner_pk.clone()),
            (self.junction_remote_column.clone(), target_pk),
        ];
        let upsert = Upsert {
            conflict_target: vec![self.junction_local_column.clone(), self.junction_remote_column.clone()],
            update_fields: None,
            do_nothing: true,
        };
        let insert = Insert::new(self.secondary.as_str(), vec![row]).upsert(upsert);
        let (sql, params) = build_insert(&insert, self.session.dialect());
        self.session.execute_statement(&sql, params).await?;
        Ok(())
    }

    /// A no-op, not an error, when `target_pk` isn't currently associated
    /// (spec §8 "`remove(r)` on an absent association is a no-op").
    pub async fn remove(&self, target_pk: Value) -> Result<(), SessionError> {
        let delete = Delete {
            table: self.secondary.clone(),
            filter: Filter::and(vec![
                Filter::eq(&self.junction_local_column, self.owner_pk.clone()),
                Filter::eq(&self.junction_remote_column, target_pk),
            ]),
            soft_delete: ormkit_sql_query_connector::SoftDeleteMode::NotApplicable,
        };
        let (sql, params) = build_delete(&delete, self.session.dialect());
        self.session.execute_statement(&sql, params).await?;
        Ok(())
    }

    /// The target primary keys currently associated with the owner,
    /// ordered by junction insertion (spec §4.C "preserving junction
    /// order").
    pub async fn ids(&self) -> Result<Vec<Value>, SessionError> {
        let select = Select::new(self.secondary.as_str())
            .filter(Filter::eq(&self.junction_local_column, self.owner_pk.clone()));
        let (sql, params) = build_select(&select, self.session.dialect());
        let result = self.session.execute(&sql, params).await?;
        Ok(result.rows.iter().filter_map(|row| row.0.iter().find(|(c, _)| c == &self.junction_remote_column).map(|(_, v)| v.clone())).collect())
    }

    pub fn target_table(&self) -> &str {
        &self.target_table
    }

    pub fn remote_pk_column(&self) -> &str {
        &self.remote_pk_column
    }
}
