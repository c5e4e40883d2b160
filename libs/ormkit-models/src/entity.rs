use crate::column::ColumnDescriptor;
use crate::relationship::{RelationshipDescriptor, RelationshipSpec};

/// Declarative mapping from a Rust type name to a table: columns,
/// unresolved relationship specs, and the soft-delete flag.
///
/// Built once at entity-definition time via [`EntityBuilder`] and handed
/// to [`crate::registry::Registry::register`]; relationship resolution is
/// deferred to the first query or migration that touches the entity
/// (see `Registry::resolve`).
#[derive(Debug, Clone)]
pub struct EntityDescriptor {
    pub name: String,
    pub table: String,
    pub columns: Vec<ColumnDescriptor>,
    pub relationships: Vec<RelationshipSpec>,
    pub soft_delete: bool,
}

impl EntityDescriptor {
    pub fn builder(name: impl Into<String>, table: impl Into<String>) -> EntityBuilder {
        EntityBuilder::new(name, table)
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// The single primary-key attribute name, if the entity declares exactly one.
    pub fn primary_key(&self) -> Option<&ColumnDescriptor> {
        let mut pks = self.columns.iter().filter(|c| c.primary_key);
        let first = pks.next()?;
        if pks.next().is_some() {
            None
        } else {
            Some(first)
        }
    }

    /// The entity's singular name lower-cased, used to derive many-to-many
    /// junction column names (`{owner_singular}_id`); a trailing `s` is
    /// stripped the way the source's inflector does for the common case.
    pub fn singular(&self) -> String {
        let lower = self.name.to_lowercase();
        lower.strip_suffix('s').map(str::to_owned).unwrap_or(lower)
    }

    pub fn junction_column(&self) -> String {
        format!("{}_id", self.singular())
    }
}

/// Resolved view of an entity: columns plus relationships whose targets
/// and foreign-key columns have been looked up in the registry.
#[derive(Debug, Clone)]
pub struct ResolvedEntity {
    pub descriptor: EntityDescriptor,
    pub relationships: Vec<RelationshipDescriptor>,
}

impl ResolvedEntity {
    pub fn relationship(&self, name: &str) -> Option<&RelationshipDescriptor> {
        self.relationships.iter().find(|r| r.name == name)
    }
}

pub struct EntityBuilder {
    name: String,
    table: String,
    columns: Vec<ColumnDescriptor>,
    relationships: Vec<RelationshipSpec>,
    soft_delete: bool,
}

impl EntityBuilder {
    fn new(name: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            columns: Vec::new(),
            relationships: Vec::new(),
            soft_delete: false,
        }
    }

    pub fn column(mut self, column: ColumnDescriptor) -> Self {
        self.columns.push(column);
        self
    }

    pub fn relationship(mut self, rel: RelationshipSpec) -> Self {
        self.relationships.push(rel);
        self
    }

    /// Marks the entity as soft-deletable, adding the nullable, indexed
    /// `deleted_at` column the mixin contributes (§4.D).
    pub fn soft_delete(mut self) -> Self {
        use crate::column::{ColumnDescriptor as Col, ColumnType};
        self.soft_delete = true;
        self.columns.push(Col::new("deleted_at", ColumnType::DateTime).nullable().indexed());
        self
    }

    pub fn build(self) -> EntityDescriptor {
        EntityDescriptor {
            name: self.name,
            table: self.table,
            columns: self.columns,
            relationships: self.relationships,
            soft_delete: self.soft_delete,
        }
    }
}
