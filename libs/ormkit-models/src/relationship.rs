/// Strategy used to populate a relationship attribute, either as a default
/// per the descriptor or as an override on a single query's load plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LazyPolicy {
    Select,
    Joined,
    Selectin,
    Raise,
    Noload,
}

/// The resolved shape of a relationship, computed by [`crate::registry::Registry::resolve`].
#[derive(Debug, Clone, PartialEq)]
pub enum RelationshipKind {
    ManyToOne {
        target: String,
        local_column: String,
        remote_column: String,
    },
    OneToMany {
        target: String,
        remote_fk_column: String,
        local_pk_column: String,
    },
    ManyToMany {
        target: String,
        secondary: String,
        local_pk_column: String,
        remote_pk_column: String,
        junction_local_column: String,
        junction_remote_column: String,
    },
}

impl RelationshipKind {
    pub fn uselist(&self) -> bool {
        !matches!(self, RelationshipKind::ManyToOne { .. })
    }

    pub fn target(&self) -> &str {
        match self {
            RelationshipKind::ManyToOne { target, .. }
            | RelationshipKind::OneToMany { target, .. }
            | RelationshipKind::ManyToMany { target, .. } => target,
        }
    }
}

/// An as-declared, possibly unresolved relationship. `target` is a forward
/// reference by entity name until [`crate::registry::Registry::resolve`] runs.
#[derive(Debug, Clone)]
pub struct RelationshipSpec {
    pub name: String,
    pub target: String,
    pub shape: RelationshipShape,
    pub back_populates: Option<String>,
    pub lazy: LazyPolicy,
    /// Explicit foreign-key column, required only when the automatic scan
    /// in `Registry::resolve` finds more than one FK candidate.
    pub explicit_fk_column: Option<String>,
    /// Junction table name for a many-to-many relationship. When absent,
    /// `Registry::resolve` derives `{owner_table}_{target_table}`.
    pub secondary: Option<String>,
}

/// The declared cardinality, before FK columns are resolved against the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationshipShape {
    ManyToOne,
    OneToMany,
    ManyToMany,
}

impl RelationshipSpec {
    pub fn many_to_one(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(name, target, RelationshipShape::ManyToOne)
    }

    pub fn one_to_many(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(name, target, RelationshipShape::OneToMany)
    }

    pub fn many_to_many(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(name, target, RelationshipShape::ManyToMany)
    }

    fn new(name: impl Into<String>, target: impl Into<String>, shape: RelationshipShape) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
            shape,
            back_populates: None,
            lazy: LazyPolicy::Select,
            explicit_fk_column: None,
            secondary: None,
        }
    }

    pub fn lazy(mut self, policy: LazyPolicy) -> Self {
        self.lazy = policy;
        self
    }

    pub fn back_populates(mut self, name: impl Into<String>) -> Self {
        self.back_populates = Some(name.into());
        self
    }

    pub fn fk_column(mut self, column: impl Into<String>) -> Self {
        self.explicit_fk_column = Some(column.into());
        self
    }

    pub fn secondary(mut self, table: impl Into<String>) -> Self {
        self.secondary = Some(table.into());
        self
    }

    /// A `joined` strategy on a one-to-many or many-to-many relationship
    /// would duplicate parent rows across the join; the loader downgrades
    /// it to `selectin` instead (see `ormkit-sql-query-connector::loader`).
    pub fn effective_lazy(&self) -> LazyPolicy {
        if self.lazy == LazyPolicy::Joined && self.shape != RelationshipShape::ManyToOne {
            LazyPolicy::Selectin
        } else {
            self.lazy
        }
    }
}

#[derive(Debug, Clone)]
pub struct RelationshipDescriptor {
    pub name: String,
    pub kind: RelationshipKind,
    pub back_populates: Option<String>,
    pub lazy: LazyPolicy,
}

impl RelationshipDescriptor {
    pub fn uselist(&self) -> bool {
        self.kind.uselist()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joined_one_to_many_downgrades_to_selectin() {
        let spec = RelationshipSpec::one_to_many("posts", "Post").lazy(LazyPolicy::Joined);
        assert_eq!(spec.effective_lazy(), LazyPolicy::Selectin);
    }

    #[test]
    fn joined_many_to_one_stays_joined() {
        let spec = RelationshipSpec::many_to_one("author", "User").lazy(LazyPolicy::Joined);
        assert_eq!(spec.effective_lazy(), LazyPolicy::Joined);
    }
}
