use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::entity::{EntityDescriptor, ResolvedEntity};
use crate::error::SchemaError;
use crate::relationship::{RelationshipDescriptor, RelationshipKind, RelationshipShape, RelationshipSpec};

/// The process-wide entity registry. Entities register themselves at
/// definition time; relationship resolution (forward-reference lookup,
/// foreign-key column inference) is deferred until the first query or
/// migration touches the entity, and is idempotent after that (§4.A).
#[derive(Default)]
pub struct Registry {
    entities: HashMap<String, Arc<EntityDescriptor>>,
    resolved: RwLock<HashMap<String, Arc<ResolvedEntity>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, entity: EntityDescriptor) {
        self.entities.insert(entity.name.clone(), Arc::new(entity));
    }

    pub fn get_raw(&self, name: &str) -> Option<&Arc<EntityDescriptor>> {
        self.entities.get(name)
    }

    /// Resolve an entity's relationships against the registry, caching the
    /// result. Safe to call repeatedly; only the first call per entity does
    /// any work.
    pub fn resolve(&self, name: &str) -> Result<Arc<ResolvedEntity>, SchemaError> {
        if let Some(cached) = self.resolved.read().unwrap().get(name) {
            return Ok(cached.clone());
        }

        let entity = self
            .entities
            .get(name)
            .ok_or_else(|| SchemaError::UnknownEntity(name.to_owned()))?;

        let mut relationships = Vec::with_capacity(entity.relationships.len());
        for spec in &entity.relationships {
            relationships.push(self.resolve_relationship(entity, spec)?);
        }

        let resolved = Arc::new(ResolvedEntity {
            descriptor: (**entity).clone(),
            relationships,
        });

        self.resolved.write().unwrap().insert(name.to_owned(), resolved.clone());
        Ok(resolved)
    }

    fn resolve_relationship(
        &self,
        owner: &EntityDescriptor,
        spec: &RelationshipSpec,
    ) -> Result<RelationshipDescriptor, SchemaError> {
        let target = self.entities.get(&spec.target).ok_or_else(|| SchemaError::UnresolvedTarget {
            entity: owner.name.clone(),
            relationship: spec.name.clone(),
            target: spec.target.clone(),
        })?;

        let kind = match spec.shape {
            RelationshipShape::ManyToOne => {
                let local_column = self.find_fk_column(owner, &target.table, spec)?;
                let remote_column = owner
                    .column(&local_column)
                    .and_then(|c| c.foreign_key.as_ref())
                    .map(|fk| fk.column.clone())
                    .or_else(|| target.primary_key().map(|pk| pk.name.clone()))
                    .ok_or_else(|| SchemaError::NoPrimaryKey(target.name.clone()))?;

                RelationshipKind::ManyToOne {
                    target: target.name.clone(),
                    local_column,
                    remote_column,
                }
            }
            RelationshipShape::OneToMany => {
                let remote_fk_column = self.find_fk_column(target, &owner.table, spec)?;
                let local_pk_column = owner
                    .primary_key()
                    .map(|pk| pk.name.clone())
                    .ok_or_else(|| SchemaError::NoPrimaryKey(owner.name.clone()))?;

                RelationshipKind::OneToMany {
                    target: target.name.clone(),
                    remote_fk_column,
                    local_pk_column,
                }
            }
            RelationshipShape::ManyToMany => {
                let secondary = spec
                    .secondary
                    .clone()
                    .unwrap_or_else(|| format!("{}_{}", owner.table, target.table));

                let local_pk_column = owner
                    .primary_key()
                    .map(|pk| pk.name.clone())
                    .ok_or_else(|| SchemaError::NoPrimaryKey(owner.name.clone()))?;
                let remote_pk_column = target
                    .primary_key()
                    .map(|pk| pk.name.clone())
                    .ok_or_else(|| SchemaError::NoPrimaryKey(target.name.clone()))?;

                RelationshipKind::ManyToMany {
                    target: target.name.clone(),
                    secondary,
                    local_pk_column,
                    remote_pk_column,
                    junction_local_column: owner.junction_column(),
                    junction_remote_column: target.junction_column(),
                }
            }
        };

        Ok(RelationshipDescriptor {
            name: spec.name.clone(),
            kind,
            back_populates: spec.back_populates.clone(),
            lazy: spec.effective_lazy(),
        })
    }

    /// Scan `holder`'s columns for a foreign key pointing at `target_table`.
    /// An explicit `fk_column` on the spec always wins; otherwise exactly one
    /// candidate must exist.
    fn find_fk_column(
        &self,
        holder: &EntityDescriptor,
        target_table: &str,
        spec: &RelationshipSpec,
    ) -> Result<String, SchemaError> {
        if let Some(explicit) = &spec.explicit_fk_column {
            return Ok(explicit.clone());
        }

        let candidates: Vec<String> = holder
            .columns
            .iter()
            .filter(|c| c.foreign_key.as_ref().map(|fk| fk.table == target_table).unwrap_or(false))
            .map(|c| c.name.clone())
            .collect();

        match candidates.len() {
            0 => Err(SchemaError::MissingForeignKey {
                entity: holder.name.clone(),
                relationship: spec.name.clone(),
                target: target_table.to_owned(),
            }),
            1 => Ok(candidates.into_iter().next().unwrap()),
            _ => Err(SchemaError::AmbiguousForeignKey {
                entity: holder.name.clone(),
                relationship: spec.name.clone(),
                target: target_table.to_owned(),
                candidates,
            }),
        }
    }
}
