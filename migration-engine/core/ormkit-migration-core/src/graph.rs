//! The revision graph (spec §4.E "Runner": "topologically sorted via
//! `down_revision`"). Migrations form a linear chain, not a DAG, so
//! "topological sort" collapses to "walk the `down_revision` links from
//! the single root to the single head".

use std::collections::HashMap;
use std::path::Path;

use ormkit_migration_connector::{list_migrations, MigrationDirectory, MigrationScript};

use crate::error::{CoreError, CoreResult};

/// One entry in the chain: the on-disk directory alongside its parsed
/// script, in application order (oldest first).
pub struct RevisionGraph {
    chain: Vec<(MigrationDirectory, MigrationScript)>,
}

impl RevisionGraph {
    /// Loads every migration under `migrations_dir` and orders them into a
    /// linear chain. Fails before anything runs if the chain is broken,
    /// branched, or has more than one root (spec §4.E "a script whose
    /// down-revision chain is broken... causes the load step to fail
    /// before anything runs").
    pub fn load(migrations_dir: &Path) -> CoreResult<Self> {
        let mut by_revision: HashMap<String, (MigrationDirectory, MigrationScript)> = HashMap::new();
        for dir in list_migrations(migrations_dir)? {
            let script = dir.read_script()?;
            by_revision.insert(script.revision.clone(), (dir, script));
        }

        for (revision, (_, script)) in &by_revision {
            if let Some(parent) = &script.down_revision {
                if !by_revision.contains_key(parent) {
                    return Err(CoreError::BrokenChain { revision: revision.clone(), down_revision: parent.clone() });
                }
            }
        }

        let mut children: HashMap<Option<String>, Vec<String>> = HashMap::new();
        for (revision, (_, script)) in &by_revision {
            children.entry(script.down_revision.clone()).or_default().push(revision.clone());
        }
        for revisions in children.values_mut() {
            revisions.sort();
        }

        let roots = children.remove(&None).unwrap_or_default();
        let mut current = match roots.len() {
            0 if by_revision.is_empty() => None,
            1 => roots.into_iter().next(),
            _ => return Err(CoreError::MultipleHeads(roots)),
        };

        let mut chain = Vec::with_capacity(by_revision.len());
        while let Some(revision) = current.take() {
            let next_children = children.remove(&Some(revision.clone())).unwrap_or_default();
            let entry = by_revision.remove(&revision).expect("revision discovered via children map must exist");
            chain.push(entry);
            match next_children.len() {
                0 => {}
                1 => current = next_children.into_iter().next(),
                _ => return Err(CoreError::AmbiguousChain { down_revision: revision, revisions: next_children }),
            }
        }

        if let Some((revision, (_, script))) = by_revision.into_iter().next() {
            return Err(CoreError::BrokenChain {
                revision,
                down_revision: script.down_revision.unwrap_or_else(|| "<root>".to_owned()),
            });
        }

        Ok(Self { chain })
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    pub fn head(&self) -> Option<&str> {
        self.chain.last().map(|(_, s)| s.revision.as_str())
    }

    pub fn position(&self, revision: &str) -> Option<usize> {
        self.chain.iter().position(|(_, s)| s.revision == revision)
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn get(&self, index: usize) -> Option<&(MigrationDirectory, MigrationScript)> {
        self.chain.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(MigrationDirectory, MigrationScript)> {
        self.chain.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use ormkit_migration_connector::create_migration_directory;
    use tempfile::tempdir;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z").unwrap().with_timezone(&Utc)
    }

    fn write(dir: &Path, slug: &str, revision: &str, down: Option<&str>) {
        let migration_dir = create_migration_directory(dir, slug).unwrap();
        let script = MigrationScript::new(revision, down.map(str::to_owned), slug, now());
        migration_dir.write_script(&script).unwrap();
    }

    #[test]
    fn empty_directory_is_an_empty_graph() {
        let dir = tempdir().unwrap();
        let graph = RevisionGraph::load(dir.path()).unwrap();
        assert!(graph.is_empty());
        assert_eq!(graph.head(), None);
    }

    #[test]
    fn linear_chain_orders_oldest_first() {
        let dir = tempdir().unwrap();
        write(dir.path(), "a_init", "a", None);
        write(dir.path(), "b_add_age", "b", Some("a"));

        let graph = RevisionGraph::load(dir.path()).unwrap();
        assert_eq!(graph.len(), 2);
        assert_eq!(graph.get(0).unwrap().1.revision, "a");
        assert_eq!(graph.get(1).unwrap().1.revision, "b");
        assert_eq!(graph.head(), Some("b"));
        assert_eq!(graph.position("b"), Some(1));
    }

    #[test]
    fn missing_parent_is_a_broken_chain() {
        let dir = tempdir().unwrap();
        write(dir.path(), "b_add_age", "b", Some("a"));
        assert!(matches!(RevisionGraph::load(dir.path()), Err(CoreError::BrokenChain { .. })));
    }

    #[test]
    fn two_roots_are_rejected() {
        let dir = tempdir().unwrap();
        write(dir.path(), "a_init", "a", None);
        write(dir.path(), "c_init", "c", None);
        assert!(matches!(RevisionGraph::load(dir.path()), Err(CoreError::MultipleHeads(_))));
    }
}
