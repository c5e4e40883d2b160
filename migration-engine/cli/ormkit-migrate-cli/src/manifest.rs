//! The `--models` manifest format (spec §6 CLI flag `--models`). A
//! standalone CLI binary has no access to another process's in-memory
//! entity registry, so `auto` reads a JSON export of it instead — the
//! same role `env.py` plays for Alembic, just data instead of code.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use ormkit_migration_connector::ColumnSpec;

use crate::error::{CliError, CliResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityManifest {
    pub table: String,
    pub columns: Vec<ColumnSpec>,
}

pub fn load(path: &Path) -> CliResult<Vec<EntityManifest>> {
    let content = fs::read_to_string(path).map_err(|e| CliError::Config(format!("reading models manifest {}: {}", path.display(), e)))?;
    serde_json::from_str(&content).map_err(|e| CliError::Config(format!("parsing models manifest {}: {}", path.display(), e)))
}
