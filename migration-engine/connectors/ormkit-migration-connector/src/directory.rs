//! Migrations directory management (spec §4.E, supplemented per §2 of the
//! expanded spec). At the directory root: a `migration_lock` file naming
//! the dialect the chain targets. Inside, one subdirectory per migration,
//! named `{timestamp}_{slug}`, holding a `migration.json` script file.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;
use ormkit_connector::Dialect;
use sha2::{Digest, Sha256};

use crate::error::{ConnectorError, ConnectorResult};
use crate::script::MigrationScript;

pub const MIGRATION_SCRIPT_FILENAME: &str = "migration.json";
pub const MIGRATION_LOCK_FILENAME: &str = "migration_lock";

fn to_connector_error(path: &Path, source: io::Error) -> ConnectorError {
    ConnectorError::Io { path: path.display().to_string(), source }
}

/// Checksum a migration script's serialized bytes (spec §2 "Each migration
/// script on disk is checksummed (SHA-256) at load time").
pub fn checksum(script: &MigrationScript) -> ConnectorResult<String> {
    let bytes = serde_json::to_vec(script).map_err(|e| ConnectorError::MalformedScript {
        path: script.revision.clone(),
        reason: e.to_string(),
    })?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

/// Write `migration_lock` at the directory root, recording the dialect the
/// chain targets (teacher: `write_migration_lock_file`).
pub fn write_migration_lock_file(migrations_dir: &Path, dialect: Dialect) -> ConnectorResult<()> {
    let path = migrations_dir.join(MIGRATION_LOCK_FILENAME);
    let provider = dialect_name(dialect);
    fs::write(&path, format!("# Do not edit this file manually\nprovider = \"{}\"\n", provider)).map_err(|e| to_connector_error(&path, e))
}

fn dialect_name(dialect: Dialect) -> &'static str {
    match dialect {
        Dialect::Postgres => "postgres",
        Dialect::Sqlite => "sqlite",
    }
}

/// Error if `dialect` doesn't match the one recorded in `migration_lock`.
/// A missing lock file is not an error: the chain has no recorded
/// provider yet (teacher: `error_on_changed_provider`).
pub fn error_on_changed_provider(migrations_dir: &Path, dialect: Dialect) -> ConnectorResult<()> {
    let path = migrations_dir.join(MIGRATION_LOCK_FILENAME);
    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(to_connector_error(&path, e)),
    };

    let expected = format!("provider = \"{}\"", dialect_name(dialect));
    if content.contains(&expected) {
        Ok(())
    } else {
        let locked = content
            .lines()
            .find_map(|line| line.trim().strip_prefix("provider = \"").and_then(|s| s.strip_suffix('"')))
            .unwrap_or("unknown")
            .to_owned();
        Err(ConnectorError::ProviderMismatch { locked, actual: dialect_name(dialect).to_owned() })
    }
}

/// Create a fresh, empty migration directory named `{timestamp}_{slug}`
/// under `migrations_dir` (teacher: `create_migration_directory`).
pub fn create_migration_directory(migrations_dir: &Path, slug: &str) -> ConnectorResult<MigrationDirectory> {
    let timestamp = Utc::now().format("%Y%m%d%H%M%S");
    let name = format!("{}_{}", timestamp, slug);
    let path = migrations_dir.join(&name);

    if path.exists() {
        return Err(ConnectorError::DirectoryExists { path: path.display().to_string() });
    }

    fs::create_dir_all(&path).map_err(|e| to_connector_error(&path, e))?;
    Ok(MigrationDirectory { path })
}

/// List migration directories, lexicographically sorted by name (which
/// sorts by timestamp since the prefix is fixed-width). Returns an empty
/// list if `migrations_dir` does not exist (spec §2, teacher behavior
/// preserved verbatim).
pub fn list_migrations(migrations_dir: &Path) -> ConnectorResult<Vec<MigrationDirectory>> {
    let mut entries = Vec::new();

    let read_dir = match fs::read_dir(migrations_dir) {
        Ok(read_dir) => read_dir,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(entries),
        Err(e) => return Err(to_connector_error(migrations_dir, e)),
    };

    for entry in read_dir {
        let entry = entry.map_err(|e| to_connector_error(migrations_dir, e))?;
        let file_type = entry.file_type().map_err(|e| to_connector_error(&entry.path(), e))?;
        if file_type.is_dir() {
            entries.push(MigrationDirectory { path: entry.path() });
        }
    }

    entries.sort_by(|a, b| a.name().cmp(b.name()));
    Ok(entries)
}

/// A proxy to one migration's on-disk directory.
#[derive(Debug, Clone)]
pub struct MigrationDirectory {
    path: PathBuf,
}

impl MigrationDirectory {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The `{timestamp}_{slug}` directory name.
    pub fn name(&self) -> &str {
        self.path.file_name().and_then(|n| n.to_str()).unwrap_or_default()
    }

    pub fn write_script(&self, script: &MigrationScript) -> ConnectorResult<()> {
        let path = self.path.join(MIGRATION_SCRIPT_FILENAME);
        let json = serde_json::to_string_pretty(script).map_err(|e| ConnectorError::MalformedScript {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        fs::write(&path, json).map_err(|e| to_connector_error(&path, e))
    }

    pub fn read_script(&self) -> ConnectorResult<MigrationScript> {
        let path = self.path.join(MIGRATION_SCRIPT_FILENAME);
        let content = fs::read_to_string(&path).map_err(|e| to_connector_error(&path, e))?;
        serde_json::from_str(&content).map_err(|e| ConnectorError::MalformedScript {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    /// Verify the on-disk script still matches a previously recorded
    /// checksum (spec §2, used by `status`/`history` to report drift
    /// without re-parsing the full script).
    pub fn verify_checksum(&self, recorded: &str) -> ConnectorResult<()> {
        let script = self.read_script()?;
        let actual = checksum(&script)?;
        if actual == recorded {
            Ok(())
        } else {
            Err(ConnectorError::ChecksumMismatch { path: self.path.display().to_string(), recorded: recorded.to_owned(), actual })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;
    use tempfile::tempdir;

    fn sample_script(revision: &str, down: Option<&str>) -> MigrationScript {
        MigrationScript::new(
            revision,
            down.map(str::to_owned),
            "test migration",
            DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z").unwrap().with_timezone(&Utc),
        )
    }

    #[test]
    fn list_migrations_on_missing_directory_is_empty() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("does_not_exist");
        assert_eq!(list_migrations(&missing).unwrap().len(), 0);
    }

    #[test]
    fn create_then_list_round_trips() {
        let dir = tempdir().unwrap();
        create_migration_directory(dir.path(), "init").unwrap();
        let found = list_migrations(dir.path()).unwrap();
        assert_eq!(found.len(), 1);
        assert!(found[0].name().ends_with("_init"));
    }

    #[test]
    fn write_then_read_script_round_trips() {
        let dir = tempdir().unwrap();
        let migration_dir = create_migration_directory(dir.path(), "init").unwrap();
        let script = sample_script("abc123", None);
        migration_dir.write_script(&script).unwrap();
        assert_eq!(migration_dir.read_script().unwrap(), script);
    }

    #[test]
    fn checksum_detects_on_disk_tampering() {
        let dir = tempdir().unwrap();
        let migration_dir = create_migration_directory(dir.path(), "init").unwrap();
        let script = sample_script("abc123", None);
        migration_dir.write_script(&script).unwrap();
        let recorded = checksum(&script).unwrap();
        assert!(migration_dir.verify_checksum(&recorded).is_ok());

        let mut tampered = script.clone();
        tampered.message = "tampered".to_owned();
        migration_dir.write_script(&tampered).unwrap();
        assert!(matches!(migration_dir.verify_checksum(&recorded), Err(ConnectorError::ChecksumMismatch { .. })));
    }

    #[test]
    fn provider_mismatch_is_rejected() {
        let dir = tempdir().unwrap();
        write_migration_lock_file(dir.path(), Dialect::Postgres).unwrap();
        assert!(error_on_changed_provider(dir.path(), Dialect::Postgres).is_ok());
        assert!(matches!(error_on_changed_provider(dir.path(), Dialect::Sqlite), Err(ConnectorError::ProviderMismatch { .. })));
    }

    #[test]
    fn missing_lock_file_does_not_error() {
        let dir = tempdir().unwrap();
        assert!(error_on_changed_provider(dir.path(), Dialect::Postgres).is_ok());
    }
}
