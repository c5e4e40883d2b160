//! The `[alembic]`-shaped migration configuration file (spec §6
//! "Migration configuration file"), parsed with the `ini` crate rather
//! than a hand-rolled reader.

use std::path::{Path, PathBuf};

use ini::Ini;

use crate::error::{CliError, CliResult};

const SECTION: &str = "alembic";
const DEFAULT_VERSION_TABLE: &str = "alembic_version";
const DEFAULT_TRUNCATE_SLUG_LENGTH: usize = 40;

/// A parsed migration config. Unknown keys in `[alembic]` are preserved
/// verbatim in `extra` rather than rejected (spec §6 "tolerates and
/// preserves unknown keys").
#[derive(Debug, Clone, PartialEq)]
pub struct MigrationConfig {
    pub script_location: PathBuf,
    pub url: Option<String>,
    pub version_table: String,
    pub file_template: Option<String>,
    pub truncate_slug_length: usize,
    pub timezone: Option<String>,
    pub extra: Vec<(String, String)>,
}

impl MigrationConfig {
    /// Loads `path` and resolves `script_location` relative to the
    /// config file's own directory (spec §6 "relative paths resolved
    /// against the config file").
    pub fn load(path: &Path) -> CliResult<Self> {
        let ini = Ini::load_from_file(path).map_err(|e| CliError::Config(format!("reading config {}: {}", path.display(), e)))?;
        let section = ini
            .section(Some(SECTION))
            .ok_or_else(|| CliError::Config(format!("{} has no [{}] section", path.display(), SECTION)))?;

        let script_location = section
            .get("script_location")
            .ok_or_else(|| CliError::Config(format!("{} is missing required key `script_location`", path.display())))?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        let script_location = base_dir.join(script_location);

        let version_table = section.get("version_table").unwrap_or(DEFAULT_VERSION_TABLE).to_owned();
        let truncate_slug_length = section
            .get("truncate_slug_length")
            .map(|v| v.parse::<usize>().map_err(|_| CliError::Config(format!("truncate_slug_length must be an integer, got `{}`", v))))
            .transpose()?
            .unwrap_or(DEFAULT_TRUNCATE_SLUG_LENGTH);

        let known = ["script_location", "sqlalchemy.url", "version_table", "file_template", "truncate_slug_length", "timezone"];
        let extra = section.iter().filter(|(k, _)| !known.contains(k)).map(|(k, v)| (k.to_owned(), v.to_owned())).collect();

        Ok(Self {
            script_location,
            url: section.get("sqlalchemy.url").map(str::to_owned),
            version_table,
            file_template: section.get("file_template").map(str::to_owned),
            truncate_slug_length,
            timezone: section.get("timezone").map(str::to_owned),
            extra,
        })
    }

    /// Truncates a slug to `truncate_slug_length` (spec §6
    /// `truncate_slug_length`, default 40).
    pub fn truncate_slug(&self, slug: &str) -> String {
        slug.chars().take(self.truncate_slug_length).collect()
    }
}
