//! `ormkit-migrate` — the standalone migration CLI (spec §6 "CLI
//! surface"). Subcommands: `init`, `create`, `auto`, `up`, `down`,
//! `status`, `history`; flags `--config`, `--url`, `--models`,
//! `--verbose`.

mod autogen;
mod commands;
mod config;
mod error;
mod manifest;

use std::path::PathBuf;
use std::process::ExitCode;

use structopt::StructOpt;

use ormkit_connector::{ConnectionPool, Dialect};
use ormkit_migration_core::DowngradeTarget;

use config::MigrationConfig;
use error::{CliError, CliResult};

#[derive(Debug, StructOpt)]
#[structopt(name = "ormkit-migrate", about = "ormkit's migration CLI")]
struct Opt {
    /// Path to the INI-shaped migration config file.
    #[structopt(long, default_value = "ormkit.ini")]
    config: PathBuf,

    /// Overrides `sqlalchemy.url` from the config file.
    #[structopt(long)]
    url: Option<String>,

    /// Path to a JSON export of the entity registry, used by `auto`.
    #[structopt(long)]
    models: Option<PathBuf>,

    #[structopt(long)]
    verbose: bool,

    #[structopt(subcommand)]
    command: Command,
}

#[derive(Debug, StructOpt)]
enum Command {
    /// Creates the migrations directory and locks it to a dialect.
    Init {
        #[structopt(long, default_value = "postgres")]
        dialect: String,
    },
    /// Scaffolds an empty migration against the current head.
    Create {
        #[structopt(long)]
        message: String,
    },
    /// Diffs `--models` against the live schema and writes a migration.
    Auto {
        #[structopt(long)]
        message: String,
    },
    /// Runs pending migrations up to `--to` (default: head).
    Up {
        #[structopt(long = "to")]
        to: Option<String>,
    },
    /// Rolls back migrations. `--to` takes a revision or `-N` steps (default: `-1`).
    Down {
        #[structopt(long = "to", default_value = "-1")]
        to: String,
    },
    /// Prints the current revision and any pending migrations.
    Status,
    /// Prints every applied migration, oldest first.
    History,
}

fn parse_downgrade_target(raw: &str) -> DowngradeTarget {
    if let Some(steps) = raw.strip_prefix('-') {
        match steps.parse::<usize>() {
            Ok(n) => DowngradeTarget::Steps(n),
            Err(_) => DowngradeTarget::Revision(raw.to_owned()),
        }
    } else if raw == "base" {
        DowngradeTarget::Base
    } else {
        DowngradeTarget::Revision(raw.to_owned())
    }
}

fn parse_dialect(raw: &str) -> CliResult<Dialect> {
    match raw {
        "postgres" | "postgresql" => Ok(Dialect::Postgres),
        "sqlite" => Ok(Dialect::Sqlite),
        other => Err(CliError::Config(format!("unknown dialect `{}`; expected `postgres` or `sqlite`", other))),
    }
}

/// Extension point for an embedding application: the wire driver is out
/// of scope for this crate (spec §1), so subcommands that touch a live
/// database need a `ConnectionPool` supplied some other way than a bare
/// `--url` string. The CLI still parses and validates everything up to
/// that point.
fn connect(_url: &str) -> CliResult<Box<dyn ConnectionPool>> {
    Err(CliError::NoDriver)
}

async fn run(opt: Opt) -> CliResult<String> {
    let config = MigrationConfig::load(&opt.config)?;
    let migrations_dir = config.script_location.clone();
    let url = opt.url.clone().or_else(|| config.url.clone());

    match opt.command {
        Command::Init { dialect } => {
            commands::init(&migrations_dir, parse_dialect(&dialect)?)?;
            Ok(format!("initialized migrations directory at {}", migrations_dir.display()))
        }
        Command::Create { message } => {
            let slug = config.truncate_slug(&message.to_ascii_lowercase().replace(' ', "_"));
            let path = commands::create(&migrations_dir, &message, &slug)?;
            Ok(format!("created {}", path.display()))
        }
        Command::Auto { message } => {
            let models_path = opt.models.ok_or_else(|| CliError::Config("`auto` requires --models".to_owned()))?;
            let url = url.ok_or_else(|| CliError::Config("no database url: pass --url or set sqlalchemy.url".to_owned()))?;
            let pool = connect(&url)?;
            let slug = config.truncate_slug(&message.to_ascii_lowercase().replace(' ', "_"));
            let path = commands::auto(pool.as_ref(), &migrations_dir, &models_path, &message, &slug).await?;
            Ok(format!("created {}", path.display()))
        }
        Command::Up { to } => {
            let url = url.ok_or_else(|| CliError::Config("no database url: pass --url or set sqlalchemy.url".to_owned()))?;
            let pool = connect(&url)?;
            let applied = commands::up(pool.as_ref(), &migrations_dir, &config.version_table, to.as_deref()).await?;
            Ok(format!("applied {} migration(s): {:?}", applied.len(), applied))
        }
        Command::Down { to } => {
            let url = url.ok_or_else(|| CliError::Config("no database url: pass --url or set sqlalchemy.url".to_owned()))?;
            let pool = connect(&url)?;
            let target = parse_downgrade_target(&to);
            let reverted = commands::down(pool.as_ref(), &migrations_dir, &config.version_table, target).await?;
            Ok(format!("rolled back {} migration(s): {:?}", reverted.len(), reverted))
        }
        Command::Status => {
            let url = url.ok_or_else(|| CliError::Config("no database url: pass --url or set sqlalchemy.url".to_owned()))?;
            let pool = connect(&url)?;
            let status = commands::status(pool.as_ref(), &migrations_dir, &config.version_table).await?;
            Ok(format!("current: {:?}, head: {:?}, pending: {:?}", status.current, status.head, status.pending))
        }
        Command::History => {
            let url = url.ok_or_else(|| CliError::Config("no database url: pass --url or set sqlalchemy.url".to_owned()))?;
            let pool = connect(&url)?;
            let history = commands::history(pool.as_ref(), &migrations_dir, &config.version_table).await?;
            Ok(format!("{} migration(s) applied", history.len()))
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let opt = Opt::from_args();
    let level = if opt.verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    tracing_subscriber::fmt().with_max_level(level).init();

    match run(opt).await {
        Ok(message) => {
            tracing::info!("{}", message);
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!("{}", err);
            ExitCode::from(err.exit_code() as u8)
        }
    }
}
