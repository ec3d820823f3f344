//! Command-line interface for the ClickBus ingest pipeline.
#![forbid(unsafe_code)]

use std::io::Write;
use std::path::PathBuf;

use camino::Utf8Path;
use clap::{Parser, Subcommand};
use clickbus_core::SqliteStore;
use log::{debug, warn};
use serde::Serialize;

mod distance;
mod error;
mod import;
mod routes;
mod seed;

pub use error::CliError;

use distance::DistanceArgs;
use import::{MunicipalitiesArgs, OrdersArgs};
use routes::RoutesArgs;
use seed::SeedArgs;

const ARG_DATABASE: &str = "database";
const ARG_FEED: &str = "feed";
const ARG_CLUSTERS: &str = "clusters";
const ARG_RESOLVE_DISTANCES: &str = "resolve-distances";
const ARG_MAPS_API_KEY: &str = "maps-api-key";
const ARG_MAPS_BASE_URL: &str = "maps-base-url";
const ARG_ORIGIN: &str = "origin";
const ARG_DESTINATION: &str = "destination";
const ARG_LIMIT: &str = "limit";
const ENV_SEED_DATABASE: &str = "CLICKBUS_CMDS_SEED_DATABASE";
const ENV_MUNICIPALITIES_DATABASE: &str = "CLICKBUS_CMDS_MUNICIPALITIES_DATABASE";
const ENV_MUNICIPALITIES_FEED: &str = "CLICKBUS_CMDS_MUNICIPALITIES_FEED";
const ENV_ORDERS_DATABASE: &str = "CLICKBUS_CMDS_ORDERS_DATABASE";
const ENV_ORDERS_FEED: &str = "CLICKBUS_CMDS_ORDERS_FEED";
const ENV_ORDERS_MAPS_API_KEY: &str = "CLICKBUS_CMDS_ORDERS_MAPS_API_KEY";
const ENV_DISTANCE_ORIGIN: &str = "CLICKBUS_CMDS_DISTANCE_ORIGIN";
const ENV_DISTANCE_DESTINATION: &str = "CLICKBUS_CMDS_DISTANCE_DESTINATION";
const ENV_DISTANCE_MAPS_API_KEY: &str = "CLICKBUS_CMDS_DISTANCE_MAPS_API_KEY";
const ENV_ROUTES_DATABASE: &str = "CLICKBUS_CMDS_ROUTES_DATABASE";

/// Run the ClickBus CLI with the current process arguments and environment.
///
/// Loads a `.env` file from the working directory when present, installs the
/// logger, then dispatches the subcommand. Command output is written to
/// stdout as pretty JSON; logs go to stderr.
pub fn run() -> Result<(), CliError> {
    let (mut logger, dotenv) = prepare_logging();
    // An embedding process may already have installed a logger.
    if let Err(err) = logger.try_init() {
        debug!("keeping the existing logger: {err}");
    }
    report_dotenv(dotenv);
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    let mut stdout = std::io::stdout().lock();
    dispatch(cli.command, &mut stdout)
}

fn dispatch(command: Command, writer: &mut dyn Write) -> Result<(), CliError> {
    match command {
        Command::Seed(args) => seed::run_seed(args, writer),
        Command::Municipalities(args) => import::run_municipalities(args, writer),
        Command::Orders(args) => import::run_orders(args, writer),
        Command::Distance(args) => distance::run_distance(args, writer),
        Command::Routes(args) => routes::run_routes(args, writer),
    }
}

/// Read `.env`, then build the logger from the environment it may extend.
fn prepare_logging() -> (env_logger::Builder, Result<PathBuf, dotenvy::Error>) {
    let dotenv = dotenvy::dotenv();
    let env = env_logger::Env::default().default_filter_or("info");
    (env_logger::Builder::from_env(env), dotenv)
}

fn report_dotenv(outcome: Result<PathBuf, dotenvy::Error>) {
    match outcome {
        Ok(path) => debug!("loaded environment from {}", path.display()),
        Err(err) if err.not_found() => {}
        Err(err) => warn!("ignoring unreadable .env file: {err}"),
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "clickbus",
    about = "Load ClickBus trip data into a normalised SQLite store",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create the schema and insert states and loyalty clusters.
    Seed(SeedArgs),
    /// Import the IBGE municipality feed.
    Municipalities(MunicipalitiesArgs),
    /// Import the order feed.
    Orders(OrdersArgs),
    /// Look up the road distance between two places.
    Distance(DistanceArgs),
    /// List the most travelled routes.
    Routes(RoutesArgs),
}

/// Open (and if needed create) the store at `path`.
fn open_store(path: &Utf8Path) -> Result<SqliteStore, CliError> {
    clickbus_data::fs::ensure_parent_dir(path).map_err(|source| {
        CliError::PrepareDatabaseDir {
            path: path.to_path_buf(),
            source,
        }
    })?;
    SqliteStore::open(path.as_std_path()).map_err(|source| CliError::OpenStore {
        path: path.to_path_buf(),
        source,
    })
}

/// Fail unless `path` names an existing regular file.
fn require_existing(path: &Utf8Path, field: &'static str) -> Result<(), CliError> {
    match clickbus_data::fs::is_regular_file(path) {
        Ok(true) => Ok(()),
        Ok(false) => Err(CliError::SourcePathNotFile {
            field,
            path: path.to_path_buf(),
        }),
        Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
            Err(CliError::MissingSourceFile {
                field,
                path: path.to_path_buf(),
            })
        }
        Err(source) => Err(CliError::InspectSourcePath {
            field,
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn write_json<T: Serialize + ?Sized>(writer: &mut dyn Write, value: &T) -> Result<(), CliError> {
    let payload = serde_json::to_string_pretty(value).map_err(CliError::SerialiseOutput)?;
    writer
        .write_all(payload.as_bytes())
        .map_err(CliError::WriteOutput)?;
    writer.write_all(b"\n").map_err(CliError::WriteOutput)?;
    Ok(())
}

#[cfg(test)]
mod tests;
