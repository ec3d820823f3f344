//! `routes` command: the most travelled routes.

use std::io::Write;

use camino::Utf8PathBuf;
use clap::Parser;
use clickbus_core::PopularRoute;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::{
    ARG_DATABASE, ARG_LIMIT, CliError, ENV_ROUTES_DATABASE, open_store, require_existing,
    write_json,
};

/// Routes listed when no limit is configured.
pub(crate) const DEFAULT_ROUTE_LIMIT: u32 = 10;

/// CLI arguments for the `routes` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "routes",
    about = "List routes ranked by number of orders"
)]
#[ortho_config(prefix = "CLICKBUS")]
pub(crate) struct RoutesArgs {
    /// Path to the SQLite database.
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// Maximum number of routes to list.
    #[arg(long = ARG_LIMIT, value_name = "n")]
    #[serde(default)]
    pub(crate) limit: Option<u32>,
}

impl RoutesArgs {
    pub(crate) fn into_config(self) -> Result<RoutesConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        RoutesConfig::try_from(merged)
    }
}

/// Resolved `routes` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RoutesConfig {
    pub(crate) database: Utf8PathBuf,
    pub(crate) limit: u32,
}

impl TryFrom<RoutesArgs> for RoutesConfig {
    type Error = CliError;

    fn try_from(args: RoutesArgs) -> Result<Self, Self::Error> {
        let database = args.database.ok_or(CliError::MissingArgument {
            field: ARG_DATABASE,
            env: ENV_ROUTES_DATABASE,
        })?;
        Ok(Self {
            database,
            limit: args.limit.unwrap_or(DEFAULT_ROUTE_LIMIT),
        })
    }
}

pub(crate) fn run_routes(args: RoutesArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let config = args.into_config()?;
    let routes = execute_routes(&config)?;
    write_json(writer, &routes)
}

pub(crate) fn execute_routes(config: &RoutesConfig) -> Result<Vec<PopularRoute>, CliError> {
    // Querying must not create an empty database as a side effect.
    require_existing(&config.database, ARG_DATABASE)?;
    let store = open_store(&config.database)?;
    store.popular_routes(config.limit).map_err(CliError::Query)
}
