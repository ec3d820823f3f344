//! `seed` command: schema creation and reference data.

use std::io::Write;

use camino::Utf8PathBuf;
use clap::Parser;
use clickbus_core::TableCounts;
use clickbus_data::{SeedReport, seed_reference_data};
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::{ARG_CLUSTERS, ARG_DATABASE, CliError, ENV_SEED_DATABASE, open_store, write_json};

/// CLI arguments for the `seed` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "seed",
    long_about = "Create the database schema if needed, insert the 27 Brazilian \
                 federative units and the named loyalty clusters. Existing rows \
                 are left untouched.",
    about = "Initialise the database with reference data"
)]
#[ortho_config(prefix = "CLICKBUS")]
pub(crate) struct SeedArgs {
    /// Path to the SQLite database.
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// Comma-separated loyalty cluster names.
    #[arg(long = ARG_CLUSTERS, value_name = "names", value_delimiter = ',')]
    #[serde(default)]
    pub(crate) clusters: Option<Vec<String>>,
}

impl SeedArgs {
    pub(crate) fn into_config(self) -> Result<SeedConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        SeedConfig::try_from(merged)
    }
}

/// Resolved `seed` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SeedConfig {
    pub(crate) database: Utf8PathBuf,
    /// Cluster names, trimmed, blanks and duplicates removed.
    pub(crate) clusters: Vec<String>,
}

impl TryFrom<SeedArgs> for SeedConfig {
    type Error = CliError;

    fn try_from(args: SeedArgs) -> Result<Self, Self::Error> {
        let database = args.database.ok_or(CliError::MissingArgument {
            field: ARG_DATABASE,
            env: ENV_SEED_DATABASE,
        })?;
        let mut clusters: Vec<String> = Vec::new();
        for raw in args.clusters.unwrap_or_default() {
            let name = raw.trim();
            if !name.is_empty() && !clusters.iter().any(|known| known == name) {
                clusters.push(name.to_owned());
            }
        }
        Ok(Self { database, clusters })
    }
}

/// Output of the `seed` command.
#[derive(Debug, Serialize)]
pub(crate) struct SeedSummary {
    pub(crate) inserted: SeedReport,
    pub(crate) totals: TableCounts,
}

pub(crate) fn run_seed(args: SeedArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let config = args.into_config()?;
    let summary = execute_seed(&config)?;
    write_json(writer, &summary)
}

pub(crate) fn execute_seed(config: &SeedConfig) -> Result<SeedSummary, CliError> {
    let store = open_store(&config.database)?;
    let inserted = seed_reference_data(&store, &config.clusters).map_err(CliError::Seed)?;
    let totals = store.table_counts().map_err(CliError::Query)?;
    Ok(SeedSummary { inserted, totals })
}
