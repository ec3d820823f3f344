//! `municipalities` and `orders` commands: the two import passes.

use std::io::Write;

use camino::Utf8PathBuf;
use clap::Parser;
use clickbus_core::DistanceResolver;
use clickbus_data::{
    HttpDistanceResolver, HttpDistanceResolverConfig, MunicipalityImportReport,
    OrderImportReport, import_municipalities_from_path, import_orders_from_path,
};
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::distance::MapsConfig;
use crate::{
    ARG_DATABASE, ARG_FEED, ARG_MAPS_API_KEY, ARG_MAPS_BASE_URL, ARG_RESOLVE_DISTANCES,
    CliError, ENV_MUNICIPALITIES_DATABASE, ENV_MUNICIPALITIES_FEED, ENV_ORDERS_DATABASE,
    ENV_ORDERS_FEED, ENV_ORDERS_MAPS_API_KEY, open_store, require_existing, write_json,
};

/// CLI arguments for the `municipalities` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "municipalities",
    long_about = "Insert every municipality of an IBGE CSV feed (columns COD, \
                 NOME, UF) that is not already stored. Run after `seed` and \
                 before `orders`.",
    about = "Import the municipality feed"
)]
#[ortho_config(prefix = "CLICKBUS")]
pub(crate) struct MunicipalitiesArgs {
    /// Path to the municipality CSV feed.
    #[arg(value_name = "path")]
    #[serde(default)]
    pub(crate) feed: Option<Utf8PathBuf>,
    /// Path to the SQLite database.
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
}

impl MunicipalitiesArgs {
    pub(crate) fn into_config(self) -> Result<MunicipalitiesConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        MunicipalitiesConfig::try_from(merged)
    }
}

/// Resolved `municipalities` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MunicipalitiesConfig {
    pub(crate) feed: Utf8PathBuf,
    pub(crate) database: Utf8PathBuf,
}

impl TryFrom<MunicipalitiesArgs> for MunicipalitiesConfig {
    type Error = CliError;

    fn try_from(args: MunicipalitiesArgs) -> Result<Self, Self::Error> {
        let feed = args.feed.ok_or(CliError::MissingArgument {
            field: ARG_FEED,
            env: ENV_MUNICIPALITIES_FEED,
        })?;
        let database = args.database.ok_or(CliError::MissingArgument {
            field: ARG_DATABASE,
            env: ENV_MUNICIPALITIES_DATABASE,
        })?;
        Ok(Self { feed, database })
    }
}

pub(crate) fn run_municipalities(
    args: MunicipalitiesArgs,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let config = args.into_config()?;
    let report = execute_municipalities(&config)?;
    write_json(writer, &report)
}

pub(crate) fn execute_municipalities(
    config: &MunicipalitiesConfig,
) -> Result<MunicipalityImportReport, CliError> {
    require_existing(&config.feed, ARG_FEED)?;
    let store = open_store(&config.database)?;
    Ok(import_municipalities_from_path(&store, &config.feed)?)
}

/// CLI arguments for the `orders` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "orders",
    long_about = "Import the order feed: customers, carriers, routes, orders \
                 and cluster memberships are created on demand. With \
                 --resolve-distances, routes without a recorded distance are \
                 measured through the Distance Matrix API first.",
    about = "Import the order feed"
)]
#[ortho_config(prefix = "CLICKBUS")]
pub(crate) struct OrdersArgs {
    /// Path to the order CSV feed.
    #[arg(value_name = "path")]
    #[serde(default)]
    pub(crate) feed: Option<Utf8PathBuf>,
    /// Path to the SQLite database.
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// Ask the distance service for routes whose distance is missing.
    #[arg(
        long = ARG_RESOLVE_DISTANCES,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) resolve_distances: Option<bool>,
    /// Distance Matrix API key.
    #[arg(long = ARG_MAPS_API_KEY, value_name = "key")]
    #[serde(default)]
    pub(crate) maps_api_key: Option<String>,
    /// Override the Distance Matrix endpoint.
    #[arg(long = ARG_MAPS_BASE_URL, value_name = "url")]
    #[serde(default)]
    pub(crate) maps_base_url: Option<String>,
}

impl OrdersArgs {
    pub(crate) fn into_config(self) -> Result<OrdersConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        OrdersConfig::try_from(merged)
    }
}

/// Resolved `orders` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct OrdersConfig {
    pub(crate) feed: Utf8PathBuf,
    pub(crate) database: Utf8PathBuf,
    /// Present only when distances should be resolved.
    pub(crate) maps: Option<MapsConfig>,
}

impl TryFrom<OrdersArgs> for OrdersConfig {
    type Error = CliError;

    fn try_from(args: OrdersArgs) -> Result<Self, Self::Error> {
        let feed = args.feed.ok_or(CliError::MissingArgument {
            field: ARG_FEED,
            env: ENV_ORDERS_FEED,
        })?;
        let database = args.database.ok_or(CliError::MissingArgument {
            field: ARG_DATABASE,
            env: ENV_ORDERS_DATABASE,
        })?;
        let maps = if args.resolve_distances.unwrap_or(false) {
            Some(MapsConfig::from_parts(
                args.maps_api_key,
                args.maps_base_url,
                ENV_ORDERS_MAPS_API_KEY,
            )?)
        } else {
            None
        };
        Ok(Self {
            feed,
            database,
            maps,
        })
    }
}

pub(crate) fn run_orders(args: OrdersArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let config = args.into_config()?;
    let report = execute_orders(&config)?;
    write_json(writer, &report)
}

pub(crate) fn execute_orders(config: &OrdersConfig) -> Result<OrderImportReport, CliError> {
    require_existing(&config.feed, ARG_FEED)?;
    let http = config.maps.as_ref().map(build_resolver).transpose()?;
    let store = open_store(&config.database)?;
    let resolver = http.as_ref().map(|client| client as &dyn DistanceResolver);
    Ok(import_orders_from_path(&store, &config.feed, resolver)?)
}

pub(crate) fn build_resolver(maps: &MapsConfig) -> Result<HttpDistanceResolver, CliError> {
    let config = HttpDistanceResolverConfig::new(maps.api_key.clone())
        .with_base_url(maps.base_url.clone());
    HttpDistanceResolver::with_config(config).map_err(|source| {
        CliError::BuildDistanceResolver {
            base_url: maps.base_url.clone(),
            source,
        }
    })
}

