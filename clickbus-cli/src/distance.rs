//! `distance` command and the Distance Matrix settings shared with `orders`.

use std::io::Write;

use clap::Parser;
use clickbus_core::DistanceResolver;
use clickbus_data::DEFAULT_BASE_URL;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::import::build_resolver;
use crate::{
    ARG_DESTINATION, ARG_MAPS_API_KEY, ARG_MAPS_BASE_URL, ARG_ORIGIN, CliError,
    ENV_DISTANCE_DESTINATION, ENV_DISTANCE_MAPS_API_KEY, ENV_DISTANCE_ORIGIN, write_json,
};

/// Distance Matrix endpoint and credentials.
#[derive(Clone, PartialEq, Eq)]
pub(crate) struct MapsConfig {
    pub(crate) api_key: String,
    pub(crate) base_url: String,
}

impl std::fmt::Debug for MapsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapsConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl MapsConfig {
    /// Validate the merged key and endpoint; `env` names the variable to
    /// suggest when the key is missing.
    pub(crate) fn from_parts(
        merged_key: Option<String>,
        merged_base_url: Option<String>,
        env: &'static str,
    ) -> Result<Self, CliError> {
        let api_key = merged_key
            .filter(|key| !key.trim().is_empty())
            .ok_or(CliError::MissingArgument {
                field: ARG_MAPS_API_KEY,
                env,
            })?;
        let base_url = merged_base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_owned());
        Ok(Self { api_key, base_url })
    }
}

/// CLI arguments for the `distance` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "distance",
    long_about = "Ask the Distance Matrix API for the road distance between \
                 two free-text places such as \"Campinas, SP\" and print it \
                 in kilometres.",
    about = "Look up a road distance"
)]
#[ortho_config(prefix = "CLICKBUS")]
pub(crate) struct DistanceArgs {
    /// Origin place, e.g. "São Paulo, SP".
    #[arg(value_name = "origin")]
    #[serde(default)]
    pub(crate) origin: Option<String>,
    /// Destination place, e.g. "Campinas, SP".
    #[arg(value_name = "destination")]
    #[serde(default)]
    pub(crate) destination: Option<String>,
    /// Distance Matrix API key.
    #[arg(long = ARG_MAPS_API_KEY, value_name = "key")]
    #[serde(default)]
    pub(crate) maps_api_key: Option<String>,
    /// Override the Distance Matrix endpoint.
    #[arg(long = ARG_MAPS_BASE_URL, value_name = "url")]
    #[serde(default)]
    pub(crate) maps_base_url: Option<String>,
}

impl DistanceArgs {
    pub(crate) fn into_config(self) -> Result<DistanceConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        DistanceConfig::try_from(merged)
    }
}

/// Resolved `distance` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DistanceConfig {
    pub(crate) origin: String,
    pub(crate) destination: String,
    pub(crate) maps: MapsConfig,
}

impl TryFrom<DistanceArgs> for DistanceConfig {
    type Error = CliError;

    fn try_from(args: DistanceArgs) -> Result<Self, Self::Error> {
        let origin = args.origin.ok_or(CliError::MissingArgument {
            field: ARG_ORIGIN,
            env: ENV_DISTANCE_ORIGIN,
        })?;
        let destination = args.destination.ok_or(CliError::MissingArgument {
            field: ARG_DESTINATION,
            env: ENV_DISTANCE_DESTINATION,
        })?;
        let maps = MapsConfig::from_parts(
            args.maps_api_key,
            args.maps_base_url,
            ENV_DISTANCE_MAPS_API_KEY,
        )?;
        Ok(Self {
            origin,
            destination,
            maps,
        })
    }
}

/// Output of the `distance` command.
#[derive(Debug, PartialEq, Serialize)]
pub(crate) struct DistanceSummary {
    pub(crate) origin: String,
    pub(crate) destination: String,
    pub(crate) distance_km: f64,
}

pub(crate) fn run_distance(args: DistanceArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let config = args.into_config()?;
    let resolver = build_resolver(&config.maps)?;
    let summary = execute_distance(&config, &resolver)?;
    write_json(writer, &summary)
}

pub(crate) fn execute_distance(
    config: &DistanceConfig,
    resolver: &dyn DistanceResolver,
) -> Result<DistanceSummary, CliError> {
    let distance_km = resolver
        .distance_km(&config.origin, &config.destination)
        .map_err(|source| CliError::Distance {
            origin: config.origin.clone(),
            destination: config.destination.clone(),
            source,
        })?;
    Ok(DistanceSummary {
        origin: config.origin.clone(),
        destination: config.destination.clone(),
        distance_km,
    })
}
