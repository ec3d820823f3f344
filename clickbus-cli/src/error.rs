//! Error types emitted by the ClickBus CLI.
//!
//! Keep this error type reasonably small, as every command helper returns
//! `Result<_, CliError>`. Messages describe only their own layer; the
//! binary prints the `source()` chain underneath.

use std::sync::Arc;

use camino::Utf8PathBuf;
use clickbus_core::{DistanceError, StoreError};
use clickbus_data::{ImportError, ResolverBuildError};
use thiserror::Error;

/// Errors emitted by the ClickBus CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        field: &'static str,
        env: &'static str,
    },
    /// A referenced input path does not exist on disk.
    #[error("{field} path {path:?} does not exist")]
    MissingSourceFile {
        field: &'static str,
        path: Utf8PathBuf,
    },
    /// A referenced input path exists but is not a file.
    #[error("{field} path {path:?} exists but is not a file")]
    SourcePathNotFile {
        field: &'static str,
        path: Utf8PathBuf,
    },
    /// A referenced input path could not be inspected due to an IO error.
    #[error("failed to inspect {field} path {path:?}")]
    InspectSourcePath {
        field: &'static str,
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The directory holding the database could not be created.
    #[error("failed to create database directory for {path:?}")]
    PrepareDatabaseDir {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Opening or initialising the database failed.
    #[error("failed to open database {path:?}")]
    OpenStore {
        path: Utf8PathBuf,
        #[source]
        source: StoreError,
    },
    /// Seeding reference data failed.
    #[error("failed to seed reference data")]
    Seed(#[source] StoreError),
    /// An import pass could not run.
    #[error("import failed")]
    Import(#[from] ImportError),
    /// A reporting query failed.
    #[error("query failed")]
    Query(#[source] StoreError),
    /// Constructing the distance resolver failed.
    #[error("failed to build distance resolver for {base_url:?}")]
    BuildDistanceResolver {
        base_url: String,
        #[source]
        source: ResolverBuildError,
    },
    /// A one-off distance lookup failed.
    #[error("distance lookup {origin:?} -> {destination:?} failed")]
    Distance {
        origin: String,
        destination: String,
        #[source]
        source: DistanceError,
    },
    /// Serialising command output failed.
    #[error("failed to serialise output")]
    SerialiseOutput(#[source] serde_json::Error),
    /// Writing command output failed.
    #[error("failed to write output")]
    WriteOutput(#[source] std::io::Error),
}
