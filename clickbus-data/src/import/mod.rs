//! Import passes over the municipality and order feeds.
//!
//! Each pass walks its feed once, writes through the idempotent
//! [`clickbus_core::EntityUpsert`] layer, and returns a report of what was
//! written and which rows were skipped. Per-row failures are logged and
//! recorded; only an unreadable feed aborts a pass.

mod municipalities;
mod orders;
mod report;

use clickbus_core::{SqliteStore, StoreError, brazilian_states};
use log::info;
use serde::Serialize;
use thiserror::Error;

use crate::feed::FeedError;

pub use municipalities::{import_municipalities, import_municipalities_from_path};
pub use orders::{OrderImporter, RowOutcome, import_orders, import_orders_from_path};
pub use report::{
    EntityTally, ImportStep, MunicipalityImportReport, OrderImportReport, RowIssue, SkipReason,
};

/// Pass-level failures that stop an import.
#[derive(Debug, Error)]
pub enum ImportError {
    /// The feed could not be opened or its header read.
    #[error(transparent)]
    Feed(#[from] FeedError),
}

/// Rows inserted by [`seed_reference_data`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    /// States inserted.
    pub states: usize,
    /// Clusters inserted.
    pub clusters: usize,
}

/// Insert the built-in Brazilian states and the named clusters.
///
/// Existing rows are left untouched, so seeding twice inserts nothing the
/// second time.
///
/// # Errors
///
/// Returns [`StoreError`] when a statement fails.
///
/// # Examples
///
/// ```
/// use clickbus_core::SqliteStore;
/// use clickbus_data::seed_reference_data;
///
/// let store = SqliteStore::open_in_memory()?;
/// let first = seed_reference_data(&store, &["Ouro", "Prata"])?;
/// assert_eq!((first.states, first.clusters), (27, 2));
/// let second = seed_reference_data(&store, &["Ouro"])?;
/// assert_eq!((second.states, second.clusters), (0, 0));
/// # Ok::<(), clickbus_core::StoreError>(())
/// ```
pub fn seed_reference_data<S: AsRef<str>>(
    store: &SqliteStore,
    clusters: &[S],
) -> Result<SeedReport, StoreError> {
    let report = SeedReport {
        states: store.seed_states(&brazilian_states())?,
        clusters: store.seed_clusters(clusters)?,
    };
    info!(
        "seeded {} states and {} clusters",
        report.states, report.clusters
    );
    Ok(report)
}
