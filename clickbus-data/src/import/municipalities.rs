//! Municipality import pass.

use camino::Utf8Path;
use clickbus_core::{EntityUpsert, Municipality};
use log::{info, warn};

use super::ImportError;
use super::report::{ImportStep, MunicipalityImportReport, RowIssue, SkipReason, error_chain};
use crate::feed::{Feed, FeedRow, MunicipalityRecord};

/// Insert every municipality in `rows` that is not already stored.
///
/// Rows are keyed by IBGE code. A row whose state is unknown or whose
/// fields are invalid is recorded in the report and skipped.
pub fn import_municipalities<S, I>(store: &S, rows: I) -> MunicipalityImportReport
where
    S: EntityUpsert + ?Sized,
    I: IntoIterator<Item = FeedRow<MunicipalityRecord>>,
{
    let mut report = MunicipalityImportReport::default();
    for FeedRow { line, record } in rows {
        report.rows_read += 1;
        match import_row(store, record) {
            Ok(true) => report.inserted += 1,
            Ok(false) => {}
            Err((step, reason)) => {
                let issue = RowIssue { line, step, reason };
                warn!("{issue}");
                report.issues.push(issue);
            }
        }
    }
    info!(
        "municipality import: {} rows read, {} inserted, {} skipped",
        report.rows_read,
        report.inserted,
        report.issues.len()
    );
    report
}

/// Open the CSV at `path` and run [`import_municipalities`] over it.
///
/// # Errors
///
/// Returns [`ImportError::Feed`] when the file or its header cannot be read.
pub fn import_municipalities_from_path<S>(
    store: &S,
    path: &Utf8Path,
) -> Result<MunicipalityImportReport, ImportError>
where
    S: EntityUpsert + ?Sized,
{
    let feed = Feed::<MunicipalityRecord>::open(path)?;
    info!("importing municipalities from {path}");
    Ok(import_municipalities(store, feed))
}

fn import_row<S: EntityUpsert + ?Sized>(
    store: &S,
    decoded: Result<MunicipalityRecord, crate::feed::FeedError>,
) -> Result<bool, (ImportStep, SkipReason)> {
    let record = decoded.map_err(|err| {
        (
            ImportStep::Decode,
            SkipReason::Unreadable {
                message: error_chain(&err),
            },
        )
    })?;
    let municipality = Municipality::new(record.code, &record.name, &record.uf).map_err(|err| {
        (
            ImportStep::Municipality,
            SkipReason::InvalidField {
                message: err.to_string(),
            },
        )
    })?;
    store.upsert_municipality(&municipality).map_err(|err| {
        (
            ImportStep::Municipality,
            SkipReason::Store {
                message: error_chain(&err),
            },
        )
    })
}
