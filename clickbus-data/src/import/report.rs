//! Batch reports returned by the import passes.

use std::fmt;

use serde::Serialize;

/// Per-entity counters for one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EntityTally {
    /// Rows that reached this step.
    pub attempted: usize,
    /// New rows written.
    pub inserted: usize,
    /// Rows not written because a reference was missing.
    pub skipped: usize,
    /// Rows not written because of invalid data or a store error.
    pub failed: usize,
}

impl EntityTally {
    /// Rows that reached the step and were already present.
    #[must_use]
    pub const fn existing(&self) -> usize {
        self.attempted
            .saturating_sub(self.inserted + self.skipped + self.failed)
    }
}

/// The step of the row pipeline at which an issue occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportStep {
    /// The CSV record itself.
    Decode,
    /// Municipality insert.
    Municipality,
    /// Customer upsert.
    Customer,
    /// Carrier upsert.
    Carrier,
    /// Route lookup or insert.
    Route,
    /// Order insert.
    Order,
    /// Cluster membership upsert.
    Membership,
}

impl fmt::Display for ImportStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Decode => "decode",
            Self::Municipality => "municipality",
            Self::Customer => "customer",
            Self::Carrier => "carrier",
            Self::Route => "route",
            Self::Order => "order",
            Self::Membership => "membership",
        };
        f.write_str(name)
    }
}

/// Why a step did not write its row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    /// The record could not be read or decoded.
    Unreadable {
        /// Reader message.
        message: String,
    },
    /// A field or natural key was malformed.
    InvalidField {
        /// Validation message.
        message: String,
    },
    /// A municipality named by the record is not in the store.
    UnknownMunicipality {
        /// Municipality name as given.
        name: String,
        /// State code as given.
        uf: String,
    },
    /// A referenced entity could not be resolved.
    MissingReference {
        /// Entity kind, e.g. `"customer"`.
        entity: &'static str,
        /// Natural key that was looked up.
        key: String,
    },
    /// The row has no route, so the order cannot be written.
    MissingRoute,
    /// The store rejected a statement.
    Store {
        /// Store error chain.
        message: String,
    },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unreadable { message } => write!(f, "unreadable record: {message}"),
            Self::InvalidField { message } => write!(f, "invalid field: {message}"),
            Self::UnknownMunicipality { name, uf } => {
                write!(f, "unknown municipality {name:?} ({uf})")
            }
            Self::MissingReference { entity, key } => write!(f, "unknown {entity} {key:?}"),
            Self::MissingRoute => f.write_str("route unavailable"),
            Self::Store { message } => write!(f, "store error: {message}"),
        }
    }
}

/// One skipped step of one row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowIssue {
    /// 1-based line number in the feed.
    pub line: u64,
    /// Step that did not complete.
    pub step: ImportStep,
    /// What went wrong.
    pub reason: SkipReason,
}

impl fmt::Display for RowIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {} skipped: {}", self.line, self.step, self.reason)
    }
}

/// Result of a municipality import pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MunicipalityImportReport {
    /// Data lines read from the feed.
    pub rows_read: usize,
    /// Municipalities newly inserted.
    pub inserted: usize,
    /// Rows that could not be imported.
    pub issues: Vec<RowIssue>,
}

/// Result of an order import pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OrderImportReport {
    /// Data lines read from the feed, including undecodable ones.
    pub rows_read: usize,
    /// Customer upserts.
    pub customers: EntityTally,
    /// Carrier upserts.
    pub carriers: EntityTally,
    /// Route resolutions and inserts.
    pub routes: EntityTally,
    /// Order inserts.
    pub orders: EntityTally,
    /// Cluster membership upserts.
    pub memberships: EntityTally,
    /// Every skipped step, in feed order.
    pub issues: Vec<RowIssue>,
}

pub(crate) fn error_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
