//! Data access and ingestion logic for the ClickBus pipeline.
//!
//! Responsibilities:
//! - Read municipality and order feeds from CSV files.
//! - Resolve road distances through an HTTP distance-matrix service.
//! - Drive the per-row import passes and report what they did.
//!
//! Boundaries:
//! - Do not encode domain rules (live in `clickbus-core`).
//! - Keep blocking HTTP behind the synchronous `DistanceResolver` seam.
//!
//! Invariants:
//! - One record is fully processed before the next begins.
//! - A bad row never aborts a pass; only an unreadable feed does.

#![forbid(unsafe_code)]

pub mod distance;
pub mod feed;
pub mod fs;
pub mod import;

pub use distance::{
    DEFAULT_BASE_URL, DEFAULT_USER_AGENT, HttpDistanceResolver, HttpDistanceResolverConfig,
    ResolverBuildError, distance_or_none,
};
pub use feed::{Feed, FeedError, FeedRow, FieldError, MunicipalityRecord, OrderRecord};
pub use import::{
    EntityTally, ImportError, ImportStep, MunicipalityImportReport, OrderImportReport,
    OrderImporter, RowIssue, RowOutcome, SeedReport, SkipReason, import_municipalities,
    import_municipalities_from_path, import_orders, import_orders_from_path,
    seed_reference_data,
};
