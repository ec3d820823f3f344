//! Facade crate for the ClickBus ingest pipeline.
//!
//! This crate re-exports the domain types and the SQLite store from
//! `clickbus-core`, and the CSV feeds, distance resolver and import passes
//! from `clickbus-data` behind the `import` feature (enabled by default).
//!
//! ```no_run
//! use clickbus::{SqliteStore, import_municipalities_from_path, seed_reference_data};
//! use camino::Utf8Path;
//!
//! let store = SqliteStore::open("clickbus.sqlite".as_ref())?;
//! seed_reference_data(&store, &["Ouro", "Prata"])?;
//! let report = import_municipalities_from_path(&store, Utf8Path::new("municipios.csv"))?;
//! println!("{} municipalities inserted", report.inserted);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![forbid(unsafe_code)]

pub use clickbus_core::{
    Carrier, CarrierId, ClusterId, ClusterMembership, Customer, CustomerId, CustomerKind,
    DistanceError, DistanceResolver, EntityError, EntityLookup, EntityUpsert, MembershipValues,
    Municipality, MunicipalityId, MunicipalitySummary, NewOrder, NewRoute, OrderId, PopularRoute,
    RouteId, SqliteStore, State, StateId, StoreError, TableCounts, metres_to_km,
};

#[cfg(feature = "test-support")]
pub use clickbus_core::test_support;

#[cfg(feature = "import")]
pub use clickbus_data::{
    EntityTally, Feed, FeedError, FeedRow, HttpDistanceResolver, HttpDistanceResolverConfig,
    ImportError, ImportStep, MunicipalityImportReport, MunicipalityRecord, OrderImportReport,
    OrderImporter, OrderRecord, ResolverBuildError, RowIssue, RowOutcome, SeedReport, SkipReason,
    distance_or_none, import_municipalities, import_municipalities_from_path, import_orders,
    import_orders_from_path, seed_reference_data,
};
