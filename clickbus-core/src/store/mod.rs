//! Persistence for the ClickBus relational schema.
//!
//! Two traits split the store contract along the lines the import pipeline
//! uses it:
//! - [`EntityUpsert`] writes entities keyed by their natural keys. Every
//!   entity except cluster memberships is insert-if-absent.
//! - [`EntityLookup`] resolves natural keys to surrogate identifiers so
//!   dependent rows can reference them.
//!
//! [`SqliteStore`] implements both on top of a single `rusqlite` connection.
//! Each call is its own implicit transaction; nothing spans several rows.

use crate::{
    Carrier, CarrierId, ClusterId, ClusterMembership, Customer, CustomerId, Municipality,
    MunicipalityId, NewOrder, NewRoute, OrderId, RouteId, State, StateId,
};

mod error;
mod queries;
mod schema;
mod sqlite;

pub use error::StoreError;
pub use queries::{MembershipValues, MunicipalitySummary, PopularRoute, TableCounts};
pub use schema::{SCHEMA_VERSION, initialise_schema};
pub use sqlite::SqliteStore;

/// Idempotent writes keyed by natural keys.
///
/// Methods return `true` when a new row was created. The flag feeds counters
/// only; callers must not branch on it to decide whether a row exists.
pub trait EntityUpsert {
    /// Insert a state unless its UF code is already present.
    fn upsert_state(&self, state: &State) -> Result<bool, StoreError>;

    /// Insert a municipality unless its IBGE code is already present.
    ///
    /// The owning state is resolved from the UF code; an unknown UF is an
    /// error.
    fn upsert_municipality(&self, municipality: &Municipality) -> Result<bool, StoreError>;

    /// Insert a customer unless its hash is already present.
    fn upsert_customer(&self, customer: &Customer) -> Result<bool, StoreError>;

    /// Insert a carrier unless its hash is already present.
    fn upsert_carrier(&self, carrier: &Carrier) -> Result<bool, StoreError>;

    /// Insert a cluster unless its name is already present.
    fn upsert_cluster(&self, name: &str) -> Result<bool, StoreError>;

    /// Insert a route and return its new identifier.
    ///
    /// Callers look the pair up first; inserting an existing pair fails.
    fn insert_route(&self, route: &NewRoute) -> Result<RouteId, StoreError>;

    /// Insert an order unless its hash is already present.
    fn insert_order(&self, order: &NewOrder) -> Result<bool, StoreError>;

    /// Insert a membership or overwrite the numeric attributes of an
    /// existing `(customer, cluster)` pair.
    fn upsert_membership(&self, membership: &ClusterMembership) -> Result<bool, StoreError>;
}

/// Natural-key to surrogate-id resolution.
///
/// Zero matches yield `Ok(None)`; several yield the lowest identifier.
pub trait EntityLookup {
    /// Resolve a state by UF code.
    fn find_state_id(&self, uf: &str) -> Result<Option<StateId>, StoreError>;

    /// Resolve a municipality by exact name and UF code.
    fn find_municipality_id(
        &self,
        name: &str,
        uf: &str,
    ) -> Result<Option<MunicipalityId>, StoreError>;

    /// Resolve a customer by hash.
    fn find_customer_id(&self, hash: &str) -> Result<Option<CustomerId>, StoreError>;

    /// Resolve a carrier by hash.
    fn find_carrier_id(&self, hash: &str) -> Result<Option<CarrierId>, StoreError>;

    /// Resolve a directed route by its endpoints.
    fn find_route_id(
        &self,
        origin: MunicipalityId,
        destination: MunicipalityId,
    ) -> Result<Option<RouteId>, StoreError>;

    /// Resolve an order by hash.
    fn find_order_id(&self, hash: &str) -> Result<Option<OrderId>, StoreError>;

    /// Resolve a cluster by name.
    fn find_cluster_id(&self, name: &str) -> Result<Option<ClusterId>, StoreError>;
}
