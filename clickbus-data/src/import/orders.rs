//! Order import pass.
//!
//! Every row runs the same five steps: customer, carrier, route, order and
//! (when the row names a cluster) membership. A step that cannot complete
//! records a [`RowIssue`] and the remaining steps still run; the order step
//! then finds its reference missing and skips.

use std::collections::HashMap;

use camino::Utf8Path;
use clickbus_core::{
    Carrier, ClusterMembership, Customer, DistanceResolver, EntityLookup, EntityUpsert,
    MunicipalityId, NewOrder, NewRoute, RouteId, StoreError,
};
use log::{debug, info, warn};

use super::ImportError;
use super::report::{
    EntityTally, ImportStep, OrderImportReport, RowIssue, SkipReason, error_chain,
};
use crate::distance::distance_or_none;
use crate::feed::{Feed, FeedError, FeedRow, FieldError, OrderRecord};

/// What happened to the order of one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    /// A new order was written.
    Inserted,
    /// An order with the same hash was already stored.
    AlreadyPresent,
    /// The order was not written.
    Skipped(SkipReason),
}

/// Stateful driver for one order import pass.
///
/// Holds the store, the optional distance resolver, a cache of routes seen
/// during the pass, and the running report.
pub struct OrderImporter<'a, S: ?Sized> {
    store: &'a S,
    resolver: Option<&'a dyn DistanceResolver>,
    routes: HashMap<(MunicipalityId, MunicipalityId), RouteId>,
    report: OrderImportReport,
}

impl<S: ?Sized> std::fmt::Debug for OrderImporter<'_, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderImporter")
            .field("resolves_distances", &self.resolver.is_some())
            .field("cached_routes", &self.routes.len())
            .field("report", &self.report)
            .finish_non_exhaustive()
    }
}

impl<'a, S> OrderImporter<'a, S>
where
    S: EntityUpsert + EntityLookup + ?Sized,
{
    /// Start a pass writing to `store`.
    #[must_use]
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            resolver: None,
            routes: HashMap::new(),
            report: OrderImportReport::default(),
        }
    }

    /// Backfill missing route distances through `resolver`.
    #[must_use]
    pub fn with_distance_resolver(mut self, resolver: &'a dyn DistanceResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// The report accumulated so far.
    #[must_use]
    pub const fn report(&self) -> &OrderImportReport {
        &self.report
    }

    /// Process one feed row, decoded or not.
    pub fn import_row(&mut self, row: FeedRow<OrderRecord>) -> RowOutcome {
        match row.record {
            Ok(record) => self.import_record(row.line, &record),
            Err(err) => self.record_unreadable(row.line, &err),
        }
    }

    /// Run every step for one decoded record.
    pub fn import_record(&mut self, line: u64, record: &OrderRecord) -> RowOutcome {
        self.report.rows_read += 1;
        debug!(
            "line {line}: order {:?} for customer {:?}",
            record.order_hash, record.customer_hash
        );
        self.upsert_customer(line, record);
        self.upsert_carrier(line, record);
        let route = self.resolve_route(line, record);
        let outcome = self.insert_order(line, record, route);
        if let Some(cluster) = record.membership_cluster() {
            self.upsert_membership(line, record, cluster);
        }
        outcome
    }

    /// Close the pass, logging and returning its report.
    #[must_use]
    pub fn finish(self) -> OrderImportReport {
        let report = self.report;
        info!(
            "order import: {} rows read; orders {} new of {}; customers {} new; carriers {} new; routes {} new; memberships {} new; {} issues",
            report.rows_read,
            report.orders.inserted,
            report.orders.attempted,
            report.customers.inserted,
            report.carriers.inserted,
            report.routes.inserted,
            report.memberships.inserted,
            report.issues.len()
        );
        report
    }

    fn record_unreadable(&mut self, line: u64, err: &FeedError) -> RowOutcome {
        self.report.rows_read += 1;
        let reason = SkipReason::Unreadable {
            message: error_chain(err),
        };
        self.push_issue(line, ImportStep::Decode, reason.clone());
        RowOutcome::Skipped(reason)
    }

    fn push_issue(&mut self, line: u64, step: ImportStep, reason: SkipReason) {
        let issue = RowIssue { line, step, reason };
        warn!("{issue}");
        self.report.issues.push(issue);
    }

    /// Record a failed step against `tally` and the issue list.
    fn fail(&mut self, line: u64, step: ImportStep, reason: SkipReason) {
        let tally = self.tally(step);
        match reason {
            SkipReason::MissingReference { .. }
            | SkipReason::MissingRoute
            | SkipReason::UnknownMunicipality { .. } => tally.skipped += 1,
            _ => tally.failed += 1,
        }
        self.push_issue(line, step, reason);
    }

    fn tally(&mut self, step: ImportStep) -> &mut EntityTally {
        match step {
            ImportStep::Customer => &mut self.report.customers,
            ImportStep::Carrier => &mut self.report.carriers,
            ImportStep::Route | ImportStep::Municipality => &mut self.report.routes,
            ImportStep::Membership => &mut self.report.memberships,
            ImportStep::Order | ImportStep::Decode => &mut self.report.orders,
        }
    }

    /// Tally the result of a store write.
    fn write(&mut self, line: u64, step: ImportStep, written: Result<bool, StoreError>) {
        match written {
            Ok(inserted) => {
                if inserted {
                    self.tally(step).inserted += 1;
                }
            }
            Err(err) => self.fail(line, step, store_reason(&err)),
        }
    }

    fn upsert_customer(&mut self, line: u64, record: &OrderRecord) {
        self.report.customers.attempted += 1;
        match Customer::new(&record.customer_hash) {
            Ok(customer) => {
                let written = self.store.upsert_customer(&customer);
                self.write(line, ImportStep::Customer, written);
            }
            Err(err) => self.fail(line, ImportStep::Customer, invalid(&err)),
        }
    }

    fn upsert_carrier(&mut self, line: u64, record: &OrderRecord) {
        self.report.carriers.attempted += 1;
        match Carrier::new(&record.carrier_hash) {
            Ok(carrier) => {
                let written = self.store.upsert_carrier(&carrier);
                self.write(line, ImportStep::Carrier, written);
            }
            Err(err) => self.fail(line, ImportStep::Carrier, invalid(&err)),
        }
    }

    fn resolve_route(&mut self, line: u64, record: &OrderRecord) -> Option<RouteId> {
        self.report.routes.attempted += 1;
        match self.find_or_create_route(record) {
            Ok(route) => Some(route),
            Err(reason) => {
                self.fail(line, ImportStep::Route, reason);
                None
            }
        }
    }

    fn find_or_create_route(&mut self, record: &OrderRecord) -> Result<RouteId, SkipReason> {
        let origin = self.municipality(&record.origin, &record.origin_uf)?;
        let destination = self.municipality(&record.destination, &record.destination_uf)?;
        if let Some(route) = self.routes.get(&(origin, destination)) {
            return Ok(*route);
        }
        let existing = self
            .store
            .find_route_id(origin, destination)
            .map_err(|err| store_reason(&err))?;
        if let Some(route) = existing {
            self.routes.insert((origin, destination), route);
            return Ok(route);
        }

        let distance = match record.distance().map_err(|err| invalid(&err))? {
            Some(km) => Some(km),
            None => self.resolver.and_then(|resolver| {
                distance_or_none(
                    resolver,
                    &record.origin_place(),
                    &record.destination_place(),
                )
            }),
        };
        let route = NewRoute::between(
            (origin, record.origin.trim()),
            (destination, record.destination.trim()),
            distance,
        );
        let id = self
            .store
            .insert_route(&route)
            .map_err(|err| store_reason(&err))?;
        self.report.routes.inserted += 1;
        self.routes.insert((origin, destination), id);
        debug!("created route {:?} as {id}", route.name);
        Ok(id)
    }

    fn municipality(&self, raw_name: &str, raw_uf: &str) -> Result<MunicipalityId, SkipReason> {
        let (name, uf) = (raw_name.trim(), raw_uf.trim());
        self.store
            .find_municipality_id(name, uf)
            .map_err(|err| store_reason(&err))?
            .ok_or_else(|| SkipReason::UnknownMunicipality {
                name: name.to_owned(),
                uf: uf.to_owned(),
            })
    }

    fn insert_order(
        &mut self,
        line: u64,
        record: &OrderRecord,
        route: Option<RouteId>,
    ) -> RowOutcome {
        self.report.orders.attempted += 1;
        let written = self
            .build_order(record, route)
            .and_then(|order| self.store.insert_order(&order).map_err(|err| store_reason(&err)));
        match written {
            Ok(true) => {
                self.report.orders.inserted += 1;
                RowOutcome::Inserted
            }
            Ok(false) => RowOutcome::AlreadyPresent,
            Err(reason) => {
                self.fail(line, ImportStep::Order, reason.clone());
                RowOutcome::Skipped(reason)
            }
        }
    }

    fn build_order(
        &self,
        record: &OrderRecord,
        resolved_route: Option<RouteId>,
    ) -> Result<NewOrder, SkipReason> {
        let route = resolved_route.ok_or(SkipReason::MissingRoute)?;
        let customer = self
            .store
            .find_customer_id(record.customer_hash.trim())
            .map_err(|err| store_reason(&err))?
            .ok_or_else(|| missing("customer", &record.customer_hash))?;
        let carrier = self
            .store
            .find_carrier_id(record.carrier_hash.trim())
            .map_err(|err| store_reason(&err))?
            .ok_or_else(|| missing("carrier", &record.carrier_hash))?;

        let hash = record.order_hash.trim();
        if hash.is_empty() {
            return Err(SkipReason::InvalidField {
                message: "order requires a non-empty hash".to_owned(),
            });
        }
        let total_value = record.total().map_err(|err| invalid(&err))?;
        let ticket_count = record.tickets().map_err(|err| invalid(&err))?;
        let ticket_value = record.ticket().map_err(|err| invalid(&err))?;

        Ok(NewOrder {
            hash: hash.to_owned(),
            customer,
            carrier,
            route,
            purchase_date: record.purchase_date.trim().to_owned(),
            purchase_time: record.purchase_time.trim().to_owned(),
            total_value,
            ticket_count,
            ticket_value: NewOrder::ticket_value_or_total(ticket_value, total_value),
        })
    }

    fn upsert_membership(&mut self, line: u64, record: &OrderRecord, cluster_name: &str) {
        self.report.memberships.attempted += 1;
        match self.build_membership(record, cluster_name) {
            Ok(membership) => {
                let written = self.store.upsert_membership(&membership);
                self.write(line, ImportStep::Membership, written);
            }
            Err(reason) => self.fail(line, ImportStep::Membership, reason),
        }
    }

    fn build_membership(
        &self,
        record: &OrderRecord,
        cluster_name: &str,
    ) -> Result<ClusterMembership, SkipReason> {
        let customer = self
            .store
            .find_customer_id(record.customer_hash.trim())
            .map_err(|err| store_reason(&err))?
            .ok_or_else(|| missing("customer", &record.customer_hash))?;
        let cluster = self
            .store
            .find_cluster_id(cluster_name)
            .map_err(|err| store_reason(&err))?
            .ok_or_else(|| missing("cluster", cluster_name))?;
        Ok(ClusterMembership {
            customer,
            cluster,
            loyalty_points: record.points().map_err(|err| invalid(&err))?,
            monetary_value: record.reais().map_err(|err| invalid(&err))?,
        })
    }
}

fn store_reason(err: &StoreError) -> SkipReason {
    SkipReason::Store {
        message: error_chain(err),
    }
}

fn invalid(err: &dyn std::error::Error) -> SkipReason {
    SkipReason::InvalidField {
        message: err.to_string(),
    }
}

fn missing(entity: &'static str, key: &str) -> SkipReason {
    SkipReason::MissingReference {
        entity,
        key: key.trim().to_owned(),
    }
}

/// Run one order import pass over `rows`.
///
/// When `resolver` is given, routes created without a distance ask it for
/// one first; failed lookups leave the distance empty.
pub fn import_orders<S, I>(
    store: &S,
    rows: I,
    resolver: Option<&dyn DistanceResolver>,
) -> OrderImportReport
where
    S: EntityUpsert + EntityLookup + ?Sized,
    I: IntoIterator<Item = FeedRow<OrderRecord>>,
{
    let mut importer = OrderImporter::new(store);
    if let Some(resolver) = resolver {
        importer = importer.with_distance_resolver(resolver);
    }
    for row in rows {
        importer.import_row(row);
    }
    importer.finish()
}

/// Open the CSV at `path` and run [`import_orders`] over it.
///
/// # Errors
///
/// Returns [`ImportError::Feed`] when the file or its header cannot be read.
pub fn import_orders_from_path<S>(
    store: &S,
    path: &Utf8Path,
    resolver: Option<&dyn DistanceResolver>,
) -> Result<OrderImportReport, ImportError>
where
    S: EntityUpsert + EntityLookup + ?Sized,
{
    let feed = Feed::<OrderRecord>::open(path)?;
    info!("importing orders from {path}");
    Ok(import_orders(store, feed, resolver))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::test_support::StubDistanceResolver;
    use clickbus_core::{DistanceError, SqliteStore, test_support::seeded_store};
    use rstest::{fixture, rstest};

    #[fixture]
    fn store() -> SqliteStore {
        seeded_store().expect("seeded store")
    }

    #[fixture]
    fn record() -> OrderRecord {
        OrderRecord {
            customer_hash: "C1".into(),
            carrier_hash: "V1".into(),
            origin: "Rio de Janeiro".into(),
            destination: "São Paulo".into(),
            origin_uf: "RJ".into(),
            destination_uf: "SP".into(),
            distance_km: "429.4".into(),
            order_hash: "P1".into(),
            purchase_date: "2023-01-15".into(),
            purchase_time: "10:30:00".into(),
            total_value: "150.0".into(),
            ticket_count: "1".into(),
            ..OrderRecord::default()
        }
    }

    #[rstest]
    fn first_import_creates_every_entity(store: SqliteStore, record: OrderRecord) {
        let mut importer = OrderImporter::new(&store);

        assert_eq!(importer.import_record(2, &record), RowOutcome::Inserted);
        let report = importer.finish();

        assert_eq!(report.customers.inserted, 1);
        assert_eq!(report.carriers.inserted, 1);
        assert_eq!(report.routes.inserted, 1);
        assert_eq!(report.orders.inserted, 1);
        assert!(report.issues.is_empty());
        let counts = store.table_counts().expect("counts");
        assert_eq!((counts.routes, counts.orders), (1, 1));
    }

    #[rstest]
    fn repeated_rows_reuse_the_cached_route(store: SqliteStore, record: OrderRecord) {
        let mut importer = OrderImporter::new(&store);
        let mut second = record.clone();
        second.order_hash = "P2".into();

        importer.import_record(2, &record);
        assert_eq!(importer.import_record(3, &second), RowOutcome::Inserted);
        let report = importer.finish();

        assert_eq!(report.routes.attempted, 2);
        assert_eq!(report.routes.inserted, 1);
        assert_eq!(report.orders.inserted, 2);
    }

    #[rstest]
    fn unknown_municipality_skips_route_and_order(store: SqliteStore, mut record: OrderRecord) {
        record.origin = "Atlantis".into();
        let mut importer = OrderImporter::new(&store);

        let outcome = importer.import_record(4, &record);
        let report = importer.finish();

        assert_eq!(outcome, RowOutcome::Skipped(SkipReason::MissingRoute));
        assert_eq!(report.customers.inserted, 1);
        assert_eq!(report.routes.skipped, 1);
        assert_eq!(report.orders.skipped, 1);
        assert_eq!(
            report.issues[0],
            RowIssue {
                line: 4,
                step: ImportStep::Route,
                reason: SkipReason::UnknownMunicipality {
                    name: "Atlantis".into(),
                    uf: "RJ".into()
                },
            }
        );
        assert_eq!(store.table_counts().expect("counts").orders, 0);
    }

    #[rstest]
    fn blank_customer_skips_the_order(store: SqliteStore, mut record: OrderRecord) {
        record.customer_hash = "  ".into();
        let mut importer = OrderImporter::new(&store);

        let outcome = importer.import_record(2, &record);
        let report = importer.finish();

        assert_eq!(
            outcome,
            RowOutcome::Skipped(SkipReason::MissingReference {
                entity: "customer",
                key: String::new()
            })
        );
        assert_eq!(report.customers.failed, 1);
        assert_eq!(report.routes.inserted, 1);
    }

    #[rstest]
    #[case::total("valor_total_compra")]
    #[case::tickets("qtd_passagens")]
    fn malformed_numbers_fail_the_order(
        store: SqliteStore,
        mut record: OrderRecord,
        #[case] column: &str,
    ) {
        match column {
            "valor_total_compra" => record.total_value = "lots".into(),
            _ => record.ticket_count = "two".into(),
        }
        let mut importer = OrderImporter::new(&store);

        let outcome = importer.import_record(2, &record);

        assert!(matches!(
            outcome,
            RowOutcome::Skipped(SkipReason::InvalidField { ref message }) if message.contains(column)
        ));
        assert_eq!(importer.report().orders.failed, 1);
    }

    #[rstest]
    fn resolver_fills_missing_distance(store: SqliteStore, mut record: OrderRecord) {
        record.distance_km = String::new();
        let resolver = StubDistanceResolver::with_distance(429.4);
        let mut importer = OrderImporter::new(&store).with_distance_resolver(&resolver);

        importer.import_record(2, &record);

        assert_eq!(
            resolver.calls(),
            vec![("Rio de Janeiro, RJ".to_owned(), "São Paulo, SP".to_owned())]
        );
        let routes = store.popular_routes(5).expect("routes");
        assert_eq!(routes[0].distance_km, Some(429.4));
    }

    #[rstest]
    fn failed_lookup_still_creates_the_route(store: SqliteStore, mut record: OrderRecord) {
        record.distance_km = String::new();
        let resolver = StubDistanceResolver::with_error(DistanceError::ElementStatus {
            status: "NOT_FOUND".into(),
        });
        let report = import_orders(
            &store,
            [FeedRow {
                line: 2,
                record: Ok(record),
            }],
            Some(&resolver),
        );

        assert_eq!(report.routes.inserted, 1);
        assert_eq!(report.orders.inserted, 1);
        let routes = store.popular_routes(5).expect("routes");
        assert_eq!(routes[0].distance_km, None);
    }

    #[rstest]
    fn recorded_distance_skips_the_resolver(store: SqliteStore, record: OrderRecord) {
        let resolver = StubDistanceResolver::with_distance(1.0);
        let mut importer = OrderImporter::new(&store).with_distance_resolver(&resolver);

        importer.import_record(2, &record);

        assert!(resolver.calls().is_empty());
    }

    #[rstest]
    fn membership_is_written_then_overwritten(store: SqliteStore, mut record: OrderRecord) {
        record.cluster_tag = "1".into();
        record.cluster_name = "Ouro".into();
        record.loyalty_points = "10".into();
        let mut importer = OrderImporter::new(&store);
        importer.import_record(2, &record);

        record.order_hash = "P2".into();
        record.loyalty_points = "25.5".into();
        record.monetary_value = "99.9".into();
        importer.import_record(3, &record);
        let report = importer.finish();

        assert_eq!(report.memberships.attempted, 2);
        assert_eq!(report.memberships.inserted, 1);
        assert_eq!(store.table_counts().expect("counts").memberships, 1);
    }

    #[rstest]
    fn unknown_cluster_skips_membership_only(store: SqliteStore, mut record: OrderRecord) {
        record.cluster_tag = "1".into();
        record.cluster_name = "Diamante".into();
        let mut importer = OrderImporter::new(&store);

        assert_eq!(importer.import_record(2, &record), RowOutcome::Inserted);
        let report = importer.finish();

        assert_eq!(report.memberships.skipped, 1);
        assert_eq!(
            report.issues[0].reason,
            SkipReason::MissingReference {
                entity: "cluster",
                key: "Diamante".into()
            }
        );
    }

    #[rstest]
    fn unreadable_rows_are_counted(store: SqliteStore) {
        let rows: Vec<_> = Feed::<OrderRecord, &[u8]>::from_reader(
            "id_cliente,viacao\nC1,V1\n".as_bytes(),
            "inline",
        )
        .expect("headers parse")
        .collect();
        let mut importer = OrderImporter::new(&store);
        importer.import_row(FeedRow {
            line: 9,
            record: Err(FeedError::Decode {
                line: 9,
                source: csv::Error::from(std::io::Error::other("bad bytes")),
            }),
        });
        for row in rows {
            importer.import_row(row);
        }
        let report = importer.finish();

        assert_eq!(report.rows_read, 2);
        assert_eq!(report.issues[0].step, ImportStep::Decode);
        assert_eq!(report.orders.inserted, 0);
    }
}
