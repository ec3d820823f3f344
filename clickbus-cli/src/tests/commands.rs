//! Command execution against temporary databases and feeds.

use super::helpers::{MUNICIPALITY_FEED, Workspace, write_utf8};
use super::*;
use crate::distance::{DistanceConfig, MapsConfig, execute_distance};
use crate::import::{
    MunicipalitiesConfig, OrdersConfig, execute_municipalities, execute_orders,
};
use crate::routes::{RoutesConfig, execute_routes};
use crate::seed::{SeedConfig, execute_seed};
use clickbus_core::DistanceError;
use clickbus_data::distance::test_support::StubDistanceResolver;
use rstest::{fixture, rstest};

const RIO_TO_SAO_PAULO: &str =
    "C1,V1,Rio de Janeiro,São Paulo,RJ,SP,429.4,P1,2023-01-15,10:30:00,150.0,1,,1,Ouro,10,150";
const SAO_PAULO_TO_CAMPINAS: &str =
    "C2,V1,São Paulo,Campinas,SP,SP,,P2,2023-02-01,08:00:00,40.0,2,20.0,,,,";

#[fixture]
fn workspace() -> Workspace {
    Workspace::new()
}

#[rstest]
fn seeding_creates_the_database_directory(workspace: Workspace) {
    let config = SeedConfig {
        database: workspace.database(),
        clusters: vec!["Ouro".to_owned()],
    };

    let first = execute_seed(&config).expect("first seed");
    let second = execute_seed(&config).expect("second seed");

    assert_eq!((first.inserted.states, first.inserted.clusters), (27, 1));
    assert_eq!((second.inserted.states, second.inserted.clusters), (0, 0));
    assert_eq!(second.totals.states, 27);
    assert!(workspace.database().is_file());
}

#[rstest]
fn municipality_import_reports_through_the_cli(workspace: Workspace) {
    let feed = workspace.path("municipios.csv");
    write_utf8(&feed, MUNICIPALITY_FEED.as_bytes());
    execute_seed(&SeedConfig {
        database: workspace.database(),
        clusters: Vec::new(),
    })
    .expect("seed");
    let config = MunicipalitiesConfig {
        feed,
        database: workspace.database(),
    };

    let report = execute_municipalities(&config).expect("import");

    assert_eq!((report.rows_read, report.inserted), (3, 3));
}

#[rstest]
fn order_import_then_route_listing(workspace: Workspace) {
    workspace.seed();
    let feed = workspace.write_orders("orders.csv", &[RIO_TO_SAO_PAULO, SAO_PAULO_TO_CAMPINAS]);
    let config = OrdersConfig {
        feed,
        database: workspace.database(),
        maps: None,
    };

    let report = execute_orders(&config).expect("import");

    assert_eq!(report.rows_read, 2);
    assert_eq!(report.orders.inserted, 2);
    assert_eq!(report.routes.inserted, 2);
    assert_eq!(report.memberships.inserted, 1);
    assert!(report.issues.is_empty(), "unexpected issues: {:?}", report.issues);

    let routes = execute_routes(&RoutesConfig {
        database: workspace.database(),
        limit: 1,
    })
    .expect("routes");
    assert_eq!(routes.len(), 1);
    assert_eq!(routes[0].order_count, 1);
}

#[rstest]
fn missing_feed_is_reported_before_opening_the_database(workspace: Workspace) {
    let config = OrdersConfig {
        feed: workspace.path("absent.csv"),
        database: workspace.database(),
        maps: None,
    };

    match execute_orders(&config) {
        Err(CliError::MissingSourceFile { field, .. }) => assert_eq!(field, ARG_FEED),
        other => panic!("expected MissingSourceFile, found {other:?}"),
    }
    assert!(!workspace.database().exists());
}

#[rstest]
fn listing_routes_requires_an_existing_database(workspace: Workspace) {
    let config = RoutesConfig {
        database: workspace.database(),
        limit: 5,
    };

    match execute_routes(&config) {
        Err(CliError::MissingSourceFile { field, .. }) => assert_eq!(field, ARG_DATABASE),
        other => panic!("expected MissingSourceFile, found {other:?}"),
    }
}

fn distance_config() -> DistanceConfig {
    DistanceConfig {
        origin: "São Paulo, SP".to_owned(),
        destination: "Campinas, SP".to_owned(),
        maps: MapsConfig::from_parts(Some("k".to_owned()), None, ENV_DISTANCE_MAPS_API_KEY)
            .expect("maps config"),
    }
}

#[rstest]
fn distance_reports_kilometres() {
    let resolver = StubDistanceResolver::with_distance(12.35);

    let summary = execute_distance(&distance_config(), &resolver).expect("distance");

    assert_eq!(summary.distance_km, 12.35);
    assert_eq!(
        resolver.calls(),
        vec![("São Paulo, SP".to_owned(), "Campinas, SP".to_owned())]
    );
}

#[rstest]
fn distance_failures_are_fatal_for_the_command() {
    let resolver = StubDistanceResolver::with_error(DistanceError::ServiceStatus {
        status: "REQUEST_DENIED".to_owned(),
        message: "bad key".to_owned(),
    });

    match execute_distance(&distance_config(), &resolver) {
        Err(CliError::Distance { source, .. }) => {
            assert!(matches!(source, DistanceError::ServiceStatus { .. }));
        }
        other => panic!("expected a distance error, found {other:?}"),
    }
}

#[rstest]
fn seed_output_is_json(workspace: Workspace) {
    let args = crate::seed::SeedArgs {
        database: Some(workspace.database()),
        clusters: None,
    };
    let config = SeedConfig::try_from(args).expect("config");
    let summary = execute_seed(&config).expect("seed");
    let mut buffer = Vec::new();

    write_json(&mut buffer, &summary).expect("write");

    let value: serde_json::Value = serde_json::from_slice(&buffer).expect("valid JSON");
    assert_eq!(value["inserted"]["states"], 27);
    assert_eq!(value["totals"]["municipalities"], 0);
}
