//! Core domain types for the ClickBus ingest pipeline.
//!
//! Entities are keyed by natural identifiers (hashes, IBGE codes, UF codes)
//! and reference each other through surrogate identifiers assigned by the
//! store. Constructors return `Result` so blank natural keys are rejected
//! before they reach the database.

#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub mod distance;
pub mod store;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use distance::{DistanceError, DistanceResolver, metres_to_km};
pub use store::{
    EntityLookup, EntityUpsert, MembershipValues, MunicipalitySummary, PopularRoute, SqliteStore,
    StoreError, TableCounts,
};

macro_rules! surrogate_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub i64);

        impl $name {
            /// Raw integer value assigned by the store.
            #[must_use]
            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

surrogate_id!(
    /// Store-assigned identifier of a [`State`].
    StateId
);
surrogate_id!(
    /// Store-assigned identifier of a [`Municipality`].
    MunicipalityId
);
surrogate_id!(
    /// Store-assigned identifier of a [`Customer`].
    CustomerId
);
surrogate_id!(
    /// Store-assigned identifier of a [`Carrier`].
    CarrierId
);
surrogate_id!(
    /// Store-assigned identifier of a route row.
    RouteId
);
surrogate_id!(
    /// Store-assigned identifier of an order row.
    OrderId
);
surrogate_id!(
    /// Store-assigned identifier of a loyalty cluster.
    ClusterId
);

/// Errors returned by the entity constructors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EntityError {
    /// The natural key was empty or only whitespace.
    #[error("{entity} requires a non-empty {key}")]
    EmptyKey {
        /// Entity being constructed.
        entity: &'static str,
        /// Name of the missing key component.
        key: &'static str,
    },
    /// A UF code was not two ASCII letters.
    #[error("invalid UF code {value:?}")]
    InvalidUf {
        /// Offending input.
        value: String,
    },
    /// An IBGE code was zero or negative.
    #[error("invalid IBGE code {value}")]
    InvalidIbgeCode {
        /// Offending input.
        value: i64,
    },
}

fn require_key(
    value: &str,
    entity: &'static str,
    key: &'static str,
) -> Result<String, EntityError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EntityError::EmptyKey { entity, key });
    }
    Ok(trimmed.to_owned())
}

fn normalise_uf(value: &str) -> Result<String, EntityError> {
    let trimmed = value.trim();
    if trimmed.len() == 2 && trimmed.chars().all(|ch| ch.is_ascii_alphabetic()) {
        Ok(trimmed.to_ascii_uppercase())
    } else {
        Err(EntityError::InvalidUf {
            value: value.to_owned(),
        })
    }
}

/// A Brazilian federative unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    /// Two-letter UF code, upper case.
    pub uf: String,
    /// Display name.
    pub name: String,
}

/// UF codes and names of the 27 Brazilian federative units.
pub const BRAZILIAN_STATES: [(&str, &str); 27] = [
    ("AC", "Acre"),
    ("AL", "Alagoas"),
    ("AP", "Amapá"),
    ("AM", "Amazonas"),
    ("BA", "Bahia"),
    ("CE", "Ceará"),
    ("DF", "Distrito Federal"),
    ("ES", "Espírito Santo"),
    ("GO", "Goiás"),
    ("MA", "Maranhão"),
    ("MT", "Mato Grosso"),
    ("MS", "Mato Grosso do Sul"),
    ("MG", "Minas Gerais"),
    ("PA", "Pará"),
    ("PB", "Paraíba"),
    ("PR", "Paraná"),
    ("PE", "Pernambuco"),
    ("PI", "Piauí"),
    ("RJ", "Rio de Janeiro"),
    ("RN", "Rio Grande do Norte"),
    ("RS", "Rio Grande do Sul"),
    ("RO", "Rondônia"),
    ("RR", "Roraima"),
    ("SC", "Santa Catarina"),
    ("SP", "São Paulo"),
    ("SE", "Sergipe"),
    ("TO", "Tocantins"),
];

/// Built-in state reference data.
///
/// # Examples
///
/// ```
/// use clickbus_core::brazilian_states;
///
/// let states = brazilian_states();
/// assert!(states.iter().any(|state| state.uf == "SP"));
/// ```
#[must_use]
pub fn brazilian_states() -> Vec<State> {
    BRAZILIAN_STATES
        .iter()
        .map(|(uf, name)| State {
            uf: (*uf).to_owned(),
            name: (*name).to_owned(),
        })
        .collect()
}

/// A municipality identified by its IBGE code.
///
/// The name is stored exactly as supplied: order rows must use the same
/// spelling for their origin and destination to resolve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Municipality {
    /// IBGE municipality code.
    pub ibge_code: i64,
    /// Display name.
    pub name: String,
    /// UF code of the owning state.
    pub uf: String,
    /// Optional latitude in decimal degrees.
    pub latitude: Option<f64>,
    /// Optional longitude in decimal degrees.
    pub longitude: Option<f64>,
}

impl Municipality {
    /// Validates and constructs a [`Municipality`] without coordinates.
    pub fn new(ibge_code: i64, name: &str, uf: &str) -> Result<Self, EntityError> {
        if ibge_code <= 0 {
            return Err(EntityError::InvalidIbgeCode { value: ibge_code });
        }
        Ok(Self {
            ibge_code,
            name: require_key(name, "municipality", "name")?,
            uf: normalise_uf(uf)?,
            latitude: None,
            longitude: None,
        })
    }

    /// Attach coordinates.
    #[must_use]
    pub fn with_coordinates(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = Some(latitude);
        self.longitude = Some(longitude);
        self
    }
}

/// Customer type tag as persisted in `tipo_cliente`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CustomerKind {
    /// Pessoa física.
    #[default]
    Individual,
    /// Pessoa jurídica.
    Organisation,
}

impl CustomerKind {
    /// Code stored in the database.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Individual => "PF",
            Self::Organisation => "PJ",
        }
    }
}

/// A customer known only by an opaque hash until enriched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    /// Opaque natural key.
    pub hash: String,
    /// Optional display name.
    pub name: Option<String>,
    /// Optional e-mail address.
    pub email: Option<String>,
    /// Individual or organisation.
    pub kind: CustomerKind,
}

impl Customer {
    /// Construct an individual customer with no contact details.
    pub fn new(hash: &str) -> Result<Self, EntityError> {
        Ok(Self {
            hash: require_key(hash, "customer", "hash")?,
            name: None,
            email: None,
            kind: CustomerKind::default(),
        })
    }
}

/// A bus operator (viação).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Carrier {
    /// Opaque natural key.
    pub hash: String,
    /// Optional display name.
    pub name: Option<String>,
}

impl Carrier {
    /// Construct a carrier with no display name.
    pub fn new(hash: &str) -> Result<Self, EntityError> {
        Ok(Self {
            hash: require_key(hash, "carrier", "hash")?,
            name: None,
        })
    }
}

/// A directed route between two stored municipalities, ready for insertion.
///
/// # Examples
///
/// ```
/// use clickbus_core::{MunicipalityId, NewRoute};
///
/// let route = NewRoute::between(
///     (MunicipalityId(1), "Rio de Janeiro"),
///     (MunicipalityId(2), "São Paulo"),
///     Some(429.4),
/// );
/// assert_eq!(route.name, "Rio de Janeiro - São Paulo");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRoute {
    /// Origin municipality.
    pub origin: MunicipalityId,
    /// Destination municipality.
    pub destination: MunicipalityId,
    /// Display name, `"origin - destination"`.
    pub name: String,
    /// Road distance in kilometres, when known.
    pub distance_km: Option<f64>,
}

impl NewRoute {
    /// Build a route from `(id, name)` endpoints, synthesising its name.
    #[must_use]
    pub fn between(
        origin: (MunicipalityId, &str),
        destination: (MunicipalityId, &str),
        distance_km: Option<f64>,
    ) -> Self {
        Self {
            origin: origin.0,
            destination: destination.0,
            name: format!("{} - {}", origin.1, destination.1),
            distance_km,
        }
    }
}

/// An order whose references have all been resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOrder {
    /// Opaque natural key.
    pub hash: String,
    /// Purchasing customer.
    pub customer: CustomerId,
    /// Operating carrier.
    pub carrier: CarrierId,
    /// Travelled route.
    pub route: RouteId,
    /// Purchase date as supplied by the feed.
    pub purchase_date: String,
    /// Purchase time as supplied by the feed.
    pub purchase_time: String,
    /// Total order value in reais.
    pub total_value: f64,
    /// Number of tickets purchased.
    pub ticket_count: u32,
    /// Value of a single ticket in reais.
    pub ticket_value: f64,
}

impl NewOrder {
    /// Per-ticket value, falling back to the total when absent or zero.
    #[must_use]
    pub fn ticket_value_or_total(ticket_value: Option<f64>, total_value: f64) -> f64 {
        match ticket_value {
            Some(value) if value != 0.0 => value,
            _ => total_value,
        }
    }
}

/// Loyalty classification of a customer within one cluster.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClusterMembership {
    /// Classified customer.
    pub customer: CustomerId,
    /// Cluster the customer belongs to.
    pub cluster: ClusterId,
    /// Loyalty points; overwritten on re-import.
    pub loyalty_points: f64,
    /// Monetary value in reais; overwritten on re-import.
    pub monetary_value: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("")]
    #[case("   ")]
    fn customer_rejects_blank_hash(#[case] hash: &str) {
        let err = Customer::new(hash).expect_err("blank hash should fail");
        assert_eq!(
            err,
            EntityError::EmptyKey {
                entity: "customer",
                key: "hash"
            }
        );
    }

    #[rstest]
    fn customer_defaults_to_individual() {
        let customer = Customer::new(" C1 ").expect("valid customer");
        assert_eq!(customer.hash, "C1");
        assert_eq!(customer.kind.code(), "PF");
    }

    #[rstest]
    #[case("S")]
    #[case("SPX")]
    #[case("1J")]
    fn municipality_rejects_malformed_uf(#[case] uf: &str) {
        let result = Municipality::new(3_550_308, "São Paulo", uf);
        assert!(matches!(result, Err(EntityError::InvalidUf { .. })));
    }

    #[rstest]
    fn municipality_rejects_non_positive_code() {
        let result = Municipality::new(0, "São Paulo", "SP");
        assert_eq!(result, Err(EntityError::InvalidIbgeCode { value: 0 }));
    }

    #[rstest]
    fn municipality_keeps_name_spelling() {
        let municipality = Municipality::new(3_304_557, "Rio de Janeiro", "rj")
            .expect("valid municipality")
            .with_coordinates(-22.9, -43.2);
        assert_eq!(municipality.name, "Rio de Janeiro");
        assert_eq!(municipality.uf, "RJ");
        assert_eq!(municipality.latitude, Some(-22.9));
    }

    #[rstest]
    #[case(None, 120.0, 120.0)]
    #[case(Some(0.0), 120.0, 120.0)]
    #[case(Some(60.0), 120.0, 60.0)]
    fn ticket_value_defaults_to_total(
        #[case] ticket: Option<f64>,
        #[case] total: f64,
        #[case] expected: f64,
    ) {
        assert_eq!(NewOrder::ticket_value_or_total(ticket, total), expected);
    }

    #[rstest]
    fn route_name_is_directional() {
        let forward = NewRoute::between((MunicipalityId(1), "A"), (MunicipalityId(2), "B"), None);
        let backward = NewRoute::between((MunicipalityId(2), "B"), (MunicipalityId(1), "A"), None);
        assert_eq!(forward.name, "A - B");
        assert_eq!(backward.name, "B - A");
        assert_ne!(forward, backward);
    }

    #[rstest]
    fn ships_all_federative_units() {
        let states = brazilian_states();
        assert_eq!(states.len(), 27);
        assert!(states.iter().any(|state| state.uf == "DF"));
    }
}
