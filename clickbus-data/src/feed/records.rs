//! Record shapes of the two CSV feeds and their field parsers.

use serde::Deserialize;
use thiserror::Error;

/// A field held text that does not parse as the column's type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("column {column} holds {value:?}, expected {expected}")]
pub struct FieldError {
    /// Column name as it appears in the feed.
    pub column: &'static str,
    /// Offending text.
    pub value: String,
    /// Human-readable description of the accepted values.
    pub expected: &'static str,
}

impl FieldError {
    fn new(column: &'static str, value: &str, expected: &'static str) -> Self {
        Self {
            column,
            value: value.to_owned(),
            expected,
        }
    }
}

/// One line of the municipality feed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MunicipalityRecord {
    /// IBGE code.
    #[serde(rename = "COD")]
    pub code: i64,
    /// Municipality name.
    #[serde(rename = "NOME")]
    pub name: String,
    /// Two-letter state code.
    #[serde(rename = "UF")]
    pub uf: String,
}

/// One line of the order feed.
///
/// Every column is kept as text; typed accessors parse on demand so a bad
/// value only affects the step that needs it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OrderRecord {
    /// Customer hash.
    #[serde(rename = "id_cliente")]
    pub customer_hash: String,
    /// Carrier hash.
    #[serde(rename = "viacao")]
    pub carrier_hash: String,
    /// Origin municipality name.
    #[serde(rename = "origem")]
    pub origin: String,
    /// Destination municipality name.
    #[serde(rename = "destino")]
    pub destination: String,
    /// Origin state code.
    #[serde(rename = "uf_origem")]
    pub origin_uf: String,
    /// Destination state code.
    #[serde(rename = "uf_destino")]
    pub destination_uf: String,
    /// Road distance in kilometres, possibly empty.
    #[serde(rename = "distancia_km")]
    pub distance_km: String,
    /// Order hash.
    #[serde(rename = "id_pedido")]
    pub order_hash: String,
    /// Purchase date.
    #[serde(rename = "date_purchase")]
    pub purchase_date: String,
    /// Purchase time.
    #[serde(rename = "time_purchase")]
    pub purchase_time: String,
    /// Total order value.
    #[serde(rename = "valor_total_compra")]
    pub total_value: String,
    /// Number of tickets.
    #[serde(rename = "qtd_passagens")]
    pub ticket_count: String,
    /// Value of one ticket, possibly empty.
    #[serde(rename = "valor_passagem")]
    pub ticket_value: String,
    /// Cluster tag; membership is only written when this is non-empty.
    #[serde(rename = "cluster")]
    pub cluster_tag: String,
    /// Cluster name.
    #[serde(rename = "nome_cluster")]
    pub cluster_name: String,
    /// Loyalty points.
    #[serde(rename = "pontos")]
    pub loyalty_points: String,
    /// Monetary value in reais.
    #[serde(rename = "reais")]
    pub monetary_value: String,
}

impl OrderRecord {
    /// Free-text origin for the distance service, `"name, UF"`.
    #[must_use]
    pub fn origin_place(&self) -> String {
        format!("{}, {}", self.origin.trim(), self.origin_uf.trim())
    }

    /// Free-text destination for the distance service, `"name, UF"`.
    #[must_use]
    pub fn destination_place(&self) -> String {
        format!("{}, {}", self.destination.trim(), self.destination_uf.trim())
    }

    /// Parsed route distance; empty means unknown.
    pub fn distance(&self) -> Result<Option<f64>, FieldError> {
        optional_decimal("distancia_km", &self.distance_km)
    }

    /// Parsed total value; required.
    pub fn total(&self) -> Result<f64, FieldError> {
        optional_decimal("valor_total_compra", &self.total_value)?
            .ok_or_else(|| FieldError::new("valor_total_compra", "", "a decimal number"))
    }

    /// Parsed ticket count; required. Integral decimals such as `2.0` are
    /// accepted.
    pub fn tickets(&self) -> Result<u32, FieldError> {
        const EXPECTED: &str = "a non-negative whole number";
        let raw = self.ticket_count.trim();
        let invalid = || FieldError::new("qtd_passagens", raw, EXPECTED);
        let whole = match raw.split_once('.') {
            Some((whole, fraction)) if fraction.bytes().all(|digit| digit == b'0') => whole,
            Some(_) => return Err(invalid()),
            None => raw,
        };
        let count = whole.parse::<u64>().map_err(|_| invalid())?;
        u32::try_from(count).map_err(|_| invalid())
    }

    /// Parsed per-ticket value; empty means "use the total".
    pub fn ticket(&self) -> Result<Option<f64>, FieldError> {
        optional_decimal("valor_passagem", &self.ticket_value)
    }

    /// Cluster name when both the tag and the name are present.
    #[must_use]
    pub fn membership_cluster(&self) -> Option<&str> {
        let name = self.cluster_name.trim();
        (!self.cluster_tag.trim().is_empty() && !name.is_empty()).then_some(name)
    }

    /// Loyalty points, defaulting to zero.
    pub fn points(&self) -> Result<f64, FieldError> {
        Ok(optional_decimal("pontos", &self.loyalty_points)?.unwrap_or(0.0))
    }

    /// Monetary value, defaulting to zero.
    pub fn reais(&self) -> Result<f64, FieldError> {
        Ok(optional_decimal("reais", &self.monetary_value)?.unwrap_or(0.0))
    }
}

fn optional_decimal(column: &'static str, raw: &str) -> Result<Option<f64>, FieldError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .map(Some)
        .ok_or_else(|| FieldError::new(column, trimmed, "a decimal number"))
}
