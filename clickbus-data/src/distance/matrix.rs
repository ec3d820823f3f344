//! Distance Matrix API response types.
//!
//! Only the fields the resolver reads are modelled; the service returns
//! more (durations, resolved addresses) which serde ignores.

use serde::Deserialize;

/// Top-level Distance Matrix response.
#[derive(Debug, Deserialize)]
pub struct MatrixResponse {
    /// Request status; `"OK"` on success, e.g. `"REQUEST_DENIED"` otherwise.
    pub status: String,

    /// Optional explanation accompanying a non-`OK` status.
    #[serde(default)]
    pub error_message: Option<String>,

    /// One row per origin.
    #[serde(default)]
    pub rows: Vec<MatrixRow>,
}

/// Results for a single origin.
#[derive(Debug, Deserialize)]
pub struct MatrixRow {
    /// One element per destination.
    #[serde(default)]
    pub elements: Vec<MatrixElement>,
}

/// Result for one origin/destination pair.
#[derive(Debug, Deserialize)]
pub struct MatrixElement {
    /// Element status; `"OK"`, `"NOT_FOUND"` or `"ZERO_RESULTS"`.
    pub status: String,

    /// Road distance; absent unless `status` is `"OK"`.
    #[serde(default)]
    pub distance: Option<MatrixValue>,
}

/// A measured quantity with its display text.
#[derive(Debug, Deserialize)]
pub struct MatrixValue {
    /// Value in base units (metres for distances).
    pub value: u64,

    /// Localised display text, e.g. `"12.3 km"`.
    #[serde(default)]
    pub text: String,
}

impl MatrixResponse {
    /// Check if the response indicates success.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status == "OK"
    }

    /// The element for the first origin and first destination.
    #[must_use]
    pub fn first_element(&self) -> Option<&MatrixElement> {
        self.rows.first()?.elements.first()
    }
}
