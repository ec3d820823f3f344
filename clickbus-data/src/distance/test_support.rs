//! Test utilities for distance resolvers.
//!
//! [`StubDistanceResolver`] is a deterministic test double for
//! [`DistanceResolver`] that returns a pre-configured answer and records the
//! places it was asked about.

use std::cell::RefCell;

use clickbus_core::{DistanceError, DistanceResolver};

/// Stub `DistanceResolver` for testing.
///
/// # Example
///
/// ```
/// use clickbus_core::DistanceResolver;
/// use clickbus_data::distance::test_support::StubDistanceResolver;
///
/// let resolver = StubDistanceResolver::with_distance(429.4);
/// assert_eq!(resolver.distance_km("Rio de Janeiro, RJ", "São Paulo, SP"), Ok(429.4));
/// assert_eq!(
///     resolver.calls(),
///     vec![("Rio de Janeiro, RJ".to_owned(), "São Paulo, SP".to_owned())]
/// );
/// ```
#[derive(Debug)]
pub struct StubDistanceResolver {
    response: Result<f64, DistanceError>,
    calls: RefCell<Vec<(String, String)>>,
}

impl StubDistanceResolver {
    /// Create a resolver that answers every request with `km`.
    #[must_use]
    pub fn with_distance(km: f64) -> Self {
        Self {
            response: Ok(km),
            calls: RefCell::new(Vec::new()),
        }
    }

    /// Create a resolver that fails every request with `error`.
    ///
    /// Blank input still returns [`DistanceError::EmptyInput`].
    #[must_use]
    pub fn with_error(error: DistanceError) -> Self {
        Self {
            response: Err(error),
            calls: RefCell::new(Vec::new()),
        }
    }

    /// Places requested so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.borrow().clone()
    }
}

impl DistanceResolver for StubDistanceResolver {
    fn distance_km(&self, origin: &str, destination: &str) -> Result<f64, DistanceError> {
        if origin.trim().is_empty() || destination.trim().is_empty() {
            return Err(DistanceError::EmptyInput);
        }
        self.calls
            .borrow_mut()
            .push((origin.to_owned(), destination.to_owned()));
        self.response.clone()
    }
}
