//! HTTP distance lookups for route backfilling.
//!
//! [`HttpDistanceResolver`] implements [`clickbus_core::DistanceResolver`]
//! against the Distance Matrix JSON API. [`distance_or_none`] is the lenient
//! wrapper the importer uses: any failure is logged and becomes `None`.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use clickbus_data::distance::{
//!     HttpDistanceResolver, HttpDistanceResolverConfig, distance_or_none,
//! };
//!
//! let config = HttpDistanceResolverConfig::new("my-api-key")
//!     .with_timeout(Duration::from_secs(10))
//!     .with_user_agent("my-app/1.0");
//! let resolver = HttpDistanceResolver::with_config(config)?;
//!
//! if let Some(km) = distance_or_none(&resolver, "São Paulo, SP", "Campinas, SP") {
//!     println!("{km} km");
//! }
//! # Ok::<(), clickbus_data::distance::ResolverBuildError>(())
//! ```

mod matrix;
mod provider;

#[doc(hidden)]
pub mod test_support;

use clickbus_core::DistanceResolver;
use log::{debug, warn};

pub use provider::{
    DEFAULT_BASE_URL, DEFAULT_USER_AGENT, HttpDistanceResolver, HttpDistanceResolverConfig,
    ResolverBuildError,
};

/// Look up a distance, logging and discarding any failure.
pub fn distance_or_none<R: DistanceResolver + ?Sized>(
    resolver: &R,
    origin: &str,
    destination: &str,
) -> Option<f64> {
    match resolver.distance_km(origin, destination) {
        Ok(km) => {
            debug!("distance {origin} -> {destination}: {km} km");
            Some(km)
        }
        Err(err) => {
            warn!("distance lookup {origin} -> {destination} failed: {err}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::StubDistanceResolver;
    use super::*;
    use clickbus_core::DistanceError;
    use rstest::rstest;

    #[rstest]
    fn distance_or_none_passes_successes_through() {
        let stub = StubDistanceResolver::with_distance(12.35);

        assert_eq!(distance_or_none(&stub, "A, SP", "B, SP"), Some(12.35));
    }

    #[rstest]
    #[case(DistanceError::ServiceStatus { status: "OVER_QUERY_LIMIT".into(), message: String::new() })]
    #[case(DistanceError::ElementStatus { status: "NOT_FOUND".into() })]
    #[case(DistanceError::Timeout { url: "http://maps.example.com".into(), timeout_secs: 30 })]
    fn distance_or_none_absorbs_failures(#[case] error: DistanceError) {
        let stub = StubDistanceResolver::with_error(error);

        assert_eq!(distance_or_none(&stub, "A, SP", "B, SP"), None);
    }
}
