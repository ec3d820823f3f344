//! Road distances between free-text places.
//!
//! The [`DistanceResolver`] trait abstracts the external distance-matrix
//! service so the import pipeline can run against a stub in tests and an
//! HTTP client in production.

mod error;

pub use error::DistanceError;

/// Resolve the road distance between two places.
///
/// Places are free text such as `"Campinas, SP"`; the service decides how to
/// geocode them.
///
/// # Examples
///
/// ```
/// use clickbus_core::{DistanceError, DistanceResolver, metres_to_km};
///
/// struct FixedResolver;
///
/// impl DistanceResolver for FixedResolver {
///     fn distance_km(&self, origin: &str, destination: &str) -> Result<f64, DistanceError> {
///         if origin.trim().is_empty() || destination.trim().is_empty() {
///             return Err(DistanceError::EmptyInput);
///         }
///         Ok(metres_to_km(12_345))
///     }
/// }
///
/// assert_eq!(FixedResolver.distance_km("A", "B")?, 12.35);
/// # Ok::<(), DistanceError>(())
/// ```
pub trait DistanceResolver {
    /// Return the distance from `origin` to `destination` in kilometres.
    fn distance_km(&self, origin: &str, destination: &str) -> Result<f64, DistanceError>;
}

impl<T: DistanceResolver + ?Sized> DistanceResolver for &T {
    fn distance_km(&self, origin: &str, destination: &str) -> Result<f64, DistanceError> {
        (**self).distance_km(origin, destination)
    }
}

/// Convert metres to kilometres rounded half-up to two decimals.
///
/// The rounding happens on integers so `12_345` metres is exactly `12.35`.
#[must_use]
#[expect(
    clippy::integer_division,
    clippy::cast_precision_loss,
    clippy::float_arithmetic,
    reason = "rounding to decametres is integer division; the final scale needs a float"
)]
pub fn metres_to_km(metres: u64) -> f64 {
    let decametres = metres.saturating_add(5) / 10;
    decametres as f64 / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(12_345, 12.35)]
    #[case(12_344, 12.34)]
    #[case(0, 0.0)]
    #[case(999, 1.0)]
    #[case(429_400, 429.4)]
    fn rounds_to_two_decimals(#[case] metres: u64, #[case] expected: f64) {
        assert_eq!(metres_to_km(metres), expected);
    }

    #[rstest]
    fn saturates_on_overflow() {
        assert!(metres_to_km(u64::MAX).is_finite());
    }
}
