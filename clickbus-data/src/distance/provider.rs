//! HTTP-based `DistanceResolver` using the Distance Matrix API.
//!
//! The [`DistanceResolver`] trait is synchronous so the import pass stays a
//! plain loop. This resolver bridges its async HTTP call to that interface by
//! blocking on a Tokio runtime it owns.
//!
//! # Example
//!
//! ```no_run
//! use clickbus_core::DistanceResolver;
//! use clickbus_data::distance::HttpDistanceResolver;
//!
//! let resolver = HttpDistanceResolver::new("my-api-key")?;
//! let km = resolver.distance_km("São Paulo, SP", "Campinas, SP")?;
//! println!("{km} km");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::time::Duration;

use clickbus_core::{DistanceError, DistanceResolver, metres_to_km};
use reqwest::Client;
use thiserror::Error;
use tokio::runtime::{Handle, Runtime, RuntimeFlavor};
use url::Url;

use super::matrix::MatrixResponse;

/// Error type for [`HttpDistanceResolver`] construction failures.
#[derive(Debug, Error)]
pub enum ResolverBuildError {
    /// The configured base URL is not a valid absolute URL.
    #[error("invalid distance service URL {url:?}")]
    BaseUrl {
        /// Rejected input.
        url: String,
        /// Parser error.
        #[source]
        source: url::ParseError,
    },
    /// No API key was configured.
    #[error("distance service API key is empty")]
    MissingApiKey,
    /// Failed to build the HTTP client.
    #[error("failed to build HTTP client")]
    HttpClient(#[source] reqwest::Error),
    /// Failed to build the Tokio runtime.
    #[error("failed to build Tokio runtime")]
    Runtime(#[source] std::io::Error),
}

/// Default Distance Matrix endpoint.
pub const DEFAULT_BASE_URL: &str = "https://maps.googleapis.com/maps/api/distancematrix/json";

/// Default user agent for distance requests.
pub const DEFAULT_USER_AGENT: &str = "clickbus-ingest/0.1";

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration for [`HttpDistanceResolver`].
#[derive(Clone)]
pub struct HttpDistanceResolverConfig {
    /// Distance Matrix endpoint.
    pub base_url: String,
    /// API key sent as the `key` query parameter.
    pub api_key: String,
    /// Request timeout duration.
    pub timeout: Duration,
    /// User agent string for requests.
    pub user_agent: String,
}

impl std::fmt::Debug for HttpDistanceResolverConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpDistanceResolverConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("timeout", &self.timeout)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

impl HttpDistanceResolverConfig {
    /// Create a configuration for the default endpoint with the given key.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        }
    }

    /// Point the resolver at another endpoint.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the user agent string.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// HTTP-based distance resolver.
///
/// # Runtime behaviour
///
/// Outside any Tokio runtime the resolver blocks on its own current-thread
/// runtime. Inside a multi-threaded runtime it uses that runtime's handle
/// with [`tokio::task::block_in_place`]. Calling it from a `current_thread`
/// runtime panics, as Tokio forbids nested blocking there.
pub struct HttpDistanceResolver {
    client: Client,
    base_url: Url,
    config: HttpDistanceResolverConfig,
    runtime: Runtime,
}

impl std::fmt::Debug for HttpDistanceResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpDistanceResolver")
            .field("client", &self.client)
            .field("config", &self.config)
            .field("runtime", &"<tokio::runtime::Runtime>")
            .finish_non_exhaustive()
    }
}

impl HttpDistanceResolver {
    /// Create a resolver for the default endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is empty or the HTTP client or Tokio
    /// runtime fails to build.
    pub fn new(api_key: impl Into<String>) -> Result<Self, ResolverBuildError> {
        Self::with_config(HttpDistanceResolverConfig::new(api_key))
    }

    /// Create a resolver with explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is empty, the base URL does not parse, or
    /// the HTTP client or Tokio runtime fails to build.
    pub fn with_config(config: HttpDistanceResolverConfig) -> Result<Self, ResolverBuildError> {
        if config.api_key.trim().is_empty() {
            return Err(ResolverBuildError::MissingApiKey);
        }
        let base_url = Url::parse(&config.base_url).map_err(|source| ResolverBuildError::BaseUrl {
            url: config.base_url.clone(),
            source,
        })?;
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .connect_timeout(config.timeout)
            .timeout(config.timeout)
            .build()
            .map_err(ResolverBuildError::HttpClient)?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(ResolverBuildError::Runtime)?;
        Ok(Self {
            client,
            base_url,
            config,
            runtime,
        })
    }

    /// Build the request URL without the API key.
    ///
    /// This is the form used in errors and logs.
    fn build_request_url(&self, origin: &str, destination: &str) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("origins", origin)
            .append_pair("destinations", destination)
            .append_pair("units", "metric");
        url
    }

    async fn fetch_distance_async(
        &self,
        origin: &str,
        destination: &str,
    ) -> Result<f64, DistanceError> {
        let url = self.build_request_url(origin, destination);
        let mut keyed = url.clone();
        keyed.query_pairs_mut().append_pair("key", &self.config.api_key);

        let response = self
            .client
            .get(keyed)
            .send()
            .await
            .map_err(|err| self.convert_reqwest_error(err, &url))?
            .error_for_status()
            .map_err(|err| self.convert_reqwest_error(err, &url))?;

        let body: MatrixResponse = response
            .json()
            .await
            .map_err(|err| DistanceError::Parse {
                message: err.without_url().to_string(),
            })?;

        convert_response(&body)
    }

    /// Convert a reqwest error to a `DistanceError`, dropping the keyed URL
    /// reqwest attaches to it.
    fn convert_reqwest_error(&self, error: reqwest::Error, url: &Url) -> DistanceError {
        if error.is_timeout() {
            return DistanceError::Timeout {
                url: url.to_string(),
                timeout_secs: self.config.timeout.as_secs(),
            };
        }

        let status = error.status();
        let message = error.without_url().to_string();
        match status {
            Some(status) => DistanceError::Http {
                url: url.to_string(),
                status: status.as_u16(),
                message,
            },
            None => DistanceError::Network {
                url: url.to_string(),
                message,
            },
        }
    }
}

/// Interpret a Distance Matrix response as kilometres.
pub(crate) fn convert_response(response: &MatrixResponse) -> Result<f64, DistanceError> {
    if !response.is_ok() {
        return Err(DistanceError::ServiceStatus {
            status: response.status.clone(),
            message: response.error_message.clone().unwrap_or_default(),
        });
    }

    let element = response
        .first_element()
        .ok_or_else(|| DistanceError::Parse {
            message: "response contains no elements".to_owned(),
        })?;
    if element.status != "OK" {
        return Err(DistanceError::ElementStatus {
            status: element.status.clone(),
        });
    }

    let distance = element
        .distance
        .as_ref()
        .ok_or_else(|| DistanceError::Parse {
            message: "element is missing its distance".to_owned(),
        })?;
    Ok(metres_to_km(distance.value))
}

impl DistanceResolver for HttpDistanceResolver {
    /// Fetch the road distance between two places.
    ///
    /// # Runtime requirements
    ///
    /// When called from within an existing Tokio runtime, the runtime must be
    /// multi-threaded. Call it from `spawn_blocking` inside a `current_thread`
    /// runtime.
    fn distance_km(&self, origin: &str, destination: &str) -> Result<f64, DistanceError> {
        if origin.trim().is_empty() || destination.trim().is_empty() {
            return Err(DistanceError::EmptyInput);
        }

        let future = self.fetch_distance_async(origin, destination);
        match Handle::try_current() {
            Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
                tokio::task::block_in_place(|| handle.block_on(future))
            }
            _ => self.runtime.block_on(future),
        }
    }
}
