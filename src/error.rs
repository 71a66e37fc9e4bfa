//! Crate-level error types shared by the refresher, device controller, stores, and flows.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
///
/// Components never raise these into the orchestrator for expected failures; they are converted
/// into tagged or optional results first. Whatever still escapes is caught by the flow's top level.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem; needs a human to fix.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Temporary upstream failure; the next scheduled invocation may succeed.
	#[error(transparent)]
	Transient(#[from] TransientError),
	/// Transport failure (DNS, TCP, TLS, timeout).
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// Provider rejected the refresh grant (expired or revoked refresh token).
	#[error("Provider rejected the grant: {reason}.")]
	Auth {
		/// Provider- or crate-supplied reason string.
		reason: String,
	},
	/// Vendor API answered with a non-success status.
	#[error("Vendor API rejected `{endpoint}` with HTTP {status}.")]
	UpstreamRejection {
		/// Request path that was rejected.
		endpoint: String,
		/// HTTP status code returned by the vendor.
		status: u16,
	},
}
impl Error {
	/// Returns `true` when retrying on the next scheduled run has a chance to succeed.
	pub fn is_transient(&self) -> bool {
		matches!(self, Self::Transient(_) | Self::Transport(_))
	}
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// Endpoint URL cannot be parsed.
	#[error("Endpoint `{endpoint}` is not a valid URL.")]
	InvalidEndpoint {
		/// Endpoint label.
		endpoint: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Endpoint uses plain HTTP where HTTPS is required.
	#[error("Endpoint `{endpoint}` must use https.")]
	InsecureEndpoint {
		/// Endpoint label.
		endpoint: &'static str,
	},

	/// One or more required credential parameters are absent or empty.
	#[error("Missing credentials in the credential store: {}.", missing.join(", "))]
	MissingCredentials {
		/// Logical parameter names that were not found.
		missing: Vec<&'static str>,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Temporary failure variants.
#[derive(Debug, ThisError)]
pub enum TransientError {
	/// Token endpoint returned an unexpected but non-fatal response.
	#[error("Token endpoint returned an unexpected response: {message}.")]
	TokenEndpoint {
		/// Summary of the failure.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// An endpoint responded with JSON that does not match the expected shape.
	#[error("Response from `{endpoint}` could not be decoded.")]
	ResponseParse {
		/// Endpoint label or request path.
		endpoint: String,
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// The request did not complete within the configured timeout.
	#[error("Request to `{endpoint}` timed out.")]
	Timeout {
		/// Endpoint label or request path.
		endpoint: String,
	},
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling `{endpoint}`.")]
	Network {
		/// Endpoint label or request path.
		endpoint: String,
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred during transport.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(
		endpoint: impl Into<String>,
		src: impl 'static + Send + Sync + std::error::Error,
	) -> Self {
		Self::Network { endpoint: endpoint.into(), source: Box::new(src) }
	}

	/// Classifies a reqwest failure into timeout or generic network trouble.
	pub fn from_reqwest(endpoint: impl Into<String>, e: ReqwestError) -> Self {
		let endpoint = endpoint.into();

		if e.is_timeout() { Self::Timeout { endpoint } } else { Self::network(endpoint, e) }
	}
}
