//! Crate-level error types shared by the token server, the transport stack, and the client.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

pub(crate) type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Token could not be signed; no token may be issued.
	#[error(transparent)]
	Signing(#[from] SigningError),
	/// Presented token failed validation.
	#[error(transparent)]
	Validation(#[from] ValidationError),
	/// Reply could not be serialized.
	#[error("Reply serialization failed.")]
	Serialization(#[from] serde_json::Error),
	/// Temporary upstream failure; retry on the next cycle.
	#[error(transparent)]
	Transient(#[from] TransientError),
	/// Transport failure (DNS, TCP, TLS, body read).
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// Token endpoint rejected the grant type or the client credentials.
	#[error("Client authentication failed: {reason}.")]
	InvalidClient {
		/// Endpoint- or client-supplied reason string.
		reason: String,
	},
	/// Token endpoint rejected the grant.
	#[error("Token endpoint rejected the grant: {reason}.")]
	InvalidGrant {
		/// Endpoint- or client-supplied reason string.
		reason: String,
	},
}

/// Configuration and validation failures raised while wiring the programs.
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
	/// A configured URL cannot be parsed.
	#[error("The {field} URL is invalid.")]
	InvalidUrl {
		/// Configuration field holding the URL.
		field: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// A configured route is not an absolute, literal path.
	#[error("The {field} route `{route}` {reason}.")]
	InvalidRoute {
		/// Configuration field holding the route.
		field: &'static str,
		/// Offending route.
		route: String,
		/// What the route violates.
		reason: &'static str,
	},
	/// Token and echo routes collide.
	#[error("The token and echo routes must differ, both are `{route}`.")]
	DuplicateRoute {
		/// Shared route.
		route: String,
	},
	/// Token endpoint returned an `expires_in` that cannot be represented.
	#[error("The `expires_in` value is out of range.")]
	ExpiresInOutOfRange,
	/// Access token lifetime is zero.
	#[error("The access token lifetime must be positive.")]
	NonPositiveTtl,
	/// Polling interval is zero.
	#[error("The polling interval must be positive.")]
	NonPositiveInterval,
	/// Client identifier failed validation.
	#[error("Client identifier is invalid.")]
	InvalidClientId(#[from] crate::auth::IdentifierError),
	/// Listener could not be bound.
	#[error("Unable to listen on `{addr}`.")]
	Bind {
		/// Requested listen address.
		addr: String,
		/// Underlying socket failure.
		#[source]
		source: std::io::Error,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Signing failures. An unsigned token is never handed out.
#[derive(Debug, ThisError)]
pub enum SigningError {
	/// The shared secret is empty.
	#[error("Shared secret is empty.")]
	EmptySecret,
	/// The signing backend rejected the key or claims.
	#[error("Token signing failed.")]
	Backend(#[source] jsonwebtoken::errors::Error),
}

/// Reasons a presented bearer token is refused.
#[derive(Debug, ThisError)]
pub enum ValidationError {
	/// Token is not three dot-separated parts with decodable header and claims.
	#[error("Token is malformed.")]
	Malformed {
		/// Underlying parsing failure, when one exists.
		#[source]
		source: Option<jsonwebtoken::errors::Error>,
	},
	/// Recomputed signature differs from the embedded one.
	#[error("Token signature does not match.")]
	SignatureMismatch,
	/// Token carries an expiry that is not after the current time.
	#[error("Token expired at {expires_at}.")]
	Expired {
		/// Expiry in seconds since the Unix epoch.
		expires_at: i64,
	},
}

/// Temporary failure variants (safe to retry).
#[derive(Debug, ThisError)]
pub enum TransientError {
	/// Token endpoint returned an unexpected but non-fatal response.
	#[error("Token endpoint returned an unexpected response: {message}.")]
	TokenEndpoint {
		/// Message summarizing the failure.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Token endpoint responded with JSON that could not be parsed.
	#[error("Token endpoint returned malformed JSON.")]
	TokenResponseParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::error::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
}

/// Transport-level failures (network, IO, body reads).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while sending the request.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Response body could not be read to the end.
	#[error("Response body could not be read.")]
	BodyRead {
		/// Transport-specific read error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while sending the request.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}

	/// Wraps a transport-specific body read error.
	pub fn body_read(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::BodyRead { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}
