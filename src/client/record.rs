//! Token records cached by the client-credentials source.

// crates.io
use oauth2::{
	TokenResponse,
	basic::{BasicTokenResponse, BasicTokenType},
};
// self
use crate::{_prelude::*, auth::TokenSecret, error::ConfigError};

/// Lifecycle status for a cached token record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenStatus {
	/// Token is usable.
	Active,
	/// Token reached its expiry instant.
	Expired,
}

/// Access token obtained from the token endpoint, stamped with the local clock.
#[derive(Clone, Serialize, Deserialize)]
pub struct TokenRecord {
	/// Access token secret; callers must avoid logging it.
	pub access_token: TokenSecret,
	/// Authorization scheme, normalized (`Bearer`, `MAC`, or the endpoint's extension value).
	pub token_type: String,
	/// Refresh token secret, if the endpoint issued one.
	pub refresh_token: Option<TokenSecret>,
	/// Local instant the exchange started.
	pub issued_at: OffsetDateTime,
	/// `issued_at + expires_in`; `None` when the endpoint gave no lifetime.
	pub expires_at: Option<OffsetDateTime>,
}
impl TokenRecord {
	/// Builds a record from a parsed token response.
	///
	/// # Errors
	///
	/// Returns [`ConfigError::ExpiresInOutOfRange`] when `expires_in` overflows the clock.
	pub fn from_response(
		response: &BasicTokenResponse,
		issued_at: OffsetDateTime,
	) -> Result<Self, ConfigError> {
		let expires_at = match response.expires_in() {
			Some(lifetime) => {
				let secs = i64::try_from(lifetime.as_secs())
					.map_err(|_| ConfigError::ExpiresInOutOfRange)?;

				Some(
					issued_at
						.checked_add(Duration::seconds(secs))
						.ok_or(ConfigError::ExpiresInOutOfRange)?,
				)
			},
			None => None,
		};
		let token_type = match response.token_type() {
			BasicTokenType::Mac => "MAC".into(),
			BasicTokenType::Extension(value) => value.clone(),
			_ => "Bearer".into(),
		};

		Ok(Self {
			access_token: TokenSecret::new(response.access_token().secret().to_owned()),
			token_type,
			refresh_token: response
				.refresh_token()
				.map(|token| TokenSecret::new(token.secret().to_owned())),
			issued_at,
			expires_at,
		})
	}

	/// Computes the lifecycle status at a given instant.
	pub fn status_at(&self, instant: OffsetDateTime) -> TokenStatus {
		match self.expires_at {
			Some(expires_at) if instant >= expires_at => TokenStatus::Expired,
			_ => TokenStatus::Active,
		}
	}

	/// Returns `true` if the record has expired at the provided instant.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		matches!(self.status_at(instant), TokenStatus::Expired)
	}

	/// Returns `true` when the record is expired or expires within `window` of `instant`.
	pub fn needs_refresh_at(&self, instant: OffsetDateTime, window: Duration) -> bool {
		self.expires_at.is_some_and(|expires_at| expires_at - instant <= window)
	}

	/// `Authorization` header value carrying the access token.
	pub fn authorization(&self) -> String {
		format!("{} {}", self.token_type, self.access_token.expose())
	}
}
impl Debug for TokenRecord {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenRecord")
			.field("access_token", &"<redacted>")
			.field("token_type", &self.token_type)
			.field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}
