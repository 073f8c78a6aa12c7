//! Claim construction for issued tokens.

// self
use crate::{_prelude::*, auth::ClientId};

/// Claims embedded in every signed token.
///
/// Wire names follow the registered JWT claims (`iat`, `exp`) plus `client_id`. A missing `exp`
/// means the token never expires.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimSet {
	/// Issued-at instant in seconds since the Unix epoch.
	#[serde(rename = "iat")]
	pub issued_at: i64,
	/// Expiry instant in seconds since the Unix epoch; always after `issued_at` when present.
	#[serde(rename = "exp", default, skip_serializing_if = "Option::is_none")]
	pub expires_at: Option<i64>,
	/// Subject the token was issued to.
	pub client_id: ClientId,
}
impl ClaimSet {
	/// Builds claims for `client_id` stamped with the current clock.
	///
	/// A `ttl` shorter than one second (including zero and negative values) yields a token that
	/// never expires.
	pub fn new(client_id: ClientId, ttl: Duration) -> Self {
		Self::issued_at(client_id, ttl, OffsetDateTime::now_utc())
	}

	/// Builds claims as if issued at `now`.
	pub fn issued_at(client_id: ClientId, ttl: Duration, now: OffsetDateTime) -> Self {
		let issued_at = now.unix_timestamp();
		let ttl_secs = ttl.whole_seconds();
		let expires_at = (ttl_secs > 0).then(|| issued_at.saturating_add(ttl_secs));

		Self { issued_at, expires_at, client_id }
	}

	/// Returns `true` when the claims carry an expiry at or before `now`.
	pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
		self.expires_at.is_some_and(|exp| exp <= now.unix_timestamp())
	}
}
