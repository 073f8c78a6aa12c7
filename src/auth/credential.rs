//! Static client credential record and the authenticator that checks token requests against it.

// self
use crate::_prelude::*;

/// The only grant type the token endpoint accepts.
pub const CLIENT_CREDENTIALS_GRANT: &str = "client_credentials";

/// Immutable identifier/secret pair the server accepts, fixed at startup.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientCredentialRecord {
	client_id: String,
	client_secret: String,
}
impl ClientCredentialRecord {
	/// Builds a record for the provided pair.
	pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
		Self { client_id: client_id.into(), client_secret: client_secret.into() }
	}

	/// Identifier half of the record.
	pub fn client_id(&self) -> &str {
		&self.client_id
	}

	/// Returns `true` iff `grant_type` is [`CLIENT_CREDENTIALS_GRANT`] and the submitted pair
	/// equals the record exactly.
	///
	/// Comparison is plain string equality; callers decide what detail to log on rejection.
	pub fn authorize(&self, grant_type: &str, client_id: &str, client_secret: &str) -> bool {
		grant_type == CLIENT_CREDENTIALS_GRANT
			&& client_id == self.client_id
			&& client_secret == self.client_secret
	}
}
impl Default for ClientCredentialRecord {
	fn default() -> Self {
		Self::new("admin", "admin")
	}
}
impl Debug for ClientCredentialRecord {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ClientCredentialRecord")
			.field("client_id", &self.client_id)
			.field("client_secret", &"<redacted>")
			.finish()
	}
}
