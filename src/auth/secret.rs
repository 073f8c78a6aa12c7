//! Secret wrappers that keep sensitive material out of logs.

// self
use crate::_prelude::*;

/// Process-wide key used symmetrically for signing and verifying tokens.
///
/// Constructed once from configuration and shared read-only by every handler; cloning only bumps
/// a reference count.
#[derive(Clone, PartialEq, Eq)]
pub struct SharedSecret(Arc<[u8]>);
impl SharedSecret {
	/// Wraps the provided key bytes.
	pub fn new(value: impl AsRef<[u8]>) -> Self {
		Self(Arc::from(value.as_ref()))
	}

	/// Returns the raw key bytes. Callers must avoid logging them.
	pub fn expose(&self) -> &[u8] {
		&self.0
	}

	/// Returns `true` when the key has no bytes.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}
impl Debug for SharedSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("SharedSecret").field(&"<redacted>").finish()
	}
}
impl Display for SharedSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

/// Redacted string secret: client secrets and bearer tokens held by the client.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSecret(String);
impl TokenSecret {
	/// Wraps a new secret string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}
}
impl AsRef<str> for TokenSecret {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl Debug for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("TokenSecret").field(&"<redacted>").finish()
	}
}
impl Display for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}
