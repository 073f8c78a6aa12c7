//! Compact signed tokens: HS256 signing over a [`ClaimSet`] and stateless verification.
//!
//! A token is `base64url(header).base64url(claims).base64url(signature)`; anyone holding the
//! [`SharedSecret`] can recompute the signature, so no server-side lookup is needed. Expiry is
//! checked against an explicit instant, which keeps verification a pure function of its inputs.

// crates.io
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, errors::ErrorKind};
// self
use crate::{
	_prelude::*,
	auth::{ClaimSet, SharedSecret},
	error::{SigningError, ValidationError},
};

/// Algorithm declared in every issued token header.
pub const ALGORITHM: Algorithm = Algorithm::HS256;

/// Signs `claims` with `secret`.
///
/// # Errors
///
/// Returns [`SigningError::EmptySecret`] for an empty key and [`SigningError::Backend`] when
/// the signing backend rejects the input.
pub fn sign(claims: &ClaimSet, secret: &SharedSecret) -> Result<String, SigningError> {
	if secret.is_empty() {
		return Err(SigningError::EmptySecret);
	}

	jsonwebtoken::encode(&Header::new(ALGORITHM), claims, &EncodingKey::from_secret(secret.expose()))
		.map_err(SigningError::Backend)
}

/// Verifies `token` against `secret` using the current clock.
///
/// # Errors
///
/// See [`verify_at`].
pub fn verify(token: &str, secret: &SharedSecret) -> Result<ClaimSet, ValidationError> {
	verify_at(token, secret, OffsetDateTime::now_utc())
}

/// Verifies `token` against `secret` as of `now`.
///
/// # Errors
///
/// - [`ValidationError::Malformed`] when the token is not three parts or the header/claims do not
///   decode.
/// - [`ValidationError::SignatureMismatch`] when the recomputed signature differs, the header
///   declares another algorithm, or `secret` is empty.
/// - [`ValidationError::Expired`] when `exp` is present and not after `now`.
pub fn verify_at(
	token: &str,
	secret: &SharedSecret,
	now: OffsetDateTime,
) -> Result<ClaimSet, ValidationError> {
	if token.split('.').count() != 3 {
		return Err(ValidationError::Malformed { source: None });
	}
	if secret.is_empty() {
		return Err(ValidationError::SignatureMismatch);
	}

	let data = jsonwebtoken::decode::<ClaimSet>(
		token,
		&DecodingKey::from_secret(secret.expose()),
		&validation(),
	)
	.map_err(classify)?;
	let claims = data.claims;

	if let Some(expires_at) = claims.expires_at.filter(|_| claims.is_expired_at(now)) {
		return Err(ValidationError::Expired { expires_at });
	}

	Ok(claims)
}

// Expiry is checked by `verify_at` without leeway, and `exp` is optional.
fn validation() -> Validation {
	let mut validation = Validation::new(ALGORITHM);

	validation.validate_exp = false;
	validation.validate_nbf = false;
	validation.validate_aud = false;
	validation.leeway = 0;
	validation.required_spec_claims.clear();

	validation
}

fn classify(err: jsonwebtoken::errors::Error) -> ValidationError {
	match err.kind() {
		ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm =>
			ValidationError::SignatureMismatch,
		_ => ValidationError::Malformed { source: Some(err) },
	}
}
