//! JSON replies and the error envelope shared by every route.

// crates.io
use axum::{
	extract::ConnectInfo,
	http::{
		HeaderValue, StatusCode,
		header::{CONTENT_TYPE, HOST, X_CONTENT_TYPE_OPTIONS},
		request::Parts,
	},
	response::{IntoResponse, Response},
};
// self
use crate::_prelude::*;

/// Error body returned with every non-2xx status.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
	/// Short lowercase description, e.g. `unauthorized`.
	pub message: String,
	/// Status code as a decimal string.
	pub status: String,
	/// Request path and query.
	pub path: String,
	/// Request method.
	pub method: String,
	/// `Host` the client addressed.
	pub host: String,
	/// Hostname of the machine serving the request.
	#[serde(rename = "serverHostname")]
	pub server_hostname: String,
}

/// Request facts captured up front for logging and envelopes.
#[derive(Clone, Debug)]
pub(crate) struct RequestContext {
	pub(crate) remote: String,
	pub(crate) method: String,
	pub(crate) path: String,
	pub(crate) host: String,
}
impl RequestContext {
	pub(crate) fn from_parts(parts: &Parts) -> Self {
		let remote = parts
			.extensions
			.get::<ConnectInfo<SocketAddr>>()
			.map(|ConnectInfo(addr)| addr.to_string())
			.unwrap_or_else(|| "-".into());
		let path = parts
			.uri
			.path_and_query()
			.map(|pq| pq.as_str().to_owned())
			.unwrap_or_else(|| parts.uri.path().to_owned());
		let host = parts
			.headers
			.get(HOST)
			.and_then(|value| value.to_str().ok())
			.map(str::to_owned)
			.or_else(|| parts.uri.authority().map(|authority| authority.to_string()))
			.unwrap_or_default();

		Self { remote, method: parts.method.to_string(), path, host }
	}
}

/// Status and log wording for a failed request.
pub(crate) fn classify(err: &Error) -> (StatusCode, &'static str) {
	match err {
		Error::InvalidClient { .. } | Error::InvalidGrant { .. } | Error::Validation(_) =>
			(StatusCode::UNAUTHORIZED, "unauthorized"),
		_ => (StatusCode::INTERNAL_SERVER_ERROR, "server error"),
	}
}

/// Logs `err` against the request and renders its envelope.
pub(crate) fn reject(ctx: &RequestContext, server_hostname: &str, err: &Error) -> Response {
	let (status, message) = classify(err);

	if status.is_server_error() {
		tracing::error!(
			remote = %ctx.remote,
			method = %ctx.method,
			path = %ctx.path,
			decision = %err,
			"{} {message}",
			status.as_u16()
		);
	} else {
		tracing::warn!(
			remote = %ctx.remote,
			method = %ctx.method,
			path = %ctx.path,
			decision = %err,
			"{} {message}",
			status.as_u16()
		);
	}

	error_reply(ctx, server_hostname, status, message)
}

/// Renders the envelope for `status`.
pub(crate) fn error_reply(
	ctx: &RequestContext,
	server_hostname: &str,
	status: StatusCode,
	message: &str,
) -> Response {
	let envelope = ErrorEnvelope {
		message: message.into(),
		status: status.as_u16().to_string(),
		path: ctx.path.clone(),
		method: ctx.method.clone(),
		host: ctx.host.clone(),
		server_hostname: server_hostname.into(),
	};

	match serde_json::to_vec(&envelope) {
		Ok(body) => json_reply(status, body),
		Err(_) => status.into_response(),
	}
}

/// Wraps an encoded JSON body with the reply headers and a trailing newline.
pub(crate) fn json_reply(status: StatusCode, mut body: Vec<u8>) -> Response {
	body.push(b'\n');

	(
		status,
		[
			(CONTENT_TYPE, HeaderValue::from_static("application/json; charset=utf-8")),
			(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff")),
		],
		body,
	)
		.into_response()
}
