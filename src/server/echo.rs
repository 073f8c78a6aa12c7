//! Protected echo resource: verifies the bearer token and describes the request back.

// crates.io
use axum::{
	body::{self, Body},
	extract::{Request, State},
	http::{HeaderMap, HeaderValue, StatusCode, header::AUTHORIZATION, request::Parts},
	response::Response,
};
// self
use crate::{
	_prelude::*,
	auth,
	config::ServerConfig,
	error::TransportError,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	server::{
		BODY_LIMIT,
		envelope::{self, RequestContext},
	},
};

/// Description of an authenticated request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EchoReply {
	/// Header name to every value received for it.
	pub request_headers: BTreeMap<String, Vec<String>>,
	/// Request body, lossily decoded as UTF-8.
	pub request_body: String,
	/// Request method.
	pub request_method: String,
	/// Path and query.
	pub request_url: String,
	/// `Host` the client addressed.
	pub request_host: String,
}

/// Token candidate in an `Authorization` value: everything after the first whitespace.
///
/// The scheme word is not inspected. A missing header, or one without whitespace, yields an
/// empty candidate.
pub fn bearer_candidate(header: Option<&HeaderValue>) -> &str {
	header
		.and_then(|value| value.to_str().ok())
		.and_then(|value| value.split_once(char::is_whitespace))
		.map(|(_, token)| token)
		.unwrap_or_default()
}

pub(crate) async fn echo(State(config): State<Arc<ServerConfig>>, request: Request) -> Response {
	const KIND: FlowKind = FlowKind::ResourceAccess;

	let (parts, body) = request.into_parts();
	let ctx = RequestContext::from_parts(&parts);
	let span = FlowSpan::new(KIND, "echo");

	obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

	match span.instrument(describe(&config, &ctx, &parts, body)).await {
		Ok(reply) => {
			tracing::info!(remote = %ctx.remote, method = %ctx.method, path = %ctx.path, "200 ok");
			obs::record_flow_outcome(KIND, FlowOutcome::Success);

			envelope::json_reply(StatusCode::OK, reply)
		},
		Err(e) => {
			obs::record_flow_outcome(KIND, FlowOutcome::Failure);

			envelope::reject(&ctx, &config.server_hostname, &e)
		},
	}
}

async fn describe(
	config: &ServerConfig,
	ctx: &RequestContext,
	parts: &Parts,
	body: Body,
) -> Result<Vec<u8>> {
	let claims = auth::verify(bearer_candidate(parts.headers.get(AUTHORIZATION)), &config.secret)?;

	tracing::debug!(client_id = %claims.client_id, "Access token accepted.");

	let body = body::to_bytes(body, BODY_LIMIT).await.map_err(TransportError::body_read)?;
	let reply = EchoReply {
		request_headers: header_lists(&parts.headers),
		request_body: String::from_utf8_lossy(&body).into_owned(),
		request_method: ctx.method.clone(),
		request_url: ctx.path.clone(),
		request_host: ctx.host.clone(),
	};

	Ok(serde_json::to_vec(&reply)?)
}

fn header_lists(headers: &HeaderMap) -> BTreeMap<String, Vec<String>> {
	let mut lists = BTreeMap::<String, Vec<String>>::new();

	for (name, value) in headers {
		lists
			.entry(name.as_str().to_owned())
			.or_default()
			.push(String::from_utf8_lossy(value.as_bytes()).into_owned());
	}

	lists
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn candidate_is_text_after_first_whitespace() {
		let value = |raw: &'static str| HeaderValue::from_static(raw);

		assert_eq!(bearer_candidate(Some(&value("Bearer a.b.c"))), "a.b.c");
		assert_eq!(bearer_candidate(Some(&value("Token a.b.c"))), "a.b.c");
		assert_eq!(bearer_candidate(Some(&value("Bearer  a.b.c"))), " a.b.c");
		assert_eq!(bearer_candidate(Some(&value("a.b.c"))), "");
		assert_eq!(bearer_candidate(None), "");
	}

	#[test]
	fn repeated_headers_keep_every_value() {
		let mut headers = HeaderMap::new();

		headers.append("x-trace", HeaderValue::from_static("one"));
		headers.append("x-trace", HeaderValue::from_static("two"));
		headers.append("accept", HeaderValue::from_static("*/*"));

		let lists = header_lists(&headers);

		assert_eq!(lists["x-trace"], ["one", "two"]);
		assert_eq!(lists["accept"], ["*/*"]);
	}
}
