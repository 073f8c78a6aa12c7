//! Token endpoint: authenticates a client-credentials request and issues a signed token pair.

// crates.io
use axum::{
	extract::{Request, State},
	http::StatusCode,
	response::Response,
};
// self
use crate::{
	_prelude::*,
	auth::{self, CLIENT_CREDENTIALS_GRANT, ClaimSet, ClientId},
	config::ServerConfig,
	error::ConfigError,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	server::{
		envelope::{self, RequestContext},
		params::RequestParams,
	},
};

/// Successful token endpoint reply.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenReply {
	/// Signed token expiring after the configured lifetime.
	pub access_token: String,
	/// Always `Bearer`.
	pub token_type: String,
	/// Signed token without an expiry.
	pub refresh_token: String,
	/// Configured access token lifetime in seconds.
	pub expires_in: i64,
}

pub(crate) async fn issue_token(
	State(config): State<Arc<ServerConfig>>,
	request: Request,
) -> Response {
	const KIND: FlowKind = FlowKind::TokenIssuance;

	let (parts, body) = request.into_parts();
	let ctx = RequestContext::from_parts(&parts);
	let span = FlowSpan::new(KIND, "issue_token");

	obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

	match span.instrument(issue(&config, RequestParams::new(&parts, body))).await {
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

async fn issue(config: &ServerConfig, mut params: RequestParams) -> Result<Vec<u8>> {
	let grant_type = params.get("grant_type").await;
	let client_id = params.get("client_id").await;
	let client_secret = params.get("client_secret").await;

	tracing::debug!(
		grant_type = %grant_type,
		client_id = %client_id,
		client_secret_present = !client_secret.is_empty(),
		"Token request received."
	);

	if !config.credentials.authorize(&grant_type, &client_id, &client_secret) {
		let reason =
			if grant_type == CLIENT_CREDENTIALS_GRANT { "bad credentials" } else { "wrong grant type" };

		return Err(Error::InvalidClient { reason: reason.into() });
	}

	let subject = ClientId::new(&client_id).map_err(ConfigError::from)?;
	let access_token =
		auth::sign(&ClaimSet::new(subject.clone(), config.access_token_ttl), &config.secret)?;
	let refresh_token = auth::sign(&ClaimSet::new(subject, Duration::ZERO), &config.secret)?;
	let reply = TokenReply {
		access_token,
		token_type: "Bearer".into(),
		refresh_token,
		expires_in: config.access_token_ttl.whole_seconds(),
	};

	Ok(serde_json::to_vec(&reply)?)
}
