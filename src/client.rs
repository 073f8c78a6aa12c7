//! Client side of the toy: a caching client-credentials token source, a client that authorizes
//! outgoing requests with it, and the fixed-interval poller driven by `oauthtoy-client`.
//!
//! The token exchange itself is delegated to the `oauth2` crate, which talks to the endpoint
//! through [`TransportHandle`], so any [`HttpTransport`] decorator (notably
//! [`ReplayingTransport`](crate::http::ReplayingTransport)) sees the raw token traffic.

mod record;

pub use record::*;

// crates.io
use oauth2::{
	AuthType, ClientId, ClientSecret, HttpClientError, RequestTokenError, TokenUrl,
	basic::{BasicClient, BasicErrorResponseType, BasicRequestTokenError},
	http::{HeaderValue, Method, Request, StatusCode, header::AUTHORIZATION},
};
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	error::{ConfigError, TransientError, TransportError},
	http::{
		HttpRequest, HttpTransport, ResponseMetadata, ResponseMetadataSlot, StreamingResponse,
		TransportHandle,
	},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

/// Default window before expiry in which a cached token is replaced.
pub const DEFAULT_PREEMPTIVE_WINDOW: Duration = Duration::seconds(5);

/// Client-credentials token source with a single-flight cache.
///
/// Concurrent callers share one in-flight exchange; a cached token is reused until it is within
/// the preemptive window of its expiry.
pub struct ClientCredentialsSource<T>
where
	T: ?Sized + HttpTransport,
{
	transport: Arc<T>,
	token_url: Url,
	client_id: String,
	client_secret: TokenSecret,
	preemptive_window: Duration,
	cached: AsyncMutex<Option<TokenRecord>>,
}
impl<T> ClientCredentialsSource<T>
where
	T: ?Sized + HttpTransport,
{
	/// Builds a source that exchanges `client_id`/`client_secret` at `token_url`.
	pub fn new(
		transport: Arc<T>,
		token_url: Url,
		client_id: impl Into<String>,
		client_secret: TokenSecret,
	) -> Self {
		Self {
			transport,
			token_url,
			client_id: client_id.into(),
			client_secret,
			preemptive_window: DEFAULT_PREEMPTIVE_WINDOW,
			cached: AsyncMutex::new(None),
		}
	}

	/// Overrides the preemptive window; negative values are treated as zero.
	pub fn with_preemptive_window(mut self, window: Duration) -> Self {
		self.preemptive_window = window.max(Duration::ZERO);

		self
	}

	/// Transport shared by token and resource requests.
	pub fn transport(&self) -> &Arc<T> {
		&self.transport
	}

	/// Returns a usable token, exchanging credentials only when the cache is empty or stale.
	pub async fn token(&self) -> Result<TokenRecord> {
		const KIND: FlowKind = FlowKind::TokenAcquisition;

		let span = FlowSpan::new(KIND, "token");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span.instrument(self.cached_or_exchange()).await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(e) => {
				tracing::warn!(error = %e, "Token acquisition failed.");
				obs::record_flow_outcome(KIND, FlowOutcome::Failure);
			},
		}

		result
	}

	/// Drops the cached token so the next call performs a fresh exchange.
	pub async fn invalidate(&self) {
		self.cached.lock().await.take();
	}

	async fn cached_or_exchange(&self) -> Result<TokenRecord> {
		let mut cached = self.cached.lock().await;
		let now = OffsetDateTime::now_utc();

		if let Some(record) =
			cached.as_ref().filter(|record| !record.needs_refresh_at(now, self.preemptive_window))
		{
			tracing::debug!("Reusing cached token.");

			return Ok(record.clone());
		}

		let record = self.exchange().await?;

		tracing::info!(expires_at = ?record.expires_at, "Token acquired.");

		*cached = Some(record.clone());

		Ok(record)
	}

	async fn exchange(&self) -> Result<TokenRecord> {
		let client = BasicClient::new(ClientId::new(self.client_id.clone()))
			.set_client_secret(ClientSecret::new(self.client_secret.expose().to_owned()))
			.set_token_uri(TokenUrl::from_url(self.token_url.clone()))
			.set_auth_type(AuthType::RequestBody);
		let meta = ResponseMetadataSlot::default();
		let handle = TransportHandle::new(self.transport.clone(), meta.clone());
		let issued_at = OffsetDateTime::now_utc();
		let response = client
			.exchange_client_credentials()
			.request_async(&handle)
			.await
			.map_err(|err| map_request_error(meta.take(), err))?;

		Ok(TokenRecord::from_response(&response, issued_at)?)
	}
}
impl<T> Debug for ClientCredentialsSource<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ClientCredentialsSource")
			.field("token_url", &self.token_url.as_str())
			.field("client_id", &self.client_id)
			.field("client_secret", &self.client_secret)
			.field("preemptive_window", &self.preemptive_window)
			.finish()
	}
}

/// Sends requests with an `Authorization` header taken from a [`ClientCredentialsSource`].
#[derive(Debug)]
pub struct AuthorizedClient<T>
where
	T: ?Sized + HttpTransport,
{
	source: ClientCredentialsSource<T>,
}
impl<T> AuthorizedClient<T>
where
	T: ?Sized + HttpTransport,
{
	/// Wraps `source`; requests go out through the source's transport.
	pub fn new(source: ClientCredentialsSource<T>) -> Self {
		Self { source }
	}

	/// Token source backing this client.
	pub fn source(&self) -> &ClientCredentialsSource<T> {
		&self.source
	}

	/// Attaches the current token to `request` and sends it.
	pub async fn send(&self, mut request: HttpRequest) -> Result<StreamingResponse> {
		let record = self.source.token().await?;
		let value = HeaderValue::try_from(record.authorization())
			.map_err(|e| ConfigError::from(oauth2::http::Error::from(e)))?;

		request.headers_mut().insert(AUTHORIZATION, value);

		Ok(self.source.transport().send(request).await?)
	}

	/// Sends an authorized `GET` to `url`.
	pub async fn get(&self, url: &Url) -> Result<StreamingResponse> {
		let request = Request::builder()
			.method(Method::GET)
			.uri(url.as_str())
			.body(Vec::new())
			.map_err(ConfigError::from)?;

		self.send(request).await
	}
}

/// Outcome of one poll: the resource's status and full body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PollResponse {
	/// HTTP status code.
	pub status: u16,
	/// Response body.
	pub body: Bytes,
}

/// Fetches one resource on a fixed interval with an [`AuthorizedClient`].
#[derive(Debug)]
pub struct Poller<T>
where
	T: ?Sized + HttpTransport,
{
	client: AuthorizedClient<T>,
	url: Url,
	interval: Duration,
	fail_fast: bool,
}
impl<T> Poller<T>
where
	T: ?Sized + HttpTransport,
{
	/// Polls `url` every `interval`.
	pub fn new(client: AuthorizedClient<T>, url: Url, interval: Duration) -> Self {
		Self { client, url, interval, fail_fast: false }
	}

	/// Stop [`Poller::run`] on the first failed cycle.
	pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
		self.fail_fast = fail_fast;

		self
	}

	/// Authorized client used for each cycle.
	pub fn client(&self) -> &AuthorizedClient<T> {
		&self.client
	}

	/// Runs one cycle and returns the resource response whatever its status.
	///
	/// A `401` drops the cached token so the next cycle re-authenticates.
	pub async fn poll_once(&self) -> Result<PollResponse> {
		let response = self.client.get(&self.url).await?;
		let status = response.status();
		let body = response.into_body().collect().await?;

		if status == StatusCode::UNAUTHORIZED {
			tracing::warn!(url = %self.url, "Resource refused the token; it will be reacquired.");

			self.client.source().invalidate().await;
		}

		Ok(PollResponse { status: status.as_u16(), body })
	}

	/// Polls until a cycle fails in fail-fast mode, handing every response to `on_response`.
	///
	/// Without fail-fast, failures are logged and the loop continues.
	pub async fn run<F>(&self, mut on_response: F) -> Result<()>
	where
		F: FnMut(&PollResponse),
	{
		loop {
			match self.poll_once().await {
				Ok(response) => on_response(&response),
				Err(e) if self.fail_fast => return Err(e),
				Err(e) => tracing::error!(url = %self.url, error = %e, "Poll failed."),
			}

			tracing::info!(interval = %self.interval, "sleeping");

			tokio::time::sleep(self.interval.unsigned_abs()).await;
		}
	}
}

fn map_request_error(
	meta: Option<ResponseMetadata>,
	err: BasicRequestTokenError<HttpClientError<TransportError>>,
) -> Error {
	let status = meta.and_then(|value| value.status);

	match err {
		RequestTokenError::ServerResponse(response) => {
			let message = if let Some(description) = response.error_description() {
				format!("Token endpoint returned an OAuth error: {description}")
			} else {
				format!("Token endpoint returned an OAuth error: {}", response.error().as_ref())
			};

			match response.error() {
				BasicErrorResponseType::InvalidClient | BasicErrorResponseType::UnauthorizedClient =>
					Error::InvalidClient { reason: message },
				BasicErrorResponseType::InvalidGrant
				| BasicErrorResponseType::UnsupportedGrantType => Error::InvalidGrant { reason: message },
				_ => TransientError::TokenEndpoint { message, status }.into(),
			}
		},
		RequestTokenError::Request(HttpClientError::Reqwest(inner)) => Error::Transport(*inner),
		RequestTokenError::Request(HttpClientError::Http(inner)) => ConfigError::from(inner).into(),
		RequestTokenError::Request(HttpClientError::Io(inner)) => TransportError::Io(inner).into(),
		RequestTokenError::Request(HttpClientError::Other(message)) =>
			TransientError::TokenEndpoint { message, status }.into(),
		RequestTokenError::Request(_) => TransientError::TokenEndpoint {
			message: "HTTP client error occurred while calling the token endpoint".into(),
			status,
		}
		.into(),
		// Error envelopes are not OAuth error bodies; a 401 still means bad credentials.
		RequestTokenError::Parse(_, body) if status == Some(401) =>
			Error::InvalidClient { reason: String::from_utf8_lossy(&body).trim().to_owned() },
		RequestTokenError::Parse(source, _) =>
			TransientError::TokenResponseParse { source, status }.into(),
		RequestTokenError::Other(message) =>
			TransientError::TokenEndpoint { message, status }.into(),
	}
}
