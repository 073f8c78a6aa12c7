//! Transport decorator that observes one endpoint's response bodies and replays them intact.

// crates.io
use oauth2::http::Uri;
// self
use crate::{
	_prelude::*,
	error::TransportError,
	http::{HttpRequest, HttpTransport, ResponseBody, StreamingResponse, TransportFuture},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

/// Observer invoked with the target URL and every captured body.
pub type ReplayTap = Arc<dyn Fn(&Url, &Bytes) + Send + Sync>;

/// Wraps a transport so responses from `target` are drained, logged, and handed back to the
/// caller as a fresh single-read body holding the identical bytes.
///
/// Requests to any other URL are delegated untouched. Matching compares scheme, host, port, and
/// path; query and fragment are ignored.
pub struct ReplayingTransport<T> {
	inner: T,
	target: Url,
	tap: Option<ReplayTap>,
}
impl<T> ReplayingTransport<T>
where
	T: HttpTransport,
{
	/// Wraps `inner`, intercepting responses from `target`.
	pub fn new(inner: T, target: Url) -> Self {
		Self { inner, target, tap: None }
	}

	/// Registers an observer that receives each captured body.
	pub fn with_tap(mut self, tap: impl 'static + Fn(&Url, &Bytes) + Send + Sync) -> Self {
		self.tap = Some(Arc::new(tap));

		self
	}

	/// Designated URL.
	pub fn target(&self) -> &Url {
		&self.target
	}

	/// Wrapped transport.
	pub fn inner(&self) -> &T {
		&self.inner
	}

	/// Returns `true` when `uri` addresses the designated endpoint.
	pub fn is_target(&self, uri: &Uri) -> bool {
		Url::parse(&uri.to_string()).is_ok_and(|url| {
			url.scheme() == self.target.scheme()
				&& url.host_str() == self.target.host_str()
				&& url.port_or_known_default() == self.target.port_or_known_default()
				&& url.path() == self.target.path()
		})
	}

	async fn intercept(&self, request: HttpRequest) -> Result<StreamingResponse, TransportError> {
		const KIND: FlowKind = FlowKind::Intercept;

		let span = FlowSpan::new(KIND, "replay");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		span.instrument(async move {
			let mut response = match self.inner.send(request).await {
				Ok(response) => response,
				Err(e) => {
					tracing::warn!(url = %self.target, error = %e, "Token retrieval intercepted: error.");
					obs::record_flow_outcome(KIND, FlowOutcome::Failure);

					return Err(e);
				},
			};

			match response.body_mut().read_to_end().await {
				Ok(captured) => {
					tracing::info!(
						url = %self.target,
						status = response.status().as_u16(),
						body = %String::from_utf8_lossy(&captured),
						"Token retrieval intercepted."
					);

					if let Some(tap) = &self.tap {
						tap(&self.target, &captured);
					}

					// Dropping the drained stream closes the original body.
					*response.body_mut() = ResponseBody::from_bytes(captured);

					obs::record_flow_outcome(KIND, FlowOutcome::Success);
				},
				Err(e) => {
					tracing::warn!(
						url = %self.target,
						error = %e,
						"Token retrieval intercepted: body read failed."
					);
					obs::record_flow_outcome(KIND, FlowOutcome::Failure);
				},
			}

			Ok(response)
		})
		.await
	}
}
impl<T> HttpTransport for ReplayingTransport<T>
where
	T: HttpTransport,
{
	fn send(&self, request: HttpRequest) -> TransportFuture<'_> {
		if self.is_target(request.uri()) {
			Box::pin(self.intercept(request))
		} else {
			self.inner.send(request)
		}
	}
}
impl<T> Debug for ReplayingTransport<T> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ReplayingTransport")
			.field("target", &self.target.as_str())
			.field("tap_set", &self.tap.is_some())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// crates.io
	use futures::stream;
	use oauth2::http::{HeaderValue, Method, Request, StatusCode, header::CONTENT_TYPE};
	// self
	use super::*;

	type Script = Box<dyn Fn() -> Result<StreamingResponse, TransportError> + Send + Sync>;

	struct ScriptedTransport {
		script: Script,
		calls: AtomicUsize,
	}
	impl ScriptedTransport {
		fn new(
			script: impl 'static + Fn() -> Result<StreamingResponse, TransportError> + Send + Sync,
		) -> Self {
			Self { script: Box::new(script), calls: AtomicUsize::new(0) }
		}
	}
	impl HttpTransport for ScriptedTransport {
		fn send(&self, _request: HttpRequest) -> TransportFuture<'_> {
			self.calls.fetch_add(1, Ordering::SeqCst);

			let result = (self.script)();

			Box::pin(async move { result })
		}
	}

	fn chunked(chunks: &'static [&'static str]) -> StreamingResponse {
		let body = ResponseBody::from_stream(stream::iter(
			chunks.iter().map(|chunk| Ok(Bytes::from_static(chunk.as_bytes()))),
		));
		let mut response = StreamingResponse::new(body);

		response.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

		response
	}

	fn token_url() -> Url {
		Url::parse("http://localhost:8080/oauth/token").expect("Token URL fixture should parse.")
	}

	fn request(uri: &str) -> HttpRequest {
		Request::builder()
			.method(Method::POST)
			.uri(uri)
			.body(Vec::new())
			.expect("Request fixture should build.")
	}

	#[tokio::test]
	async fn designated_response_is_replayed_byte_for_byte() {
		let captured = Arc::new(Mutex::new(Vec::<Bytes>::new()));
		let sink = captured.clone();
		let transport = ReplayingTransport::new(
			ScriptedTransport::new(|| Ok(chunked(&["{\"access_token\":", "\"abc\"}"]))),
			token_url(),
		)
		.with_tap(move |_, body| sink.lock().push(body.clone()));
		let response = transport
			.send(request("http://localhost:8080/oauth/token"))
			.await
			.expect("Intercepted call should succeed.");

		assert_eq!(response.status(), StatusCode::OK);
		assert_eq!(response.headers()[CONTENT_TYPE], "application/json");

		let mut body = response.into_body();

		assert_eq!(
			body.read_to_end().await.expect("Replayed body should read."),
			"{\"access_token\":\"abc\"}"
		);
		assert!(body.read_to_end().await.expect("Second read should be empty.").is_empty());
		assert_eq!(*captured.lock(), vec![Bytes::from_static(b"{\"access_token\":\"abc\"}")]);
	}

	#[tokio::test]
	async fn other_urls_are_delegated_untouched() {
		let tapped = Arc::new(AtomicUsize::new(0));
		let counter = tapped.clone();
		let transport = ReplayingTransport::new(
			ScriptedTransport::new(|| {
				let mut response = chunked(&["echo"]);

				*response.status_mut() = StatusCode::ACCEPTED;

				Ok(response)
			}),
			token_url(),
		)
		.with_tap(move |_, _| {
			counter.fetch_add(1, Ordering::SeqCst);
		});

		for uri in ["http://localhost:8080/echo", "http://127.0.0.1:8080/oauth/token"] {
			let response = transport.send(request(uri)).await.expect("Delegated call should succeed.");

			assert_eq!(response.status(), StatusCode::ACCEPTED);
			assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
			assert_eq!(response.into_body().collect().await.expect("Body should read."), "echo");
		}

		assert_eq!(tapped.load(Ordering::SeqCst), 0);
		assert_eq!(transport.inner().calls.load(Ordering::SeqCst), 2);
	}

	#[tokio::test]
	async fn transport_errors_propagate_unchanged() {
		let transport = ReplayingTransport::new(
			ScriptedTransport::new(|| {
				Err(TransportError::Io(std::io::Error::new(
					std::io::ErrorKind::ConnectionRefused,
					"refused",
				)))
			}),
			token_url(),
		);
		let err = transport
			.send(request("http://localhost:8080/oauth/token"))
			.await
			.expect_err("Transport error should propagate.");

		assert!(
			matches!(err, TransportError::Io(ref io) if io.kind() == std::io::ErrorKind::ConnectionRefused)
		);
	}

	#[tokio::test]
	async fn read_failure_returns_response_without_fabricating_a_body() {
		let tapped = Arc::new(AtomicUsize::new(0));
		let counter = tapped.clone();
		let transport = ReplayingTransport::new(
			ScriptedTransport::new(|| {
				Ok(StreamingResponse::new(ResponseBody::from_stream(stream::iter([
					Ok(Bytes::from_static(b"{\"access")),
					Err(TransportError::Io(std::io::Error::other("reset"))),
				]))))
			}),
			token_url(),
		)
		.with_tap(move |_, _| {
			counter.fetch_add(1, Ordering::SeqCst);
		});
		let response = transport
			.send(request("http://localhost:8080/oauth/token?trace=1"))
			.await
			.expect("Read failures must still return the response.");

		assert_eq!(response.status(), StatusCode::OK);
		assert_eq!(tapped.load(Ordering::SeqCst), 0);
		assert!(
			response
				.into_body()
				.collect()
				.await
				.expect("Exhausted body should read empty.")
				.is_empty()
		);
	}

	#[test]
	fn target_matching_ignores_query_and_default_port() {
		let transport = ReplayingTransport::new(
			ScriptedTransport::new(|| Ok(chunked(&[]))),
			Url::parse("http://example.com/oauth/token").expect("Target fixture should parse."),
		);
		let uri = |raw: &str| raw.parse::<Uri>().expect("URI fixture should parse.");

		assert!(transport.is_target(&uri("http://example.com:80/oauth/token?x=1")));
		assert!(transport.is_target(&uri("http://EXAMPLE.com/oauth/token")));
		assert!(!transport.is_target(&uri("https://example.com/oauth/token")));
		assert!(!transport.is_target(&uri("http://example.com/oauth/token/")));
		assert!(!transport.is_target(&uri("/oauth/token")));
	}
}
