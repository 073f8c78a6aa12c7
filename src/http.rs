//! Transport primitives shared by the token-acquisition pipeline and resource requests.
//!
//! [`HttpTransport`] is the crate's only dependency on an HTTP stack: send one request, get one
//! response whose body is a single-read [`ResponseBody`] stream. Decorators such as
//! [`ReplayingTransport`] wrap another transport and keep the same contract, so the `oauth2`
//! token exchange (driven through [`TransportHandle`]) never sees the difference.

mod replay;

pub use replay::*;

// crates.io
use futures::{Stream, StreamExt, stream};
use oauth2::{AsyncHttpClient, HttpClientError, HttpResponse};
// self
use crate::{_prelude::*, error::TransportError};

pub use oauth2::HttpRequest;

/// Response whose body has not been read yet.
pub type StreamingResponse = oauth2::http::Response<ResponseBody>;

/// Boxed future returned by [`HttpTransport::send`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<StreamingResponse, TransportError>> + 'a + Send>>;

type BodyStream = Pin<Box<dyn Stream<Item = Result<Bytes, TransportError>> + Send>>;

/// "Send request, get response" capability.
///
/// Implementations must be `Send + Sync + 'static` so one instance can back both the token
/// source and resource requests, and the futures they return must be `Send`.
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Sends `request` and resolves once the response head is available.
	fn send(&self, request: HttpRequest) -> TransportFuture<'_>;
}

/// Response body that can be read exactly once.
pub struct ResponseBody {
	stream: BodyStream,
}
impl ResponseBody {
	/// Wraps a chunk stream.
	pub fn from_stream<S>(stream: S) -> Self
	where
		S: 'static + Send + Stream<Item = Result<Bytes, TransportError>>,
	{
		Self { stream: Box::pin(stream) }
	}

	/// Builds a fresh stream yielding `bytes` once.
	pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
		let bytes = bytes.into();

		Self::from_stream(stream::iter((!bytes.is_empty()).then_some(Ok(bytes))))
	}

	/// Body with no content.
	pub fn empty() -> Self {
		Self::from_stream(stream::empty())
	}

	/// Reads every remaining chunk.
	///
	/// On error the chunks read so far are lost and the stream stays partially consumed.
	pub async fn read_to_end(&mut self) -> Result<Bytes, TransportError> {
		let mut buf = Vec::new();

		while let Some(chunk) = self.stream.next().await {
			buf.extend_from_slice(&chunk?);
		}

		Ok(Bytes::from(buf))
	}

	/// Consumes the body and returns its content.
	pub async fn collect(mut self) -> Result<Bytes, TransportError> {
		self.read_to_end().await
	}
}
impl Default for ResponseBody {
	fn default() -> Self {
		Self::empty()
	}
}
impl Stream for ResponseBody {
	type Item = Result<Bytes, TransportError>;

	fn poll_next(
		self: Pin<&mut Self>,
		cx: &mut std::task::Context<'_>,
	) -> std::task::Poll<Option<Self::Item>> {
		self.get_mut().stream.as_mut().poll_next(cx)
	}
}
impl Debug for ResponseBody {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("ResponseBody(..)")
	}
}

/// Captures metadata from the most recent HTTP response for downstream error mapping.
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadata {
	/// HTTP status code returned by the endpoint, if available.
	pub status: Option<u16>,
}

/// Thread-safe slot for sharing [`ResponseMetadata`] between transport and error layers.
///
/// The token source creates a fresh slot for each token request and reads the captured metadata
/// immediately after `oauth2` resolves.
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadataSlot(Arc<Mutex<Option<ResponseMetadata>>>);
impl ResponseMetadataSlot {
	/// Stores new metadata for the current request.
	pub fn store(&self, meta: ResponseMetadata) {
		*self.0.lock() = Some(meta);
	}

	/// Returns the captured metadata, if any, consuming it from the slot.
	pub fn take(&self) -> Option<ResponseMetadata> {
		self.0.lock().take()
	}
}

/// [`AsyncHttpClient`] adapter that lets `oauth2` drive any [`HttpTransport`].
///
/// The handle buffers the body because `oauth2` parses whole responses; everything below it,
/// interceptors included, still sees a streaming response.
pub struct TransportHandle<T>
where
	T: ?Sized + HttpTransport,
{
	transport: Arc<T>,
	slot: ResponseMetadataSlot,
}
impl<T> TransportHandle<T>
where
	T: ?Sized + HttpTransport,
{
	/// Builds a handle that records outcomes in `slot`.
	pub fn new(transport: Arc<T>, slot: ResponseMetadataSlot) -> Self {
		Self { transport, slot }
	}
}
impl<'c, T> AsyncHttpClient<'c> for TransportHandle<T>
where
	T: ?Sized + HttpTransport,
{
	type Error = HttpClientError<TransportError>;
	type Future = Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		Box::pin(call_buffered(self.transport.as_ref(), &self.slot, request))
	}
}

async fn call_buffered<T>(
	transport: &T,
	slot: &ResponseMetadataSlot,
	request: HttpRequest,
) -> Result<HttpResponse, HttpClientError<TransportError>>
where
	T: ?Sized + HttpTransport,
{
	slot.take();

	let response = transport.send(request).await.map_err(Box::new)?;
	let (parts, body) = response.into_parts();

	slot.store(ResponseMetadata { status: Some(parts.status.as_u16()) });

	let bytes = body.collect().await.map_err(Box::new)?;

	Ok(HttpResponse::from_parts(parts, bytes.to_vec()))
}

/// [`HttpTransport`] backed by a [`ReqwestClient`].
///
/// Token requests should not follow redirects; [`ReqwestTransport::without_redirects`] builds a
/// client configured that way.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds a client that returns redirects to the caller instead of following them.
	pub fn without_redirects() -> Result<Self, crate::error::ConfigError> {
		let client =
			ReqwestClient::builder().redirect(reqwest::redirect::Policy::none()).build()?;

		Ok(Self(client))
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestTransport {
	fn send(&self, request: HttpRequest) -> TransportFuture<'_> {
		Box::pin(execute_reqwest(&self.0, request))
	}
}

#[cfg(feature = "reqwest")]
async fn execute_reqwest(
	client: &ReqwestClient,
	request: HttpRequest,
) -> Result<StreamingResponse, TransportError> {
	use futures::TryStreamExt;

	let request = reqwest::Request::try_from(request)?;
	let response = client.execute(request).await?;
	let mut mapped = StreamingResponse::new(ResponseBody::empty());

	*mapped.status_mut() = response.status();
	*mapped.version_mut() = response.version();
	*mapped.headers_mut() = response.headers().to_owned();
	*mapped.body_mut() = ResponseBody::from_stream(
		response.bytes_stream().map_err(|e| TransportError::body_read(e)),
	);

	Ok(mapped)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[tokio::test]
	async fn body_reads_once() {
		let mut body = ResponseBody::from_stream(stream::iter([
			Ok(Bytes::from_static(b"hello ")),
			Ok(Bytes::from_static(b"world")),
		]));

		assert_eq!(body.read_to_end().await.expect("Body should read."), "hello world");
		assert!(body.read_to_end().await.expect("Drained body should read empty.").is_empty());
	}

	#[tokio::test]
	async fn read_error_surfaces() {
		let body = ResponseBody::from_stream(stream::iter([
			Ok(Bytes::from_static(b"partial")),
			Err(TransportError::Io(std::io::Error::other("reset"))),
		]));

		assert!(matches!(body.collect().await, Err(TransportError::Io(_))));
	}

	#[test]
	fn metadata_slot_take_clears() {
		let slot = ResponseMetadataSlot::default();

		slot.store(ResponseMetadata { status: Some(401) });

		assert_eq!(slot.take().and_then(|meta| meta.status), Some(401));
		assert!(slot.take().is_none());
	}
}
