//! Shared fixtures for the integration tests.

#![allow(dead_code)]

// std
use std::{net::SocketAddr, sync::Arc};
// crates.io
use axum::{Router, body::Body, http::Request, response::Response};
use tokio::{net::TcpListener, sync::oneshot, task::JoinHandle};
use url::Url;
// self
use oauthtoy::{
	auth::{ClaimSet, ClientId, SharedSecret},
	config::ServerConfig,
	server,
};

pub const SERVER_HOSTNAME: &str = "oauthtoy-test";

/// Server configuration with the reference defaults and a fixed hostname.
pub fn server_config() -> ServerConfig {
	ServerConfig { server_hostname: SERVER_HOSTNAME.into(), ..ServerConfig::default() }
}

/// Router over [`server_config`].
pub fn router() -> Router {
	server::router(Arc::new(server_config()))
}

/// Signs a token for `admin` with `secret` and `ttl_secs`.
pub fn token_for(secret: &str, ttl_secs: i64) -> String {
	let client_id = ClientId::new("admin").expect("Client identifier fixture should be valid.");

	oauthtoy::auth::sign(
		&ClaimSet::new(client_id, time::Duration::seconds(ttl_secs)),
		&SharedSecret::new(secret),
	)
	.expect("Token fixture should sign.")
}

/// Signs a token for `admin` that expired a minute ago.
pub fn expired_token(secret: &str) -> String {
	let issued_at = time::OffsetDateTime::now_utc().unix_timestamp() - 90;
	let claims = ClaimSet {
		issued_at,
		expires_at: Some(issued_at + 30),
		client_id: ClientId::new("admin").expect("Client identifier fixture should be valid."),
	};

	oauthtoy::auth::sign(&claims, &SharedSecret::new(secret)).expect("Token fixture should sign.")
}

/// Reads the whole response body.
pub async fn body_bytes(response: Response) -> bytes::Bytes {
	axum::body::to_bytes(response.into_body(), usize::MAX)
		.await
		.expect("Response body should read.")
}

/// Reads the response body as JSON.
pub async fn body_json<T>(response: Response) -> T
where
	T: serde::de::DeserializeOwned,
{
	serde_json::from_slice(&body_bytes(response).await).expect("Response body should be JSON.")
}

/// Builds a form-encoded `POST` to `uri`.
pub fn form_post(uri: &str, form: &'static str) -> Request<Body> {
	Request::builder()
		.method("POST")
		.uri(uri)
		.header("content-type", "application/x-www-form-urlencoded")
		.body(Body::from(form))
		.expect("Form request fixture should build.")
}

/// Server running on an ephemeral loopback port.
pub struct RunningServer {
	pub addr: SocketAddr,
	shutdown: Option<oneshot::Sender<()>>,
	handle: JoinHandle<()>,
}
impl RunningServer {
	pub async fn start(config: ServerConfig) -> Self {
		let listener =
			TcpListener::bind("127.0.0.1:0").await.expect("Loopback listener should bind.");
		let addr = listener.local_addr().expect("Listener should report its address.");
		let (tx, rx) = oneshot::channel::<()>();
		let handle = tokio::spawn(async move {
			server::serve(listener, config, async move {
				let _ = rx.await;
			})
			.await
			.expect("Server should stop cleanly.");
		});

		Self { addr, shutdown: Some(tx), handle }
	}

	pub fn url(&self, path: &str) -> Url {
		Url::parse(&format!("http://{}{path}", self.addr)).expect("Server URL should parse.")
	}

	pub async fn stop(mut self) {
		if let Some(tx) = self.shutdown.take() {
			let _ = tx.send(());
		}

		self.handle.await.expect("Server task should join.");
	}
}
