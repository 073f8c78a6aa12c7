#![cfg(feature = "reqwest")]

mod common;

// std
use std::sync::{Arc, Mutex};
// crates.io
use bytes::Bytes;
// self
use common::*;
use oauthtoy::{
	auth::TokenSecret,
	client::{AuthorizedClient, ClientCredentialsSource, Poller},
	error::Error,
	http::{ReplayingTransport, ReqwestTransport},
	server::{EchoReply, TokenReply},
};

fn client_for(
	server: &RunningServer,
	client_secret: &str,
	captured: Arc<Mutex<Vec<Bytes>>>,
) -> Poller<ReplayingTransport<ReqwestTransport>> {
	let token_url = server.url("/oauth/token");
	let transport = ReplayingTransport::new(
		ReqwestTransport::without_redirects().expect("Reqwest transport should build."),
		token_url.clone(),
	)
	.with_tap(move |_, body| {
		captured.lock().expect("Capture lock should not be poisoned.").push(body.clone())
	});
	let source = ClientCredentialsSource::new(
		Arc::new(transport),
		token_url,
		"admin",
		TokenSecret::new(client_secret),
	);

	Poller::new(AuthorizedClient::new(source), server.url("/echo"), time::Duration::seconds(1))
}

#[tokio::test]
async fn client_polls_echo_with_an_intercepted_token() {
	let server = RunningServer::start(server_config()).await;
	let captured = Arc::new(Mutex::new(Vec::new()));
	let poller = client_for(&server, "admin", captured.clone());

	for _ in 0..2 {
		let response = poller.poll_once().await.expect("Poll should succeed.");

		assert_eq!(response.status, 200);

		let reply: EchoReply =
			serde_json::from_slice(&response.body).expect("Echo reply should be JSON.");

		assert_eq!(reply.request_method, "GET");
		assert_eq!(reply.request_url, "/echo");
		assert_eq!(reply.request_host, server.addr.to_string());
		assert!(reply.request_headers["authorization"][0].starts_with("Bearer "));
	}

	{
		let captured = captured.lock().expect("Capture lock should not be poisoned.");

		assert_eq!(captured.len(), 1, "The cached token must be reused.");

		let reply: TokenReply =
			serde_json::from_slice(&captured[0]).expect("Captured body should be the token reply.");

		assert_eq!(reply.token_type, "Bearer");
		assert_eq!(reply.expires_in, 30);
	}

	server.stop().await;
}

#[tokio::test]
async fn wrong_client_secret_never_reaches_the_resource() {
	let server = RunningServer::start(server_config()).await;
	let captured = Arc::new(Mutex::new(Vec::new()));
	let poller = client_for(&server, "wrong", captured.clone());
	let err = poller.poll_once().await.expect_err("Refused credentials should fail the poll.");

	assert!(matches!(err, Error::InvalidClient { .. }), "Unexpected error: {err:?}.");
	assert_eq!(captured.lock().expect("Capture lock should not be poisoned.").len(), 1);

	server.stop().await;
}

#[tokio::test]
async fn server_stops_on_shutdown_signal() {
	let server = RunningServer::start(server_config()).await;
	let addr = server.addr;

	server.stop().await;

	assert!(tokio::net::TcpStream::connect(addr).await.is_err());
}
