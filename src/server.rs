//! Token server: route table, request handlers, and the listener loop.
//!
//! Handlers share a read-only [`ServerConfig`]; every failure resolves to a JSON
//! [`ErrorEnvelope`] response rather than an error surfaced to the runtime.

pub mod echo;
pub mod envelope;
pub mod params;
pub mod token;

pub use echo::{EchoReply, bearer_candidate};
pub use envelope::ErrorEnvelope;
pub use params::RequestParams;
pub use token::TokenReply;

// crates.io
use axum::{
	Router,
	extract::{Request, State},
	http::StatusCode,
	response::Response,
	routing::any,
};
use tokio::net::TcpListener;
// self
use crate::{
	_prelude::*,
	config::ServerConfig,
	error::{ConfigError, TransportError},
	server::envelope::RequestContext,
};

/// Upper bound on any request body the server reads; larger bodies fail as unreadable.
pub const BODY_LIMIT: usize = 10 << 20;

/// Builds the route table: token and echo routes for any method, plus a `404` fallback.
pub fn router(config: Arc<ServerConfig>) -> Router {
	let token_route = config.token_route.clone();
	let echo_route = config.echo_route.clone();

	tracing::info!(route = %token_route, "Registered token route.");
	tracing::info!(route = %echo_route, "Registered echo route.");

	Router::new()
		.route(&token_route, any(token::issue_token))
		.route(&echo_route, any(echo::echo))
		.fallback(not_found)
		.with_state(config)
}

/// Binds the configured listen address.
pub async fn bind(config: &ServerConfig) -> Result<TcpListener> {
	let addr = config.bind_addr();

	TcpListener::bind(&addr).await.map_err(|source| ConfigError::Bind { addr, source }.into())
}

/// Serves requests on `listener` until `shutdown` resolves, then drains open connections.
pub async fn serve<F>(listener: TcpListener, config: ServerConfig, shutdown: F) -> Result<()>
where
	F: 'static + Send + Future<Output = ()>,
{
	config.validate()?;

	let addr = listener.local_addr().map_err(TransportError::Io)?;

	tracing::info!(%addr, "Listening.");

	axum::serve(
		listener,
		router(Arc::new(config)).into_make_service_with_connect_info::<SocketAddr>(),
	)
	.with_graceful_shutdown(shutdown)
	.await
	.map_err(TransportError::Io)?;

	tracing::info!("Server stopped.");

	Ok(())
}

async fn not_found(State(config): State<Arc<ServerConfig>>, request: Request) -> Response {
	let ctx = RequestContext::from_parts(&request.into_parts().0);

	tracing::warn!(remote = %ctx.remote, method = %ctx.method, path = %ctx.path, "404 not found");

	envelope::error_reply(&ctx, &config.server_hostname, StatusCode::NOT_FOUND, "not found")
}
