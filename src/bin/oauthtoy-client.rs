//! Polling client: fetches the echo resource with a cached token, logging every token response
//! its transport intercepts.

// std
use std::sync::Arc;
// crates.io
use clap::Parser;
use color_eyre::Result;
// self
use oauthtoy::{
	client::{AuthorizedClient, ClientCredentialsSource, Poller},
	config::{self, ClientArgs},
	http::{ReplayingTransport, ReqwestTransport},
	obs,
};

const PROGRAM: &str = "oauthtoy-client";

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let args = ClientArgs::parse();

	if args.version {
		println!("{}", config::version_banner(PROGRAM));

		return Ok(());
	}

	obs::init_subscriber("info");
	tracing::info!("{}", config::version_banner(PROGRAM));

	let config = args.into_config()?;
	let transport = Arc::new(ReplayingTransport::new(
		ReqwestTransport::without_redirects()?,
		config.token_url.clone(),
	));
	let source = ClientCredentialsSource::new(
		transport,
		config.token_url,
		config.client_id,
		config.client_secret,
	);
	let poller = Poller::new(AuthorizedClient::new(source), config.echo_url, config.interval)
		.with_fail_fast(config.fail_fast);

	poller
		.run(|response| println!("response: {}", String::from_utf8_lossy(&response.body)))
		.await?;

	Ok(())
}
