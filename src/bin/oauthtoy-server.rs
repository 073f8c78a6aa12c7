//! Token server: issues client-credentials tokens and guards the echo resource.

// crates.io
use clap::Parser;
use color_eyre::Result;
// self
use oauthtoy::{
	config::{self, ServerArgs},
	obs, server,
};

const PROGRAM: &str = "oauthtoy-server";

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let args = ServerArgs::parse();

	if args.version {
		println!("{}", config::version_banner(PROGRAM));

		return Ok(());
	}

	obs::init_subscriber("info");
	tracing::info!("{}", config::version_banner(PROGRAM));

	let config = args.into_config()?;
	let listener = server::bind(&config).await?;

	server::serve(listener, config, shutdown_signal()).await?;

	Ok(())
}

async fn shutdown_signal() {
	if let Err(e) = tokio::signal::ctrl_c().await {
		tracing::error!(error = %e, "Ctrl-C handler could not be installed.");

		std::future::pending::<()>().await;
	}

	tracing::info!("Shutdown requested.");
}
