//! Command-line and environment configuration for the server and client programs.
//!
//! Every option is a flag with an environment fallback. Parsed arguments are validated into
//! [`ServerConfig`] / [`ClientConfig`] once at startup and then passed down explicitly.

// crates.io
use clap::Parser;
// self
use crate::{
	_prelude::*,
	auth::{ClientCredentialRecord, SharedSecret, TokenSecret},
	error::ConfigError,
};

/// Builds the startup banner printed by `--version` and logged on start.
pub fn version_banner(program: &str) -> String {
	format!(
		"{program} version={} os={} arch={}",
		env!("CARGO_PKG_VERSION"),
		std::env::consts::OS,
		std::env::consts::ARCH
	)
}

/// Arguments accepted by `oauthtoy-server`.
#[derive(Clone, Debug, Parser)]
#[command(name = "oauthtoy-server", about = "Issues and validates client-credentials bearer tokens.")]
#[command(disable_version_flag = true)]
pub struct ServerArgs {
	/// Print the version banner and exit.
	#[arg(long)]
	pub version: bool,
	/// Listen address; a bare `:port` binds every interface.
	#[arg(long, env = "ADDR", default_value = "0.0.0.0:8080")]
	pub addr: String,
	/// Token endpoint route.
	#[arg(long, env = "ROUTE", default_value = "/oauth/token")]
	pub route: String,
	/// Protected echo route.
	#[arg(long, env = "ECHO_ROUTE", default_value = "/echo")]
	pub echo_route: String,
	/// Shared signing secret.
	#[arg(long, env = "TOKEN_SECRET", default_value = "SecretYouShouldHide", hide_env_values = true)]
	pub secret: String,
	/// Access token lifetime in seconds; must be positive.
	#[arg(long, env = "ACCESS_TOKEN_TTL", default_value_t = 30)]
	pub access_token_ttl: u32,
	/// Hostname reported in error envelopes.
	#[arg(long, env = "SERVER_HOSTNAME")]
	pub server_hostname: Option<String>,
}
impl ServerArgs {
	/// Validates the arguments into a [`ServerConfig`].
	pub fn into_config(self) -> Result<ServerConfig, ConfigError> {
		let server_hostname = self
			.server_hostname
			.or_else(|| std::env::var("HOSTNAME").ok())
			.filter(|name| !name.is_empty())
			.unwrap_or_else(|| "localhost".into());
		let config = ServerConfig {
			listen_addr: self.addr,
			token_route: self.route,
			echo_route: self.echo_route,
			access_token_ttl: Duration::seconds(self.access_token_ttl.into()),
			secret: SharedSecret::new(self.secret),
			credentials: ClientCredentialRecord::default(),
			server_hostname,
		};

		config.validate()?;

		Ok(config)
	}
}

/// Validated server configuration shared read-only by every handler.
#[derive(Clone, Debug)]
pub struct ServerConfig {
	/// Address the listener binds.
	pub listen_addr: String,
	/// Token endpoint route.
	pub token_route: String,
	/// Protected echo route.
	pub echo_route: String,
	/// Lifetime of issued access tokens; refresh tokens never expire.
	pub access_token_ttl: Duration,
	/// Signing and verification key.
	pub secret: SharedSecret,
	/// The single client allowed to obtain tokens.
	pub credentials: ClientCredentialRecord,
	/// Hostname reported in error envelopes.
	pub server_hostname: String,
}
impl ServerConfig {
	/// Checks that both routes are absolute, literal, and distinct, and that access tokens expire.
	pub fn validate(&self) -> Result<(), ConfigError> {
		for (field, route) in [("token", &self.token_route), ("echo", &self.echo_route)] {
			if let Some(reason) = route_violation(route) {
				return Err(ConfigError::InvalidRoute { field, route: route.clone(), reason });
			}
		}
		if self.token_route == self.echo_route {
			return Err(ConfigError::DuplicateRoute { route: self.token_route.clone() });
		}
		if !self.access_token_ttl.is_positive() {
			return Err(ConfigError::NonPositiveTtl);
		}

		Ok(())
	}

	/// Socket address to bind, expanding a bare `:port` to every interface.
	pub fn bind_addr(&self) -> String {
		if self.listen_addr.starts_with(':') {
			format!("0.0.0.0{}", self.listen_addr)
		} else {
			self.listen_addr.clone()
		}
	}
}
impl Default for ServerConfig {
	fn default() -> Self {
		Self {
			listen_addr: "0.0.0.0:8080".into(),
			token_route: "/oauth/token".into(),
			echo_route: "/echo".into(),
			access_token_ttl: Duration::seconds(30),
			secret: SharedSecret::new("SecretYouShouldHide"),
			credentials: ClientCredentialRecord::default(),
			server_hostname: "localhost".into(),
		}
	}
}

// Route patterns would turn a configured path into a capture or make the router panic.
fn route_violation(route: &str) -> Option<&'static str> {
	if !route.starts_with('/') {
		return Some("must start with `/`");
	}
	if route.contains(['{', '}']) {
		return Some("must not contain `{` or `}`");
	}
	if route.split('/').any(|segment| segment.starts_with([':', '*'])) {
		return Some("must not have segments starting with `:` or `*`");
	}

	None
}

/// Arguments accepted by `oauthtoy-client`.
#[derive(Clone, Debug, Parser)]
#[command(name = "oauthtoy-client", about = "Polls the echo endpoint with a cached bearer token.")]
#[command(disable_version_flag = true)]
pub struct ClientArgs {
	/// Print the version banner and exit.
	#[arg(long)]
	pub version: bool,
	/// Token endpoint whose responses are intercepted.
	#[arg(long, env = "TOKEN_URL", default_value = "http://localhost:8080/oauth/token")]
	pub token_url: String,
	/// Protected resource to poll.
	#[arg(long, env = "ECHO_URL", default_value = "http://localhost:8080/echo")]
	pub echo_url: String,
	/// Client identifier sent to the token endpoint.
	#[arg(long, env = "CLIENT_ID", default_value = "admin")]
	pub client_id: String,
	/// Client secret sent to the token endpoint.
	#[arg(long, env = "CLIENT_SECRET", default_value = "admin", hide_env_values = true)]
	pub client_secret: String,
	/// Seconds between polls.
	#[arg(long, env = "POLL_INTERVAL", default_value_t = 2)]
	pub interval: u64,
	/// Exit on the first failed poll instead of logging and continuing.
	#[arg(long)]
	pub fail_fast: bool,
}
impl ClientArgs {
	/// Validates the arguments into a [`ClientConfig`].
	pub fn into_config(self) -> Result<ClientConfig, ConfigError> {
		let token_url = Url::parse(&self.token_url)
			.map_err(|source| ConfigError::InvalidUrl { field: "token", source })?;
		let echo_url = Url::parse(&self.echo_url)
			.map_err(|source| ConfigError::InvalidUrl { field: "echo", source })?;

		if self.interval == 0 {
			return Err(ConfigError::NonPositiveInterval);
		}

		Ok(ClientConfig {
			token_url,
			echo_url,
			client_id: self.client_id,
			client_secret: TokenSecret::new(self.client_secret),
			interval: Duration::seconds(i64::try_from(self.interval).unwrap_or(i64::MAX)),
			fail_fast: self.fail_fast,
		})
	}
}

/// Validated client configuration.
#[derive(Clone, Debug)]
pub struct ClientConfig {
	/// Token endpoint; also the URL the replaying transport intercepts.
	pub token_url: Url,
	/// Protected resource to poll.
	pub echo_url: Url,
	/// Client identifier.
	pub client_id: String,
	/// Client secret.
	pub client_secret: TokenSecret,
	/// Delay between polls.
	pub interval: Duration,
	/// Stop on the first failed poll.
	pub fail_fast: bool,
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn server_defaults_match_the_reference_deployment() {
		let config = ServerArgs::try_parse_from(["oauthtoy-server", "--server-hostname", "box"])
			.expect("Default arguments should parse.")
			.into_config()
			.expect("Default arguments should validate.");

		assert_eq!(config.token_route, "/oauth/token");
		assert_eq!(config.echo_route, "/echo");
		assert_eq!(config.access_token_ttl, Duration::seconds(30));
		assert_eq!(config.secret.expose(), b"SecretYouShouldHide");
		assert_eq!(config.server_hostname, "box");
		assert!(config.credentials.authorize("client_credentials", "admin", "admin"));
	}

	#[test]
	fn server_routes_are_validated() {
		let relative = ServerArgs::try_parse_from(["oauthtoy-server", "--route", "oauth/token"])
			.expect("Arguments should parse.")
			.into_config();

		assert!(matches!(relative, Err(ConfigError::InvalidRoute { field: "token", .. })));

		for route in ["/oauth/{token", "/oauth/{id}", "/oauth/token}", "/oauth/:token", "/oauth/*rest"] {
			let patterned = ServerArgs::try_parse_from(["oauthtoy-server", "--route", route])
				.expect("Arguments should parse.")
				.into_config();

			assert!(
				matches!(patterned, Err(ConfigError::InvalidRoute { field: "token", .. })),
				"`{route}` must be refused."
			);
		}

		let echo = ServerArgs::try_parse_from(["oauthtoy-server", "--echo-route", "/echo/*all"])
			.expect("Arguments should parse.")
			.into_config();

		assert!(matches!(echo, Err(ConfigError::InvalidRoute { field: "echo", .. })));
		assert!(
			ServerArgs::try_parse_from(["oauthtoy-server", "--route", "/v1/oauth:token/x"])
				.expect("Arguments should parse.")
				.into_config()
				.is_ok()
		);

		let duplicate = ServerArgs::try_parse_from(["oauthtoy-server", "--echo-route", "/oauth/token"])
			.expect("Arguments should parse.")
			.into_config();

		assert!(matches!(duplicate, Err(ConfigError::DuplicateRoute { .. })));
	}

	#[test]
	fn access_tokens_must_expire() {
		let zero = ServerArgs::try_parse_from(["oauthtoy-server", "--access-token-ttl", "0"])
			.expect("Arguments should parse.")
			.into_config();

		assert!(matches!(zero, Err(ConfigError::NonPositiveTtl)));

		let config = ServerConfig { access_token_ttl: Duration::ZERO, ..ServerConfig::default() };

		assert!(matches!(config.validate(), Err(ConfigError::NonPositiveTtl)));
	}

	#[test]
	fn bare_port_binds_every_interface() {
		let config = ServerConfig { listen_addr: ":9090".into(), ..ServerConfig::default() };

		assert_eq!(config.bind_addr(), "0.0.0.0:9090");
		assert_eq!(ServerConfig::default().bind_addr(), "0.0.0.0:8080");
	}

	#[test]
	fn client_arguments_are_validated() {
		let config = ClientArgs::try_parse_from(["oauthtoy-client", "--interval", "5", "--fail-fast"])
			.expect("Arguments should parse.")
			.into_config()
			.expect("Arguments should validate.");

		assert_eq!(config.interval, Duration::seconds(5));
		assert!(config.fail_fast);
		assert_eq!(config.client_secret.expose(), "admin");

		let bad_url = ClientArgs::try_parse_from(["oauthtoy-client", "--token-url", "not a url"])
			.expect("Arguments should parse.")
			.into_config();

		assert!(matches!(bad_url, Err(ConfigError::InvalidUrl { field: "token", .. })));

		let zero = ClientArgs::try_parse_from(["oauthtoy-client", "--interval", "0"])
			.expect("Arguments should parse.")
			.into_config();

		assert!(matches!(zero, Err(ConfigError::NonPositiveInterval)));
	}

	#[test]
	fn banner_names_program_and_version() {
		let banner = version_banner("oauthtoy-server");

		assert!(banner.starts_with("oauthtoy-server version="));
		assert!(banner.contains(env!("CARGO_PKG_VERSION")));
	}
}
