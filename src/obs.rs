//! Observability helpers shared by the server handlers, the transport, and the client.
//!
//! # Feature Flags
//!
//! - Spans named `oauthtoy.flow` carry the `flow` and `stage` (call site) fields; they are always
//!   emitted through `tracing`.
//! - Enable `metrics` to increment the `oauthtoy_flow_total` counter for every
//!   attempt/success/failure, labeled by `flow` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Flows observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// Server answering a client-credentials token request.
	TokenIssuance,
	/// Server gating a protected resource behind bearer verification.
	ResourceAccess,
	/// Client acquiring (or reusing) an access token.
	TokenAcquisition,
	/// Transport capturing and replaying a designated response body.
	Intercept,
}
impl FlowKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::TokenIssuance => "token_issuance",
			FlowKind::ResourceAccess => "resource_access",
			FlowKind::TokenAcquisition => "token_acquisition",
			FlowKind::Intercept => "intercept",
		}
	}
}
impl Display for FlowKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Entry to a flow.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure resolved into an error response or propagated to the caller.
	Failure,
}
impl FlowOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::Success => "success",
			FlowOutcome::Failure => "failure",
		}
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
