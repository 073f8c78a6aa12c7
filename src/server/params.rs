//! Request parameter lookup: the query string first, then a lazily parsed form body.

// crates.io
use axum::{
	body::{self, Body},
	http::{Method, header::CONTENT_TYPE, request::Parts},
};
// self
use crate::server::BODY_LIMIT;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Parameters of one request.
///
/// A key present in the query string wins. The body is read and parsed only the first time a
/// key is missing from the query, and only for `POST`/`PUT`/`PATCH` requests carrying a form
/// content type. Unreadable or unparsable bodies behave as empty.
#[derive(Debug)]
pub struct RequestParams {
	query: Vec<(String, String)>,
	body: Option<Body>,
	form: Option<Vec<(String, String)>>,
}
impl RequestParams {
	/// Captures the query and, when it may carry a form, the body.
	pub fn new(parts: &Parts, body: Body) -> Self {
		let query = parts.uri.query().map(|raw| parse_pairs(raw.as_bytes())).unwrap_or_default();
		let body = accepts_form(parts).then_some(body);

		Self { query, body, form: None }
	}

	/// Value for `key`, or an empty string when it is absent everywhere.
	pub async fn get(&mut self, key: &str) -> String {
		if let Some(value) = lookup(&self.query, key) {
			return value.to_owned();
		}

		lookup(self.form().await, key).map(str::to_owned).unwrap_or_default()
	}

	/// Returns `true` once the body has been consumed for parameter lookup.
	pub fn form_loaded(&self) -> bool {
		self.form.is_some()
	}

	async fn form(&mut self) -> &[(String, String)] {
		if self.form.is_none() {
			let pairs = match self.body.take() {
				Some(body) => match body::to_bytes(body, BODY_LIMIT).await {
					Ok(bytes) => parse_pairs(&bytes),
					Err(e) => {
						tracing::warn!(error = %e, "Form body could not be read.");

						Vec::new()
					},
				},
				None => Vec::new(),
			};

			self.form = Some(pairs);
		}

		self.form.as_deref().unwrap_or_default()
	}
}

fn accepts_form(parts: &Parts) -> bool {
	matches!(parts.method, Method::POST | Method::PUT | Method::PATCH)
		&& parts
			.headers
			.get(CONTENT_TYPE)
			.and_then(|value| value.to_str().ok())
			.is_some_and(|value| value.to_ascii_lowercase().starts_with(FORM_CONTENT_TYPE))
}

fn parse_pairs(raw: &[u8]) -> Vec<(String, String)> {
	url::form_urlencoded::parse(raw).into_owned().collect()
}

fn lookup<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
	pairs.iter().find(|(name, _)| name == key).map(|(_, value)| value.as_str())
}
