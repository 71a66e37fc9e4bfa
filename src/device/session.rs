//! Bearer-authenticated request primitive for the vendor device API.

// crates.io
use reqwest::{
	Method, Response,
	header::{ACCEPT, CONTENT_TYPE},
};
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	auth::Secret,
	config::VendorEndpoints,
	error::{TransientError, TransportError},
};

#[derive(Deserialize)]
struct Envelope<T> {
	response: T,
}

/// Immutable per-invocation session: HTTP client, API base and bearer token.
///
/// Every failure (non-success status, transport, undecodable body) comes back as an [`Error`];
/// nothing here panics or retries.
#[derive(Clone)]
pub struct ApiSession {
	client: ReqwestClient,
	endpoints: VendorEndpoints,
	token: Secret,
}
impl ApiSession {
	/// Creates a session bound to `token`.
	pub fn new(client: ReqwestClient, endpoints: VendorEndpoints, token: Secret) -> Self {
		Self { client, endpoints, token }
	}

	/// `GET {api_base}{path}` and unwrap the `response` envelope.
	pub async fn get<T>(&self, path: &str) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let response = self.send::<()>(Method::GET, path, None).await?;
		let bytes = response.bytes().await.map_err(|e| TransportError::from_reqwest(path, e))?;
		let mut deserializer = serde_json::Deserializer::from_slice(&bytes);
		let envelope: Envelope<T> = serde_path_to_error::deserialize(&mut deserializer)
			.map_err(|source| TransientError::ResponseParse { endpoint: path.into(), source })?;

		Ok(envelope.response)
	}

	/// `POST {api_base}{path}` with a JSON body.
	///
	/// Any success status counts as applied; the reply body is not inspected.
	pub async fn post<B>(&self, path: &str, body: &B) -> Result<()>
	where
		B: ?Sized + Serialize,
	{
		self.send(Method::POST, path, Some(body)).await.map(|_| ())
	}

	async fn send<B>(&self, method: Method, path: &str, body: Option<&B>) -> Result<Response>
	where
		B: ?Sized + Serialize,
	{
		let url = self.endpoints.api_url(path)?;
		let mut request = self
			.client
			.request(method.clone(), url)
			.bearer_auth(self.token.expose())
			.header(ACCEPT, "application/json");

		if let Some(body) = body {
			request = request.header(CONTENT_TYPE, "application/json").json(body);
		}

		tracing::debug!(%method, path, "Calling device API.");

		let response =
			request.send().await.map_err(|e| TransportError::from_reqwest(path, e))?;
		let status = response.status();

		if !status.is_success() {
			return Err(Error::UpstreamRejection { endpoint: path.into(), status: status.as_u16() });
		}

		Ok(response)
	}
}
impl Debug for ApiSession {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ApiSession")
			.field("api_base", &self.endpoints.api_base().as_str())
			.field("token", &self.token)
			.finish()
	}
}
