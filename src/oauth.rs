//! `oauth2` crate facade for the refresh-token grant.

pub use oauth2;

// crates.io
use oauth2::{
	AccessToken, AuthType, Client, ClientId, EndpointNotSet, EndpointSet, HttpClientError,
	RefreshToken, RequestTokenError, Scope, StandardRevocableToken, TokenResponse, TokenUrl,
	basic::{
		BasicErrorResponse, BasicRequestTokenError, BasicRevocationErrorResponse,
		BasicTokenIntrospectionResponse, BasicTokenType,
	},
};
// self
use crate::{
	_prelude::*,
	auth::Secret,
	error::{ConfigError, TransientError, TransportError},
	http::{ReqwestHttpClient, ResponseMetadata, ResponseMetadataSlot, TokenHttpClient},
};

type VendorClient<HasTokenUrl> = Client<
	BasicErrorResponse,
	VendorTokenResponse,
	BasicTokenIntrospectionResponse,
	StandardRevocableToken,
	BasicRevocationErrorResponse,
	EndpointNotSet,
	EndpointNotSet,
	EndpointNotSet,
	EndpointNotSet,
	HasTokenUrl,
>;
type RefreshClient = VendorClient<EndpointSet>;
type FacadeFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

const TOKEN_ENDPOINT: &str = "token";

/// Token endpoint success body. The vendor may omit `token_type`, which then reads as `bearer`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) struct VendorTokenResponse {
	access_token: AccessToken,
	#[serde(default = "bearer")]
	token_type: BasicTokenType,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	expires_in: Option<u64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	refresh_token: Option<RefreshToken>,
}
impl TokenResponse for VendorTokenResponse {
	type TokenType = BasicTokenType;

	fn access_token(&self) -> &AccessToken {
		&self.access_token
	}

	fn token_type(&self) -> &Self::TokenType {
		&self.token_type
	}

	fn expires_in(&self) -> Option<StdDuration> {
		self.expires_in.map(StdDuration::from_secs)
	}

	fn refresh_token(&self) -> Option<&RefreshToken> {
		self.refresh_token.as_ref()
	}

	fn scopes(&self) -> Option<&Vec<Scope>> {
		None
	}
}

fn bearer() -> BasicTokenType {
	BasicTokenType::Bearer
}

/// Token material granted by a successful exchange.
#[derive(Clone, Debug)]
pub struct GrantedTokens {
	/// Newly issued access token.
	pub access_token: Secret,
	/// Rotated refresh token, when the server issued one.
	pub refresh_token: Option<Secret>,
	/// Access-token lifetime reported by the server.
	pub expires_in: Option<StdDuration>,
}

/// Refresh-grant client bound to one token endpoint and one OAuth client id.
///
/// The client id travels in the form body and no client secret is sent.
pub(crate) struct RefreshFacade<C = ReqwestHttpClient>
where
	C: ?Sized + TokenHttpClient,
{
	oauth_client: RefreshClient,
	http_client: Arc<C>,
}
impl<C> RefreshFacade<C>
where
	C: ?Sized + TokenHttpClient,
{
	pub(crate) fn new(
		token_url: &Url,
		client_id: &str,
		http_client: impl Into<Arc<C>>,
	) -> Result<Self, ConfigError> {
		let token_url = TokenUrl::new(token_url.to_string())
			.map_err(|source| ConfigError::InvalidEndpoint { endpoint: TOKEN_ENDPOINT, source })?;
		let oauth_client = VendorClient::<EndpointNotSet>::new(ClientId::new(client_id.to_owned()))
			.set_token_uri(token_url)
			.set_auth_type(AuthType::RequestBody);

		Ok(Self { oauth_client, http_client: http_client.into() })
	}

	pub(crate) fn refresh<'a>(
		&'a self,
		refresh_token: &'a Secret,
	) -> FacadeFuture<'a, GrantedTokens> {
		let meta = ResponseMetadataSlot::default();

		Box::pin(async move {
			let instrumented = self.http_client.with_metadata(meta.clone());
			let refresh_secret = RefreshToken::new(refresh_token.expose().to_owned());
			let response = self
				.oauth_client
				.exchange_refresh_token(&refresh_secret)
				.request_async(&instrumented)
				.await
				.map_err(|e| map_request_error(self.http_client.as_ref(), meta.take(), e))?;

			Ok(GrantedTokens {
				access_token: Secret::new(response.access_token().secret().to_owned()),
				refresh_token: response
					.refresh_token()
					.map(|token| Secret::new(token.secret().to_owned())),
				expires_in: response.expires_in(),
			})
		})
	}
}

fn map_request_error<C>(
	client: &C,
	meta: Option<ResponseMetadata>,
	err: BasicRequestTokenError<HttpClientError<C::TransportError>>,
) -> Error
where
	C: ?Sized + TokenHttpClient,
{
	let status = meta.and_then(|value| value.status);

	// A 401 is a rejected grant whatever body came with it.
	if status == Some(401) && !matches!(err, RequestTokenError::Request(_)) {
		return Error::Auth {
			reason: "Refresh token is expired or invalid; manual re-authorization required".into(),
		};
	}

	match err {
		RequestTokenError::ServerResponse(response) => {
			let message = match response.error_description() {
				Some(description) => format!("{}: {description}", response.error().as_ref()),
				None => response.error().as_ref().to_owned(),
			};

			TransientError::TokenEndpoint { message, status }.into()
		},
		RequestTokenError::Request(error) => map_transport_error(client, status, error),
		RequestTokenError::Parse(source, _body) => match status {
			Some(code) if !(200..300).contains(&code) => TransientError::TokenEndpoint {
				message: format!("HTTP {code} with an undecodable body"),
				status,
			}
			.into(),
			_ => TransientError::ResponseParse { endpoint: TOKEN_ENDPOINT.into(), source }.into(),
		},
		RequestTokenError::Other(message) =>
			TransientError::TokenEndpoint { message, status }.into(),
	}
}

fn map_transport_error<C>(
	client: &C,
	status: Option<u16>,
	err: HttpClientError<C::TransportError>,
) -> Error
where
	C: ?Sized + TokenHttpClient,
{
	match err {
		HttpClientError::Reqwest(inner) if client.is_timeout(&inner) =>
			TransportError::Timeout { endpoint: TOKEN_ENDPOINT.into() }.into(),
		HttpClientError::Reqwest(inner) => TransportError::network(TOKEN_ENDPOINT, *inner).into(),
		HttpClientError::Http(inner) => ConfigError::from(inner).into(),
		HttpClientError::Io(inner) => TransportError::Io(inner).into(),
		HttpClientError::Other(message) => TransientError::TokenEndpoint {
			message: format!("HTTP client error: {message}"),
			status,
		}
		.into(),
		_ => TransientError::TokenEndpoint { message: "HTTP client error".into(), status }.into(),
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn token_url() -> Url {
		Url::parse("https://auth.example.com/oauth2/v3/token").expect("Fixture URL should parse.")
	}

	#[test]
	fn builds_request_body_client() {
		let facade = <RefreshFacade>::new(
			&token_url(),
			"client-id",
			Arc::new(ReqwestHttpClient::default()),
		);

		assert!(facade.is_ok());
	}

	#[test]
	fn token_type_defaults_to_bearer() {
		let response: VendorTokenResponse =
			serde_json::from_value(json!({ "access_token": "access-new", "expires_in": 28800 }))
				.expect("A body without token_type should decode.");

		assert_eq!(response.token_type(), &BasicTokenType::Bearer);
		assert_eq!(response.expires_in(), Some(StdDuration::from_secs(28_800)));
		assert!(response.refresh_token().is_none());
	}

	#[test]
	fn unauthorized_status_is_a_rejected_grant_regardless_of_body() {
		let client = ReqwestHttpClient::default();
		let err = map_request_error(
			&client,
			Some(ResponseMetadata { status: Some(401) }),
			RequestTokenError::Other("unexpected response Content-Type".into()),
		);

		assert!(matches!(err, Error::Auth { ref reason } if reason.contains("expired or invalid")));
	}

	#[test]
	fn other_statuses_stay_transient() {
		let client = ReqwestHttpClient::default();
		let err = map_request_error(
			&client,
			Some(ResponseMetadata { status: Some(503) }),
			RequestTokenError::Other("server returned empty error response".into()),
		);

		assert!(matches!(
			err,
			Error::Transient(TransientError::TokenEndpoint { status: Some(503), .. })
		));
	}
}
