//! Refresh-token grant with outcome classification.
//!
//! The refresher performs exactly one token exchange per call and never touches the credential
//! store; persisting a successful outcome is the caller's job.

// self
use crate::{
	_prelude::*,
	auth::{CredentialSet, Secret, StoredCredentials},
	error::TransportError,
	http::{ReqwestHttpClient, TokenHttpClient},
	oauth::RefreshFacade,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

/// Result of one refresh attempt. Exactly one variant per attempt.
#[derive(Clone, Debug)]
pub enum RefreshOutcome {
	/// The server issued a new access token.
	Success {
		/// Newly issued access token.
		access_token: Secret,
		/// Rotated refresh token, or the previous one when the server did not send a new one.
		refresh_token: Secret,
		/// Whether the refresh token differs from the one that was sent.
		rotated: bool,
		/// Lifetime reported by the server.
		expires_in: Option<StdDuration>,
	},
	/// The refresh token is expired or revoked (HTTP 401).
	InvalidGrant,
	/// The token endpoint did not answer in time.
	Timeout,
	/// Connection-level failure.
	NetworkError {
		/// Transport message.
		detail: String,
	},
	/// Anything else: other non-success statuses, malformed bodies, missing credentials.
	UnexpectedError {
		/// Failure description.
		detail: String,
	},
}
impl RefreshOutcome {
	/// Classifies an exchange failure.
	pub fn from_error(error: &Error) -> Self {
		match error {
			Error::Auth { .. } => Self::InvalidGrant,
			Error::Transport(TransportError::Timeout { .. }) => Self::Timeout,
			Error::Transport(e) => Self::NetworkError { detail: error_chain(e) },
			e => Self::UnexpectedError { detail: error_chain(e) },
		}
	}

	/// Returns `true` for [`RefreshOutcome::Success`].
	pub fn is_success(&self) -> bool {
		matches!(self, Self::Success { .. })
	}

	/// Human-readable summary used in logs and notifications.
	pub fn describe(&self) -> String {
		match self {
			Self::Success { rotated, .. } => format!(
				"Token refresh successful. New refresh token provided: {}",
				if *rotated { "Yes" } else { "No" }
			),
			Self::InvalidGrant =>
				"Refresh token is expired or invalid - manual regeneration required".into(),
			Self::Timeout => "Token refresh request timed out".into(),
			Self::NetworkError { detail } =>
				format!("Network error during token refresh: {detail}"),
			Self::UnexpectedError { detail } =>
				format!("Unexpected error during token refresh: {detail}"),
		}
	}
}

/// Exchanges refresh tokens at the vendor's OAuth endpoint.
pub struct TokenRefresher<C = ReqwestHttpClient>
where
	C: ?Sized + TokenHttpClient,
{
	http_client: Arc<C>,
	token_url: Url,
}
impl<C> TokenRefresher<C>
where
	C: ?Sized + TokenHttpClient,
{
	/// Creates a refresher posting to `token_url` through `http_client`.
	pub fn new(token_url: Url, http_client: impl Into<Arc<C>>) -> Self {
		Self { http_client: http_client.into(), token_url }
	}

	/// Token endpoint this refresher posts to.
	pub fn token_url(&self) -> &Url {
		&self.token_url
	}

	/// Validates stored credentials, then refreshes. Missing fields never reach the network.
	pub async fn refresh_stored(&self, stored: &StoredCredentials) -> RefreshOutcome {
		match stored.validate() {
			Ok(credentials) => self.refresh(&credentials).await,
			Err(e) => {
				tracing::error!(error = %e, "Cannot refresh tokens.");

				RefreshOutcome::UnexpectedError { detail: e.to_string() }
			},
		}
	}

	/// Performs one refresh-token exchange.
	pub async fn refresh(&self, credentials: &CredentialSet) -> RefreshOutcome {
		let span = FlowSpan::new(FlowKind::TokenRefresh, "refresh");

		obs::record_flow_outcome(FlowKind::TokenRefresh, FlowOutcome::Attempt);

		let outcome = span.instrument(self.exchange(credentials)).await;

		obs::record_flow_outcome(
			FlowKind::TokenRefresh,
			FlowOutcome::from_success(outcome.is_success()),
		);

		outcome
	}

	async fn exchange(&self, credentials: &CredentialSet) -> RefreshOutcome {
		tracing::info!(token_url = %self.token_url, "Refreshing tokens.");

		let facade = match RefreshFacade::<C>::new(
			&self.token_url,
			credentials.client_id.expose(),
			Arc::clone(&self.http_client),
		) {
			Ok(facade) => facade,
			Err(e) => return RefreshOutcome::from_error(&e.into()),
		};

		match facade.refresh(&credentials.refresh_token).await {
			Ok(granted) => {
				let rotated = granted
					.refresh_token
					.as_ref()
					.is_some_and(|token| token != &credentials.refresh_token);
				let outcome = RefreshOutcome::Success {
					access_token: granted.access_token,
					refresh_token: granted
						.refresh_token
						.unwrap_or_else(|| credentials.refresh_token.clone()),
					rotated,
					expires_in: granted.expires_in,
				};

				tracing::info!(rotated, "{}", outcome.describe());

				outcome
			},
			Err(e) => {
				let outcome = RefreshOutcome::from_error(&e);

				tracing::error!(error = %e, "{}", outcome.describe());

				outcome
			},
		}
	}
}
impl<C> Clone for TokenRefresher<C>
where
	C: ?Sized + TokenHttpClient,
{
	fn clone(&self) -> Self {
		Self { http_client: Arc::clone(&self.http_client), token_url: self.token_url.clone() }
	}
}
impl<C> Debug for TokenRefresher<C>
where
	C: ?Sized + TokenHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenRefresher").field("token_url", &self.token_url.as_str()).finish()
	}
}

fn error_chain(error: &dyn StdError) -> String {
	let mut message = error.to_string();
	let mut source = error.source();

	while let Some(cause) = source {
		message.push_str(": ");
		message.push_str(&cause.to_string());
		source = cause.source();
	}

	message
}
