//! Key-value secret store contract, built-in backends, and the typed parameter layer on top.
//!
//! [`CredentialStore`] is deliberately small: `get` returns `None` for an absent key (never an
//! error), and `put` carries an `encrypt` flag the backend may honor. [`ParameterStore`] maps the
//! logical parameter names used by the flows onto that contract.
//!
//! Reads and writes are not compare-and-swap: two invocations refreshing tokens at the same time
//! can overwrite each other. A single external trigger is assumed.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	auth::{Secret, StoredCredentials},
};

/// Boxed future returned by [`CredentialStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Storage backend contract for secrets and small state values.
pub trait CredentialStore
where
	Self: Send + Sync,
{
	/// Fetches the value stored under `name`, returning `None` when the key does not exist.
	fn get<'a>(&'a self, name: &'a str) -> StoreFuture<'a, Option<String>>;

	/// Creates or overwrites `name`; `encrypt` requests at-rest protection for secrets.
	fn put<'a>(&'a self, name: &'a str, value: String, encrypt: bool) -> StoreFuture<'a, ()>;
}

/// Error type produced by [`CredentialStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Name that matches no [`Parameter`].
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("Unknown parameter `{0}`.")]
pub struct UnknownParameter(pub String);

/// A value plus the protection flag it was written with.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredParameter {
	/// Raw value.
	pub value: String,
	/// Whether the writer asked for at-rest encryption.
	pub secure: bool,
}

/// Logical parameter names shared by both flows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Parameter {
	/// OAuth client identifier.
	ClientId,
	/// OAuth client secret.
	ClientSecret,
	/// Current access token.
	AccessToken,
	/// Current refresh token.
	RefreshToken,
	/// Instant of the last successful refresh (stored unencrypted).
	LastTokenRefresh,
	/// Pushover application token.
	PushoverToken,
	/// Pushover user key.
	PushoverUser,
	/// Pub/sub topic identifier.
	SnsTopicArn,
	/// Chat webhook URL.
	DiscordWebhook,
	/// Email address used as sender and recipient.
	NotificationEmail,
}
impl Parameter {
	/// Every known parameter.
	pub const ALL: [Parameter; 10] = [
		Parameter::ClientId,
		Parameter::ClientSecret,
		Parameter::AccessToken,
		Parameter::RefreshToken,
		Parameter::LastTokenRefresh,
		Parameter::PushoverToken,
		Parameter::PushoverUser,
		Parameter::SnsTopicArn,
		Parameter::DiscordWebhook,
		Parameter::NotificationEmail,
	];

	/// Returns the name used as the store key.
	pub const fn as_str(self) -> &'static str {
		match self {
			Parameter::ClientId => "client_id",
			Parameter::ClientSecret => "client_secret",
			Parameter::AccessToken => "access_token",
			Parameter::RefreshToken => "refresh_token",
			Parameter::LastTokenRefresh => "last_token_refresh",
			Parameter::PushoverToken => "pushover_token",
			Parameter::PushoverUser => "pushover_user",
			Parameter::SnsTopicArn => "sns_topic_arn",
			Parameter::DiscordWebhook => "discord_webhook",
			Parameter::NotificationEmail => "notification_email",
		}
	}

	/// Everything except the refresh timestamp is a secret.
	pub const fn is_secret(self) -> bool {
		!matches!(self, Parameter::LastTokenRefresh)
	}
}
impl FromStr for Parameter {
	type Err = UnknownParameter;

	fn from_str(name: &str) -> Result<Self, Self::Err> {
		Self::ALL
			.into_iter()
			.find(|parameter| parameter.as_str() == name)
			.ok_or_else(|| UnknownParameter(name.to_owned()))
	}
}
impl Display for Parameter {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Typed access to the parameters the flows read and write.
#[derive(Clone)]
pub struct ParameterStore {
	backend: Arc<dyn CredentialStore>,
}
impl ParameterStore {
	/// Wraps a store backend.
	pub fn new(backend: Arc<dyn CredentialStore>) -> Self {
		Self { backend }
	}

	/// Reads a parameter; empty values count as absent.
	pub async fn get(&self, parameter: Parameter) -> Result<Option<String>> {
		let value = self.backend.get(parameter.as_str()).await?;

		if value.is_none() {
			tracing::debug!(parameter = parameter.as_str(), "Parameter not found.");
		}

		Ok(value.filter(|v| !v.is_empty()))
	}

	/// Writes a parameter, encrypting everything that is a secret.
	pub async fn put(&self, parameter: Parameter, value: impl Into<String>) -> Result<()> {
		self.backend.put(parameter.as_str(), value.into(), parameter.is_secret()).await?;

		tracing::info!(parameter = parameter.as_str(), "Stored parameter.");

		Ok(())
	}

	/// Loads the four credential parameters without validating them.
	pub async fn load_credentials(&self) -> Result<StoredCredentials> {
		let secret = |value: Option<String>| value.map(Secret::new);

		Ok(StoredCredentials {
			client_id: secret(self.get(Parameter::ClientId).await?),
			client_secret: secret(self.get(Parameter::ClientSecret).await?),
			access_token: secret(self.get(Parameter::AccessToken).await?),
			refresh_token: secret(self.get(Parameter::RefreshToken).await?),
		})
	}

	/// Returns the raw last-refresh timestamp, if one was ever written.
	pub async fn last_refresh(&self) -> Result<Option<String>> {
		self.get(Parameter::LastTokenRefresh).await
	}

	/// Persists a refreshed token pair and stamps the refresh instant.
	pub async fn update_tokens(
		&self,
		access_token: &Secret,
		refresh_token: &Secret,
		refreshed_at: OffsetDateTime,
	) -> Result<()> {
		self.put(Parameter::AccessToken, access_token.expose()).await?;
		self.put(Parameter::RefreshToken, refresh_token.expose()).await?;
		self.put(Parameter::LastTokenRefresh, crate::auth::format_instant(refreshed_at)).await?;

		Ok(())
	}
}
impl Debug for ParameterStore {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("ParameterStore(..)")
	}
}
