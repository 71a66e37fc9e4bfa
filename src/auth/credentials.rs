//! Credential pair loaded from the store and its validated form.

// self
use crate::{_prelude::*, auth::Secret, error::ConfigError, store::Parameter};

/// Credential parameters exactly as found in the store; any of them may be absent.
#[derive(Clone, Debug, Default)]
pub struct StoredCredentials {
	/// OAuth client identifier.
	pub client_id: Option<Secret>,
	/// OAuth client secret.
	pub client_secret: Option<Secret>,
	/// Current access token.
	pub access_token: Option<Secret>,
	/// Current refresh token.
	pub refresh_token: Option<Secret>,
}
impl StoredCredentials {
	/// Names of the parameters that are absent.
	pub fn missing(&self) -> Vec<&'static str> {
		[
			(Parameter::ClientId, &self.client_id),
			(Parameter::ClientSecret, &self.client_secret),
			(Parameter::AccessToken, &self.access_token),
			(Parameter::RefreshToken, &self.refresh_token),
		]
		.into_iter()
		.filter(|(_, value)| value.as_ref().is_none_or(|s| s.expose().is_empty()))
		.map(|(parameter, _)| parameter.as_str())
		.collect()
	}

	/// Promotes the stored values to a complete [`CredentialSet`].
	pub fn validate(&self) -> Result<CredentialSet, ConfigError> {
		match (&self.client_id, &self.client_secret, &self.access_token, &self.refresh_token) {
			(Some(client_id), Some(client_secret), Some(access_token), Some(refresh_token))
				if self.missing().is_empty() =>
				Ok(CredentialSet {
					client_id: client_id.clone(),
					client_secret: client_secret.clone(),
					access_token: access_token.clone(),
					refresh_token: refresh_token.clone(),
				}),
			_ => Err(ConfigError::MissingCredentials { missing: self.missing() }),
		}
	}
}

/// A complete credential pair; every field is present and non-empty.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CredentialSet {
	/// OAuth client identifier.
	pub client_id: Secret,
	/// OAuth client secret (kept for completeness; the refresh grant does not send it).
	pub client_secret: Secret,
	/// Bearer token for the vendor API.
	pub access_token: Secret,
	/// Long-lived token exchanged for new access tokens.
	pub refresh_token: Secret,
}
impl CredentialSet {
	/// Returns a copy carrying a newly issued token pair.
	pub fn with_tokens(mut self, access_token: Secret, refresh_token: Secret) -> Self {
		self.access_token = access_token;
		self.refresh_token = refresh_token;

		self
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn stored(values: [Option<&str>; 4]) -> StoredCredentials {
		let [client_id, client_secret, access_token, refresh_token] =
			values.map(|v| v.map(Secret::new));

		StoredCredentials { client_id, client_secret, access_token, refresh_token }
	}

	#[test]
	fn complete_set_validates() {
		let set = stored([Some("id"), Some("secret"), Some("access"), Some("refresh")])
			.validate()
			.expect("A complete credential set should validate.");

		assert_eq!(set.refresh_token.expose(), "refresh");
	}

	#[test]
	fn missing_and_empty_fields_are_reported_together() {
		let err = stored([Some("id"), None, Some(""), Some("refresh")])
			.validate()
			.expect_err("Incomplete credentials should be rejected.");

		assert!(matches!(
			err,
			ConfigError::MissingCredentials { ref missing }
				if missing == &["client_secret", "access_token"]
		));
	}

	#[test]
	fn with_tokens_keeps_client_identity() {
		let set = stored([Some("id"), Some("secret"), Some("a1"), Some("r1")])
			.validate()
			.expect("Fixture should validate.")
			.with_tokens(Secret::new("a2"), Secret::new("r2"));

		assert_eq!(set.client_id.expose(), "id");
		assert_eq!(set.access_token.expose(), "a2");
		assert_eq!(set.refresh_token.expose(), "r2");
	}
}
