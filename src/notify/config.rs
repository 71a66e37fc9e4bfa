//! Notification secrets loaded from the credential store.

// self
use crate::{
	_prelude::*,
	auth::Secret,
	store::{Parameter, ParameterStore},
};

/// Which parameters a flow reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelScope {
	/// Every channel.
	Full,
	/// Only the chat webhook.
	ChatOnly,
}
impl ChannelScope {
	fn parameters(self) -> &'static [Parameter] {
		match self {
			ChannelScope::Full => &[
				Parameter::PushoverToken,
				Parameter::PushoverUser,
				Parameter::SnsTopicArn,
				Parameter::DiscordWebhook,
				Parameter::NotificationEmail,
			],
			ChannelScope::ChatOnly => &[Parameter::DiscordWebhook],
		}
	}
}

/// Optional channel secrets. A channel is configured iff all of its secrets are present.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NotificationConfig {
	/// Pushover application token.
	pub pushover_token: Option<Secret>,
	/// Pushover user key.
	pub pushover_user: Option<Secret>,
	/// Pub/sub topic identifier.
	pub sns_topic_arn: Option<Secret>,
	/// Chat webhook URL.
	pub discord_webhook: Option<Secret>,
	/// Email address.
	pub notification_email: Option<Secret>,
}
impl NotificationConfig {
	/// Reads the parameters in `scope`.
	///
	/// These are optional, so a failed read is logged and treated as absent.
	pub async fn load(params: &ParameterStore, scope: ChannelScope) -> Self {
		let mut config = Self::default();

		for &parameter in scope.parameters() {
			let value = match params.get(parameter).await {
				Ok(value) => value.map(Secret::new),
				Err(e) => {
					tracing::warn!(
						%parameter,
						error = %e,
						"Failed to read notification parameter."
					);

					None
				},
			};

			if let Some(slot) = config.slot(parameter) {
				*slot = value;
			}
		}

		config
	}

	/// Names of the channels that have everything they need.
	pub fn configured_channels(&self) -> Vec<&'static str> {
		let mut channels = Vec::new();

		if self.pushover_token.is_some() && self.pushover_user.is_some() {
			channels.push("push");
		}
		if self.sns_topic_arn.is_some() {
			channels.push("topic");
		}
		if self.discord_webhook.is_some() {
			channels.push("chat");
		}
		if self.notification_email.is_some() {
			channels.push("email");
		}

		channels
	}

	fn slot(&mut self, parameter: Parameter) -> Option<&mut Option<Secret>> {
		match parameter {
			Parameter::PushoverToken => Some(&mut self.pushover_token),
			Parameter::PushoverUser => Some(&mut self.pushover_user),
			Parameter::SnsTopicArn => Some(&mut self.sns_topic_arn),
			Parameter::DiscordWebhook => Some(&mut self.discord_webhook),
			Parameter::NotificationEmail => Some(&mut self.notification_email),
			_ => None,
		}
	}
}
