//! Pushover channel.

// self
use crate::{
	_prelude::*,
	auth::Secret,
	notify::{
		ChannelError, ChannelFuture, ChannelServices, Notification, NotificationChannel,
		NotificationConfig,
	},
};

#[derive(Clone, Debug)]
struct PushCredentials {
	token: Secret,
	user: Secret,
}

/// Form-encoded push messages; needs both an application token and a user key.
#[derive(Clone, Debug)]
pub struct PushChannel {
	credentials: Option<PushCredentials>,
	client: ReqwestClient,
	endpoint: Url,
}
impl PushChannel {
	/// Builds the channel from stored secrets.
	pub fn new(config: &NotificationConfig, services: &ChannelServices) -> Self {
		let credentials = match (&config.pushover_token, &config.pushover_user) {
			(Some(token), Some(user)) =>
				Some(PushCredentials { token: token.clone(), user: user.clone() }),
			_ => None,
		};

		Self {
			credentials,
			client: services.client.clone(),
			endpoint: services.pushover_url.clone(),
		}
	}
}
impl NotificationChannel for PushChannel {
	fn kind(&self) -> &'static str {
		"push"
	}

	fn is_configured(&self) -> bool {
		self.credentials.is_some()
	}

	fn send<'a>(&'a self, notification: &'a Notification) -> ChannelFuture<'a> {
		Box::pin(async move {
			let Some(PushCredentials { token, user }) = &self.credentials else {
				return Err(ChannelError::InvalidConfig { message: "no token or user key".into() });
			};
			let priority = notification.severity.map_or(0, |severity| severity.push_priority());
			let priority = priority.to_string();
			let form = [
				("token", token.expose()),
				("user", user.expose()),
				("title", notification.title.as_str()),
				("message", notification.message.as_str()),
				("priority", priority.as_str()),
				("sound", "pushover"),
			];

			super::send_checked(self.client.post(self.endpoint.clone()).form(&form)).await
		})
	}
}
