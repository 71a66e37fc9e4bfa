//! Discord-style webhook channel.

// self
use crate::{
	_prelude::*,
	auth::{Secret, format_instant},
	notify::{
		ChannelError, ChannelFuture, ChannelServices, Notification, NotificationChannel,
		NotificationConfig,
	},
};

/// Success color.
pub const COLOR_SUCCESS: u32 = 0x00ff00;
/// Warning color.
pub const COLOR_WARNING: u32 = 0xffa500;
/// Error color.
pub const COLOR_ERROR: u32 = 0xff0000;
/// Crash color.
pub const COLOR_CRASH: u32 = 0x800080;
/// Title used when the text carries no `**Title**` framing.
pub const DEFAULT_TITLE: &str = "Tesla Powerwall Bot";

/// Embed footer and webhook identity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatStyle {
	/// Embed footer text.
	pub footer: String,
	/// Webhook display name override.
	pub username: Option<String>,
	/// Webhook avatar override.
	pub avatar_url: Option<String>,
}
impl ChatStyle {
	/// Style of the schedule-apply reports.
	pub fn scheduler() -> Self {
		Self {
			footer: "Tesla Powerwall Scheduler".into(),
			username: Some(DEFAULT_TITLE.into()),
			avatar_url: Some("https://cdn-icons-png.flaticon.com/512/2814/2814666.png".into()),
		}
	}

	/// Style of the daily token refresh reports.
	pub fn daily_refresh() -> Self {
		Self { footer: "Tesla Daily Token Refresh".into(), username: None, avatar_url: None }
	}
}

/// Splits `**Title**\n<body>` framing; unframed text gets [`DEFAULT_TITLE`].
pub fn split_title(text: &str) -> (String, String) {
	if text.starts_with("**")
		&& let Some((head, body)) = text.split_once("**\n")
	{
		return (head.replace("**", ""), body.to_owned());
	}

	(DEFAULT_TITLE.into(), text.to_owned())
}

/// Derives the embed color from the text: errors red, warnings orange, everything else green.
pub fn derive_color(text: &str) -> u32 {
	if text.contains('❌') || text.contains("Error") {
		COLOR_ERROR
	} else if text.contains("⚠️") || text.contains("Warning") {
		COLOR_WARNING
	} else {
		COLOR_SUCCESS
	}
}

/// Posts one embed per notification to the configured webhook.
#[derive(Clone, Debug)]
pub struct ChatChannel {
	webhook: Option<Secret>,
	client: ReqwestClient,
	style: ChatStyle,
}
impl ChatChannel {
	/// Builds the channel; it is configured iff a webhook URL is stored.
	pub fn new(config: &NotificationConfig, services: &ChannelServices, style: ChatStyle) -> Self {
		Self { webhook: config.discord_webhook.clone(), client: services.client.clone(), style }
	}

	/// Webhook payload for `notification`.
	///
	/// With an explicit severity the title and color are taken as given. Without one, the text is
	/// framed as `**title**\nmessage` and both are derived from it.
	pub fn payload(&self, notification: &Notification, now: OffsetDateTime) -> Value {
		let (title, description, color) = match notification.severity {
			Some(severity) =>
				(notification.title.clone(), notification.message.clone(), severity.color()),
			None => {
				let framed = format!("**{}**\n{}", notification.title, notification.message);
				let (title, description) = split_title(&framed);

				(title, description, derive_color(&framed))
			},
		};
		let mut payload = json!({
			"embeds": [{
				"title": title,
				"description": description,
				"color": color,
				"timestamp": format_instant(now),
				"footer": { "text": self.style.footer },
			}],
		});

		if let Some(username) = &self.style.username {
			payload["username"] = json!(username);
		}
		if let Some(avatar_url) = &self.style.avatar_url {
			payload["avatar_url"] = json!(avatar_url);
		}

		payload
	}
}
impl NotificationChannel for ChatChannel {
	fn kind(&self) -> &'static str {
		"chat"
	}

	fn is_configured(&self) -> bool {
		self.webhook.is_some()
	}

	fn send<'a>(&'a self, notification: &'a Notification) -> ChannelFuture<'a> {
		Box::pin(async move {
			let webhook = self
				.webhook
				.as_ref()
				.ok_or_else(|| ChannelError::InvalidConfig { message: "no webhook URL".into() })?;
			let url = Url::parse(webhook.expose()).map_err(|e| ChannelError::InvalidConfig {
				message: format!("webhook URL does not parse: {e}"),
			})?;
			let payload = self.payload(notification, OffsetDateTime::now_utc());

			super::send_checked(self.client.post(url).json(&payload)).await
		})
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::notify::Severity;

	fn channel(style: ChatStyle) -> ChatChannel {
		let config = NotificationConfig {
			discord_webhook: Some(Secret::new("https://discord.invalid/hook")),
			..Default::default()
		};
		let services = ChannelServices::new(
			ReqwestClient::new(),
			Url::parse("https://push.invalid").expect("Fixture URL should parse."),
		);

		ChatChannel::new(&config, &services, style)
	}

	#[test]
	fn framing_is_split_into_title_and_body() {
		assert_eq!(
			split_title("**✅ Updated**\nline one\nline two"),
			("✅ Updated".into(), "line one\nline two".into())
		);
		assert_eq!(split_title("plain text"), (DEFAULT_TITLE.into(), "plain text".into()));
	}

	#[test]
	fn colors_follow_content() {
		assert_eq!(derive_color("❌ Tesla Powerwall Error"), COLOR_ERROR);
		assert_eq!(derive_color("🚨 Critical Error"), COLOR_ERROR);
		assert_eq!(derive_color("⚠️ heads up"), COLOR_WARNING);
		assert_eq!(derive_color("Warning: low battery"), COLOR_WARNING);
		assert_eq!(derive_color("✅ Tesla Powerwall Updated"), COLOR_SUCCESS);
	}

	#[test]
	fn derived_payload_carries_identity_and_footer() {
		let now = time::macros::datetime!(2025-03-10 23:31:00 UTC);
		let payload = channel(ChatStyle::scheduler())
			.payload(&Notification::new("❌ Tesla Powerwall Error", "No Powerwall found"), now);

		assert_eq!(payload["embeds"][0]["title"], "❌ Tesla Powerwall Error");
		assert_eq!(payload["embeds"][0]["description"], "No Powerwall found");
		assert_eq!(payload["embeds"][0]["color"], COLOR_ERROR);
		assert_eq!(payload["embeds"][0]["timestamp"], "2025-03-10T23:31:00Z");
		assert_eq!(payload["embeds"][0]["footer"]["text"], "Tesla Powerwall Scheduler");
		assert_eq!(payload["username"], DEFAULT_TITLE);
	}

	#[test]
	fn explicit_severity_overrides_derivation() {
		let now = OffsetDateTime::UNIX_EPOCH;
		let notification = Notification::new("💥 Tesla System Crash", "All good otherwise ✅")
			.with_severity(Severity::Crash);
		let payload = channel(ChatStyle::daily_refresh()).payload(&notification, now);

		assert_eq!(payload["embeds"][0]["title"], "💥 Tesla System Crash");
		assert_eq!(payload["embeds"][0]["color"], COLOR_CRASH);
		assert_eq!(payload["embeds"][0]["footer"]["text"], "Tesla Daily Token Refresh");
		assert!(payload.get("username").is_none());
	}
}
