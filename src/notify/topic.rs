//! Pub/sub topic channel.
//!
//! Publishing goes through [`TopicPublisher`] so the channel does not depend on a cloud SDK.
//! [`HttpTopicPublisher`] forwards SNS-shaped `Publish` requests to a relay endpoint.

// self
use crate::{
	_prelude::*,
	auth::Secret,
	notify::{
		ChannelError, ChannelFuture, ChannelServices, Notification, NotificationChannel,
		NotificationConfig,
	},
};

/// Subject attached to every topic message.
pub const TOPIC_SUBJECT: &str = "Tesla Powerwall Update";

/// One publish request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TopicMessage {
	/// Topic identifier.
	#[serde(rename = "TopicArn")]
	pub topic_arn: String,
	/// Message subject.
	pub subject: String,
	/// Message body.
	pub message: String,
}

/// Pub/sub backend.
pub trait TopicPublisher
where
	Self: Send + Sync,
{
	/// Publishes one message.
	fn publish<'a>(&'a self, message: &'a TopicMessage) -> ChannelFuture<'a>;
}

/// Posts [`TopicMessage`]s as JSON to a relay that owns the cloud credentials.
#[derive(Clone, Debug)]
pub struct HttpTopicPublisher {
	client: ReqwestClient,
	endpoint: Url,
}
impl HttpTopicPublisher {
	/// Creates a publisher posting to `endpoint`.
	pub fn new(client: ReqwestClient, endpoint: Url) -> Self {
		Self { client, endpoint }
	}
}
impl TopicPublisher for HttpTopicPublisher {
	fn publish<'a>(&'a self, message: &'a TopicMessage) -> ChannelFuture<'a> {
		Box::pin(async move {
			super::send_checked(self.client.post(self.endpoint.clone()).json(message)).await
		})
	}
}

/// Publishes the message body to the configured topic.
#[derive(Clone)]
pub struct TopicChannel {
	topic_arn: Option<Secret>,
	publisher: Option<Arc<dyn TopicPublisher>>,
}
impl TopicChannel {
	/// Builds the channel; it is configured iff a topic identifier is stored.
	pub fn new(config: &NotificationConfig, services: &ChannelServices) -> Self {
		Self {
			topic_arn: config.sns_topic_arn.clone(),
			publisher: services.topic_publisher.clone(),
		}
	}
}
impl NotificationChannel for TopicChannel {
	fn kind(&self) -> &'static str {
		"topic"
	}

	fn is_configured(&self) -> bool {
		self.topic_arn.is_some()
	}

	fn send<'a>(&'a self, notification: &'a Notification) -> ChannelFuture<'a> {
		Box::pin(async move {
			let topic_arn = self
				.topic_arn
				.as_ref()
				.ok_or_else(|| ChannelError::InvalidConfig { message: "no topic".into() })?;
			let publisher = self.publisher.as_ref().ok_or_else(|| ChannelError::Backend {
				message: "no topic publisher is installed".into(),
			})?;
			let message = TopicMessage {
				topic_arn: topic_arn.expose().to_owned(),
				subject: TOPIC_SUBJECT.into(),
				message: notification.message.clone(),
			};

			publisher.publish(&message).await
		})
	}
}
impl Debug for TopicChannel {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TopicChannel")
			.field("topic_arn", &self.topic_arn)
			.field("publisher", &self.publisher.is_some())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn publish_body_uses_sns_field_names() {
		let message = TopicMessage {
			topic_arn: "arn:aws:sns:eu-west-1:123456789012:powerwall".into(),
			subject: TOPIC_SUBJECT.into(),
			message: "body".into(),
		};
		let body = serde_json::to_value(&message).expect("Topic message should serialize.");

		assert_eq!(body["TopicArn"], "arn:aws:sns:eu-west-1:123456789012:powerwall");
		assert_eq!(body["Subject"], "Tesla Powerwall Update");
		assert_eq!(body["Message"], "body");
	}

	#[tokio::test]
	async fn configured_topic_without_publisher_fails() {
		let config = NotificationConfig {
			sns_topic_arn: Some(Secret::new("arn:aws:sns:eu-west-1:1:t")),
			..Default::default()
		};
		let services = ChannelServices::new(
			ReqwestClient::new(),
			Url::parse("https://push.invalid").expect("Fixture URL should parse."),
		);
		let channel = TopicChannel::new(&config, &services);

		assert!(channel.is_configured());
		assert!(matches!(
			channel.send(&Notification::new("t", "m")).await,
			Err(ChannelError::Backend { .. })
		));
	}
}
