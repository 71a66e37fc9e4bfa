//! Email channel.
//!
//! The configured address is both sender and recipient. Delivery goes through [`MailSender`];
//! [`HttpMailRelay`] forwards SES-shaped `SendEmail` requests to a relay endpoint.

// self
use crate::{
	_prelude::*,
	auth::Secret,
	notify::{
		ChannelError, ChannelFuture, ChannelServices, Notification, NotificationChannel,
		NotificationConfig,
	},
};

/// One plain-text email.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MailMessage {
	/// Sender address.
	pub source: String,
	/// Recipient address.
	pub destination: String,
	/// Subject line.
	pub subject: String,
	/// Plain-text body.
	pub body: String,
}
impl MailMessage {
	/// SES `SendEmail` request body.
	pub fn to_send_email(&self) -> Value {
		json!({
			"Source": self.source,
			"Destination": { "ToAddresses": [self.destination] },
			"Message": {
				"Subject": { "Data": self.subject },
				"Body": { "Text": { "Data": self.body } },
			},
		})
	}
}

/// Mail backend.
pub trait MailSender
where
	Self: Send + Sync,
{
	/// Sends one message.
	fn send_mail<'a>(&'a self, message: &'a MailMessage) -> ChannelFuture<'a>;
}

/// Posts [`MailMessage::to_send_email`] bodies to a relay that owns the cloud credentials.
#[derive(Clone, Debug)]
pub struct HttpMailRelay {
	client: ReqwestClient,
	endpoint: Url,
}
impl HttpMailRelay {
	/// Creates a relay client posting to `endpoint`.
	pub fn new(client: ReqwestClient, endpoint: Url) -> Self {
		Self { client, endpoint }
	}
}
impl MailSender for HttpMailRelay {
	fn send_mail<'a>(&'a self, message: &'a MailMessage) -> ChannelFuture<'a> {
		Box::pin(async move {
			let body = message.to_send_email();

			super::send_checked(self.client.post(self.endpoint.clone()).json(&body)).await
		})
	}
}

/// Emails the title as subject and the message as body.
#[derive(Clone)]
pub struct EmailChannel {
	address: Option<Secret>,
	sender: Option<Arc<dyn MailSender>>,
}
impl EmailChannel {
	/// Builds the channel; it is configured iff an address is stored.
	pub fn new(config: &NotificationConfig, services: &ChannelServices) -> Self {
		Self { address: config.notification_email.clone(), sender: services.mail_sender.clone() }
	}
}
impl NotificationChannel for EmailChannel {
	fn kind(&self) -> &'static str {
		"email"
	}

	fn is_configured(&self) -> bool {
		self.address.is_some()
	}

	fn send<'a>(&'a self, notification: &'a Notification) -> ChannelFuture<'a> {
		Box::pin(async move {
			let address = self
				.address
				.as_ref()
				.ok_or_else(|| ChannelError::InvalidConfig { message: "no address".into() })?;
			let sender = self.sender.as_ref().ok_or_else(|| ChannelError::Backend {
				message: "no mail sender is installed".into(),
			})?;
			let message = MailMessage {
				source: address.expose().to_owned(),
				destination: address.expose().to_owned(),
				subject: notification.title.clone(),
				body: notification.message.clone(),
			};

			sender.send_mail(&message).await
		})
	}
}
impl Debug for EmailChannel {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("EmailChannel")
			.field("address", &self.address)
			.field("sender", &self.sender.is_some())
			.finish()
	}
}
