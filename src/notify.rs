//! Fault-isolated notification fan-out.
//!
//! A [`Fanout`] walks its channels in a fixed order (push, topic, chat, email). Each channel is
//! optional and swallows its own failures, so one broken channel never prevents the others from
//! delivering. Messages can be enriched with one live-telemetry read before they go out.

pub mod chat;
pub mod config;
pub mod email;
pub mod push;
pub mod topic;

pub use chat::{ChatChannel, ChatStyle};
pub use config::{ChannelScope, NotificationConfig};
pub use email::{EmailChannel, HttpMailRelay, MailMessage, MailSender};
pub use push::PushChannel;
pub use topic::{HttpTopicPublisher, TopicChannel, TopicMessage, TopicPublisher};

// crates.io
use reqwest::RequestBuilder;
// self
use crate::{
	_prelude::*,
	device::{DeviceController, SiteId},
	obs::{self, FlowKind, FlowOutcome},
};

/// Boxed future returned by channel and backend sends.
pub type ChannelFuture<'a> = Pin<Box<dyn Future<Output = Result<(), ChannelError>> + 'a + Send>>;

/// Optional severity travelling with a notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
	/// Routine success report.
	Success,
	/// Possibly transient trouble.
	Warning,
	/// Failure that needs attention.
	Error,
	/// The flow itself crashed.
	Crash,
}
impl Severity {
	/// Chat embed color for this severity.
	pub const fn color(self) -> u32 {
		match self {
			Severity::Success => chat::COLOR_SUCCESS,
			Severity::Warning => chat::COLOR_WARNING,
			Severity::Error => chat::COLOR_ERROR,
			Severity::Crash => chat::COLOR_CRASH,
		}
	}

	/// Pushover priority for this severity.
	pub const fn push_priority(self) -> i8 {
		match self {
			Severity::Success | Severity::Warning => 0,
			Severity::Error | Severity::Crash => 1,
		}
	}
}

/// One message to deliver.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
	/// Short headline.
	pub title: String,
	/// Body text; may already carry the telemetry block.
	pub message: String,
	/// Explicit severity; when absent, channels derive presentation from the text.
	pub severity: Option<Severity>,
}
impl Notification {
	/// Creates a notification without explicit severity.
	pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
		Self { title: title.into(), message: message.into(), severity: None }
	}

	/// Attaches a severity.
	pub fn with_severity(mut self, severity: Severity) -> Self {
		self.severity = Some(severity);

		self
	}
}

/// Failure of a single channel. Never escalated past the fan-out.
#[derive(Debug, ThisError)]
pub enum ChannelError {
	/// Transport-level failure.
	#[error("Transport failure: {0}.")]
	Transport(#[from] ReqwestError),
	/// The remote service answered with a non-success status.
	#[error("Service answered HTTP {status}.")]
	Rejected {
		/// HTTP status code.
		status: u16,
	},
	/// A pluggable backend failed or is missing.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
	/// The stored channel configuration is unusable.
	#[error("Invalid channel configuration: {message}.")]
	InvalidConfig {
		/// Human-readable error payload.
		message: String,
	},
}

/// A delivery channel.
pub trait NotificationChannel
where
	Self: Send + Sync,
{
	/// Short channel name used in logs and reports.
	fn kind(&self) -> &'static str;

	/// Whether every secret the channel needs is present.
	fn is_configured(&self) -> bool;

	/// Delivers `notification`.
	fn send<'a>(&'a self, notification: &'a Notification) -> ChannelFuture<'a>;
}

/// Per-channel result of one dispatch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChannelOutcome {
	/// The channel lacks configuration and was skipped.
	NotConfigured,
	/// The channel tried and failed.
	Failed(String),
	/// The channel delivered the message.
	Delivered,
}
impl ChannelOutcome {
	/// Metric label: `skipped`, `failed` or `delivered`.
	pub const fn label(&self) -> &'static str {
		match self {
			ChannelOutcome::NotConfigured => "skipped",
			ChannelOutcome::Failed(_) => "failed",
			ChannelOutcome::Delivered => "delivered",
		}
	}
}

/// Outcome of one fan-out, in channel order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FanoutReport {
	/// `(channel kind, outcome)` pairs.
	pub outcomes: Vec<(&'static str, ChannelOutcome)>,
}
impl FanoutReport {
	/// Number of channels that delivered.
	pub fn delivered(&self) -> usize {
		self.outcomes.iter().filter(|(_, outcome)| *outcome == ChannelOutcome::Delivered).count()
	}

	/// `true` iff at least one channel delivered.
	pub fn sent(&self) -> bool {
		self.delivered() > 0
	}

	/// Outcome for the channel named `kind`.
	pub fn outcome(&self, kind: &str) -> Option<&ChannelOutcome> {
		self.outcomes.iter().find(|(k, _)| *k == kind).map(|(_, outcome)| outcome)
	}
}

/// Live-telemetry source used to enrich a message.
#[derive(Clone, Copy, Debug)]
pub struct Enrichment<'a> {
	/// Site to read.
	pub site: &'a SiteId,
	/// Controller holding the authenticated session.
	pub device: &'a DeviceController,
}

/// Shared resources the built-in channels are assembled from.
#[derive(Clone)]
pub struct ChannelServices {
	/// HTTP client for push and chat; should carry the notification timeout.
	pub client: ReqwestClient,
	/// Pushover message endpoint.
	pub pushover_url: Url,
	/// Pub/sub backend; the topic channel fails without one.
	pub topic_publisher: Option<Arc<dyn TopicPublisher>>,
	/// Mail backend; the email channel fails without one.
	pub mail_sender: Option<Arc<dyn MailSender>>,
}
impl ChannelServices {
	/// Services with HTTP channels only.
	pub fn new(client: ReqwestClient, pushover_url: Url) -> Self {
		Self { client, pushover_url, topic_publisher: None, mail_sender: None }
	}

	/// Installs a pub/sub backend.
	pub fn with_topic_publisher(mut self, publisher: Arc<dyn TopicPublisher>) -> Self {
		self.topic_publisher = Some(publisher);

		self
	}

	/// Installs a mail backend.
	pub fn with_mail_sender(mut self, sender: Arc<dyn MailSender>) -> Self {
		self.mail_sender = Some(sender);

		self
	}
}
impl Debug for ChannelServices {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ChannelServices")
			.field("pushover_url", &self.pushover_url.as_str())
			.field("topic_publisher", &self.topic_publisher.is_some())
			.field("mail_sender", &self.mail_sender.is_some())
			.finish()
	}
}

/// Ordered set of channels.
pub struct Fanout {
	channels: Vec<Box<dyn NotificationChannel>>,
}
impl Fanout {
	/// Builds a fan-out over arbitrary channels, attempted in the given order.
	pub fn new(channels: Vec<Box<dyn NotificationChannel>>) -> Self {
		Self { channels }
	}

	/// Push, topic, chat and email, in that order.
	pub fn full(config: &NotificationConfig, services: &ChannelServices) -> Self {
		Self::new(vec![
			Box::new(PushChannel::new(config, services)),
			Box::new(TopicChannel::new(config, services)),
			Box::new(ChatChannel::new(config, services, ChatStyle::scheduler())),
			Box::new(EmailChannel::new(config, services)),
		])
	}

	/// Only the chat webhook, styled with `style`.
	pub fn chat_only(
		config: &NotificationConfig,
		services: &ChannelServices,
		style: ChatStyle,
	) -> Self {
		Self::new(vec![Box::new(ChatChannel::new(config, services, style))])
	}

	/// Sends `title`/`message`; returns `true` iff at least one channel delivered.
	pub async fn notify(
		&self,
		title: &str,
		message: &str,
		enrichment: Option<Enrichment<'_>>,
	) -> bool {
		self.dispatch(Notification::new(title, message), enrichment).await.sent()
	}

	/// Enriches `notification` when asked, then offers it to every channel.
	pub async fn dispatch(
		&self,
		mut notification: Notification,
		enrichment: Option<Enrichment<'_>>,
	) -> FanoutReport {
		obs::record_flow_outcome(FlowKind::Notify, FlowOutcome::Attempt);

		if let Some(Enrichment { site, device }) = enrichment {
			match device.live_status(site).await {
				Some(status) => notification.message.push_str(&status.status_block()),
				None => tracing::warn!(%site, "Could not get live data for notification."),
			}
		}

		let mut report = FanoutReport::default();

		for channel in &self.channels {
			let kind = channel.kind();
			let outcome = if !channel.is_configured() {
				tracing::info!(channel = kind, "Channel not configured, skipping.");

				ChannelOutcome::NotConfigured
			} else {
				match channel.send(&notification).await {
					Ok(()) => {
						tracing::info!(channel = kind, "Notification sent.");

						ChannelOutcome::Delivered
					},
					Err(e) => {
						tracing::error!(channel = kind, error = %e, "Failed to send notification.");

						ChannelOutcome::Failed(e.to_string())
					},
				}
			};

			obs::record_channel_outcome(kind, &outcome);
			report.outcomes.push((kind, outcome));
		}

		tracing::info!(delivered = report.delivered(), "Notification fan-out finished.");
		obs::record_flow_outcome(FlowKind::Notify, FlowOutcome::from_success(report.sent()));

		report
	}
}
impl Debug for Fanout {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_list().entries(self.channels.iter().map(|channel| channel.kind())).finish()
	}
}

async fn send_checked(request: RequestBuilder) -> Result<(), ChannelError> {
	let response = request.send().await?;
	let status = response.status();

	if status.is_success() {
		Ok(())
	} else {
		Err(ChannelError::Rejected { status: status.as_u16() })
	}
}
