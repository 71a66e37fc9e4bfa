//! Flow B: unconditional daily token rotation with a chat report.

// self
use crate::{
	_prelude::*,
	auth::RefreshOutcome,
	flows::{InvocationResult, Scheduler, messages},
	http::TokenHttpClient,
	notify::{ChannelScope, ChatStyle, Fanout, NotificationConfig},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

/// Body message of a successful run.
pub const REFRESH_COMPLETED: &str = "Daily token refresh completed";

impl<C> Scheduler<C>
where
	C: ?Sized + TokenHttpClient,
{
	/// Refreshes the token pair once and reports the result to the chat webhook.
	///
	/// Returns `200` when new tokens were stored and `500` otherwise.
	pub async fn daily_refresh(&self) -> InvocationResult {
		const KIND: FlowKind = FlowKind::DailyRefresh;

		let span = FlowSpan::new(KIND, "daily_refresh");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);
		tracing::info!("Daily token refresh started.");

		let result = match span.instrument(self.rotate()).await {
			Ok(result) => result,
			Err(e) => self.refresh_crashed(e).await,
		};

		obs::record_flow_outcome(KIND, FlowOutcome::from_success(result.is_success()));

		result
	}

	async fn rotate(&self) -> Result<InvocationResult> {
		let stored = self.params.load_credentials().await?;
		let notify_config = NotificationConfig::load(&self.params, ChannelScope::ChatOnly).await;
		let fanout = Fanout::chat_only(&notify_config, &self.services, ChatStyle::daily_refresh());
		let outcome = self.refresher.refresh_stored(&stored).await;
		let now = self.now();

		match outcome {
			RefreshOutcome::Success { access_token, refresh_token, .. } => {
				self.params.update_tokens(&access_token, &refresh_token, now).await?;

				tracing::info!("Tokens refreshed and stored.");

				let backup_run = self.config.backup_refresh_hour == Some(now.hour());
				let report = messages::refresh_success(
					now,
					self.config.access_token_lifetime,
					&self.config.schedule_preview,
					backup_run,
				);

				fanout.dispatch(report, None).await;

				Ok(InvocationResult::ok(json!({
					"status": "success",
					"message": REFRESH_COMPLETED,
					"tokens_updated": true,
					"timestamp": self.timestamp(),
				})))
			},
			outcome => {
				let reason = outcome.describe();

				tracing::error!(%reason, "Daily token refresh failed.");
				fanout
					.dispatch(
						messages::refresh_failed(&reason, &self.config.schedule_preview),
						None,
					)
					.await;

				Ok(InvocationResult::new(
					500,
					json!({ "status": "failed", "message": reason, "timestamp": self.timestamp() }),
				))
			},
		}
	}

	async fn refresh_crashed(&self, error: Error) -> InvocationResult {
		tracing::error!(error = %error, "Daily token refresh crashed.");

		let config = NotificationConfig::load(&self.params, ChannelScope::ChatOnly).await;

		Fanout::chat_only(&config, &self.services, ChatStyle::daily_refresh())
			.dispatch(messages::refresh_crash(&error.to_string()), None)
			.await;

		InvocationResult::error(500, format!("Daily token refresh crashed: {error}"))
	}
}
