//! Flow A: apply one scheduled backup-reserve setpoint.

// self
use crate::{
	_prelude::*,
	auth::{CredentialSet, RefreshOutcome, Staleness},
	flows::{InvocationResult, Scheduler, messages},
	http::TokenHttpClient,
	notify::{ChannelScope, Enrichment, Fanout, NotificationConfig},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

/// Body message when the credential pair is incomplete.
pub const MISSING_CREDENTIALS: &str = "Missing Tesla credentials in the credential store";

/// Rejected trigger payload.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum InputError {
	/// The percentage is absent or `null`.
	#[error("backup_reserve_percent required in event")]
	MissingPercent,
	/// The percentage is not an integer.
	#[error("backup_reserve_percent must be an integer")]
	NotAnInteger,
	/// The percentage is outside `0..=100`.
	#[error("backup_reserve_percent must be between 0 and 100, got {0}")]
	OutOfRange(i64),
}

/// Validated trigger payload of Flow A.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScheduleEvent {
	/// Target reserve in percent.
	pub backup_reserve_percent: i64,
	/// Label used in logs and notifications.
	pub schedule_name: String,
}
impl ScheduleEvent {
	/// Label used when the trigger does not name the schedule.
	pub const DEFAULT_SCHEDULE_NAME: &str = "Unknown schedule";

	/// Validates a raw trigger payload.
	pub fn from_event(event: &Value) -> Result<Self, InputError> {
		let percent = match event.get("backup_reserve_percent") {
			None | Some(Value::Null) => return Err(InputError::MissingPercent),
			Some(Value::Number(n)) => integral(n).ok_or(InputError::NotAnInteger)?,
			Some(_) => return Err(InputError::NotAnInteger),
		};

		if !(0..=100).contains(&percent) {
			return Err(InputError::OutOfRange(percent));
		}

		Ok(Self { backup_reserve_percent: percent, schedule_name: schedule_name(event).into() })
	}
}

impl<C> Scheduler<C>
where
	C: ?Sized + TokenHttpClient,
{
	/// Applies the setpoint described by `event`.
	///
	/// Returns `400` for a malformed payload, `404` when no battery site exists, `500` for missing
	/// credentials, a failed write or an unexpected error, and `200` otherwise.
	pub async fn apply_schedule(&self, event: &Value) -> InvocationResult {
		const KIND: FlowKind = FlowKind::ApplySchedule;

		let span = FlowSpan::new(KIND, "apply_schedule");
		let flow_span = &span;

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);
		tracing::info!(%event, "Scheduler started.");

		let result = span
			.instrument(async move {
				match ScheduleEvent::from_event(event) {
					Ok(schedule) => self.apply(&schedule, flow_span).await,
					Err(e) => {
						tracing::error!(error = %e, "Rejected trigger payload.");

						Ok(InvocationResult::error(400, e.to_string()))
					},
				}
			})
			.await;
		let result = match result {
			Ok(result) => result,
			Err(e) => self.apply_crashed(event, e).await,
		};

		obs::record_flow_outcome(KIND, FlowOutcome::from_success(result.is_success()));

		result
	}

	async fn apply(&self, schedule: &ScheduleEvent, span: &FlowSpan) -> Result<InvocationResult> {
		let ScheduleEvent { backup_reserve_percent: percent, schedule_name: name } = schedule;

		tracing::info!(schedule = %name, percent, "Executing schedule.");

		let stored = self.params.load_credentials().await?;
		let notify_config = NotificationConfig::load(&self.params, ChannelScope::Full).await;
		let credentials = match stored.validate() {
			Ok(credentials) => credentials,
			Err(e) => {
				tracing::error!(error = %e, "Cannot run the schedule.");

				return Ok(InvocationResult::error(500, MISSING_CREDENTIALS));
			},
		};
		let credentials = self.backup_refresh(credentials).await;
		let fanout = Fanout::full(&notify_config, &self.services);
		let device = self.device(credentials.access_token.clone());
		let Some(site) = device.find_device().await else {
			fanout.dispatch(messages::device_missing(name), None).await;

			return Ok(InvocationResult::error(404, "No Powerwall found"));
		};

		span.record_site(&site);

		match device.set_reserve(&site, *percent).await {
			Some(change) => {
				let message = format!("Successfully set backup reserve to {percent}%");

				tracing::info!(%site, "{message}");

				let enrichment = Enrichment { site: &site, device: &device };

				fanout.dispatch(messages::apply_success(name, &change), Some(enrichment)).await;

				Ok(InvocationResult::ok(json!({
					"message": message,
					"site_id": site,
					"backup_reserve": percent,
					"schedule_name": name,
					"old_reserve": change.old_reserve,
					"timestamp": self.timestamp(),
				})))
			},
			None => {
				let message = format!("Failed to set backup reserve to {percent}%");

				tracing::error!(%site, "{message}");
				fanout.dispatch(messages::reserve_failed(name, *percent), None).await;

				Ok(InvocationResult::error(500, format!("{message} ({name})")))
			},
		}
	}

	/// Refreshes once when the stored timestamp says the access token has probably expired.
	///
	/// Failures here are logged and the stored tokens are used as they are.
	async fn backup_refresh(&self, credentials: CredentialSet) -> CredentialSet {
		let raw = match self.params.last_refresh().await {
			Ok(raw) => raw,
			Err(e) => {
				tracing::warn!(error = %e, "Could not read the last refresh time.");

				None
			},
		};
		let now = self.now();

		match self.config.staleness.assess(raw.as_deref(), now) {
			Staleness::Unknown => {
				tracing::info!("No last refresh timestamp found; using stored tokens.");
			},
			Staleness::Unreadable { .. } => {},
			Staleness::Fresh { hours } => {
				tracing::info!(hours = %format!("{hours:.1}"), "Using stored access token.");
			},
			Staleness::Stale { hours } => {
				tracing::warn!(
					hours = %format!("{hours:.1}"),
					"Access token likely expired; attempting a backup refresh."
				);

				match self.refresher.refresh(&credentials).await {
					RefreshOutcome::Success { access_token, refresh_token, .. } => {
						match self.params.update_tokens(&access_token, &refresh_token, now).await {
							Ok(()) => tracing::info!("Backup token refresh succeeded."),
							Err(e) => tracing::error!(
								error = %e,
								"Backup token refresh succeeded but the tokens were not stored."
							),
						}

						return credentials.with_tokens(access_token, refresh_token);
					},
					outcome => tracing::error!(
						reason = %outcome.describe(),
						"Backup token refresh failed; proceeding with stored tokens."
					),
				}
			},
		}

		credentials
	}

	async fn apply_crashed(&self, event: &Value, error: Error) -> InvocationResult {
		tracing::error!(error = %error, "Schedule execution failed.");

		let schedule =
			event.get("schedule_name").and_then(Value::as_str).unwrap_or("unknown schedule");
		let config = NotificationConfig::load(&self.params, ChannelScope::Full).await;

		Fanout::full(&config, &self.services)
			.dispatch(messages::apply_crash(schedule, &error.to_string()), None)
			.await;

		InvocationResult::error(500, format!("Execution failed: {error}"))
	}
}

fn integral(n: &serde_json::Number) -> Option<i64> {
	n.as_i64().or_else(|| {
		n.as_f64().filter(|v| v.fract() == 0. && v.abs() < 1e15).map(|v| v as i64)
	})
}

fn schedule_name(event: &Value) -> &str {
	event
		.get("schedule_name")
		.and_then(Value::as_str)
		.unwrap_or(ScheduleEvent::DEFAULT_SCHEDULE_NAME)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn valid_event_is_accepted() {
		let event = ScheduleEvent::from_event(&json!({
			"backup_reserve_percent": 100,
			"schedule_name": "11:31 PM - Set to 100%",
		}));

		assert_eq!(
			event,
			Ok(ScheduleEvent {
				backup_reserve_percent: 100,
				schedule_name: "11:31 PM - Set to 100%".into(),
			})
		);
	}

	#[test]
	fn schedule_name_defaults() {
		let event = ScheduleEvent::from_event(&json!({ "backup_reserve_percent": 0 }))
			.expect("Zero is a valid reserve.");

		assert_eq!(event.schedule_name, ScheduleEvent::DEFAULT_SCHEDULE_NAME);
	}

	#[test]
	fn malformed_percentages_are_rejected() {
		assert_eq!(ScheduleEvent::from_event(&json!({})), Err(InputError::MissingPercent));
		assert_eq!(
			ScheduleEvent::from_event(&json!({ "backup_reserve_percent": null })),
			Err(InputError::MissingPercent)
		);
		assert_eq!(
			ScheduleEvent::from_event(&json!({ "backup_reserve_percent": "100" })),
			Err(InputError::NotAnInteger)
		);
		assert_eq!(
			ScheduleEvent::from_event(&json!({ "backup_reserve_percent": 50.5 })),
			Err(InputError::NotAnInteger)
		);
		assert_eq!(
			ScheduleEvent::from_event(&json!({ "backup_reserve_percent": 101 })),
			Err(InputError::OutOfRange(101))
		);
		assert_eq!(
			ScheduleEvent::from_event(&json!({ "backup_reserve_percent": -1 })),
			Err(InputError::OutOfRange(-1))
		);
	}

	#[test]
	fn integral_floats_count_as_integers() {
		let event = ScheduleEvent::from_event(&json!({ "backup_reserve_percent": 80.0 }))
			.expect("80.0 is an integral value.");

		assert_eq!(event.backup_reserve_percent, 80);
	}
}
