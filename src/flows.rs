//! Orchestration of the two scheduled entry points.
//!
//! [`Scheduler::apply_schedule`] applies one reserve setpoint; [`Scheduler::daily_refresh`]
//! rotates the token pair. Both turn every outcome, including unexpected errors, into an
//! [`InvocationResult`] and never return `Err`.

pub mod apply;
pub mod daily_refresh;
pub mod messages;

pub use apply::ScheduleEvent;

// self
use crate::{
	_prelude::*,
	auth::{Secret, TokenRefresher, format_instant},
	config::RuntimeConfig,
	device::{ApiSession, DeviceController},
	error::ConfigError,
	http::{self, ReqwestHttpClient, TokenHttpClient},
	notify::ChannelServices,
	store::ParameterStore,
};

/// Structured result of one invocation: an HTTP-like status code plus a JSON body.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InvocationResult {
	/// `200`, `400`, `404` or `500`.
	#[serde(rename = "statusCode")]
	pub status_code: u16,
	/// Response payload.
	pub body: Value,
}
impl InvocationResult {
	/// Builds a result from parts.
	pub fn new(status_code: u16, body: Value) -> Self {
		Self { status_code, body }
	}

	/// `200` with `body`.
	pub fn ok(body: Value) -> Self {
		Self::new(200, body)
	}

	/// Failure with `{"error": message}`.
	pub fn error(status_code: u16, message: impl Into<String>) -> Self {
		Self::new(status_code, json!({ "error": message.into() }))
	}

	/// `true` for `2xx` results.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status_code)
	}
}

/// Everything both flows need: store, refresher, HTTP clients and settings.
pub struct Scheduler<C = ReqwestHttpClient>
where
	C: ?Sized + TokenHttpClient,
{
	params: ParameterStore,
	refresher: TokenRefresher<C>,
	api_client: ReqwestClient,
	services: ChannelServices,
	config: RuntimeConfig,
	clock: fn() -> OffsetDateTime,
}
impl Scheduler {
	/// Builds a scheduler with reqwest clients bounded by the configured timeouts.
	pub fn new(params: ParameterStore, config: RuntimeConfig) -> Result<Self, ConfigError> {
		let refresher = TokenRefresher::new(
			config.endpoints.token_url()?,
			ReqwestHttpClient::with_timeout(config.token_timeout)?,
		);
		let api_client = http::build_client(config.api_timeout)?;
		let services = ChannelServices::new(
			http::build_client(config.notify_timeout)?,
			config.pushover_url.clone(),
		);

		Ok(Self::with_parts(params, refresher, api_client, services, config))
	}
}
impl<C> Scheduler<C>
where
	C: ?Sized + TokenHttpClient,
{
	/// Assembles a scheduler from explicit parts.
	pub fn with_parts(
		params: ParameterStore,
		refresher: TokenRefresher<C>,
		api_client: ReqwestClient,
		services: ChannelServices,
		config: RuntimeConfig,
	) -> Self {
		Self { params, refresher, api_client, services, config, clock: OffsetDateTime::now_utc }
	}

	/// Replaces the notification services, for example to install topic or mail backends.
	pub fn with_services(mut self, services: ChannelServices) -> Self {
		self.services = services;

		self
	}

	/// Replaces the wall clock.
	pub fn with_clock(mut self, clock: fn() -> OffsetDateTime) -> Self {
		self.clock = clock;

		self
	}

	/// Credential store wrapper.
	pub fn params(&self) -> &ParameterStore {
		&self.params
	}

	/// Runtime settings.
	pub fn config(&self) -> &RuntimeConfig {
		&self.config
	}

	fn now(&self) -> OffsetDateTime {
		(self.clock)()
	}

	fn timestamp(&self) -> String {
		format_instant(self.now())
	}

	fn device(&self, access_token: Secret) -> DeviceController {
		DeviceController::new(ApiSession::new(
			self.api_client.clone(),
			self.config.endpoints.clone(),
			access_token,
		))
	}
}
impl<C> Debug for Scheduler<C>
where
	C: ?Sized + TokenHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Scheduler")
			.field("refresher", &self.refresher)
			.field("services", &self.services)
			.field("config", &self.config)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn result_serializes_with_status_code_key() {
		let result = InvocationResult::error(404, "No Powerwall found");
		let raw = serde_json::to_value(&result).expect("Result should serialize.");

		assert_eq!(raw, json!({ "statusCode": 404, "body": { "error": "No Powerwall found" } }));
		assert!(!result.is_success());
		assert!(InvocationResult::ok(json!({})).is_success());
	}
}
