//! Observability helpers shared by the flows.
//!
//! # Feature Flags
//!
//! - Spans named `powerwall_reserve.flow` carry `flow` and `stage`, plus `site` once the battery
//!   site is known. They are always emitted through `tracing`.
//! - Enable `metrics` for two counters: `powerwall_reserve_flow_total{flow, outcome}` per flow
//!   attempt and result, and `powerwall_reserve_notification_total{channel, outcome}` per channel
//!   of every fan-out.

mod metrics;
mod span;

pub use metrics::*;
pub use span::*;

// self
use crate::_prelude::*;

/// Units of work observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// Flow A: apply a scheduled reserve setpoint.
	ApplySchedule,
	/// Flow B: the unconditional daily token refresh.
	DailyRefresh,
	/// A single refresh-token grant, wherever it is triggered from.
	TokenRefresh,
	/// One notification fan-out.
	Notify,
}
impl FlowKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::ApplySchedule => "apply_schedule",
			FlowKind::DailyRefresh => "daily_refresh",
			FlowKind::TokenRefresh => "token_refresh",
			FlowKind::Notify => "notify",
		}
	}
}
impl Display for FlowKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Entry to a flow.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure reported back to the caller.
	Failure,
}
impl FlowOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::Success => "success",
			FlowOutcome::Failure => "failure",
		}
	}

	/// Maps a success flag onto the terminal outcome.
	pub const fn from_success(success: bool) -> Self {
		if success { FlowOutcome::Success } else { FlowOutcome::Failure }
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
