// self
use crate::{
	notify::ChannelOutcome,
	obs::{FlowKind, FlowOutcome},
};

/// Bumps `powerwall_reserve_flow_total{flow, outcome}` when the `metrics` feature is on.
pub fn record_flow_outcome(kind: FlowKind, outcome: FlowOutcome) {
	#[cfg(feature = "metrics")]
	metrics::counter!(
		"powerwall_reserve_flow_total",
		"flow" => kind.as_str(),
		"outcome" => outcome.as_str()
	)
	.increment(1);

	#[cfg(not(feature = "metrics"))]
	let _ = (kind, outcome);
}

/// Bumps `powerwall_reserve_notification_total{channel, outcome}` for one channel of a fan-out.
///
/// Unconfigured channels are counted with outcome `skipped`.
pub fn record_channel_outcome(channel: &'static str, outcome: &ChannelOutcome) {
	#[cfg(feature = "metrics")]
	metrics::counter!(
		"powerwall_reserve_notification_total",
		"channel" => channel,
		"outcome" => outcome.label()
	)
	.increment(1);

	#[cfg(not(feature = "metrics"))]
	let _ = (channel, outcome);
}
