// crates.io
use tracing::{Instrument, Span, field, instrument::Instrumented};
// self
use crate::{_prelude::*, device::SiteId, obs::FlowKind};

/// `powerwall_reserve.flow` span with `flow` and `stage` set up front and `site` filled in once
/// the battery site is resolved.
#[derive(Clone, Debug)]
pub struct FlowSpan {
	span: Span,
}
impl FlowSpan {
	/// Opens the span for `kind` at `stage`.
	pub fn new(kind: FlowKind, stage: &'static str) -> Self {
		let span = tracing::info_span!(
			"powerwall_reserve.flow",
			flow = kind.as_str(),
			stage,
			site = field::Empty,
		);

		Self { span }
	}

	/// Tags every later event of the flow with the battery site it acts on.
	pub fn record_site(&self, site: &SiteId) {
		self.span.record("site", site.as_str());
	}

	/// Runs `fut` inside the span; no guard is held across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> Instrumented<Fut>
	where
		Fut: Future,
	{
		fut.instrument(self.span.clone())
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::{FlowKind, FlowSpan, SiteId};

	#[tokio::test]
	async fn site_can_be_recorded_inside_the_flow() {
		let span = FlowSpan::new(FlowKind::ApplySchedule, "apply_schedule");
		let value = span
			.instrument(async {
				span.record_site(&SiteId::new("12345"));

				42
			})
			.await;

		assert_eq!(value, 42);
	}
}
