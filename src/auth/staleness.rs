//! Just-in-time refresh heuristic driven by the last-refresh timestamp.
//!
//! Access tokens live about eight hours. The daily refresh is expected to keep them fresh; this
//! check is the fallback for when that schedule did not run. It fails open: an absent or
//! unreadable timestamp never forces a refresh.

// crates.io
use time::{PrimitiveDateTime, format_description::well_known::Rfc3339, macros::format_description};
// self
use crate::_prelude::*;

/// Returns `true` iff more than `threshold_hours` elapsed since `last`.
///
/// An absent timestamp means "unknown age" and never triggers a refresh.
pub fn should_refresh(
	last: Option<OffsetDateTime>,
	now: OffsetDateTime,
	threshold_hours: f64,
) -> bool {
	last.is_some_and(|last| hours_since(last, now) > threshold_hours)
}

/// Fractional hours between `last` and `now`.
pub fn hours_since(last: OffsetDateTime, now: OffsetDateTime) -> f64 {
	(now - last).as_seconds_f64() / 3600.
}

/// Parses a stored timestamp: RFC 3339, or a naive ISO-8601 instant taken as UTC.
pub fn parse_instant(raw: &str) -> Result<OffsetDateTime, time::error::Parse> {
	let raw = raw.trim();

	OffsetDateTime::parse(raw, &Rfc3339).or_else(|rfc_err| {
		PrimitiveDateTime::parse(
			raw,
			format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]"),
		)
		.or_else(|_| {
			PrimitiveDateTime::parse(
				raw,
				format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
			)
		})
		.map(PrimitiveDateTime::assume_utc)
		.map_err(|_| rfc_err)
	})
}

/// Formats an instant the way it is written back to the store (RFC 3339, UTC).
pub fn format_instant(instant: OffsetDateTime) -> String {
	instant
		.to_offset(time::UtcOffset::UTC)
		.format(&Rfc3339)
		.unwrap_or_else(|_| instant.unix_timestamp().to_string())
}

/// Verdict of the staleness check, kept for logging.
#[derive(Clone, Debug, PartialEq)]
pub enum Staleness {
	/// No timestamp has been recorded.
	Unknown,
	/// The recorded timestamp could not be parsed.
	Unreadable {
		/// Parser message.
		reason: String,
	},
	/// The token was refreshed recently enough.
	Fresh {
		/// Hours since the last refresh.
		hours: f64,
	},
	/// The token is presumed expired.
	Stale {
		/// Hours since the last refresh.
		hours: f64,
	},
}
impl Staleness {
	/// Only a positively stale token warrants a backup refresh.
	pub fn should_refresh(&self) -> bool {
		matches!(self, Self::Stale { .. })
	}
}

/// Threshold-based staleness policy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StalenessPolicy {
	/// Age in hours beyond which the access token is assumed expired.
	pub threshold_hours: f64,
}
impl StalenessPolicy {
	/// Vendor-documented access-token lifetime.
	pub const DEFAULT_THRESHOLD_HOURS: f64 = 8.;

	/// Creates a policy with a custom threshold.
	pub fn new(threshold_hours: f64) -> Self {
		Self { threshold_hours }
	}

	/// Typed form of the check.
	pub fn should_refresh(&self, last: Option<OffsetDateTime>, now: OffsetDateTime) -> bool {
		should_refresh(last, now, self.threshold_hours)
	}

	/// Evaluates the raw stored value, swallowing parse errors.
	pub fn assess(&self, raw: Option<&str>, now: OffsetDateTime) -> Staleness {
		let Some(raw) = raw else {
			return Staleness::Unknown;
		};

		match parse_instant(raw) {
			Ok(last) => {
				let hours = hours_since(last, now);

				if self.should_refresh(Some(last), now) {
					Staleness::Stale { hours }
				} else {
					Staleness::Fresh { hours }
				}
			},
			Err(e) => {
				tracing::warn!(
					error = %e,
					"Could not check token age; proceeding with stored tokens."
				);

				Staleness::Unreadable { reason: e.to_string() }
			},
		}
	}
}
impl Default for StalenessPolicy {
	fn default() -> Self {
		Self::new(Self::DEFAULT_THRESHOLD_HOURS)
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros::datetime;
	// self
	use super::*;

	const T: OffsetDateTime = datetime!(2025-03-10 21:00:00 UTC);

	fn after(minutes: i64) -> OffsetDateTime {
		T + Duration::minutes(minutes)
	}

	#[test]
	fn absent_timestamp_never_refreshes() {
		for now in [T, after(60 * 24 * 365), after(-60)] {
			assert!(!should_refresh(None, now, 8.));
		}
	}

	#[test]
	fn threshold_boundary_is_exclusive() {
		// 7.99h and 8.01h in whole seconds.
		let just_under = T + Duration::seconds(28_764);
		let just_over = T + Duration::seconds(28_836);

		assert!(!should_refresh(Some(T), after(7 * 60), 8.));
		assert!(!should_refresh(Some(T), just_under, 8.));
		assert!(!should_refresh(Some(T), after(8 * 60), 8.));
		assert!(should_refresh(Some(T), just_over, 8.));
		assert!(should_refresh(Some(T), after(9 * 60), 8.));
	}

	#[test]
	fn parses_rfc3339_and_naive_timestamps() {
		assert_eq!(parse_instant("2025-03-10T21:00:00Z").ok(), Some(T));
		assert_eq!(parse_instant("2025-03-10T21:00:00+00:00").ok(), Some(T));
		assert_eq!(parse_instant("2025-03-10T21:00:00").ok(), Some(T));
		assert_eq!(
			parse_instant("2025-03-10T21:00:00.250000").ok(),
			Some(T + Duration::milliseconds(250))
		);
	}

	#[test]
	fn written_timestamps_parse_back() {
		assert_eq!(format_instant(T), "2025-03-10T21:00:00Z");
		assert_eq!(parse_instant(&format_instant(T)).ok(), Some(T));
	}

	#[test]
	fn assess_fails_open_on_garbage() {
		let policy = StalenessPolicy::default();
		let verdict = policy.assess(Some("yesterday evening"), after(24 * 60));

		assert!(matches!(verdict, Staleness::Unreadable { .. }));
		assert!(!verdict.should_refresh());
		assert_eq!(policy.assess(None, T), Staleness::Unknown);
	}

	#[test]
	fn assess_reports_age() {
		let policy = StalenessPolicy::default();

		assert_eq!(
			policy.assess(Some("2025-03-10T21:00:00Z"), after(9 * 60)),
			Staleness::Stale { hours: 9. }
		);
		assert_eq!(
			policy.assess(Some("2025-03-10T21:00:00Z"), after(90)),
			Staleness::Fresh { hours: 1.5 }
		);
	}
}
