//! Notification texts for both flows.

// crates.io
use time::macros::format_description;
// self
use crate::{
	_prelude::*,
	device::ReserveChange,
	notify::{Notification, Severity},
};

/// Title of every schedule failure report.
pub const APPLY_FAILURE_TITLE: &str = "❌ Tesla Powerwall Error";

pub(crate) fn apply_success(schedule: &str, change: &ReserveChange) -> Notification {
	let old = change.old_reserve.map_or_else(|| "?".to_owned(), |old| old.to_string());

	Notification::new(
		"✅ Tesla Powerwall Updated",
		format!("{schedule}\n\nBackup reserve changed: {old}% → {}%", change.new_reserve),
	)
}

pub(crate) fn device_missing(schedule: &str) -> Notification {
	Notification::new(APPLY_FAILURE_TITLE, format!("No Powerwall found for {schedule}"))
}

pub(crate) fn reserve_failed(schedule: &str, percent: i64) -> Notification {
	Notification::new(
		APPLY_FAILURE_TITLE,
		format!("Failed to execute {schedule}. Could not set backup reserve to {percent}%."),
	)
}

pub(crate) fn apply_crash(schedule: &str, error: &str) -> Notification {
	Notification::new(
		"🚨 Tesla Powerwall Critical Error",
		format!("Scheduler crashed during {schedule}.\n\nError: {error}"),
	)
}

/// `true` when a refresh failure needs a human: the grant itself is expired or invalid.
pub fn is_urgent(message: &str) -> bool {
	let message = message.to_lowercase();

	message.contains("expired") || message.contains("invalid")
}

/// Daily refresh success report.
pub(crate) fn refresh_success(
	now: OffsetDateTime,
	access_token_lifetime: Duration,
	schedule_preview: &[String],
	backup_run: bool,
) -> Notification {
	let now = now.replace_nanosecond(0).unwrap_or(now);
	let mut message = String::from("✅ **Tesla Token Refresh Successful**\n\n");

	message.push_str(&format!("🕘 **Time**: {} UTC\n", clock(now)));
	message.push_str("🔄 **New tokens generated and stored**\n");
	message.push_str(&format!(
		"⏰ **Access token valid until**: {} UTC\n",
		clock(now + access_token_lifetime)
	));
	message.push_str("📅 **Refresh token valid for**: 3 months\n\n");
	message.push_str("🔋 **Ready for tonight's Powerwall schedule**:\n");

	for line in schedule_preview {
		message.push_str(&format!("• {line}\n"));
	}

	message.push('\n');

	if backup_run {
		message.push_str("🛡️ **Backup refresh completed** - System is extra secure!\n");
	} else {
		message.push_str("🔄 **Next refresh**: Tomorrow at this time\n");
	}

	message.push_str("📊 **All systems operational** ✅");

	Notification::new("🔋 Daily Tesla Token Refresh", message).with_severity(Severity::Success)
}

/// Daily refresh failure report; urgency depends on [`is_urgent`].
pub(crate) fn refresh_failed(reason: &str, schedule_preview: &[String]) -> Notification {
	if is_urgent(reason) {
		let mut message = String::from("🚨 **URGENT: Tesla Token Emergency**\n\n");

		message.push_str(&format!("Daily token refresh failed: {reason}\n\n"));
		message.push_str("**IMPACT:** Tonight's Powerwall schedule will NOT work!\n");

		for line in schedule_preview {
			message.push_str(&format!("• {line} ❌\n"));
		}

		message.push_str("\n**ACTION REQUIRED:**\n");
		message.push_str("1. Generate new tokens via OAuth flow\n");
		message.push_str("2. Update the credential store\n");
		message.push_str("3. System will resume automatically");

		Notification::new("🚨 Tesla Token EMERGENCY", message).with_severity(Severity::Error)
	} else {
		let message = format!(
			"⚠️ **Tesla Token Refresh Warning**\n\n\
			Daily token refresh failed: {reason}\n\n\
			This might be a temporary network issue.\n\
			**If this persists, manual token regeneration may be needed.**\n\n\
			Tonight's schedule may still work with existing tokens if they haven't expired."
		);

		Notification::new("⚠️ Tesla Token Warning", message).with_severity(Severity::Warning)
	}
}

/// Daily refresh crash report.
pub(crate) fn refresh_crash(error: &str) -> Notification {
	let message = format!(
		"💥 **Tesla Daily Token Refresh Crashed**\n\n\
		The daily token refresh crashed:\n\n\
		```{error}```\n\n\
		**IMPACT:** Tonight's Powerwall schedule may fail if tokens expire!"
	);

	Notification::new("💥 Tesla System Crash", message).with_severity(Severity::Crash)
}

fn clock(instant: OffsetDateTime) -> String {
	instant
		.format(format_description!("[hour repr:12]:[minute] [period]"))
		.unwrap_or_else(|_| instant.time().to_string())
}
