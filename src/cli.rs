//! Command-line surface of the `powerwall-reserve` binary.

// std
use std::path::PathBuf;
// crates.io
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{EnvFilter, fmt};
// self
use crate::{
	_prelude::*,
	config::{DEFAULT_REGION, RuntimeConfig},
	error::ConfigError,
	http,
	notify::{ChannelServices, HttpMailRelay, HttpTopicPublisher},
	store::Parameter,
};

/// Log output format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
	/// Human-readable lines.
	#[default]
	Text,
	/// One JSON object per event.
	Json,
}

/// Scheduled home-battery backup-reserve control.
#[derive(Debug, Parser)]
#[command(name = "powerwall-reserve", version, about)]
pub struct Cli {
	/// JSON file holding credentials, tokens and notification settings.
	#[arg(
		long,
		env = "PWR_STORE_PATH",
		default_value = "powerwall-reserve.json",
		global = true
	)]
	pub store_path: PathBuf,
	/// Vendor API region.
	#[arg(long, env = "PWR_REGION", default_value = DEFAULT_REGION, global = true)]
	pub region: String,
	/// Log output format.
	#[arg(long, env = "PWR_LOG_FORMAT", value_enum, default_value_t, global = true)]
	pub log_format: LogFormat,
	/// Relay accepting pub/sub publish requests.
	#[arg(long, env = "PWR_TOPIC_RELAY_URL", global = true)]
	pub topic_relay_url: Option<Url>,
	/// Relay accepting `SendEmail` requests.
	#[arg(long, env = "PWR_MAIL_RELAY_URL", global = true)]
	pub mail_relay_url: Option<Url>,
	#[command(subcommand)]
	#[allow(missing_docs)]
	pub command: Command,
}
impl Cli {
	/// Production settings for the selected region.
	pub fn runtime_config(&self) -> Result<RuntimeConfig, ConfigError> {
		RuntimeConfig::for_region(&self.region)
	}

	/// Notification services, including whichever relays were given.
	pub fn channel_services(
		&self,
		config: &RuntimeConfig,
	) -> Result<ChannelServices, ConfigError> {
		let client = http::build_client(config.notify_timeout)?;
		let mut services = ChannelServices::new(client.clone(), config.pushover_url.clone());

		if let Some(url) = &self.topic_relay_url {
			let publisher = HttpTopicPublisher::new(client.clone(), url.clone());

			services = services.with_topic_publisher(Arc::new(publisher));
		}
		if let Some(url) = &self.mail_relay_url {
			services = services.with_mail_sender(Arc::new(HttpMailRelay::new(client, url.clone())));
		}

		Ok(services)
	}
}

/// Binary subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
	/// Apply one backup-reserve setpoint.
	Apply {
		/// Target reserve in percent.
		#[arg(long, allow_negative_numbers = true, conflicts_with = "event")]
		percent: Option<i64>,
		/// Label used in logs and notifications.
		#[arg(long, conflicts_with = "event")]
		schedule_name: Option<String>,
		/// Raw trigger payload, for example `{"backup_reserve_percent":100}`.
		#[arg(long)]
		event: Option<String>,
	},
	/// Rotate the token pair and report to the chat webhook.
	Refresh,
	/// Write one parameter into the store.
	PutParameter {
		/// Store key, for example `refresh_token`.
		name: Parameter,
		/// Value to store.
		value: String,
	},
}
impl Command {
	/// Trigger payload for [`Command::Apply`]; `None` for other commands.
	pub fn schedule_event(&self) -> Option<Result<Value, serde_json::Error>> {
		let Command::Apply { percent, schedule_name, event } = self else {
			return None;
		};

		Some(match event {
			Some(raw) => serde_json::from_str(raw),
			None => {
				let mut event = json!({ "backup_reserve_percent": percent });

				if let Some(name) = schedule_name {
					event["schedule_name"] = json!(name);
				}

				Ok(event)
			},
		})
	}
}

/// Installs the global subscriber; `RUST_LOG` overrides the `info` default.
pub fn init_tracing(format: LogFormat) {
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

	match format {
		LogFormat::Json => fmt().with_env_filter(filter).json().init(),
		LogFormat::Text => fmt().with_env_filter(filter).init(),
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn parse(args: &[&str]) -> Cli {
		Cli::try_parse_from(std::iter::once("powerwall-reserve").chain(args.iter().copied()))
			.expect("Arguments should parse.")
	}

	#[test]
	fn apply_flags_become_a_trigger_payload() {
		let cli = parse(&["apply", "--percent", "100", "--schedule-name", "11:31 PM"]);
		let event = cli.command.schedule_event().expect("Apply carries an event.");

		assert_eq!(
			event.expect("Flags always form valid JSON."),
			json!({ "backup_reserve_percent": 100, "schedule_name": "11:31 PM" })
		);
	}

	#[test]
	fn missing_percent_is_left_for_validation() {
		let cli = parse(&["apply"]);
		let event = cli.command.schedule_event().expect("Apply carries an event.");

		assert_eq!(
			event.expect("Flags always form valid JSON."),
			json!({ "backup_reserve_percent": null })
		);
	}

	#[test]
	fn raw_event_conflicts_with_flags() {
		let result = Cli::try_parse_from([
			"powerwall-reserve",
			"apply",
			"--percent",
			"5",
			"--event",
			"{}",
		]);

		assert!(result.is_err());
	}

	#[test]
	fn put_parameter_rejects_unknown_names() {
		let cli = parse(&["put-parameter", "refresh_token", "rt"]);

		assert!(matches!(
			cli.command,
			Command::PutParameter { name: Parameter::RefreshToken, ref value } if value == "rt"
		));
		assert!(Cli::try_parse_from(["powerwall-reserve", "put-parameter", "nope", "x"]).is_err());
		assert!(parse(&["refresh"]).command.schedule_event().is_none());
	}

	#[test]
	fn defaults_target_the_eu_region_with_text_logs() {
		let cli = parse(&["refresh"]);
		let config = cli.runtime_config().expect("Default region should build.");

		assert_eq!(cli.log_format, LogFormat::Text);
		assert!(cli.topic_relay_url.is_none());
		assert_eq!(
			config.endpoints.api_base().as_str(),
			"https://fleet-api.prd.eu.vn.cloud.tesla.com/"
		);
	}
}
