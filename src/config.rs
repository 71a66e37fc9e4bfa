//! Vendor endpoints and per-invocation runtime settings.

// self
use crate::{_prelude::*, auth::StalenessPolicy, error::ConfigError};

/// Default vendor API region.
pub const DEFAULT_REGION: &str = "eu";
/// Default vendor OAuth host.
pub const DEFAULT_AUTH_BASE: &str = "https://fleet-auth.prd.vn.cloud.tesla.com";
/// Default Pushover message endpoint.
pub const DEFAULT_PUSHOVER_URL: &str = "https://api.pushover.net/1/messages.json";

/// Vendor OAuth and device API base URLs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VendorEndpoints {
	auth_base: Url,
	api_base: Url,
}
impl VendorEndpoints {
	/// Production endpoints for `region` (for example `eu` or `na`).
	pub fn for_region(region: &str) -> Result<Self, ConfigError> {
		Self::new(DEFAULT_AUTH_BASE, &format!("https://fleet-api.prd.{region}.vn.cloud.tesla.com"))
	}

	/// Custom endpoints; both must use HTTPS.
	pub fn new(auth_base: &str, api_base: &str) -> Result<Self, ConfigError> {
		let endpoints = Self::insecure(auth_base, api_base)?;
		let bases = [("auth_base", &endpoints.auth_base), ("api_base", &endpoints.api_base)];

		for (endpoint, url) in bases {
			if url.scheme() != "https" {
				return Err(ConfigError::InsecureEndpoint { endpoint });
			}
		}

		Ok(endpoints)
	}

	/// Custom endpoints without the HTTPS requirement, for local mock servers.
	pub fn insecure(auth_base: &str, api_base: &str) -> Result<Self, ConfigError> {
		Ok(Self {
			auth_base: parse_base("auth_base", auth_base)?,
			api_base: parse_base("api_base", api_base)?,
		})
	}

	/// OAuth host root.
	pub fn auth_base(&self) -> &Url {
		&self.auth_base
	}

	/// Device API root.
	pub fn api_base(&self) -> &Url {
		&self.api_base
	}

	/// Refresh-token endpoint.
	pub fn token_url(&self) -> Result<Url, ConfigError> {
		join("token_url", &self.auth_base, "/oauth2/v3/token")
	}

	/// Device API URL for `path` (which starts with `/`).
	pub fn api_url(&self, path: &str) -> Result<Url, ConfigError> {
		join("api_url", &self.api_base, path)
	}
}

/// Settings that shape one invocation of either flow.
#[derive(Clone, Debug)]
pub struct RuntimeConfig {
	/// Vendor endpoints.
	pub endpoints: VendorEndpoints,
	/// Timeout for the token exchange.
	pub token_timeout: StdDuration,
	/// Timeout for each device API call.
	pub api_timeout: StdDuration,
	/// Timeout for each notification channel call.
	pub notify_timeout: StdDuration,
	/// Just-in-time refresh threshold.
	pub staleness: StalenessPolicy,
	/// Advertised access-token lifetime, shown in the daily refresh report.
	pub access_token_lifetime: Duration,
	/// Schedule lines shown in the daily refresh report.
	pub schedule_preview: Vec<String>,
	/// UTC hour at which the daily refresh counts as the backup run.
	pub backup_refresh_hour: Option<u8>,
	/// Pushover message endpoint.
	pub pushover_url: Url,
}
impl RuntimeConfig {
	/// Production defaults for `region`.
	pub fn for_region(region: &str) -> Result<Self, ConfigError> {
		Ok(Self::with_endpoints(VendorEndpoints::for_region(region)?, default_pushover_url()?))
	}

	/// Defaults around explicit endpoints.
	pub fn with_endpoints(endpoints: VendorEndpoints, pushover_url: Url) -> Self {
		Self {
			endpoints,
			token_timeout: StdDuration::from_secs(30),
			api_timeout: StdDuration::from_secs(30),
			notify_timeout: StdDuration::from_secs(10),
			staleness: StalenessPolicy::default(),
			access_token_lifetime: Duration::hours(8),
			schedule_preview: default_schedule_preview(),
			backup_refresh_hour: Some(21),
			pushover_url,
		}
	}
}

/// Reserve changes the external trigger applies each night.
pub fn default_schedule_preview() -> Vec<String> {
	["11:31 PM → 100%", "12:29 AM → 0%", "1:31 AM → 100%", "5:29 AM → 0%"]
		.into_iter()
		.map(String::from)
		.collect()
}

fn default_pushover_url() -> Result<Url, ConfigError> {
	Url::parse(DEFAULT_PUSHOVER_URL)
		.map_err(|source| ConfigError::InvalidEndpoint { endpoint: "pushover_url", source })
}

fn parse_base(endpoint: &'static str, raw: &str) -> Result<Url, ConfigError> {
	Url::parse(raw.trim_end_matches('/'))
		.map_err(|source| ConfigError::InvalidEndpoint { endpoint, source })
}

fn join(endpoint: &'static str, base: &Url, path: &str) -> Result<Url, ConfigError> {
	let joined = format!("{}{path}", base.as_str().trim_end_matches('/'));

	Url::parse(&joined).map_err(|source| ConfigError::InvalidEndpoint { endpoint, source })
}
