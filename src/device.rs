//! Battery site discovery, backup-reserve control and live telemetry.
//!
//! Every operation returns `Option`: failures are logged here and never reach the caller as
//! errors, so the orchestrator only has to decide between "found/changed" and "not".

pub mod session;

pub use session::ApiSession;

// self
use crate::_prelude::*;

const PRODUCTS_PATH: &str = "/api/1/products";

/// Vendor identifier of an energy site, kept in its decimal string form.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SiteId(String);
impl SiteId {
	/// Wraps a site identifier.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the identifier.
	pub fn as_str(&self) -> &str {
		&self.0
	}

	fn path(&self, leaf: &str) -> String {
		format!("/api/1/energy_sites/{}/{leaf}", self.0)
	}
}
impl Display for SiteId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}

/// Before/after record of a setpoint change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ReserveChange {
	/// Reserve before the change, when it could be read.
	pub old_reserve: Option<i64>,
	/// Reserve that was written.
	pub new_reserve: i64,
}

/// Point-in-time telemetry of an energy site.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct LiveStatus {
	/// State of charge in percent.
	#[serde(default)]
	pub percentage_charged: Option<f64>,
	/// Battery power in watts; negative while charging.
	#[serde(default)]
	pub battery_power: Option<f64>,
	/// Solar production in watts.
	#[serde(default)]
	pub solar_power: Option<f64>,
	/// Home consumption in watts.
	#[serde(default)]
	pub load_power: Option<f64>,
}
impl LiveStatus {
	/// Renders the "Current Status" block appended to notifications.
	pub fn status_block(&self) -> String {
		let charge = self.percentage_charged.map_or_else(|| "Unknown".into(), |v| v.to_string());
		let battery = self.battery_power.unwrap_or_default();
		let direction = if battery < 0. { "(charging)" } else { "(discharging)" };

		format!(
			concat!(
				"\n\n📊 Current Status:\n🔋 Battery: {charge}%\n",
				"⚡ Battery Power: {battery}W {direction}\n☀️ Solar: {}W\n🏠 Home Usage: {}W",
			),
			self.solar_power.unwrap_or_default(),
			self.load_power.unwrap_or_default(),
			charge = charge,
			battery = battery,
			direction = direction,
		)
	}
}

#[derive(Debug, Deserialize)]
struct Product {
	#[serde(default)]
	device_type: Option<String>,
	#[serde(default)]
	resource_type: Option<String>,
	#[serde(default)]
	energy_site_id: Option<Value>,
}
impl Product {
	fn battery_site(&self) -> Option<SiteId> {
		if self.device_type.as_deref() != Some("energy")
			|| self.resource_type.as_deref() != Some("battery")
		{
			return None;
		}

		match self.energy_site_id.as_ref()? {
			Value::Number(n) => Some(SiteId::new(n.to_string())),
			Value::String(s) if !s.is_empty() => Some(SiteId::new(s.clone())),
			_ => None,
		}
	}
}

#[derive(Debug, Deserialize)]
struct SiteInfo {
	#[serde(default)]
	backup_reserve_percent: Option<serde_json::Number>,
}

#[derive(Serialize)]
struct BackupRequest {
	backup_reserve_percent: i64,
}

/// Device operations over one [`ApiSession`].
#[derive(Clone, Debug)]
pub struct DeviceController {
	session: ApiSession,
}
impl DeviceController {
	/// Wraps a session.
	pub fn new(session: ApiSession) -> Self {
		Self { session }
	}

	/// Underlying session.
	pub fn session(&self) -> &ApiSession {
		&self.session
	}

	/// First product that is an energy-type battery. Resolved fresh on every call.
	pub async fn find_device(&self) -> Option<SiteId> {
		let products = self.logged(self.session.get::<Vec<Product>>(PRODUCTS_PATH).await)?;
		let site = products.iter().find_map(Product::battery_site);

		match &site {
			Some(site) => tracing::info!(%site, "Found battery site."),
			None => tracing::error!(products = products.len(), "No battery site found."),
		}

		site
	}

	/// Current backup reserve of `site`.
	pub async fn read_reserve(&self, site: &SiteId) -> Option<i64> {
		let info = self.logged(self.session.get::<SiteInfo>(&site.path("site_info")).await)?;

		info.backup_reserve_percent.as_ref().and_then(|n| {
			n.as_i64().or_else(|| n.as_f64().filter(|v| v.is_finite()).map(|v| v.round() as i64))
		})
	}

	/// Writes a new reserve; the previous value is read first on a best-effort basis.
	///
	/// The percentage is passed through unchecked; the vendor decides what it accepts.
	pub async fn set_reserve(&self, site: &SiteId, percent: i64) -> Option<ReserveChange> {
		tracing::info!(%site, percent, "Setting backup reserve.");

		let old_reserve = self.read_reserve(site).await;

		match old_reserve {
			Some(old) => tracing::info!(old, "Current backup reserve."),
			None => tracing::warn!("Current backup reserve is unknown."),
		}

		let body = BackupRequest { backup_reserve_percent: percent };

		match self.session.post(&site.path("backup"), &body).await {
			Ok(()) => {
				tracing::info!(percent, "Backup reserve set.");

				Some(ReserveChange { old_reserve, new_reserve: percent })
			},
			Err(e) => {
				tracing::error!(error = %e, percent, "Failed to set backup reserve.");

				None
			},
		}
	}

	/// Live telemetry of `site`.
	pub async fn live_status(&self, site: &SiteId) -> Option<LiveStatus> {
		self.logged(self.session.get::<LiveStatus>(&site.path("live_status")).await)
	}

	fn logged<T>(&self, result: Result<T>) -> Option<T> {
		match result {
			Ok(value) => Some(value),
			Err(e) => {
				tracing::error!(
					error = %e,
					transient = e.is_transient(),
					"Device API request failed."
				);

				None
			},
		}
	}
}
