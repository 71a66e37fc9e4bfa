//! Scheduled home-battery backup-reserve control: OAuth 2.0 token upkeep, staleness-aware
//! device writes, and fault-isolated multi-channel notifications.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod cli;
pub mod config;
pub mod device;
pub mod error;
pub mod flows;
pub mod http;
pub mod notify;
pub mod oauth;
pub mod obs;
pub mod store;
#[doc(hidden)]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests.

	pub use crate::_prelude::*;

	// self
	use crate::{
		config::{RuntimeConfig, VendorEndpoints},
		flows::Scheduler,
		store::{MemoryStore, ParameterStore},
	};

	/// Client identifier seeded by [`seeded_store`].
	pub const CLIENT_ID: &str = "client-123";
	/// Client secret seeded by [`seeded_store`].
	pub const CLIENT_SECRET: &str = "secret-xyz";
	/// Access token seeded by [`seeded_store`].
	pub const ACCESS_TOKEN: &str = "access-old";
	/// Refresh token seeded by [`seeded_store`].
	pub const REFRESH_TOKEN: &str = "refresh-old";

	/// Runtime settings pointing every vendor and push endpoint at `base_url` over plain HTTP.
	pub fn test_config(base_url: &str) -> RuntimeConfig {
		let endpoints = VendorEndpoints::insecure(base_url, base_url)
			.expect("Mock server URL should be a valid endpoint base.");
		let pushover_url = Url::parse(&format!("{base_url}/1/messages.json"))
			.expect("Mock server URL should form a push endpoint.");
		let mut config = RuntimeConfig::with_endpoints(endpoints, pushover_url);

		config.token_timeout = StdDuration::from_secs(2);
		config.api_timeout = StdDuration::from_secs(2);
		config.notify_timeout = StdDuration::from_secs(2);

		config
	}

	/// In-memory store holding a complete credential set.
	pub fn seeded_store() -> MemoryStore {
		MemoryStore::with_parameters([
			("client_id", CLIENT_ID),
			("client_secret", CLIENT_SECRET),
			("access_token", ACCESS_TOKEN),
			("refresh_token", REFRESH_TOKEN),
		])
	}

	/// Scheduler over `store` (shared, so the caller can inspect writes) talking to `base_url`.
	pub fn build_test_scheduler(base_url: &str, store: &MemoryStore) -> Scheduler {
		Scheduler::new(ParameterStore::new(Arc::new(store.clone())), test_config(base_url))
			.expect("Test scheduler should build.")
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
		time::Duration as StdDuration,
	};

	pub use parking_lot::{Mutex, RwLock};
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use serde_json::{Value, json};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use reqwest;
pub use url;
use {color_eyre as _, tokio as _};
#[cfg(test)] use httpmock as _;
