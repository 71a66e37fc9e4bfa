//! Thread-safe in-memory [`CredentialStore`] for local runs and tests.

// self
use crate::{
	_prelude::*,
	store::{CredentialStore, StoreFuture, StoredParameter},
};

type StoreMap = Arc<RwLock<HashMap<String, StoredParameter>>>;

/// Storage backend that keeps parameters in-process.
///
/// Clones share the same map, so a test can hand one clone to the flows and inspect the other.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(StoreMap);
impl MemoryStore {
	/// Builds a store pre-populated with secure parameters.
	pub fn with_parameters<I, K, V>(entries: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		let store = Self::default();

		for (name, value) in entries {
			store.insert(name, value, true);
		}

		store
	}

	/// Synchronously inserts or replaces a parameter.
	pub fn insert(&self, name: impl Into<String>, value: impl Into<String>, secure: bool) {
		self.0.write().insert(name.into(), StoredParameter { value: value.into(), secure });
	}

	/// Returns the stored parameter (value and protection flag), if any.
	pub fn entry(&self, name: &str) -> Option<StoredParameter> {
		self.0.read().get(name).cloned()
	}

	/// Shortcut for the stored value.
	pub fn value(&self, name: &str) -> Option<String> {
		self.entry(name).map(|p| p.value)
	}
}
impl CredentialStore for MemoryStore {
	fn get<'a>(&'a self, name: &'a str) -> StoreFuture<'a, Option<String>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(map.read().get(name).map(|p| p.value.clone())) })
	}

	fn put<'a>(&'a self, name: &'a str, value: String, encrypt: bool) -> StoreFuture<'a, ()> {
		let map = self.0.clone();

		Box::pin(async move {
			map.write().insert(name.to_owned(), StoredParameter { value, secure: encrypt });

			Ok(())
		})
	}
}
