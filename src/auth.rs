//! Credential models, the refresh-token grant, and the staleness heuristic.

pub mod credentials;
pub mod refresh;
pub mod secret;
pub mod staleness;

pub use credentials::*;
pub use refresh::*;
pub use secret::*;
pub use staleness::*;
