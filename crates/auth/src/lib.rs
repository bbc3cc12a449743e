//! Credential handling for channels that authenticate with short-lived
//! OAuth access tokens instead of static API keys.
//!
//! [`ServiceAccountFetcher`] performs the JWT-bearer grant; the
//! [`AccessTokenCache`] sits in front of it so each credential is exchanged
//! at most once per token lifetime.

pub mod cache;
pub mod credentials;
pub mod service_account;

pub use cache::{AccessTokenCache, DEFAULT_REFRESH_MARGIN};
pub use credentials::ServiceAccountKey;
pub use service_account::ServiceAccountFetcher;
