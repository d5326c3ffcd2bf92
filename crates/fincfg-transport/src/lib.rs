//! Authenticated transport for the core-banking admin API
//!
//! Provides:
//!
//! - **[`Remote`]**: the blocking `get`/`post`/`put` seam every higher layer
//!   talks through, so tests can swap in an in-memory fake.
//! - **[`ApiClient`]**: the real implementation over `reqwest`, with tenant
//!   header, bounded exponential backoff, and OAuth2 token lifecycle.
//! - **[`Credentials`]**: OAuth2 client-credentials and Basic pairs, read
//!   from the environment.

pub mod auth;
pub mod client;
pub mod error;
pub mod remote;
pub mod retry;

pub use auth::{BasicCredentials, ClientCredentials, Credentials, TokenManager};
pub use client::{ApiClient, ClientConfig};
pub use error::{Error, Result};
pub use remote::{Remote, TENANT_HEADER, list_items, resource_id};
pub use retry::{RETRYABLE_STATUSES, RetryPolicy, is_retryable};
