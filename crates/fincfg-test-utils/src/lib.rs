//! Shared test utilities for the fincfg workspace.
//!
//! Dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`remote`]: [`FakeRemote`], an in-memory admin API
//! - [`corpus`]: [`TestCorpus`] builder for declared-entity directories

pub mod corpus;
pub mod remote;

pub use corpus::{TestCorpus, document};
pub use remote::FakeRemote;
