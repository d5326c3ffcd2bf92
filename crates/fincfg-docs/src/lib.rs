//! Declared-entity documents for fincfg
//!
//! This crate is the bottom layer of the workspace. It knows how to read a
//! directory of YAML documents into [`DeclaredEntity`] values and how to
//! validate them against a per-kind field schema. It performs no network
//! I/O and knows nothing about specific entity kinds.
//!
//! # Example
//!
//! ```ignore
//! use fincfg_docs::Corpus;
//!
//! let corpus = Corpus::load("declared/")?;
//! for office in corpus.of_kind("Office") {
//!     println!("{} from {}", office.name, office.source_ref());
//! }
//! ```

pub mod corpus;
pub mod document;
pub mod error;
pub mod schema;

pub use corpus::{Corpus, InvalidDocument};
pub use document::{DeclaredEntity, Document, Metadata, lookup, value_text};
pub use error::{Error, Result};
pub use schema::{FieldSpec, FieldType, Violation, normalize};
