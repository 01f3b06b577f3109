//! # datareport-core — Foundational Types for datareport
//!
//! Primitives shared by every other crate in the workspace. The value tree
//! itself is `serde_yaml::Value`: it keeps the integer/float distinction of
//! the source text and allows non-string mapping keys, both of which the
//! schema validator relies on.
//!
//! ## Modules
//!
//! - [`path`] — `TreePath`, the immutable diagnostic path threaded through
//!   recursive validation.
//! - [`scalar`] — type names, key rendering and exact number comparison.
//! - [`document`] — loading YAML/JSON documents into a value tree.
//! - [`error`] — `DocumentError`.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `datareport-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod document;
pub mod error;
pub mod path;
pub mod scalar;

pub use document::{load_document, parse_document, DocumentFormat};
pub use error::DocumentError;
pub use path::TreePath;
pub use scalar::{compare_numbers, is_integer, key_text, type_name, untagged};

/// The value tree type validated by the workspace.
pub use serde_yaml::Value;
