//! # datareport-cli — CLI Tool for datareport
//!
//! Provides the `datareport` command-line interface around the rule-tree
//! validator in `datareport-schema`.
//!
//! ## Subcommands
//!
//! - `datareport verify` — validate data files against a rule file.
//! - `datareport check-rules` — parse a rule file and report rule errors.
//!
//! ```bash
//! datareport verify --validation verify.yaml report.yaml
//! datareport --config datareport.yaml verify --strict data/*.json
//! datareport check-rules verify.yaml
//! ```
//!
//! ## Crate Policy
//!
//! - Argument parsing lives in `main.rs`; handlers live in their modules.
//! - Handlers delegate to `datareport-schema` and contain no validation logic.

pub mod config;
pub mod verify;
