//! # datareport-schema — Rule-Tree Schema Validation
//!
//! A small rule interpreter that walks a nested value tree (mappings,
//! sequences, scalars) and checks it against a declarative rule tree.
//!
//! ## Rules (`rule`)
//!
//! A rule is a mapping with a `type` field naming one of seven kinds:
//! `dict`, `str`, `int`, `float`, `in`, `list` and `dictdescent`. Rule trees
//! are parsed eagerly into the [`Rule`] enum, so a malformed rule (unknown
//! type, bad regex, empty union) is reported before any data is looked at.
//!
//! ```yaml
//! type: dictdescent
//! mandatory: [title, author]
//! deprecated: {date: "use 'time' instead"}
//! forbidden: {password: "never store credentials in reports"}
//! others-allowed: false
//! ```
//!
//! ## Validation (`validate`)
//!
//! [`Validator`] dispatches on the rule kind and recurses into children,
//! threading a [`TreePath`](datareport_core::TreePath) for diagnostics. In
//! `Mode::Report` failures are logged and `validate` returns `Ok(false)`; in
//! `Mode::Strict` they come back as
//! [`SchemaValidationError::ValidationFailed`]. Rule and document errors are
//! returned in both modes.

pub mod rule;
pub mod validate;

pub use rule::{
    BoundKind, DescentRule, DictRule, ListRule, NotedKey, Pattern, RangeRule, Rule, RuleError,
    RuleKind, StrRule, UnionRule,
};
pub use validate::{
    Mode, Reason, SchemaValidationError, Validator, ValidatorOptions, Violation,
    DEFAULT_MAX_DEPTH,
};
