//! # Validation
//!
//! The [`Validator`] owns one parsed rule tree and walks value trees against
//! it.
//!
//! ## Failure Discipline
//!
//! Internally every check returns `Result<(), Violation>`: the first failing
//! leaf produces a [`Violation`] carrying its path and a structured
//! [`Reason`], and the error propagates unchanged to the outermost call.
//! Only there is it translated to the configured [`Mode`]:
//!
//! - `Mode::Report` logs a warning and returns `Ok(false)`.
//! - `Mode::Strict` returns `Err(SchemaValidationError::ValidationFailed)`.
//!
//! Alternatives of an `in` rule are evaluated with the internal discipline,
//! so whether a branch matches never depends on the mode.
//!
//! ## Recursion Depth
//!
//! Value trees loaded from YAML or JSON are acyclic, so recursion always
//! terminates. Stack usage is bounded by `ValidatorOptions::max_depth`,
//! the maximum number of path segments (including the root segment); deeper
//! values fail with `Reason::TooDeep`.

use std::fmt;
use std::path::Path;

use serde_yaml::{Mapping, Number, Value};
use thiserror::Error;

use datareport_core::{
    compare_numbers, is_integer, key_text, load_document, parse_document, type_name, untagged,
    DocumentError, DocumentFormat, TreePath,
};

use crate::rule::{
    BoundKind, DescentRule, DictRule, ListRule, RangeRule, Rule, RuleError, RuleKind, StrRule,
    UnionRule,
};

/// Default for `ValidatorOptions::max_depth`.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Error returned by the validator.
#[derive(Error, Debug)]
pub enum SchemaValidationError {
    /// The value does not satisfy the rule. Only returned in `Mode::Strict`.
    #[error("{0}")]
    ValidationFailed(Violation),

    /// The rule tree is malformed. Returned in every mode.
    #[error("invalid rule: {0}")]
    Rule(#[from] RuleError),

    /// A rule or data document could not be loaded.
    #[error("{0}")]
    Document(#[from] DocumentError),
}

/// A failed check at a specific position of the value tree.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{path}: {reason}")]
pub struct Violation {
    /// Where in the value tree the check failed.
    pub path: TreePath,
    /// Why it failed.
    pub reason: Reason,
}

impl Violation {
    fn new(path: &TreePath, reason: Reason) -> Self {
        Self {
            path: path.clone(),
            reason,
        }
    }
}

/// Why a value failed a rule.
#[derive(Debug, Clone, PartialEq)]
pub enum Reason {
    /// The value has the wrong type.
    TypeMismatch {
        /// Rule kind that was expected.
        expected: RuleKind,
        /// Type name of the value.
        found: &'static str,
    },
    /// A numeric bound is violated.
    OutOfRange {
        /// The violated bound.
        bound: BoundKind,
        /// The bound's limit.
        limit: Number,
        /// The offending value.
        value: Number,
    },
    /// A string does not fully match the rule's pattern.
    RegexMismatch {
        /// The pattern as written in the rule.
        pattern: String,
    },
    /// Mandatory keys are absent.
    MissingKeys(Vec<String>),
    /// Forbidden keys are present, with their notes.
    ForbiddenKeys(Vec<(String, Option<String>)>),
    /// Keys outside the accepted set are present and `others-allowed` is false.
    UnexpectedKeys(Vec<String>),
    /// No alternative of an `in` rule matched.
    NoAlternative {
        /// Type name of the value.
        found: &'static str,
        /// Kinds of the alternatives, in the order they were tried.
        attempted: Vec<RuleKind>,
        /// Why each alternative failed.
        failures: Vec<Violation>,
    },
    /// The value is nested deeper than `max_depth`.
    TooDeep {
        /// The configured limit.
        limit: usize,
    },
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TypeMismatch { expected, found } => {
                write!(f, "expected {expected}, got {found}!")
            }
            Self::OutOfRange {
                bound,
                limit,
                value,
            } => write!(
                f,
                "{value} is not {} {limit} ({bound})",
                bound.operator()
            ),
            Self::RegexMismatch { pattern } => {
                write!(f, "INVALID, does not match pattern '{pattern}'")
            }
            Self::MissingKeys(keys) => {
                write!(f, "misses mandatory keys [{}]", keys.join(", "))
            }
            Self::ForbiddenKeys(keys) => {
                let rendered: Vec<String> = keys
                    .iter()
                    .map(|(key, note)| match note {
                        Some(note) => format!("{key} ({note})"),
                        None => key.clone(),
                    })
                    .collect();
                write!(f, "has forbidden keys [{}]", rendered.join(", "))
            }
            Self::UnexpectedKeys(keys) => write!(
                f,
                "there are additional keys [{}] and others-allowed is false",
                keys.join(", ")
            ),
            Self::NoAlternative {
                found,
                attempted,
                failures,
            } => {
                let kinds: Vec<&str> = attempted.iter().map(|k| k.as_str()).collect();
                write!(f, "got {found}, expected one of [{}]", kinds.join(", "))?;
                for failure in failures {
                    write!(f, "; {failure}")?;
                }
                Ok(())
            }
            Self::TooDeep { limit } => {
                write!(f, "nesting exceeds the depth limit of {limit}")
            }
        }
    }
}

/// How failures reach the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Log failures and return `Ok(false)`.
    #[default]
    Report,
    /// Return failures as `SchemaValidationError::ValidationFailed`.
    Strict,
}

impl Mode {
    /// `Strict` when `throw` is true, `Report` otherwise.
    pub fn from_throw(throw: bool) -> Self {
        if throw {
            Self::Strict
        } else {
            Self::Report
        }
    }
}

/// Construction-time options of a [`Validator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatorOptions {
    /// Failure reporting mode.
    pub mode: Mode,
    /// Maximum number of path segments, root included. A limit of `0`
    /// rejects every value, a limit of `1` admits only the root.
    pub max_depth: usize,
}

impl Default for ValidatorOptions {
    fn default() -> Self {
        Self {
            mode: Mode::Report,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl ValidatorOptions {
    /// Default options in `Mode::Strict`.
    pub fn strict() -> Self {
        Self {
            mode: Mode::Strict,
            ..Self::default()
        }
    }

    /// Replace the depth limit.
    pub fn with_max_depth(self, max_depth: usize) -> Self {
        Self { max_depth, ..self }
    }
}

/// Recursive rule-tree validator.
///
/// The rule tree and options are fixed at construction. `Validator` holds no
/// mutable state and is `Send + Sync`.
#[derive(Debug, Clone)]
pub struct Validator {
    rule: Rule,
    options: ValidatorOptions,
}

impl Validator {
    /// Validator for `rule` with default options (`Mode::Report`).
    pub fn new(rule: Rule) -> Self {
        Self::with_options(rule, ValidatorOptions::default())
    }

    /// Validator for `rule` with explicit options.
    pub fn with_options(rule: Rule, options: ValidatorOptions) -> Self {
        Self { rule, options }
    }

    /// Parse a raw rule tree and build a validator for it.
    ///
    /// # Errors
    ///
    /// Returns `RuleError` if the rule tree is malformed.
    pub fn from_rule_tree(tree: &Value, options: ValidatorOptions) -> Result<Self, RuleError> {
        Ok(Self::with_options(Rule::from_value(tree)?, options))
    }

    /// Parse a YAML rule definition and build a validator for it.
    ///
    /// # Errors
    ///
    /// Returns `SchemaValidationError::Document` if the text is not YAML and
    /// `SchemaValidationError::Rule` if the rule tree is malformed.
    pub fn from_rule_str(text: &str, options: ValidatorOptions) -> Result<Self, SchemaValidationError> {
        let tree = parse_document(text, DocumentFormat::Yaml)?;
        Ok(Self::from_rule_tree(&tree, options)?)
    }

    /// Load a YAML (or JSON) rule file and build a validator for it.
    ///
    /// # Errors
    ///
    /// Returns `SchemaValidationError::Document` if the file cannot be read
    /// or parsed and `SchemaValidationError::Rule` if the rule tree is
    /// malformed.
    pub fn from_rule_file(path: &Path, options: ValidatorOptions) -> Result<Self, SchemaValidationError> {
        tracing::debug!(path = %path.display(), "loading rules");
        let tree = load_document(path)?;
        Ok(Self::from_rule_tree(&tree, options)?)
    }

    /// The rule tree used by [`validate`](Self::validate).
    pub fn rule(&self) -> &Rule {
        &self.rule
    }

    /// The construction-time options.
    pub fn options(&self) -> ValidatorOptions {
        self.options
    }

    /// Validate `value` against the instance rule tree, starting at the root path.
    ///
    /// # Errors
    ///
    /// In `Mode::Strict`, returns `SchemaValidationError::ValidationFailed`
    /// when the value does not satisfy the rule. In `Mode::Report` this
    /// method never fails.
    pub fn validate(&self, value: &Value) -> Result<bool, SchemaValidationError> {
        self.validate_at(value, &self.rule, &TreePath::root())
    }

    /// Validate `value` against an explicit parsed rule.
    ///
    /// # Errors
    ///
    /// Same as [`validate`](Self::validate).
    pub fn validate_with(&self, value: &Value, rule: &Rule) -> Result<bool, SchemaValidationError> {
        self.validate_at(value, rule, &TreePath::root())
    }

    /// Validate `value` against a raw rule tree.
    ///
    /// # Errors
    ///
    /// Returns `SchemaValidationError::Rule` in every mode if `rule_tree` is
    /// malformed; otherwise the same as [`validate`](Self::validate).
    pub fn validate_against(&self, value: &Value, rule_tree: &Value) -> Result<bool, SchemaValidationError> {
        let rule = Rule::from_value(rule_tree)?;
        self.validate_with(value, &rule)
    }

    /// Validate `value` against `rule`, reporting failures relative to `path`.
    ///
    /// # Errors
    ///
    /// Same as [`validate`](Self::validate).
    pub fn validate_at(
        &self,
        value: &Value,
        rule: &Rule,
        path: &TreePath,
    ) -> Result<bool, SchemaValidationError> {
        match self.check(value, rule, path) {
            Ok(()) => Ok(true),
            Err(violation) => match self.options.mode {
                Mode::Report => {
                    tracing::warn!(
                        path = %violation.path,
                        reason = %violation.reason,
                        "IS INVALID"
                    );
                    Ok(false)
                }
                Mode::Strict => Err(SchemaValidationError::ValidationFailed(violation)),
            },
        }
    }

    /// Load a YAML/JSON data file and validate it against the instance rule tree.
    ///
    /// # Errors
    ///
    /// Returns `SchemaValidationError::Document` if the file cannot be read
    /// or parsed; otherwise the same as [`validate`](Self::validate).
    pub fn validate_file(&self, path: &Path) -> Result<bool, SchemaValidationError> {
        let value = load_document(path)?;
        self.validate(&value)
    }

    /// Check `value` against `rule` and return the first violation.
    ///
    /// This is the mode-independent core used by every `validate*` method.
    ///
    /// # Errors
    ///
    /// Returns the `Violation` of the first failing check.
    pub fn check(&self, value: &Value, rule: &Rule, path: &TreePath) -> Result<(), Violation> {
        if path.depth() > self.options.max_depth {
            return Err(Violation::new(
                path,
                Reason::TooDeep {
                    limit: self.options.max_depth,
                },
            ));
        }
        let kind = rule.kind();
        tracing::trace!(path = %path, rule = %kind, "assert correct type");

        let value = untagged(value);
        let outcome = match rule {
            Rule::Dict(rule) => self.check_dict(value, rule, path),
            Rule::Str(rule) => check_str(value, rule, path),
            Rule::Int(range) => check_number(value, RuleKind::Int, range, path),
            Rule::Float(range) => check_number(value, RuleKind::Float, range, path),
            Rule::In(rule) => self.check_union(value, rule, path),
            Rule::List(rule) => self.check_list(value, rule, path),
            Rule::DictDescent(rule) => check_descent(value, rule, path),
        };

        match &outcome {
            Ok(()) => tracing::debug!(path = %path, rule = %kind, "validated"),
            Err(violation) => tracing::debug!(
                path = %path,
                rule = %kind,
                reason = %violation.reason,
                "validation failed"
            ),
        }
        outcome
    }

    fn check_dict(&self, value: &Value, rule: &DictRule, path: &TreePath) -> Result<(), Violation> {
        let map = expect_mapping(value, path)?;
        if let Some(keys) = &rule.keys {
            for key in map.keys() {
                self.check(key, keys, &path.child(key_text(key)))?;
            }
        }
        if let Some(values) = &rule.values {
            let base = path.child("values");
            for (key, item) in map {
                self.check(item, values, &base.child(key_text(key)))?;
            }
        }
        Ok(())
    }

    fn check_union(&self, value: &Value, rule: &UnionRule, path: &TreePath) -> Result<(), Violation> {
        let mut failures = Vec::with_capacity(rule.alternatives.len());
        for alternative in &rule.alternatives {
            match self.check(value, alternative, path) {
                Ok(()) => return Ok(()),
                Err(violation) => failures.push(violation),
            }
        }
        Err(Violation::new(
            path,
            Reason::NoAlternative {
                found: type_name(value),
                attempted: rule.alternatives.iter().map(Rule::kind).collect(),
                failures,
            },
        ))
    }

    fn check_list(&self, value: &Value, rule: &ListRule, path: &TreePath) -> Result<(), Violation> {
        let Value::Sequence(items) = value else {
            return Err(mismatch(RuleKind::List, value, path));
        };
        if let Some(values) = &rule.values {
            for (i, item) in items.iter().enumerate() {
                self.check(item, values, &path.child(i.to_string()))?;
            }
        }
        Ok(())
    }
}

fn mismatch(expected: RuleKind, value: &Value, path: &TreePath) -> Violation {
    Violation::new(
        path,
        Reason::TypeMismatch {
            expected,
            found: type_name(value),
        },
    )
}

/// Both mapping rules report a non-mapping as "expected dict".
fn expect_mapping<'a>(value: &'a Value, path: &TreePath) -> Result<&'a Mapping, Violation> {
    match value {
        Value::Mapping(map) => Ok(map),
        other => Err(mismatch(RuleKind::Dict, other, path)),
    }
}

fn check_str(value: &Value, rule: &StrRule, path: &TreePath) -> Result<(), Violation> {
    let Value::String(text) = value else {
        return Err(mismatch(RuleKind::Str, value, path));
    };
    match &rule.pattern {
        Some(pattern) if !pattern.full_match(text) => Err(Violation::new(
            path,
            Reason::RegexMismatch {
                pattern: pattern.as_str().to_string(),
            },
        )),
        _ => Ok(()),
    }
}

fn check_number(value: &Value, kind: RuleKind, range: &RangeRule, path: &TreePath) -> Result<(), Violation> {
    let want_integer = kind == RuleKind::Int;
    let number = match value {
        Value::Number(n) if is_integer(n) == want_integer => n,
        other => return Err(mismatch(kind, other, path)),
    };
    for (bound, limit) in range.bounds() {
        if !bound.admits(compare_numbers(number, limit)) {
            return Err(Violation::new(
                path,
                Reason::OutOfRange {
                    bound,
                    limit: limit.clone(),
                    value: number.clone(),
                },
            ));
        }
    }
    Ok(())
}

fn check_descent(value: &Value, rule: &DescentRule, path: &TreePath) -> Result<(), Violation> {
    let map = expect_mapping(value, path)?;
    let present = |key: &Value| {
        let key = untagged(key);
        map.keys().any(|k| untagged(k) == key)
    };

    let missing: Vec<String> = rule
        .mandatory
        .iter()
        .filter(|key| !present(*key))
        .map(key_text)
        .collect();
    if !missing.is_empty() {
        return Err(Violation::new(path, Reason::MissingKeys(missing)));
    }

    for noted in rule.deprecated.iter().filter(|noted| present(&noted.key)) {
        tracing::warn!(
            path = %path,
            key = %key_text(&noted.key),
            note = noted.note.as_deref().unwrap_or(""),
            "deprecated key"
        );
    }

    let forbidden: Vec<(String, Option<String>)> = rule
        .forbidden
        .iter()
        .filter(|noted| present(&noted.key))
        .map(|noted| (key_text(&noted.key), noted.note.clone()))
        .collect();
    if !forbidden.is_empty() {
        return Err(Violation::new(path, Reason::ForbiddenKeys(forbidden)));
    }

    if !rule.others_allowed {
        let others: Vec<String> = map
            .keys()
            .filter(|key| !rule.accounts_for(*key))
            .map(key_text)
            .collect();
        if !others.is_empty() {
            return Err(Violation::new(path, Reason::UnexpectedKeys(others)));
        }
    }
    Ok(())
}
