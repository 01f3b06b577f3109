//! # Rule Model
//!
//! Typed representation of a rule tree. A raw rule is a mapping whose `type`
//! field selects one of the [`RuleKind`]s; the remaining fields depend on
//! the kind. [`Rule::from_value`] parses a whole tree at once and reports
//! the first malformed rule together with its location inside the tree.
//!
//! Fields that a kind does not know about are ignored.

use std::fmt;

use regex::{Regex, RegexBuilder};
use serde_yaml::{Mapping, Number, Value};
use thiserror::Error;

use datareport_core::{key_text, type_name, untagged, TreePath};

/// `regex_flags` bit: case-insensitive matching.
pub const FLAG_IGNORECASE: u64 = 2;
/// `regex_flags` bit: `^` and `$` match at line boundaries.
pub const FLAG_MULTILINE: u64 = 8;
/// `regex_flags` bit: `.` also matches a newline.
pub const FLAG_DOTALL: u64 = 16;
/// `regex_flags` bit: Unicode-aware classes, the default.
pub const FLAG_UNICODE: u64 = 32;
/// `regex_flags` bit: whitespace and `#` comments in the pattern are ignored.
pub const FLAG_VERBOSE: u64 = 64;
/// `regex_flags` bit: `\w`, `\d`, `\s` and `\b` match ASCII only.
pub const FLAG_ASCII: u64 = 256;

const SUPPORTED_FLAGS: u64 =
    FLAG_IGNORECASE | FLAG_MULTILINE | FLAG_DOTALL | FLAG_UNICODE | FLAG_VERBOSE | FLAG_ASCII;

/// Error in the rule tree itself, as opposed to data failing a rule.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuleError {
    /// A rule is not a mapping.
    #[error("{at}: rule must be of type dict, but is {found}")]
    NotAMapping {
        /// Location of the rule in the rule tree.
        at: TreePath,
        /// Type name of the offending node.
        found: &'static str,
    },

    /// A rule mapping has no `type` field.
    #[error("{at}: rule has no 'type' field")]
    MissingType {
        /// Location of the rule in the rule tree.
        at: TreePath,
    },

    /// The `type` field names no known rule kind.
    #[error("{at}: no validator of type '{name}'")]
    UnknownType {
        /// Location of the rule in the rule tree.
        at: TreePath,
        /// The unrecognised type name.
        name: String,
    },

    /// A field has the wrong shape.
    #[error("{at}: field '{field}' must be {expected}, got {found}")]
    InvalidField {
        /// Location of the rule in the rule tree.
        at: TreePath,
        /// Field name.
        field: &'static str,
        /// Expected shape.
        expected: &'static str,
        /// Type name of the value found.
        found: &'static str,
    },

    /// The `regex` field does not compile.
    #[error("{at}: invalid regex '{pattern}': {reason}")]
    InvalidRegex {
        /// Location of the rule in the rule tree.
        at: TreePath,
        /// Pattern as written in the rule.
        pattern: String,
        /// Compiler message.
        reason: String,
    },

    /// `regex_flags` has bits this implementation does not understand.
    #[error("{at}: unsupported regex_flags bits {bits:#x}")]
    UnsupportedRegexFlags {
        /// Location of the rule in the rule tree.
        at: TreePath,
        /// The unknown bits.
        bits: u64,
    },

    /// An `in` rule lists no alternatives.
    #[error("{at}: rule of type 'in' must list at least one alternative in 'values'")]
    EmptyUnion {
        /// Location of the rule in the rule tree.
        at: TreePath,
    },
}

/// The closed set of rule kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleKind {
    /// `dict` — mapping with optional key and value rules.
    Dict,
    /// `str` — string with an optional full-match regex.
    Str,
    /// `int` — integer with optional bounds.
    Int,
    /// `float` — float with optional bounds.
    Float,
    /// `in` — first matching alternative wins.
    In,
    /// `list` — sequence with an optional element rule.
    List,
    /// `dictdescent` — key-set policy of a mapping.
    DictDescent,
}

impl RuleKind {
    /// Every kind, in declaration order.
    pub const ALL: [RuleKind; 7] = [
        Self::Dict,
        Self::Str,
        Self::Int,
        Self::Float,
        Self::In,
        Self::List,
        Self::DictDescent,
    ];

    /// The name used in the `type` field.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dict => "dict",
            Self::Str => "str",
            Self::Int => "int",
            Self::Float => "float",
            Self::In => "in",
            Self::List => "list",
            Self::DictDescent => "dictdescent",
        }
    }

    /// Look up a kind by its `type` name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed rule.
#[derive(Debug, Clone)]
pub enum Rule {
    /// `type: dict`
    Dict(DictRule),
    /// `type: str`
    Str(StrRule),
    /// `type: int`
    Int(RangeRule),
    /// `type: float`
    Float(RangeRule),
    /// `type: in`
    In(UnionRule),
    /// `type: list`
    List(ListRule),
    /// `type: dictdescent`
    DictDescent(DescentRule),
}

/// Fields of a `dict` rule.
#[derive(Debug, Clone, Default)]
pub struct DictRule {
    /// Rule every key must satisfy.
    pub keys: Option<Box<Rule>>,
    /// Rule every value must satisfy.
    pub values: Option<Box<Rule>>,
}

/// Fields of a `str` rule.
#[derive(Debug, Clone, Default)]
pub struct StrRule {
    /// Pattern the whole string must match.
    pub pattern: Option<Pattern>,
}

/// Bounds of an `int` or `float` rule. Every bound is optional and checked
/// independently, so `min > max` is legal and admits nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RangeRule {
    /// Inclusive lower bound.
    pub min: Option<Number>,
    /// Exclusive lower bound.
    pub inf: Option<Number>,
    /// Exclusive upper bound.
    pub sup: Option<Number>,
    /// Inclusive upper bound.
    pub max: Option<Number>,
}

/// Alternatives of an `in` rule, tried in order.
#[derive(Debug, Clone)]
pub struct UnionRule {
    /// Never empty once parsed.
    pub alternatives: Vec<Rule>,
}

/// Fields of a `list` rule.
#[derive(Debug, Clone, Default)]
pub struct ListRule {
    /// Rule every element must satisfy.
    pub values: Option<Box<Rule>>,
}

/// Fields of a `dictdescent` rule.
#[derive(Debug, Clone, Default)]
pub struct DescentRule {
    /// Keys that must be present.
    pub mandatory: Vec<Value>,
    /// Keys that may be present.
    pub allowed: Vec<Value>,
    /// Keys that may be present but produce a warning.
    pub deprecated: Vec<NotedKey>,
    /// Keys that must not be present.
    pub forbidden: Vec<NotedKey>,
    /// Whether keys outside `mandatory`, `allowed` and `deprecated` pass.
    pub others_allowed: bool,
}

/// A key listed in `deprecated` or `forbidden`, with its note.
#[derive(Debug, Clone, PartialEq)]
pub struct NotedKey {
    /// The key.
    pub key: Value,
    /// Explanation shown in diagnostics.
    pub note: Option<String>,
}

/// Kind of a numeric bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundKind {
    /// `value >= min`
    Min,
    /// `value > inf`
    Inf,
    /// `value < sup`
    Sup,
    /// `value <= max`
    Max,
}

impl BoundKind {
    /// Field name in the rule.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Min => "min",
            Self::Inf => "inf",
            Self::Sup => "sup",
            Self::Max => "max",
        }
    }

    /// Comparison operator the value must satisfy against the limit.
    pub fn operator(self) -> &'static str {
        match self {
            Self::Min => ">=",
            Self::Inf => ">",
            Self::Sup => "<",
            Self::Max => "<=",
        }
    }

    /// Whether `value.cmp(limit)` satisfies this bound. Unordered never does.
    pub fn admits(self, ordering: Option<std::cmp::Ordering>) -> bool {
        use std::cmp::Ordering::{Equal, Greater, Less};
        matches!(
            (self, ordering),
            (Self::Min, Some(Greater | Equal))
                | (Self::Inf, Some(Greater))
                | (Self::Sup, Some(Less))
                | (Self::Max, Some(Less | Equal))
        )
    }
}

impl fmt::Display for BoundKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl RangeRule {
    /// The bounds that are set, in checking order.
    pub fn bounds(&self) -> impl Iterator<Item = (BoundKind, &Number)> {
        [
            (BoundKind::Min, self.min.as_ref()),
            (BoundKind::Inf, self.inf.as_ref()),
            (BoundKind::Sup, self.sup.as_ref()),
            (BoundKind::Max, self.max.as_ref()),
        ]
        .into_iter()
        .filter_map(|(kind, limit)| limit.map(|limit| (kind, limit)))
    }
}

impl DescentRule {
    /// Whether `key` is listed in `mandatory`, `allowed` or `deprecated`.
    pub fn accounts_for(&self, key: &Value) -> bool {
        let key = untagged(key);
        self.mandatory
            .iter()
            .chain(&self.allowed)
            .chain(self.deprecated.iter().map(|noted| &noted.key))
            .any(|listed| untagged(listed) == key)
    }
}

/// A compiled full-match pattern.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    flags: u64,
    regex: Regex,
}

impl Pattern {
    /// Compile `source` with the given `regex_flags` bitmask.
    ///
    /// # Errors
    ///
    /// Returns `RuleError::UnsupportedRegexFlags` for unknown flag bits and
    /// `RuleError::InvalidRegex` if the pattern does not compile.
    pub fn new(source: &str, flags: u64) -> Result<Self, RuleError> {
        Self::compile(source, flags, &TreePath::root())
    }

    fn compile(source: &str, flags: u64, at: &TreePath) -> Result<Self, RuleError> {
        let unknown = flags & !SUPPORTED_FLAGS;
        if unknown != 0 {
            return Err(RuleError::UnsupportedRegexFlags {
                at: at.clone(),
                bits: unknown,
            });
        }
        let verbose = flags & FLAG_VERBOSE != 0;
        let body = if flags & FLAG_ASCII != 0 {
            ascii_classes(source)
        } else {
            source.to_string()
        };
        // In verbose mode a trailing `#` comment would swallow the closing group.
        let anchored = if verbose {
            format!("\\A(?:{body}\n)\\z")
        } else {
            format!("\\A(?:{body})\\z")
        };
        let regex = RegexBuilder::new(&anchored)
            .case_insensitive(flags & FLAG_IGNORECASE != 0)
            .multi_line(flags & FLAG_MULTILINE != 0)
            .dot_matches_new_line(flags & FLAG_DOTALL != 0)
            .ignore_whitespace(verbose)
            .build()
            .map_err(|e| RuleError::InvalidRegex {
                at: at.clone(),
                pattern: source.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            source: source.to_string(),
            flags,
            regex,
        })
    }

    /// The pattern as written in the rule.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// The `regex_flags` bitmask.
    pub fn flags(&self) -> u64 {
        self.flags
    }

    /// Whether the whole of `text` matches.
    pub fn full_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

/// Rewrite the Perl classes `\w`, `\d`, `\s` and their negations to ASCII
/// sets, and `\b`, `\B` to ASCII word boundaries.
///
/// The regex itself stays in Unicode mode, so `.` and negated classes
/// still match any character.
fn ascii_classes(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars();
    let mut in_class = false;
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(class @ ('w' | 'd' | 's')) => {
                    let members = ascii_members(class);
                    if in_class {
                        out.push_str(members);
                    } else {
                        out.push_str(&format!("[{members}]"));
                    }
                }
                Some(class @ ('W' | 'D' | 'S')) => {
                    out.push_str(&format!("[^{}]", ascii_members(class.to_ascii_lowercase())));
                }
                Some('b') if !in_class => out.push_str("(?-u:\\b)"),
                Some('B') if !in_class => out.push_str("(?-u:\\B)"),
                Some(next) => {
                    out.push('\\');
                    out.push(next);
                }
                None => out.push('\\'),
            },
            '[' if !in_class => {
                in_class = true;
                out.push('[');
                if chars.clone().next() == Some('^') {
                    out.push('^');
                    chars.next();
                }
                // A leading `]` is a literal member, not the end of the class.
                if chars.clone().next() == Some(']') {
                    out.push(']');
                    chars.next();
                }
            }
            ']' if in_class => {
                in_class = false;
                out.push(']');
            }
            other => out.push(other),
        }
    }
    out
}

/// Members of the ASCII set for `\w`, `\d` or `\s`, without brackets.
fn ascii_members(class: char) -> &'static str {
    match class {
        'w' => "0-9A-Za-z_",
        'd' => "0-9",
        // `\x20` rather than a literal space, which verbose mode would drop.
        _ => "\\t\\n\\x0B\\x0C\\r\\x20",
    }
}

impl Rule {
    /// Parse a rule tree.
    ///
    /// # Errors
    ///
    /// Returns the first `RuleError` found, located relative to the root of
    /// `value`.
    pub fn from_value(value: &Value) -> Result<Self, RuleError> {
        Self::parse(value, &TreePath::root())
    }

    /// A rule of the given kind without any constraint.
    ///
    /// Returns `None` for `RuleKind::In`, which has no constraint-free form.
    pub fn bare(kind: RuleKind) -> Option<Self> {
        let rule = match kind {
            RuleKind::Dict => Self::Dict(DictRule::default()),
            RuleKind::Str => Self::Str(StrRule::default()),
            RuleKind::Int => Self::Int(RangeRule::default()),
            RuleKind::Float => Self::Float(RangeRule::default()),
            RuleKind::In => return None,
            RuleKind::List => Self::List(ListRule::default()),
            RuleKind::DictDescent => Self::DictDescent(DescentRule::default()),
        };
        Some(rule)
    }

    /// The kind of this rule.
    pub fn kind(&self) -> RuleKind {
        match self {
            Self::Dict(_) => RuleKind::Dict,
            Self::Str(_) => RuleKind::Str,
            Self::Int(_) => RuleKind::Int,
            Self::Float(_) => RuleKind::Float,
            Self::In(_) => RuleKind::In,
            Self::List(_) => RuleKind::List,
            Self::DictDescent(_) => RuleKind::DictDescent,
        }
    }

    fn parse(value: &Value, at: &TreePath) -> Result<Self, RuleError> {
        let Value::Mapping(map) = untagged(value) else {
            return Err(RuleError::NotAMapping {
                at: at.clone(),
                found: type_name(value),
            });
        };
        let name = match map.get("type").map(untagged) {
            None => return Err(RuleError::MissingType { at: at.clone() }),
            Some(Value::String(name)) => name.clone(),
            Some(other) => key_text(other),
        };
        let kind = RuleKind::from_name(&name).ok_or_else(|| RuleError::UnknownType {
            at: at.clone(),
            name,
        })?;

        let rule = match kind {
            RuleKind::Dict => Self::Dict(DictRule {
                keys: child_rule(map, "keys", at)?,
                values: child_rule(map, "values", at)?,
            }),
            RuleKind::Str => Self::Str(parse_str(map, at)?),
            RuleKind::Int => Self::Int(parse_range(map, at)?),
            RuleKind::Float => Self::Float(parse_range(map, at)?),
            RuleKind::In => Self::In(parse_union(map, at)?),
            RuleKind::List => Self::List(ListRule {
                values: child_rule(map, "values", at)?,
            }),
            RuleKind::DictDescent => Self::DictDescent(parse_descent(map, at)?),
        };
        Ok(rule)
    }
}

fn field<'a>(map: &'a Mapping, name: &str) -> Option<&'a Value> {
    map.get(name).map(untagged)
}

fn invalid_field(at: &TreePath, field: &'static str, expected: &'static str, found: &Value) -> RuleError {
    RuleError::InvalidField {
        at: at.clone(),
        field,
        expected,
        found: type_name(found),
    }
}

fn child_rule(map: &Mapping, name: &'static str, at: &TreePath) -> Result<Option<Box<Rule>>, RuleError> {
    field(map, name)
        .map(|value| Rule::parse(value, &at.child(name)).map(Box::new))
        .transpose()
}

fn parse_str(map: &Mapping, at: &TreePath) -> Result<StrRule, RuleError> {
    let flags = match field(map, "regex_flags") {
        None => 0,
        Some(Value::Number(n)) => n
            .as_u64()
            .ok_or_else(|| invalid_field(at, "regex_flags", "a non-negative integer", &Value::Number(n.clone())))?,
        Some(other) => return Err(invalid_field(at, "regex_flags", "a non-negative integer", other)),
    };
    let pattern = match field(map, "regex") {
        None => None,
        Some(Value::String(source)) => Some(Pattern::compile(source, flags, &at.child("regex"))?),
        Some(other) => return Err(invalid_field(at, "regex", "a string", other)),
    };
    Ok(StrRule { pattern })
}

fn parse_range(map: &Mapping, at: &TreePath) -> Result<RangeRule, RuleError> {
    let bound = |kind: BoundKind| -> Result<Option<Number>, RuleError> {
        match field(map, kind.as_str()) {
            None => Ok(None),
            Some(Value::Number(n)) => Ok(Some(n.clone())),
            Some(other) => Err(invalid_field(at, kind.as_str(), "a number", other)),
        }
    };
    Ok(RangeRule {
        min: bound(BoundKind::Min)?,
        inf: bound(BoundKind::Inf)?,
        sup: bound(BoundKind::Sup)?,
        max: bound(BoundKind::Max)?,
    })
}

fn parse_union(map: &Mapping, at: &TreePath) -> Result<UnionRule, RuleError> {
    let alternatives = match field(map, "values") {
        None => return Err(RuleError::EmptyUnion { at: at.clone() }),
        Some(Value::Sequence(items)) => {
            let base = at.child("values");
            items
                .iter()
                .enumerate()
                .map(|(i, item)| Rule::parse(item, &base.child(i.to_string())))
                .collect::<Result<Vec<_>, _>>()?
        }
        Some(other) => return Err(invalid_field(at, "values", "a list of rules", other)),
    };
    if alternatives.is_empty() {
        return Err(RuleError::EmptyUnion { at: at.clone() });
    }
    Ok(UnionRule { alternatives })
}

fn parse_descent(map: &Mapping, at: &TreePath) -> Result<DescentRule, RuleError> {
    let others_allowed = match field(map, "others-allowed") {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(other) => return Err(invalid_field(at, "others-allowed", "a boolean", other)),
    };
    Ok(DescentRule {
        mandatory: key_list(map, "mandatory", at)?,
        allowed: key_list(map, "allowed", at)?,
        deprecated: noted_keys(map, "deprecated", at)?,
        forbidden: noted_keys(map, "forbidden", at)?,
        others_allowed,
    })
}

/// A key collection given either as a list or as the keys of a mapping.
fn key_list(map: &Mapping, name: &'static str, at: &TreePath) -> Result<Vec<Value>, RuleError> {
    match field(map, name) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Sequence(items)) => Ok(items.clone()),
        Some(Value::Mapping(keys)) => Ok(keys.keys().cloned().collect()),
        Some(other) => Err(invalid_field(at, name, "a list or mapping of keys", other)),
    }
}

/// A `key: note` mapping. A plain list of keys is accepted as keys without notes.
fn noted_keys(map: &Mapping, name: &'static str, at: &TreePath) -> Result<Vec<NotedKey>, RuleError> {
    match field(map, name) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Mapping(entries)) => Ok(entries
            .iter()
            .map(|(key, note)| NotedKey {
                key: key.clone(),
                note: match untagged(note) {
                    Value::Null => None,
                    other => Some(key_text(other)),
                },
            })
            .collect()),
        Some(Value::Sequence(items)) => Ok(items
            .iter()
            .map(|key| NotedKey {
                key: key.clone(),
                note: None,
            })
            .collect()),
        Some(other) => Err(invalid_field(at, name, "a mapping of key to note", other)),
    }
}
