//! # Scalar Helpers
//!
//! Small functions over `serde_yaml::Value` used by the validator for type
//! checks and diagnostics.
//!
//! Numbers are compared exactly, including an integer against a float: a
//! large integer is never rounded to the nearest `f64` first. Two floats
//! compare in `f64`, and NaN compares as unordered.

use std::cmp::Ordering;

use serde_yaml::{Number, Value};

/// Strip YAML tags, returning the innermost tagged value.
pub fn untagged(value: &Value) -> &Value {
    match value {
        Value::Tagged(tagged) => untagged(&tagged.value),
        other => other,
    }
}

/// Short type name of a value, as shown in diagnostics.
pub fn type_name(value: &Value) -> &'static str {
    match untagged(value) {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if is_integer(n) => "int",
        Value::Number(_) => "float",
        Value::String(_) => "str",
        Value::Sequence(_) => "list",
        Value::Mapping(_) => "dict",
        Value::Tagged(_) => "tagged",
    }
}

/// True when `n` was written as an integer.
pub fn is_integer(n: &Number) -> bool {
    n.is_i64() || n.is_u64()
}

/// Natural text form of a mapping key, used as a path segment.
pub fn key_text(value: &Value) -> String {
    match untagged(value) {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        other => serde_json::to_string(other).unwrap_or_else(|_| format!("{other:?}")),
    }
}

/// Compare two numbers.
///
/// Returns `None` when either side is NaN.
pub fn compare_numbers(a: &Number, b: &Number) -> Option<Ordering> {
    match (integer_value(a), integer_value(b)) {
        (Some(x), Some(y)) => Some(x.cmp(&y)),
        (Some(x), None) => compare_integer_to_float(x, b.as_f64()?),
        (None, Some(y)) => compare_integer_to_float(y, a.as_f64()?).map(Ordering::reverse),
        (None, None) => a.as_f64()?.partial_cmp(&b.as_f64()?),
    }
}

/// Every YAML integer fits an `i128`.
fn integer_value(n: &Number) -> Option<i128> {
    n.as_i64()
        .map(i128::from)
        .or_else(|| n.as_u64().map(i128::from))
}

fn compare_integer_to_float(int: i128, float: f64) -> Option<Ordering> {
    // Outside this window `floor` is beyond any YAML integer.
    const LOW: f64 = -9_223_372_036_854_775_808.0; // -2^63
    const HIGH: f64 = 18_446_744_073_709_551_616.0; // 2^64
    if float.is_nan() {
        return None;
    }
    let floor = float.floor();
    if floor < LOW {
        return Some(Ordering::Greater);
    }
    if floor >= HIGH {
        return Some(Ordering::Less);
    }
    // `floor` is integral and in range, so the cast is exact.
    match int.cmp(&(floor as i128)) {
        Ordering::Equal if float > floor => Some(Ordering::Less),
        ordering => Some(ordering),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(text: &str) -> Value {
        serde_yaml::from_str(text).unwrap()
    }

    fn num(text: &str) -> Number {
        match yaml(text) {
            Value::Number(n) => n,
            other => panic!("not a number: {other:?}"),
        }
    }

    #[test]
    fn type_names_distinguish_int_and_float() {
        assert_eq!(type_name(&yaml("1")), "int");
        assert_eq!(type_name(&yaml("1.0")), "float");
        assert_eq!(type_name(&yaml("-7")), "int");
        assert_eq!(type_name(&yaml("18446744073709551615")), "int");
    }

    #[test]
    fn type_names_for_containers_and_scalars() {
        assert_eq!(type_name(&yaml("~")), "null");
        assert_eq!(type_name(&yaml("true")), "bool");
        assert_eq!(type_name(&yaml("hello")), "str");
        assert_eq!(type_name(&yaml("[1, 2]")), "list");
        assert_eq!(type_name(&yaml("{a: 1}")), "dict");
    }

    #[test]
    fn tags_are_transparent() {
        let value = yaml("!custom 42");
        assert!(matches!(value, Value::Tagged(_)));
        assert_eq!(type_name(&value), "int");
        assert_eq!(untagged(&value), &yaml("42"));
    }

    #[test]
    fn key_text_renders_scalars() {
        assert_eq!(key_text(&yaml("name")), "name");
        assert_eq!(key_text(&yaml("12")), "12");
        assert_eq!(key_text(&yaml("2.5")), "2.5");
        assert_eq!(key_text(&yaml("false")), "false");
        assert_eq!(key_text(&yaml("~")), "null");
        assert_eq!(key_text(&yaml("[1, 2]")), "[1,2]");
    }

    #[test]
    fn compare_integers_exactly() {
        assert_eq!(compare_numbers(&num("42"), &num("43")), Some(Ordering::Less));
        assert_eq!(compare_numbers(&num("43"), &num("43")), Some(Ordering::Equal));
        assert_eq!(
            compare_numbers(&num("9007199254740993"), &num("9007199254740992")),
            Some(Ordering::Greater)
        );
    }

    #[test]
    fn compare_large_unsigned_against_negative() {
        assert_eq!(
            compare_numbers(&num("-1"), &num("18446744073709551615")),
            Some(Ordering::Less)
        );
        assert_eq!(
            compare_numbers(&num("18446744073709551615"), &num("-1")),
            Some(Ordering::Greater)
        );
    }

    #[test]
    fn compare_mixed_int_and_float() {
        assert_eq!(compare_numbers(&num("42"), &num("42.0")), Some(Ordering::Equal));
        assert_eq!(compare_numbers(&num("41.5"), &num("42")), Some(Ordering::Less));
        assert_eq!(compare_numbers(&num("1.0"), &num("0.5")), Some(Ordering::Greater));
    }

    #[test]
    fn compare_large_integer_against_float_exactly() {
        // 2^53 + 1 has no exact f64 representation.
        assert_eq!(
            compare_numbers(&num("9007199254740993"), &num("9007199254740992.0")),
            Some(Ordering::Greater)
        );
        assert_eq!(
            compare_numbers(&num("9007199254740992.0"), &num("9007199254740993")),
            Some(Ordering::Less)
        );
        assert_eq!(
            compare_numbers(&num("9007199254740992"), &num("9007199254740992.0")),
            Some(Ordering::Equal)
        );
    }

    #[test]
    fn compare_integer_against_fractional_and_extreme_floats() {
        assert_eq!(compare_numbers(&num("-2"), &num("-1.5")), Some(Ordering::Less));
        assert_eq!(compare_numbers(&num("-1"), &num("-1.5")), Some(Ordering::Greater));
        assert_eq!(compare_numbers(&num("18446744073709551615"), &num("1.0e30")), Some(Ordering::Less));
        assert_eq!(compare_numbers(&num("-9223372036854775808"), &num("-1.0e30")), Some(Ordering::Greater));
        assert_eq!(compare_numbers(&num("5"), &num(".inf")), Some(Ordering::Less));
        assert_eq!(compare_numbers(&num("5"), &num("-.inf")), Some(Ordering::Greater));
    }

    #[test]
    fn nan_is_unordered() {
        let nan = num(".nan");
        assert_eq!(compare_numbers(&nan, &num("1")), None);
        assert_eq!(compare_numbers(&num("1.0"), &nan), None);
    }
}
