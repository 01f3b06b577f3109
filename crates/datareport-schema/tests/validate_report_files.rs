//! Integration test: validate report data files on disk against a rule file.
//!
//! The rule file describes a typical report dataset: a mapping with a
//! mandatory title and author, an optional list of measurements, and a
//! deprecated `date` key superseded by `time`.

use std::path::{Path, PathBuf};

use datareport_schema::{
    Reason, SchemaValidationError, Validator, ValidatorOptions,
};

const REPORT_RULES: &str = r#"
type: dict
keys: {type: str, regex: '[a-z_]+'}
values:
  type: in
  values:
    - {type: str}
    - {type: int, min: 0}
    - type: list
      values:
        type: dict
        values:
          type: in
          values:
            - {type: float, min: 0.0, sup: 1000.0}
            - {type: str, regex: '[A-Z]{2,4}'}
    - type: dictdescent
      mandatory: [name]
      allowed: [mail]
      deprecated: {phone: "contact by mail"}
"#;

fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).expect("write fixture");
    path
}

fn validators(dir: &Path) -> (Validator, Validator) {
    let rules = write(dir, "verify.yaml", REPORT_RULES);
    let report = Validator::from_rule_file(&rules, ValidatorOptions::default()).unwrap();
    let strict = Validator::from_rule_file(&rules, ValidatorOptions::strict()).unwrap();
    (report, strict)
}

#[test]
fn test_valid_yaml_report() {
    let dir = tempfile::tempdir().unwrap();
    let (report, strict) = validators(dir.path());
    let data = write(
        dir.path(),
        "report.yaml",
        r#"
title: Beam time
runs: 12
measurements:
  - {energy: 12.5, unit: KEV}
  - {energy: 0.25, unit: MEV}
author: {name: Dennis, mail: d@example.org}
"#,
    );
    assert!(report.validate_file(&data).unwrap());
    assert!(strict.validate_file(&data).unwrap());
}

#[test]
fn test_valid_json_report() {
    let dir = tempfile::tempdir().unwrap();
    let (report, _) = validators(dir.path());
    let data = write(
        dir.path(),
        "report.json",
        r#"{"title": "Beam time", "runs": 3, "measurements": [{"energy": 1.5}]}"#,
    );
    assert!(report.validate_file(&data).unwrap());
}

#[test]
fn test_deprecated_key_is_accepted() {
    let dir = tempfile::tempdir().unwrap();
    let (report, _) = validators(dir.path());
    let data = write(
        dir.path(),
        "report.yaml",
        "title: x\nauthor: {name: D, phone: '0123'}\n",
    );
    assert!(report.validate_file(&data).unwrap());
}

#[test]
fn test_integer_measurement_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let (report, strict) = validators(dir.path());
    // 12 is an integer; measurement values must be floats or unit codes.
    let data = write(
        dir.path(),
        "report.yaml",
        "title: x\nmeasurements:\n  - {energy: 12}\n",
    );
    assert!(!report.validate_file(&data).unwrap());

    let err = strict.validate_file(&data).unwrap_err();
    match err {
        SchemaValidationError::ValidationFailed(violation) => {
            assert_eq!(violation.path.to_string(), "/:values:measurements");
            assert!(matches!(violation.reason, Reason::NoAlternative { .. }));
            assert!(violation.to_string().contains("/:values:measurements:0:values:energy"));
        }
        other => panic!("Expected ValidationFailed, got: {other}"),
    }
}

#[test]
fn test_bad_key_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let (report, strict) = validators(dir.path());
    let data = write(dir.path(), "report.yaml", "Title: x\n");
    assert!(!report.validate_file(&data).unwrap());
    let err = strict.validate_file(&data).unwrap_err();
    assert_eq!(
        err.to_string(),
        "/:Title: INVALID, does not match pattern '[a-z_]+'"
    );
}

#[test]
fn test_unknown_author_field_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let (report, _) = validators(dir.path());
    let data = write(
        dir.path(),
        "report.yaml",
        "title: x\nauthor: {name: D, office: 12}\n",
    );
    assert!(!report.validate_file(&data).unwrap());
}

#[test]
fn test_missing_data_file_is_an_error_in_both_modes() {
    let dir = tempfile::tempdir().unwrap();
    let (report, strict) = validators(dir.path());
    let absent = dir.path().join("absent.yaml");
    for validator in [&report, &strict] {
        let err = validator.validate_file(&absent).unwrap_err();
        assert!(
            matches!(err, SchemaValidationError::Document(_)),
            "Expected Document error, got: {err}"
        );
    }
}

#[test]
fn test_broken_rule_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let rules = write(
        dir.path(),
        "verify.yaml",
        "type: dict\nvalues: {type: in, values: [{type: int}, {type: number}]}\n",
    );
    let err = Validator::from_rule_file(&rules, ValidatorOptions::default()).unwrap_err();
    assert_eq!(
        err.to_string(),
        "invalid rule: /:values:values:1: no validator of type 'number'"
    );
}
