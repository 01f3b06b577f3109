//! # Verify Subcommands
//!
//! `datareport verify` loads a rule file once and validates every data file
//! given on the command line against it, printing one line per file:
//!
//! ```text
//! report.yaml: valid.
//! broken.yaml: INVALID!
//! ```
//!
//! In strict mode the failing path and reason are appended to the
//! `INVALID!` line. In the default report mode they are logged as warnings.
//!
//! `datareport check-rules` only parses a rule file, so broken rule trees can
//! be caught before any data is validated.
//!
//! Exit codes: `0` when everything is valid, `1` when at least one file is
//! invalid. Unreadable files and malformed rules abort the run with an error.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use datareport_core::load_document;
use datareport_schema::{SchemaValidationError, Validator};

use crate::config::VerifyConfig;

/// Arguments for the `datareport verify` subcommand.
#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Validation rule file in YAML format [default: verify.yaml].
    #[arg(long)]
    pub validation: Option<PathBuf>,

    /// Append the failing path and reason to each INVALID line.
    #[arg(long)]
    pub strict: bool,

    /// Maximum nesting depth of validated values.
    #[arg(long)]
    pub max_depth: Option<usize>,

    /// Data files to verify (YAML, or JSON by `.json` extension).
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}

/// Arguments for the `datareport check-rules` subcommand.
#[derive(Args, Debug)]
pub struct CheckRulesArgs {
    /// Rule file to check.
    pub rules: PathBuf,
}

impl VerifyArgs {
    /// Merge command-line flags over the file configuration.
    pub fn effective_config(&self, base: &VerifyConfig) -> VerifyConfig {
        VerifyConfig {
            validation: self
                .validation
                .clone()
                .unwrap_or_else(|| base.validation.clone()),
            strict: self.strict || base.strict,
            max_depth: self.max_depth.unwrap_or(base.max_depth),
        }
    }
}

/// Outcome of verifying a set of files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VerifySummary {
    /// Files that satisfied the rules.
    pub valid: usize,
    /// Files that did not.
    pub invalid: usize,
}

impl VerifySummary {
    /// Process exit code for this outcome.
    pub fn exit_code(&self) -> u8 {
        if self.invalid == 0 {
            0
        } else {
            1
        }
    }
}

/// Execute the verify subcommand.
pub fn run_verify(args: &VerifyArgs, base: &VerifyConfig) -> Result<u8> {
    let config = args.effective_config(base);
    tracing::info!(rules = %config.validation.display(), "loading validation rules");
    let validator = Validator::from_rule_file(&config.validation, config.options()?)
        .with_context(|| format!("failed to load rules from {}", config.validation.display()))?;

    let stdout = std::io::stdout();
    let summary = verify_files(&validator, &args.files, &mut stdout.lock())?;
    tracing::info!(
        valid = summary.valid,
        invalid = summary.invalid,
        "verification complete"
    );
    Ok(summary.exit_code())
}

/// Validate each file with `validator`, writing one status line per file to `out`.
pub fn verify_files(validator: &Validator, files: &[PathBuf], out: &mut impl Write) -> Result<VerifySummary> {
    let mut summary = VerifySummary::default();
    for file in files {
        tracing::info!(file = %file.display(), "verifying");
        match verify_one(validator, file)? {
            Verdict::Valid => {
                summary.valid += 1;
                writeln!(out, "{}: valid.", file.display())?;
            }
            Verdict::Invalid { detail: Some(detail) } => {
                summary.invalid += 1;
                writeln!(out, "{}: INVALID! {detail}", file.display())?;
            }
            Verdict::Invalid { detail: None } => {
                summary.invalid += 1;
                writeln!(out, "{}: INVALID!", file.display())?;
            }
        }
    }
    Ok(summary)
}

enum Verdict {
    Valid,
    /// `detail` is only known in strict mode.
    Invalid { detail: Option<String> },
}

fn verify_one(validator: &Validator, file: &Path) -> Result<Verdict> {
    let value = load_document(file).with_context(|| format!("failed to load {}", file.display()))?;
    match validator.validate(&value) {
        Ok(true) => Ok(Verdict::Valid),
        Ok(false) => Ok(Verdict::Invalid { detail: None }),
        Err(SchemaValidationError::ValidationFailed(violation)) => Ok(Verdict::Invalid {
            detail: Some(violation.to_string()),
        }),
        Err(other) => Err(other).with_context(|| format!("failed to verify {}", file.display())),
    }
}

/// Execute the check-rules subcommand.
pub fn run_check_rules(args: &CheckRulesArgs, base: &VerifyConfig) -> Result<u8> {
    let stdout = std::io::stdout();
    check_rules(&args.rules, base, &mut stdout.lock())
}

/// Parse the rule file at `rules`, writing the verdict to `out`.
pub fn check_rules(rules: &Path, base: &VerifyConfig, out: &mut impl Write) -> Result<u8> {
    match Validator::from_rule_file(rules, base.options()?) {
        Ok(validator) => {
            writeln!(
                out,
                "{}: rules ok (top-level type '{}').",
                rules.display(),
                validator.rule().kind()
            )?;
            Ok(0)
        }
        Err(SchemaValidationError::Rule(err)) => {
            writeln!(out, "{}: INVALID RULES! {err}", rules.display())?;
            Ok(1)
        }
        Err(other) => Err(other).with_context(|| format!("failed to load rules from {}", rules.display())),
    }
}
