//! # Configuration
//!
//! Optional YAML configuration file for the `verify` subcommand, selected
//! with the global `--config` flag. Command-line flags override values from
//! the file; missing values fall back to the defaults.
//!
//! ```yaml
//! validation: rules/report.yaml
//! strict: true
//! max-depth: 64
//! ```

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use datareport_schema::{Mode, ValidatorOptions, DEFAULT_MAX_DEPTH};

/// Rule file used when neither the config file nor `--validation` names one.
pub const DEFAULT_RULE_FILE: &str = "verify.yaml";

/// Settings for the `verify` subcommand.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct VerifyConfig {
    /// Rule file in YAML format.
    pub validation: PathBuf,
    /// Report failures as errors carrying the failing path.
    pub strict: bool,
    /// Maximum nesting depth of validated values.
    pub max_depth: usize,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            validation: PathBuf::from(DEFAULT_RULE_FILE),
            strict: false,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl VerifyConfig {
    /// Load the configuration file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        tracing::debug!(path = %path.display(), ?config, "loaded configuration");
        Ok(config)
    }

    /// Load `path` if given, otherwise use the defaults.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Validator options derived from this configuration.
    ///
    /// # Errors
    ///
    /// Fails when `max-depth` is zero: the document root already counts as
    /// one level, so such a limit would reject every document.
    pub fn options(&self) -> Result<ValidatorOptions> {
        if self.max_depth == 0 {
            bail!("max-depth must be at least 1, the document root counts as one level");
        }
        Ok(ValidatorOptions {
            mode: Mode::from_throw(self.strict),
            max_depth: self.max_depth,
        })
    }
}
