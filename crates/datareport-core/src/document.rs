//! # Document Loading
//!
//! Turns YAML or JSON text into a `serde_yaml::Value` tree. The format is
//! chosen from the file extension: `.json` is parsed as JSON, everything
//! else as YAML (which also accepts JSON input).
//!
//! JSON is deserialized straight into `serde_yaml::Value`, so both formats
//! produce the same tree shape and keep `1` and `1.0` apart.

use std::fmt;
use std::path::Path;

use serde_yaml::Value;

use crate::error::DocumentError;

/// Origin reported for documents parsed from an in-memory string.
pub const INLINE_ORIGIN: &str = "<string>";

/// Supported document formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    /// YAML 1.2 (a superset of JSON).
    Yaml,
    /// Strict JSON.
    Json,
}

impl DocumentFormat {
    /// Select the format from the extension of `path`.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Yaml,
        }
    }

    /// Human-readable format name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Yaml => "YAML",
            Self::Json => "JSON",
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse `source` as a document of the given format.
///
/// # Errors
///
/// Returns `DocumentError::Parse` with origin `<string>` if the text is not
/// valid in `format`.
pub fn parse_document(source: &str, format: DocumentFormat) -> Result<Value, DocumentError> {
    parse_with_origin(source, format, INLINE_ORIGIN)
}

/// Read the file at `path` and parse it according to its extension.
///
/// # Errors
///
/// Returns `DocumentError::Read` if the file cannot be read and
/// `DocumentError::Parse` if its content is malformed.
pub fn load_document(path: &Path) -> Result<Value, DocumentError> {
    tracing::debug!(path = %path.display(), "opening document");
    let content = std::fs::read_to_string(path).map_err(|source| DocumentError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let format = DocumentFormat::from_path(path);
    parse_with_origin(&content, format, &path.display().to_string())
}

fn parse_with_origin(
    source: &str,
    format: DocumentFormat,
    origin: &str,
) -> Result<Value, DocumentError> {
    let parsed = match format {
        DocumentFormat::Yaml => serde_yaml::from_str::<Value>(source).map_err(|e| e.to_string()),
        DocumentFormat::Json => serde_json::from_str::<Value>(source).map_err(|e| e.to_string()),
    };
    parsed.map_err(|reason| DocumentError::Parse {
        origin: origin.to_string(),
        format,
        reason,
    })
}
