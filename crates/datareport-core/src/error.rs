//! # Error Types
//!
//! Errors raised while turning files or strings into value trees. Every
//! variant carries the origin (a file path or `<string>`) so the caller can
//! report it without extra context.

use thiserror::Error;

use crate::document::DocumentFormat;

/// Error while reading or parsing a document.
#[derive(Error, Debug)]
pub enum DocumentError {
    /// The file could not be read.
    #[error("cannot read '{path}': {source}")]
    Read {
        /// Path of the file that failed to load.
        path: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The text is not a valid document in the expected format.
    #[error("invalid {format} in '{origin}': {reason}")]
    Parse {
        /// File path, or `<string>` for inline text.
        origin: String,
        /// Format the text was parsed as.
        format: DocumentFormat,
        /// Parser message.
        reason: String,
    },
}
