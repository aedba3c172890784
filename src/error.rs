//! Rich diagnostic error types for the SDSL compiler.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes, help text, and source chains so callers know exactly
//! which part of the specification or bundle broke its contract.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for the SDSL compiler and its host.
///
/// The compilation itself only ever fails with [`ValidationError`]; the other
/// variants come from the host side (config files, reading specifications).
#[derive(Debug, Error, Diagnostic)]
pub enum SdslError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] crate::config::ConfigError),

    #[error("I/O error on {path}")]
    #[diagnostic(
        code(sdsl::io),
        help("Check that the file exists and that you have the required permissions.")
    )]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode compiler output: {message}")]
    #[diagnostic(
        code(sdsl::encode),
        help("The artifact bundle could not be serialized to JSON. This is a bug; please report it.")
    )]
    Encode { message: String },
}

// ---------------------------------------------------------------------------
// Validation errors
// ---------------------------------------------------------------------------

/// A schema contract violation, either in raw input or in a derived artifact.
///
/// Always carries the path of the *first* violation found. Validation aborts
/// the whole compilation; no partial bundle is produced.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum ValidationError {
    #[error("malformed value at {path}: {message}")]
    #[diagnostic(
        code(sdsl::validate::structure),
        help(
            "The value does not have the expected shape. Check field names (camelCase), \
             value types, and that enum values are spelled exactly as documented."
        )
    )]
    Structure { path: String, message: String },

    #[error("empty string at {path}")]
    #[diagnostic(
        code(sdsl::validate::empty),
        help("Identifiers, labels and references must be non-empty strings.")
    )]
    EmptyString { path: String },

    #[error("empty list at {path}")]
    #[diagnostic(
        code(sdsl::validate::empty_list),
        help("This list must contain at least one entry.")
    )]
    EmptyList { path: String },

    #[error("invariant violated at {path}: {message}")]
    #[diagnostic(
        code(sdsl::validate::invariant),
        help(
            "A derived artifact is inconsistent with the rest of the bundle. \
             This indicates a compiler bug rather than bad input; please report it \
             together with the specification that triggered it."
        )
    )]
    Invariant { path: String, message: String },
}

impl ValidationError {
    /// Path of the violation, e.g. `$.features[1].label`.
    pub fn path(&self) -> &str {
        match self {
            Self::Structure { path, .. }
            | Self::EmptyString { path }
            | Self::EmptyList { path }
            | Self::Invariant { path, .. } => path,
        }
    }
}

/// Convenience alias for validation results.
pub type ValidationResult<T> = std::result::Result<T, ValidationError>;

/// Convenience alias for functions returning compiler results.
pub type SdslResult<T> = std::result::Result<T, SdslError>;
