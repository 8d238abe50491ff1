//! Error type for `wasm-gas-meter`.
//!
//! Mirrors `wrt-error`'s category + numeric code + message shape, scoped
//! down to a single `std`-only tier (see `SPEC_FULL.md` §5.1 for why the
//! teacher's `no_std`/ASIL matrix is not carried forward here).

use std::fmt;

use crate::codes;

/// Coarse classification of an [`Error`], matching the three error kinds
/// spec.md §7 names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Malformed input encountered while parsing a binary module.
    Decode,
    /// A precondition of the metering transform was violated.
    Transform,
    /// The module representation could not be re-emitted as bytes.
    Encode,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Decode => "decode",
            Self::Transform => "transform",
            Self::Encode => "encode",
        };
        f.write_str(s)
    }
}

/// The error type returned by every fallible operation in this crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    /// Which subsystem raised the error.
    pub category: ErrorCategory,
    /// A numeric code from [`crate::codes`], stable across crate versions.
    pub code: u16,
    /// A human-readable description of what went wrong.
    pub message: String,
}

impl Error {
    /// Build an error in the given category.
    pub fn new(category: ErrorCategory, code: u16, message: impl Into<String>) -> Self {
        Self { category, code, message: message.into() }
    }

    /// A malformed-binary error (spec.md §7 `DecodeError`).
    pub fn decode(code: u16, message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Decode, code, message)
    }

    /// The configured meter import already exists (spec.md §7
    /// `ErrImportMeterFunc`).
    pub fn duplicate_meter_import(module_str: &str, field_str: &str) -> Self {
        Self::new(
            ErrorCategory::Transform,
            codes::DUPLICATE_METER_IMPORT,
            format!("module already imports a function named ({module_str}, {field_str})"),
        )
    }

    /// The module representation cannot be re-emitted (spec.md §7
    /// `EncodeError`).
    pub fn encode(code: u16, message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Encode, code, message)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} error [{}]: {}", self.category, self.code, self.message)
    }
}

impl std::error::Error for Error {}

/// The crate-wide result alias.
pub type Result<T> = core::result::Result<T, Error>;
