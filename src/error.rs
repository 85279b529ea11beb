//! Crate-wide error type.
//!
//! Follows the shape used throughout the Bluetooth ecosystem: a struct
//! carrying a non-exhaustive `kind` plus a free-form `message`, with the
//! kind's `Display` impl supplying the canonical wording via `displaydoc`.

use std::fmt;

/// bluesig error.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Error {
    /// Error kind.
    pub kind: ErrorKind,
    /// Detailed, human-readable message.
    pub message: String,
}

/// bluesig error kind.
#[derive(Clone, Debug, displaydoc::Display, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum ErrorKind {
    /// invalid UUID: {0}
    InvalidUuid(String),
    /// class {0} could not resolve its UUID from any name variant (tried: {1})
    UuidResolution(String, String),
    /// no codec registered for UUID {0}
    Unsupported(String),
    /// insufficient data for {0}: expected {1} bytes, got {2}
    InsufficientData(String, usize, usize),
    /// field {0} failed to decode: {1}
    ParseField(String, String),
    /// parse of {0} ({1}) failed
    Parse(String, String),
    /// encode of {0} ({1}) failed
    Encode(String, String),
    /// raw value for {0} ({1}) matched a special/sentinel encoding
    SpecialValueDetected(String, String),
    /// missing required dependency for {0}: {1:?}
    MissingDependency(String, Vec<String>),
    /// UUID {0} already registered as {1}
    RegistrationConflict(String, String),
    /// internal error: {0}
    Internal(String),
}

impl Error {
    pub(crate) fn new(kind: ErrorKind) -> Self {
        Self { kind, message: String::new() }
    }

    pub(crate) fn with_message(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}: {}", self.kind, self.message)
        }
    }
}

impl std::error::Error for Error {}

/// bluesig result.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_message_when_present() {
        let err = Error::with_message(ErrorKind::Internal("bug".into()), "extra context");
        assert_eq!(err.to_string(), "internal error: bug: extra context");
    }

    #[test]
    fn display_omits_empty_message() {
        let err = Error::new(ErrorKind::Unsupported("180F".into()));
        assert_eq!(err.to_string(), "no codec registered for UUID 180F");
    }
}
