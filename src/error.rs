//! Error types for the Firebird client binding.

use crate::protocol::constants::{ISC_ARITH_EXCEPT, ISC_STRING_TRUNCATION};
use std::panic::Location;
use thiserror::Error;

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for client operations.
#[derive(Error, Debug)]
pub enum Error {
    /// The API was used in a way it does not allow.
    #[error("{message}")]
    Usage { message: String },

    /// The statement kind is recognised but cannot be handled by this layer.
    #[error("Unsupported statement: {message}")]
    Unsupported { message: String },

    /// Parameter or column index out of range.
    #[error("Index {index} out of range (count: {count})")]
    IndexOutOfRange { index: usize, count: usize },

    /// Aggregate binding with the wrong number of elements.
    #[error("{what} count ({actual}) does not match {target} count ({expected})")]
    CountMismatch {
        what: &'static str,
        target: &'static str,
        actual: usize,
        expected: usize,
    },

    /// NULL read into a slot that cannot hold it.
    #[error("Null value encountered for non-optional field at index {index}")]
    NullValue { index: usize },

    /// The value type cannot be bound to or read from the descriptor type.
    #[error("Invalid type: actual type {actual}, descriptor type {descriptor}")]
    InvalidType { actual: String, descriptor: String },

    /// A value could not be converted without loss.
    #[error("Cannot convert {from} to {to}: {message}")]
    Conversion {
        from: String,
        to: String,
        message: String,
    },

    /// String longer than the declared column length.
    #[error("arithmetic exception, numeric overflow, or string truncation: string right truncation (expected length {max_length}, actual {length})")]
    StringTruncation { length: usize, max_length: usize },

    /// Failure reported by the engine.
    #[error("{message}")]
    Engine { codes: Vec<i64>, message: String },

    /// Engine failure annotated with the operation and target it happened in.
    #[error("{operation} ({target}): {source}")]
    Context {
        operation: &'static str,
        target: String,
        #[source]
        source: Box<Error>,
    },

    /// Message buffer access outside the allocated message.
    #[error("Buffer too small: need {needed} bytes, have {available}, raised at {location}")]
    BufferTooSmall {
        needed: usize,
        available: usize,
        location: &'static Location<'static>,
    },
}

impl Error {
    /// Create a usage error.
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage {
            message: message.into(),
        }
    }

    /// Create a conversion error.
    pub fn conversion(
        from: impl Into<String>,
        to: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Conversion {
            from: from.into(),
            to: to.into(),
            message: message.into(),
        }
    }

    /// Create an engine error from a status vector and message text.
    pub fn engine(codes: Vec<i64>, message: impl Into<String>) -> Self {
        Self::Engine {
            codes,
            message: message.into(),
        }
    }

    /// Wrap this error with the operation and target identifier it came from.
    pub fn with_context(self, operation: &'static str, target: impl Into<String>) -> Self {
        Self::Context {
            operation,
            target: target.into(),
            source: Box::new(self),
        }
    }

    /// Engine diagnostic codes carried by this error, if any.
    pub fn codes(&self) -> Vec<i64> {
        match self {
            Error::Engine { codes, .. } => codes.clone(),
            Error::StringTruncation { .. } => vec![ISC_ARITH_EXCEPT, ISC_STRING_TRUNCATION],
            Error::Context { source, .. } => source.codes(),
            _ => Vec::new(),
        }
    }

    /// Whether this is the engine's string truncation condition.
    pub fn is_truncation(&self) -> bool {
        self.codes().contains(&ISC_STRING_TRUNCATION)
    }

    /// Innermost error once context wrappers are stripped.
    pub fn root(&self) -> &Error {
        match self {
            Error::Context { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Extension for attaching operation context to engine results.
pub(crate) trait ResultExt<T> {
    fn context(self, operation: &'static str, target: impl AsRef<str>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, operation: &'static str, target: impl AsRef<str>) -> Result<T> {
        self.map_err(|e| match e {
            Error::Engine { .. } => e.with_context(operation, target.as_ref()),
            other => other,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncation_codes() {
        let err = Error::StringTruncation {
            length: 12,
            max_length: 10,
        };
        assert!(err.is_truncation());
        assert_eq!(err.codes(), vec![ISC_ARITH_EXCEPT, ISC_STRING_TRUNCATION]);
    }

    #[test]
    fn test_context_keeps_codes() {
        let err = Error::engine(vec![335544344], "I/O error").with_context("Attachment::attach", "db.fdb");
        assert_eq!(err.codes(), vec![335544344]);
        assert!(err.to_string().contains("Attachment::attach (db.fdb)"));
        assert!(matches!(err.root(), Error::Engine { .. }));
    }

    #[test]
    fn test_context_only_wraps_engine_errors() {
        let result: Result<()> = Err(Error::usage("bad"));
        let err = result.context("Statement::execute", "select 1").unwrap_err();
        assert!(matches!(err, Error::Usage { .. }));
    }

    #[test]
    fn test_messages() {
        let err = Error::CountMismatch {
            what: "Struct field",
            target: "output column",
            actual: 3,
            expected: 2,
        };
        assert_eq!(
            err.to_string(),
            "Struct field count (3) does not match output column count (2)"
        );
        assert_eq!(
            Error::NullValue { index: 1 }.to_string(),
            "Null value encountered for non-optional field at index 1"
        );
        let err = Error::InvalidType {
            actual: "Date".into(),
            descriptor: "INT32".into(),
        };
        assert_eq!(err.to_string(), "Invalid type: actual type Date, descriptor type INT32");
    }
}
