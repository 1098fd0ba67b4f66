//! Error type for every session operation.
//!
//! Each variant maps to one failure kind of the protocol session. Nothing is
//! retried or swallowed inside the crate: the operation that hit the condition
//! returns it to the caller and leaves the session unchanged.

use thiserror::Error;

use super::state::SessionState;

/// The unified error type for OML session operations.
#[derive(Debug, Error)]
pub enum OmlError {
    /// Missing or malformed configuration (application name, target URI, port).
    #[error("Configuration error: {0}")]
    Config(String),

    /// The collection target names a scheme other than `tcp`.
    #[error("Unsupported collection scheme '{0}', only 'tcp' is supported")]
    UnsupportedScheme(String),

    /// A schema token names a type outside the supported set.
    #[error("Unsupported type '{type_name}' for field '{field}'")]
    UnsupportedType { field: String, type_name: String },

    /// A schema string could not be parsed into `name:type` fields.
    #[error("Invalid schema for '{point}': {reason}")]
    InvalidSchema { point: String, reason: String },

    /// A measurement point with this name is already registered.
    #[error("Measurement point '{0}' is already declared")]
    DuplicateSchema(String),

    /// The operation is not allowed in the current lifecycle state.
    #[error("{operation}() is not allowed while the session is {state}")]
    ProtocolState {
        operation: &'static str,
        state: SessionState,
    },

    /// Injection into a measurement point that was never declared.
    #[error("Unknown measurement point '{0}'")]
    UnknownMeasurementPoint(String),

    /// Metadata addressed a field that the measurement point does not have.
    #[error("Field '{field}' not found in measurement point '{point}'")]
    UnknownField { point: String, field: String },

    /// A value tuple does not match the declared schema.
    #[error("Type mismatch on '{field}': {reason}")]
    TypeMismatch { field: String, reason: String },

    /// The outbound connection could not be established at start.
    #[error("Could not connect to collection endpoint {target}")]
    Connection {
        target: String,
        #[source]
        source: std::io::Error,
    },

    /// Writing to an established sink failed.
    #[error("Transport error: {0}")]
    Transport(#[source] std::io::Error),
}

impl OmlError {
    pub(crate) fn mismatch(field: impl Into<String>, reason: impl Into<String>) -> Self {
        OmlError::TypeMismatch {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Result alias used throughout the session API.
pub type Result<T> = std::result::Result<T, OmlError>;
