//! Error types for the client runtime.
//!
//! [`SerializationError`] covers everything a codec, a codec registry, or a
//! [`crate::Parsable`] model can report while reading or writing a payload.
//! [`RequestError`] is what a [`crate::RequestAdapter`] call returns; it wraps
//! serialization failures and adds the failure modes of the request pipeline
//! itself (authentication, transport, empty responses, response handlers).
//!
//! Errors produced by external collaborators (authentication providers,
//! transports, response handlers) are carried as [`BoxError`] sources and are
//! never reinterpreted.

use thiserror::Error;

/// Type-erased error produced by an external collaborator.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

// ---------------------------------------------------------------------------
// Serialization errors
// ---------------------------------------------------------------------------

/// Errors raised by parse nodes, serialization writers, and codec registries.
#[derive(Debug, Error)]
pub enum SerializationError {
    /// No codec factory is registered for the (normalised) content type.
    #[error("Content type '{content_type}' does not have a registered factory")]
    UnsupportedMediaType {
        /// The normalised content type that was looked up.
        content_type: String,
    },

    /// The requested child of a parse node does not exist.
    #[error("Child node '{key}' not found")]
    ChildNotFound {
        /// The key that was requested.
        key: String,
    },

    /// The node holds a value of a different shape than the one requested.
    ///
    /// Produced by: every typed extractor of a parse node, e.g. asking for an
    /// object where the payload has a scalar.
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// The shape the caller asked for.
        expected: &'static str,
        /// The shape actually present in the payload.
        found: &'static str,
    },

    /// A runtime primitive type name is not one of the supported names.
    #[error("Unsupported primitive type '{type_name}'")]
    UnsupportedPrimitiveType {
        /// The type name as supplied by the caller.
        type_name: String,
    },

    /// The caller-supplied enum parser rejected a value.
    #[error("Invalid enum value '{value}': {reason}")]
    InvalidEnumValue {
        /// The raw string read from the payload.
        value: String,
        /// The parser's own description of the failure.
        reason: String,
    },

    /// The value has the right shape but cannot be converted (out-of-range
    /// integer, unparsable timestamp or UUID, invalid base64, non-finite float).
    #[error("Invalid {expected} value '{value}'")]
    InvalidValue {
        /// The target type of the conversion.
        expected: &'static str,
        /// The offending value, rendered as text.
        value: String,
    },

    /// The payload could not be parsed or produced at all.
    #[error("Malformed payload: {message}")]
    Malformed {
        /// Codec-specific description of the problem.
        message: String,
    },

    /// The codec cannot represent the requested operation
    /// (e.g. structured data in a plain-text payload).
    #[error("Unsupported operation: {message}")]
    Unsupported {
        /// Description of the operation that was rejected.
        message: String,
    },

    /// A write was issued after the writer was closed.
    #[error("Serialization writer is closed")]
    WriterClosed,

    /// Serialized content was requested before the writer was closed.
    #[error("Serialization writer must be closed before its content is read")]
    WriterNotClosed,

    /// A keyed write used an empty key below the document root.
    #[error("Field key must not be empty")]
    EmptyKey,

    /// A default registry was installed twice in the same process.
    #[error("A default {kind} registry is already installed")]
    DefaultAlreadyInstalled {
        /// Which registry kind (`"parse node factory"` or
        /// `"serialization writer factory"`).
        kind: &'static str,
    },

    /// A registry was asked for its single content type.
    #[error("The registry supports multiple content types; query a registered factory instead")]
    MultipleContentTypes,
}

// ---------------------------------------------------------------------------
// Request errors
// ---------------------------------------------------------------------------

/// Errors returned by request adapter calls.
///
/// All variants are reported synchronously as part of the call's result; none
/// are retried by the adapter.
#[derive(Debug, Error)]
pub enum RequestError {
    /// The adapter could not be constructed (e.g. no authentication provider).
    #[error("Request adapter construction failed: {message}")]
    Construction {
        /// Description of the missing or invalid component.
        message: String,
    },

    /// The authentication provider rejected the request. No I/O was performed.
    #[error("Authentication failed: {0}")]
    Authentication(#[source] BoxError),

    /// The request descriptor could not be turned into a transport request
    /// (invalid URL template, invalid header name or value, ...).
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// Description of the problem.
        message: String,
    },

    /// The transport failed (network, timeout, malformed response).
    #[error("Transport failure: {0}")]
    Transport(#[source] BoxError),

    /// A primitive call named a type the adapter cannot decode.
    #[error("Unsupported primitive type '{type_name}'")]
    UnsupportedPrimitiveType {
        /// The type name as supplied by the caller.
        type_name: String,
    },

    /// The response body could not be decoded into the requested shape.
    #[error("Decode error: {0}")]
    Decode(#[source] SerializationError),

    /// The response carried no content and no response handler was supplied.
    #[error("Empty response")]
    EmptyResponse,

    /// A caller-supplied response handler failed; the error is passed through
    /// unchanged.
    #[error(transparent)]
    ResponseHandler(BoxError),

    /// A caller-supplied response handler returned a value of the wrong type.
    #[error("Response handler returned an unexpected type; expected {expected}")]
    UnexpectedHandlerResult {
        /// Name of the type the call expected.
        expected: &'static str,
    },
}

impl From<SerializationError> for RequestError {
    fn from(err: SerializationError) -> Self {
        match err {
            SerializationError::UnsupportedPrimitiveType { type_name } => {
                RequestError::UnsupportedPrimitiveType { type_name }
            }
            other => RequestError::Decode(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_primitive_type_is_lifted_to_a_request_error() {
        let err: RequestError = SerializationError::UnsupportedPrimitiveType {
            type_name: "decimal".into(),
        }
        .into();

        assert!(matches!(
            err,
            RequestError::UnsupportedPrimitiveType { ref type_name } if type_name == "decimal"
        ));
    }

    #[test]
    fn other_serialization_errors_become_decode_errors() {
        let err: RequestError = SerializationError::UnsupportedMediaType {
            content_type: "application/xml".into(),
        }
        .into();

        assert!(matches!(
            err,
            RequestError::Decode(SerializationError::UnsupportedMediaType { .. })
        ));
    }

    #[test]
    fn response_handler_errors_keep_their_message() {
        let err = RequestError::ResponseHandler("handler exploded".into());
        assert_eq!(err.to_string(), "handler exploded");
    }
}
