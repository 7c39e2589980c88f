//! Unified error type.

use crate::middleware::mdc::OperationId;

/// The error type returned by mdclog's fallible operations.
///
/// Application-level errors (404, 422, etc.) are expressed as HTTP
/// [`Response`](crate::Response) values, not as `Error`s. This type surfaces
/// infrastructure failures (binding to a port) and interceptor failures
/// (misapplied MDC registration, arguments that cannot be extracted).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    /// An MDC-enabled operation ran outside of a request scope.
    #[error("MDC interception is only allowed for request handlers. {operation}")]
    Misuse { operation: OperationId },

    /// A marked argument could not be turned into a structured value.
    #[error("cannot extract `{label}`: {source}")]
    Extraction {
        label: String,
        #[source]
        source: serde_json::Error,
    },
}
