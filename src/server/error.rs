//! Error types for the HTTP server.

use thiserror::Error;

use crate::parser::Error as ParserError;
use crate::router::Error as RouterError;

/// Errors that can occur during HTTP server operation.
#[derive(Debug, Error)]
pub enum Error {
    /// Error parsing an HTTP request.
    #[error("Parse error: {0}")]
    ParseError(#[from] ParserError),

    /// Error registering a route.
    #[error("Route error: {0}")]
    RouteError(#[from] RouterError),

    /// I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The request is larger than the configured read buffer.
    #[error("Request exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },

    /// No route matched the request.
    #[error("Not found: {method} {path}")]
    NotFound { method: String, path: String },

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}
