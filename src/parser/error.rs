//! Error types for the HTTP parser.

use thiserror::Error;

/// Errors that can occur while turning raw bytes into an [`HttpRequest`](crate::parser::HttpRequest).
#[derive(Debug, Error)]
pub enum Error {
    /// The method is not one of the verbs [`Method`](crate::parser::Method) knows.
    #[error("Invalid HTTP method: {0}")]
    InvalidMethod(String),

    #[error("Invalid HTTP path")]
    InvalidPath,

    /// The request line is not `METHOD TARGET VERSION`, or the header
    /// section is not valid UTF-8.
    #[error("Malformed request line: {0}")]
    MalformedRequestLine(String),

    #[error("Invalid HTTP version: {0}")]
    InvalidVersion(String),

    /// A header the request needs is absent, e.g. `Host` on HTTP/1.1 or
    /// `Content-Type: application/json` when decoding a JSON body.
    #[error("Required header is missing: {0}")]
    MissingHeader(String),

    /// A header line has no `:` separator.
    #[error("Invalid header format")]
    InvalidHeaderFormat,

    /// Fewer body bytes arrived than `Content-Length` declared.
    #[error("Incomplete body: expected {expected} bytes, received {received}")]
    IncompleteBody { expected: usize, received: usize },

    #[error("Empty request")]
    EmptyRequest,

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),
}
