//! Error types for the router.

use thiserror::Error;

/// Errors that can occur while registering routes.
#[derive(Debug, Error)]
pub enum Error {
    /// The route pattern is not a valid regular expression.
    #[error("Invalid route pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}
