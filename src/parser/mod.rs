//! HTTP request parsing.
//!
//! Turns raw request bytes into an [`HttpRequest`] the router can dispatch on.

mod request;
mod method;
mod version;
mod error;

// Re-export public items
pub use request::HttpRequest;
pub use method::Method;
pub use version::HttpVersion;
pub use error::Error;

// Re-export the parse_request function
pub use request::parse_request;
