//! Regex-driven request routing.
//!
//! A [`Router`] keeps its routes in registration order and hands each request
//! to the first route whose method set and pattern both match.

mod error;
mod methods;
mod route;
mod registry;

// Re-export public items
pub use error::Error;
pub use methods::Methods;
pub use route::{Handler, RouteInfo, RouteMatch};
pub use registry::Router;

/// The parts of a request the router dispatches on.
pub trait Request {
    /// The request verb, e.g. `"GET"`.
    fn method(&self) -> &str;

    /// The request target the route patterns are matched against.
    fn uri(&self) -> &str;
}
