//! HTTP server built on the router.
//!
//! Each accepted connection is parsed into an [`Exchange`], dispatched through a
//! [`Router`](crate::router::Router), and answered with whatever response the
//! matched handler left behind, or `404 Not Found` when nothing matched.

mod response;
mod config;
mod error;
mod exchange;
mod http_server;
mod tests;

// Re-export public items
pub use response::{HttpResponse, StatusCode};
pub use config::ServerConfig;
pub use error::Error;
pub use exchange::Exchange;
pub use http_server::{GlobalHttpServer, HttpServer};
