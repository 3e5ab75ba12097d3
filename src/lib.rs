//! A minimal first-match-wins HTTP request router.
//!
//! Routes are `(methods, pattern, handler)` triples where the pattern is a
//! regular expression. Dispatch walks the routes in registration order and
//! invokes the first one whose method set contains the request method and
//! whose pattern matches the request URI, case-insensitively.
//!
//! # Features
//!
//! - Ordered, append-only route registry; the first registration of a pattern wins
//! - Positional and named capture groups handed to the handler
//! - A process-wide router via [`Router::instance`], or routers passed around explicitly
//! - A small HTTP/1.x request parser and a tokio server that dispatches through a router
//!
//! # Examples
//!
//! ## Dispatching
//!
//! ```
//! use regex_router::{Request, RouteMatch, Router};
//!
//! struct Req {
//!     method: &'static str,
//!     uri: &'static str,
//!     seen: Option<String>,
//! }
//!
//! impl Request for Req {
//!     fn method(&self) -> &str { self.method }
//!     fn uri(&self) -> &str { self.uri }
//! }
//!
//! let router = Router::new();
//! router.get(r"/users/(\d+)", |req: &mut Req, m: &RouteMatch| {
//!     req.seen = m.get(1).map(str::to_string);
//! }).unwrap();
//!
//! let mut req = Req { method: "GET", uri: "/users/42", seen: None };
//! assert!(router.run(&mut req));
//! assert_eq!(req.seen.as_deref(), Some("42"));
//! ```
//!
//! ## Serving
//!
//! ```no_run
//! use std::sync::Arc;
//! use regex_router::{Exchange, HttpServer, RouteMatch, Router, ServerConfig};
//!
//! # async fn run() -> Result<(), regex_router::ServerError> {
//! let router = Arc::new(Router::new());
//! router.get("^/$", |ex: &mut Exchange, _: &RouteMatch| {
//!     ex.response.set_body("hello");
//! })?;
//!
//! HttpServer::new(ServerConfig::default(), router).start().await
//! # }
//! ```

pub mod parser;
pub mod router;
pub mod server;

// Re-export commonly used items for convenience
pub use parser::{Error as ParserError, HttpRequest, HttpVersion, Method, parse_request};
pub use router::{Error as RouterError, Methods, Request, RouteInfo, RouteMatch, Router};
pub use server::{Error as ServerError, Exchange, GlobalHttpServer, HttpResponse, HttpServer, ServerConfig, StatusCode};
