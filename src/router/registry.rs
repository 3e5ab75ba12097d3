//! The route registry and dispatcher.

use std::sync::{Arc, OnceLock, PoisonError, RwLock, RwLockReadGuard};

use log::{debug, trace};
use regex::RegexBuilder;

use crate::router::error::Error;
use crate::router::methods::Methods;
use crate::router::route::{Route, RouteInfo, RouteMatch};
use crate::router::Request;
use crate::server::Exchange;

/// An ordered, append-only set of routes.
///
/// Routes are tried in the order they were registered and the first one whose
/// method set contains the request method and whose pattern matches the URI
/// wins. Each pattern string can be registered once; later registrations of
/// the same pattern are ignored.
pub struct Router<R> {
    routes: RwLock<Vec<Route<R>>>,
}

impl<R> Default for Router<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> Router<R> {
    /// Create an empty router.
    pub fn new() -> Self {
        Self {
            routes: RwLock::new(Vec::new()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Route<R>>> {
        self.routes.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a handler for `pattern` under one or more methods.
    ///
    /// `pattern` is a regular expression, matched case-insensitively and
    /// unanchored against the request URI. If the pattern is already
    /// registered this call does nothing and the existing route is kept.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPattern`] if `pattern` does not compile. This is
    /// the only registration failure: an uncompilable pattern cannot become a
    /// route, so it is reported instead of dropped. A duplicate pattern still
    /// returns `Ok(())`.
    pub fn add<F>(&self, methods: impl Into<Methods>, pattern: impl Into<String>, handler: F) -> Result<(), Error>
    where
        F: Fn(&mut R, &RouteMatch) + Send + Sync + 'static,
    {
        let pattern = pattern.into();
        let mut routes = self.routes.write().unwrap_or_else(PoisonError::into_inner);

        if routes.iter().any(|route| route.pattern == pattern) {
            debug!("Route {pattern:?} already registered, ignoring");
            return Ok(());
        }

        let regex = RegexBuilder::new(&pattern)
            .case_insensitive(true)
            .build()
            .map_err(|source| Error::InvalidPattern {
                pattern: pattern.clone(),
                source,
            })?;
        let methods = methods.into().into_set();
        debug!("Registered route {methods:?} {pattern}");

        routes.push(Route {
            methods,
            pattern,
            regex,
            handler: Arc::new(handler),
        });
        Ok(())
    }

    /// Register a `GET` route.
    pub fn get<F>(&self, pattern: impl Into<String>, handler: F) -> Result<(), Error>
    where
        F: Fn(&mut R, &RouteMatch) + Send + Sync + 'static,
    {
        self.add("GET", pattern, handler)
    }

    /// Register a `POST` route.
    pub fn post<F>(&self, pattern: impl Into<String>, handler: F) -> Result<(), Error>
    where
        F: Fn(&mut R, &RouteMatch) + Send + Sync + 'static,
    {
        self.add("POST", pattern, handler)
    }

    /// Register a `PUT` route.
    pub fn put<F>(&self, pattern: impl Into<String>, handler: F) -> Result<(), Error>
    where
        F: Fn(&mut R, &RouteMatch) + Send + Sync + 'static,
    {
        self.add("PUT", pattern, handler)
    }

    /// Register a `HEAD` route.
    pub fn head<F>(&self, pattern: impl Into<String>, handler: F) -> Result<(), Error>
    where
        F: Fn(&mut R, &RouteMatch) + Send + Sync + 'static,
    {
        self.add("HEAD", pattern, handler)
    }

    /// Register a `DELETE` route.
    pub fn delete<F>(&self, pattern: impl Into<String>, handler: F) -> Result<(), Error>
    where
        F: Fn(&mut R, &RouteMatch) + Send + Sync + 'static,
    {
        self.add("DELETE", pattern, handler)
    }

    /// Register a `PATCH` route.
    pub fn patch<F>(&self, pattern: impl Into<String>, handler: F) -> Result<(), Error>
    where
        F: Fn(&mut R, &RouteMatch) + Send + Sync + 'static,
    {
        self.add("PATCH", pattern, handler)
    }

    /// Register an `OPTIONS` route.
    pub fn options<F>(&self, pattern: impl Into<String>, handler: F) -> Result<(), Error>
    where
        F: Fn(&mut R, &RouteMatch) + Send + Sync + 'static,
    {
        self.add("OPTIONS", pattern, handler)
    }

    /// Number of registered routes.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Whether no routes are registered.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Whether `pattern` is already registered.
    pub fn contains(&self, pattern: &str) -> bool {
        self.read().iter().any(|route| route.pattern == pattern)
    }

    /// Snapshot of the registered routes in dispatch order.
    pub fn routes(&self) -> Vec<RouteInfo> {
        self.read()
            .iter()
            .map(|route| RouteInfo {
                pattern: route.pattern.clone(),
                methods: route.methods.iter().cloned().collect(),
            })
            .collect()
    }
}

impl<R: Request> Router<R> {
    /// Dispatch `request` to the first matching route.
    ///
    /// Returns `true` if a handler ran. An unmatched request is left
    /// untouched; answering it is up to the caller.
    pub fn run(&self, request: &mut R) -> bool {
        // The registry lock is released before the handler runs.
        let found = {
            let routes = self.read();
            let (method, uri) = (request.method(), request.uri());
            routes.iter().find_map(|route| {
                route
                    .matches(method, uri)
                    .map(|m| (route.pattern.clone(), Arc::clone(&route.handler), m))
            })
        };

        match found {
            Some((pattern, handler, route_match)) => {
                trace!("{} {} matched {pattern:?}", request.method(), request.uri());
                handler(request, &route_match);
                true
            }
            None => {
                trace!("{} {} matched no route", request.method(), request.uri());
                false
            }
        }
    }
}

static INSTANCE: OnceLock<Router<Exchange>> = OnceLock::new();

impl Router<Exchange> {
    /// The process-wide router, created on first use and never dropped.
    pub fn instance() -> &'static Router<Exchange> {
        INSTANCE.get_or_init(Router::new)
    }
}
