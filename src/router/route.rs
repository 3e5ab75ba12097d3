//! Registered routes and match results.

use std::collections::BTreeSet;
use std::sync::Arc;

use regex::{Captures, Regex};

/// Type alias for a route handler: the request being dispatched plus the match.
pub type Handler<R> = Arc<dyn Fn(&mut R, &RouteMatch) + Send + Sync>;

/// A registered route.
pub(crate) struct Route<R> {
    /// The verbs this route answers to.
    pub(crate) methods: BTreeSet<String>,
    /// The pattern source, also the registry key.
    pub(crate) pattern: String,
    /// `pattern` compiled case-insensitively.
    pub(crate) regex: Regex,
    /// The handler function.
    pub(crate) handler: Handler<R>,
}

impl<R> Route<R> {
    /// Apply this route to a request line, returning the first match.
    pub(crate) fn matches(&self, method: &str, uri: &str) -> Option<RouteMatch> {
        if !self.methods.contains(method) {
            return None;
        }
        self.regex
            .captures(uri)
            .map(|caps| RouteMatch::from_captures(&self.regex, &caps))
    }
}

/// A snapshot of a registered route, in dispatch priority order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteInfo {
    /// The pattern source.
    pub pattern: String,
    /// The verbs, sorted.
    pub methods: Vec<String>,
}

/// The outcome of applying a route pattern to a request URI.
///
/// Group 0 is the whole match; groups that did not participate are `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
    groups: Vec<Option<String>>,
    names: Vec<Option<String>>,
    start: usize,
}

impl RouteMatch {
    fn from_captures(regex: &Regex, caps: &Captures<'_>) -> Self {
        let groups = caps
            .iter()
            .map(|group| group.map(|m| m.as_str().to_string()))
            .collect();
        let names = regex
            .capture_names()
            .map(|name| name.map(str::to_string))
            .collect();
        let start = caps.get(0).map_or(0, |m| m.start());

        Self { groups, names, start }
    }

    /// The full matched text.
    pub fn as_str(&self) -> &str {
        self.get(0).unwrap_or_default()
    }

    /// Byte offset in the URI where the match begins.
    pub fn start(&self) -> usize {
        self.start
    }

    /// A capture group by position.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.groups.get(index).and_then(|g| g.as_deref())
    }

    /// A named capture group, e.g. `(?P<id>\d+)`.
    pub fn name(&self, name: &str) -> Option<&str> {
        let index = self
            .names
            .iter()
            .position(|n| n.as_deref() == Some(name))?;
        self.get(index)
    }

    /// Number of groups, including group 0.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Always false for a successful match; present for symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Iterate over every group in positional order.
    pub fn iter(&self) -> impl Iterator<Item = Option<&str>> + '_ {
        self.groups.iter().map(|g| g.as_deref())
    }
}
