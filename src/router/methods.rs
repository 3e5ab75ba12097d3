//! The method set a route answers to.

use std::collections::BTreeSet;

use crate::parser::Method;

/// Either a single verb or an explicit list of verbs.
///
/// Resolved to a set with [`Methods::into_set`] when a route is registered,
/// so `"GET"` and `["GET"]` produce identical routes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Methods {
    /// A single verb.
    One(String),
    /// Several verbs. Duplicates collapse once normalized.
    Many(Vec<String>),
}

impl Methods {
    /// Normalize into the set stored on a route.
    pub fn into_set(self) -> BTreeSet<String> {
        match self {
            Methods::One(method) => BTreeSet::from([method]),
            Methods::Many(methods) => methods.into_iter().collect(),
        }
    }
}

impl From<&str> for Methods {
    fn from(method: &str) -> Self {
        Methods::One(method.to_string())
    }
}

impl From<String> for Methods {
    fn from(method: String) -> Self {
        Methods::One(method)
    }
}

impl From<Method> for Methods {
    fn from(method: Method) -> Self {
        Methods::One(method.as_str().to_string())
    }
}

impl From<&[&str]> for Methods {
    fn from(methods: &[&str]) -> Self {
        Methods::Many(methods.iter().map(|m| m.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Methods {
    fn from(methods: [&str; N]) -> Self {
        Methods::Many(methods.iter().map(|m| m.to_string()).collect())
    }
}

impl<const N: usize> From<[Method; N]> for Methods {
    fn from(methods: [Method; N]) -> Self {
        Methods::Many(methods.iter().map(|m| m.as_str().to_string()).collect())
    }
}

impl From<Vec<String>> for Methods {
    fn from(methods: Vec<String>) -> Self {
        Methods::Many(methods)
    }
}

impl From<Vec<&str>> for Methods {
    fn from(methods: Vec<&str>) -> Self {
        Methods::Many(methods.into_iter().map(str::to_string).collect())
    }
}

impl From<Vec<Method>> for Methods {
    fn from(methods: Vec<Method>) -> Self {
        Methods::Many(methods.into_iter().map(|m| m.as_str().to_string()).collect())
    }
}
