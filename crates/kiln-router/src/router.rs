//! Route table and path matching.

use std::collections::HashMap;
use std::fmt;

use http::Method;

/// A matched route with extracted path parameters.
///
/// Returned by [`Router::match_route`] when a route is found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch<'a, T> {
    /// The value registered for the route
    value: &'a T,

    /// Extracted path parameters (e.g., `userId` from `/users/{userId}`)
    params: HashMap<String, String>,
}

impl<'a, T> RouteMatch<'a, T> {
    /// Returns the value registered for this route.
    #[must_use]
    pub fn value(&self) -> &'a T {
        self.value
    }

    /// Returns the extracted path parameters.
    #[must_use]
    pub fn params(&self) -> &HashMap<String, String> {
        &self.params
    }

    /// Returns a specific path parameter by name.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Consumes the match, returning the parameters.
    #[must_use]
    pub fn into_params(self) -> HashMap<String, String> {
        self.params
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PathSegment {
    Literal(String),
    Param(String),
}

#[derive(Clone)]
struct Route<T> {
    method: Method,
    segments: Vec<PathSegment>,
    pattern: String,
    value: T,
}

impl<T> Route<T> {
    fn new(method: Method, pattern: &str, value: T) -> Self {
        Self {
            method,
            segments: parse_segments(pattern),
            pattern: normalize(pattern),
            value,
        }
    }

    /// Returns extracted parameters if the route matches `path`.
    fn match_path(&self, path: &str) -> Option<HashMap<String, String>> {
        let path_segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        if path_segments.len() != self.segments.len() {
            return None;
        }

        let mut params = HashMap::new();

        for (pattern, actual) in self.segments.iter().zip(path_segments) {
            match pattern {
                PathSegment::Literal(expected) => {
                    if expected != actual {
                        return None;
                    }
                }
                PathSegment::Param(name) => {
                    params.insert(name.clone(), actual.to_string());
                }
            }
        }

        Some(params)
    }
}

fn parse_segments(pattern: &str) -> Vec<PathSegment> {
    pattern
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|s| match s.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
            Some(name) => PathSegment::Param(name.to_string()),
            None => PathSegment::Literal(s.to_string()),
        })
        .collect()
}

fn normalize(pattern: &str) -> String {
    let joined = pattern
        .split('/')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/");
    format!("/{joined}")
}

/// HTTP route table.
///
/// Maps a method and path template to a value of type `T`. Routes are
/// checked in registration order and the first match wins. Leading and
/// trailing slashes are not significant, so `test`, `/test` and `/test/`
/// all address the same route.
#[derive(Clone)]
pub struct Router<T> {
    routes: Vec<Route<T>>,
}

impl<T> Default for Router<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Router<T> {
    /// Creates a new empty router.
    #[must_use]
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    /// Adds a route to the router.
    ///
    /// # Arguments
    ///
    /// * `method` - HTTP method for this route
    /// * `pattern` - Path pattern (e.g., "/users/{userId}")
    /// * `value` - Value returned when the route matches
    pub fn add_route(&mut self, method: Method, pattern: impl AsRef<str>, value: T) {
        self.routes.push(Route::new(method, pattern.as_ref(), value));
    }

    /// Returns the number of registered routes.
    #[must_use]
    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    /// Returns `true` if no routes are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Matches a method and path against the registered routes.
    ///
    /// Returns `None` if no route matches.
    #[must_use]
    pub fn match_route(&self, method: &Method, path: &str) -> Option<RouteMatch<'_, T>> {
        self.routes
            .iter()
            .filter(|route| route.method == *method)
            .find_map(|route| {
                route.match_path(path).map(|params| RouteMatch {
                    value: &route.value,
                    params,
                })
            })
    }

    /// Returns `true` if some route matches the path under any method.
    ///
    /// Used to tell "no such path" apart from "path exists, wrong method".
    #[must_use]
    pub fn matches_path(&self, path: &str) -> bool {
        self.routes.iter().any(|route| route.match_path(path).is_some())
    }

    /// Returns the registered `(method, pattern)` pairs in registration order.
    pub fn descriptions(&self) -> impl Iterator<Item = (&Method, &str)> {
        self.routes
            .iter()
            .map(|route| (&route.method, route.pattern.as_str()))
    }
}

impl<T> fmt::Debug for Router<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.descriptions().collect::<Vec<_>>())
            .finish()
    }
}
