//! Method and path route table for Kiln applications.
//!
//! Routes are registered against an HTTP method and a path template. Path
//! templates are split on `/`; segments written as `{name}` capture the
//! corresponding request segment as a parameter.
//!
//! The table is generic over the value stored per route, so the application
//! crate can keep type-erased handlers in it while this crate stays free of
//! any request or response types.
//!
//! # Example
//!
//! ```rust
//! use kiln_router::Router;
//! use http::Method;
//!
//! let mut router = Router::new();
//! router.add_route(Method::GET, "/users/{userId}", "getUser");
//! router.add_route(Method::POST, "users", "createUser");
//!
//! let m = router.match_route(&Method::GET, "/users/42").unwrap();
//! assert_eq!(*m.value(), "getUser");
//! assert_eq!(m.param("userId"), Some("42"));
//!
//! assert!(router.match_route(&Method::DELETE, "/users/42").is_none());
//! ```

#![doc(html_root_url = "https://docs.rs/kiln-router/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod router;

pub use router::{RouteMatch, Router};
