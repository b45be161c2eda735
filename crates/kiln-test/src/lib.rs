//! # Kiln Test
//!
//! In-process HTTP testing for Kiln applications. Requests are built in
//! memory, handed straight to the application's responder and the buffered
//! response is decoded for assertions. No sockets are opened.
//!
//! ## Key Features
//!
//! - **Header defaulting**: `Content-Type: application/json` unless the test
//!   sets its own
//! - **Content negotiation**: bodies encoded and decoded as JSON, form or
//!   plain text according to the declared content type
//! - **Blocking dispatch**: usable from plain `#[test]` functions and from
//!   inside async tests, with an optional timeout
//! - **Distinguishable errors**: every failure is a [`HarnessError`] variant
//! - **Reset between cases**: [`Testable::revert`] reverts and re-applies
//!   migrations
//!
//! ## Example
//!
//! ```rust
//! use kiln_app::{AppResult, Json, Request, Routes};
//! use kiln_test::{perform, Testable, TestableApplication};
//! use http::{Method, StatusCode};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Serialize, Deserialize, PartialEq)]
//! struct Greeting {
//!     value: String,
//! }
//!
//! struct App;
//!
//! impl Testable for App {
//!     fn routes(&self, routes: &mut Routes) -> AppResult<()> {
//!         routes.post("/test", |req: Request| async move {
//!             Ok(Json(req.content::<Greeting>()?))
//!         });
//!         Ok(())
//!     }
//! }
//!
//! perform(|| {
//!     let app = App.make_application(None)?;
//!     let response = app
//!         .request(Method::POST, "/test")
//!         .body(Greeting { value: "post".into() })
//!         .send()?;
//!
//!     assert_eq!(response.status(), StatusCode::OK);
//!     assert_eq!(response.decode_as::<Greeting>()?.value, "post");
//!     Ok(())
//! });
//! ```

#![doc(html_root_url = "https://docs.rs/kiln-test/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod client;
mod codec;
mod dispatch;
mod error;
mod logging;
mod perform;
mod request;
mod response;
mod runtime;
mod testable;

pub use client::{ClientRequest, TestableApplication};
pub use codec::{ContentCodec, EmptyContent};
pub use dispatch::{DispatchOptions, Dispatcher};
pub use error::{HarnessError, HarnessResult, RevertError};
pub use logging::init_test_logging;
pub use perform::perform;
pub use request::{Encodable, RequestBuilder, TestRequest, DEFAULT_CONTENT_TYPE};
pub use response::TestResponse;
pub use testable::Testable;
