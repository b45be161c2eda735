//! Media types understood by request and response content handling.

use std::fmt;

use http::header::CONTENT_TYPE;
use http::HeaderMap;

/// A negotiated media type.
///
/// Parameters such as `; charset=utf-8` are dropped when parsing, and the
/// essence is compared case-insensitively.
///
/// # Example
///
/// ```
/// use kiln_app::MediaType;
///
/// assert_eq!(MediaType::parse("Application/JSON; charset=utf-8"), MediaType::Json);
/// assert_eq!(MediaType::parse("text/csv").as_str(), "text/csv");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum MediaType {
    /// `application/json`
    #[default]
    Json,
    /// `application/x-www-form-urlencoded`
    UrlEncodedForm,
    /// `text/plain`
    PlainText,
    /// Anything else, stored as its lowercase essence.
    Other(String),
}

impl MediaType {
    /// Media type assumed when a message declares none.
    pub const DEFAULT: MediaType = MediaType::Json;

    /// Parses a `Content-Type` header value.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        let essence = value
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match essence.as_str() {
            "application/json" => Self::Json,
            "application/x-www-form-urlencoded" => Self::UrlEncodedForm,
            "text/plain" => Self::PlainText,
            _ => Self::Other(essence),
        }
    }

    /// Reads the media type declared in `headers`, if any.
    ///
    /// A header value that is not visible ASCII counts as undeclared.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(Self::parse)
    }

    /// Returns the essence string, e.g. `application/json`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Json => "application/json",
            Self::UrlEncodedForm => "application/x-www-form-urlencoded",
            Self::PlainText => "text/plain",
            Self::Other(essence) => essence,
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
