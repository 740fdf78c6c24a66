//! Received responses.
//!
//! An [`Exchange`] is what a transport hands back for one send attempt: status,
//! headers and the body materialized in the shape the request asked for. A
//! [`ResponseSnapshot`] is the owned, cloneable view of a response that errors keep
//! for later inspection.

use crate::body::MaterializedBody;
use http::{HeaderMap, StatusCode};

/// The status, headers and materialized body of one received response.
///
/// # Examples
///
/// ```
/// use http::{HeaderMap, HeaderValue, StatusCode};
/// use restflow::{Exchange, MaterializedBody};
///
/// let mut headers = HeaderMap::new();
/// headers.insert("content-type", HeaderValue::from_static("text/plain"));
///
/// let exchange = Exchange::new(
///     StatusCode::OK,
///     headers,
///     MaterializedBody::Text("hello".to_string()),
/// );
///
/// assert_eq!(exchange.header("content-type"), Some("text/plain"));
/// assert!(exchange.status().is_success());
/// ```
#[derive(Debug)]
pub struct Exchange {
    status: StatusCode,
    headers: HeaderMap,
    body: MaterializedBody,
}

impl Exchange {
    /// Creates a new `Exchange`.
    ///
    /// Transports call this once the status line and headers have arrived and
    /// the body has been materialized.
    pub fn new(status: StatusCode, headers: HeaderMap, body: MaterializedBody) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// The HTTP status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// The response headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns a header value by name if it is valid visible ASCII.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }

    /// The materialized body.
    pub fn body(&self) -> &MaterializedBody {
        &self.body
    }

    /// Splits the exchange into its parts.
    pub fn into_parts(self) -> (StatusCode, HeaderMap, MaterializedBody) {
        (self.status, self.headers, self.body)
    }
}

/// An owned view of a response attached to an [`Error`](crate::Error).
///
/// The body is present when it was received as text or was read for the error
/// message; it is `None` for stream bodies handed to a converter and for
/// responses without a body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseSnapshot {
    status: StatusCode,
    headers: HeaderMap,
    body: Option<String>,
}

impl ResponseSnapshot {
    /// Creates a new `ResponseSnapshot`.
    pub fn new(status: StatusCode, headers: HeaderMap, body: Option<String>) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// The HTTP status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// The response headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns a header value by name if it is valid visible ASCII.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }

    /// The raw response body, if known.
    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }
}
