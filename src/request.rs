//! Outgoing request construction.
//!
//! [`RequestBuilder`] is the mutable view handed to request customizers while the
//! final request is assembled. [`RequestTemplate`] resolves resource paths against
//! the client's base URL.

use crate::{Error, Result};
use bytes::Bytes;
use http::header::{AsHeaderName, HeaderMap, HeaderName, HeaderValue};
use http::{Method, Request, Uri};
use std::fmt;
use std::sync::Arc;
use url::Url;

/// Modifies a request before it is sent.
///
/// Customizers run in registration order each time a final request is built. A
/// later customizer sees what earlier ones did and may overwrite it.
pub type RequestCustomizer = Arc<dyn Fn(&mut RequestBuilder) + Send + Sync>;

/// A mutable view of a request under construction.
///
/// Invalid header names, header values or URIs do not fail immediately; the first
/// such error is reported when the final request is built, the same way
/// [`http::request::Builder`] defers its errors.
///
/// # Examples
///
/// ```
/// use restflow::RequestBuilder;
///
/// fn authorize(builder: &mut RequestBuilder) {
///     builder.header("Authorization", "Bearer IDDQD");
/// }
/// ```
pub struct RequestBuilder {
    request: Request<Bytes>,
    error: Option<Error>,
}

impl RequestBuilder {
    pub(crate) fn from_request(request: Request<Bytes>) -> Self {
        Self {
            request,
            error: None,
        }
    }

    /// Returns the request as built so far.
    pub fn current(&self) -> &Request<Bytes> {
        &self.request
    }

    /// Sets the HTTP method.
    pub fn method(&mut self, method: Method) -> &mut Self {
        *self.request.method_mut() = method;
        self
    }

    /// Sets the target URI.
    pub fn uri<T>(&mut self, uri: T) -> &mut Self
    where
        T: TryInto<Uri>,
        T::Error: fmt::Display,
    {
        match uri.try_into() {
            Ok(uri) => *self.request.uri_mut() = uri,
            Err(e) => self.fail(format!("Invalid URI: {}", e)),
        }
        self
    }

    /// Sets a header, replacing any values already present under that name.
    pub fn header<K, V>(&mut self, name: K, value: V) -> &mut Self
    where
        K: TryInto<HeaderName>,
        K::Error: fmt::Display,
        V: TryInto<HeaderValue>,
        V::Error: fmt::Display,
    {
        if let Some((name, value)) = self.header_pair(name, value) {
            self.request.headers_mut().insert(name, value);
        }
        self
    }

    /// Adds a header value, keeping values already present under that name.
    pub fn append_header<K, V>(&mut self, name: K, value: V) -> &mut Self
    where
        K: TryInto<HeaderName>,
        K::Error: fmt::Display,
        V: TryInto<HeaderValue>,
        V::Error: fmt::Display,
    {
        if let Some((name, value)) = self.header_pair(name, value) {
            self.request.headers_mut().append(name, value);
        }
        self
    }

    /// Removes all values of a header.
    pub fn remove_header<K: AsHeaderName>(&mut self, name: K) -> &mut Self {
        self.request.headers_mut().remove(name);
        self
    }

    /// Mutable access to all headers.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        self.request.headers_mut()
    }

    /// Replaces the request body.
    pub fn body(&mut self, body: impl Into<Bytes>) -> &mut Self {
        *self.request.body_mut() = body.into();
        self
    }

    /// Finishes the request, reporting the first deferred error.
    pub(crate) fn build(self) -> Result<Request<Bytes>> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.request),
        }
    }

    fn header_pair<K, V>(&mut self, name: K, value: V) -> Option<(HeaderName, HeaderValue)>
    where
        K: TryInto<HeaderName>,
        K::Error: fmt::Display,
        V: TryInto<HeaderValue>,
        V::Error: fmt::Display,
    {
        let name = match name.try_into() {
            Ok(name) => name,
            Err(e) => {
                self.fail(format!("Invalid header name: {}", e));
                return None;
            }
        };
        match value.try_into() {
            Ok(value) => Some((name, value)),
            Err(e) => {
                self.fail(format!("Invalid header value: {}", e));
                None
            }
        }
    }

    fn fail(&mut self, message: String) {
        if self.error.is_none() {
            self.error = Some(Error::ConfigurationError(message));
        }
    }
}

impl fmt::Debug for RequestBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestBuilder")
            .field("method", self.request.method())
            .field("uri", self.request.uri())
            .field("headers", self.request.headers())
            .field("error", &self.error)
            .finish()
    }
}

/// Resolves resource paths against a base URL and stamps default headers.
#[derive(Debug, Clone)]
pub(crate) struct RequestTemplate {
    base_url: Url,
    default_headers: HeaderMap,
}

impl RequestTemplate {
    /// Creates a template. A trailing `/` is appended to the base URL path when
    /// missing, so that its last segment survives relative resolution.
    pub(crate) fn new(mut base_url: Url, default_headers: HeaderMap) -> Self {
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Self {
            base_url,
            default_headers,
        }
    }

    pub(crate) fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolves `resource_path` relative to the base URL.
    pub(crate) fn resolve(&self, resource_path: &str) -> Result<Url> {
        Ok(self.base_url.join(resource_path)?)
    }

    /// Creates a request for `resource_path` carrying the default headers.
    pub(crate) fn new_request(
        &self,
        method: Method,
        resource_path: &str,
        body: Bytes,
    ) -> Result<Request<Bytes>> {
        let url = self.resolve(resource_path)?;
        let uri: Uri = url
            .as_str()
            .parse()
            .map_err(|e| Error::ConfigurationError(format!("Invalid URI {}: {}", url, e)))?;

        let mut request = Request::new(body);
        *request.method_mut() = method;
        *request.uri_mut() = uri;
        self.apply_defaults(&mut request);
        Ok(request)
    }

    /// Adds default headers the request does not set itself.
    pub(crate) fn apply_defaults(&self, request: &mut Request<Bytes>) {
        apply_default_headers(&self.default_headers, request);
    }
}

/// Copies each of `defaults` into `request` unless the request already has that header.
pub(crate) fn apply_default_headers(defaults: &HeaderMap, request: &mut Request<Bytes>) {
    for (name, value) in defaults {
        if !request.headers().contains_key(name) {
            request.headers_mut().insert(name.clone(), value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(base: &str) -> RequestTemplate {
        RequestTemplate::new(Url::parse(base).unwrap(), HeaderMap::new())
    }

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let template = template("http://localhost:1080/api");
        assert_eq!(template.base_url().as_str(), "http://localhost:1080/api/");
        assert_eq!(
            template.resolve("foo").unwrap().as_str(),
            "http://localhost:1080/api/foo"
        );
    }

    #[test]
    fn test_resolve_relative_and_absolute_paths() {
        let template = template("http://localhost:1080/");
        assert_eq!(
            template.resolve("foo").unwrap().as_str(),
            "http://localhost:1080/foo"
        );
        assert_eq!(
            template.resolve("/foo").unwrap().as_str(),
            "http://localhost:1080/foo"
        );
    }

    #[test]
    fn test_new_request_applies_defaults_without_overriding() {
        let mut defaults = HeaderMap::new();
        defaults.insert("user-agent", HeaderValue::from_static("restflow-test"));
        defaults.insert("accept", HeaderValue::from_static("application/json"));
        let template = RequestTemplate::new(Url::parse("http://localhost:1080").unwrap(), defaults);

        let mut request = template
            .new_request(Method::GET, "widgets", Bytes::new())
            .unwrap();
        assert_eq!(request.uri(), "http://localhost:1080/widgets");
        assert_eq!(request.headers()["user-agent"], "restflow-test");

        request
            .headers_mut()
            .insert("accept", HeaderValue::from_static("text/plain"));
        template.apply_defaults(&mut request);
        assert_eq!(request.headers()["accept"], "text/plain");
    }

    #[test]
    fn test_builder_header_replaces() {
        let mut builder = RequestBuilder::from_request(Request::new(Bytes::new()));
        builder.header("Authorization", "Basic foobar");
        builder.header("Authorization", "Bearer IDDQD");

        let request = builder.build().unwrap();
        let values: Vec<_> = request.headers().get_all("authorization").iter().collect();
        assert_eq!(values, vec!["Bearer IDDQD"]);
    }

    #[test]
    fn test_builder_append_header_keeps_values() {
        let mut builder = RequestBuilder::from_request(Request::new(Bytes::new()));
        builder.append_header("x-trace", "a").append_header("x-trace", "b");

        let request = builder.build().unwrap();
        assert_eq!(request.headers().get_all("x-trace").iter().count(), 2);
    }

    #[test]
    fn test_builder_defers_invalid_header() {
        let mut builder = RequestBuilder::from_request(Request::new(Bytes::new()));
        builder.header("bad header", "value").header("x-ok", "fine");

        match builder.build() {
            Err(Error::ConfigurationError(message)) => {
                assert!(message.starts_with("Invalid header name"))
            }
            other => panic!("Expected ConfigurationError, got {:?}", other),
        }
    }
}
