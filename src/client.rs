//! The REST client and its builder.
//!
//! [`RestClient`] is the entry point of every call. Use [`ClientBuilder`] to
//! configure and create clients.

use crate::config::{ClientConfig, DiagnosticsSupplier};
use crate::diagnostics::DiagnosticsData;
use crate::handle::{RequestBodyHandle, RequestHandle};
use crate::policy::Policy;
use crate::request::{apply_default_headers, RequestBuilder, RequestCustomizer, RequestTemplate};
use crate::transport::HttpTransport;
use crate::{Error, Result};
use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method, Request};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

const JSON: &str = "application/json";
const JSON_PATCH: &str = "application/json-patch+json";
const MERGE_PATCH: &str = "application/merge-patch+json";

/// A REST client: configuration shared by all calls plus the base URL they are
/// resolved against.
///
/// The client is cheap to clone and meant to be reused.
///
/// # Examples
///
/// ```no_run
/// use restflow::policy::RetryPolicy;
/// use restflow::RestClient;
/// use serde::{Deserialize, Serialize};
/// use std::time::Duration;
///
/// #[derive(Serialize)]
/// struct CreateUser {
///     name: String,
/// }
///
/// #[derive(Deserialize)]
/// struct User {
///     id: u64,
///     name: String,
/// }
///
/// # async fn example() -> Result<(), restflow::Error> {
/// let client = RestClient::builder()
///     .base_url("https://api.example.com/v1")?
///     .timeout(Duration::from_secs(30))
///     .policy(RetryPolicy::retries(3))
///     .build()?;
///
/// let user: User = client.get("users/123")?.returning().fetch().await?;
/// println!("User: {}", user.name);
///
/// let created: User = client
///     .post(&CreateUser { name: "Alice".to_string() })?
///     .to("users")?
///     .returning()
///     .fetch()
///     .await?;
/// println!("Created user with ID: {}", created.id);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct RestClient {
    inner: Arc<ClientInner>,
}

#[derive(Debug)]
struct ClientInner {
    config: Arc<ClientConfig>,
    default_headers: HeaderMap,
    template: Option<RequestTemplate>,
}

impl RestClient {
    /// Creates a new `ClientBuilder`.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// The configuration every call starts from.
    pub fn config(&self) -> &Arc<ClientConfig> {
        &self.inner.config
    }

    /// The base URL, if one was configured.
    pub fn base_url(&self) -> Option<&Url> {
        self.inner.template.as_ref().map(RequestTemplate::base_url)
    }

    /// Wraps a fully built request.
    ///
    /// Default headers are added where the request does not set them. This works
    /// without a base URL, as long as the request URI is absolute.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use bytes::Bytes;
    /// use http::Request;
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let client = restflow::RestClient::builder().build()?;
    /// let request = Request::get("https://example.com/health").body(Bytes::new())?;
    ///
    /// client.make(request).returning_nothing().execute().await?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn make(&self, mut request: Request<Bytes>) -> RequestHandle {
        apply_default_headers(&self.inner.default_headers, &mut request);
        RequestHandle::new(request, Arc::clone(&self.inner.config))
    }

    /// A `GET` of `resource_path`, resolved against the base URL.
    ///
    /// # Errors
    ///
    /// Fails without a base URL or if the path cannot be resolved.
    pub fn get(&self, resource_path: &str) -> Result<RequestHandle> {
        self.without_body(Method::GET, resource_path)
    }

    /// A `DELETE` of `resource_path`, resolved against the base URL.
    pub fn delete(&self, resource_path: &str) -> Result<RequestHandle> {
        self.without_body(Method::DELETE, resource_path)
    }

    /// A `POST` of `body` encoded as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SerializationFailed`] if `body` cannot be encoded, or a
    /// configuration error without a base URL.
    pub fn post<T: Serialize + ?Sized>(&self, body: &T) -> Result<RequestBodyHandle> {
        self.with_json(Method::POST, body)
    }

    /// A `PUT` of `body` encoded as JSON.
    pub fn put<T: Serialize + ?Sized>(&self, body: &T) -> Result<RequestBodyHandle> {
        self.with_json(Method::PUT, body)
    }

    /// A `PATCH` of `body` encoded as JSON.
    pub fn patch<T: Serialize + ?Sized>(&self, body: &T) -> Result<RequestBodyHandle> {
        self.with_json(Method::PATCH, body)
    }

    /// A `POST` of a raw body with the given content type.
    pub fn post_raw(&self, body: impl Into<Bytes>, content_type: &str) -> Result<RequestBodyHandle> {
        self.with_body(Method::POST, body.into(), content_type)
    }

    /// A `PUT` of a raw body with the given content type.
    pub fn put_raw(&self, body: impl Into<Bytes>, content_type: &str) -> Result<RequestBodyHandle> {
        self.with_body(Method::PUT, body.into(), content_type)
    }

    /// A `PATCH` of a raw body with the given content type.
    pub fn patch_raw(&self, body: impl Into<Bytes>, content_type: &str) -> Result<RequestBodyHandle> {
        self.with_body(Method::PATCH, body.into(), content_type)
    }

    /// A `PATCH` carrying a JSON Patch document (RFC 6902).
    pub fn json_patch(&self, patch: &serde_json::Value) -> Result<RequestBodyHandle> {
        self.with_body(Method::PATCH, encode(patch)?, JSON_PATCH)
    }

    /// A `PATCH` carrying a JSON Merge Patch document (RFC 7396).
    pub fn merge_patch(&self, patch: &serde_json::Value) -> Result<RequestBodyHandle> {
        self.with_body(Method::PATCH, encode(patch)?, MERGE_PATCH)
    }

    fn template(&self) -> Result<&RequestTemplate> {
        self.inner
            .template
            .as_ref()
            .ok_or_else(|| Error::ConfigurationError("Base URL is required".to_string()))
    }

    fn without_body(&self, method: Method, resource_path: &str) -> Result<RequestHandle> {
        let request = self.template()?.new_request(method, resource_path, Bytes::new())?;
        Ok(RequestHandle::new(request, Arc::clone(&self.inner.config)))
    }

    fn with_json<T: Serialize + ?Sized>(&self, method: Method, body: &T) -> Result<RequestBodyHandle> {
        self.with_body(method, encode(body)?, JSON)
    }

    fn with_body(&self, method: Method, body: Bytes, content_type: &str) -> Result<RequestBodyHandle> {
        let content_type = HeaderValue::from_str(content_type)
            .map_err(|e| Error::ConfigurationError(format!("Invalid content type: {}", e)))?;
        Ok(RequestBodyHandle::new(
            Arc::clone(&self.inner.config),
            self.template()?.clone(),
            method,
            content_type,
            body,
        ))
    }
}

fn encode<T: Serialize + ?Sized>(body: &T) -> Result<Bytes> {
    serde_json::to_vec(body)
        .map(Bytes::from)
        .map_err(|e| Error::SerializationFailed(e.to_string()))
}

/// Configures a [`RestClient`].
pub struct ClientBuilder {
    base_url: Option<Url>,
    default_headers: HeaderMap,
    transport: Option<Arc<dyn HttpTransport>>,
    policies: Vec<Arc<dyn Policy>>,
    customizers: Vec<RequestCustomizer>,
    diagnostics_supplier: Option<DiagnosticsSupplier>,
    timeout: Option<Duration>,
    caller_frame_count: Option<usize>,
}

impl ClientBuilder {
    /// Creates a builder with default settings.
    pub fn new() -> Self {
        Self {
            base_url: None,
            default_headers: HeaderMap::new(),
            transport: None,
            policies: Vec::new(),
            customizers: Vec::new(),
            diagnostics_supplier: None,
            timeout: None,
            caller_frame_count: None,
        }
    }

    /// Sets the URL resource paths are resolved against.
    ///
    /// A trailing `/` is appended when missing, so `https://host/api` and
    /// `https://host/api/` both resolve `users` to `https://host/api/users`.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn base_url(mut self, url: impl AsRef<str>) -> Result<Self> {
        self.base_url = Some(Url::parse(url.as_ref())?);
        Ok(self)
    }

    /// Adds a header included in all requests that do not set it themselves.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn default_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| Error::ConfigurationError(format!("Invalid header name: {}", e)))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| Error::ConfigurationError(format!("Invalid header value: {}", e)))?;
        self.default_headers.insert(name, value);
        Ok(self)
    }

    /// Sends requests through `transport` instead of a default `reqwest::Client`.
    pub fn transport<T: HttpTransport>(mut self, transport: T) -> Self {
        let transport: Arc<dyn HttpTransport> = Arc::new(transport);
        self.transport = Some(transport);
        self
    }

    /// Appends a resilience policy. The first policy added is the outermost.
    pub fn policy<P: Policy + 'static>(mut self, policy: P) -> Self {
        self.policies.push(Arc::new(policy));
        self
    }

    /// Appends a customizer run on every request before it is sent.
    pub fn request_customizer<F>(mut self, customizer: F) -> Self
    where
        F: Fn(&mut RequestBuilder) + Send + Sync + 'static,
    {
        self.customizers.push(Arc::new(customizer));
        self
    }

    /// Sets the function producing diagnostic values when a request starts.
    pub fn diagnostics_supplier<F>(mut self, supplier: F) -> Self
    where
        F: Fn() -> DiagnosticsData + Send + Sync + 'static,
    {
        let supplier: DiagnosticsSupplier = Arc::new(supplier);
        self.diagnostics_supplier = Some(supplier);
        self
    }

    /// Bounds every individual send. An attempt exceeding it fails with
    /// [`Error::RequestFailure`].
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets how many caller frames errors record. `0` disables capture.
    pub fn caller_frame_count(mut self, count: usize) -> Self {
        self.caller_frame_count = Some(count);
        self
    }

    /// Builds the configured `RestClient`.
    ///
    /// # Errors
    ///
    /// Returns an error if the default HTTP client cannot be created.
    pub fn build(self) -> Result<RestClient> {
        let transport: Arc<dyn HttpTransport> = match self.transport {
            Some(transport) => transport,
            None => {
                let http_client = reqwest::Client::builder().build().map_err(|e| {
                    Error::ConfigurationError(format!("Failed to build HTTP client: {}", e))
                })?;
                Arc::new(http_client)
            }
        };

        let mut config = ClientConfig::new(transport);
        for policy in self.policies {
            config = config.with_policy(policy);
        }
        for customizer in self.customizers {
            config = config.with_customizer(customizer);
        }
        if let Some(supplier) = self.diagnostics_supplier {
            config = config.with_diagnostics_supplier(supplier);
        }
        if let Some(timeout) = self.timeout {
            config = config.with_timeout(timeout);
        }
        if let Some(count) = self.caller_frame_count {
            config = config.with_caller_frame_count(count);
        }

        let template = self
            .base_url
            .map(|base_url| RequestTemplate::new(base_url, self.default_headers.clone()));

        Ok(RestClient {
            inner: Arc::new(ClientInner {
                config: Arc::new(config),
                default_headers: self.default_headers,
                template,
            }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedTransport;

    fn client() -> RestClient {
        RestClient::builder()
            .base_url("http://localhost:1080/api")
            .unwrap()
            .default_header("user-agent", "restflow-test")
            .unwrap()
            .transport(ScriptedTransport::new(Vec::new()))
            .build()
            .unwrap()
    }

    #[test]
    fn test_get_resolves_against_base_url() {
        let spec = client().get("widgets/7").unwrap().returning_string();
        let request = spec.specification().request();

        assert_eq!(request.method(), &Method::GET);
        assert_eq!(request.uri(), "http://localhost:1080/api/widgets/7");
        assert_eq!(request.headers()["user-agent"], "restflow-test");
    }

    #[test]
    fn test_post_encodes_json() {
        let handle = client()
            .post(&serde_json::json!({"name": "widget"}))
            .unwrap()
            .to("widgets")
            .unwrap()
            .returning_json_value();
        let request = handle.specification().request();

        assert_eq!(request.method(), &Method::POST);
        assert_eq!(request.headers()["content-type"], JSON);
        assert_eq!(request.body(), &Bytes::from_static(br#"{"name":"widget"}"#));
    }

    #[test]
    fn test_patch_content_types() {
        let patch = serde_json::json!([{"op": "remove", "path": "/a"}]);
        let request = |handle: RequestBodyHandle| {
            handle
                .to("widgets/7")
                .unwrap()
                .returning_string()
                .specification()
                .request()
                .clone()
        };

        let json_patch = request(client().json_patch(&patch).unwrap());
        assert_eq!(json_patch.method(), &Method::PATCH);
        assert_eq!(json_patch.headers()["content-type"], JSON_PATCH);

        let merge_patch = request(client().merge_patch(&patch).unwrap());
        assert_eq!(merge_patch.headers()["content-type"], MERGE_PATCH);

        let raw = request(client().put_raw("a,b", "text/csv").unwrap());
        assert_eq!(raw.method(), &Method::PUT);
        assert_eq!(raw.headers()["content-type"], "text/csv");
        assert_eq!(raw.body(), &Bytes::from_static(b"a,b"));
    }

    #[test]
    fn test_make_keeps_request_headers() {
        let request = Request::get("http://elsewhere.test/ping")
            .header("user-agent", "custom")
            .body(Bytes::new())
            .unwrap();

        let handle = client().make(request).returning_string();
        let request = handle.specification().request();
        assert_eq!(request.uri(), "http://elsewhere.test/ping");
        assert_eq!(request.headers()["user-agent"], "custom");
    }

    #[tokio::test]
    async fn test_make_applies_default_headers_without_base_url() {
        let transport = ScriptedTransport::new(Vec::new());
        let sent = transport.sent();
        let client = RestClient::builder()
            .default_header("x-api-key", "secret")
            .unwrap()
            .transport(transport)
            .build()
            .unwrap();
        assert!(client.base_url().is_none());

        let request = Request::get("http://localhost:1080/health")
            .body(Bytes::new())
            .unwrap();
        client.make(request).returning_nothing().execute().await.unwrap();

        let sent = sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].headers()["x-api-key"], "secret");
    }

    #[test]
    fn test_missing_base_url() {
        let client = RestClient::builder()
            .transport(ScriptedTransport::new(Vec::new()))
            .build()
            .unwrap();

        match client.get("widgets") {
            Err(Error::ConfigurationError(message)) => assert_eq!(message, "Base URL is required"),
            other => panic!("Expected ConfigurationError, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_default_header() {
        let result = RestClient::builder().default_header("bad header", "x");
        assert!(matches!(result, Err(Error::ConfigurationError(_))));
    }

    #[test]
    fn test_builder_settings_reach_config() {
        let client = RestClient::builder()
            .transport(ScriptedTransport::new(Vec::new()))
            .timeout(Duration::from_secs(3))
            .caller_frame_count(0)
            .request_customizer(|request| {
                request.header("x-one", "1");
            })
            .build()
            .unwrap();

        let config = client.config();
        assert_eq!(config.timeout(), Some(Duration::from_secs(3)));
        assert_eq!(config.caller_frame_count(), 0);
        assert_eq!(config.request_customizers().len(), 1);
        assert!(config.policies().is_empty());
    }
}
