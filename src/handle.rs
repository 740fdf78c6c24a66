//! Fluent handles.
//!
//! A call reads left to right: pick the request, pick what the response body
//! becomes, optionally customize, then send.
//!
//! ```no_run
//! # async fn example(client: restflow::RestClient) -> Result<(), restflow::Error> {
//! let name: Option<String> = client
//!     .get("users/42/name")?
//!     .returning_string()
//!     .customizing_request(|request| {
//!         request.header("Authorization", "Bearer IDDQD");
//!     })
//!     .try_fetch()
//!     .await?;
//! # Ok(())
//! # }
//! ```

use crate::body::{BodyStream, ResponseBodyConfig};
use crate::config::ClientConfig;
use crate::request::{RequestBuilder, RequestTemplate};
use crate::requester::{OptionalRequester, RegularRequester};
use crate::specification::RequestSpecification;
use crate::Result;
use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderValue, Method, Request};
use serde::de::DeserializeOwned;
use std::future::Future;
use std::panic::Location;
use std::sync::Arc;

/// A request waiting for its response body contract.
#[derive(Debug, Clone)]
pub struct RequestHandle {
    request: Request<Bytes>,
    client_config: Arc<ClientConfig>,
}

impl RequestHandle {
    pub(crate) fn new(request: Request<Bytes>, client_config: Arc<ClientConfig>) -> Self {
        Self {
            request,
            client_config,
        }
    }

    /// Decodes the body as JSON into `T`.
    pub fn returning<T: DeserializeOwned + Send + 'static>(self) -> FetchHandle<T> {
        self.returning_with(ResponseBodyConfig::json())
    }

    /// Decodes the body as a JSON array of `T`.
    pub fn returning_list_of<T: DeserializeOwned + Send + 'static>(self) -> FetchHandle<Vec<T>> {
        self.returning_with(ResponseBodyConfig::json())
    }

    /// Decodes the body as an untyped JSON value.
    pub fn returning_json_value(self) -> FetchHandle<serde_json::Value> {
        self.returning_with(ResponseBodyConfig::json())
    }

    /// Returns the body text.
    pub fn returning_string(self) -> FetchHandle<String> {
        self.returning_with(ResponseBodyConfig::string())
    }

    /// Returns the body as a stream of chunks.
    pub fn returning_byte_stream(self) -> FetchHandle<BodyStream> {
        self.returning_with(ResponseBodyConfig::stream())
    }

    /// Ignores the body of successful responses.
    ///
    /// The body is still read so that a rejected status can quote it.
    pub fn returning_nothing(self) -> ExecuteHandle {
        ExecuteHandle {
            specification: self.into_specification(ResponseBodyConfig::discarding()),
        }
    }

    /// Converts the body with a custom contract.
    pub fn returning_with<R: Send + 'static>(self, config: ResponseBodyConfig<R>) -> FetchHandle<R> {
        FetchHandle::new(self.into_specification(config))
    }

    fn into_specification<R>(self, config: ResponseBodyConfig<R>) -> RequestSpecification<R> {
        RequestSpecification::new(self.request, config, self.client_config)
    }
}

/// A request body waiting for its target path.
#[derive(Debug, Clone)]
pub struct RequestBodyHandle {
    client_config: Arc<ClientConfig>,
    template: RequestTemplate,
    method: Method,
    content_type: HeaderValue,
    body: Bytes,
}

impl RequestBodyHandle {
    pub(crate) fn new(
        client_config: Arc<ClientConfig>,
        template: RequestTemplate,
        method: Method,
        content_type: HeaderValue,
        body: Bytes,
    ) -> Self {
        Self {
            client_config,
            template,
            method,
            content_type,
            body,
        }
    }

    /// Targets `resource_path`, resolved against the client's base URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrl`](crate::Error::InvalidUrl) if the path cannot be
    /// resolved.
    pub fn to(self, resource_path: &str) -> Result<RequestHandle> {
        let mut request = self.template.new_request(self.method, resource_path, self.body)?;
        request.headers_mut().insert(CONTENT_TYPE, self.content_type);
        Ok(RequestHandle::new(request, self.client_config))
    }
}

/// A request whose response converts to `R`.
pub struct FetchHandle<R> {
    specification: RequestSpecification<R>,
}

impl<R: Send + 'static> FetchHandle<R> {
    /// Wraps a specification.
    pub fn new(specification: RequestSpecification<R>) -> Self {
        Self { specification }
    }

    /// Returns a handle that additionally runs `customizer` on the final request.
    ///
    /// The receiver is not changed, so a base handle can be reused for several
    /// differently customized calls.
    pub fn customizing_request<F>(&self, customizer: F) -> Self
    where
        F: Fn(&mut RequestBuilder) + Send + Sync + 'static,
    {
        Self::new(self.specification.with_customizer(Arc::new(customizer)))
    }

    /// Sends the request. Any status outside 2xx fails with
    /// [`Error::ResponseStatus`](crate::Error::ResponseStatus).
    ///
    /// The diagnostics supplier runs and the caller frame is recorded before this
    /// returns; nothing is sent until the future is polled.
    #[track_caller]
    pub fn fetch(&self) -> impl Future<Output = Result<R>> + Send + 'static {
        RegularRequester::new(self.specification.clone(), Location::caller()).start()
    }

    /// Like [`fetch`](Self::fetch), but `404 Not Found` resolves to `None`.
    #[track_caller]
    pub fn try_fetch(&self) -> impl Future<Output = Result<Option<R>>> + Send + 'static {
        OptionalRequester::new(self.specification.clone(), Location::caller()).start()
    }

    /// The underlying specification.
    pub fn specification(&self) -> &RequestSpecification<R> {
        &self.specification
    }
}

impl<R> Clone for FetchHandle<R> {
    fn clone(&self) -> Self {
        Self {
            specification: self.specification.clone(),
        }
    }
}

impl<R> std::fmt::Debug for FetchHandle<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("FetchHandle").field(&self.specification).finish()
    }
}

/// A request whose successful response body is ignored.
#[derive(Debug, Clone)]
pub struct ExecuteHandle {
    specification: RequestSpecification<()>,
}

impl ExecuteHandle {
    /// Returns a handle that additionally runs `customizer` on the final request.
    pub fn customizing_request<F>(&self, customizer: F) -> Self
    where
        F: Fn(&mut RequestBuilder) + Send + Sync + 'static,
    {
        Self {
            specification: self.specification.with_customizer(Arc::new(customizer)),
        }
    }

    /// Sends the request. Any status outside 2xx fails with
    /// [`Error::ResponseStatus`](crate::Error::ResponseStatus) quoting the body.
    #[track_caller]
    pub fn execute(&self) -> impl Future<Output = Result<()>> + Send + 'static {
        RegularRequester::new(self.specification.clone(), Location::caller()).start()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Reply, ScriptedTransport};
    use http::StatusCode;
    use url::Url;

    fn handle(transport: Arc<ScriptedTransport>) -> RequestHandle {
        let template = RequestTemplate::new(
            Url::parse("http://localhost:1080").unwrap(),
            http::HeaderMap::new(),
        );
        let request = template.new_request(Method::GET, "foo", Bytes::new()).unwrap();
        RequestHandle::new(request, Arc::new(ClientConfig::new(transport)))
    }

    #[test]
    fn test_body_handle_sets_content_type() {
        let template = RequestTemplate::new(
            Url::parse("http://localhost:1080/api").unwrap(),
            http::HeaderMap::new(),
        );
        let config = Arc::new(ClientConfig::new(Arc::new(ScriptedTransport::new(Vec::new()))));
        let handle = RequestBodyHandle::new(
            config,
            template,
            Method::PUT,
            HeaderValue::from_static("text/plain"),
            Bytes::from_static(b"hi"),
        )
        .to("items/1")
        .unwrap();

        assert_eq!(handle.request.method(), &Method::PUT);
        assert_eq!(handle.request.uri(), "http://localhost:1080/api/items/1");
        assert_eq!(handle.request.headers()[CONTENT_TYPE], "text/plain");
        assert_eq!(handle.request.body(), &Bytes::from_static(b"hi"));
    }

    #[tokio::test]
    async fn test_customizing_does_not_touch_base_handle() {
        let transport = Arc::new(ScriptedTransport::new(Vec::new()));
        let sent = transport.sent();
        let base = handle(transport).returning_nothing();
        let customized = base.customizing_request(|request| {
            request.header("x-variant", "customized");
        });

        base.execute().await.unwrap();
        customized.execute().await.unwrap();

        let sent = sent.lock().unwrap();
        assert!(sent[0].headers().get("x-variant").is_none());
        assert_eq!(sent[1].headers()["x-variant"], "customized");
    }

    #[tokio::test]
    async fn test_fetch_records_call_site() {
        let transport = Arc::new(ScriptedTransport::new(vec![Reply::Respond(
            StatusCode::CONFLICT,
            Some("taken"),
        )]));
        let fetch = handle(transport).returning_string();

        let line = line!() + 1;
        let error = fetch.fetch().await.unwrap_err();
        let frames = error.caller_frames();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].line(), line);
        assert!(frames[0].file().ends_with("handle.rs"));
    }

    #[tokio::test]
    async fn test_try_fetch_not_found() {
        let transport = Arc::new(ScriptedTransport::new(vec![Reply::Respond(
            StatusCode::NOT_FOUND,
            Some("{}"),
        )]));
        let value = handle(transport)
            .returning::<serde_json::Value>()
            .try_fetch()
            .await
            .unwrap();
        assert_eq!(value, None);
    }

    #[tokio::test]
    async fn test_returning_list_of() {
        let transport = Arc::new(ScriptedTransport::new(vec![Reply::Respond(
            StatusCode::OK,
            Some("[1, 2, 3]"),
        )]));
        let values = handle(transport).returning_list_of::<u8>().fetch().await.unwrap();
        assert_eq!(values, vec![1, 2, 3]);
    }
}
