//! Prepared requests awaiting finalization.

use crate::body::ResponseBodyConfig;
use crate::config::ClientConfig;
use crate::request::{RequestBuilder, RequestCustomizer};
use crate::{Error, Result};
use bytes::Bytes;
use http::Request;
use std::fmt;
use std::sync::Arc;

/// A prepared request, the contract for its response body, and the configuration
/// it will be sent with.
///
/// Specifications are immutable. [`with_customizer`](Self::with_customizer)
/// derives a new one; the receiver and everything it shares stay untouched.
pub struct RequestSpecification<R> {
    request: Arc<Request<Bytes>>,
    response_body_config: ResponseBodyConfig<R>,
    client_config: Arc<ClientConfig>,
}

impl<R> RequestSpecification<R> {
    /// Creates a specification.
    pub fn new(
        request: Request<Bytes>,
        response_body_config: ResponseBodyConfig<R>,
        client_config: Arc<ClientConfig>,
    ) -> Self {
        Self {
            request: Arc::new(request),
            response_body_config,
            client_config,
        }
    }

    /// The request before customizers run.
    pub fn request(&self) -> &Request<Bytes> {
        &self.request
    }

    /// The response body contract.
    pub fn response_body_config(&self) -> &ResponseBodyConfig<R> {
        &self.response_body_config
    }

    /// The configuration the request is sent with.
    pub fn client_config(&self) -> &Arc<ClientConfig> {
        &self.client_config
    }

    /// Returns a specification whose customizer list ends with `customizer`.
    pub fn with_customizer(&self, customizer: RequestCustomizer) -> Self {
        let client_config = ClientConfig::clone(&self.client_config).with_customizer(customizer);
        Self {
            request: Arc::clone(&self.request),
            response_body_config: self.response_body_config.clone(),
            client_config: Arc::new(client_config),
        }
    }

    /// Applies every customizer, in registration order, to a copy of the prepared
    /// request.
    ///
    /// The result only depends on the prepared request and the customizers, so
    /// building it again yields an identical request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigurationError`] if a customizer supplied an invalid
    /// header or URI, or if the final request has no absolute target URL.
    pub fn create_final_request(&self) -> Result<Request<Bytes>> {
        let mut builder = RequestBuilder::from_request(Request::clone(&self.request));
        self.client_config.customize(&mut builder);
        let request = builder.build()?;

        let uri = request.uri();
        if uri.scheme().is_none() || uri.authority().is_none() {
            return Err(Error::ConfigurationError(format!(
                "Request has no absolute target URL: '{}'",
                uri
            )));
        }
        Ok(request)
    }
}

impl<R> Clone for RequestSpecification<R> {
    fn clone(&self) -> Self {
        Self {
            request: Arc::clone(&self.request),
            response_body_config: self.response_body_config.clone(),
            client_config: Arc::clone(&self.client_config),
        }
    }
}

impl<R> fmt::Debug for RequestSpecification<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestSpecification")
            .field("method", self.request.method())
            .field("uri", self.request.uri())
            .field("response_body_config", &self.response_body_config)
            .field("client_config", &self.client_config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedTransport;
    use http::Method;

    fn specification(uri: &str) -> RequestSpecification<String> {
        let mut request = Request::new(Bytes::from_static(b"payload"));
        *request.method_mut() = Method::POST;
        *request.uri_mut() = uri.parse().unwrap();
        let config = ClientConfig::new(Arc::new(ScriptedTransport::new(Vec::new())));
        RequestSpecification::new(request, ResponseBodyConfig::string(), Arc::new(config))
    }

    #[test]
    fn test_last_customizer_wins() {
        let spec = specification("http://localhost:1080/foo")
            .with_customizer(Arc::new(|b: &mut RequestBuilder| {
                b.header("Authorization", "Basic foobar");
            }))
            .with_customizer(Arc::new(|b: &mut RequestBuilder| {
                b.header("Authorization", "Bearer IDDQD");
            }));

        let request = spec.create_final_request().unwrap();
        let values: Vec<_> = request.headers().get_all("authorization").iter().collect();
        assert_eq!(values, vec!["Bearer IDDQD"]);
    }

    #[test]
    fn test_final_request_is_deterministic() {
        let spec = specification("http://localhost:1080/foo").with_customizer(Arc::new(
            |b: &mut RequestBuilder| {
                b.append_header("x-trace", "1");
            },
        ));

        let first = spec.create_final_request().unwrap();
        let second = spec.create_final_request().unwrap();
        assert_eq!(first.method(), second.method());
        assert_eq!(first.uri(), second.uri());
        assert_eq!(first.headers(), second.headers());
        assert_eq!(first.body(), second.body());
        assert_eq!(first.headers().get_all("x-trace").iter().count(), 1);
    }

    #[test]
    fn test_with_customizer_leaves_receiver_alone() {
        let base = specification("http://localhost:1080/foo");
        let customized = base.with_customizer(Arc::new(|b: &mut RequestBuilder| {
            b.header("x-extra", "yes");
        }));

        assert!(base.client_config().request_customizers().is_empty());
        assert_eq!(customized.client_config().request_customizers().len(), 1);
        assert!(base
            .create_final_request()
            .unwrap()
            .headers()
            .get("x-extra")
            .is_none());
    }

    #[test]
    fn test_relative_target_rejected() {
        let spec = specification("/foo");
        match spec.create_final_request() {
            Err(Error::ConfigurationError(message)) => assert!(message.contains("/foo")),
            other => panic!("Expected ConfigurationError, got {:?}", other),
        }
    }
}
