//! The HTTP transport collaborator.
//!
//! The request pipeline never talks to a concrete HTTP stack. It hands the final
//! request and the desired body materialization to an [`HttpTransport`], which
//! resolves to an [`Exchange`] or to the low-level error that prevented one. A
//! `reqwest::Client` is the default transport.

use crate::body::{BodyMaterialization, BodyStream, MaterializedBody};
use crate::error::BoxError;
use crate::response::Exchange;
use bytes::Bytes;
use futures_util::future::BoxFuture;
use futures_util::TryStreamExt;
use http::Request;

/// Sends requests and materializes response bodies.
///
/// Implementations must resolve with an `Exchange` for every response received,
/// whatever its status; errors are reserved for cases where no response was
/// obtained or its body could not be received.
///
/// # Examples
///
/// ```
/// use bytes::Bytes;
/// use futures_util::future::BoxFuture;
/// use http::{HeaderMap, Request, StatusCode};
/// use restflow::{BodyMaterialization, BoxError, Exchange, HttpTransport, MaterializedBody};
///
/// /// Answers every request with `204 No Content`.
/// struct NoContent;
///
/// impl HttpTransport for NoContent {
///     fn send(
///         &self,
///         _request: Request<Bytes>,
///         _materialization: BodyMaterialization,
///     ) -> BoxFuture<'static, Result<Exchange, BoxError>> {
///         Box::pin(async {
///             Ok(Exchange::new(
///                 StatusCode::NO_CONTENT,
///                 HeaderMap::new(),
///                 MaterializedBody::Text(String::new()),
///             ))
///         })
///     }
/// }
/// ```
pub trait HttpTransport: Send + Sync + 'static {
    /// Sends `request` and materializes the response body as requested.
    fn send(
        &self,
        request: Request<Bytes>,
        materialization: BodyMaterialization,
    ) -> BoxFuture<'static, Result<Exchange, BoxError>>;
}

impl HttpTransport for reqwest::Client {
    fn send(
        &self,
        request: Request<Bytes>,
        materialization: BodyMaterialization,
    ) -> BoxFuture<'static, Result<Exchange, BoxError>> {
        let client = self.clone();
        Box::pin(async move {
            let (parts, body) = request.into_parts();
            let request = client
                .request(parts.method, parts.uri.to_string())
                .version(parts.version)
                .headers(parts.headers)
                .body(body)
                .build()?;

            let response = client.execute(request).await?;
            let status = response.status();
            let headers = response.headers().clone();

            let body = if materialization.is_text() {
                MaterializedBody::Text(response.text().await?)
            } else {
                MaterializedBody::Stream(BodyStream::new(
                    response.bytes_stream().map_err(BoxError::from),
                ))
            };

            Ok::<_, BoxError>(Exchange::new(status, headers, body))
        })
    }
}
