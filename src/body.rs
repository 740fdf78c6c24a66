//! Response body contracts.
//!
//! A [`ResponseBodyConfig`] pairs the shape in which the transport should
//! materialize a body ([`BodyMaterialization`]) with a pure conversion from that
//! materialized body to the value the caller asked for. Converter failures surface
//! as [`Error::ResponseBody`](crate::Error::ResponseBody), never as raw errors.

use crate::error::BoxError;
use bytes::{Bytes, BytesMut};
use futures_util::stream::{self, BoxStream, Stream, StreamExt};
use serde::de::DeserializeOwned;
use std::convert::Infallible;
use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

/// How the transport should materialize a response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BodyMaterialization {
    /// Read the whole body as a UTF-8 string.
    Text,
    /// Hand the body over as a stream of byte chunks.
    ByteStream,
    /// The converted value is discarded, but the body is still read as text so
    /// that status failures can quote it.
    Discarding,
}

impl BodyMaterialization {
    /// Returns `true` if the transport must deliver [`MaterializedBody::Text`].
    pub fn is_text(self) -> bool {
        matches!(self, Self::Text | Self::Discarding)
    }
}

/// A response body as produced by a transport.
#[derive(Debug)]
pub enum MaterializedBody {
    /// The complete body as a string.
    Text(String),
    /// The body as a stream of chunks.
    Stream(BodyStream),
    /// The response carried no body.
    Absent,
}

/// A stream of response body chunks.
pub struct BodyStream {
    inner: BoxStream<'static, Result<Bytes, BoxError>>,
}

impl BodyStream {
    /// Wraps a chunk stream.
    pub fn new<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes, BoxError>> + Send + 'static,
    {
        Self {
            inner: stream.boxed(),
        }
    }

    /// A stream yielding `bytes` as a single chunk.
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        let bytes = bytes.into();
        Self::new(stream::once(async move { Ok(bytes) }))
    }

    /// A stream yielding nothing.
    pub fn empty() -> Self {
        Self::new(stream::empty())
    }

    /// Reads the remaining chunks into one buffer.
    ///
    /// # Errors
    ///
    /// Returns the first error produced by the underlying stream.
    pub async fn collect_bytes(mut self) -> Result<Bytes, BoxError> {
        let mut buffer = BytesMut::new();
        while let Some(chunk) = self.inner.next().await {
            buffer.extend_from_slice(&chunk?);
        }
        Ok(buffer.freeze())
    }
}

impl Stream for BodyStream {
    type Item = Result<Bytes, BoxError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}

impl fmt::Debug for BodyStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BodyStream").finish_non_exhaustive()
    }
}

type Converter<R> = dyn Fn(MaterializedBody) -> Result<R, BoxError> + Send + Sync;

/// Pairs a body materialization with a conversion to `R`.
///
/// # Examples
///
/// ```
/// use restflow::{BodyMaterialization, ResponseBodyConfig};
///
/// // Parse a plain-text counter.
/// let config = ResponseBodyConfig::text(|body| body.trim().parse::<u64>());
/// assert_eq!(config.materialization(), BodyMaterialization::Text);
///
/// // Decode JSON with serde.
/// #[derive(serde::Deserialize)]
/// struct Widget { id: u64 }
/// let config = ResponseBodyConfig::<Widget>::json();
/// ```
pub struct ResponseBodyConfig<R> {
    materialization: BodyMaterialization,
    converter: Arc<Converter<R>>,
}

impl<R: 'static> ResponseBodyConfig<R> {
    /// Creates a contract from a materialization and a converter over the raw
    /// [`MaterializedBody`].
    pub fn new<F>(materialization: BodyMaterialization, converter: F) -> Self
    where
        F: Fn(MaterializedBody) -> Result<R, BoxError> + Send + Sync + 'static,
    {
        Self {
            materialization,
            converter: Arc::new(converter),
        }
    }

    /// Reads the body as text and converts it with `converter`.
    ///
    /// A response without a body is converted as the empty string.
    pub fn text<F, E>(converter: F) -> Self
    where
        F: Fn(String) -> Result<R, E> + Send + Sync + 'static,
        E: Into<BoxError> + 'static,
    {
        Self::new(BodyMaterialization::Text, move |body| match body {
            MaterializedBody::Text(text) => converter(text).map_err(Into::into),
            MaterializedBody::Absent => converter(String::new()).map_err(Into::into),
            MaterializedBody::Stream(_) => {
                Err("expected a text body but the transport delivered a byte stream".into())
            }
        })
    }

    /// Receives the body as a stream and converts it with `converter`.
    pub fn byte_stream<F, E>(converter: F) -> Self
    where
        F: Fn(BodyStream) -> Result<R, E> + Send + Sync + 'static,
        E: Into<BoxError> + 'static,
    {
        Self::new(BodyMaterialization::ByteStream, move |body| {
            let stream = match body {
                MaterializedBody::Stream(stream) => stream,
                MaterializedBody::Text(text) => BodyStream::from_bytes(text),
                MaterializedBody::Absent => BodyStream::empty(),
            };
            converter(stream).map_err(Into::into)
        })
    }

    /// The materialization the transport is asked for.
    pub fn materialization(&self) -> BodyMaterialization {
        self.materialization
    }

    pub(crate) fn convert(&self, body: MaterializedBody) -> Result<R, BoxError> {
        (self.converter)(body)
    }
}

impl<R: DeserializeOwned + 'static> ResponseBodyConfig<R> {
    /// Reads the body as text and decodes it as JSON.
    pub fn json() -> Self {
        Self::text(|body| serde_json::from_str::<R>(&body))
    }
}

impl ResponseBodyConfig<String> {
    /// Returns the body text unchanged.
    pub fn string() -> Self {
        Self::text(Ok::<_, Infallible>)
    }
}

impl ResponseBodyConfig<BodyStream> {
    /// Returns the body stream unchanged.
    pub fn stream() -> Self {
        Self::byte_stream(Ok::<_, Infallible>)
    }
}

impl ResponseBodyConfig<()> {
    /// Discards the body after a successful status check.
    pub fn discarding() -> Self {
        Self::new(BodyMaterialization::Discarding, |_| Ok(()))
    }
}

impl<R> Clone for ResponseBodyConfig<R> {
    fn clone(&self) -> Self {
        Self {
            materialization: self.materialization,
            converter: Arc::clone(&self.converter),
        }
    }
}

impl<R> fmt::Debug for ResponseBodyConfig<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseBodyConfig")
            .field("materialization", &self.materialization)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Widget {
        id: u32,
    }

    #[test]
    fn test_discarding_still_reads_text() {
        let config = ResponseBodyConfig::discarding();
        assert!(config.materialization().is_text());
        assert!(config
            .convert(MaterializedBody::Text("ignored".to_string()))
            .is_ok());
    }

    #[test]
    fn test_json_conversion() {
        let config = ResponseBodyConfig::<Widget>::json();
        let widget = config
            .convert(MaterializedBody::Text(r#"{"id": 7}"#.to_string()))
            .unwrap();
        assert_eq!(widget, Widget { id: 7 });

        let error = config
            .convert(MaterializedBody::Text("not json".to_string()))
            .unwrap_err();
        assert!(error.is::<serde_json::Error>());
    }

    #[test]
    fn test_text_converter_rejects_stream() {
        let config = ResponseBodyConfig::string();
        let result = config.convert(MaterializedBody::Stream(BodyStream::empty()));
        assert!(result.is_err());
    }

    #[test]
    fn test_text_converter_accepts_absent_body() {
        let config = ResponseBodyConfig::string();
        assert_eq!(config.convert(MaterializedBody::Absent).unwrap(), "");
    }

    #[tokio::test]
    async fn test_stream_collects_chunks() {
        let chunks = vec![Ok(Bytes::from_static(b"ab")), Ok(Bytes::from_static(b"cd"))];
        let body = BodyStream::new(stream::iter(chunks));
        assert_eq!(body.collect_bytes().await.unwrap(), Bytes::from_static(b"abcd"));
    }

    #[tokio::test]
    async fn test_stream_config_accepts_text() {
        let config = ResponseBodyConfig::stream();
        let stream = config
            .convert(MaterializedBody::Text("hello".to_string()))
            .unwrap();
        assert_eq!(stream.collect_bytes().await.unwrap(), Bytes::from_static(b"hello"));
    }
}
