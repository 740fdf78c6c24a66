//! In-memory transport for unit tests.

use crate::body::{BodyMaterialization, BodyStream, MaterializedBody};
use crate::error::BoxError;
use crate::response::Exchange;
use crate::transport::HttpTransport;
use bytes::Bytes;
use futures_util::future::BoxFuture;
use futures_util::stream;
use http::{HeaderMap, Request, StatusCode};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One scripted reply.
pub(crate) enum Reply {
    Respond(StatusCode, Option<&'static str>),
    /// Streams the chunks in order; an `Err` item fails the stream at that point.
    Chunks(StatusCode, Vec<Result<&'static [u8], &'static str>>),
    Fail(&'static str),
    Stall(Duration),
}

/// Replies with the scripted outcomes in order, then with `204 No Content`.
///
/// Text bodies are delivered as text or as a single-chunk stream depending on the
/// requested materialization. Sent requests are recorded.
pub(crate) struct ScriptedTransport {
    replies: Mutex<VecDeque<Reply>>,
    sent: Arc<Mutex<Vec<Request<Bytes>>>>,
}

impl ScriptedTransport {
    pub(crate) fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            sent: Arc::default(),
        }
    }

    pub(crate) fn sent(&self) -> Arc<Mutex<Vec<Request<Bytes>>>> {
        Arc::clone(&self.sent)
    }
}

impl HttpTransport for ScriptedTransport {
    fn send(
        &self,
        request: Request<Bytes>,
        materialization: BodyMaterialization,
    ) -> BoxFuture<'static, Result<Exchange, BoxError>> {
        self.sent.lock().unwrap().push(request);
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Reply::Respond(StatusCode::NO_CONTENT, None));

        Box::pin(async move {
            match reply {
                Reply::Respond(status, body) => {
                    let body = match body {
                        None => MaterializedBody::Absent,
                        Some(text) if materialization.is_text() => {
                            MaterializedBody::Text(text.to_string())
                        }
                        Some(text) => MaterializedBody::Stream(BodyStream::from_bytes(text)),
                    };
                    Ok(Exchange::new(status, HeaderMap::new(), body))
                }
                Reply::Chunks(status, chunks) => {
                    let chunks = chunks
                        .into_iter()
                        .map(|chunk| chunk.map(Bytes::from_static).map_err(BoxError::from));
                    let body = MaterializedBody::Stream(BodyStream::new(stream::iter(chunks)));
                    Ok(Exchange::new(status, HeaderMap::new(), body))
                }
                Reply::Fail(message) => Err(BoxError::from(message)),
                Reply::Stall(delay) => {
                    tokio::time::sleep(delay).await;
                    Ok(Exchange::new(
                        StatusCode::NO_CONTENT,
                        HeaderMap::new(),
                        MaterializedBody::Absent,
                    ))
                }
            }
        })
    }
}
