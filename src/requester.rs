//! Drives one logical request from the final request to the caller's value.
//!
//! Starting a requester runs three steps on the caller's thread: the diagnostics
//! supplier is invoked, the caller frame is recorded and the final request is
//! built. What follows is asynchronous: the send and status check, wrapped in the
//! policy chain, then a single body conversion once an accepted response arrived.
//!
//! The two requesters differ only in which statuses they accept. The regular one
//! accepts 2xx; the optional one also accepts 404, which it resolves to `None`
//! without looking at the body.

use crate::body::{BodyMaterialization, MaterializedBody, ResponseBodyConfig};
use crate::diagnostics::Diagnostics;
use crate::error::BoxError;
use crate::policy::{self, Attempt, Operation};
use crate::response::{Exchange, ResponseSnapshot};
use crate::specification::RequestSpecification;
use crate::transport::HttpTransport;
use crate::{Error, Result};
use bytes::Bytes;
use http::{Request, StatusCode};
use std::future::Future;
use std::panic::Location;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Quoted in place of a stream body that failed while being read for a message.
const UNREADABLE_STREAM: &str = "<unreadable stream>";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Classification {
    Regular,
    Optional,
}

impl Classification {
    fn accepts(self, status: StatusCode) -> bool {
        status.is_success() || (self == Classification::Optional && status == StatusCode::NOT_FOUND)
    }
}

/// Fails on every status outside 2xx.
pub(crate) struct RegularRequester<R> {
    specification: RequestSpecification<R>,
    origin: &'static Location<'static>,
}

impl<R: Send + 'static> RegularRequester<R> {
    pub(crate) fn new(
        specification: RequestSpecification<R>,
        origin: &'static Location<'static>,
    ) -> Self {
        Self {
            specification,
            origin,
        }
    }

    pub(crate) fn start(self) -> impl Future<Output = Result<R>> + Send + 'static {
        let started = Started::begin(&self.specification, self.origin, Classification::Regular);
        let body_config = self.specification.response_body_config().clone();
        async move {
            let started = started?;
            let exchange = started.run().await?;
            started.convert(exchange, &body_config)
        }
    }
}

/// Resolves 404 to `None` and fails on every other status outside 2xx.
pub(crate) struct OptionalRequester<R> {
    specification: RequestSpecification<R>,
    origin: &'static Location<'static>,
}

impl<R: Send + 'static> OptionalRequester<R> {
    pub(crate) fn new(
        specification: RequestSpecification<R>,
        origin: &'static Location<'static>,
    ) -> Self {
        Self {
            specification,
            origin,
        }
    }

    pub(crate) fn start(self) -> impl Future<Output = Result<Option<R>>> + Send + 'static {
        let started = Started::begin(&self.specification, self.origin, Classification::Optional);
        let body_config = self.specification.response_body_config().clone();
        async move {
            let started = started?;
            let exchange = started.run().await?;
            if exchange.status() == StatusCode::NOT_FOUND {
                debug!(url = %started.context.request.uri(), "Resource not found");
                return Ok(None);
            }
            started.convert(exchange, &body_config).map(Some)
        }
    }
}

/// A logical request whose synchronous start steps are done.
struct Started {
    context: Arc<SendContext>,
    operation: Operation,
}

impl Started {
    fn begin<R: 'static>(
        specification: &RequestSpecification<R>,
        origin: &'static Location<'static>,
        classification: Classification,
    ) -> Result<Self> {
        let config = specification.client_config();

        let mut diagnostics = Diagnostics::default();
        if let Some(supplier) = config.diagnostics_supplier() {
            diagnostics.merge(supplier());
        }
        diagnostics.capture_caller(origin, config.caller_frame_count());

        let request = specification.create_final_request()?;

        let context = Arc::new(SendContext {
            transport: Arc::clone(config.transport()),
            request: Arc::new(request),
            materialization: specification.response_body_config().materialization(),
            timeout: config.timeout(),
            classification,
            diagnostics: Arc::new(diagnostics),
            attempts: AtomicUsize::new(0),
        });

        let send: Operation = {
            let context = Arc::clone(&context);
            Arc::new(move || -> Attempt { Arc::clone(&context).attempt() })
        };
        let operation = policy::compose(config.policies(), send);

        Ok(Self { context, operation })
    }

    async fn run(&self) -> Result<Exchange> {
        (self.operation)().await
    }

    fn convert<R: 'static>(&self, exchange: Exchange, config: &ResponseBodyConfig<R>) -> Result<R> {
        let (status, headers, body) = exchange.into_parts();
        let text = match &body {
            MaterializedBody::Text(text) => Some(text.clone()),
            _ => None,
        };
        let shown = match &body {
            MaterializedBody::Text(_) => None,
            MaterializedBody::Stream(_) => Some("<byte stream>"),
            MaterializedBody::Absent => Some("None"),
        };

        config.convert(body).map_err(|source| {
            let request = &self.context.request;
            let message = format!(
                "Could not process response to {} {}:\n{}",
                request.method(),
                request.uri(),
                shown.or(text.as_deref()).unwrap_or_default()
            );
            debug!(error = %source, "Response body conversion failed");
            Error::ResponseBody {
                message,
                request: self.context.request_copy(),
                response: Box::new(ResponseSnapshot::new(status, headers, text)),
                source,
                diagnostics: Arc::clone(&self.context.diagnostics),
            }
        })
    }
}

/// What every send attempt of one logical request shares.
struct SendContext {
    transport: Arc<dyn HttpTransport>,
    request: Arc<Request<Bytes>>,
    materialization: BodyMaterialization,
    timeout: Option<Duration>,
    classification: Classification,
    diagnostics: Arc<Diagnostics>,
    attempts: AtomicUsize,
}

impl SendContext {
    /// Sends the final request once and checks the status.
    fn attempt(self: Arc<Self>) -> Attempt {
        Box::pin(async move {
            let attempt = self.attempts.fetch_add(1, Ordering::Relaxed) + 1;
            debug!(
                method = %self.request.method(),
                url = %self.request.uri(),
                attempt,
                "Sending request"
            );

            let sending = self
                .transport
                .send(Request::clone(&self.request), self.materialization);
            let outcome = match self.timeout {
                Some(timeout) => tokio::time::timeout(timeout, sending)
                    .await
                    .unwrap_or_else(|elapsed| Err(elapsed.into())),
                None => sending.await,
            };

            let exchange = match outcome {
                Ok(exchange) => exchange,
                Err(source) => return Err(self.request_failure(source)),
            };

            let status = exchange.status();
            if self.classification.accepts(status) {
                debug!(status = status.as_u16(), attempt, "Response accepted");
                Ok(exchange)
            } else {
                debug!(status = status.as_u16(), attempt, "Response status rejected");
                Err(self.status_failure(exchange).await)
            }
        })
    }

    fn request_copy(&self) -> Box<Request<Bytes>> {
        Box::new(Request::clone(&self.request))
    }

    fn request_failure(&self, source: BoxError) -> Error {
        debug!(url = %self.request.uri(), error = %source, "Request failed");
        Error::RequestFailure {
            message: format!("Request to URL {} failed", self.request.uri()),
            request: self.request_copy(),
            source,
            diagnostics: Arc::clone(&self.diagnostics),
        }
    }

    async fn status_failure(&self, exchange: Exchange) -> Error {
        let (status, headers, body) = exchange.into_parts();
        let (quoted, text) = match body {
            MaterializedBody::Text(text) => (format!("'{}'", text.trim()), Some(text)),
            MaterializedBody::Stream(stream) => match stream.collect_bytes().await {
                Ok(bytes) => {
                    let text = String::from_utf8_lossy(&bytes).into_owned();
                    (format!("'{}'", text.trim()), Some(text))
                }
                Err(e) => {
                    debug!(error = %e, "Could not read response body for error message");
                    (format!("'{}'", UNREADABLE_STREAM), None)
                }
            },
            MaterializedBody::Absent => ("None".to_string(), None),
        };

        Error::ResponseStatus {
            message: format!(
                "Got status {} with message {} for {} {}",
                status.as_u16(),
                quoted,
                self.request.method(),
                self.request.uri()
            ),
            request: self.request_copy(),
            response: Box::new(ResponseSnapshot::new(status, headers, text)),
            diagnostics: Arc::clone(&self.diagnostics),
        }
    }
}
