//! Immutable per-client configuration.

use crate::diagnostics::DiagnosticsData;
use crate::policy::Policy;
use crate::request::{RequestBuilder, RequestCustomizer};
use crate::transport::HttpTransport;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Produces diagnostic values when a logical request starts.
///
/// The supplier runs on the caller's thread, so it may read task-local or
/// thread-local context.
pub type DiagnosticsSupplier = Arc<dyn Fn() -> DiagnosticsData + Send + Sync>;

/// Number of caller frames recorded when none is configured.
pub const DEFAULT_CALLER_FRAME_COUNT: usize = 5;

/// Everything a request needs besides its own method, URI, headers and body.
///
/// A `ClientConfig` is never mutated; the `with_*` methods return an updated copy.
/// This is how per-call customizations leave the client's configuration alone.
#[derive(Clone)]
pub struct ClientConfig {
    transport: Arc<dyn HttpTransport>,
    policies: Vec<Arc<dyn Policy>>,
    request_customizers: Vec<RequestCustomizer>,
    diagnostics_supplier: Option<DiagnosticsSupplier>,
    timeout: Option<Duration>,
    caller_frame_count: usize,
}

impl ClientConfig {
    /// A configuration using `transport`, without policies or customizers.
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            policies: Vec::new(),
            request_customizers: Vec::new(),
            diagnostics_supplier: None,
            timeout: None,
            caller_frame_count: DEFAULT_CALLER_FRAME_COUNT,
        }
    }

    /// Appends a policy. Policies registered earlier wrap those registered later.
    pub fn with_policy(mut self, policy: Arc<dyn Policy>) -> Self {
        self.policies.push(policy);
        self
    }

    /// Appends a request customizer.
    pub fn with_customizer(mut self, customizer: RequestCustomizer) -> Self {
        self.request_customizers.push(customizer);
        self
    }

    /// Replaces the diagnostics supplier.
    pub fn with_diagnostics_supplier(mut self, supplier: DiagnosticsSupplier) -> Self {
        self.diagnostics_supplier = Some(supplier);
        self
    }

    /// Sets the timeout applied to every individual send.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets how many caller frames to record. `0` disables capture.
    pub fn with_caller_frame_count(mut self, count: usize) -> Self {
        self.caller_frame_count = count;
        self
    }

    /// The transport requests are sent with.
    pub fn transport(&self) -> &Arc<dyn HttpTransport> {
        &self.transport
    }

    /// Policies in registration order.
    pub fn policies(&self) -> &[Arc<dyn Policy>] {
        &self.policies
    }

    /// Request customizers in registration order.
    pub fn request_customizers(&self) -> &[RequestCustomizer] {
        &self.request_customizers
    }

    /// The diagnostics supplier, if any.
    pub fn diagnostics_supplier(&self) -> Option<&DiagnosticsSupplier> {
        self.diagnostics_supplier.as_ref()
    }

    /// The per-send timeout, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// How many caller frames are recorded.
    pub fn caller_frame_count(&self) -> usize {
        self.caller_frame_count
    }

    pub(crate) fn customize(&self, builder: &mut RequestBuilder) {
        for customizer in &self.request_customizers {
            customizer(builder);
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("policies", &self.policies.len())
            .field("request_customizers", &self.request_customizers.len())
            .field("diagnostics_supplier", &self.diagnostics_supplier.is_some())
            .field("timeout", &self.timeout)
            .field("caller_frame_count", &self.caller_frame_count)
            .finish_non_exhaustive()
    }
}
