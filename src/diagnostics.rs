//! Diagnostic context gathered once per logical request.
//!
//! Errors surface on whatever task the transport or a policy happens to run on, so
//! by the time a caller inspects one, the stack that started the request is long
//! gone. The [`Diagnostics`] bundle keeps two things around for troubleshooting:
//! free-form key/value data produced by the configured diagnostics supplier, and
//! the caller frame that initiated the request.

use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::panic::Location;

/// Key/value data produced by a diagnostics supplier.
pub type DiagnosticsData = BTreeMap<String, Value>;

/// A source location in the code that started a logical request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallerFrame {
    file: &'static str,
    line: u32,
    column: u32,
}

impl CallerFrame {
    /// The source file of the call site.
    pub fn file(&self) -> &'static str {
        self.file
    }

    /// The line of the call site.
    pub fn line(&self) -> u32 {
        self.line
    }

    /// The column of the call site.
    pub fn column(&self) -> u32 {
        self.column
    }
}

impl From<&'static Location<'static>> for CallerFrame {
    fn from(location: &'static Location<'static>) -> Self {
        Self {
            file: location.file(),
            line: location.line(),
            column: location.column(),
        }
    }
}

impl fmt::Display for CallerFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// Diagnostics attached to every error raised for one logical request.
///
/// The bundle is filled in before the first send attempt and is read-only
/// afterwards; retries triggered by a policy share the same snapshot.
///
/// # Examples
///
/// ```no_run
/// use restflow::RestClient;
///
/// # async fn example() -> Result<(), restflow::Error> {
/// let client = RestClient::builder()
///     .base_url("https://api.example.com")?
///     .diagnostics_supplier(|| {
///         let mut data = restflow::DiagnosticsData::new();
///         data.insert("tenant".to_string(), "acme".into());
///         data
///     })
///     .build()?;
///
/// if let Err(e) = client.get("/widgets/7")?.returning_string().fetch().await {
///     if let Some(diagnostics) = e.diagnostics() {
///         eprintln!("tenant: {:?}", diagnostics.get("tenant"));
///         for frame in diagnostics.caller_frames() {
///             eprintln!("  started at {}", frame);
///         }
///     }
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnostics {
    data: DiagnosticsData,
    caller_frames: Vec<CallerFrame>,
}

impl Diagnostics {
    /// Returns all diagnostic values.
    pub fn data(&self) -> &DiagnosticsData {
        &self.data
    }

    /// Returns a single diagnostic value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Returns the captured caller frames, outermost library call first.
    ///
    /// Empty when caller frame capture is disabled.
    pub fn caller_frames(&self) -> &[CallerFrame] {
        &self.caller_frames
    }

    /// Merges supplied values into the bundle. Existing keys are overwritten.
    pub(crate) fn merge(&mut self, values: impl IntoIterator<Item = (String, Value)>) {
        self.data.extend(values);
    }

    /// Records up to `count` frames starting at `origin`.
    ///
    /// `origin` is the first location outside this crate, obtained through
    /// `#[track_caller]` on the public entry points. Locations further up the
    /// stack are not observable, so at most one frame is recorded.
    pub(crate) fn capture_caller(&mut self, origin: &'static Location<'static>, count: usize) {
        self.caller_frames = std::iter::once(CallerFrame::from(origin))
            .take(count)
            .collect();
    }
}
