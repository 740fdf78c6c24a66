//! # Restflow - a fluent asynchronous REST client
//!
//! Restflow builds REST calls as a short chain: choose the request, declare what
//! the response body should become, optionally customize the request, then send.
//! The result is either the value you asked for or an [`Error`] that says what
//! went wrong and carries the diagnostics gathered when the call started.
//!
//! ## Quick Start
//!
//! ```no_run
//! use restflow::policy::{RetryPolicy, TimeoutPolicy};
//! use restflow::RestClient;
//! use serde::{Deserialize, Serialize};
//! use std::time::Duration;
//!
//! #[derive(Serialize)]
//! struct CreateUser {
//!     name: String,
//!     email: String,
//! }
//!
//! #[derive(Deserialize)]
//! struct User {
//!     id: u64,
//!     name: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), restflow::Error> {
//!     let client = RestClient::builder()
//!         .base_url("https://api.example.com/v1")?
//!         .policy(RetryPolicy::retries(2))
//!         .policy(TimeoutPolicy::new(Duration::from_secs(5)))
//!         .build()?;
//!
//!     // Fails on any status outside 2xx
//!     let user: User = client.get("users/123")?.returning().fetch().await?;
//!     println!("User: {}", user.name);
//!
//!     // Resolves to None on 404
//!     let maybe: Option<User> = client.get("users/456")?.returning().try_fetch().await?;
//!     println!("Found: {}", maybe.is_some());
//!
//!     // Ignores the body of a successful response
//!     let new_user = CreateUser {
//!         name: "Alice".to_string(),
//!         email: "alice@example.com".to_string(),
//!     };
//!     client
//!         .post(&new_user)?
//!         .to("users")?
//!         .returning_nothing()
//!         .execute()
//!         .await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Declared response contracts** - JSON into any `Deserialize` type, strings, byte streams, or nothing
//! - **Three failure families** - no response, rejected status, or an unconvertible body, see [`Error`]
//! - **Diagnostics** - key/value context and the calling source location attached to every error
//! - **Request customizers** - per client or per call, applied in order with last write winning
//! - **Resilience policies** - retries with backoff and rate limit awareness, timeouts, or your own [`policy::Policy`]
//! - **Pluggable transport** - `reqwest` by default, any [`HttpTransport`] otherwise
//! - **Structured logging** with `tracing`
//!
//! ## Error Handling
//!
//! ```no_run
//! use restflow::{Error, RestClient};
//!
//! # async fn example() -> Result<(), Error> {
//! # let client = RestClient::builder().base_url("https://api.example.com")?.build()?;
//! match client.get("endpoint")?.returning_string().fetch().await {
//!     Ok(body) => println!("Success: {}", body),
//!     Err(e @ Error::ResponseStatus { .. }) => {
//!         eprintln!("{}", e);
//!         eprintln!("Started at: {:?}", e.caller_frames());
//!     }
//!     Err(Error::RequestFailure { message, source, .. }) => {
//!         eprintln!("{}: {}", message, source);
//!     }
//!     Err(e) => eprintln!("Other error: {}", e),
//! }
//! # Ok(())
//! # }
//! ```

pub mod body;
pub mod client;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod handle;
pub mod policy;
pub mod rate_limit;
pub mod request;
mod requester;
pub mod response;
pub mod specification;
pub mod transport;

#[cfg(test)]
mod testing;

pub use body::{BodyMaterialization, BodyStream, MaterializedBody, ResponseBodyConfig};
pub use client::{ClientBuilder, RestClient};
pub use config::{ClientConfig, DiagnosticsSupplier, DEFAULT_CALLER_FRAME_COUNT};
pub use diagnostics::{CallerFrame, Diagnostics, DiagnosticsData};
pub use error::{BoxError, Error, Result};
pub use handle::{ExecuteHandle, FetchHandle, RequestBodyHandle, RequestHandle};
pub use request::{RequestBuilder, RequestCustomizer};
pub use response::{Exchange, ResponseSnapshot};
pub use specification::RequestSpecification;
pub use transport::HttpTransport;
