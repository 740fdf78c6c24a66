//! Example demonstrating error handling.
//!
//! This example shows how to:
//! - Tell the three failure families apart
//! - Read the rejected response and the request that caused it
//! - Attach diagnostics to every error and find where a call started
//! - Get at the converter or transport error behind a failure
//!
//! Run with: `cargo run --example error_handling`

use restflow::{DiagnosticsData, Error, RestClient};
use serde::Deserialize;
use std::error::Error as _;

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct Post {
    id: u32,
    title: String,
}

fn report(error: &Error) {
    println!("  Message: {}", error);
    println!("  Retryable: {}", error.is_retryable());
    if let Some(request) = error.request() {
        println!("  Request: {} {}", request.method(), request.uri());
    }
    if let Some(diagnostics) = error.diagnostics() {
        println!("  Diagnostics: {:?}", diagnostics.data());
        for frame in diagnostics.caller_frames() {
            println!("  Started at: {}", frame);
        }
    }
    if let Some(source) = error.source() {
        println!("  Caused by: {}", source);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("restflow=info")
        .init();

    let client = RestClient::builder()
        .base_url("https://jsonplaceholder.typicode.com")?
        .diagnostics_supplier(|| {
            let mut data = DiagnosticsData::new();
            data.insert("demo".to_string(), "error_handling".into());
            data
        })
        .build()?;

    println!("=== Example 1: Rejected Status ===");
    match client.get("posts/999999")?.returning::<Post>().fetch().await {
        Ok(post) => println!("Success: {:?}", post),
        Err(e @ Error::ResponseStatus { .. }) => {
            println!("Status rejected!");
            if let Some(response) = e.response() {
                println!("  Status: {}", response.status());
                println!("  Content-Type: {:?}", response.header("content-type"));
            }
            report(&e);
        }
        Err(e) => println!("Other error: {}", e),
    }
    println!();

    println!("=== Example 2: Body Conversion Failure ===");
    #[derive(Debug, Deserialize)]
    #[allow(dead_code)]
    struct WrongSchema {
        nonexistent_field: String,
    }

    match client.get("posts/1")?.returning::<WrongSchema>().fetch().await {
        Ok(_) => println!("Unexpected success"),
        Err(e @ Error::ResponseBody { .. }) => {
            println!("Body did not match!");
            if let Some(raw) = e.raw_body() {
                println!(
                    "  Raw response (first 200 chars): {}",
                    raw.chars().take(200).collect::<String>()
                );
            }
            report(&e);
        }
        Err(e) => println!("Other error: {}", e),
    }
    println!();

    println!("=== Example 3: No Response ===");
    let unreachable = RestClient::builder()
        .base_url("https://this-domain-does-not-exist-12345.com")?
        .build()?;

    match unreachable.get("")?.returning_json_value().fetch().await {
        Ok(_) => println!("Unexpected success"),
        Err(e @ Error::RequestFailure { .. }) => {
            println!("Request failed!");
            println!("  Timed out: {}", e.is_timeout());
            report(&e);
        }
        Err(e) => println!("Other error: {}", e),
    }

    Ok(())
}
