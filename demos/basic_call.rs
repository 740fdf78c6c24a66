//! Basic example: GET, POST and a 404-tolerant fetch.
//!
//! This example shows how to:
//! - Create a client with a base URL and a default header
//! - Fetch JSON into a typed struct
//! - Post a JSON body and decode the reply
//! - Treat a missing resource as `None`
//!
//! Run with: `cargo run --example basic_call`

use restflow::{Error, RestClient};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct Post {
    #[serde(rename = "userId")]
    user_id: u32,
    id: u32,
    title: String,
    body: String,
}

#[derive(Debug, Serialize)]
struct NewPost {
    title: String,
    body: String,
    #[serde(rename = "userId")]
    user_id: u32,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter("restflow=debug,basic_call=info")
        .init();

    let client = RestClient::builder()
        .base_url("https://jsonplaceholder.typicode.com")?
        .default_header("Accept", "application/json")?
        .build()?;

    println!("=== GET Request Example ===");
    let post: Post = client.get("posts/1")?.returning().fetch().await?;
    println!("Post ID: {}", post.id);
    println!("Title: {}", post.title);
    println!();

    println!("=== POST Request Example ===");
    let new_post = NewPost {
        title: "My New Post".to_string(),
        body: "This is the content of my new post!".to_string(),
        user_id: 1,
    };
    let created = client
        .post(&new_post)?
        .to("posts")?
        .returning_json_value()
        .fetch()
        .await?;
    println!("Created post: {}", created);
    println!();

    println!("=== Optional Fetch Example ===");
    let missing = client
        .get("posts/999999")?
        .returning::<Post>()
        .try_fetch()
        .await?;
    match missing {
        Some(post) => println!("Unexpectedly found post {}", post.id),
        None => println!("Post 999999 does not exist"),
    }
    println!();

    println!("=== Execute Example ===");
    client
        .delete("posts/1")?
        .returning_nothing()
        .customizing_request(|request| {
            request.header("X-Request-Reason", "demo");
        })
        .execute()
        .await?;
    println!("Deleted post 1");

    Ok(())
}
