//! Cache-and-network demo
//!
//! Two views ask for the newest story with `cache-and-network`. The first
//! goes to the network; the second is answered from the cache at once and
//! refreshed in the background. A mutation then renames the story, which
//! invalidates and silently re-runs the cached query.
//!
//! Run with: RUST_LOG=ouroboros_exchange=debug cargo run --example cache_and_network

use anyhow::Result;
use async_trait::async_trait;
use ouroboros_exchange::{
    CacheConfig, CacheExchange, Client, Operation, OperationResult, TracingObserver, Transport,
};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

const STORIES_QUERY: &str = "query hn { hn { newStories(limit: 1) { title } } }";
const RENAME_STORY: &str =
    "mutation rename($title: String!) { renameStory(id: 1, title: $title) { id title } }";

/// Stand-in for a remote news service
struct NewsService {
    title: Mutex<String>,
    requests: AtomicUsize,
}

#[async_trait]
impl Transport for NewsService {
    async fn execute(&self, operation: Operation) -> Option<OperationResult> {
        let n = self.requests.fetch_add(1, Ordering::SeqCst) + 1;
        info!("network request #{}: {}", n, operation.query);
        tokio::time::sleep(Duration::from_millis(50)).await;

        let data = if operation.query.as_str().contains("renameStory") {
            let title = operation.variables["title"].as_str().unwrap_or_default().to_string();
            *self.title.lock().ok()? = title.clone();
            json!({"renameStory": {"__typename": "Story", "id": 1, "title": title}})
        } else {
            let title = self.title.lock().ok()?.clone();
            json!({"hn": {"__typename": "HackerNews", "newStories": [{"__typename": "Story", "title": title}]}})
        };

        Some(OperationResult::data(operation, data))
    }
}

fn render(view: &str, result: &OperationResult) {
    match &result.data {
        Some(data) => println!("{}: {}", view, data["hn"]["newStories"][0]["title"]),
        None => println!("{}: loading...", view),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let service = NewsService {
        title: Mutex::new("Show HN: a tiny cache".to_string()),
        requests: AtomicUsize::new(0),
    };

    let config = CacheConfig::stale_while_revalidate();
    let exchange = CacheExchange::try_new(config)?.with_observer(Arc::new(TracingObserver));
    let mut client = Client::with_exchange(exchange, service);

    // View one: nothing cached yet
    client.submit(client.query(STORIES_QUERY, json!({})))?;
    for result in client.run_until_idle().await {
        render("view-1", &result);
    }

    // View two: cached answer first, network refresh second
    client.submit(client.query(STORIES_QUERY, json!({})))?;
    for result in client.run_until_idle().await {
        render("view-2", &result);
    }

    // Renaming the story invalidates the cached list
    client.submit(client.mutation(RENAME_STORY, json!({"title": "Ask HN: caching?"})))?;
    for result in client.run_until_idle().await {
        if result.operation.kind.as_str() == "query" {
            render("view-2 (refreshed)", &result);
        }
    }

    println!("{}", client.stats());
    Ok(())
}
