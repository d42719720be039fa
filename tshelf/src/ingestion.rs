use anyhow::{Context, Result};
use common::FeedsConfig;
use feed_rs::model::Feed;
use feed_rs::parser;
use reqwest::Client;
use std::time::Duration;
use tracing::{error, info};

use crate::extraction::RawEntry;

/// Entries taken from one successfully parsed feed
#[derive(Debug, Clone)]
pub struct FetchedFeed {
    pub url: String,
    /// Feed's declared title, or its URL when it has none
    pub source: String,
    pub entries: Vec<RawEntry>,
}

/// Outcome of fetching every configured feed
#[derive(Debug, Default)]
pub struct Ingestion {
    pub feeds: Vec<FetchedFeed>,
    /// (url, error) for each feed that could not be fetched or parsed
    pub failures: Vec<(String, String)>,
}

pub fn build_client(config: &FeedsConfig) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(config.fetch_timeout_seconds))
        .user_agent(config.user_agent.clone())
        .build()
        .context("failed to build reqwest client")
}

/// Fetches a feed from the given URL and parses it. No retries.
pub async fn fetch_and_parse_feed(client: &Client, url: &str) -> Result<Feed> {
    let response = client.get(url).send().await.context("failed to fetch feed")?;

    let status = response.status();
    if !status.is_success() {
        return Err(anyhow::anyhow!("feed fetch failed with status: {}", status));
    }

    let bytes = response.bytes().await.context("failed to read response body")?;
    let feed = parser::parse(bytes.as_ref()).context("failed to parse feed")?;

    Ok(feed)
}

/// Fetch one feed and keep at most `limit` entries in feed order.
pub async fn fetch_feed(client: &Client, url: &str, limit: usize) -> Result<FetchedFeed> {
    let feed = fetch_and_parse_feed(client, url).await?;

    let source = feed
        .title
        .as_ref()
        .map(|t| t.content.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| url.to_string());

    let entries = feed.entries.iter().take(limit).map(RawEntry::from).collect();

    Ok(FetchedFeed {
        url: url.to_string(),
        source,
        entries,
    })
}

/// Fetch every configured feed in order. A failing feed is logged and skipped.
pub async fn ingest_feeds(client: &Client, config: &FeedsConfig) -> Ingestion {
    let mut ingestion = Ingestion::default();

    for url in &config.urls {
        info!("fetching feed {}", url);
        match fetch_feed(client, url, config.per_feed_limit).await {
            Ok(feed) => {
                info!("fetched '{}': {} entries", feed.source, feed.entries.len());
                ingestion.feeds.push(feed);
            }
            Err(e) => {
                error!("failed to fetch feed {}: {:#}", url, e);
                ingestion.failures.push((url.clone(), format!("{:#}", e)));
            }
        }
    }

    ingestion
}
