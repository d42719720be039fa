use anyhow::Result;
use common::Config;
use futures::stream::{self, StreamExt};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::classifier::{ClassificationOutcome, Classifier};
use crate::curriculum::{CurriculumAggregator, CurriculumReport, Placement};
use crate::extraction::{extract_article, Article, Rejection};
use crate::ingestion::{build_client, ingest_feeds, Ingestion};
use crate::llm::{preview, LlmProvider};

/// Fixed pause between consecutive LLM calls.
///
/// `acquire` spaces call starts by the interval. When calls run one at a
/// time, `release` after each call moves the next slot to one interval past
/// its completion, so a slow call is still followed by the full pause.
pub struct RateLimiter {
    interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_slot: Mutex::new(None),
        }
    }

    /// Wait until the next call may start. The first call never waits.
    pub async fn acquire(&self) {
        let mut next_slot = self.next_slot.lock().await;
        if let Some(at) = *next_slot {
            tokio::time::sleep_until(at).await;
        }
        *next_slot = Some(Instant::now() + self.interval);
    }

    /// Mark the current call as finished; the next one waits a full interval from now.
    pub async fn release(&self) {
        let mut next_slot = self.next_slot.lock().await;
        let after_call = Instant::now() + self.interval;
        *next_slot = Some(next_slot.map_or(after_call, |at| at.max(after_call)));
    }
}

/// Counters for one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    pub feeds_fetched: usize,
    pub feeds_failed: usize,
    pub entries_seen: usize,
    pub articles_extracted: usize,
    pub dropped_short: usize,
    pub dropped_incomplete: usize,
    pub classified: usize,
    pub skipped: usize,
    pub malformed: usize,
    pub failed: usize,
    pub overflow: usize,
    pub rejected: usize,
}

impl RunStats {
    fn log(&self) {
        info!(
            "feeds: {} fetched, {} failed; entries: {} seen, {} extracted, {} too short, {} incomplete",
            self.feeds_fetched,
            self.feeds_failed,
            self.entries_seen,
            self.articles_extracted,
            self.dropped_short,
            self.dropped_incomplete
        );
        info!(
            "classification: {} classified, {} skipped, {} malformed, {} failed, {} overflow, {} rejected",
            self.classified, self.skipped, self.malformed, self.failed, self.overflow, self.rejected
        );
    }
}

/// Feed ingestion, extraction, classification and aggregation for one run.
pub struct Pipeline {
    config: Config,
    client: Client,
    classifier: Classifier,
    limiter: RateLimiter,
}

impl Pipeline {
    pub fn new(config: Config, provider: Arc<dyn LlmProvider>) -> Result<Self> {
        let client = build_client(&config.feeds)?;
        let classifier = Classifier::new(provider, config.curriculum.clone(), &config.llm);
        let limiter = RateLimiter::new(Duration::from_millis(config.llm.request_delay_ms));
        Ok(Self {
            config,
            client,
            classifier,
            limiter,
        })
    }

    /// Run the whole batch. Per-feed and per-article failures are logged and
    /// skipped; the returned report covers whatever succeeded.
    pub async fn run(&self) -> (CurriculumReport, RunStats) {
        let mut stats = RunStats::default();

        info!("fetching {} feeds", self.config.feeds.urls.len());
        let ingestion = ingest_feeds(&self.client, &self.config.feeds).await;
        let articles = self.extract(ingestion, &mut stats);
        info!("found {} articles to analyze", articles.len());

        let report = self.classify_all(articles, &mut stats).await;
        stats.log();
        (report, stats)
    }

    fn extract(&self, ingestion: Ingestion, stats: &mut RunStats) -> Vec<Article> {
        stats.feeds_fetched = ingestion.feeds.len();
        stats.feeds_failed = ingestion.failures.len();

        let mut articles = Vec::new();
        for feed in &ingestion.feeds {
            for raw in &feed.entries {
                stats.entries_seen += 1;
                match extract_article(raw, &feed.source, &self.config.extraction) {
                    Ok(article) => articles.push(article),
                    Err(Rejection::TooShort { .. }) => stats.dropped_short += 1,
                    Err(rejection) => {
                        warn!("dropping entry from {}: {:?}", feed.url, rejection);
                        stats.dropped_incomplete += 1;
                    }
                }
            }
        }
        stats.articles_extracted = articles.len();
        articles
    }

    async fn classify_all(&self, articles: Vec<Article>, stats: &mut RunStats) -> CurriculumReport {
        let total = articles.len();
        let classifier = &self.classifier;
        let limiter = &self.limiter;
        let concurrency = self.config.llm.concurrency.max(1);
        let sequential = concurrency == 1;

        // buffered() yields in input order, so aggregation order is stable
        let results = stream::iter(articles.into_iter().enumerate())
            .map(move |(i, article)| async move {
                limiter.acquire().await;
                info!("[{}/{}] {}", i + 1, total, preview(&article.title, 60));
                let outcome = classifier.classify(&article).await;
                if sequential {
                    limiter.release().await;
                }
                (article, outcome)
            })
            .buffered(concurrency);
        futures::pin_mut!(results);

        let mut aggregator = CurriculumAggregator::from_config(classifier.taxonomy());
        while let Some((article, outcome)) = results.next().await {
            match outcome {
                ClassificationOutcome::Classified(classification) => {
                    info!(
                        "  {} - {}",
                        classification.topic, classification.difficulty.level
                    );
                    match aggregator.add(article, classification) {
                        Placement::Bucketed => stats.classified += 1,
                        Placement::Overflow => {
                            stats.classified += 1;
                            stats.overflow += 1;
                        }
                        Placement::Rejected => stats.rejected += 1,
                    }
                }
                ClassificationOutcome::Skip => {
                    info!("  skipped: '{}'", preview(&article.title, 60));
                    stats.skipped += 1;
                }
                ClassificationOutcome::Malformed { .. } => {
                    warn!("  dropped '{}': unusable response", preview(&article.title, 60));
                    stats.malformed += 1;
                }
                ClassificationOutcome::Failed { .. } => {
                    warn!("  dropped '{}': classification failed", preview(&article.title, 60));
                    stats.failed += 1;
                }
            }
        }

        aggregator.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_acquire_is_immediate_and_later_ones_are_spaced() {
        let limiter = RateLimiter::new(Duration::from_millis(50));
        let start = Instant::now();
        limiter.acquire().await;
        assert!(start.elapsed() < Duration::from_millis(50));

        limiter.acquire().await;
        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(100));
    }

    #[tokio::test]
    async fn release_pauses_after_a_slow_call() {
        let limiter = RateLimiter::new(Duration::from_millis(50));
        limiter.acquire().await;
        // the call outlasts the interval
        tokio::time::sleep(Duration::from_millis(80)).await;
        limiter.release().await;

        let finished = Instant::now();
        limiter.acquire().await;
        assert!(finished.elapsed() >= Duration::from_millis(50));
    }
}
