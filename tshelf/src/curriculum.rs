use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use common::{level_key, CurriculumConfig, UnknownLevelPolicy};
use indexmap::IndexMap;
use serde::Serialize;
use std::path::Path;
use tracing::warn;

use crate::classifier::Classification;
use crate::extraction::Article;

/// A classified article as it appears in the report (content dropped)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurriculumEntry {
    pub title: String,
    pub url: String,
    pub published: String,
    pub source: String,
    pub curriculum: Classification,
}

impl CurriculumEntry {
    pub fn new(article: Article, classification: Classification) -> Self {
        Self {
            title: article.title,
            url: article.url,
            published: article.published,
            source: article.source,
            curriculum: classification,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopicGroup {
    pub name: String,
    pub article_count: usize,
    pub articles: Vec<CurriculumEntry>,
    /// Every configured level is present, possibly empty
    pub levels: IndexMap<String, Vec<CurriculumEntry>>,
}

impl TopicGroup {
    fn new(name: &str, levels: &[String]) -> Self {
        Self {
            name: name.to_string(),
            article_count: 0,
            articles: Vec::new(),
            levels: levels.iter().map(|l| (l.clone(), Vec::new())).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CurriculumReport {
    pub generated_at: String,
    pub total_articles: usize,
    pub topics: IndexMap<String, TopicGroup>,
    pub articles: Vec<CurriculumEntry>,
}

impl CurriculumReport {
    /// (topic, article count), highest count first; ties keep first-appearance order.
    pub fn topic_counts(&self) -> Vec<(&str, usize)> {
        let mut counts: Vec<(&str, usize)> = self
            .topics
            .values()
            .map(|t| (t.name.as_str(), t.article_count))
            .collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1));
        counts
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("failed to serialize curriculum report")
    }
}

/// Where `add` put an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Into one of the configured level buckets
    Bucketed,
    /// Into an extra bucket named after an unconfigured level
    Overflow,
    /// Left out because its level is not configured
    Rejected,
}

/// Folds classified articles into topic and level groups, in arrival order.
pub struct CurriculumAggregator {
    levels: Vec<String>,
    policy: UnknownLevelPolicy,
    topics: IndexMap<String, TopicGroup>,
    articles: Vec<CurriculumEntry>,
}

impl CurriculumAggregator {
    /// `levels` are turned into bucket keys with [`level_key`].
    pub fn new(levels: Vec<String>, policy: UnknownLevelPolicy) -> Self {
        Self {
            levels: levels.iter().map(|l| level_key(l)).collect(),
            policy,
            topics: IndexMap::new(),
            articles: Vec::new(),
        }
    }

    pub fn from_config(config: &CurriculumConfig) -> Self {
        Self::new(config.levels.clone(), config.unknown_level)
    }

    pub fn add(&mut self, article: Article, classification: Classification) -> Placement {
        let entry = CurriculumEntry::new(article, classification);
        let topic = entry.curriculum.topic.clone();
        let level = entry.curriculum.difficulty.level.clone();

        let known = self.levels.contains(&level);
        let placement = match (known, self.policy) {
            (true, _) => Placement::Bucketed,
            (false, UnknownLevelPolicy::Overflow) => {
                warn!(
                    "'{}' ({}) has unconfigured level '{}', placing it in an overflow bucket",
                    entry.title, topic, level
                );
                Placement::Overflow
            }
            (false, UnknownLevelPolicy::Reject) => {
                warn!(
                    "'{}' ({}) has unconfigured level '{}', leaving it out of the curriculum",
                    entry.title, topic, level
                );
                return Placement::Rejected;
            }
        };

        let group = self
            .topics
            .entry(topic.clone())
            .or_insert_with(|| TopicGroup::new(&topic, &self.levels));
        group.article_count += 1;
        group.articles.push(entry.clone());
        group.levels.entry(level).or_default().push(entry.clone());

        self.articles.push(entry);
        placement
    }

    pub fn len(&self) -> usize {
        self.articles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }

    /// Stamp the completion time and hand over the report.
    pub fn finish(self) -> CurriculumReport {
        CurriculumReport {
            generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            total_articles: self.articles.len(),
            topics: self.topics,
            articles: self.articles,
        }
    }
}

/// Write the report as pretty-printed JSON in a single write.
pub async fn write_report(report: &CurriculumReport, path: &Path) -> Result<()> {
    let json = report.to_json_pretty()?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create output directory: {}", parent.display()))?;
    }

    tokio::fs::write(path, json)
        .await
        .with_context(|| format!("Failed to write curriculum to {}", path.display()))?;
    Ok(())
}
