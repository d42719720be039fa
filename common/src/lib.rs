/*!
common/src/lib.rs

Shared configuration types and helpers for TShelf.

This file provides:
- Config data structures (deserialized from TOML), every section defaulted
- An async loader that merges a defaults file with an override file
- Validation and API credential resolution, run before any network activity
*/

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Feed list and fetching behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedsConfig {
    /// Feed URLs, processed in this order
    pub urls: Vec<String>,
    /// Maximum number of entries taken from the head of each feed
    pub per_feed_limit: usize,
    pub fetch_timeout_seconds: u64,
    pub user_agent: String,
}

impl Default for FeedsConfig {
    fn default() -> Self {
        Self {
            urls: vec![
                "https://raw.githubusercontent.com/Olshansk/rss-feeds/main/feed_anthropic_news.xml"
                    .to_string(),
                "https://openai.com/news/rss.xml".to_string(),
                "https://blog.google/technology/ai/rss/".to_string(),
            ],
            per_feed_limit: 10,
            fetch_timeout_seconds: 10,
            user_agent: "Mozilla/5.0 (compatible; TShelf/1.0)".to_string(),
        }
    }
}

/// Content extraction limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Normalized content longer than this (in chars) is cut and suffixed with "..."
    pub max_content_chars: usize,
    /// Drop entries whose normalized content is shorter than `min_content_chars`
    pub min_content_filter: bool,
    pub min_content_chars: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            max_content_chars: 3000,
            min_content_filter: true,
            min_content_chars: 100,
        }
    }
}

/// Remote LLM endpoint (OpenAI-compatible chat completions)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub api_url: String,
    /// Name of the environment variable holding the API key
    pub api_key_env: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: usize,
    pub timeout_seconds: u64,
    /// Pause before the next LLM call: after the previous call finishes when
    /// sequential, between call starts when `concurrency > 1`
    pub request_delay_ms: u64,
    /// Number of classification calls allowed in flight
    pub concurrency: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.groq.com/openai/v1/chat/completions".to_string(),
            api_key_env: "GROQ_API_KEY".to_string(),
            model: "llama-3.3-70b-versatile".to_string(),
            temperature: 0.3,
            max_tokens: 4000,
            timeout_seconds: 60,
            request_delay_ms: 500,
            concurrency: 1,
        }
    }
}

/// What the aggregator does with a difficulty level outside `levels`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownLevelPolicy {
    /// Keep the article and bucket it under its own level key
    #[default]
    Overflow,
    /// Drop the article from the report
    Reject,
}

/// Curriculum taxonomy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CurriculumConfig {
    /// Closed topic set offered to the model
    pub topics: Vec<String>,
    /// Difficulty bucket keys, in report order
    pub levels: Vec<String>,
    pub unknown_level: UnknownLevelPolicy,
    /// Prerequisites below this confidence are dropped
    pub prerequisite_min_confidence: f64,
}

impl CurriculumConfig {
    /// Configured levels as bucket keys, in report order.
    pub fn level_keys(&self) -> Vec<String> {
        self.levels.iter().map(|l| level_key(l)).collect()
    }
}

/// Bucket key for a difficulty level name: trimmed and lower-cased, so
/// `"Beginner"` in the config and `" beginner "` from the model meet.
pub fn level_key(raw: &str) -> String {
    raw.trim().to_lowercase()
}

impl Default for CurriculumConfig {
    fn default() -> Self {
        Self {
            topics: [
                "AI Evaluations & Benchmarking",
                "Large Language Models",
                "AI Safety & Alignment",
                "Agentic AI & Reasoning",
                "AI Infrastructure & Tooling",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            levels: [
                "foundational",
                "beginner",
                "intermediate",
                "advanced",
                "application",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            unknown_level: UnknownLevelPolicy::default(),
            prerequisite_min_confidence: 0.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: "curriculum.json".to_string(),
        }
    }
}

/// Top-level application configuration (deserialized from config.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub feeds: FeedsConfig,
    pub extraction: ExtractionConfig,
    pub llm: LlmConfig,
    pub curriculum: CurriculumConfig,
    pub output: OutputConfig,
}

impl Config {
    /// Load configuration from a TOML file asynchronously.
    ///
    /// Example:
    ///   let cfg = Config::from_file("config.toml").await?;
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = tokio::fs::read_to_string(path.as_ref())
            .await
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let cfg: Config = toml::from_str(&data).context("Failed to parse TOML configuration")?;
        Ok(cfg)
    }

    /// Load configuration with an optional default file and an optional override file.
    /// If both are present, they are merged (override takes precedence).
    /// Keys missing from both fall back to the built-in defaults.
    pub async fn load_with_defaults(
        default_path: Option<&Path>,
        override_path: Option<&Path>,
    ) -> Result<Self> {
        let mut config_value = toml::Value::Table(toml::map::Map::new());

        for (path, label) in [(default_path, "default"), (override_path, "override")] {
            let Some(path) = path else { continue };
            if !path.exists() {
                continue;
            }
            let data = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read {} config: {}", label, path.display()))?;
            let val: toml::Value = toml::from_str(&data)
                .with_context(|| format!("Failed to parse {} configuration", label))?;
            merge_toml(&mut config_value, val);
        }

        let cfg: Config = config_value
            .try_into()
            .context("Failed to parse merged configuration")?;
        Ok(cfg)
    }

    /// Reject configurations the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.feeds.urls.is_empty() {
            anyhow::bail!("feeds.urls must list at least one feed");
        }
        for raw in &self.feeds.urls {
            let parsed =
                url::Url::parse(raw).with_context(|| format!("feeds.urls: invalid URL '{}'", raw))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                anyhow::bail!("feeds.urls: '{}' is not an http(s) URL", raw);
            }
        }
        if self.feeds.per_feed_limit == 0 {
            anyhow::bail!("feeds.per_feed_limit must be greater than zero");
        }
        if self.extraction.max_content_chars == 0 {
            anyhow::bail!("extraction.max_content_chars must be greater than zero");
        }
        if self.curriculum.topics.iter().all(|t| t.trim().is_empty()) {
            anyhow::bail!("curriculum.topics must not be empty");
        }
        if self.curriculum.levels.is_empty() {
            anyhow::bail!("curriculum.levels must not be empty");
        }
        let keys = self.curriculum.level_keys();
        for (i, key) in keys.iter().enumerate() {
            if key.is_empty() {
                anyhow::bail!("curriculum.levels: blank level name");
            }
            if keys[..i].contains(key) {
                anyhow::bail!(
                    "curriculum.levels: duplicate level '{}'",
                    self.curriculum.levels[i]
                );
            }
        }
        if self.llm.concurrency == 0 {
            anyhow::bail!("llm.concurrency must be at least 1");
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            anyhow::bail!("llm.temperature must be within [0, 2]");
        }
        if !(0.0..=1.0).contains(&self.curriculum.prerequisite_min_confidence) {
            anyhow::bail!("curriculum.prerequisite_min_confidence must be within [0, 1]");
        }
        Ok(())
    }

    /// Resolve the LLM API key from the environment variable named in `llm.api_key_env`.
    pub fn api_key(&self) -> Result<String> {
        let var = &self.llm.api_key_env;
        match std::env::var(var) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            Ok(_) => anyhow::bail!("LLM API key env var '{}' is empty", var),
            Err(_) => anyhow::bail!("LLM API key env var '{}' not set", var),
        }
    }
}

fn merge_toml(a: &mut toml::Value, b: toml::Value) {
    match (a, b) {
        (toml::Value::Table(a_map), toml::Value::Table(b_map)) => {
            for (k, v) in b_map {
                if let Some(a_val) = a_map.get_mut(&k) {
                    merge_toml(a_val, v);
                } else {
                    a_map.insert(k, v);
                }
            }
        }
        (a_val, b_val) => *a_val = b_val,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn empty_toml_yields_defaults() {
        let cfg: Config = toml::from_str("").expect("parse config");
        assert_eq!(cfg.feeds.urls.len(), 3);
        assert_eq!(cfg.feeds.per_feed_limit, 10);
        assert_eq!(cfg.extraction.max_content_chars, 3000);
        assert!(cfg.extraction.min_content_filter);
        assert_eq!(cfg.curriculum.levels.len(), 5);
        assert_eq!(cfg.curriculum.unknown_level, UnknownLevelPolicy::Overflow);
        assert_eq!(cfg.output.path, "curriculum.json");
        cfg.validate().expect("defaults are valid");
    }

    #[test]
    fn shipped_default_file_matches_builtin_defaults() {
        let cfg: Config = toml::from_str(include_str!("../../config.default.toml"))
            .expect("parse config.default.toml");
        let builtin = Config::default();
        assert_eq!(cfg.feeds.urls, builtin.feeds.urls);
        assert_eq!(cfg.curriculum.topics, builtin.curriculum.topics);
        assert_eq!(cfg.curriculum.levels, builtin.curriculum.levels);
        assert_eq!(cfg.llm.api_key_env, builtin.llm.api_key_env);
        cfg.validate().expect("valid");
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let toml = r#"
            [extraction]
            max_content_chars = 8000
            min_content_filter = false

            [curriculum]
            levels = ["1", "2", "3", "4", "5"]
            unknown_level = "reject"
        "#;

        let cfg: Config = toml::from_str(toml).expect("parse config");
        assert_eq!(cfg.extraction.max_content_chars, 8000);
        assert!(!cfg.extraction.min_content_filter);
        assert_eq!(cfg.extraction.min_content_chars, 100);
        assert_eq!(cfg.curriculum.levels[1], "2");
        assert_eq!(cfg.curriculum.unknown_level, UnknownLevelPolicy::Reject);
        assert_eq!(cfg.llm.model, "llama-3.3-70b-versatile");
    }

    #[tokio::test]
    async fn override_file_wins_over_defaults_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let default_path = dir.path().join("config.default.toml");
        let override_path = dir.path().join("config.toml");

        fs::write(
            &default_path,
            "[feeds]\nurls = [\"https://a.example/rss\"]\nper_feed_limit = 5\n\n[llm]\nmodel = \"base\"\n",
        )
        .expect("write default");
        fs::write(&override_path, "[feeds]\nper_feed_limit = 2\n").expect("write override");

        let cfg = Config::load_with_defaults(Some(&default_path), Some(&override_path))
            .await
            .expect("load");

        assert_eq!(cfg.feeds.urls, vec!["https://a.example/rss".to_string()]);
        assert_eq!(cfg.feeds.per_feed_limit, 2);
        assert_eq!(cfg.llm.model, "base");
    }

    #[tokio::test]
    async fn missing_files_are_ignored() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("nope.toml");
        let cfg = Config::load_with_defaults(Some(&missing), None)
            .await
            .expect("load");
        assert_eq!(cfg.llm.api_key_env, "GROQ_API_KEY");
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut cfg = Config::default();
        cfg.feeds.urls = vec!["not a url".to_string()];
        assert!(cfg.validate().is_err());

        let mut cfg = Config::default();
        cfg.feeds.urls = vec!["ftp://example.com/feed".to_string()];
        assert!(cfg.validate().is_err());

        let mut cfg = Config::default();
        cfg.curriculum.levels = vec!["beginner".to_string(), "beginner".to_string()];
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate level"));

        let mut cfg = Config::default();
        cfg.curriculum.levels = vec!["Beginner".to_string(), " beginner".to_string()];
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate level"));

        let mut cfg = Config::default();
        cfg.curriculum.levels = vec!["beginner".to_string(), "  ".to_string()];
        assert!(cfg.validate().is_err());

        let mut cfg = Config::default();
        cfg.llm.concurrency = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn level_keys_are_trimmed_and_lowercased() {
        let mut cfg = CurriculumConfig::default();
        cfg.levels = vec!["Beginner".to_string(), " ADVANCED ".to_string(), "3".to_string()];
        assert_eq!(cfg.level_keys(), vec!["beginner", "advanced", "3"]);
        assert_eq!(level_key("  Intermediate"), "intermediate");
    }

    #[test]
    fn api_key_error_names_the_variable() {
        let mut cfg = Config::default();
        cfg.llm.api_key_env = "TSHELF_TEST_KEY_THAT_IS_NEVER_SET".to_string();
        let err = cfg.api_key().unwrap_err();
        assert!(err.to_string().contains("TSHELF_TEST_KEY_THAT_IS_NEVER_SET"));
    }
}
