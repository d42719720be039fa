// Classifier module
use common::{CurriculumConfig, LlmConfig};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::extraction::Article;
use crate::llm::{preview, sanitize, LlmProvider, LlmRequest};

pub mod parse;
pub mod prompt;

pub use parse::{normalize_level, validate_classification};

/// Characters of raw model output kept in diagnostics
const RESPONSE_PREVIEW_CHARS: usize = 500;

/// A named concept with the model's confidence in [0, 1]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConceptScore {
    pub name: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Difficulty {
    /// Bucket key: one of the configured levels unless the model went off-script
    pub level: String,
    pub technical_depth: Option<u8>,
    pub reading_time_minutes: Option<f64>,
}

/// Curriculum placement of one article
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub topic: String,
    pub concepts_taught: Vec<ConceptScore>,
    pub prerequisites: Vec<ConceptScore>,
    pub difficulty: Difficulty,
    pub learning_outcomes: Vec<String>,
    pub strategic_questions: Vec<String>,
}

/// Result of classifying one article. Only `Classified` reaches the report.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassificationOutcome {
    Classified(Classification),
    /// The model asked for the article to be left out
    Skip,
    /// The response could not be decoded or had the wrong shape
    Malformed { reason: String, preview: String },
    /// The provider call itself failed
    Failed { error: String },
}

impl ClassificationOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            ClassificationOutcome::Classified(_) => "classified",
            ClassificationOutcome::Skip => "skip",
            ClassificationOutcome::Malformed { .. } => "malformed",
            ClassificationOutcome::Failed { .. } => "failed",
        }
    }
}

/// Interpret raw model text: strip fences, decode, validate.
pub fn interpret_response(text: &str, taxonomy: &CurriculumConfig) -> ClassificationOutcome {
    let value = match sanitize::parse_response(text) {
        Ok(value) => value,
        Err(e) => {
            return ClassificationOutcome::Malformed {
                reason: format!("JSON parse error: {}", e),
                preview: preview(text, RESPONSE_PREVIEW_CHARS),
            }
        }
    };

    match validate_classification(&value, taxonomy) {
        Ok(Some(classification)) => ClassificationOutcome::Classified(classification),
        Ok(None) => ClassificationOutcome::Skip,
        Err(reason) => ClassificationOutcome::Malformed {
            reason: format!("invalid response structure: {}", reason),
            preview: preview(text, RESPONSE_PREVIEW_CHARS),
        },
    }
}

/// Sends articles to an LLM provider and interprets the answers
pub struct Classifier {
    provider: Arc<dyn LlmProvider>,
    taxonomy: CurriculumConfig,
    max_tokens: usize,
    temperature: f32,
    timeout_seconds: u64,
}

impl Classifier {
    pub fn new(provider: Arc<dyn LlmProvider>, taxonomy: CurriculumConfig, llm: &LlmConfig) -> Self {
        Self {
            provider,
            taxonomy,
            max_tokens: llm.max_tokens,
            temperature: llm.temperature,
            timeout_seconds: llm.timeout_seconds,
        }
    }

    pub fn taxonomy(&self) -> &CurriculumConfig {
        &self.taxonomy
    }

    /// Classify one article. Never fails: provider and decode errors are
    /// logged and returned as `Failed` / `Malformed`.
    pub async fn classify(&self, article: &Article) -> ClassificationOutcome {
        let request = LlmRequest {
            prompt: prompt::classification_prompt(&self.taxonomy, &article.title, &article.content),
            max_tokens: Some(self.max_tokens),
            temperature: Some(self.temperature),
            timeout_seconds: Some(self.timeout_seconds),
        };

        let response = match self.provider.generate(request).await {
            Ok(response) => response,
            Err(e) => {
                let error = preview(&format!("{:#}", e), 300);
                error!("classification request failed for '{}': {}", article.title, error);
                return ClassificationOutcome::Failed { error };
            }
        };
        debug!(
            "classification response for '{}': {} tokens from {}",
            article.title, response.usage.total_tokens, response.model
        );

        let outcome = interpret_response(&response.content, &self.taxonomy);
        if let ClassificationOutcome::Malformed { reason, preview } = &outcome {
            error!("{} for '{}'", reason, article.title);
            warn!("raw response: {}", preview);
        }
        outcome
    }
}
