use common::Config;
use std::sync::Arc;
use tshelf::classifier::{ClassificationOutcome, Classifier};
use tshelf::extraction::Article;
use tshelf::llm::remote::RemoteLlmProvider;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    // Optional config path as the only argument
    let config = match std::env::args().nth(1) {
        Some(path) => Config::from_file(path).await?,
        None => Config::default(),
    };
    let api_key = config.api_key()?;

    println!("\n{}", "=".repeat(60));
    println!("Testing classifier");
    println!("API URL: {}", config.llm.api_url);
    println!("Model: {}", config.llm.model);
    println!("{}", "=".repeat(60));

    let provider = RemoteLlmProvider::new(&config.llm.api_url, api_key, &config.llm.model)
        .with_defaults(
            config.llm.timeout_seconds,
            config.llm.max_tokens,
            config.llm.temperature,
        );
    let classifier = Classifier::new(Arc::new(provider), config.curriculum.clone(), &config.llm);

    let samples = [
        Article {
            title: "How we evaluate tool-using agents".to_string(),
            url: "https://example.com/agent-evals".to_string(),
            published: String::new(),
            source: "Sample".to_string(),
            content: "Agent benchmarks measure whether a model can plan, call tools and recover \
                      from errors over many steps. We describe a harness that replays recorded \
                      environments, scores partial progress and separates capability failures \
                      from infrastructure noise."
                .to_string(),
        },
        Article {
            title: "We're hiring: Senior Recruiter".to_string(),
            url: "https://example.com/jobs".to_string(),
            published: String::new(),
            source: "Sample".to_string(),
            content: "Join our talent team and help us grow. Apply today.".to_string(),
        },
    ];

    for (i, article) in samples.iter().enumerate() {
        println!("\n[Test {}] {}", i + 1, article.title);
        match classifier.classify(article).await {
            ClassificationOutcome::Classified(c) => {
                println!("✓ {} - {}", c.topic, c.difficulty.level);
                for concept in &c.concepts_taught {
                    println!("    concept: {} ({:.2})", concept.name, concept.confidence);
                }
                for outcome in &c.learning_outcomes {
                    println!("    outcome: {}", outcome);
                }
            }
            ClassificationOutcome::Skip => println!("⏭ skipped"),
            ClassificationOutcome::Malformed { reason, preview } => {
                println!("✗ {}", reason);
                println!("  {}", preview);
            }
            ClassificationOutcome::Failed { error } => println!("✗ Failed: {}", error),
        }
    }

    println!("\n{}", "=".repeat(60));
    println!("Tests completed");
    println!("{}", "=".repeat(60));
    Ok(())
}
