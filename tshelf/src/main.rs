/*
tshelf - main.rs
Fetches the configured AI publisher feeds, classifies every article with an LLM and
writes the grouped curriculum as a single JSON document.
*/

use clap::Parser;
use common::Config;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use tshelf::curriculum::write_report;
use tshelf::llm::remote::RemoteLlmProvider;
use tshelf::pipeline::Pipeline;

#[derive(Parser, Debug)]
#[command(name = "tshelf", about = "Build a learning curriculum from AI publisher feeds")]
struct Args {
    /// Path to config.toml
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Where to write the curriculum JSON (overrides output.path)
    #[arg(long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Feed URL to process; repeat to list several (replaces feeds.urls)
    #[arg(long = "feed", value_name = "URL")]
    feeds: Vec<String>,

    /// Maximum entries taken from each feed
    #[arg(long)]
    per_feed_limit: Option<usize>,

    /// Keep entries with very short content
    #[arg(long)]
    no_min_length: bool,

    /// Classification calls allowed in flight
    #[arg(long)]
    concurrency: Option<usize>,

    /// Override log level (info, debug, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    // Resolve config paths
    let default_path = PathBuf::from("config.default.toml");
    let override_path = match &args.config {
        Some(p) if !p.exists() => {
            error!(path = ?p, "specified config file not found");
            anyhow::bail!("Config file not found: {}", p.display());
        }
        Some(p) => Some(p.clone()),
        None => Some(PathBuf::from("config.toml")).filter(|p| p.exists()),
    };

    let mut config = Config::load_with_defaults(
        Some(default_path.as_path()).filter(|p| p.exists()),
        override_path.as_deref(),
    )
    .await?;
    info!(default_file = ?default_path, override_file = ?override_path, "configuration loaded");

    apply_cli_overrides(&mut config, &args);
    config.validate()?;

    // Credential check happens before any network activity
    let api_key = config.api_key()?;
    let provider = RemoteLlmProvider::new(&config.llm.api_url, api_key, &config.llm.model)
        .with_defaults(
            config.llm.timeout_seconds,
            config.llm.max_tokens,
            config.llm.temperature,
        );
    info!("LLM provider initialized: {}", provider.model());

    let output_path = PathBuf::from(&config.output.path);
    let pipeline = Pipeline::new(config, Arc::new(provider))?;
    let (report, _stats) = pipeline.run().await;

    write_report(&report, &output_path).await?;
    info!(
        "curriculum with {} articles saved to {}",
        report.total_articles,
        output_path.display()
    );

    print_summary(&report.topic_counts(), &output_path);
    Ok(())
}

fn apply_cli_overrides(config: &mut Config, args: &Args) {
    if !args.feeds.is_empty() {
        config.feeds.urls = args.feeds.clone();
    }
    if let Some(limit) = args.per_feed_limit {
        config.feeds.per_feed_limit = limit;
    }
    if args.no_min_length {
        config.extraction.min_content_filter = false;
    }
    if let Some(concurrency) = args.concurrency {
        config.llm.concurrency = concurrency;
    }
    if let Some(output) = &args.output {
        config.output.path = output.to_string_lossy().to_string();
    }
}

fn print_summary(topic_counts: &[(&str, usize)], output_path: &Path) {
    println!("\nCurriculum saved to {}", output_path.display());
    println!("\nTopics discovered:");
    for (topic, count) in topic_counts {
        println!("  • {}: {} articles", topic, count);
    }
}
