use common::Config;
use tshelf::extraction::{extract_article, select_content};
use tshelf::ingestion::{build_client, fetch_feed};

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
    let client = build_client(&config.feeds)?;

    for url in &config.feeds.urls {
        println!("\n{}", "=".repeat(60));
        println!("Testing: {}", url);
        println!("{}", "=".repeat(60));

        match fetch_feed(&client, url, config.feeds.per_feed_limit).await {
            Ok(feed) => {
                println!("✓ Success!");
                println!("  Source: {}", feed.source);
                println!("  Entries (first {}): {}", config.feeds.per_feed_limit, feed.entries.len());

                for (i, raw) in feed.entries.iter().enumerate() {
                    println!("\n    {}. {}", i + 1, raw.title.as_deref().unwrap_or("<no title>"));
                    println!("       URL: {}", raw.link.as_deref().unwrap_or("none"));
                    println!("       Raw content: {} chars", select_content(raw).chars().count());
                    match extract_article(raw, &feed.source, &config.extraction) {
                        Ok(article) => println!(
                            "       Would classify ({} chars after normalization)",
                            article.content.chars().count()
                        ),
                        Err(rejection) => println!("       Dropped: {:?}", rejection),
                    }
                }
            }
            Err(e) => {
                println!("✗ Failed: {:#}", e);
            }
        }
    }

    Ok(())
}
