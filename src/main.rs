use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use roomsieve::classifier::http::ChatClassifier;
use roomsieve::config::{self, Config};
use roomsieve::entities::RawPost;
use roomsieve::pipeline::{Pipeline, PipelineSettings};
use roomsieve::rejected::RejectedUrlCache;
use roomsieve::store::http::HttpListingStore;
use roomsieve::zones::ZoneMap;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load configuration and the selected city's tables
    let config = Config::from_env()?;
    let city = config::cities::city_config(config.city())
        .with_context(|| format!("unknown city '{}'", config.city()))?;

    // Raw posts come pre-extracted from the feed sweep as a JSON file
    let posts_path = std::env::args()
        .nth(1)
        .context("usage: roomsieve <posts.json>")?;
    let raw = std::fs::read_to_string(&posts_path)
        .with_context(|| format!("cannot read {posts_path}"))?;
    let posts: Vec<RawPost> =
        serde_json::from_str(&raw).with_context(|| format!("cannot parse {posts_path}"))?;

    info!(
        city = %city.display_name,
        posts = posts.len(),
        feeds = city.rss_urls().len(),
        "starting run"
    );

    let store = HttpListingStore::new(
        config.store_base_url(),
        config.store_api_key(),
        &city.database_id,
    );
    let classifier = ChatClassifier::new(
        config.classifier_base_url(),
        config.classifier_api_key(),
        config.classifier_model(),
    );

    let mut pipeline = Pipeline::new(
        Arc::new(store),
        Arc::new(classifier),
        ZoneMap::from_table(&city.zone_table),
        RejectedUrlCache::new(&city.cache_file),
        PipelineSettings::from_config(&config),
    );

    let summary = pipeline.run(posts).await?;
    info!(?summary, "run complete");
    Ok(())
}
