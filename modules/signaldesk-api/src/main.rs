use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use ai_client::Claude;
use signaldesk_api::{app, AppState};
use signaldesk_common::{Config, SelectionConfig};
use signaldesk_select::scoring::ClaudeScorer;
use signaldesk_select::store::PgStore;
use signaldesk_select::traits::RelevanceScorer;
use signaldesk_select::ArticleSelector;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("signaldesk=info".parse()?))
        .init();

    let config = Config::from_env()?;
    config.log_redacted();
    let selection_config = SelectionConfig::from_env()?;

    let store = Arc::new(PgStore::connect(&config.database_url, 16).await?);
    store.migrate().await?;

    let scorer: Option<Arc<dyn RelevanceScorer>> = if config.has_scorer() {
        let claude = Claude::new(&config.anthropic_api_key, &config.scorer_model)
            .with_timeout(Duration::from_secs(selection_config.scoring_batch_timeout_secs));
        Some(Arc::new(ClaudeScorer::new(claude)))
    } else {
        warn!("ANTHROPIC_API_KEY not set, every selection will use embedding scores");
        None
    };

    let selector = ArticleSelector::builder()
        .embeddings(store.clone())
        .articles(store.clone())
        .profiles(store.clone())
        .connections(store)
        .scorer(scorer)
        .config(selection_config)
        .build();

    let addr = format!("{}:{}", config.web_host, config.web_port);
    info!("SignalDesk API starting on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app(Arc::new(AppState { selector }))).await?;

    Ok(())
}
