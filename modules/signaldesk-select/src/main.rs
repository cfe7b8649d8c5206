use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use ai_client::Claude;
use signaldesk_common::{Config, SelectionConfig, SignalStrength};
use signaldesk_select::scoring::ClaudeScorer;
use signaldesk_select::store::PgStore;
use signaldesk_select::traits::RelevanceScorer;
use signaldesk_select::{ArticleSelector, SelectionRequest};

#[derive(Parser)]
#[command(name = "select", about = "Run one article selection and print it as JSON")]
struct Cli {
    /// Organization to select articles for
    #[arg(long)]
    org: Uuid,

    /// Lookback in hours (defaults to SELECT_DEFAULT_HOURS_BACK)
    #[arg(long, conflicts_with = "today")]
    hours_back: Option<i64>,

    /// Look back to the most recent UTC midnight
    #[arg(long)]
    today: bool,

    /// Minimum signal strength: weak, moderate or strong
    #[arg(long)]
    min_strength: Option<SignalStrength>,

    /// Max embedding matches fetched per target
    #[arg(long)]
    max_per_target: Option<usize>,

    /// Skip the cross-target connection query
    #[arg(long)]
    no_connections: bool,

    /// Use embedding-derived scores instead of calling the scorer
    #[arg(long)]
    skip_scoring: bool,

    /// Overall deadline in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Apply migrations before selecting
    #[arg(long)]
    migrate: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("signaldesk=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = Config::from_env()?;
    config.log_redacted();
    let selection_config = SelectionConfig::from_env()?;

    let store = Arc::new(PgStore::connect(&config.database_url, 8).await?);
    if cli.migrate {
        store.migrate().await?;
        info!("Migrations complete");
    }

    let scorer: Option<Arc<dyn RelevanceScorer>> = if config.has_scorer() {
        let claude = Claude::new(&config.anthropic_api_key, &config.scorer_model)
            .with_timeout(Duration::from_secs(selection_config.scoring_batch_timeout_secs));
        Some(Arc::new(ClaudeScorer::new(claude)))
    } else {
        if !cli.skip_scoring {
            warn!("ANTHROPIC_API_KEY not set, falling back to embedding scores");
        }
        None
    };

    let selector = ArticleSelector::builder()
        .embeddings(store.clone())
        .articles(store.clone())
        .profiles(store.clone())
        .connections(store.clone())
        .scorer(scorer)
        .config(selection_config)
        .build();

    let request = SelectionRequest {
        hours_back: cli.hours_back,
        use_today_boundary: cli.today,
        min_signal_strength: cli.min_strength,
        max_articles_per_target: cli.max_per_target,
        include_connections: !cli.no_connections,
        skip_scoring: cli.skip_scoring,
        timeout_secs: cli.timeout_secs,
        ..SelectionRequest::for_organization(cli.org)
    };

    let result = selector.select(&request).await?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
