use anyhow::{anyhow, Result};
use clap::Parser;
use giginsights::{InsightsConfig, InsightsService, JsonFileCorpus, OpenAIClient, SessionStore};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

mod routes;

#[derive(Parser)]
#[command(name = "giginsights-server")]
#[command(about = "Complaint analytics and policy chat over HTTP", long_about = None)]
struct Cli {
    /// JSON config file; defaults are used when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    #[arg(long, env = "PORT", default_value_t = 3000)]
    port: u16,
}

fn load_config(path: Option<&PathBuf>) -> Result<InsightsConfig> {
    let mut config = match path {
        Some(path) => InsightsConfig::from_file(path).map_err(|e| anyhow!(e))?,
        None => InsightsConfig::default(),
    };
    config.apply_env_overrides();
    config.validate().map_err(|e| anyhow!("Invalid configuration: {}", e))?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;

    if config.llm.api_key.trim().is_empty() {
        tracing::warn!("OPENAI_API_KEY is not set, every completion will fall back");
    }
    tracing::info!(
        complaints = %config.corpus.complaints_path.display(),
        policies = %config.corpus.policies_path.display(),
        model = %config.llm.model,
        "Configuration loaded"
    );

    let corpus = Arc::new(JsonFileCorpus::from_config(&config.corpus));
    let client = Arc::new(OpenAIClient::new(&config.llm)?);
    let sweep_every = Duration::from_secs(config.sessions.sweep_interval_secs);
    let service = Arc::new(InsightsService::new(config, corpus, client));

    let sweeper = SessionStore::spawn_sweeper(service.sessions().clone(), sweep_every);

    let app = routes::router(routes::AppState { service });

    let addr = format!("{}:{}", cli.host, cli.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server running on http://{}", addr);

    let result = axum::serve(listener, app).await;
    sweeper.abort();
    result?;

    Ok(())
}
