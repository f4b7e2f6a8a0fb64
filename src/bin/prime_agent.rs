use std::error::Error;
use std::sync::Arc;

use prime_agent::{AgentConfig, Config, GoogleModel, run_server};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "prime_agent=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let model = GoogleModel::new(config.google_model_config())?;
    info!(model = %model.model_name(), "using gemini model");

    let agent = prime_agent::agent::prime_agent(
        Arc::new(model),
        AgentConfig {
            max_iterations: config.max_iterations,
        },
    )?;

    run_server(&config, agent).await?;
    Ok(())
}
