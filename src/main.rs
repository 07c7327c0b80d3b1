use tracing::info;
use tracing_subscriber::EnvFilter;

use workload_optimizer::app_state::AppState;
use workload_optimizer::config::AppConfig;
use workload_optimizer::gateway::Gateway;

#[rocket::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let figment = AppConfig::figment();
    let config = AppConfig::from_figment(&figment)
        .map_err(|e| anyhow::anyhow!("invalid configuration: {}", e))?;
    info!(
        scoring_base_url = config.scoring_base_url.as_str(),
        flops_catalog = ?config.flops_catalog,
        timeout_secs = ?config.request_timeout_secs,
        "Starting workload optimizer"
    );

    let state = AppState::new(config, Gateway::http());
    workload_optimizer::rocket(figment, state)
        .launch()
        .await
        .map_err(|e| anyhow::anyhow!("rocket failed: {}", e))?;

    Ok(())
}
