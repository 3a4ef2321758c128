use deepquant_agent::{
    agent::DeepQuantAgent, api::start_server, catalog::AgentCatalog, config::Settings,
    logging::init_tracing,
};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenv::dotenv().ok();

    let settings = Settings::from_env();
    init_tracing(&settings.log_level);

    info!("DeepQuant Agent - API Server");
    info!("Port: {}", settings.port);
    if settings.use_sample_data {
        info!("USE_SAMPLE_DATA=1, live market data disabled");
    }

    let agent = Arc::new(DeepQuantAgent::from_settings(&settings).await?);
    let catalog = Arc::new(AgentCatalog::builtin());

    for descriptor in catalog.list() {
        info!(
            slug = %descriptor.slug,
            mount = %descriptor.mount_path(),
            "{}",
            descriptor.description
        );
    }

    start_server(agent, catalog, settings.port).await?;

    Ok(())
}
