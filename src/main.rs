use chrono::Local;
use sitrep::{info_time, process::process_site, serve::serve, Config, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sitrep=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let start_time = Local::now();
    let config = Config::from_env()?;
    let dashboard = process_site(&config).await?;
    info_time!(start_time, "Full startup time:");

    serve(config.bind, &dashboard).await
}
