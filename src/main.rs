use anyhow::Result;
use api_gateway::config::Settings;
use api_gateway::domain::config_types::LogFormat;
use api_gateway::infrastructure::log_messages::application as messages;
use api_gateway::Application;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::new()?;
    init_tracing(&settings);

    info!(
        environment = %settings.application.environment,
        "{}",
        messages::STARTING
    );
    if let Some(raw) = &settings.application.ignored_port {
        warn!(
            port = %raw,
            using = %settings.application.port,
            "{}",
            messages::INVALID_PORT
        );
    }

    let app = Application::from_settings(settings)?;
    app.run().await?;

    Ok(())
}

fn init_tracing(settings: &Settings) {
    // RUST_LOG wins over the configured level
    let filter = EnvFilter::builder()
        .with_default_directive(settings.logging.level.filter().into())
        .from_env_lossy();

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match settings.logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Compact => builder.compact().init(),
    }
}
