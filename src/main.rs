use anyhow::Context;
use mailing_list::configuration::get_configuration;
use mailing_list::startup::Application;
use mailing_list::telemetry::get_subscriber;
use mailing_list::telemetry::init_subscriber;

/// Initialise telemetry, load config, and start the server.
///
/// Missing store credentials are fatal here, before anything is served.
#[tokio::main] // requires tokio features: macros, rt-multi-thread
async fn main() -> Result<(), anyhow::Error> {
    let subscriber = get_subscriber("mailing-list", "info", std::io::stdout);
    init_subscriber(subscriber)?;

    let cfg = get_configuration().context("failed to load configuration")?;

    let app = Application::build(cfg).await?;
    tracing::info!(port = app.port(), "serving");
    app.run_until_stopped().await?;
    tracing::info!("API exited gracefully");

    Ok(())
}
