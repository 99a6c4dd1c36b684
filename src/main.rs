use parrot::{config::Config, echo::EchoApp, Server};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    // Operational logs go to stderr; stdout carries only request log blocks.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    info!(
        host = %config.host,
        port = config.port,
        workers = config.workers,
        "starting listener"
    );

    Server::builder()
        .max_threads(config.workers)
        .try_bind(config.listen_addr())?
        .serve(EchoApp)?;

    Ok(())
}
