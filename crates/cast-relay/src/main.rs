use cast_proto::config::Config;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load()?;

    // Log to a file under the state dir; the terminal belongs to the clients.
    let log_dir = config.paths.state_dir.clone();
    std::fs::create_dir_all(&log_dir)?;
    let log_path = log_dir.join("relay.log");
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_ansi(false)
        .init();

    info!("log file: {:?}", log_path);
    info!("config loaded from: {:?}", Config::config_path());

    let listener = cast_relay::socket::bind(&config.relay_address()).await?;
    cast_relay::socket::run(listener).await;

    Ok(())
}
