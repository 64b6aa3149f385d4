//! Scripted battle driver.
mod scenario;

use anyhow::Result;
use battle_runtime::RuntimeConfig;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let _guard = setup_logging()?;

    let config = RuntimeConfig::from_env();
    let turns = std::env::var("BATTLE_TURNS")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(5);

    let summary = scenario::run(config, turns).await?;
    println!("{summary}");
    Ok(())
}

/// Setup logging to stderr, plus a log file when `BATTLE_LOG_DIR` is set.
fn setup_logging() -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::INFO.into());

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let (file_layer, guard) = match std::env::var_os("BATTLE_LOG_DIR") {
        Some(dir) => {
            std::fs::create_dir_all(&dir)?;
            let appender = tracing_appender::rolling::never(&dir, "battle.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    Ok(guard)
}
