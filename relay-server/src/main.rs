use anyhow::{Context, Result};
use relay_server::{RelayConfig, RelayServer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("relay_server=debug".parse()?))
        .init();

    info!("广播中继启动中...");

    let config = RelayConfig::from_env()?;
    let server = RelayServer::bind(&config.addr)
        .await
        .with_context(|| format!("无法监听 {}", config.addr))?;

    server.run().await?;
    Ok(())
}
