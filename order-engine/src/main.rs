use anyhow::Context;
use order_engine::{Config, Server, print_banner, setup_environment};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. 设置环境 (dotenv, 日志)
    let _log_guard = setup_environment();

    print_banner();
    tracing::info!("🛒 Order engine starting...");

    // 2. 加载配置
    let config = Config::from_env().context("failed to load configuration")?;

    // 3. 初始化状态并启动后台 worker
    let server = Server::new(config).context("failed to initialize server")?;

    // 4. 启动 HTTP 服务器
    if let Err(e) = server.run().await {
        tracing::error!("Server error: {}", e);
        return Err(e.into());
    }

    Ok(())
}
