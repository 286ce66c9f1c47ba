use clap::Parser;
use triage_flow::app::{self, http};
use triage_flow::utils::{logger, validation::Validate};
use triage_flow::CliConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 讀取 .env (若存在)
    dotenvy::dotenv().ok();

    let cli = CliConfig::parse();

    let config = match cli.resolve() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    // 初始化日誌
    if config.logging.json {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting TriageFlow API v{}", env!("CARGO_PKG_VERSION"));
    if cli.verbose {
        tracing::debug!("Resolved config: {:?}", config);
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        eprintln!("❌ {}", e);
        std::process::exit(1);
    }

    let state = app::build_app_state(&config)?;
    let service = state.service();
    let router = http::router(state);

    let addr = config.bind_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("🚀 Listening on http://{}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // 等待尚未送出的派車通知
    if let Some(service) = service {
        service.drain().await;
    }

    tracing::info!("👋 TriageFlow API stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install Ctrl+C handler: {}", e);
        return;
    }
    tracing::info!("🛑 Shutdown signal received");
}
