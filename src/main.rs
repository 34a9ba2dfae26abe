use searxng_mcp::config::AppConfig;
use searxng_mcp::logger::Logger;
use searxng_mcp::mcp::McpServer;
use searxng_mcp::tools::searxng_registry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 日志尚未就绪时的错误只能写到 stderr
    let logger = match Logger::init().await {
        Ok(logger) => logger,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    let registry = match AppConfig::from_env().and_then(|cfg| searxng_registry(&cfg)) {
        Ok(registry) => registry,
        Err(e) => {
            logger.error(&e);
            // exit 不会运行析构，先释放 logger 以刷新缓冲
            drop(logger);
            std::process::exit(1);
        }
    };

    let server = McpServer::new(registry, logger.clone());
    logger.info("SearXNG MCP server running");
    server.run_stdio().await?;
    Ok(())
}
