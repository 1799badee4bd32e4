use revu_server::{config::ServerConfig, Result};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = ServerConfig::load()?;
    revu_server::run(args).await
}
