#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use std::sync::Arc;

use gossip_server::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Arc::new(Config::load());
    simple_logger::init_with_level(log::Level::Info)?;

    if config.jmx {
        log::warn!("--jmx was specified but this build exposes no JMX facade; ignoring");
    }

    gossip_server::startup(config).await
}
