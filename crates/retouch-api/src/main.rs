use retouch_core::Config;

// mimalloc keeps fragmentation low with many short-lived image buffers.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let config = Config::from_env()?;

    let (_state, router) = retouch_api::setup::initialize_app(config.clone()).await?;

    retouch_api::setup::server::start_server(&config, router).await?;

    Ok(())
}
