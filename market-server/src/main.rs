use market_server::{Server, ServerState, print_banner, setup_environment};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. dotenv, work dir, logging
    let config = setup_environment()?;

    print_banner();
    tracing::info!(
        port = config.http_port,
        environment = %config.environment,
        "TitanMart market server starting..."
    );

    // 2. Store, gateway and services
    let state = ServerState::initialize(&config)?;

    // 3. Serve until ctrl-c
    let server = Server::with_state(config, state);
    if let Err(e) = server.run().await {
        tracing::error!("Server error: {}", e);
        return Err(e.into());
    }

    Ok(())
}
