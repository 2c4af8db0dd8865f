use ledger_server::{Config, Server, ServerState, setup_environment};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Environment (dotenv, working directory, logging)
    setup_environment()?;

    tracing::info!("Ledger server starting...");

    // 2. Configuration
    let config = Config::from_env();

    // 3. State (store backend, repositories, ledgers)
    let state = ServerState::initialize(&config).await?;

    // 4. HTTP server (spawns the background tasks)
    let server = Server::with_state(config, state);

    if let Err(e) = server.run().await {
        tracing::error!("Server error: {}", e);
        return Err(e.into());
    }

    Ok(())
}
