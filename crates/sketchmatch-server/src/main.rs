mod client;
mod config;
mod game;
mod hub;
mod state;

use anyhow::Context;
use config::Config;
use state::ServerState;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().init();

    tracing::info!("Server Version: {}", sketchmatch_lib::VERSION);

    let config = Config::from_env();
    let listener = TcpListener::bind(config.addr())
        .await
        .with_context(|| format!("Unable to listen on {}", config.addr()))?;
    tracing::info!("Listening on {}", config.addr());

    let state = ServerState::new(hub::start_hub());
    loop {
        let (socket, addr) = match listener.accept().await {
            Ok(x) => x,
            Err(e) => {
                tracing::error!("Failed to accept connection: {e}");
                continue;
            }
        };
        tracing::debug!("Accepted connection from {addr}");

        tokio::spawn(client::handle_new_connection(state.clone(), socket));
    }
}
