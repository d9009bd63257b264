#[macro_use]
extern crate tracing;

#[macro_use]
extern crate eyre;

mod core;

use chatterbox_server::{AppState, Server};
use chatterbox_sqlite::Database;
use eyre::{Result, WrapErr};
use tokio::{runtime::Builder as RuntimeBuilder, signal};

use crate::core::{logging, Config};

fn main() {
    let runtime = RuntimeBuilder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Could not build runtime");

    // A .env file is optional, variables may come from the environment itself.
    let _ = dotenvy::dotenv();

    let _log_worker_guard = logging::init();

    if let Err(source) = runtime.block_on(async_main()) {
        error!(?source, "Critical error in main");
    }
}

async fn async_main() -> Result<()> {
    Config::init().context("failed to initialize config")?;

    let config = Config::get();

    let db = Database::new(&config.database_url)
        .await
        .context("failed to connect to database")?;

    let state = AppState::new(db).context("failed to create app state")?;

    let (server, shutdown_tx) = Server::new(state);
    let mut server_handle = tokio::spawn(server.run(config.server_port));

    tokio::select! {
        res = &mut server_handle => res.context("server task panicked")??,
        res = signal::ctrl_c() => {
            res.context("failed to await Ctrl+C")?;
            info!("Received Ctrl+C, shutting down...");

            let _ = shutdown_tx.send(());
            server_handle.await.context("server task panicked")??;
        }
    }

    Ok(())
}
