//! `tabletop`: terminal client for one campaign.
//!
//! Configuration comes from the environment (and `.env`); see
//! [`ClientConfig::from_env`]. Type commands in the keyword form
//! (`grapple by: fighter to: goblin`), `:state` for a summary, `:verify` to
//! check the log, `:quit` to leave.

use anyhow::Result;
use client_bootstrap::{ClientConfig, SessionBootstrap};
use runtime::SessionWorker;
use tabletop_client::{logging, repl};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let config = ClientConfig::from_env();
    let _guard = logging::init(&config.campaign_log_dir())?;
    tracing::info!(
        world = %config.world,
        campaign = %config.campaign,
        worlds_dir = %config.worlds_dir.display(),
        "starting tabletop client"
    );

    let session = SessionBootstrap::new(config.clone()).build()?;
    println!(
        "{}/{}: {} events replayed. Type 'help' for commands, {} to leave.",
        config.world,
        config.campaign,
        session.event_count(),
        repl::QUIT
    );

    let (handle, worker) = SessionWorker::spawn(session, config.queue_depth);
    let lines = repl::spawn_reader(std::io::BufReader::new(std::io::stdin()), config.queue_depth);
    let result = repl::run(&handle, lines, &mut std::io::stdout()).await;

    if let Err(err) = handle.shutdown().await {
        tracing::warn!(%err, "session worker was already stopped");
    }
    worker.await?;
    tracing::info!("tabletop client stopped");
    result
}
