use std::{sync::Arc, time::Duration};

use anyhow::Result;
use clap::Parser;
use silod::{
    chain_client, chain_follower,
    config::Config,
    controller::Controller,
    database, host, logging,
    stopper,
    storage::StorageBackend,
    store::ObligationStore,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    logging::setup();
    info!("silod starting");
    let config = Config::parse();
    let chain = chain_client::Client::new_from_config(&config)?;
    match chain.get_chain_info().await {
        Ok(info) => info!(
            "Chain tip at height {}, payouts mature after {} confirmations",
            info.height, info.maturity_delay
        ),
        Err(e) => warn!("Chain info unavailable at startup: {}", e),
    }
    let cancel_token = CancellationToken::new();
    let stopper_handle = stopper::run(cancel_token.clone());

    let db_path = config.database_dir.join("silod.db");
    let reader = database::Reader::new(&db_path).await?;
    let writer = database::Writer::new(&db_path).await?;

    let backend = Arc::new(StorageBackend::new(&config.data_dir, config.storage_capacity)?);
    let store = Arc::new(ObligationStore::new());

    // The host owns the formation and retrieval entry points; the network
    // layer attaches to it. Here it restores persisted obligations.
    let host = host::Host::new(store.clone(), backend.clone(), writer.clone());
    let restored = host.load(&reader).await?;
    info!("Restored {} obligations", restored);

    let start_height = match reader.get_chain_state().await? {
        Some((height, _)) => height + 1,
        None => config.starting_block_height,
    };
    let (tx, rx) = mpsc::channel(64);
    let follower_handle = chain_follower::run(
        chain.clone(),
        start_height,
        Duration::from_secs(config.poll_interval_secs),
        cancel_token.clone(),
        tx,
    );
    let controller = Controller::new(
        store,
        backend,
        chain,
        writer,
        config.proof_interval,
        config.prune_forfeited,
    );
    let controller_handle = controller.run(cancel_token.clone(), rx);

    let _ = controller_handle.await;
    let _ = follower_handle.await;
    let _ = stopper_handle.await;
    info!("Goodbye.");
    Ok(())
}
