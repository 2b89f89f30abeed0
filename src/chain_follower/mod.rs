use std::time::Duration;

use tokio::{select, sync::mpsc::Sender, task::JoinHandle, time::sleep};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
    chain_client::{ChainRpc, types::BlockSummary},
    retry::{new_backoff_limited, new_backoff_unlimited, retry},
    types::BlockHeight,
};

/// Streams canonical blocks from `start_height`, strictly in height order
/// with no gaps, polling the chain tip between batches. Starting from the
/// persisted chain state makes missed heights catch up after a restart.
pub fn run<C: ChainRpc>(
    chain: C,
    start_height: BlockHeight,
    poll_interval: Duration,
    cancel_token: CancellationToken,
    tx: Sender<BlockSummary>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut next_height = start_height;
        loop {
            if cancel_token.is_cancelled() {
                info!("Cancelled");
                break;
            }

            let info = match retry(
                || chain.get_chain_info(),
                "get chain info",
                new_backoff_unlimited(),
                cancel_token.clone(),
            )
            .await
            {
                Ok(info) => info,
                Err(e) => {
                    warn!("Giving up on chain info: {}", e);
                    break;
                }
            };

            while next_height <= info.height && !cancel_token.is_cancelled() {
                match retry(
                    || chain.get_block(next_height),
                    "get block",
                    new_backoff_limited(),
                    cancel_token.clone(),
                )
                .await
                {
                    Ok(block) => {
                        if tx.send(block).await.is_err() {
                            info!("Send channel closed, exiting");
                            return;
                        }
                        next_height += 1;
                    }
                    Err(e) => {
                        warn!("Failed to fetch block at height {}: {}", next_height, e);
                        break;
                    }
                }
            }

            select! {
                _ = cancel_token.cancelled() => {
                    info!("Cancelled");
                    break;
                }
                _ = sleep(poll_interval) => {}
            }
        }
        info!("Exited");
    })
}
