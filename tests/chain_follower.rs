use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use silod::{
    chain_client::types::BlockSummary,
    chain_follower,
    types::BlockHeight,
    utils::{MockChain, new_mock_hash},
};

fn new_block(height: BlockHeight) -> BlockSummary {
    BlockSummary {
        height,
        id: new_mock_hash(height as u32),
        confirmed_proofs: vec![],
    }
}

#[tokio::test]
async fn test_streams_blocks_in_order() {
    let chain = MockChain::new();
    for height in 100..=105 {
        chain.add_block(new_block(height));
    }

    let cancel_token = CancellationToken::new();
    let (tx, mut rx) = mpsc::channel(64);
    let handle = chain_follower::run(
        chain.clone(),
        100,
        Duration::from_millis(10),
        cancel_token.clone(),
        tx,
    );

    for expected in 100..=105 {
        let block = rx.recv().await.unwrap();
        assert_eq!(block.height, expected);
    }

    // Tip advances while the follower is polling.
    chain.add_block(new_block(106));
    let block = rx.recv().await.unwrap();
    assert_eq!(block.height, 106);

    cancel_token.cancel();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_starts_at_requested_height() {
    let chain = MockChain::new();
    for height in 100..=110 {
        chain.add_block(new_block(height));
    }

    let cancel_token = CancellationToken::new();
    let (tx, mut rx) = mpsc::channel(64);
    let handle = chain_follower::run(
        chain.clone(),
        108,
        Duration::from_millis(10),
        cancel_token.clone(),
        tx,
    );

    assert_eq!(rx.recv().await.unwrap().height, 108);
    assert_eq!(rx.recv().await.unwrap().height, 109);
    assert_eq!(rx.recv().await.unwrap().height, 110);

    cancel_token.cancel();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_exits_when_receiver_drops() {
    let chain = MockChain::new();
    chain.add_block(new_block(100));
    chain.add_block(new_block(101));

    let cancel_token = CancellationToken::new();
    let (tx, mut rx) = mpsc::channel(1);
    let handle = chain_follower::run(
        chain.clone(),
        100,
        Duration::from_millis(10),
        cancel_token,
        tx,
    );

    assert_eq!(rx.recv().await.unwrap().height, 100);
    drop(rx);
    // The next delivery attempt notices the closed channel and exits.
    chain.add_block(new_block(102));
    handle.await.unwrap();
}
