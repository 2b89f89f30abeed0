use std::path::PathBuf;

use silod::{
    types::{ContractObligation, Status},
    utils::{new_mock_hash, new_test_contract, new_test_db},
};

fn new_obligation(seed: u8) -> ContractObligation {
    let data = vec![seed; 200];
    let contract = new_test_contract(&data, 100, 300);
    ContractObligation {
        id: contract.id(),
        proof_height: contract.start_height,
        status: Status::Pending,
        contract,
        path: PathBuf::from(format!("/data/{}.dat", seed)),
    }
}

#[tokio::test]
async fn test_obligation_round_trip() {
    let (reader, writer, _temp_dir) = new_test_db().await.unwrap();
    let obligation = new_obligation(1);

    writer.upsert_obligation(&obligation).await.unwrap();

    let fetched = reader.get_obligation(&obligation.id).await.unwrap().unwrap();
    assert_eq!(fetched, obligation);

    let all = reader.get_obligations().await.unwrap();
    assert_eq!(all, vec![obligation]);
}

#[tokio::test]
async fn test_upsert_replaces_existing_row() {
    let (reader, writer, _temp_dir) = new_test_db().await.unwrap();
    let mut obligation = new_obligation(1);
    writer.upsert_obligation(&obligation).await.unwrap();

    obligation.status = Status::ProofSubmitted;
    obligation.proof_height = 200;
    writer.upsert_obligation(&obligation).await.unwrap();

    let fetched = reader.get_obligation(&obligation.id).await.unwrap().unwrap();
    assert_eq!(fetched.status, Status::ProofSubmitted);
    assert_eq!(fetched.proof_height, 200);
    assert_eq!(reader.get_obligations().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_delete_obligation() {
    let (reader, writer, _temp_dir) = new_test_db().await.unwrap();
    let first = new_obligation(1);
    let second = new_obligation(2);
    writer.upsert_obligation(&first).await.unwrap();
    writer.upsert_obligation(&second).await.unwrap();

    writer.delete_obligation(&first.id).await.unwrap();

    assert!(reader.get_obligation(&first.id).await.unwrap().is_none());
    assert_eq!(reader.get_obligations().await.unwrap(), vec![second]);

    // Deleting a missing row is not an error.
    writer.delete_obligation(&first.id).await.unwrap();
}

#[tokio::test]
async fn test_chain_state_round_trip() {
    let (reader, writer, _temp_dir) = new_test_db().await.unwrap();
    assert!(reader.get_chain_state().await.unwrap().is_none());

    let block_id = new_mock_hash(42);
    writer.set_chain_state(150, &block_id).await.unwrap();
    assert_eq!(reader.get_chain_state().await.unwrap(), Some((150, block_id)));

    // Single-row table: a new write replaces the previous tip.
    let next_id = new_mock_hash(43);
    writer.set_chain_state(151, &next_id).await.unwrap();
    assert_eq!(reader.get_chain_state().await.unwrap(), Some((151, next_id)));
}
