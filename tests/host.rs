use std::sync::Arc;

use rand::RngCore;

use silod::{
    host::{FormationError, Host, RetrieveError},
    store::ObligationStore,
    types::Status,
    utils::{new_mock_contract_id, new_test_backend, new_test_contract, new_test_db},
};

fn random_data(len: usize) -> Vec<u8> {
    let mut data = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut data);
    data
}

async fn new_test_host(capacity: u64) -> (Host, Arc<ObligationStore>, TestGuards) {
    let (reader, writer, db_dir) = new_test_db().await.unwrap();
    let (backend, data_dir) = new_test_backend(capacity).unwrap();
    let store = Arc::new(ObligationStore::new());
    let host = Host::new(store.clone(), backend, writer);
    (host, store, TestGuards { reader, _db_dir: db_dir, _data_dir: data_dir })
}

struct TestGuards {
    reader: silod::database::Reader,
    _db_dir: tempfile::TempDir,
    _data_dir: tempfile::TempDir,
}

#[tokio::test]
async fn test_accept_contract() {
    let (host, store, guards) = new_test_host(1 << 20).await;
    let data = random_data(4000);
    let contract = new_test_contract(&data, 100, 300);

    let id = host.accept_contract(contract.clone(), &mut &data[..]).await.unwrap();
    assert_eq!(id, contract.id());

    let obligation = store.get(id).unwrap();
    assert_eq!(obligation.status, Status::Pending);
    assert_eq!(obligation.proof_height, 100);
    assert_eq!(std::fs::metadata(&obligation.path).unwrap().len(), 4000);

    // Durable as well as in memory.
    let persisted = guards.reader.get_obligation(&id).await.unwrap().unwrap();
    assert_eq!(persisted, obligation);
}

#[tokio::test]
async fn test_accept_rejects_merkle_mismatch() {
    let (host, store, _guards) = new_test_host(1 << 20).await;
    let data = random_data(4000);
    let contract = new_test_contract(&data, 100, 300);

    let mut tampered = data.clone();
    tampered[0] ^= 0x01;
    let result = host.accept_contract(contract, &mut &tampered[..]).await;
    assert!(matches!(result, Err(FormationError::MerkleMismatch { .. })));

    // Nothing registered, data file cleaned up, space released.
    assert!(store.is_empty());
    let retried = new_test_contract(&data, 100, 300);
    host.accept_contract(retried, &mut &data[..]).await.unwrap();
}

#[tokio::test]
async fn test_accept_rejects_short_stream() {
    let (host, store, _guards) = new_test_host(1 << 20).await;
    let data = random_data(4000);
    let contract = new_test_contract(&data, 100, 300);

    let result = host.accept_contract(contract, &mut &data[..3000]).await;
    assert!(matches!(
        result,
        Err(FormationError::SizeMismatch {
            expected: 4000,
            written: 3000
        })
    ));
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_accept_rejects_duplicate() {
    let (host, _store, _guards) = new_test_host(1 << 20).await;
    let data = random_data(1000);
    let contract = new_test_contract(&data, 100, 300);
    let id = contract.id();

    host.accept_contract(contract.clone(), &mut &data[..]).await.unwrap();
    let result = host.accept_contract(contract, &mut &data[..]).await;
    assert!(matches!(result, Err(FormationError::DuplicateId(d)) if d == id));
}

#[tokio::test]
async fn test_accept_rejects_insufficient_space() {
    let (host, store, _guards) = new_test_host(1000).await;
    let data = random_data(4000);
    let contract = new_test_contract(&data, 100, 300);

    let result = host.accept_contract(contract, &mut &data[..]).await;
    assert!(matches!(result, Err(FormationError::InsufficientSpace(4000))));
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_retrieve_ranges() {
    let (host, _store, _guards) = new_test_host(1 << 20).await;
    let data = random_data(4000);
    let contract = new_test_contract(&data, 100, 300);
    let id = host.accept_contract(contract, &mut &data[..]).await.unwrap();

    assert_eq!(host.retrieve(id, 0, 4000).unwrap(), data);
    assert_eq!(host.retrieve(id, 100, 50).unwrap(), &data[100..150]);
    assert_eq!(host.retrieve(id, 3999, 1).unwrap(), &data[3999..]);
    assert!(host.retrieve(id, 4000, 0).unwrap().is_empty());

    assert!(matches!(
        host.retrieve(id, 4000, 1),
        Err(RetrieveError::RangeInvalid { .. })
    ));
    assert!(matches!(
        host.retrieve(id, u64::MAX, 1),
        Err(RetrieveError::RangeInvalid { .. })
    ));
    assert!(matches!(
        host.retrieve(new_mock_contract_id(99), 0, 1),
        Err(RetrieveError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_load_restores_persisted_obligations() {
    let (reader, writer, _db_dir) = new_test_db().await.unwrap();
    let (backend, _data_dir) = new_test_backend(1 << 20).unwrap();

    let data = random_data(2000);
    let contract = new_test_contract(&data, 100, 300);
    let id = {
        let store = Arc::new(ObligationStore::new());
        let host = Host::new(store, backend.clone(), writer.clone());
        host.accept_contract(contract, &mut &data[..]).await.unwrap()
    };

    // Fresh store and host against the same database and data directory.
    let store = Arc::new(ObligationStore::new());
    let host = Host::new(store.clone(), backend, writer);
    let restored = host.load(&reader).await.unwrap();
    assert_eq!(restored, 1);
    assert_eq!(store.len(), 1);
    assert_eq!(host.retrieve(id, 0, 2000).unwrap(), data);
}
