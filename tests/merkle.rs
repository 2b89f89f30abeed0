use rand::RngCore;

use silod::{
    merkle,
    utils::new_mock_contract_id,
    types::Hash256,
};

fn random_data(len: usize) -> Vec<u8> {
    let mut data = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut data);
    data
}

#[test]
fn test_reader_root_deterministic() {
    let data = random_data(4000);
    let first = merkle::reader_root(&mut &data[..], 4000).unwrap();
    let second = merkle::reader_root(&mut &data[..], 4000).unwrap();
    assert_eq!(first, second);

    let mut tampered = data.clone();
    tampered[1234] ^= 0x01;
    let third = merkle::reader_root(&mut &tampered[..], 4000).unwrap();
    assert_ne!(first, third);
}

#[test]
fn test_build_and_verify_proof() {
    let data = random_data(4000);
    let count = merkle::segment_count(4000);
    assert_eq!(count, 63);

    let root = merkle::reader_root(&mut &data[..], 4000).unwrap();
    for index in [0, 1, 31, 61, 62] {
        let proof = merkle::build_proof(&mut &data[..], 4000, index).unwrap();
        assert_eq!(proof.root, root);
        assert!(merkle::verify_proof(
            &root,
            &proof.segment,
            index,
            &proof.hash_path,
            count
        ));
    }
}

#[test]
fn test_proof_determinism() {
    let data = random_data(4000);
    let first = merkle::build_proof(&mut &data[..], 4000, 7).unwrap();
    let second = merkle::build_proof(&mut &data[..], 4000, 7).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_verify_rejects_tampering() {
    let data = random_data(4000);
    let count = merkle::segment_count(4000);
    let root = merkle::reader_root(&mut &data[..], 4000).unwrap();
    let proof = merkle::build_proof(&mut &data[..], 4000, 5).unwrap();

    let mut tampered_segment = proof.segment.clone();
    tampered_segment[0] ^= 0xff;
    assert!(!merkle::verify_proof(
        &root,
        &tampered_segment,
        5,
        &proof.hash_path,
        count
    ));

    // Wrong index fails even with an honest segment and path.
    assert!(!merkle::verify_proof(
        &root,
        &proof.segment,
        6,
        &proof.hash_path,
        count
    ));

    let mut tampered_path = proof.hash_path.clone();
    tampered_path[0] = Hash256::default();
    assert!(!merkle::verify_proof(
        &root,
        &proof.segment,
        5,
        &tampered_path,
        count
    ));
}

#[test]
fn test_trailing_short_segment() {
    // 100 bytes: one full segment plus a 36-byte trailing segment.
    let data = random_data(100);
    let count = merkle::segment_count(100);
    assert_eq!(count, 2);

    let root = merkle::reader_root(&mut &data[..], 100).unwrap();
    let proof = merkle::build_proof(&mut &data[..], 100, 1).unwrap();
    assert_eq!(proof.segment.len(), 36);
    assert_eq!(proof.segment, &data[64..]);
    assert!(merkle::verify_proof(&root, &proof.segment, 1, &proof.hash_path, count));
}

#[test]
fn test_single_segment_file() {
    let data = random_data(10);
    assert_eq!(merkle::segment_count(10), 1);

    let root = merkle::reader_root(&mut &data[..], 10).unwrap();
    let proof = merkle::build_proof(&mut &data[..], 10, 0).unwrap();
    assert!(proof.hash_path.is_empty());
    assert!(merkle::verify_proof(&root, &proof.segment, 0, &proof.hash_path, 1));
}

#[test]
fn test_empty_file() {
    assert_eq!(merkle::segment_count(0), 1);
    let root = merkle::reader_root(&mut &[][..], 0).unwrap();
    let proof = merkle::build_proof(&mut &[][..], 0, 0).unwrap();
    assert!(proof.segment.is_empty());
    assert!(merkle::verify_proof(&root, &proof.segment, 0, &proof.hash_path, 1));
}

#[test]
fn test_out_of_range_index() {
    let data = random_data(100);
    assert!(merkle::build_proof(&mut &data[..], 100, 2).is_err());
}

#[test]
fn test_proof_segment_index() {
    let block_id = Hash256([0x42; 32]);
    let contract_id = new_mock_contract_id(7);

    let first = merkle::proof_segment_index(&block_id, &contract_id, 63);
    let second = merkle::proof_segment_index(&block_id, &contract_id, 63);
    assert_eq!(first, second);
    assert!(first < 63);

    // A different triggering block selects independently.
    let other_block = Hash256([0x43; 32]);
    let indices: Vec<u64> = (0u8..16)
        .map(|i| {
            let mut bytes = [0u8; 32];
            bytes[0] = i;
            merkle::proof_segment_index(&Hash256(bytes), &contract_id, 63)
        })
        .collect();
    assert!(indices.iter().any(|&i| i != indices[0]));
    let _ = merkle::proof_segment_index(&other_block, &contract_id, 1);
}
