//! Merkle commitments over stored contract data.
//!
//! Data is divided into fixed 64-byte segments; the trailing segment is
//! hashed over exactly the bytes present, with no padding. A zero-length
//! file hashes as a single empty segment. Leaves are SHA-256(0x00 || segment)
//! and interior nodes SHA-256(0x01 || left || right); a tree over n leaves
//! splits at the largest power of two strictly below n. The same primitive
//! validates data at contract formation and generates proofs at proof time.

use std::io::{self, Read};

use sha2::{Digest, Sha256};

use crate::types::{ContractId, Hash256};

pub const SEGMENT_SIZE: usize = 64;

const LEAF_PREFIX: &[u8] = &[0x00];
const NODE_PREFIX: &[u8] = &[0x01];

pub fn segment_count(total_size: u64) -> u64 {
    if total_size == 0 {
        1
    } else {
        total_size.div_ceil(SEGMENT_SIZE as u64)
    }
}

fn leaf_sum(segment: &[u8]) -> Hash256 {
    let mut hasher = Sha256::new();
    hasher.update(LEAF_PREFIX);
    hasher.update(segment);
    Hash256(hasher.finalize().into())
}

fn node_sum(left: &Hash256, right: &Hash256) -> Hash256 {
    let mut hasher = Sha256::new();
    hasher.update(NODE_PREFIX);
    hasher.update(left.as_bytes());
    hasher.update(right.as_bytes());
    Hash256(hasher.finalize().into())
}

// Largest power of two strictly less than n, for n >= 2.
fn largest_power_below(n: usize) -> usize {
    let mut k = 1;
    while k * 2 < n {
        k *= 2;
    }
    k
}

fn tree_root(leaves: &[Hash256]) -> Hash256 {
    match leaves.len() {
        0 => leaf_sum(&[]),
        1 => leaves[0],
        n => {
            let k = largest_power_below(n);
            node_sum(&tree_root(&leaves[..k]), &tree_root(&leaves[k..]))
        }
    }
}

fn read_leaves<R: Read>(
    reader: &mut R,
    total_size: u64,
    capture_index: Option<u64>,
) -> io::Result<(Vec<Hash256>, Option<Vec<u8>>)> {
    let count = segment_count(total_size);
    let mut leaves = Vec::with_capacity(count as usize);
    let mut captured = None;
    let mut remaining = total_size;
    for index in 0..count {
        let len = remaining.min(SEGMENT_SIZE as u64) as usize;
        let mut segment = vec![0u8; len];
        reader.read_exact(&mut segment)?;
        remaining -= len as u64;
        leaves.push(leaf_sum(&segment));
        if capture_index == Some(index) {
            captured = Some(segment);
        }
    }
    Ok((leaves, captured))
}

/// Merkle root of `total_size` bytes read from `reader`. Deterministic for a
/// given byte stream.
pub fn reader_root<R: Read>(reader: &mut R, total_size: u64) -> io::Result<Hash256> {
    let (leaves, _) = read_leaves(reader, total_size, None)?;
    Ok(tree_root(&leaves))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentProof {
    pub segment: Vec<u8>,
    pub hash_path: Vec<Hash256>,
    /// Root recomputed from the same read, so callers can detect corruption
    /// without a second pass over the data.
    pub root: Hash256,
}

/// Inclusion proof for the segment at `segment_index`. The hash path holds
/// sibling subtree roots ordered deepest first.
pub fn build_proof<R: Read>(
    reader: &mut R,
    total_size: u64,
    segment_index: u64,
) -> io::Result<SegmentProof> {
    let count = segment_count(total_size);
    if segment_index >= count {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("segment index {} out of range for {} segments", segment_index, count),
        ));
    }
    let (leaves, captured) = read_leaves(reader, total_size, Some(segment_index))?;
    Ok(SegmentProof {
        hash_path: proof_path(&leaves, segment_index as usize),
        root: tree_root(&leaves),
        segment: captured.unwrap_or_default(),
    })
}

fn proof_path(leaves: &[Hash256], index: usize) -> Vec<Hash256> {
    if leaves.len() == 1 {
        return vec![];
    }
    let k = largest_power_below(leaves.len());
    let mut path;
    if index < k {
        path = proof_path(&leaves[..k], index);
        path.push(tree_root(&leaves[k..]));
    } else {
        path = proof_path(&leaves[k..], index - k);
        path.push(tree_root(&leaves[..k]));
    }
    path
}

fn recompute(leaf: Hash256, index: u64, count: u64, path: &[Hash256]) -> Option<Hash256> {
    if count == 1 {
        return path.is_empty().then_some(leaf);
    }
    let (top, rest) = path.split_last()?;
    let k = largest_power_below(count as usize) as u64;
    if index < k {
        let left = recompute(leaf, index, k, rest)?;
        Some(node_sum(&left, top))
    } else {
        let right = recompute(leaf, index - k, count - k, rest)?;
        Some(node_sum(top, &right))
    }
}

pub fn verify_proof(
    root: &Hash256,
    segment: &[u8],
    segment_index: u64,
    hash_path: &[Hash256],
    count: u64,
) -> bool {
    if count == 0 || segment_index >= count {
        return false;
    }
    recompute(leaf_sum(segment), segment_index, count, hash_path) == Some(*root)
}

/// Segment a host must prove possession of for a given triggering block,
/// derived from SHA-256(block id || contract id) so the segment cannot be
/// predicted before the block exists.
pub fn proof_segment_index(block_id: &Hash256, contract_id: &ContractId, count: u64) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(block_id.as_bytes());
    hasher.update(contract_id.0.as_bytes());
    let digest = hasher.finalize();
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(prefix) % count.max(1)
}
