#![allow(dead_code)]

use std::fs;

use ledger_core::{chain::genesis_block, pow, Block, ChainStore, Transaction};
use ledger_storage::sled_store::SledStore;
use tempfile::{tempdir, TempDir};

pub fn create_temp_store() -> (TempDir, SledStore) {
    // Create a temporary directory for the sled database
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let db_path = temp_dir.path().to_path_buf();
    (
        temp_dir,
        SledStore::open(db_path.to_str().unwrap()).expect("Failed to open SledStore"),
    )
}

pub fn teardown_store(temp_dir: TempDir, store: SledStore) {
    let db_path = temp_dir.path().to_path_buf();
    store.reset().expect("Failed to reset the store");
    drop(store);
    temp_dir.close().expect("Failed to delete temp dir");
    let _ = fs::remove_dir_all(&db_path);
    assert!(!db_path.exists(), "Database directory should be removed");
}

pub fn sample_tx(i: u64) -> Transaction {
    Transaction {
        id: format!("tx-{i}"),
        sender: format!("{:064x}", i),
        receiver: format!("{:064x}", i + 1),
        signature: "ab".repeat(64),
        is_like: i % 3 == 0,
        message: format!("message {i}"),
        target_post_id: format!("post-{}", i / 3),
        timestamp: 1_600_000_000 + i,
    }
}

/// `count` linked blocks starting from a genesis block, difficulty 1.
pub fn sample_chain(count: usize, txs_per_block: u64) -> Vec<Block> {
    let mut chain = vec![genesis_block()];
    while chain.len() < count {
        let tail = chain.last().unwrap();
        let prev_hash = tail.hash();
        let proof = pow::search(tail.proof, &prev_hash, 1);
        let base = chain.len() as u64 * txs_per_block;
        let txs = (base..base + txs_per_block).map(sample_tx).collect();
        chain.push(Block::new(tail.index + 1, txs, proof, prev_hash));
    }
    chain
}

pub fn hashes(blocks: &[Block]) -> Vec<String> {
    blocks.iter().map(Block::hash).collect()
}
