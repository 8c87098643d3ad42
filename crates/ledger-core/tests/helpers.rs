#![allow(dead_code)]

use anyhow::{bail, Result};
use async_trait::async_trait;
use ledger_core::crypto::{generate_keypair, sign, Ed25519Verifier};
use ledger_core::{
    pow, Block, ChainSnapshot, ChainStore, Ledger, LedgerConfig, NewTransaction, PeerTransport,
    Transaction, TransportError,
};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, ThreadId};
use std::time::Duration;

pub const TEST_DIFFICULTY: usize = 2;

/// In-memory `ChainStore` whose writes can be switched to fail.
#[derive(Default)]
pub struct MemoryStore {
    blocks: Mutex<BTreeMap<u64, Block>>,
    nodes: Mutex<BTreeSet<String>>,
    fail_writes: AtomicBool,
    write_threads: Mutex<Vec<ThreadId>>,
}

impl MemoryStore {
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Threads every write ran on, in order.
    pub fn write_threads(&self) -> Vec<ThreadId> {
        self.write_threads.lock().unwrap().clone()
    }

    fn check_writable(&self) -> Result<()> {
        self.write_threads.lock().unwrap().push(thread::current().id());
        if self.fail_writes.load(Ordering::SeqCst) {
            bail!("disk full");
        }
        Ok(())
    }
}

impl ChainStore for MemoryStore {
    fn save_block(&self, block: &Block) -> Result<()> {
        self.check_writable()?;
        self.blocks.lock().unwrap().insert(block.index, block.clone());
        Ok(())
    }

    fn get_all_blocks(&self) -> Result<Vec<Block>> {
        Ok(self.blocks.lock().unwrap().values().cloned().collect())
    }

    fn get_block_by_index(&self, index: u64) -> Result<Option<Block>> {
        Ok(self.blocks.lock().unwrap().get(&index).cloned())
    }

    fn get_block_by_hash(&self, hash: &str) -> Result<Option<Block>> {
        Ok(self
            .blocks
            .lock()
            .unwrap()
            .values()
            .find(|b| b.hash() == hash)
            .cloned())
    }

    fn save_node(&self, address: &str) -> Result<()> {
        self.check_writable()?;
        self.nodes.lock().unwrap().insert(address.to_string());
        Ok(())
    }

    fn get_all_nodes(&self) -> Result<Vec<String>> {
        Ok(self.nodes.lock().unwrap().iter().cloned().collect())
    }

    fn delete_node(&self, address: &str) -> Result<()> {
        self.check_writable()?;
        self.nodes.lock().unwrap().remove(address);
        Ok(())
    }

    fn reset(&self) -> Result<()> {
        self.check_writable()?;
        self.blocks.lock().unwrap().clear();
        self.nodes.lock().unwrap().clear();
        Ok(())
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Records every outbound call; peers in `refused` fail with
/// `ConnectionRefused`, peers in `timing_out` with `Timeout`.
#[derive(Default)]
pub struct ScriptedTransport {
    pub refused: Mutex<HashSet<String>>,
    pub timing_out: Mutex<HashSet<String>>,
    pub seed_snapshot: Mutex<Option<ChainSnapshot>>,
    pub announced_nodes: Mutex<Vec<(String, String)>>,
    pub announced_blocks: Mutex<Vec<(String, u64)>>,
    pub registrations: Mutex<Vec<(String, String)>>,
}

impl ScriptedTransport {
    pub fn refuse(&self, peer: &str) {
        self.refused.lock().unwrap().insert(peer.to_string());
    }

    pub fn time_out(&self, peer: &str) {
        self.timing_out.lock().unwrap().insert(peer.to_string());
    }

    fn outcome(&self, peer: &str) -> Result<(), TransportError> {
        if self.refused.lock().unwrap().contains(peer) {
            return Err(TransportError::ConnectionRefused);
        }
        if self.timing_out.lock().unwrap().contains(peer) {
            return Err(TransportError::Timeout);
        }
        Ok(())
    }
}

#[async_trait]
impl PeerTransport for ScriptedTransport {
    async fn announce_node(&self, peer: &str, node: &str) -> Result<(), TransportError> {
        self.outcome(peer)?;
        self.announced_nodes
            .lock()
            .unwrap()
            .push((peer.to_string(), node.to_string()));
        Ok(())
    }

    async fn announce_block(&self, peer: &str, block: &Block) -> Result<(), TransportError> {
        self.outcome(peer)?;
        self.announced_blocks
            .lock()
            .unwrap()
            .push((peer.to_string(), block.index));
        Ok(())
    }

    async fn register_with(&self, seed: &str, node: &str) -> Result<ChainSnapshot, TransportError> {
        self.outcome(seed)?;
        self.registrations
            .lock()
            .unwrap()
            .push((seed.to_string(), node.to_string()));
        self.seed_snapshot
            .lock()
            .unwrap()
            .clone()
            .ok_or(TransportError::ConnectionRefused)
    }
}

pub struct Harness {
    pub ledger: Ledger<MemoryStore>,
    pub store: Arc<MemoryStore>,
    pub transport: Arc<ScriptedTransport>,
}

pub async fn fresh_ledger() -> Harness {
    let store = Arc::new(MemoryStore::default());
    let transport = Arc::new(ScriptedTransport::default());
    let config = LedgerConfig {
        difficulty: TEST_DIFFICULTY,
        ..Default::default()
    };
    let ledger = Ledger::open(
        config,
        store.clone(),
        Arc::new(Ed25519Verifier),
        transport.clone(),
    )
    .await
    .expect("open ledger");
    Harness {
        ledger,
        store,
        transport,
    }
}

pub fn signed_tx(message: &str) -> Transaction {
    let (secret, address) = generate_keypair();
    let (_, receiver) = generate_keypair();
    let submission = NewTransaction {
        sender: address,
        receiver,
        message: message.to_string(),
        signature: sign(&secret, message.as_bytes()).unwrap(),
        is_like: false,
        target_post_id: String::new(),
    };
    submission.validate(&Ed25519Verifier).unwrap();
    submission.into_transaction()
}

pub fn hashes(blocks: &[Block]) -> Vec<String> {
    blocks.iter().map(Block::hash).collect()
}

/// A block that correctly extends `tail`.
pub fn next_block(tail: &Block, transactions: Vec<Transaction>) -> Block {
    let prev_hash = tail.hash();
    let proof = pow::search(tail.proof, &prev_hash, TEST_DIFFICULTY);
    Block::new(tail.index + 1, transactions, proof, prev_hash)
}

/// Polls `check` until it holds or a second has passed.
pub async fn eventually<F: Fn() -> bool>(check: F) -> bool {
    for _ in 0..100 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}
