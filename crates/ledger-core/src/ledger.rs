//! The ledger: chain history, pending pool and peer set behind one lock.
//!
//! The lock is never held across the proof-of-work search or an outbound
//! call. A block mined against a tail that changed meanwhile is discarded
//! at commit time and its transactions stay pooled.

use crate::chain::ChainStore;
use crate::constants::POW_DEFAULT_DIFFICULTY;
use crate::crypto::SignatureVerifier;
use crate::error::{ConsensusError, LedgerError, Result};
use crate::peer::{ChainSnapshot, PeerTransport};
use crate::{pow, Block, Transaction};
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

#[derive(Clone, Debug)]
pub struct LedgerConfig {
    /// Leading zero hex digits a proof digest needs.
    pub difficulty: usize,
    /// Peer to pull the chain and peer set from at startup.
    pub seed: Option<String>,
    /// URL other peers reach this node at; sent to the seed on registration.
    pub self_address: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            difficulty: POW_DEFAULT_DIFFICULTY,
            seed: None,
            self_address: "http://127.0.0.1:8080".to_string(),
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct LedgerState {
    pub(crate) chain: Vec<Block>,
    pub(crate) pool: Vec<Transaction>,
    pub(crate) peers: BTreeSet<String>,
}

impl LedgerState {
    pub(crate) fn tail(&self) -> Result<&Block> {
        self.chain.last().ok_or(LedgerError::EmptyChain)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MineOutcome {
    /// Nothing pending.
    Idle,
    /// The tail moved while the proof was being searched; the candidate was dropped.
    Stale,
    Mined(Block),
}

pub struct Ledger<S: ChainStore> {
    pub(crate) state: Arc<RwLock<LedgerState>>,
    pub(crate) store: Arc<S>,
    pub(crate) verifier: Arc<dyn SignatureVerifier>,
    pub(crate) transport: Arc<dyn PeerTransport>,
    pub(crate) difficulty: usize,
}

impl<S: ChainStore> Clone for Ledger<S> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            store: Arc::clone(&self.store),
            verifier: Arc::clone(&self.verifier),
            transport: Arc::clone(&self.transport),
            difficulty: self.difficulty,
        }
    }
}

impl<S: ChainStore> Ledger<S> {
    pub(crate) fn empty(
        store: Arc<S>,
        verifier: Arc<dyn SignatureVerifier>,
        transport: Arc<dyn PeerTransport>,
        difficulty: usize,
    ) -> Self {
        Self {
            state: Arc::new(RwLock::new(LedgerState::default())),
            store,
            verifier,
            transport,
            difficulty,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Runs a store call on the blocking pool. Callers may hold the state
    /// lock across it, which keeps memory and disk in step.
    pub(crate) async fn with_store<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&S) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || op(store.as_ref()))
            .await
            .map_err(|e| LedgerError::Storage(anyhow::Error::new(e)))?
            .map_err(LedgerError::Storage)
    }

    pub fn verifier(&self) -> &dyn SignatureVerifier {
        self.verifier.as_ref()
    }

    pub fn difficulty(&self) -> usize {
        self.difficulty
    }

    pub async fn chain(&self) -> Vec<Block> {
        self.state.read().await.chain.clone()
    }

    pub async fn chain_len(&self) -> usize {
        self.state.read().await.chain.len()
    }

    pub async fn tail(&self) -> Result<Block> {
        self.state.read().await.tail().cloned()
    }

    pub async fn pending(&self) -> Vec<Transaction> {
        self.state.read().await.pool.clone()
    }

    pub async fn peers(&self) -> Vec<String> {
        self.state.read().await.peers.iter().cloned().collect()
    }

    pub async fn snapshot(&self) -> ChainSnapshot {
        let state = self.state.read().await;
        ChainSnapshot {
            chain: state.chain.clone(),
            nodes: state.peers.iter().cloned().collect(),
        }
    }

    /// Queues an already validated transaction. Returns `len(chain) + 1`.
    pub async fn submit(&self, tx: Transaction) -> u64 {
        let mut state = self.state.write().await;
        debug!("Queued transaction {}", tx.id);
        state.pool.push(tx);
        state.chain.len() as u64 + 1
    }

    /// One mining cycle: snapshot, search, commit, announce.
    pub async fn mine(&self) -> Result<MineOutcome> {
        match self.forge().await? {
            Some(candidate) => self.commit_mined(candidate).await,
            None => Ok(MineOutcome::Idle),
        }
    }

    /// Builds a candidate block from the current pool without committing it.
    /// The search runs on the blocking pool with no lock held.
    pub async fn forge(&self) -> Result<Option<Block>> {
        let (batch, last) = {
            let state = self.state.read().await;
            if state.pool.is_empty() {
                return Ok(None);
            }
            (state.pool.clone(), state.tail()?.clone())
        };
        let index = last.index.checked_add(1).ok_or_else(|| {
            LedgerError::Mining(format!("block index {} cannot be extended", last.index))
        })?;

        let last_hash = last.hash();
        let last_proof = last.proof;
        let difficulty = self.difficulty;
        let search_hash = last_hash.clone();
        let proof = tokio::task::spawn_blocking(move || {
            pow::search_parallel(last_proof, &search_hash, difficulty)
        })
        .await
        .map_err(|e| LedgerError::Mining(e.to_string()))?
        .ok_or_else(|| LedgerError::Mining("proof space exhausted".to_string()))?;

        Ok(Some(Block::new(index, batch, proof, last_hash)))
    }

    /// Commits a locally mined block if it still extends the tail, then
    /// announces it. Only the block's own transactions leave the pool.
    pub async fn commit_mined(&self, block: Block) -> Result<MineOutcome> {
        let block = {
            let mut state = self.state.write().await;
            let tail = state.tail()?;
            if tail.index.checked_add(1) != Some(block.index) || block.prev_hash != tail.hash() {
                info!(
                    "Discarding mined block {}: tail moved to {}",
                    block.index, tail.index
                );
                return Ok(MineOutcome::Stale);
            }

            let block = self
                .with_store(move |store| store.save_block(&block).map(|()| block))
                .await?;

            let mined: HashSet<&str> = block.transactions.iter().map(|t| t.id.as_str()).collect();
            state.pool.retain(|tx| !mined.contains(tx.id.as_str()));
            state.chain.push(block.clone());
            block
        };
        info!(
            "Mined block {} with proof {} and {} transactions",
            block.index,
            block.proof,
            block.transactions.len()
        );

        self.spawn_block_gossip(block.clone());
        Ok(MineOutcome::Mined(block))
    }

    /// Appends a block received from a peer if it extends the current tail.
    /// Transactions it carries are not removed from the local pool.
    pub async fn validate_and_append(&self, block: Block) -> Result<()> {
        let mut state = self.state.write().await;
        if let Err(reason) = self.check_extension(state.tail()?, &block) {
            warn!("Rejected block {}: {}", block.index, reason);
            return Err(reason.into());
        }

        let block = self
            .with_store(move |store| store.save_block(&block).map(|()| block))
            .await?;
        info!("Accepted block {} from peer", block.index);
        state.chain.push(block);
        Ok(())
    }

    fn check_extension(&self, tail: &Block, block: &Block) -> std::result::Result<(), ConsensusError> {
        let expected = tail
            .index
            .checked_add(1)
            .ok_or(ConsensusError::InvalidIndex {
                expected: tail.index,
                got: block.index,
            })?;
        if block.index != expected {
            return Err(ConsensusError::InvalidIndex {
                expected,
                got: block.index,
            });
        }
        let tail_hash = tail.hash();
        if block.prev_hash != tail_hash {
            return Err(ConsensusError::InvalidPrevHash {
                expected: tail_hash,
                got: block.prev_hash.clone(),
            });
        }
        if !pow::verify(tail.proof, block.proof, &block.prev_hash, self.difficulty) {
            return Err(ConsensusError::InvalidProof);
        }
        for tx in &block.transactions {
            if !matches!(tx.verify(self.verifier.as_ref()), Ok(true)) {
                return Err(ConsensusError::InvalidSignature {
                    tx_id: tx.id.clone(),
                });
            }
        }
        Ok(())
    }
}
