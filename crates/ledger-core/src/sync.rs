//! Startup: pull state from a seed peer, or recover from the store, or
//! synthesize genesis.

use crate::chain::{genesis_block, ChainStore};
use crate::crypto::SignatureVerifier;
use crate::error::{LedgerError, Result};
use crate::ledger::{Ledger, LedgerConfig};
use crate::peer::{parse_host, PeerTransport};
use std::sync::Arc;
use tracing::{info, warn};

impl<S: ChainStore> Ledger<S> {
    /// Builds the ledger. With a seed configured the node registers itself
    /// there and adopts the returned chain and peers verbatim; any failure
    /// to reach the seed is fatal. Without a seed, persisted state is
    /// reloaded, and an empty store gets a fresh genesis block.
    pub async fn open(
        config: LedgerConfig,
        store: Arc<S>,
        verifier: Arc<dyn SignatureVerifier>,
        transport: Arc<dyn PeerTransport>,
    ) -> Result<Self> {
        let ledger = Self::empty(store, verifier, transport, config.difficulty);
        match config.seed.as_deref() {
            Some(seed) => ledger.sync_from_seed(seed, &config.self_address).await?,
            None => ledger.restore_or_genesis().await?,
        }
        Ok(ledger)
    }

    /// The received chain is trusted as-is: no linkage or proof re-checks.
    /// Whatever the store held before is replaced wholesale.
    async fn sync_from_seed(&self, seed: &str, self_address: &str) -> Result<()> {
        let seed_host = parse_host(seed)?;
        let self_host = parse_host(self_address).ok();

        let snapshot = self
            .transport
            .register_with(&seed_host, self_address)
            .await
            .map_err(|source| LedgerError::Bootstrap {
                seed: seed_host.clone(),
                source,
            })?;
        if snapshot.chain.is_empty() {
            return Err(LedgerError::EmptyChain);
        }

        let mut peers = std::collections::BTreeSet::new();
        for node in &snapshot.nodes {
            match parse_host(node) {
                Ok(host) if Some(&host) != self_host.as_ref() => {
                    peers.insert(host);
                }
                Ok(_) => {}
                Err(e) => warn!("Ignoring peer from seed: {}", e),
            }
        }
        peers.insert(seed_host.clone());

        let mut state = self.state.write().await;
        let saved_peers: Vec<String> = peers.iter().cloned().collect();
        let chain = self
            .with_store(move |store| {
                store.reset()?;
                for block in &snapshot.chain {
                    store.save_block(block)?;
                }
                for peer in &saved_peers {
                    store.save_node(peer)?;
                }
                Ok(snapshot.chain)
            })
            .await?;

        state.chain = chain;
        state.peers = peers;
        info!(
            "Successfully synced {} blocks and {} nodes from {}",
            state.chain.len(),
            state.peers.len(),
            seed_host
        );
        Ok(())
    }

    async fn restore_or_genesis(&self) -> Result<()> {
        let mut state = self.state.write().await;
        let (chain, peers) = self
            .with_store(|store| {
                let mut chain = store.get_all_blocks()?;
                let peers = store.get_all_nodes()?;
                if chain.is_empty() {
                    let genesis = genesis_block();
                    store.save_block(&genesis)?;
                    info!("Genesis block created at index {}", genesis.index);
                    chain.push(genesis);
                } else {
                    info!("Restored {} blocks and {} peers from store", chain.len(), peers.len());
                }
                Ok((chain, peers))
            })
            .await?;

        state.chain = chain;
        state.peers = peers.into_iter().collect();
        Ok(())
    }
}
