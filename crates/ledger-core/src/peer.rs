//! Peer registry and best-effort gossip.
//!
//! Delivery is at-most-once with no acknowledgement tracking. The only
//! failure acted on is a refused connection, which evicts the peer.

use crate::chain::ChainStore;
use crate::error::{LedgerError, Result, TransportError};
use crate::ledger::Ledger;
use crate::Block;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

/// What a seed hands a newly registered peer: its full chain and peer set.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ChainSnapshot {
    pub chain: Vec<Block>,
    pub nodes: Vec<String>,
}

/// Outbound calls to other ledger nodes. `peer` is always a bare `host[:port]`.
#[async_trait]
pub trait PeerTransport: Send + Sync {
    async fn announce_node(&self, peer: &str, node: &str) -> std::result::Result<(), TransportError>;
    async fn announce_block(
        &self,
        peer: &str,
        block: &Block,
    ) -> std::result::Result<(), TransportError>;
    /// Register `node` with `seed` and return the seed's snapshot.
    async fn register_with(
        &self,
        seed: &str,
        node: &str,
    ) -> std::result::Result<ChainSnapshot, TransportError>;
}

/// Reduces `scheme://user@host:port/path` (or a bare `host:port`) to `host:port`.
pub fn parse_host(address: &str) -> Result<String> {
    let invalid = || LedgerError::InvalidNode(address.to_string());
    let trimmed = address.trim();
    let rest = match trimmed.split_once("://") {
        Some((scheme, rest)) => {
            let scheme_ok = !scheme.is_empty()
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
            if !scheme_ok {
                return Err(invalid());
            }
            rest
        }
        None => trimmed,
    };
    let authority = rest.split(['/', '?', '#']).next().unwrap_or("");
    let host = authority.rsplit_once('@').map_or(authority, |(_, h)| h);
    if host.is_empty() || host.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    if !host.ends_with(']') {
        if let Some((name, port)) = host.rsplit_once(':') {
            if name.is_empty() || port.parse::<u16>().is_err() {
                return Err(invalid());
            }
        }
    }
    Ok(host.to_ascii_lowercase())
}

impl<S: ChainStore> Ledger<S> {
    /// Adds a peer and gossips it to every other known peer in the background.
    /// Returns the normalized host.
    pub async fn register_node(&self, address: &str) -> Result<String> {
        let host = parse_host(address)?;
        {
            let mut state = self.state.write().await;
            if state.peers.contains(&host) {
                return Err(LedgerError::NodeExists(host));
            }
            let candidate = host.clone();
            let persisted = self
                .with_store(move |store| {
                    if store.get_all_nodes()?.contains(&candidate) {
                        return Ok(false);
                    }
                    store.save_node(&candidate)?;
                    Ok(true)
                })
                .await?;
            if !persisted {
                return Err(LedgerError::NodeExists(host));
            }
            state.peers.insert(host.clone());
        }
        info!("Registered peer {}", host);

        let ledger = self.clone();
        let announced = host.clone();
        tokio::spawn(async move { ledger.gossip_node(&announced).await });
        Ok(host)
    }

    /// Drops a peer from the persisted and in-memory sets. A store failure
    /// leaves the in-memory set untouched.
    pub async fn evict(&self, peer: &str) -> Result<()> {
        let mut state = self.state.write().await;
        let target = peer.to_string();
        self.with_store(move |store| store.delete_node(&target)).await?;
        state.peers.remove(peer);
        info!("Evicted peer {}", peer);
        Ok(())
    }

    pub async fn gossip_node(&self, host: &str) {
        let node_url = format!("http://{host}");
        for peer in self.peers().await.into_iter().filter(|p| p != host) {
            let outcome = self.transport.announce_node(&peer, &node_url).await;
            self.settle_gossip(&peer, outcome).await;
        }
    }

    pub async fn gossip_block(&self, block: &Block) {
        for peer in self.peers().await {
            let outcome = self.transport.announce_block(&peer, block).await;
            self.settle_gossip(&peer, outcome).await;
        }
    }

    pub(crate) fn spawn_block_gossip(&self, block: Block) {
        let ledger = self.clone();
        tokio::spawn(async move { ledger.gossip_block(&block).await });
    }

    async fn settle_gossip(&self, peer: &str, outcome: std::result::Result<(), TransportError>) {
        match outcome {
            Ok(()) => debug!("Gossip delivered to {}", peer),
            Err(TransportError::ConnectionRefused) => {
                warn!("Node {} appears to be offline, removing...", peer);
                if let Err(e) = self.evict(peer).await {
                    error!("Failed to evict {}: {}", peer, e);
                }
            }
            Err(e) => warn!("Gossip to {} failed: {}", peer, e),
        }
    }
}
