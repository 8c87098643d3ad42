use crate::constants::{
    GENESIS_INDEX, GENESIS_MESSAGE, GENESIS_PREV_HASH, GENESIS_PROOF, GENESIS_RECEIVER,
    GENESIS_SENDER, GENESIS_SIGNATURE,
};
use crate::{generate_tx_id, now_secs, Block, Transaction};
use anyhow::Result;

/// Trait the storage backends implement for the ledger to persist through.
/// This lives in `ledger-core` to avoid a circular dependency.
///
/// Every call is synchronous and durable on return. An `Err` aborts the
/// ledger mutation it was backing.
pub trait ChainStore: Send + Sync + 'static {
    fn save_block(&self, block: &Block) -> Result<()>;
    /// All blocks, ascending by index.
    fn get_all_blocks(&self) -> Result<Vec<Block>>;
    fn get_block_by_index(&self, index: u64) -> Result<Option<Block>>;
    fn get_block_by_hash(&self, hash: &str) -> Result<Option<Block>>;
    fn save_node(&self, address: &str) -> Result<()>;
    fn get_all_nodes(&self) -> Result<Vec<String>>;
    fn delete_node(&self, address: &str) -> Result<()>;
    /// Drops every block and peer. Used before adopting a seed snapshot.
    fn reset(&self) -> Result<()>;
    fn close(&self) -> Result<()>;

    fn get_transactions_by_block_index(&self, index: u64) -> Result<Vec<Transaction>> {
        Ok(self
            .get_block_by_index(index)?
            .map(|block| block.transactions)
            .unwrap_or_default())
    }
}

pub fn genesis_transaction() -> Transaction {
    Transaction {
        id: generate_tx_id(),
        sender: GENESIS_SENDER.to_string(),
        receiver: GENESIS_RECEIVER.to_string(),
        signature: GENESIS_SIGNATURE.to_string(),
        is_like: false,
        message: GENESIS_MESSAGE.to_string(),
        target_post_id: String::new(),
        timestamp: now_secs(),
    }
}

/// Hard-coded first block for a node started without a seed peer. Its only
/// transaction carries the `GENESIS` marker instead of a signature and is
/// never verified.
pub fn genesis_block() -> Block {
    Block::new(
        GENESIS_INDEX,
        vec![genesis_transaction()],
        GENESIS_PROOF,
        GENESIS_PREV_HASH.to_string(),
    )
}
