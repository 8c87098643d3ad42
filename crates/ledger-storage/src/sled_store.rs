use anyhow::{Context, Result};
use ledger_core::{now_secs, Block, ChainStore};
use sled::transaction::{ConflictableTransactionError, TransactionError};
use sled::{Db, IVec, Transactional, Tree};
use std::path::Path;
use tracing::{debug, info};

const TREE_BLOCKS: &str = "blocks";
const TREE_BLOCK_HASHES: &str = "block_hashes";
const TREE_NODES: &str = "nodes";

/// Blocks keyed by big-endian index so iteration follows chain order,
/// a hash -> index lookup tree, and the peer set keyed by host.
#[derive(Clone)]
pub struct SledStore {
  db: Db,
  blocks: Tree,
  hashes: Tree,
  nodes: Tree,
}

impl SledStore {
  pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
    let path = path.as_ref();
    let db = sled::open(path).with_context(|| format!("open sled at {}", path.display()))?;
    let blocks = db.open_tree(TREE_BLOCKS)?;
    let hashes = db.open_tree(TREE_BLOCK_HASHES)?;
    let nodes = db.open_tree(TREE_NODES)?;
    info!("sled store opened at {}", path.display());
    Ok(Self {
      db,
      blocks,
      hashes,
      nodes,
    })
  }

  fn decode(ivec: &IVec) -> Result<Block> {
    bincode::deserialize(ivec).context("decode stored block")
  }
}

impl ChainStore for SledStore {
  /// Overwriting an index also drops the replaced block's hash entry.
  fn save_block(&self, block: &Block) -> Result<()> {
    let key = block.index.to_be_bytes();
    let hash = block.hash();
    let bytes = bincode::serialize(block)?;
    (&self.blocks, &self.hashes)
      .transaction(|(blocks, hashes)| {
        if let Some(old) = blocks.insert(key.as_slice(), bytes.as_slice())? {
          let old_hash = Self::decode(&old)
            .map_err(ConflictableTransactionError::Abort)?
            .hash();
          if old_hash != hash {
            hashes.remove(old_hash.as_bytes())?;
          }
        }
        hashes.insert(hash.as_bytes(), key.as_slice())?;
        Ok(())
      })
      .map_err(|e: TransactionError<anyhow::Error>| match e {
        TransactionError::Abort(e) => e,
        TransactionError::Storage(e) => e.into(),
      })?;
    self.db.flush()?;
    debug!("stored block {}", block.index);
    Ok(())
  }

  fn get_all_blocks(&self) -> Result<Vec<Block>> {
    self
      .blocks
      .iter()
      .map(|entry| -> Result<Block> {
        let (_, value) = entry?;
        Self::decode(&value)
      })
      .collect()
  }

  fn get_block_by_index(&self, index: u64) -> Result<Option<Block>> {
    self
      .blocks
      .get(index.to_be_bytes())?
      .map(|ivec| Self::decode(&ivec))
      .transpose()
  }

  fn get_block_by_hash(&self, hash: &str) -> Result<Option<Block>> {
    match self.hashes.get(hash.as_bytes())? {
      Some(key) => self
        .blocks
        .get(key)?
        .map(|ivec| Self::decode(&ivec))
        .transpose(),
      None => Ok(None),
    }
  }

  fn save_node(&self, address: &str) -> Result<()> {
    self
      .nodes
      .insert(address.as_bytes(), now_secs().to_be_bytes().to_vec())?;
    self.db.flush()?;
    Ok(())
  }

  fn get_all_nodes(&self) -> Result<Vec<String>> {
    self
      .nodes
      .iter()
      .keys()
      .map(|key| -> Result<String> { Ok(String::from_utf8(key?.to_vec())?) })
      .collect()
  }

  fn delete_node(&self, address: &str) -> Result<()> {
    self.nodes.remove(address.as_bytes())?;
    self.db.flush()?;
    Ok(())
  }

  fn reset(&self) -> Result<()> {
    self.blocks.clear()?;
    self.hashes.clear()?;
    self.nodes.clear()?;
    self.db.flush()?;
    info!("sled store cleared");
    Ok(())
  }

  fn close(&self) -> Result<()> {
    self.db.flush()?;
    Ok(())
  }
}
