use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),
    #[error("invalid signature encoding: {0}")]
    InvalidSignature(String),
    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),
}

/// Rejections at the submission boundary; nothing is mutated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid address format - must be 256-bit hex string: {0}")]
    InvalidAddress(String),
    #[error("message required for non-like transactions")]
    MissingMessage,
    #[error("target post id is required for likes")]
    MissingTargetPost,
    #[error("signed payload is empty")]
    EmptyPayload,
    #[error("invalid signature")]
    InvalidSignature,
    #[error("signature verification error: {0}")]
    Crypto(#[from] CryptoError),
}

/// Reasons an inbound block does not extend the current tail.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConsensusError {
    #[error("invalid block index: expected {expected}, got {got}")]
    InvalidIndex { expected: u64, got: u64 },
    #[error("invalid previous hash: expected {expected}, got {got}")]
    InvalidPrevHash { expected: String, got: String },
    #[error("invalid proof of work")]
    InvalidProof,
    #[error("invalid transaction signature in {tx_id}")]
    InvalidSignature { tx_id: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("connection refused")]
    ConnectionRefused,
    #[error("peer call timed out")]
    Timeout,
    #[error("peer answered with status {0}")]
    Status(u16),
    #[error("transport error: {0}")]
    Other(String),
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error(transparent)]
    Consensus(#[from] ConsensusError),
    #[error("storage failure: {0:#}")]
    Storage(#[from] anyhow::Error),
    #[error("node already exists: {0}")]
    NodeExists(String),
    #[error("invalid node address: {0}")]
    InvalidNode(String),
    #[error("failed to sync from {seed}: {source}")]
    Bootstrap {
        seed: String,
        #[source]
        source: TransportError,
    },
    #[error("chain is empty")]
    EmptyChain,
    #[error("mining failed: {0}")]
    Mining(String),
}

pub type Result<T> = std::result::Result<T, LedgerError>;
