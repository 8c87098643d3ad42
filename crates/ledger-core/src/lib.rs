pub mod chain;
pub mod constants;
pub mod crypto;
pub mod error;
pub mod ledger;
pub mod mine;
pub mod peer;
pub mod pow;
pub mod sync;

use crypto::SignatureVerifier;
use error::{CryptoError, ValidationError};
use serde::{Deserialize, Serialize};
use std::hash::{Hash as StdHash, Hasher};
use std::time::{SystemTime, UNIX_EPOCH};

pub use chain::ChainStore;
pub use error::{ConsensusError, LedgerError, TransportError};
pub use ledger::{Ledger, LedgerConfig, MineOutcome};
pub use peer::{ChainSnapshot, PeerTransport};

/// Hex-encoded SHA-256 digest.
pub type Hash = String;

pub fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Fresh transaction id: digest of a nanosecond clock reading salted with
/// random bytes so concurrent submitters never collide.
pub fn generate_tx_id() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let salt: u64 = rand::random();
    let mut seed = Vec::with_capacity(16 + 8);
    seed.extend_from_slice(&nanos.to_le_bytes());
    seed.extend_from_slice(&salt.to_le_bytes());
    crypto::sha256_hex(&seed)
}

fn put_str(bytes: &mut Vec<u8>, s: &str) {
    bytes.extend_from_slice(&(s.len() as u64).to_le_bytes());
    bytes.extend_from_slice(s.as_bytes());
}

/// A social action (post, comment or like) signed by its sender.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub sender: String,
    pub receiver: String,
    pub signature: String,
    pub is_like: bool,
    pub message: String,
    #[serde(default)]
    pub target_post_id: String,
    pub timestamp: u64,
}

impl PartialEq for Transaction {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Transaction {}

impl StdHash for Transaction {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl Transaction {
    pub fn new(
        sender: String,
        receiver: String,
        signature: String,
        is_like: bool,
        message: String,
        target_post_id: String,
    ) -> Self {
        Self {
            id: generate_tx_id(),
            sender,
            receiver,
            signature,
            is_like,
            message,
            target_post_id,
            timestamp: now_secs(),
        }
    }

    /// The bytes the sender signs: the target post id for likes, the message otherwise.
    pub fn payload(&self) -> &[u8] {
        signed_payload(self.is_like, &self.message, &self.target_post_id)
    }

    pub fn verify(&self, verifier: &dyn SignatureVerifier) -> Result<bool, CryptoError> {
        let payload = self.payload();
        if payload.is_empty() {
            return Ok(false);
        }
        verifier.verify(&self.sender, payload, &self.signature)
    }

    pub fn hash_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(256 + self.message.len());
        put_str(&mut bytes, &self.id);
        put_str(&mut bytes, &self.sender);
        put_str(&mut bytes, &self.receiver);
        put_str(&mut bytes, &self.signature);
        bytes.push(self.is_like as u8);
        put_str(&mut bytes, &self.message);
        put_str(&mut bytes, &self.target_post_id);
        bytes.extend_from_slice(&self.timestamp.to_le_bytes());
        bytes
    }
}

pub fn signed_payload<'a>(is_like: bool, message: &'a str, target_post_id: &'a str) -> &'a [u8] {
    if is_like {
        target_post_id.as_bytes()
    } else {
        message.as_bytes()
    }
}

/// An inbound submission before it has been checked and assigned an id.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NewTransaction {
    pub sender: String,
    pub receiver: String,
    #[serde(default)]
    pub message: String,
    pub signature: String,
    #[serde(default)]
    pub is_like: bool,
    #[serde(default)]
    pub target_post_id: String,
}

impl NewTransaction {
    /// Boundary checks. Nothing reaches the ledger pool without passing these.
    pub fn validate(&self, verifier: &dyn SignatureVerifier) -> Result<(), ValidationError> {
        for address in [&self.sender, &self.receiver] {
            if !verifier.validate_address(address) {
                return Err(ValidationError::InvalidAddress(address.clone()));
            }
        }
        if self.is_like && self.target_post_id.is_empty() {
            return Err(ValidationError::MissingTargetPost);
        }
        if !self.is_like && self.message.is_empty() {
            return Err(ValidationError::MissingMessage);
        }
        let payload = signed_payload(self.is_like, &self.message, &self.target_post_id);
        if payload.is_empty() {
            return Err(ValidationError::EmptyPayload);
        }
        if !verifier.verify(&self.sender, payload, &self.signature)? {
            return Err(ValidationError::InvalidSignature);
        }
        Ok(())
    }

    pub fn into_transaction(self) -> Transaction {
        Transaction::new(
            self.sender,
            self.receiver,
            self.signature,
            self.is_like,
            self.message,
            self.target_post_id,
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    pub timestamp: u64,
    pub transactions: Vec<Transaction>,
    pub proof: u64,
    #[serde(rename = "previous_hash")]
    pub prev_hash: Hash,
}

impl Block {
    pub fn new(index: u64, transactions: Vec<Transaction>, proof: u64, prev_hash: Hash) -> Self {
        Self {
            index,
            timestamp: now_secs(),
            transactions,
            proof,
            prev_hash,
        }
    }

    /// Deterministic encoding of every field, transactions included.
    pub fn hash_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(64 + self.transactions.len() * 256);
        bytes.extend_from_slice(&self.index.to_le_bytes());
        bytes.extend_from_slice(&self.timestamp.to_le_bytes());
        bytes.extend_from_slice(&self.proof.to_le_bytes());
        put_str(&mut bytes, &self.prev_hash);
        bytes.extend_from_slice(&(self.transactions.len() as u64).to_le_bytes());
        for tx in &self.transactions {
            bytes.extend_from_slice(&tx.hash_bytes());
        }
        bytes
    }

    pub fn hash(&self) -> Hash {
        crypto::sha256_hex(&self.hash_bytes())
    }
}
