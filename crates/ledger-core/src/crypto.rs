//! Signature capability consumed by the ledger, and its Ed25519 adapter.
//!
//! Addresses are hex-encoded 32-byte Ed25519 public keys; signatures are
//! hex-encoded 64-byte Ed25519 signatures over the transaction payload.

use crate::constants::ADDRESS_HEX_SIZE;
use crate::error::CryptoError;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use sha2::{Digest, Sha256};

pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

pub trait SignatureVerifier: Send + Sync {
    /// True when `address` is a 256-bit hex string.
    fn validate_address(&self, address: &str) -> bool;

    /// `Ok(false)` for a well-formed signature that does not match; `Err` when
    /// the key or signature cannot be decoded at all.
    fn verify(&self, address: &str, payload: &[u8], signature: &str) -> Result<bool, CryptoError>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Ed25519Verifier;

impl SignatureVerifier for Ed25519Verifier {
    fn validate_address(&self, address: &str) -> bool {
        address.len() == ADDRESS_HEX_SIZE && hex::decode(address).is_ok()
    }

    fn verify(&self, address: &str, payload: &[u8], signature: &str) -> Result<bool, CryptoError> {
        let key_bytes: [u8; 32] = hex::decode(address)
            .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))?
            .try_into()
            .map_err(|v: Vec<u8>| CryptoError::InvalidPublicKey(format!("{} bytes", v.len())))?;
        let key = VerifyingKey::from_bytes(&key_bytes)
            .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))?;

        let sig_bytes: [u8; 64] = hex::decode(signature)
            .map_err(|e| CryptoError::InvalidSignature(e.to_string()))?
            .try_into()
            .map_err(|v: Vec<u8>| CryptoError::InvalidSignature(format!("{} bytes", v.len())))?;
        let sig = Signature::from_bytes(&sig_bytes);

        Ok(key.verify(payload, &sig).is_ok())
    }
}

fn signing_key(secret: &str) -> Result<SigningKey, CryptoError> {
    let bytes = hex::decode(secret).map_err(|e| CryptoError::InvalidPrivateKey(e.to_string()))?;
    match bytes.len() {
        32 => {
            let mut seed = [0u8; 32];
            seed.copy_from_slice(&bytes);
            Ok(SigningKey::from_bytes(&seed))
        }
        // seed followed by public key
        64 => {
            let mut pair = [0u8; 64];
            pair.copy_from_slice(&bytes);
            SigningKey::from_keypair_bytes(&pair)
                .map_err(|e| CryptoError::InvalidPrivateKey(e.to_string()))
        }
        n => Err(CryptoError::InvalidPrivateKey(format!("{n} bytes"))),
    }
}

/// Client-side signing; the ledger itself never signs.
pub fn sign(secret: &str, message: &[u8]) -> Result<String, CryptoError> {
    let key = signing_key(secret)?;
    Ok(hex::encode(key.sign(message).to_bytes()))
}

pub fn address_of(secret: &str) -> Result<String, CryptoError> {
    Ok(hex::encode(signing_key(secret)?.verifying_key().to_bytes()))
}

/// Returns `(secret_hex, address_hex)`.
pub fn generate_keypair() -> (String, String) {
    let key = SigningKey::generate(&mut rand::thread_rng());
    (
        hex::encode(key.to_bytes()),
        hex::encode(key.verifying_key().to_bytes()),
    )
}
