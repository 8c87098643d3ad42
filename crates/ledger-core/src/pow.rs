//! Proof-of-work over `(last_proof, proof, last_hash)`.
//!
//! A proof is valid when `sha256(dec(last_proof) ++ dec(proof) ++ last_hash)`
//! starts with `difficulty` zero hex digits.

use crate::crypto::sha256_hex;
use rayon::prelude::*;

pub fn leading_zero_hex_digits(digest: &str) -> usize {
    digest.bytes().take_while(|b| *b == b'0').count()
}

pub fn guess_digest(last_proof: u64, proof: u64, last_hash: &str) -> String {
    let guess = format!("{last_proof}{proof}{last_hash}");
    sha256_hex(guess.as_bytes())
}

pub fn verify(last_proof: u64, proof: u64, last_hash: &str, difficulty: usize) -> bool {
    leading_zero_hex_digits(&guess_digest(last_proof, proof, last_hash)) >= difficulty
}

/// Smallest proof satisfying [`verify`], counting up from zero.
pub fn search(last_proof: u64, last_hash: &str, difficulty: usize) -> u64 {
    let mut proof = 0u64;
    while !verify(last_proof, proof, last_hash, difficulty) {
        proof += 1;
    }
    proof
}

/// Same result as [`search`], spread across the rayon pool. `find_first`
/// keeps the minimal candidate even when a later one is found sooner.
pub fn search_parallel(last_proof: u64, last_hash: &str, difficulty: usize) -> Option<u64> {
    (0u64..u64::MAX)
        .into_par_iter()
        .find_first(|proof| verify(last_proof, *proof, last_hash, difficulty))
}
