//! Base58 decoding of account addresses and blockhashes.
//!
//! Both are Base58 encodings of exactly 32 bytes, using the Bitcoin alphabet
//! implemented by the `bs58` crate.

use crate::error::SolError;

fn decode_32(value: &str) -> Result<[u8; 32], String> {
    let bytes = bs58::decode(value)
        .into_vec()
        .map_err(|e| format!("base58 decode failed: {e}"))?;
    bytes
        .try_into()
        .map_err(|v: Vec<u8>| format!("expected 32 bytes, got {}", v.len()))
}

/// Decode a Solana address string to its 32-byte representation.
pub fn address_to_bytes(address: &str) -> Result<[u8; 32], SolError> {
    decode_32(address).map_err(SolError::InvalidAddress)
}

/// Decode a recent blockhash as returned by `getLatestBlockhash`.
pub fn blockhash_to_bytes(blockhash: &str) -> Result<[u8; 32], SolError> {
    if blockhash.is_empty() {
        return Err(SolError::InvalidBlockhash("missing recent blockhash".into()));
    }
    decode_32(blockhash).map_err(SolError::InvalidBlockhash)
}

/// Encode 32 bytes as a Solana address (Base58 string).
pub fn bytes_to_address(bytes: &[u8; 32]) -> String {
    bs58::encode(bytes).into_string()
}
