//! Solana transaction wire format for wallet-signed transfers.
//!
//! The bridge never holds keys: it compiles the message, leaves the signature
//! slots zeroed and hands the bytes to the wallet, which fills them in.
//!
//! ```text
//! Transaction:
//!   num_signatures          compact-u16
//!   signatures              64 bytes * num_signatures
//!   message:
//!     num_required_sigs     u8
//!     num_readonly_signed   u8
//!     num_readonly_unsigned u8
//!     num_accounts          compact-u16
//!     account_keys          32 bytes * num_accounts
//!     recent_blockhash      32 bytes
//!     num_instructions      compact-u16
//!     instructions[]        program_id_index u8,
//!                           compact-u16 + account indices,
//!                           compact-u16 + data
//! ```

use crate::address::{address_to_bytes, blockhash_to_bytes};
use crate::error::SolError;

// ---------------------------------------------------------------------------
// System Program
// ---------------------------------------------------------------------------

/// `11111111111111111111111111111111`
pub const SYSTEM_PROGRAM_ID: [u8; 32] = [0u8; 32];

/// System Program `Transfer` discriminant (little-endian u32).
const SYSTEM_TRANSFER_IX_INDEX: u32 = 2;

pub const SIGNATURE_LEN: usize = 64;

/// Base58 length above which a wallet returned more than a bare signature.
const MAX_SIGNATURE_B58_LEN: usize = 88;

// ---------------------------------------------------------------------------
// Compact-u16
// ---------------------------------------------------------------------------

/// Encode a `u16` as Solana's variable-length compact-u16 (1 to 3 bytes).
pub fn encode_compact_u16(value: u16) -> Vec<u8> {
    let mut rest = value as u32;
    let mut out = Vec::with_capacity(3);
    loop {
        let low = (rest & 0x7f) as u8;
        rest >>= 7;
        if rest == 0 {
            out.push(low);
            return out;
        }
        out.push(low | 0x80);
    }
}

/// Decode a compact-u16, returning `(value, bytes_consumed)`.
pub fn decode_compact_u16(data: &[u8]) -> Result<(u16, usize), SolError> {
    let mut value: u32 = 0;
    for (i, byte) in data.iter().take(3).enumerate() {
        value |= ((byte & 0x7f) as u32) << (7 * i);
        if byte & 0x80 == 0 {
            return u16::try_from(value)
                .map(|v| (v, i + 1))
                .map_err(|_| SolError::SerializationError("compact-u16 value overflow".into()));
        }
    }
    Err(SolError::SerializationError(
        "unexpected end of data while decoding compact-u16".into(),
    ))
}

// ---------------------------------------------------------------------------
// Data structures
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SolAccountMeta {
    pub pubkey: [u8; 32],
    pub is_signer: bool,
    pub is_writable: bool,
}

#[derive(Debug, Clone)]
pub struct SolInstruction {
    pub program_id: [u8; 32],
    pub accounts: Vec<SolAccountMeta>,
    pub data: Vec<u8>,
}

/// A compiled legacy message.
#[derive(Debug, Clone)]
pub struct SolTransaction {
    /// Canonical order: writable signers (fee payer first), read-only
    /// signers, writable non-signers, read-only non-signers.
    pub account_keys: Vec<[u8; 32]>,
    pub num_required_signatures: u8,
    pub num_readonly_signed: u8,
    pub num_readonly_unsigned: u8,
    pub recent_blockhash: [u8; 32],
    pub compiled_instructions: Vec<CompiledInstruction>,
}

/// An instruction whose account references are indices into
/// `account_keys`.
#[derive(Debug, Clone)]
pub struct CompiledInstruction {
    pub program_id_index: u8,
    pub account_indices: Vec<u8>,
    pub data: Vec<u8>,
}

// ---------------------------------------------------------------------------
// Building
// ---------------------------------------------------------------------------

/// Native transfer request in the form the strategy receives it.
#[derive(Debug, Clone)]
pub struct TransferConfig<'a> {
    pub from_address: &'a str,
    pub to_address: &'a str,
    pub lamports: u64,
    pub blockhash: &'a str,
}

/// Compiles a System Program transfer paid by `from_address`.
pub fn build_transfer(config: &TransferConfig<'_>) -> Result<SolTransaction, SolError> {
    if config.lamports == 0 {
        return Err(SolError::TransactionBuildError("lamports must be > 0".into()));
    }
    let from = address_to_bytes(config.from_address)?;
    let to = address_to_bytes(config.to_address)?;
    let blockhash = blockhash_to_bytes(config.blockhash)?;

    let instruction = system_transfer_instruction(&from, &to, config.lamports);
    compile_transaction(&[instruction], &from, &blockhash)
}

/// Compiles instructions into a message with a single fee payer at index 0.
pub fn compile_transaction(
    instructions: &[SolInstruction],
    fee_payer: &[u8; 32],
    recent_blockhash: &[u8; 32],
) -> Result<SolTransaction, SolError> {
    struct Entry {
        pubkey: [u8; 32],
        is_signer: bool,
        is_writable: bool,
    }

    impl Entry {
        fn rank(&self) -> u8 {
            match (self.is_signer, self.is_writable) {
                (true, true) => 0,
                (true, false) => 1,
                (false, true) => 2,
                (false, false) => 3,
            }
        }
    }

    let mut entries: Vec<Entry> = Vec::new();
    let mut upsert = |pubkey: [u8; 32], signer: bool, writable: bool| {
        match entries.iter_mut().find(|e| e.pubkey == pubkey) {
            Some(entry) => {
                entry.is_signer |= signer;
                entry.is_writable |= writable;
            }
            None => entries.push(Entry {
                pubkey,
                is_signer: signer,
                is_writable: writable,
            }),
        }
    };

    upsert(*fee_payer, true, true);
    for ix in instructions {
        for meta in &ix.accounts {
            upsert(meta.pubkey, meta.is_signer, meta.is_writable);
        }
        upsert(ix.program_id, false, false);
    }

    // Stable sort keeps the fee payer ahead of other writable signers.
    entries.sort_by_key(Entry::rank);

    let count = |pred: fn(&Entry) -> bool| entries.iter().filter(|e| pred(e)).count() as u8;
    let num_required_signatures = count(|e| e.is_signer);
    let num_readonly_signed = count(|e| e.is_signer && !e.is_writable);
    let num_readonly_unsigned = count(|e| !e.is_signer && !e.is_writable);

    let account_keys: Vec<[u8; 32]> = entries.iter().map(|e| e.pubkey).collect();
    let index_of = |key: &[u8; 32]| {
        account_keys
            .iter()
            .position(|k| k == key)
            .map(|i| i as u8)
            .ok_or_else(|| SolError::TransactionBuildError("account not in account keys".into()))
    };

    let compiled_instructions = instructions
        .iter()
        .map(|ix| {
            Ok(CompiledInstruction {
                program_id_index: index_of(&ix.program_id)?,
                account_indices: ix
                    .accounts
                    .iter()
                    .map(|meta| index_of(&meta.pubkey))
                    .collect::<Result<_, SolError>>()?,
                data: ix.data.clone(),
            })
        })
        .collect::<Result<Vec<_>, SolError>>()?;

    Ok(SolTransaction {
        account_keys,
        num_required_signatures,
        num_readonly_signed,
        num_readonly_unsigned,
        recent_blockhash: *recent_blockhash,
        compiled_instructions,
    })
}

/// Serializes the message (the bytes the wallet signs).
pub fn serialize_message(tx: &SolTransaction) -> Vec<u8> {
    let mut buf = Vec::with_capacity(256);
    buf.extend_from_slice(&[
        tx.num_required_signatures,
        tx.num_readonly_signed,
        tx.num_readonly_unsigned,
    ]);

    buf.extend_from_slice(&encode_compact_u16(tx.account_keys.len() as u16));
    for key in &tx.account_keys {
        buf.extend_from_slice(key);
    }
    buf.extend_from_slice(&tx.recent_blockhash);

    buf.extend_from_slice(&encode_compact_u16(tx.compiled_instructions.len() as u16));
    for ix in &tx.compiled_instructions {
        buf.push(ix.program_id_index);
        buf.extend_from_slice(&encode_compact_u16(ix.account_indices.len() as u16));
        buf.extend_from_slice(&ix.account_indices);
        buf.extend_from_slice(&encode_compact_u16(ix.data.len() as u16));
        buf.extend_from_slice(&ix.data);
    }
    buf
}

/// Full wire transaction with every signature slot zeroed.
pub fn serialize_unsigned(tx: &SolTransaction) -> Vec<u8> {
    let signers = tx.num_required_signatures as usize;
    let message = serialize_message(tx);
    let mut wire = encode_compact_u16(signers as u16);
    wire.resize(wire.len() + signers * SIGNATURE_LEN, 0);
    wire.extend_from_slice(&message);
    wire
}

/// Returns the fee payer's signature from a wire transaction, failing if
/// the slot is still empty.
pub fn fee_payer_signature(wire: &[u8]) -> Result<[u8; SIGNATURE_LEN], SolError> {
    let (count, offset) = decode_compact_u16(wire)?;
    if count == 0 {
        return Err(SolError::SerializationError("transaction has no signatures".into()));
    }
    let slot: [u8; SIGNATURE_LEN] = wire
        .get(offset..offset + SIGNATURE_LEN)
        .and_then(|s| s.try_into().ok())
        .ok_or_else(|| SolError::SerializationError("truncated signature section".into()))?;
    if slot.iter().all(|b| *b == 0) {
        return Err(SolError::SerializationError("wallet returned an unsigned transaction".into()));
    }
    Ok(slot)
}

/// Some wallets hand back a signature with trailing data appended. Anything
/// longer than a bare Base58 signature is cut to its first 64 bytes.
pub fn normalize_signature(raw: &str) -> String {
    if raw.len() <= MAX_SIGNATURE_B58_LEN {
        return raw.to_string();
    }
    match bs58::decode(raw).into_vec() {
        Ok(bytes) if bytes.len() >= SIGNATURE_LEN => {
            bs58::encode(&bytes[..SIGNATURE_LEN]).into_string()
        }
        Ok(_) => raw.to_string(),
        Err(err) => {
            tracing::warn!(%err, "failed to normalize signature");
            raw.to_string()
        }
    }
}

fn system_transfer_instruction(from: &[u8; 32], to: &[u8; 32], lamports: u64) -> SolInstruction {
    let mut data = Vec::with_capacity(12);
    data.extend_from_slice(&SYSTEM_TRANSFER_IX_INDEX.to_le_bytes());
    data.extend_from_slice(&lamports.to_le_bytes());

    SolInstruction {
        program_id: SYSTEM_PROGRAM_ID,
        accounts: vec![
            SolAccountMeta {
                pubkey: *from,
                is_signer: true,
                is_writable: true,
            },
            SolAccountMeta {
                pubkey: *to,
                is_signer: false,
                is_writable: true,
            },
        ],
        data,
    }
}
