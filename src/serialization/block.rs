//! Block wire format
//!
//! Layout:
//! - timestamp (i64)
//! - transaction count (VarInt), then each transaction in its own format
//! - prev_hash (bytes), hash (bytes)
//! - nonce (i64), bits (i64)
//! - validator_pubkey (bytes), signature (bytes)

use super::transaction::{read_transaction, write_transaction};
use super::{write_bytes, write_i64, Reader};
use crate::block::Block;
use crate::error::Result;

/// Serialize a block for storage
pub fn serialize_block(block: &Block) -> Vec<u8> {
    let mut out = Vec::new();
    write_i64(&mut out, block.timestamp);
    out.extend_from_slice(&super::encode_varint(block.transactions.len() as u64));
    for tx in &block.transactions {
        write_transaction(&mut out, tx);
    }
    write_bytes(&mut out, &block.prev_hash);
    write_bytes(&mut out, &block.hash);
    write_i64(&mut out, block.nonce);
    write_i64(&mut out, block.bits);
    write_bytes(&mut out, &block.validator_pubkey);
    write_bytes(&mut out, &block.signature);
    out
}

/// Deserialize a stored block, rejecting trailing bytes
pub fn deserialize_block(bytes: &[u8]) -> Result<Block> {
    let mut reader = Reader::new(bytes);
    let timestamp = reader.read_i64()?;
    let tx_count = reader.read_varint()?;
    let mut transactions = Vec::with_capacity(tx_count.min(1024) as usize);
    for _ in 0..tx_count {
        transactions.push(read_transaction(&mut reader)?);
    }
    let prev_hash = reader.read_bytes()?;
    let hash = reader.read_bytes()?;
    let nonce = reader.read_i64()?;
    let bits = reader.read_i64()?;
    let validator_pubkey = reader.read_bytes()?;
    let signature = reader.read_bytes()?;
    reader.finish()?;
    Ok(Block {
        timestamp,
        transactions,
        prev_hash,
        hash,
        nonce,
        bits,
        validator_pubkey,
        signature,
    })
}
