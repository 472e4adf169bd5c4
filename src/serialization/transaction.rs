//! Transaction wire format
//!
//! Layout:
//! - id (bytes)
//! - input count (VarInt), then per input:
//!   prev_tx_id (bytes) ‖ prev_out_index (i64) ‖ signature (bytes) ‖
//!   pubkey (bytes)
//! - output count (VarInt), then per output:
//!   value (i64) ‖ pubkey_hash (bytes)
//!
//! Chainstate records store a bare outputs list: count (VarInt) followed by
//! outputs in the same layout.

use super::{write_bytes, write_i64, Reader};
use crate::error::Result;
use crate::transaction::{Transaction, TxInput, TxOutput};

/// Serialize a transaction
pub fn serialize_transaction(tx: &Transaction) -> Vec<u8> {
    let mut out = Vec::new();
    write_bytes(&mut out, &tx.id);
    out.extend_from_slice(&super::encode_varint(tx.inputs.len() as u64));
    for input in &tx.inputs {
        write_input(&mut out, input);
    }
    out.extend_from_slice(&super::encode_varint(tx.outputs.len() as u64));
    for output in &tx.outputs {
        write_output(&mut out, output);
    }
    out
}

/// Deserialize a transaction, rejecting trailing bytes
pub fn deserialize_transaction(bytes: &[u8]) -> Result<Transaction> {
    let mut reader = Reader::new(bytes);
    let tx = read_transaction(&mut reader)?;
    reader.finish()?;
    Ok(tx)
}

/// Serialize a bare outputs list (chainstate record)
pub fn serialize_outputs(outputs: &[TxOutput]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&super::encode_varint(outputs.len() as u64));
    for output in outputs {
        write_output(&mut out, output);
    }
    out
}

/// Deserialize a bare outputs list
pub fn deserialize_outputs(bytes: &[u8]) -> Result<Vec<TxOutput>> {
    let mut reader = Reader::new(bytes);
    let outputs = read_outputs(&mut reader)?;
    reader.finish()?;
    Ok(outputs)
}

pub(crate) fn read_transaction(reader: &mut Reader<'_>) -> Result<Transaction> {
    let id = reader.read_bytes()?;
    let input_count = reader.read_varint()?;
    let mut inputs = Vec::with_capacity(input_count.min(1024) as usize);
    for _ in 0..input_count {
        inputs.push(TxInput {
            prev_tx_id: reader.read_bytes()?,
            prev_out_index: reader.read_i64()?,
            signature: reader.read_bytes()?,
            pubkey: reader.read_bytes()?,
        });
    }
    let outputs = read_outputs(reader)?;
    Ok(Transaction { id, inputs, outputs })
}

pub(crate) fn write_transaction(out: &mut Vec<u8>, tx: &Transaction) {
    out.extend_from_slice(&serialize_transaction(tx));
}

fn read_outputs(reader: &mut Reader<'_>) -> Result<Vec<TxOutput>> {
    let count = reader.read_varint()?;
    let mut outputs = Vec::with_capacity(count.min(1024) as usize);
    for _ in 0..count {
        outputs.push(TxOutput {
            value: reader.read_i64()?,
            pubkey_hash: reader.read_bytes()?,
        });
    }
    Ok(outputs)
}

fn write_input(out: &mut Vec<u8>, input: &TxInput) {
    write_bytes(out, &input.prev_tx_id);
    write_i64(out, input.prev_out_index);
    write_bytes(out, &input.signature);
    write_bytes(out, &input.pubkey);
}

fn write_output(out: &mut Vec<u8>, output: &TxOutput) {
    write_i64(out, output.value);
    write_bytes(out, &output.pubkey_hash);
}
