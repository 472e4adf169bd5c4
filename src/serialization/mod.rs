//! Deterministic wire format for stored records
//!
//! Consensus-critical codec: the transaction id is the SHA-256 of this
//! serialization, so the layout must stay stable across versions.
//!
//! Layout primitives:
//! - counts and byte-string lengths: VarInt (see `varint`)
//! - byte strings: VarInt length followed by the raw bytes
//! - 64-bit integers: 8 bytes big-endian (signed values in two's complement)
//!
//! Decoding is strict: truncated input, non-minimal varints, and trailing
//! bytes are all serialization errors.

pub mod block;
pub mod transaction;
pub mod validator;
pub mod varint;

pub use block::{deserialize_block, serialize_block};
pub use transaction::{
    deserialize_outputs, deserialize_transaction, serialize_outputs, serialize_transaction,
};
pub use validator::{deserialize_validator, serialize_validator};
pub use varint::{decode_varint, encode_varint};

use crate::error::{LedgerError, Result};

/// Cursor over an input buffer shared by the record decoders
pub(crate) struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Reader { buf, pos: 0 }
    }

    pub(crate) fn read_varint(&mut self) -> Result<u64> {
        let (value, consumed) = varint::decode_varint(&self.buf[self.pos..])?;
        self.pos += consumed;
        Ok(value)
    }

    pub(crate) fn read_exact(&mut self, len: usize) -> Result<&'a [u8]> {
        if self.buf.len() - self.pos < len {
            return Err(LedgerError::Serialization(format!(
                "unexpected end of input: need {len} bytes, have {}",
                self.buf.len() - self.pos
            )));
        }
        let slice = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    pub(crate) fn read_bytes(&mut self) -> Result<Vec<u8>> {
        let len = self.read_varint()?;
        let len = usize::try_from(len)
            .map_err(|_| LedgerError::Serialization(format!("byte string too long: {len}")))?;
        Ok(self.read_exact(len)?.to_vec())
    }

    pub(crate) fn read_i64(&mut self) -> Result<i64> {
        let bytes = self.read_exact(8)?;
        let mut arr = [0u8; 8];
        arr.copy_from_slice(bytes);
        Ok(i64::from_be_bytes(arr))
    }

    pub(crate) fn finish(&self) -> Result<()> {
        if self.pos != self.buf.len() {
            return Err(LedgerError::Serialization(format!(
                "{} trailing bytes after record",
                self.buf.len() - self.pos
            )));
        }
        Ok(())
    }
}

/// Append a VarInt-length-prefixed byte string
pub(crate) fn write_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    out.extend_from_slice(&varint::encode_varint(bytes.len() as u64));
    out.extend_from_slice(bytes);
}

/// Append an i64 as 8 bytes big-endian
pub(crate) fn write_i64(out: &mut Vec<u8>, value: i64) {
    out.extend_from_slice(&value.to_be_bytes());
}
