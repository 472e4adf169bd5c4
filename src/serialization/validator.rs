//! Validator record wire format
//!
//! Layout: address (bytes, UTF-8) ‖ pubkey (bytes) ‖ stake (i64).

use super::{write_bytes, write_i64, Reader};
use crate::consensus::pos::Validator;
use crate::error::{LedgerError, Result};

/// Serialize a validator record
pub fn serialize_validator(validator: &Validator) -> Vec<u8> {
    let mut out = Vec::new();
    write_bytes(&mut out, validator.address.as_bytes());
    write_bytes(&mut out, &validator.pubkey);
    write_i64(&mut out, validator.stake);
    out
}

/// Deserialize a validator record, rejecting trailing bytes
pub fn deserialize_validator(bytes: &[u8]) -> Result<Validator> {
    let mut reader = Reader::new(bytes);
    let address_bytes = reader.read_bytes()?;
    let address = String::from_utf8(address_bytes)
        .map_err(|_| LedgerError::Serialization("validator address is not UTF-8".into()))?;
    let pubkey = reader.read_bytes()?;
    let stake = reader.read_i64()?;
    reader.finish()?;
    Ok(Validator {
        address,
        pubkey,
        stake,
    })
}
