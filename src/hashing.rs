//! Hashing and canonical integer encoding
//!
//! Every hash preimage in the protocol is a length-free concatenation of
//! byte strings in a documented order. Integers embedded in preimages use
//! the ASCII decimal form of the signed 64-bit value; this layout is frozen
//! so hashes stay stable across stored chains.

use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

use crate::types::{Hash, PubKeyHash};

/// SHA-256 of `data`
pub fn sha256(data: &[u8]) -> Hash {
    Sha256::digest(data).into()
}

/// First `len` bytes of SHA-256(SHA-256(payload)); the address checksum
pub fn checksum(payload: &[u8], len: usize) -> Vec<u8> {
    let first = Sha256::digest(payload);
    let second = Sha256::digest(first);
    second[..len].to_vec()
}

/// RIPEMD-160(SHA-256(pubkey)): the 20-byte hash outputs are locked to
pub fn hash_pub_key(pubkey: &[u8]) -> PubKeyHash {
    let sha = Sha256::digest(pubkey);
    Ripemd160::digest(sha).to_vec()
}

/// ASCII decimal encoding of a signed 64-bit value, used in hash preimages
pub fn int_to_dec(value: i64) -> Vec<u8> {
    value.to_string().into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_known_vector() {
        // SHA-256("abc")
        let hash = sha256(b"abc");
        assert_eq!(
            hex::encode(hash),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_hash_pub_key_length() {
        let h = hash_pub_key(&[0xab; 64]);
        assert_eq!(h.len(), 20);
    }

    #[test]
    fn test_hash_pub_key_deterministic() {
        assert_eq!(hash_pub_key(b"key"), hash_pub_key(b"key"));
        assert_ne!(hash_pub_key(b"key"), hash_pub_key(b"other"));
    }

    #[test]
    fn test_int_to_dec() {
        assert_eq!(int_to_dec(0), b"0".to_vec());
        assert_eq!(int_to_dec(24), b"24".to_vec());
        assert_eq!(int_to_dec(-1), b"-1".to_vec());
        assert_eq!(
            int_to_dec(i64::MAX),
            b"9223372036854775807".to_vec()
        );
    }

    #[test]
    fn test_checksum_length_and_stability() {
        let c = checksum(b"payload", 4);
        assert_eq!(c.len(), 4);
        assert_eq!(c, checksum(b"payload", 4));
        assert_ne!(c, checksum(b"payloae", 4));
    }
}
