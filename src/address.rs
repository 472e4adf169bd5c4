//! Address encoding and validation
//!
//! The text form of an address is
//! `base58(version ‖ pubkey_hash ‖ checksum)` where the checksum is the
//! first 4 bytes of SHA-256(SHA-256(version ‖ pubkey_hash)).

use crate::constants::{ADDRESS_CHECKSUM_LEN, ADDRESS_VERSION};
use crate::hashing::{checksum, hash_pub_key};
use crate::types::PubKeyHash;

/// Derive the address text form for a raw public key
pub fn address_from_pubkey(pubkey: &[u8]) -> String {
    address_from_pubkey_hash(&hash_pub_key(pubkey))
}

/// Derive the address text form for an already-hashed public key
pub fn address_from_pubkey_hash(pubkey_hash: &[u8]) -> String {
    let mut payload = Vec::with_capacity(1 + pubkey_hash.len() + ADDRESS_CHECKSUM_LEN);
    payload.push(ADDRESS_VERSION);
    payload.extend_from_slice(pubkey_hash);
    let check = checksum(&payload, ADDRESS_CHECKSUM_LEN);
    payload.extend_from_slice(&check);
    bs58::encode(payload).into_string()
}

/// Check that an address decodes and its checksum matches
pub fn validate_address(address: &str) -> bool {
    let payload = match bs58::decode(address).into_vec() {
        Ok(p) => p,
        Err(_) => return false,
    };
    if payload.len() <= 1 + ADDRESS_CHECKSUM_LEN {
        return false;
    }
    let (versioned, actual) = payload.split_at(payload.len() - ADDRESS_CHECKSUM_LEN);
    if versioned[0] != ADDRESS_VERSION {
        return false;
    }
    checksum(versioned, ADDRESS_CHECKSUM_LEN) == actual
}

/// Extract the public key hash from a valid address
pub fn pubkey_hash_from_address(address: &str) -> Option<PubKeyHash> {
    if !validate_address(address) {
        return None;
    }
    let payload = bs58::decode(address).into_vec().ok()?;
    Some(payload[1..payload.len() - ADDRESS_CHECKSUM_LEN].to_vec())
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Every generated key hashes to a valid address
        #[test]
        fn prop_generated_addresses_validate(pubkey in proptest::collection::vec(any::<u8>(), 64)) {
            let address = address_from_pubkey(&pubkey);
            prop_assert!(validate_address(&address));
        }

        /// Flipping a payload byte before encoding breaks validation
        #[test]
        fn prop_tampered_payload_rejected(
            pubkey in proptest::collection::vec(any::<u8>(), 64),
            pos in 0usize..25,
            flip in 1u8..255,
        ) {
            let mut payload = vec![ADDRESS_VERSION];
            payload.extend_from_slice(&hash_pub_key(&pubkey));
            let check = checksum(&payload, ADDRESS_CHECKSUM_LEN);
            payload.extend_from_slice(&check);
            payload[pos] ^= flip;
            let tampered = bs58::encode(payload).into_string();
            prop_assert!(!validate_address(&tampered));
        }
    }
}
