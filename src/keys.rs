//! ECDSA signing primitives over NIST P-256
//!
//! Public keys travel in raw form, the X and Y coordinates concatenated to
//! 64 bytes with no SEC1 tag. Signatures are fixed-width r ‖ s, each scalar
//! zero-padded to 32 bytes. Both signing and verification operate on raw
//! 32-byte digests; callers hash first.

use p256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use p256::elliptic_curve::generic_array::GenericArray;
use p256::EncodedPoint;
use rand::rngs::OsRng;

use crate::error::{LedgerError, Result};
use crate::types::Hash;

/// Length of a raw X ‖ Y public key
pub const RAW_PUBKEY_LEN: usize = 64;

/// Length of a fixed-width r ‖ s signature
pub const SIGNATURE_LEN: usize = 64;

/// Generate a fresh P-256 key pair; returns the signing key and the raw
/// 64-byte public key
pub fn new_key_pair() -> (SigningKey, Vec<u8>) {
    let signing_key = SigningKey::random(&mut OsRng);
    let pubkey = raw_pubkey(signing_key.verifying_key());
    (signing_key, pubkey)
}

/// Raw X ‖ Y encoding of a verifying key
pub fn raw_pubkey(key: &VerifyingKey) -> Vec<u8> {
    // Uncompressed SEC1 is 0x04 ‖ X ‖ Y; drop the tag byte.
    key.to_encoded_point(false).as_bytes()[1..].to_vec()
}

/// Sign a raw 32-byte digest, producing a fixed-width r ‖ s signature
pub fn sign_digest(key: &SigningKey, digest: &Hash) -> Result<Vec<u8>> {
    let signature: Signature = key
        .sign_prehash(digest)
        .map_err(|e| LedgerError::InvalidSignature(format!("signing failed: {e}")))?;
    Ok(signature.to_bytes().to_vec())
}

/// Verify a fixed-width signature over a raw digest with a raw public key.
///
/// The verifying key is reconstructed from the X ‖ Y bytes directly.
pub fn verify_digest(raw_pubkey: &[u8], digest: &Hash, signature: &[u8]) -> bool {
    if raw_pubkey.len() != RAW_PUBKEY_LEN || signature.len() != SIGNATURE_LEN {
        return false;
    }
    let point = EncodedPoint::from_untagged_bytes(GenericArray::from_slice(raw_pubkey));
    let verifying_key = match VerifyingKey::from_encoded_point(&point) {
        Ok(vk) => vk,
        Err(_) => return false,
    };
    let r = GenericArray::from_slice(&signature[..32]);
    let s = GenericArray::from_slice(&signature[32..]);
    let signature = match Signature::from_scalars(*r, *s) {
        Ok(sig) => sig,
        Err(_) => return false,
    };
    verifying_key.verify_prehash(digest, &signature).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hashing::sha256;

    #[test]
    fn test_sign_verify_round_trip() {
        let (key, pubkey) = new_key_pair();
        let digest = sha256(b"message");
        let signature = sign_digest(&key, &digest).unwrap();
        assert_eq!(signature.len(), SIGNATURE_LEN);
        assert!(verify_digest(&pubkey, &digest, &signature));
    }

    #[test]
    fn test_wrong_digest_rejected() {
        let (key, pubkey) = new_key_pair();
        let signature = sign_digest(&key, &sha256(b"message")).unwrap();
        assert!(!verify_digest(&pubkey, &sha256(b"other"), &signature));
    }

    #[test]
    fn test_wrong_key_rejected() {
        let (key, _) = new_key_pair();
        let (_, other_pubkey) = new_key_pair();
        let digest = sha256(b"message");
        let signature = sign_digest(&key, &digest).unwrap();
        assert!(!verify_digest(&other_pubkey, &digest, &signature));
    }

    #[test]
    fn test_tampered_signature_rejected() {
        let (key, pubkey) = new_key_pair();
        let digest = sha256(b"message");
        let mut signature = sign_digest(&key, &digest).unwrap();
        signature[10] ^= 0x01;
        assert!(!verify_digest(&pubkey, &digest, &signature));
    }

    #[test]
    fn test_malformed_inputs_rejected() {
        let (key, pubkey) = new_key_pair();
        let digest = sha256(b"message");
        let signature = sign_digest(&key, &digest).unwrap();
        assert!(!verify_digest(&pubkey[..32], &digest, &signature));
        assert!(!verify_digest(&pubkey, &digest, &signature[..40]));
        assert!(!verify_digest(&[0u8; 64], &digest, &signature));
    }

    #[test]
    fn test_raw_pubkey_length() {
        let (_, pubkey) = new_key_pair();
        assert_eq!(pubkey.len(), RAW_PUBKEY_LEN);
    }
}
